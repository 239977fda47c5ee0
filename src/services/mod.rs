pub mod preference;
pub mod quiz;
pub mod report;
