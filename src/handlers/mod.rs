pub mod ai;
pub mod answer;
pub mod catalog;
pub mod session;
