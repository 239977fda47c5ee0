pub mod ai;
pub mod catalog;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod names;
pub mod rejections;
pub mod scoring;
pub mod services;

use std::sync::Arc;

use axum::Router;
use color_eyre::Result;
use tower_http::trace::TraceLayer;

use ai::DashscopeClient;
use catalog::Catalog;
use services::preference::{PreferenceScorer, ScoringStrategy};
use services::quiz::QuizService;

#[derive(Clone)]
pub struct AppState {
    pub db: db::Db,
    pub catalog: Arc<Catalog>,
    pub quiz: QuizService,
    pub ai: DashscopeClient,
}

impl AppState {
    /// Loads the catalog and wires the services around it.
    pub async fn new(db: db::Db, ai: DashscopeClient, scoring: ScoringStrategy) -> Result<Self> {
        let catalog = Arc::new(db.load_catalog().await?);
        tracing::info!(
            "catalog loaded: {} group(s), {} question(s)",
            catalog.groups().len(),
            catalog.question_count()
        );

        if scoring == ScoringStrategy::External && !ai.is_configured() {
            tracing::warn!("external scoring selected without an API key, default categories will be used");
        }

        let scorer = PreferenceScorer::new(scoring, ai.clone());
        let quiz = QuizService::new(db.clone(), catalog.clone(), scorer);

        Ok(Self {
            db,
            catalog,
            quiz,
            ai,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::catalog::routes())
        .merge(handlers::session::routes())
        .merge(handlers::answer::routes())
        .merge(handlers::ai::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
