#![allow(dead_code)]

use scentquiz::{
    ai::{AiConfig, DashscopeClient},
    db::{AuthUser, Db},
    models::Seed,
    services::preference::ScoringStrategy,
    AppState,
};

pub async fn create_test_db() -> Db {
    create_test_db_with_url().await.0
}

/// A fresh database together with its url, for tests that need a second
/// connection to the same file.
pub async fn create_test_db_with_url() -> (Db, String) {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path =
        std::env::temp_dir().join(format!("scentquiz_test_{}_{}.db", std::process::id(), id));
    // Clean up leftover file from previous runs
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite:{}", path.display());
    let db = Db::new(&url).await.expect("failed to create test database");
    (db, url)
}

pub fn sample_seed() -> Seed {
    serde_json::from_str(include_str!("../../data/catalog.json")).expect("sample catalog parses")
}

pub async fn seeded_db() -> Db {
    let db = create_test_db().await;
    db.load_seed(&sample_seed()).await.expect("seed sample catalog");
    db
}

/// A client without credentials: every call fails before any network I/O.
pub fn offline_ai() -> DashscopeClient {
    DashscopeClient::new(AiConfig::default()).expect("build AI client")
}

pub async fn app_state_with(db: Db, scoring: ScoringStrategy) -> AppState {
    AppState::new(db, offline_ai(), scoring)
        .await
        .expect("build app state")
}

pub async fn app_state() -> AppState {
    app_state_with(seeded_db().await, ScoringStrategy::Keyword).await
}

pub async fn user(db: &Db, name: &str) -> AuthUser {
    db.ensure_user(name, false).await.expect("create user")
}

pub async fn admin(db: &Db, name: &str) -> AuthUser {
    db.ensure_user(name, true).await.expect("create admin")
}
