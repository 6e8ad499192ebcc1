use std::sync::Arc;

use tracing::error;

use pitchpoint_db::Database;
use pitchpoint_gateway::dispatcher::Dispatcher;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    pub session_days: i64,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: String, session_days: i64) -> AppState {
        Arc::new(Self {
            db: Arc::new(db),
            dispatcher: Dispatcher::new(),
            jwt_secret,
            session_days,
        })
    }
}

/// Run blocking DB work off the async runtime.
pub async fn db_call<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::Internal)
}
