use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::catalog::CourseCatalog;
use crate::persistence::PersistenceGateway;
use crate::services::RoundTracker;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub catalog: Arc<dyn CourseCatalog>,
    pub gateway: Arc<dyn PersistenceGateway>,
    pub tracker: Arc<Mutex<RoundTracker>>,
}
