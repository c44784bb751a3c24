mod instance;
mod step;

pub use instance::InstanceStorage;
pub use step::StepStorage;

use anyhow::Result;
use redb::Database;
use std::sync::Arc;

/// All persisted engine state over one redb database.
pub struct Storage {
    pub instances: InstanceStorage,
    pub steps: StepStorage,
}

impl Storage {
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Arc::new(Database::create(db_path)?);
        Self::with_database(db)
    }

    pub fn with_database(db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            instances: InstanceStorage::new(db.clone())?,
            steps: StepStorage::new(db)?,
        })
    }
}
