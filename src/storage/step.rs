use crate::models::ExecutionStep;
use anyhow::{Result, anyhow};
use redb::{Database, ReadableDatabase, TableDefinition};
use std::sync::Arc;

// Keyed by "{instance_id}/{sequence:08}" so a prefix range scan returns the
// steps of one run already in execution order.
const STEP_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("execution_step");
const STEP_ID_INDEX: TableDefinition<&str, &str> = TableDefinition::new("execution_step:by_id");

pub struct StepStorage {
    db: Arc<Database>,
}

impl StepStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(STEP_TABLE)?;
        write_txn.open_table(STEP_ID_INDEX)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    fn key(instance_id: &str, sequence: u32) -> String {
        format!("{}/{:08}", instance_id, sequence)
    }

    /// Insert or overwrite one step record. Called once when a step starts
    /// (status running) and once when it finalizes; the audit trail is
    /// append-only at the step level, finalization only fills in the outcome.
    pub fn put(&self, step: &ExecutionStep) -> Result<()> {
        let key = Self::key(&step.instance_id, step.sequence);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(STEP_TABLE)?;
            let json_bytes = serde_json::to_vec(step)?;
            table.insert(key.as_str(), json_bytes.as_slice())?;

            let mut index = write_txn.open_table(STEP_ID_INDEX)?;
            index.insert(step.id.as_str(), key.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, step_id: &str) -> Result<ExecutionStep> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(STEP_ID_INDEX)?;

        let key = index
            .get(step_id)?
            .map(|v| v.value().to_string())
            .ok_or_else(|| anyhow!("Step {} not found", step_id))?;

        let table = read_txn.open_table(STEP_TABLE)?;
        let value = table
            .get(key.as_str())?
            .ok_or_else(|| anyhow!("Step {} not found", step_id))?;

        Ok(serde_json::from_slice(value.value())?)
    }

    /// All steps of one instance, ordered by execution sequence.
    pub fn list_for_instance(&self, instance_id: &str) -> Result<Vec<ExecutionStep>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STEP_TABLE)?;

        let prefix = format!("{}/", instance_id);
        let mut steps = Vec::new();

        for item in table.range(prefix.as_str()..)? {
            let (key, value) = item?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            let step: ExecutionStep = serde_json::from_slice(value.value())?;
            steps.push(step);
        }

        Ok(steps)
    }

    pub fn count_for_instance(&self, instance_id: &str) -> Result<usize> {
        Ok(self.list_for_instance(instance_id)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeType;
    use serde_json::json;
    use tempfile::tempdir;

    fn open_storage(dir: &tempfile::TempDir) -> StepStorage {
        let db_path = dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        StepStorage::new(db).unwrap()
    }

    fn step(instance_id: &str, node_id: &str, sequence: u32) -> ExecutionStep {
        ExecutionStep::start(instance_id, node_id, NodeType::SheetRead, sequence, json!({}))
    }

    #[test]
    fn listing_preserves_execution_order() {
        let temp_dir = tempdir().unwrap();
        let storage = open_storage(&temp_dir);

        // Insert out of order; the composite key restores sequence order.
        storage.put(&step("inst-1", "c", 2)).unwrap();
        storage.put(&step("inst-1", "a", 0)).unwrap();
        storage.put(&step("inst-1", "b", 1)).unwrap();

        let steps = storage.list_for_instance("inst-1").unwrap();
        let node_ids: Vec<&str> = steps.iter().map(|s| s.node_id.as_str()).collect();
        assert_eq!(node_ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn listing_scopes_to_one_instance() {
        let temp_dir = tempdir().unwrap();
        let storage = open_storage(&temp_dir);

        storage.put(&step("inst-1", "a", 0)).unwrap();
        storage.put(&step("inst-2", "b", 0)).unwrap();

        assert_eq!(storage.count_for_instance("inst-1").unwrap(), 1);
        assert_eq!(storage.count_for_instance("inst-2").unwrap(), 1);
        assert_eq!(storage.count_for_instance("inst-3").unwrap(), 0);
    }

    #[test]
    fn finalization_overwrites_running_record() {
        let temp_dir = tempdir().unwrap();
        let storage = open_storage(&temp_dir);

        let mut record = step("inst-1", "a", 0);
        storage.put(&record).unwrap();

        record.complete(Some(json!({"rows": 3})), vec!["done".to_string()], 25);
        storage.put(&record).unwrap();

        let loaded = storage.get(&record.id).unwrap();
        assert_eq!(loaded.status, crate::models::StepStatus::Completed);
        assert_eq!(loaded.execution_time_ms, 25);

        // Still exactly one record for the step
        assert_eq!(storage.count_for_instance("inst-1").unwrap(), 1);
    }

    #[test]
    fn get_missing_step_errors() {
        let temp_dir = tempdir().unwrap();
        let storage = open_storage(&temp_dir);
        assert!(storage.get("nonexistent").is_err());
    }
}
