use crate::models::WorkflowInstance;
use anyhow::{Result, anyhow};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const INSTANCE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("instance");

pub struct InstanceStorage {
    db: Arc<Database>,
}

impl InstanceStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(INSTANCE_TABLE)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    pub fn create(&self, instance: &WorkflowInstance) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(INSTANCE_TABLE)?;
            let json_bytes = serde_json::to_vec(instance)?;
            table.insert(instance.id.as_str(), json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<WorkflowInstance> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(INSTANCE_TABLE)?;

        if let Some(value) = table.get(id)? {
            let instance: WorkflowInstance = serde_json::from_slice(value.value())?;
            Ok(instance)
        } else {
            Err(anyhow!("Instance {} not found", id))
        }
    }

    pub fn update(&self, instance: &WorkflowInstance) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(INSTANCE_TABLE)?;

            if table.get(instance.id.as_str())?.is_none() {
                return Err(anyhow!("Instance {} not found", instance.id));
            }

            let json_bytes = serde_json::to_vec(instance)?;
            table.insert(instance.id.as_str(), json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<WorkflowInstance>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(INSTANCE_TABLE)?;

        let mut instances = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            let instance: WorkflowInstance = serde_json::from_slice(value.value())?;
            instances.push(instance);
        }

        instances.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(instances)
    }
}
