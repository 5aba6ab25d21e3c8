use crate::error::{Result, TableError};
use crate::layout::{DEFAULT_QUEUE_CAPACITY, MAX_TABLE_SIZE};
use serde::{Deserialize, Serialize};

/// Geometry of an ASID--NNID table, fixed for the table's lifetime
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Number of ASIDs (default: 0, range: 0-65536)
    pub table_size: usize,

    /// Configuration slots per ASID (default: 1)
    pub configs_per_entry: usize,

    /// Words per input/output queue (default: 16)
    pub queue_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_size: 0,
            configs_per_entry: 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl TableConfig {
    pub fn new(table_size: usize, configs_per_entry: usize) -> Self {
        Self {
            table_size,
            configs_per_entry,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_size > MAX_TABLE_SIZE {
            return Err(TableError::config(
                "table_size",
                self.table_size,
                "at most 65536 (16-bit ASIDs)",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(TableError::config("queue_capacity", 0, "> 0"));
        }
        Ok(())
    }

    /// Parse and validate a JSON table description
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TableConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
