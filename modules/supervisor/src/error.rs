use crate::layout::Asid;
use thiserror::Error;

/// Status returned across the C ABI for every rejected request
pub const ERROR_SENTINEL: i32 = -1;

/// Errors reported by table operations. None of them is retried: the caller
/// corrects the request, picks another ASID or aborts startup.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Cannot append configuration because ASID {asid} is too large (table size: {size})")]
    AsidOutOfRange { asid: Asid, size: usize },

    #[error("Cannot append configuration because all {capacity} slots of ASID {asid} are allocated")]
    PoolExhausted { asid: Asid, capacity: usize },

    #[error("Configuration source error: {0}")]
    Source(#[from] std::io::Error),

    #[error("Configuration error: {field} = {value} is invalid (expected: {expected})")]
    Config {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Table configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl TableError {
    pub fn is_range_error(&self) -> bool {
        matches!(self, TableError::AsidOutOfRange { .. })
    }

    pub fn is_capacity_error(&self) -> bool {
        matches!(self, TableError::PoolExhausted { .. })
    }

    pub fn sentinel(&self) -> i32 {
        ERROR_SENTINEL
    }

    pub(crate) fn config(field: &str, value: impl ToString, expected: &str) -> Self {
        TableError::Config {
            field: field.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
