//! Supervisor-side ASID--NNID table for a memory-mapped neural-network
//! accelerator.
//!
//! The table binds every address-space identifier (ASID) to a bounded pool of
//! configuration blobs (addressed by NNID) and to a pair of transaction queues.
//! Once built, its base address is installed in the privileged execution
//! environment, after which the accelerator walks it directly.

pub mod config;
pub mod control;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod ffi;
pub mod io;
pub mod layout;
mod logging;
pub mod pool;
pub mod queue;
pub mod table;


pub use config::TableConfig;
pub use control::{ControlPlane, HostEnvironment, PrivilegedCall, RecordingHost};
#[cfg(target_arch = "riscv64")]
pub use control::EcallHost;
pub use entry::AsidEntry;
pub use error::{Result, TableError};
pub use io::TransactionIo;
pub use layout::{Asid, Nnid, XLen, DEFAULT_QUEUE_CAPACITY, WORD_BYTES};
pub use logging::{init_logging, init_logging_with};
pub use pool::{ConfigPool, Configuration};
pub use queue::TransactionQueue;
pub use table::{AsidNnidTable, TeardownSummary};
