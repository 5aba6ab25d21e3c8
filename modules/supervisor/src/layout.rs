// Accelerator-visible table layout for the supervisor.
// Must match the accelerator's table walker exactly: every record is a run of
// 64-bit fields and every address field is 0 when the child is empty.

use std::mem::size_of;

/// Machine word exchanged with the accelerator
pub type XLen = u64;

/// Address-space identifier understood by the accelerator
pub type Asid = u16;

/// Index of a configuration inside one ASID's pool
pub type Nnid = usize;

pub const WORD_BYTES: usize = size_of::<XLen>();

/// Largest number of ASIDs a table can address (16-bit ASIDs)
pub const MAX_TABLE_SIZE: usize = Asid::MAX as usize + 1;

// ========== TRANSACTION QUEUES ==========

/// Capacity (in words) of every input/output queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Initial value of the I/O status header
pub const IO_HEADER_IDLE: XLen = 0;

// ========== PRIVILEGED CALL OPCODES ==========

/// Select the active ASID: a0 = asid
pub const SYS_SET_ASID: u64 = 1337;
/// Install the table pointer: a0 = first entry record, a1 = entry count
pub const SYS_SET_ANTP: u64 = 1338;

// ========== RECORDS ==========

/// One row of the table, indexed by ASID.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryRecord {
    pub num_configs: u64,
    pub num_valid: u64,
    /// Address of the first `ConfigRecord` of this ASID's pool
    pub asid_nnid: u64,
    /// Address of this ASID's `IoRecord`
    pub transaction_io: u64,
}

/// One pool slot, indexed by NNID.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigRecord {
    /// Length of the configuration in words
    pub size: u64,
    pub config: u64,
}

impl ConfigRecord {
    pub const EMPTY: Self = Self { size: 0, config: 0 };
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IoRecord {
    pub header: u64,
    /// Address of the input `QueueRecord`
    pub input: u64,
    /// Address of the output `QueueRecord`
    pub output: u64,
}

/// Head and tail are absolute word addresses inside `[data, data + size)`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueRecord {
    pub data: u64,
    pub size: u64,
    pub head: u64,
    pub tail: u64,
}

/// Number of words needed to hold `len` bytes, rounding a partial word up
pub const fn words_for_bytes(len: usize) -> usize {
    len / WORD_BYTES + if len % WORD_BYTES != 0 { 1 } else { 0 }
}

/// Address of a value as the accelerator sees it
pub fn addr_of<T>(value: &T) -> u64 {
    value as *const T as usize as u64
}

/// Address of the first element, or 0 for an empty slice
pub fn slice_addr<T>(values: &[T]) -> u64 {
    if values.is_empty() {
        0
    } else {
        values.as_ptr() as usize as u64
    }
}
