use crate::layout::{slice_addr, QueueRecord, XLen, WORD_BYTES};
use std::cell::UnsafeCell;
use std::ptr::{addr_of, read_volatile};

/// Fixed-capacity ring of words shared with the accelerator
/// Layout: [QueueRecord (data | size | head | tail)] -> [Data (capacity words)]
///
/// The accelerator fills and drains the ring; the supervisor only allocates it,
/// publishes the record address and releases it with the owning entry.
/// Empty when head == tail.
///
/// Cursors and data words change underneath shared borrows, so both live in
/// `UnsafeCell`s and every read is a volatile load.
#[derive(Debug)]
pub struct TransactionQueue {
    record: Box<UnsafeCell<QueueRecord>>,
    data: Box<[UnsafeCell<XLen>]>,
}

impl TransactionQueue {
    pub fn new(capacity: usize) -> Self {
        let data: Box<[UnsafeCell<XLen>]> = (0..capacity).map(|_| UnsafeCell::new(0)).collect();
        let base = slice_addr(&data);
        let record = Box::new(UnsafeCell::new(QueueRecord {
            data: base,
            size: capacity as u64,
            head: base,
            tail: base,
        }));
        Self { record, data }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Address of the record the accelerator dereferences
    pub fn record_addr(&self) -> u64 {
        self.record.get() as usize as u64
    }

    /// Snapshot of the record as the accelerator currently sees it
    pub fn record(&self) -> QueueRecord {
        unsafe { read_volatile(self.record.get()) }
    }

    /// Address of the word buffer (0 for a zero-capacity queue)
    pub fn base_addr(&self) -> u64 {
        slice_addr(&self.data)
    }

    /// Current value of the word at `index`
    pub fn word(&self, index: usize) -> Option<XLen> {
        self.data
            .get(index)
            .map(|cell| unsafe { read_volatile(cell.get()) })
    }

    /// Snapshot of the whole buffer
    pub fn words(&self) -> Vec<XLen> {
        (0..self.capacity()).filter_map(|i| self.word(i)).collect()
    }

    /// Head cursor as a word index
    pub fn head(&self) -> usize {
        self.cursor(self.load_head())
    }

    /// Tail cursor as a word index
    pub fn tail(&self) -> usize {
        self.cursor(self.load_tail())
    }

    pub fn is_empty(&self) -> bool {
        self.load_head() == self.load_tail()
    }

    /// Whether both cursors address words inside the buffer
    pub fn cursors_in_bounds(&self) -> bool {
        let base = self.load_data();
        let end = base + (self.capacity() * WORD_BYTES) as u64;
        [self.load_head(), self.load_tail()]
            .iter()
            .all(|&c| c >= base && (c < end || (c == base && self.capacity() == 0)))
    }

    #[cfg(test)]
    pub(crate) fn record_ptr(&self) -> *mut QueueRecord {
        self.record.get()
    }

    #[cfg(test)]
    pub(crate) fn word_ptr(&self, index: usize) -> Option<*mut XLen> {
        self.data.get(index).map(UnsafeCell::get)
    }

    fn cursor(&self, addr: u64) -> usize {
        (addr.saturating_sub(self.load_data()) as usize) / WORD_BYTES
    }

    // Cursors are advanced by the accelerator behind our back
    fn load_head(&self) -> u64 {
        unsafe { read_volatile(addr_of!((*self.record.get()).head)) }
    }

    fn load_tail(&self) -> u64 {
        unsafe { read_volatile(addr_of!((*self.record.get()).tail)) }
    }

    fn load_data(&self) -> u64 {
        unsafe { read_volatile(addr_of!((*self.record.get()).data)) }
    }
}
