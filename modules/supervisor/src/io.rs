use crate::layout::{IoRecord, XLen, IO_HEADER_IDLE};
use crate::queue::TransactionQueue;
use std::cell::UnsafeCell;
use std::ptr::{addr_of, read_volatile};

/// Per-ASID transaction channel: a status header plus an input and an
/// output queue. Both queues exist from construction onwards.
/// The accelerator writes the header, so it is only ever read volatilely.
#[derive(Debug)]
pub struct TransactionIo {
    record: Box<UnsafeCell<IoRecord>>,
    pub input: TransactionQueue,
    pub output: TransactionQueue,
}

impl TransactionIo {
    pub fn new(queue_capacity: usize) -> Self {
        let input = TransactionQueue::new(queue_capacity);
        let output = TransactionQueue::new(queue_capacity);
        let record = Box::new(UnsafeCell::new(IoRecord {
            header: IO_HEADER_IDLE,
            input: input.record_addr(),
            output: output.record_addr(),
        }));

        Self {
            record,
            input,
            output,
        }
    }

    pub fn header(&self) -> XLen {
        unsafe { read_volatile(addr_of!((*self.record.get()).header)) }
    }

    pub fn record(&self) -> IoRecord {
        unsafe { read_volatile(self.record.get()) }
    }

    pub fn record_addr(&self) -> u64 {
        self.record.get() as usize as u64
    }

    pub fn check_input(&self) -> bool {
        !self.input.is_empty()
    }

    pub fn check_output(&self) -> bool {
        !self.output.is_empty()
    }
}
