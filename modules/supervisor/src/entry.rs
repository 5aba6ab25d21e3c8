use crate::io::TransactionIo;
use crate::layout::EntryRecord;
use crate::pool::ConfigPool;

/// One ASID's slice of the table: its configuration pool and its
/// transaction channel.
#[derive(Debug)]
pub struct AsidEntry {
    pub pool: ConfigPool,
    pub transaction_io: TransactionIo,
}

impl AsidEntry {
    pub fn new(configs_per_entry: usize, queue_capacity: usize) -> Self {
        Self {
            pool: ConfigPool::new(configs_per_entry),
            transaction_io: TransactionIo::new(queue_capacity),
        }
    }

    pub fn num_configs(&self) -> usize {
        self.pool.capacity()
    }

    pub fn num_valid(&self) -> usize {
        self.pool.num_valid()
    }

    /// Row the accelerator reads for this ASID
    pub fn record(&self) -> EntryRecord {
        EntryRecord {
            num_configs: self.num_configs() as u64,
            num_valid: self.num_valid() as u64,
            asid_nnid: self.pool.records_addr(),
            transaction_io: self.transaction_io.record_addr(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Configuration;

    #[test]
    fn test_entry_record() {
        let mut entry = AsidEntry::new(2, 16);
        let record = entry.record();
        assert_eq!(record.num_configs, 2);
        assert_eq!(record.num_valid, 0);
        assert_eq!(record.asid_nnid, entry.pool.records_addr());
        assert_eq!(record.transaction_io, entry.transaction_io.record_addr());

        entry.pool.attach(Configuration::new(vec![1u64, 2].into())).unwrap();
        assert_eq!(entry.record().num_valid, 1);
        assert_eq!(entry.record().asid_nnid, record.asid_nnid);
    }
}
