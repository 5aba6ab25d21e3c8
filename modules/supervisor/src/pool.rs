use crate::layout::{slice_addr, ConfigRecord, Nnid, XLen};

/// An opaque accelerator configuration: exactly `len()` owned words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    words: Box<[XLen]>,
}

impl Configuration {
    pub fn new(words: Box<[XLen]>) -> Self {
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[XLen] {
        &self.words
    }

    pub fn addr(&self) -> u64 {
        slice_addr(&self.words)
    }
}

/// Bounded pool of configuration slots for one ASID.
///
/// Slots fill in order and never empty: the NNID of a configuration is the
/// number of valid slots at the moment it was attached. The record array is
/// allocated once at full capacity so its address never changes.
#[derive(Debug)]
pub struct ConfigPool {
    records: Box<[ConfigRecord]>,
    configs: Vec<Configuration>,
}

impl ConfigPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: vec![ConfigRecord::EMPTY; capacity].into_boxed_slice(),
            configs: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    pub fn num_valid(&self) -> usize {
        self.configs.len()
    }

    pub fn is_full(&self) -> bool {
        self.num_valid() == self.capacity()
    }

    /// NNID the next attached configuration will receive
    pub fn next_nnid(&self) -> Nnid {
        self.num_valid()
    }

    /// Stores `config` in the next free slot and returns its NNID, or hands
    /// the configuration back when every slot is taken.
    pub fn attach(&mut self, config: Configuration) -> Result<Nnid, Configuration> {
        if self.is_full() {
            return Err(config);
        }

        let nnid = self.next_nnid();
        self.records[nnid] = ConfigRecord {
            size: config.len() as u64,
            config: config.addr(),
        };
        self.configs.push(config);
        Ok(nnid)
    }

    pub fn get(&self, nnid: Nnid) -> Option<&Configuration> {
        self.configs.get(nnid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Configuration> {
        self.configs.iter()
    }

    pub fn records(&self) -> &[ConfigRecord] {
        &self.records
    }

    /// Address of the slot array (0 for a zero-capacity pool)
    pub fn records_addr(&self) -> u64 {
        slice_addr(&self.records)
    }
}
