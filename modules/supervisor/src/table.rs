use crate::config::TableConfig;
use crate::entry::AsidEntry;
use crate::error::{Result, TableError};
use crate::layout::{
    slice_addr, words_for_bytes, Asid, EntryRecord, XLen, DEFAULT_QUEUE_CAPACITY, MAX_TABLE_SIZE,
    WORD_BYTES,
};
use crate::pool::Configuration;
use log::{debug, error, info, warn};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// ASID--NNID table handed to the accelerator.
///
/// `records` is the contiguous array the accelerator indexes by ASID; every
/// record mirrors the owning `AsidEntry` and is rewritten after each attach.
/// The whole tree is allocated in `create` and released in `destroy`; no
/// record moves in between, so the installed base address stays valid until
/// the table is destroyed.
#[derive(Debug)]
pub struct AsidNnidTable {
    records: Box<[EntryRecord]>,
    entries: Box<[AsidEntry]>,
    configs_per_entry: usize,
    queue_capacity: usize,
}

/// What `destroy` released
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownSummary {
    pub entries: usize,
    pub configurations: usize,
    pub queues: usize,
}

impl AsidNnidTable {
    /// Build a table with default queues. ASIDs are 16 bits wide, so
    /// `table_size` is clamped to `MAX_TABLE_SIZE`.
    pub fn create(table_size: usize, configs_per_entry: usize) -> Self {
        let table_size = if table_size > MAX_TABLE_SIZE {
            warn!(
                "Table size {} exceeds the ASID space; clamping to {}",
                table_size, MAX_TABLE_SIZE
            );
            MAX_TABLE_SIZE
        } else {
            table_size
        };
        Self::build(table_size, configs_per_entry, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_config(config: &TableConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(
            config.table_size,
            config.configs_per_entry,
            config.queue_capacity,
        ))
    }

    fn build(table_size: usize, configs_per_entry: usize, queue_capacity: usize) -> Self {
        let entries: Box<[AsidEntry]> = (0..table_size)
            .map(|_| AsidEntry::new(configs_per_entry, queue_capacity))
            .collect();
        let records: Box<[EntryRecord]> = entries.iter().map(AsidEntry::record).collect();

        info!(
            "ASID--NNID table created: {} ASIDs x {} configurations (queues: {} words)",
            table_size, configs_per_entry, queue_capacity
        );

        Self {
            records,
            entries,
            configs_per_entry,
            queue_capacity,
        }
    }

    /// Number of ASIDs
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn configs_per_entry(&self) -> usize {
        self.configs_per_entry
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn entry(&self, asid: Asid) -> Option<&AsidEntry> {
        self.entries.get(asid as usize)
    }

    pub fn entries(&self) -> &[AsidEntry] {
        &self.entries
    }

    pub fn records(&self) -> &[EntryRecord] {
        &self.records
    }

    /// Address of the first entry record (0 for an empty table)
    pub fn base_addr(&self) -> u64 {
        slice_addr(&self.records)
    }

    /// Reads the whole of `source` as words, rounding a trailing partial word
    /// up, and attaches it to `asid`. Returns the new valid count for that
    /// ASID, i.e. the assigned NNID plus one.
    pub fn attach_configuration_from_source<R: Read + Seek>(
        &mut self,
        asid: Asid,
        mut source: R,
    ) -> Result<usize> {
        self.check_attach(asid)?;

        let words = read_words(&mut source).map_err(|e| {
            let err = TableError::from(e);
            error!("{}", err);
            err
        })?;
        self.commit(asid, words)
    }

    pub fn attach_configuration_from_file<P: AsRef<Path>>(
        &mut self,
        asid: Asid,
        path: P,
    ) -> Result<usize> {
        self.check_attach(asid)?;

        let file = File::open(path.as_ref()).map_err(|e| {
            error!("Cannot open configuration {}: {}", path.as_ref().display(), e);
            TableError::from(e)
        })?;
        self.attach_configuration_from_source(asid, file)
    }

    /// Copies `words` into a new configuration for `asid`. The caller keeps
    /// ownership of the slice.
    pub fn attach_configuration_from_array(&mut self, asid: Asid, words: &[XLen]) -> Result<usize> {
        self.check_attach(asid)?;
        self.commit(asid, words.into())
    }

    fn check_attach(&self, asid: Asid) -> Result<()> {
        let err = match self.entries.get(asid as usize) {
            None => TableError::AsidOutOfRange {
                asid,
                size: self.size(),
            },
            Some(entry) if entry.pool.is_full() => TableError::PoolExhausted {
                asid,
                capacity: entry.num_configs(),
            },
            Some(_) => return Ok(()),
        };
        error!("{}", err);
        Err(err)
    }

    // Callers have run check_attach, so `asid` indexes an entry
    fn commit(&mut self, asid: Asid, words: Box<[XLen]>) -> Result<usize> {
        let index = asid as usize;
        let entry = &mut self.entries[index];
        let capacity = entry.num_configs();
        let len = words.len();

        let nnid = entry
            .pool
            .attach(Configuration::new(words))
            .map_err(|_| TableError::PoolExhausted { asid, capacity })?;
        debug!("ASID {} NNID {}: attached {} words", asid, nnid, len);

        self.records[index] = entry.record();
        Ok(entry.num_valid())
    }

    /// Releases every configuration, queue and record, entry by entry.
    pub fn destroy(self) -> TeardownSummary {
        let Self {
            records, entries, ..
        } = self;
        let mut summary = TeardownSummary::default();

        for entry in entries.into_vec() {
            let AsidEntry {
                pool,
                transaction_io,
            } = entry;

            summary.configurations += pool.num_valid();
            drop(pool);

            summary.queues += 2;
            drop(transaction_io);

            summary.entries += 1;
        }
        drop(records);

        debug!(
            "ASID--NNID table destroyed: {} entries, {} configurations, {} queues",
            summary.entries, summary.configurations, summary.queues
        );
        summary
    }
}

fn read_words<R: Read + Seek>(source: &mut R) -> std::io::Result<Box<[XLen]>> {
    let len = source.seek(SeekFrom::End(0))? as usize;
    source.seek(SeekFrom::Start(0))?;

    let count = words_for_bytes(len);
    // Padding of the trailing partial word stays zero
    let mut bytes = vec![0u8; count * WORD_BYTES];
    source.read_exact(&mut bytes[..len])?;

    Ok(bytes
        .chunks_exact(WORD_BYTES)
        .map(|chunk| {
            let mut word = [0u8; WORD_BYTES];
            word.copy_from_slice(chunk);
            XLen::from_ne_bytes(word)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn bytes_of(words: &[XLen]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_ne_bytes()).collect()
    }

    #[test]
    fn test_create_initializes_every_entry() {
        let table = AsidNnidTable::create(4, 3);
        assert_eq!(table.size(), 4);
        assert_eq!(table.records().len(), 4);

        for (entry, record) in table.entries().iter().zip(table.records()) {
            assert_eq!(entry.num_valid(), 0);
            assert_eq!(entry.num_configs(), 3);
            assert_eq!(entry.transaction_io.input.capacity(), 16);
            assert_eq!(entry.transaction_io.output.capacity(), 16);
            assert_eq!(*record, entry.record());
        }
    }

    #[test]
    fn test_empty_table() {
        let table = AsidNnidTable::create(0, 4);
        assert_eq!(table.size(), 0);
        assert_eq!(table.base_addr(), 0);
        assert_eq!(table.destroy(), TeardownSummary::default());
    }

    #[test]
    fn test_with_config() {
        let config = TableConfig {
            queue_capacity: 4,
            ..TableConfig::new(2, 2)
        };
        let table = AsidNnidTable::with_config(&config).unwrap();
        assert_eq!(table.queue_capacity(), 4);
        assert_eq!(table.entry(1).unwrap().transaction_io.input.capacity(), 4);

        assert!(AsidNnidTable::with_config(&TableConfig::new(70_000, 1)).is_err());
    }

    #[test]
    fn test_array_attach_updates_record() {
        let mut table = AsidNnidTable::create(2, 2);
        let base = table.base_addr();

        assert_eq!(table.attach_configuration_from_array(1, &[10, 20, 30]).unwrap(), 1);

        let record = table.records()[1];
        assert_eq!(record.num_valid, 1);
        let slot = table.entry(1).unwrap().pool.records()[0];
        assert_eq!(slot.size, 3);
        assert_eq!(slot.config, table.entry(1).unwrap().pool.get(0).unwrap().addr());

        assert_eq!(table.records()[0].num_valid, 0);
        assert_eq!(table.base_addr(), base);
    }

    #[test]
    fn test_source_attach_rounds_up() {
        let mut table = AsidNnidTable::create(1, 1);
        let source = Cursor::new(vec![0xAB_u8; 17]);

        assert_eq!(table.attach_configuration_from_source(0, source).unwrap(), 1);

        let config = table.entry(0).unwrap().pool.get(0).unwrap();
        assert_eq!(config.len(), 3);
        let last = config.words()[2].to_ne_bytes();
        assert_eq!(last[0], 0xAB);
        assert!(last[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_source_attach_preserves_words() {
        let words = [1u64, u64::MAX, 0x0123_4567_89AB_CDEF];
        let mut table = AsidNnidTable::create(1, 2);
        table
            .attach_configuration_from_source(0, Cursor::new(bytes_of(&words)))
            .unwrap();

        assert_eq!(table.entry(0).unwrap().pool.get(0).unwrap().words(), &words);
    }

    #[test]
    fn test_empty_source() {
        let mut table = AsidNnidTable::create(1, 1);
        assert_eq!(
            table.attach_configuration_from_source(0, Cursor::new(Vec::new())).unwrap(),
            1
        );
        let config = table.entry(0).unwrap().pool.get(0).unwrap();
        assert!(config.is_empty());
        assert_eq!(table.entry(0).unwrap().pool.records()[0].config, 0);
    }

    #[test]
    fn test_out_of_range_rejected_on_both_paths() {
        let mut table = AsidNnidTable::create(2, 1);

        let err = table
            .attach_configuration_from_source(2, Cursor::new(vec![1u8; 8]))
            .unwrap_err();
        assert!(err.is_range_error());

        let err = table.attach_configuration_from_array(7, &[1]).unwrap_err();
        assert!(err.is_range_error());

        assert!(table.records().iter().all(|r| r.num_valid == 0));
    }

    #[test]
    fn test_full_pool_rejected() {
        let mut table = AsidNnidTable::create(1, 1);
        table.attach_configuration_from_array(0, &[1]).unwrap();

        let err = table.attach_configuration_from_array(0, &[2]).unwrap_err();
        assert!(err.is_capacity_error());

        let err = table
            .attach_configuration_from_source(0, Cursor::new(vec![0u8; 8]))
            .unwrap_err();
        assert!(err.is_capacity_error());
        assert_eq!(table.entry(0).unwrap().num_valid(), 1);
    }

    #[test]
    fn test_missing_file_leaves_pool_untouched() {
        let mut table = AsidNnidTable::create(1, 1);
        let err = table
            .attach_configuration_from_file(0, "/nonexistent/supervisor/config.bin")
            .unwrap_err();
        assert!(matches!(err, TableError::Source(_)));
        assert_eq!(table.entry(0).unwrap().num_valid(), 0);
    }

    /// Reports `len` bytes on seek, then hands out at most `available` bytes
    /// before failing every read with `fail`
    struct FailingSource {
        len: u64,
        available: usize,
        fail: Option<std::io::ErrorKind>,
    }

    impl Read for FailingSource {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.available == 0 {
                return match self.fail {
                    Some(kind) => Err(std::io::Error::new(kind, "device went away")),
                    None => Ok(0),
                };
            }
            let n = buf.len().min(self.available);
            buf[..n].fill(0xA5);
            self.available -= n;
            Ok(n)
        }
    }

    impl Seek for FailingSource {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            Ok(match pos {
                SeekFrom::End(_) => self.len,
                _ => 0,
            })
        }
    }

    #[test]
    fn test_failing_source_leaves_pool_untouched() {
        let mut table = AsidNnidTable::create(2, 2);
        let before = table.records()[0];

        let broken = FailingSource {
            len: 16,
            available: 0,
            fail: Some(std::io::ErrorKind::Other),
        };
        let err = table.attach_configuration_from_source(0, broken).unwrap_err();
        assert!(matches!(err, TableError::Source(_)));

        // Claims 16 bytes, delivers 5, then ends
        let short = FailingSource {
            len: 16,
            available: 5,
            fail: None,
        };
        let err = table.attach_configuration_from_source(0, short).unwrap_err();
        match err {
            TableError::Source(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected a source error, got {:?}", other),
        }

        let entry = table.entry(0).unwrap();
        assert_eq!(entry.num_valid(), 0);
        assert!(entry.pool.get(0).is_none());
        assert_eq!(table.records()[0], before);

        // The slot is still free for a good source
        let nnid = table
            .attach_configuration_from_source(0, Cursor::new(bytes_of(&[7, 8])))
            .unwrap();
        assert_eq!(nnid, 1);
    }

    #[test]
    fn test_create_clamps_to_asid_space() {
        let table = AsidNnidTable::create(MAX_TABLE_SIZE + 3, 0);
        assert_eq!(table.size(), MAX_TABLE_SIZE);
        assert_eq!(table.records().len(), MAX_TABLE_SIZE);
        assert!(table.entry(Asid::MAX).is_some());
    }

    #[test]
    fn test_destroy_summary() {
        let mut table = AsidNnidTable::create(3, 2);
        table.attach_configuration_from_array(0, &[1]).unwrap();
        table.attach_configuration_from_array(0, &[2]).unwrap();
        table.attach_configuration_from_array(2, &[3]).unwrap();

        assert_eq!(
            table.destroy(),
            TeardownSummary {
                entries: 3,
                configurations: 3,
                queues: 6,
            }
        );
    }
}
