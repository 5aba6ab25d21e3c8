//! Table diagnostics
//!
//! Responsibilities:
//! 1. Describe: render every record address and value, walking
//!    table -> entries -> pool slots -> I/O pair -> queues.
//! 2. Audit: check that each accelerator-visible record still mirrors the
//!    Rust-side owner it was built from.

use crate::layout::{addr_of, slice_addr, IoRecord, QueueRecord};
use crate::queue::TransactionQueue;
use crate::table::AsidNnidTable;
use log::{info, warn};
use std::fmt::{self, Write};
use std::mem::offset_of;

pub fn describe<W: Write>(table: &AsidNnidTable, out: &mut W) -> fmt::Result {
    writeln!(out, "0x{:x} <- Table Head", addr_of(table))?;
    writeln!(out, "  |-> size:                     0x{:x}", table.size())?;
    writeln!(out, "      * entry:                  0x{:x}", table.base_addr())?;

    for (i, (entry, record)) in table.entries().iter().zip(table.records()).enumerate() {
        writeln!(
            out,
            "        |-> [{}] 0x{:x}: num_configs:    0x{:x}",
            i,
            addr_of(&record.num_configs),
            record.num_configs
        )?;
        writeln!(
            out,
            "        |       0x{:x}: num_valid:      0x{:x}",
            addr_of(&record.num_valid),
            record.num_valid
        )?;
        writeln!(
            out,
            "        |       0x{:x}: asid_nnid:      0x{:x}",
            addr_of(&record.asid_nnid),
            record.asid_nnid
        )?;

        for (j, slot) in entry.pool.records()[..entry.num_valid()].iter().enumerate() {
            writeln!(
                out,
                "        |         |-> [{}] 0x{:x}: size:     0x{:x}",
                j,
                addr_of(&slot.size),
                slot.size
            )?;
            writeln!(
                out,
                "        |         |       0x{:x}: * config: 0x{:x}",
                addr_of(&slot.config),
                slot.config
            )?;
        }

        let io = entry.transaction_io.record();
        let io_addr = entry.transaction_io.record_addr();
        writeln!(
            out,
            "        |       0x{:x}: transaction_io: 0x{:x}",
            addr_of(&record.transaction_io),
            record.transaction_io
        )?;
        writeln!(
            out,
            "        |         |-> 0x{:x}: header:   0x{:x}",
            io_addr + offset_of!(IoRecord, header) as u64,
            io.header
        )?;
        writeln!(
            out,
            "        |         |   0x{:x}: * input:  0x{:x}",
            io_addr + offset_of!(IoRecord, input) as u64,
            io.input
        )?;
        describe_queue(out, &entry.transaction_io.input)?;
        writeln!(
            out,
            "        |         |   0x{:x}: * output: 0x{:x}",
            io_addr + offset_of!(IoRecord, output) as u64,
            io.output
        )?;
        describe_queue(out, &entry.transaction_io.output)?;
    }
    Ok(())
}

fn describe_queue<W: Write>(out: &mut W, queue: &TransactionQueue) -> fmt::Result {
    let q = queue.record();
    let base = queue.record_addr();
    for (name, offset, value) in [
        ("* data", offset_of!(QueueRecord, data), q.data),
        ("size", offset_of!(QueueRecord, size), q.size),
        ("head", offset_of!(QueueRecord, head), q.head),
        ("tail", offset_of!(QueueRecord, tail), q.tail),
    ] {
        writeln!(
            out,
            "        |         |     0x{:x}: {:<7} 0x{:x}",
            base + offset as u64,
            format!("{}:", name),
            value
        )?;
    }
    Ok(())
}

/// Emit `describe` through the logger, one line per record field
pub fn dump(table: &AsidNnidTable) {
    let mut text = String::new();
    if describe(table, &mut text).is_err() {
        return;
    }
    for line in text.lines() {
        info!("{}", line);
    }
}

/// Scan the table for records that drifted from their owners
pub fn verify_layout(table: &AsidNnidTable) -> Result<(), String> {
    if table.records().len() != table.size() {
        return Err(format!(
            "Record array holds {} rows for {} ASIDs",
            table.records().len(),
            table.size()
        ));
    }
    if table.base_addr() != slice_addr(table.records()) {
        return Err("Table base address does not match the record array".to_string());
    }

    for (asid, (entry, record)) in table.entries().iter().zip(table.records()).enumerate() {
        if *record != entry.record() {
            return Err(format!(
                "ASID {}: entry record {:?} does not mirror its owner {:?}",
                asid,
                record,
                entry.record()
            ));
        }
        if entry.num_valid() > entry.num_configs() {
            return Err(format!(
                "ASID {}: {} valid configurations exceed capacity {}",
                asid,
                entry.num_valid(),
                entry.num_configs()
            ));
        }

        for (nnid, slot) in entry.pool.records().iter().enumerate() {
            let (size, addr) = match entry.pool.get(nnid) {
                Some(config) => (config.len() as u64, config.addr()),
                None => (0, 0),
            };
            if slot.size != size || slot.config != addr {
                return Err(format!(
                    "ASID {} NNID {}: slot {:?} does not match its configuration",
                    asid, nnid, slot
                ));
            }
        }

        let io = entry.transaction_io.record();
        if io.input != entry.transaction_io.input.record_addr()
            || io.output != entry.transaction_io.output.record_addr()
        {
            return Err(format!("ASID {}: I/O record lost a queue", asid));
        }
        for queue in [&entry.transaction_io.input, &entry.transaction_io.output] {
            if !queue.cursors_in_bounds() {
                warn!("ASID {}: queue cursors outside their buffer", asid);
                return Err(format!(
                    "ASID {}: queue cursors {:?} outside their buffer",
                    asid,
                    queue.record()
                ));
            }
        }
    }
    Ok(())
}
