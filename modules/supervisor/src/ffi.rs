// C ABI for supervisors written in C. Attach calls return the new valid
// count for the ASID or -1; the reason is logged.

use crate::diagnostics;
use crate::error::{Result, ERROR_SENTINEL};
use crate::layout::{Asid, XLen};
use crate::table::AsidNnidTable;
use log::error;
use std::ffi::{c_char, c_int, CStr};

// Counts past c_int::MAX saturate so they never read as the sentinel
fn status(result: Result<usize>) -> c_int {
    match result {
        Ok(count) => c_int::try_from(count).unwrap_or(c_int::MAX),
        Err(err) => err.sentinel(),
    }
}

/// Route the crate's log lines to stderr. A no-op if a logger is already set.
#[no_mangle]
pub extern "C" fn supervisor_init_logging() {
    crate::init_logging();
}

/// Build a table; release it with `supervisor_table_destroy`.
/// Installs the console logger unless the host already set one.
#[no_mangle]
pub extern "C" fn supervisor_table_create(
    table_size: usize,
    configs_per_entry: usize,
) -> *mut AsidNnidTable {
    crate::init_logging();
    Box::into_raw(Box::new(AsidNnidTable::create(table_size, configs_per_entry)))
}

/// # Safety
/// `table` must come from `supervisor_table_create` and not be used again.
#[no_mangle]
pub unsafe extern "C" fn supervisor_table_destroy(table: *mut AsidNnidTable) {
    if table.is_null() {
        return;
    }
    Box::from_raw(table).destroy();
}

/// # Safety
/// `table` must be a live table; `file_name` a NUL-terminated path.
#[no_mangle]
pub unsafe extern "C" fn supervisor_attach_file(
    table: *mut AsidNnidTable,
    asid: Asid,
    file_name: *const c_char,
) -> c_int {
    let Some(table) = table.as_mut() else {
        return ERROR_SENTINEL;
    };
    if file_name.is_null() {
        error!("Cannot append configuration: no file name");
        return ERROR_SENTINEL;
    }
    let Ok(path) = CStr::from_ptr(file_name).to_str() else {
        error!("Cannot append configuration: file name is not UTF-8");
        return ERROR_SENTINEL;
    };
    status(table.attach_configuration_from_file(asid, path))
}

/// # Safety
/// `table` must be a live table; `array` must point at `size` words (or be
/// null with `size == 0`). The words are copied.
#[no_mangle]
pub unsafe extern "C" fn supervisor_attach_array(
    table: *mut AsidNnidTable,
    asid: Asid,
    array: *const XLen,
    size: usize,
) -> c_int {
    let Some(table) = table.as_mut() else {
        return ERROR_SENTINEL;
    };
    let words = if size == 0 {
        &[][..]
    } else if array.is_null() {
        error!("Cannot append configuration: null array of {} words", size);
        return ERROR_SENTINEL;
    } else {
        std::slice::from_raw_parts(array, size)
    };
    status(table.attach_configuration_from_array(asid, words))
}

/// # Safety
/// `table` must be a live table or null.
#[no_mangle]
pub unsafe extern "C" fn supervisor_table_describe(table: *const AsidNnidTable) {
    if let Some(table) = table.as_ref() {
        diagnostics::dump(table);
    }
}

#[cfg(target_arch = "riscv64")]
#[no_mangle]
pub extern "C" fn supervisor_set_asid(asid: Asid) {
    crate::control::ControlPlane::new(crate::control::EcallHost).select_asid(asid);
}

/// # Safety
/// `table` must be a fully constructed live table.
#[cfg(target_arch = "riscv64")]
#[no_mangle]
pub unsafe extern "C" fn supervisor_set_antp(table: *const AsidNnidTable) {
    if let Some(table) = table.as_ref() {
        crate::control::ControlPlane::new(crate::control::EcallHost).install_table(table);
    }
}
