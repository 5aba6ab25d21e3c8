use crate::layout::{Asid, SYS_SET_ANTP, SYS_SET_ASID};
use crate::table::AsidNnidTable;
use log::{debug, info};
use parking_lot::Mutex;

/// A request handed to the privileged execution environment.
/// Arguments travel by value; nothing is read back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrivilegedCall {
    /// Make `asid` the active address space for accelerator transactions
    SetAsid { asid: Asid },
    /// Program the accelerator's table-base register
    SetAntp { base: u64, size: u64 },
}

impl PrivilegedCall {
    pub const fn opcode(&self) -> u64 {
        match self {
            Self::SetAsid { .. } => SYS_SET_ASID,
            Self::SetAntp { .. } => SYS_SET_ANTP,
        }
    }

    /// Positional arguments in transfer-register order (a0, a1)
    pub const fn args(&self) -> [u64; 2] {
        match *self {
            Self::SetAsid { asid } => [asid as u64, 0],
            Self::SetAntp { base, size } => [base, size],
        }
    }
}

/// The hosting environment's side of the privilege boundary.
///
/// `transfer` is one-way and synchronous: it returns once the environment
/// hands control back and has no error channel. Faults are the
/// environment's business.
pub trait HostEnvironment {
    fn transfer(&self, call: PrivilegedCall);
}

/// Raw `ecall` into the proxy kernel: opcode in a7, arguments in a0/a1.
#[cfg(target_arch = "riscv64")]
#[derive(Clone, Copy, Debug, Default)]
pub struct EcallHost;

#[cfg(target_arch = "riscv64")]
impl HostEnvironment for EcallHost {
    #[inline(always)]
    fn transfer(&self, call: PrivilegedCall) {
        use core::arch::asm;

        let [a0, a1] = call.args();
        unsafe {
            asm!(
                "ecall",
                inlateout("a0") a0 => _,
                in("a1") a1,
                in("a7") call.opcode(),
                options(nostack)
            );
        }
    }
}

/// Host that keeps every call it receives, in order. Stands in for the
/// privileged environment off-target and in tests.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<PrivilegedCall>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PrivilegedCall> {
        self.calls.lock().clone()
    }

    pub fn last(&self) -> Option<PrivilegedCall> {
        self.calls.lock().last().copied()
    }
}

impl HostEnvironment for RecordingHost {
    fn transfer(&self, call: PrivilegedCall) {
        self.calls.lock().push(call);
    }
}

impl<H: HostEnvironment + ?Sized> HostEnvironment for &H {
    fn transfer(&self, call: PrivilegedCall) {
        (**self).transfer(call)
    }
}

/// Supervisor-side wrappers for the two boundary-crossing calls
pub struct ControlPlane<H: HostEnvironment> {
    host: H,
}

impl<H: HostEnvironment> ControlPlane<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn select_asid(&self, asid: Asid) {
        debug!("Selecting ASID {}", asid);
        self.host.transfer(PrivilegedCall::SetAsid { asid });
    }

    /// Points the accelerator at `table`. The accelerator keeps using the
    /// address until another table is installed, so the table must outlive
    /// that window.
    pub fn install_table(&self, table: &AsidNnidTable) {
        let base = table.base_addr();
        let size = table.size() as u64;
        info!("Installing ASID--NNID table at 0x{:x} ({} entries)", base, size);
        self.host.transfer(PrivilegedCall::SetAntp { base, size });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_encoding() {
        let select = PrivilegedCall::SetAsid { asid: 7 };
        assert_eq!(select.opcode(), 1337);
        assert_eq!(select.args(), [7, 0]);

        let install = PrivilegedCall::SetAntp {
            base: 0x8000_1000,
            size: 4,
        };
        assert_eq!(install.opcode(), 1338);
        assert_eq!(install.args(), [0x8000_1000, 4]);
    }

    #[test]
    fn test_select_asid() {
        let plane = ControlPlane::new(RecordingHost::new());
        plane.select_asid(3);
        plane.select_asid(0);

        assert_eq!(
            plane.host().calls(),
            vec![
                PrivilegedCall::SetAsid { asid: 3 },
                PrivilegedCall::SetAsid { asid: 0 },
            ]
        );
    }

    #[test]
    fn test_install_table_passes_base_and_size() {
        let host = RecordingHost::new();
        let plane = ControlPlane::new(&host);
        let table = AsidNnidTable::create(5, 2);

        plane.install_table(&table);

        assert_eq!(
            host.last(),
            Some(PrivilegedCall::SetAntp {
                base: table.base_addr(),
                size: 5,
            })
        );
        assert_ne!(table.base_addr(), 0);
    }
}
