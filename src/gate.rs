//! The hypercall gate.

use cpuid::CpuidReader;

use crate::error::InitError;
use crate::probe::XenProbe;
#[cfg(target_arch = "x86_64")]
use crate::raw::HwTraps;
use crate::raw::TrapRoutines;
use crate::vendor::{self, CallMethod};

/// A resolved hypercall configuration.
///
/// A value of this type only exists if the platform probe found Xen and the
/// CPU vendor is one the gate knows a trap encoding for. Holding a `XenGate`
/// is therefore the availability proof: dispatch reads `&self` instead of
/// consulting process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XenGate {
    method: CallMethod,
}

impl XenGate {
    /// Runs the platform probe and vendor classification.
    ///
    /// Never panics: every failure maps to an [`InitError`] so the embedding
    /// firmware keeps loading on non-Xen platforms.
    pub fn probe(probe: &impl XenProbe, cpu: &impl CpuidReader) -> Result<XenGate, InitError> {
        if !probe.detect() {
            return Err(InitError::Unsupported);
        }
        match vendor::classify_cpu(cpu) {
            Some(method) => Ok(XenGate { method }),
            None => Err(InitError::UnknownVendor),
        }
    }

    /// Trap encoding the probe resolved to.
    pub fn method(&self) -> CallMethod {
        self.method
    }

    /// Issues hypercall `op` with two arguments.
    ///
    /// Returns the hypervisor's result verbatim: 0 on success, a negative
    /// Xen error number otherwise. The call traps synchronously and blocks
    /// until the hypervisor returns.
    #[cfg(target_arch = "x86_64")]
    pub fn hypercall2(&self, op: usize, arg1: isize, arg2: isize) -> isize {
        self.dispatch::<HwTraps>(op, arg1, arg2)
    }

    fn dispatch<T: TrapRoutines>(&self, op: usize, arg1: isize, arg2: isize) -> isize {
        // SAFETY: the probe picked the encoding this CPU supports, and a
        // resolved gate implies a hypervisor is listening on it.
        match self.method {
            CallMethod::VmmCall => unsafe { T::vmmcall2(op, arg1, arg2) },
            CallMethod::VmCall => unsafe { T::vmcall2(op, arg1, arg2) },
        }
    }

    #[cfg(test)]
    pub(crate) fn with_method(method: CallMethod) -> Self {
        XenGate { method }
    }
}

// ————————————————————————————————— Tests —————————————————————————————————— //
