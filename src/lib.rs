//! Xen hypercall gate.
//!
//! This crate detects whether the platform runs as a guest under the Xen
//! hypervisor and, if so, exposes the two-argument hypercall primitive that
//! higher-level firmware drivers use to talk to Xen. Detection runs exactly
//! once; its outcome is final for the lifetime of the process.
//!
//! Two detection strategies exist, selected at build time:
//! - `probe-cpuid` (default): scan the reserved hypervisor CPUID leaf range
//!   for the Xen signature;
//! - `probe-handoff`: look for the Xen info record in the boot hand-off
//!   list supplied by the platform.
//!
//! Callers are expected to gate all hypercall use on [`is_available`]:
//!
//! ```ignore
//! xen_hypercall::init();
//! if xen_hypercall::is_available() {
//!     let version = xen_hypercall::hypercall2(
//!         abi::HypercallId::XenVersion.into(),
//!         0, // XENVER_version
//!         0,
//!     );
//! }
//! ```
//!
//! A failed probe is not an error for the embedding firmware: `init` never
//! panics, and every entry point stays callable with `is_available`
//! answering `false`.
#![cfg_attr(not(test), no_std)]

pub mod abi;
mod error;
mod gate;
mod probe;
mod raw;
mod vendor;

pub use cpuid::{CpuidReader, HwCpuid};
pub use error::InitError;
pub use gate::XenGate;
pub use handoff::{HandoffList, Record, RecordId};
pub use probe::{CpuidScan, HandoffLookup, XenProbe, XEN_INFO_RECORD, XEN_SIGNATURE};
pub use vendor::CallMethod;

use log::LevelFilter;
use spin::Once;

#[cfg(all(feature = "probe-cpuid", feature = "probe-handoff"))]
compile_error!("features `probe-cpuid` and `probe-handoff` are mutually exclusive");

const LOG_LEVEL: LevelFilter = LevelFilter::Info;

// ———————————————————————————————— Gate Cell ——————————————————————————————— //

/// Once-cell holding the outcome of the platform probe.
///
/// This is the explicit-state form of the gate: embedders that want to
/// thread state themselves can own a `GateCell` (or a plain [`XenGate`])
/// instead of going through the process-wide entry points below.
pub struct GateCell {
    outcome: Once<Result<XenGate, InitError>>,
}

impl GateCell {
    pub const fn new() -> Self {
        Self {
            outcome: Once::new(),
        }
    }

    /// Resolves the cell on first call; later calls return the cached
    /// outcome without re-probing.
    pub fn init_with(
        &self,
        probe: impl FnOnce() -> Result<XenGate, InitError>,
    ) -> Result<(), InitError> {
        match self.outcome.call_once(probe) {
            Ok(_) => Ok(()),
            Err(err) => Err(*err),
        }
    }

    /// True iff the probe resolved and hypercalls can be issued.
    pub fn is_available(&self) -> bool {
        matches!(self.outcome.get(), Some(Ok(_)))
    }

    /// The resolved gate, if any.
    pub fn gate(&self) -> Option<&XenGate> {
        match self.outcome.get() {
            Some(Ok(gate)) => Some(gate),
            _ => None,
        }
    }

    /// Dispatches through the resolved gate.
    ///
    /// Issuing a hypercall while the cell is unresolved or unavailable is a
    /// caller contract violation. It is kept well-defined rather than
    /// trapping into an absent hypervisor: the violation is logged and
    /// answered with `-ENOSYS`.
    #[cfg(target_arch = "x86_64")]
    pub fn hypercall2(&self, op: usize, arg1: isize, arg2: isize) -> isize {
        match self.gate() {
            Some(gate) => gate.hypercall2(op, arg1, arg2),
            None => {
                log::error!("Hypercall {:#x} issued while hypercalls are unavailable", op);
                -abi::ENOSYS
            }
        }
    }
}

impl Default for GateCell {
    fn default() -> Self {
        Self::new()
    }
}

static GATE: GateCell = GateCell::new();

// —————————————————————————— Firmware Entry Points ————————————————————————— //

/// One-time platform probe, CPUID strategy.
///
/// Installs the serial logger, scans the hypervisor CPUID leaf range for
/// Xen, and classifies the CPU vendor. The returned value only matters for
/// diagnostics; callers must gate hypercall use on [`is_available`], not on
/// this result.
#[cfg(all(target_arch = "x86_64", feature = "probe-cpuid"))]
pub fn init() -> Result<(), InitError> {
    GATE.init_with(|| {
        logger::init(LOG_LEVEL);
        let outcome = XenGate::probe(&CpuidScan::new(HwCpuid), &HwCpuid);
        report(&outcome);
        outcome
    })
}

/// One-time platform probe, hand-off strategy.
///
/// Same contract as the CPUID variant, but Xen presence is decided by the
/// boot hand-off record list instead of CPUID.
#[cfg(all(target_arch = "x86_64", feature = "probe-handoff"))]
pub fn init(records: &HandoffList) -> Result<(), InitError> {
    GATE.init_with(|| {
        logger::init(LOG_LEVEL);
        let outcome = XenGate::probe(&HandoffLookup::new(records), &HwCpuid);
        report(&outcome);
        outcome
    })
}

#[cfg(target_arch = "x86_64")]
fn report(outcome: &Result<XenGate, InitError>) {
    match outcome {
        Ok(gate) => log::info!("Xen hypercalls available, using {}", gate.method().instruction()),
        Err(err) => log::info!("Xen hypercalls unavailable: {:?}", err),
    }
}

/// Whether hypercalls can be issued.
///
/// Answers `false` until [`init`] resolves successfully, then `true` for
/// the rest of the process lifetime.
pub fn is_available() -> bool {
    GATE.is_available()
}

/// Issues hypercall `op` through the process-wide gate.
///
/// See [`XenGate::hypercall2`] for the contract, and [`GateCell::hypercall2`]
/// for the behavior when called without a successful [`init`].
#[cfg(target_arch = "x86_64")]
pub fn hypercall2(op: usize, arg1: isize, arg2: isize) -> isize {
    GATE.hypercall2(op, arg1, arg2)
}

// ————————————————————————————————— Tests —————————————————————————————————— //
