//! Probe errors.

/// Why hypercalls are unavailable on this platform.
///
/// Both cases are non-fatal: the embedding firmware keeps loading and the
/// availability query answers `false` from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The active probe strategy found no trace of a Xen hypervisor.
    Unsupported,
    /// A hypervisor answered the probe, but the CPU vendor signature is not
    /// one the gate knows a trap encoding for.
    UnknownVendor,
}
