//! Xen presence probes.
//!
//! Two interchangeable strategies answer the same question: is this platform
//! hosted by Xen? Both are always compiled and tested; which one backs the
//! firmware entry point is a build-time choice (see the crate features).

use cpuid::CpuidReader;
use handoff::{HandoffList, RecordId};

/// Signature Xen publishes in the hypervisor CPUID leaf range.
pub const XEN_SIGNATURE: [u8; 12] = *b"XenVMMXenVMM";

/// Identifier of the hand-off record a Xen-aware boot stage publishes.
pub const XEN_INFO_RECORD: RecordId = RecordId::new(
    0xd3b4_6f3b,
    0xd441,
    0x1244,
    [0x9a, 0x12, 0x00, 0x12, 0x27, 0x3f, 0xc1, 0x4d],
);

/// End of the scanned hypervisor leaf range (exclusive).
const HYPERVISOR_LEAF_END: u32 = 0x4001_0000;

/// Hypervisors surface their leaf groups at 0x100-aligned offsets.
const HYPERVISOR_LEAF_STEP: u32 = 0x100;

/// A strategy deciding whether the platform is a Xen guest.
pub trait XenProbe {
    /// Returns true iff a Xen hypervisor hosts this platform.
    fn detect(&self) -> bool;
}

// —————————————————————————————— CPUID Scan ———————————————————————————————— //

/// Detects Xen by scanning the reserved CPUID leaf range for its signature.
pub struct CpuidScan<C> {
    cpu: C,
}

impl<C: CpuidReader> CpuidScan<C> {
    pub const fn new(cpu: C) -> Self {
        Self { cpu }
    }

    /// Returns the first leaf answering with the Xen signature, if any.
    ///
    /// Xen places its leaf group at 0x4000_0000 unless the platform moved it
    /// to leave room for another hypervisor interface, so the whole range is
    /// walked in 0x100 steps. The scan stops at the first match.
    pub fn xen_leaf(&self) -> Option<u32> {
        (cpuid::HYPERVISOR_LEAF_BASE..HYPERVISOR_LEAF_END)
            .step_by(HYPERVISOR_LEAF_STEP as usize)
            .find(|&leaf| cpuid::hypervisor_signature(self.cpu.cpuid(leaf)) == XEN_SIGNATURE)
    }
}

impl<C: CpuidReader> XenProbe for CpuidScan<C> {
    fn detect(&self) -> bool {
        self.xen_leaf().is_some()
    }
}

// ———————————————————————————— Hand-off Lookup ————————————————————————————— //

/// Detects Xen by the presence of the Xen info record in the boot hand-off
/// list, independently of CPUID.
pub struct HandoffLookup<'a> {
    records: &'a HandoffList<'a>,
}

impl<'a> HandoffLookup<'a> {
    pub const fn new(records: &'a HandoffList<'a>) -> Self {
        Self { records }
    }
}

impl XenProbe for HandoffLookup<'_> {
    fn detect(&self) -> bool {
        self.records.contains(XEN_INFO_RECORD)
    }
}

// ————————————————————————————————— Tests —————————————————————————————————— //

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use cpuid::Registers;
    use handoff::Record;

    /// A synthetic CPU answering with the Xen signature on the given leaves
    /// and counting how many leaves were queried.
    struct ScriptedCpu {
        xen_leaves: &'static [u32],
        queried: Cell<u32>,
    }

    impl ScriptedCpu {
        fn new(xen_leaves: &'static [u32]) -> Self {
            Self {
                xen_leaves,
                queried: Cell::new(0),
            }
        }
    }

    impl CpuidReader for ScriptedCpu {
        fn cpuid(&self, leaf: u32) -> Registers {
            self.queried.set(self.queried.get() + 1);
            if self.xen_leaves.contains(&leaf) {
                // "XenV", "MMXe", "nVMM" in EBX, ECX, EDX.
                Registers {
                    eax: leaf + 2,
                    ebx: 0x566e_6558,
                    ecx: 0x6558_4d4d,
                    edx: 0x4d4d_566e,
                }
            } else {
                Registers {
                    eax: 0,
                    ebx: 0,
                    ecx: 0,
                    edx: 0,
                }
            }
        }
    }

    #[test]
    fn scan_finds_displaced_leaf_group() {
        let cpu = ScriptedCpu::new(&[0x4000_0300]);
        let scan = CpuidScan::new(cpu);
        assert_eq!(scan.xen_leaf(), Some(0x4000_0300));
        assert!(scan.detect());
    }

    #[test]
    fn scan_stops_at_first_match() {
        let cpu = ScriptedCpu::new(&[0x4000_0300, 0x4000_0700]);
        let scan = CpuidScan::new(cpu);
        assert_eq!(scan.xen_leaf(), Some(0x4000_0300));
        // Leaves 0x4000_0000 through 0x4000_0300 and nothing beyond.
        assert_eq!(scan.cpu.queried.get(), 4);
    }

    #[test]
    fn scan_covers_whole_range_on_miss() {
        let cpu = ScriptedCpu::new(&[]);
        let scan = CpuidScan::new(cpu);
        assert_eq!(scan.xen_leaf(), None);
        assert!(!scan.detect());
        // 0x4000_0000 up to (not including) 0x4001_0000, in 0x100 steps.
        assert_eq!(scan.cpu.queried.get(), 256);
    }

    #[test]
    fn scan_ignores_leaves_outside_the_range() {
        let cpu = ScriptedCpu::new(&[0x4001_0000]);
        let scan = CpuidScan::new(cpu);
        assert_eq!(scan.xen_leaf(), None);
    }

    #[test]
    fn handoff_record_present() {
        let records = [Record {
            id: XEN_INFO_RECORD,
            payload: &[],
        }];
        let list = HandoffList::new(&records);
        assert!(HandoffLookup::new(&list).detect());
    }

    #[test]
    fn handoff_record_absent() {
        let other = RecordId::new(1, 2, 3, [4; 8]);
        let records = [Record {
            id: other,
            payload: &[0xff],
        }];
        let list = HandoffList::new(&records);
        assert!(!HandoffLookup::new(&list).detect());

        let empty = HandoffList::empty();
        assert!(!HandoffLookup::new(&empty).detect());
    }
}
