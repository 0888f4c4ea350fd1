//! CPU vendor classification.
//!
//! Xen accepts hypercalls through VMMCALL on AMD-family parts and through
//! VMCALL on Intel-family parts. The vendor signature at leaf 0 decides
//! which encoding the gate uses.

use cpuid::{CpuidReader, VENDOR_LEAF};

/// Trap instruction encoding hypercalls with on this CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMethod {
    /// AMD-style encoding.
    VmmCall,
    /// Intel-style encoding.
    VmCall,
}

impl CallMethod {
    /// Mnemonic of the selected trap instruction.
    pub fn instruction(self) -> &'static str {
        match self {
            CallMethod::VmmCall => "vmmcall",
            CallMethod::VmCall => "vmcall",
        }
    }
}

/// Classifies a raw 12-byte vendor signature.
pub(crate) fn classify(signature: &[u8; 12]) -> Option<CallMethod> {
    match signature {
        b"AuthenticAMD" | b"HygonGenuine" => Some(CallMethod::VmmCall),
        // The Zhaoxin signature really does carry the padding spaces.
        b"GenuineIntel" | b"CentaurHauls" | b"  Shanghai  " => Some(CallMethod::VmCall),
        _ => None,
    }
}

/// Reads the vendor signature at leaf 0 and picks the call method.
///
/// The raw signature is logged whether or not it is recognized.
pub(crate) fn classify_cpu(cpu: &impl CpuidReader) -> Option<CallMethod> {
    let signature = cpuid::vendor_signature(cpu.cpuid(VENDOR_LEAF));
    match core::str::from_utf8(&signature) {
        Ok(signature) => log::info!("Detected CPU \"{}\"", signature),
        Err(_) => log::info!("Detected CPU {:02x?}", signature),
    }
    classify(&signature)
}

// ————————————————————————————————— Tests —————————————————————————————————— //

#[cfg(test)]
mod tests {
    use super::*;
    use cpuid::Registers;

    struct FixedCpu(Registers);

    impl CpuidReader for FixedCpu {
        fn cpuid(&self, _leaf: u32) -> Registers {
            self.0
        }
    }

    #[test]
    fn amd_family_uses_vmmcall() {
        for signature in [b"AuthenticAMD", b"HygonGenuine"] {
            assert_eq!(classify(signature), Some(CallMethod::VmmCall));
        }
    }

    #[test]
    fn intel_family_uses_vmcall() {
        for signature in [b"GenuineIntel", b"CentaurHauls", b"  Shanghai  "] {
            assert_eq!(classify(signature), Some(CallMethod::VmCall));
        }
    }

    #[test]
    fn zhaoxin_spacing_is_exact() {
        assert_eq!(classify(b"  Shanghai  "), Some(CallMethod::VmCall));
        assert_eq!(classify(b"Shanghai    "), None);
        assert_eq!(classify(b"  SHANGHAI  "), None);
    }

    #[test]
    fn unknown_vendors_fail() {
        for signature in [b"KVMKVMKVM\0\0\0", b"Microsoft Hv", b"############"] {
            assert_eq!(classify(signature), None);
        }
    }

    #[test]
    fn classification_reads_leaf_zero_registers() {
        // AuthenticAMD spread over EBX, EDX, ECX.
        let cpu = FixedCpu(Registers {
            eax: 0x10,
            ebx: 0x6874_7541,
            ecx: 0x444d_4163,
            edx: 0x6974_6e65,
        });
        assert_eq!(classify_cpu(&cpu), Some(CallMethod::VmmCall));
    }
}
