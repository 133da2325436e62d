//! N/Z/C/V condition flags and their CPSR packing.

/// CPSR bit for negative result (bit 31).
pub const CPSR_N: u32 = 1 << 31;
/// CPSR bit for zero result (bit 30).
pub const CPSR_Z: u32 = 1 << 30;
/// CPSR bit for carry/not-borrow (bit 29).
pub const CPSR_C: u32 = 1 << 29;
/// CPSR bit for signed overflow (bit 28).
pub const CPSR_V: u32 = 1 << 28;
/// Mask of the condition-flag bits modeled by the core.
pub const CPSR_FLAGS_MASK: u32 = CPSR_N | CPSR_Z | CPSR_C | CPSR_V;

/// The four ARM condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct Flags {
    /// Negative.
    pub n: bool,
    /// Zero.
    pub z: bool,
    /// Carry.
    pub c: bool,
    /// Overflow.
    pub v: bool,
}

impl Flags {
    /// Builds a flag set from individual bits.
    #[must_use]
    pub const fn new(n: bool, z: bool, c: bool, v: bool) -> Self {
        Self { n, z, c, v }
    }

    /// Packs the flags into the CPSR layout; every other bit is zero.
    #[must_use]
    pub const fn to_cpsr(self) -> u32 {
        let mut word = 0;
        if self.n {
            word |= CPSR_N;
        }
        if self.z {
            word |= CPSR_Z;
        }
        if self.c {
            word |= CPSR_C;
        }
        if self.v {
            word |= CPSR_V;
        }
        word
    }

    /// Unpacks flags from a CPSR word, ignoring bits outside [`CPSR_FLAGS_MASK`].
    #[must_use]
    pub const fn from_cpsr(word: u32) -> Self {
        Self {
            n: word & CPSR_N != 0,
            z: word & CPSR_Z != 0,
            c: word & CPSR_C != 0,
            v: word & CPSR_V != 0,
        }
    }

    /// Sets N and Z from a 32-bit result, leaving C and V alone.
    pub const fn set_nz(&mut self, result: u32) {
        self.n = result & CPSR_N != 0;
        self.z = result == 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{Flags, CPSR_C, CPSR_FLAGS_MASK, CPSR_N, CPSR_V, CPSR_Z};
    use proptest::prelude::*;

    #[test]
    fn each_flag_lands_on_its_cpsr_bit() {
        assert_eq!(Flags::new(true, false, false, false).to_cpsr(), CPSR_N);
        assert_eq!(Flags::new(false, true, false, false).to_cpsr(), CPSR_Z);
        assert_eq!(Flags::new(false, false, true, false).to_cpsr(), CPSR_C);
        assert_eq!(Flags::new(false, false, false, true).to_cpsr(), CPSR_V);
        assert_eq!(Flags::default().to_cpsr(), 0);
    }

    #[test]
    fn unpack_of_pack_is_identity_for_all_sixteen_combinations() {
        for bits in 0u8..16 {
            let flags = Flags::new(
                bits & 0b1000 != 0,
                bits & 0b0100 != 0,
                bits & 0b0010 != 0,
                bits & 0b0001 != 0,
            );
            assert_eq!(Flags::from_cpsr(flags.to_cpsr()), flags);
        }
    }

    #[test]
    fn set_nz_tracks_sign_and_zero_only() {
        let mut flags = Flags::new(false, false, true, true);
        flags.set_nz(0);
        assert_eq!(flags, Flags::new(false, true, true, true));

        flags.set_nz(0x8000_0000);
        assert_eq!(flags, Flags::new(true, false, true, true));
    }

    proptest! {
        #[test]
        fn pack_of_unpack_keeps_only_flag_bits(word in any::<u32>()) {
            prop_assert_eq!(Flags::from_cpsr(word).to_cpsr(), word & CPSR_FLAGS_MASK);
        }
    }
}
