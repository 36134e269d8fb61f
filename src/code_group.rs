//! Ten-bit code-groups, running disparity and the special code set of IEEE 802.3 Clause 36.

use defmt_or_log::derive_format_or_debug;
use num_enum::TryFromPrimitive;

/// `/D0.0/`, the sentinel that follows a configuration ordered set in an early-end pattern.
pub const D0_0: u8 = 0x00;
/// `/D2.2/`, second code-group of `/C2/`.
pub const D2_2: u8 = 0x42;
/// `/D5.6/`, second code-group of `/I1/`.
pub const D5_6: u8 = 0xc5;
/// `/D6.5/`, second code-group of `/LI1/`.
pub const D6_5: u8 = 0xa6;
/// `/D16.2/`, second code-group of `/I2/`.
pub const D16_2: u8 = 0x50;
/// `/D21.5/`, second code-group of `/C1/`.
pub const D21_5: u8 = 0xb5;
/// `/D26.4/`, second code-group of `/LI2/`.
pub const D26_4: u8 = 0x9a;

/// Running disparity of a code-group stream.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum Disparity {
    /// RD-, more zeros than ones sent so far.
    Negative,
    /// RD+, more ones than zeros sent so far.
    Positive,
}

impl Disparity {
    /// The running disparity after `cg` has passed with `self` as the current disparity.
    ///
    /// More than five ones leaves the line positive, fewer than five leaves it negative and a
    /// balanced code-group keeps the current disparity.
    pub const fn after(self, cg: CodeGroup) -> Self {
        match cg.ones() {
            0..=4 => Disparity::Negative,
            5 => self,
            _ => Disparity::Positive,
        }
    }

    /// The opposite disparity.
    pub const fn flip(self) -> Self {
        match self {
            Disparity::Negative => Disparity::Positive,
            Disparity::Positive => Disparity::Negative,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Disparity::Negative => 0,
            Disparity::Positive => 1,
        }
    }
}

/// A 10-bit transmission code-group.
///
/// Bit 9 holds `a`, the first bit on the line, and bit 0 holds `j`, i.e. the value reads
/// `abcdei fghj` from the most significant bit.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct CodeGroup(u16);

impl CodeGroup {
    const MASK: u16 = (1 << 10) - 1;

    /// The all-zero code-group, never a valid symbol.
    pub const ZERO: Self = Self(0);
    /// `/K28.5/` as sent with negative running disparity.
    pub const COMMA_NEGATIVE: Self = Self(0b001111_1010);
    /// `/K28.5/` as sent with positive running disparity.
    pub const COMMA_POSITIVE: Self = Self(0b110000_0101);

    /// Create a code-group. This truncates the inputted `u16` to 10 bits.
    pub const fn new(bits: u16) -> Self {
        Self(bits & Self::MASK)
    }

    /// The comma expected on the line for the given running disparity.
    pub const fn comma(rd: Disparity) -> Self {
        match rd {
            Disparity::Negative => Self::COMMA_NEGATIVE,
            Disparity::Positive => Self::COMMA_POSITIVE,
        }
    }

    /// Raw 10-bit value.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Number of ones in the code-group.
    pub const fn ones(self) -> u32 {
        self.0.count_ones()
    }

    /// Hamming distance to another code-group.
    pub const fn distance(self, other: CodeGroup) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Either disparity variant of `/K28.5/`.
    pub const fn is_comma(self) -> bool {
        self.0 == Self::COMMA_NEGATIVE.0 || self.0 == Self::COMMA_POSITIVE.0
    }
}

impl From<CodeGroup> for u16 {
    fn from(value: CodeGroup) -> Self {
        value.0
    }
}

/// The special code-groups valid in 1000BASE-X.
#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum ControlCode {
    K28_0 = 0x1c,
    K28_1 = 0x3c,
    K28_2 = 0x5c,
    K28_3 = 0x7c,
    K28_4 = 0x9c,
    /// Comma.
    K28_5 = 0xbc,
    K28_6 = 0xdc,
    K28_7 = 0xfc,
    /// `/R/`, carrier extend.
    K23_7 = 0xf7,
    /// `/S/`, start of packet.
    K27_7 = 0xfb,
    /// `/T/`, end of packet.
    K29_7 = 0xfd,
    /// `/V/`, error propagation.
    K30_7 = 0xfe,
}

impl ControlCode {
    pub const COMMA: Self = Self::K28_5;
    pub const CARRIER_EXTEND: Self = Self::K23_7;
    pub const START_OF_PACKET: Self = Self::K27_7;
    pub const END_OF_PACKET: Self = Self::K29_7;
    pub const ERROR_PROPAGATION: Self = Self::K30_7;

    /// The octet this special code carries.
    pub const fn octet(self) -> u8 {
        self as u8
    }
}

/// Printable `Dx.y` / `Kx.y` name of an octet.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct OctetName {
    pub value: u8,
    pub is_control: bool,
}

impl OctetName {
    pub const fn data(value: u8) -> Self {
        Self {
            value,
            is_control: false,
        }
    }

    pub const fn control(code: ControlCode) -> Self {
        Self {
            value: code.octet(),
            is_control: true,
        }
    }

    fn prefix(&self) -> &'static str {
        if self.is_control {
            "K"
        } else {
            "D"
        }
    }

    /// The `x` in `Dx.y`, i.e. `EDCBA`.
    pub const fn x(&self) -> u8 {
        self.value & 0x1f
    }

    /// The `y` in `Dx.y`, i.e. `HGF`.
    pub const fn y(&self) -> u8 {
        self.value >> 5
    }
}

impl core::fmt::Display for OctetName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}.{}", self.prefix(), self.x(), self.y())
    }
}

impl core::fmt::Debug for OctetName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for OctetName {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}{=u8}.{=u8}", self.prefix(), self.x(), self.y())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn disparity_follows_bit_count() {
        for bits in 0..1024u16 {
            let cg = CodeGroup::new(bits);
            for rd in [Disparity::Negative, Disparity::Positive] {
                let next = rd.after(cg);
                match cg.ones() {
                    n if n > 5 => assert_eq!(next, Disparity::Positive),
                    n if n < 5 => assert_eq!(next, Disparity::Negative),
                    _ => assert_eq!(next, rd),
                }
            }
        }
    }

    #[test]
    fn comma_variants_are_complements() {
        assert_eq!(
            CodeGroup::COMMA_NEGATIVE.distance(CodeGroup::COMMA_POSITIVE),
            10
        );
        assert!(CodeGroup::comma(Disparity::Positive).is_comma());
        assert!(!CodeGroup::new(0b001111_1011).is_comma());
    }

    #[test]
    fn control_codes_from_octets() {
        assert_eq!(ControlCode::try_from(0xbc_u8).ok(), Some(ControlCode::K28_5));
        assert_eq!(
            ControlCode::try_from(0xfb_u8).ok(),
            Some(ControlCode::START_OF_PACKET)
        );
        assert!(ControlCode::try_from(0x00_u8).is_err());
        assert!(ControlCode::try_from(0xfa_u8).is_err());
    }

    #[test]
    fn octet_names() {
        assert_eq!("K28.5", OctetName::control(ControlCode::COMMA).to_string());
        assert_eq!("D21.5", OctetName::data(D21_5).to_string());
        assert_eq!("D16.2", OctetName::data(D16_2).to_string());
        assert_eq!("D26.4", OctetName::data(D26_4).to_string());
        assert_eq!("K23.7", OctetName::control(ControlCode::CARRIER_EXTEND).to_string());
    }
}
