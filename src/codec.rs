//! Disparity-coded 8B/10B line codec.
//!
//! The codec is a pure function of the octet (or code-group) and the current running disparity.
//! [`Encoder`] and [`Decoder`] wrap it with the running disparity register of one direction.

use crate::code_group::{CodeGroup, ControlCode, Disparity};
use defmt_or_log::{derive_format_or_debug, trace};

mod tables;

use tables::{CONTROL, DECODE, ENCODE, VALID};

/// Encoding failure.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The control octet has no special code-group.
    UnmappedControl(u8),
}

/// Encode an octet as a data or control code-group, returning the code-group and the running
/// disparity after it.
pub fn encode(
    octet: u8,
    is_control: bool,
    rd: Disparity,
) -> Result<(CodeGroup, Disparity), EncodeError> {
    if is_control {
        let code =
            ControlCode::try_from(octet).map_err(|_| EncodeError::UnmappedControl(octet))?;
        Ok(encode_control(code, rd))
    } else {
        Ok(encode_data(octet, rd))
    }
}

/// Encode a data octet. Every octet has a data code-group.
pub fn encode_data(octet: u8, rd: Disparity) -> (CodeGroup, Disparity) {
    let cg = CodeGroup::new(ENCODE.data[rd.index()][octet as usize]);
    (cg, rd.after(cg))
}

/// Encode a special code.
pub fn encode_control(code: ControlCode, rd: Disparity) -> (CodeGroup, Disparity) {
    let cg = CodeGroup::new(ENCODE.control[rd.index()][code.octet() as usize]);
    (cg, rd.after(cg))
}

/// How a received code-group matched the code tables.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum DecodeStatus {
    /// Found in the column of the current running disparity.
    Valid,
    /// Only found in the column of the opposite running disparity.
    WrongDisparity,
    /// Not a code-group in either column.
    Invalid,
}

/// A decoded code-group.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The octet, zero for invalid code-groups.
    pub octet: u8,
    /// Whether this was a special code.
    pub is_control: bool,
    pub status: DecodeStatus,
    /// Running disparity after the code-group.
    pub disparity: Disparity,
}

impl Decoded {
    /// The code-group is in neither table.
    pub fn decode_error(&self) -> bool {
        self.status == DecodeStatus::Invalid
    }

    /// The code-group was found only under the opposite running disparity.
    pub fn disparity_error(&self) -> bool {
        self.status == DecodeStatus::WrongDisparity
    }

    /// `[/D/]`, any data code-group.
    pub fn is_data(&self) -> bool {
        !self.decode_error() && !self.is_control
    }

    /// A specific data code-group.
    pub fn is_data_octet(&self, octet: u8) -> bool {
        self.is_data() && self.octet == octet
    }

    /// The special code this decoded to, if any.
    pub fn control_code(&self) -> Option<ControlCode> {
        if self.decode_error() || !self.is_control {
            return None;
        }

        ControlCode::try_from(self.octet).ok()
    }

    /// A specific special code.
    pub fn is_control_code(&self, code: ControlCode) -> bool {
        self.control_code() == Some(code)
    }
}

/// Decode a code-group against both disparity columns.
///
/// The running disparity always advances with the received code-group, also for invalid
/// code-groups, so the decoder stays in step once valid code-groups resume.
pub fn decode(cg: CodeGroup, rd: Disparity) -> Decoded {
    let expected = DECODE.entries[rd.index()][cg.bits() as usize];
    let opposite = DECODE.entries[rd.flip().index()][cg.bits() as usize];

    let (entry, status) = if expected & VALID != 0 {
        (expected, DecodeStatus::Valid)
    } else if opposite & VALID != 0 {
        (opposite, DecodeStatus::WrongDisparity)
    } else {
        (0, DecodeStatus::Invalid)
    };

    Decoded {
        octet: entry as u8,
        is_control: entry & CONTROL != 0,
        status,
        disparity: rd.after(cg),
    }
}

/// Transmit-side running disparity tracker.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Encoder {
    disparity: Disparity,
}

impl Encoder {
    /// A new encoder, starting at RD-.
    pub const fn new() -> Self {
        Self::with_disparity(Disparity::Negative)
    }

    pub const fn with_disparity(disparity: Disparity) -> Self {
        Self { disparity }
    }

    /// Current running disparity.
    pub fn disparity(&self) -> Disparity {
        self.disparity
    }

    /// Encode and advance the running disparity. On error the disparity is left untouched.
    pub fn encode(&mut self, octet: u8, is_control: bool) -> Result<CodeGroup, EncodeError> {
        let (cg, disparity) = encode(octet, is_control, self.disparity)?;
        self.disparity = disparity;
        Ok(cg)
    }

    pub fn encode_data(&mut self, octet: u8) -> CodeGroup {
        let (cg, disparity) = encode_data(octet, self.disparity);
        self.disparity = disparity;
        cg
    }

    pub fn encode_control(&mut self, code: ControlCode) -> CodeGroup {
        let (cg, disparity) = encode_control(code, self.disparity);
        self.disparity = disparity;
        cg
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive-side running disparity tracker.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Decoder {
    disparity: Disparity,
}

impl Decoder {
    /// A new decoder, starting at RD-.
    pub const fn new() -> Self {
        Self {
            disparity: Disparity::Negative,
        }
    }

    /// Current running disparity.
    pub fn disparity(&self) -> Disparity {
        self.disparity
    }

    /// Decode and advance the running disparity.
    pub fn decode(&mut self, cg: CodeGroup) -> Decoded {
        let decoded = decode(cg, self.disparity);

        if decoded.status != DecodeStatus::Valid {
            trace!(
                "Decoded {:?} as {:?} at {:?}",
                cg,
                decoded.status,
                self.disparity
            );
        }

        self.disparity = decoded.disparity;
        decoded
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
