//! End-of-packet patterns over the receive window.

use crate::{
    code_group::{CodeGroup, ControlCode, Disparity, D0_0, D21_5, D26_4, D2_2, D6_5},
    codec::{Decoded, Decoder},
};
use defmt_or_log::derive_format_or_debug;
use heapless::HistoryBuffer;

/// Number of code-groups `check_end` looks at.
pub const WINDOW: usize = 3;

/// The last received code-groups, oldest first.
pub type Window = HistoryBuffer<ReceivedCodeGroup, WINDOW>;

/// A code-group as it came off the line.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct ReceivedCodeGroup {
    pub code_group: CodeGroup,
    pub decoded: Decoded,
    /// `rx_even` when the code-group arrived.
    pub even: bool,
    /// Running disparity before the code-group.
    pub disparity: Disparity,
}

impl ReceivedCodeGroup {
    /// Decode `code_group`, advancing the decoder.
    pub fn receive(decoder: &mut Decoder, code_group: CodeGroup, even: bool) -> Self {
        let disparity = decoder.disparity();
        let decoded = decoder.decode(code_group);

        Self {
            code_group,
            decoded,
            even,
            disparity,
        }
    }

    /// `[/K28.5/]`
    pub fn is_comma(&self) -> bool {
        self.is(ControlCode::COMMA)
    }

    /// `[/K28.5/]` in an even position.
    pub fn is_aligned_comma(&self) -> bool {
        self.is_comma() && self.even
    }

    pub fn is(&self, code: ControlCode) -> bool {
        self.decoded.is_control_code(code)
    }

    /// `[/D/]`
    pub fn is_data(&self) -> bool {
        self.decoded.is_data()
    }

    pub fn is_data_octet(&self, octet: u8) -> bool {
        self.decoded.is_data_octet(octet)
    }

    /// `[/D21.5/] + [/D2.2/]`, the second code-group of `/C/`.
    pub fn is_config_data(&self) -> bool {
        self.is_data_octet(D21_5) || self.is_data_octet(D2_2)
    }

    /// `[/D6.5/] + [/D26.4/]`, the second code-group of `/LI/`.
    pub fn is_lpi_data(&self) -> bool {
        self.is_data_octet(D6_5) || self.is_data_octet(D26_4)
    }
}

/// End-of-packet pattern of the window, named after the transition it triggers.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum CheckEnd {
    None,
    /// `/T/R/K28.5/` or `/R/R/K28.5/`
    NormalEnd,
    /// `/T/R/R/`
    ErrorEndExtend,
    /// `/R/R/R/`
    EarlyExtendError,
    /// `/R/R/S/`
    PacketBurst,
    /// `/K28.5/D/K28.5/`
    EarlyEndDataError,
    /// `/K28.5/(D21.5 | D2.2)/D0.0/`
    EarlyEndConfigError,
}

impl CheckEnd {
    /// Match a full window. Fewer than three code-groups never match.
    pub fn classify(window: &Window) -> Self {
        let mut symbols = window.oldest_ordered().copied();

        match (symbols.next(), symbols.next(), symbols.next()) {
            (Some(first), Some(second), Some(third)) => check_end(&[first, second, third]),
            _ => CheckEnd::None,
        }
    }
}

/// Match three code-groups, oldest first.
pub fn check_end(window: &[ReceivedCodeGroup; WINDOW]) -> CheckEnd {
    let [first, second, third] = window;
    let extend = ControlCode::CARRIER_EXTEND;

    if first.is(extend) && second.is(extend) && third.is(extend) {
        CheckEnd::EarlyExtendError
    } else if first.is(ControlCode::END_OF_PACKET) && second.is(extend) && third.is(extend) {
        CheckEnd::ErrorEndExtend
    } else if first.is(extend) && second.is(extend) && third.is(ControlCode::START_OF_PACKET) {
        CheckEnd::PacketBurst
    } else if second.is(extend) && third.is_comma() {
        CheckEnd::NormalEnd
    } else if first.is_comma() && second.is_data() && third.is_comma() {
        CheckEnd::EarlyEndDataError
    } else if first.is_comma() && second.is_config_data() && third.is_data_octet(D0_0) {
        CheckEnd::EarlyEndConfigError
    } else {
        CheckEnd::None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{code_group::D16_2, codec::encode};

    const R: (u8, bool) = (ControlCode::CARRIER_EXTEND.octet(), true);
    const S: (u8, bool) = (ControlCode::START_OF_PACKET.octet(), true);
    const T: (u8, bool) = (ControlCode::END_OF_PACKET.octet(), true);
    const K: (u8, bool) = (ControlCode::COMMA.octet(), true);

    const fn d(octet: u8) -> (u8, bool) {
        (octet, false)
    }

    /// Send the octets with running disparity and receive them again.
    fn line(octets: [(u8, bool); 3]) -> [ReceivedCodeGroup; 3] {
        let mut rd = Disparity::Negative;
        let mut decoder = Decoder::new();

        octets.map(|(octet, is_control)| {
            let (cg, next) = encode(octet, is_control, rd).unwrap();
            rd = next;
            ReceivedCodeGroup::receive(&mut decoder, cg, false)
        })
    }

    /// Every code-group encoded with RD-, regardless of the running disparity.
    fn negative(octets: [(u8, bool); 3]) -> [ReceivedCodeGroup; 3] {
        let mut decoder = Decoder::new();

        octets.map(|(octet, is_control)| {
            let (cg, _) = encode(octet, is_control, Disparity::Negative).unwrap();
            ReceivedCodeGroup::receive(&mut decoder, cg, false)
        })
    }

    #[test]
    fn literal_sequences() {
        assert_eq!(check_end(&negative([K, R, K])), CheckEnd::NormalEnd);
        assert_eq!(check_end(&negative([R, R, R])), CheckEnd::EarlyExtendError);
        assert_eq!(check_end(&negative([R, R, S])), CheckEnd::PacketBurst);
    }

    #[test]
    fn end_of_packet_patterns() {
        assert_eq!(check_end(&line([T, R, K])), CheckEnd::NormalEnd);
        assert_eq!(check_end(&line([R, R, K])), CheckEnd::NormalEnd);
        assert_eq!(check_end(&line([T, R, R])), CheckEnd::ErrorEndExtend);
        assert_eq!(check_end(&line([R, R, R])), CheckEnd::EarlyExtendError);
        assert_eq!(check_end(&line([R, R, S])), CheckEnd::PacketBurst);
    }

    #[test]
    fn early_end_patterns() {
        assert_eq!(
            check_end(&line([K, d(D16_2), K])),
            CheckEnd::EarlyEndDataError
        );
        assert_eq!(
            check_end(&line([K, d(D21_5), d(D0_0)])),
            CheckEnd::EarlyEndConfigError
        );
        assert_eq!(
            check_end(&line([K, d(D2_2), d(D0_0)])),
            CheckEnd::EarlyEndConfigError
        );
        assert_eq!(check_end(&line([K, d(D2_2), d(0x01)])), CheckEnd::None);
    }

    #[test]
    fn ordinary_traffic_does_not_match() {
        assert_eq!(check_end(&line([d(0x55), d(0x55), d(0xd5)])), CheckEnd::None);
        assert_eq!(check_end(&line([S, d(0x55), d(0x55)])), CheckEnd::None);
        assert_eq!(check_end(&line([d(0x12), T, R])), CheckEnd::None);
    }

    #[test]
    fn classify_needs_full_window() {
        let mut window = Window::new();
        let [t, r, k] = line([T, R, K]);

        assert_eq!(CheckEnd::classify(&window), CheckEnd::None);
        window.write(t);
        window.write(r);
        assert_eq!(CheckEnd::classify(&window), CheckEnd::None);

        window.write(k);
        assert_eq!(CheckEnd::classify(&window), CheckEnd::NormalEnd);

        // Slides, the oldest code-group drops out.
        window.write(k);
        assert_eq!(CheckEnd::classify(&window), CheckEnd::None);
    }
}
