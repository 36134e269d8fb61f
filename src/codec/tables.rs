//! 8B/10B code tables, built at compile time from the sub-block codes of IEEE 802.3 Table 36-1.
//!
//! Every code is written in its RD- form with `a` (resp. `f`) as the most significant bit. The RD+
//! form is the complement for unbalanced sub-blocks and for the two balanced exceptions D.07 and
//! D.x.3; control 3B/4B sub-blocks are always complemented.

/// 5B/6B data sub-blocks, `abcdei`, indexed by `EDCBA`.
const SIX_B: [u8; 32] = [
    0b100111, 0b011101, 0b101101, 0b110001, 0b110101, 0b101001, 0b011001, 0b111000, //
    0b111001, 0b100101, 0b010101, 0b110100, 0b001101, 0b101100, 0b011100, 0b010111, //
    0b011011, 0b100011, 0b010011, 0b110010, 0b001011, 0b101010, 0b011010, 0b111010, //
    0b110011, 0b100110, 0b010110, 0b110110, 0b001110, 0b101110, 0b011110, 0b101011, //
];

/// 5B/6B sub-block of K28.
const SIX_B_K28: u8 = 0b001111;

/// 3B/4B data sub-blocks, `fghj`, indexed by `HGF` (primary D.x.P7 for 7).
const FOUR_B: [u8; 8] = [
    0b1011, 0b1001, 0b0101, 0b1100, 0b1101, 0b1010, 0b0110, 0b1110,
];

/// Alternate D.x.A7 sub-block.
const FOUR_B_A7: u8 = 0b0111;

/// 3B/4B control sub-blocks, indexed by `HGF`.
const FOUR_B_K: [u8; 8] = [
    0b1011, 0b0110, 0b1010, 0b1100, 0b1101, 0b0101, 0b1001, 0b0111,
];

/// Entry flag: the 10-bit code-group is a valid code-group in this column.
pub(crate) const VALID: u16 = 1 << 9;
/// Entry flag: the code-group is a special code.
pub(crate) const CONTROL: u16 = 1 << 8;

pub(crate) const fn is_control_octet(octet: u8) -> bool {
    matches!(
        octet,
        0x1c | 0x3c | 0x5c | 0x7c | 0x9c | 0xbc | 0xdc | 0xfc | 0xf7 | 0xfb | 0xfd | 0xfe
    )
}

const fn six_b(x: usize, control: bool, positive: bool) -> u8 {
    let code = if control && x == 28 {
        SIX_B_K28
    } else {
        SIX_B[x]
    };

    if positive && (code.count_ones() != 3 || code == 0b111000) {
        !code & 0x3f
    } else {
        code
    }
}

const fn four_b(x: usize, y: usize, control: bool, positive: bool) -> u8 {
    let code = if control {
        FOUR_B_K[y]
    } else if y == 7
        && ((!positive && (x == 17 || x == 18 || x == 20))
            || (positive && (x == 11 || x == 13 || x == 14)))
    {
        FOUR_B_A7
    } else {
        FOUR_B[y]
    };

    if positive && (control || code.count_ones() != 2 || code == 0b1100) {
        !code & 0x0f
    } else {
        code
    }
}

/// Encode one octet, returning zero for an octet that is not a valid special code.
const fn encode_entry(octet: u8, control: bool, positive: bool) -> u16 {
    if control && !is_control_octet(octet) {
        return 0;
    }

    let x = (octet & 0x1f) as usize;
    let y = (octet >> 5) as usize;

    let six = six_b(x, control, positive);

    // The 3B/4B column follows the running disparity at the end of the 6B sub-block.
    let positive = match six.count_ones() {
        4 => true,
        2 => false,
        _ => positive,
    };

    let four = four_b(x, y, control, positive);

    ((six as u16) << 4) | four as u16
}

/// Encoder tables indexed by `[disparity][octet]`.
pub(crate) struct EncodeTables {
    pub(crate) data: [[u16; 256]; 2],
    pub(crate) control: [[u16; 256]; 2],
}

impl EncodeTables {
    const fn build() -> Self {
        let mut data = [[0; 256]; 2];
        let mut control = [[0; 256]; 2];

        let mut rd = 0;
        while rd < 2 {
            let mut octet = 0;
            while octet < 256 {
                data[rd][octet] = encode_entry(octet as u8, false, rd == 1);
                control[rd][octet] = encode_entry(octet as u8, true, rd == 1);
                octet += 1;
            }
            rd += 1;
        }

        Self { data, control }
    }
}

/// Decoder tables indexed by `[disparity][code-group]`, entries are `{valid, control, octet}`.
pub(crate) struct DecodeTables {
    pub(crate) entries: [[u16; 1024]; 2],
}

impl DecodeTables {
    const fn build(encode: &EncodeTables) -> Self {
        let mut entries = [[0; 1024]; 2];

        let mut rd = 0;
        while rd < 2 {
            let mut octet = 0;
            while octet < 256 {
                let code_group = encode.data[rd][octet] as usize;
                entries[rd][code_group] = VALID | octet as u16;

                let code_group = encode.control[rd][octet] as usize;
                if code_group != 0 {
                    entries[rd][code_group] = VALID | CONTROL | octet as u16;
                }
                octet += 1;
            }
            rd += 1;
        }

        Self { entries }
    }
}

pub(crate) static ENCODE: EncodeTables = EncodeTables::build();
pub(crate) static DECODE: DecodeTables = DecodeTables::build(&EncodeTables::build());
