//! QR Code Model 2 symbol construction.
//!
//! Everything between input text and the finished module matrix lives here:
//! segment encoding with automatic mode selection, Reed-Solomon error
//! correction, function pattern placement, and penalty-driven mask choice,
//! following the ISO/IEC 18004 structure for versions 1 to 40.
//!
//! The matrix is built for exactly the version asked for. When the data
//! does not fit, construction fails; no larger version is substituted.

use crate::error::{QrError, Result};

/// Characters encodable in alphanumeric mode, in value order.
const ALPHANUMERIC_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

/// Error correction codewords per block, indexed by `[level][version]`.
/// Index 0 is unused padding so versions index directly.
const ECC_CODEWORDS_PER_BLOCK: [[u8; 41]; 4] = [
    // Low
    [
        0, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    // Medium
    [
        0, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ],
    // Quartile
    [
        0, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    // High
    [
        0, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
];

/// Number of error correction blocks, indexed by `[level][version]`.
const ERROR_CORRECTION_BLOCKS: [[u8; 41]; 4] = [
    // Low
    [
        0, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ],
    // Medium
    [
        0, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ],
    // Quartile
    [
        0, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27,
        29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ],
    // High
    [
        0, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ],
];

/*---- Version ----*/

/// A QR symbol version, guaranteed to be in `1..=40`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Version(u8);

impl Version {
    pub(crate) const MIN: Version = Version(1);
    pub(crate) const MAX: Version = Version(40);

    /// Checks the range and wraps the number.
    pub(crate) fn from_number(number: u32) -> Result<Version> {
        let min = u32::from(Version::MIN.number());
        let max = u32::from(Version::MAX.number());
        if (min..=max).contains(&number) {
            Ok(Version(number as u8))
        } else {
            Err(QrError::VersionOutOfRange(number))
        }
    }

    pub(crate) fn number(self) -> u8 {
        self.0
    }

    /// Edge length of the bare symbol in modules, quiet zone excluded.
    pub(crate) fn side(self) -> u32 {
        u32::from(self.0) * 4 + 17
    }
}

/*---- Error correction level ----*/

/// Error correction level of a symbol.
///
/// Generation pins [`EcLevel::Medium`]; the remaining levels stay because
/// the capacity tables carry rows for all four.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub(crate) enum EcLevel {
    Low,
    Medium,
    Quartile,
    High,
}

impl EcLevel {
    /// Row index into the capacity tables.
    fn table_index(self) -> usize {
        match self {
            EcLevel::Low => 0,
            EcLevel::Medium => 1,
            EcLevel::Quartile => 2,
            EcLevel::High => 3,
        }
    }

    /// Two-bit value placed in the format information.
    fn format_bits(self) -> u8 {
        match self {
            EcLevel::Low => 1,
            EcLevel::Medium => 0,
            EcLevel::Quartile => 3,
            EcLevel::High => 2,
        }
    }
}

/*---- Capacity arithmetic ----*/

/// Modules available for codewords and remainder bits once every function
/// pattern of the version is placed.
fn raw_module_count(version: Version) -> usize {
    let v = usize::from(version.number());
    let mut result = (16 * v + 128) * v + 64;
    if v >= 2 {
        let align = v / 7 + 2;
        result -= (25 * align - 10) * align - 55;
        if v >= 7 {
            result -= 36;
        }
    }
    result
}

fn ecc_per_block(version: Version, ec: EcLevel) -> usize {
    usize::from(ECC_CODEWORDS_PER_BLOCK[ec.table_index()][usize::from(version.number())])
}

fn block_count(version: Version, ec: EcLevel) -> usize {
    usize::from(ERROR_CORRECTION_BLOCKS[ec.table_index()][usize::from(version.number())])
}

/// Codewords left for data after error correction takes its share.
fn data_codeword_count(version: Version, ec: EcLevel) -> usize {
    raw_module_count(version) / 8 - ecc_per_block(version, ec) * block_count(version, ec)
}

/// Center coordinates shared by the alignment pattern rows and columns.
/// Empty for version 1, which has no alignment patterns.
fn alignment_positions(version: Version) -> Vec<i32> {
    let v = i32::from(version.number());
    if v == 1 {
        return Vec::new();
    }
    let count = v / 7 + 2;
    let side = version.side() as i32;
    // version 32 is the one version whose step does not follow the rounding rule
    let step = if v == 32 {
        26
    } else {
        (v * 4 + count * 2 + 1) / (count * 2 - 2) * 2
    };
    let mut positions: Vec<i32> = (0..count - 1).map(|i| side - 7 - i * step).collect();
    positions.push(6);
    positions.reverse();
    positions
}

/*---- Bit stream ----*/

/// An appendable sequence of bits, most significant first.
struct BitStream {
    bits: Vec<bool>,
}

impl BitStream {
    fn new() -> Self {
        BitStream { bits: Vec::new() }
    }

    fn len(&self) -> usize {
        self.bits.len()
    }

    /// Appends the low `count` bits of `value`, highest bit first.
    fn push_bits(&mut self, value: u32, count: usize) {
        assert!(count <= 31 && value >> count == 0, "value out of range");
        self.bits
            .extend((0..count).rev().map(|i| (value >> i) & 1 != 0));
    }

    fn extend(&mut self, other: &BitStream) {
        self.bits.extend_from_slice(&other.bits);
    }

    /// Packs the stream into bytes. The length must already be byte aligned.
    fn into_bytes(self) -> Vec<u8> {
        debug_assert_eq!(self.bits.len() % 8, 0);
        self.bits
            .chunks(8)
            .map(|byte| byte.iter().fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit)))
            .collect()
    }
}

/*---- Segments ----*/

/// Data encoding mode of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentMode {
    Numeric,
    Alphanumeric,
    Byte,
}

impl SegmentMode {
    /// Four-bit mode indicator.
    fn indicator(self) -> u32 {
        match self {
            SegmentMode::Numeric => 0x1,
            SegmentMode::Alphanumeric => 0x2,
            SegmentMode::Byte => 0x4,
        }
    }

    /// Width of the character count field, which grows with the version.
    fn char_count_bits(self, version: Version) -> usize {
        let band = match version.number() {
            1..=9 => 0,
            10..=26 => 1,
            _ => 2,
        };
        match self {
            SegmentMode::Numeric => [10, 12, 14][band],
            SegmentMode::Alphanumeric => [9, 11, 13][band],
            SegmentMode::Byte => [8, 16, 16][band],
        }
    }
}

/// One run of input encoded in a single mode.
struct Segment {
    mode: SegmentMode,
    /// Character count for numeric/alphanumeric data, byte count for bytes.
    char_count: usize,
    payload: BitStream,
}

impl Segment {
    /// Encodes text in the densest mode that covers every character.
    fn from_text(text: &str) -> Segment {
        if Segment::is_numeric(text) {
            Segment::numeric(text)
        } else if Segment::is_alphanumeric(text) {
            Segment::alphanumeric(text)
        } else {
            Segment::bytes(text.as_bytes())
        }
    }

    fn is_numeric(text: &str) -> bool {
        text.chars().all(|c| c.is_ascii_digit())
    }

    fn is_alphanumeric(text: &str) -> bool {
        text.chars().all(|c| ALPHANUMERIC_CHARSET.contains(c))
    }

    /// Digits packed three at a time into ten bits.
    fn numeric(text: &str) -> Segment {
        debug_assert!(Segment::is_numeric(text));
        let mut payload = BitStream::new();
        for chunk in text.as_bytes().chunks(3) {
            let value = chunk
                .iter()
                .fold(0u32, |acc, &digit| acc * 10 + u32::from(digit - b'0'));
            payload.push_bits(value, chunk.len() * 3 + 1);
        }
        Segment {
            mode: SegmentMode::Numeric,
            char_count: text.len(),
            payload,
        }
    }

    /// Charset indices packed two at a time into eleven bits.
    fn alphanumeric(text: &str) -> Segment {
        let indices: Vec<u32> = text
            .chars()
            .map(|c| {
                ALPHANUMERIC_CHARSET
                    .find(c)
                    .expect("character outside the alphanumeric charset") as u32
            })
            .collect();
        let mut payload = BitStream::new();
        for chunk in indices.chunks(2) {
            match chunk {
                &[a, b] => payload.push_bits(a * 45 + b, 11),
                &[a] => payload.push_bits(a, 6),
                _ => unreachable!(),
            }
        }
        Segment {
            mode: SegmentMode::Alphanumeric,
            char_count: text.chars().count(),
            payload,
        }
    }

    /// Raw bytes, eight bits each.
    fn bytes(data: &[u8]) -> Segment {
        let mut payload = BitStream::new();
        for &byte in data {
            payload.push_bits(u32::from(byte), 8);
        }
        Segment {
            mode: SegmentMode::Byte,
            char_count: data.len(),
            payload,
        }
    }

    /// Encoded size in bits at the given version, or `None` when the
    /// character count field cannot represent the length.
    fn encoded_len(&self, version: Version) -> Option<usize> {
        let cc_bits = self.mode.char_count_bits(version);
        if self.char_count >= 1 << cc_bits {
            return None;
        }
        Some(4 + cc_bits + self.payload.len())
    }
}

/*---- Codeword assembly ----*/

/// Serializes the segment into the version's data codewords: mode header,
/// payload, terminator, byte alignment, and alternating pad bytes.
fn assemble_codewords(segment: &Segment, version: Version, ec: EcLevel) -> Result<Vec<u8>> {
    let capacity_bits = data_codeword_count(version, ec) * 8;
    match segment.encoded_len(version) {
        Some(needed) if needed <= capacity_bits => {}
        _ => {
            return Err(QrError::Capacity {
                data_len: segment.char_count,
                version: version.number(),
                capacity_bits,
            });
        }
    }

    let mut stream = BitStream::new();
    stream.push_bits(segment.mode.indicator(), 4);
    stream.push_bits(
        segment.char_count as u32,
        segment.mode.char_count_bits(version),
    );
    stream.extend(&segment.payload);
    debug_assert!(stream.len() <= capacity_bits);

    // terminator, then pad to a byte boundary
    let terminator = (capacity_bits - stream.len()).min(4);
    stream.push_bits(0, terminator);
    stream.push_bits(0, (8 - stream.len() % 8) % 8);

    for &pad in [0xEC_u32, 0x11].iter().cycle() {
        if stream.len() >= capacity_bits {
            break;
        }
        stream.push_bits(pad, 8);
    }
    Ok(stream.into_bytes())
}

/*---- Reed-Solomon error correction ----*/

/// Product in GF(2^8) with the QR reduction polynomial 0x11D.
fn gf_multiply(x: u8, y: u8) -> u8 {
    let mut z: u8 = 0;
    for i in (0..8).rev() {
        z = (z << 1) ^ ((z >> 7) * 0x1D);
        z ^= ((y >> i) & 1) * x;
    }
    z
}

/// Polynomial divisor for one error correction degree, reused across all
/// blocks of a symbol.
struct ReedSolomon {
    /// Coefficients from highest to lowest power, leading 1 omitted.
    divisor: Vec<u8>,
}

impl ReedSolomon {
    /// Computes the product `(x - r^0)(x - r^1)...(x - r^{degree-1})` for
    /// the generator element r = 0x02.
    fn new(degree: usize) -> ReedSolomon {
        assert!((1..=255).contains(&degree), "degree out of range");
        let mut divisor = vec![0u8; degree];
        divisor[degree - 1] = 1;
        let mut root: u8 = 1;
        for _ in 0..degree {
            for j in 0..degree {
                divisor[j] = gf_multiply(divisor[j], root);
                if j + 1 < degree {
                    divisor[j] ^= divisor[j + 1];
                }
            }
            root = gf_multiply(root, 0x02);
        }
        ReedSolomon { divisor }
    }

    /// Remainder of `data * x^degree` divided by the generator polynomial.
    fn remainder(&self, data: &[u8]) -> Vec<u8> {
        let degree = self.divisor.len();
        let mut result = vec![0u8; degree];
        for &byte in data {
            let factor = byte ^ result[0];
            result.copy_within(1.., 0);
            result[degree - 1] = 0;
            for (coefficient, &term) in result.iter_mut().zip(&self.divisor) {
                *coefficient ^= gf_multiply(term, factor);
            }
        }
        result
    }
}

/// Splits the data codewords into blocks, appends each block's error
/// correction, and interleaves everything into transmission order.
fn add_ecc_and_interleave(data: &[u8], version: Version, ec: EcLevel) -> Vec<u8> {
    debug_assert_eq!(data.len(), data_codeword_count(version, ec));
    let num_blocks = block_count(version, ec);
    let ecc_len = ecc_per_block(version, ec);
    let raw_codewords = raw_module_count(version) / 8;
    let short_blocks = num_blocks - raw_codewords % num_blocks;
    let short_len = raw_codewords / num_blocks;

    let rs = ReedSolomon::new(ecc_len);
    let mut blocks: Vec<Vec<u8>> = Vec::with_capacity(num_blocks);
    let mut cursor = 0usize;
    for i in 0..num_blocks {
        let data_len = short_len - ecc_len + usize::from(i >= short_blocks);
        let mut block = data[cursor..cursor + data_len].to_vec();
        cursor += data_len;
        let ecc = rs.remainder(&block);
        if i < short_blocks {
            // placeholder so every block has the long length while interleaving
            block.push(0);
        }
        block.extend_from_slice(&ecc);
        blocks.push(block);
    }
    debug_assert_eq!(cursor, data.len());

    let mut result = Vec::with_capacity(raw_codewords);
    for i in 0..=short_len {
        for (j, block) in blocks.iter().enumerate() {
            // skip the short blocks' placeholder byte
            if i != short_len - ecc_len || j >= short_blocks {
                result.push(block[i]);
            }
        }
    }
    debug_assert_eq!(result.len(), raw_codewords);
    result
}

/*---- Matrix construction ----*/

fn bit(value: u32, index: i32) -> bool {
    (value >> index) & 1 != 0
}

/// Mutable module matrix used while the symbol is under construction.
/// Function modules are tracked separately so data placement and masking
/// know to step around them.
struct Matrix {
    side: i32,
    modules: Vec<bool>,
    function: Vec<bool>,
}

impl Matrix {
    fn new(version: Version) -> Matrix {
        let side = version.side() as i32;
        let area = (side * side) as usize;
        Matrix {
            side,
            modules: vec![false; area],
            function: vec![false; area],
        }
    }

    fn index(&self, x: i32, y: i32) -> usize {
        debug_assert!((0..self.side).contains(&x) && (0..self.side).contains(&y));
        (y * self.side + x) as usize
    }

    fn module(&self, x: i32, y: i32) -> bool {
        self.modules[self.index(x, y)]
    }

    fn is_function(&self, x: i32, y: i32) -> bool {
        self.function[self.index(x, y)]
    }

    fn set_function(&mut self, x: i32, y: i32, dark: bool) {
        let i = self.index(x, y);
        self.modules[i] = dark;
        self.function[i] = true;
    }

    fn draw_function_patterns(&mut self, version: Version, ec: EcLevel) {
        let side = self.side;
        for i in 0..side {
            self.set_function(6, i, i % 2 == 0);
            self.set_function(i, 6, i % 2 == 0);
        }
        // finders overwrite the timing pattern ends
        self.draw_finder(3, 3);
        self.draw_finder(side - 4, 3);
        self.draw_finder(3, side - 4);

        let positions = alignment_positions(version);
        let count = positions.len();
        for (i, &cx) in positions.iter().enumerate() {
            for (j, &cy) in positions.iter().enumerate() {
                // the three finder corners carry no alignment pattern
                if (i == 0 && j == 0) || (i == 0 && j == count - 1) || (i == count - 1 && j == 0) {
                    continue;
                }
                self.draw_alignment(cx, cy);
            }
        }

        // reserve the format area now; rewritten once the mask is chosen
        self.draw_format_info(ec, 0);
        self.draw_version_info(version);
    }

    /// 7x7 finder pattern plus one ring of separator, centered at `(x, y)`,
    /// clipped at the matrix edges.
    fn draw_finder(&mut self, x: i32, y: i32) {
        for dy in -4..=4_i32 {
            for dx in -4..=4_i32 {
                let dist = dx.abs().max(dy.abs());
                let (px, py) = (x + dx, y + dy);
                if (0..self.side).contains(&px) && (0..self.side).contains(&py) {
                    self.set_function(px, py, dist != 2 && dist != 4);
                }
            }
        }
    }

    /// 5x5 alignment pattern centered at `(x, y)`.
    fn draw_alignment(&mut self, x: i32, y: i32) {
        for dy in -2..=2_i32 {
            for dx in -2..=2_i32 {
                self.set_function(x + dx, y + dy, dx.abs().max(dy.abs()) != 1);
            }
        }
    }

    /// Writes both copies of the format information for the given error
    /// correction level and mask pattern.
    fn draw_format_info(&mut self, ec: EcLevel, mask: u8) {
        // 5 data bits extended with a 10-bit BCH remainder, then XOR masked
        let data = u32::from(ec.format_bits() << 3 | mask);
        let mut rem = data;
        for _ in 0..10 {
            rem = (rem << 1) ^ ((rem >> 9) * 0x537);
        }
        let bits = (data << 10 | rem) ^ 0x5412;
        debug_assert!(bits >> 15 == 0);

        // first copy, around the top-left finder
        for i in 0..6 {
            self.set_function(8, i, bit(bits, i));
        }
        self.set_function(8, 7, bit(bits, 6));
        self.set_function(8, 8, bit(bits, 7));
        self.set_function(7, 8, bit(bits, 8));
        for i in 9..15 {
            self.set_function(14 - i, 8, bit(bits, i));
        }

        // second copy, split between the other two finders
        let side = self.side;
        for i in 0..8 {
            self.set_function(side - 1 - i, 8, bit(bits, i));
        }
        for i in 8..15 {
            self.set_function(8, side - 15 + i, bit(bits, i));
        }
        // always-dark module next to the bottom-left finder
        self.set_function(8, side - 8, true);
    }

    /// Writes both copies of the version information. Versions below 7
    /// carry none.
    fn draw_version_info(&mut self, version: Version) {
        if version.number() < 7 {
            return;
        }
        // 6 data bits extended with a 12-bit BCH remainder
        let data = u32::from(version.number());
        let mut rem = data;
        for _ in 0..12 {
            rem = (rem << 1) ^ ((rem >> 11) * 0x1F25);
        }
        let bits = data << 12 | rem;
        debug_assert!(bits >> 18 == 0);

        for i in 0..18 {
            let dark = bit(bits, i);
            let a = self.side - 11 + i % 3;
            let b = i / 3;
            self.set_function(a, b, dark);
            self.set_function(b, a, dark);
        }
    }

    /// Places the codeword bits in the zigzag order: two-module columns
    /// from right to left, alternating upward and downward, skipping the
    /// vertical timing column and every function module. Any modules left
    /// over are the remainder bits and stay light.
    fn place_data(&mut self, codewords: &[u8]) {
        let side = self.side;
        let mut bit_index = 0usize;
        let mut right = side - 1;
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            for vert in 0..side {
                for j in 0..2 {
                    let x = right - j;
                    let upward = ((right + 1) & 2) == 0;
                    let y = if upward { side - 1 - vert } else { vert };
                    if !self.is_function(x, y) && bit_index < codewords.len() * 8 {
                        let dark =
                            (codewords[bit_index >> 3] >> (7 - (bit_index & 7))) & 1 != 0;
                        let i = self.index(x, y);
                        self.modules[i] = dark;
                        bit_index += 1;
                    }
                }
            }
            right -= 2;
        }
        debug_assert_eq!(bit_index, codewords.len() * 8);
    }

    /// XORs the mask pattern over all non-function modules. Applying the
    /// same pattern twice restores the previous state.
    fn apply_mask(&mut self, pattern: u8) {
        assert!(pattern < 8, "mask pattern out of range");
        for y in 0..self.side {
            for x in 0..self.side {
                if self.is_function(x, y) {
                    continue;
                }
                let invert = match pattern {
                    0 => (x + y) % 2 == 0,
                    1 => y % 2 == 0,
                    2 => x % 3 == 0,
                    3 => (x + y) % 3 == 0,
                    4 => (x / 3 + y / 2) % 2 == 0,
                    5 => x * y % 2 + x * y % 3 == 0,
                    6 => (x * y % 2 + x * y % 3) % 2 == 0,
                    7 => ((x + y) % 2 + x * y % 3) % 2 == 0,
                    _ => unreachable!(),
                };
                let i = self.index(x, y);
                self.modules[i] ^= invert;
            }
        }
    }

    /// Penalty score of the current matrix; lower reads better.
    fn penalty_score(&self) -> i32 {
        let side = self.side;
        let mut score: i32 = 0;

        // runs of same-colored modules and finder lookalikes, row-wise
        for y in 0..side {
            let mut run_color = false;
            let mut run_len: i32 = 0;
            let mut history = RunHistory::new(side);
            for x in 0..side {
                if self.module(x, y) == run_color {
                    run_len += 1;
                    if run_len == 5 {
                        score += PENALTY_N1;
                    } else if run_len > 5 {
                        score += 1;
                    }
                } else {
                    history.push(run_len);
                    if !run_color {
                        score += history.finder_patterns() * PENALTY_N3;
                    }
                    run_color = self.module(x, y);
                    run_len = 1;
                }
            }
            score += history.finish(run_color, run_len) * PENALTY_N3;
        }
        // and column-wise
        for x in 0..side {
            let mut run_color = false;
            let mut run_len: i32 = 0;
            let mut history = RunHistory::new(side);
            for y in 0..side {
                if self.module(x, y) == run_color {
                    run_len += 1;
                    if run_len == 5 {
                        score += PENALTY_N1;
                    } else if run_len > 5 {
                        score += 1;
                    }
                } else {
                    history.push(run_len);
                    if !run_color {
                        score += history.finder_patterns() * PENALTY_N3;
                    }
                    run_color = self.module(x, y);
                    run_len = 1;
                }
            }
            score += history.finish(run_color, run_len) * PENALTY_N3;
        }

        // 2x2 blocks of a single color
        for y in 0..side - 1 {
            for x in 0..side - 1 {
                let color = self.module(x, y);
                if color == self.module(x + 1, y)
                    && color == self.module(x, y + 1)
                    && color == self.module(x + 1, y + 1)
                {
                    score += PENALTY_N2;
                }
            }
        }

        // dark/light balance, one point per 5% step away from 50%
        let dark = self.modules.iter().filter(|&&m| m).count() as i32;
        let total = side * side;
        let k = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        score + k * PENALTY_N4
    }
}

/// Sliding window over the last seven run lengths of one row or column,
/// used to spot 1:1:3:1:1 finder lookalikes with light padding.
struct RunHistory {
    side: i32,
    runs: [i32; 7],
}

impl RunHistory {
    fn new(side: i32) -> RunHistory {
        RunHistory { side, runs: [0; 7] }
    }

    fn push(&mut self, mut run_len: i32) {
        if self.runs[0] == 0 {
            // the matrix edge counts as light padding before the first run
            run_len += self.side;
        }
        self.runs.copy_within(0..6, 1);
        self.runs[0] = run_len;
    }

    /// 1 when the window currently holds a finder-like sequence.
    fn finder_patterns(&self) -> i32 {
        let n = self.runs[1];
        let core = n > 0
            && self.runs[2] == n
            && self.runs[3] == n * 3
            && self.runs[4] == n
            && self.runs[5] == n;
        i32::from(core && (self.runs[0] >= n * 4 || self.runs[6] >= n * 4))
    }

    /// Flushes the final run with the trailing edge padding and reports
    /// any finder lookalike that completes there.
    fn finish(mut self, final_color: bool, mut final_len: i32) -> i32 {
        if final_color {
            self.push(final_len);
            final_len = 0;
        }
        final_len += self.side;
        self.push(final_len);
        self.finder_patterns()
    }
}

/*---- Symbol ----*/

/// A finished QR symbol: the immutable module matrix for one version,
/// quiet zone not included.
pub(crate) struct Symbol {
    version: Version,
    side: u32,
    mask: u8,
    modules: Vec<bool>,
}

impl Symbol {
    /// Encodes `text` at exactly `version` and builds the module matrix,
    /// trying all eight masks and keeping the one with the lowest penalty
    /// (ties go to the lowest pattern number).
    pub(crate) fn build(text: &str, version: Version, ec: EcLevel) -> Result<Symbol> {
        let segment = Segment::from_text(text);
        let data = assemble_codewords(&segment, version, ec)?;
        let codewords = add_ecc_and_interleave(&data, version, ec);

        let mut matrix = Matrix::new(version);
        matrix.draw_function_patterns(version, ec);
        matrix.place_data(&codewords);

        let mut best_mask = 0u8;
        let mut best_score = i32::MAX;
        for mask in 0..8u8 {
            matrix.apply_mask(mask);
            matrix.draw_format_info(ec, mask);
            let score = matrix.penalty_score();
            if score < best_score {
                best_mask = mask;
                best_score = score;
            }
            // XOR undoes the candidate mask
            matrix.apply_mask(mask);
        }
        matrix.apply_mask(best_mask);
        matrix.draw_format_info(ec, best_mask);

        Ok(Symbol {
            version,
            side: version.side(),
            mask: best_mask,
            modules: matrix.modules,
        })
    }

    pub(crate) fn version(&self) -> Version {
        self.version
    }

    /// Edge length in modules.
    pub(crate) fn side(&self) -> u32 {
        self.side
    }

    /// The mask pattern the penalty search settled on.
    pub(crate) fn mask(&self) -> u8 {
        self.mask
    }

    /// Color of the module at `(x, y)`; `true` is dark.
    ///
    /// # Panics
    ///
    /// Panics when the coordinates fall outside the symbol.
    pub(crate) fn module(&self, x: u32, y: u32) -> bool {
        assert!(x < self.side && y < self.side, "module out of bounds");
        self.modules[(y * self.side + x) as usize]
    }
}
