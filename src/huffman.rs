//! Canonical Huffman table construction and the two-segment decode LUT.
//!
//! Construction takes a per-symbol code-length list (0 = symbol absent),
//! validates it forms a complete prefix code, and materializes a flat
//! `(symbol, length)` array addressed by the next 16 bits of input
//! (reversed) via a `fence`/`fold` split between short (<=8 bit) and
//! long (9..15 bit) codewords. See `Decoder::lookup`.

use crate::bitstream::reverse16;
use crate::error::InflateError;

pub const MAX_CODE_LEN: usize = 15;
pub const NUM_PRECODE_SYMS: usize = 19;
pub const NUM_LITLEN_SYMS: usize = 286;
/// Canonical construction size for the *fixed* run/literal table. RFC
/// 1951's fixed lengths assign two unused length-8 codewords (symbols
/// 286/287) purely to keep the tree complete; they are never decoded.
const NUM_LITLEN_CODES_FIXED: usize = 288;
pub const NUM_DIST_SYMS: usize = 30;
/// HDIST's 5-bit field can name up to 32 symbols; 30 and 31 are reserved
/// and must be rejected if a stream actually emits them.
const NUM_DIST_CODES_FIELD: usize = 32;

/// Reorders the HCLEN code-length-of-code-length fields as transmitted.
pub const PRECODE_ORDER: [usize; NUM_PRECODE_SYMS] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// `(extra_bit_count, base_length)` per run symbol (257..285, zero-indexed).
pub const RUN_DECODE: [(u8, u16); 29] = [
    (0, 3), (0, 4), (0, 5), (0, 6), (0, 7), (0, 8), (0, 9), (0, 10),
    (1, 11), (1, 13), (1, 15), (1, 17),
    (2, 19), (2, 23), (2, 27), (2, 31),
    (3, 35), (3, 43), (3, 51), (3, 59),
    (4, 67), (4, 83), (4, 99), (4, 115),
    (5, 131), (5, 163), (5, 195), (5, 227),
    (0, 258),
];

/// `(extra_bit_count, base_distance)` per distance symbol (0..29).
pub const DIST_DECODE: [(u8, u16); 30] = [
    (0, 1), (0, 2), (0, 3), (0, 4),
    (1, 5), (1, 7),
    (2, 9), (2, 13),
    (3, 17), (3, 25),
    (4, 33), (4, 49),
    (5, 65), (5, 97),
    (6, 129), (6, 193),
    (7, 257), (7, 385),
    (8, 513), (8, 769),
    (9, 1025), (9, 1537),
    (10, 2049), (10, 3073),
    (11, 4097), (11, 6145),
    (12, 8193), (12, 12289),
    (13, 16385), (13, 24577),
];

/// Per-level clone count: a symbol of code length `l` occupies this many
/// physical entries in the decode array. Levels 1..8 tile a 256-wide
/// direct segment; levels 9..15 tile a coarser tail segment addressed at
/// half the resolution (see `Decoder::lookup`).
const CLONES: [usize; MAX_CODE_LEN] = [128, 64, 32, 16, 8, 4, 2, 1, 64, 32, 16, 8, 4, 2, 1];

pub struct Decoder {
    entries: Vec<(u16, u8)>,
    fence: usize,
    fold: usize,
}

impl Decoder {
    /// Looks up the `(symbol, consumed_bit_count)` pair for the next 16
    /// raw input bits, already reversed by the caller via `reverse16`.
    #[inline(always)]
    pub fn lookup(&self, k: u16) -> (u16, u8) {
        let k = k as usize;
        let index = if k < self.fence {
            k >> 8
        } else {
            (k >> 1) - self.fold
        };
        self.entries[index]
    }

    #[inline(always)]
    pub fn lookup_bits(&self, word: u16) -> (u16, u8) {
        self.lookup(reverse16(word))
    }
}

fn size_and_materialize(
    counts: &[u32; MAX_CODE_LEN + 1],
    sorted_syms: &[u16],
) -> Result<Decoder, InflateError> {
    let mut interior: i64 = 1;
    let mut n = 0usize;
    let mut z = 0usize;
    for l in 1..=MAX_CODE_LEN {
        interior = 2 * interior - counts[l] as i64;
        if interior < 0 {
            return Err(InflateError::InvalidHuffmanTable);
        }
        z += counts[l] as usize * CLONES[l - 1];
        if l == 8 {
            n = 256 - interior as usize;
        }
    }
    if interior != 0 {
        return Err(InflateError::InvalidHuffmanTable);
    }

    let mut entries = Vec::with_capacity(z);
    let mut sym_idx = 0usize;
    for l in 1..=MAX_CODE_LEN {
        for _ in 0..counts[l] {
            let sym = sorted_syms[sym_idx];
            sym_idx += 1;
            for _ in 0..CLONES[l - 1] {
                entries.push((sym, l as u8));
            }
        }
    }
    debug_assert_eq!(entries.len(), z);

    Ok(Decoder {
        entries,
        fence: n * 256,
        fold: n * 127,
    })
}

fn canonical_from_lengths(lens: &[u8]) -> ([u32; MAX_CODE_LEN + 1], Vec<u16>) {
    let mut counts = [0u32; MAX_CODE_LEN + 1];
    for &len in lens {
        if len > 0 {
            counts[len as usize] += 1;
        }
    }
    let mut sorted_syms = Vec::with_capacity(lens.len());
    for l in 1..=MAX_CODE_LEN {
        for (sym, &len) in lens.iter().enumerate() {
            if len as usize == l {
                sorted_syms.push(sym as u16);
            }
        }
    }
    (counts, sorted_syms)
}

/// Builds a decoder strictly: an incomplete or overfull code is rejected
/// outright. Used for the run/literal table, which a conforming stream
/// never leaves degenerate (it always carries at least an end-of-block
/// symbol).
pub fn build_strict(lens: &[u8]) -> Result<Decoder, InflateError> {
    let (counts, sorted_syms) = canonical_from_lengths(lens);
    size_and_materialize(&counts, &sorted_syms)
}

/// Builds a decoder, synthesizing a 2-codeword length-1 tree when fewer
/// than two symbols have a nonzero length. Used for the distance table,
/// which real encoders may leave degenerate (e.g. a literal-only block).
pub fn build_normalizing(lens: &[u8], default_symbol: u16) -> Result<Decoder, InflateError> {
    let nonzero_count = lens.iter().filter(|&&l| l > 0).count();
    if nonzero_count >= 2 {
        return build_strict(lens);
    }
    let sym = lens
        .iter()
        .position(|&l| l > 0)
        .map(|i| i as u16)
        .unwrap_or(default_symbol);
    let mut counts = [0u32; MAX_CODE_LEN + 1];
    counts[1] = 2;
    size_and_materialize(&counts, &[sym, sym])
}

/// Builds the dynamic-block distance decoder from its `HDIST` code
/// lengths. `HDIST` can name up to 32 positions (symbols 30/31 are
/// reserved padding, spec.md §3), so a transmitted table that actually
/// assigns a codeword to one of them is malformed -- rejected here as
/// `InvalidHuffmanTable` rather than left to surface as
/// `InvalidStringReference` the first time such a codeword is decoded.
pub fn build_dist(lens: &[u8]) -> Result<Decoder, InflateError> {
    let split = lens.len().min(NUM_DIST_SYMS);
    if lens[split..].iter().any(|&l| l > 0) {
        return Err(InflateError::InvalidHuffmanTable);
    }
    build_normalizing(&lens[..split], 0)
}

/// The fixed (BTYPE=1) run/literal table: 0-143 -> 8 bits, 144-255 -> 9
/// bits, 256-279 -> 7 bits, 280-287 -> 8 bits.
pub fn fixed_litlen_decoder() -> Decoder {
    let mut lens = [0u8; NUM_LITLEN_CODES_FIXED];
    for (sym, len) in lens.iter_mut().enumerate() {
        *len = match sym {
            0..=143 => 8,
            144..=255 => 9,
            256..=279 => 7,
            _ => 8,
        };
    }
    build_strict(&lens).expect("fixed run/literal lengths are always a complete code")
}

/// The fixed (BTYPE=1) distance table: a complete 32-codeword tree at 5
/// bits each. Only symbols 0..=29 are valid distances; 30 and 31 are the
/// reserved padding entries RFC 1951 keeps the tree complete with (see
/// `dist_symbol_is_valid`) and are never actually emitted by a conforming
/// encoder.
pub fn fixed_dist_decoder() -> Decoder {
    let lens = [5u8; NUM_DIST_CODES_FIELD];
    build_strict(&lens).expect("fixed distance lengths are always a complete code")
}

pub fn dist_symbol_is_valid(symbol: u16) -> bool {
    (symbol as usize) < NUM_DIST_SYMS
}

const _: () = assert!(NUM_DIST_CODES_FIELD == NUM_DIST_SYMS + 2);
const _: () = assert!(NUM_LITLEN_SYMS + 2 == NUM_LITLEN_CODES_FIXED);
