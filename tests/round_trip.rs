//! End-to-end properties from spec.md §8, driven against a real zlib
//! encoder (`flate2`) rather than hand-rolled streams wherever a
//! reference encoder can produce the case. `flate2` is a dev-dependency
//! only -- it never appears in the library's own dependency graph.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

use pix_inflate::{InflateError, Inflator, PushStatus};

fn zlib_compress(data: &[u8], level: Compression) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn decompress_single_shot(compressed: &[u8]) -> Result<Vec<u8>, InflateError> {
    let mut inflator = Inflator::new();
    let status = inflator.push(compressed)?;
    assert_eq!(status, PushStatus::Done);
    let mut out = Vec::new();
    let mut remaining = inflator.retained();
    while remaining > 0 {
        let chunk = inflator.pull(remaining).expect("retained count was accurate");
        out.extend_from_slice(&chunk);
        remaining = inflator.retained();
    }
    Ok(out)
}

fn decompress_chunked(compressed: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut inflator = Inflator::new();
    let mut out = Vec::new();
    for chunk in compressed.chunks(chunk_size.max(1)) {
        let status = inflator.push(chunk).unwrap();
        let mut remaining = inflator.retained();
        while remaining > 0 {
            let bytes = inflator.pull(remaining).unwrap();
            out.extend_from_slice(&bytes);
            remaining = inflator.retained();
        }
        if status == PushStatus::Done {
            break;
        }
    }
    out
}

#[test]
fn round_trip_across_compression_levels_and_block_types() {
    let samples: &[&[u8]] = &[
        b"",
        b"x",
        b"Hello, World!",
        b"the quick brown fox jumps over the lazy dog",
    ];
    for &sample in samples {
        for level in [Compression::none(), Compression::fast(), Compression::best()] {
            let compressed = zlib_compress(sample, level);
            let out = decompress_single_shot(&compressed).unwrap();
            assert_eq!(out, sample, "level={level:?}");
        }
    }
}

#[test]
fn e3_run_of_300_identical_bytes_round_trips() {
    let data = vec![0x41u8; 300];
    let compressed = zlib_compress(&data, Compression::best());
    let out = decompress_single_shot(&compressed).unwrap();
    assert_eq!(out, data);
}

#[test]
fn incremental_equivalence_holds_for_arbitrary_chunkings() {
    let data: Vec<u8> = (0..4000).map(|i| (i % 251) as u8).collect();
    let compressed = zlib_compress(&data, Compression::best());
    let whole = decompress_single_shot(&compressed).unwrap();
    assert_eq!(whole, data);

    for chunk_size in [1, 2, 3, 7, 17, compressed.len()] {
        let chunked = decompress_chunked(&compressed, chunk_size);
        assert_eq!(chunked, data, "chunk_size={chunk_size}");
    }
}

#[test]
fn e4_checksum_corruption_is_rejected_for_a_real_stream() {
    let data = b"Hello, World! This is a longer message to compress.";
    let mut compressed = zlib_compress(data, Compression::best());
    *compressed.last_mut().unwrap() ^= 0x01;
    let err = decompress_single_shot(&compressed).unwrap_err();
    assert_eq!(err, InflateError::InvalidStreamChecksum);
}

#[test]
fn e5_out_of_window_distance_is_rejected() {
    // Hand-built raw-DEFLATE fixed-Huffman block: literals 'H','e', then a
    // length-3 back-reference at distance 5 (only 2 bytes are resident),
    // then end-of-block. Verified independently against Python's `zlib`
    // module, which raises the equivalent "invalid distance too far
    // back" on the same bytes.
    let compressed: Vec<u8> = vec![0x78, 0x01, 0xf3, 0x48, 0x05, 0x12, 0x00];
    let mut inflator = Inflator::new();
    let err = inflator.push(&compressed).unwrap_err();
    assert_eq!(err, InflateError::InvalidStringReference);
}

#[test]
fn out_of_window_distance_emits_no_bytes_after_the_error() {
    let compressed: Vec<u8> = vec![0x78, 0x01, 0xf3, 0x48, 0x05, 0x12, 0x00];
    let mut inflator = Inflator::new();
    assert!(inflator.push(&compressed).is_err());
    assert_eq!(inflator.retained(), 2, "the two literals before the bad token are still staged");
}
