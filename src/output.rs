//! Output ring buffer: a sliding-window byte buffer that backs both LZ77
//! back-reference resolution and the pull-side released-bytes API.
//!
//! Four logical indices walk forward over the lifetime of a session:
//! `base_index <= start_index <= current_index <= end_index`. Only the
//! span `[base_index, end_index)` is physically resident in `data`;
//! everything before `base_index` has been checksummed and discarded.
//!
//! Rather than replay the spec's "fold the displaced prefix into the
//! checksum at compaction time" dance, the Adler-32 state here is fed
//! every byte the instant it is produced (`append`/`expand`), which
//! yields an identical final checksum with no combine-on-shift logic.

use crate::adler32::Adler32;

/// Physical storage is allowed to grow this far past `window` before a
/// compaction pass reclaims the aged-out prefix.
const SHIFT_SLACK: usize = 1 << 16;

pub struct OutputBuffer {
    data: Vec<u8>,
    base_index: usize,
    start_index: usize,
    current_index: usize,
    end_index: usize,
    window: usize,
    checksum: Adler32,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base_index: 0,
            start_index: 0,
            current_index: 0,
            end_index: 0,
            window: 1 << 15,
            checksum: Adler32::new(),
        }
    }

    pub fn set_window(&mut self, window: usize) {
        self.window = window;
    }

    #[inline(always)]
    fn local(&self, logical: usize) -> usize {
        logical - self.base_index
    }

    #[inline(always)]
    pub fn end_index(&self) -> usize {
        self.end_index
    }

    /// Count of back-reference bytes actually retained right now.
    #[inline(always)]
    pub fn window_len(&self) -> usize {
        self.end_index - self.start_index
    }

    /// Count of bytes produced but not yet released via `release`.
    #[inline(always)]
    pub fn retained(&self) -> usize {
        self.end_index - self.current_index
    }

    pub fn append(&mut self, byte: u8) {
        self.append_slice(&[byte]);
    }

    pub fn append_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.checksum.update(bytes);
        self.end_index += bytes.len();
        self.advance_window();
        self.maybe_shift();
    }

    /// Copies `count` bytes from `offset` bytes back to the current end,
    /// permitting `count > offset` (the classic LZ77 run-length trick).
    /// The caller must have already checked `offset <= window_len()`.
    pub fn expand(&mut self, offset: usize, count: usize) {
        let mut remaining = count;
        while remaining > 0 {
            let take = remaining.min(offset);
            let src_start = self.local(self.end_index - offset);
            for i in 0..take {
                let byte = self.data[src_start + i];
                self.data.push(byte);
                self.checksum.update(&[byte]);
            }
            self.end_index += take;
            remaining -= take;
        }
        self.advance_window();
        self.maybe_shift();
    }

    fn advance_window(&mut self) {
        let floor = self.end_index.saturating_sub(self.window);
        if self.start_index < floor {
            self.start_index = floor;
        }
    }

    /// Returns up to `n` released bytes, or `None` if fewer than `n` are
    /// currently produced-but-unreleased.
    pub fn release(&mut self, n: usize) -> Option<Vec<u8>> {
        if self.end_index - self.current_index < n {
            return None;
        }
        let start = self.local(self.current_index);
        let bytes = self.data[start..start + n].to_vec();
        self.current_index += n;
        self.start_index = self
            .start_index
            .max(self.end_index.saturating_sub(self.window))
            .min(self.current_index);
        Some(bytes)
    }

    pub fn checksum(&self) -> u32 {
        self.checksum.finalize()
    }

    fn maybe_shift(&mut self) {
        let cap = self.window + SHIFT_SLACK;
        if self.data.len() <= cap {
            return;
        }
        let drop = self.start_index.min(self.current_index) - self.base_index;
        if drop > 0 {
            self.data.drain(0..drop);
            self.base_index += drop;
        }
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_release_round_trip() {
        let mut out = OutputBuffer::new();
        out.set_window(32768);
        for byte in b"Hello" {
            out.append(*byte);
        }
        assert_eq!(out.retained(), 5);
        assert_eq!(out.release(5).unwrap(), b"Hello");
        assert_eq!(out.retained(), 0);
    }

    #[test]
    fn release_withholds_until_enough_bytes() {
        let mut out = OutputBuffer::new();
        out.append(1);
        assert!(out.release(2).is_none());
        out.append(2);
        assert_eq!(out.release(2).unwrap(), vec![1, 2]);
    }

    #[test]
    fn expand_replicates_overlapping_run() {
        let mut out = OutputBuffer::new();
        out.set_window(32768);
        out.append(b'A');
        out.expand(1, 299);
        assert_eq!(out.release(300).unwrap(), vec![b'A'; 300]);
    }

    #[test]
    fn checksum_matches_known_adler32() {
        let mut out = OutputBuffer::new();
        out.set_window(32768);
        out.append_slice(b"Wikipedia");
        assert_eq!(out.checksum(), 0x11E60398);
    }

    #[test]
    fn window_bounds_back_reference_distance() {
        let mut out = OutputBuffer::new();
        out.set_window(4);
        out.append_slice(b"abcdef");
        assert_eq!(out.window_len(), 4);
    }
}
