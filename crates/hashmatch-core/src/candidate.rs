//! Decides whether clipboard text looks like a digest worth comparing.
//!
//! Only the hex length of the compare algorithm is accepted (64 for sha256).
//! Shorter md5/sha1 strings are deliberately not candidates.

use crate::digest::Algorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateDetector {
    len: usize,
}

impl Default for CandidateDetector {
    fn default() -> Self {
        Self::for_algorithm(Algorithm::Sha256)
    }
}

impl CandidateDetector {
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        Self {
            len: algorithm.hex_len(),
        }
    }

    #[cfg(test)]
    fn expected_len(&self) -> usize {
        self.len
    }

    /// True iff the trimmed text is exactly the configured number of hex digits (either case).
    pub fn is_candidate(&self, text: &str) -> bool {
        let t = text.trim();
        t.len() == self.len && t.bytes().all(|b| b.is_ascii_hexdigit())
    }
}
