//! Dictionary matching and rotation helpers.

use crate::dictionary::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Index of the marker within the dictionary.
    pub index: u32,
    /// Rotation `0..=3` such that: `observed_code == rotate(dict_code, rotation)`.
    pub rotation: u8,
    /// Hamming distance between observed and dictionary code (after rotation).
    pub hamming: u8,
}

#[derive(Clone, Copy, Debug)]
struct TableEntry {
    code: u64,
    index: u8,
    rotation: u8,
}

/// Matcher over a sample-square dictionary and its four rotations.
///
/// The dictionaries hold four well-separated codes, so all sixteen
/// id-rotation variants fit in one sorted table: a clean read resolves by
/// binary search, and only noisy reads pay for the Hamming pass.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    table: Vec<TableEntry>,
}

impl Matcher {
    /// Build a matcher for the given dictionary and Hamming threshold.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        debug_assert!(dict.bit_count() <= 64);
        debug_assert!(dict.codes.len() <= u8::MAX as usize);

        let mut table = Vec::with_capacity(dict.codes.len() * 4);
        for (index, &base) in dict.codes.iter().enumerate() {
            let mut code = base;
            for rotation in 0..4u8 {
                table.push(TableEntry {
                    code,
                    index: index as u8,
                    rotation,
                });
                code = rotate_once(code, dict.marker_size);
            }
        }
        table.sort_unstable_by_key(|e| e.code);

        Self {
            dict,
            max_hamming,
            table,
        }
    }

    /// Dictionary used by this matcher.
    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// Find the best match within `max_hamming`.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        if let Ok(pos) = self.table.binary_search_by_key(&observed, |e| e.code) {
            return Some(self.table[pos].as_match(0));
        }
        if self.max_hamming == 0 {
            return None;
        }

        let mut best: Option<Match> = None;
        for entry in &self.table {
            let h = (observed ^ entry.code).count_ones() as u8;
            if h <= self.max_hamming && best.is_none_or(|b| h < b.hamming) {
                best = Some(entry.as_match(h));
            }
        }
        best
    }
}

impl TableEntry {
    #[inline]
    fn as_match(&self, hamming: u8) -> Match {
        Match {
            index: self.index as u32,
            rotation: self.rotation,
            hamming,
        }
    }
}

/// Rotate a code stored in row-major bits (`idx = y * N + x`) by `rot`
/// clockwise quarter turns.
pub fn rotate_code(code: u64, n: usize, rot: u8) -> u64 {
    (0..rot & 3).fold(code, |c, _| rotate_once(c, n))
}

/// One clockwise quarter turn: the cell at `(x, y)` moves to `(n-1-y, x)`.
fn rotate_once(code: u64, n: usize) -> u64 {
    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            if (code >> (y * n + x)) & 1 == 1 {
                out |= 1u64 << (x * n + (n - 1 - y));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::aruco_original_subset;

    #[test]
    fn rotate_four_times_is_identity() {
        let code = 0x0123_4567_89ab_cdef_u64 & ((1 << 25) - 1);
        let r = rotate_code(code, 5, 1);
        let r = rotate_code(r, 5, 1);
        let r = rotate_code(r, 5, 1);
        let r = rotate_code(r, 5, 1);
        assert_eq!(code, r);
    }

    #[test]
    fn repeated_quarter_turns_compose() {
        let code = 0x1a2_b3c4_u64 & ((1 << 25) - 1);
        let twice = rotate_code(rotate_code(code, 5, 1), 5, 1);
        assert_eq!(rotate_code(code, 5, 2), twice);
        assert_eq!(rotate_code(code, 5, 3), rotate_code(twice, 5, 1));
    }

    #[test]
    fn single_cell_moves_clockwise() {
        // top-left cell of a 5x5 grid lands top-right after one turn
        let code = 1u64;
        assert_eq!(rotate_code(code, 5, 1), 1u64 << 4);
    }

    #[test]
    fn matcher_finds_rotated_code() {
        let dict = aruco_original_subset(512, 4);
        let matcher = Matcher::new(dict, 0);

        let base = matcher.dictionary().codes[2];
        let n = matcher.dictionary().marker_size;
        let observed = rotate_code(base, n, 3);
        let m = matcher.match_code(observed).expect("match");
        assert_eq!(m.index, 2);
        assert_eq!(m.rotation, 3);
        assert_eq!(m.hamming, 0);
    }

    #[test]
    fn one_bit_error_matches_within_budget() {
        let dict = aruco_original_subset(0, 4);
        let matcher = Matcher::new(dict, 1);

        let base = matcher.dictionary().codes[1];
        let m = matcher.match_code(base ^ (1 << 7)).expect("match");
        assert_eq!(m.index, 1);
        assert_eq!(m.hamming, 1);

        let zero_budget = Matcher::new(aruco_original_subset(0, 4), 0);
        assert!(zero_budget.match_code(base ^ (1 << 7)).is_none());
    }

    #[test]
    fn exact_reads_resolve_for_every_id_and_rotation() {
        for first in [0u32, 512] {
            let matcher = Matcher::new(aruco_original_subset(first, 4), 1);
            let n = matcher.dictionary().marker_size;
            for index in 0..4u32 {
                let base = matcher.dictionary().codes[index as usize];
                for rotation in 0..4u8 {
                    let observed = rotate_code(base, n, rotation);
                    let m = matcher.match_code(observed).expect("match");
                    assert_eq!((m.index, m.rotation, m.hamming), (index, rotation, 0));
                }
            }
        }
    }
}
