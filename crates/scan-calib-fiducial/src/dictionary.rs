//! Marker dictionaries generated from the classic ArUco 5x5 code family.

/// Row codewords of the original ArUco family. Bit 4 is the leftmost
/// column; set bits are white cells.
const ROW_CODEWORDS: [u8; 4] = [0x10, 0x17, 0x09, 0x0e];

/// Number of payload bits per marker side.
pub const MARKER_BITS: usize = 5;

/// A fixed marker dictionary.
///
/// Codes pack the inner `marker_size x marker_size` bits into one `u64`
/// per marker, row-major with **black = 1**.
#[derive(Clone, Debug)]
pub struct Dictionary {
    /// Human-readable name (for debugging/logging).
    pub name: String,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// First id of the family range this dictionary was cut from.
    pub first_id: u32,
    pub codes: Vec<u64>,
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }
}

/// Inner code of one original-family marker id, row-major with black = 1.
///
/// Each of the five rows is one codeword, selected by the base-4 digits of
/// the id (most significant digit first).
fn aruco_original_code(id: u32) -> u64 {
    let mut code = 0u64;
    for row in 0..MARKER_BITS {
        let digit = (id >> (2 * (MARKER_BITS - 1 - row))) & 3;
        let word = ROW_CODEWORDS[digit as usize];
        for col in 0..MARKER_BITS {
            let white = (word >> (MARKER_BITS - 1 - col)) & 1;
            if white == 0 {
                code |= 1u64 << (row * MARKER_BITS + col);
            }
        }
    }
    code
}

/// Cut a `count`-marker dictionary out of the original ArUco family,
/// starting at `first_id`.
pub fn aruco_original_subset(first_id: u32, count: usize) -> Dictionary {
    let codes = (0..count as u32)
        .map(|i| aruco_original_code(first_id + i))
        .collect();
    Dictionary {
        name: format!("ARUCO_ORIGINAL[{first_id}..{}]", first_id as usize + count),
        marker_size: MARKER_BITS,
        first_id,
        codes,
    }
}
