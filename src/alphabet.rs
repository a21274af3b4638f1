// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The code point to transition column lookup.
//!
//! Every start-state carries one lookup built from its partition
//! members. Code points outside every partition member map to the dead
//! column, whose cell is zero in every row of the transition table.

use charset::Range;
use state_machine::column;

const BYTE_ROW: usize = 256;
const HIGH_ROW: usize = 0x11;

/// The lookup strategy of one start-state.
///
/// An 8-bit alphabet gets a direct 256 entry table. Wider alphabets get
/// either a full direct table or, with the compressed flag, a three
/// level trie keyed by the high, middle and low bytes of the code
/// point.
#[derive(Debug, Clone, PartialEq)]
pub enum AlphabetLookup {
    /// A direct code point indexed table.
    Dense(Vec<u32>),
    /// The three level byte trie.
    Trie(Trie),
}

impl AlphabetLookup {
    /// Chooses a strategy for an alphabet whose largest code point is
    /// `max_code_point`.
    pub fn new(compressed: bool, max_code_point: Option<u32>) -> AlphabetLookup {
        let max = max_code_point.unwrap_or(0);

        if max < 0x100 {
            AlphabetLookup::Dense(vec![column::DEAD as u32; BYTE_ROW])
        } else if compressed {
            AlphabetLookup::Trie(Trie::new())
        } else {
            AlphabetLookup::Dense(vec![column::DEAD as u32; 0x11_0000])
        }
    }

    /// Maps every code point of `ranges` to `col`.
    pub fn set_ranges(&mut self, ranges: &[Range], col: u32) {
        for range in ranges {
            match *self {
                AlphabetLookup::Dense(ref mut table) => {
                    for cell in &mut table[range.start() as usize..=range.end() as usize] {
                        *cell = col;
                    }
                }
                AlphabetLookup::Trie(ref mut trie) => {
                    trie.set_range(range.start(), range.end(), col);
                }
            }
        }
    }

    /// The transition column of `cp`.
    pub fn get(&self, cp: u32) -> u32 {
        match *self {
            AlphabetLookup::Dense(ref table) => table
                .get(cp as usize)
                .cloned()
                .unwrap_or(column::DEAD as u32),
            AlphabetLookup::Trie(ref trie) => trie.get(cp),
        }
    }
}

/// The compressed lookup: high byte to middle row, middle byte to low
/// row, low byte to column. Row zero of each level is the shared
/// all-dead row, so untouched stretches of the alphabet cost nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Trie {
    high: Vec<u32>,
    mids: Vec<Vec<u32>>,
    lows: Vec<Vec<u32>>,
}

impl Trie {
    fn new() -> Trie {
        Trie {
            high: vec![0; HIGH_ROW],
            mids: vec![vec![0; BYTE_ROW]],
            lows: vec![vec![column::DEAD as u32; BYTE_ROW]],
        }
    }

    fn get(&self, cp: u32) -> u32 {
        if cp > 0x10_FFFF {
            return column::DEAD as u32;
        }

        let mid_row = self.high[(cp >> 16) as usize] as usize;
        let low_row = self.mids[mid_row][((cp >> 8) & 0xFF) as usize] as usize;
        self.lows[low_row][(cp & 0xFF) as usize]
    }

    fn set_range(&mut self, start: u32, end: u32, col: u32) {
        let mut cp = start;

        while cp <= end {
            let block_end = (cp | 0xFF).min(end);
            let row = self.low_row_mut(cp);

            for b in (cp & 0xFF)..=(block_end & 0xFF) {
                row[b as usize] = col;
            }

            match block_end.checked_add(1) {
                Some(next) => cp = next,
                None => break,
            }
        }
    }

    // The writable low row of the 256 code point block holding `cp`,
    // splitting shared rows off on demand.
    fn low_row_mut(&mut self, cp: u32) -> &mut Vec<u32> {
        let high = (cp >> 16) as usize;
        let mid = ((cp >> 8) & 0xFF) as usize;

        if self.high[high] == 0 {
            self.high[high] = self.mids.len() as u32;
            self.mids.push(vec![0; BYTE_ROW]);
        }

        let mid_row = self.high[high] as usize;
        if self.mids[mid_row][mid] == 0 {
            self.mids[mid_row][mid] = self.lows.len() as u32;
            self.lows.push(vec![column::DEAD as u32; BYTE_ROW]);
        }

        let low_row = self.mids[mid_row][mid] as usize;
        &mut self.lows[low_row]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ranges(pairs: &[(u32, u32)]) -> Vec<Range> {
        pairs.iter().map(|&(s, e)| Range::new(s, e)).collect()
    }

    #[test]
    fn small_alphabet_chooses_the_byte_table() {
        let sut = AlphabetLookup::new(false, Some(0xFF));

        assert_matches!(sut, AlphabetLookup::Dense(ref table) if table.len() == 256);
    }

    #[test]
    fn compressed_wide_alphabet_chooses_the_trie() {
        let sut = AlphabetLookup::new(true, Some(0x4E00));

        assert_matches!(sut, AlphabetLookup::Trie(_));
    }

    #[test]
    fn unmapped_code_points_land_on_the_dead_column() {
        let sut = AlphabetLookup::new(false, Some(0xFF));

        assert_eq!(sut.get(b'a' as u32), column::DEAD as u32);
        assert_eq!(sut.get(0x10_FFFF), column::DEAD as u32);
    }

    #[test]
    fn dense_lookup_maps_its_ranges() {
        let mut sut = AlphabetLookup::new(false, Some(0xFF));

        sut.set_ranges(&ranges(&[(b'0' as u32, b'9' as u32)]), 7);

        assert_eq!(sut.get(b'5' as u32), 7);
        assert_eq!(sut.get(b'a' as u32), column::DEAD as u32);
    }

    #[test]
    fn trie_lookup_maps_ranges_across_block_boundaries() {
        let mut sut = AlphabetLookup::new(true, Some(0x10_FFFF));

        sut.set_ranges(&ranges(&[(0x00FE, 0x0102), (0x1F600, 0x1F600)]), 9);

        assert_eq!(sut.get(0x00FE), 9);
        assert_eq!(sut.get(0x0100), 9);
        assert_eq!(sut.get(0x0102), 9);
        assert_eq!(sut.get(0x0103), column::DEAD as u32);
        assert_eq!(sut.get(0x1F600), 9);
        assert_eq!(sut.get(0x1F601), column::DEAD as u32);
    }

    #[test]
    fn trie_shares_the_dead_rows_for_untouched_blocks() {
        let mut sut = Trie::new();

        sut.set_range(0x41, 0x5A, 8);

        // only the one touched block allocated fresh rows
        assert_eq!(sut.mids.len(), 2);
        assert_eq!(sut.lows.len(), 2);
        assert_eq!(sut.get(0x4E00), column::DEAD as u32);
    }
}
