// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! Simple case fold table.
//!
//! Each record maps a source range of code points to its case
//! counterparts. Contiguous alphabets use a constant delta; the Latin
//! Extended blocks interleave upper and lower case letters, so those
//! records pair adjacent code points instead.

/// How a fold record maps a source code point to its counterpart.
#[derive(Clone, Copy)]
enum FoldKind {
    /// Add a constant delta to the code point.
    Delta(i32),
    /// Pair adjacent code points: counting from `base`, an even offset
    /// maps one forward and an odd offset maps one back.
    Paired(u32),
}

struct FoldRecord {
    start: u32,
    end: u32,
    kind: FoldKind,
}

// Two-byte scalar ranges (BMP).
static BMP_FOLDS: &[FoldRecord] = &[
    // Basic Latin
    FoldRecord { start: 0x0041, end: 0x005A, kind: FoldKind::Delta(32) },
    FoldRecord { start: 0x0061, end: 0x007A, kind: FoldKind::Delta(-32) },
    // Latin-1 Supplement
    FoldRecord { start: 0x00C0, end: 0x00D6, kind: FoldKind::Delta(32) },
    FoldRecord { start: 0x00D8, end: 0x00DE, kind: FoldKind::Delta(32) },
    FoldRecord { start: 0x00E0, end: 0x00F6, kind: FoldKind::Delta(-32) },
    FoldRecord { start: 0x00F8, end: 0x00FE, kind: FoldKind::Delta(-32) },
    FoldRecord { start: 0x00FF, end: 0x00FF, kind: FoldKind::Delta(0x79) },
    FoldRecord { start: 0x0178, end: 0x0178, kind: FoldKind::Delta(-0x79) },
    // Latin Extended-A
    FoldRecord { start: 0x0100, end: 0x0137, kind: FoldKind::Paired(0x0100) },
    FoldRecord { start: 0x0139, end: 0x0148, kind: FoldKind::Paired(0x0139) },
    FoldRecord { start: 0x014A, end: 0x0177, kind: FoldKind::Paired(0x014A) },
    FoldRecord { start: 0x0179, end: 0x017E, kind: FoldKind::Paired(0x0179) },
    // Latin Extended-B (the paired stretches)
    FoldRecord { start: 0x01CD, end: 0x01DC, kind: FoldKind::Paired(0x01CD) },
    FoldRecord { start: 0x01DE, end: 0x01EF, kind: FoldKind::Paired(0x01DE) },
    FoldRecord { start: 0x01F8, end: 0x021F, kind: FoldKind::Paired(0x01F8) },
    FoldRecord { start: 0x0222, end: 0x0233, kind: FoldKind::Paired(0x0222) },
    FoldRecord { start: 0x0246, end: 0x024F, kind: FoldKind::Paired(0x0246) },
    // Greek
    FoldRecord { start: 0x0391, end: 0x03A1, kind: FoldKind::Delta(32) },
    FoldRecord { start: 0x03A3, end: 0x03AB, kind: FoldKind::Delta(32) },
    FoldRecord { start: 0x03B1, end: 0x03C1, kind: FoldKind::Delta(-32) },
    FoldRecord { start: 0x03C3, end: 0x03CB, kind: FoldKind::Delta(-32) },
    FoldRecord { start: 0x03C2, end: 0x03C2, kind: FoldKind::Delta(1) },
    FoldRecord { start: 0x03C3, end: 0x03C3, kind: FoldKind::Delta(-1) },
    // Cyrillic
    FoldRecord { start: 0x0400, end: 0x040F, kind: FoldKind::Delta(80) },
    FoldRecord { start: 0x0410, end: 0x042F, kind: FoldKind::Delta(32) },
    FoldRecord { start: 0x0430, end: 0x044F, kind: FoldKind::Delta(-32) },
    FoldRecord { start: 0x0450, end: 0x045F, kind: FoldKind::Delta(-80) },
    // Armenian
    FoldRecord { start: 0x0531, end: 0x0556, kind: FoldKind::Delta(48) },
    FoldRecord { start: 0x0561, end: 0x0586, kind: FoldKind::Delta(-48) },
];

// Four-byte scalar ranges (astral planes).
static ASTRAL_FOLDS: &[FoldRecord] = &[
    // Deseret
    FoldRecord { start: 0x10400, end: 0x10427, kind: FoldKind::Delta(40) },
    FoldRecord { start: 0x10428, end: 0x1044F, kind: FoldKind::Delta(-40) },
];

/// Reports the case counterparts of the code points in `[start, end]`.
///
/// `emit` is called once per counterpart range. Code points with no case
/// counterpart in the tables produce nothing.
pub fn fold_range<F>(start: u32, end: u32, emit: &mut F)
where
    F: FnMut(u32, u32),
{
    for record in BMP_FOLDS.iter().chain(ASTRAL_FOLDS) {
        let lo = start.max(record.start);
        let hi = end.min(record.end);

        if lo > hi {
            continue;
        }

        match record.kind {
            FoldKind::Delta(delta) => {
                let mapped_lo = (i64::from(lo) + i64::from(delta)) as u32;
                let mapped_hi = (i64::from(hi) + i64::from(delta)) as u32;
                emit(mapped_lo, mapped_hi);
            }
            FoldKind::Paired(base) => {
                for c in lo..=hi {
                    let counterpart = if (c - base) % 2 == 0 { c + 1 } else { c - 1 };
                    emit(counterpart, counterpart);
                }
            }
        }
    }
}
