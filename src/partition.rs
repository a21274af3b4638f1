// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! Partitioning of overlapping charsets into disjoint equivalence
//! classes.
//!
//! The same intersection loop runs twice during a build: once over the
//! interned charsets of a start-state to produce the column alphabet, and
//! once per DFA state over the outgoing position groups so that every
//! transition lands on a unique column set.

use std::collections::BTreeSet;

use charset::CharSet;
use parser::CharsetMap;
use tree::{GreedyRepeat, NodeId, TreeArena, BOL_TOKEN, EOL_TOKEN, NULL_TOKEN};

/// One work item of the charset partition: a (shrinking) set of code
/// points together with the interned charset ids that contain it.
#[derive(Debug, Default, Clone)]
pub struct Charset {
    /// The code points of this partition member.
    pub token: CharSet,
    /// The interned charset ids whose sets contain `token`.
    pub index_set: BTreeSet<u32>,
}

impl Charset {
    fn new(token: CharSet, id: u32) -> Charset {
        let mut index_set = BTreeSet::new();
        index_set.insert(id);
        Charset { token, index_set }
    }

    fn is_empty(&self) -> bool {
        self.token.is_empty()
    }

    fn intersect(&mut self, rhs: &mut Charset, overlap: &mut Charset) {
        overlap.token = self.token.intersect(&rhs.token);

        if !overlap.token.is_empty() {
            overlap.index_set = self
                .index_set
                .union(&rhs.index_set)
                .cloned()
                .collect();
            self.token.remove(&overlap.token);
            rhs.token.remove(&overlap.token);
        }
    }
}

/// Splits the interned charsets of `map` into disjoint partition members.
///
/// Every input set is the union of some of the returned members, and each
/// member records which inputs contain it.
pub fn partition_charsets(map: &CharsetMap) -> Vec<Charset> {
    let mut rhs: Vec<Charset> = map
        .iter()
        .map(|(set, &id)| Charset::new(set.clone(), id))
        .collect();
    let mut lhs: Vec<Charset> = Vec::new();

    if rhs.is_empty() {
        return lhs;
    }

    rhs.reverse();
    lhs.push(rhs.pop().expect("rhs checked non-empty"));

    while let Some(mut r) = rhs.pop() {
        let mut i = 0;

        while !r.is_empty() && i < lhs.len() {
            let mut overlap = Charset::default();
            lhs[i].intersect(&mut r, &mut overlap);

            if overlap.is_empty() {
                i += 1;
            } else if lhs[i].is_empty() {
                lhs[i] = overlap;
                i += 1;
            } else if r.is_empty() {
                r = overlap;
                break;
            } else {
                lhs.insert(i + 1, overlap);
                i += 2;
            }
        }

        if !r.is_empty() {
            lhs.push(r);
        }
    }

    lhs
}

/// One outgoing transition group of a DFA state: the partition columns it
/// covers, the winning token, the arbitrated greediness and the successor
/// position set.
#[derive(Debug, Default, Clone)]
pub struct EquivSet {
    /// Sorted partition column ids (or an anchor sentinel).
    pub index_vector: Vec<u32>,
    /// The leaf token that won the intersection priority.
    pub id: u32,
    /// The arbitrated greediness of the group.
    pub greedy: GreedyRepeat,
    /// The successor position set.
    pub followpos: Vec<NodeId>,
}

impl EquivSet {
    fn new(
        index_set: &BTreeSet<u32>,
        id: u32,
        greedy: GreedyRepeat,
        followpos: Vec<NodeId>,
    ) -> EquivSet {
        EquivSet {
            index_vector: index_set.iter().cloned().collect(),
            id,
            greedy,
            followpos,
        }
    }

    fn is_empty(&self) -> bool {
        self.index_vector.is_empty() && self.followpos.is_empty()
    }

    fn intersect(&mut self, rhs: &mut EquivSet, overlap: &mut EquivSet) {
        intersect_indexes(
            &mut self.index_vector,
            &mut rhs.index_vector,
            &mut overlap.index_vector,
        );

        if overlap.index_vector.is_empty() {
            return;
        }

        // The LHS takes priority in order to respect rule ordering in
        // the rule set.
        overlap.id = self.id;
        overlap.greedy = process_greedy(self.greedy, rhs.greedy);
        overlap.followpos = self.followpos.clone();

        for &node in &rhs.followpos {
            if !overlap.followpos.contains(&node) {
                overlap.followpos.push(node);
            }
        }

        if self.index_vector.is_empty() {
            self.followpos.clear();
        }

        if rhs.index_vector.is_empty() {
            rhs.followpos.clear();
        }
    }
}

// lazy x hard = hard, lazy x anything-else = lazy, otherwise lhs wins
fn process_greedy(lhs: GreedyRepeat, rhs: GreedyRepeat) -> GreedyRepeat {
    if lhs == GreedyRepeat::No {
        if rhs == GreedyRepeat::Hard {
            rhs
        } else {
            lhs
        }
    } else {
        lhs
    }
}

fn intersect_indexes(lhs: &mut Vec<u32>, rhs: &mut Vec<u32>, overlap: &mut Vec<u32>) {
    overlap.extend(lhs.iter().cloned().filter(|id| rhs.binary_search(id).is_ok()));

    if !overlap.is_empty() {
        lhs.retain(|id| overlap.binary_search(id).is_err());
        rhs.retain(|id| overlap.binary_search(id).is_err());
    }
}

/// Groups the positions of one DFA state by partition column and
/// intersects the groups so every transition has a unique column set.
///
/// `set_mapping` maps interned charset ids to the partition columns that
/// make them up. Anchor positions keep their sentinel tokens as the sole
/// member of their column set.
pub fn build_equiv_list(
    arena: &TreeArena,
    positions: &[NodeId],
    set_mapping: &[BTreeSet<u32>],
) -> Vec<EquivSet> {
    let mut rhs = fill_rhs_list(arena, positions, set_mapping);
    let mut lhs: Vec<EquivSet> = Vec::new();

    if rhs.is_empty() {
        return lhs;
    }

    rhs.reverse();
    lhs.push(rhs.pop().expect("rhs checked non-empty"));

    while let Some(mut r) = rhs.pop() {
        let mut i = 0;

        while !r.is_empty() && i < lhs.len() {
            let mut overlap = EquivSet::default();
            lhs[i].intersect(&mut r, &mut overlap);

            if overlap.index_vector.is_empty() {
                i += 1;
            } else if lhs[i].is_empty() {
                lhs[i] = overlap;
                i += 1;
            } else if r.is_empty() {
                r = overlap;
                break;
            } else {
                lhs.insert(i + 1, overlap);
                i += 2;
            }
        }

        if !r.is_empty() {
            lhs.push(r);
        }
    }

    lhs
}

fn fill_rhs_list(
    arena: &TreeArena,
    positions: &[NodeId],
    set_mapping: &[BTreeSet<u32>],
) -> Vec<EquivSet> {
    let mut list = Vec::new();

    for &position in positions {
        if arena.is_end(position) {
            continue;
        }

        let token = match arena.token(position) {
            Some(token) if token != NULL_TOKEN => token,
            _ => continue,
        };

        let followpos = arena.followpos(position).to_vec();
        let greedy = arena.greedy(position);

        if token == BOL_TOKEN || token == EOL_TOKEN {
            let mut index_set = BTreeSet::new();
            index_set.insert(token);
            list.push(EquivSet::new(&index_set, token, greedy, followpos));
        } else {
            list.push(EquivSet::new(
                &set_mapping[token as usize],
                token,
                greedy,
                followpos,
            ));
        }
    }

    list
}
