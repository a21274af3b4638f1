// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The regex syntax tree.
//!
//! Nodes live in an arena and refer to each other by index, so the
//! followpos relation (which is cyclic through iteration nodes) never
//! forms an ownership cycle. The classical firstpos, lastpos and
//! followpos sets are computed as each interior node is constructed,
//! which is why there is no way to build a node other than through the
//! arena's factory methods.

/// The id of the null leaf token.
pub const NULL_TOKEN: u32 = !0;

/// The pseudo token for a `^` anchor leaf.
pub const BOL_TOKEN: u32 = !1;

/// The pseudo token for a `$` anchor leaf.
pub const EOL_TOKEN: u32 = !2;

/// The "no such id" sentinel used inside the transition tables.
pub const NPOS: u32 = !0;

/// An index of a node in a `TreeArena`.
pub type NodeId = usize;

/// The repetition discipline attached to a position.
///
/// `Yes` is the default for unquantified positions, `No` marks positions
/// under a lazy quantifier and `Hard` marks positions under an explicitly
/// greedy quantifier. `Hard` survives arbitration against `No` when two
/// rules overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreedyRepeat {
    /// Default greediness.
    Yes,
    /// Lazy (abstemious) repetition.
    No,
    /// Explicitly greedy repetition.
    Hard,
}

impl Default for GreedyRepeat {
    fn default() -> GreedyRepeat {
        GreedyRepeat::Yes
    }
}

/// The rule metadata carried by an end node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndData {
    /// The caller supplied rule id.
    pub id: u32,
    /// The caller supplied user id, `NPOS` when absent.
    pub user_id: u32,
    /// The 1-based declaration index of the rule across the whole rule set.
    pub unique_id: u32,
    /// The start-state to switch to after a match.
    pub next_dfa: u32,
    /// The start-state to push before switching, `NPOS` when absent.
    pub push_dfa: u32,
    /// Whether a match pops the start-state stack.
    pub pop_dfa: bool,
    /// The repetition discipline of the whole rule.
    pub greedy: GreedyRepeat,
}

#[derive(Debug)]
enum NodeKind {
    Leaf {
        token: u32,
        greedy: GreedyRepeat,
        greedy_set: bool,
        followpos: Vec<NodeId>,
    },
    Sequence {
        left: NodeId,
        right: NodeId,
    },
    Selection {
        left: NodeId,
        right: NodeId,
    },
    Iteration {
        next: NodeId,
        greedy: GreedyRepeat,
    },
    End(EndData),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    nullable: bool,
    firstpos: Vec<NodeId>,
    lastpos: Vec<NodeId>,
}

/// The arena that owns every node of the syntax trees for one start-state.
#[derive(Debug, Default)]
pub struct TreeArena {
    nodes: Vec<Node>,
}

impl TreeArena {
    /// Creates an empty arena.
    pub fn new() -> TreeArena {
        TreeArena::default()
    }

    /// Creates a leaf for `token` with default greediness.
    pub fn leaf(&mut self, token: u32) -> NodeId {
        self.make_leaf(token, GreedyRepeat::Yes, false)
    }

    fn make_leaf(&mut self, token: u32, greedy: GreedyRepeat, greedy_set: bool) -> NodeId {
        let id = self.nodes.len();
        let nullable = token == NULL_TOKEN;
        let positions = if nullable { Vec::new() } else { vec![id] };

        self.nodes.push(Node {
            kind: NodeKind::Leaf {
                token,
                greedy,
                greedy_set,
                followpos: Vec::new(),
            },
            nullable,
            firstpos: positions.clone(),
            lastpos: positions,
        });
        id
    }

    /// Creates an end node carrying `data`.
    pub fn end(&mut self, data: EndData) -> NodeId {
        let id = self.nodes.len();

        self.nodes.push(Node {
            kind: NodeKind::End(data),
            nullable: false,
            firstpos: vec![id],
            lastpos: vec![id],
        });
        id
    }

    /// Creates a catenation of `left` then `right` and wires followpos
    /// from the last positions of `left` to the first positions of
    /// `right`.
    pub fn sequence(&mut self, left: NodeId, right: NodeId) -> NodeId {
        let mut firstpos = self.nodes[left].firstpos.clone();
        if self.nodes[left].nullable {
            firstpos.extend_from_slice(&self.nodes[right].firstpos);
        }

        let mut lastpos = self.nodes[right].lastpos.clone();
        if self.nodes[right].nullable {
            lastpos.extend_from_slice(&self.nodes[left].lastpos);
        }

        let left_last = self.nodes[left].lastpos.clone();
        let right_first = self.nodes[right].firstpos.clone();
        for position in left_last {
            self.append_followpos(position, &right_first);
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Sequence { left, right },
            nullable: self.nodes[left].nullable && self.nodes[right].nullable,
            firstpos,
            lastpos,
        });
        id
    }

    /// Creates an alternation of `left` and `right`.
    pub fn selection(&mut self, left: NodeId, right: NodeId) -> NodeId {
        let mut firstpos = self.nodes[left].firstpos.clone();
        firstpos.extend_from_slice(&self.nodes[right].firstpos);

        let mut lastpos = self.nodes[left].lastpos.clone();
        lastpos.extend_from_slice(&self.nodes[right].lastpos);

        let id = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Selection { left, right },
            nullable: self.nodes[left].nullable || self.nodes[right].nullable,
            firstpos,
            lastpos,
        });
        id
    }

    /// Creates a Kleene closure of `next`, closing the followpos cycle
    /// from its last positions back to its first positions and marking
    /// the first positions with `greedy`.
    pub fn iteration(&mut self, next: NodeId, greedy: GreedyRepeat) -> NodeId {
        let firstpos = self.nodes[next].firstpos.clone();
        let lastpos = self.nodes[next].lastpos.clone();

        for &position in &lastpos {
            let first = firstpos.clone();
            self.append_followpos(position, &first);
        }

        for &position in &firstpos {
            self.set_greedy(position, greedy);
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Iteration { next, greedy },
            nullable: true,
            firstpos,
            lastpos,
        });
        id
    }

    /// Deep-copies the subtree rooted at `id`, rebuilding it through the
    /// factory methods so the copy gets its own followpos wiring.
    ///
    /// End nodes are never copied; they only exist at rule roots which
    /// repetition cannot reach.
    pub fn copy(&mut self, id: NodeId) -> NodeId {
        enum Shape {
            Leaf(u32, GreedyRepeat),
            Sequence(NodeId, NodeId),
            Selection(NodeId, NodeId),
            Iteration(NodeId, GreedyRepeat),
        }

        let shape = match self.nodes[id].kind {
            NodeKind::Leaf { token, greedy, .. } => Shape::Leaf(token, greedy),
            NodeKind::Sequence { left, right } => Shape::Sequence(left, right),
            NodeKind::Selection { left, right } => Shape::Selection(left, right),
            NodeKind::Iteration { next, greedy } => Shape::Iteration(next, greedy),
            NodeKind::End(_) => unreachable!("end nodes are not copied"),
        };

        match shape {
            Shape::Leaf(token, greedy) => {
                self.make_leaf(token, greedy, greedy != GreedyRepeat::Yes)
            }
            Shape::Sequence(left, right) => {
                let left = self.copy(left);
                let right = self.copy(right);
                self.sequence(left, right)
            }
            Shape::Selection(left, right) => {
                let left = self.copy(left);
                let right = self.copy(right);
                self.selection(left, right)
            }
            Shape::Iteration(next, greedy) => {
                let next = self.copy(next);
                self.iteration(next, greedy)
            }
        }
    }

    /// Latches the greediness of the leaf position `id`.
    ///
    /// The first explicit marking wins; later markings from outer
    /// quantifiers leave the position unchanged. End positions ignore
    /// the marking.
    pub fn set_greedy(&mut self, id: NodeId, value: GreedyRepeat) {
        if let NodeKind::Leaf {
            ref mut greedy,
            ref mut greedy_set,
            ..
        } = self.nodes[id].kind
        {
            if !*greedy_set {
                *greedy = value;
                *greedy_set = true;
            }
        }
    }

    fn append_followpos(&mut self, id: NodeId, positions: &[NodeId]) {
        match self.nodes[id].kind {
            NodeKind::Leaf {
                ref mut followpos, ..
            } => followpos.extend_from_slice(positions),
            // End positions have no successors.
            NodeKind::End(_) => {}
            _ => unreachable!("followpos only attaches to positions"),
        }
    }

    /// Whether the subtree rooted at `id` can match the empty string.
    pub fn nullable(&self, id: NodeId) -> bool {
        self.nodes[id].nullable
    }

    /// The first positions of the subtree rooted at `id`.
    pub fn firstpos(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].firstpos
    }

    /// The last positions of the subtree rooted at `id`.
    pub fn lastpos(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].lastpos
    }

    /// The followpos set of the position `id` (empty for end positions).
    pub fn followpos(&self, id: NodeId) -> &[NodeId] {
        static EMPTY: [NodeId; 0] = [];

        match self.nodes[id].kind {
            NodeKind::Leaf { ref followpos, .. } => followpos,
            _ => &EMPTY,
        }
    }

    /// The charset token of the position `id`, `None` for end positions.
    pub fn token(&self, id: NodeId) -> Option<u32> {
        match self.nodes[id].kind {
            NodeKind::Leaf { token, .. } => Some(token),
            _ => None,
        }
    }

    /// The greediness of the position `id`.
    pub fn greedy(&self, id: NodeId) -> GreedyRepeat {
        match self.nodes[id].kind {
            NodeKind::Leaf { greedy, .. } => greedy,
            NodeKind::Iteration { greedy, .. } => greedy,
            NodeKind::End(ref data) => data.greedy,
            _ => GreedyRepeat::Yes,
        }
    }

    /// The end-node metadata of the position `id`, `None` for other
    /// positions.
    pub fn end_data(&self, id: NodeId) -> Option<&EndData> {
        match self.nodes[id].kind {
            NodeKind::End(ref data) => Some(data),
            _ => None,
        }
    }

    /// Whether the position `id` is an end position.
    pub fn is_end(&self, id: NodeId) -> bool {
        self.end_data(id).is_some()
    }
}
