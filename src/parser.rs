// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The shift-reduce regex parser.
//!
//! The parser runs the operator precedence relation from the token module
//! over two explicit stacks: a token stack holding the current handle and
//! a node stack holding the partial syntax trees. Reductions allocate
//! nodes in the tree arena and intern every charset they meet into the
//! shared charset map, whose dense ids become the leaf tokens of the
//! tree.

use std::collections::BTreeMap;

use charset::CharSet;
use error::{Error, Result};
use token::{Precedence, Token, TokenKind};
use tree::{EndData, GreedyRepeat, NodeId, TreeArena, BOL_TOKEN, EOL_TOKEN, NPOS, NULL_TOKEN};

/// The map from interned charsets to their dense leaf token ids.
pub type CharsetMap = BTreeMap<CharSet, u32>;

/// A parser for the rules of one start-state.
///
/// The parser owns the working stacks and borrows the arena and charset
/// map that are shared by every rule of the start-state.
pub struct Parser<'a> {
    arena: &'a mut TreeArena,
    charset_map: &'a mut CharsetMap,
    token_stack: Vec<Token>,
    tree_stack: Vec<NodeId>,
    cr_id: Option<u32>,
    nl_id: Option<u32>,
}

impl<'a> Parser<'a> {
    /// Creates a parser over the start-state's `arena` and `charset_map`.
    pub fn new(arena: &'a mut TreeArena, charset_map: &'a mut CharsetMap) -> Parser<'a> {
        Parser {
            arena,
            charset_map,
            token_stack: Vec::new(),
            tree_stack: Vec::new(),
            cr_id: None,
            nl_id: None,
        }
    }

    /// Chains a newly parsed rule root onto the combined root of the
    /// start-state.
    pub fn or_roots(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.arena.selection(lhs, rhs)
    }

    /// The interned id of the `\r` singleton charset, once a `$` anchor
    /// has been seen.
    pub fn cr_id(&self) -> Option<u32> {
        self.cr_id
    }

    /// The interned id of the `\n` singleton charset, once a `$` anchor
    /// has been seen.
    pub fn nl_id(&self) -> Option<u32> {
        self.nl_id
    }

    /// Parses one rule's token vector into a syntax tree rooted by a
    /// sequence onto the rule's end node.
    ///
    /// `seen_bol` grafts the synthetic begin-of-line selection onto the
    /// root so every rule of an anchored start-state threads through the
    /// pseudo BOL column.
    pub fn parse(
        &mut self,
        tokens: &[Token],
        rule_index: usize,
        end: EndData,
        seen_bol: bool,
    ) -> Result<NodeId> {
        debug_assert!(self.token_stack.is_empty());

        let mut pos = 0;
        self.token_stack.push(tokens[pos].clone());
        pos += 1;

        let mut rhs = tokens[pos].clone();
        if pos + 1 < tokens.len() {
            pos += 1;
        }

        loop {
            let lhs_kind = self
                .token_stack
                .last()
                .map(|token| token.kind)
                .expect("token stack checked below");

            match lhs_kind.precedence(rhs.kind) {
                Precedence::Below | Precedence::Equal => {
                    self.token_stack.push(rhs);
                    rhs = tokens[pos].clone();
                    if pos + 1 < tokens.len() {
                        pos += 1;
                    }
                }
                Precedence::Above => self.reduce()?,
                Precedence::None => {
                    self.token_stack.clear();
                    self.tree_stack.clear();
                    return Err(Error::Syntax {
                        position: pos,
                        lhs: lhs_kind.precedence_class(),
                        rhs: rhs.kind.precedence_class(),
                    });
                }
            }

            if self.token_stack.is_empty() {
                break;
            }
        }

        if self.tree_stack.is_empty() {
            return Err(Error::EmptyRule { rule_index });
        }

        if self.tree_stack.len() != 1 {
            self.tree_stack.clear();
            return Err(Error::Syntax {
                position: tokens.len(),
                lhs: TokenKind::Regex.precedence_class(),
                rhs: TokenKind::End.precedence_class(),
            });
        }

        let body = self.tree_stack.pop().expect("tree stack checked above");
        let end_node = self.arena.end(end);
        let mut root = self.arena.sequence(body, end_node);

        if seen_bol {
            root = self.fixup_bol(root);
        }

        Ok(root)
    }

    fn reduce(&mut self) -> Result<()> {
        let mut handle: Vec<Token> = Vec::new();

        loop {
            let popped = self
                .token_stack
                .pop()
                .expect("reduce is only entered with a non-empty stack");
            handle.push(popped);

            match self.token_stack.last() {
                Some(lhs) => {
                    let bottom = handle.last().expect("just pushed").kind;
                    if lhs.kind.precedence(bottom) != Precedence::Equal {
                        break;
                    }
                }
                None => break,
            }
        }

        let bottom = handle.last().expect("at least one token popped").kind;

        match bottom {
            // finished processing
            TokenKind::Begin | TokenKind::Regex => {}
            TokenKind::OrExp => self.orexp(&handle)?,
            TokenKind::Sequence => self.push_token(TokenKind::OrExp),
            TokenKind::Sub => self.sub(&handle)?,
            TokenKind::Expression => self.push_token(TokenKind::Sub),
            TokenKind::Repeat => self.repeat(&handle)?,
            TokenKind::Bol => {
                let leaf = self.arena.leaf(BOL_TOKEN);
                self.tree_stack.push(leaf);
                self.push_token(TokenKind::Repeat);
            }
            TokenKind::Eol => {
                let nl = self.intern(&CharSet::single('\n' as u32))?;
                let cr = self.intern(&CharSet::single('\r' as u32))?;
                self.nl_id = Some(nl);
                self.cr_id = Some(cr);

                let leaf = self.arena.leaf(EOL_TOKEN);
                self.tree_stack.push(leaf);
                self.push_token(TokenKind::Repeat);
            }
            TokenKind::Charset => {
                let id = self.intern(&handle[0].set)?;
                let leaf = self.arena.leaf(id);
                self.tree_stack.push(leaf);
                self.push_token(TokenKind::Repeat);
            }
            TokenKind::OpenParen => {
                if handle.len() != 3
                    || handle[0].kind != TokenKind::CloseParen
                    || handle[1].kind != TokenKind::Regex
                {
                    return Err(Error::Syntax {
                        position: 0,
                        lhs: TokenKind::OpenParen.precedence_class(),
                        rhs: handle[0].kind.precedence_class(),
                    });
                }
                self.push_token(TokenKind::Repeat);
            }
            TokenKind::Opt | TokenKind::AOpt => {
                self.optional(bottom == TokenKind::Opt);
                self.push_token(TokenKind::Dup);
            }
            TokenKind::ZeroOrMore | TokenKind::AZeroOrMore => {
                self.zero_or_more(bottom == TokenKind::ZeroOrMore);
                self.push_token(TokenKind::Dup);
            }
            TokenKind::OneOrMore | TokenKind::AOneOrMore => {
                self.one_or_more(bottom == TokenKind::OneOrMore);
                self.push_token(TokenKind::Dup);
            }
            TokenKind::RepeatN | TokenKind::ARepeatN => {
                let extra = handle[0].extra.clone();
                self.repeat_n(bottom == TokenKind::RepeatN, &extra);
                self.push_token(TokenKind::Dup);
            }
            _ => {
                return Err(Error::Syntax {
                    position: 0,
                    lhs: bottom.precedence_class(),
                    rhs: bottom.precedence_class(),
                })
            }
        }

        Ok(())
    }

    fn push_token(&mut self, kind: TokenKind) {
        self.token_stack.push(Token::new(kind));
    }

    fn orexp(&mut self, handle: &[Token]) -> Result<()> {
        if handle.len() == 1 {
            self.push_token(TokenKind::Regex);
        } else if handle.len() == 3
            && handle[0].kind == TokenKind::Sequence
            && handle[1].kind == TokenKind::Or
        {
            self.perform_or();
            self.push_token(TokenKind::OrExp);
        } else {
            return Err(Error::Syntax {
                position: 0,
                lhs: TokenKind::OrExp.precedence_class(),
                rhs: handle[0].kind.precedence_class(),
            });
        }

        Ok(())
    }

    fn perform_or(&mut self) {
        let rhs = self.tree_stack.pop().expect("or needs two operands");
        let lhs = self.tree_stack.pop().expect("or needs two operands");
        let node = self.arena.selection(lhs, rhs);
        self.tree_stack.push(node);
    }

    fn sub(&mut self, handle: &[Token]) -> Result<()> {
        if handle.len() == 1 {
            self.push_token(TokenKind::Sequence);
        } else if handle.len() == 2 && handle[0].kind == TokenKind::Expression {
            self.sequence();
            self.push_token(TokenKind::Sub);
        } else {
            return Err(Error::Syntax {
                position: 0,
                lhs: TokenKind::Sub.precedence_class(),
                rhs: handle[0].kind.precedence_class(),
            });
        }

        Ok(())
    }

    fn repeat(&mut self, handle: &[Token]) -> Result<()> {
        if handle.len() == 1 {
            self.push_token(TokenKind::Expression);
        } else if handle.len() == 2 && handle[0].kind == TokenKind::Dup {
            self.push_token(TokenKind::Repeat);
        } else {
            return Err(Error::Syntax {
                position: 0,
                lhs: TokenKind::Repeat.precedence_class(),
                rhs: handle[0].kind.precedence_class(),
            });
        }

        Ok(())
    }

    fn sequence(&mut self) {
        let rhs = self.tree_stack.pop().expect("join needs two operands");
        let lhs = self.tree_stack.pop().expect("join needs two operands");
        let node = self.arena.sequence(lhs, rhs);
        self.tree_stack.push(node);
    }

    fn optional(&mut self, greedy: bool) {
        let top = *self.tree_stack.last().expect("optional needs an operand");
        let mark = repeat_greediness(greedy);

        for position in self.arena.firstpos(top).to_vec() {
            self.arena.set_greedy(position, mark);
        }

        let null = self.arena.leaf(NULL_TOKEN);
        let node = self.arena.selection(top, null);
        *self.tree_stack.last_mut().expect("checked above") = node;
    }

    fn zero_or_more(&mut self, greedy: bool) {
        let top = *self.tree_stack.last().expect("iteration needs an operand");
        let node = self.arena.iteration(top, repeat_greediness(greedy));
        *self.tree_stack.last_mut().expect("checked above") = node;
    }

    fn one_or_more(&mut self, greedy: bool) {
        let top = *self.tree_stack.last().expect("iteration needs an operand");
        let copy = self.arena.copy(top);
        let iter = self.arena.iteration(copy, repeat_greediness(greedy));
        let node = self.arena.sequence(top, iter);
        *self.tree_stack.last_mut().expect("checked above") = node;
    }

    // {n[,[m]]} unrolls into n mandatory copies followed by either m - n
    // optional copies or a trailing iteration. The degenerate forms were
    // normalized away by the tokenizer, so 1 < n or a comma is present.
    fn repeat_n(&mut self, greedy: bool, extra: &str) {
        let (min, comma, max) = split_counts(extra);

        if min == 1 && !comma {
            return;
        }

        let top_count = if min > 0 { min } else { max };

        if min == 0 {
            self.optional(greedy);
        }

        let top = *self.tree_stack.last().expect("repeat needs an operand");
        let mut prev = self.arena.copy(top);

        for _ in 2..top_count {
            let curr = self.arena.copy(prev);
            self.tree_stack.push(prev);
            self.sequence();
            prev = curr;
        }

        if comma && min > 0 {
            if min > 1 {
                let curr = self.arena.copy(prev);
                self.tree_stack.push(prev);
                self.sequence();
                prev = curr;
            }

            if max > 0 {
                self.tree_stack.push(prev);
                self.optional(greedy);
                prev = self.tree_stack.pop().expect("optional left a node");

                let count = max - min;
                for _ in 1..count {
                    let curr = self.arena.copy(prev);
                    self.tree_stack.push(prev);
                    self.sequence();
                    prev = curr;
                }
            } else {
                self.tree_stack.push(prev);
                self.zero_or_more(greedy);
                prev = self.tree_stack.pop().expect("iteration left a node");
            }
        }

        self.tree_stack.push(prev);
        self.sequence();
    }

    fn intern(&mut self, set: &CharSet) -> Result<u32> {
        if let Some(&id) = self.charset_map.get(set) {
            return Ok(id);
        }

        let id = self.charset_map.len() as u32;
        if id >= NPOS - 2 {
            return Err(Error::AlphabetOverflow);
        }

        self.charset_map.insert(set.clone(), id);
        Ok(id)
    }

    // Rules without an explicit '^' still have to thread through the
    // pseudo BOL column when any rule of the start-state is anchored.
    fn fixup_bol(&mut self, root: NodeId) -> NodeId {
        let anchored = self
            .arena
            .firstpos(root)
            .iter()
            .any(|&p| !self.arena.is_end(p) && self.arena.token(p) == Some(BOL_TOKEN));

        if anchored {
            return root;
        }

        let bol = self.arena.leaf(BOL_TOKEN);
        let null = self.arena.leaf(NULL_TOKEN);
        let sel = self.arena.selection(bol, null);
        self.arena.sequence(sel, root)
    }
}

fn repeat_greediness(greedy: bool) -> GreedyRepeat {
    if greedy {
        GreedyRepeat::Hard
    } else {
        GreedyRepeat::No
    }
}

fn split_counts(extra: &str) -> (u32, bool, u32) {
    let mut parts = extra.splitn(2, ',');
    let min = parts
        .next()
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0);

    match parts.next() {
        None => (min, false, 0),
        Some("") => (min, true, 0),
        Some(digits) => (min, true, digits.parse().unwrap_or(0)),
    }
}
