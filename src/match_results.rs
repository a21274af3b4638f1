// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The scanner cursor and match result.
//!
//! A `MatchResults` borrows the caller's input and carries everything a
//! scan needs between calls to `lookup`: the bounds of the last match,
//! the current start-state, the begin-of-line flag and the start-state
//! stack. The borrowed state machine is never written, so any number of
//! `MatchResults` can scan against the same machine concurrently.

use rules::Rules;
use tree::NPOS;

/// The mutable cursor of one scan, doubling as the last match result.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResults<'input> {
    pub(crate) input: &'input str,
    pub(crate) first: usize,
    pub(crate) second: usize,
    pub(crate) id: u32,
    pub(crate) user_id: u32,
    pub(crate) state: u32,
    pub(crate) bol: bool,
    pub(crate) stack: Vec<u32>,
}

impl<'input> MatchResults<'input> {
    /// Creates a cursor at the start of `input`, in start-state 0 with
    /// the begin-of-line flag set.
    pub fn new(input: &'input str) -> MatchResults<'input> {
        MatchResults::with_state(input, 0, true)
    }

    /// Creates a cursor at the start of `input` in the given
    /// start-state.
    pub fn with_state(input: &'input str, state: u32, bol: bool) -> MatchResults<'input> {
        MatchResults {
            input,
            first: 0,
            second: 0,
            id: Rules::eoi(),
            user_id: NPOS,
            state,
            bol,
            stack: Vec::new(),
        }
    }

    /// Reinitializes the cursor over new input, keeping nothing from the
    /// previous scan.
    pub fn reset(&mut self, input: &'input str, state: u32, bol: bool) {
        *self = MatchResults::with_state(input, state, bol);
    }

    /// The input being scanned.
    pub fn input(&self) -> &'input str {
        self.input
    }

    /// The byte offset where the last match started.
    pub fn first(&self) -> usize {
        self.first
    }

    /// The byte offset just past the last match.
    pub fn second(&self) -> usize {
        self.second
    }

    /// The text of the last match.
    pub fn as_str(&self) -> &'input str {
        &self.input[self.first..self.second]
    }

    /// The rule id of the last match: the caller chosen id, 0 at end of
    /// input, or the npos sentinel for rejected input.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The user id of the matched rule, if one was supplied.
    pub fn user_id(&self) -> Option<u32> {
        if self.user_id == NPOS {
            None
        } else {
            Some(self.user_id)
        }
    }

    /// The current start-state.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Whether the cursor sits at the beginning of a line.
    pub fn bol(&self) -> bool {
        self.bol
    }

    /// Whether the last result was the end-of-input sentinel.
    pub fn is_eoi(&self) -> bool {
        self.id == Rules::eoi() && self.first == self.input.len()
    }

    /// Whether the last result was a rejected code point rather than a
    /// match.
    pub fn is_rejected(&self) -> bool {
        self.id == Rules::npos()
    }
}
