// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! Pruning of vacuous trailing lazy quantifiers.
//!
//! A lazy quantifier with nothing mandatory after it on its alternation
//! branch can never contribute characters to a match: the scanner would
//! always prefer to stop immediately. Removing these before parsing keeps
//! the automaton free of transitions that could never be taken.

use token::{Token, TokenKind};

/// Rewrites `tokens` in place, removing or downgrading every lazy
/// quantifier that sits at the end of its alternation branch.
///
/// `indexes` holds the positions of the lazy operators as recorded by the
/// tokenizer, in increasing order; it is consumed right to left so that
/// the positions still to be visited stay valid across removals.
pub fn prune(tokens: &mut Vec<Token>, indexes: &mut Vec<usize>) {
    while let Some(&operator) = indexes.last() {
        let mut start = operator;
        let mut idx = operator;

        if is_end(tokens, idx) {
            match tokens[idx].kind {
                TokenKind::AOpt | TokenKind::AZeroOrMore => {
                    remove_sequence(tokens, &mut start, &mut idx);
                }
                TokenKind::AOneOrMore => {
                    tokens.remove(idx);
                }
                TokenKind::ARepeatN => {
                    // {n,m}? at the end is a fixed {n}; {0,m}? is nothing
                    // at all.
                    {
                        let op = &mut tokens[idx];
                        op.kind = TokenKind::RepeatN;
                        op.greedy = true;
                        if let Some(comma) = op.extra.find(',') {
                            op.extra.truncate(comma);
                        }
                    }

                    if tokens[idx].extra == "0" {
                        remove_sequence(tokens, &mut start, &mut idx);
                    }
                }
                _ => {}
            }
        }

        indexes.pop();

        while let Some(&back) = indexes.last() {
            if back >= start && back <= idx {
                indexes.pop();
            } else {
                break;
            }
        }
    }
}

// Every token to the right on the same alternation branch is one of
// '|', ')' or the end marker.
fn is_end(tokens: &[Token], start: usize) -> bool {
    let mut idx = start + 1;

    while idx < tokens.len() {
        match tokens[idx].kind {
            TokenKind::Or => idx = end_block(tokens, idx + 1),
            TokenKind::CloseParen => idx += 1,
            TokenKind::End => return true,
            _ => return false,
        }
    }

    true
}

// Index just past the alternation branch starting at `start`.
fn end_block(tokens: &[Token], start: usize) -> usize {
    let mut idx = start + 1;
    let mut parens = 0usize;

    while idx < tokens.len() {
        match tokens[idx].kind {
            TokenKind::Or if parens == 0 => return idx,
            TokenKind::OpenParen => parens += 1,
            TokenKind::CloseParen => {
                if parens == 0 {
                    return idx;
                }
                parens -= 1;
            }
            TokenKind::End => return idx,
            _ => {}
        }

        idx += 1;
    }

    idx
}

// Removes the operand of the operator at `idx` along with the operator
// itself, walking back over a balanced parenthesized block when present,
// then drops whatever '|' the removal left dangling. `start` and `idx`
// are left holding the bounds of the removed region for the caller's
// index cleanup.
fn remove_sequence(tokens: &mut Vec<Token>, start: &mut usize, idx: &mut usize) {
    let mut operand = *idx - 1;

    if tokens[operand].kind == TokenKind::CloseParen {
        let mut parens = 1;

        while parens > 0 {
            operand -= 1;
            match tokens[operand].kind {
                TokenKind::OpenParen => parens -= 1,
                TokenKind::CloseParen => parens += 1,
                _ => {}
            }
        }
    }

    *start = operand;

    // Wrapping parens that only bracket the removed block go with it.
    while tokens[*start - 1].kind == TokenKind::OpenParen
        && tokens[*idx + 1].kind == TokenKind::CloseParen
    {
        *start -= 1;
        *idx += 1;
    }

    tokens.drain(*start..=*idx);

    let following = *start;
    if tokens[following].kind == TokenKind::Or {
        tokens.remove(following);
    } else if tokens[following].kind != TokenKind::Begin
        && tokens[following - 1].kind == TokenKind::Or
    {
        tokens.remove(following - 1);
    }
}
