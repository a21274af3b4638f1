// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The table driven scan loop.
//!
//! One call to `lookup` advances the cursor by one token: it walks the
//! current start-state's transition table to the longest (or, for a lazy
//! rule, the shortest) accepting prefix, applies the matched rule's
//! state changes and records the match bounds in the cursor. Matches of
//! the reserved skip id restart the loop instead of being returned.

use error::{Error, Result};
use match_results::MatchResults;
use rules::Rules;
use state_machine::{column, state_bit, StateMachine};
use tree::NPOS;

#[derive(Clone, Copy)]
struct Accept {
    end: usize,
    id: u32,
    user_id: u32,
    push_dfa: u32,
    next_dfa: u32,
    pop_dfa: bool,
}

/// Advances `results` by one token against `sm`.
///
/// At end of input the sentinel result with id 0 is recorded. Input that
/// matches no rule records a one code point reject result with the npos
/// id. The only error a scan itself can produce is popping an empty
/// start-state stack.
pub fn lookup(sm: &StateMachine, results: &mut MatchResults) -> Result<()> {
    loop {
        let start = results.second;
        results.first = start;

        if start == results.input.len() {
            results.id = Rules::eoi();
            results.user_id = NPOS;
            return Ok(());
        }

        let dfa = sm.dfa(results.state);
        let look = sm.lookup_table(results.state);

        // the jam row's first cell holds the anchored start row
        let bol_row = dfa.cell(0, column::END_STATE);
        let mut row = if results.bol && bol_row != 0 { bol_row } else { 1 };
        let mut pos = start;
        let mut eol_done = false;
        let mut best: Option<Accept> = None;

        loop {
            // zero width EOL transition before a line break or at EOI
            if !eol_done && at_line_end(results.input, pos) {
                let cell = dfa.cell(row, column::EOL);
                if cell != 0 {
                    row = cell;
                    eol_done = true;
                    if note_accept(dfa.row(row), pos, &mut best) {
                        break;
                    }
                    continue;
                }
            }

            if pos == results.input.len() {
                break;
            }

            let (cp, next) = decode(results.input, pos);
            let cell = dfa.cell(row, look.get(cp) as usize);
            if cell == 0 {
                break;
            }

            row = cell;
            pos = next;
            eol_done = false;

            if note_accept(dfa.row(row), pos, &mut best) {
                break;
            }
        }

        match best {
            Some(accept) => {
                if accept.pop_dfa {
                    results.state = results
                        .stack
                        .pop()
                        .ok_or(Error::StateStackUnderflow)?;
                } else {
                    if accept.push_dfa != NPOS {
                        results.stack.push(accept.push_dfa);
                    }
                    results.state = accept.next_dfa;
                }

                results.second = accept.end;
                results.bol = results.input.as_bytes()[..accept.end].last() == Some(&b'\n');

                if accept.id == Rules::skip() {
                    continue;
                }

                results.id = accept.id;
                results.user_id = accept.user_id;
                return Ok(());
            }
            None => {
                let (cp, next) = decode(results.input, start);
                results.second = next;
                results.bol = cp == '\n' as u32;
                results.id = Rules::npos();
                results.user_id = NPOS;
                return Ok(());
            }
        }
    }
}

// Records an accepting row; true means the accept is lazy and the scan
// stops here.
fn note_accept(row: &[u32], end: usize, best: &mut Option<Accept>) -> bool {
    let bits = row[column::END_STATE];

    if bits & state_bit::END_STATE == 0 {
        return false;
    }

    *best = Some(Accept {
        end,
        id: row[column::ID],
        user_id: row[column::USER_ID],
        push_dfa: row[column::PUSH_DFA],
        next_dfa: row[column::NEXT_DFA],
        pop_dfa: bits & state_bit::POP_DFA != 0,
    });

    bits & state_bit::GREEDY == 0
}

fn at_line_end(input: &str, pos: usize) -> bool {
    pos == input.len() || input.as_bytes()[pos] == b'\n'
}

fn decode(input: &str, pos: usize) -> (u32, usize) {
    let c = input[pos..]
        .chars()
        .next()
        .expect("scan positions always sit on a char boundary");
    (c as u32, pos + c.len_utf8())
}

#[cfg(test)]
mod test {
    use super::*;
    use generator::Generator;

    fn machine<F: Fn(&mut Rules)>(configure: F) -> StateMachine {
        let mut rules = Rules::new();
        configure(&mut rules);
        Generator::build(&rules).expect("build failed")
    }

    fn scan<'a>(sm: &StateMachine, results: &mut MatchResults<'a>) -> (u32, &'a str) {
        lookup(sm, results).expect("scan failed");
        (results.id(), results.as_str())
    }

    #[test]
    fn longest_match_wins_over_an_earlier_shorter_one() {
        let sm = machine(|rules| {
            rules.push("if", 1).unwrap();
            rules.push("[a-z]+", 2).unwrap();
        });
        let mut results = MatchResults::new("ifx");

        assert_eq!(scan(&sm, &mut results), (2, "ifx"));
    }

    #[test]
    fn equal_length_matches_go_to_the_earlier_rule() {
        let sm = machine(|rules| {
            rules.push("if", 1).unwrap();
            rules.push("[a-z]+", 2).unwrap();
        });
        let mut results = MatchResults::new("if");

        assert_eq!(scan(&sm, &mut results), (1, "if"));
    }

    #[test]
    fn unmatched_input_is_rejected_one_code_point_at_a_time() {
        let sm = machine(|rules| {
            rules.push("[0-9]+", 1).unwrap();
        });
        let mut results = MatchResults::new("é7");

        lookup(&sm, &mut results).expect("scan failed");
        assert!(results.is_rejected());
        assert_eq!(results.as_str(), "é");

        assert_eq!(scan(&sm, &mut results), (1, "7"));
    }

    #[test]
    fn end_of_input_repeats_the_eoi_sentinel() {
        let sm = machine(|rules| {
            rules.push("a", 1).unwrap();
        });
        let mut results = MatchResults::new("a");

        scan(&sm, &mut results);
        lookup(&sm, &mut results).expect("scan failed");

        assert!(results.is_eoi());
        assert_eq!(results.id(), 0);

        lookup(&sm, &mut results).expect("scan failed");
        assert!(results.is_eoi());
    }

    #[test]
    fn skip_matches_restart_without_being_emitted() {
        let sm = machine(|rules| {
            rules.push("[a-z]+", 1).unwrap();
            rules.push("\\s+", Rules::skip()).unwrap();
        });
        let mut results = MatchResults::new("ab  cd");

        assert_eq!(scan(&sm, &mut results), (1, "ab"));
        assert_eq!(scan(&sm, &mut results), (1, "cd"));
    }

    #[test]
    fn bol_anchored_rule_matches_at_start_and_after_newlines_only() {
        let sm = machine(|rules| {
            rules.push("^a", 1).unwrap();
            rules.push("[a\\n]", 2).unwrap();
        });

        let mut results = MatchResults::new("aa\na");
        assert_eq!(scan(&sm, &mut results), (1, "a"));
        assert_eq!(scan(&sm, &mut results), (2, "a"));
        assert_eq!(scan(&sm, &mut results), (2, "\n"));
        assert_eq!(scan(&sm, &mut results), (1, "a"));
    }

    #[test]
    fn eol_anchored_rule_matches_before_newline_and_at_eoi() {
        let sm = machine(|rules| {
            rules.push("a$", 1).unwrap();
            rules.push("[a\\n]", 2).unwrap();
        });

        let mut results = MatchResults::new("aa\na");
        // first 'a' is not at EOL, second is
        assert_eq!(scan(&sm, &mut results), (2, "a"));
        assert_eq!(scan(&sm, &mut results), (1, "a"));
        assert_eq!(scan(&sm, &mut results), (2, "\n"));
        assert_eq!(scan(&sm, &mut results), (1, "a"));
    }

    #[test]
    fn push_and_pop_bracket_a_nested_region() {
        let sm = machine(|rules| {
            rules.push_state("COMMENT");
            rules.push("[a-z]+", 1).unwrap();
            rules.push("\\s+", Rules::skip()).unwrap();
            rules.push_in("INITIAL", "/\\*", 2, ">COMMENT").unwrap();
            rules.push_in("COMMENT", "\\*/", 3, "<").unwrap();
            rules
                .push_in("COMMENT", "[^*]+", Rules::skip(), ".")
                .unwrap();
            rules.push_in("COMMENT", "\\*", Rules::skip(), ".").unwrap();
        });

        let mut results = MatchResults::new("a /* x * y */ b");
        assert_eq!(scan(&sm, &mut results), (1, "a"));
        assert_eq!(scan(&sm, &mut results), (2, "/*"));
        assert_eq!(results.state(), 1);
        assert_eq!(scan(&sm, &mut results), (3, "*/"));
        assert_eq!(results.state(), 0);
        assert_eq!(scan(&sm, &mut results), (1, "b"));
    }

    #[test]
    fn pop_on_an_empty_stack_is_an_error() {
        let sm = machine(|rules| {
            rules.push_in("INITIAL", "x", 1, "<").unwrap();
        });
        let mut results = MatchResults::new("x");

        assert_matches!(
            lookup(&sm, &mut results),
            Err(Error::StateStackUnderflow)
        );
    }

    #[test]
    fn greedy_quotes_swallow_inner_quotes() {
        let sm = machine(|rules| {
            rules.push("\"[^\\n]*\"", 1).unwrap();
            rules.push("\\s+", Rules::skip()).unwrap();
        });
        let mut results = MatchResults::new("\"a\" \"b\"");

        assert_eq!(scan(&sm, &mut results), (1, "\"a\" \"b\""));
    }

    #[test]
    fn lazy_quotes_stop_at_the_first_close() {
        let sm = machine(|rules| {
            rules.push("\"[^\\n]*?\"", 1).unwrap();
            rules.push("\\s+", Rules::skip()).unwrap();
        });
        let mut results = MatchResults::new("\"a\" \"b\"");

        assert_eq!(scan(&sm, &mut results), (1, "\"a\""));
        assert_eq!(scan(&sm, &mut results), (1, "\"b\""));
    }

    #[test]
    fn counted_repetition_matches_within_its_bounds() {
        let sm = machine(|rules| {
            rules.push("a{2,4}", 1).unwrap();
        });

        let mut one = MatchResults::new("a");
        lookup(&sm, &mut one).expect("scan failed");
        assert!(one.is_rejected());

        let mut two = MatchResults::new("aa");
        assert_eq!(scan(&sm, &mut two), (1, "aa"));

        let mut four = MatchResults::new("aaaa");
        assert_eq!(scan(&sm, &mut four), (1, "aaaa"));

        let mut five = MatchResults::new("aaaaa");
        assert_eq!(scan(&sm, &mut five), (1, "aaaa"));
        lookup(&sm, &mut five).expect("scan failed");
        assert!(five.is_rejected());
        assert_eq!(five.as_str(), "a");
    }
}
