// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The iterator facade over the scan loop.
//!
//! `Matches` drives `lookup` across the input and yields one cursor
//! snapshot per emitted result. The sequence is finite and not
//! restartable: after the end-of-input sentinel (or a scan error) the
//! iterator stays exhausted.

use error::Result;
use lookup::lookup;
use match_results::MatchResults;
use state_machine::StateMachine;

/// A forward iterator of match results over one input.
///
/// Rejected code points are yielded like matches (with the npos id) so
/// the caller decides how to report them; the end-of-input sentinel ends
/// the sequence instead of being yielded.
pub struct Matches<'input, 'sm> {
    results: MatchResults<'input>,
    sm: Option<&'sm StateMachine>,
}

impl<'input, 'sm> Matches<'input, 'sm> {
    /// Creates an iterator at the start of `input` in start-state 0.
    pub fn new(input: &'input str, sm: &'sm StateMachine) -> Matches<'input, 'sm> {
        Matches {
            results: MatchResults::new(input),
            sm: Some(sm),
        }
    }

    /// Creates an iterator with an explicit initial start-state and
    /// begin-of-line flag.
    pub fn with_state(
        input: &'input str,
        sm: &'sm StateMachine,
        state: u32,
        bol: bool,
    ) -> Matches<'input, 'sm> {
        Matches {
            results: MatchResults::with_state(input, state, bol),
            sm: Some(sm),
        }
    }
}

impl<'input, 'sm> Iterator for Matches<'input, 'sm> {
    type Item = Result<MatchResults<'input>>;

    fn next(&mut self) -> Option<Self::Item> {
        let sm = self.sm?;

        match lookup(sm, &mut self.results) {
            Err(error) => {
                self.sm = None;
                Some(Err(error))
            }
            Ok(()) => {
                if self.results.is_eoi() {
                    self.sm = None;
                    None
                } else {
                    Some(Ok(self.results.clone()))
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use generator::Generator;
    use rules::Rules;

    fn machine() -> StateMachine {
        let mut rules = Rules::new();
        rules.push("[a-z]+", 1).unwrap();
        rules.push("[0-9]+", 2).unwrap();
        rules.push("\\s+", Rules::skip()).unwrap();
        Generator::build(&rules).expect("build failed")
    }

    #[test]
    fn iterator_yields_matches_then_terminates() {
        let sm = machine();

        let tokens: Vec<_> = Matches::new("abc 123", &sm)
            .map(|r| r.map(|m| (m.id(), m.as_str().to_string())))
            .collect::<Result<_>>()
            .expect("scan failed");

        assert_eq!(
            tokens,
            vec![(1, "abc".to_string()), (2, "123".to_string())]
        );
    }

    #[test]
    fn exhausted_iterator_stays_exhausted() {
        let sm = machine();
        let mut sut = Matches::new("a", &sm);

        assert!(sut.next().is_some());
        assert!(sut.next().is_none());
        assert!(sut.next().is_none());
    }

    #[test]
    fn rejected_input_is_yielded_with_the_npos_id() {
        let sm = machine();

        let kinds: Vec<_> = Matches::new("a!b", &sm)
            .map(|r| r.expect("scan failed"))
            .map(|m| (m.is_rejected(), m.as_str().to_string()))
            .collect();

        assert_eq!(
            kinds,
            vec![
                (false, "a".to_string()),
                (true, "!".to_string()),
                (false, "b".to_string()),
            ]
        );
    }

    #[test]
    fn repeated_scans_of_the_same_input_agree() {
        let sm = machine();
        let collect = || -> Vec<_> {
            Matches::new("ab 12 cd", &sm)
                .map(|r| r.expect("scan failed"))
                .map(|m| (m.id(), m.first(), m.second()))
                .collect()
        };

        assert_eq!(collect(), collect());
    }
}
