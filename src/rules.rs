// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The rule collection consumed by the generator.
//!
//! A `Rules` value gathers regex rules grouped into named lexer
//! start-states, along with the macro table and the option flags. The
//! generator reads it without modifying it; rule sources are kept as
//! strings and only tokenized at build time so every build phase error
//! surfaces from `Generator::build`.

use std::collections::BTreeMap;

use error::{Error, Result};
use tree::NPOS;

/// The option bitmask understood by `Rules::set_flags`.
pub mod regex_flags {
    /// Apply Unicode case folding to literals and character classes.
    pub const ICASE: u32 = 1;
    /// `.` excludes `\n`.
    pub const DOT_NOT_NEWLINE: u32 = 2;
    /// `.` additionally excludes `\r`.
    pub const DOT_NOT_CR_LF: u32 = 4;
    /// Add an implicit whitespace skip rule to every start-state.
    pub const SKIP_WS: u32 = 8;
    /// Permit rules that can match zero-length input.
    pub const MATCH_ZERO_LEN: u32 = 16;
    /// Tolerate rules that can never be matched.
    pub const ALLOW_SUPPRESSED_RULES: u32 = 32;
    /// Use the compressed trie alphabet lookup.
    pub const COMPRESSED: u32 = 64;
}

/// The per start-state feature bits observed while building.
pub mod feature_bit {
    /// A `^` anchor was seen.
    pub const BOL: u32 = 1;
    /// A `$` anchor was seen.
    pub const EOL: u32 = 2;
    /// A rule with the reserved skip id was seen.
    pub const SKIP: u32 = 4;
    /// A rule pushes or pops the start-state stack.
    pub const RECURSIVE: u32 = 8;
    /// The machine has more than one start-state.
    pub const MULTI_STATE: u32 = 16;
}

/// One rule row of a start-state.
#[derive(Debug, Clone)]
pub struct RuleEntry {
    /// The regex source.
    pub regex: String,
    /// The caller chosen rule id.
    pub id: u32,
    /// The caller chosen user id, `NPOS` when absent.
    pub user_id: u32,
    /// The start-state after a match.
    pub next_dfa: u32,
    /// The start-state pushed before switching, `NPOS` when absent.
    pub push_dfa: u32,
    /// Whether a match pops the start-state stack.
    pub pop_dfa: bool,
}

/// An ordered collection of rule groups keyed by start-state name.
///
/// Start-state 0 is always `INITIAL`. The next start-state of a rule is
/// given with the mini syntax of the original surface: `"."` stays in
/// the current state, `"NAME"` switches, `">NAME"` pushes the current
/// state and switches, `">NAME:RET"` pushes `RET` and switches, and
/// `"<"` pops. The current-state list of `push_in` is a comma separated
/// list of names, or `"*"` for every state defined so far.
#[derive(Debug, Clone)]
pub struct Rules {
    state_names: Vec<String>,
    states: BTreeMap<String, u32>,
    macros: BTreeMap<String, String>,
    rules: Vec<Vec<RuleEntry>>,
    flags: u32,
}

impl Default for Rules {
    fn default() -> Rules {
        Rules::new()
    }
}

impl Rules {
    /// Creates an empty rule set with `INITIAL` pre-registered.
    pub fn new() -> Rules {
        let mut states = BTreeMap::new();
        states.insert("INITIAL".to_string(), 0);

        Rules {
            state_names: vec!["INITIAL".to_string()],
            states,
            macros: BTreeMap::new(),
            rules: vec![Vec::new()],
            flags: 0,
        }
    }

    /// Creates an empty rule set with the given option flags.
    pub fn with_flags(flags: u32) -> Rules {
        let mut rules = Rules::new();
        rules.flags = flags;
        rules
    }

    /// The reserved id for end of input results.
    pub fn eoi() -> u32 {
        0
    }

    /// The reserved id for rules whose matches are skipped instead of
    /// emitted.
    pub fn skip() -> u32 {
        NPOS - 1
    }

    /// The "no such id" sentinel, also the id of reject results.
    pub fn npos() -> u32 {
        NPOS
    }

    /// The option flags.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Replaces the option flags.
    pub fn set_flags(&mut self, flags: u32) {
        self.flags = flags;
    }

    /// Registers a start-state and returns its id. Registering the same
    /// name twice returns the existing id.
    pub fn push_state(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.states.get(name) {
            return id;
        }

        let id = self.state_names.len() as u32;
        self.state_names.push(name.to_string());
        self.states.insert(name.to_string(), id);
        self.rules.push(Vec::new());
        id
    }

    /// The id of a registered start-state.
    pub fn state(&self, name: &str) -> Option<u32> {
        self.states.get(name).cloned()
    }

    /// The name of a start-state id.
    pub fn state_name(&self, id: u32) -> &str {
        &self.state_names[id as usize]
    }

    /// The number of start-states.
    pub fn state_count(&self) -> usize {
        self.state_names.len()
    }

    /// Defines the macro `{name}` as `regex`. Macros must be defined
    /// before their first reference and must not be redefined.
    pub fn insert_macro(&mut self, name: &str, regex: &str) -> Result<()> {
        if self.macros.contains_key(name) {
            return Err(Error::DuplicateMacro {
                name: name.to_string(),
            });
        }

        self.macros.insert(name.to_string(), regex.to_string());
        Ok(())
    }

    /// The macro table.
    pub fn macros(&self) -> &BTreeMap<String, String> {
        &self.macros
    }

    /// Adds `regex` to `INITIAL` with no state change.
    pub fn push(&mut self, regex: &str, id: u32) -> Result<()> {
        self.push_in("INITIAL", regex, id, ".")
    }

    /// Adds `regex` to each start-state named in `states`, matching with
    /// `id` and continuing per the `next` spec.
    pub fn push_in(&mut self, states: &str, regex: &str, id: u32, next: &str) -> Result<()> {
        self.push_in_with_id(states, regex, id, NPOS, next)
    }

    /// Like `push_in` with an additional user id reported on matches.
    pub fn push_in_with_id(
        &mut self,
        states: &str,
        regex: &str,
        id: u32,
        user_id: u32,
        next: &str,
    ) -> Result<()> {
        if id == Rules::eoi() || id == Rules::npos() {
            return Err(Error::ReservedRuleId { id });
        }

        let targets = self.target_states(states)?;

        for target in targets {
            let (next_dfa, push_dfa, pop_dfa) = self.parse_next(next, target)?;

            self.rules[target as usize].push(RuleEntry {
                regex: regex.to_string(),
                id,
                user_id,
                next_dfa,
                push_dfa,
                pop_dfa,
            });
        }

        Ok(())
    }

    /// The rule rows of a start-state.
    pub fn rules_of(&self, state: u32) -> &[RuleEntry] {
        &self.rules[state as usize]
    }

    fn target_states(&self, states: &str) -> Result<Vec<u32>> {
        if states == "*" {
            return Ok((0..self.state_names.len() as u32).collect());
        }

        states
            .split(',')
            .map(|name| {
                let name = name.trim();
                self.state(name).ok_or_else(|| Error::UnknownState {
                    name: name.to_string(),
                })
            })
            .collect()
    }

    fn parse_next(&self, next: &str, current: u32) -> Result<(u32, u32, bool)> {
        if next == "." {
            return Ok((current, NPOS, false));
        }

        if next == "<" {
            return Ok((current, NPOS, true));
        }

        if let Some(rest) = strip_prefix(next, '>') {
            let mut parts = rest.splitn(2, ':');
            let goto_name = parts.next().unwrap_or("");
            let pushed = match parts.next() {
                Some(ret_name) => self.require_state(ret_name)?,
                None => current,
            };
            let next_dfa = self.require_state(goto_name)?;
            return Ok((next_dfa, pushed, false));
        }

        Ok((self.require_state(next)?, NPOS, false))
    }

    fn require_state(&self, name: &str) -> Result<u32> {
        self.state(name).ok_or_else(|| Error::UnknownState {
            name: name.to_string(),
        })
    }
}

fn strip_prefix(value: &str, prefix: char) -> Option<&str> {
    if value.starts_with(prefix) {
        Some(&value[prefix.len_utf8()..])
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn initial_state_is_preregistered_as_zero() {
        let rules = Rules::new();

        assert_eq!(rules.state("INITIAL"), Some(0));
        assert_eq!(rules.state_count(), 1);
    }

    #[test]
    fn push_state_returns_fresh_then_existing_ids() {
        let mut rules = Rules::new();

        let comment = rules.push_state("COMMENT");
        let again = rules.push_state("COMMENT");

        assert_eq!(comment, 1);
        assert_eq!(again, 1);
        assert_eq!(rules.state_name(1), "COMMENT");
    }

    #[test]
    fn push_adds_a_stay_rule_to_initial() {
        let mut rules = Rules::new();

        rules.push("[0-9]+", 1).expect("push failed");

        let entry = &rules.rules_of(0)[0];
        assert_eq!(entry.id, 1);
        assert_eq!(entry.next_dfa, 0);
        assert_eq!(entry.push_dfa, NPOS);
        assert!(!entry.pop_dfa);
    }

    #[test]
    fn reserved_ids_are_rejected() {
        let mut rules = Rules::new();

        assert_matches!(rules.push("a", 0), Err(Error::ReservedRuleId { id: 0 }));
        assert_matches!(
            rules.push("a", Rules::npos()),
            Err(Error::ReservedRuleId { .. })
        );
    }

    #[test]
    fn skip_id_is_accepted() {
        let mut rules = Rules::new();

        assert!(rules.push("\\s+", Rules::skip()).is_ok());
    }

    #[test]
    fn push_in_resolves_goto_push_and_pop_specs() {
        let mut rules = Rules::new();
        rules.push_state("COMMENT");

        rules
            .push_in("INITIAL", "/\\*", 1, ">COMMENT")
            .expect("push failed");
        rules
            .push_in("COMMENT", "\\*/", 2, "<")
            .expect("push failed");

        let open = &rules.rules_of(0)[0];
        assert_eq!(open.next_dfa, 1);
        assert_eq!(open.push_dfa, 0);
        let close = &rules.rules_of(1)[0];
        assert!(close.pop_dfa);
    }

    #[test]
    fn push_in_with_explicit_return_state_pushes_that_state() {
        let mut rules = Rules::new();
        rules.push_state("A");
        rules.push_state("B");

        rules.push_in("INITIAL", "x", 1, ">A:B").expect("push failed");

        let entry = &rules.rules_of(0)[0];
        assert_eq!(entry.next_dfa, 1);
        assert_eq!(entry.push_dfa, 2);
    }

    #[test]
    fn star_targets_every_registered_state() {
        let mut rules = Rules::new();
        rules.push_state("A");

        rules.push_in("*", "x", 1, ".").expect("push failed");

        assert_eq!(rules.rules_of(0).len(), 1);
        assert_eq!(rules.rules_of(1).len(), 1);
        // "." resolves per target state
        assert_eq!(rules.rules_of(1)[0].next_dfa, 1);
    }

    #[test]
    fn comma_separated_state_lists_resolve_each_name() {
        let mut rules = Rules::new();
        rules.push_state("A");
        rules.push_state("B");

        rules.push_in("A, B", "x", 1, ".").expect("push failed");

        assert!(rules.rules_of(0).is_empty());
        assert_eq!(rules.rules_of(1).len(), 1);
        assert_eq!(rules.rules_of(2).len(), 1);
    }

    #[test]
    fn unknown_state_references_are_rejected() {
        let mut rules = Rules::new();

        assert_matches!(
            rules.push_in("NOPE", "x", 1, "."),
            Err(Error::UnknownState { ref name }) if name == "NOPE"
        );
        assert_matches!(
            rules.push_in("INITIAL", "x", 1, "NOPE"),
            Err(Error::UnknownState { ref name }) if name == "NOPE"
        );
    }

    #[test]
    fn duplicate_macro_definitions_are_rejected() {
        let mut rules = Rules::new();
        rules.insert_macro("D", "[0-9]").expect("insert failed");

        assert_matches!(
            rules.insert_macro("D", "[0-9a-f]"),
            Err(Error::DuplicateMacro { ref name }) if name == "D"
        );
    }
}
