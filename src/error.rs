// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

use std::result;

/// The error type for building and running the state machines produced by
/// this crate.
///
/// All of the build phase variants surface from `Generator::build`; the
/// runtime variants surface from `lookup` or from the codec adapters.
#[derive(Debug, Fail, PartialEq)]
pub enum Error {
    /// The regex parser found adjacent constructs that cannot legally
    /// follow one another.
    #[fail(
        display = "A syntax error occurred: '{}' against '{}' at offset {}.",
        lhs, rhs, position
    )]
    Syntax {
        /// Byte offset into the regex source where the clash was detected.
        position: usize,
        /// Precedence class on the top of the parse stack.
        lhs: &'static str,
        /// Precedence class of the incoming token.
        rhs: &'static str,
    },

    /// A `{NAME}` reference to a macro that has not been defined.
    #[fail(display = "Unknown macro '{}'.", name)]
    UnknownMacro {
        /// The name used in the reference.
        name: String,
    },

    /// A macro expansion referenced a macro that is currently being
    /// expanded.
    #[fail(display = "Macro '{}' is defined in terms of itself.", name)]
    MacroRecursion {
        /// The name of the macro that closed the cycle.
        name: String,
    },

    /// A macro was defined twice.
    #[fail(display = "Macro '{}' is already defined.", name)]
    DuplicateMacro {
        /// The name of the redefined macro.
        name: String,
    },

    /// A `\p{..}` or `\P{..}` expression named a property that is not in
    /// the bundled Unicode tables.
    #[fail(display = "Unknown Unicode property '{}'.", name)]
    UnknownUnicodeProperty {
        /// The property name as written.
        name: String,
    },

    /// An escape sequence that this crate does not recognise.
    #[fail(display = "Invalid escape sequence at offset {}.", position)]
    InvalidEscape {
        /// Byte offset of the backslash.
        position: usize,
    },

    /// A bracket expression that matches no characters.
    #[fail(display = "Empty character classes are not allowed.")]
    EmptyCharacterClass,

    /// A `{n,m}` repetition with `n > m`.
    #[fail(display = "Repetition minimum exceeds its maximum.")]
    RepeatOutOfRange,

    /// A rule whose regex reduced to nothing.
    #[fail(display = "Empty rules are not allowed (rule index {}).", rule_index)]
    EmptyRule {
        /// Declaration index of the offending rule.
        rule_index: usize,
    },

    /// A lexer start-state with no rules.
    #[fail(
        display = "Lexer states with no rules are not allowed (state '{}').",
        state_name
    )]
    EmptyLexerState {
        /// Name of the offending start-state.
        state_name: String,
    },

    /// A rule that can match the empty string, which would loop the
    /// scanner. Suppressed by `RegexFlags::MATCH_ZERO_LEN`.
    #[fail(display = "The regex '{}' can match zero characters.", rule_source)]
    ZeroLengthMatch {
        /// Source text of the offending rule.
        rule_source: String,
    },

    /// A rule that is completely shadowed by earlier rules. Suppressed by
    /// `RegexFlags::ALLOW_SUPPRESSED_RULES`.
    #[fail(
        display = "The regex '{}' (rule index {}) can never be matched.",
        rule_source, rule_index
    )]
    RuleSuppressed {
        /// Declaration index of the shadowed rule.
        rule_index: usize,
        /// Source text of the shadowed rule.
        rule_source: String,
    },

    /// The id type cannot hold the alphabet width or the row count of the
    /// constructed automaton.
    #[fail(display = "The id type cannot hold the dfa alphabet or row count.")]
    AlphabetOverflow,

    /// A rule popped the start-state stack while it was empty.
    #[fail(display = "The lexer state stack was popped while empty.")]
    StateStackUnderflow,

    /// A rule referenced a start-state name that was never registered.
    #[fail(display = "Unknown lexer state '{}'.", name)]
    UnknownState {
        /// The name used in the reference.
        name: String,
    },

    /// A rule was pushed with an id reserved for the scanner (0, the skip
    /// id, or the npos sentinel).
    #[fail(display = "Rule id {} is reserved.", id)]
    ReservedRuleId {
        /// The offending id.
        id: u32,
    },

    /// A codec adapter met a byte or code unit sequence that is not valid
    /// for its encoding.
    #[fail(display = "Invalid UTF sequence in input.")]
    InvalidUtf,

    /// A codec adapter ran out of input mid-sequence.
    #[fail(display = "Truncated UTF sequence at end of input.")]
    TruncatedUtf,
}

/// A specialized `Result` type for lexer generation and scanning.
pub type Result<T> = result::Result<T, Error>;
