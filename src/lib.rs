// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! A library for generating table driven lexers from regular expression
//! rules.
//!
//! Rules are gathered into a [`Rules`] value, grouped into named lexer
//! start-states, and compiled by [`Generator::build`] into an immutable
//! [`StateMachine`]: one flat transition table per start-state built
//! with the classical firstpos/followpos construction, over an alphabet
//! of disjoint character equivalence classes.
//!
//! Scanning is table driven: [`lookup`] advances a [`MatchResults`]
//! cursor by one token, and [`Matches`] wraps that loop as an iterator.
//!
//! ```
//! use relex::{Generator, Matches, Rules};
//!
//! let mut rules = Rules::new();
//! rules.push("[a-z]+", 1).unwrap();
//! rules.push("[0-9]+", 2).unwrap();
//! rules.push("\\s+", Rules::skip()).unwrap();
//!
//! let sm = Generator::build(&rules).unwrap();
//! let tokens: Result<Vec<_>, _> = Matches::new("abc 123", &sm)
//!     .map(|r| r.map(|m| (m.id(), m.as_str())))
//!     .collect();
//!
//! assert_eq!(tokens.unwrap(), vec![(1, "abc"), (2, "123")]);
//! ```
//!
//! [`Rules`]: struct.Rules.html
//! [`Generator::build`]: struct.Generator.html
//! [`StateMachine`]: struct.StateMachine.html
//! [`MatchResults`]: struct.MatchResults.html
//! [`Matches`]: struct.Matches.html
//! [`lookup`]: fn.lookup.html

#![deny(missing_docs)]

#[macro_use]
extern crate failure;
extern crate itertools;

#[cfg(test)]
#[macro_use]
extern crate proptest;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;

pub mod alphabet;
pub mod charset;
pub mod codec;
pub mod state_machine;

mod abstemious;
mod error;
mod generator;
mod iterator;
mod lookup;
mod match_results;
mod parser;
mod partition;
mod rules;
mod token;
mod tokenizer;
mod tree;
mod unicode;

pub use error::{Error, Result};
pub use generator::Generator;
pub use iterator::Matches;
pub use lookup::lookup;
pub use match_results::MatchResults;
pub use rules::{feature_bit, regex_flags, Rules};
pub use state_machine::StateMachine;
