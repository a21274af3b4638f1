// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The DFA builder.
//!
//! `Generator::build` runs the whole pipeline for every start-state:
//! tokenize the rules, parse them into one selection-chained syntax
//! tree, partition the interned charsets, run the subset construction
//! over followpos and emit the flat transition table. The destination
//! machine is only produced when every step succeeded, so a failed
//! build leaves nothing behind.

use std::collections::BTreeSet;

use alphabet::AlphabetLookup;
use error::{Error, Result};
use parser::{CharsetMap, Parser};
use partition::{build_equiv_list, partition_charsets, EquivSet};
use rules::{feature_bit, regex_flags, RuleEntry, Rules};
use state_machine::{column, state_bit, Dfa, StateMachine};
use tokenizer::Tokenizer;
use tree::{EndData, GreedyRepeat, NodeId, TreeArena, BOL_TOKEN, EOL_TOKEN, NPOS};

/// The compiler from a rule set to a state machine.
pub struct Generator;

impl Generator {
    /// Compiles `rules` into a `StateMachine`.
    pub fn build(rules: &Rules) -> Result<StateMachine> {
        let mut dfas = Vec::new();
        let mut lookups = Vec::new();
        let mut used_ids = BTreeSet::new();
        let mut sources = Vec::new();
        let mut unique_id = 0u32;
        let mut features_all = 0u32;

        for state in 0..rules.state_count() as u32 {
            if rules.rules_of(state).is_empty() {
                return Err(Error::EmptyLexerState {
                    state_name: rules.state_name(state).to_string(),
                });
            }

            let entries = state_entries(rules, state);
            let tokenizer = Tokenizer::new(rules.macros(), rules.flags());
            let mut features = 0u32;
            let mut token_vectors = Vec::with_capacity(entries.len());

            for entry in &entries {
                let (tokens, observed) = tokenizer.tokenize(&entry.regex)?;
                features |= observed;
                if entry.id == Rules::skip() {
                    features |= feature_bit::SKIP;
                }
                if entry.push_dfa != NPOS || entry.pop_dfa {
                    features |= feature_bit::RECURSIVE;
                }
                token_vectors.push(tokens);
            }

            let seen_bol = features & feature_bit::BOL != 0;
            let mut arena = TreeArena::new();
            let mut charset_map = CharsetMap::new();
            let (root, cr_id, nl_id) = {
                let mut parser = Parser::new(&mut arena, &mut charset_map);
                let mut root: Option<NodeId> = None;

                for (entry, tokens) in entries.iter().zip(&token_vectors) {
                    unique_id += 1;
                    sources.push(entry.regex.clone());

                    let greedy = if tokens.iter().any(|t| t.kind.is_abstemious()) {
                        GreedyRepeat::No
                    } else {
                        GreedyRepeat::Yes
                    };
                    let end = EndData {
                        id: entry.id,
                        user_id: entry.user_id,
                        unique_id,
                        next_dfa: entry.next_dfa,
                        push_dfa: entry.push_dfa,
                        pop_dfa: entry.pop_dfa,
                        greedy,
                    };

                    let rhs = parser.parse(tokens, (unique_id - 1) as usize, end, seen_bol)?;
                    root = Some(match root {
                        Some(lhs) => parser.or_roots(lhs, rhs),
                        None => rhs,
                    });
                }

                (
                    root.expect("state checked non-empty above"),
                    parser.cr_id(),
                    parser.nl_id(),
                )
            };

            check_zero_len(rules.flags(), &arena, root, &sources)?;

            let (dfa, lookup) = build_dfa(
                &arena,
                root,
                &charset_map,
                cr_id,
                nl_id,
                rules.flags(),
                &mut used_ids,
            )?;

            features_all |= features;
            dfas.push(dfa);
            lookups.push(lookup);
        }

        check_suppressed(rules.flags(), unique_id, &used_ids, &sources)?;

        if dfas.len() > 1 {
            features_all |= feature_bit::MULTI_STATE;
        }

        Ok(StateMachine::new(dfas, lookups, features_all))
    }
}

// The declared rules of a start-state plus, under SKIP_WS, the implicit
// whitespace skip appended at lowest priority.
fn state_entries(rules: &Rules, state: u32) -> Vec<RuleEntry> {
    let mut entries = rules.rules_of(state).to_vec();

    if rules.flags() & regex_flags::SKIP_WS != 0
        && !entries.iter().any(|entry| entry.id == Rules::skip())
    {
        entries.push(RuleEntry {
            regex: "[ \\t\\r\\n]+".to_string(),
            id: Rules::skip(),
            user_id: NPOS,
            next_dfa: state,
            push_dfa: NPOS,
            pop_dfa: false,
        });
    }

    entries
}

fn check_zero_len(flags: u32, arena: &TreeArena, root: NodeId, sources: &[String]) -> Result<()> {
    if flags & regex_flags::MATCH_ZERO_LEN != 0 {
        return Ok(());
    }

    for &position in arena.firstpos(root) {
        if let Some(end) = arena.end_data(position) {
            return Err(Error::ZeroLengthMatch {
                rule_source: sources[(end.unique_id - 1) as usize].clone(),
            });
        }
    }

    Ok(())
}

fn check_suppressed(
    flags: u32,
    unique_id: u32,
    used_ids: &BTreeSet<u32>,
    sources: &[String],
) -> Result<()> {
    if flags & regex_flags::ALLOW_SUPPRESSED_RULES != 0 {
        return Ok(());
    }

    for id in 1..=unique_id {
        if !used_ids.contains(&id) {
            return Err(Error::RuleSuppressed {
                rule_index: (id - 1) as usize,
                rule_source: sources[(id - 1) as usize].clone(),
            });
        }
    }

    Ok(())
}

fn build_dfa(
    arena: &TreeArena,
    root: NodeId,
    charset_map: &CharsetMap,
    cr_id: Option<u32>,
    nl_id: Option<u32>,
    flags: u32,
    used_ids: &mut BTreeSet<u32>,
) -> Result<(Dfa, AlphabetLookup)> {
    let members = partition_charsets(charset_map);
    let mut set_mapping = vec![BTreeSet::new(); charset_map.len()];
    let max_code_point = members
        .iter()
        .filter_map(|member| member.token.max_code_point())
        .max();
    let mut lookup = AlphabetLookup::new(
        flags & regex_flags::COMPRESSED != 0,
        max_code_point,
    );

    for (index, member) in members.iter().enumerate() {
        lookup.set_ranges(member.token.ranges(), (column::TRANSITIONS + index) as u32);
        for &id in &member.index_set {
            set_mapping[id as usize].insert(index as u32);
        }
    }

    // Remap the newline charset ids to their partition columns for the
    // anchor clash repair.
    let cr_col = cr_id.and_then(|id| set_mapping[id as usize].iter().next().cloned());
    let nl_col = nl_id.and_then(|id| set_mapping[id as usize].iter().next().cloned());

    let alphabet = column::TRANSITIONS + members.len();
    if alphabet >= NPOS as usize {
        return Err(Error::AlphabetOverflow);
    }

    // jam row
    let mut dfa = vec![0u32; alphabet];
    let mut seen_sets: Vec<BTreeSet<NodeId>> = Vec::new();
    let mut seen_vectors: Vec<Vec<NodeId>> = Vec::new();
    let mut hashes: Vec<u64> = Vec::new();
    let mut eol_rows = BTreeSet::new();

    closure(
        arena,
        arena.firstpos(root),
        &mut seen_sets,
        &mut seen_vectors,
        &mut hashes,
        alphabet,
        &mut dfa,
        flags,
        used_ids,
    );

    let mut index = 0;
    while index < seen_vectors.len() {
        let positions = seen_vectors[index].clone();
        let mut equiv_list = build_equiv_list(arena, &positions, &set_mapping);

        for eq in &mut equiv_list {
            prune_eol_clashes(arena, &mut eq.followpos, cr_col, nl_col, &set_mapping);

            let transition = closure(
                arena,
                &eq.followpos,
                &mut seen_sets,
                &mut seen_vectors,
                &mut hashes,
                alphabet,
                &mut dfa,
                flags,
                used_ids,
            );

            if let Some(transition) = transition {
                let row = index as u32 + 1;
                let end_cell = dfa[row as usize * alphabet + column::END_STATE];
                // Abstemious transitions out of a lazy end state are
                // never taken, so they are not written.
                let lazy_end = end_cell & state_bit::END_STATE != 0
                    && end_cell & state_bit::GREEDY == 0
                    && eq.greedy == GreedyRepeat::No;

                if !lazy_end {
                    set_transitions(transition, eq, &mut dfa, row, alphabet, &mut eol_rows);
                }
            }
        }

        index += 1;
    }

    fix_clashes(&eol_rows, cr_col, nl_col, &mut dfa, alphabet);

    if dfa.len() / alphabet >= NPOS as usize {
        return Err(Error::AlphabetOverflow);
    }

    Ok((Dfa::new(dfa, alphabet), lookup))
}

// Subset construction step: find or allocate the DFA row for a
// followpos set, encoding end-state metadata from the highest priority
// end position.
fn closure(
    arena: &TreeArena,
    followpos: &[NodeId],
    seen_sets: &mut Vec<BTreeSet<NodeId>>,
    seen_vectors: &mut Vec<Vec<NodeId>>,
    hashes: &mut Vec<u64>,
    alphabet: usize,
    dfa: &mut Vec<u32>,
    flags: u32,
    used_ids: &mut BTreeSet<u32>,
) -> Option<u32> {
    if followpos.is_empty() {
        return None;
    }

    let mut end: Option<EndData> = None;
    let mut set = BTreeSet::new();
    let mut vector = Vec::new();
    let mut hash = 0u64;

    for &node in followpos {
        if let Some(&data) = arena.end_data(node) {
            if end.is_none() {
                end = Some(data);
                if flags & regex_flags::ALLOW_SUPPRESSED_RULES == 0 {
                    used_ids.insert(data.unique_id);
                }
            }
        }

        if set.insert(node) {
            vector.push(node);
            hash = hash.wrapping_add(node as u64);
        }
    }

    for (existing, (h, s)) in hashes.iter().zip(seen_sets.iter()).enumerate() {
        if *h == hash && *s == set {
            return Some(existing as u32 + 1);
        }
    }

    seen_sets.push(set);
    seen_vectors.push(vector);
    hashes.push(hash);

    // state 0 is the jam state
    let row = seen_sets.len() as u32;
    let offset = dfa.len();
    dfa.resize(offset + alphabet, 0);

    if let Some(data) = end {
        let mut bits = state_bit::END_STATE;
        if data.greedy != GreedyRepeat::No {
            bits |= state_bit::GREEDY;
        }
        if data.pop_dfa {
            bits |= state_bit::POP_DFA;
        }

        dfa[offset + column::END_STATE] = bits;
        dfa[offset + column::ID] = data.id;
        dfa[offset + column::USER_ID] = data.user_id;
        dfa[offset + column::PUSH_DFA] = data.push_dfa;
        dfa[offset + column::NEXT_DFA] = data.next_dfa;
    }

    Some(row)
}

fn set_transitions(
    transition: u32,
    eq: &EquivSet,
    dfa: &mut Vec<u32>,
    row: u32,
    alphabet: usize,
    eol_rows: &mut BTreeSet<u32>,
) {
    let base = row as usize * alphabet;

    for &index in &eq.index_vector {
        if index == BOL_TOKEN {
            // the jam row's first cell holds the begin-of-line start row
            dfa[column::END_STATE] = transition;
        } else if index == EOL_TOKEN {
            dfa[base + column::EOL] = transition;
            eol_rows.insert(row);
        } else {
            dfa[base + column::TRANSITIONS + index as usize] = transition;
        }
    }
}

fn token_has_col(
    arena: &TreeArena,
    set_mapping: &[BTreeSet<u32>],
    node: NodeId,
    col: Option<u32>,
) -> bool {
    match (arena.token(node), col) {
        (Some(token), Some(col)) if (token as usize) < set_mapping.len() => {
            set_mapping[token as usize].contains(&col)
        }
        _ => false,
    }
}

// A position set holding both an EOL position and a path that consumes
// the line break it anchors against is ambiguous: '$' must win. The
// loser's positions are dropped before the set becomes a DFA state.
fn prune_eol_clashes(
    arena: &TreeArena,
    followpos: &mut Vec<NodeId>,
    cr_col: Option<u32>,
    nl_col: Option<u32>,
    set_mapping: &[BTreeSet<u32>],
) {
    if cr_col.is_none() && nl_col.is_none() {
        return;
    }

    let mut index = 0;
    while index < followpos.len() {
        let node = followpos[index];

        if !arena.is_end(node) {
            if arena.token(node) == Some(EOL_TOKEN) {
                prune_nl(arena, index, followpos, cr_col, nl_col, set_mapping);
            } else {
                prune_eol(arena, index, followpos, cr_col, nl_col, set_mapping);
            }
        }

        index += 1;
    }
}

// An EOL position at `index` dominates later positions that match the
// line break directly and then accept.
fn prune_nl(
    arena: &TreeArena,
    index: usize,
    followpos: &mut Vec<NodeId>,
    cr_col: Option<u32>,
    nl_col: Option<u32>,
    set_mapping: &[BTreeSet<u32>],
) {
    let mut j = index + 1;

    'scan: while j < followpos.len() {
        let node = followpos[j];

        if arena.is_end(node) {
            j += 1;
            continue;
        }

        if token_has_col(arena, set_mapping, node, cr_col) {
            for &cr_next in arena.followpos(node) {
                if arena.is_end(cr_next) {
                    continue;
                }

                if token_has_col(arena, set_mapping, cr_next, nl_col)
                    && arena
                        .followpos(cr_next)
                        .iter()
                        .any(|&n| arena.is_end(n))
                {
                    followpos.remove(j);
                    continue 'scan;
                }
            }
        }

        if token_has_col(arena, set_mapping, node, nl_col)
            && arena.followpos(node).iter().any(|&n| arena.is_end(n))
        {
            followpos.remove(j);
            continue 'scan;
        }

        j += 1;
    }
}

// A position at `index` that consumes the line break and accepts
// dominates later EOL positions in the same set.
fn prune_eol(
    arena: &TreeArena,
    index: usize,
    followpos: &mut Vec<NodeId>,
    cr_col: Option<u32>,
    nl_col: Option<u32>,
    set_mapping: &[BTreeSet<u32>],
) {
    let node = followpos[index];
    let mut dominated = false;

    if token_has_col(arena, set_mapping, node, cr_col) {
        for &cr_next in arena.followpos(node) {
            if arena.is_end(cr_next) {
                continue;
            }

            if token_has_col(arena, set_mapping, cr_next, nl_col)
                && arena.followpos(cr_next).iter().any(|&n| arena.is_end(n))
            {
                dominated = true;
                break;
            }
        }
    }

    if !dominated
        && token_has_col(arena, set_mapping, node, nl_col)
        && arena.followpos(node).iter().any(|&n| arena.is_end(n))
    {
        dominated = true;
    }

    if dominated {
        let mut j = index + 1;

        while j < followpos.len() {
            let candidate = followpos[j];

            if !arena.is_end(candidate) && arena.token(candidate) == Some(EOL_TOKEN) {
                followpos.remove(j);
                continue;
            }

            j += 1;
        }
    }
}

// '$' must match before a line break, so a state with both an EOL
// transition and a CR or NL transition moves the CR/NL transitions into
// the state the EOL transition leads to.
fn fix_clashes(
    eol_rows: &BTreeSet<u32>,
    cr_col: Option<u32>,
    nl_col: Option<u32>,
    dfa: &mut Vec<u32>,
    alphabet: usize,
) {
    for &row in eol_rows {
        let base = row as usize * alphabet;
        let eol_state = dfa[base + column::EOL];

        for col in [cr_col, nl_col].iter().filter_map(|&col| col) {
            let cell = base + column::TRANSITIONS + col as usize;
            let state = dfa[cell];

            if state != 0 {
                dfa[cell] = 0;

                let target = eol_state as usize * alphabet + column::TRANSITIONS + col as usize;
                if dfa[target] == 0 {
                    dfa[target] = state;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn build<F: Fn(&mut Rules)>(configure: F) -> Result<StateMachine> {
        let mut rules = Rules::new();
        configure(&mut rules);
        Generator::build(&rules)
    }

    fn walk(sm: &StateMachine, state: u32, input: &str) -> u32 {
        let dfa = sm.dfa(state);
        let lookup = sm.lookup_table(state);
        let mut row = 1u32;

        for c in input.chars() {
            row = dfa.cell(row, lookup.get(c as u32) as usize);
            assert_ne!(row, 0, "jammed on {:?}", c);
        }

        row
    }

    #[test]
    fn single_rule_machine_accepts_its_language() {
        let sm = build(|rules| {
            rules.push("[0-9]+", 1).unwrap();
        })
        .expect("build failed");

        let end = walk(&sm, 0, "42");
        let row = sm.dfa(0).row(end);

        assert_ne!(row[column::END_STATE] & state_bit::END_STATE, 0);
        assert_eq!(row[column::ID], 1);
    }

    #[test]
    fn jam_row_rejects_characters_outside_the_rules() {
        let sm = build(|rules| {
            rules.push("[0-9]+", 1).unwrap();
        })
        .expect("build failed");

        let dfa = sm.dfa(0);
        let lookup = sm.lookup_table(0);
        let col = lookup.get(b'x' as u32) as usize;

        assert_eq!(col, column::DEAD);
        assert_eq!(dfa.cell(1, col), 0);
    }

    #[test]
    fn earlier_rule_wins_the_shared_end_state() {
        let sm = build(|rules| {
            rules.push("if", 1).unwrap();
            rules.push("[a-z]+", 2).unwrap();
        })
        .expect("build failed");

        let end = walk(&sm, 0, "if");
        let row = sm.dfa(0).row(end);

        assert_eq!(row[column::ID], 1);
    }

    #[test]
    fn longer_identifier_leaves_the_keyword_state() {
        let sm = build(|rules| {
            rules.push("if", 1).unwrap();
            rules.push("[a-z]+", 2).unwrap();
        })
        .expect("build failed");

        let end = walk(&sm, 0, "ifx");
        let row = sm.dfa(0).row(end);

        assert_eq!(row[column::ID], 2);
    }

    #[test]
    fn empty_lexer_state_is_rejected_by_name() {
        let result = build(|rules| {
            rules.push_state("EMPTY");
            rules.push("a", 1).unwrap();
        });

        assert_matches!(
            result,
            Err(Error::EmptyLexerState { ref state_name }) if state_name == "EMPTY"
        );
    }

    #[test]
    fn zero_length_rule_is_rejected_without_the_flag() {
        let result = build(|rules| {
            rules.push("a*", 1).unwrap();
        });

        assert_matches!(
            result,
            Err(Error::ZeroLengthMatch { ref rule_source }) if rule_source == "a*"
        );
    }

    #[test]
    fn zero_length_rule_is_accepted_with_the_flag() {
        let mut rules = Rules::with_flags(regex_flags::MATCH_ZERO_LEN);
        rules.push("a*", 1).unwrap();

        assert!(Generator::build(&rules).is_ok());
    }

    #[test]
    fn fully_shadowed_rule_is_rejected() {
        let result = build(|rules| {
            rules.push("[a-z]+", 1).unwrap();
            rules.push("abc", 2).unwrap();
        });

        assert_matches!(
            result,
            Err(Error::RuleSuppressed { rule_index: 1, ref rule_source }) if rule_source == "abc"
        );
    }

    #[test]
    fn shadowed_rule_is_tolerated_with_the_flag() {
        let mut rules = Rules::with_flags(regex_flags::ALLOW_SUPPRESSED_RULES);
        rules.push("[a-z]+", 1).unwrap();
        rules.push("abc", 2).unwrap();

        assert!(Generator::build(&rules).is_ok());
    }

    #[test]
    fn icase_rules_for_both_cases_build_identical_machines() {
        let lower = build(|rules| {
            rules.set_flags(regex_flags::ICASE);
            rules.push("abc", 1).unwrap();
        })
        .expect("build failed");
        let upper = build(|rules| {
            rules.set_flags(regex_flags::ICASE);
            rules.push("ABC", 1).unwrap();
        })
        .expect("build failed");

        assert_eq!(lower, upper);
    }

    #[test]
    fn bol_anchored_state_records_its_start_row_in_the_jam_row() {
        let sm = build(|rules| {
            rules.push("^a", 1).unwrap();
        })
        .expect("build failed");

        let dfa = sm.dfa(0);

        assert_ne!(dfa.cell(0, column::END_STATE), 0);
    }

    #[test]
    fn eol_anchored_rule_gets_an_eol_transition() {
        let sm = build(|rules| {
            rules.push("a$", 1).unwrap();
        })
        .expect("build failed");

        let dfa = sm.dfa(0);
        let lookup = sm.lookup_table(0);
        let after_a = dfa.cell(1, lookup.get(b'a' as u32) as usize);

        assert_ne!(after_a, 0);
        assert_ne!(dfa.cell(after_a, column::EOL), 0);
    }

    #[test]
    fn multiple_start_states_build_independent_tables() {
        let sm = build(|rules| {
            rules.push_state("STRING");
            rules.push("\"", 1).unwrap();
            rules.push_in("STRING", "[^\"]+", 2, ".").unwrap();
        })
        .expect("build failed");

        assert_eq!(sm.state_count(), 2);
        assert_ne!(sm.features() & feature_bit::MULTI_STATE, 0);
    }

    #[test]
    fn skip_ws_flag_adds_the_implicit_skip_rule() {
        let sm = build(|rules| {
            rules.set_flags(regex_flags::SKIP_WS);
            rules.push("[0-9]+", 1).unwrap();
        })
        .expect("build failed");

        let end = walk(&sm, 0, "  \t");
        let row = sm.dfa(0).row(end);

        assert_eq!(row[column::ID], Rules::skip());
        assert_ne!(sm.features() & feature_bit::SKIP, 0);
    }

    #[test]
    fn lazy_end_states_drop_their_abstemious_transitions() {
        let sm = build(|rules| {
            rules.push("\"[^\"]*?\"", 1).unwrap();
        })
        .expect("build failed");

        // after matching "x" the end state must jam instead of
        // continuing through the lazy repetition
        let end = walk(&sm, 0, "\"x\"");
        let dfa = sm.dfa(0);
        let lookup = sm.lookup_table(0);
        let row = dfa.row(end);

        assert_ne!(row[column::END_STATE] & state_bit::END_STATE, 0);
        assert_eq!(row[column::END_STATE] & state_bit::GREEDY, 0);
        assert_eq!(dfa.cell(end, lookup.get(b' ' as u32) as usize), 0);
    }

    #[test]
    fn greedy_version_of_the_same_rule_keeps_scanning() {
        let sm = build(|rules| {
            rules.push("\"[^\n]*\"", 1).unwrap();
        })
        .expect("build failed");

        let end = walk(&sm, 0, "\"x\"");
        let dfa = sm.dfa(0);
        let lookup = sm.lookup_table(0);
        let row = dfa.row(end);

        assert_ne!(row[column::END_STATE] & state_bit::GREEDY, 0);
        // the greedy end state still has outgoing transitions
        assert_ne!(dfa.cell(end, lookup.get(b' ' as u32) as usize), 0);
    }
}
