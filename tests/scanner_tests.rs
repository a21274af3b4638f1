// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

extern crate relex;

use relex::{lookup, regex_flags, Generator, MatchResults, Matches, Rules, StateMachine};

fn tokens(sm: &StateMachine, input: &str) -> Vec<(u32, String)> {
    Matches::new(input, sm)
        .map(|r| r.expect("scan failed"))
        .map(|m| (m.id(), m.as_str().to_string()))
        .collect()
}

fn pair(id: u32, text: &str) -> (u32, String) {
    (id, text.to_string())
}

#[test]
fn numbers_and_identifiers_with_whitespace_skipped() {
    let mut rules = Rules::new();
    rules.push("[0-9]+", 1).unwrap();
    rules.push("[a-z]+", 2).unwrap();
    rules.push("\\s+", Rules::skip()).unwrap();
    let sm = Generator::build(&rules).unwrap();

    assert_eq!(
        tokens(&sm, "abc 123"),
        vec![pair(2, "abc"), pair(1, "123")]
    );

    // the scan ends with the end-of-input sentinel carrying id 0
    let mut results = MatchResults::new("abc 123");
    while !results.is_eoi() {
        lookup(&sm, &mut results).expect("scan failed");
    }
    assert_eq!(results.id(), 0);
}

#[test]
fn longest_match_prefers_the_identifier_over_the_keyword() {
    let mut rules = Rules::new();
    rules.push("if", 1).unwrap();
    rules.push("[a-z]+", 2).unwrap();
    rules.push("\\s+", Rules::skip()).unwrap();
    let sm = Generator::build(&rules).unwrap();

    assert_eq!(tokens(&sm, "ifx if"), vec![pair(2, "ifx"), pair(1, "if")]);
}

#[test]
fn greedy_quoted_string_swallows_both_strings() {
    let mut rules = Rules::new();
    rules.push("\"[^\\n]*\"", 1).unwrap();
    rules.push("\\s+", Rules::skip()).unwrap();
    let sm = Generator::build(&rules).unwrap();

    assert_eq!(
        tokens(&sm, "\"a\" \"b\""),
        vec![pair(1, "\"a\" \"b\"")]
    );
}

#[test]
fn lazy_quoted_string_stops_at_each_close_quote() {
    let mut rules = Rules::new();
    rules.push("\"[^\\n]*?\"", 1).unwrap();
    rules.push("\\s+", Rules::skip()).unwrap();
    let sm = Generator::build(&rules).unwrap();

    assert_eq!(
        tokens(&sm, "\"a\" \"b\""),
        vec![pair(1, "\"a\""), pair(1, "\"b\"")]
    );
}

#[test]
fn bol_anchor_matches_at_start_and_after_each_newline() {
    let mut rules = Rules::with_flags(regex_flags::DOT_NOT_NEWLINE);
    rules.push("^BEGIN", 1).unwrap();
    rules.push(".+", 2).unwrap();
    rules.push("\\n", Rules::skip()).unwrap();
    let sm = Generator::build(&rules).unwrap();

    assert_eq!(
        tokens(&sm, "BEGIN\nBEGIN"),
        vec![pair(1, "BEGIN"), pair(1, "BEGIN")]
    );

    // away from the line start the anchored rule loses
    assert_eq!(tokens(&sm, "xBEGIN"), vec![pair(2, "xBEGIN")]);
}

#[test]
fn eol_anchor_matches_before_newline_and_at_end_of_input() {
    let mut rules = Rules::with_flags(regex_flags::DOT_NOT_NEWLINE);
    rules.push("end$", 1).unwrap();
    rules.push("[a-z]+", 2).unwrap();
    rules.push("\\s+", Rules::skip()).unwrap();
    let sm = Generator::build(&rules).unwrap();

    assert_eq!(
        tokens(&sm, "end fin\nend"),
        vec![pair(2, "end"), pair(2, "fin"), pair(1, "end")]
    );
}

#[test]
fn comment_start_state_brackets_the_comment_span() {
    let mut rules = Rules::new();
    rules.push_state("COMMENT");
    rules.push("[a-z]+", 1).unwrap();
    rules.push("\\s+", Rules::skip()).unwrap();
    rules.push_in("INITIAL", "/\\*", 10, ">COMMENT").unwrap();
    rules.push_in("COMMENT", "\\*/", 11, "<").unwrap();
    rules.push_in("COMMENT", "[^*]+", Rules::skip(), ".").unwrap();
    rules.push_in("COMMENT", "\\*", Rules::skip(), ".").unwrap();
    let sm = Generator::build(&rules).unwrap();

    assert_eq!(
        tokens(&sm, "a /* x */ b"),
        vec![pair(1, "a"), pair(10, "/*"), pair(11, "*/"), pair(1, "b")]
    );
}

#[test]
fn counted_repetition_bounds_the_match_length() {
    let mut rules = Rules::new();
    rules.push("a{2,4}", 1).unwrap();
    let sm = Generator::build(&rules).unwrap();

    // too short: rejected one code point at a time
    let rejected: Vec<_> = Matches::new("a", &sm)
        .map(|r| r.expect("scan failed").is_rejected())
        .collect();
    assert_eq!(rejected, vec![true]);

    assert_eq!(tokens(&sm, "aa"), vec![pair(1, "aa")]);
    assert_eq!(tokens(&sm, "aaaa"), vec![pair(1, "aaaa")]);

    // five a's: a maximal match then a rejected straggler
    let five: Vec<_> = Matches::new("aaaaa", &sm)
        .map(|r| r.expect("scan failed"))
        .map(|m| (m.is_rejected(), m.as_str().to_string()))
        .collect();
    assert_eq!(
        five,
        vec![(false, "aaaa".to_string()), (true, "a".to_string())]
    );
}

#[test]
fn macros_expand_inside_rules() {
    let mut rules = Rules::new();
    rules.insert_macro("DIGIT", "[0-9]").unwrap();
    rules.insert_macro("INT", "{DIGIT}+").unwrap();
    rules.push("{INT}", 1).unwrap();
    rules.push("{INT}\\.{DIGIT}*", 2).unwrap();
    rules.push("\\s+", Rules::skip()).unwrap();
    let sm = Generator::build(&rules).unwrap();

    assert_eq!(
        tokens(&sm, "12 34.5"),
        vec![pair(1, "12"), pair(2, "34.5")]
    );
}

#[test]
fn case_insensitive_rules_match_both_cases() {
    let mut rules = Rules::with_flags(regex_flags::ICASE);
    rules.push("select", 1).unwrap();
    rules.push("\\s+", Rules::skip()).unwrap();
    let sm = Generator::build(&rules).unwrap();

    assert_eq!(
        tokens(&sm, "SELECT Select select"),
        vec![pair(1, "SELECT"), pair(1, "Select"), pair(1, "select")]
    );
}

#[test]
fn case_fold_produces_byte_identical_machines() {
    let build = |source: &str| {
        let mut rules = Rules::with_flags(regex_flags::ICASE);
        rules.push(source, 1).unwrap();
        Generator::build(&rules).unwrap()
    };

    assert_eq!(build("abc"), build("ABC"));
    assert_eq!(build("[a-f]+"), build("[A-F]+"));
}

#[test]
fn zero_length_rules_fail_the_build_unless_allowed() {
    let mut rules = Rules::new();
    rules.push("(foo)?", 1).unwrap();

    assert!(Generator::build(&rules).is_err());

    rules.set_flags(regex_flags::MATCH_ZERO_LEN);
    assert!(Generator::build(&rules).is_ok());
}

#[test]
fn user_ids_ride_along_with_matches() {
    let mut rules = Rules::new();
    rules
        .push_in_with_id("INITIAL", "[0-9]+", 1, 42, ".")
        .unwrap();
    let sm = Generator::build(&rules).unwrap();

    let matches: Vec<_> = Matches::new("7", &sm)
        .map(|r| r.expect("scan failed"))
        .collect();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].user_id(), Some(42));
}

#[test]
fn unicode_rules_scan_multibyte_input() {
    let mut rules = Rules::with_flags(regex_flags::COMPRESSED);
    rules.push("\\p{InHiragana}+", 1).unwrap();
    rules.push("[a-z]+", 2).unwrap();
    rules.push("\\s+", Rules::skip()).unwrap();
    let sm = Generator::build(&rules).unwrap();

    assert_eq!(
        tokens(&sm, "ひらがな abc"),
        vec![pair(1, "ひらがな"), pair(2, "abc")]
    );
}

#[test]
fn compressed_and_dense_lookups_scan_identically() {
    let build = |flags: u32| {
        let mut rules = Rules::with_flags(flags);
        rules.push("[a-z\\x{4E00}-\\x{9FFF}]+", 1).unwrap();
        rules.push("\\s+", Rules::skip()).unwrap();
        Generator::build(&rules).unwrap()
    };

    let dense = build(0);
    let trie = build(regex_flags::COMPRESSED);
    let input = "abc 中文 mixed中";

    assert_eq!(tokens(&dense, input), tokens(&trie, input));
}

#[test]
fn repeated_scans_are_deterministic() {
    let mut rules = Rules::new();
    rules.push("[a-z]+", 1).unwrap();
    rules.push("[0-9]+", 2).unwrap();
    rules.push("\\s+", Rules::skip()).unwrap();
    let sm = Generator::build(&rules).unwrap();
    let input = "one 2 three 45 !";

    let first: Vec<_> = Matches::new(input, &sm)
        .map(|r| r.expect("scan failed"))
        .map(|m| (m.id(), m.first(), m.second()))
        .collect();
    let second: Vec<_> = Matches::new(input, &sm)
        .map(|r| r.expect("scan failed"))
        .map(|m| (m.id(), m.first(), m.second()))
        .collect();

    assert_eq!(first, second);
}

#[test]
fn every_ascii_code_point_maps_to_exactly_one_column() {
    use relex::state_machine::column;

    let mut rules = Rules::new();
    rules.push("[a-m]+", 1).unwrap();
    rules.push("[h-z]+", 2).unwrap();
    rules.push("[0-9]+", 3).unwrap();
    let sm = Generator::build(&rules).unwrap();

    let lookup_table = sm.lookup_table(0);
    let alphabet = sm.dfa(0).alphabet();
    let mut population = vec![0usize; alphabet];

    for cp in 0u32..256 {
        let col = lookup_table.get(cp) as usize;
        assert!(col == column::DEAD || col >= column::TRANSITIONS);
        assert!(col < alphabet);
        population[col] += 1;
    }

    // every transition column is inhabited
    for col in column::TRANSITIONS..alphabet {
        assert!(population[col] > 0, "column {} is empty", col);
    }
}
