// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The regex tokenizer.
//!
//! One call to `Tokenizer::tokenize` turns a regex source string into a
//! token vector framed by `Begin`/`End`, with macros inlined, character
//! classes normalized into single charsets, repetition counts parsed and
//! vacuous trailing lazy quantifiers pruned away.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::CharIndices;

use abstemious;
use charset::{CharSet, MAX_CODE_POINT};
use error::{Error, Result};
use rules::{feature_bit, regex_flags};
use token::{Token, TokenKind};
use unicode;

/// The regex tokenizer for one rule set.
///
/// The tokenizer borrows the rule set's macro table; macro references are
/// inlined at the point of use with an active-name stack guarding against
/// recursive definitions.
pub struct Tokenizer<'a> {
    macros: &'a BTreeMap<String, String>,
    flags: u32,
}

type Scanner<'s> = Peekable<CharIndices<'s>>;

impl<'a> Tokenizer<'a> {
    /// Creates a tokenizer over `macros` with the option `flags`.
    pub fn new(macros: &'a BTreeMap<String, String>, flags: u32) -> Tokenizer<'a> {
        Tokenizer { macros, flags }
    }

    /// Tokenizes `source` and returns the token vector along with the
    /// feature bits observed while scanning.
    pub fn tokenize(&self, source: &str) -> Result<(Vec<Token>, u32)> {
        let mut tokens = vec![Token::new(TokenKind::Begin)];
        let mut indexes = Vec::new();
        let mut features = 0;
        let mut active = Vec::new();

        self.scan(
            source,
            &mut tokens,
            &mut indexes,
            &mut features,
            &mut active,
        )?;
        tokens.push(Token::new(TokenKind::End));

        abstemious::prune(&mut tokens, &mut indexes);

        Ok((tokens, features))
    }

    fn scan(
        &self,
        source: &str,
        out: &mut Vec<Token>,
        indexes: &mut Vec<usize>,
        features: &mut u32,
        active: &mut Vec<String>,
    ) -> Result<()> {
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '(' => out.push(Token::new(TokenKind::OpenParen)),
                ')' => out.push(Token::new(TokenKind::CloseParen)),
                '|' => out.push(Token::new(TokenKind::Or)),
                '^' => {
                    *features |= feature_bit::BOL;
                    out.push(Token::new(TokenKind::Bol));
                }
                '$' => {
                    *features |= feature_bit::EOL;
                    out.push(Token::new(TokenKind::Eol));
                }
                '?' => push_dup(out, indexes, &mut chars, TokenKind::Opt, TokenKind::AOpt),
                '*' => push_dup(
                    out,
                    indexes,
                    &mut chars,
                    TokenKind::ZeroOrMore,
                    TokenKind::AZeroOrMore,
                ),
                '+' => push_dup(
                    out,
                    indexes,
                    &mut chars,
                    TokenKind::OneOrMore,
                    TokenKind::AOneOrMore,
                ),
                '{' => self.brace(pos, &mut chars, out, indexes, features, active)?,
                '[' => {
                    let set = self.bracket(pos, &mut chars)?;
                    out.push(Token::charset(set));
                }
                '.' => out.push(Token::charset(self.dot())),
                '\\' => {
                    let mut set = escape(pos, &mut chars)?;
                    if self.flags & regex_flags::ICASE != 0 {
                        set.case_fold();
                    }
                    out.push(Token::charset(set));
                }
                _ => out.push(Token::charset(self.literal(c as u32))),
            }
        }

        Ok(())
    }

    fn literal(&self, c: u32) -> CharSet {
        let mut set = CharSet::single(c);
        if self.flags & regex_flags::ICASE != 0 {
            set.case_fold();
        }
        set
    }

    fn dot(&self) -> CharSet {
        let mut set = CharSet::any();

        if self.flags & regex_flags::DOT_NOT_NEWLINE != 0 {
            set.remove(&CharSet::single('\n' as u32));
        }
        if self.flags & regex_flags::DOT_NOT_CR_LF != 0 {
            set.remove(&CharSet::single('\n' as u32));
            set.remove(&CharSet::single('\r' as u32));
        }

        set
    }

    // A '{' either opens a repetition count or a macro reference.
    fn brace(
        &self,
        pos: usize,
        chars: &mut Scanner,
        out: &mut Vec<Token>,
        indexes: &mut Vec<usize>,
        features: &mut u32,
        active: &mut Vec<String>,
    ) -> Result<()> {
        let mut body = String::new();

        loop {
            match chars.next() {
                Some((_, '}')) => break,
                Some((_, c)) => body.push(c),
                None => {
                    return Err(Error::Syntax {
                        position: pos,
                        lhs: "{n[,[m]]}",
                        rhs: "END",
                    })
                }
            }
        }

        if body.chars().next().map_or(false, |c| c.is_ascii_digit()) {
            self.repeat_spec(pos, &body, chars, out, indexes)
        } else {
            self.macro_reference(pos, &body, out, indexes, features, active)
        }
    }

    fn repeat_spec(
        &self,
        pos: usize,
        body: &str,
        chars: &mut Scanner,
        out: &mut Vec<Token>,
        indexes: &mut Vec<usize>,
    ) -> Result<()> {
        let (min, comma, max) = parse_counts(pos, body)?;
        let greedy = !consume_lazy_marker(chars);

        if let Some(max) = max {
            if min > max || max == 0 {
                return Err(Error::RepeatOutOfRange);
            }
        } else if !comma && min == 0 {
            return Err(Error::RepeatOutOfRange);
        }

        let kind = match (min, comma, max) {
            (0, true, None) => {
                if greedy {
                    TokenKind::ZeroOrMore
                } else {
                    TokenKind::AZeroOrMore
                }
            }
            (0, true, Some(1)) => {
                if greedy {
                    TokenKind::Opt
                } else {
                    TokenKind::AOpt
                }
            }
            (1, true, None) => {
                if greedy {
                    TokenKind::OneOrMore
                } else {
                    TokenKind::AOneOrMore
                }
            }
            _ => {
                // {n,n} is an exact repetition
                let extra = if max == Some(min) {
                    min.to_string()
                } else {
                    body.to_string()
                };

                if !greedy {
                    indexes.push(out.len());
                }
                out.push(Token::repeat_n(extra, greedy));
                return Ok(());
            }
        };

        if kind.is_abstemious() {
            indexes.push(out.len());
        }
        out.push(Token::new(kind));
        Ok(())
    }

    fn macro_reference(
        &self,
        pos: usize,
        name: &str,
        out: &mut Vec<Token>,
        indexes: &mut Vec<usize>,
        features: &mut u32,
        active: &mut Vec<String>,
    ) -> Result<()> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::Syntax {
                position: pos,
                lhs: "{n[,[m]]}",
                rhs: "MACRO",
            });
        }

        let source = match self.macros.get(name) {
            Some(source) => source,
            None => {
                return Err(Error::UnknownMacro {
                    name: name.to_string(),
                })
            }
        };

        if active.iter().any(|n| n == name) {
            return Err(Error::MacroRecursion {
                name: name.to_string(),
            });
        }

        active.push(name.to_string());

        let mut body = Vec::new();
        let mut body_indexes = Vec::new();
        self.scan(source, &mut body, &mut body_indexes, features, active)?;

        active.pop();

        // A multi token expansion is bracketed so the reference behaves
        // as a single operand at the point of use.
        let wrap = body.len() > 1;
        if wrap {
            out.push(Token::new(TokenKind::OpenParen));
        }
        let base = out.len();
        indexes.extend(body_indexes.into_iter().map(|idx| base + idx));
        out.extend(body);
        if wrap {
            out.push(Token::new(TokenKind::CloseParen));
        }

        Ok(())
    }

    fn bracket(&self, pos: usize, chars: &mut Scanner) -> Result<CharSet> {
        let mut set = CharSet::empty();
        let negate = chars.peek().map_or(false, |&(_, c)| c == '^');
        if negate {
            chars.next();
        }
        let mut first = true;

        loop {
            let (item_pos, c) = match chars.next() {
                Some(item) => item,
                None => {
                    return Err(Error::Syntax {
                        position: pos,
                        lhs: "[",
                        rhs: "END",
                    })
                }
            };

            match c {
                ']' if !first => break,
                '[' if chars.peek().map_or(false, |&(_, c)| c == ':') => {
                    chars.next();
                    self.posix_class(item_pos, chars, &mut set)?;
                }
                '\\' => {
                    let class = escape(item_pos, chars)?;
                    match single_code_point(&class) {
                        Some(start) if chars.peek().map_or(false, |&(_, c)| c == '-') => {
                            self.bracket_range(start, chars, &mut set)?;
                        }
                        _ => set.union(&class),
                    }
                }
                _ => {
                    if chars.peek().map_or(false, |&(_, c)| c == '-') {
                        self.bracket_range(c as u32, chars, &mut set)?;
                    } else {
                        set.insert(c as u32, c as u32);
                    }
                }
            }

            first = false;
        }

        if self.flags & regex_flags::ICASE != 0 {
            set.case_fold();
        }
        if negate {
            set.negate();
        }
        if set.is_empty() {
            return Err(Error::EmptyCharacterClass);
        }

        Ok(set)
    }

    // Called with the scanner peeking at the '-' after a range start.
    // A '-' immediately before the closing ']' is a literal instead.
    fn bracket_range(&self, start: u32, chars: &mut Scanner, set: &mut CharSet) -> Result<()> {
        let mut ahead = chars.clone();
        ahead.next(); // the '-'

        match ahead.next() {
            Some((_, ']')) | None => {
                // literal '-'; leave it for the main loop
                set.insert(start, start);
            }
            Some((end_pos, '\\')) => {
                chars.next();
                chars.next();
                let class = escape(end_pos, chars)?;
                let end = single_code_point(&class)
                    .ok_or(Error::InvalidEscape { position: end_pos })?;
                set.insert(start.min(end), start.max(end));
            }
            Some((_, end)) => {
                chars.next();
                chars.next();
                let end = end as u32;
                set.insert(start.min(end), start.max(end));
            }
        }

        Ok(())
    }

    fn posix_class(&self, pos: usize, chars: &mut Scanner, set: &mut CharSet) -> Result<()> {
        let mut name = String::new();

        loop {
            match chars.next() {
                Some((_, ':')) => match chars.next() {
                    Some((_, ']')) => break,
                    _ => {
                        return Err(Error::Syntax {
                            position: pos,
                            lhs: "[",
                            rhs: "]",
                        })
                    }
                },
                Some((_, c)) => name.push(c),
                None => {
                    return Err(Error::Syntax {
                        position: pos,
                        lhs: "[",
                        rhs: "END",
                    })
                }
            }
        }

        let negate = name.starts_with('^');
        let bare = if negate { &name[1..] } else { &name[..] };
        let ranges: &[(u32, u32)] = match bare {
            "alnum" => &[(0x30, 0x39), (0x41, 0x5A), (0x61, 0x7A)],
            "alpha" => &[(0x41, 0x5A), (0x61, 0x7A)],
            "blank" => &[(0x09, 0x09), (0x20, 0x20)],
            "cntrl" => &[(0x00, 0x1F), (0x7F, 0x7F)],
            "digit" => &[(0x30, 0x39)],
            "graph" => &[(0x21, 0x7E)],
            "lower" => &[(0x61, 0x7A)],
            "print" => &[(0x20, 0x7E)],
            "punct" => &[(0x21, 0x2F), (0x3A, 0x40), (0x5B, 0x60), (0x7B, 0x7E)],
            "space" => &[(0x09, 0x0D), (0x20, 0x20)],
            "upper" => &[(0x41, 0x5A)],
            "xdigit" => &[(0x30, 0x39), (0x41, 0x46), (0x61, 0x66)],
            _ => {
                return Err(Error::UnknownUnicodeProperty {
                    name: name.clone(),
                })
            }
        };

        let mut class: CharSet = CharSet::empty();
        for &(start, end) in ranges {
            class.insert(start, end);
        }
        if negate {
            class.negate();
        }
        set.union(&class);

        Ok(())
    }
}

fn push_dup(
    out: &mut Vec<Token>,
    indexes: &mut Vec<usize>,
    chars: &mut Scanner,
    greedy: TokenKind,
    lazy: TokenKind,
) {
    let kind = if chars.peek().map_or(false, |&(_, c)| c == '?') {
        chars.next();
        lazy
    } else {
        greedy
    };

    if kind.is_abstemious() {
        indexes.push(out.len());
    }
    out.push(Token::new(kind));
}

fn consume_lazy_marker(chars: &mut Scanner) -> bool {
    if chars.peek().map_or(false, |&(_, c)| c == '?') {
        chars.next();
        true
    } else {
        false
    }
}

fn parse_counts(pos: usize, body: &str) -> Result<(u32, bool, Option<u32>)> {
    fn malformed(pos: usize) -> Error {
        Error::Syntax {
            position: pos,
            lhs: "{n[,[m]]}",
            rhs: "}",
        }
    }

    let mut parts = body.splitn(2, ',');
    let min_part = parts.next().unwrap_or("");
    let max_part = parts.next();

    let min: u32 = min_part.parse().map_err(|_| malformed(pos))?;

    match max_part {
        None => Ok((min, false, None)),
        Some("") => Ok((min, true, None)),
        Some(digits) => {
            let max: u32 = digits.parse().map_err(|_| malformed(pos))?;
            Ok((min, true, Some(max)))
        }
    }
}

fn single_code_point(set: &CharSet) -> Option<u32> {
    let ranges = set.ranges();

    if ranges.len() == 1 && ranges[0].start() == ranges[0].end() {
        Some(ranges[0].start())
    } else {
        None
    }
}

fn escape(pos: usize, chars: &mut Scanner) -> Result<CharSet> {
    let (c_pos, c) = chars.next().ok_or(Error::InvalidEscape { position: pos })?;

    let set = match c {
        'a' => CharSet::single(0x07),
        'b' => CharSet::single(0x08),
        'f' => CharSet::single(0x0C),
        'n' => CharSet::single(0x0A),
        'r' => CharSet::single(0x0D),
        't' => CharSet::single(0x09),
        'v' => CharSet::single(0x0B),
        '0' => CharSet::single(0x00),
        'x' => CharSet::single(hex_escape(c_pos, chars)?),
        'c' => {
            let (_, ctrl) = chars.next().ok_or(Error::InvalidEscape { position: c_pos })?;
            if !ctrl.is_ascii() {
                return Err(Error::InvalidEscape { position: c_pos });
            }
            CharSet::single((ctrl.to_ascii_uppercase() as u32) ^ 0x40)
        }
        'd' => digit_class(),
        'D' => {
            let mut set = digit_class();
            set.negate();
            set
        }
        's' => space_class(),
        'S' => {
            let mut set = space_class();
            set.negate();
            set
        }
        'w' => word_class(),
        'W' => {
            let mut set = word_class();
            set.negate();
            set
        }
        'p' | 'P' => {
            let name = property_name(c_pos, chars)?;
            let mut set = unicode::property_set(&name)
                .ok_or(Error::UnknownUnicodeProperty { name })?;
            if c == 'P' {
                set.negate();
            }
            set
        }
        _ if c.is_alphanumeric() => return Err(Error::InvalidEscape { position: pos }),
        _ => CharSet::single(c as u32),
    };

    Ok(set)
}

fn hex_escape(pos: usize, chars: &mut Scanner) -> Result<u32> {
    if chars.peek().map_or(false, |&(_, c)| c == '{') {
        chars.next();
        let mut value: u32 = 0;
        let mut digits = 0;

        loop {
            match chars.next() {
                Some((_, '}')) => break,
                Some((_, c)) => {
                    let digit = c
                        .to_digit(16)
                        .ok_or(Error::InvalidEscape { position: pos })?;
                    value = value
                        .checked_mul(16)
                        .and_then(|v| v.checked_add(digit))
                        .ok_or(Error::InvalidEscape { position: pos })?;
                    digits += 1;
                }
                None => return Err(Error::InvalidEscape { position: pos }),
            }
        }

        if digits == 0 || value > MAX_CODE_POINT {
            return Err(Error::InvalidEscape { position: pos });
        }

        Ok(value)
    } else {
        let mut value: u32 = 0;
        let mut digits = 0;

        while digits < 2 {
            match chars.peek().and_then(|&(_, c)| c.to_digit(16)) {
                Some(digit) => {
                    chars.next();
                    value = value * 16 + digit;
                    digits += 1;
                }
                None => break,
            }
        }

        if digits == 0 {
            return Err(Error::InvalidEscape { position: pos });
        }

        Ok(value)
    }
}

fn property_name(pos: usize, chars: &mut Scanner) -> Result<String> {
    match chars.next() {
        Some((_, '{')) => {}
        _ => return Err(Error::InvalidEscape { position: pos }),
    }

    let mut name = String::new();
    loop {
        match chars.next() {
            Some((_, '}')) => break,
            Some((_, c)) => name.push(c),
            None => return Err(Error::InvalidEscape { position: pos }),
        }
    }

    Ok(name)
}

fn digit_class() -> CharSet {
    let mut set = CharSet::empty();
    set.insert(0x30, 0x39);
    set
}

fn space_class() -> CharSet {
    let mut set = CharSet::empty();
    set.insert(0x09, 0x0D);
    set.insert(0x20, 0x20);
    set
}

fn word_class() -> CharSet {
    let mut set = CharSet::empty();
    set.insert(0x30, 0x39);
    set.insert(0x41, 0x5A);
    set.insert(0x5F, 0x5F);
    set.insert(0x61, 0x7A);
    set
}
