// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! `LIKE` pattern lowering to an anchored regular expression (spec §4.D).

use mongosql_common::{Error, Result};

const REGEX_METACHARS: &[char] = &['\\', '^', '$', '.', '|', '?', '*', '+', '(', ')', '[', '{'];

/// Lowers a SQL `LIKE` pattern to the regex body MongoDB's `$regexMatch`
/// expects, anchored with `^...$`.
///
/// `_` becomes `.`, `%` becomes `.*`, and the listed regex metacharacters
/// are backslash-escaped so they match literally. An `escape` character, if
/// given, makes the character immediately following it in the pattern
/// literal — but only when that next character is `%` or `_`; everywhere
/// else the escape character is just an ordinary character.
pub fn like_pattern_to_regex(pattern: &str, escape: Option<char>) -> Result<String> {
    let mut out = String::from("^");
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if Some(c) == escape {
            if let Some(&next) = chars.get(i + 1) {
                if next == '%' || next == '_' {
                    push_literal(&mut out, next);
                    i += 2;
                    continue;
                }
            }
            push_literal(&mut out, c);
            i += 1;
            continue;
        }
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => push_literal(&mut out, other),
        }
        i += 1;
    }
    out.push('$');
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if REGEX_METACHARS.contains(&c) {
        out.push('\\');
    }
    out.push(c);
}

/// Validates and extracts the single `ESCAPE` character for a `LIKE`
/// clause. An escape string longer than one character is a compile-time
/// error (spec §4.D, §7 `GenericError`).
pub fn parse_escape(escape: Option<&str>) -> Result<Option<char>> {
    match escape {
        None => Ok(None),
        Some(s) => {
            let mut chars = s.chars();
            let first = chars.next();
            if chars.next().is_some() || first.is_none() {
                return Err(Error::Generic {
                    message: format!("LIKE ESCAPE string must be exactly one character, got {s:?}"),
                });
            }
            Ok(first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_and_underscore_translate_to_wildcards() {
        assert_eq!(like_pattern_to_regex("a%b_c", None).unwrap(), "^a.*b.c$");
    }

    #[test]
    fn regex_metacharacters_in_pattern_are_escaped() {
        assert_eq!(like_pattern_to_regex("a.b", None).unwrap(), "^a\\.b$");
    }

    #[test]
    fn escape_char_makes_following_percent_literal() {
        assert_eq!(like_pattern_to_regex("A\\_%", Some('\\')).unwrap(), "^A_.*$");
    }

    #[test]
    fn escape_char_outside_percent_or_underscore_is_literal_itself() {
        assert_eq!(like_pattern_to_regex("a\\b", Some('\\')).unwrap(), "^a\\\\b$");
    }

    #[test]
    fn escape_string_longer_than_one_char_is_rejected() {
        assert!(parse_escape(Some("ab")).is_err());
    }

    #[test]
    fn no_escape_is_allowed() {
        assert_eq!(parse_escape(None).unwrap(), None);
    }
}
