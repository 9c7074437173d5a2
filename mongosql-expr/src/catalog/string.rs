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

//! String operators: `Concat`, `Search`, `Like`, `Substring`, `Lower`,
//! `Upper`, `Trim`, `Length`. `NOT LIKE` is not its own catalog entry; the SQL
//! compiler desugars it to `Not(Like(...))` (spec §4.D), which is why `Like`
//! has no special-cased negated sibling here.

use regex::Regex;

use mongosql_common::{Data, Error, Result, Type};

use super::{Arity, Function};
use crate::logical_plan::LogicalPlan;

fn const_of(t: &Type) -> Option<&Data> {
    match t {
        Type::Const(d) => Some(d),
        _ => None,
    }
}

fn const_str(t: &Type) -> Option<&str> {
    match const_of(t)? {
        Data::Str(s) => Some(s.as_str()),
        _ => None,
    }
}

fn no_simplify(_args: &[LogicalPlan]) -> Option<LogicalPlan> {
    None
}

// --- Concat (variadic) ---

fn concat_typer(args: &[Type]) -> Result<Type> {
    let mut out = String::new();
    for a in args {
        match const_str(a) {
            Some(s) => out.push_str(s),
            None => return Ok(Type::Str),
        }
    }
    Ok(Type::Const(Data::Str(out)))
}

fn concat_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Str, Type::Str])
}

// --- Search: substring containment ---

fn search_typer(args: &[Type]) -> Result<Type> {
    if let (Some(haystack), Some(needle)) = (const_str(&args[0]), const_str(&args[1])) {
        return Ok(Type::Const(Data::Bool(haystack.contains(needle))));
    }
    Ok(Type::Bool)
}

fn search_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Str, Type::Str])
}

// --- Like: SQL LIKE pattern match (`%` any run, `_` any one char) ---

pub fn like_pattern_to_regex(pattern: &str) -> String {
    let mut regex = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex
}

fn like_matches(value: &str, pattern: &str) -> Result<bool> {
    let re = Regex::new(&like_pattern_to_regex(pattern)).map_err(|e| Error::Generic {
        message: format!("invalid LIKE pattern {pattern:?}: {e}"),
    })?;
    Ok(re.is_match(value))
}

fn like_typer(args: &[Type]) -> Result<Type> {
    if let (Some(value), Some(pattern)) = (const_str(&args[0]), const_str(&args[1])) {
        return Ok(Type::Const(Data::Bool(like_matches(value, pattern)?)));
    }
    // a non-constant pattern is still checked eagerly for well-formedness
    // when it happens to be constant; a free-variable pattern is accepted
    // as-is and resolved at evaluation time downstream.
    Ok(Type::Bool)
}

fn like_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Str, Type::Str])
}

// --- Substring(str, start, length) ---

fn substring_typer(args: &[Type]) -> Result<Type> {
    if let (Some(Data::Str(s)), Some(start), Some(len)) =
        (const_of(&args[0]), const_of(&args[1]), const_of(&args[2]))
    {
        let start = as_usize(start)?;
        let len = as_usize(len)?;
        let chars: Vec<char> = s.chars().collect();
        let begin = start.min(chars.len());
        let end = (begin + len).min(chars.len());
        return Ok(Type::Const(Data::Str(chars[begin..end].iter().collect())));
    }
    Ok(Type::Str)
}

fn as_usize(d: &Data) -> Result<usize> {
    match d {
        Data::Int(i) => i.to_string().parse::<usize>().map_err(|_| Error::Generic {
            message: format!("expected a non-negative integer, got {i}"),
        }),
        other => Err(Error::Generic {
            message: format!("expected an Int, got {other}"),
        }),
    }
}

fn substring_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Str, Type::Int, Type::Int])
}

// --- Lower / Upper ---

fn lower_typer(args: &[Type]) -> Result<Type> {
    match const_str(&args[0]) {
        Some(s) => Ok(Type::Const(Data::Str(s.to_lowercase()))),
        None => Ok(Type::Str),
    }
}

fn upper_typer(args: &[Type]) -> Result<Type> {
    match const_str(&args[0]) {
        Some(s) => Ok(Type::Const(Data::Str(s.to_uppercase()))),
        None => Ok(Type::Str),
    }
}

// --- Trim ---

fn trim_typer(args: &[Type]) -> Result<Type> {
    match const_str(&args[0]) {
        Some(s) => Ok(Type::Const(Data::Str(s.trim().to_string()))),
        None => Ok(Type::Str),
    }
}

// --- Length ---

fn length_typer(args: &[Type]) -> Result<Type> {
    match const_str(&args[0]) {
        Some(s) => Ok(Type::Const(Data::Int((s.chars().count() as i64).into()))),
        None => Ok(Type::Int),
    }
}

fn unary_str_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Str])
}

pub static CONCAT: Function = Function {
    name: "Concat",
    doc: "string concatenation",
    arity: Arity::Variadic { min: 2, max: None },
    domain: || vec![Type::Str, Type::Str],
    simplify: no_simplify,
    typer: concat_typer,
    untyper: concat_untyper,
};

pub static SEARCH: Function = Function {
    name: "Search",
    doc: "substring containment test",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Str, Type::Str],
    simplify: no_simplify,
    typer: search_typer,
    untyper: search_untyper,
};

pub static LIKE: Function = Function {
    name: "Like",
    doc: "SQL LIKE pattern match (`%` = any run, `_` = any one character)",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Str, Type::Str],
    simplify: no_simplify,
    typer: like_typer,
    untyper: like_untyper,
};

pub static SUBSTRING: Function = Function {
    name: "Substring",
    doc: "extracts a character range from a string",
    arity: Arity::Fixed(3),
    domain: || vec![Type::Str, Type::Int, Type::Int],
    simplify: no_simplify,
    typer: substring_typer,
    untyper: substring_untyper,
};

pub static LOWER: Function = Function {
    name: "Lower",
    doc: "lowercases a string",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Str],
    simplify: no_simplify,
    typer: lower_typer,
    untyper: unary_str_untyper,
};

pub static UPPER: Function = Function {
    name: "Upper",
    doc: "uppercases a string",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Str],
    simplify: no_simplify,
    typer: upper_typer,
    untyper: unary_str_untyper,
};

pub static TRIM: Function = Function {
    name: "Trim",
    doc: "strips leading and trailing whitespace",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Str],
    simplify: no_simplify,
    typer: trim_typer,
    untyper: unary_str_untyper,
};

pub static LENGTH: Function = Function {
    name: "Length",
    doc: "character count of a string",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Str],
    simplify: no_simplify,
    typer: length_typer,
    untyper: unary_str_untyper,
};

pub fn functions() -> Vec<&'static Function> {
    vec![
        &CONCAT, &SEARCH, &LIKE, &SUBSTRING, &LOWER, &UPPER, &TRIM, &LENGTH,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_folds_constant_operands() {
        let args = vec![
            Type::Const(Data::Str("foo".to_string())),
            Type::Const(Data::Str("bar".to_string())),
        ];
        assert_eq!(
            CONCAT.type_of(&args).unwrap(),
            Type::Const(Data::Str("foobar".to_string()))
        );
    }

    #[test]
    fn like_percent_matches_any_run() {
        let args = vec![
            Type::Const(Data::Str("hello world".to_string())),
            Type::Const(Data::Str("hello%".to_string())),
        ];
        assert_eq!(LIKE.type_of(&args).unwrap(), Type::Const(Data::Bool(true)));
    }

    #[test]
    fn like_underscore_matches_one_char() {
        let args = vec![
            Type::Const(Data::Str("cat".to_string())),
            Type::Const(Data::Str("c_t".to_string())),
        ];
        assert_eq!(LIKE.type_of(&args).unwrap(), Type::Const(Data::Bool(true)));
    }

    #[test]
    fn like_escapes_regex_metacharacters_in_pattern() {
        let args = vec![
            Type::Const(Data::Str("a.b".to_string())),
            Type::Const(Data::Str("a.b".to_string())),
        ];
        assert_eq!(LIKE.type_of(&args).unwrap(), Type::Const(Data::Bool(true)));
        let args = vec![
            Type::Const(Data::Str("axb".to_string())),
            Type::Const(Data::Str("a.b".to_string())),
        ];
        assert_eq!(LIKE.type_of(&args).unwrap(), Type::Const(Data::Bool(false)));
    }

    #[test]
    fn substring_extracts_character_range() {
        let args = vec![
            Type::Const(Data::Str("hello".to_string())),
            Type::Const(Data::Int(1.into())),
            Type::Const(Data::Int(3.into())),
        ];
        assert_eq!(
            SUBSTRING.type_of(&args).unwrap(),
            Type::Const(Data::Str("ell".to_string()))
        );
    }
}
