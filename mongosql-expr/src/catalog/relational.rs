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

//! `Join`: the one relational (as opposed to structural-value or
//! array-element) operator in the catalog, needed because FROM/JOIN
//! lowering (spec §4.D step 1) produces `Invoke(Join, [left, right, clause,
//! kind])` directly rather than routing through `ObjectConcat` — the join
//! kind decides which side's fields become nullable in the merged shape, a
//! decision `ObjectConcat` has no opinion on.
//!
//! The join kind travels as a fourth argument rather than as part of the
//! function identity, a constant string token (`"Inner"`, `"LeftOuter"`,
//! `"RightOuter"`, `"FullOuter"`) in the same style `OrderBy`'s `"ASC"`/
//! `"DESC"` tokens use (spec §4.D step 7) — one catalog entry, not four.

use mongosql_common::{Data, Error, Result, Type};

use super::structural::merge_objs;
use super::{Arity, Function};
use crate::logical_plan::LogicalPlan;

fn const_str(t: &Type) -> Option<&str> {
    match t {
        Type::Const(Data::Str(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn no_simplify(_args: &[LogicalPlan]) -> Option<LogicalPlan> {
    None
}

fn nullable(t: Type) -> Type {
    match &t {
        Type::Union(opts) if opts.contains(&Type::Bottom) => t,
        _ => Type::Union(vec![t, Type::Bottom]),
    }
}

fn join_typer(args: &[Type]) -> Result<Type> {
    let kind = const_str(&args[3]).ok_or_else(|| Error::ExpectedLiteral {
        context: "Join kind".to_string(),
    })?;
    let (left, right) = match kind {
        "Inner" => (args[0].clone(), args[1].clone()),
        "LeftOuter" => (args[0].clone(), nullable(args[1].clone())),
        "RightOuter" => (nullable(args[0].clone()), args[1].clone()),
        "FullOuter" => (nullable(args[0].clone()), nullable(args[1].clone())),
        other => {
            return Err(Error::Generic {
                message: format!("unknown join kind {other:?}"),
            })
        }
    };
    let mut fields = Vec::new();
    let mut rest = None;
    merge_objs(&mut fields, &mut rest, &left.underlying());
    merge_objs(&mut fields, &mut rest, &right.underlying());
    Ok(match rest {
        Some(r) => Type::obj_with_rest(fields, r),
        None => Type::obj(fields),
    })
}

fn join_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Top, Type::Top, Type::Bool, Type::Str])
}

pub static JOIN: Function = Function {
    name: "Join",
    doc: "combines two relations under a join clause and kind (Inner/LeftOuter/RightOuter/FullOuter)",
    arity: Arity::Fixed(4),
    domain: || vec![Type::Top, Type::Top, Type::Bool, Type::Str],
    simplify: no_simplify,
    typer: join_typer,
    untyper: join_untyper,
};

pub fn functions() -> Vec<&'static Function> {
    vec![&JOIN]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(fields: Vec<(&str, Type)>) -> Type {
        Type::obj(fields.into_iter().map(|(k, t)| (k.to_string(), t)))
    }

    #[test]
    fn inner_join_merges_both_sides_plainly() {
        let left = obj(vec![("a", Type::Int)]);
        let right = obj(vec![("b", Type::Str)]);
        let args = vec![left, right, Type::Bool, Type::Const(Data::Str("Inner".to_string()))];
        let result = JOIN.type_of(&args).unwrap();
        match result {
            Type::Obj { fields, .. } => {
                assert_eq!(fields.get("a"), Some(&Type::Int));
                assert_eq!(fields.get("b"), Some(&Type::Str));
            }
            _ => panic!("expected an object type"),
        }
    }

    #[test]
    fn left_outer_join_makes_right_side_nullable() {
        let left = obj(vec![("a", Type::Int)]);
        let right = obj(vec![("b", Type::Str)]);
        let args = vec![
            left,
            right,
            Type::Bool,
            Type::Const(Data::Str("LeftOuter".to_string())),
        ];
        let result = JOIN.type_of(&args).unwrap();
        match result {
            Type::Obj { fields, .. } => {
                assert_eq!(fields.get("a"), Some(&Type::Int));
                assert_eq!(fields.get("b"), Some(&Type::Union(vec![Type::Str, Type::Bottom])));
            }
            _ => panic!("expected an object type"),
        }
    }

    #[test]
    fn unknown_join_kind_is_rejected() {
        let args = vec![
            Type::Top,
            Type::Top,
            Type::Bool,
            Type::Const(Data::Str("Cross".to_string())),
        ];
        assert!(JOIN.type_of(&args).is_err());
    }
}
