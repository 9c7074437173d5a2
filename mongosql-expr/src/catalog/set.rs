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

//! Array-valued set operators: `Filter`, `GroupBy`, `OrderBy`, `Distinct`,
//! `DistinctBy`, `Take`, `Drop`, `Squash`, `In`, `NotIn`.
//!
//! These mirror Mongo's array-expression operators (`$filter`, `$sortArray`,
//! `$setUnion`, `$slice`, `$reduce`) rather than the relational `Stage`
//! algebra, which lives one layer up in the workflow IR. A predicate or key
//! argument here is itself a `LogicalPlan` that references the element under
//! consideration through a bound `Free` name resolved by the compiler before
//! this function's typer ever runs; by the time `type_of` sees it, it is
//! already reduced to a plain result type (e.g. `Bool` for `Filter`'s second
//! argument).

use mongosql_common::{Data, DataOrd, Error, Result, Type};

use super::{Arity, Function};
use crate::logical_plan::LogicalPlan;

fn const_of(t: &Type) -> Option<&Data> {
    match t {
        Type::Const(d) => Some(d),
        _ => None,
    }
}

fn elem_type(t: &Type) -> Result<Type> {
    match t.underlying() {
        Type::Arr(e) => Ok(e.as_ref().clone()),
        other => Err(Error::Type {
            expected: Type::Arr(Box::new(Type::Top)),
            observed: other,
            hint: Some("expected an array operand".to_string()),
        }),
    }
}

fn const_items(t: &Type) -> Option<&Vec<Data>> {
    match const_of(t)? {
        Data::Arr(items) => Some(items),
        _ => None,
    }
}

fn no_simplify(_args: &[LogicalPlan]) -> Option<LogicalPlan> {
    None
}

// --- Filter(array, cond_result) ---

fn filter_typer(args: &[Type]) -> Result<Type> {
    let elem = elem_type(&args[0])?;
    Ok(Type::Arr(Box::new(elem)))
}

fn filter_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Arr(Box::new(Type::Top)), Type::Bool])
}

// --- OrderBy(array, keys, tokens) : result is the input array, re-sorted by
// one or more per-element keys, each paired with an "ASC"/"DESC" token
// (spec §4.D step 7); the type is unaffected by sort order. `keys` and
// `tokens` are themselves opaque `MakeArrayN` results, not array *types*
// the typer needs to look inside. ---

fn order_by_typer(args: &[Type]) -> Result<Type> {
    let elem = elem_type(&args[0])?;
    Ok(Type::Arr(Box::new(elem)))
}

fn order_by_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Arr(Box::new(Type::Top)), Type::Top, Type::Top])
}

// --- Distinct(array) ---

fn distinct_typer(args: &[Type]) -> Result<Type> {
    if let Some(items) = const_items(&args[0]) {
        let mut seen: Vec<DataOrd> = Vec::new();
        let mut out = Vec::new();
        for item in items {
            let wrapped = DataOrd(item.clone());
            if !seen.contains(&wrapped) {
                seen.push(wrapped);
                out.push(item.clone());
            }
        }
        return Ok(Type::Const(Data::Arr(out)));
    }
    let elem = elem_type(&args[0])?;
    Ok(Type::Arr(Box::new(elem)))
}

fn distinct_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Arr(Box::new(Type::Top))])
}

// --- DistinctBy(array, key_result) ---

fn distinct_by_typer(args: &[Type]) -> Result<Type> {
    let elem = elem_type(&args[0])?;
    Ok(Type::Arr(Box::new(elem)))
}

fn distinct_by_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Arr(Box::new(Type::Top)), Type::Top])
}

// --- Take(array, n) / Drop(array, n) ---

fn as_usize(d: &Data) -> Option<usize> {
    match d {
        Data::Int(i) => i.to_string().parse::<usize>().ok(),
        _ => None,
    }
}

fn take_typer(args: &[Type]) -> Result<Type> {
    if let (Some(items), Some(n)) = (const_items(&args[0]), const_of(&args[1]).and_then(as_usize)) {
        return Ok(Type::Const(Data::Arr(items[..n.min(items.len())].to_vec())));
    }
    let elem = elem_type(&args[0])?;
    Ok(Type::Arr(Box::new(elem)))
}

fn drop_typer(args: &[Type]) -> Result<Type> {
    if let (Some(items), Some(n)) = (const_items(&args[0]), const_of(&args[1]).and_then(as_usize)) {
        return Ok(Type::Const(Data::Arr(items[n.min(items.len())..].to_vec())));
    }
    let elem = elem_type(&args[0])?;
    Ok(Type::Arr(Box::new(elem)))
}

fn take_drop_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Arr(Box::new(Type::Top)), Type::Int])
}

// --- GroupBy(array, key_result) : groups elements sharing an (opaque,
// externally-computed) key into `{key, group}` rows. ---

fn group_by_typer(args: &[Type]) -> Result<Type> {
    let elem = elem_type(&args[0])?;
    let key_type = args[1].clone();
    Ok(Type::Arr(Box::new(Type::obj(vec![
        ("key".to_string(), key_type),
        ("group".to_string(), Type::Arr(Box::new(elem))),
    ]))))
}

fn group_by_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Arr(Box::new(Type::Top)), Type::Top])
}

// --- In / NotIn ---

fn in_typer(args: &[Type]) -> Result<Type> {
    if let (Some(value), Some(items)) = (const_of(&args[0]), const_items(&args[1])) {
        return Ok(Type::Const(Data::Bool(items.contains(value))));
    }
    Ok(Type::Bool)
}

fn not_in_typer(args: &[Type]) -> Result<Type> {
    if let (Some(value), Some(items)) = (const_of(&args[0]), const_items(&args[1])) {
        return Ok(Type::Const(Data::Bool(!items.contains(value))));
    }
    Ok(Type::Bool)
}

fn in_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Top, Type::Arr(Box::new(Type::Top))])
}

pub static FILTER: Function = Function {
    name: "Filter",
    doc: "keeps array elements for which the predicate holds",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Arr(Box::new(Type::Top)), Type::Bool],
    simplify: no_simplify,
    typer: filter_typer,
    untyper: filter_untyper,
};

pub static ORDER_BY: Function = Function {
    name: "OrderBy",
    doc: "re-sorts an array by one or more per-element keys and ASC/DESC tokens",
    arity: Arity::Fixed(3),
    domain: || vec![Type::Arr(Box::new(Type::Top)), Type::Top, Type::Top],
    simplify: no_simplify,
    typer: order_by_typer,
    untyper: order_by_untyper,
};

pub static DISTINCT: Function = Function {
    name: "Distinct",
    doc: "removes duplicate elements, keeping first occurrence order",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Arr(Box::new(Type::Top))],
    simplify: no_simplify,
    typer: distinct_typer,
    untyper: distinct_untyper,
};

pub static DISTINCT_BY: Function = Function {
    name: "DistinctBy",
    doc: "removes elements whose key duplicates an earlier element's key",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Arr(Box::new(Type::Top)), Type::Top],
    simplify: no_simplify,
    typer: distinct_by_typer,
    untyper: distinct_by_untyper,
};

pub static TAKE: Function = Function {
    name: "Take",
    doc: "keeps at most the first n elements",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Arr(Box::new(Type::Top)), Type::Int],
    simplify: no_simplify,
    typer: take_typer,
    untyper: take_drop_untyper,
};

pub static DROP: Function = Function {
    name: "Drop",
    doc: "discards the first n elements",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Arr(Box::new(Type::Top)), Type::Int],
    simplify: no_simplify,
    typer: drop_typer,
    untyper: take_drop_untyper,
};

pub static GROUP_BY: Function = Function {
    name: "GroupBy",
    doc: "partitions array elements into {key, group} rows by a per-element key",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Arr(Box::new(Type::Top)), Type::Top],
    simplify: no_simplify,
    typer: group_by_typer,
    untyper: group_by_untyper,
};

pub static IN: Function = Function {
    name: "In",
    doc: "array membership test",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Top, Type::Arr(Box::new(Type::Top))],
    simplify: no_simplify,
    typer: in_typer,
    untyper: in_untyper,
};

pub static NOT_IN: Function = Function {
    name: "NotIn",
    doc: "negated array membership test",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Top, Type::Arr(Box::new(Type::Top))],
    simplify: no_simplify,
    typer: not_in_typer,
    untyper: in_untyper,
};

pub fn functions() -> Vec<&'static Function> {
    vec![
        &FILTER,
        &ORDER_BY,
        &DISTINCT,
        &DISTINCT_BY,
        &TAKE,
        &DROP,
        &GROUP_BY,
        &IN,
        &NOT_IN,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_drops_duplicate_constant_elements() {
        let arr = Type::Const(Data::Arr(vec![
            Data::Int(1.into()),
            Data::Int(1.into()),
            Data::Int(2.into()),
        ]));
        assert_eq!(
            DISTINCT.type_of(&[arr]).unwrap(),
            Type::Const(Data::Arr(vec![Data::Int(1.into()), Data::Int(2.into())]))
        );
    }

    #[test]
    fn take_truncates_constant_array() {
        let arr = Type::Const(Data::Arr(vec![
            Data::Int(1.into()),
            Data::Int(2.into()),
            Data::Int(3.into()),
        ]));
        let args = vec![arr, Type::Const(Data::Int(2.into()))];
        assert_eq!(
            TAKE.type_of(&args).unwrap(),
            Type::Const(Data::Arr(vec![Data::Int(1.into()), Data::Int(2.into())]))
        );
    }

    #[test]
    fn in_tests_membership_of_constant_array() {
        let value = Type::Const(Data::Int(2.into()));
        let arr = Type::Const(Data::Arr(vec![Data::Int(1.into()), Data::Int(2.into())]));
        assert_eq!(IN.type_of(&[value, arr]).unwrap(), Type::Const(Data::Bool(true)));
    }

    #[test]
    fn filter_rejects_non_array_operand() {
        assert!(FILTER.type_of(&[Type::Int, Type::Bool]).is_err());
    }
}
