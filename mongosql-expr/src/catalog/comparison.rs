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

//! Relational comparison operators: `Eq`, `Neq`, `Lt`, `Lte`, `Gt`, `Gte`,
//! `Between`.

use std::cmp::Ordering;

use mongosql_common::{Data, Result, Type};

use super::{untyper_from_domain, Arity, Function};
use crate::logical_plan::LogicalPlan;

fn const_of(t: &Type) -> Option<&Data> {
    match t {
        Type::Const(d) => Some(d),
        _ => None,
    }
}

fn binary_domain() -> Vec<Type> {
    vec![Type::Top, Type::Top]
}

fn comparison_typer(op: fn(Ordering) -> bool, args: &[Type]) -> Result<Type> {
    if let (Some(a), Some(b)) = (const_of(&args[0]), const_of(&args[1])) {
        if let Some(ord) = a.partial_cmp(b) {
            return Ok(Type::Const(Data::Bool(op(ord))));
        }
    }
    Ok(Type::Bool)
}

fn eq_typer(args: &[Type]) -> Result<Type> {
    if let (Some(a), Some(b)) = (const_of(&args[0]), const_of(&args[1])) {
        return Ok(Type::Const(Data::Bool(a == b)));
    }
    Ok(Type::Bool)
}

fn neq_typer(args: &[Type]) -> Result<Type> {
    if let (Some(a), Some(b)) = (const_of(&args[0]), const_of(&args[1])) {
        return Ok(Type::Const(Data::Bool(a != b)));
    }
    Ok(Type::Bool)
}

fn lt_typer(args: &[Type]) -> Result<Type> {
    comparison_typer(|o| o == Ordering::Less, args)
}
fn lte_typer(args: &[Type]) -> Result<Type> {
    comparison_typer(|o| o != Ordering::Greater, args)
}
fn gt_typer(args: &[Type]) -> Result<Type> {
    comparison_typer(|o| o == Ordering::Greater, args)
}
fn gte_typer(args: &[Type]) -> Result<Type> {
    comparison_typer(|o| o != Ordering::Less, args)
}

fn between_typer(args: &[Type]) -> Result<Type> {
    if let (Some(v), Some(lo), Some(hi)) =
        (const_of(&args[0]), const_of(&args[1]), const_of(&args[2]))
    {
        if let (Some(lo_ord), Some(hi_ord)) = (v.partial_cmp(lo), v.partial_cmp(hi)) {
            return Ok(Type::Const(Data::Bool(
                lo_ord != Ordering::Less && hi_ord != Ordering::Greater,
            )));
        }
    }
    Ok(Type::Bool)
}

fn no_simplify(_args: &[LogicalPlan]) -> Option<LogicalPlan> {
    None
}

fn bool_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(untyper_from_domain(binary_domain))
}

fn between_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Top, Type::Top, Type::Top])
}

pub static EQ: Function = Function {
    name: "Eq",
    doc: "equality comparison",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: no_simplify,
    typer: eq_typer,
    untyper: bool_untyper,
};

pub static NEQ: Function = Function {
    name: "Neq",
    doc: "inequality comparison",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: no_simplify,
    typer: neq_typer,
    untyper: bool_untyper,
};

pub static LT: Function = Function {
    name: "Lt",
    doc: "less-than comparison",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: no_simplify,
    typer: lt_typer,
    untyper: bool_untyper,
};

pub static LTE: Function = Function {
    name: "Lte",
    doc: "less-than-or-equal comparison",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: no_simplify,
    typer: lte_typer,
    untyper: bool_untyper,
};

pub static GT: Function = Function {
    name: "Gt",
    doc: "greater-than comparison",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: no_simplify,
    typer: gt_typer,
    untyper: bool_untyper,
};

pub static GTE: Function = Function {
    name: "Gte",
    doc: "greater-than-or-equal comparison",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: no_simplify,
    typer: gte_typer,
    untyper: bool_untyper,
};

pub static BETWEEN: Function = Function {
    name: "Between",
    doc: "inclusive range membership",
    arity: Arity::Fixed(3),
    domain: || vec![Type::Top, Type::Top, Type::Top],
    simplify: no_simplify,
    typer: between_typer,
    untyper: between_untyper,
};

pub fn functions() -> Vec<&'static Function> {
    vec![&EQ, &NEQ, &LT, &LTE, &GT, &GTE, &BETWEEN]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_reduces_equal_constants() {
        let args = vec![
            Type::Const(Data::Int(1.into())),
            Type::Const(Data::Int(1.into())),
        ];
        assert_eq!(EQ.type_of(&args).unwrap(), Type::Const(Data::Bool(true)));
    }

    #[test]
    fn lt_reduces_across_int_and_dec() {
        let args = vec![
            Type::Const(Data::Int(1.into())),
            Type::Const(Data::Dec("2.5".parse().unwrap())),
        ];
        assert_eq!(LT.type_of(&args).unwrap(), Type::Const(Data::Bool(true)));
    }

    #[test]
    fn comparison_with_non_const_widens_to_bool() {
        let args = vec![Type::Int, Type::Int];
        assert_eq!(EQ.type_of(&args).unwrap(), Type::Bool);
    }
}
