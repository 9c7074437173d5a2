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

//! Boolean operators: `And`, `Or`, `Not`, `Cond`, `Coalesce`, `IsNull`,
//! `Constantly`.

use mongosql_common::{Data, Result, Type};

use super::{Arity, Function};
use crate::logical_plan::LogicalPlan;

fn is_true(p: &LogicalPlan) -> bool {
    matches!(p, LogicalPlan::Constant(Data::Bool(true)))
}
fn is_false(p: &LogicalPlan) -> bool {
    matches!(p, LogicalPlan::Constant(Data::Bool(false)))
}
fn is_null(p: &LogicalPlan) -> bool {
    matches!(p, LogicalPlan::Constant(Data::Null))
}

fn const_bool(t: &Type) -> Option<bool> {
    match t {
        Type::Const(Data::Bool(b)) => Some(*b),
        _ => None,
    }
}

// --- And ---

fn and_simplify(args: &[LogicalPlan]) -> Option<LogicalPlan> {
    // AND(True, x) = x
    if is_true(&args[0]) {
        return Some(args[1].clone());
    }
    if is_true(&args[1]) {
        return Some(args[0].clone());
    }
    if is_false(&args[0]) || is_false(&args[1]) {
        return Some(LogicalPlan::Constant(Data::Bool(false)));
    }
    None
}

fn and_typer(args: &[Type]) -> Result<Type> {
    match (const_bool(&args[0]), const_bool(&args[1])) {
        (Some(a), Some(b)) => Ok(Type::Const(Data::Bool(a && b))),
        (Some(false), _) | (_, Some(false)) => Ok(Type::Const(Data::Bool(false))),
        _ => Ok(Type::Bool),
    }
}

// --- Or ---

fn or_simplify(args: &[LogicalPlan]) -> Option<LogicalPlan> {
    // OR(False, x) = x
    if is_false(&args[0]) {
        return Some(args[1].clone());
    }
    if is_false(&args[1]) {
        return Some(args[0].clone());
    }
    if is_true(&args[0]) || is_true(&args[1]) {
        return Some(LogicalPlan::Constant(Data::Bool(true)));
    }
    None
}

fn or_typer(args: &[Type]) -> Result<Type> {
    match (const_bool(&args[0]), const_bool(&args[1])) {
        (Some(a), Some(b)) => Ok(Type::Const(Data::Bool(a || b))),
        (Some(true), _) | (_, Some(true)) => Ok(Type::Const(Data::Bool(true))),
        _ => Ok(Type::Bool),
    }
}

// --- Not ---

fn not_simplify(args: &[LogicalPlan]) -> Option<LogicalPlan> {
    if let LogicalPlan::Invoke { function, args: inner } = &args[0] {
        if function.name == "Not" {
            return Some(inner[0].clone());
        }
    }
    None
}

fn not_typer(args: &[Type]) -> Result<Type> {
    match const_bool(&args[0]) {
        Some(b) => Ok(Type::Const(Data::Bool(!b))),
        None => Ok(Type::Bool),
    }
}

// --- Cond ---

fn cond_simplify(args: &[LogicalPlan]) -> Option<LogicalPlan> {
    // COND(True, a, _) = a ; COND(False, _, b) = b
    if is_true(&args[0]) {
        return Some(args[1].clone());
    }
    if is_false(&args[0]) {
        return Some(args[2].clone());
    }
    None
}

fn cond_typer(args: &[Type]) -> Result<Type> {
    match const_bool(&args[0]) {
        Some(true) => Ok(args[1].clone()),
        Some(false) => Ok(args[2].clone()),
        None => Ok(mongosql_common::lub(&args[1], &args[2])),
    }
}

// --- Coalesce ---

fn coalesce_simplify(args: &[LogicalPlan]) -> Option<LogicalPlan> {
    // COALESCE(Null, y) = y ; COALESCE(x, Null) = x
    if is_null(&args[0]) {
        return Some(args[1].clone());
    }
    if is_null(&args[1]) {
        return Some(args[0].clone());
    }
    None
}

fn coalesce_typer(args: &[Type]) -> Result<Type> {
    if args[0] == Type::Bottom {
        return Ok(args[1].clone());
    }
    if args[1] == Type::Bottom {
        return Ok(args[0].clone());
    }
    Ok(mongosql_common::lub(&args[0], &args[1]))
}

// --- IsNull ---

fn is_null_simplify(_args: &[LogicalPlan]) -> Option<LogicalPlan> {
    None
}

fn is_null_typer(args: &[Type]) -> Result<Type> {
    Ok(Type::Const(Data::Bool(args[0] == Type::Bottom)))
}

// --- Constantly ---
// Constantly(const, table) projects `const` once per row of `table`,
// used by the compiler to make constant SELECT items survive downstream
// set operations (spec §4.D step 5).

fn constantly_simplify(_args: &[LogicalPlan]) -> Option<LogicalPlan> {
    None
}

fn constantly_typer(args: &[Type]) -> Result<Type> {
    Ok(args[0].clone())
}

fn no_untype(expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![expected.clone(), expected.clone()])
}

fn unary_untype(expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![expected.clone()])
}

fn cond_untype(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Bool, Type::Top, Type::Top])
}

pub static AND: Function = Function {
    name: "And",
    doc: "logical conjunction",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Bool, Type::Bool],
    simplify: and_simplify,
    typer: and_typer,
    untyper: no_untype,
};

pub static OR: Function = Function {
    name: "Or",
    doc: "logical disjunction",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Bool, Type::Bool],
    simplify: or_simplify,
    typer: or_typer,
    untyper: no_untype,
};

pub static NOT: Function = Function {
    name: "Not",
    doc: "logical negation",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Bool],
    simplify: not_simplify,
    typer: not_typer,
    untyper: unary_untype,
};

pub static COND: Function = Function {
    name: "Cond",
    doc: "if/then/else",
    arity: Arity::Fixed(3),
    domain: || vec![Type::Bool, Type::Top, Type::Top],
    simplify: cond_simplify,
    typer: cond_typer,
    untyper: cond_untype,
};

pub static COALESCE: Function = Function {
    name: "Coalesce",
    doc: "first non-null argument",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Top, Type::Top],
    simplify: coalesce_simplify,
    typer: coalesce_typer,
    untyper: no_untype,
};

pub static IS_NULL: Function = Function {
    name: "IsNull",
    doc: "null test",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Top],
    simplify: is_null_simplify,
    typer: is_null_typer,
    untyper: unary_untype,
};

pub static CONSTANTLY: Function = Function {
    name: "Constantly",
    doc: "broadcasts a constant once per row of a table",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Top, Type::Top],
    simplify: constantly_simplify,
    typer: constantly_typer,
    untyper: no_untype,
};

pub fn functions() -> Vec<&'static Function> {
    vec![&AND, &OR, &NOT, &COND, &COALESCE, &IS_NULL, &CONSTANTLY]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_true_simplifies_to_other_operand() {
        let x = LogicalPlan::Free("x".to_string());
        let args = vec![LogicalPlan::Constant(Data::Bool(true)), x.clone()];
        assert_eq!(and_simplify(&args), Some(x));
    }

    #[test]
    fn or_false_simplifies_to_other_operand() {
        let x = LogicalPlan::Free("x".to_string());
        let args = vec![LogicalPlan::Constant(Data::Bool(false)), x.clone()];
        assert_eq!(or_simplify(&args), Some(x));
    }

    #[test]
    fn cond_on_constant_guard_picks_branch() {
        let a = LogicalPlan::Free("a".to_string());
        let b = LogicalPlan::Free("b".to_string());
        let true_args = vec![LogicalPlan::Constant(Data::Bool(true)), a.clone(), b.clone()];
        assert_eq!(cond_simplify(&true_args), Some(a));
        let false_args = vec![LogicalPlan::Constant(Data::Bool(false)), a, b.clone()];
        assert_eq!(cond_simplify(&false_args), Some(b));
    }

    #[test]
    fn coalesce_drops_null_operand() {
        let y = LogicalPlan::Free("y".to_string());
        let args = vec![LogicalPlan::Constant(Data::Null), y.clone()];
        assert_eq!(coalesce_simplify(&args), Some(y));
    }
}
