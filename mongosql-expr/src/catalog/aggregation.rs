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

//! Aggregate accumulators: `Arbitrary`, `Sum`, `Avg`, `Count`.
//!
//! Unlike the `set` family's array combinators, these take the *per-row*
//! scalar expression a grouped SELECT item projects (e.g. `Count(Constant(1))`,
//! `Arbitrary(ObjectProject(root, "a"))`, spec §8 S2): the surrounding
//! `GroupBy`/`groupedSrc` binding the compiler threads through (spec §4.D)
//! supplies the implicit per-group row iteration. Turning one of these nodes
//! into a concrete per-group fold (summing, picking one element, ...) is the
//! external planner's job when it lowers a `LogicalPlan` into a `Workflow`
//! accumulator (spec §2's "[planner; external]" step) — the typer here only
//! has a single row's type to reason about, so it mostly passes types
//! through rather than folding a materialized collection.

use mongosql_common::{Data, Error, Result, Type};

use super::{Arity, Function};
use crate::logical_plan::LogicalPlan;

fn no_simplify(_args: &[LogicalPlan]) -> Option<LogicalPlan> {
    None
}

fn require_numeric(t: &Type, fn_name: &str) -> Result<()> {
    let underlying = t.underlying();
    if underlying.is_numeric() || underlying == Type::Top || underlying == Type::Bottom {
        Ok(())
    } else {
        Err(Error::Type {
            expected: Type::Dec,
            observed: t.clone(),
            hint: Some(format!("{fn_name} requires a numeric operand")),
        })
    }
}

// --- Arbitrary: picks any one row's value for this column (the choice is
// made by the planner; every row in a group is assumed to agree when the
// column was itself a GROUP BY key, per the compiler's grouped-reference
// rewrite). The type of "some row's value" is just the expression's own
// type, constant or not. ---

fn arbitrary_typer(args: &[Type]) -> Result<Type> {
    Ok(args[0].clone())
}

fn arbitrary_untyper(expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![expected.clone()])
}

// --- Sum ---

fn sum_typer(args: &[Type]) -> Result<Type> {
    require_numeric(&args[0], "Sum")?;
    match args[0].underlying() {
        Type::Dec => Ok(Type::Dec),
        Type::Int => Ok(Type::Int),
        _ => Ok(Type::Dec),
    }
}

fn sum_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Dec])
}

// --- Avg: always at least as wide as Dec, since dividing by a group's
// count can produce a fraction even when every summand is an Int. ---

fn avg_typer(args: &[Type]) -> Result<Type> {
    require_numeric(&args[0], "Avg")?;
    Ok(Type::Dec)
}

fn avg_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Dec])
}

// --- Count: the number of rows in the group; the per-row expression's own
// value is irrelevant (`Count(Constant(Int(1)))` is `COUNT(*)`'s lowering,
// spec §8 S2), so any operand type is accepted. ---

fn count_typer(_args: &[Type]) -> Result<Type> {
    Ok(Type::Int)
}

fn count_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Top])
}

pub static ARBITRARY: Function = Function {
    name: "Arbitrary",
    doc: "picks one representative row's value from a group",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Top],
    simplify: no_simplify,
    typer: arbitrary_typer,
    untyper: arbitrary_untyper,
};

pub static SUM: Function = Function {
    name: "Sum",
    doc: "sums a group's per-row numeric values",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Dec],
    simplify: no_simplify,
    typer: sum_typer,
    untyper: sum_untyper,
};

pub static AVG: Function = Function {
    name: "Avg",
    doc: "averages a group's per-row numeric values",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Dec],
    simplify: no_simplify,
    typer: avg_typer,
    untyper: avg_untyper,
};

pub static COUNT: Function = Function {
    name: "Count",
    doc: "counts a group's rows",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Top],
    simplify: no_simplify,
    typer: count_typer,
    untyper: count_untyper,
};

pub fn functions() -> Vec<&'static Function> {
    vec![&ARBITRARY, &SUM, &AVG, &COUNT]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arbitrary_passes_through_the_expression_type() {
        let t = Type::Const(Data::Int(5.into()));
        assert_eq!(ARBITRARY.type_of(&[t.clone()]).unwrap(), t);
    }

    #[test]
    fn sum_of_int_column_stays_int() {
        assert_eq!(SUM.type_of(&[Type::Int]).unwrap(), Type::Int);
    }

    #[test]
    fn sum_of_dec_column_stays_dec() {
        assert_eq!(SUM.type_of(&[Type::Dec]).unwrap(), Type::Dec);
    }

    #[test]
    fn avg_always_widens_to_dec() {
        assert_eq!(AVG.type_of(&[Type::Int]).unwrap(), Type::Dec);
    }

    #[test]
    fn count_of_any_expression_is_int() {
        assert_eq!(COUNT.type_of(&[Type::Const(Data::Int(1.into()))]).unwrap(), Type::Int);
    }

    #[test]
    fn sum_rejects_non_numeric_operand() {
        assert!(SUM.type_of(&[Type::Str]).is_err());
    }
}
