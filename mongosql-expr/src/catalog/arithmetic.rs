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

//! Arithmetic operators: `Add`, `Subtract`, `Multiply`, `Divide`, `Modulo`,
//! `Negate`. Numeric operands promote `Int` to `Dec` whenever the other side
//! is `Dec`, matching [`mongosql_common::Data::partial_cmp`]'s promotion rule.
//! A constant zero divisor/modulus is rejected at type-check time rather than
//! deferred to evaluation, since the typer already has the constant in hand.

use chrono::Duration;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;

use mongosql_common::{Data, Error, Interval, Result, Type};

use super::{Arity, Function};
use crate::logical_plan::LogicalPlan;

fn const_of(t: &Type) -> Option<&Data> {
    match t {
        Type::Const(d) => Some(d),
        _ => None,
    }
}

fn to_dec(i: &BigInt) -> Option<Decimal> {
    i.to_i64().map(Decimal::from)
}

fn type_err(args: &[Type]) -> Error {
    Error::Generic {
        message: format!("arithmetic operator not defined for operand types {args:?}"),
    }
}

fn add_data(a: &Data, b: &Data) -> Option<Data> {
    match (a, b) {
        (Data::Int(a), Data::Int(b)) => Some(Data::Int(a + b)),
        (Data::Dec(a), Data::Dec(b)) => Some(Data::Dec(a + b)),
        (Data::Int(a), Data::Dec(b)) => Some(Data::Dec(to_dec(a)? + b)),
        (Data::Dec(a), Data::Int(b)) => Some(Data::Dec(a + to_dec(b)?)),
        (Data::Timestamp(t), Data::Interval(i)) | (Data::Interval(i), Data::Timestamp(t)) => {
            Some(Data::Timestamp(*t + Duration::milliseconds(i.millis)))
        }
        (Data::Interval(a), Data::Interval(b)) => {
            Some(Data::Interval(Interval::from_millis(a.millis + b.millis)))
        }
        _ => None,
    }
}

fn subtract_data(a: &Data, b: &Data) -> Option<Data> {
    match (a, b) {
        (Data::Int(a), Data::Int(b)) => Some(Data::Int(a - b)),
        (Data::Dec(a), Data::Dec(b)) => Some(Data::Dec(a - b)),
        (Data::Int(a), Data::Dec(b)) => Some(Data::Dec(to_dec(a)? - b)),
        (Data::Dec(a), Data::Int(b)) => Some(Data::Dec(a - to_dec(b)?)),
        (Data::Timestamp(t), Data::Interval(i)) => {
            Some(Data::Timestamp(*t - Duration::milliseconds(i.millis)))
        }
        (Data::Timestamp(a), Data::Timestamp(b)) => {
            Some(Data::Interval(Interval::from_millis((*a - *b).num_milliseconds())))
        }
        (Data::Interval(a), Data::Interval(b)) => {
            Some(Data::Interval(Interval::from_millis(a.millis - b.millis)))
        }
        _ => None,
    }
}

fn multiply_data(a: &Data, b: &Data) -> Option<Data> {
    match (a, b) {
        (Data::Int(a), Data::Int(b)) => Some(Data::Int(a * b)),
        (Data::Dec(a), Data::Dec(b)) => Some(Data::Dec(a * b)),
        (Data::Int(a), Data::Dec(b)) => Some(Data::Dec(to_dec(a)? * b)),
        (Data::Dec(a), Data::Int(b)) => Some(Data::Dec(a * to_dec(b)?)),
        (Data::Interval(i), Data::Int(n)) | (Data::Int(n), Data::Interval(i)) => {
            Some(Data::Interval(Interval::from_millis(i.millis * n.to_i64()?)))
        }
        _ => None,
    }
}

fn is_zero(d: &Data) -> bool {
    match d {
        Data::Int(i) => i.is_zero(),
        Data::Dec(d) => d.is_zero(),
        _ => false,
    }
}

fn divide_data(a: &Data, b: &Data) -> Option<Result<Data>> {
    if is_zero(b) {
        return Some(Err(Error::Generic {
            message: "division by zero".to_string(),
        }));
    }
    let result = match (a, b) {
        (Data::Int(a), Data::Int(b)) => Some(Data::Dec(to_dec(a)? / to_dec(b)?)),
        (Data::Dec(a), Data::Dec(b)) => Some(Data::Dec(a / b)),
        (Data::Int(a), Data::Dec(b)) => Some(Data::Dec(to_dec(a)? / b)),
        (Data::Dec(a), Data::Int(b)) => Some(Data::Dec(a / to_dec(b)?)),
        (Data::Interval(i), Data::Int(n)) => {
            Some(Data::Interval(Interval::from_millis(i.millis / n.to_i64()?)))
        }
        _ => None,
    };
    result.map(Ok)
}

fn modulo_data(a: &Data, b: &Data) -> Option<Result<Data>> {
    if is_zero(b) {
        return Some(Err(Error::Generic {
            message: "modulo by zero".to_string(),
        }));
    }
    let result = match (a, b) {
        (Data::Int(a), Data::Int(b)) => Some(Data::Int(a % b)),
        (Data::Dec(a), Data::Dec(b)) => Some(Data::Dec(a % b)),
        (Data::Int(a), Data::Dec(b)) => Some(Data::Dec(to_dec(a)? % b)),
        (Data::Dec(a), Data::Int(b)) => Some(Data::Dec(a % to_dec(b)?)),
        _ => None,
    };
    result.map(Ok)
}

fn negate_data(a: &Data) -> Option<Data> {
    match a {
        Data::Int(a) => Some(Data::Int(-a)),
        Data::Dec(a) => Some(Data::Dec(-a)),
        Data::Interval(i) => Some(Data::Interval(Interval::from_millis(-i.millis))),
        _ => None,
    }
}

fn numeric_result_type(a: &Type, b: &Type) -> Type {
    match (a.underlying(), b.underlying()) {
        (Type::Int, Type::Int) => Type::Int,
        (Type::Timestamp, Type::Interval) | (Type::Interval, Type::Timestamp) => Type::Timestamp,
        (Type::Interval, Type::Interval) => Type::Interval,
        (Type::Interval, Type::Int) | (Type::Int, Type::Interval) => Type::Interval,
        _ => Type::Dec,
    }
}

fn binary_domain() -> Vec<Type> {
    vec![Type::Top, Type::Top]
}

fn add_simplify(args: &[LogicalPlan]) -> Option<LogicalPlan> {
    // x + 0 = x
    if matches!(&args[1], LogicalPlan::Constant(d) if is_zero(d)) {
        return Some(args[0].clone());
    }
    if matches!(&args[0], LogicalPlan::Constant(d) if is_zero(d)) {
        return Some(args[1].clone());
    }
    None
}

fn add_typer(args: &[Type]) -> Result<Type> {
    if let (Some(a), Some(b)) = (const_of(&args[0]), const_of(&args[1])) {
        if let Some(d) = add_data(a, b) {
            return Ok(Type::Const(d));
        }
        return Err(type_err(args));
    }
    Ok(numeric_result_type(&args[0], &args[1]))
}

fn subtract_typer(args: &[Type]) -> Result<Type> {
    if let (Some(a), Some(b)) = (const_of(&args[0]), const_of(&args[1])) {
        if let Some(d) = subtract_data(a, b) {
            return Ok(Type::Const(d));
        }
        return Err(type_err(args));
    }
    Ok(numeric_result_type(&args[0], &args[1]))
}

fn multiply_simplify(args: &[LogicalPlan]) -> Option<LogicalPlan> {
    // x * 1 = x
    let is_one = |d: &Data| {
        matches!(d, Data::Int(i) if i == &BigInt::from(1))
            || matches!(d, Data::Dec(d) if *d == Decimal::ONE)
    };
    if matches!(&args[1], LogicalPlan::Constant(d) if is_one(d)) {
        return Some(args[0].clone());
    }
    if matches!(&args[0], LogicalPlan::Constant(d) if is_one(d)) {
        return Some(args[1].clone());
    }
    None
}

fn multiply_typer(args: &[Type]) -> Result<Type> {
    if let (Some(a), Some(b)) = (const_of(&args[0]), const_of(&args[1])) {
        if let Some(d) = multiply_data(a, b) {
            return Ok(Type::Const(d));
        }
        return Err(type_err(args));
    }
    Ok(numeric_result_type(&args[0], &args[1]))
}

fn divide_typer(args: &[Type]) -> Result<Type> {
    if let (Some(a), Some(b)) = (const_of(&args[0]), const_of(&args[1])) {
        return match divide_data(a, b) {
            Some(Ok(d)) => Ok(Type::Const(d)),
            Some(Err(e)) => Err(e),
            None => Err(type_err(args)),
        };
    }
    if let Some(b) = const_of(&args[1]) {
        if is_zero(b) {
            return Err(Error::Generic {
                message: "division by a constant zero".to_string(),
            });
        }
    }
    Ok(numeric_result_type(&args[0], &args[1]))
}

fn modulo_typer(args: &[Type]) -> Result<Type> {
    if let (Some(a), Some(b)) = (const_of(&args[0]), const_of(&args[1])) {
        return match modulo_data(a, b) {
            Some(Ok(d)) => Ok(Type::Const(d)),
            Some(Err(e)) => Err(e),
            None => Err(type_err(args)),
        };
    }
    if let Some(b) = const_of(&args[1]) {
        if is_zero(b) {
            return Err(Error::Generic {
                message: "modulo by a constant zero".to_string(),
            });
        }
    }
    Ok(numeric_result_type(&args[0], &args[1]))
}

fn negate_simplify(_args: &[LogicalPlan]) -> Option<LogicalPlan> {
    None
}

fn negate_typer(args: &[Type]) -> Result<Type> {
    if let Some(a) = const_of(&args[0]) {
        if let Some(d) = negate_data(a) {
            return Ok(Type::Const(d));
        }
        return Err(type_err(args));
    }
    Ok(args[0].underlying())
}

fn no_simplify(_args: &[LogicalPlan]) -> Option<LogicalPlan> {
    None
}

fn binary_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(binary_domain())
}

fn unary_untyper(expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![expected.underlying()])
}

pub static ADD: Function = Function {
    name: "Add",
    doc: "numeric/temporal addition",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: add_simplify,
    typer: add_typer,
    untyper: binary_untyper,
};

pub static SUBTRACT: Function = Function {
    name: "Subtract",
    doc: "numeric/temporal subtraction",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: no_simplify,
    typer: subtract_typer,
    untyper: binary_untyper,
};

pub static MULTIPLY: Function = Function {
    name: "Multiply",
    doc: "numeric multiplication",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: multiply_simplify,
    typer: multiply_typer,
    untyper: binary_untyper,
};

pub static DIVIDE: Function = Function {
    name: "Divide",
    doc: "numeric division",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: no_simplify,
    typer: divide_typer,
    untyper: binary_untyper,
};

pub static MODULO: Function = Function {
    name: "Modulo",
    doc: "numeric remainder",
    arity: Arity::Fixed(2),
    domain: binary_domain,
    simplify: no_simplify,
    typer: modulo_typer,
    untyper: binary_untyper,
};

pub static NEGATE: Function = Function {
    name: "Negate",
    doc: "numeric/interval negation",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Top],
    simplify: negate_simplify,
    typer: negate_typer,
    untyper: unary_untyper,
};

pub fn functions() -> Vec<&'static Function> {
    vec![&ADD, &SUBTRACT, &MULTIPLY, &DIVIDE, &MODULO, &NEGATE]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_identity_simplifies_away_zero() {
        let x = LogicalPlan::Free("x".to_string());
        let args = vec![x.clone(), LogicalPlan::Constant(Data::Int(0.into()))];
        assert_eq!(add_simplify(&args), Some(x));
    }

    #[test]
    fn multiply_identity_simplifies_away_one() {
        let x = LogicalPlan::Free("x".to_string());
        let args = vec![LogicalPlan::Constant(Data::Int(1.into())), x.clone()];
        assert_eq!(multiply_simplify(&args), Some(x));
    }

    #[test]
    fn add_promotes_int_and_dec() {
        let args = vec![
            Type::Const(Data::Int(1.into())),
            Type::Const(Data::Dec("2.5".parse().unwrap())),
        ];
        assert_eq!(
            ADD.type_of(&args).unwrap(),
            Type::Const(Data::Dec("3.5".parse().unwrap()))
        );
    }

    #[test]
    fn divide_by_constant_zero_is_a_type_error() {
        let args = vec![Type::Int, Type::Const(Data::Int(0.into()))];
        assert!(DIVIDE.type_of(&args).is_err());
    }

    #[test]
    fn modulo_by_constant_zero_is_a_type_error() {
        let args = vec![
            Type::Const(Data::Int(7.into())),
            Type::Const(Data::Int(0.into())),
        ];
        assert!(MODULO.type_of(&args).is_err());
    }

    #[test]
    fn interval_multiplied_by_int_scales_millis() {
        let args = vec![
            Type::Const(Data::Interval(Interval::from_millis(1000))),
            Type::Const(Data::Int(3.into())),
        ];
        assert_eq!(
            MULTIPLY.type_of(&args).unwrap(),
            Type::Const(Data::Interval(Interval::from_millis(3000)))
        );
    }
}
