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

//! The structural type lattice (spec §3/§4.A): `Top`, `Bottom`, primitives,
//! `Obj`/`Arr`, unions, and `Const(Data)` singleton types.

use std::collections::BTreeMap;

use crate::data::Data;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Top,
    Bottom,
    Bool,
    Int,
    Dec,
    Str,
    Timestamp,
    Date,
    Time,
    Interval,
    /// Structural object type: known fields plus an optional "rest" type
    /// covering any field not named explicitly.
    Obj { fields: BTreeMap<String, Type>, rest: Option<Box<Type>> },
    Arr(Box<Type>),
    Union(Vec<Type>),
    /// A singleton type carrying a literal value; `Const(d) <: d.data_type()`.
    Const(Data),
}

impl Type {
    pub fn obj(fields: impl IntoIterator<Item = (String, Type)>) -> Type {
        Type::Obj {
            fields: fields.into_iter().collect(),
            rest: None,
        }
    }

    pub fn obj_with_rest(fields: impl IntoIterator<Item = (String, Type)>, rest: Type) -> Type {
        Type::Obj {
            fields: fields.into_iter().collect(),
            rest: Some(Box::new(rest)),
        }
    }

    pub fn is_numeric(&self) -> bool {
        match self {
            Type::Int | Type::Dec => true,
            Type::Const(d) => d.is_number(),
            Type::Union(ts) => ts.iter().all(Type::is_numeric),
            _ => false,
        }
    }

    pub fn is_temporal(&self) -> bool {
        match self {
            Type::Timestamp | Type::Date | Type::Time | Type::Interval => true,
            Type::Const(d) => d.is_temporal(),
            Type::Union(ts) => ts.iter().all(Type::is_temporal),
            _ => false,
        }
    }

    pub fn is_array_like(&self) -> bool {
        matches!(self, Type::Arr(_)) || matches!(self, Type::Const(Data::Arr(_)))
    }

    /// The underlying primitive/structural type this value belongs to; for
    /// non-`Const` types this is the identity.
    pub fn underlying(&self) -> Type {
        match self {
            Type::Const(d) => data_type_of(d),
            other => other.clone(),
        }
    }

    /// `self contains other`: every value described by `other` is also
    /// described by `self`. Used by the untyper and by narrowing.
    pub fn contains(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Top, _) => true,
            (_, Type::Bottom) => true,
            (Type::Bottom, _) => false,
            (a, b) if a == b => true,
            (Type::Union(opts), b) => opts.iter().any(|o| o.contains(b)),
            (a, Type::Union(opts)) => opts.iter().all(|o| a.contains(o)),
            (a, Type::Const(d)) => a.contains(&data_type_of(d)),
            (Type::Obj { fields: af, rest: ar }, Type::Obj { fields: bf, rest: br }) => {
                bf.iter().all(|(k, bt)| match af.get(k) {
                    Some(at) => at.contains(bt),
                    None => match ar {
                        Some(art) => art.contains(bt),
                        None => false,
                    },
                }) && match (ar, br) {
                    (Some(art), Some(brt)) => art.contains(brt),
                    (Some(_), None) => true,
                    (None, None) => true,
                    (None, Some(_)) => false,
                }
            }
            (Type::Arr(a), Type::Arr(b)) => a.contains(b),
            _ => false,
        }
    }

    /// Narrows this type with an equality constraint against a known
    /// constant; on success the type is lowered to `Const(d)` when `d` is
    /// compatible, else left unchanged.
    pub fn narrow_to_const(&self, d: &Data) -> Type {
        if self.contains(&data_type_of(d)) {
            Type::Const(d.clone())
        } else {
            self.clone()
        }
    }
}

pub fn data_type_of(d: &Data) -> Type {
    match d {
        Data::Null => Type::Bottom,
        Data::Bool(_) => Type::Bool,
        Data::Int(_) => Type::Int,
        Data::Dec(_) => Type::Dec,
        Data::Str(_) => Type::Str,
        Data::Timestamp(_) => Type::Timestamp,
        Data::Date(_) => Type::Date,
        Data::Time(_) => Type::Time,
        Data::Interval(_) => Type::Interval,
        Data::Arr(items) => {
            let elem = items
                .iter()
                .map(data_type_of)
                .fold(Type::Bottom, |acc, t| lub(&acc, &t));
            Type::Arr(Box::new(elem))
        }
        Data::Obj(fields) => Type::obj(fields.iter().map(|(k, v)| (k.clone(), data_type_of(v)))),
        Data::Set(items) => {
            let elem = items
                .iter()
                .map(|d| data_type_of(&d.0))
                .fold(Type::Bottom, |acc, t| lub(&acc, &t));
            Type::Arr(Box::new(elem))
        }
    }
}

/// Least upper bound of two types in the lattice.
pub fn lub(a: &Type, b: &Type) -> Type {
    if a == b {
        return a.clone();
    }
    match (a, b) {
        (Type::Bottom, other) | (other, Type::Bottom) => other.clone(),
        (Type::Top, _) | (_, Type::Top) => Type::Top,
        (Type::Const(d), other) => lub(&data_type_of(d), other),
        (other, Type::Const(d)) => lub(other, &data_type_of(d)),
        (Type::Union(xs), Type::Union(ys)) => {
            let mut merged = xs.clone();
            merged.extend(ys.clone());
            Type::Union(dedup_types(merged))
        }
        (Type::Union(xs), other) | (other, Type::Union(xs)) => {
            let mut merged = xs.clone();
            merged.push(other.clone());
            Type::Union(dedup_types(merged))
        }
        (Type::Obj { fields: af, rest: ar }, Type::Obj { fields: bf, rest: br }) => {
            let mut fields = BTreeMap::new();
            for (k, at) in af {
                if let Some(bt) = bf.get(k) {
                    fields.insert(k.clone(), lub(at, bt));
                }
            }
            let rest = match (ar, br) {
                (Some(a), Some(b)) => Some(Box::new(lub(a, b))),
                _ => None,
            };
            Type::Obj { fields, rest }
        }
        (Type::Arr(a), Type::Arr(b)) => Type::Arr(Box::new(lub(a, b))),
        _ => Type::Union(dedup_types(vec![a.clone(), b.clone()])),
    }
}

/// Greatest lower bound; `Bottom` whenever the two types share nothing.
pub fn glb(a: &Type, b: &Type) -> Type {
    if a == b {
        return a.clone();
    }
    if a.contains(b) {
        return b.clone();
    }
    if b.contains(a) {
        return a.clone();
    }
    Type::Bottom
}

fn dedup_types(types: Vec<Type>) -> Vec<Type> {
    let mut out: Vec<Type> = Vec::new();
    for t in types {
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

/// Checks that `observed` is acceptable wherever `expected` is required.
pub fn typecheck(expected: &Type, observed: &Type) -> Result<()> {
    if expected.contains(observed) {
        Ok(())
    } else {
        Err(Error::Type {
            expected: expected.clone(),
            observed: observed.clone(),
            hint: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_is_subtype_of_its_data_type() {
        let c = Type::Const(Data::Int(5.into()));
        assert!(Type::Int.contains(&c));
    }

    #[test]
    fn lub_of_const_and_primitive_widens() {
        let c = Type::Const(Data::Int(5.into()));
        assert_eq!(lub(&c, &Type::Int), Type::Int);
    }

    #[test]
    fn typecheck_fails_on_incompatible_types() {
        let observed = Type::Str;
        let expected = Type::Int;
        assert!(typecheck(&expected, &observed).is_err());
    }

    #[test]
    fn obj_contains_respects_rest() {
        let open = Type::obj_with_rest(vec![("a".to_string(), Type::Int)], Type::Str);
        let concrete = Type::obj(vec![
            ("a".to_string(), Type::Int),
            ("b".to_string(), Type::Str),
        ]);
        assert!(open.contains(&concrete));
    }
}
