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

//! Structural constructors and accessors over `Obj`/`Arr` values:
//! `MakeObject`, `MakeArray`, `ObjectConcat`, `ArrayConcat`, `ObjectProject`,
//! `DeleteField`, `Splice`.

use mongosql_common::{lub, Data, Error, Result, Type};

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

// --- MakeArray (variadic) ---

fn make_array_typer(args: &[Type]) -> Result<Type> {
    let mut values = Vec::with_capacity(args.len());
    for a in args {
        match const_of(a) {
            Some(d) => values.push(d.clone()),
            None => {
                let elem = args.iter().map(Type::underlying).fold(Type::Bottom, |acc, t| lub(&acc, &t));
                return Ok(Type::Arr(Box::new(elem)));
            }
        }
    }
    Ok(Type::Const(Data::Arr(values)))
}

fn make_array_untyper(expected: &Type) -> Result<Vec<Type>> {
    match expected {
        Type::Arr(elem) => Ok(vec![elem.as_ref().clone()]),
        _ => Ok(vec![Type::Top]),
    }
}

pub static MAKE_ARRAY: Function = Function {
    name: "MakeArray",
    doc: "constructs an array literal from its arguments",
    arity: Arity::Variadic { min: 0, max: None },
    domain: || vec![Type::Top],
    simplify: no_simplify,
    typer: make_array_typer,
    untyper: make_array_untyper,
};

// --- MakeObject (variadic, arguments alternate key/value; keys must be
// constant strings) ---

fn make_object_typer(args: &[Type]) -> Result<Type> {
    if args.len() % 2 != 0 {
        return Err(Error::Generic {
            message: "MakeObject requires an even number of key/value arguments".to_string(),
        });
    }
    let mut fields_type = Vec::new();
    let mut fields_data: Option<Vec<(String, Data)>> = Some(Vec::new());
    for pair in args.chunks(2) {
        let key = const_str(&pair[0]).ok_or_else(|| Error::ExpectedLiteral {
            context: "MakeObject key".to_string(),
        })?;
        fields_type.push((key.to_string(), pair[1].clone()));
        match (&mut fields_data, const_of(&pair[1])) {
            (Some(acc), Some(v)) => acc.push((key.to_string(), v.clone())),
            _ => fields_data = None,
        }
    }
    if let Some(fields) = fields_data {
        return Ok(Type::Const(Data::Obj(fields)));
    }
    Ok(Type::obj(fields_type))
}

fn make_object_untyper(expected: &Type) -> Result<Vec<Type>> {
    match expected {
        Type::Obj { fields, .. } => {
            let mut out = Vec::new();
            for (k, t) in fields {
                out.push(Type::Const(Data::Str(k.clone())));
                out.push(t.clone());
            }
            Ok(out)
        }
        _ => Ok(vec![]),
    }
}

pub static MAKE_OBJECT: Function = Function {
    name: "MakeObject",
    doc: "constructs an object literal from alternating key/value arguments",
    arity: Arity::Variadic { min: 0, max: None },
    domain: || vec![Type::Str, Type::Top],
    simplify: no_simplify,
    typer: make_object_typer,
    untyper: make_object_untyper,
};

// --- ObjectConcat (variadic, later objects' fields win) ---

pub(crate) fn merge_objs(fields: &mut Vec<(String, Type)>, rest: &mut Option<Type>, obj: &Type) {
    match obj {
        Type::Obj { fields: of, rest: or } => {
            for (k, t) in of {
                if let Some(existing) = fields.iter_mut().find(|(fk, _)| fk == k) {
                    existing.1 = t.clone();
                } else {
                    fields.push((k.clone(), t.clone()));
                }
            }
            if let Some(r) = or {
                *rest = Some(r.as_ref().clone());
            }
        }
        _ => *rest = Some(Type::Top),
    }
}

fn object_concat_typer(args: &[Type]) -> Result<Type> {
    let mut data_fields: Option<Vec<(String, Data)>> = Some(Vec::new());
    for a in args {
        match (&mut data_fields, const_of(a)) {
            (Some(acc), Some(Data::Obj(of))) => {
                for (k, v) in of {
                    if let Some(existing) = acc.iter_mut().find(|(fk, _)| fk == k) {
                        existing.1 = v.clone();
                    } else {
                        acc.push((k.clone(), v.clone()));
                    }
                }
            }
            _ => data_fields = None,
        }
    }
    if let Some(fields) = data_fields {
        return Ok(Type::Const(Data::Obj(fields)));
    }
    let mut fields = Vec::new();
    let mut rest = None;
    for a in args {
        merge_objs(&mut fields, &mut rest, &a.underlying());
    }
    Ok(match rest {
        Some(r) => Type::obj_with_rest(fields, r),
        None => Type::obj(fields),
    })
}

fn object_concat_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Top, Type::Top])
}

pub static OBJECT_CONCAT: Function = Function {
    name: "ObjectConcat",
    doc: "merges objects left to right; later fields override earlier ones of the same name",
    arity: Arity::Variadic { min: 2, max: None },
    domain: || vec![Type::Top, Type::Top],
    simplify: no_simplify,
    typer: object_concat_typer,
    untyper: object_concat_untyper,
};

// --- ArrayConcat (variadic) ---

fn array_concat_typer(args: &[Type]) -> Result<Type> {
    let mut data_items: Option<Vec<Data>> = Some(Vec::new());
    for a in args {
        match (&mut data_items, const_of(a)) {
            (Some(acc), Some(Data::Arr(items))) => acc.extend(items.iter().cloned()),
            _ => data_items = None,
        }
    }
    if let Some(items) = data_items {
        return Ok(Type::Const(Data::Arr(items)));
    }
    let elem = args
        .iter()
        .map(|a| match a.underlying() {
            Type::Arr(e) => e.as_ref().clone(),
            other => other,
        })
        .fold(Type::Bottom, |acc, t| lub(&acc, &t));
    Ok(Type::Arr(Box::new(elem)))
}

fn array_concat_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Top, Type::Top])
}

pub static ARRAY_CONCAT: Function = Function {
    name: "ArrayConcat",
    doc: "concatenates arrays in argument order",
    arity: Arity::Variadic { min: 2, max: None },
    domain: || vec![Type::Top, Type::Top],
    simplify: no_simplify,
    typer: array_concat_typer,
    untyper: array_concat_untyper,
};

// --- ObjectProject(obj, field_name...) : keeps only the named fields ---

fn object_project_typer(args: &[Type]) -> Result<Type> {
    let names: Result<Vec<&str>> = args[1..]
        .iter()
        .map(|a| {
            const_str(a).ok_or_else(|| Error::ExpectedLiteral {
                context: "ObjectProject field name".to_string(),
            })
        })
        .collect();
    let names = names?;
    if let Some(Data::Obj(fields)) = const_of(&args[0]) {
        let projected = fields
            .iter()
            .filter(|(k, _)| names.contains(&k.as_str()))
            .cloned()
            .collect();
        return Ok(Type::Const(Data::Obj(projected)));
    }
    if let Type::Obj { fields, .. } = args[0].underlying() {
        let projected = fields
            .into_iter()
            .filter(|(k, _)| names.contains(&k.as_str()))
            .collect::<Vec<_>>();
        return Ok(Type::obj(projected));
    }
    Err(Error::Type {
        expected: Type::obj(vec![]),
        observed: args[0].clone(),
        hint: Some("ObjectProject requires an object operand".to_string()),
    })
}

fn object_project_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Top])
}

pub static OBJECT_PROJECT: Function = Function {
    name: "ObjectProject",
    doc: "keeps only the named fields of an object",
    arity: Arity::Variadic { min: 1, max: None },
    domain: || vec![Type::Top, Type::Str],
    simplify: no_simplify,
    typer: object_project_typer,
    untyper: object_project_untyper,
};

// --- DeleteField(obj, field_name) ---

fn delete_field_typer(args: &[Type]) -> Result<Type> {
    let name = const_str(&args[1]).ok_or_else(|| Error::ExpectedLiteral {
        context: "DeleteField field name".to_string(),
    })?;
    if let Some(Data::Obj(fields)) = const_of(&args[0]) {
        let remaining = fields.iter().filter(|(k, _)| k != name).cloned().collect();
        return Ok(Type::Const(Data::Obj(remaining)));
    }
    if let Type::Obj { fields, rest } = args[0].underlying() {
        let remaining = fields.into_iter().filter(|(k, _)| k != name).collect::<Vec<_>>();
        return Ok(match rest {
            Some(r) => Type::obj_with_rest(remaining, *r),
            None => Type::obj(remaining),
        });
    }
    Err(Error::Type {
        expected: Type::obj(vec![]),
        observed: args[0].clone(),
        hint: Some("DeleteField requires an object operand".to_string()),
    })
}

fn delete_field_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Top, Type::Str])
}

pub static DELETE_FIELD: Function = Function {
    name: "DeleteField",
    doc: "removes a named field from an object",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Top, Type::Str],
    simplify: no_simplify,
    typer: delete_field_typer,
    untyper: delete_field_untyper,
};

// --- Splice(array, start, delete_count, item...) : array-splice,
// JS-`Array.prototype.splice`-style, used to rewrite a fixed-position slice
// of a literal key array (e.g. GROUP BY key lists) in place. ---

fn splice_typer(args: &[Type]) -> Result<Type> {
    let start = const_of(&args[1]).and_then(as_index);
    let delete_count = const_of(&args[2]).and_then(as_index);
    if let (Some(Data::Arr(items)), Some(start), Some(delete_count)) =
        (const_of(&args[0]), start, delete_count)
    {
        let start = start.min(items.len());
        let end = (start + delete_count).min(items.len());
        let mut out = items[..start].to_vec();
        for a in &args[3..] {
            match const_of(a) {
                Some(d) => out.push(d.clone()),
                None => return spliced_element_type(args),
            }
        }
        out.extend_from_slice(&items[end..]);
        return Ok(Type::Const(Data::Arr(out)));
    }
    spliced_element_type(args)
}

fn spliced_element_type(args: &[Type]) -> Result<Type> {
    let source_elem = match args[0].underlying() {
        Type::Arr(e) => e.as_ref().clone(),
        _ => Type::Top,
    };
    let elem = args[3..]
        .iter()
        .map(Type::underlying)
        .fold(source_elem, |acc, t| lub(&acc, &t));
    Ok(Type::Arr(Box::new(elem)))
}

fn as_index(d: &Data) -> Option<usize> {
    match d {
        Data::Int(i) => i.to_string().parse::<usize>().ok(),
        _ => None,
    }
}

fn splice_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Top, Type::Int, Type::Int])
}

pub static SPLICE: Function = Function {
    name: "Splice",
    doc: "replaces a positional slice of an array with new elements",
    arity: Arity::Variadic { min: 3, max: None },
    domain: || vec![Type::Top, Type::Int, Type::Int],
    simplify: no_simplify,
    typer: splice_typer,
    untyper: splice_untyper,
};

// --- Squash(obj) : flattens nested objects produced by a join-shape onto a
// single level. A field whose value is itself an object has that object's
// fields spliced into the result at the top level instead; a scalar-valued
// field passes through unchanged. Later (rightmost, by iteration order of
// the source object) fields win a name clash, matching `ObjectConcat`. ---

fn squash_fields(fields: &[(String, Data)]) -> Vec<(String, Data)> {
    let mut out: Vec<(String, Data)> = Vec::new();
    let mut upsert = |k: String, v: Data| {
        if let Some(existing) = out.iter_mut().find(|(ek, _)| *ek == k) {
            existing.1 = v;
        } else {
            out.push((k, v));
        }
    };
    for (k, v) in fields {
        match v {
            Data::Obj(inner) => {
                for (ik, iv) in inner {
                    upsert(ik.clone(), iv.clone());
                }
            }
            other => upsert(k.clone(), other.clone()),
        }
    }
    out
}

fn squash_type_fields(fields: &std::collections::BTreeMap<String, Type>) -> Vec<(String, Type)> {
    let mut out: Vec<(String, Type)> = Vec::new();
    let mut upsert = |k: String, v: Type| {
        if let Some(existing) = out.iter_mut().find(|(ek, _)| *ek == k) {
            existing.1 = v;
        } else {
            out.push((k, v));
        }
    };
    for (k, t) in fields {
        match t {
            Type::Obj { fields: inner, .. } => {
                for (ik, it) in inner {
                    upsert(ik.clone(), it.clone());
                }
            }
            other => upsert(k.clone(), other.clone()),
        }
    }
    out
}

fn squash_typer(args: &[Type]) -> Result<Type> {
    if let Some(Data::Obj(fields)) = const_of(&args[0]) {
        return Ok(Type::Const(Data::Obj(squash_fields(fields))));
    }
    match args[0].underlying() {
        Type::Obj { fields, rest } => {
            let squashed = squash_type_fields(&fields);
            Ok(match rest {
                Some(r) => Type::obj_with_rest(squashed, *r),
                None => Type::obj(squashed),
            })
        }
        other => Err(Error::Type {
            expected: Type::obj(vec![]),
            observed: other,
            hint: Some("Squash requires an object operand".to_string()),
        }),
    }
}

fn squash_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Top])
}

pub static SQUASH: Function = Function {
    name: "Squash",
    doc: "flattens nested objects produced by a join-shape onto a single level",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Top],
    simplify: no_simplify,
    typer: squash_typer,
    untyper: squash_untyper,
};

pub fn functions() -> Vec<&'static Function> {
    vec![
        &MAKE_ARRAY,
        &MAKE_OBJECT,
        &OBJECT_CONCAT,
        &ARRAY_CONCAT,
        &OBJECT_PROJECT,
        &DELETE_FIELD,
        &SPLICE,
        &SQUASH,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squash_splices_nested_object_fields_to_top_level() {
        let obj = Type::Const(Data::Obj(vec![
            ("a".to_string(), Data::Int(1.into())),
            (
                "t2".to_string(),
                Data::Obj(vec![("b".to_string(), Data::Int(2.into()))]),
            ),
        ]));
        assert_eq!(
            SQUASH.type_of(&[obj]).unwrap(),
            Type::Const(Data::Obj(vec![
                ("a".to_string(), Data::Int(1.into())),
                ("b".to_string(), Data::Int(2.into())),
            ]))
        );
    }

    #[test]
    fn squash_passes_through_scalar_fields_unchanged() {
        let obj = Type::obj(vec![("a".to_string(), Type::Int)]);
        assert_eq!(SQUASH.type_of(&[obj.clone()]).unwrap(), obj);
    }

    #[test]
    fn make_array_folds_constant_items() {
        let args = vec![Type::Const(Data::Int(1.into())), Type::Const(Data::Int(2.into()))];
        assert_eq!(
            MAKE_ARRAY.type_of(&args).unwrap(),
            Type::Const(Data::Arr(vec![Data::Int(1.into()), Data::Int(2.into())]))
        );
    }

    #[test]
    fn make_object_requires_literal_keys() {
        let args = vec![Type::Str, Type::Int];
        assert!(MAKE_OBJECT.type_of(&args).is_err());
    }

    #[test]
    fn make_object_folds_constant_pairs() {
        let args = vec![
            Type::Const(Data::Str("a".to_string())),
            Type::Const(Data::Int(1.into())),
        ];
        assert_eq!(
            MAKE_OBJECT.type_of(&args).unwrap(),
            Type::Const(Data::Obj(vec![("a".to_string(), Data::Int(1.into()))]))
        );
    }

    #[test]
    fn object_concat_overrides_left_with_right() {
        let left = Type::Const(Data::Obj(vec![("a".to_string(), Data::Int(1.into()))]));
        let right = Type::Const(Data::Obj(vec![("a".to_string(), Data::Int(2.into()))]));
        assert_eq!(
            OBJECT_CONCAT.type_of(&[left, right]).unwrap(),
            Type::Const(Data::Obj(vec![("a".to_string(), Data::Int(2.into()))]))
        );
    }

    #[test]
    fn delete_field_drops_named_field() {
        let obj = Type::Const(Data::Obj(vec![
            ("a".to_string(), Data::Int(1.into())),
            ("b".to_string(), Data::Int(2.into())),
        ]));
        let args = vec![obj, Type::Const(Data::Str("a".to_string()))];
        assert_eq!(
            DELETE_FIELD.type_of(&args).unwrap(),
            Type::Const(Data::Obj(vec![("b".to_string(), Data::Int(2.into()))]))
        );
    }

    #[test]
    fn splice_replaces_positional_slice() {
        let arr = Type::Const(Data::Arr(vec![
            Data::Int(1.into()),
            Data::Int(2.into()),
            Data::Int(3.into()),
        ]));
        let args = vec![
            arr,
            Type::Const(Data::Int(1.into())),
            Type::Const(Data::Int(1.into())),
            Type::Const(Data::Int(99.into())),
        ];
        assert_eq!(
            SPLICE.type_of(&args).unwrap(),
            Type::Const(Data::Arr(vec![
                Data::Int(1.into()),
                Data::Int(99.into()),
                Data::Int(3.into())
            ]))
        );
    }
}
