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

//! The substitution engine shared by every pipeline-rewrite pass (spec
//! §4.G): `get0` resolves a field path through a stack of upstream
//! `$project` reshapes, `fix_expr` threads that resolution through an
//! arbitrary expression, and `inline_project` rebuilds a whole reshape
//! against the stack.
//!
//! `reshapes` is always ordered nearest-first: index 0 is the reshape
//! immediately upstream of the node doing the resolving, later entries are
//! further upstream still.

use std::collections::HashSet;

use mongosql_common::{FieldPath, Leaf};
use mongosql_workflow::{DocVar, Expression, Reshape, Scope, Shape};

/// Resolves `leaves` (the path remaining to look up, or `None` once fully
/// consumed) against the nearest-first reshape stack, producing the
/// expression that stands in for it once every reshape has been applied.
///
/// Returns `None` when the path does not resolve — the head segment names
/// no field of the nearest reshape.
pub fn get0(leaves: Option<&FieldPath>, reshapes: &[&Reshape]) -> Option<Expression> {
    let (first, rest) = match reshapes.split_first() {
        Some(pair) => pair,
        None => {
            return Some(match leaves {
                Some(p) => Expression::var(DocVar::root_path(p.clone())),
                None => Expression::var(DocVar::root()),
            });
        }
    };
    let path = match leaves {
        Some(p) => p,
        None => return Some(Expression::Object(inline_project(first, rest))),
    };
    let name = match path.first() {
        Leaf::Name(n) => n,
        Leaf::Index(_) => return None,
    };
    match first.get(name) {
        None => None,
        Some(Shape::Nested(nested)) => {
            let mut stack: Vec<&Reshape> = vec![nested];
            stack.extend_from_slice(rest);
            let remaining = path.rest();
            get0(remaining.as_ref(), &stack)
        }
        Some(Shape::Leaf(Expression::Include)) => get0(Some(path), rest),
        Some(Shape::Leaf(Expression::Var(d))) => {
            let remaining = path.rest();
            let rebased = match (&d.path, remaining) {
                (Some(p), Some(r)) => Some(p.concat(&r)),
                (Some(p), None) => Some(p.clone()),
                (None, Some(r)) => Some(r),
                (None, None) => None,
            };
            get0(rebased.as_ref(), rest)
        }
        Some(Shape::Leaf(e)) => {
            if path.rest().is_some() {
                None
            } else {
                fix_expr(rest, e)
            }
        }
    }
}

/// Rewrites every `$var(ROOT(...))` leaf of `e` by resolving it through the
/// reshape stack. Fails (returns `None`) if any such reference does not
/// resolve — unlike `inline_project`, which drops unresolved fields instead.
pub fn fix_expr(reshapes: &[&Reshape], e: &Expression) -> Option<Expression> {
    match e {
        Expression::Var(d) if d.scope == Scope::Root => get0(d.path.as_ref(), reshapes),
        Expression::Var(_) | Expression::Include | Expression::Literal(_) => Some(e.clone()),
        Expression::Operator { name, args } => {
            let fixed: Option<Vec<Expression>> =
                args.iter().map(|a| fix_expr(reshapes, a)).collect();
            Some(Expression::Operator { name: name.clone(), args: fixed? })
        }
        Expression::Object(r) => Some(Expression::Object(inline_project(r, reshapes))),
    }
}

/// Rebuilds reshape `p` with every field resolved through the upstream
/// `reshapes` stack. A field whose resolution fails is silently dropped from
/// the output, rather than aborting the whole reshape.
pub fn inline_project(p: &Reshape, reshapes: &[&Reshape]) -> Reshape {
    let mut out = Reshape::new();
    for (name, shape) in p.fields() {
        let resolved = match shape {
            Shape::Nested(nested) => Some(Shape::Nested(inline_project(nested, reshapes))),
            Shape::Leaf(Expression::Include) => {
                get0(Some(&FieldPath::single(name.clone())), reshapes).map(expr_to_shape)
            }
            Shape::Leaf(Expression::Var(d)) if d.scope == Scope::Root => {
                get0(d.path.as_ref(), reshapes).map(expr_to_shape)
            }
            Shape::Leaf(e) => fix_expr(reshapes, e).map(Shape::Leaf),
        };
        if let Some(shape) = resolved {
            out.insert(name.clone(), shape);
        }
    }
    out
}

fn expr_to_shape(e: Expression) -> Shape {
    match e {
        Expression::Object(r) => Shape::Nested(r),
        other => Shape::Leaf(other),
    }
}

/// Collects every `DocVar` referenced by `e` (used by `deleteUnusedFields` to
/// compute a stage's own field requirements).
pub fn refs_of_expression(e: &Expression, out: &mut HashSet<DocVar>) {
    match e {
        Expression::Var(d) => {
            out.insert(d.clone());
        }
        Expression::Include | Expression::Literal(_) => {}
        Expression::Operator { args, .. } => {
            for a in args {
                refs_of_expression(a, out);
            }
        }
        Expression::Object(r) => refs_of_reshape(r, out),
    }
}

/// Collects every upstream `DocVar` a reshape's values depend on. An
/// `$include()` leaf at path `name` implicitly references the same upstream
/// path (it copies the source field through unchanged).
pub fn refs_of_reshape(r: &Reshape, out: &mut HashSet<DocVar>) {
    for (name, shape) in r.fields() {
        match shape {
            Shape::Nested(nested) => refs_of_reshape(nested, out),
            Shape::Leaf(Expression::Include) => {
                out.insert(DocVar::root_path(FieldPath::single(name.clone())));
            }
            Shape::Leaf(e) => refs_of_expression(e, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_common::Data;

    fn var(name: &str) -> Expression {
        Expression::var(DocVar::root_path(FieldPath::single(name)))
    }

    #[test]
    fn get0_resolves_a_rename_through_one_reshape() {
        let mut upstream = Reshape::new();
        upstream.insert("b", Shape::Leaf(var("a")));
        let resolved = get0(Some(&FieldPath::single("b")), &[&upstream]);
        assert_eq!(resolved, Some(var("a")));
    }

    #[test]
    fn get0_resolves_through_a_chain_of_reshapes() {
        let mut r1 = Reshape::new();
        r1.insert("c", Shape::Leaf(var("b")));
        let mut r2 = Reshape::new();
        r2.insert("b", Shape::Leaf(var("a")));
        let resolved = get0(Some(&FieldPath::single("c")), &[&r1, &r2]);
        assert_eq!(resolved, Some(var("a")));
    }

    #[test]
    fn get0_fails_on_missing_field() {
        let upstream = Reshape::new();
        assert_eq!(get0(Some(&FieldPath::single("missing")), &[&upstream]), None);
    }

    #[test]
    fn get0_passes_through_include() {
        let mut upstream = Reshape::new();
        upstream.insert("a", Shape::Leaf(Expression::Include));
        let resolved = get0(Some(&FieldPath::single("a")), &[&upstream]);
        assert_eq!(resolved, Some(var("a")));
    }

    #[test]
    fn inline_project_drops_unresolved_fields() {
        let mut upstream = Reshape::new();
        upstream.insert("a", Shape::Leaf(var("x")));
        let mut p = Reshape::new();
        p.insert("keep", Shape::Leaf(var("a")));
        p.insert("gone", Shape::Leaf(var("missing")));
        let fused = inline_project(&p, &[&upstream]);
        assert_eq!(fused.get("keep"), Some(&Shape::Leaf(var("x"))));
        assert_eq!(fused.get("gone"), None);
    }

    #[test]
    fn fix_expr_fails_whole_expression_on_one_bad_ref() {
        let upstream = Reshape::new();
        let e = Expression::op("$add", vec![var("missing"), Expression::literal(Data::Int(1.into()))]);
        assert_eq!(fix_expr(&[&upstream], &e), None);
    }

    #[test]
    fn refs_of_reshape_counts_include_as_a_reference() {
        let mut r = Reshape::new();
        r.insert("a", Shape::Leaf(Expression::Include));
        let mut out = HashSet::new();
        refs_of_reshape(&r, &mut out);
        assert!(out.contains(&DocVar::root_path(FieldPath::single("a"))));
    }
}
