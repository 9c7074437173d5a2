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

//! Stage reordering (spec §4.F `reorderOps`): pushes `$Skip`/`$Limit` below
//! a pure-reshape `$Project`/`$SimpleMap`, and pushes a `$Match` below one
//! when every field its selector touches is a pure rename there, so a later
//! pass gets more `$Project`s sitting directly next to each other to fuse.
//!
//! Runs as a bottom-up fixed-point rewrite, same shape as
//! `delete_unused_fields`'s sibling passes: one full-tree sweep per
//! iteration, stop as soon as a sweep makes no change.

use std::cell::Cell;
use std::collections::HashSet;

use mongosql_common::FieldPath;
use mongosql_workflow::{DocVar, Expression, Reshape, Scope, Shape, Workflow};

use crate::config::OptimizerConfig;
use crate::shape_resolver::refs_of_expression;

#[tracing::instrument(level = "debug", skip_all)]
pub fn reorder_ops(workflow: &Workflow, config: &OptimizerConfig) -> Workflow {
    let mut current = workflow.clone();
    for _ in 0..config.max_coalesce_iterations {
        let (next, changed) = step(&current);
        if !changed {
            return next;
        }
        current = next;
    }
    current
}

fn step(w: &Workflow) -> (Workflow, bool) {
    let changed = Cell::new(false);
    let result = w.rewrite(&|node| {
        apply_rule(node).map(|rewritten| {
            changed.set(true);
            rewritten
        })
    });
    (result, changed.get())
}

fn apply_rule(node: &Workflow) -> Option<Workflow> {
    push_through_reshape(node).or_else(|| coalesce(node))
}

fn push_through_reshape(node: &Workflow) -> Option<Workflow> {
    match node {
        Workflow::Skip { source, n } => match source.as_ref() {
            Workflow::Project { source: inner, shape, id } => {
                Some(Workflow::project(Workflow::skip((**inner).clone(), *n), shape.clone(), *id))
            }
            Workflow::SimpleMap { source: inner, exprs } if exprs.len() == 1 => Some(
                Workflow::simple_map(Workflow::skip((**inner).clone(), *n), exprs.clone()),
            ),
            _ => None,
        },
        Workflow::Limit { source, n } => match source.as_ref() {
            Workflow::Project { source: inner, shape, id } => {
                Some(Workflow::project(Workflow::limit((**inner).clone(), *n), shape.clone(), *id))
            }
            Workflow::SimpleMap { source: inner, exprs } if exprs.len() == 1 => Some(
                Workflow::simple_map(Workflow::limit((**inner).clone(), *n), exprs.clone()),
            ),
            _ => None,
        },
        Workflow::Match { source, selector } => match source.as_ref() {
            Workflow::Project { source: inner, shape, id } => {
                let rewritten = rewrite_selector_through_renames(shape, selector)?;
                Some(Workflow::project(
                    Workflow::match_((**inner).clone(), rewritten),
                    shape.clone(),
                    *id,
                ))
            }
            Workflow::SimpleMap { source: inner, exprs } if exprs.len() == 1 => {
                let rewritten = rewrite_selector_through_renames(&exprs[0].body, selector)?;
                Some(Workflow::simple_map(
                    Workflow::match_((**inner).clone(), rewritten),
                    exprs.clone(),
                ))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Re-invokes the stage's own smart constructor, catching a fusion the
/// constructor would have applied had the tree been built bottom-up through
/// it originally (e.g. two `$Match`es that only became adjacent after a
/// previous rewrite round).
fn coalesce(node: &Workflow) -> Option<Workflow> {
    let rebuilt = match node {
        Workflow::Match { source, selector } => Workflow::match_((**source).clone(), selector.clone()),
        Workflow::Skip { source, n } => Workflow::skip((**source).clone(), *n),
        Workflow::Limit { source, n } => Workflow::limit((**source).clone(), *n),
        _ => return None,
    };
    if &rebuilt == node {
        None
    } else {
        Some(rebuilt)
    }
}

/// Attempts to rewrite `selector` so it reads straight off `rename_shape`'s
/// source instead of its (renamed) output. Succeeds only when every
/// root-scoped field the selector references is, in `rename_shape`, a pure
/// `$var` rename rather than a computed expression.
fn rewrite_selector_through_renames(rename_shape: &Reshape, selector: &Expression) -> Option<Expression> {
    let mut refs = HashSet::new();
    refs_of_expression(selector, &mut refs);
    for r in &refs {
        if r.scope != Scope::Root {
            return None;
        }
        let path = r.path.as_ref()?;
        find_rename_target(rename_shape, path)?;
    }
    Some(selector.rewrite(&|e| match e {
        Expression::Var(d) if d.scope == Scope::Root => {
            let path = d.path.as_ref()?;
            find_rename_target(rename_shape, path).map(Expression::var)
        }
        _ => None,
    }))
}

/// For a selector field path `f`, finds the first shape entry `name ->
/// $var(v)` where `f == name` or `f` is a (strict) sub-path of `name`, and
/// returns the corresponding upstream reference.
fn find_rename_target(shape: &Reshape, f: &FieldPath) -> Option<DocVar> {
    for (name, s) in shape.fields() {
        let Shape::Leaf(Expression::Var(d)) = s else { continue };
        if d.scope != Scope::Root {
            continue;
        }
        let key_path = FieldPath::single(name.clone());
        if key_path == *f {
            return Some(d.clone());
        }
        if let Some(rel) = key_path.relative_to(f) {
            return Some(d.with_suffix(&rel));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_workflow::IdHandling;

    fn var(name: &str) -> Expression {
        Expression::var(DocVar::root_path(FieldPath::single(name)))
    }

    #[test]
    fn skip_moves_below_a_project() {
        let shape = {
            let mut s = Reshape::new();
            s.insert("a", Shape::Leaf(var("a")));
            s
        };
        let w = Workflow::skip(Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId), 5);
        let result = reorder_ops(&w, &OptimizerConfig::default());
        match result {
            Workflow::Project { source, .. } => assert!(matches!(*source, Workflow::Skip { .. })),
            _ => panic!("expected Project on top after reordering"),
        }
    }

    #[test]
    fn match_moves_below_a_pure_rename_project() {
        let mut shape = Reshape::new();
        shape.insert("b", Shape::Leaf(var("a")));
        let w = Workflow::match_(
            Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId),
            var("b"),
        );
        let result = reorder_ops(&w, &OptimizerConfig::default());
        match result {
            Workflow::Project { source, .. } => match *source {
                Workflow::Match { selector, .. } => assert_eq!(selector, var("a")),
                _ => panic!("expected Match below Project"),
            },
            _ => panic!("expected Project on top after reordering"),
        }
    }

    #[test]
    fn match_does_not_move_below_a_computed_project() {
        let mut shape = Reshape::new();
        shape.insert("b", Shape::Leaf(Expression::op("$add", vec![var("a"), var("c")])));
        let w = Workflow::match_(
            Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId),
            var("b"),
        );
        let result = reorder_ops(&w, &OptimizerConfig::default());
        assert!(matches!(result, Workflow::Match { .. }));
    }
}
