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

//! Dead-field elimination (spec §4.F `deleteUnusedFields`).
//!
//! A backward liveness pass: walking from the sink toward `$Read`, each
//! stage is pruned against the set of fields the stages *below* it (closer
//! to the sink) actually use, then a fresh requirement set is computed and
//! threaded further upstream. `None` means "conservatively assume every
//! field is live" — the starting state, and the permanent state once the
//! walk crosses an opaque `$Map`/`$SimpleMap`/`$FlatMap`/`$Reduce` stage
//! whose body this pass does not interpret.

use std::collections::HashSet;

use mongosql_workflow::{DocVar, IdHandling, Reshape, Scope, Workflow};

use crate::shape_resolver::{refs_of_expression, refs_of_reshape};

#[tracing::instrument(level = "debug", skip_all)]
pub fn delete_unused_fields(workflow: &Workflow) -> Workflow {
    go(workflow, None)
}

fn go(node: &Workflow, used: Option<&HashSet<DocVar>>) -> Workflow {
    let pruned = prune_defs(node, used);
    let next_used = get_refs(&pruned, used);
    match &pruned {
        Workflow::Read(_) => pruned,
        Workflow::FoldLeft { left, right, op } => {
            let new_left = go(left, next_used.as_ref());
            let new_right = go(right, next_used.as_ref());
            Workflow::fold_left(new_left, new_right, op.clone())
        }
        Workflow::Project { source, shape, id } => {
            let new_source = go(source, next_used.as_ref());
            if shape.is_empty() && *id == IdHandling::IgnoreId {
                new_source
            } else {
                Workflow::project(new_source, shape.clone(), *id)
            }
        }
        _ => {
            let sources = pruned.sources();
            assert_eq!(sources.len(), 1, "non-FoldLeft stages have exactly one source");
            let new_source = go(sources[0], next_used.as_ref());
            pruned.with_sources(vec![new_source])
        }
    }
}

fn is_used(def_path: &mongosql_common::FieldPath, used: Option<&HashSet<DocVar>>) -> bool {
    match used {
        None => true,
        Some(set) => set.iter().any(|r| match (&r.path, r.scope) {
            (Some(p), Scope::Root) => p.overlaps(def_path),
            (None, Scope::Root) => true,
            _ => false,
        }),
    }
}

/// Strips shape/accumulator/map-expr entries a `$Project`, `$Group`, or
/// `$SimpleMap` defines but nothing downstream uses. Pruning is top-level:
/// a field is kept or dropped as a whole, not split into used/unused parts
/// of its own nested shape.
fn prune_defs(node: &Workflow, used: Option<&HashSet<DocVar>>) -> Workflow {
    match node {
        Workflow::Project { source, shape, id } => {
            let mut new_shape = Reshape::new();
            for (name, s) in shape.fields() {
                if is_used(&mongosql_common::FieldPath::single(name.clone()), used) {
                    new_shape.insert(name.clone(), s.clone());
                }
            }
            Workflow::Project { source: source.clone(), shape: new_shape, id: *id }
        }
        Workflow::Group { source, by, grouped } => {
            let mut new_grouped = mongosql_workflow::Grouped::new();
            for (name, acc) in grouped.fields() {
                if is_used(&mongosql_common::FieldPath::single(name.clone()), used) {
                    new_grouped.insert(name.clone(), acc.clone());
                }
            }
            Workflow::Group { source: source.clone(), by: by.clone(), grouped: new_grouped }
        }
        Workflow::SimpleMap { source, exprs } => {
            let new_exprs = exprs
                .iter()
                .map(|me| {
                    let mut new_body = Reshape::new();
                    for (name, s) in me.body.fields() {
                        if is_used(&mongosql_common::FieldPath::single(name.clone()), used) {
                            new_body.insert(name.clone(), s.clone());
                        }
                    }
                    mongosql_workflow::MapExpr { as_name: me.as_name.clone(), body: new_body }
                })
                .collect();
            Workflow::SimpleMap { source: source.clone(), exprs: new_exprs }
        }
        other => other.clone(),
    }
}

fn union_with_prev(
    prev: Option<&HashSet<DocVar>>,
    extra: HashSet<DocVar>,
) -> Option<HashSet<DocVar>> {
    prev.map(|set| {
        let mut merged = set.clone();
        merged.extend(extra);
        merged
    })
}

/// The requirement this (already-pruned) node passes further upstream, to
/// its own source(s).
fn get_refs(node: &Workflow, prev: Option<&HashSet<DocVar>>) -> Option<HashSet<DocVar>> {
    match node {
        Workflow::Group { by, grouped, .. } => {
            let mut refs = HashSet::new();
            refs_of_reshape(by, &mut refs);
            for (_, acc) in grouped.fields() {
                refs_of_expression(acc.arg(), &mut refs);
            }
            Some(refs)
        }
        Workflow::Project { shape, id, .. } => {
            let mut refs = HashSet::new();
            refs_of_reshape(shape, &mut refs);
            if *id == IdHandling::IncludeId {
                refs.insert(DocVar::id_var());
            }
            Some(refs)
        }
        Workflow::FoldLeft { .. } => {
            let mut refs = prev.cloned().unwrap_or_default();
            refs.insert(DocVar::id_var());
            Some(refs)
        }
        Workflow::Map { .. } | Workflow::SimpleMap { .. } | Workflow::FlatMap { .. } | Workflow::Reduce { .. } => {
            None
        }
        Workflow::Match { selector, .. } => {
            let mut extra = HashSet::new();
            refs_of_expression(selector, &mut extra);
            union_with_prev(prev, extra)
        }
        Workflow::Sort { keys, .. } => {
            let extra: HashSet<DocVar> = keys.iter().map(|k| k.field.clone()).collect();
            union_with_prev(prev, extra)
        }
        Workflow::Unwind { field, .. } => {
            let mut extra = HashSet::new();
            extra.insert(field.clone());
            union_with_prev(prev, extra)
        }
        Workflow::Read(_) | Workflow::Skip { .. } | Workflow::Limit { .. } => {
            union_with_prev(prev, HashSet::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_common::{Data, FieldPath};
    use mongosql_workflow::{Expression, IdHandling, Shape};

    fn var(name: &str) -> Expression {
        Expression::var(DocVar::root_path(FieldPath::single(name)))
    }

    #[test]
    fn prunes_a_field_no_downstream_stage_references() {
        // A stage below the sink defines `a` and `unused`; the sink Project
        // only ever reads `a` back out, through an intervening Match that
        // neither narrows nor widens the requirement.
        let mut inner_shape = Reshape::new();
        inner_shape.insert("a", Shape::Leaf(var("a")));
        inner_shape.insert("unused", Shape::Leaf(var("unused")));
        let mut outer_shape = Reshape::new();
        outer_shape.insert("a", Shape::Leaf(var("a")));
        let w = Workflow::project(
            Workflow::match_(
                Workflow::project(Workflow::read("coll"), inner_shape, IdHandling::IgnoreId),
                var("a"),
            ),
            outer_shape,
            IdHandling::IgnoreId,
        );
        let optimized = delete_unused_fields(&w);
        match optimized {
            Workflow::Project { source, .. } => match *source {
                Workflow::Match { source, .. } => match *source {
                    Workflow::Project { shape, .. } => {
                        assert_eq!(shape.len(), 1);
                        assert!(shape.get("a").is_some());
                        assert!(shape.get("unused").is_none());
                    }
                    _ => panic!("expected inner Project"),
                },
                _ => panic!("expected Match"),
            },
            _ => panic!("expected outer Project"),
        }
    }

    #[test]
    fn an_emptied_project_with_ignore_id_is_elided() {
        let mut inner_shape = Reshape::new();
        inner_shape.insert("unused", Shape::Leaf(var("unused")));
        let mut outer_shape = Reshape::new();
        outer_shape.insert("kept", Shape::Leaf(var("kept")));
        let w = Workflow::project(
            Workflow::project(Workflow::read("coll"), inner_shape, IdHandling::IgnoreId),
            outer_shape.clone(),
            IdHandling::IgnoreId,
        );
        let optimized = delete_unused_fields(&w);
        assert_eq!(
            optimized,
            Workflow::project(Workflow::read("coll"), outer_shape, IdHandling::IgnoreId)
        );
    }

    #[test]
    fn an_opaque_map_blocks_pruning_upstream() {
        let mut shape = Reshape::new();
        shape.insert("a", Shape::Leaf(var("a")));
        shape.insert("b", Shape::Leaf(var("b")));
        let w = Workflow::map(
            Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId),
            None,
            "function() { return this; }",
        );
        let optimized = delete_unused_fields(&w);
        match optimized {
            Workflow::Map { source, .. } => match *source {
                Workflow::Project { shape, .. } => assert_eq!(shape.len(), 2),
                _ => panic!("expected Project"),
            },
            _ => panic!("expected Map"),
        }
    }

    #[test]
    fn group_by_key_refs_keep_their_source_fields_alive() {
        let mut by = Reshape::new();
        by.insert("a", Shape::Leaf(var("a")));
        let mut shape = Reshape::new();
        shape.insert("a", Shape::Leaf(var("a")));
        shape.insert("b", Shape::Leaf(var("b")));
        let w = Workflow::group(
            Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId),
            by,
            mongosql_workflow::Grouped::new(),
        );
        let optimized = delete_unused_fields(&w);
        match optimized {
            Workflow::Group { source, .. } => match *source {
                Workflow::Project { shape, .. } => {
                    assert_eq!(shape.len(), 1);
                    assert!(shape.get("a").is_some());
                }
                _ => panic!("expected Project"),
            },
            _ => panic!("expected Group"),
        }
    }

    #[test]
    fn is_used_treats_none_as_conservative() {
        assert!(is_used(&FieldPath::single("anything"), None));
        let _ = Data::Int(1.into());
    }
}
