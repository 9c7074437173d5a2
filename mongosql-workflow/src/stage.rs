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

//! The `Workflow` stage algebra (spec §3/§4.E): a tree of physical
//! aggregation-pipeline stages.
//!
//! Smart constructors fuse only the shallow, explicitly adjacent-stage
//! identities named by the spec: two `$Match`es combine with `$and`, and
//! consecutive `$Limit`/`$Skip` combine arithmetically. The general
//! project-on-project inlining (`inlineProject`, `inlineGroupProjects`) is a
//! whole-tree optimizer pass one layer up, not something a single
//! constructor call can do locally.

use std::fmt;

use crate::expression::{DocVar, Expression, Grouped, IdHandling, Reshape};

/// A `$SimpleMap`/`$Map` emitted key: an optional `as`-binding name for the
/// element scope, paired with the reshape that produces the new document.
#[derive(Debug, Clone, PartialEq)]
pub struct MapExpr {
    pub as_name: Option<String>,
    pub body: Reshape,
}

/// A sort key: a field reference plus direction.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: DocVar,
    pub ascending: bool,
}

/// The physical aggregation-pipeline stage tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Workflow {
    /// The root input, a named collection.
    Read(String),
    /// `$project`: reshapes the input per `shape`, with `id` controlling
    /// `_id` retention.
    Project { source: Box<Workflow>, shape: Reshape, id: IdHandling },
    /// `$group`: groups `source` by `by`, computing `grouped` accumulators
    /// per group.
    Group { source: Box<Workflow>, by: Reshape, grouped: Grouped },
    /// `$match`: filters `source` by `selector`.
    Match { source: Box<Workflow>, selector: Expression },
    /// `$sort`.
    Sort { source: Box<Workflow>, keys: Vec<SortKey> },
    /// `$skip`.
    Skip { source: Box<Workflow>, n: i64 },
    /// `$limit`.
    Limit { source: Box<Workflow>, n: i64 },
    /// `$project` restricted to a single map-expr whose body is an object
    /// literal of pure field copies/renames (the fusible special case
    /// `reorderOps` looks for).
    SimpleMap { source: Box<Workflow>, exprs: Vec<MapExpr> },
    /// An opaque `$project`-with-`$function`-style per-document map,
    /// expressed as an uninterpreted body (general user code the optimizer
    /// does not look inside).
    Map { source: Box<Workflow>, scope: Option<String>, body: String },
    /// An opaque per-document map producing zero or more output documents.
    FlatMap { source: Box<Workflow>, scope: Option<String>, body: String },
    /// An opaque whole-collection reduction.
    Reduce { source: Box<Workflow>, body: String },
    /// A binary join-like combination of two upstream workflows under a
    /// named physical operator (e.g. `$unionWith`, `$lookup`).
    FoldLeft { left: Box<Workflow>, right: Box<Workflow>, op: String },
    /// `$unwind`.
    Unwind { source: Box<Workflow>, field: DocVar, preserve_null_and_empty: bool },
}

impl Workflow {
    pub fn read(name: impl Into<String>) -> Workflow {
        Workflow::Read(name.into())
    }

    /// `$project`. Deliberately does not attempt to inline into an upstream
    /// `$project`; that fusion is `mongosql-optimizer`'s job.
    pub fn project(source: Workflow, shape: Reshape, id: IdHandling) -> Workflow {
        Workflow::Project { source: Box::new(source), shape, id }
    }

    pub fn group(source: Workflow, by: Reshape, grouped: Grouped) -> Workflow {
        Workflow::Group { source: Box::new(source), by, grouped }
    }

    /// `$match`. Fuses with an immediately preceding `$match` by `$and`-ing
    /// the two selectors, since two sequential filters are equivalent to
    /// one filter on their conjunction.
    pub fn match_(source: Workflow, selector: Expression) -> Workflow {
        if let Workflow::Match { source: inner_source, selector: inner_selector } = source {
            return Workflow::Match {
                source: inner_source,
                selector: Expression::and(inner_selector, selector),
            };
        }
        Workflow::Match { source: Box::new(source), selector }
    }

    pub fn sort(source: Workflow, keys: Vec<SortKey>) -> Workflow {
        Workflow::Sort { source: Box::new(source), keys }
    }

    /// `$skip`. Fuses with an immediately preceding `$skip` by summing the
    /// two offsets.
    pub fn skip(source: Workflow, n: i64) -> Workflow {
        if let Workflow::Skip { source: inner_source, n: inner_n } = source {
            return Workflow::Skip { source: inner_source, n: inner_n + n };
        }
        Workflow::Skip { source: Box::new(source), n }
    }

    /// `$limit`. Fuses with an immediately preceding `$limit` by taking the
    /// smaller of the two bounds.
    pub fn limit(source: Workflow, n: i64) -> Workflow {
        if let Workflow::Limit { source: inner_source, n: inner_n } = source {
            return Workflow::Limit { source: inner_source, n: inner_n.min(n) };
        }
        Workflow::Limit { source: Box::new(source), n }
    }

    pub fn simple_map(source: Workflow, exprs: Vec<MapExpr>) -> Workflow {
        Workflow::SimpleMap { source: Box::new(source), exprs }
    }

    pub fn map(source: Workflow, scope: Option<String>, body: impl Into<String>) -> Workflow {
        Workflow::Map { source: Box::new(source), scope, body: body.into() }
    }

    pub fn flat_map(source: Workflow, scope: Option<String>, body: impl Into<String>) -> Workflow {
        Workflow::FlatMap { source: Box::new(source), scope, body: body.into() }
    }

    pub fn reduce(source: Workflow, body: impl Into<String>) -> Workflow {
        Workflow::Reduce { source: Box::new(source), body: body.into() }
    }

    pub fn fold_left(left: Workflow, right: Workflow, op: impl Into<String>) -> Workflow {
        Workflow::FoldLeft { left: Box::new(left), right: Box::new(right), op: op.into() }
    }

    pub fn unwind(source: Workflow, field: DocVar, preserve_null_and_empty: bool) -> Workflow {
        Workflow::Unwind { source: Box::new(source), field, preserve_null_and_empty }
    }

    /// The immediate upstream source(s) of this stage, in evaluation order.
    pub fn sources(&self) -> Vec<&Workflow> {
        match self {
            Workflow::Read(_) => vec![],
            Workflow::Project { source, .. }
            | Workflow::Group { source, .. }
            | Workflow::Match { source, .. }
            | Workflow::Sort { source, .. }
            | Workflow::Skip { source, .. }
            | Workflow::Limit { source, .. }
            | Workflow::SimpleMap { source, .. }
            | Workflow::Map { source, .. }
            | Workflow::FlatMap { source, .. }
            | Workflow::Reduce { source, .. }
            | Workflow::Unwind { source, .. } => vec![source.as_ref()],
            Workflow::FoldLeft { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        }
    }

    /// Rebuilds this node with new sources, in the same order `sources()`
    /// returned them. Panics if the count does not match the node's arity.
    pub fn with_sources(&self, mut new_sources: Vec<Workflow>) -> Workflow {
        macro_rules! one {
            () => {{
                assert_eq!(new_sources.len(), 1);
                Box::new(new_sources.remove(0))
            }};
        }
        match self {
            Workflow::Read(name) => {
                assert!(new_sources.is_empty());
                Workflow::Read(name.clone())
            }
            Workflow::Project { shape, id, .. } => {
                Workflow::Project { source: one!(), shape: shape.clone(), id: *id }
            }
            Workflow::Group { by, grouped, .. } => {
                Workflow::Group { source: one!(), by: by.clone(), grouped: grouped.clone() }
            }
            Workflow::Match { selector, .. } => {
                Workflow::Match { source: one!(), selector: selector.clone() }
            }
            Workflow::Sort { keys, .. } => Workflow::Sort { source: one!(), keys: keys.clone() },
            Workflow::Skip { n, .. } => Workflow::Skip { source: one!(), n: *n },
            Workflow::Limit { n, .. } => Workflow::Limit { source: one!(), n: *n },
            Workflow::SimpleMap { exprs, .. } => {
                Workflow::SimpleMap { source: one!(), exprs: exprs.clone() }
            }
            Workflow::Map { scope, body, .. } => {
                Workflow::Map { source: one!(), scope: scope.clone(), body: body.clone() }
            }
            Workflow::FlatMap { scope, body, .. } => {
                Workflow::FlatMap { source: one!(), scope: scope.clone(), body: body.clone() }
            }
            Workflow::Reduce { body, .. } => Workflow::Reduce { source: one!(), body: body.clone() },
            Workflow::FoldLeft { op, .. } => {
                assert_eq!(new_sources.len(), 2);
                let right = new_sources.remove(1);
                let left = new_sources.remove(0);
                Workflow::FoldLeft { left: Box::new(left), right: Box::new(right), op: op.clone() }
            }
            Workflow::Unwind { field, preserve_null_and_empty, .. } => Workflow::Unwind {
                source: one!(),
                field: field.clone(),
                preserve_null_and_empty: *preserve_null_and_empty,
            },
        }
    }

    /// Bottom-up rewrite over the stage tree, mirroring `LogicalPlan::rewrite`.
    pub fn rewrite(&self, f: &impl Fn(&Workflow) -> Option<Workflow>) -> Workflow {
        let rebuilt_sources: Vec<Workflow> =
            self.sources().into_iter().map(|s| s.rewrite(f)).collect();
        let rebuilt = if rebuilt_sources.is_empty() {
            self.clone()
        } else {
            self.with_sources(rebuilt_sources)
        };
        f(&rebuilt).unwrap_or(rebuilt)
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        match self {
            Workflow::Read(name) => writeln!(f, "{pad}Read({name})"),
            Workflow::Project { source, shape, id } => {
                writeln!(f, "{pad}Project(id={id:?}, shape={shape})")?;
                source.write_indented(f, depth + 1)
            }
            Workflow::Group { source, by, grouped } => {
                writeln!(f, "{pad}Group(by={by}, grouped={grouped})")?;
                source.write_indented(f, depth + 1)
            }
            Workflow::Match { source, selector } => {
                writeln!(f, "{pad}Match({selector})")?;
                source.write_indented(f, depth + 1)
            }
            Workflow::Sort { source, keys } => {
                let rendered: Vec<String> = keys
                    .iter()
                    .map(|k| format!("{}{}", if k.ascending { "" } else { "-" }, k.field))
                    .collect();
                writeln!(f, "{pad}Sort({})", rendered.join(", "))?;
                source.write_indented(f, depth + 1)
            }
            Workflow::Skip { source, n } => {
                writeln!(f, "{pad}Skip({n})")?;
                source.write_indented(f, depth + 1)
            }
            Workflow::Limit { source, n } => {
                writeln!(f, "{pad}Limit({n})")?;
                source.write_indented(f, depth + 1)
            }
            Workflow::SimpleMap { source, exprs } => {
                writeln!(f, "{pad}SimpleMap({} expr(s))", exprs.len())?;
                source.write_indented(f, depth + 1)
            }
            Workflow::Map { source, .. } => {
                writeln!(f, "{pad}Map(<opaque>)")?;
                source.write_indented(f, depth + 1)
            }
            Workflow::FlatMap { source, .. } => {
                writeln!(f, "{pad}FlatMap(<opaque>)")?;
                source.write_indented(f, depth + 1)
            }
            Workflow::Reduce { source, .. } => {
                writeln!(f, "{pad}Reduce(<opaque>)")?;
                source.write_indented(f, depth + 1)
            }
            Workflow::FoldLeft { left, right, op } => {
                writeln!(f, "{pad}FoldLeft({op})")?;
                left.write_indented(f, depth + 1)?;
                right.write_indented(f, depth + 1)
            }
            Workflow::Unwind { source, field, preserve_null_and_empty } => {
                writeln!(f, "{pad}Unwind({field}, preserveNullAndEmpty={preserve_null_and_empty})")?;
                source.write_indented(f, depth + 1)
            }
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_common::Data;

    #[test]
    fn consecutive_matches_fuse_by_and() {
        let w = Workflow::match_(
            Workflow::match_(Workflow::read("coll"), Expression::literal(Data::Bool(true))),
            Expression::literal(Data::Bool(false)),
        );
        match w {
            Workflow::Match { selector, .. } => {
                assert_eq!(
                    selector,
                    Expression::and(
                        Expression::literal(Data::Bool(true)),
                        Expression::literal(Data::Bool(false))
                    )
                );
            }
            _ => panic!("expected a fused Match"),
        }
    }

    #[test]
    fn consecutive_limits_fuse_to_minimum() {
        let w = Workflow::limit(Workflow::limit(Workflow::read("coll"), 10), 3);
        assert_eq!(w, Workflow::Limit { source: Box::new(Workflow::read("coll")), n: 3 });
    }

    #[test]
    fn consecutive_skips_fuse_by_sum() {
        let w = Workflow::skip(Workflow::skip(Workflow::read("coll"), 5), 2);
        assert_eq!(w, Workflow::Skip { source: Box::new(Workflow::read("coll")), n: 7 });
    }

    #[test]
    fn limit_after_match_does_not_fuse() {
        let w = Workflow::limit(
            Workflow::match_(Workflow::read("coll"), Expression::literal(Data::Bool(true))),
            3,
        );
        assert!(matches!(w, Workflow::Limit { .. }));
        if let Workflow::Limit { source, .. } = &w {
            assert!(matches!(**source, Workflow::Match { .. }));
        }
    }

    #[test]
    fn rewrite_visits_both_sides_of_fold_left() {
        let w = Workflow::fold_left(Workflow::read("a"), Workflow::read("b"), "$unionWith");
        let renamed = w.rewrite(&|w| match w {
            Workflow::Read(name) if name == "a" => Some(Workflow::Read("a2".to_string())),
            _ => None,
        });
        match renamed {
            Workflow::FoldLeft { left, .. } => assert_eq!(*left, Workflow::Read("a2".to_string())),
            _ => panic!("expected FoldLeft"),
        }
    }
}
