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

//! `$Project` elision directly below a `$Group` (spec §4.F
//! `inlineGroupProjects`): collects the chain of `$Project` reshapes
//! immediately upstream of a `$Group`, resolves the group's `by` keys and
//! accumulator arguments through that chain, and splices the chain out
//! entirely.
//!
//! Aborts (leaves the `$Group` untouched) if any `$addToSet`/`$push`
//! argument does not reduce to a bare `$var` after inlining — those
//! accumulators cannot take an arbitrary computed expression.

use mongosql_workflow::{Grouped, Reshape, Workflow};

use crate::shape_resolver;

#[tracing::instrument(level = "debug", skip_all)]
pub fn inline_group_projects(workflow: &Workflow) -> Workflow {
    workflow.rewrite(&|node| try_inline(node))
}

fn try_inline(node: &Workflow) -> Option<Workflow> {
    let Workflow::Group { source, by, grouped } = node else { return None };
    let (shapes, terminal) = collect_shapes(source);
    if shapes.is_empty() {
        return None;
    }
    let reshape_refs: Vec<&Reshape> = shapes.iter().collect();

    let mut new_grouped = Grouped::new();
    for (name, acc) in grouped.fields() {
        let fixed = shape_resolver::fix_expr(&reshape_refs, acc.arg())?;
        if acc.requires_var_arg() && fixed.as_var().is_none() {
            return None;
        }
        new_grouped.insert(name.clone(), acc.with_arg(fixed));
    }
    let new_by = shape_resolver::inline_project(by, &reshape_refs);

    Some(Workflow::group(terminal, new_by, new_grouped))
}

/// Walks a chain of `$Project`s, nearest-first, returning their reshapes and
/// the first non-`$Project` source reached.
fn collect_shapes(w: &Workflow) -> (Vec<Reshape>, Workflow) {
    match w {
        Workflow::Project { source, shape, .. } => {
            let (rest, terminal) = collect_shapes(source);
            let mut shapes = vec![shape.clone()];
            shapes.extend(rest);
            (shapes, terminal)
        }
        other => (vec![], other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_common::FieldPath;
    use mongosql_workflow::{Accumulator, DocVar, Expression, IdHandling, Shape};

    fn var(name: &str) -> Expression {
        Expression::var(DocVar::root_path(FieldPath::single(name)))
    }

    #[test]
    fn elides_a_project_chain_below_group() {
        let mut shape = Reshape::new();
        shape.insert("x", Shape::Leaf(var("a")));
        let mut by = Reshape::new();
        by.insert("key", Shape::Leaf(var("x")));
        let mut grouped = Grouped::new();
        grouped.insert("total", Accumulator::Sum(var("x")));
        let w = Workflow::group(
            Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId),
            by,
            grouped,
        );
        let result = inline_group_projects(&w);
        match result {
            Workflow::Group { source, by, grouped } => {
                assert!(matches!(*source, Workflow::Read(_)));
                assert_eq!(by.get("key"), Some(&Shape::Leaf(var("a"))));
                assert_eq!(grouped.get("total").unwrap().arg(), &var("a"));
            }
            _ => panic!("expected Group with the Project spliced out"),
        }
    }

    #[test]
    fn aborts_when_push_argument_does_not_reduce_to_a_bare_var() {
        let mut shape = Reshape::new();
        shape.insert("x", Shape::Leaf(Expression::op("$add", vec![var("a"), var("b")])));
        let mut grouped = Grouped::new();
        grouped.insert("items", Accumulator::Push(var("x")));
        let w = Workflow::group(
            Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId),
            Reshape::new(),
            grouped,
        );
        let result = inline_group_projects(&w);
        assert_eq!(result, w);
    }

    #[test]
    fn leaves_group_alone_when_no_project_sits_above_it() {
        let w = Workflow::group(Workflow::read("coll"), Reshape::new(), Grouped::new());
        assert_eq!(inline_group_projects(&w), w);
    }
}
