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

//! Rewrite passes over the `Workflow` IR (spec §4.F/§4.G): one file per
//! pass, driven to a fixed point by [`optimize`] in the canonical order the
//! spec lays out — `deleteUnusedFields`, `reorderOps`,
//! `inlineGroupProjects`, `inlineProjectUnwindGroup`, `inlineProject`.
//!
//! This mirrors `datafusion-optimizer`'s one-rule-per-file layout, but
//! without its `OptimizerRule` trait-object indirection: every pass here is
//! a plain function over `&Workflow`, the same convention the rest of the
//! workspace (`mongosql-expr`'s catalog, `mongosql-sql`'s compiler) already
//! uses.

pub mod config;
pub mod delete_unused_fields;
pub mod inline_group_projects;
pub mod inline_project;
pub mod inline_project_unwind_group;
pub mod reorder_ops;
pub mod shape_resolver;

pub use config::OptimizerConfig;
use mongosql_workflow::Workflow;

/// Runs the full pass sequence to a fixed point (spec §5), bounded by
/// [`OptimizerConfig::max_coalesce_iterations`].
#[tracing::instrument(level = "debug", skip_all)]
pub fn optimize(workflow: &Workflow, config: &OptimizerConfig) -> Workflow {
    let mut current = workflow.clone();
    for _ in 0..config.max_coalesce_iterations {
        let pruned = delete_unused_fields::delete_unused_fields(&current);
        let reordered = reorder_ops::reorder_ops(&pruned, config);
        let grouped = inline_group_projects::inline_group_projects(&reordered);
        let unwind_grouped = inline_project_unwind_group::inline_project_unwind_group(&grouped);
        let fused = inline_project::inline_consecutive_projects(&unwind_grouped);
        if fused == current {
            return fused;
        }
        current = fused;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_common::FieldPath;
    use mongosql_workflow::{Accumulator, DocVar, Expression, Grouped, IdHandling, Reshape, Shape};

    fn var(name: &str) -> Expression {
        Expression::var(DocVar::root_path(FieldPath::single(name)))
    }

    /// A `$Project` that renames a field, followed by a `$Group` summing a
    /// field the sink never reads back: the rename-chain collapses via
    /// `inlineGroupProjects`, and the unused second field is pruned before
    /// that even runs.
    #[test]
    fn optimize_fuses_and_prunes_a_small_pipeline() {
        let mut shape = Reshape::new();
        shape.insert("x", Shape::Leaf(var("a")));
        shape.insert("unused", Shape::Leaf(var("b")));
        let mut grouped = Grouped::new();
        grouped.insert("total", Accumulator::Sum(var("x")));
        let w = Workflow::group(
            Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId),
            Reshape::new(),
            grouped,
        );
        let optimized = optimize(&w, &OptimizerConfig::default());
        match optimized {
            Workflow::Group { source, grouped, .. } => {
                assert!(matches!(*source, Workflow::Read(_)));
                assert_eq!(grouped.get("total").unwrap().arg(), &var("a"));
            }
            _ => panic!("expected the Project to be spliced into the Group"),
        }
    }

    #[test]
    fn optimize_is_idempotent() {
        let mut shape = Reshape::new();
        shape.insert("x", Shape::Leaf(var("a")));
        let w = Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId);
        let once = optimize(&w, &OptimizerConfig::default());
        let twice = optimize(&once, &OptimizerConfig::default());
        assert_eq!(once, twice);
    }
}
