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

//! Top-level facade over the mongosql workspace (spec §6 External
//! Interfaces), in the role `datafusion` plays over
//! `datafusion-common`/`datafusion-expr`/`datafusion-sql`/`datafusion-optimizer`:
//! it re-exports the pieces callers need and exposes the two entry points an
//! external caller drives directly, [`compile`] and [`optimize`].
//!
//! The core takes an already name- and type-annotated SQL AST in
//! ([`compile`]) and hands a [`Workflow`] back out ([`optimize`]); the step
//! in between — planning a [`LogicalPlan`] down into an initial `Workflow` —
//! is an external collaborator's job per spec §2's component table, not
//! this crate's. Binding/parsing the raw SQL text into the annotated AST
//! `compile` expects is likewise external.

pub use mongosql_common::{data_type_of, glb, lub, typecheck, Data, DataOrd, Error, Interval, Result, Type};
pub use mongosql_expr::{all_functions, lookup, make_array, Arity, Function, LogicalPlan, LogicalPlanRef};
pub use mongosql_optimizer::OptimizerConfig;
pub use mongosql_sql::{
    ast, AnnotatedExpr, BinOp, CompilerConfig, Expr, FromClause, JoinKind, OrderKey, Provenance,
    Select, SelectItem, UnOp,
};
pub use mongosql_workflow::{
    Accumulator, DocVar, Expression, Grouped, IdHandling, MapExpr, Reshape, Scope, Shape, SortKey,
    Workflow,
};

/// Compiles a fully-annotated `SELECT` into a [`LogicalPlan`] (spec §4.D,
/// §6 "Inbound to the core").
pub fn compile(select: &Select, config: &CompilerConfig) -> Result<LogicalPlan> {
    mongosql_sql::compile(select, config)
}

/// Runs the pipeline optimizer's full pass sequence to a fixed point (spec
/// §4.F, §6 "Inbound to the core"). Never fails: a pass that cannot apply
/// leaves its input unchanged (spec §7).
pub fn optimize(workflow: &Workflow, config: &OptimizerConfig) -> Workflow {
    mongosql_optimizer::optimize(workflow, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_common::FieldPath;

    #[test]
    fn optimize_is_idempotent_through_the_facade() {
        let mut shape = Reshape::new();
        shape.insert("x", Shape::Leaf(Expression::var(DocVar::root_path(FieldPath::single("a")))));
        let w = Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId);
        let config = OptimizerConfig::default();
        let once = optimize(&w, &config);
        let twice = optimize(&once, &config);
        assert_eq!(once, twice);
    }
}
