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

//! Lowers an annotated SQL AST into a [`mongosql_expr::LogicalPlan`]
//! (spec §4.D).
//!
//! This crate takes the place of `datafusion-sql`'s planner in the teacher
//! lineage: [`ast`] is the annotated `SELECT` AST the compiler consumes
//! (already name- and type-annotated by an external binder, per the
//! component table in spec §2 — parsing and binding are out of scope here),
//! and [`compiler::compile`] is the `datafusion_sql::planner::SqlToRel`
//! counterpart that lowers it.

pub mod ast;
pub mod compiler;
pub mod config;
pub mod like;
pub mod table_context;

pub use ast::{
    AnnotatedExpr, Attr, BinOp, Expr, FromClause, JoinKind, OrderKey, Provenance, Select,
    SelectItem, UnOp,
};
pub use compiler::compile;
pub use config::CompilerConfig;
pub use like::{like_pattern_to_regex, parse_escape};
pub use table_context::{CompilerState, ContextGuard, GroupingMemo, TableContext};
