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

//! The annotated SQL surface the compiler consumes.
//!
//! The lexer, parser, and semantic analyzer that produce these trees live
//! outside this crate; what's modeled here is exactly the boundary the
//! compiler needs: expression/statement shapes plus the per-node semantic
//! annotations (`Attr`) a prior analysis pass is assumed to have already
//! attached.

use mongosql_common::Data;
use mongosql_expr::Function;

/// Which relations (by name) an expression's value can be traced back to.
/// Populated by semantic analysis; the compiler only reads it to resolve
/// unqualified identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub relations: Vec<String>,
}

impl Provenance {
    pub fn none() -> Self {
        Provenance { relations: Vec::new() }
    }

    pub fn one(name: impl Into<String>) -> Self {
        Provenance { relations: vec![name.into()] }
    }
}

/// The semantic annotations a prior analysis pass attaches to every
/// expression node: `attr(node) -> (syntheticTags, provenance,
/// typeAnnotation, optionalFuncBinding)` (spec §6).
#[derive(Debug, Clone, Default)]
pub struct Attr {
    /// Whether this node was injected by the compiler itself (e.g. a hidden
    /// sort key), rather than authored by the user.
    pub synthetic: bool,
    pub provenance: Provenance,
    /// A resolved catalog binding for `InvokeFunction` nodes; `None` for
    /// everything else, or for a name that failed to resolve
    /// (`FunctionNotBound` is raised when the compiler needs it).
    pub func_binding: Option<&'static Function>,
}

impl Attr {
    pub fn new(provenance: Provenance) -> Self {
        Attr { synthetic: false, provenance, func_binding: None }
    }

    pub fn synthetic() -> Self {
        Attr { synthetic: true, ..Attr::default() }
    }

    pub fn with_binding(mut self, f: &'static Function) -> Self {
        self.func_binding = Some(f);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
    IsNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

/// One expression node, paired with its [`Attr`] in [`AnnotatedExpr`].
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Data),
    Ident(String),
    Binop { op: BinOp, left: Box<AnnotatedExpr>, right: Box<AnnotatedExpr> },
    Unop { op: UnOp, operand: Box<AnnotatedExpr> },
    InvokeFunction { name: String, args: Vec<AnnotatedExpr> },
    /// `expr LIKE pattern [ESCAPE escape]`.
    Like { expr: Box<AnnotatedExpr>, pattern: Box<AnnotatedExpr>, escape: Option<Box<AnnotatedExpr>> },
    /// `CASE operand WHEN v1 THEN r1 ... [ELSE e] END`.
    Match { operand: Box<AnnotatedExpr>, arms: Vec<(AnnotatedExpr, AnnotatedExpr)>, or_else: Option<Box<AnnotatedExpr>> },
    /// `CASE WHEN c1 THEN r1 ... [ELSE e] END`.
    Switch { arms: Vec<(AnnotatedExpr, AnnotatedExpr)>, or_else: Option<Box<AnnotatedExpr>> },
    /// An unnamed `SELECT *` / `SELECT t.*` projection item that splices its
    /// operand's fields into the surrounding record rather than naming one.
    Splice(Box<AnnotatedExpr>),
    SetLiteral(Vec<AnnotatedExpr>),
    ArrayLiteral(Vec<AnnotatedExpr>),
}

#[derive(Debug, Clone)]
pub struct AnnotatedExpr {
    pub expr: Expr,
    pub attr: Attr,
}

impl AnnotatedExpr {
    pub fn new(expr: Expr, attr: Attr) -> Self {
        AnnotatedExpr { expr, attr }
    }

    pub fn ident(name: impl Into<String>, provenance: Provenance) -> Self {
        AnnotatedExpr::new(Expr::Ident(name.into()), Attr::new(provenance))
    }

    pub fn literal(d: Data) -> Self {
        AnnotatedExpr::new(Expr::Literal(d), Attr::default())
    }
}

/// One item of a `SELECT` projection list: `expr [AS alias]`, or an unnamed
/// splice (`Expr::Splice`) that has no alias.
#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: AnnotatedExpr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FromClause {
    Table { name: String, alias: Option<String> },
    Join { left: Box<FromClause>, right: Box<FromClause>, kind: JoinKind, on: AnnotatedExpr },
}

impl FromClause {
    pub fn table(name: impl Into<String>) -> Self {
        FromClause::Table { name: name.into(), alias: None }
    }
}

#[derive(Debug, Clone)]
pub struct OrderKey {
    pub expr: AnnotatedExpr,
    pub descending: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Select {
    pub from: Option<FromClause>,
    pub where_: Option<AnnotatedExpr>,
    pub group_by: Vec<AnnotatedExpr>,
    pub having: Option<AnnotatedExpr>,
    pub projection: Vec<SelectItem>,
    pub order_by: Vec<OrderKey>,
    pub distinct: bool,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// `true` for a bare `SELECT *` (no other projection items): lowers to
    /// `Squash` of the whole table-context shape directly, bypassing
    /// `buildRecord` entirely (spec §4.D wildcard-projection note). `SELECT
    /// t.*` mixed with other items is, by contrast, an ordinary
    /// `Expr::Splice(Ident("t"))` projection item and does not set this.
    pub wildcard: bool,
}

impl Select {
    pub fn new(from: FromClause, projection: Vec<SelectItem>) -> Self {
        Select { from: Some(from), projection, ..Select::default() }
    }
}
