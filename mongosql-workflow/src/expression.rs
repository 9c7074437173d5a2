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

//! The physical-plan expression language: `DocVar`, `Expression`, `Reshape`,
//! `IdHandling`, `Accumulator`, `Grouped` (spec §3).

use std::fmt;

use mongosql_common::{Data, FieldPath, Leaf};

/// Which document an unqualified `DocVar` is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The pipeline's root input document for the current stage.
    Root,
    /// The value currently being mapped over (inside a `$SimpleMap`/`$Map`
    /// scope, or an accumulator's per-document argument).
    Current,
}

/// A typed field reference: a scope plus an optional path within it.
/// `ROOT()` (no path) means the root document itself; `ROOT(p)` renders as
/// `"$p"` in the external syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocVar {
    pub scope: Scope,
    pub path: Option<FieldPath>,
}

impl DocVar {
    pub fn root() -> Self {
        DocVar { scope: Scope::Root, path: None }
    }

    pub fn root_path(path: FieldPath) -> Self {
        DocVar { scope: Scope::Root, path: Some(path) }
    }

    pub fn current() -> Self {
        DocVar { scope: Scope::Current, path: None }
    }

    pub fn current_path(path: FieldPath) -> Self {
        DocVar { scope: Scope::Current, path: Some(path) }
    }

    /// `ROOT("_id")`, the document identifier reference.
    pub fn id_var() -> Self {
        DocVar::root_path(FieldPath::single("_id"))
    }

    pub fn is_id_var(&self) -> bool {
        matches!(&self.path, Some(p) if self.scope == Scope::Root && p.len() == 1 && p.first() == &Leaf::Name("_id".to_string()))
    }

    /// Builds a new `DocVar` with `prefix` prepended to this var's path
    /// (used to rebase a reference when it is looked up through a nested
    /// reshape).
    pub fn prefixed_by(&self, prefix: &FieldPath) -> DocVar {
        let path = match &self.path {
            Some(p) => prefix.concat(p),
            None => prefix.clone(),
        };
        DocVar { scope: self.scope, path: Some(path) }
    }

    /// Builds a new `DocVar` with `suffix` appended after this var's path
    /// (the mirror of [`DocVar::prefixed_by`], used by the optimizer when a
    /// reference resolves to a renamed prefix of its own path — spec §4.F
    /// `reorderOps`'s `$Match`-through-`$Project` rewrite).
    pub fn with_suffix(&self, suffix: &FieldPath) -> DocVar {
        let path = match &self.path {
            Some(p) => p.concat(suffix),
            None => suffix.clone(),
        };
        DocVar { scope: self.scope, path: Some(path) }
    }
}

impl fmt::Display for DocVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.scope {
            Scope::Root => "$",
            Scope::Current => "$$",
        };
        match &self.path {
            Some(p) => write!(f, "{prefix}{p}"),
            None => write!(f, "{prefix}$ROOT"),
        }
    }
}

/// The physical-plan expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A reference to an upstream document field.
    Var(DocVar),
    /// "Keep the source value at this position", used inside a `Reshape`.
    Include,
    /// A literal value.
    Literal(Data),
    /// An operator invocation (`$add`, `$concat`, `$cond`, ...).
    Operator { name: String, args: Vec<Expression> },
    /// An object literal used in expression position (a `$Group` accumulator
    /// argument, a `$Match` selector, ...) rather than a `Reshape` position.
    /// Produced when the shape resolver (spec §4.G) inlines a field whose
    /// upstream value is itself a nested reshape, not a single scalar.
    Object(Reshape),
}

impl Expression {
    pub fn var(d: DocVar) -> Expression {
        Expression::Var(d)
    }

    pub fn literal(d: Data) -> Expression {
        Expression::Literal(d)
    }

    pub fn op(name: impl Into<String>, args: Vec<Expression>) -> Expression {
        Expression::Operator { name: name.into(), args }
    }

    pub fn and(a: Expression, b: Expression) -> Expression {
        Expression::op("$and", vec![a, b])
    }

    /// `true` for a bare `$var(DocVar)` leaf with no wrapping operator —
    /// the shape of expression `inlineGroupProjects` requires for
    /// `$addToSet`/`$push` accumulator arguments.
    pub fn as_var(&self) -> Option<&DocVar> {
        match self {
            Expression::Var(d) => Some(d),
            _ => None,
        }
    }

    /// Bottom-up rewrite, mirroring `LogicalPlan::rewrite`.
    pub fn rewrite(&self, f: &impl Fn(&Expression) -> Option<Expression>) -> Expression {
        let rebuilt = match self {
            Expression::Operator { name, args } => Expression::Operator {
                name: name.clone(),
                args: args.iter().map(|a| a.rewrite(f)).collect(),
            },
            Expression::Object(r) => Expression::Object(r.rewrite_exprs(&|e| e.rewrite(f))),
            other => other.clone(),
        };
        f(&rebuilt).unwrap_or(rebuilt)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Var(d) => write!(f, "{d}"),
            Expression::Include => write!(f, "$include()"),
            Expression::Literal(d) => write!(f, "$literal({d})"),
            Expression::Operator { name, args } => {
                let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{name}({})", rendered.join(", "))
            }
            Expression::Object(r) => write!(f, "{r}"),
        }
    }
}

/// The shape of one field within a [`Reshape`]: either a nested object or a
/// leaf expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Nested(Reshape),
    Leaf(Expression),
}

/// An insertion-ordered `field_name -> Shape` mapping (spec §3). Keys are
/// single field-name segments; deeper paths are represented structurally via
/// [`Shape::Nested`], so the "no key is a prefix of another" invariant holds
/// by construction — two distinct flat names can never be sequence-prefixes
/// of one another.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reshape(Vec<(String, Shape)>);

impl Reshape {
    pub fn new() -> Self {
        Reshape(Vec::new())
    }

    pub fn from_fields(fields: impl IntoIterator<Item = (String, Shape)>) -> Self {
        let mut r = Reshape::new();
        for (k, v) in fields {
            r.insert(k, v);
        }
        r
    }

    /// Upserts a field, preserving the position of its first insertion.
    pub fn insert(&mut self, name: impl Into<String>, shape: Shape) {
        let name = name.into();
        if let Some(existing) = self.0.iter_mut().find(|(k, _)| *k == name) {
            existing.1 = shape;
        } else {
            self.0.push((name, shape));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Shape> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<Shape> {
        let idx = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Shape)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[(String, Shape)] {
        &self.0
    }

    /// Applies `f` to every leaf expression, recursing into nested shapes,
    /// rebuilding the reshape with the results.
    pub fn rewrite_exprs(&self, f: &impl Fn(&Expression) -> Expression) -> Reshape {
        Reshape::from_fields(self.0.iter().map(|(k, v)| {
            let new_v = match v {
                Shape::Nested(r) => Shape::Nested(r.rewrite_exprs(f)),
                Shape::Leaf(e) => Shape::Leaf(f(e)),
            };
            (k.clone(), new_v)
        }))
    }
}

impl fmt::Display for Reshape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| match v {
                Shape::Nested(r) => format!("{k}: {r}"),
                Shape::Leaf(e) => format!("{k}: {e}"),
            })
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

/// Policy for retaining the root `_id` across a `$Project` (spec §3).
/// Composition under stage fusion: `IncludeId` dominates `ExcludeId`
/// dominates `IgnoreId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdHandling {
    IncludeId,
    ExcludeId,
    IgnoreId,
}

impl IdHandling {
    fn rank(self) -> u8 {
        match self {
            IdHandling::IncludeId => 2,
            IdHandling::ExcludeId => 1,
            IdHandling::IgnoreId => 0,
        }
    }

    /// The more dominant of two policies, used when fusing adjacent
    /// `$Project` stages.
    pub fn dominant(a: IdHandling, b: IdHandling) -> IdHandling {
        if a.rank() >= b.rank() {
            a
        } else {
            b
        }
    }
}

/// A `$Group` accumulator, applied per group to the values of `Expression`
/// (spec §3). Used only inside `$Group`.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    AddToSet(Expression),
    Push(Expression),
    First(Expression),
    Last(Expression),
    Max(Expression),
    Min(Expression),
    Avg(Expression),
    Sum(Expression),
}

impl Accumulator {
    pub fn arg(&self) -> &Expression {
        match self {
            Accumulator::AddToSet(e)
            | Accumulator::Push(e)
            | Accumulator::First(e)
            | Accumulator::Last(e)
            | Accumulator::Max(e)
            | Accumulator::Min(e)
            | Accumulator::Avg(e)
            | Accumulator::Sum(e) => e,
        }
    }

    pub fn with_arg(&self, arg: Expression) -> Accumulator {
        match self {
            Accumulator::AddToSet(_) => Accumulator::AddToSet(arg),
            Accumulator::Push(_) => Accumulator::Push(arg),
            Accumulator::First(_) => Accumulator::First(arg),
            Accumulator::Last(_) => Accumulator::Last(arg),
            Accumulator::Max(_) => Accumulator::Max(arg),
            Accumulator::Min(_) => Accumulator::Min(arg),
            Accumulator::Avg(_) => Accumulator::Avg(arg),
            Accumulator::Sum(_) => Accumulator::Sum(arg),
        }
    }

    /// Whether this accumulator's operator requires its argument to reduce
    /// to a bare `$var` reference after inlining (spec §4.F
    /// `inlineGroupProjects`).
    pub fn requires_var_arg(&self) -> bool {
        matches!(self, Accumulator::AddToSet(_) | Accumulator::Push(_))
    }

    fn name(&self) -> &'static str {
        match self {
            Accumulator::AddToSet(_) => "$addToSet",
            Accumulator::Push(_) => "$push",
            Accumulator::First(_) => "$first",
            Accumulator::Last(_) => "$last",
            Accumulator::Max(_) => "$max",
            Accumulator::Min(_) => "$min",
            Accumulator::Avg(_) => "$avg",
            Accumulator::Sum(_) => "$sum",
        }
    }
}

impl fmt::Display for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.arg())
    }
}

/// An insertion-ordered `field_name -> Accumulator` mapping (spec §3).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grouped(Vec<(String, Accumulator)>);

impl Grouped {
    pub fn new() -> Self {
        Grouped(Vec::new())
    }

    pub fn from_fields(fields: impl IntoIterator<Item = (String, Accumulator)>) -> Self {
        Grouped(fields.into_iter().collect())
    }

    pub fn insert(&mut self, name: impl Into<String>, acc: Accumulator) {
        let name = name.into();
        if let Some(existing) = self.0.iter_mut().find(|(k, _)| *k == name) {
            existing.1 = acc;
        } else {
            self.0.push((name, acc));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Accumulator> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Accumulator)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[(String, Accumulator)] {
        &self.0
    }
}

impl fmt::Display for Grouped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_handling_dominance_prefers_include_then_exclude() {
        assert_eq!(
            IdHandling::dominant(IdHandling::IgnoreId, IdHandling::IncludeId),
            IdHandling::IncludeId
        );
        assert_eq!(
            IdHandling::dominant(IdHandling::ExcludeId, IdHandling::IgnoreId),
            IdHandling::ExcludeId
        );
    }

    #[test]
    fn reshape_insert_preserves_first_insertion_position() {
        let mut r = Reshape::new();
        r.insert("a", Shape::Leaf(Expression::Include));
        r.insert("b", Shape::Leaf(Expression::Include));
        r.insert("a", Shape::Leaf(Expression::Literal(Data::Int(1.into()))));
        let keys: Vec<&str> = r.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn doc_var_id_var_is_recognized() {
        assert!(DocVar::id_var().is_id_var());
        assert!(!DocVar::root_path(FieldPath::single("name")).is_id_var());
    }
}
