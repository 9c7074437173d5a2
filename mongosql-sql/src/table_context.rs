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

//! Compiler state: the table-context stack, fresh-name counter, and
//! grouping memo threaded through a single `compile()` call (spec §4.D,
//! §9 "monadic state threading").

use mongosql_common::{Error, Result};
use mongosql_expr::{catalog::structural, LogicalPlan};

/// One scope's view of the relation(s) currently in play: the compiled
/// value for the whole scope (`root`) and, for a join, the individually
/// addressable relations it was built from (`subtables`, insertion-ordered
/// left-to-right). A plain `FROM t` scope has exactly one subtable, equal
/// to `root` itself.
#[derive(Debug, Clone)]
pub struct TableContext {
    pub root: LogicalPlan,
    subtables: Vec<(String, LogicalPlan)>,
}

impl TableContext {
    pub fn single(name: impl Into<String>, root: LogicalPlan) -> Self {
        TableContext { subtables: vec![(name.into(), root.clone())], root }
    }

    /// The merged record shape of this scope. For a single table this is
    /// just its root; for a join it is the left-to-right `ObjectConcat` of
    /// every subtable, with earlier (left) relations winning field
    /// conflicts — `ObjectConcat`'s later argument overrides the earlier
    /// one, so the fold order below lists left last.
    pub fn full(&self) -> LogicalPlan {
        let mut iter = self.subtables.iter().rev();
        let mut acc = iter
            .next()
            .expect("a TableContext always has at least one subtable")
            .1
            .clone();
        for (_, plan) in iter {
            acc = LogicalPlan::invoke(&structural::OBJECT_CONCAT, vec![acc, plan.clone()]);
        }
        acc
    }

    pub fn subtable(&self, name: &str) -> Option<&LogicalPlan> {
        self.subtables.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn relation_names(&self) -> Vec<&str> {
        self.subtables.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Merges two contexts under a JOIN: the union of both sides'
    /// subtables, left-wins on a duplicate relation name, both sides
    /// individually addressable via their own name afterward.
    pub fn join(left: TableContext, right: TableContext, joined_root: LogicalPlan) -> TableContext {
        let mut subtables = left.subtables;
        for (name, plan) in right.subtables {
            if !subtables.iter().any(|(n, _)| *n == name) {
                subtables.push((name, plan));
            }
        }
        TableContext { root: joined_root, subtables }
    }
}

/// The current pipeline binding (the `GroupBy` result, or the `HAVING`
/// filter over it when one ran) and the memoized, already-compiled `GROUP
/// BY` key expressions — compiled against the pre-group row. A later
/// reference to the pre-group row is rewritten to `grouped_src`, and if the
/// rewritten expression then matches one of the identically rewritten
/// `keys`, it is recognized as a grouped key column and wrapped in
/// `Arbitrary` (spec §4.D "grouped-reference rewrite").
#[derive(Debug, Clone)]
pub struct GroupingMemo {
    pub grouped_src: LogicalPlan,
    pub keys: Vec<LogicalPlan>,
}

/// `(tree, fields, tableContextStack, nameCounter, groupingMemo)` (spec
/// §4.D), minus `tree` which is simply the function's return value.
pub struct CompilerState {
    /// The column names currently in scope, used to tell a plain column
    /// reference apart from a table-qualified one.
    pub fields: Vec<String>,
    pub grouping_memo: Option<GroupingMemo>,
    context_stack: Vec<TableContext>,
    name_counter: u64,
    /// Mirrors `CompilerConfig::enable_ident_normalization`: when set,
    /// identifier comparisons (field lookups, relation-name matching) fold
    /// case first, the same case-insensitive-by-default behavior
    /// `datafusion_sql::planner::ParserOptions` gives unquoted SQL idents.
    pub ident_case_fold: bool,
}

impl Default for CompilerState {
    fn default() -> Self {
        CompilerState::new()
    }
}

impl CompilerState {
    pub fn new() -> Self {
        CompilerState {
            fields: Vec::new(),
            grouping_memo: None,
            context_stack: Vec::new(),
            name_counter: 0,
            ident_case_fold: false,
        }
    }

    /// Normalizes an identifier per `ident_case_fold` before it is compared
    /// against `fields`/relation names.
    pub fn normalize_ident(&self, name: &str) -> String {
        if self.ident_case_fold {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Monotonic `"tmp" + n` generator; these never collide with user
    /// identifiers by validator precondition (spec §4.D).
    pub fn fresh_name(&mut self) -> String {
        let name = format!("tmp{}", self.name_counter);
        self.name_counter += 1;
        name
    }

    pub fn push_context(&mut self, ctx: TableContext) -> ContextGuard<'_> {
        self.context_stack.push(ctx);
        ContextGuard { state: self }
    }

    pub fn current_context(&self) -> Result<&TableContext> {
        self.context_stack
            .last()
            .ok_or(Error::CompiledTableMissing { name: "<root>".to_string() })
    }

    pub fn resolve_subtable(&self, name: &str) -> Result<&LogicalPlan> {
        self.current_context()?
            .subtable(name)
            .ok_or_else(|| Error::CompiledSubtableMissing { name: name.to_string() })
    }

    /// Runs `f`, then unconditionally restores the context stack, in-scope
    /// fields, and grouping memo to their state before the call — the
    /// `whatif` operation (spec §9), which evaluates a branch to inspect its
    /// shape without letting it leak scope changes into the caller.
    pub fn whatif<T>(&mut self, f: impl FnOnce(&mut CompilerState) -> Result<T>) -> Result<T> {
        let saved_stack = self.context_stack.clone();
        let saved_fields = self.fields.clone();
        let saved_memo = self.grouping_memo.clone();
        let result = f(self);
        self.context_stack = saved_stack;
        self.fields = saved_fields;
        self.grouping_memo = saved_memo;
        result
    }
}

/// Pops the pushed [`TableContext`] when dropped, so a scope's context
/// never outlives the compilation step that introduced it.
pub struct ContextGuard<'a> {
    state: &'a mut CompilerState,
}

impl<'a> ContextGuard<'a> {
    pub fn state(&mut self) -> &mut CompilerState {
        self.state
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.state.context_stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_common::Data;

    #[test]
    fn fresh_names_are_monotonic_and_collision_free() {
        let mut state = CompilerState::new();
        assert_eq!(state.fresh_name(), "tmp0");
        assert_eq!(state.fresh_name(), "tmp1");
    }

    #[test]
    fn context_guard_pops_on_drop() {
        let mut state = CompilerState::new();
        {
            let _guard = state.push_context(TableContext::single("t", LogicalPlan::Read("t".to_string())));
            assert!(state.current_context().is_ok());
        }
        assert!(state.current_context().is_err());
    }

    #[test]
    fn whatif_restores_state_even_on_success() {
        let mut state = CompilerState::new();
        state.fields.push("a".to_string());
        let _ = state.whatif(|s| {
            s.fields.push("b".to_string());
            Ok::<(), Error>(())
        });
        assert_eq!(state.fields, vec!["a".to_string()]);
    }

    #[test]
    fn join_merges_subtables_left_wins_on_duplicate() {
        let left = TableContext::single("t", LogicalPlan::Constant(Data::Int(1.into())));
        let right = TableContext::single("t", LogicalPlan::Constant(Data::Int(2.into())));
        let joined = TableContext::join(left, right, LogicalPlan::Free("joined".to_string()));
        assert_eq!(joined.subtable("t"), Some(&LogicalPlan::Constant(Data::Int(1.into()))));
    }
}
