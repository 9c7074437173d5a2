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

//! Lowers an annotated [`Select`] into a [`LogicalPlan`] (spec §4.D).
//!
//! `compile()` threads every intermediate relation through [`CompilerState`]
//! as a sequence of `(name, binding)` pairs (`bind`) rather than nesting
//! `Let`s as it goes — a `Let`'s body has to exist before the `Let` itself
//! can be built, so the nest is only assembled once, by [`wrap_lets`], after
//! the whole pipeline has run. A final [`inline_trivial_lets`] pass beta-
//! reduces away any binding referenced at most once, which is what turns the
//! fully-threaded internal form back into the flat trees spec §8's scenarios
//! show (a `Let` wrapping a name used exactly once is pure bookkeeping).

use std::collections::BTreeSet;

use mongosql_common::{Data, DataOrd, Error, Result};
use mongosql_expr::catalog::{aggregation, arithmetic, boolean, comparison, relational, set, string, structural};
use mongosql_expr::{make_array, Function, LogicalPlan};

use crate::ast::{AnnotatedExpr, BinOp, Expr, FromClause, JoinKind, Select, UnOp};
use crate::config::CompilerConfig;
use crate::table_context::{CompilerState, GroupingMemo, TableContext};

/// Compiles a fully-annotated `SELECT` into a `LogicalPlan` (spec §4.D).
#[tracing::instrument(level = "debug", skip_all)]
pub fn compile(select: &Select, config: &CompilerConfig) -> Result<LogicalPlan> {
    let mut state = CompilerState::new();
    state.ident_case_fold = config.enable_ident_normalization;
    let mut bindings: Vec<(String, LogicalPlan)> = Vec::new();
    let body = compile_select(select, &mut state, &mut bindings)?;
    let nested = wrap_lets(bindings, body);
    let flattened = inline_trivial_lets(&nested);
    tracing::debug!(?flattened, "compiled SELECT");
    Ok(flattened)
}

fn bind(state: &mut CompilerState, bindings: &mut Vec<(String, LogicalPlan)>, value: LogicalPlan) -> LogicalPlan {
    let name = state.fresh_name();
    bindings.push((name.clone(), value));
    LogicalPlan::Free(name)
}

fn wrap_lets(bindings: Vec<(String, LogicalPlan)>, body: LogicalPlan) -> LogicalPlan {
    bindings.into_iter().rev().fold(body, |acc, (name, binding)| LogicalPlan::let_(name, binding, acc))
}

fn str_const(s: impl Into<String>) -> LogicalPlan {
    LogicalPlan::Constant(Data::Str(s.into()))
}

fn object_project1(obj: LogicalPlan, name: &str) -> LogicalPlan {
    LogicalPlan::invoke(&structural::OBJECT_PROJECT, vec![obj, str_const(name)])
}

fn join_kind_token(kind: JoinKind) -> &'static str {
    match kind {
        JoinKind::Inner => "Inner",
        JoinKind::LeftOuter => "LeftOuter",
        JoinKind::RightOuter => "RightOuter",
        JoinKind::FullOuter => "FullOuter",
    }
}

fn binop_function(op: BinOp) -> &'static Function {
    match op {
        BinOp::Eq => &comparison::EQ,
        BinOp::Neq => &comparison::NEQ,
        BinOp::Lt => &comparison::LT,
        BinOp::Lte => &comparison::LTE,
        BinOp::Gt => &comparison::GT,
        BinOp::Gte => &comparison::GTE,
        BinOp::And => &boolean::AND,
        BinOp::Or => &boolean::OR,
        BinOp::Add => &arithmetic::ADD,
        BinOp::Sub => &arithmetic::SUBTRACT,
        BinOp::Mul => &arithmetic::MULTIPLY,
        BinOp::Div => &arithmetic::DIVIDE,
        BinOp::Mod => &arithmetic::MODULO,
    }
}

fn unop_function(op: UnOp) -> &'static Function {
    match op {
        UnOp::Not => &boolean::NOT,
        UnOp::Neg => &arithmetic::NEGATE,
        UnOp::IsNull => &boolean::IS_NULL,
    }
}

// --- FROM / JOIN (spec §4.D step 1) ---

fn compile_from(
    from: &FromClause,
    state: &mut CompilerState,
    bindings: &mut Vec<(String, LogicalPlan)>,
) -> Result<TableContext> {
    match from {
        FromClause::Table { name, alias } => {
            let relation = state.normalize_ident(alias.as_deref().unwrap_or(name));
            let read = bind(state, bindings, LogicalPlan::Read(name.clone()));
            Ok(TableContext::single(relation, read))
        }
        FromClause::Join { left, right, kind, on } => {
            let left_ctx = compile_from(left, state, bindings)?;
            let right_ctx = compile_from(right, state, bindings)?;
            let on_scope = TableContext::join(left_ctx.clone(), right_ctx.clone(), left_ctx.full());
            let on_compiled = {
                let mut guard = state.push_context(on_scope);
                compile_expr(on, guard.state(), &left_ctx.full())?
            };
            let join_invoke = LogicalPlan::invoke(
                &relational::JOIN,
                vec![left_ctx.root.clone(), right_ctx.root.clone(), on_compiled, str_const(join_kind_token(*kind))],
            );
            let joined_root = bind(state, bindings, join_invoke);
            Ok(TableContext::join(left_ctx, right_ctx, joined_root))
        }
    }
}

// --- Identifier resolution (spec §4.D "identifier resolution") ---

fn resolve_ident(name: &str, ae: &AnnotatedExpr, state: &CompilerState, record_root: &LogicalPlan) -> Result<LogicalPlan> {
    let normalized = state.normalize_ident(name);
    if state.fields.iter().any(|f| *f == normalized) {
        return Ok(object_project1(record_root.clone(), &normalized));
    }
    let relations = &ae.attr.provenance.relations;
    match relations.len() {
        0 => Err(Error::NoTableDefined { ident: name.to_string() }),
        1 => finish_ident(&relations[0], &normalized, state),
        _ => {
            if relations.iter().any(|r| state.normalize_ident(r) == normalized) {
                finish_ident(&normalized, &normalized, state)
            } else {
                Err(Error::AmbiguousReference { ident: name.to_string(), candidates: relations.clone() })
            }
        }
    }
}

fn finish_ident(relation: &str, name: &str, state: &CompilerState) -> Result<LogicalPlan> {
    let sub = state.resolve_subtable(relation)?;
    if relation == name {
        Ok(sub.clone())
    } else {
        Ok(object_project1(sub.clone(), name))
    }
}

// --- Expressions (spec §4.D, §6) ---

fn compile_expr(ae: &AnnotatedExpr, state: &mut CompilerState, record_root: &LogicalPlan) -> Result<LogicalPlan> {
    match &ae.expr {
        Expr::Literal(d) => Ok(LogicalPlan::Constant(d.clone())),
        Expr::Ident(name) => resolve_ident(name, ae, state, record_root),
        Expr::Binop { op, left, right } => {
            let l = compile_expr(left, state, record_root)?;
            let r = compile_expr(right, state, record_root)?;
            Ok(LogicalPlan::invoke(binop_function(*op), vec![l, r]))
        }
        Expr::Unop { op, operand } => {
            let o = compile_expr(operand, state, record_root)?;
            Ok(LogicalPlan::invoke(unop_function(*op), vec![o]))
        }
        Expr::InvokeFunction { name, args } => {
            let function = ae.attr.func_binding.ok_or_else(|| Error::FunctionNotBound { name: name.clone() })?;
            let compiled: Vec<LogicalPlan> =
                args.iter().map(|a| compile_expr(a, state, record_root)).collect::<Result<_>>()?;
            Ok(LogicalPlan::invoke(function, compiled))
        }
        Expr::Like { expr, pattern, escape } => {
            let compiled_expr = compile_expr(expr, state, record_root)?;
            let pattern_str = literal_str(pattern, "LIKE pattern")?;
            let escape_str = match escape {
                Some(e) => Some(literal_str(e, "LIKE ESCAPE")?),
                None => None,
            };
            let escape_char = crate::like::parse_escape(escape_str.as_deref())?;
            let regex = crate::like::like_pattern_to_regex(&pattern_str, escape_char)?;
            Ok(LogicalPlan::invoke(&string::SEARCH, vec![compiled_expr, str_const(regex)]))
        }
        Expr::Match { operand, arms, or_else } => {
            let compiled_operand = compile_expr(operand, state, record_root)?;
            let mut acc = match or_else {
                Some(e) => compile_expr(e, state, record_root)?,
                None => LogicalPlan::Constant(Data::Null),
            };
            for (value, result) in arms.iter().rev() {
                let compiled_value = compile_expr(value, state, record_root)?;
                let compiled_result = compile_expr(result, state, record_root)?;
                let guard = LogicalPlan::invoke(&comparison::EQ, vec![compiled_operand.clone(), compiled_value]);
                acc = LogicalPlan::invoke(&boolean::COND, vec![guard, compiled_result, acc]);
            }
            Ok(acc)
        }
        Expr::Switch { arms, or_else } => {
            let mut acc = match or_else {
                Some(e) => compile_expr(e, state, record_root)?,
                None => LogicalPlan::Constant(Data::Null),
            };
            for (guard, result) in arms.iter().rev() {
                let compiled_guard = compile_expr(guard, state, record_root)?;
                let compiled_result = compile_expr(result, state, record_root)?;
                acc = LogicalPlan::invoke(&boolean::COND, vec![compiled_guard, compiled_result, acc]);
            }
            Ok(acc)
        }
        Expr::Splice(_) => Err(Error::Generic {
            message: "Splice may only appear as a top-level SELECT projection item".to_string(),
        }),
        Expr::SetLiteral(items) => {
            let mut set = BTreeSet::new();
            for item in items {
                let Expr::Literal(d) = &item.expr else {
                    return Err(Error::ExpectedLiteral { context: "set literal element".to_string() });
                };
                set.insert(DataOrd(d.clone()));
            }
            Ok(LogicalPlan::Constant(Data::Set(set)))
        }
        Expr::ArrayLiteral(items) => {
            let compiled: Vec<LogicalPlan> =
                items.iter().map(|i| compile_expr(i, state, record_root)).collect::<Result<_>>()?;
            Ok(make_array(compiled))
        }
    }
}

fn literal_str(ae: &AnnotatedExpr, context: &str) -> Result<String> {
    match &ae.expr {
        Expr::Literal(Data::Str(s)) => Ok(s.clone()),
        _ => Err(Error::ExpectedLiteral { context: context.to_string() }),
    }
}

// --- GROUP BY's memoized-key rewrite (spec §4.D "grouped-reference
// rewrite"): every occurrence of the pre-group row (`root_plan`) inside a
// HAVING/SELECT expression is replaced by the per-group row binding
// (`groupedSrc`); if the whole rewritten expression then structurally
// matches one of the (identically rewritten) GROUP BY keys, it is wrapped in
// `Arbitrary` since every row of a group agrees on its own grouping key. ---

fn apply_grouped_rewrite(expr: LogicalPlan, root_plan: &LogicalPlan, state: &CompilerState) -> LogicalPlan {
    let Some(memo) = &state.grouping_memo else {
        return expr;
    };
    let substitute = |p: &LogicalPlan| if p == root_plan { Some(memo.grouped_src.clone()) } else { None };
    let rewritten = expr.rewrite(&substitute);
    let rewritten_keys: Vec<LogicalPlan> = memo.keys.iter().map(|k| k.rewrite(&substitute)).collect();
    if rewritten_keys.iter().any(|k| *k == rewritten) {
        LogicalPlan::invoke(&aggregation::ARBITRARY, vec![rewritten])
    } else {
        rewritten
    }
}

// --- SELECT / buildRecord (spec §4.D step 5) ---

fn default_item_name(ae: &AnnotatedExpr, state: &mut CompilerState) -> String {
    match &ae.expr {
        Expr::Ident(name) => state.normalize_ident(name),
        _ => state.fresh_name(),
    }
}

fn fold_object_concat(pieces: Vec<LogicalPlan>) -> Result<LogicalPlan> {
    match pieces.len() {
        0 => Err(Error::Generic { message: "SELECT projection list is empty".to_string() }),
        1 => Ok(pieces.into_iter().next().unwrap()),
        _ => Ok(LogicalPlan::invoke(&structural::OBJECT_CONCAT, pieces)),
    }
}

/// Builds the SELECT record, or (for a bare `SELECT *`) the whole
/// table-context shape untouched (spec §4.D wildcard-projection note).
/// Returns the compiled record together with its named (non-splice) output
/// field names, which become the new in-scope `fields` list for later
/// clauses (ORDER BY referencing a SELECT alias).
///
/// Projection items are rooted at `current` — the output of WHERE/GROUP
/// BY/HAVING, whichever ran last — so the record stays wired into the
/// pipeline stage that produced it instead of reaching back to the bare
/// FROM-time row. The one exception is a grouped SELECT: its items must be
/// compiled against the same pre-group row the GROUP BY keys were (`ctx.
/// full()`), so `apply_grouped_rewrite` can recognize and retarget them at
/// `grouped_src`.
fn build_select_record(
    select: &Select,
    state: &mut CompilerState,
    ctx: &TableContext,
    current: &LogicalPlan,
) -> Result<(LogicalPlan, Vec<String>)> {
    if select.wildcard {
        return Ok((current.clone(), Vec::new()));
    }
    let root = if state.grouping_memo.is_some() { ctx.full() } else { current.clone() };
    let mut pieces = Vec::with_capacity(select.projection.len());
    let mut names = Vec::new();
    for item in &select.projection {
        match &item.expr.expr {
            Expr::Splice(inner) => {
                let compiled = compile_expr(inner, state, &root)?;
                pieces.push(apply_grouped_rewrite(compiled, &root, state));
            }
            _ => {
                let name = item.alias.clone().map(|a| state.normalize_ident(&a)).unwrap_or_else(|| default_item_name(&item.expr, state));
                let mut compiled = compile_expr(&item.expr, state, &root)?;
                compiled = apply_grouped_rewrite(compiled, &root, state);
                if matches!(item.expr.expr, Expr::Literal(_)) {
                    compiled = LogicalPlan::invoke(&boolean::CONSTANTLY, vec![compiled, current.clone()]);
                }
                pieces.push(LogicalPlan::invoke(&structural::MAKE_OBJECT, vec![str_const(name.clone()), compiled]));
                names.push(name);
            }
        }
    }
    Ok((fold_object_concat(pieces)?, names))
}

// --- DISTINCT / DISTINCT BY (spec §4.D step 8): when synthetic fields
// exist, the uniqueness key is the record with them stripped (via a
// DeleteField chain), but the synthetic fields keep riding along on the rows
// themselves until the final prune (step 11); with none, a plain whole-row
// Distinct applies. This compiler never currently introduces a synthetic
// hidden-sort-key field (see DESIGN.md) so `synthetic_fields` is always
// empty in practice; the DistinctBy branch is still implemented and tested
// directly for fidelity to spec §4.D/§GLOSSARY. ---

fn strip_fields(mut current: LogicalPlan, synthetic_fields: &[String]) -> LogicalPlan {
    for name in synthetic_fields {
        current = LogicalPlan::invoke(&structural::DELETE_FIELD, vec![current, str_const(name.clone())]);
    }
    current
}

fn apply_distinct(
    current: LogicalPlan,
    synthetic_fields: &[String],
    state: &mut CompilerState,
    bindings: &mut Vec<(String, LogicalPlan)>,
) -> LogicalPlan {
    let invoke = if synthetic_fields.is_empty() {
        LogicalPlan::invoke(&set::DISTINCT, vec![current])
    } else {
        let key = strip_fields(current.clone(), synthetic_fields);
        LogicalPlan::invoke(&set::DISTINCT_BY, vec![current, key])
    };
    bind(state, bindings, invoke)
}

// --- The full pipeline (spec §4.D) ---

fn compile_select(select: &Select, state: &mut CompilerState, bindings: &mut Vec<(String, LogicalPlan)>) -> Result<LogicalPlan> {
    let from = select
        .from
        .as_ref()
        .ok_or_else(|| Error::Generic { message: "SELECT without FROM is not supported".to_string() })?;
    let ctx = compile_from(from, state, bindings)?;
    let mut guard = state.push_context(ctx.clone());
    let state = guard.state();

    let mut current = ctx.full();

    // 2. WHERE
    if let Some(predicate) = &select.where_ {
        let compiled = compile_expr(predicate, state, &ctx.full())?;
        current = bind(state, bindings, LogicalPlan::invoke(&set::FILTER, vec![current, compiled]));
    }

    // 3. GROUP BY
    if !select.group_by.is_empty() {
        let keys: Vec<LogicalPlan> =
            select.group_by.iter().map(|k| compile_expr(k, state, &ctx.full())).collect::<Result<_>>()?;
        let key_array = make_array(keys.clone());
        current = bind(state, bindings, LogicalPlan::invoke(&set::GROUP_BY, vec![current, key_array]));
        // `grouped_src` must be a real binder, not a fresh free variable: it
        // is exactly the `GroupBy` result just bound above, so the rewrite
        // below retargets references at something the `Let` nest actually
        // produces.
        state.grouping_memo = Some(GroupingMemo { grouped_src: current.clone(), keys });
    }

    // 4. HAVING
    if let Some(having) = &select.having {
        let raw = compile_expr(having, state, &ctx.full())?;
        let rewritten = apply_grouped_rewrite(raw, &ctx.full(), state);
        current = bind(state, bindings, LogicalPlan::invoke(&set::FILTER, vec![current, rewritten]));
        // Keep the memo pointed at the latest stage so a grouped SELECT
        // item reconnects through the HAVING filter, not just the GroupBy.
        if let Some(memo) = state.grouping_memo.as_mut() {
            memo.grouped_src = current.clone();
        }
    }

    // 5. SELECT / buildRecord
    let (record, output_names) = build_select_record(select, state, &ctx, &current)?;
    current = record;
    state.fields = output_names;

    // 6. Squash
    current = bind(state, bindings, LogicalPlan::invoke(&structural::SQUASH, vec![current]));

    // 7. ORDER BY
    if !select.order_by.is_empty() {
        let mut keys = Vec::with_capacity(select.order_by.len());
        let mut tokens = Vec::with_capacity(select.order_by.len());
        for key in &select.order_by {
            keys.push(compile_expr(&key.expr, state, &current)?);
            tokens.push(str_const(if key.descending { "DESC" } else { "ASC" }));
        }
        let invoke = LogicalPlan::invoke(&set::ORDER_BY, vec![current, make_array(keys), make_array(tokens)]);
        current = bind(state, bindings, invoke);
    }

    // 8. DISTINCT / DISTINCT BY
    if select.distinct {
        let synthetic_fields: Vec<String> = Vec::new();
        current = apply_distinct(current, &synthetic_fields, state, bindings);
    }

    // 9. OFFSET
    if let Some(offset) = select.offset {
        current = bind(state, bindings, LogicalPlan::invoke(&set::DROP, vec![current, LogicalPlan::Constant(Data::Int(offset.into()))]));
    }

    // 10. LIMIT
    if let Some(limit) = select.limit {
        current = bind(state, bindings, LogicalPlan::invoke(&set::TAKE, vec![current, LogicalPlan::Constant(Data::Int(limit.into()))]));
    }

    // 11. Prune synthetic fields (none are currently introduced; see above).
    Ok(current)
}

// --- Trivial let inlining: a post-processing beta-reduction pass that
// substitutes away any `Let(name, binding, body)` whose `Free(name)` occurs
// at most once in `body`, turning the Let/Free-threaded pipeline above back
// into the flat trees spec §8's scenarios show. A standard copy-propagation
// simplification, not a spec-mandated step in its own right. ---

fn count_free(plan: &LogicalPlan, name: &str) -> usize {
    match plan {
        LogicalPlan::Free(n) => {
            if n == name {
                1
            } else {
                0
            }
        }
        LogicalPlan::Read(_) | LogicalPlan::Constant(_) => 0,
        LogicalPlan::Let { name: n, binding, body } => {
            let in_binding = count_free(binding, name);
            if n == name {
                in_binding
            } else {
                in_binding + count_free(body, name)
            }
        }
        LogicalPlan::Invoke { args, .. } => args.iter().map(|a| count_free(a, name)).sum(),
    }
}

fn substitute_free(plan: &LogicalPlan, name: &str, value: &LogicalPlan) -> LogicalPlan {
    match plan {
        LogicalPlan::Free(n) if n == name => value.clone(),
        LogicalPlan::Read(_) | LogicalPlan::Constant(_) | LogicalPlan::Free(_) => plan.clone(),
        LogicalPlan::Let { name: n, binding, body } => {
            let new_binding = substitute_free(binding, name, value);
            let new_body = if n == name { (**body).clone() } else { substitute_free(body, name, value) };
            LogicalPlan::let_(n.clone(), new_binding, new_body)
        }
        LogicalPlan::Invoke { function, args } => {
            LogicalPlan::invoke(function, args.iter().map(|a| substitute_free(a, name, value)).collect())
        }
    }
}

fn inline_once(plan: &LogicalPlan) -> (LogicalPlan, bool) {
    match plan {
        LogicalPlan::Let { name, binding, body } => {
            let (binding, changed_binding) = inline_once(binding);
            let (body, changed_body) = inline_once(body);
            if count_free(&body, name) <= 1 {
                (substitute_free(&body, name, &binding), true)
            } else {
                (LogicalPlan::let_(name.clone(), binding, body), changed_binding || changed_body)
            }
        }
        LogicalPlan::Invoke { function, args } => {
            let mut changed = false;
            let new_args = args
                .iter()
                .map(|a| {
                    let (a, c) = inline_once(a);
                    changed |= c;
                    a
                })
                .collect();
            (LogicalPlan::invoke(function, new_args), changed)
        }
        other => (other.clone(), false),
    }
}

fn inline_trivial_lets(plan: &LogicalPlan) -> LogicalPlan {
    let mut current = plan.clone();
    loop {
        let (next, changed) = inline_once(&current);
        if !changed {
            return next;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attr, FromClause as FC, Provenance, SelectItem};

    fn select_star(table: &str) -> Select {
        Select {
            from: Some(FC::table(table)),
            wildcard: true,
            projection: vec![],
            ..Select::default()
        }
    }

    #[test]
    fn select_star_lowers_to_squash_of_the_table() {
        let plan = compile(&select_star("zips"), &CompilerConfig::default()).unwrap();
        match plan {
            LogicalPlan::Invoke { function, args } => {
                assert_eq!(function.name, "Squash");
                assert_eq!(args[0], LogicalPlan::Read("zips".to_string()));
            }
            other => panic!("expected Squash(Read), got {other}"),
        }
    }

    #[test]
    fn single_column_projection_matches_scenario_s1() {
        // SELECT city FROM zips
        let select = Select {
            from: Some(FC::table("zips")),
            projection: vec![SelectItem {
                expr: AnnotatedExpr::ident("city", Provenance::one("zips")),
                alias: Some("city".to_string()),
            }],
            ..Select::default()
        };
        let plan = compile(&select, &CompilerConfig::default()).unwrap();
        // Squash(MakeObject("city", ObjectProject(Read(zips), "city")))
        match plan {
            LogicalPlan::Invoke { function, args } if function.name == "Squash" => match &args[0] {
                LogicalPlan::Invoke { function, args } if function.name == "MakeObject" => {
                    assert_eq!(args[0], LogicalPlan::Constant(Data::Str("city".to_string())));
                    match &args[1] {
                        LogicalPlan::Invoke { function, args } if function.name == "ObjectProject" => {
                            assert_eq!(args[0], LogicalPlan::Read("zips".to_string()));
                            assert_eq!(args[1], LogicalPlan::Constant(Data::Str("city".to_string())));
                        }
                        other => panic!("expected ObjectProject, got {other}"),
                    }
                }
                other => panic!("expected MakeObject, got {other}"),
            },
            other => panic!("expected Squash, got {other}"),
        }
    }

    #[test]
    fn group_by_key_reference_is_wrapped_in_arbitrary() {
        // SELECT a FROM t GROUP BY a
        let select = Select {
            from: Some(FC::table("t")),
            group_by: vec![AnnotatedExpr::ident("a", Provenance::one("t"))],
            projection: vec![SelectItem {
                expr: AnnotatedExpr::ident("a", Provenance::one("t")),
                alias: Some("a".to_string()),
            }],
            ..Select::default()
        };
        let plan = compile(&select, &CompilerConfig::default()).unwrap();
        let rendered = plan.to_string();
        assert!(rendered.contains("Arbitrary("), "expected an Arbitrary-wrapped grouped key, got {rendered}");
        assert!(rendered.contains("GroupBy("));
    }

    #[test]
    fn count_star_does_not_get_wrapped_in_arbitrary() {
        // SELECT COUNT(1) FROM t GROUP BY a
        let count_fn = &aggregation::COUNT;
        let select = Select {
            from: Some(FC::table("t")),
            group_by: vec![AnnotatedExpr::ident("a", Provenance::one("t"))],
            projection: vec![SelectItem {
                expr: AnnotatedExpr::new(
                    Expr::InvokeFunction { name: "Count".to_string(), args: vec![AnnotatedExpr::literal(Data::Int(1.into()))] },
                    Attr::default().with_binding(count_fn),
                ),
                alias: Some("n".to_string()),
            }],
            ..Select::default()
        };
        let plan = compile(&select, &CompilerConfig::default()).unwrap();
        let rendered = plan.to_string();
        assert!(rendered.contains("Count(Constant(1))"));
    }

    #[test]
    fn like_lowers_to_an_anchored_search_regex() {
        // SELECT * FROM t WHERE name LIKE 'A\_%' ESCAPE '\'
        let select = Select {
            from: Some(FC::table("t")),
            where_: Some(AnnotatedExpr::new(
                Expr::Like {
                    expr: Box::new(AnnotatedExpr::ident("name", Provenance::one("t"))),
                    pattern: Box::new(AnnotatedExpr::literal(Data::Str("A\\_%".to_string()))),
                    escape: Some(Box::new(AnnotatedExpr::literal(Data::Str("\\".to_string())))),
                },
                Attr::default(),
            )),
            wildcard: true,
            ..Select::default()
        };
        let plan = compile(&select, &CompilerConfig::default()).unwrap();
        let rendered = plan.to_string();
        assert!(rendered.contains("Search("), "expected Search(...), got {rendered}");
        assert!(rendered.contains("^A_.*$"));
    }

    #[test]
    fn offset_and_limit_lower_to_drop_then_take() {
        let select = Select { from: Some(FC::table("t")), wildcard: true, offset: Some(5), limit: Some(10), ..Select::default() };
        let plan = compile(&select, &CompilerConfig::default()).unwrap();
        match plan {
            LogicalPlan::Invoke { function, args } if function.name == "Take" => {
                assert_eq!(args[1], LogicalPlan::Constant(Data::Int(10.into())));
                match &args[0] {
                    LogicalPlan::Invoke { function, args } if function.name == "Drop" => {
                        assert_eq!(args[1], LogicalPlan::Constant(Data::Int(5.into())));
                    }
                    other => panic!("expected Drop, got {other}"),
                }
            }
            other => panic!("expected Take, got {other}"),
        }
    }

    #[test]
    fn distinct_by_strips_synthetic_fields_before_comparing() {
        let current = LogicalPlan::Free("rows".to_string());
        let mut state = CompilerState::new();
        let mut bindings = Vec::new();
        let result = apply_distinct(current.clone(), &["tmpSort".to_string()], &mut state, &mut bindings);
        match result {
            LogicalPlan::Free(name) => {
                let (_, binding) = bindings.iter().find(|(n, _)| *n == name).unwrap();
                match binding {
                    LogicalPlan::Invoke { function, args } => {
                        assert_eq!(function.name, "DistinctBy");
                        assert_eq!(args[0], current);
                        match &args[1] {
                            LogicalPlan::Invoke { function, .. } => assert_eq!(function.name, "DeleteField"),
                            other => panic!("expected DeleteField key, got {other}"),
                        }
                    }
                    other => panic!("expected DistinctBy invoke, got {other}"),
                }
            }
            other => panic!("expected a Free binding, got {other}"),
        }
    }

    #[test]
    fn ambiguous_unqualified_identifier_across_a_join_is_rejected() {
        let select = Select {
            from: Some(FC::Join {
                left: Box::new(FC::table("a")),
                right: Box::new(FC::table("b")),
                kind: JoinKind::Inner,
                on: AnnotatedExpr::literal(Data::Bool(true)),
            }),
            projection: vec![SelectItem {
                expr: AnnotatedExpr::new(
                    Expr::Ident("x".to_string()),
                    Attr::new(Provenance { relations: vec!["a".to_string(), "b".to_string()] }),
                ),
                alias: Some("x".to_string()),
            }],
            ..Select::default()
        };
        let err = compile(&select, &CompilerConfig::default()).unwrap_err();
        assert!(matches!(err, Error::AmbiguousReference { .. }));
    }

    #[test]
    fn trivial_let_inlining_drops_single_use_bindings() {
        let plan = LogicalPlan::let_(
            "x",
            LogicalPlan::Constant(Data::Int(1.into())),
            LogicalPlan::invoke(&boolean::NOT, vec![LogicalPlan::Free("x".to_string())]),
        );
        let flattened = inline_trivial_lets(&plan);
        assert_eq!(flattened, LogicalPlan::invoke(&boolean::NOT, vec![LogicalPlan::Constant(Data::Int(1.into()))]));
    }

    #[test]
    fn trivial_let_inlining_keeps_bindings_used_twice() {
        let used_twice = LogicalPlan::invoke(
            &boolean::AND,
            vec![LogicalPlan::Free("x".to_string()), LogicalPlan::Free("x".to_string())],
        );
        let plan = LogicalPlan::let_("x", LogicalPlan::Constant(Data::Bool(true)), used_twice);
        let flattened = inline_trivial_lets(&plan);
        assert!(matches!(flattened, LogicalPlan::Let { .. }));
    }
}
