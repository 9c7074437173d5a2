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

//! The relational/functional logical plan IR produced by the SQL compiler
//! (spec §3/§4.B): `Read`, `Constant`, `Free`, `Let`, `Invoke` over the
//! fixed function catalog.

use std::fmt;
use std::sync::Arc;

use mongosql_common::Data;

use crate::catalog::Function;

/// Recursive logical plan variant. Trees are small and owned by value;
/// there is no sharing and no arena — rebuild on rewrite is cheap (spec §9).
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// Reads a named source collection/table.
    Read(String),
    /// A literal constant.
    Constant(Data),
    /// A lexically-scoped variable reference, resolved by name against the
    /// nearest enclosing `Let`.
    Free(String),
    /// Introduces a binding visible as `Free(name)` within `body`.
    Let {
        name: String,
        binding: Box<LogicalPlan>,
        body: Box<LogicalPlan>,
    },
    /// Applies a catalog function to its arguments.
    Invoke {
        function: &'static Function,
        args: Vec<LogicalPlan>,
    },
}

impl PartialEq for LogicalPlan {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LogicalPlan::Read(a), LogicalPlan::Read(b)) => a == b,
            (LogicalPlan::Constant(a), LogicalPlan::Constant(b)) => a == b,
            (LogicalPlan::Free(a), LogicalPlan::Free(b)) => a == b,
            (
                LogicalPlan::Let { name: n1, binding: b1, body: y1 },
                LogicalPlan::Let { name: n2, binding: b2, body: y2 },
            ) => n1 == n2 && b1 == b2 && y1 == y2,
            (
                LogicalPlan::Invoke { function: f1, args: a1 },
                LogicalPlan::Invoke { function: f2, args: a2 },
            ) => f1.name == f2.name && a1 == a2,
            _ => false,
        }
    }
}

impl LogicalPlan {
    pub fn invoke(function: &'static Function, args: Vec<LogicalPlan>) -> LogicalPlan {
        LogicalPlan::Invoke { function, args }
    }

    pub fn let_(name: impl Into<String>, binding: LogicalPlan, body: LogicalPlan) -> LogicalPlan {
        LogicalPlan::Let {
            name: name.into(),
            binding: Box::new(binding),
            body: Box::new(body),
        }
    }

    /// Direct children of this node, in evaluation order.
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Read(_) | LogicalPlan::Constant(_) | LogicalPlan::Free(_) => vec![],
            LogicalPlan::Let { binding, body, .. } => vec![binding.as_ref(), body.as_ref()],
            LogicalPlan::Invoke { args, .. } => args.iter().collect(),
        }
    }

    /// Rebuilds this node from newly-produced children, preserving arity.
    fn with_children(&self, mut children: Vec<LogicalPlan>) -> LogicalPlan {
        match self {
            LogicalPlan::Read(_) | LogicalPlan::Constant(_) | LogicalPlan::Free(_) => self.clone(),
            LogicalPlan::Let { name, .. } => {
                let body = children.pop().expect("Let has a body child");
                let binding = children.pop().expect("Let has a binding child");
                LogicalPlan::Let {
                    name: name.clone(),
                    binding: Box::new(binding),
                    body: Box::new(body),
                }
            }
            LogicalPlan::Invoke { function, .. } => LogicalPlan::Invoke {
                function,
                args: children,
            },
        }
    }

    /// Bottom-up catamorphism: folds `f` over every node, children first.
    pub fn fold<T>(&self, f: &mut impl FnMut(&LogicalPlan, Vec<T>) -> T) -> T {
        let child_results = self.children().into_iter().map(|c| c.fold(f)).collect();
        f(self, child_results)
    }

    /// Replaces every subtree (including this node) for which `f` yields
    /// `Some(replacement)`; other nodes are rebuilt from their (possibly
    /// rewritten) children but are otherwise left intact. Bottom-up.
    pub fn rewrite(&self, f: &impl Fn(&LogicalPlan) -> Option<LogicalPlan>) -> LogicalPlan {
        let rewritten_children: Vec<LogicalPlan> =
            self.children().into_iter().map(|c| c.rewrite(f)).collect();
        let rebuilt = self.with_children(rewritten_children);
        f(&rebuilt).unwrap_or(rebuilt)
    }

    /// Anamorphism: unfolds a `LogicalPlan` from a seed value by repeatedly
    /// applying `step`, which returns either a terminal plan or a node shape
    /// together with the seeds for its children.
    pub fn unfold<S: Clone>(seed: S, step: &impl Fn(S) -> Unfolded<S>) -> LogicalPlan {
        match step(seed) {
            Unfolded::Done(plan) => plan,
            Unfolded::Invoke { function, child_seeds } => LogicalPlan::Invoke {
                function,
                args: child_seeds
                    .into_iter()
                    .map(|s| LogicalPlan::unfold(s, step))
                    .collect(),
            },
        }
    }

    /// All `Free` names referenced anywhere in this tree that are not bound
    /// by an enclosing `Let` within the tree itself.
    pub fn free_names(&self) -> Vec<String> {
        fn go(plan: &LogicalPlan, bound: &[String], out: &mut Vec<String>) {
            match plan {
                LogicalPlan::Free(name) => {
                    if !bound.contains(name) && !out.contains(name) {
                        out.push(name.clone());
                    }
                }
                LogicalPlan::Let { name, binding, body } => {
                    go(binding, bound, out);
                    let mut bound = bound.to_vec();
                    bound.push(name.clone());
                    go(body, &bound, out);
                }
                LogicalPlan::Invoke { args, .. } => {
                    for a in args {
                        go(a, bound, out);
                    }
                }
                LogicalPlan::Read(_) | LogicalPlan::Constant(_) => {}
            }
        }
        let mut out = Vec::new();
        go(self, &[], &mut out);
        out
    }
}

/// The result of one step of [`LogicalPlan::unfold`].
pub enum Unfolded<S> {
    Done(LogicalPlan),
    Invoke {
        function: &'static Function,
        child_seeds: Vec<S>,
    },
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalPlan::Read(name) => write!(f, "Read({name})"),
            LogicalPlan::Constant(d) => write!(f, "Constant({d})"),
            LogicalPlan::Free(name) => write!(f, "Free({name})"),
            LogicalPlan::Let { name, binding, body } => {
                write!(f, "Let({name} = {binding}, {body})")
            }
            LogicalPlan::Invoke { function, args } => {
                let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", function.name, rendered.join(", "))
            }
        }
    }
}

/// Convenience constructor for `MakeArrayN`-style literal arrays used
/// throughout the compiler (GROUP BY/ORDER BY key lists).
pub fn make_array(items: Vec<LogicalPlan>) -> LogicalPlan {
    LogicalPlan::Invoke {
        function: crate::catalog::structural::MAKE_ARRAY,
        args: items,
    }
}

pub type LogicalPlanRef = Arc<LogicalPlan>;

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_common::Data;

    #[test]
    fn rewrite_replaces_matching_subtrees_bottom_up() {
        let plan = LogicalPlan::let_(
            "x",
            LogicalPlan::Constant(Data::Int(1.into())),
            LogicalPlan::Free("x".to_string()),
        );
        let replaced = plan.rewrite(&|p| match p {
            LogicalPlan::Free(name) if name == "x" => {
                Some(LogicalPlan::Constant(Data::Int(42.into())))
            }
            _ => None,
        });
        match replaced {
            LogicalPlan::Let { body, .. } => {
                assert_eq!(*body, LogicalPlan::Constant(Data::Int(42.into())));
            }
            _ => panic!("expected Let"),
        }
    }

    #[test]
    fn free_names_respects_let_scoping() {
        let plan = LogicalPlan::let_(
            "x",
            LogicalPlan::Free("y".to_string()),
            LogicalPlan::Free("x".to_string()),
        );
        assert_eq!(plan.free_names(), vec!["y".to_string()]);
    }
}
