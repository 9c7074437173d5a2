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

//! `$Project` / `$Unwind` commutation ahead of a `$Group` (spec §4.F
//! `inlineProjectUnwindGroup`): given `$Project -> $Unwind -> $Group` where
//! the project is a pure rename of every field, and the unwound field is
//! one of those renames with a unique target that also names a `$Group`
//! grouping key, swaps the project and the unwind. A pure rename commutes
//! freely with `$Unwind` on one of its own fields, and moving the project
//! to sit directly above `$Group` is what lets `inline_group_projects` (and
//! `inline_project`, in `inline_project.rs`) reach it in a later pass.

use std::collections::HashMap;

use mongosql_common::{FieldPath, Leaf};
use mongosql_workflow::{DocVar, Expression, Reshape, Scope, Shape, Workflow};

#[tracing::instrument(level = "debug", skip_all)]
pub fn inline_project_unwind_group(workflow: &Workflow) -> Workflow {
    workflow.rewrite(&|node| try_swap(node))
}

fn try_swap(node: &Workflow) -> Option<Workflow> {
    let Workflow::Group { source, by, grouped } = node else { return None };
    let Workflow::Unwind { source: unwind_source, field, preserve_null_and_empty } = source.as_ref()
    else {
        return None;
    };
    let Workflow::Project { source: proj_source, shape, id } = unwind_source.as_ref() else {
        return None;
    };

    let rename_map = rename_project_group(shape, by)?;
    let unwind_name = single_name(field.path.as_ref())?;
    let old_head = unique_source_of(&rename_map, &unwind_name)?;

    let new_field = DocVar { scope: field.scope, path: Some(FieldPath::single(old_head)) };
    let swapped_unwind =
        Workflow::unwind((**proj_source).clone(), new_field, *preserve_null_and_empty);
    let swapped = Workflow::project(swapped_unwind, shape.clone(), *id);

    Some(Workflow::group(swapped, by.clone(), grouped.clone()))
}

/// Every shape entry must be a pure `newName -> $var(oldHead)` rename, or
/// this fails outright. Entries whose `oldHead` is also a key of `by` are
/// recorded `oldHead -> [newName, ...]`.
fn rename_project_group(shape: &Reshape, by: &Reshape) -> Option<HashMap<String, Vec<String>>> {
    let group_keys: Vec<&str> = by.fields().iter().map(|(k, _)| k.as_str()).collect();
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (new_name, s) in shape.fields() {
        let Shape::Leaf(Expression::Var(d)) = s else { return None };
        if d.scope != Scope::Root {
            return None;
        }
        let path = d.path.as_ref()?;
        if path.len() != 1 {
            return None;
        }
        let Leaf::Name(old_head) = path.first() else { return None };
        if group_keys.contains(&old_head.as_str()) {
            map.entry(old_head.clone()).or_default().push(new_name.clone());
        }
    }
    Some(map)
}

fn single_name(path: Option<&FieldPath>) -> Option<String> {
    let p = path?;
    if p.len() != 1 {
        return None;
    }
    match p.first() {
        Leaf::Name(n) => Some(n.clone()),
        Leaf::Index(_) => None,
    }
}

fn unique_source_of(map: &HashMap<String, Vec<String>>, target: &str) -> Option<String> {
    map.iter().find(|(_, v)| v.len() == 1 && v[0] == target).map(|(k, _)| k.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_workflow::{Grouped, IdHandling};

    fn var(name: &str) -> Expression {
        Expression::var(DocVar::root_path(FieldPath::single(name)))
    }

    #[test]
    fn swaps_project_and_unwind_when_the_rename_is_unique() {
        let mut shape = Reshape::new();
        shape.insert("items", Shape::Leaf(var("arr")));
        let mut by = Reshape::new();
        by.insert("items", Shape::Leaf(var("items")));

        let w = Workflow::group(
            Workflow::unwind(
                Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId),
                DocVar::root_path(FieldPath::single("items")),
                false,
            ),
            by,
            Grouped::new(),
        );
        let result = inline_project_unwind_group(&w);
        match result {
            Workflow::Group { source, .. } => match *source {
                Workflow::Project { source, .. } => match *source {
                    Workflow::Unwind { source, field, .. } => {
                        assert!(matches!(*source, Workflow::Read(_)));
                        assert_eq!(field, DocVar::root_path(FieldPath::single("arr")));
                    }
                    _ => panic!("expected Unwind directly above Read"),
                },
                _ => panic!("expected Project directly below Group"),
            },
            _ => panic!("expected Group"),
        }
    }

    #[test]
    fn leaves_tree_alone_when_project_is_not_a_pure_rename() {
        let mut shape = Reshape::new();
        shape.insert("items", Shape::Leaf(Expression::op("$concatArrays", vec![var("a"), var("b")])));
        let by = Reshape::new();
        let w = Workflow::group(
            Workflow::unwind(
                Workflow::project(Workflow::read("coll"), shape, IdHandling::IgnoreId),
                DocVar::root_path(FieldPath::single("items")),
                false,
            ),
            by,
            Grouped::new(),
        );
        assert_eq!(inline_project_unwind_group(&w), w);
    }
}
