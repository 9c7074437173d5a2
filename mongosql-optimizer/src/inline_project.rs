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

//! Consecutive `$Project` fusion (spec §4.F `inlineProject`): collapses a
//! `$Project` stacked directly on another into one, resolving the outer
//! shape's `$var`/`$include()` fields through the inner shape via
//! [`crate::shape_resolver::inline_project`].

use mongosql_workflow::{IdHandling, Reshape, Workflow};

use crate::shape_resolver;

#[tracing::instrument(level = "debug", skip_all)]
pub fn inline_consecutive_projects(workflow: &Workflow) -> Workflow {
    workflow.rewrite(&|node| fuse(node))
}

fn fuse(node: &Workflow) -> Option<Workflow> {
    let Workflow::Project { source, shape, id } = node else { return None };
    let Workflow::Project { source: inner_source, shape: inner_shape, id: inner_id } = source.as_ref()
    else {
        return None;
    };
    let fused_shape: Reshape = shape_resolver::inline_project(shape, &[inner_shape]);
    let fused_id = IdHandling::dominant(*id, *inner_id);
    let fused = Workflow::Project { source: inner_source.clone(), shape: fused_shape, id: fused_id };
    Some(fuse(&fused).unwrap_or(fused))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongosql_common::{Data, FieldPath};
    use mongosql_workflow::{DocVar, Expression, Shape};

    fn var(name: &str) -> Expression {
        Expression::var(DocVar::root_path(FieldPath::single(name)))
    }

    #[test]
    fn fuses_two_stacked_projects() {
        let mut inner = Reshape::new();
        inner.insert("a", Shape::Leaf(var("x")));
        let mut outer = Reshape::new();
        outer.insert("keep", Shape::Leaf(var("a")));
        let w = Workflow::project(
            Workflow::project(Workflow::read("coll"), inner, IdHandling::IgnoreId),
            outer,
            IdHandling::IgnoreId,
        );
        let fused = inline_consecutive_projects(&w);
        match fused {
            Workflow::Project { source, shape, .. } => {
                assert!(matches!(*source, Workflow::Read(_)));
                assert_eq!(shape.get("keep"), Some(&Shape::Leaf(var("x"))));
            }
            _ => panic!("expected a single fused Project"),
        }
    }

    #[test]
    fn fuses_a_chain_of_three_projects() {
        let mut p1 = Reshape::new();
        p1.insert("b", Shape::Leaf(var("a")));
        let mut p2 = Reshape::new();
        p2.insert("c", Shape::Leaf(var("b")));
        let mut p3 = Reshape::new();
        p3.insert("d", Shape::Leaf(var("c")));
        let w = Workflow::project(
            Workflow::project(
                Workflow::project(Workflow::read("coll"), p1, IdHandling::IgnoreId),
                p2,
                IdHandling::IgnoreId,
            ),
            p3,
            IdHandling::IgnoreId,
        );
        let fused = inline_consecutive_projects(&w);
        match fused {
            Workflow::Project { source, shape, .. } => {
                assert!(matches!(*source, Workflow::Read(_)));
                assert_eq!(shape.get("d"), Some(&Shape::Leaf(var("a"))));
            }
            _ => panic!("expected a single fused Project"),
        }
        let _ = Data::Int(1.into());
    }

    #[test]
    fn unrelated_stages_are_left_alone() {
        let w = Workflow::match_(Workflow::read("coll"), Expression::literal(Data::Bool(true)));
        assert_eq!(inline_consecutive_projects(&w), w);
    }
}
