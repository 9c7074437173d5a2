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

//! `optimize()`'s configuration knobs, in the same spirit as
//! `mongosql_sql::config::CompilerConfig`.

/// Optimizer-wide options threaded into a single [`crate::optimize`] call.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Upper bound on how many times the pass sequence (`deleteUnusedFields`
    /// → `reorderOps` → `inlineGroupProjects` → `inlineProjectUnwindGroup` →
    /// `inlineProject`) is re-run to a fixed point, and also the cap
    /// `reorderOps`'s own internal bottom-up rewrite loop uses. Bounds
    /// termination: each pass is individually convergent, but pass
    /// interleaving has no proven joint fixed-point bound (spec §9).
    pub max_coalesce_iterations: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig { max_coalesce_iterations: 16 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_iteration() {
        assert_eq!(OptimizerConfig::default().max_coalesce_iterations, 16);
    }
}
