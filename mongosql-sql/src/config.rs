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

//! `compile()`'s configuration knobs, in the same spirit as
//! `datafusion_sql::planner::ParserOptions`.

/// Compiler-wide options threaded into a single [`crate::compiler::compile`]
/// call.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Case-folds identifiers (column names, relation names) before
    /// comparing them, matching unquoted-SQL-identifier semantics.
    pub enable_ident_normalization: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig { enable_ident_normalization: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_disables_ident_normalization() {
        assert!(!CompilerConfig::default().enable_ident_normalization);
    }
}
