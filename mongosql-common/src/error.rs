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

//! The single error channel threaded through every compilation step.
//!
//! Every crate in the workspace returns [`Result<T>`]; there is no panic on
//! any user-facing path. Internal invariant violations (optimizer bugs, not
//! user errors) are `debug_assert!`-ed instead, per the error-handling design
//! in the specification: fail fast in debug, leave the input unchanged in
//! release.

use std::fmt;

use crate::types::Type;

/// The error taxonomy of the compiler core (spec §7).
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// An identifier resolves semantically to an unknown function.
    FunctionNotBound { name: String },
    /// An expression references a table context that was never established.
    CompiledTableMissing { name: String },
    /// An expression references a subtable that was never established.
    CompiledSubtableMissing { name: String },
    /// Provenance yielded zero named relations for an identifier.
    NoTableDefined { ident: String },
    /// Provenance yielded more than one named relation for an identifier.
    AmbiguousReference { ident: String, candidates: Vec<String> },
    /// A position syntactically requiring a literal got a non-literal.
    ExpectedLiteral { context: String },
    /// The untyper or partial typer rejected a shape.
    Type { expected: Type, observed: Type, hint: Option<String> },
    /// A temporal literal failed to parse.
    DateFormat { kind: String, input: String, hint: String },
    /// Any other compilation-logic violation.
    Generic { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FunctionNotBound { name } => {
                write!(f, "function not bound: {name}")
            }
            Error::CompiledTableMissing { name } => {
                write!(f, "no compiled table context for: {name}")
            }
            Error::CompiledSubtableMissing { name } => {
                write!(f, "no compiled subtable for: {name}")
            }
            Error::NoTableDefined { ident } => {
                write!(f, "no table defined for identifier: {ident}")
            }
            Error::AmbiguousReference { ident, candidates } => {
                write!(
                    f,
                    "ambiguous reference to {ident}, candidates: [{}]",
                    candidates.join(", ")
                )
            }
            Error::ExpectedLiteral { context } => {
                write!(f, "expected a literal in {context}")
            }
            Error::Type { expected, observed, hint } => {
                write!(f, "type error: expected {expected:?}, observed {observed:?}")?;
                if let Some(hint) = hint {
                    write!(f, " ({hint})")?;
                }
                Ok(())
            }
            Error::DateFormat { kind, input, hint } => {
                write!(f, "could not parse {kind} from {input:?}: {hint}")
            }
            Error::Generic { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Error {}

/// Shorthand for [`Error::Generic`], mirroring `datafusion_common`'s
/// `plan_err!`/`not_impl_err!` family.
macro_rules! generic_err {
    ($($arg:tt)*) => {
        $crate::error::Error::Generic { message: format!($($arg)*) }
    };
}

/// Shorthand for returning [`Error::Generic`] from the current function.
macro_rules! generic_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::generic_err!($($arg)*))
    };
}

pub(crate) use generic_bail;
pub(crate) use generic_err;
