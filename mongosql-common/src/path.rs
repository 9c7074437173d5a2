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

//! Field paths: non-empty sequences of [`Leaf`] addressing into a document.

use std::fmt;

/// One segment of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Leaf {
    Name(String),
    Index(i64),
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Name(n) => write!(f, "{n}"),
            Leaf::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Leaf {
    fn from(s: &str) -> Self {
        Leaf::Name(s.to_string())
    }
}

impl From<String> for Leaf {
    fn from(s: String) -> Self {
        Leaf::Name(s)
    }
}

impl From<i64> for Leaf {
    fn from(i: i64) -> Self {
        Leaf::Index(i)
    }
}

/// A non-empty, ordered sequence of [`Leaf`]s.
///
/// Two paths are in a prefix relationship iff one is an element-wise prefix
/// of the other; this is a strict *sequence* prefix, not a string prefix, so
/// `a.bcd` is never considered a prefix of `a.b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<Leaf>);

impl FieldPath {
    /// Builds a path from a non-empty vector of leaves.
    ///
    /// # Panics
    /// Panics if `leaves` is empty; callers construct paths from literal
    /// identifiers or other already-non-empty sources, so an empty path
    /// signals a caller bug rather than a user-facing error.
    pub fn new(leaves: Vec<Leaf>) -> Self {
        assert!(!leaves.is_empty(), "FieldPath must be non-empty");
        FieldPath(leaves)
    }

    pub fn single(leaf: impl Into<Leaf>) -> Self {
        FieldPath(vec![leaf.into()])
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.0
    }

    pub fn first(&self) -> &Leaf {
        &self.0[0]
    }

    /// The path with its first leaf removed, or `None` if this is a
    /// single-leaf path.
    pub fn rest(&self) -> Option<FieldPath> {
        if self.0.len() == 1 {
            None
        } else {
            Some(FieldPath(self.0[1..].to_vec()))
        }
    }

    /// Appends `other`'s leaves after this path's leaves.
    pub fn concat(&self, other: &FieldPath) -> FieldPath {
        let mut leaves = self.0.clone();
        leaves.extend(other.0.iter().cloned());
        FieldPath(leaves)
    }

    pub fn prepend(&self, leaves: &[Leaf]) -> FieldPath {
        let mut new_leaves = leaves.to_vec();
        new_leaves.extend(self.0.iter().cloned());
        FieldPath(new_leaves)
    }

    /// `self` is a (non-strict) prefix of `other`: every leaf of `self`
    /// matches the corresponding leaf of `other`, element-wise.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }

    /// True iff `self` and `other` are in a prefix relationship in either
    /// direction (used pervasively by `deleteUnusedFields`).
    pub fn overlaps(&self, other: &FieldPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// If `self` is a strict or non-strict prefix of `other`, the leaves of
    /// `other` past the shared prefix.
    pub fn relative_to(&self, other: &FieldPath) -> Option<FieldPath> {
        if !self.is_prefix_of(other) {
            return None;
        }
        let remaining: Vec<Leaf> = other.0[self.0.len()..].to_vec();
        if remaining.is_empty() {
            None
        } else {
            Some(FieldPath(remaining))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|l| l.to_string()).collect();
        write!(f, "{}", rendered.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_sequence_not_string() {
        let a_b = FieldPath::new(vec![Leaf::from("a"), Leaf::from("b")]);
        let a_bcd = FieldPath::new(vec![Leaf::from("a"), Leaf::from("bcd")]);
        assert!(!a_b.is_prefix_of(&a_bcd));
        assert!(!a_bcd.is_prefix_of(&a_b));
    }

    #[test]
    fn prefix_relationship_both_directions() {
        let a = FieldPath::single("a");
        let a_b = FieldPath::new(vec![Leaf::from("a"), Leaf::from("b")]);
        assert!(a.overlaps(&a_b));
        assert!(a_b.overlaps(&a));
        assert_eq!(a.relative_to(&a_b), Some(FieldPath::single("b")));
    }

    #[test]
    fn unrelated_paths_do_not_overlap() {
        let a = FieldPath::single("a");
        let b = FieldPath::single("b");
        assert!(!a.overlaps(&b));
    }
}
