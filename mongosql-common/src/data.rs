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

//! The `Data` atom: the tagged union of runtime values the compiler reasons
//! about as constants, and that a Workflow ultimately produces.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as Json;

use crate::error::{Error, Result};

/// A duration, as parsed from an ISO-8601 interval literal such as
/// `P3DT12H30M15.0S`. Year/month fields are not supported (their length is
/// calendar-dependent), matching the spec's `DateFormatError` for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    /// Total duration expressed in whole milliseconds.
    pub millis: i64,
}

impl Interval {
    pub fn from_millis(millis: i64) -> Self {
        Interval { millis }
    }

    /// Parses an ISO-8601 duration of the `PnDTnHnMnS` form. Fails with
    /// [`Error::DateFormat`] if a year or month designator (`Y`, `M` before
    /// `T`) is present, or the string is otherwise malformed.
    pub fn parse(input: &str) -> Result<Self> {
        parse_interval(input)
    }
}

fn parse_interval(input: &str) -> Result<Interval> {
    let bad = |hint: &str| Error::DateFormat {
        kind: "Interval".to_string(),
        input: input.to_string(),
        hint: hint.to_string(),
    };
    let mut chars = input.chars().peekable();
    if chars.next() != Some('P') {
        return Err(bad("interval literals must start with 'P'"));
    }
    let mut millis: i64 = 0;
    let mut in_time = false;
    let mut num = String::new();
    for c in chars {
        match c {
            'T' => {
                in_time = true;
            }
            '0'..='9' | '.' => num.push(c),
            'Y' | 'M' if !in_time => {
                return Err(bad("year/month designators are not supported"));
            }
            'D' => {
                let days: f64 = num
                    .parse()
                    .map_err(|_| bad("invalid numeric field before 'D'"))?;
                millis += (days * 86_400_000.0) as i64;
                num.clear();
            }
            'H' => {
                let hours: f64 = num
                    .parse()
                    .map_err(|_| bad("invalid numeric field before 'H'"))?;
                millis += (hours * 3_600_000.0) as i64;
                num.clear();
            }
            'M' if in_time => {
                let minutes: f64 = num
                    .parse()
                    .map_err(|_| bad("invalid numeric field before 'M'"))?;
                millis += (minutes * 60_000.0) as i64;
                num.clear();
            }
            'S' => {
                let seconds: f64 = num
                    .parse()
                    .map_err(|_| bad("invalid numeric field before 'S'"))?;
                millis += (seconds * 1_000.0) as i64;
                num.clear();
            }
            _ => return Err(bad("unexpected character in interval literal")),
        }
    }
    if !num.is_empty() {
        return Err(bad("trailing numeric field without a designator"));
    }
    Ok(Interval { millis })
}

/// Tagged union of runtime value atoms (spec §3).
#[derive(Debug, Clone)]
pub enum Data {
    Null,
    Bool(bool),
    Int(BigInt),
    Dec(Decimal),
    Str(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Interval(Interval),
    Arr(Vec<Data>),
    /// Insertion-ordered mapping from field name to value.
    Obj(Vec<(String, Data)>),
    Set(BTreeSet<DataOrd>),
}

/// A `Data` value wrapped so it can live in a `BTreeSet`; total ordering is
/// only required among set elements, not across the whole `Data` domain.
#[derive(Debug, Clone)]
pub struct DataOrd(pub Data);

impl PartialEq for DataOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}
impl Eq for DataOrd {}
impl PartialOrd for DataOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DataOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Data {
    pub fn is_null(&self) -> bool {
        matches!(self, Data::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Data::Int(_) | Data::Dec(_))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            Data::Timestamp(_) | Data::Date(_) | Data::Time(_) | Data::Interval(_)
        )
    }

    /// SQL-visible ordering between two atoms of compatible type; `None` for
    /// atoms that are not meaningfully ordered against each other (e.g. a
    /// string against a timestamp). Numeric atoms are compared after
    /// promoting `Int` to `Dec` when the other side is `Dec`, matching the
    /// function catalog's arithmetic promotion rule.
    pub fn partial_cmp(&self, other: &Data) -> Option<Ordering> {
        use num_traits::ToPrimitive;
        match (self, other) {
            (Data::Null, Data::Null) => Some(Ordering::Equal),
            (Data::Bool(a), Data::Bool(b)) => Some(a.cmp(b)),
            (Data::Int(a), Data::Int(b)) => Some(a.cmp(b)),
            (Data::Dec(a), Data::Dec(b)) => a.partial_cmp(b),
            (Data::Int(a), Data::Dec(b)) => Decimal::from(a.to_i64()?).partial_cmp(b),
            (Data::Dec(a), Data::Int(b)) => a.partial_cmp(&Decimal::from(b.to_i64()?)),
            (Data::Str(a), Data::Str(b)) => Some(a.cmp(b)),
            (Data::Timestamp(a), Data::Timestamp(b)) => Some(a.cmp(b)),
            (Data::Date(a), Data::Date(b)) => Some(a.cmp(b)),
            (Data::Time(a), Data::Time(b)) => Some(a.cmp(b)),
            (Data::Interval(a), Data::Interval(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// A total order used only to give `Set` a canonical element order; not
    /// meant to reflect any SQL-visible comparison semantics (those live in
    /// the function catalog's comparison operators).
    fn total_cmp(&self, other: &Data) -> Ordering {
        fn rank(d: &Data) -> u8 {
            match d {
                Data::Null => 0,
                Data::Bool(_) => 1,
                Data::Int(_) => 2,
                Data::Dec(_) => 3,
                Data::Str(_) => 4,
                Data::Timestamp(_) => 5,
                Data::Date(_) => 6,
                Data::Time(_) => 7,
                Data::Interval(_) => 8,
                Data::Arr(_) => 9,
                Data::Obj(_) => 10,
                Data::Set(_) => 11,
            }
        }
        match (self, other) {
            (Data::Null, Data::Null) => Ordering::Equal,
            (Data::Bool(a), Data::Bool(b)) => a.cmp(b),
            (Data::Int(a), Data::Int(b)) => a.cmp(b),
            (Data::Dec(a), Data::Dec(b)) => a.cmp(b),
            (Data::Str(a), Data::Str(b)) => a.cmp(b),
            (Data::Timestamp(a), Data::Timestamp(b)) => a.cmp(b),
            (Data::Date(a), Data::Date(b)) => a.cmp(b),
            (Data::Time(a), Data::Time(b)) => a.cmp(b),
            (Data::Interval(a), Data::Interval(b)) => a.cmp(b),
            (Data::Arr(a), Data::Arr(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Data::Obj(a), Data::Obj(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.total_cmp(vb)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Data::Set(a), Data::Set(b)) => a.len().cmp(&b.len()).then_with(|| {
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| x.0.total_cmp(&y.0))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            }),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_debug_json())
    }
}

impl Data {
    /// Renders this value to a `serde_json::Value` debug tree, applying the
    /// `{"$literal": ...}` escape to any string that would otherwise be
    /// mistaken for an operator key (spec §8 property 8): a string starting
    /// with `$`, at any nesting depth.
    pub fn to_debug_json(&self) -> Json {
        self.render()
    }

    fn render(&self) -> Json {
        match self {
            Data::Null => Json::Null,
            Data::Bool(b) => Json::Bool(*b),
            Data::Int(i) => Json::String(i.to_string()),
            Data::Dec(d) => Json::String(d.to_string()),
            Data::Str(s) => {
                if s.starts_with('$') {
                    let mut map = serde_json::Map::new();
                    map.insert("$literal".to_string(), Json::String(s.clone()));
                    Json::Object(map)
                } else {
                    Json::String(s.clone())
                }
            }
            Data::Timestamp(t) => Json::String(t.to_rfc3339()),
            Data::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Data::Time(t) => Json::String(t.format("%H:%M:%S%.3f").to_string()),
            Data::Interval(i) => Json::String(format!("PT{}.{:03}S", i.millis / 1000, i.millis % 1000)),
            Data::Arr(items) => Json::Array(items.iter().map(|d| d.render()).collect()),
            Data::Obj(fields) => {
                let mut map = serde_json::Map::new();
                for (k, v) in fields {
                    map.insert(k.clone(), v.render());
                }
                Json::Object(map)
            }
            Data::Set(items) => {
                Json::Array(items.iter().map(|d| d.0.render()).collect())
            }
        }
    }
}

impl Serialize for Data {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_debug_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_prefixed_string_escapes_as_literal() {
        let d = Data::Str("$foo".to_string());
        let json = d.to_debug_json();
        assert_eq!(json, serde_json::json!({"$literal": "$foo"}));
    }

    #[test]
    fn dollar_prefixed_string_escapes_inside_array_and_object() {
        let arr = Data::Arr(vec![Data::Str("$foo".to_string())]);
        assert_eq!(arr.to_debug_json(), serde_json::json!([{"$literal": "$foo"}]));

        let obj = Data::Obj(vec![("k".to_string(), Data::Str("$bar".to_string()))]);
        assert_eq!(obj.to_debug_json(), serde_json::json!({"k": {"$literal": "$bar"}}));
    }

    #[test]
    fn plain_string_is_not_wrapped() {
        let d = Data::Str("foo".to_string());
        assert_eq!(d.to_debug_json(), serde_json::json!("foo"));
    }

    #[test]
    fn interval_parses_days_hours_minutes_seconds() {
        let iv = Interval::parse("P3DT12H30M15.0S").unwrap();
        let expected = 3 * 86_400_000 + 12 * 3_600_000 + 30 * 60_000 + 15_000;
        assert_eq!(iv.millis, expected);
    }

    #[test]
    fn interval_rejects_year_month_designators() {
        assert!(Interval::parse("P1Y").is_err());
        assert!(Interval::parse("P1M").is_err());
    }
}
