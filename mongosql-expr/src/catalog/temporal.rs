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

//! Temporal constructors and accessors: `Date`, `Time`, `Timestamp`,
//! `Interval`, `ToTimestamp`, `TimeOfDay`, `Extract`.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};

use mongosql_common::{Data, Error, Interval, Result, Type};

use super::{Arity, Function};
use crate::logical_plan::LogicalPlan;

fn const_of(t: &Type) -> Option<&Data> {
    match t {
        Type::Const(d) => Some(d),
        _ => None,
    }
}

fn const_str(t: &Type) -> Option<&str> {
    match const_of(t)? {
        Data::Str(s) => Some(s.as_str()),
        _ => None,
    }
}

fn no_simplify(_args: &[LogicalPlan]) -> Option<LogicalPlan> {
    None
}

// --- Date ---

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| Error::DateFormat {
        kind: "Date".to_string(),
        input: input.to_string(),
        hint: "expected YYYY-MM-DD".to_string(),
    })
}

fn date_typer(args: &[Type]) -> Result<Type> {
    if let Some(s) = const_str(&args[0]) {
        return Ok(Type::Const(Data::Date(parse_date(s)?)));
    }
    Ok(Type::Date)
}

fn date_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Str])
}

// --- Time ---

fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
        .map_err(|_| Error::DateFormat {
            kind: "Time".to_string(),
            input: input.to_string(),
            hint: "expected HH:MM:SS[.fff]".to_string(),
        })
}

fn time_typer(args: &[Type]) -> Result<Type> {
    if let Some(s) = const_str(&args[0]) {
        return Ok(Type::Const(Data::Time(parse_time(s)?)));
    }
    Ok(Type::Time)
}

fn time_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Str])
}

// --- Timestamp ---

fn parse_timestamp(input: &str) -> Result<chrono::DateTime<Utc>> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| Error::DateFormat {
            kind: "Timestamp".to_string(),
            input: input.to_string(),
            hint: "expected an ISO-8601 timestamp".to_string(),
        })
}

fn timestamp_typer(args: &[Type]) -> Result<Type> {
    if let Some(s) = const_str(&args[0]) {
        return Ok(Type::Const(Data::Timestamp(parse_timestamp(s)?)));
    }
    Ok(Type::Timestamp)
}

fn timestamp_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Str])
}

// --- Interval ---

fn interval_typer(args: &[Type]) -> Result<Type> {
    if let Some(s) = const_str(&args[0]) {
        return Ok(Type::Const(Data::Interval(Interval::parse(s)?)));
    }
    Ok(Type::Interval)
}

fn interval_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Str])
}

// --- ToTimestamp: combines a Date and a Time into a Timestamp ---

fn to_timestamp_typer(args: &[Type]) -> Result<Type> {
    if let (Some(Data::Date(d)), Some(Data::Time(t))) = (const_of(&args[0]), const_of(&args[1])) {
        let naive = NaiveDateTime::new(*d, *t);
        return Ok(Type::Const(Data::Timestamp(Utc.from_utc_datetime(&naive))));
    }
    Ok(Type::Timestamp)
}

fn to_timestamp_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Date, Type::Time])
}

// --- TimeOfDay: projects the Time component out of a Timestamp ---

fn time_of_day_typer(args: &[Type]) -> Result<Type> {
    if let Some(Data::Timestamp(t)) = const_of(&args[0]) {
        return Ok(Type::Const(Data::Time(t.time())));
    }
    Ok(Type::Time)
}

fn time_of_day_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Timestamp])
}

// --- Extract ---

const EXTRACT_FIELDS: &[&str] = &[
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "second",
    "millisecond",
];

fn extract_field(field: &str, value: &Data) -> Result<i64> {
    match (field, value) {
        ("year", Data::Timestamp(t)) => Ok(t.year() as i64),
        ("year", Data::Date(d)) => Ok(d.year() as i64),
        ("month", Data::Timestamp(t)) => Ok(t.month() as i64),
        ("month", Data::Date(d)) => Ok(d.month() as i64),
        ("day", Data::Timestamp(t)) => Ok(t.day() as i64),
        ("day", Data::Date(d)) => Ok(d.day() as i64),
        ("hour", Data::Timestamp(t)) => Ok(t.hour() as i64),
        ("hour", Data::Time(t)) => Ok(t.hour() as i64),
        ("minute", Data::Timestamp(t)) => Ok(t.minute() as i64),
        ("minute", Data::Time(t)) => Ok(t.minute() as i64),
        ("second", Data::Timestamp(t)) => Ok(t.second() as i64),
        ("second", Data::Time(t)) => Ok(t.second() as i64),
        ("millisecond", Data::Timestamp(t)) => Ok((t.nanosecond() / 1_000_000) as i64),
        ("millisecond", Data::Time(t)) => Ok((t.nanosecond() / 1_000_000) as i64),
        (other, _) if !EXTRACT_FIELDS.contains(&other) => Err(Error::Generic {
            message: format!("unknown Extract field: {other}"),
        }),
        _ => Err(Error::Generic {
            message: format!("Extract field {field} is not defined for this operand type"),
        }),
    }
}

fn extract_typer(args: &[Type]) -> Result<Type> {
    let field = const_str(&args[0]).ok_or_else(|| Error::ExpectedLiteral {
        context: "Extract field name".to_string(),
    })?;
    if let Some(value) = const_of(&args[1]) {
        return Ok(Type::Const(Data::Int(extract_field(field, value)?.into())));
    }
    Ok(Type::Int)
}

fn extract_untyper(_expected: &Type) -> Result<Vec<Type>> {
    Ok(vec![Type::Str, Type::Top])
}

pub static DATE: Function = Function {
    name: "Date",
    doc: "parses a YYYY-MM-DD string into a Date",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Str],
    simplify: no_simplify,
    typer: date_typer,
    untyper: date_untyper,
};

pub static TIME: Function = Function {
    name: "Time",
    doc: "parses an HH:MM:SS[.fff] string into a Time",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Str],
    simplify: no_simplify,
    typer: time_typer,
    untyper: time_untyper,
};

pub static TIMESTAMP: Function = Function {
    name: "Timestamp",
    doc: "parses an ISO-8601 string into a Timestamp",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Str],
    simplify: no_simplify,
    typer: timestamp_typer,
    untyper: timestamp_untyper,
};

pub static INTERVAL: Function = Function {
    name: "Interval",
    doc: "parses an ISO-8601 duration string into an Interval",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Str],
    simplify: no_simplify,
    typer: interval_typer,
    untyper: interval_untyper,
};

pub static TO_TIMESTAMP: Function = Function {
    name: "ToTimestamp",
    doc: "combines a Date and a Time into a Timestamp",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Date, Type::Time],
    simplify: no_simplify,
    typer: to_timestamp_typer,
    untyper: to_timestamp_untyper,
};

pub static TIME_OF_DAY: Function = Function {
    name: "TimeOfDay",
    doc: "projects the Time component out of a Timestamp",
    arity: Arity::Fixed(1),
    domain: || vec![Type::Timestamp],
    simplify: no_simplify,
    typer: time_of_day_typer,
    untyper: time_of_day_untyper,
};

pub static EXTRACT: Function = Function {
    name: "Extract",
    doc: "extracts a named field (year/month/day/hour/minute/second/millisecond) from a Date, Time, or Timestamp",
    arity: Arity::Fixed(2),
    domain: || vec![Type::Str, Type::Top],
    simplify: no_simplify,
    typer: extract_typer,
    untyper: extract_untyper,
};

pub fn functions() -> Vec<&'static Function> {
    vec![
        &DATE,
        &TIME,
        &TIMESTAMP,
        &INTERVAL,
        &TO_TIMESTAMP,
        &TIME_OF_DAY,
        &EXTRACT,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_parses_iso_literal() {
        let args = vec![Type::Const(Data::Str("2024-01-15".to_string()))];
        assert_eq!(
            DATE.type_of(&args).unwrap(),
            Type::Const(Data::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
        );
    }

    #[test]
    fn date_rejects_malformed_literal() {
        let args = vec![Type::Const(Data::Str("not-a-date".to_string()))];
        assert!(DATE.type_of(&args).is_err());
    }

    #[test]
    fn extract_year_from_timestamp_constant() {
        let ts = parse_timestamp("2024-01-15T10:30:00Z").unwrap();
        let args = vec![
            Type::Const(Data::Str("year".to_string())),
            Type::Const(Data::Timestamp(ts)),
        ];
        assert_eq!(
            EXTRACT.type_of(&args).unwrap(),
            Type::Const(Data::Int(2024.into()))
        );
    }

    #[test]
    fn extract_rejects_unknown_field() {
        let ts = parse_timestamp("2024-01-15T10:30:00Z").unwrap();
        let args = vec![
            Type::Const(Data::Str("fortnight".to_string())),
            Type::Const(Data::Timestamp(ts)),
        ];
        assert!(EXTRACT.type_of(&args).is_err());
    }

    #[test]
    fn to_timestamp_combines_date_and_time() {
        let date = parse_date("2024-01-15").unwrap();
        let time = parse_time("10:30:00").unwrap();
        let args = vec![Type::Const(Data::Date(date)), Type::Const(Data::Time(time))];
        let result = TO_TIMESTAMP.type_of(&args).unwrap();
        assert!(matches!(result, Type::Const(Data::Timestamp(_))));
    }
}
