//! Record-level filter predicate.
//!
//! A predicate is written as comma separated clauses of the form
//! `field:type:value:op`, for example `category:string:shoes:eq,year:int:2019:gte`.
//! `type` is `int` or `string` and `op` one of `eq`, `ne`, `lt`, `lte`, `gt`, `gte`.
//!
//! A training record is excluded by the first clause it violates. Clauses
//! naming a field the record does not carry are skipped. The JSON type of the
//! record field picks the comparison: strings compare as text, integers as i64.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{KnnTruthError, Result};

/// Comparison operator of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    /// Check whether `ordering` (record value compared to clause value) satisfies the operator.
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
        }
    }
}

impl FromStr for CompareOp {
    type Err = KnnTruthError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eq" => Ok(CompareOp::Eq),
            "ne" => Ok(CompareOp::Ne),
            "lt" => Ok(CompareOp::Lt),
            "lte" => Ok(CompareOp::Lte),
            "gt" => Ok(CompareOp::Gt),
            "gte" => Ok(CompareOp::Gte),
            _ => Err(KnnTruthError::filter(format!("unknown operator: {s}"))),
        }
    }
}

/// Declared type of a clause value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    String,
}

/// Right-hand side of a clause, kept both as text and as an integer.
///
/// The record value decides which form is used: string fields compare
/// against the text, integer fields against the integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseValue {
    pub field_type: FieldType,
    pub text: String,
    pub int: Option<i64>,
}

impl ClauseValue {
    /// Compare a record value against this clause value.
    ///
    /// Returns `None` when the record value is neither a string nor an
    /// integer, or is an integer and the clause text is not one.
    fn compare(&self, record_value: &Value) -> Option<Ordering> {
        match record_value {
            Value::String(actual) => Some(actual.as_str().cmp(self.text.as_str())),
            Value::Number(n) => {
                let actual = n.as_i64()?;
                Some(actual.cmp(&self.int?))
            }
            _ => None,
        }
    }
}

/// A single `field:type:value:op` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub value: ClauseValue,
    pub op: CompareOp,
}

impl FilterClause {
    /// Check whether a record satisfies this clause. Missing fields satisfy it.
    pub fn is_satisfied_by(&self, record: &Map<String, Value>) -> bool {
        let Some(record_value) = record.get(&self.field) else {
            return true;
        };

        match self.value.compare(record_value) {
            Some(ordering) => self.op.accepts(ordering),
            None => {
                debug!(
                    "field {} value {} not comparable with '{}', clause skipped",
                    self.field, record_value, self.value.text
                );
                true
            }
        }
    }
}

impl FromStr for FilterClause {
    type Err = KnnTruthError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 {
            return Err(KnnTruthError::filter(format!(
                "clause '{s}' must have the form field:type:value:op"
            )));
        }

        let field = parts[0].trim();
        if field.is_empty() {
            return Err(KnnTruthError::filter(format!("clause '{s}' has an empty field")));
        }

        let text = parts[2].to_string();
        let int = text.trim().parse::<i64>();
        let value = match parts[1].trim() {
            "int" => {
                let parsed = int.map_err(|e| {
                    KnnTruthError::filter(format!("clause '{s}' has a non integer value: {e}"))
                })?;
                ClauseValue {
                    field_type: FieldType::Int,
                    text,
                    int: Some(parsed),
                }
            }
            "string" => ClauseValue {
                field_type: FieldType::String,
                text,
                int: int.ok(),
            },
            other => {
                return Err(KnnTruthError::filter(format!("unknown field type: {other}")));
            }
        };

        Ok(FilterClause {
            field: field.to_string(),
            value,
            op: parts[3].trim().parse()?,
        })
    }
}

/// An ordered, AND-combined list of clauses plus its textual description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    description: String,
    clauses: Vec<FilterClause>,
}

impl FilterPredicate {
    /// Parse a predicate from its textual form. An empty string yields no clauses.
    pub fn parse(description: &str) -> Result<Self> {
        let clauses = description
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<FilterClause>>>()?;

        Ok(FilterPredicate {
            description: description.to_string(),
            clauses,
        })
    }

    /// The predicate exactly as it was configured.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Decide whether a training record must be left out of the ground truth.
    pub fn excludes(&self, record: &Map<String, Value>) -> bool {
        self.clauses
            .iter()
            .any(|clause| !clause.is_satisfied_by(record))
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_string_equality() {
        let predicate = FilterPredicate::parse("category:string:shoes:eq").unwrap();

        assert!(predicate.excludes(&record(json!({"category": "boots"}))));
        assert!(!predicate.excludes(&record(json!({"category": "shoes"}))));
        assert!(!predicate.excludes(&record(json!({"brand": "acme"}))));
    }

    #[test]
    fn test_integer_gte() {
        let keep = FilterPredicate::parse("year:int:2019:gte").unwrap();
        let drop = FilterPredicate::parse("year:int:2021:gte").unwrap();
        let item = record(json!({"year": 2020}));

        assert!(!keep.excludes(&item));
        assert!(drop.excludes(&item));
    }

    #[test]
    fn test_string_ordering_is_lexicographic() {
        let predicate = FilterPredicate::parse("name:string:m:lt").unwrap();

        assert!(!predicate.excludes(&record(json!({"name": "apple"}))));
        assert!(predicate.excludes(&record(json!({"name": "zebra"}))));
        // "10" sorts before "9" as text
        let numeric_text = FilterPredicate::parse("code:string:9:lt").unwrap();
        assert!(!numeric_text.excludes(&record(json!({"code": "10"}))));
    }

    #[test]
    fn test_all_clauses_must_hold() {
        let predicate =
            FilterPredicate::parse("category:string:shoes:eq,year:int:2020:lt").unwrap();

        assert!(!predicate.excludes(&record(json!({"category": "shoes", "year": 2019}))));
        assert!(predicate.excludes(&record(json!({"category": "shoes", "year": 2020}))));
        assert!(predicate.excludes(&record(json!({"category": "boots", "year": 2019}))));
        assert!(!predicate.excludes(&record(json!({"year": 1999}))));
    }

    #[test]
    fn test_every_operator() {
        let item = record(json!({"n": 5}));
        let cases = [
            ("eq", 5, true),
            ("eq", 4, false),
            ("ne", 4, true),
            ("ne", 5, false),
            ("lt", 6, true),
            ("lt", 5, false),
            ("lte", 5, true),
            ("lte", 4, false),
            ("gt", 4, true),
            ("gt", 5, false),
            ("gte", 5, true),
            ("gte", 6, false),
        ];

        for (op, value, kept) in cases {
            let predicate = FilterPredicate::parse(&format!("n:int:{value}:{op}")).unwrap();
            assert_eq!(!predicate.excludes(&item), kept, "n {op} {value}");
        }
    }

    #[test]
    fn test_incomparable_value_is_skipped() {
        let predicate = FilterPredicate::parse("year:int:2000:eq").unwrap();

        assert!(!predicate.excludes(&record(json!({"year": 20.5}))));
        assert!(!predicate.excludes(&record(json!({"year": null}))));
        assert!(!predicate.excludes(&record(json!({"year": [2000]}))));

        // An integer field cannot be compared with non numeric text
        let text = FilterPredicate::parse("year:string:recent:eq").unwrap();
        assert!(!text.excludes(&record(json!({"year": 1999}))));
    }

    #[test]
    fn test_record_type_decides_comparison() {
        // Integer field against a string clause compares as integers
        let predicate = FilterPredicate::parse("year:string:2021:gte").unwrap();
        assert!(predicate.excludes(&record(json!({"year": 2020}))));
        assert!(!predicate.excludes(&record(json!({"year": 2021}))));

        // String field against an int clause compares as text
        let predicate = FilterPredicate::parse("year:int:2000:eq").unwrap();
        assert!(predicate.excludes(&record(json!({"year": "1999"}))));
        assert!(predicate.excludes(&record(json!({"year": "unknown"}))));
        assert!(!predicate.excludes(&record(json!({"year": "2000"}))));

        // "10" sorts before "9" as text, even for an int clause
        let predicate = FilterPredicate::parse("code:int:9:lt").unwrap();
        assert!(!predicate.excludes(&record(json!({"code": "10"}))));
    }

    #[test]
    fn test_empty_predicate_excludes_nothing() {
        let predicate = FilterPredicate::parse("").unwrap();

        assert!(predicate.is_empty());
        assert!(!predicate.excludes(&record(json!({"category": "boots"}))));
    }

    #[test]
    fn test_parse_errors() {
        assert!(FilterPredicate::parse("category:string:shoes").is_err());
        assert!(FilterPredicate::parse("year:float:1.5:eq").is_err());
        assert!(FilterPredicate::parse("year:int:abc:eq").is_err());
        assert!(FilterPredicate::parse("year:int:1:between").is_err());
    }

    #[test]
    fn test_description_is_preserved() {
        let text = "category:string:shoes:eq,year:int:2019:gte";
        let predicate = FilterPredicate::parse(text).unwrap();

        assert_eq!(predicate.description(), text);
        assert_eq!(predicate.clauses().len(), 2);
        assert_eq!(predicate.clauses()[1].op, CompareOp::Gte);
        assert_eq!(predicate.to_string(), text);
    }
}
