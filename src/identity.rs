//! Dataset schemas and vector id resolution.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{KnnTruthError, Result};

/// Known benchmark datasets, each with its own id convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetSchema {
    /// Integer `id` field.
    Wikipedia,
    /// String `_id` field holding an integer.
    BeirBioasq,
    /// Composite `docid` of the form `<prefix>#<suffix>`.
    Miracl,
}

impl DatasetSchema {
    /// Select a schema from a dataset name or path.
    ///
    /// The selector matches when it contains `wikipedia`, `bioasq` or `miracl`.
    pub fn detect(selector: &str) -> Result<Self> {
        if selector.contains("wikipedia") {
            Ok(DatasetSchema::Wikipedia)
        } else if selector.contains("bioasq") {
            Ok(DatasetSchema::BeirBioasq)
        } else if selector.contains("miracl") {
            Ok(DatasetSchema::Miracl)
        } else {
            Err(KnnTruthError::unknown_dataset(selector))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DatasetSchema::Wikipedia => "wikipedia",
            DatasetSchema::BeirBioasq => "beir-bioasq",
            DatasetSchema::Miracl => "miracl",
        }
    }

    /// Name of the record field the id is read from.
    pub fn id_field(&self) -> &'static str {
        match self {
            DatasetSchema::Wikipedia => "id",
            DatasetSchema::BeirBioasq => "_id",
            DatasetSchema::Miracl => "docid",
        }
    }

    /// Resolve the vector id of a raw record.
    pub fn resolve_id(&self, record: &Map<String, Value>) -> Result<i64> {
        let field = self.id_field();
        let value = record
            .get(field)
            .ok_or_else(|| KnnTruthError::invalid_format(format!("record has no {field} field")))?;

        match self {
            DatasetSchema::Wikipedia => value.as_i64().ok_or_else(|| {
                KnnTruthError::invalid_format(format!("{field}({value}) is not an integer"))
            }),
            DatasetSchema::BeirBioasq => {
                let text = expect_str(field, value)?;
                text.parse::<i64>().map_err(|e| {
                    KnnTruthError::invalid_format(format!("{field}({text}) is invalid: {e}"))
                })
            }
            DatasetSchema::Miracl => parse_composite_id(expect_str(field, value)?),
        }
    }
}

impl fmt::Display for DatasetSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn expect_str<'a>(field: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| KnnTruthError::invalid_format(format!("{field}({value}) is not a string")))
}

/// Turn `<prefix>#<suffix>` into the integer `<prefix><suffix padded to 4 digits>`.
pub fn parse_composite_id(id: &str) -> Result<i64> {
    let parts: Vec<&str> = id.split('#').collect();
    if parts.len() != 2 {
        return Err(KnnTruthError::invalid_format(format!("id({id}) is invalid")));
    }

    let composite = format!("{}{:0>4}", parts[0], parts[1]);
    composite
        .parse::<i64>()
        .map_err(|e| KnnTruthError::invalid_format(format!("id({id}) is invalid: {e}")))
}
