//! Shape validation for the two remote documents.
//!
//! Remote payloads are loosely typed JSON. They are checked here, once, and
//! turned into the typed model; nothing past this module sees a raw `Value`
//! except the opaque metric fields of a yearly record.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::model::{DetailPayload, InstitutionEntry, ProgramId, ProgramIndexEntry, YearRecord};

pub const FIELD_PROGRAM_ID: &str = "programId";
pub const FIELD_PROGRAM_LONG_NAME: &str = "programLongName";
pub const FIELD_RECORDS: &str = "degreeLevelData";
pub const FIELD_INSTITUTE: &str = "instituteLegalName";
pub const FIELD_YEAR: &str = "year";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("{context}: expected {expected}, found {found}")]
    UnexpectedType {
        context: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{context}: missing field `{field}`")]
    MissingField { context: String, field: &'static str },
    #[error("{context}: `{field}` is not a valid integer: {value}")]
    InvalidInteger {
        context: String,
        field: &'static str,
        value: String,
    },
    #[error("program index lists programId {0} more than once")]
    DuplicateProgramId(ProgramId),
}

/// Parse the index document: an array of program objects.
pub fn parse_index(bytes: &[u8]) -> Result<Vec<ProgramIndexEntry>, SchemaError> {
    let root = parse_json(bytes)?;
    let items = expect_array(&root, "index")?;

    let mut seen = HashSet::with_capacity(items.len());
    let mut entries = Vec::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        let context = format!("index[{pos}]");
        let obj = expect_object(item, &context)?;
        let program_id = program_id_field(obj, &context)?;
        let program_long_name = match obj.get(FIELD_PROGRAM_LONG_NAME) {
            Some(Value::String(name)) => name.clone(),
            Some(other) => {
                return Err(SchemaError::UnexpectedType {
                    context: format!("{context}.{FIELD_PROGRAM_LONG_NAME}"),
                    expected: "string",
                    found: type_name(other),
                })
            }
            None => {
                return Err(SchemaError::MissingField {
                    context,
                    field: FIELD_PROGRAM_LONG_NAME,
                })
            }
        };
        if !seen.insert(program_id) {
            return Err(SchemaError::DuplicateProgramId(program_id));
        }
        entries.push(ProgramIndexEntry {
            program_id,
            program_long_name,
        });
    }
    Ok(entries)
}

/// Parse one program's detail document.
///
/// The document is an object whose `degreeLevelData` array holds flat yearly
/// records. Records are grouped by institution name in first-seen order.
pub fn parse_detail(bytes: &[u8]) -> Result<DetailPayload, SchemaError> {
    let root = parse_json(bytes)?;
    let obj = expect_object(&root, "detail")?;

    let records = match obj.get(FIELD_RECORDS) {
        None | Some(Value::Null) => return Ok(DetailPayload::default()),
        Some(value) => expect_array(value, FIELD_RECORDS)?,
    };

    let mut payload = DetailPayload::default();
    for (pos, item) in records.iter().enumerate() {
        let context = format!("{FIELD_RECORDS}[{pos}]");
        let record = expect_object(item, &context)?;

        let name = match record.get(FIELD_INSTITUTE) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(SchemaError::UnexpectedType {
                    context: format!("{context}.{FIELD_INSTITUTE}"),
                    expected: "string",
                    found: type_name(other),
                })
            }
        };
        let year = year_field(record, &context)?;

        let Some(name) = name else {
            payload.unnamed_records += 1;
            continue;
        };
        let year_record = YearRecord {
            year,
            fields: record.clone(),
        };
        match payload
            .institutions
            .iter_mut()
            .find(|inst| inst.legal_name == name)
        {
            Some(inst) => inst.records.push(year_record),
            None => payload.institutions.push(InstitutionEntry {
                legal_name: name,
                records: vec![year_record],
            }),
        }
    }
    Ok(payload)
}

fn parse_json(bytes: &[u8]) -> Result<Value, SchemaError> {
    serde_json::from_slice(bytes).map_err(|err| SchemaError::InvalidJson(err.to_string()))
}

fn expect_array<'a>(value: &'a Value, context: &str) -> Result<&'a Vec<Value>, SchemaError> {
    value.as_array().ok_or_else(|| SchemaError::UnexpectedType {
        context: context.to_string(),
        expected: "array",
        found: type_name(value),
    })
}

fn expect_object<'a>(
    value: &'a Value,
    context: &str,
) -> Result<&'a Map<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| SchemaError::UnexpectedType {
        context: context.to_string(),
        expected: "object",
        found: type_name(value),
    })
}

/// Integer id; a numeric string such as `"475"` is accepted as well.
fn program_id_field(obj: &Map<String, Value>, context: &str) -> Result<ProgramId, SchemaError> {
    let invalid = |value: &Value| SchemaError::InvalidInteger {
        context: context.to_string(),
        field: FIELD_PROGRAM_ID,
        value: value.to_string(),
    };
    match obj.get(FIELD_PROGRAM_ID) {
        Some(value @ Value::Number(n)) => n.as_i64().ok_or_else(|| invalid(value)),
        Some(value @ Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid(value)),
        Some(other) => Err(SchemaError::UnexpectedType {
            context: format!("{context}.{FIELD_PROGRAM_ID}"),
            expected: "integer",
            found: type_name(other),
        }),
        None => Err(SchemaError::MissingField {
            context: context.to_string(),
            field: FIELD_PROGRAM_ID,
        }),
    }
}

fn year_field(obj: &Map<String, Value>, context: &str) -> Result<i32, SchemaError> {
    match obj.get(FIELD_YEAR) {
        Some(value @ Value::Number(n)) => n
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .ok_or_else(|| SchemaError::InvalidInteger {
                context: context.to_string(),
                field: FIELD_YEAR,
                value: value.to_string(),
            }),
        Some(other) => Err(SchemaError::UnexpectedType {
            context: format!("{context}.{FIELD_YEAR}"),
            expected: "integer",
            found: type_name(other),
        }),
        None => Err(SchemaError::MissingField {
            context: context.to_string(),
            field: FIELD_YEAR,
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_cover_every_variant() {
        assert_eq!(type_name(&Value::Null), "null");
        assert_eq!(type_name(&serde_json::json!([1])), "array");
        assert_eq!(type_name(&serde_json::json!({"a": 1})), "object");
    }

    #[test]
    fn fractional_year_is_rejected() {
        let obj = serde_json::json!({"year": 2022.5});
        let err = year_field(obj.as_object().unwrap(), "rec").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidInteger { field: "year", .. }));
    }
}
