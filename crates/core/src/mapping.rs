//! Column-to-field mapping: auto-suggestion and declarative cleaning.
//!
//! [`transform_row`] is the single transform used by validation, preview,
//! and execution, so what a dry run inspects is byte-for-byte what an
//! import writes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{EntitySchema, FieldType};
use crate::types::JsonMap;

/// Saved column-to-field assignment (source column -> target field).
pub type FieldMapping = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Mapping suggestion
// ---------------------------------------------------------------------------

/// Lowercase a name and strip everything that is not alphanumeric, so
/// "Email Address", "email_address", and "EMAIL-ADDRESS" all compare equal.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Propose a column for each target field by normalized-name matching.
///
/// Fields are considered in schema order; each column is claimed at most
/// once. An exact normalized match wins over a substring match, and a
/// field with several equally good candidates is omitted rather than
/// guessed. Deterministic for a given `(columns, schema)` pair.
pub fn suggest_mapping(columns: &[String], schema: &EntitySchema) -> FieldMapping {
    let normalized: Vec<String> = columns.iter().map(|c| normalize_name(c)).collect();
    let mut claimed = vec![false; columns.len()];
    let mut mapping = FieldMapping::new();

    for field in &schema.fields {
        let target = normalize_name(&field.name);
        if target.is_empty() {
            continue;
        }

        let exact: Vec<usize> = (0..columns.len())
            .filter(|&i| !claimed[i] && normalized[i] == target)
            .collect();
        let candidates = if exact.is_empty() {
            (0..columns.len())
                .filter(|&i| {
                    !claimed[i]
                        && !normalized[i].is_empty()
                        && (normalized[i].contains(&target) || target.contains(&normalized[i]))
                })
                .collect()
        } else {
            exact
        };

        // A single candidate is a match; anything else is ambiguous.
        if let [i] = candidates[..] {
            claimed[i] = true;
            mapping.insert(columns[i].clone(), field.name.clone());
        }
    }

    mapping
}

// ---------------------------------------------------------------------------
// Cleaning rules
// ---------------------------------------------------------------------------

/// Declarative cleaning configuration for one target field.
///
/// Rules apply in a fixed order (trim, cast, enum-normalize,
/// default-if-empty) so repeated passes over identical input produce
/// identical output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldCleaning {
    /// Strip leading/trailing whitespace before anything else.
    #[serde(default)]
    pub trim: bool,
    /// Cast target; falls back to the declared schema field type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<FieldType>,
    /// Canonical values to case-insensitively normalize into; falls back
    /// to the schema's enum values for enum fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_normalize: Option<Vec<String>>,
    /// Fill-in value when the field is empty after cleaning; falls back
    /// to the schema field default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Per-field cleaning configuration saved on a job.
pub type CleaningRules = BTreeMap<String, FieldCleaning>;

/// A field-level problem raised while transforming a row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformIssue {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

// ---------------------------------------------------------------------------
// Row transform
// ---------------------------------------------------------------------------

/// Apply the saved mapping and cleaning rules to one source row.
///
/// Returns the typed transformed record plus any cast issues. Fields that
/// end up empty with no default are omitted from the output; a failed
/// cast keeps the raw string value in the output (so it can be inspected)
/// and reports an issue.
pub fn transform_row(
    schema: &EntitySchema,
    mapping: &FieldMapping,
    rules: &CleaningRules,
    row: &JsonMap,
) -> (JsonMap, Vec<TransformIssue>) {
    // Invert column->field once; the BTreeMap iteration order makes the
    // first-column-wins choice deterministic.
    let mut by_field: HashMap<&str, &str> = HashMap::new();
    for (column, field) in mapping {
        by_field.entry(field.as_str()).or_insert(column.as_str());
    }

    let mut data = JsonMap::new();
    let mut issues = Vec::new();

    for field in &schema.fields {
        let rule = rules.get(&field.name).cloned().unwrap_or_default();

        let mut raw: Option<String> = by_field
            .get(field.name.as_str())
            .and_then(|column| row.get(*column))
            .and_then(value_to_string);

        if rule.trim {
            raw = raw.map(|v| v.trim().to_string());
        }
        let raw = raw.filter(|v| !v.is_empty());

        let target = rule.cast.unwrap_or(field.field_type);
        let mut value = raw.map(|s| cast_value(&s, target, &field.name, &mut issues));

        let allowed = rule.enum_normalize.as_ref().or(field.enum_values.as_ref());
        if let (Some(allowed), Some(Value::String(s))) = (allowed, value.as_mut()) {
            if let Some(canonical) = allowed.iter().find(|a| a.eq_ignore_ascii_case(s)) {
                *s = canonical.clone();
            }
        }

        let value = value.or_else(|| rule.default.clone().or_else(|| field.default.clone()));

        if let Some(v) = value {
            data.insert(field.name.clone(), v);
        }
    }

    (data, issues)
}

/// Required fields not covered by the mapping or a default value.
///
/// Used by save-mapping to reject incomplete configurations before any
/// validation pass runs.
pub fn missing_required_fields(
    schema: &EntitySchema,
    mapping: &FieldMapping,
    rules: &CleaningRules,
) -> Vec<String> {
    let mapped: Vec<&String> = mapping.values().collect();
    schema
        .fields
        .iter()
        .filter(|f| f.required)
        .filter(|f| {
            let has_column = mapped.iter().any(|m| **m == f.name);
            let has_default = rules
                .get(&f.name)
                .is_some_and(|r| r.default.is_some())
                || f.default.is_some();
            !has_column && !has_default
        })
        .map(|f| f.name.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Stringify a source cell. Source rows arrive as JSON objects of
/// strings, but numbers and booleans from hand-built payloads are
/// tolerated; null and nested structures count as missing.
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn cast_value(s: &str, target: FieldType, field: &str, issues: &mut Vec<TransformIssue>) -> Value {
    match target {
        FieldType::String | FieldType::Enum | FieldType::Reference => Value::String(s.to_string()),
        FieldType::Number => match s.parse::<f64>() {
            Ok(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or_else(|| {
                    issues.push(issue(field, format!("Cannot cast '{s}' to number"), s));
                    Value::String(s.to_string())
                }),
            Err(_) => {
                issues.push(issue(field, format!("Cannot cast '{s}' to number"), s));
                Value::String(s.to_string())
            }
        },
        FieldType::Boolean => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Value::Bool(true),
            "false" | "no" | "n" | "0" => Value::Bool(false),
            _ => {
                issues.push(issue(field, format!("Cannot cast '{s}' to boolean"), s));
                Value::String(s.to_string())
            }
        },
        FieldType::Date => {
            let parsed = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| chrono::NaiveDate::parse_from_str(s, "%Y%m%d"));
            match parsed {
                Ok(date) => Value::String(date.format("%Y-%m-%d").to_string()),
                Err(_) => {
                    issues.push(issue(
                        field,
                        format!("Cannot parse '{s}' as date (expected YYYY-MM-DD)"),
                        s,
                    ));
                    Value::String(s.to_string())
                }
            }
        }
    }
}

fn issue(field: &str, message: String, value: &str) -> TransformIssue {
    TransformIssue {
        field: field.to_string(),
        message,
        value: Some(Value::String(value.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
