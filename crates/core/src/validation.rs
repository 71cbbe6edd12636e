//! Dry-run validation and in-batch duplicate detection.
//!
//! Validation is read-only and idempotent: it applies the shared row
//! transform to every source row, attributes problems to row/field, and
//! never persists anything. Re-running it with the same mapping and
//! source data produces an identical result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{EntitySchema, FieldType};
use crate::mapping::{transform_row, CleaningRules, FieldMapping};
use crate::types::JsonMap;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Whether an issue blocks execution or is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
}

/// A single row/field-attributed validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    /// 1-based source row number, stable across validate and execute.
    pub row: usize,
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Aggregated outcome of a validation pass over the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// Values of configured dedup fields appearing on more than one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// field -> duplicated value -> 1-based row numbers.
    pub fields: BTreeMap<String, BTreeMap<String, Vec<usize>>>,
    /// field -> number of distinct duplicated values.
    pub field_counts: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// Row validation
// ---------------------------------------------------------------------------

/// Transform one row and check it against the schema.
///
/// Returns the transformed record and its issues (without the batch-level
/// uniqueness warnings, which need visibility across rows). Shared by the
/// full validation pass, the preview endpoint, and the executor.
pub fn check_row(
    schema: &EntitySchema,
    mapping: &FieldMapping,
    rules: &CleaningRules,
    row: &JsonMap,
    row_number: usize,
) -> (JsonMap, Vec<ValidationIssue>) {
    let (data, transform_issues) = transform_row(schema, mapping, rules, row);
    let mut issues = Vec::new();

    // Fields that already failed casting are not re-checked for type.
    let failed_cast: Vec<&str> = transform_issues.iter().map(|i| i.field.as_str()).collect();

    for issue in &transform_issues {
        issues.push(ValidationIssue {
            severity: ValidationSeverity::Error,
            row: row_number,
            field: issue.field.clone(),
            message: issue.message.clone(),
            value: issue.value.clone(),
        });
    }

    for field in &schema.fields {
        let value = data.get(&field.name);

        if field.required && is_empty(value) {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Error,
                row: row_number,
                field: field.name.clone(),
                message: format!("Required field '{}' is missing or empty", field.name),
                value: None,
            });
            continue;
        }

        let Some(value) = value else { continue };
        if value.is_null() || failed_cast.contains(&field.name.as_str()) {
            continue;
        }

        if !type_matches(field.field_type, value) {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Error,
                row: row_number,
                field: field.name.clone(),
                message: format!(
                    "Value does not match declared type '{}'",
                    field.field_type
                ),
                value: Some(value.clone()),
            });
            continue;
        }

        if let (FieldType::Enum, Some(allowed)) = (field.field_type, &field.enum_values) {
            if let Value::String(s) = value {
                if !allowed.contains(s) {
                    issues.push(ValidationIssue {
                        severity: ValidationSeverity::Error,
                        row: row_number,
                        field: field.name.clone(),
                        message: format!(
                            "Value '{}' is not one of: {}",
                            s,
                            allowed.join(", ")
                        ),
                        value: Some(value.clone()),
                    });
                }
            }
        }
    }

    (data, issues)
}

/// Validate every source row against the saved mapping and cleaning
/// rules, including in-batch uniqueness warnings.
///
/// Duplicate unique-field values are warnings, not errors: the first
/// occurrence wins and the dedup strategy decides at execution time.
pub fn validate_rows(
    schema: &EntitySchema,
    mapping: &FieldMapping,
    rules: &CleaningRules,
    rows: &[JsonMap],
) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // field -> value -> first row seen.
    let mut seen: BTreeMap<&str, BTreeMap<String, usize>> = BTreeMap::new();
    let unique_fields = schema.unique_fields();

    for (i, row) in rows.iter().enumerate() {
        let row_number = i + 1;
        let (data, issues) = check_row(schema, mapping, rules, row, row_number);

        for issue in issues {
            match issue.severity {
                ValidationSeverity::Error => errors.push(issue),
                ValidationSeverity::Warning => warnings.push(issue),
            }
        }

        for &field in &unique_fields {
            let Some(key) = data.get(field).and_then(value_key) else {
                continue;
            };
            match seen.entry(field).or_default().entry(key.clone()) {
                std::collections::btree_map::Entry::Vacant(e) => {
                    e.insert(row_number);
                }
                std::collections::btree_map::Entry::Occupied(e) => {
                    warnings.push(ValidationIssue {
                        severity: ValidationSeverity::Warning,
                        row: row_number,
                        field: field.to_string(),
                        message: format!(
                            "Duplicate value '{}' for unique field '{}' (first seen in row {})",
                            key,
                            field,
                            e.get()
                        ),
                        value: data.get(field).cloned(),
                    });
                }
            }
        }
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        error_count: errors.len(),
        warning_count: warnings.len(),
        errors,
        warnings,
    }
}

// ---------------------------------------------------------------------------
// Duplicate report
// ---------------------------------------------------------------------------

/// Scan cleaned values of the configured dedup fields across all rows and
/// report every value appearing more than once. Purely informational.
pub fn find_duplicates(
    schema: &EntitySchema,
    mapping: &FieldMapping,
    rules: &CleaningRules,
    rows: &[JsonMap],
    dedup_fields: &[String],
) -> DuplicateReport {
    let mut occurrences: BTreeMap<String, BTreeMap<String, Vec<usize>>> = BTreeMap::new();

    for (i, row) in rows.iter().enumerate() {
        let row_number = i + 1;
        let (data, _) = transform_row(schema, mapping, rules, row);
        for field in dedup_fields {
            let Some(key) = data.get(field).and_then(value_key) else {
                continue;
            };
            occurrences
                .entry(field.clone())
                .or_default()
                .entry(key)
                .or_default()
                .push(row_number);
        }
    }

    let mut fields: BTreeMap<String, BTreeMap<String, Vec<usize>>> = BTreeMap::new();
    let mut field_counts = BTreeMap::new();
    for (field, values) in occurrences {
        let duplicated: BTreeMap<String, Vec<usize>> = values
            .into_iter()
            .filter(|(_, rows)| rows.len() > 1)
            .collect();
        field_counts.insert(field.clone(), duplicated.len());
        fields.insert(field, duplicated);
    }

    DuplicateReport {
        fields,
        field_counts,
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Comparable key for uniqueness checks: strings compare by content,
/// everything else by JSON rendering.
fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn type_matches(field_type: FieldType, value: &Value) -> bool {
    match field_type {
        FieldType::String | FieldType::Reference => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        // Dates are normalized to ISO strings by the transform.
        FieldType::Date => value.is_string(),
        FieldType::Enum => value.is_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
