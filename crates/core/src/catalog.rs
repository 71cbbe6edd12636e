//! Entity catalog: the static registry of importable entity types.
//!
//! The catalog is loaded once at process start, validated eagerly
//! (unknown dependency references and dependency cycles fail the load,
//! not a request), and injected read-only through application state so
//! tests can swap in their own registries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Field schema
// ---------------------------------------------------------------------------

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Enum,
    Reference,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Enum => "enum",
            Self::Reference => "reference",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of an entity schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    /// Allowed values, in canonical casing. Only set for `enum` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Value filled in when the source leaves the field empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl FieldInfo {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: false,
            unique: false,
            enum_values: None,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }
}

// ---------------------------------------------------------------------------
// Entity schema
// ---------------------------------------------------------------------------

/// Full field schema and dependency declaration for one entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySchema {
    pub entity_type: String,
    pub display_name: String,
    pub fields: Vec<FieldInfo>,
    /// Entity types that must be migrated before this one.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl EntitySchema {
    /// Names of all fields that must be present after cleaning.
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Names of all fields whose values identify a record.
    pub fn unique_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.unique)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Summary view exposed on listing endpoints.
    pub fn info(&self) -> EntityInfo {
        EntityInfo {
            entity_type: self.entity_type.clone(),
            display_name: self.display_name.clone(),
            required_fields: self
                .required_fields()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            unique_fields: self.unique_fields().iter().map(|s| s.to_string()).collect(),
            dependencies: self.dependencies.clone(),
        }
    }
}

/// Summary descriptor for an importable entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityInfo {
    pub entity_type: String,
    pub display_name: String,
    pub required_fields: Vec<String>,
    pub unique_fields: Vec<String>,
    pub dependencies: Vec<String>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The process-wide registry of entity schemas.
///
/// Construction validates the dependency graph and caches the
/// topological migration order; the catalog is immutable afterwards.
#[derive(Debug, Clone)]
pub struct EntityCatalog {
    entities: Vec<EntitySchema>,
    index: HashMap<String, usize>,
    migration_order: Vec<String>,
}

impl EntityCatalog {
    /// Build a catalog from schema declarations.
    ///
    /// Fails with [`CoreError::Validation`] on duplicate entity types or
    /// dependency references to unregistered types, and with
    /// [`CoreError::CyclicDependency`] if the dependency graph is not a
    /// DAG. Ordering ties are broken by declaration order, so the cached
    /// migration order is deterministic.
    pub fn new(entities: Vec<EntitySchema>) -> Result<Self, CoreError> {
        let mut index = HashMap::new();
        for (i, entity) in entities.iter().enumerate() {
            if index.insert(entity.entity_type.clone(), i).is_some() {
                return Err(CoreError::Validation(format!(
                    "Duplicate entity type '{}' in catalog",
                    entity.entity_type
                )));
            }
        }

        for entity in &entities {
            for dep in &entity.dependencies {
                if !index.contains_key(dep) {
                    return Err(CoreError::Validation(format!(
                        "Entity '{}' depends on unregistered type '{}'",
                        entity.entity_type, dep
                    )));
                }
            }
        }

        let migration_order = topo_sort(&entities, &index)?;

        Ok(Self {
            entities,
            index,
            migration_order,
        })
    }

    /// All registered schemas, in declaration order.
    pub fn entities(&self) -> &[EntitySchema] {
        &self.entities
    }

    /// Full schema for an entity type.
    pub fn schema(&self, entity_type: &str) -> Result<&EntitySchema, CoreError> {
        self.index
            .get(entity_type)
            .map(|&i| &self.entities[i])
            .ok_or_else(|| CoreError::UnknownEntityType(entity_type.to_string()))
    }

    /// Cached dependency-ordered migration sequence: every entity appears
    /// after all entities it depends on.
    pub fn migration_order(&self) -> &[String] {
        &self.migration_order
    }

    /// Direct (not transitive) dependencies of an entity type.
    pub fn dependencies(&self, entity_type: &str) -> Result<Vec<&EntitySchema>, CoreError> {
        let schema = self.schema(entity_type)?;
        schema.dependencies.iter().map(|d| self.schema(d)).collect()
    }
}

/// Kahn's algorithm with a declaration-order ready queue.
fn topo_sort(
    entities: &[EntitySchema],
    index: &HashMap<String, usize>,
) -> Result<Vec<String>, CoreError> {
    let n = entities.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, entity) in entities.iter().enumerate() {
        for dep in &entity.dependencies {
            let d = index[dep];
            in_degree[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut order = Vec::with_capacity(n);
    let mut ready: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();

    while let Some(i) = ready.first().copied() {
        ready.remove(0);
        order.push(entities[i].entity_type.clone());
        for &dep in &dependents[i] {
            in_degree[dep] -= 1;
            if in_degree[dep] == 0 {
                // Keep the ready queue sorted by declaration order.
                let pos = ready.partition_point(|&r| r < dep);
                ready.insert(pos, dep);
            }
        }
    }

    if order.len() < n {
        let stuck: Vec<&str> = entities
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, e)| e.entity_type.as_str())
            .collect();
        return Err(CoreError::CyclicDependency(stuck.join(", ")));
    }

    Ok(order)
}

// ---------------------------------------------------------------------------
// Default catalog
// ---------------------------------------------------------------------------

/// The built-in entity registry shipped with the server binary.
///
/// Migration order: customers and products first, then contacts and
/// orders, then payments.
pub fn default_catalog() -> EntityCatalog {
    use serde_json::json;
    use FieldType::*;

    let entities = vec![
        EntitySchema {
            entity_type: "customers".to_string(),
            display_name: "Customers".to_string(),
            fields: vec![
                FieldInfo::new("name", String).required(),
                FieldInfo::new("email", String).required().unique(),
                FieldInfo::new("phone", String),
                FieldInfo::new("status", Enum)
                    .with_enum(&["active", "inactive", "prospect"])
                    .with_default(json!("active")),
                FieldInfo::new("credit_limit", Number),
                FieldInfo::new("signup_date", Date),
                FieldInfo::new("vip", Boolean).with_default(json!(false)),
            ],
            dependencies: vec![],
        },
        EntitySchema {
            entity_type: "products".to_string(),
            display_name: "Products".to_string(),
            fields: vec![
                FieldInfo::new("sku", String).required().unique(),
                FieldInfo::new("name", String).required(),
                FieldInfo::new("price", Number).required(),
                FieldInfo::new("category", Enum)
                    .with_enum(&["hardware", "software", "service"]),
                FieldInfo::new("discontinued", Boolean).with_default(json!(false)),
            ],
            dependencies: vec![],
        },
        EntitySchema {
            entity_type: "contacts".to_string(),
            display_name: "Contacts".to_string(),
            fields: vec![
                FieldInfo::new("email", String).required().unique(),
                FieldInfo::new("first_name", String).required(),
                FieldInfo::new("last_name", String),
                FieldInfo::new("customer_email", Reference).required(),
                FieldInfo::new("role", Enum)
                    .with_enum(&["billing", "technical", "primary"])
                    .with_default(json!("primary")),
            ],
            dependencies: vec!["customers".to_string()],
        },
        EntitySchema {
            entity_type: "orders".to_string(),
            display_name: "Orders".to_string(),
            fields: vec![
                FieldInfo::new("order_number", String).required().unique(),
                FieldInfo::new("customer_email", Reference).required(),
                FieldInfo::new("product_sku", Reference).required(),
                FieldInfo::new("quantity", Number).with_default(json!(1)),
                FieldInfo::new("placed_at", Date),
                FieldInfo::new("status", Enum)
                    .with_enum(&["open", "shipped", "cancelled"])
                    .with_default(json!("open")),
            ],
            dependencies: vec!["customers".to_string(), "products".to_string()],
        },
        EntitySchema {
            entity_type: "payments".to_string(),
            display_name: "Payments".to_string(),
            fields: vec![
                FieldInfo::new("payment_ref", String).required().unique(),
                FieldInfo::new("order_number", Reference).required(),
                FieldInfo::new("amount", Number).required(),
                FieldInfo::new("paid_at", Date),
                FieldInfo::new("method", Enum).with_enum(&["card", "transfer", "cash"]),
            ],
            dependencies: vec!["orders".to_string()],
        },
    ];

    EntityCatalog::new(entities).expect("built-in catalog must be valid")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
