//! Raw entity metadata as reported by a mapper (or loaded from JSON).

use serde::{Deserialize, Serialize};

/// Semantic type of a field. Drives JSON Schema types, path/query coercion and SQL casts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Timestamp,
    /// Calendar date without time.
    Date,
    Uuid,
}

impl FieldType {
    /// JSON Schema `type` keyword for this field type.
    pub fn json_type(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::Timestamp | FieldType::Date | FieldType::Uuid => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        }
    }

    /// JSON Schema `format` keyword, for string-encoded types that have one.
    pub fn format(&self) -> Option<&'static str> {
        match self {
            FieldType::Timestamp => Some("date-time"),
            FieldType::Date => Some("date"),
            FieldType::Uuid => Some("uuid"),
            _ => None,
        }
    }

    /// Map a SQL type name (e.g. `information_schema.columns.data_type`) to a semantic type.
    pub fn from_sql(sql_type: &str) -> FieldType {
        let lower = sql_type.to_lowercase();
        if matches!(
            lower.as_str(),
            "smallint" | "integer" | "int" | "bigint" | "int2" | "int4" | "int8"
        ) || lower.ends_with("serial")
        {
            FieldType::Integer
        } else if lower == "numeric"
            || lower == "decimal"
            || lower == "real"
            || lower.starts_with("double")
            || lower.starts_with("float")
        {
            FieldType::Number
        } else if lower.starts_with("bool") {
            FieldType::Boolean
        } else if lower.starts_with("timestamp") {
            FieldType::Timestamp
        } else if lower == "date" {
            FieldType::Date
        } else if lower == "uuid" {
            FieldType::Uuid
        } else {
            FieldType::String
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub has_default: bool,
}

fn default_true() -> bool {
    true
}

impl FieldMetadata {
    /// A non-nullable field without default.
    pub fn new(name: impl Into<String>, type_: FieldType) -> Self {
        FieldMetadata {
            name: name.into(),
            type_,
            nullable: false,
            has_default: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

/// Foreign key: `field` on this entity references `referenced_field` (default: the referenced
/// entity's primary key) on `entity`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationMetadata {
    pub field: String,
    pub entity: String,
    #[serde(default)]
    pub referenced_field: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub name: String,
    /// Singular form used in operation ids and schema names; derived from `name` when absent.
    #[serde(default)]
    pub singular: Option<String>,
    pub primary_key: String,
    pub fields: Vec<FieldMetadata>,
    #[serde(default)]
    pub relations: Vec<RelationMetadata>,
}

impl EntityMetadata {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        EntityMetadata {
            name: name.into(),
            singular: None,
            primary_key: primary_key.into(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldMetadata) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_relation(mut self, field: impl Into<String>, entity: impl Into<String>) -> Self {
        self.relations.push(RelationMetadata {
            field: field.into(),
            entity: entity.into(),
            referenced_field: None,
        });
        self
    }

    pub fn with_singular(mut self, singular: impl Into<String>) -> Self {
        self.singular = Some(singular.into());
        self
    }
}
