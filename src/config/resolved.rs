//! Resolved entity model: metadata validated and flattened for runtime use.
//! Built once at startup and shared read-only across requests.

use crate::config::FieldType;
use std::collections::HashMap;
use std::sync::Arc;

/// Target of a foreign key field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    pub entity: String,
    pub field: String,
}

#[derive(Clone, Debug)]
pub struct Field {
    /// Internal (storage) name, as the mapper knows it.
    pub name: String,
    /// External name used in request/response bodies and query parameters.
    pub api_name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub has_default: bool,
    pub primary_key: bool,
    pub relation: Option<Relation>,
}

impl Field {
    /// Required in the create input: not server-assigned, not nullable, no default.
    pub fn required_on_create(&self) -> bool {
        !self.primary_key && !self.nullable && !self.has_default
    }
}

#[derive(Clone, Debug)]
pub struct Entity {
    /// Path segment and mapper identifier, e.g. "pages".
    pub name: String,
    /// e.g. "page"
    pub singular: String,
    /// PascalCase singular, e.g. "Page". Used for operation ids and schema component names.
    pub type_name: String,
    /// Fields in declared order.
    pub fields: Vec<Field>,
    pk_index: usize,
}

impl Entity {
    pub(crate) fn new(name: String, singular: String, type_name: String, fields: Vec<Field>, pk_index: usize) -> Self {
        Entity {
            name,
            singular,
            type_name,
            fields,
            pk_index,
        }
    }

    pub fn primary_key(&self) -> &Field {
        &self.fields[self.pk_index]
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_api_name(&self, api_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.api_name == api_name)
    }

    /// Fields accepted by create and update bodies.
    pub fn input_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.primary_key)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    /// Entities in metadata order.
    pub entities: Vec<Arc<Entity>>,
    by_name: HashMap<String, usize>,
}

impl ResolvedModel {
    pub(crate) fn new(entities: Vec<Entity>) -> Self {
        let by_name = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        ResolvedModel {
            entities: entities.into_iter().map(Arc::new).collect(),
            by_name,
        }
    }

    pub fn entity(&self, name: &str) -> Option<&Arc<Entity>> {
        self.by_name.get(name).map(|&i| &self.entities[i])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
