//! In-process mapper keeping rows in insertion order. Enforces NOT NULL, primary key
//! uniqueness and foreign keys the way a relational store would, so the engine sees the same
//! failure shapes as against a real database.

use crate::config::{Entity, EntityMetadata, Field, FieldType};
use crate::error::MapperError;
use crate::mapper::{Filter, FilterOp, FindOptions, Mapper, OrderBy, Row, SortDirection};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Table {
    rows: Vec<Row>,
    last_id: i64,
}

pub struct MemoryMapper {
    metadata: Vec<EntityMetadata>,
    defaults: HashMap<(String, String), Value>,
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryMapper {
    pub fn new(metadata: Vec<EntityMetadata>) -> Self {
        let tables = metadata
            .iter()
            .map(|e| (e.name.clone(), Table::default()))
            .collect();
        MemoryMapper {
            metadata,
            defaults: HashMap::new(),
            tables: RwLock::new(tables),
        }
    }

    /// Value stored for `entity.field` when an insert omits it. Only consulted for fields whose
    /// metadata says `has_default`; without a registered value such fields default to null.
    pub fn with_default(mut self, entity: &str, field: &str, value: Value) -> Self {
        self.defaults.insert((entity.to_string(), field.to_string()), value);
        self
    }

    fn default_for(&self, entity: &Entity, field: &Field) -> Value {
        self.defaults
            .get(&(entity.name.clone(), field.name.clone()))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

fn cell<'a>(row: &'a Row, field: &str) -> &'a Value {
    row.get(field).unwrap_or(&Value::Null)
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// SQL three-valued logic collapsed to bool: comparisons against NULL never match.
fn matches(row: &Row, filter: &Filter) -> bool {
    let value = cell(row, &filter.field);
    if filter.value.is_null() {
        return match filter.op {
            FilterOp::Eq => value.is_null(),
            FilterOp::Neq => !value.is_null(),
            _ => false,
        };
    }
    if value.is_null() {
        return false;
    }
    let list = || filter.value.as_array().map(Vec::as_slice).unwrap_or_default();
    match filter.op {
        FilterOp::Eq => same_value(value, &filter.value),
        FilterOp::Neq => !same_value(value, &filter.value),
        FilterOp::Gt => compare(value, &filter.value) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(compare(value, &filter.value), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => compare(value, &filter.value) == Some(Ordering::Less),
        FilterOp::Lte => matches!(compare(value, &filter.value), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::In => list().iter().any(|v| same_value(value, v)),
        FilterOp::Nin => !list().iter().any(|v| same_value(value, v)),
    }
}

/// Nulls sort last ascending and first descending.
fn order(a: &Row, b: &Row, order_by: &[OrderBy]) -> Ordering {
    for o in order_by {
        let (x, y) = (cell(a, &o.field), cell(b, &o.field));
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare(x, y).unwrap_or(Ordering::Equal),
        };
        let ord = match o.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn generate_id(entity: &Entity, field: &Field, last_id: &mut i64) -> Result<Value, MapperError> {
    match field.field_type {
        FieldType::Integer | FieldType::Number => {
            *last_id += 1;
            Ok(Value::from(*last_id))
        }
        FieldType::String | FieldType::Uuid => Ok(Value::String(uuid::Uuid::new_v4().to_string())),
        _ => Err(MapperError::Constraint(format!(
            "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
            field.name, entity.name
        ))),
    }
}

/// NOT NULL and foreign key checks for a row about to be written.
fn check_row(tables: &HashMap<String, Table>, entity: &Entity, row: &Row) -> Result<(), MapperError> {
    for field in &entity.fields {
        let value = cell(row, &field.name);
        if value.is_null() {
            if !field.nullable {
                return Err(MapperError::Constraint(format!(
                    "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                    field.name, entity.name
                )));
            }
            continue;
        }
        if let Some(relation) = &field.relation {
            let exists = tables
                .get(&relation.entity)
                .map(|t| t.rows.iter().any(|r| same_value(cell(r, &relation.field), value)))
                .unwrap_or(false);
            if !exists {
                return Err(MapperError::Constraint(format!(
                    "insert or update on table \"{}\" violates foreign key constraint on \"{}\"",
                    entity.name, field.name
                )));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Mapper for MemoryMapper {
    async fn entities(&self) -> Result<Vec<EntityMetadata>, MapperError> {
        Ok(self.metadata.clone())
    }

    async fn insert(&self, entity: &Entity, values: Row) -> Result<Row, MapperError> {
        tracing::debug!(entity = %entity.name, "memory insert");
        let mut tables = self.tables.write().await;
        let pk = entity.primary_key();
        let table = tables
            .get(&entity.name)
            .ok_or_else(|| MapperError::UnknownEntity(entity.name.clone()))?;

        let mut last_id = table.last_id;
        let mut row = Row::new();
        for field in &entity.fields {
            let value = match values.get(&field.name) {
                Some(v) if !(field.primary_key && v.is_null()) => v.clone(),
                _ if field.primary_key => generate_id(entity, field, &mut last_id)?,
                _ if field.has_default => self.default_for(entity, field),
                _ => Value::Null,
            };
            row.insert(field.name.clone(), value);
        }

        let id = cell(&row, &pk.name);
        if table.rows.iter().any(|r| same_value(cell(r, &pk.name), id)) {
            return Err(MapperError::Constraint(format!(
                "duplicate key value violates unique constraint \"{}_pkey\"",
                entity.name
            )));
        }
        check_row(&tables, entity, &row)?;

        if let Some(n) = cell(&row, &pk.name).as_i64() {
            last_id = last_id.max(n);
        }
        let table = tables
            .get_mut(&entity.name)
            .ok_or_else(|| MapperError::UnknownEntity(entity.name.clone()))?;
        table.last_id = last_id;
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, entity: &Entity, id: &Value) -> Result<Option<Row>, MapperError> {
        tracing::debug!(entity = %entity.name, id = %id, "memory find_by_id");
        let tables = self.tables.read().await;
        let table = tables
            .get(&entity.name)
            .ok_or_else(|| MapperError::UnknownEntity(entity.name.clone()))?;
        let pk = &entity.primary_key().name;
        Ok(table.rows.iter().find(|r| same_value(cell(r, pk), id)).cloned())
    }

    async fn find(&self, entity: &Entity, options: &FindOptions) -> Result<Vec<Row>, MapperError> {
        tracing::debug!(entity = %entity.name, options = ?options, "memory find");
        let tables = self.tables.read().await;
        let table = tables
            .get(&entity.name)
            .ok_or_else(|| MapperError::UnknownEntity(entity.name.clone()))?;
        let mut rows: Vec<Row> = table
            .rows
            .iter()
            .filter(|r| options.filters.iter().all(|f| matches(r, f)))
            .cloned()
            .collect();
        if !options.order_by.is_empty() {
            rows.sort_by(|a, b| order(a, b, &options.order_by));
        }
        let offset = options.offset.unwrap_or(0) as usize;
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, entity: &Entity, filters: &[Filter]) -> Result<u64, MapperError> {
        let tables = self.tables.read().await;
        let table = tables
            .get(&entity.name)
            .ok_or_else(|| MapperError::UnknownEntity(entity.name.clone()))?;
        Ok(table.rows.iter().filter(|r| filters.iter().all(|f| matches(r, f))).count() as u64)
    }

    async fn update_by_id(&self, entity: &Entity, id: &Value, values: Row) -> Result<Option<Row>, MapperError> {
        tracing::debug!(entity = %entity.name, id = %id, "memory update_by_id");
        let mut tables = self.tables.write().await;
        let pk = &entity.primary_key().name;
        let table = tables
            .get(&entity.name)
            .ok_or_else(|| MapperError::UnknownEntity(entity.name.clone()))?;
        let Some(index) = table.rows.iter().position(|r| same_value(cell(r, pk), id)) else {
            return Ok(None);
        };

        let mut row = table.rows[index].clone();
        for (name, value) in values {
            if name != *pk && entity.field(&name).is_some() {
                row.insert(name, value);
            }
        }
        check_row(&tables, entity, &row)?;

        if let Some(table) = tables.get_mut(&entity.name) {
            table.rows[index] = row.clone();
        }
        Ok(Some(row))
    }

    async fn delete_by_id(&self, entity: &Entity, id: &Value) -> Result<Option<Row>, MapperError> {
        tracing::debug!(entity = %entity.name, id = %id, "memory delete_by_id");
        let mut tables = self.tables.write().await;
        let pk = &entity.primary_key().name;
        let table = tables
            .get(&entity.name)
            .ok_or_else(|| MapperError::UnknownEntity(entity.name.clone()))?;
        let Some(index) = table.rows.iter().position(|r| same_value(cell(r, pk), id)) else {
            return Ok(None);
        };
        let target = &table.rows[index];

        for referencing in &self.metadata {
            for relation in referencing.relations.iter().filter(|r| r.entity == entity.name) {
                let referenced = relation.referenced_field.as_deref().unwrap_or(pk);
                let key = cell(target, referenced);
                let in_use = tables
                    .get(&referencing.name)
                    .map(|t| t.rows.iter().any(|r| same_value(cell(r, &relation.field), key)))
                    .unwrap_or(false);
                if in_use {
                    return Err(MapperError::Constraint(format!(
                        "update or delete on table \"{}\" violates foreign key constraint on table \"{}\"",
                        entity.name, referencing.name
                    )));
                }
            }
        }

        let row = match tables.get_mut(&entity.name) {
            Some(table) => table.rows.remove(index),
            None => return Err(MapperError::UnknownEntity(entity.name.clone())),
        };
        Ok(Some(row))
    }
}
