//! Generic CRUD execution through the mapper. Translates "no matching row" into
//! [`AppError::NotFound`] and shapes rows into response objects.

use crate::config::Entity;
use crate::error::AppError;
use crate::mapper::{Mapper, Row};
use crate::projection::{shape, FieldSet};
use crate::query::ListQuery;
use serde_json::Value;

/// One shaped row plus its primary key value.
pub struct Created {
    pub id: Value,
    pub body: Value,
}

pub struct Listed {
    pub rows: Vec<Value>,
    pub total_count: Option<u64>,
}

pub struct CrudService;

impl CrudService {
    pub async fn create(
        mapper: &dyn Mapper,
        entity: &Entity,
        values: Row,
        fields: Option<&FieldSet>,
    ) -> Result<Created, AppError> {
        tracing::debug!(entity = %entity.name, fields = values.len(), "create");
        let row = mapper.insert(entity, values).await?;
        let id = row.get(&entity.primary_key().name).cloned().unwrap_or(Value::Null);
        Ok(Created {
            id,
            body: shape(entity, &row, fields),
        })
    }

    pub async fn read(
        mapper: &dyn Mapper,
        entity: &Entity,
        id: &Value,
        fields: Option<&FieldSet>,
    ) -> Result<Value, AppError> {
        tracing::debug!(entity = %entity.name, id = %id, "read");
        let row = mapper.find_by_id(entity, id).await?.ok_or(AppError::NotFound)?;
        Ok(shape(entity, &row, fields))
    }

    /// List rows; `limit`/`offset` go to the mapper untouched.
    pub async fn list(mapper: &dyn Mapper, entity: &Entity, query: &ListQuery) -> Result<Listed, AppError> {
        tracing::debug!(entity = %entity.name, options = ?query.options, "list");
        let rows = mapper.find(entity, &query.options).await?;
        let total_count = if query.total_count {
            Some(mapper.count(entity, &query.options.filters).await?)
        } else {
            None
        };
        Ok(Listed {
            rows: rows.iter().map(|r| shape(entity, r, query.fields.as_ref())).collect(),
            total_count,
        })
    }

    /// Update the provided fields only. The primary key is never part of `values`.
    pub async fn update(
        mapper: &dyn Mapper,
        entity: &Entity,
        id: &Value,
        mut values: Row,
        fields: Option<&FieldSet>,
    ) -> Result<Value, AppError> {
        tracing::debug!(entity = %entity.name, id = %id, fields = values.len(), "update");
        values.remove(&entity.primary_key().name);
        let row = mapper
            .update_by_id(entity, id, values)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(shape(entity, &row, fields))
    }

    /// Delete and return the row as it was before deletion.
    pub async fn delete(
        mapper: &dyn Mapper,
        entity: &Entity,
        id: &Value,
        fields: Option<&FieldSet>,
    ) -> Result<Value, AppError> {
        tracing::debug!(entity = %entity.name, id = %id, "delete");
        let row = mapper.delete_by_id(entity, id).await?.ok_or(AppError::NotFound)?;
        Ok(shape(entity, &row, fields))
    }
}
