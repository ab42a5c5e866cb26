//! Build the resolved model from mapper metadata or from a JSON metadata file.

use crate::case::{singularize, to_camel_case, to_pascal_case};
use crate::config::resolved::{Entity, Field, Relation, ResolvedModel};
use crate::config::types::EntityMetadata;
use crate::config::{validate, ApiConfig};
use crate::error::{AppError, ConfigError};
use crate::mapper::Mapper;
use std::collections::HashMap;
use std::path::Path;

/// Build resolved model from entity metadata. Ignored entities are dropped first; relations
/// pointing at them are dropped too and their fields stay plain fields.
pub fn resolve(metadata: &[EntityMetadata], config: &ApiConfig) -> Result<ResolvedModel, ConfigError> {
    let kept: Vec<EntityMetadata> = metadata
        .iter()
        .filter(|e| !config.is_ignored(&e.name))
        .cloned()
        .map(|mut e| {
            e.relations.retain(|r| !config.is_ignored(&r.entity));
            e
        })
        .collect();
    validate(&kept)?;

    let pk_by_entity: HashMap<&str, &str> = kept
        .iter()
        .map(|e| (e.name.as_str(), e.primary_key.as_str()))
        .collect();

    let mut entities = Vec::with_capacity(kept.len());
    let mut type_names: HashMap<String, &str> = HashMap::new();
    for e in &kept {
        let relations: HashMap<&str, Relation> = e
            .relations
            .iter()
            .map(|r| {
                let field = r
                    .referenced_field
                    .clone()
                    .unwrap_or_else(|| pk_by_entity[r.entity.as_str()].to_string());
                (
                    r.field.as_str(),
                    Relation {
                        entity: r.entity.clone(),
                        field,
                    },
                )
            })
            .collect();

        let mut pk_index = 0;
        let fields: Vec<Field> = e
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let primary_key = f.name == e.primary_key;
                if primary_key {
                    pk_index = i;
                }
                Field {
                    name: f.name.clone(),
                    api_name: to_camel_case(&f.name),
                    field_type: f.type_,
                    nullable: f.nullable && !primary_key,
                    has_default: f.has_default,
                    primary_key,
                    relation: relations.get(f.name.as_str()).cloned(),
                }
            })
            .collect();

        let singular = e.singular.clone().unwrap_or_else(|| singularize(&e.name));
        let type_name = to_pascal_case(&singular);
        if let Some(first) = type_names.insert(type_name.clone(), e.name.as_str()) {
            return Err(ConfigError::DuplicateTypeName {
                type_name,
                first: first.to_string(),
                second: e.name.clone(),
            });
        }
        entities.push(Entity::new(e.name.clone(), singular, type_name, fields, pk_index));
    }

    Ok(ResolvedModel::new(entities))
}

/// Ask the mapper for its metadata and resolve it.
pub async fn load_from_mapper(mapper: &dyn Mapper, config: &ApiConfig) -> Result<ResolvedModel, AppError> {
    let metadata = mapper.entities().await?;
    tracing::debug!(entities = metadata.len(), "loaded entity metadata from mapper");
    Ok(resolve(&metadata, config)?)
}

/// Load entity metadata from a JSON file holding an array of entities.
pub async fn load_metadata_file(path: impl AsRef<Path>) -> Result<Vec<EntityMetadata>, ConfigError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}
