//! Metadata validation: identifiers, primary keys, name uniqueness and relation integrity.

use crate::case::to_camel_case;
use crate::config::EntityMetadata;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn identifier() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"))
}

pub fn validate(entities: &[EntityMetadata]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for e in entities {
        if !identifier().is_match(&e.name) {
            return Err(ConfigError::InvalidIdentifier(e.name.clone()));
        }
        if !names.insert(e.name.as_str()) {
            return Err(ConfigError::DuplicateEntity(e.name.clone()));
        }

        let mut field_names = HashSet::new();
        let mut api_names = HashSet::new();
        for f in &e.fields {
            if !identifier().is_match(&f.name) {
                return Err(ConfigError::InvalidIdentifier(format!("{}.{}", e.name, f.name)));
            }
            if !field_names.insert(f.name.as_str()) || !api_names.insert(to_camel_case(&f.name)) {
                return Err(ConfigError::DuplicateField {
                    entity: e.name.clone(),
                    field: f.name.clone(),
                });
            }
        }
        if !field_names.contains(e.primary_key.as_str()) {
            return Err(ConfigError::InvalidPrimaryKey {
                entity: e.name.clone(),
                field: e.primary_key.clone(),
            });
        }
    }

    let fields_by_entity: HashMap<&str, HashSet<&str>> = entities
        .iter()
        .map(|e| (e.name.as_str(), e.fields.iter().map(|f| f.name.as_str()).collect()))
        .collect();
    for e in entities {
        for r in &e.relations {
            if !fields_by_entity[e.name.as_str()].contains(r.field.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "relation field",
                    id: format!("{}.{}", e.name, r.field),
                });
            }
            let target = fields_by_entity.get(r.entity.as_str()).ok_or_else(|| ConfigError::MissingReference {
                kind: "entity",
                id: r.entity.clone(),
            })?;
            if let Some(referenced) = &r.referenced_field {
                if !target.contains(referenced.as_str()) {
                    return Err(ConfigError::MissingReference {
                        kind: "referenced field",
                        id: format!("{}.{}", r.entity, referenced),
                    });
                }
            }
        }
    }

    Ok(())
}
