//! PostgreSQL mapper: introspects one schema through information_schema and runs the CRUD
//! primitives as parameterized statements.

use crate::config::{Entity, EntityMetadata, FieldMetadata, FieldType, RelationMetadata};
use crate::error::MapperError;
use crate::mapper::{Filter, FindOptions, Mapper, Row};
use crate::sql::{self, quoted, PgBindValue, PgTable, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};

/// Applied when a list request carries no `limit`.
pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 1000;

const COLUMNS_SQL: &str = r#"
SELECT c.table_name::text, c.column_name::text, c.data_type::text, c.udt_schema::text, c.udt_name::text,
       (c.is_nullable = 'YES') AS nullable,
       (c.column_default IS NOT NULL OR c.is_identity = 'YES') AS has_default
FROM information_schema.columns c
JOIN information_schema.tables t ON t.table_schema = c.table_schema AND t.table_name = c.table_name
WHERE c.table_schema = $1 AND t.table_type = 'BASE TABLE'
ORDER BY c.table_name, c.ordinal_position
"#;

const PRIMARY_KEYS_SQL: &str = r#"
SELECT tc.table_name::text, kcu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_schema = tc.constraint_schema
 AND kcu.constraint_name = tc.constraint_name
 AND kcu.table_name = tc.table_name
WHERE tc.table_schema = $1 AND tc.constraint_type = 'PRIMARY KEY'
ORDER BY tc.table_name, kcu.ordinal_position
"#;

const FOREIGN_KEYS_SQL: &str = r#"
SELECT kcu.table_name::text, kcu.constraint_name::text, kcu.column_name::text,
       ccu.table_name::text, ccu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_schema = tc.constraint_schema
 AND kcu.constraint_name = tc.constraint_name
 AND kcu.table_name = tc.table_name
JOIN information_schema.constraint_column_usage ccu
  ON ccu.constraint_schema = tc.constraint_schema
 AND ccu.constraint_name = tc.constraint_name
WHERE tc.table_schema = $1 AND tc.constraint_type = 'FOREIGN KEY' AND ccu.table_schema = $1
ORDER BY kcu.table_name, kcu.constraint_name
"#;

type ColumnRow = (String, String, String, String, String, bool, bool);
type ForeignKeyRow = (String, String, String, String, String);

pub struct PgMapper {
    pool: PgPool,
    metadata: Vec<EntityMetadata>,
    tables: HashMap<String, PgTable>,
}

/// Parameter cast for a column; user-defined types are schema-qualified.
fn cast_type(data_type: &str, udt_schema: &str, udt_name: &str) -> String {
    match data_type {
        "USER-DEFINED" => format!("{}.{}", quoted(udt_schema), quoted(udt_name)),
        "ARRAY" => format!("{}[]", udt_name.trim_start_matches('_')),
        _ => udt_name.to_string(),
    }
}

fn field_type(data_type: &str, udt_name: &str) -> FieldType {
    match data_type {
        "USER-DEFINED" | "ARRAY" => FieldType::String,
        _ => FieldType::from_sql(udt_name),
    }
}

fn map_db_error(err: sqlx::Error) -> MapperError {
    if let Some(db) = err.as_database_error() {
        if let Some(mapped) = db.code().and_then(|code| classify_sqlstate(&code, db.message())) {
            return mapped;
        }
    }
    MapperError::Db(err)
}

/// Class 22 is a data exception (bad input for the column type), class 23 an integrity
/// constraint violation.
fn classify_sqlstate(code: &str, message: &str) -> Option<MapperError> {
    match code.get(..2) {
        Some("22") => Some(MapperError::InvalidValue(message.to_string())),
        Some("23") => Some(MapperError::Constraint(message.to_string())),
        _ => None,
    }
}

impl PgMapper {
    /// Introspect `schema` and keep every base table with a single-column primary key.
    pub async fn connect(pool: PgPool, schema: &str) -> Result<Self, MapperError> {
        let columns: Vec<ColumnRow> = sqlx::query_as(COLUMNS_SQL).bind(schema).fetch_all(&pool).await?;
        let primary_keys: Vec<(String, String)> =
            sqlx::query_as(PRIMARY_KEYS_SQL).bind(schema).fetch_all(&pool).await?;
        let foreign_keys: Vec<ForeignKeyRow> =
            sqlx::query_as(FOREIGN_KEYS_SQL).bind(schema).fetch_all(&pool).await?;

        let mut pk_columns: HashMap<String, Vec<String>> = HashMap::new();
        for (table, column) in primary_keys {
            pk_columns.entry(table).or_default().push(column);
        }

        let mut by_table: BTreeMap<String, (Vec<FieldMetadata>, HashMap<String, String>)> = BTreeMap::new();
        for (table, column, data_type, udt_schema, udt_name, nullable, has_default) in columns {
            let entry = by_table.entry(table).or_default();
            let mut field = FieldMetadata::new(&column, field_type(&data_type, &udt_name));
            field.nullable = nullable;
            field.has_default = has_default;
            entry.1.insert(column, cast_type(&data_type, &udt_schema, &udt_name));
            entry.0.push(field);
        }

        let mut kept: BTreeMap<String, EntityMetadata> = BTreeMap::new();
        let mut tables = HashMap::new();
        for (table, (fields, casts)) in by_table {
            let pk = match pk_columns.get(&table).map(Vec::as_slice) {
                Some([pk]) => pk.clone(),
                Some(_) => {
                    tracing::warn!(table = %table, "composite primary key, table not exposed");
                    continue;
                }
                None => {
                    tracing::warn!(table = %table, "no primary key, table not exposed");
                    continue;
                }
            };
            let mut meta = EntityMetadata::new(&table, &pk);
            meta.fields = fields;
            tables.insert(
                table.clone(),
                PgTable {
                    schema: schema.to_string(),
                    table: table.clone(),
                    casts,
                },
            );
            kept.insert(table, meta);
        }

        let mut constraints: BTreeMap<(String, String), Vec<(String, String, String)>> = BTreeMap::new();
        for (table, constraint, column, target, target_column) in foreign_keys {
            constraints
                .entry((table, constraint))
                .or_default()
                .push((column, target, target_column));
        }
        for ((table, constraint), columns) in constraints {
            let [(column, target, target_column)] = columns.as_slice() else {
                tracing::debug!(table = %table, constraint = %constraint, "multi-column foreign key ignored");
                continue;
            };
            if !kept.contains_key(target) {
                continue;
            }
            if let Some(meta) = kept.get_mut(&table) {
                if meta.relations.iter().any(|r| &r.field == column) {
                    continue;
                }
                meta.relations.push(RelationMetadata {
                    field: column.clone(),
                    entity: target.clone(),
                    referenced_field: Some(target_column.clone()),
                });
            }
        }

        let metadata: Vec<EntityMetadata> = kept.into_values().collect();
        tracing::info!(schema = %schema, tables = metadata.len(), "introspected database schema");
        Ok(PgMapper { pool, metadata, tables })
    }

    fn table(&self, entity: &Entity) -> Result<&PgTable, MapperError> {
        self.tables
            .get(&entity.name)
            .ok_or_else(|| MapperError::UnknownEntity(entity.name.clone()))
    }

    async fn fetch_optional(&self, entity: &Entity, q: &QueryBuf) -> Result<Option<Row>, MapperError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(&self.pool).await.map_err(map_db_error)?;
        row.map(|r| row_to_json(entity, &r)).transpose()
    }

    async fn fetch_all(&self, entity: &Entity, q: &QueryBuf) -> Result<Vec<Row>, MapperError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_db_error)?;
        rows.iter().map(|r| row_to_json(entity, r)).collect()
    }
}

/// Decode a row produced by the builder's select list.
fn row_to_json(entity: &Entity, row: &PgRow) -> Result<Row, MapperError> {
    let mut map = Row::new();
    for field in &entity.fields {
        map.insert(field.name.clone(), cell_to_value(row, &field.name, field.field_type)?);
    }
    Ok(map)
}

fn cell_to_value(row: &PgRow, name: &str, field_type: FieldType) -> Result<Value, MapperError> {
    use sqlx::Row as _;
    let value = match field_type {
        FieldType::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
        FieldType::Number => row
            .try_get::<Option<f64>, _>(name)?
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        FieldType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
        FieldType::String | FieldType::Timestamp | FieldType::Date | FieldType::Uuid => {
            row.try_get::<Option<String>, _>(name)?.map(Value::String)
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

#[async_trait]
impl Mapper for PgMapper {
    async fn entities(&self) -> Result<Vec<EntityMetadata>, MapperError> {
        Ok(self.metadata.clone())
    }

    async fn insert(&self, entity: &Entity, values: Row) -> Result<Row, MapperError> {
        let q = sql::insert(entity, self.table(entity)?, &values);
        self.fetch_optional(entity, &q)
            .await?
            .ok_or(MapperError::Db(sqlx::Error::RowNotFound))
    }

    async fn find_by_id(&self, entity: &Entity, id: &Value) -> Result<Option<Row>, MapperError> {
        let q = sql::select_by_id(entity, self.table(entity)?, id);
        self.fetch_optional(entity, &q).await
    }

    async fn find(&self, entity: &Entity, options: &FindOptions) -> Result<Vec<Row>, MapperError> {
        let mut options = options.clone();
        options.limit = Some(options.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT));
        let q = sql::select_list(entity, self.table(entity)?, &options);
        self.fetch_all(entity, &q).await
    }

    async fn count(&self, entity: &Entity, filters: &[Filter]) -> Result<u64, MapperError> {
        let q = sql::count(self.table(entity)?, filters);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let n = query.fetch_one(&self.pool).await.map_err(map_db_error)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn update_by_id(&self, entity: &Entity, id: &Value, values: Row) -> Result<Option<Row>, MapperError> {
        let q = sql::update(entity, self.table(entity)?, id, &values);
        self.fetch_optional(entity, &q).await
    }

    async fn delete_by_id(&self, entity: &Entity, id: &Value) -> Result<Option<Row>, MapperError> {
        let q = sql::delete(entity, self.table(entity)?, id);
        self.fetch_optional(entity, &q).await
    }
}
