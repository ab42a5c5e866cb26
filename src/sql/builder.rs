//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE for one entity table.
//! Identifiers come from introspected metadata only and are always quoted; values are always
//! parameters.

use crate::config::{Entity, Field, FieldType};
use crate::mapper::{Filter, FilterOp, FindOptions, Row, SortDirection};
use serde_json::Value;
use std::collections::HashMap;

/// Where an entity lives and the SQL type each column's parameters are cast to.
#[derive(Clone, Debug)]
pub struct PgTable {
    pub schema: String,
    pub table: String,
    /// Internal field name -> cast type, e.g. "int4", "timestamptz", "\"public\".\"mood\"".
    pub casts: HashMap<String, String>,
}

impl PgTable {
    fn qualified(&self) -> String {
        format!("{}.{}", quoted(&self.schema), quoted(&self.table))
    }

    fn placeholder(&self, column: &str, n: u32) -> String {
        match self.casts.get(column) {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn push_param(&mut self, v: Value) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }
}

/// Output expression of one column. Values leave the database as int8, float8, bool or text so
/// decoding does not depend on the exact column type. Timestamps without a zone are read as UTC
/// so the text always carries an offset.
fn select_expr(table: &PgTable, field: &Field) -> String {
    let q = quoted(&field.name);
    let expr = match field.field_type {
        FieldType::Integer => format!("{}::int8", q),
        FieldType::Number => format!("{}::float8", q),
        FieldType::Boolean => q.clone(),
        FieldType::String | FieldType::Uuid => format!("{}::text", q),
        FieldType::Timestamp if table.casts.get(&field.name).map(String::as_str) == Some("timestamp") => {
            format!("to_json({} AT TIME ZONE 'UTC') #>> '{{}}'", q)
        }
        FieldType::Timestamp | FieldType::Date => format!("to_json({}) #>> '{{}}'", q),
    };
    format!("{} AS {}", expr, q)
}

fn select_column_list(entity: &Entity, table: &PgTable) -> String {
    entity
        .fields
        .iter()
        .map(|f| select_expr(table, f))
        .collect::<Vec<_>>()
        .join(", ")
}

fn filter_sql(q: &mut QueryBuf, table: &PgTable, filter: &Filter) -> String {
    let col = quoted(&filter.field);
    match (filter.op, &filter.value) {
        (FilterOp::Eq, Value::Null) => format!("{} IS NULL", col),
        (FilterOp::Neq, Value::Null) => format!("{} IS NOT NULL", col),
        (_, Value::Null) => "FALSE".to_string(),
        (FilterOp::In | FilterOp::Nin, Value::Array(values)) => {
            if values.is_empty() {
                return if filter.op == FilterOp::In { "FALSE" } else { "TRUE" }.to_string();
            }
            let placeholders: Vec<String> = values
                .iter()
                .map(|v| {
                    let n = q.push_param(v.clone());
                    table.placeholder(&filter.field, n)
                })
                .collect();
            let keyword = if filter.op == FilterOp::In { "IN" } else { "NOT IN" };
            format!("{} {} ({})", col, keyword, placeholders.join(", "))
        }
        (op, value) => {
            let n = q.push_param(value.clone());
            let sql_op = match op {
                FilterOp::Eq | FilterOp::In => "=",
                FilterOp::Neq | FilterOp::Nin => "<>",
                FilterOp::Gt => ">",
                FilterOp::Gte => ">=",
                FilterOp::Lt => "<",
                FilterOp::Lte => "<=",
            };
            format!("{} {} {}", col, sql_op, table.placeholder(&filter.field, n))
        }
    }
}

fn where_clause(q: &mut QueryBuf, table: &PgTable, filters: &[Filter]) -> String {
    let parts: Vec<String> = filters.iter().map(|f| filter_sql(q, table, f)).collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT by primary key. The id is the sole parameter.
pub fn select_by_id(entity: &Entity, table: &PgTable, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::default();
    let pk = &entity.primary_key().name;
    let n = q.push_param(id.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity, table),
        table.qualified(),
        quoted(pk),
        table.placeholder(pk, n)
    );
    q
}

/// SELECT list: filters ANDed, requested ordering then primary key, optional LIMIT/OFFSET.
pub fn select_list(entity: &Entity, table: &PgTable, options: &FindOptions) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_clause = where_clause(&mut q, table, &options.filters);

    let pk = &entity.primary_key().name;
    let mut order: Vec<String> = options
        .order_by
        .iter()
        .map(|o| {
            let dir = match o.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            format!("{} {}", quoted(&o.field), dir)
        })
        .collect();
    if !options.order_by.iter().any(|o| &o.field == pk) {
        order.push(quoted(pk));
    }

    let limit_clause = options.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = options.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}{}",
        select_column_list(entity, table),
        table.qualified(),
        where_clause,
        order.join(", "),
        limit_clause,
        offset_clause
    );
    q
}

pub fn count(table: &PgTable, filters: &[Filter]) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_clause = where_clause(&mut q, table, filters);
    q.sql = format!("SELECT COUNT(*) AS \"count\" FROM {}{}", table.qualified(), where_clause);
    q
}

/// INSERT the provided columns only; omitted columns take their database default.
pub fn insert(entity: &Entity, table: &PgTable, values: &Row) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for field in &entity.fields {
        let Some(v) = values.get(&field.name) else { continue };
        let n = q.push_param(v.clone());
        cols.push(quoted(&field.name));
        placeholders.push(table.placeholder(&field.name, n));
    }
    let returning = select_column_list(entity, table);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table.qualified(), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table.qualified(),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only the provided non-key columns. Nothing to set reads the row instead.
pub fn update(entity: &Entity, table: &PgTable, id: &Value, values: &Row) -> QueryBuf {
    let pk = &entity.primary_key().name;
    let mut q = QueryBuf::default();
    let mut sets = Vec::new();
    for field in &entity.fields {
        if &field.name == pk {
            continue;
        }
        let Some(v) = values.get(&field.name) else { continue };
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(&field.name), table.placeholder(&field.name, n)));
    }
    if sets.is_empty() {
        return select_by_id(entity, table, id);
    }
    let n = q.push_param(id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        table.qualified(),
        sets.join(", "),
        quoted(pk),
        table.placeholder(pk, n),
        select_column_list(entity, table)
    );
    q
}

/// DELETE by id, returning the removed row.
pub fn delete(entity: &Entity, table: &PgTable, id: &Value) -> QueryBuf {
    let pk = &entity.primary_key().name;
    let mut q = QueryBuf::default();
    let n = q.push_param(id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        table.qualified(),
        quoted(pk),
        table.placeholder(pk, n),
        select_column_list(entity, table)
    );
    q
}
