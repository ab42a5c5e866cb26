//! Query string and path parameter parsing for the generated routes.
//!
//! List routes understand `limit`, `offset`, `totalCount`, `orderby.<field>=asc|desc` and
//! `where.<field>.<op>=<value>`; every route understands `fields`. Other keys are ignored.

use crate::config::{Entity, Field, FieldType};
use crate::error::AppError;
use crate::mapper::{Filter, FilterOp, FindOptions, OrderBy, SortDirection};
use crate::projection::{self, FieldSet};
use serde_json::{Number, Value};

pub const LIMIT_PARAM: &str = "limit";
pub const OFFSET_PARAM: &str = "offset";
pub const TOTAL_COUNT_PARAM: &str = "totalCount";
pub const ORDER_BY_PREFIX: &str = "orderby.";
pub const WHERE_PREFIX: &str = "where.";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub fields: Option<FieldSet>,
    pub options: FindOptions,
    pub total_count: bool,
}

/// Coerce a textual parameter to the field's type. `location` names the parameter in errors,
/// e.g. `params/id` or `querystring/where.title.eq`.
pub fn coerce(field: &Field, raw: &str, location: &str) -> Result<Value, AppError> {
    let invalid = || AppError::BadRequest(format!("{} must be {}", location, field.field_type.json_type()));
    match field.field_type {
        FieldType::String => Ok(Value::String(raw.to_string())),
        FieldType::Integer => raw.trim().parse::<i64>().map(Value::from).map_err(|_| invalid()),
        FieldType::Number => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        FieldType::Boolean => match raw.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        FieldType::Timestamp | FieldType::Date | FieldType::Uuid => {
            let format = field.field_type.format().unwrap_or_default();
            if matches_format(format, raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(AppError::BadRequest(format!("{} must match format \"{}\"", location, format)))
            }
        }
    }
}

pub fn is_date_time(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

/// Check a string against a JSON Schema `format`. Unknown formats accept anything.
pub fn matches_format(format: &str, s: &str) -> bool {
    match format {
        "date-time" => is_date_time(s),
        "date" => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        _ => true,
    }
}

/// Parse the `id` path segment according to the primary key type.
pub fn parse_id(entity: &Entity, raw: &str) -> Result<Value, AppError> {
    coerce(entity.primary_key(), raw, "params/id")
}

/// Projection only; used by every item route and by create.
pub fn parse_fields(entity: &Entity, query: &[(String, String)]) -> Result<Option<FieldSet>, AppError> {
    projection::resolve(entity, &projection::raw_fields(query))
}

fn non_negative(key: &str, raw: &str) -> Result<u64, AppError> {
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("querystring/{} must be integer", key)))?;
    u64::try_from(n).map_err(|_| AppError::BadRequest(format!("querystring/{} must be >= 0", key)))
}

fn field_for<'a>(entity: &'a Entity, key: &str, api_name: &str) -> Result<&'a Field, AppError> {
    entity
        .field_by_api_name(api_name)
        .ok_or_else(|| AppError::BadRequest(format!("querystring has unknown property '{}'", key)))
}

fn parse_where(entity: &Entity, key: &str, rest: &str, raw: &str) -> Result<Filter, AppError> {
    let (name, op) = rest
        .rsplit_once('.')
        .ok_or_else(|| AppError::BadRequest(format!("querystring has unknown property '{}'", key)))?;
    let field = field_for(entity, key, name)?;
    let op = FilterOp::parse(op)
        .ok_or_else(|| AppError::BadRequest(format!("querystring has unknown property '{}'", key)))?;
    let location = format!("querystring/{}", key);
    let value = if op.is_list() {
        let values = raw
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| coerce(field, v, &location))
            .collect::<Result<Vec<_>, _>>()?;
        Value::Array(values)
    } else {
        coerce(field, raw, &location)?
    };
    Ok(Filter {
        field: field.name.clone(),
        op,
        value,
    })
}

fn parse_direction(key: &str, raw: &str) -> Result<SortDirection, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "asc" => Ok(SortDirection::Asc),
        "desc" => Ok(SortDirection::Desc),
        _ => Err(AppError::BadRequest(format!(
            "querystring/{} must be equal to one of the allowed values",
            key
        ))),
    }
}

pub fn parse_list(entity: &Entity, query: &[(String, String)]) -> Result<ListQuery, AppError> {
    let mut out = ListQuery {
        fields: parse_fields(entity, query)?,
        ..ListQuery::default()
    };
    for (key, raw) in query {
        if key == LIMIT_PARAM {
            out.options.limit = Some(non_negative(key, raw)?);
        } else if key == OFFSET_PARAM {
            out.options.offset = Some(non_negative(key, raw)?);
        } else if key == TOTAL_COUNT_PARAM {
            out.total_count = match raw.trim() {
                "true" => true,
                "false" => false,
                _ => {
                    return Err(AppError::BadRequest(format!("querystring/{} must be boolean", key)));
                }
            };
        } else if let Some(name) = key.strip_prefix(ORDER_BY_PREFIX) {
            let field = field_for(entity, key, name)?;
            out.options.order_by.push(OrderBy {
                field: field.name.clone(),
                direction: parse_direction(key, raw)?,
            });
        } else if let Some(rest) = key.strip_prefix(WHERE_PREFIX) {
            out.options.filters.push(parse_where(entity, key, rest, raw)?);
        }
    }
    Ok(out)
}
