//! The persistence collaborator: metadata discovery plus per-entity CRUD primitives.
//! Rows are JSON objects keyed by internal field names.

mod memory;
mod pg;

pub use memory::MemoryMapper;
pub use pg::PgMapper;

use crate::config::{Entity, EntityMetadata};
use crate::error::MapperError;
use async_trait::async_trait;
use serde_json::Value;

pub type Row = serde_json::Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
}

impl FilterOp {
    pub const ALL: [FilterOp; 8] = [
        FilterOp::Eq,
        FilterOp::Neq,
        FilterOp::Gt,
        FilterOp::Gte,
        FilterOp::Lt,
        FilterOp::Lte,
        FilterOp::In,
        FilterOp::Nin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::In => "in",
            FilterOp::Nin => "nin",
        }
    }

    pub fn parse(s: &str) -> Option<FilterOp> {
        FilterOp::ALL.into_iter().find(|op| op.as_str() == s)
    }

    /// `in` and `nin` carry a list of values.
    pub fn is_list(&self) -> bool {
        matches!(self, FilterOp::In | FilterOp::Nin)
    }
}

/// `field <op> value`, with `field` an internal name. List operators carry a JSON array.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Options for [`Mapper::find`]. `limit`/`offset` are forwarded as given; a mapper may apply
/// its own default when `limit` is `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOptions {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
}

#[async_trait]
pub trait Mapper: Send + Sync {
    /// Enumerate entity metadata: fields, types, nullability, primary key, relations.
    async fn entities(&self) -> Result<Vec<EntityMetadata>, MapperError>;

    /// Insert one row and return it as stored (server-assigned values included).
    async fn insert(&self, entity: &Entity, values: Row) -> Result<Row, MapperError>;

    async fn find_by_id(&self, entity: &Entity, id: &Value) -> Result<Option<Row>, MapperError>;

    async fn find(&self, entity: &Entity, options: &FindOptions) -> Result<Vec<Row>, MapperError>;

    /// Number of rows matching `filters`.
    async fn count(&self, entity: &Entity, filters: &[Filter]) -> Result<u64, MapperError>;

    /// Set the given fields on the row with primary key `id`; returns the updated row.
    async fn update_by_id(&self, entity: &Entity, id: &Value, values: Row) -> Result<Option<Row>, MapperError>;

    /// Delete the row with primary key `id`; returns its values before deletion.
    async fn delete_by_id(&self, entity: &Entity, id: &Value) -> Result<Option<Row>, MapperError>;
}
