//! SQL OpenAPI: generate a documented REST API over the tables of a SQL database.
//!
//! Entity metadata comes from a [`Mapper`]; every entity gets list/create/read/update/replace/
//! delete routes plus JSON Schemas, and the whole surface is described by one OpenAPI document.

pub mod case;
pub mod config;
pub mod error;
pub mod generate;
pub mod handlers;
pub mod mapper;
pub mod openapi;
pub mod projection;
pub mod query;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load_metadata_file, resolve, ApiConfig, Entity, EntityMetadata, OpenApiInfo, ResolvedModel};
pub use error::{AppError, ConfigError, MapperError};
pub use generate::{build, generate, router, Generated};
pub use mapper::{Mapper, MemoryMapper, PgMapper};
pub use routes::{describe, RouteDescriptor};
pub use state::AppState;
