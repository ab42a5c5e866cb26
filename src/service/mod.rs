//! CrudService: generic CRUD through the mapper; RequestValidator: schema-driven body checks.

mod crud;
mod validation;
pub use crud::{Created, CrudService, Listed};
pub use validation::RequestValidator;
