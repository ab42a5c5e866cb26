//! HTTP handlers for entity CRUD and the OpenAPI document.

pub mod documentation;
pub mod entity;
