//! avi-tools: Tool Catalog
//!
//! The fixed set of controller operations offered to the language model,
//! with their parameter schemas and an HTTP listing router.

pub mod builtin;
pub mod catalog;
pub mod router;
pub mod tool;

// Re-export main types
pub use catalog::{ToolCatalog, CATALOG_VERSION};
pub use router::{create_router, ToolsServiceRouter, ToolsState};
pub use tool::{AccessLevel, FieldType, Operation, ParameterField, ParameterSchema, ToolDescriptor};
