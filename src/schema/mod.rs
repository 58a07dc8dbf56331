//! Schema catalog subsystem
//!
//! Read-only view of classes, their properties, the links between classes,
//! and the secondary indexes declared on them. The planner only reads it;
//! DDL lives elsewhere.

mod catalog;
mod errors;
mod loader;
mod types;

pub use catalog::{IndexCatalog, MemoryCatalog};
pub use errors::{SchemaError, SchemaResult};
pub use loader::{ClassDefinition, IndexSpec, SchemaDefinition, SchemaLoader};
pub use types::{PropertyDescriptor, PropertyType, SchemaClass};
