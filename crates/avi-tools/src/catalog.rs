//! Tool Catalog
//!
//! Immutable, versioned set of descriptors built once at startup and shared
//! read-only between requests.

use std::collections::HashMap;

use avi_core::{Error, Result};
use serde_json::Value;
use tracing::debug;

use crate::builtin::standard_descriptors;
use crate::tool::ToolDescriptor;

/// Version of the built-in tool contract
pub const CATALOG_VERSION: &str = "1.0.0";

#[derive(Debug, Clone)]
pub struct ToolCatalog {
    version: String,
    descriptors: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    /// The built-in controller tools
    pub fn standard() -> Self {
        let descriptors = standard_descriptors();
        let index = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        debug!("Built tool catalog v{} with {} tools", CATALOG_VERSION, descriptors.len());
        Self {
            version: CATALOG_VERSION.to_string(),
            descriptors,
            index,
        }
    }

    /// Custom catalog; names must be unique.
    pub fn from_descriptors(version: impl Into<String>, descriptors: Vec<ToolDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());
        for (i, descriptor) in descriptors.iter().enumerate() {
            if index.insert(descriptor.name.clone(), i).is_some() {
                return Err(Error::config(format!(
                    "duplicate tool name in catalog: {}",
                    descriptor.name
                )));
            }
        }
        Ok(Self {
            version: version.into(),
            descriptors,
            index,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Descriptors in presentation order
    pub fn list_descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn find_by_name(&self, name: &str) -> Result<&ToolDescriptor> {
        self.index
            .get(name)
            .map(|&i| &self.descriptors[i])
            .ok_or_else(|| Error::unknown_tool(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors in the function-calling wire format
    pub fn function_definitions(&self) -> Vec<Value> {
        self.descriptors
            .iter()
            .map(ToolDescriptor::to_function_format)
            .collect()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Operation, ParameterSchema};

    #[test]
    fn test_round_trip_every_listed_name() {
        let catalog = ToolCatalog::standard();
        for descriptor in catalog.list_descriptors() {
            let found = catalog.find_by_name(&descriptor.name).unwrap();
            assert_eq!(found, descriptor);
        }
    }

    #[test]
    fn test_unknown_name() {
        let catalog = ToolCatalog::standard();
        let err = catalog.find_by_name("reboot_controller").unwrap_err();
        assert!(matches!(err, Error::UnknownTool(ref n) if n == "reboot_controller"));
        assert!(!catalog.contains("reboot_controller"));
    }

    #[test]
    fn test_presentation_order_is_stable() {
        let catalog = ToolCatalog::standard();
        let names: Vec<_> = catalog.names().collect();
        assert_eq!(names.first(), Some(&"list_virtual_services"));
        assert_eq!(names.last(), Some(&"execute_generic_operation"));
        assert_eq!(catalog.len(), 16);
        assert_eq!(catalog.version(), CATALOG_VERSION);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let d = ToolDescriptor::new(Operation::GetPool, "Get a pool", ParameterSchema::new());
        let err = ToolCatalog::from_descriptors("test", vec![d.clone(), d]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_function_definitions_cover_catalog() {
        let catalog = ToolCatalog::standard();
        let defs = catalog.function_definitions();
        assert_eq!(defs.len(), catalog.len());
        assert!(defs.iter().all(|d| d["type"] == "function"));
    }
}
