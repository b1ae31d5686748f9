//! Tool descriptors and parameter schemas
//!
//! A descriptor is pure data: the name the model calls, guidance on when to
//! call it, and a JSON-schema-like description of the accepted arguments.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Controller operation a descriptor is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListVirtualServices,
    GetVirtualService,
    CreateVirtualService,
    UpdateVirtualService,
    DeleteVirtualService,
    ListPools,
    GetPool,
    CreatePool,
    ScaleOutPool,
    ScaleInPool,
    ListHealthMonitors,
    GetHealthMonitor,
    ListServiceEngines,
    GetServiceEngine,
    GetAnalytics,
    ExecuteGeneric,
}

impl Operation {
    pub const ALL: [Operation; 16] = [
        Operation::ListVirtualServices,
        Operation::GetVirtualService,
        Operation::CreateVirtualService,
        Operation::UpdateVirtualService,
        Operation::DeleteVirtualService,
        Operation::ListPools,
        Operation::GetPool,
        Operation::CreatePool,
        Operation::ScaleOutPool,
        Operation::ScaleInPool,
        Operation::ListHealthMonitors,
        Operation::GetHealthMonitor,
        Operation::ListServiceEngines,
        Operation::GetServiceEngine,
        Operation::GetAnalytics,
        Operation::ExecuteGeneric,
    ];

    /// Stable tool name shown to the model
    pub fn tool_name(&self) -> &'static str {
        match self {
            Operation::ListVirtualServices => "list_virtual_services",
            Operation::GetVirtualService => "get_virtual_service",
            Operation::CreateVirtualService => "create_virtual_service",
            Operation::UpdateVirtualService => "update_virtual_service",
            Operation::DeleteVirtualService => "delete_virtual_service",
            Operation::ListPools => "list_pools",
            Operation::GetPool => "get_pool",
            Operation::CreatePool => "create_pool",
            Operation::ScaleOutPool => "scale_out_pool",
            Operation::ScaleInPool => "scale_in_pool",
            Operation::ListHealthMonitors => "list_health_monitors",
            Operation::GetHealthMonitor => "get_health_monitor",
            Operation::ListServiceEngines => "list_service_engines",
            Operation::GetServiceEngine => "get_service_engine",
            Operation::GetAnalytics => "get_analytics",
            Operation::ExecuteGeneric => "execute_generic_operation",
        }
    }

    pub fn access_level(&self) -> AccessLevel {
        match self {
            Operation::ListVirtualServices
            | Operation::GetVirtualService
            | Operation::ListPools
            | Operation::GetPool
            | Operation::ListHealthMonitors
            | Operation::GetHealthMonitor
            | Operation::ListServiceEngines
            | Operation::GetServiceEngine
            | Operation::GetAnalytics => AccessLevel::ReadOnly,
            Operation::CreateVirtualService
            | Operation::UpdateVirtualService
            | Operation::CreatePool
            | Operation::ScaleOutPool
            | Operation::ScaleInPool => AccessLevel::Modify,
            Operation::DeleteVirtualService | Operation::ExecuteGeneric => AccessLevel::Elevated,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Impact of running an operation against the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Read-only queries
    ReadOnly,
    /// Creates or changes configuration
    Modify,
    /// Destructive or unrestricted
    Elevated,
}

// =============================================================================
// PARAMETER SCHEMA
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

/// One accepted argument
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterField {
    pub name: String,
    pub field_type: FieldType,
    pub description: String,
    pub allowed: Vec<String>,
    pub default: Option<Value>,
    pub items: Option<Value>,
}

impl ParameterField {
    fn to_json(&self) -> Value {
        let mut spec = Map::new();
        spec.insert("type".into(), json!(self.field_type.as_str()));
        spec.insert("description".into(), json!(self.description));
        if !self.allowed.is_empty() {
            spec.insert("enum".into(), json!(self.allowed));
        }
        if let Some(default) = &self.default {
            spec.insert("default".into(), default.clone());
        }
        if let Some(items) = &self.items {
            spec.insert("items".into(), items.clone());
        }
        Value::Object(spec)
    }
}

/// Object schema for a tool's arguments, built fluently
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    fields: Vec<ParameterField>,
    required: Vec<String>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &str, field_type: FieldType, description: &str, required: bool) -> Self {
        self.fields.push(ParameterField {
            name: name.to_string(),
            field_type,
            description: description.to_string(),
            allowed: Vec::new(),
            default: None,
            items: None,
        });
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn string(self, name: &str, description: &str) -> Self {
        self.push(name, FieldType::String, description, false)
    }

    pub fn required_string(self, name: &str, description: &str) -> Self {
        self.push(name, FieldType::String, description, true)
    }

    pub fn integer(self, name: &str, description: &str) -> Self {
        self.push(name, FieldType::Integer, description, false)
    }

    pub fn boolean(self, name: &str, description: &str) -> Self {
        self.push(name, FieldType::Boolean, description, false)
    }

    pub fn object(self, name: &str, description: &str) -> Self {
        self.push(name, FieldType::Object, description, false)
    }

    pub fn array(mut self, name: &str, description: &str, items: Value) -> Self {
        self = self.push(name, FieldType::Array, description, false);
        if let Some(field) = self.fields.last_mut() {
            field.items = Some(items);
        }
        self
    }

    /// String restricted to `values`
    pub fn one_of(mut self, name: &str, description: &str, values: &[&str], required: bool) -> Self {
        self = self.push(name, FieldType::String, description, required);
        if let Some(field) = self.fields.last_mut() {
            field.allowed = values.iter().map(|v| v.to_string()).collect();
        }
        self
    }

    /// Default for the most recently added field
    pub fn default_value(mut self, value: Value) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.default = Some(value);
        }
        self
    }

    pub fn fields(&self) -> &[ParameterField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ParameterField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.to_json()))
            .collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !self.required.is_empty() {
            schema["required"] = json!(self.required);
        }
        schema
    }
}

impl Serialize for ParameterSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// =============================================================================
// DESCRIPTOR
// =============================================================================

/// A callable operation as presented to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "parameters")]
    pub parameter_schema: ParameterSchema,
    #[serde(skip)]
    pub operation: Operation,
}

impl ToolDescriptor {
    pub fn new(operation: Operation, description: &str, parameter_schema: ParameterSchema) -> Self {
        Self {
            name: operation.tool_name().to_string(),
            description: description.to_string(),
            parameter_schema,
            operation,
        }
    }

    pub fn access_level(&self) -> AccessLevel {
        self.operation.access_level()
    }

    /// Function-calling format understood by both model backends
    pub fn to_function_format(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameter_schema.to_json(),
            }
        })
    }
}
