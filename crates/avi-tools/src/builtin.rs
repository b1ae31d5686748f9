//! Built-in controller tools
//!
//! Descriptions are written for the model: they say when to pick the tool.

use serde_json::json;

use crate::tool::{Operation, ParameterSchema, ToolDescriptor};

/// Resource types accepted by the analytics tool
pub const ANALYTICS_RESOURCE_TYPES: &[&str] = &["virtualservice", "pool", "serviceengine"];

/// Methods accepted by the generic operation tool
pub const GENERIC_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH"];

fn server_items(with_descriptions: bool) -> serde_json::Value {
    if with_descriptions {
        json!({
            "type": "object",
            "properties": {
                "ip": {
                    "type": "object",
                    "properties": {
                        "addr": { "type": "string", "description": "Server IP address" },
                        "type": { "type": "string", "description": "Address type (V4, V6, DNS)", "default": "V4" }
                    },
                    "required": ["addr", "type"]
                },
                "port": { "type": "integer", "description": "Server port" },
                "enabled": { "type": "boolean", "description": "Whether the server takes traffic", "default": true }
            },
            "required": ["ip"]
        })
    } else {
        json!({
            "type": "object",
            "properties": {
                "ip": {
                    "type": "object",
                    "properties": {
                        "addr": { "type": "string" },
                        "type": { "type": "string", "default": "V4" }
                    }
                },
                "port": { "type": "integer" }
            }
        })
    }
}

/// The fixed tool set, in presentation order
pub fn standard_descriptors() -> Vec<ToolDescriptor> {
    vec![
        // Virtual services
        ToolDescriptor::new(
            Operation::ListVirtualServices,
            "List virtual services, optionally filtered. Pick this when the user wants to see, list or look up virtual services.",
            ParameterSchema::new()
                .string("name", "Only return virtual services with this name")
                .string("tenant", "Only return virtual services in this tenant")
                .boolean("enabled", "Only return enabled (true) or disabled (false) virtual services")
                .string("fields", "Comma-separated fields to return, e.g. name,uuid,enabled,services,pool_ref"),
        ),
        ToolDescriptor::new(
            Operation::GetVirtualService,
            "Fetch one virtual service by UUID. Pick this when the user asks for the details of a specific virtual service.",
            ParameterSchema::new()
                .required_string("uuid", "UUID of the virtual service")
                .string("fields", "Comma-separated fields to return"),
        ),
        ToolDescriptor::new(
            Operation::CreateVirtualService,
            "Create a virtual service. Pick this when the user wants to set up or add a new virtual service.",
            ParameterSchema::new()
                .required_string("name", "Name of the new virtual service")
                .array(
                    "services",
                    "Listening services with port and SSL settings",
                    json!({
                        "type": "object",
                        "properties": {
                            "port": { "type": "integer", "description": "Listening port, e.g. 80 or 443" },
                            "enable_ssl": { "type": "boolean", "description": "Terminate SSL on this port" }
                        }
                    }),
                )
                .string("pool_ref", "Reference to the backend pool")
                .string("vsvip_ref", "Reference to the VIP object"),
        ),
        ToolDescriptor::new(
            Operation::UpdateVirtualService,
            "Change an existing virtual service. Pick this when the user wants to rename, enable, disable or reconfigure a virtual service.",
            ParameterSchema::new()
                .required_string("uuid", "UUID of the virtual service to change")
                .string("name", "New name")
                .boolean("enabled", "Enable or disable the virtual service")
                .array(
                    "services",
                    "Replacement listening services",
                    json!({
                        "type": "object",
                        "properties": {
                            "port": { "type": "integer" },
                            "enable_ssl": { "type": "boolean" }
                        }
                    }),
                ),
        ),
        ToolDescriptor::new(
            Operation::DeleteVirtualService,
            "Delete a virtual service. Pick this only when the user explicitly asks to remove a virtual service.",
            ParameterSchema::new().required_string("uuid", "UUID of the virtual service to delete"),
        ),
        // Pools
        ToolDescriptor::new(
            Operation::ListPools,
            "List pools, optionally filtered. Pick this when the user asks about backend pools, server pools or load balancing pools.",
            ParameterSchema::new()
                .string("name", "Only return pools with this name")
                .boolean("enabled", "Only return enabled (true) or disabled (false) pools")
                .string("health_status", "Only return pools in this health state")
                .string("fields", "Comma-separated fields to return"),
        ),
        ToolDescriptor::new(
            Operation::GetPool,
            "Fetch one pool by UUID, including its servers and health. Pick this when the user asks about a specific pool.",
            ParameterSchema::new()
                .required_string("uuid", "UUID of the pool")
                .string("fields", "Comma-separated fields to return"),
        ),
        ToolDescriptor::new(
            Operation::CreatePool,
            "Create a pool of backend servers. Pick this when the user wants a new server pool or backend pool.",
            ParameterSchema::new()
                .required_string("name", "Name of the new pool")
                .array("servers", "Backend servers", server_items(true))
                .integer("default_server_port", "Port used by servers that do not set one")
                .default_value(json!(80))
                .string(
                    "lb_algorithm",
                    "LB_ALGORITHM_ROUND_ROBIN, LB_ALGORITHM_LEAST_CONNECTIONS or LB_ALGORITHM_FASTEST_RESPONSE",
                )
                .default_value(json!("LB_ALGORITHM_LEAST_CONNECTIONS")),
        ),
        ToolDescriptor::new(
            Operation::ScaleOutPool,
            "Scale a pool out by adding servers. Pick this when the user wants more capacity behind a pool.",
            ParameterSchema::new()
                .required_string("uuid", "UUID of the pool to scale out")
                .string("reason", "Reason recorded with the scale-out")
                .default_value(json!("Manual scale out operation")),
        ),
        ToolDescriptor::new(
            Operation::ScaleInPool,
            "Scale a pool in by removing servers. Pick this when the user wants to reduce capacity behind a pool.",
            ParameterSchema::new()
                .required_string("uuid", "UUID of the pool to scale in")
                .array("servers", "Servers to remove", server_items(false))
                .string("reason", "Reason recorded with the scale-in")
                .default_value(json!("Manual scale in operation")),
        ),
        // Monitoring
        ToolDescriptor::new(
            Operation::ListHealthMonitors,
            "List health monitors. Pick this when the user asks about health checks or how backends are monitored.",
            ParameterSchema::new()
                .string("name", "Only return monitors with this name")
                .string("type", "Only return monitors of this type, e.g. HEALTH_MONITOR_HTTP")
                .string("fields", "Comma-separated fields to return"),
        ),
        ToolDescriptor::new(
            Operation::GetHealthMonitor,
            "Fetch one health monitor by UUID. Pick this for the configuration of a specific health check.",
            ParameterSchema::new()
                .required_string("uuid", "UUID of the health monitor")
                .string("fields", "Comma-separated fields to return"),
        ),
        ToolDescriptor::new(
            Operation::ListServiceEngines,
            "List service engines. Pick this when the user asks about service engines, load balancer instances or the data plane.",
            ParameterSchema::new()
                .string("name", "Only return service engines with this name")
                .string("se_group_ref", "Only return members of this service engine group")
                .string("fields", "Comma-separated fields to return"),
        ),
        ToolDescriptor::new(
            Operation::GetServiceEngine,
            "Fetch one service engine by UUID. Pick this for details of a specific service engine.",
            ParameterSchema::new()
                .required_string("uuid", "UUID of the service engine")
                .string("fields", "Comma-separated fields to return"),
        ),
        // Metrics
        ToolDescriptor::new(
            Operation::GetAnalytics,
            "Fetch metrics for a virtual service, pool or service engine. Pick this when the user asks about performance, traffic, latency, errors or other statistics.",
            ParameterSchema::new()
                .one_of(
                    "resource_type",
                    "Kind of resource the metrics belong to",
                    ANALYTICS_RESOURCE_TYPES,
                    true,
                )
                .required_string("uuid", "UUID of the resource")
                .string("metric", "Metric to fetch, e.g. connections, throughput, latency, errors")
                .string("time_range", "Window to report on: 1h, 6h, 24h or 7d")
                .default_value(json!("1h")),
        ),
        // Escape hatch
        ToolDescriptor::new(
            Operation::ExecuteGeneric,
            "Call any controller API endpoint directly. Pick this only when none of the other tools covers the request.",
            ParameterSchema::new()
                .one_of("method", "HTTP method", GENERIC_METHODS, true)
                .required_string(
                    "endpoint",
                    "API path below /api, e.g. /virtualservice or /pool/{uuid}/scaleout",
                )
                .object("body", "JSON body for POST, PUT and PATCH")
                .object("parameters", "Query parameters as string key/value pairs"),
        ),
    ]
}
