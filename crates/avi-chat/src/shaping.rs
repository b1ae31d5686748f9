//! Argument shaping
//!
//! Converts the untyped argument map a model proposed into the exact
//! parameters one gateway operation takes. Nothing downstream of this
//! module sees an [`ArgumentMap`].

use avi_core::{ArgumentMap, Error, Result};
use avi_gateway::{
    ApiMethod, GenericRequest, ManagedKind, MetricsQuery, MetricsResource, QueryParams,
    ResourceKind, ScaleDirection,
};
use avi_tools::builtin::{ANALYTICS_RESOURCE_TYPES, GENERIC_METHODS};
use avi_tools::{Operation, ToolDescriptor};
use serde_json::Value;

/// A fully typed gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum ShapedCall {
    List {
        kind: ResourceKind,
        query: QueryParams,
    },
    Get {
        kind: ResourceKind,
        uuid: String,
        query: QueryParams,
    },
    Create {
        kind: ManagedKind,
        body: Value,
    },
    Update {
        kind: ManagedKind,
        uuid: String,
        body: Value,
    },
    Delete {
        kind: ManagedKind,
        uuid: String,
    },
    Scale {
        kind: ManagedKind,
        uuid: String,
        direction: ScaleDirection,
        body: Value,
    },
    Metrics(MetricsQuery),
    Generic(GenericRequest),
}

/// Shape `arguments` for the operation behind `descriptor`.
pub fn shape(descriptor: &ToolDescriptor, arguments: &ArgumentMap) -> Result<ShapedCall> {
    let tool = descriptor.name.as_str();
    let call = match descriptor.operation {
        Operation::ListVirtualServices => list(ResourceKind::VirtualService, arguments),
        Operation::ListPools => list(ResourceKind::Pool, arguments),
        Operation::ListHealthMonitors => list(ResourceKind::HealthMonitor, arguments),
        Operation::ListServiceEngines => list(ResourceKind::ServiceEngine, arguments),

        Operation::GetVirtualService => get(tool, ResourceKind::VirtualService, arguments)?,
        Operation::GetPool => get(tool, ResourceKind::Pool, arguments)?,
        Operation::GetHealthMonitor => get(tool, ResourceKind::HealthMonitor, arguments)?,
        Operation::GetServiceEngine => get(tool, ResourceKind::ServiceEngine, arguments)?,

        Operation::CreateVirtualService => ShapedCall::Create {
            kind: ManagedKind::VirtualService,
            body: Value::Object(arguments.clone()),
        },
        Operation::CreatePool => ShapedCall::Create {
            kind: ManagedKind::Pool,
            body: Value::Object(arguments.clone()),
        },

        Operation::UpdateVirtualService => {
            let (uuid, body) = split_uuid(tool, arguments)?;
            ShapedCall::Update {
                kind: ManagedKind::VirtualService,
                uuid,
                body,
            }
        }

        Operation::DeleteVirtualService => ShapedCall::Delete {
            kind: ManagedKind::VirtualService,
            uuid: resource_id(tool, arguments)?,
        },

        Operation::ScaleOutPool => scale(tool, ScaleDirection::Out, arguments)?,
        Operation::ScaleInPool => scale(tool, ScaleDirection::In, arguments)?,

        Operation::GetAnalytics => ShapedCall::Metrics(metrics(tool, arguments)?),
        Operation::ExecuteGeneric => ShapedCall::Generic(generic(tool, arguments)?),
    };
    Ok(call)
}

// =============================================================================
// ARGUMENT ACCESS
// =============================================================================

/// A present, non-empty string; anything else counts as missing.
fn required_string(tool: &str, arguments: &ArgumentMap, name: &str) -> Result<String> {
    match arguments.get(name).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => Err(Error::missing_argument(tool, name)),
    }
}

/// `uuid` becomes one URL path segment, so it may not leave that segment
fn resource_id(tool: &str, arguments: &ArgumentMap) -> Result<String> {
    let uuid = required_string(tool, arguments, "uuid")?;
    if uuid.contains(|c: char| matches!(c, '/' | '?' | '#' | '\\')) || uuid == "." || uuid == ".." {
        return Err(Error::invalid_argument(
            tool,
            "uuid",
            format!("'{}' is not a single resource id", uuid),
        ));
    }
    Ok(uuid)
}

fn optional_string(arguments: &ArgumentMap, name: &str) -> Option<String> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// String-valued entries only; other values are dropped, never coerced.
fn string_entries(map: &ArgumentMap) -> QueryParams {
    map.iter()
        .filter_map(|(key, value)| value.as_str().map(|v| (key.as_str(), v)))
        .collect()
}

fn one_of(tool: &str, name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
        Ok(())
    } else {
        Err(Error::invalid_argument(
            tool,
            name,
            format!("'{}' is not one of {}", value, allowed.join(", ")),
        ))
    }
}

// =============================================================================
// PER-OPERATION RULES
// =============================================================================

fn list(kind: ResourceKind, arguments: &ArgumentMap) -> ShapedCall {
    ShapedCall::List {
        kind,
        query: string_entries(arguments),
    }
}

fn get(tool: &str, kind: ResourceKind, arguments: &ArgumentMap) -> Result<ShapedCall> {
    let uuid = resource_id(tool, arguments)?;
    let mut query = QueryParams::new();
    if let Some(fields) = optional_string(arguments, "fields") {
        query.insert("fields", fields);
    }
    Ok(ShapedCall::Get { kind, uuid, query })
}

/// `uuid` addresses the object; every other argument is the body.
fn split_uuid(tool: &str, arguments: &ArgumentMap) -> Result<(String, Value)> {
    let uuid = resource_id(tool, arguments)?;
    let mut body = arguments.clone();
    body.remove("uuid");
    Ok((uuid, Value::Object(body)))
}

fn scale(tool: &str, direction: ScaleDirection, arguments: &ArgumentMap) -> Result<ShapedCall> {
    let (uuid, body) = split_uuid(tool, arguments)?;
    Ok(ShapedCall::Scale {
        kind: ManagedKind::Pool,
        uuid,
        direction,
        body,
    })
}

fn metrics(tool: &str, arguments: &ArgumentMap) -> Result<MetricsQuery> {
    let resource_type = required_string(tool, arguments, "resource_type")?;
    one_of(tool, "resource_type", &resource_type, ANALYTICS_RESOURCE_TYPES)?;
    let resource: MetricsResource = resource_type.to_ascii_lowercase().parse()?;

    Ok(MetricsQuery {
        resource,
        uuid: resource_id(tool, arguments)?,
        metric: optional_string(arguments, "metric"),
        time_range: optional_string(arguments, "time_range"),
    })
}

fn generic(tool: &str, arguments: &ArgumentMap) -> Result<GenericRequest> {
    let method = required_string(tool, arguments, "method")?;
    one_of(tool, "method", &method, GENERIC_METHODS)?;
    let method: ApiMethod = method.parse()?;
    let endpoint = required_string(tool, arguments, "endpoint")?;

    let mut request = GenericRequest::new(method, endpoint);
    match arguments.get("body") {
        None | Some(Value::Null) => {}
        Some(body) => request = request.with_body(body.clone()),
    }
    if let Some(Value::Object(parameters)) = arguments.get("parameters") {
        request = request.with_query(string_entries(parameters));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use avi_tools::ToolCatalog;
    use serde_json::json;

    fn args(value: Value) -> ArgumentMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("arguments must be an object"),
        }
    }

    fn shape_named(name: &str, arguments: Value) -> Result<ShapedCall> {
        let catalog = ToolCatalog::standard();
        shape(catalog.find_by_name(name).unwrap(), &args(arguments))
    }

    #[test]
    fn test_list_keeps_only_strings() {
        let call = shape_named(
            "list_virtual_services",
            json!({"name": "web", "enabled": true, "limit": 5, "fields": "name,uuid"}),
        )
        .unwrap();

        let ShapedCall::List { kind, query } = call else {
            panic!("expected a list call");
        };
        assert_eq!(kind, ResourceKind::VirtualService);
        assert_eq!(query.len(), 2);
        assert_eq!(query.get("name"), Some("web"));
        assert_eq!(query.get("fields"), Some("name,uuid"));
        assert_eq!(query.get("enabled"), None);
    }

    #[test]
    fn test_uuid_must_stay_in_one_path_segment() {
        for uuid in ["pool-1/scaleout", "pool-1?tenant=blue", "..", "vs#frag"] {
            let err = shape_named("delete_virtual_service", json!({"uuid": uuid})).unwrap_err();
            assert!(
                matches!(err, Error::InvalidArgument { ref argument, .. } if argument == "uuid"),
                "{} was accepted",
                uuid
            );
        }
        let err = shape_named(
            "get_analytics",
            json!({"resource_type": "pool", "uuid": "../virtualservice"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(shape_named("get_pool", json!({"uuid": "pool-0a1b2c"})).is_ok());
    }

    #[test]
    fn test_get_requires_uuid() {
        let err = shape_named("get_virtual_service", json!({"fields": "name"})).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingArgument { ref tool, ref argument }
                if tool == "get_virtual_service" && argument == "uuid"
        ));

        let err = shape_named("get_pool", json!({"uuid": 7})).unwrap_err();
        assert!(matches!(err, Error::MissingArgument { .. }));

        let err = shape_named("get_pool", json!({"uuid": "  "})).unwrap_err();
        assert!(matches!(err, Error::MissingArgument { .. }));
    }

    #[test]
    fn test_get_passes_fields_only() {
        let call = shape_named(
            "get_health_monitor",
            json!({"uuid": "hm-1", "fields": "name", "name": "ignored"}),
        )
        .unwrap();
        let ShapedCall::Get { kind, uuid, query } = call else {
            panic!("expected a get call");
        };
        assert_eq!(kind, ResourceKind::HealthMonitor);
        assert_eq!(uuid, "hm-1");
        assert_eq!(query, QueryParams::new().with("fields", "name"));
    }

    #[test]
    fn test_create_body_is_opaque() {
        let arguments = json!({
            "name": "web-pool",
            "servers": [{"ip": {"addr": "10.1.1.10", "type": "V4"}}],
            "default_server_port": 8080
        });
        let call = shape_named("create_pool", arguments.clone()).unwrap();
        assert_eq!(
            call,
            ShapedCall::Create {
                kind: ManagedKind::Pool,
                body: arguments,
            }
        );
    }

    #[test]
    fn test_update_strips_uuid_from_body() {
        let call = shape_named(
            "update_virtual_service",
            json!({"uuid": "vs-1", "enabled": false}),
        )
        .unwrap();
        assert_eq!(
            call,
            ShapedCall::Update {
                kind: ManagedKind::VirtualService,
                uuid: "vs-1".to_string(),
                body: json!({"enabled": false}),
            }
        );
    }

    #[test]
    fn test_scale_direction_and_body() {
        let call = shape_named("scale_in_pool", json!({"uuid": "pool-1", "reason": "night"})).unwrap();
        assert_eq!(
            call,
            ShapedCall::Scale {
                kind: ManagedKind::Pool,
                uuid: "pool-1".to_string(),
                direction: ScaleDirection::In,
                body: json!({"reason": "night"}),
            }
        );
        assert!(shape_named("scale_out_pool", json!({})).is_err());
    }

    #[test]
    fn test_delete_requires_uuid() {
        let err = shape_named("delete_virtual_service", json!({"name": "web"})).unwrap_err();
        assert!(matches!(err, Error::MissingArgument { .. }));
    }

    #[test]
    fn test_analytics_rules() {
        let call = shape_named(
            "get_analytics",
            json!({"resource_type": "pool", "uuid": "pool-1", "metric": "latency", "time_range": 6}),
        )
        .unwrap();
        assert_eq!(
            call,
            ShapedCall::Metrics(MetricsQuery {
                resource: MetricsResource::Pool,
                uuid: "pool-1".to_string(),
                metric: Some("latency".to_string()),
                time_range: None,
            })
        );

        let err = shape_named("get_analytics", json!({"resource_type": "cluster", "uuid": "c1"}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { ref argument, .. } if argument == "resource_type"));

        let err = shape_named("get_analytics", json!({"uuid": "c1"})).unwrap_err();
        assert!(matches!(err, Error::MissingArgument { ref argument, .. } if argument == "resource_type"));
    }

    #[test]
    fn test_generic_rules() {
        let call = shape_named(
            "execute_generic_operation",
            json!({
                "method": "post",
                "endpoint": "pool/pool-1/scaleout",
                "body": {"reason": "load"},
                "parameters": {"tenant": "admin", "limit": 10}
            }),
        )
        .unwrap();
        let ShapedCall::Generic(request) = call else {
            panic!("expected a generic call");
        };
        assert_eq!(request.method, ApiMethod::Post);
        assert_eq!(request.normalized_endpoint(), "/pool/pool-1/scaleout");
        assert_eq!(request.body, Some(json!({"reason": "load"})));
        assert_eq!(request.query, QueryParams::new().with("tenant", "admin"));

        let err = shape_named(
            "execute_generic_operation",
            json!({"method": "TRACE", "endpoint": "/x"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));

        let err = shape_named("execute_generic_operation", json!({"method": "GET"})).unwrap_err();
        assert!(matches!(err, Error::MissingArgument { ref argument, .. } if argument == "endpoint"));
    }

    #[test]
    fn test_every_catalog_tool_shapes() {
        let catalog = ToolCatalog::standard();
        let full = args(json!({
            "uuid": "u-1",
            "resource_type": "virtualservice",
            "method": "GET",
            "endpoint": "/cluster",
            "name": "n"
        }));
        for descriptor in catalog.list_descriptors() {
            assert!(shape(descriptor, &full).is_ok(), "{} failed to shape", descriptor.name);
        }
    }
}
