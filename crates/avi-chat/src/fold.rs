//! Result folding
//!
//! Renders a successful tool result as a labeled block appended after the
//! model's own prose.

use avi_gateway::{ListPage, ManagedKind, ResourceKind, ScaleDirection};
use serde::Serialize;
use serde_json::Value;

/// What a gateway call produced
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// One page of a list endpoint
    Page { kind: ResourceKind, page: ListPage },
    /// A decoded object or arbitrary payload
    Object(Value),
    /// An operation with no payload worth showing
    Completed(String),
}

impl ToolOutput {
    pub fn deleted(kind: ManagedKind, uuid: &str) -> Self {
        ToolOutput::Completed(format!("Deleted {} {}.", noun(kind), uuid))
    }

    pub fn scaled(kind: ManagedKind, uuid: &str, direction: ScaleDirection) -> Self {
        let verb = match direction {
            ScaleDirection::Out => "Scale-out",
            ScaleDirection::In => "Scale-in",
        };
        ToolOutput::Completed(format!("{} requested for {} {}.", verb, noun(kind), uuid))
    }

    /// The block appended to the narrative
    pub fn render(&self, tool: &str) -> String {
        match self {
            ToolOutput::Page { kind, page } => {
                let mut block = json_block(tool, page);
                block.push_str(&summary(*kind, page));
                block.push('\n');
                block
            }
            ToolOutput::Object(Value::Null) => {
                format!("\n\nAPI Result ({}): completed with an empty response.\n", tool)
            }
            ToolOutput::Object(value) => json_block(tool, value),
            ToolOutput::Completed(line) => format!("\n\nAPI Result ({}): {}\n", tool, line),
        }
    }
}

fn noun(kind: ManagedKind) -> &'static str {
    ResourceKind::from(kind).noun()
}

fn json_block<T: Serialize>(tool: &str, payload: &T) -> String {
    let pretty = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|e| format!("\"<unrenderable result: {}>\"", e));
    format!("\n\nAPI Result ({}):\n```json\n{}\n```\n", tool, pretty)
}

/// `Found 2 virtual services: a, b.` plus a note when more pages exist
fn summary(kind: ResourceKind, page: &ListPage) -> String {
    let names = page.names();
    let label = if page.count == 1 { kind.noun() } else { kind.label() };
    let mut line = if names.is_empty() {
        format!("Found {} {}.", page.count, label)
    } else {
        format!("Found {} {}: {}.", page.count, label, names.join(", "))
    };
    if page.has_more() {
        line.push_str(" More results are available.");
    }
    line
}
