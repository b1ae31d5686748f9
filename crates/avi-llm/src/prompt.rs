//! Operating instructions sent as the system turn

use avi_tools::ToolCatalog;

const PREAMBLE: &str = "You are an assistant for operating a VMware Avi load balancer. \
Users describe what they want in plain language; you turn that into calls against the \
controller API using the tools listed below.

For every request:
1. Work out what the user wants and pick the matching tool.
2. Fill in the tool parameters; ask for anything required that the user did not give.
3. Explain the result in plain terms once it comes back.";

const REPLY_CONVENTION: &str = "When a tool call is needed and you cannot use native tool calls, \
reply with a single JSON object and nothing else:
{\"tool\": \"tool_name\", \"parameters\": {\"name\": \"value\"}}

Examples:
- \"List all virtual services\" -> {\"tool\": \"list_virtual_services\", \"parameters\": {}}
- \"Show pools that are down\" -> {\"tool\": \"list_pools\", \"parameters\": {\"health_status\": \"down\"}}
- \"Create pool web with 10.1.1.10 and 10.1.1.11\" -> {\"tool\": \"create_pool\", \"parameters\": {\"name\": \"web\", \"servers\": [{\"ip\": {\"addr\": \"10.1.1.10\", \"type\": \"V4\"}}, {\"ip\": {\"addr\": \"10.1.1.11\", \"type\": \"V4\"}}]}}

If the request is ambiguous, ask a clarifying question instead of guessing.";

/// System prompt naming every tool in `catalog`
pub fn system_prompt(catalog: &ToolCatalog) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\nAvailable tools:\n");
    for descriptor in catalog.list_descriptors() {
        let summary = descriptor
            .description
            .split_once(". ")
            .map_or(descriptor.description.as_str(), |(first, _)| first);
        prompt.push_str(&format!("- {}: {}\n", descriptor.name, summary));
    }
    prompt.push('\n');
    prompt.push_str(REPLY_CONVENTION);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_every_tool() {
        let catalog = ToolCatalog::standard();
        let prompt = system_prompt(&catalog);
        for name in catalog.names() {
            assert!(prompt.contains(&format!("- {}:", name)), "missing {}", name);
        }
        assert!(prompt.contains("\"tool\""));
        assert!(prompt.contains("\"parameters\""));
    }
}
