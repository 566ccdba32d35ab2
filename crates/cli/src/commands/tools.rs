use issuepilot_agent::OperationRegistry;

pub fn run() -> String {
    let registry = OperationRegistry::new();
    let mut lines = vec![format!("{} registered operations:", registry.all().len())];

    for spec in registry.all() {
        lines.push(format!("\n{}", spec.name));
        lines.push(format!("  {}", spec.description.trim()));

        let required: Vec<&str> = spec.parameters["required"]
            .as_array()
            .map(|values| values.iter().filter_map(|value| value.as_str()).collect())
            .unwrap_or_default();

        if let Some(properties) = spec.parameters["properties"].as_object() {
            for (name, shape) in properties {
                let kind = shape["type"].as_str().unwrap_or("unknown");
                let marker = if required.contains(&name.as_str()) { "required" } else { "optional" };
                lines.push(format!("  - {name} ({kind}, {marker})"));
            }
        }
    }

    lines.join("\n")
}
