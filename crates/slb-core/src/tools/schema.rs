use serde_json::{json, Map, Value};

/// Small builder for tool `inputSchema` objects.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

pub fn object() -> SchemaBuilder {
    SchemaBuilder::default()
}

impl SchemaBuilder {
    fn prop(mut self, name: &str, schema: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn required_string(self, name: &str, description: &str) -> Self {
        self.prop(
            name,
            json!({"type": "string", "description": description}),
            true,
        )
    }

    pub fn string(self, name: &str, description: &str) -> Self {
        self.prop(
            name,
            json!({"type": "string", "description": description}),
            false,
        )
    }

    pub fn string_default(self, name: &str, description: &str, default: &str) -> Self {
        self.prop(
            name,
            json!({"type": "string", "description": description, "default": default}),
            false,
        )
    }

    pub fn boolean(self, name: &str, description: &str, default: bool) -> Self {
        self.prop(
            name,
            json!({"type": "boolean", "description": description, "default": default}),
            false,
        )
    }

    pub fn integer(self, name: &str, description: &str, default: i64, min: i64, max: i64) -> Self {
        self.prop(
            name,
            json!({
                "type": "integer",
                "description": description,
                "default": default,
                "minimum": min,
                "maximum": max
            }),
            false,
        )
    }

    pub fn required_integer(self, name: &str, description: &str) -> Self {
        self.prop(
            name,
            json!({"type": "integer", "description": description}),
            true,
        )
    }

    pub fn number(self, name: &str, description: &str, default: f64) -> Self {
        self.prop(
            name,
            json!({"type": "number", "description": description, "default": default}),
            false,
        )
    }

    pub fn object_array(self, name: &str, description: &str) -> Self {
        self.prop(
            name,
            json!({"type": "array", "items": {"type": "object"}, "description": description}),
            false,
        )
    }

    pub fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": Value::Object(self.properties),
            "required": self.required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_object_schema_with_required_list() {
        let s = object()
            .required_string("channel", "Channel ID")
            .boolean("private", "Private?", false)
            .build();
        assert_eq!(s["type"], "object");
        assert_eq!(s["properties"]["channel"]["type"], "string");
        assert_eq!(s["properties"]["private"]["default"], false);
        assert_eq!(s["required"], json!(["channel"]));
    }
}
