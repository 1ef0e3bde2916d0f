//! Tool descriptor builder and parameter specifications
//!
//! The registration surface that replaces attribute reflection: callers
//! declare each parameter once and the builder emits the tool's JSON Schema.
//! Two rules are load-bearing and covered by tests:
//!
//! - property names carry the exact source casing, never lowercased
//! - a parameter with a default value is excluded from `required`, even when
//!   marked required (the default is captured separately by the binder)

// Layer 2: Third-party crate imports
use serde_json::{json, Map, Value};

// Layer 3: Internal module imports
use crate::protocol::Tool;

/// JSON Schema type for one tool parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// `"string"`
    String,
    /// `"integer"`
    Integer,
    /// `"number"`
    Number,
    /// `"boolean"`
    Boolean,
    /// `"array"` with an item type
    Array(Box<ParamType>),
    /// `"object"` with free-form properties
    Object,
    /// `"string"` restricted to a closed set
    Enum(Vec<String>),
}

impl ParamType {
    /// Emit the schema fragment for this type
    pub fn to_schema(&self) -> Value {
        match self {
            ParamType::String => json!({"type": "string"}),
            ParamType::Integer => json!({"type": "integer"}),
            ParamType::Number => json!({"type": "number"}),
            ParamType::Boolean => json!({"type": "boolean"}),
            ParamType::Array(items) => json!({"type": "array", "items": items.to_schema()}),
            ParamType::Object => json!({"type": "object"}),
            ParamType::Enum(values) => json!({"type": "string", "enum": values}),
        }
    }
}

/// Declaration of one tool parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name, emitted into the schema with this exact casing
    pub name: String,

    /// Parameter type
    pub param_type: ParamType,

    /// Human-readable description
    pub description: Option<String>,

    /// Whether the parameter must be supplied by the caller
    pub required: bool,

    /// Default injected when the caller omits the parameter
    pub default: Option<Value>,
}

impl ParamSpec {
    /// Declare a required parameter
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: true,
            default: None,
        }
    }

    /// Declare an optional parameter
    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: false,
            default: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a default value (also removes the parameter from `required`)
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Whether this parameter appears in the schema's `required` list
    ///
    /// A default wins over the `required` flag: the binder can always
    /// satisfy the parameter, so callers are not forced to.
    pub fn is_schema_required(&self) -> bool {
        self.required && self.default.is_none()
    }

    fn to_property_schema(&self) -> Value {
        let mut schema = self.param_type.to_schema();
        if let (Some(object), Some(description)) = (schema.as_object_mut(), &self.description) {
            object.insert("description".to_string(), json!(description));
        }
        schema
    }
}

/// Builder assembling one tool descriptor plus its parameter specs
///
/// # Examples
///
/// ```rust
/// use crucible_mcp::schema::{ParamSpec, ParamType, ToolBuilder};
///
/// let (tool, params) = ToolBuilder::new("echo")
///     .description("Echo a message back")
///     .param(ParamSpec::required("message", ParamType::String))
///     .build();
///
/// assert_eq!(tool.name, "echo");
/// assert_eq!(tool.input_schema["type"], "object");
/// assert!(tool.input_schema["properties"]["message"].is_object());
/// assert_eq!(params.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ToolBuilder {
    name: String,
    description: Option<String>,
    params: Vec<ParamSpec>,
    annotations: Option<Value>,
}

impl ToolBuilder {
    /// Start a builder for a tool name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: Vec::new(),
            annotations: None,
        }
    }

    /// Set the tool description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a parameter spec
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Attach a single category annotation (`annotations.category`)
    ///
    /// Primitive types are preserved: pass a JSON string, number, or bool.
    pub fn category(mut self, value: Value) -> Self {
        self.annotations = Some(json!({"category": value}));
        self
    }

    /// Attach multiple category annotations (`annotations.categories`)
    pub fn categories(mut self, values: Vec<Value>) -> Self {
        self.annotations = Some(json!({"categories": values}));
        self
    }

    /// Emit the descriptor and the parameter specs for the binder
    pub fn build(self) -> (Tool, Vec<ParamSpec>) {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in &self.params {
            properties.insert(spec.name.clone(), spec.to_property_schema());
            if spec.is_schema_required() {
                required.push(Value::from(spec.name.clone()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }

        let tool = Tool {
            name: self.name,
            description: self.description,
            input_schema: Value::Object(schema),
            annotations: self.annotations,
        };
        (tool, self.params)
    }
}
