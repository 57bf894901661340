//! Tool catalog: descriptors, parameter contracts, and schema generation.
//!
//! Every operation the server exposes is described by a [`ToolDef`]: a
//! name, a description, and an ordered list of [`ParamSpec`] entries. The
//! [`ToolCatalog`] is built once at startup and never mutated afterwards;
//! transports render it with [`ToolDef::definition`] and the dispatcher
//! validates arguments against it.
//!
//! Parameter types are a closed enumeration ([`ParamKind`]) with a static
//! name mapping; there is no dynamic type lookup anywhere.
//!
//! This module is pure data, no I/O.

use indexmap::IndexMap;
use serde_json::{json, Value};

/// The closed set of parameter value kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    /// Canonical name, as used in schemas and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Float => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
        }
    }

    /// Static name → kind mapping. Accepts both `number` and `float` for
    /// [`ParamKind::Float`]. Unknown names map to `None`.
    pub fn from_name(name: &str) -> Option<ParamKind> {
        match name {
            "string" => Some(ParamKind::String),
            "integer" => Some(ParamKind::Integer),
            "number" | "float" => Some(ParamKind::Float),
            "boolean" => Some(ParamKind::Boolean),
            "array" => Some(ParamKind::Array),
            "object" => Some(ParamKind::Object),
            _ => None,
        }
    }

    /// Check a value against this kind, coercing where the wire commonly
    /// disagrees with the schema: numeric strings become integers, integral
    /// numbers satisfy `Float`. Returns the (possibly rewritten) value, or
    /// an explanation of the mismatch.
    pub fn coerce(self, value: &Value) -> Result<Value, String> {
        match self {
            ParamKind::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err("must be a string".into()),
            },
            ParamKind::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(|n| json!(n))
                    .map_err(|_| "must be an integer".into()),
                _ => Err("must be an integer".into()),
            },
            ParamKind::Float => match value {
                Value::Number(_) => Ok(value.clone()),
                _ => Err("must be a number".into()),
            },
            ParamKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err("must be a boolean".into()),
            },
            ParamKind::Array => match value {
                Value::Array(_) => Ok(value.clone()),
                _ => Err("must be an array".into()),
            },
            ParamKind::Object => match value {
                Value::Object(_) => Ok(value.clone()),
                _ => Err("must be an object".into()),
            },
        }
    }
}

/// One parameter of a tool: type contract plus documentation.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
    /// Element type for `kind == Array`.
    pub item_kind: Option<ParamKind>,
    /// Closed set of accepted values, rendered as a schema `enum`.
    pub one_of: Option<&'static [&'static str]>,
}

impl ParamSpec {
    /// A required parameter.
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
            item_kind: None,
            one_of: None,
        }
    }

    /// An optional parameter.
    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    /// Constrain array elements to a kind.
    pub fn items(mut self, kind: ParamKind) -> Self {
        self.item_kind = Some(kind);
        self
    }

    /// Constrain accepted values to a fixed set.
    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.one_of = Some(values);
        self
    }

    /// Validate and coerce a supplied value. Error messages name the
    /// parameter so they can be surfaced verbatim.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        let mut coerced = self
            .kind
            .coerce(value)
            .map_err(|why| format!("Parameter '{}' {}", self.name, why))?;
        if let Some(item_kind) = self.item_kind {
            if let Value::Array(items) = &coerced {
                let mut rewritten = Vec::with_capacity(items.len());
                for item in items {
                    rewritten.push(item_kind.coerce(item).map_err(|why| {
                        format!("Parameter '{}' items {}", self.name, why)
                    })?);
                }
                coerced = Value::Array(rewritten);
            }
        }
        if let Some(allowed) = self.one_of {
            if let Value::String(s) = &coerced {
                if !allowed.contains(&s.as_str()) {
                    return Err(format!(
                        "Parameter '{}' must be one of: {}",
                        self.name,
                        allowed.join(", ")
                    ));
                }
            }
        }
        Ok(coerced)
    }

    /// Render the JSON Schema property for this parameter.
    fn schema_property(&self) -> Value {
        let mut prop = serde_json::Map::new();
        prop.insert("type".to_string(), json!(self.kind.as_str()));
        if !self.description.is_empty() {
            prop.insert("description".to_string(), json!(self.description));
        }
        if let Some(item_kind) = self.item_kind {
            prop.insert("items".to_string(), json!({ "type": item_kind.as_str() }));
        }
        if let Some(allowed) = self.one_of {
            prop.insert("enum".to_string(), json!(allowed));
        }
        Value::Object(prop)
    }
}

/// A tool descriptor: one cataloged operation.
#[derive(Clone, Debug)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    /// Parameters in declared order. Validation reports the first missing
    /// required parameter in this order.
    pub params: Vec<ParamSpec>,
}

impl ToolDef {
    /// Render the JSON Schema object for this tool's arguments.
    ///
    /// Unknown argument keys are disallowed (`additionalProperties: false`);
    /// the dispatcher enforces the same rule.
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            properties.insert(param.name.to_string(), param.schema_property());
            if param.required {
                required.push(json!(param.name));
            }
        }
        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    /// The full MCP tool definition: name, description, input schema.
    pub fn definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema()
        })
    }

    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// The ordered, immutable tool catalog.
pub struct ToolCatalog {
    tools: IndexMap<&'static str, ToolDef>,
}

impl ToolCatalog {
    /// Build the catalog. Registration order is the order agents see from
    /// `tools/list`, so it is fixed here.
    pub fn new() -> Self {
        let mut catalog = Self {
            tools: IndexMap::new(),
        };

        use ParamKind::{Array, Integer, String as Str};
        let server_id = || ParamSpec::required("server_id", Integer, "ID of the server");

        // Servers
        catalog.add(ToolDef {
            name: "list_servers",
            description: "List all virtual servers on your LetsCloud account",
            params: vec![],
        });
        catalog.add(ToolDef {
            name: "get_server",
            description: "Get detailed information about a specific server",
            params: vec![server_id()],
        });
        catalog.add(ToolDef {
            name: "create_server",
            description: "Create a new virtual server",
            params: vec![
                ParamSpec::required("label", Str, "Display label for the server"),
                ParamSpec::required("plan_slug", Str, "Plan slug (see list_plans)"),
                ParamSpec::required("image_slug", Str, "OS image slug (see list_images)"),
                ParamSpec::required("location_slug", Str, "Location slug (see list_locations)"),
                ParamSpec::optional("hostname", Str, "Hostname for the server"),
                ParamSpec::optional("password", Str, "Root password (generated if omitted)"),
                ParamSpec::optional("ssh_keys", Array, "IDs of SSH keys to install")
                    .items(Integer),
            ],
        });
        catalog.add(ToolDef {
            name: "delete_server",
            description: "Permanently delete a server and all its data",
            params: vec![server_id()],
        });
        catalog.add(ToolDef {
            name: "reboot_server",
            description: "Reboot a server (power cycle)",
            params: vec![server_id()],
        });
        catalog.add(ToolDef {
            name: "shutdown_server",
            description: "Power off a server without deleting it",
            params: vec![server_id()],
        });
        catalog.add(ToolDef {
            name: "start_server",
            description: "Power on a stopped server",
            params: vec![server_id()],
        });

        // SSH keys
        catalog.add(ToolDef {
            name: "list_ssh_keys",
            description: "List all SSH keys registered on the account",
            params: vec![],
        });
        catalog.add(ToolDef {
            name: "get_ssh_key",
            description: "Get details of a specific SSH key",
            params: vec![ParamSpec::required("key_id", Integer, "ID of the SSH key")],
        });
        catalog.add(ToolDef {
            name: "create_ssh_key",
            description: "Register a new SSH public key on the account",
            params: vec![
                ParamSpec::required("title", Str, "Display name for the key"),
                ParamSpec::required("key", Str, "SSH public key material"),
            ],
        });
        catalog.add(ToolDef {
            name: "delete_ssh_key",
            description: "Delete an SSH key from the account",
            params: vec![ParamSpec::required("key_id", Integer, "ID of the SSH key")],
        });

        // Snapshots
        catalog.add(ToolDef {
            name: "create_snapshot",
            description: "Create a snapshot of a server for backup",
            params: vec![
                server_id(),
                ParamSpec::required("label", Str, "Display label for the snapshot"),
                ParamSpec::optional("description", Str, "Longer description of the snapshot"),
            ],
        });
        catalog.add(ToolDef {
            name: "get_snapshot",
            description: "Get details of a specific snapshot",
            params: vec![
                server_id(),
                ParamSpec::required("snapshot_id", Integer, "ID of the snapshot"),
            ],
        });
        catalog.add(ToolDef {
            name: "list_snapshots",
            description: "List all snapshots of a server",
            params: vec![server_id()],
        });
        catalog.add(ToolDef {
            name: "delete_snapshot",
            description: "Delete a snapshot",
            params: vec![
                server_id(),
                ParamSpec::required("snapshot_id", Integer, "ID of the snapshot"),
            ],
        });
        catalog.add(ToolDef {
            name: "restore_snapshot",
            description: "Restore a server from a snapshot",
            params: vec![
                server_id(),
                ParamSpec::required("snapshot_id", Integer, "ID of the snapshot"),
            ],
        });

        // Account resources
        catalog.add(ToolDef {
            name: "list_plans",
            description: "List available server plans with pricing",
            params: vec![],
        });
        catalog.add(ToolDef {
            name: "list_images",
            description: "List available operating system images",
            params: vec![],
        });
        catalog.add(ToolDef {
            name: "list_locations",
            description: "List available datacenter locations",
            params: vec![],
        });
        catalog.add(ToolDef {
            name: "get_account_info",
            description: "Get account profile information",
            params: vec![],
        });

        catalog
    }

    fn add(&mut self, tool: ToolDef) {
        self.tools.insert(tool.name, tool);
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Option<&ToolDef> {
        self.tools.get(name)
    }

    /// Iterate tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDef> {
        self.tools.values()
    }

    /// Number of cataloged tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when the catalog is empty (it never is in practice).
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All tool definitions, rendered for `tools/list`.
    pub fn definitions(&self) -> Vec<Value> {
        self.iter().map(ToolDef::definition).collect()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}
