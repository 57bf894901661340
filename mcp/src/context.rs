//! Context processing: typed validation rules over a keyed context store.
//!
//! A context is a small unit of agent work: a kind tag, an action, and a
//! parameter object. [`ContextHub`] validates incoming contexts against
//! per-kind [`ValidationRule`]s, stores them, and routes them to a handler.
//! The infrastructure handler translates contexts into tool invocations on
//! the shared [`Dispatcher`]; there is no second copy of parameter
//! validation or upstream logic here.
//!
//! Type constraints reuse the catalog's closed [`ParamKind`] enumeration;
//! a rule can never reference a type outside that set.

use std::collections::HashMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use crate::catalog::ParamKind;
use crate::dispatch::{DispatchError, Dispatcher};

/// The closed set of context kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    System,
    Infrastructure,
    Data,
    Analysis,
    Decision,
    Feedback,
    Error,
}

impl ContextKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextKind::System => "system",
            ContextKind::Infrastructure => "infrastructure",
            ContextKind::Data => "data",
            ContextKind::Analysis => "analysis",
            ContextKind::Decision => "decision",
            ContextKind::Feedback => "feedback",
            ContextKind::Error => "error",
        }
    }
}

/// What a context asks to be done.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextAction {
    Create,
    Read,
    Update,
    Delete,
}

impl ContextAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextAction::Create => "create",
            ContextAction::Read => "read",
            ContextAction::Update => "update",
            ContextAction::Delete => "delete",
        }
    }

    /// Static name → action mapping, for config parsing.
    pub fn from_name(name: &str) -> Option<ContextAction> {
        match name {
            "create" => Some(ContextAction::Create),
            "read" => Some(ContextAction::Read),
            "update" => Some(ContextAction::Update),
            "delete" => Some(ContextAction::Delete),
            _ => None,
        }
    }
}

/// Lifecycle state of a stored context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ContextState {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextState::Pending => "pending",
            ContextState::Processing => "processing",
            ContextState::Completed => "completed",
            ContextState::Failed => "failed",
        }
    }
}

/// A context record. Incoming requests carry kind/action/parameters/metadata;
/// id, state, and timestamps are assigned here.
#[derive(Clone, Debug, Serialize)]
pub struct Context {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContextKind,
    pub action: ContextAction,
    pub parameters: Map<String, Value>,
    pub metadata: HashMap<String, String>,
    pub state: ContextState,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Context {
    pub fn new(
        kind: ContextKind,
        action: ContextAction,
        parameters: Map<String, Value>,
        metadata: HashMap<String, String>,
    ) -> Self {
        let now = now_ms();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            action,
            parameters,
            metadata,
            state: ContextState::Pending,
            created_at_ms: now,
            updated_at_ms: now,
        }
    }
}

/// Wire shape of a context submission. Id, state, and timestamps are
/// assigned server-side.
#[derive(Clone, Debug, Deserialize)]
pub struct ContextRequest {
    #[serde(rename = "type")]
    pub kind: ContextKind,
    pub action: ContextAction,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ContextRequest {
    pub fn into_context(self) -> Context {
        Context::new(self.kind, self.action, self.parameters, self.metadata)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Validation rules for one context kind.
///
/// `required` and `types` are ordered; violations are reported in that
/// order, required parameters first.
#[derive(Clone, Debug, Default)]
pub struct ValidationRule {
    pub required: Vec<&'static str>,
    pub types: Vec<(&'static str, ParamKind)>,
    pub allowed_actions: Vec<ContextAction>,
}

/// Outcome of processing one context. Exactly one of `result` / `error` is
/// set, enforced by the constructors.
#[derive(Clone, Debug, Serialize)]
pub struct ContextResponse {
    pub context_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: u64,
}

impl ContextResponse {
    fn completed(context_id: String, result: Value, elapsed_ms: u64) -> Self {
        Self {
            context_id,
            success: true,
            result: Some(result),
            error: None,
            processing_time_ms: elapsed_ms,
        }
    }

    fn failed(context_id: String, error: String, elapsed_ms: u64) -> Self {
        Self {
            context_id,
            success: false,
            result: None,
            error: Some(error),
            processing_time_ms: elapsed_ms,
        }
    }
}

/// Validation rules plus the mutex-guarded context store.
///
/// Built once at startup and shared by reference; rules are append-only and
/// registered before the hub is shared.
pub struct ContextHub {
    rules: HashMap<ContextKind, ValidationRule>,
    store: Mutex<HashMap<String, Context>>,
}

impl ContextHub {
    /// Build a hub with the standard infrastructure rule. `allowed_actions`
    /// comes from configuration.
    pub fn new(allowed_actions: Vec<ContextAction>) -> Self {
        let mut hub = Self {
            rules: HashMap::new(),
            store: Mutex::new(HashMap::new()),
        };
        hub.register_rule(
            ContextKind::Infrastructure,
            ValidationRule {
                required: vec![],
                types: vec![
                    ("id", ParamKind::Integer),
                    ("resource", ParamKind::String),
                    ("label", ParamKind::String),
                    ("title", ParamKind::String),
                    ("key", ParamKind::String),
                ],
                allowed_actions,
            },
        );
        hub
    }

    /// Register a validation rule for a kind. Startup-time only; the hub
    /// is shared immutably afterwards.
    pub fn register_rule(&mut self, kind: ContextKind, rule: ValidationRule) {
        self.rules.insert(kind, rule);
    }

    /// Check a context against its kind's rule. Returns every violation,
    /// ordered: missing required parameters (declared order), then type
    /// mismatches, then a disallowed action. A kind with no rule produces
    /// no violations.
    pub fn validate(&self, context: &Context) -> Vec<String> {
        let Some(rule) = self.rules.get(&context.kind) else {
            return Vec::new();
        };
        let mut violations = Vec::new();

        for name in &rule.required {
            let present = context
                .parameters
                .get(*name)
                .map(|v| !v.is_null())
                .unwrap_or(false);
            if !present {
                violations.push(format!("Missing required parameter: {}", name));
            }
        }

        for (name, kind) in &rule.types {
            if let Some(value) = context.parameters.get(*name) {
                if !value.is_null() {
                    if let Err(why) = kind.coerce(value) {
                        violations.push(format!("Parameter '{}' {}", name, why));
                    }
                }
            }
        }

        if !rule.allowed_actions.contains(&context.action) {
            violations.push(format!(
                "Action '{}' not allowed for '{}' contexts",
                context.action.as_str(),
                context.kind.as_str()
            ));
        }

        violations
    }

    /// Validate, store, and run a context. Invalid contexts are rejected
    /// without being stored; everything else ends up in the store with a
    /// completed or failed state.
    pub async fn process(&self, dispatcher: &Dispatcher, context: Context) -> ContextResponse {
        let started = Instant::now();
        let context_id = context.id.clone();

        let violations = self.validate(&context);
        if !violations.is_empty() {
            return ContextResponse::failed(
                context_id,
                violations.join("; "),
                elapsed_ms(started),
            );
        }

        let mut stored = context;
        stored.state = ContextState::Processing;
        stored.updated_at_ms = now_ms();
        self.store
            .lock()
            .await
            .insert(context_id.clone(), stored.clone());

        let outcome = match stored.kind {
            ContextKind::Infrastructure => run_infrastructure(dispatcher, &stored).await,
            other => Err(DispatchError::not_found(format!(
                "No handler registered for context kind '{}'",
                other.as_str()
            ))),
        };

        let final_state = if outcome.is_ok() {
            ContextState::Completed
        } else {
            ContextState::Failed
        };
        if let Some(entry) = self.store.lock().await.get_mut(&context_id) {
            entry.state = final_state;
            entry.updated_at_ms = now_ms();
        }

        match outcome {
            Ok(result) => ContextResponse::completed(context_id, result, elapsed_ms(started)),
            Err(e) => ContextResponse::failed(context_id, e.message, elapsed_ms(started)),
        }
    }

    /// Fetch a stored context by id.
    pub async fn get(&self, id: &str) -> Option<Context> {
        self.store.lock().await.get(id).cloned()
    }

    /// List stored contexts, optionally filtered by kind and state.
    pub async fn list(
        &self,
        kind: Option<ContextKind>,
        state: Option<ContextState>,
    ) -> Vec<Context> {
        let store = self.store.lock().await;
        let mut contexts: Vec<Context> = store
            .values()
            .filter(|c| kind.map(|k| c.kind == k).unwrap_or(true))
            .filter(|c| state.map(|s| c.state == s).unwrap_or(true))
            .cloned()
            .collect();
        contexts.sort_by_key(|c| c.created_at_ms);
        contexts
    }

    /// Remove a stored context, returning it if present.
    pub async fn remove(&self, id: &str) -> Option<Context> {
        self.store.lock().await.remove(id)
    }

    /// Number of stored contexts.
    pub async fn stored_count(&self) -> usize {
        self.store.lock().await.len()
    }

    /// Read-only context templates derived from the registered rules.
    pub fn templates(&self) -> Vec<Value> {
        let mut templates: Vec<Value> = self
            .rules
            .iter()
            .map(|(kind, rule)| {
                let types: Map<String, Value> = rule
                    .types
                    .iter()
                    .map(|(name, k)| (name.to_string(), json!(k.as_str())))
                    .collect();
                json!({
                    "name": format!("{}_context", kind.as_str()),
                    "description": format!("Template for {} contexts", kind.as_str()),
                    "type": kind.as_str(),
                    "required_parameters": rule.required,
                    "parameter_types": types,
                    "allowed_actions": rule
                        .allowed_actions
                        .iter()
                        .map(|a| a.as_str())
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        templates.sort_by_key(|t| t["name"].as_str().unwrap_or_default().to_string());
        templates
    }

    /// Number of registered templates.
    pub fn template_count(&self) -> usize {
        self.rules.len()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Translate an infrastructure context into a tool invocation.
///
/// The `resource` parameter selects servers (default) or SSH keys; `id`
/// addresses a single resource. Everything else is forwarded untouched so
/// the dispatcher's schema validation stays the single authority.
fn tool_invocation(context: &Context) -> Result<(&'static str, Value), DispatchError> {
    let params = &context.parameters;
    let resource = params
        .get("resource")
        .and_then(Value::as_str)
        .unwrap_or("server");
    let ssh_key = resource == "ssh_key";
    let id = params.get("id").cloned();

    let forward = |id_field: Option<&str>| {
        let mut args = Map::new();
        for (key, value) in params {
            if key == "resource" || key == "id" {
                continue;
            }
            args.insert(key.clone(), value.clone());
        }
        if let (Some(field), Some(id)) = (id_field, &id) {
            args.insert(field.to_string(), id.clone());
        }
        Value::Object(args)
    };

    match context.action {
        ContextAction::Create => {
            if ssh_key {
                Ok(("create_ssh_key", forward(None)))
            } else {
                Ok(("create_server", forward(None)))
            }
        }
        ContextAction::Read => match (ssh_key, id.is_some()) {
            (true, true) => Ok(("get_ssh_key", forward(Some("key_id")))),
            (true, false) => Ok(("list_ssh_keys", forward(None))),
            (false, true) => Ok(("get_server", forward(Some("server_id")))),
            (false, false) => Ok(("list_servers", forward(None))),
        },
        ContextAction::Delete => {
            if ssh_key {
                Ok(("delete_ssh_key", forward(Some("key_id"))))
            } else {
                Ok(("delete_server", forward(Some("server_id"))))
            }
        }
        ContextAction::Update => Err(DispatchError::validation(
            "Action 'update' is not supported for infrastructure contexts",
        )),
    }
}

async fn run_infrastructure(
    dispatcher: &Dispatcher,
    context: &Context,
) -> Result<Value, DispatchError> {
    let (tool, args) = tool_invocation(context)?;
    dispatcher.invoke(tool, &args).await
}
