//! Dispatcher-facing tool surface.
//!
//! An external agent picks a tool by name and supplies already-extracted
//! arguments as JSON. Every call produces a short reply string, including
//! failures, so the agent always has something to relay.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::HomecoverError;
use crate::logging::append_run_log;
use crate::matching::Credentials;
use crate::record_store::RecordStore;
use crate::session::{AuthOutcome, SessionWorkflow};
use crate::summary::SummaryArtifact;

pub const LOGIN_USER: &str = "login_user";
pub const VERIFY_IDENTITY: &str = "verify_identity";
pub const GET_POLICY_DETAILS: &str = "get_policy_details";
pub const UPDATE_POLICY_COVER: &str = "update_policy_cover";
pub const RENEW_POLICY: &str = "renew_policy";
pub const CANCEL_POLICY: &str = "cancel_policy";
pub const DOWNLOAD_POLICY_SUMMARY: &str = "download_policy_summary";

pub const AUTH_FAILED_TEXT: &str = "AUTH_FAILED: I couldn't find a match for those details. Please double-check the policy number and postcode.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReply {
    pub text: String,
    pub artifact: Option<SummaryArtifact>,
}

impl ToolReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            artifact: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
struct LoginArgs {
    search_query: String,
}

#[derive(Debug, Deserialize)]
struct CoverArgs {
    cover_type: String,
    new_limit: u64,
}

/// One session bound to one store: what a single conversation talks to.
pub struct PolicyDesk {
    store: RecordStore,
    session: SessionWorkflow,
}

impl PolicyDesk {
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            session: SessionWorkflow::new(),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn session(&self) -> &SessionWorkflow {
        &self.session
    }

    /// Parses one JSON tool call and dispatches it.
    pub fn dispatch_json(&mut self, raw: &str) -> ToolReply {
        match serde_json::from_str::<ToolCall>(raw) {
            Ok(call) => self.dispatch(&call),
            Err(e) => ToolReply::text(render_error(&HomecoverError::ToolArguments(format!(
                "malformed tool call: {e}"
            )))),
        }
    }

    pub fn dispatch(&mut self, call: &ToolCall) -> ToolReply {
        let reply = self
            .try_dispatch(call)
            .unwrap_or_else(|error| ToolReply::text(render_error(&error)));
        append_run_log(
            "debug",
            "tool.dispatched",
            json!({
                "tool": call.tool,
                "ok": !reply.text.starts_with("ERROR") && !reply.text.starts_with("AUTH_FAILED"),
            }),
        );
        reply
    }

    fn try_dispatch(&mut self, call: &ToolCall) -> Result<ToolReply, HomecoverError> {
        match call.tool.as_str() {
            LOGIN_USER => {
                let args: LoginArgs = parse_args(&call.args)?;
                let outcome = self.session.authenticate(&self.store, &args.search_query);
                Ok(ToolReply::text(render_auth(&outcome)))
            }
            VERIFY_IDENTITY => {
                let credentials: Credentials = parse_args(&call.args)?;
                let outcome = self
                    .session
                    .authenticate_with_credentials(&self.store, &credentials);
                Ok(ToolReply::text(render_auth(&outcome)))
            }
            GET_POLICY_DETAILS => {
                let record = self.session.get_details(&self.store)?;
                let rendered = serde_json::to_string_pretty(&record)
                    .map_err(|e| HomecoverError::Io(e.to_string()))?;
                Ok(ToolReply::text(rendered))
            }
            UPDATE_POLICY_COVER => {
                let args: CoverArgs = parse_args(&call.args)?;
                let update =
                    self.session
                        .update_cover(&mut self.store, &args.cover_type, args.new_limit)?;
                Ok(ToolReply::text(format!(
                    "SUCCESS: {} updated to £{}.",
                    capitalize(&update.cover_key),
                    update.new_limit
                )))
            }
            RENEW_POLICY => {
                let change = self.session.renew(&mut self.store)?;
                Ok(ToolReply::text(format!(
                    "SUCCESS: Policy {} is now {}.",
                    change.policy_number,
                    change.status.as_str()
                )))
            }
            CANCEL_POLICY => {
                let change = self.session.cancel(&mut self.store)?;
                Ok(ToolReply::text(format!(
                    "SUCCESS: Policy {} is now {}.",
                    change.policy_number,
                    change.status.as_str()
                )))
            }
            DOWNLOAD_POLICY_SUMMARY => {
                let artifact = self.session.export_summary(&self.store)?;
                Ok(ToolReply {
                    text: format!(
                        "SUCCESS: Summary ready as {} ({} bytes).",
                        artifact.file_name,
                        artifact.bytes.len()
                    ),
                    artifact: Some(artifact),
                })
            }
            other => Err(HomecoverError::UnknownTool(other.to_string())),
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T, HomecoverError> {
    let args = if args.is_null() { json!({}) } else { args.clone() };
    serde_json::from_value(args).map_err(|e| HomecoverError::ToolArguments(e.to_string()))
}

pub fn render_auth(outcome: &AuthOutcome) -> String {
    match outcome {
        AuthOutcome::Success { full_name, .. } => {
            format!("AUTH_SUCCESS: Welcome {full_name}. I've accessed your policy.")
        }
        AuthOutcome::Failed => AUTH_FAILED_TEXT.to_string(),
    }
}

pub fn render_error(error: &HomecoverError) -> String {
    match error {
        HomecoverError::NotAuthenticated => "ERROR: Log in first.".to_string(),
        HomecoverError::UnknownCoverType { requested, known } => format!(
            "ERROR: Could not find cover type '{requested}'. Known keys: {known:?}"
        ),
        HomecoverError::RecordNotFound(_) => {
            "ERROR: Policy could not be found in the database.".to_string()
        }
        HomecoverError::Persistence(detail) => {
            format!("ERROR: Could not save changes: {detail}")
        }
        other => format!("ERROR: {other}"),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn catalog() -> Vec<ToolSpec> {
    let no_params = json!({"type": "object", "properties": {}});
    vec![
        ToolSpec {
            name: LOGIN_USER,
            description: "Authenticate the customer. Pass the customer's entire message, which should contain the policy number and postcode, or their full name.",
            parameters: json!({
                "type": "object",
                "properties": {"search_query": {"type": "string"}},
                "required": ["search_query"],
            }),
        },
        ToolSpec {
            name: VERIFY_IDENTITY,
            description: "Authenticate with structured details: policy number with postcode, or full name with date of birth.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "policy_number": {"type": "string"},
                    "postcode": {"type": "string"},
                    "full_name": {"type": "string"},
                    "dob": {"type": "string"},
                },
            }),
        },
        ToolSpec {
            name: GET_POLICY_DETAILS,
            description: "Return the logged-in policy's coverage and status.",
            parameters: no_params.clone(),
        },
        ToolSpec {
            name: UPDATE_POLICY_COVER,
            description: "Set a cover limit on the logged-in policy, e.g. cover_type 'building cover'.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "cover_type": {"type": "string"},
                    "new_limit": {"type": "integer", "minimum": 0},
                },
                "required": ["cover_type", "new_limit"],
            }),
        },
        ToolSpec {
            name: RENEW_POLICY,
            description: "Mark the logged-in policy as Renewed.",
            parameters: no_params.clone(),
        },
        ToolSpec {
            name: CANCEL_POLICY,
            description: "Cancel the logged-in policy. Confirm with the customer first.",
            parameters: no_params.clone(),
        },
        ToolSpec {
            name: DOWNLOAD_POLICY_SUMMARY,
            description: "Produce a plain-text summary of the logged-in policy as a downloadable file.",
            parameters: no_params,
        },
    ]
}
