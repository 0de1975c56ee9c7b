use tokio_util::sync::CancellationToken;

use crate::error::GaleError;
use crate::models::packs::ModelRoleConfig;

/// Chat message roles understood by model providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// A callable tool attached to a structured-output request.
#[derive(Clone, Debug)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema for the tool's arguments.
    pub parameters: serde_json::Value,
}

/// One model invocation, handed to the external client.
#[derive(Clone, Debug)]
pub struct ModelRequest {
    /// Resolved configuration to invoke (after budget escalation).
    pub config: ModelRoleConfig,
    /// Short human label for billing/audit (e.g. "File edit").
    pub purpose: &'static str,
    pub messages: Vec<Message>,
    /// Tools to expose; empty for plain-text requests.
    pub tools: Vec<ToolDefinition>,
    /// Forces the model to call the named tool.
    pub tool_choice: Option<&'static str>,
    /// Predicted-output draft to accelerate generation. Optimization hint
    /// only, never required for correctness.
    pub prediction: Option<String>,
    /// Sampling params; `None` when the model rejects role params.
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    // Correlation identifiers, passed through for audit.
    pub session_id: String,
    pub model_stream_id: String,
    pub convo_message_id: String,
    pub build_id: String,
}

#[derive(Clone, Debug)]
pub struct ModelResponse {
    /// Raw response content: tool-call arguments JSON or free text,
    /// depending on the requested format.
    pub content: String,
    /// Opaque token identifying this completion on the backend, retained
    /// for billing/audit correlation.
    pub generation_id: String,
}

/// The low-level client that performs the network call to a model provider.
/// Implementations live outside this crate (and do their own transport
/// retry/backoff); the build core only needs two guarantees:
///
/// - cancellation of `ctx` surfaces as `GaleError::Cancelled`, never as a
///   generic transport error
/// - any other failure surfaces as `GaleError::Transport`
pub trait ModelClient: Send + Sync {
    fn request(
        &self,
        ctx: &CancellationToken,
        params: ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, GaleError>> + Send;
}

/// Shared record indicating a plan/branch's build is still live; absence
/// signals cancellation or deletion.
#[derive(Clone, Debug)]
pub struct ActivePlan {
    pub plan_id: String,
    pub branch: String,
}

/// Read-only view of the plan-lifecycle subsystem's registry. The build
/// core only reads it (synchronously, non-blocking) to detect that a build
/// was cancelled or its plan deleted; it never mutates it.
pub trait ActivePlanLookup: Send + Sync {
    fn get(&self, plan_id: &str, branch: &str) -> Option<ActivePlan>;
}
