//! MCP tool handlers.
//!
//! One tool, `ask`, answers a question from the indexed corpus and returns
//! the answer together with its deduplicated sources.
use crate::error::RagError;
use crate::mcp::server::McpContext;
use rmcp::handler::server::ServerHandler;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{ErrorData as McpError, handler::server::tool::ToolRouter, model::*, tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::warn;

// ── Parameter structs ────────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
struct AskParams {
    /// Natural-language question about the knowledge base
    question: String,
}

// ── Response helpers ─────────────────────────────────────────────────

fn json_result(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&value).unwrap_or_default(),
    )]))
}

fn error_result(msg: &str) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg.to_string())]))
}

// ── Tool implementations ─────────────────────────────────────────────

#[derive(Clone)]
pub struct AppTools {
    pub ctx: McpContext,
    pub tool_router: ToolRouter<Self>,
}

impl ServerHandler for AppTools {}

#[tool_router]
impl AppTools {
    pub fn new(ctx: McpContext) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Answer a question using the indexed personal knowledge base. Returns the answer and the source files it was grounded on."
    )]
    async fn ask(&self, params: Parameters<AskParams>) -> Result<CallToolResult, McpError> {
        let question = params.0.question;
        if question.trim().is_empty() {
            return error_result("question is required");
        }

        match self.ctx.session.answer(&question).await {
            Ok(answer) => {
                let value = serde_json::to_value(&answer).map_err(|e| {
                    McpError::internal_error(format!("failed to encode answer: {e}"), None)
                })?;
                json_result(value)
            }
            Err(RagError::NotReady) => error_result("knowledge base is not ready yet"),
            Err(e) => {
                warn!(error = %e, "ask tool failed");
                Err(McpError::internal_error(format!("answer failed: {e}"), None))
            }
        }
    }
}
