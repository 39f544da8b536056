//! One-shot structured task generation.

use super::{ChatMessage, ChatModel};
use crate::auth::Action;
use crate::error::{AppError, ErrorCode};
use crate::types::Identity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Structured decomposition of a request: a title, the sub-items, and one
/// narrative of instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPlan {
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
}

impl TaskPlan {
    /// Sub-items with blank entries removed and whitespace trimmed.
    pub fn subtasks(&self) -> Vec<String> {
        self.ingredients
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Parse raw model output as a [`TaskPlan`].
///
/// The output must be exactly the JSON object, optionally wrapped in a single
/// markdown code fence. Anything else yields `None`.
pub fn parse_task_plan(raw: &str) -> Option<TaskPlan> {
    let body = strip_code_fence(raw.trim());
    match serde_json::from_str::<TaskPlan>(body) {
        Ok(plan) if !plan.name.trim().is_empty() => Some(plan),
        Ok(_) => {
            debug!("Task plan has an empty name");
            None
        }
        Err(e) => {
            debug!(error = %e, "Model output is not a task plan");
            None
        }
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return s;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    match rest.find('\n') {
        Some(nl) => rest[nl + 1..].trim(),
        None => rest.trim(),
    }
}

/// Request/response generation endpoint. Any authenticated identity may call it.
pub struct TaskGenerator {
    system_prompt: String,
    model: Arc<dyn ChatModel>,
}

impl TaskGenerator {
    pub fn new(system_prompt: impl Into<String>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            model,
        }
    }

    /// Generate a plan for `request`.
    ///
    /// Returns `Ok(None)` when the model answered with something that is not a plan.
    pub async fn generate(
        &self,
        caller: Option<&Identity>,
        request: &str,
    ) -> Result<Option<TaskPlan>, AppError> {
        let Some(caller) = caller else {
            return Err(AppError::not_signed_in(Action::Generate.description()));
        };
        if request.trim().is_empty() {
            return Err(AppError::missing_field("request"));
        }

        debug!(caller = %caller, "Generating task plan");
        let transcript = [ChatMessage::user(request)];
        let content = self
            .model
            .respond(&self.system_prompt, &transcript)
            .await
            .map_err(|e| {
                warn!(caller = %caller, error = %e, "Task generation failed");
                AppError::new(ErrorCode::AiError, "Task generation failed").with_details(e.to_string())
            })?;

        Ok(parse_task_plan(&content.text()))
    }
}
