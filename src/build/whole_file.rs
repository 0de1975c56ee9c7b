use std::time::{Duration, SystemTime};

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::build::ActiveBuildStreamFileState;
use crate::client::{ActivePlanLookup, Message, MessageRole, ModelClient, ModelRequest};
use crate::error::GaleError;
use crate::models::ModelOutputFormat;
use crate::parsers::extractor_for;
use crate::prompts;
use crate::tokens::{TOKENS_PER_REQUEST, estimate_messages_tokens, estimate_tokens};

/// Retry budget for recoverable (extraction) failures per file.
pub const MAX_BUILD_ERROR_RETRIES: u32 = 3;

/// Nth retry waits `n² × 200ms` plus up to `BACKOFF_JITTER_MS` of jitter.
const BACKOFF_BASE_MS: u64 = 200;
const BACKOFF_JITTER_MS: u64 = 500;

/// Backoff before the given retry attempt (1-based), jitter included.
/// Public so the bounds are testable without driving a full build.
pub fn backoff_delay(attempt: u32) -> Duration {
    let base = u64::from(attempt) * u64::from(attempt) * BACKOFF_BASE_MS;
    let jitter = rand::thread_rng().gen_range(0..BACKOFF_JITTER_MS);
    Duration::from_millis(base + jitter)
}

impl ActiveBuildStreamFileState {
    /// Build the final merged content for this file by asking the model to
    /// emit the whole file.
    ///
    /// Each attempt drafts the request, invokes the client, and extracts
    /// the response. Extraction failures are retried with jittered backoff
    /// up to `MAX_BUILD_ERROR_RETRIES`; cancellation, transport failures,
    /// and a missing active plan are terminal immediately. The active-plan
    /// precondition is re-verified before every attempt — a plan that
    /// disappeared mid-retry means the build was cancelled or deleted, not
    /// that anything transient went wrong.
    pub async fn build_whole_file(
        &mut self,
        ctx: &CancellationToken,
        client: &impl ModelClient,
        plans: &impl ActivePlanLookup,
        proposed_content: &str,
        desc: &str,
        comments: &str,
        session_id: &str,
    ) -> Result<String, GaleError> {
        loop {
            self.check_active_plan(plans)?;

            match self
                .whole_file_attempt(ctx, client, proposed_content, desc, comments, session_id)
                .await
            {
                Ok(content) => return Ok(content),
                Err(err) if err.is_retryable() => {
                    if self.whole_file_num_retry >= MAX_BUILD_ERROR_RETRIES {
                        tracing::error!(
                            file_path = %self.file_path,
                            plan_id = %self.plan_id,
                            branch = %self.branch,
                            %err,
                            "whole-file build failed after exhausting retries"
                        );
                        return Err(GaleError::RetriesExhausted(err.to_string()));
                    }
                    self.whole_file_num_retry += 1;

                    tracing::warn!(
                        file_path = %self.file_path,
                        retry = self.whole_file_num_retry,
                        %err,
                        "retrying whole-file build"
                    );

                    self.check_active_plan(plans)?;

                    let delay = backoff_delay(self.whole_file_num_retry);
                    tokio::select! {
                        _ = ctx.cancelled() => {
                            tracing::debug!(file_path = %self.file_path, "cancelled during backoff");
                            return Err(GaleError::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One draft → request → extract cycle.
    async fn whole_file_attempt(
        &mut self,
        ctx: &CancellationToken,
        client: &impl ModelClient,
        proposed_content: &str,
        desc: &str,
        comments: &str,
        session_id: &str,
    ) -> Result<String, GaleError> {
        let config = self.model_pack.whole_file_builder();
        let format = config.base.preferred_output_format;

        let original_with_line_nums = prompts::add_line_nums(&self.pre_build_state);
        let proposed_with_line_nums = prompts::add_line_nums(proposed_content);

        // The one message this core ever sends; when the model rejects
        // system prompts, the instruction rides along as a user message.
        let instruction_role = if config.base.system_prompt_disabled {
            MessageRole::User
        } else {
            MessageRole::System
        };

        let (messages, tools, tool_choice) = match format {
            ModelOutputFormat::ToolCallJson => (
                vec![
                    Message {
                        role: instruction_role,
                        content: prompts::SYS_WHOLE_FILE_JSON.to_string(),
                    },
                    Message {
                        role: MessageRole::User,
                        content: prompts::whole_file_context(
                            &self.file_path,
                            &original_with_line_nums,
                            &proposed_with_line_nums,
                            desc,
                            comments,
                        ),
                    },
                ],
                vec![prompts::whole_file_tool()],
                Some("wholeFile"),
            ),
            ModelOutputFormat::Xml => {
                let (prompt, _tokens) = prompts::whole_file_prompt(
                    &self.file_path,
                    &original_with_line_nums,
                    &proposed_with_line_nums,
                    desc,
                    comments,
                );
                (
                    vec![Message {
                        role: instruction_role,
                        content: prompt,
                    }],
                    vec![],
                    None,
                )
            }
        };

        let input_tokens = estimate_messages_tokens(&messages) + TOKENS_PER_REQUEST;
        // Worst-case output: the model echoes most of the original plus the
        // proposed changes. Conservative by design — favors escalating to a
        // large-output fallback over a truncated file.
        let max_expected_output_tokens =
            estimate_tokens(&self.pre_build_state) + estimate_tokens(proposed_content);

        let resolved = config
            .for_input_tokens(input_tokens)
            .for_output_tokens(max_expected_output_tokens);

        tracing::debug!(
            file_path = %self.file_path,
            model = %resolved.base.model_id,
            input_tokens,
            max_expected_output_tokens,
            "whole-file build requesting model"
        );

        let prediction = if resolved.base.predicted_output_enabled && !comments.is_empty() {
            Some(format!(
                "\n<{tag}>\n{original}\n</{tag}>\n",
                tag = prompts::WHOLE_FILE_TAG,
                original = self.pre_build_state,
            ))
        } else {
            None
        };

        let request = ModelRequest {
            config: resolved.clone(),
            purpose: "File edit",
            messages,
            tools,
            tool_choice,
            prediction,
            temperature: (!resolved.base.role_params_disabled).then_some(resolved.temperature),
            top_p: (!resolved.base.role_params_disabled).then_some(resolved.top_p),
            session_id: session_id.to_string(),
            model_stream_id: self.model_stream_id.clone(),
            convo_message_id: self.convo_message_id.clone(),
            build_id: self.build_id.clone(),
        };

        self.builder_run.built_whole_file = true;
        self.builder_run.build_whole_file_started_at = Some(SystemTime::now());

        let response = match client.request(ctx, request).await {
            Ok(response) => response,
            Err(GaleError::Cancelled) => {
                tracing::debug!(file_path = %self.file_path, "cancelled during model request");
                return Err(GaleError::Cancelled);
            }
            // Transport failures already went through the client's own
            // retry layer; terminal for this attempt.
            Err(err @ GaleError::Transport { .. }) => return Err(err),
            Err(err) => {
                return Err(GaleError::Transport {
                    message: err.to_string(),
                });
            }
        };

        self.builder_run.build_whole_file_finished_at = Some(SystemTime::now());
        self.builder_run.generation_ids.push(response.generation_id);

        extractor_for(format).extract(&response.content)
    }

    fn check_active_plan(&self, plans: &impl ActivePlanLookup) -> Result<(), GaleError> {
        if plans.get(&self.plan_id, &self.branch).is_none() {
            tracing::warn!(
                plan_id = %self.plan_id,
                branch = %self.branch,
                file_path = %self.file_path,
                "active plan not found; aborting whole-file build"
            );
            return Err(GaleError::PlanNotFound {
                plan_id: self.plan_id.clone(),
                branch: self.branch.clone(),
            });
        }
        Ok(())
    }
}
