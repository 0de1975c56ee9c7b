use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use gale::GaleError;
use gale::build::{ActiveBuildStreamFileState, BuilderRun};
use gale::build::whole_file::{MAX_BUILD_ERROR_RETRIES, backoff_delay};
use gale::client::{ActivePlan, ActivePlanLookup, ModelClient, ModelRequest, ModelResponse};
use gale::models::packs::{ModelPack, ModelRoleConfig, PlannerRoleConfig};
use gale::models::{
    BaseModelConfig, ModelCompatibility, ModelOutputFormat, ModelProvider, ModelRole,
};

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

/// Scripted model client: pops one queued response per call and records
/// every request it sees. Optionally cancels a token on first call, to
/// simulate the user stopping the build while a retry is pending.
struct MockClient {
    responses: Mutex<VecDeque<Result<ModelResponse, GaleError>>>,
    requests: Mutex<Vec<ModelRequest>>,
    calls: AtomicUsize,
    cancel_on_first_call: Mutex<Option<CancellationToken>>,
}

impl MockClient {
    fn new(responses: Vec<Result<ModelResponse, GaleError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            cancel_on_first_call: Mutex::new(None),
        }
    }

    fn ok(content: &str) -> Result<ModelResponse, GaleError> {
        Ok(ModelResponse {
            content: content.to_string(),
            generation_id: format!("gen-{content_len}", content_len = content.len()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> ModelRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl ModelClient for MockClient {
    async fn request(
        &self,
        ctx: &CancellationToken,
        params: ModelRequest,
    ) -> Result<ModelResponse, GaleError> {
        if ctx.is_cancelled() {
            return Err(GaleError::Cancelled);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(params);

        if let Some(token) = self.cancel_on_first_call.lock().unwrap().take() {
            token.cancel();
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(GaleError::Transport {
                    message: "mock response queue empty".to_string(),
                })
            })
    }
}

/// Plan lookup that answers `Some` for a limited number of lookups, then
/// `None` — simulating a plan deleted or cancelled mid-build.
struct CountedPlans {
    allowed_lookups: usize,
    lookups: AtomicUsize,
}

impl CountedPlans {
    fn always() -> Self {
        Self::first(usize::MAX)
    }

    fn first(allowed_lookups: usize) -> Self {
        Self {
            allowed_lookups,
            lookups: AtomicUsize::new(0),
        }
    }
}

impl ActivePlanLookup for CountedPlans {
    fn get(&self, plan_id: &str, branch: &str) -> Option<ActivePlan> {
        let n = self.lookups.fetch_add(1, Ordering::SeqCst);
        (n < self.allowed_lookups).then(|| ActivePlan {
            plan_id: plan_id.to_string(),
            branch: branch.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn whole_file_model(format: ModelOutputFormat, predicted_output: bool) -> ModelRoleConfig {
    ModelRoleConfig {
        role: ModelRole::WholeFileBuilder,
        base: BaseModelConfig {
            provider: ModelProvider::OpenAi,
            model_name: "synthetic".to_string(),
            model_id: "test/synthetic".to_string(),
            max_tokens: 200000,
            max_output_tokens: 100000,
            reserved_output_tokens: 40000,
            compatibility: ModelCompatibility::FULL,
            preferred_output_format: format,
            role_params_disabled: false,
            system_prompt_disabled: false,
            reasoning_effort: None,
            predicted_output_enabled: predicted_output,
            api_key_env_var: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        },
        temperature: 0.1,
        top_p: 0.1,
        large_context_fallback: vec![],
        large_output_fallback: vec![],
        strong_model: None,
    }
}

fn test_pack(whole_file: ModelRoleConfig) -> Arc<ModelPack> {
    let filler = whole_file.clone();
    Arc::new(ModelPack {
        name: "test".to_string(),
        description: "synthetic pack for build tests".to_string(),
        planner: PlannerRoleConfig {
            config: filler.clone(),
            max_convo_tokens: 10000,
        },
        architect: filler.clone(),
        coder: filler.clone(),
        plan_summary: filler.clone(),
        builder: filler.clone(),
        whole_file_builder: Some(whole_file),
        namer: filler.clone(),
        commit_msg: filler.clone(),
        exec_status: filler,
    })
}

fn file_state(pack: Arc<ModelPack>) -> ActiveBuildStreamFileState {
    ActiveBuildStreamFileState {
        file_path: "src/thing.rs".to_string(),
        pre_build_state: "a\nb\nc\n".to_string(),
        plan_id: "plan-1".to_string(),
        branch: "main".to_string(),
        convo_message_id: "convo-1".to_string(),
        build_id: "build-1".to_string(),
        model_stream_id: "stream-1".to_string(),
        model_pack: pack,
        whole_file_num_retry: 0,
        builder_run: BuilderRun::default(),
    }
}

async fn run_build(
    state: &mut ActiveBuildStreamFileState,
    ctx: &CancellationToken,
    client: &MockClient,
    plans: &CountedPlans,
) -> Result<String, GaleError> {
    state
        .build_whole_file(
            ctx,
            client,
            plans,
            "a\nX\nc\n",
            "replace b with X",
            "",
            "session-1",
        )
        .await
}

// ---------------------------------------------------------------------------
// End-to-end success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn structured_build_returns_merged_content() {
    let client = MockClient::new(vec![MockClient::ok(r#"{"wholeFile":"a\nX\nc\n"}"#)]);
    let plans = CountedPlans::always();
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        false,
    )));

    let content = run_build(&mut state, &CancellationToken::new(), &client, &plans)
        .await
        .unwrap();

    assert_eq!(content, "a\nX\nc\n");
    assert_eq!(client.calls(), 1);
    assert_eq!(state.builder_run.generation_ids.len(), 1);
    assert!(state.builder_run.built_whole_file);
    assert!(state.builder_run.build_whole_file_started_at.is_some());
    assert!(state.builder_run.build_whole_file_finished_at.is_some());

    // Structured path: instruction + file context, forced tool call.
    let request = client.last_request();
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.tools.len(), 1);
    assert_eq!(request.tool_choice, Some("wholeFile"));
    assert!(request.messages[1].content.contains("1: a"));
    assert!(request.messages[1].content.contains("2: X"));
}

#[tokio::test]
async fn tagged_build_returns_merged_content() {
    let client = MockClient::new(vec![MockClient::ok(
        "<WholeFile>\na\nX\nc\n</WholeFile>",
    )]);
    let plans = CountedPlans::always();
    let mut state = file_state(test_pack(whole_file_model(ModelOutputFormat::Xml, false)));

    let content = run_build(&mut state, &CancellationToken::new(), &client, &plans)
        .await
        .unwrap();

    assert_eq!(content, "a\nX\nc");

    // Tagged path: single prompt message, no tools.
    let request = client.last_request();
    assert_eq!(request.messages.len(), 1);
    assert!(request.tools.is_empty());
    assert_eq!(request.tool_choice, None);
}

// ---------------------------------------------------------------------------
// Predicted-output hint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prediction_attached_when_enabled_and_comments_present() {
    let client = MockClient::new(vec![MockClient::ok(r#"{"wholeFile":"a\nX\nc\n"}"#)]);
    let plans = CountedPlans::always();
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        true,
    )));

    state
        .build_whole_file(
            &CancellationToken::new(),
            &client,
            &plans,
            "a\nX\nc\n",
            "replace b with X",
            "reviewer: keep the trailing newline",
            "session-1",
        )
        .await
        .unwrap();

    let prediction = client.last_request().prediction.expect("prediction set");
    assert!(prediction.contains("a\nb\nc\n"));
    assert!(prediction.contains("<WholeFile>"));
}

#[tokio::test]
async fn prediction_omitted_without_comments() {
    let client = MockClient::new(vec![MockClient::ok(r#"{"wholeFile":"a\nX\nc\n"}"#)]);
    let plans = CountedPlans::always();
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        true,
    )));

    run_build(&mut state, &CancellationToken::new(), &client, &plans)
        .await
        .unwrap();

    assert_eq!(client.last_request().prediction, None);
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn extraction_failures_retry_until_success() {
    let client = MockClient::new(vec![
        MockClient::ok("not json"),
        MockClient::ok("still not json"),
        MockClient::ok(r#"{"wholeFile":""}"#),
        MockClient::ok(r#"{"wholeFile":"a\nX\nc\n"}"#),
    ]);
    let plans = CountedPlans::always();
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        false,
    )));

    let content = run_build(&mut state, &CancellationToken::new(), &client, &plans)
        .await
        .unwrap();

    assert_eq!(content, "a\nX\nc\n");
    assert_eq!(client.calls(), MAX_BUILD_ERROR_RETRIES as usize + 1);
    assert_eq!(state.whole_file_num_retry, MAX_BUILD_ERROR_RETRIES);
    // One generation id per model call, success and failures alike.
    assert_eq!(
        state.builder_run.generation_ids.len(),
        MAX_BUILD_ERROR_RETRIES as usize + 1
    );
}

#[tokio::test(start_paused = true)]
async fn retries_exhausted_carries_final_extraction_error() {
    let client = MockClient::new(vec![
        MockClient::ok("bad 1"),
        MockClient::ok("bad 2"),
        MockClient::ok("bad 3"),
        MockClient::ok(r#"{"wholeFile":""}"#),
    ]);
    let plans = CountedPlans::always();
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        false,
    )));

    let err = run_build(&mut state, &CancellationToken::new(), &client, &plans)
        .await
        .unwrap_err();

    assert_eq!(client.calls(), MAX_BUILD_ERROR_RETRIES as usize + 1);
    match err {
        GaleError::RetriesExhausted(message) => {
            assert!(
                message.contains("empty wholeFile"),
                "must carry the final underlying error, got: {message}"
            );
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn retry_backoff_waits_within_bounds() {
    let client = MockClient::new(vec![
        MockClient::ok("not json"),
        MockClient::ok(r#"{"wholeFile":"a\nX\nc\n"}"#),
    ]);
    let plans = CountedPlans::always();
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        false,
    )));

    let started = tokio::time::Instant::now();
    run_build(&mut state, &CancellationToken::new(), &client, &plans)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // First retry: 1² × 200ms base plus [0, 500)ms jitter. Everything else
    // is instant under the paused clock.
    assert!(elapsed >= Duration::from_millis(200), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(700), "elapsed {elapsed:?}");
}

#[test]
fn backoff_delay_is_quadratic_with_bounded_jitter() {
    for attempt in 1..=5u32 {
        let base = u64::from(attempt * attempt) * 200;
        for _ in 0..50 {
            let delay = backoff_delay(attempt);
            assert!(delay >= Duration::from_millis(base), "attempt {attempt}: {delay:?}");
            assert!(
                delay < Duration::from_millis(base + 500),
                "attempt {attempt}: {delay:?}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_during_backoff_aborts_without_sleeping() {
    let client = MockClient::new(vec![MockClient::ok("not json")]);
    let ctx = CancellationToken::new();
    *client.cancel_on_first_call.lock().unwrap() = Some(ctx.clone());

    let plans = CountedPlans::always();
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        false,
    )));

    let started = std::time::Instant::now();
    let err = run_build(&mut state, &ctx, &client, &plans).await.unwrap_err();

    // Aborted at the backoff suspension point: no second model call, and
    // nowhere near the 200ms minimum backoff.
    assert!(err.is_cancelled(), "got {err:?}");
    assert_eq!(client.calls(), 1);
    assert!(
        started.elapsed() < Duration::from_millis(150),
        "should not have slept out the backoff: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn cancellation_from_client_is_terminal() {
    let client = MockClient::new(vec![Err(GaleError::Cancelled)]);
    let plans = CountedPlans::always();
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        false,
    )));

    let err = run_build(&mut state, &CancellationToken::new(), &client, &plans)
        .await
        .unwrap_err();

    assert!(err.is_cancelled(), "got {err:?}");
    assert_eq!(client.calls(), 1);
}

// ---------------------------------------------------------------------------
// Active-plan precondition
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_plan_before_first_attempt_is_plan_not_found() {
    let client = MockClient::new(vec![MockClient::ok(r#"{"wholeFile":"a\nX\nc\n"}"#)]);
    let plans = CountedPlans::first(0);
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        false,
    )));

    let err = run_build(&mut state, &CancellationToken::new(), &client, &plans)
        .await
        .unwrap_err();

    assert!(matches!(err, GaleError::PlanNotFound { .. }), "got {err:?}");
    assert_eq!(client.calls(), 0, "no model call without an active plan");
}

#[tokio::test]
async fn plan_disappearing_before_retry_aborts_retries() {
    let client = MockClient::new(vec![MockClient::ok("not json")]);
    // First lookup (before the first attempt) succeeds; the pre-retry
    // re-verification sees the plan gone.
    let plans = CountedPlans::first(1);
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        false,
    )));

    let err = run_build(&mut state, &CancellationToken::new(), &client, &plans)
        .await
        .unwrap_err();

    assert!(matches!(err, GaleError::PlanNotFound { .. }), "got {err:?}");
    assert_eq!(client.calls(), 1, "no further model calls after the plan is gone");
}

// ---------------------------------------------------------------------------
// Transport failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transport_failure_is_terminal_not_retried() {
    let client = MockClient::new(vec![Err(GaleError::Transport {
        message: "upstream 500".to_string(),
    })]);
    let plans = CountedPlans::always();
    let mut state = file_state(test_pack(whole_file_model(
        ModelOutputFormat::ToolCallJson,
        false,
    )));

    let err = run_build(&mut state, &CancellationToken::new(), &client, &plans)
        .await
        .unwrap_err();

    assert!(matches!(err, GaleError::Transport { .. }), "got {err:?}");
    assert_eq!(client.calls(), 1);
    assert_eq!(state.whole_file_num_retry, 0);
}
