pub mod whole_file;

use std::sync::Arc;
use std::time::SystemTime;

use crate::models::packs::ModelPack;

/// Audit record for one file's build attempt, mutated only by the owning
/// task and persisted by an external collaborator once the attempt reaches
/// a terminal state.
#[derive(Clone, Debug, Default)]
pub struct BuilderRun {
    /// True once the whole-file path was used for this file.
    pub built_whole_file: bool,
    pub build_whole_file_started_at: Option<SystemTime>,
    pub build_whole_file_finished_at: Option<SystemTime>,
    /// Generation identifiers returned by the model backend, accumulated
    /// across retries for billing/audit correlation.
    pub generation_ids: Vec<String>,
}

/// Per-file, per-build-attempt state. Created when a build attempt begins
/// for a file, exclusively owned by the attempt's task, discarded (or
/// persisted externally) at a terminal state. Retries reuse and mutate this
/// same state, which is why they run strictly sequentially.
#[derive(Clone, Debug)]
pub struct ActiveBuildStreamFileState {
    pub file_path: String,
    /// Original file content before the build ("pre-build" state).
    pub pre_build_state: String,
    pub plan_id: String,
    pub branch: String,
    pub convo_message_id: String,
    pub build_id: String,
    pub model_stream_id: String,
    /// Referenced, not owned — packs are immutable after startup.
    pub model_pack: Arc<ModelPack>,
    /// Monotonic retry counter for the whole-file path.
    pub whole_file_num_retry: u32,
    pub builder_run: BuilderRun,
}
