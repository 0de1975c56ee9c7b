use schemars::JsonSchema;
use serde::Deserialize;

use crate::client::ToolDefinition;
use crate::tokens::estimate_tokens;

/// Tag wrapping the merged file in tagged-text responses and
/// predicted-output drafts.
pub const WHOLE_FILE_TAG: &str = "WholeFile";

/// System prompt for models on the structured-call path: the entire merged
/// file comes back as a single forced tool call.
pub const SYS_WHOLE_FILE_JSON: &str = r#"You are an AI coding assistant. You must provide the entire merged file with all proposed updates applied. Respond by invoking the function "wholeFile" with a single argument:

{
  "wholeFile": "<entire file content here>"
}

Do not include any additional text, formatting, or tags. Only return the function call in JSON format."#;

/// Arguments of the "wholeFile" tool call.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WholeFileArgs {
    /// The full file content with all changes applied.
    #[serde(rename = "wholeFile")]
    pub whole_file: String,
}

/// Tool definition attached to structured-call requests. The schema is a
/// single required string field holding the entire file.
pub fn whole_file_tool() -> ToolDefinition {
    ToolDefinition {
        name: "wholeFile",
        description: "Returns the entire merged file content with proposed changes applied",
        parameters: serde_json::to_value(schemars::schema_for!(WholeFileArgs))
            .unwrap_or_default(),
    }
}

/// The file context shared by both response-format paths: the target path,
/// line-numbered original and proposal, the change description, and any
/// human comments.
pub fn whole_file_context(
    file_path: &str,
    original_with_line_nums: &str,
    proposed_with_line_nums: &str,
    desc: &str,
    comments: &str,
) -> String {
    let mut context = format!(
        "File: {file_path}\n\n\
Original file:\n```\n{original_with_line_nums}\n```\n\n\
Proposed changes:\n```\n{proposed_with_line_nums}\n```\n\n\
Change description:\n{desc}\n"
    );

    if !comments.is_empty() {
        context.push_str(&format!("\nComments:\n{comments}\n"));
    }

    context
}

/// Prompt for models on the tagged-text path: the expected response is the
/// merged file in a single tagged block. Returns the prompt and its token
/// estimate.
pub fn whole_file_prompt(
    file_path: &str,
    original_with_line_nums: &str,
    proposed_with_line_nums: &str,
    desc: &str,
    comments: &str,
) -> (String, usize) {
    let prompt = format!(
        "You are an AI coding assistant. Apply the proposed changes to the \
original file and output the entire resulting file, wrapped in \
<{WHOLE_FILE_TAG}> and </{WHOLE_FILE_TAG}> tags. Output nothing else. Line \
numbers in the inputs are for reference only and must not appear in your \
output.\n\n{context}",
        context = whole_file_context(
            file_path,
            original_with_line_nums,
            proposed_with_line_nums,
            desc,
            comments
        )
    );

    let tokens = estimate_tokens(&prompt);
    (prompt, tokens)
}

/// Annotate content with 1-based line numbers. Deterministic and stable —
/// used purely to help the model reference positions, never present in the
/// final output.
pub fn add_line_nums(content: &str) -> String {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{}: {}\n", i + 1, line))
        .collect()
}
