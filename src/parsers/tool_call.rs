use crate::error::GaleError;
use crate::parsers::ResponseExtractor;
use crate::prompts::WholeFileArgs;

/// Extracts file content from a structured tool-call payload.
/// Expected shape: `{"wholeFile": "<entire file content>"}`
pub struct ToolCallExtractor;

impl ResponseExtractor for ToolCallExtractor {
    fn extract(&self, raw: &str) -> Result<String, GaleError> {
        let args: WholeFileArgs = serde_json::from_str(raw)
            .map_err(|e| GaleError::Extraction(format!("malformed tool call JSON: {e}")))?;

        if args.whole_file.is_empty() {
            return Err(GaleError::Extraction(
                "empty wholeFile field in tool call".to_string(),
            ));
        }

        Ok(args.whole_file)
    }
}
