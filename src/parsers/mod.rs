pub mod tagged;
pub mod tool_call;

use crate::error::GaleError;
use crate::models::ModelOutputFormat;
use crate::parsers::tagged::TaggedExtractor;
use crate::parsers::tool_call::ToolCallExtractor;

/// Trait for extracting final file content from a model's raw output.
/// Each response format (structured tool call, tagged text) has its own
/// extractor. Extraction failures are recoverable — the build attempt
/// retries them.
pub trait ResponseExtractor: Send + Sync {
    fn extract(&self, raw: &str) -> Result<String, GaleError>;
}

/// Resolve the extractor for a model's preferred output format.
pub fn extractor_for(format: ModelOutputFormat) -> Box<dyn ResponseExtractor> {
    match format {
        ModelOutputFormat::ToolCallJson => Box::new(ToolCallExtractor),
        ModelOutputFormat::Xml => Box::new(TaggedExtractor::whole_file()),
    }
}
