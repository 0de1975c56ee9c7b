use crate::error::GaleError;
use crate::parsers::ResponseExtractor;

/// Extracts file content from a tagged text block.
///
/// Content is everything between the first start tag and the last end tag.
/// Taking the last end tag tolerates file content that itself contains the
/// literal end tag text; a second start tag inside the content is not
/// permitted by the format and is rejected.
pub struct TaggedExtractor {
    tag: &'static str,
}

impl TaggedExtractor {
    pub fn new(tag: &'static str) -> Self {
        Self { tag }
    }

    /// The extractor for whole-file build responses.
    pub fn whole_file() -> Self {
        Self::new(crate::prompts::WHOLE_FILE_TAG)
    }
}

impl ResponseExtractor for TaggedExtractor {
    fn extract(&self, raw: &str) -> Result<String, GaleError> {
        let start_tag = format!("<{}>", self.tag);
        let end_tag = format!("</{}>", self.tag);

        let start = raw
            .find(&start_tag)
            .ok_or_else(|| GaleError::Extraction(format!("no {start_tag} tag in response")))?;
        let content_start = start + start_tag.len();

        let end = raw[content_start..]
            .rfind(&end_tag)
            .map(|i| content_start + i)
            .ok_or_else(|| GaleError::Extraction(format!("no {end_tag} tag in response")))?;

        let content = &raw[content_start..end];

        if content.contains(&start_tag) {
            return Err(GaleError::Extraction(format!(
                "nested {start_tag} tag in response"
            )));
        }

        // Strip the newlines that frame the block, not content whitespace.
        let content = content.strip_prefix('\n').unwrap_or(content);
        let content = content.strip_suffix('\n').unwrap_or(content);

        if content.is_empty() {
            return Err(GaleError::Extraction(format!(
                "empty {start_tag} block in response"
            )));
        }

        Ok(content.to_string())
    }
}
