use crate::client::Message;

/// Fixed per-request token overhead (wrappers, role markers, tool plumbing)
/// added on top of message content when estimating input size.
pub const TOKENS_PER_REQUEST: usize = 500;

/// Bytes per token for the estimation heuristic. Real tokenizers average
/// ~4 bytes/token on code and English text; exact fidelity is not required
/// here, only monotonic consistency for budget decisions.
const BYTES_PER_TOKEN: usize = 4;

/// Deterministic, allocation-free token count approximation.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(BYTES_PER_TOKEN)
}

/// Token estimate for a message set, content only (request overhead is
/// accounted separately via `TOKENS_PER_REQUEST`).
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(|m| estimate_tokens(&m.content)).sum()
}
