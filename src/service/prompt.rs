//! System prompt composition

/// Fixed instructions placed above the gathered context
pub const SYSTEM_PREAMBLE: &str = "You are a helpful AI assistant. Use the following information to answer the user's question, but don't explicitly mention that you're using this information unless asked. If the information doesn't contain the answer, just say you don't know and respond based on your training.";

pub fn document_block(file_name: &str, context: &str) -> String {
    format!("Information from file '{}':\n{}", file_name, context)
}

pub fn web_block(context: &str) -> String {
    format!("Information from web search:\n{}", context)
}

pub fn error_block(error: &str) -> String {
    format!("Error analyzing file: {}", error)
}

/// Preamble plus every block, blank-line separated; `None` without blocks
pub fn compose_system_prompt(blocks: &[String]) -> Option<String> {
    if blocks.is_empty() {
        return None;
    }
    Some(format!("{}\n\n{}", SYSTEM_PREAMBLE, blocks.join("\n\n")))
}
