//! Prompt assembly shared by every runner integration.

/// Combine the agent persona and the task into the text sent to a runner.
///
/// Both parts are trimmed; when both are present the task follows the persona
/// after a blank line as `Task: <task>`.
pub fn build_agent_prompt(persona: &str, task: &str) -> String {
    let persona = persona.trim();
    let task = task.trim();
    match (persona.is_empty(), task.is_empty()) {
        (true, _) => task.to_string(),
        (false, true) => persona.to_string(),
        (false, false) => format!("{persona}\n\nTask: {task}"),
    }
}

/// Truncate `text` to at most `limit` bytes on a char boundary, marking the cut.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
