//! Gemini CLI with JSON output.

use std::ffi::OsString;
use std::path::Path;

use serde::Deserialize;

use crate::core::classifier::GEMINI_USAGE_LIMIT_PATTERNS;

use super::cli::CliTool;

#[derive(Debug, Clone, Copy, Default)]
pub struct Gemini;

#[derive(Debug, Deserialize)]
struct GeminiReply {
    #[serde(default)]
    response: String,
}

impl CliTool for Gemini {
    const NAME: &'static str = "gemini";

    fn usage_limit_patterns(&self) -> &'static [&'static str] {
        GEMINI_USAGE_LIMIT_PATTERNS
    }

    fn args(&self, prompt: &str, _workdir: &Path, model: Option<&str>) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-p", prompt, "--output-format", "json"]
            .map(OsString::from)
            .into();
        if let Some(model) = model {
            args.push("-m".into());
            args.push(model.into());
        }
        args
    }

    /// Prefer the `response` field of the JSON document; fall back to raw text.
    fn parse_output(&self, stdout: &str) -> String {
        let trimmed = stdout.trim();
        match serde_json::from_str::<GeminiReply>(trimmed) {
            Ok(reply) if !reply.response.trim().is_empty() => reply.response.trim().to_string(),
            _ => trimmed.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_json_invocation() {
        let args = Gemini.args("p\n\nTask: do something", Path::new("/work"), None);
        assert_eq!(
            args,
            ["-p", "p\n\nTask: do something", "--output-format", "json"].map(OsString::from)
        );
    }

    #[test]
    fn model_flag_is_appended() {
        let args = Gemini.args("prompt", Path::new("/work"), Some("gemini-2.5"));
        assert_eq!(args[4], OsString::from("-m"));
        assert_eq!(args[5], OsString::from("gemini-2.5"));
    }

    #[test]
    fn extracts_response_field() {
        let stdout = r#"{"response":"  hello  ","stats":{"models":{}}}"#;
        assert_eq!(Gemini.parse_output(stdout), "hello");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(Gemini.parse_output("  ok\n"), "ok");
    }

    #[test]
    fn empty_response_falls_back_to_raw() {
        assert_eq!(Gemini.parse_output(r#"{"response":""}"#), r#"{"response":""}"#);
    }
}
