//! `codex exec` in read-only sandbox mode.

use std::ffi::OsString;
use std::path::Path;

use crate::core::classifier::CODEX_USAGE_LIMIT_PATTERNS;

use super::cli::CliTool;

#[derive(Debug, Clone, Copy, Default)]
pub struct Codex;

impl CliTool for Codex {
    const NAME: &'static str = "codex";

    fn usage_limit_patterns(&self) -> &'static [&'static str] {
        CODEX_USAGE_LIMIT_PATTERNS
    }

    fn args(&self, prompt: &str, workdir: &Path, model: Option<&str>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--cd".into(),
            workdir.into(),
            "--sandbox".into(),
            "read-only".into(),
            "--ask-for-approval".into(),
            "never".into(),
            "exec".into(),
            // Workspaces are not necessarily git repositories.
            "--skip-git-repo-check".into(),
        ];
        if let Some(model) = model {
            args.push("--model".into());
            args.push(model.into());
        }
        args.push(prompt.into());
        args
    }
}
