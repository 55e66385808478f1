//! GitHub Copilot CLI in single-prompt mode.

use std::ffi::OsString;
use std::path::Path;

use crate::core::classifier::COPILOT_USAGE_LIMIT_PATTERNS;

use super::cli::CliTool;

#[derive(Debug, Clone, Copy, Default)]
pub struct Copilot;

impl CliTool for Copilot {
    const NAME: &'static str = "copilot";

    fn usage_limit_patterns(&self) -> &'static [&'static str] {
        COPILOT_USAGE_LIMIT_PATTERNS
    }

    fn args(&self, prompt: &str, _workdir: &Path, model: Option<&str>) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(model) = model {
            args.push("--model".into());
            args.push(model.into());
        }
        args.extend(
            [
                "-p",
                prompt,
                "--allow-all-tools",
                "--allow-all-paths",
                "--stream",
                "off",
            ]
            .map(OsString::from),
        );
        args
    }
}
