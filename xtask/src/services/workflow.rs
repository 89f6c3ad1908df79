//! Artifact hand-off between the jobs of the release workflow.
//!
//! Only the `actions/upload-artifact` / `actions/download-artifact` steps are read,
//! line by line; the rest of the YAML is ignored.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const UPLOAD: &str = "actions/upload-artifact";
const DOWNLOAD: &str = "actions/download-artifact";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Upload,
    Download,
}

/// One artifact step and the `name` it passes in `with:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStep {
    /// 1-based line of the `uses:` key.
    pub line: usize,
    pub transfer: Transfer,
    pub name: Option<String>,
}

/// # Errors
/// Returns an error if the workflow file cannot be read.
pub fn read_artifact_steps(path: &Path) -> Result<Vec<ArtifactStep>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow at {}", path.display()))?;
    Ok(artifact_steps(&text))
}

#[must_use]
pub fn artifact_steps(text: &str) -> Vec<ArtifactStep> {
    let lines: Vec<&str> = text.lines().collect();
    let mut steps = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let Some(action) = line.trim_start().trim_start_matches("- ").strip_prefix("uses:") else {
            continue;
        };
        let transfer = match action.trim() {
            action if action.starts_with(UPLOAD) => Transfer::Upload,
            action if action.starts_with(DOWNLOAD) => Transfer::Download,
            _ => continue,
        };

        let indent = indent_of(line);
        let name = lines[index + 1..]
            .iter()
            .filter(|line| !line.trim().is_empty())
            .take_while(|line| indent_of(line) >= indent && !line.trim_start().starts_with("- "))
            .find_map(|line| line.trim().strip_prefix("name:"))
            .map(|value| value.trim().trim_matches(['"', '\'']).to_owned());

        steps.push(ArtifactStep { line: index + 1, transfer, name });
    }

    steps
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Problems with how the workflow passes `artifact` from the build job to the publish job.
#[must_use]
pub fn artifact_problems(steps: &[ArtifactStep], artifact: &str) -> Vec<String> {
    let mut problems: Vec<String> = steps
        .iter()
        .filter(|step| step.name.as_deref() != Some(artifact))
        .map(|step| match &step.name {
            Some(name) => format!("line {}: artifact '{name}' should be '{artifact}'", step.line),
            None => format!("line {}: artifact step has no name, expected '{artifact}'", step.line),
        })
        .collect();

    for (transfer, label) in [(Transfer::Upload, "uploads"), (Transfer::Download, "downloads")] {
        if !steps.iter().any(|step| step.transfer == transfer) {
            problems.push(format!("no step {label} the '{artifact}' artifact"));
        }
    }
    problems
}
