//! CI platform output conventions.
//!
//! - Step outputs go to the file named by `GITHUB_OUTPUT` using the multi-line
//!   delimiter protocol; without that file they are printed as `name=value` lines.
//! - Secrets are registered with `::add-mask::` so the runner redacts them.
//! - Step summaries are markdown appended to the file named by
//!   `GITHUB_STEP_SUMMARY`.

mod summary;

pub use summary::{StepSummary, SummaryTable, code};

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Register a value the runner must redact from all later log output.
pub fn register_secret(value: &str) {
    for line in value.lines().filter(|line| !line.trim().is_empty()) {
        println!("::add-mask::{line}");
    }
}

/// Where step outputs are written.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    path: Option<PathBuf>,
}

impl OutputSink {
    /// Sink writing to `path`, or to stdout when `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set one step output.
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        debug!("Setting output {} ({} bytes)", name, value.len());

        let Some(path) = &self.path else {
            println!("{name}={value}");
            return Ok(());
        };

        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open output file: {}", path.display()))?;
        write!(file, "{name}<<{delimiter}\n{value}\n{delimiter}\n")
            .with_context(|| format!("Failed to write output '{name}'"))?;
        Ok(())
    }

    /// Serialize `value` as compact JSON and set it as an output.
    pub fn set_json_output<T: serde::Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize output '{name}'"))?;
        self.set_output(name, &json)
    }
}

/// Parse a step output file back into name/value pairs.
///
/// Understands both `name=value` lines and the delimiter form.
pub fn parse_output_file(content: &str) -> Vec<(String, String)> {
    let mut outputs = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        if let Some((name, delimiter)) = line.split_once("<<") {
            let mut value = Vec::new();
            for next in lines.by_ref() {
                if next == delimiter {
                    break;
                }
                value.push(next);
            }
            outputs.push((name.to_string(), value.join("\n")));
        } else if let Some((name, value)) = line.split_once('=') {
            outputs.push((name.to_string(), value.to_string()));
        }
    }
    outputs
}

/// Interpret a boolean-ish CI input: `true`, `1`, `yes` and `on` are true.
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_outputs_use_delimiter_protocol() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output");
        let sink = OutputSink::new(Some(path.clone()));

        sink.set_output("jobMatrix", "{\"job\":[]}").unwrap();
        sink.set_output("multi", "a\nb").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("jobMatrix<<ghadelimiter_"));

        let outputs = parse_output_file(&content);
        assert_eq!(
            outputs,
            vec![
                ("jobMatrix".to_string(), "{\"job\":[]}".to_string()),
                ("multi".to_string(), "a\nb".to_string())
            ]
        );
    }

    #[test]
    fn test_json_output_is_compact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output");
        let sink = OutputSink::new(Some(path.clone()));

        sink.set_json_output("value", &serde_json::json!({"a": [1, 2]})).unwrap();

        let outputs = parse_output_file(&std::fs::read_to_string(&path).unwrap());
        assert_eq!(outputs[0].1, r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("true"));
        assert!(is_truthy(" TRUE "));
        assert!(is_truthy("1"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }
}
