//! Shared output layer: pretty text for people, compact text for pipes,
//! stable JSON for scripts.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--json`
//! 2. `DOCKET_FORMAT` env var (`pretty` | `text` | `json`)
//! 3. `output` in the user config
//! 4. Pretty on a TTY, text when piped

use crate::actor::ActorResolutionError;
use docket_core::DocketError;
use serde::Serialize;
use std::io::{self, Write};

pub const PRETTY_RULE_WIDTH: usize = 72;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Left-aligned key/value line.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Sections and separators.
    Pretty,
    /// One record per line, tab separated.
    Text,
    Json,
}

impl OutputMode {
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Map the resolved config value; unknown values read as pretty.
    pub fn from_resolved(raw: &str) -> Self {
        match raw {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Pretty,
        }
    }
}

/// Render `value` as JSON, or through the text or pretty renderer.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// Same renderer for text and pretty.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if mode.is_json() {
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
    } else {
        human_fn(value, &mut out)?;
    }
    Ok(())
}

/// Structured error for stderr.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// `E####` code from the library, or a CLI-local slug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }
}

impl From<&DocketError> for CliError {
    fn from(err: &DocketError) -> Self {
        let code = err.code();
        if err.is_fatal() {
            tracing::error!(error = %err, code = code.code(), "internal error");
            return Self {
                message: format!("internal error ({})", code.message()),
                suggestion: None,
                error_code: Some(code.code().to_string()),
            };
        }
        Self {
            message: err.to_string(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

impl From<&ActorResolutionError> for CliError {
    fn from(err: &ActorResolutionError) -> Self {
        Self::with_details(&err.message, "Set --actor or DOCKET_ACTOR", err.code)
    }
}

impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        if let Some(actor) = err.downcast_ref::<ActorResolutionError>() {
            return Self::from(actor);
        }
        err.downcast_ref::<DocketError>()
            .map_or_else(|| Self::new(format!("{err:#}")), Self::from)
    }
}

fn write_error(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    if mode.is_json() {
        serde_json::to_writer_pretty(&mut *out, &serde_json::json!({ "error": error }))?;
        writeln!(out)?;
    } else {
        match &error.error_code {
            Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
            None => writeln!(out, "error: {}", error.message)?,
        }
        if let Some(suggestion) = &error.suggestion {
            writeln!(out, "  suggestion: {suggestion}")?;
        }
    }
    Ok(())
}

/// Render an error to stderr.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)
}

/// Mail that did not go out. The ledger change already stands.
pub fn warn_delivery_failures(failures: &[DocketError]) {
    for failure in failures {
        eprintln!("warning: {failure} (queued; run `dk outbox retry`)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::ErrorCode;

    #[test]
    fn resolved_modes_map() {
        assert_eq!(OutputMode::from_resolved("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_resolved("text"), OutputMode::Text);
        assert_eq!(OutputMode::from_resolved("pretty"), OutputMode::Pretty);
        assert_eq!(OutputMode::from_resolved("fancy"), OutputMode::Pretty);
        assert!(OutputMode::Json.is_json());
    }

    #[test]
    fn docket_errors_carry_code_and_hint() {
        let err = DocketError::precondition(ErrorCode::NoTelechatSlot, "no telechat after 2026-06-01");
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E4004"));
        assert!(cli.suggestion.as_deref().is_some_and(|s| s.contains("dk telechat add")));
    }

    #[test]
    fn anyhow_wrapping_keeps_the_code() {
        let err = anyhow::Error::new(DocketError::DocumentNotFound("draft-x".into()));
        let cli = CliError::from(&err);
        assert_eq!(cli.message, "document 'draft-x' not found");
        assert!(cli.error_code.is_some());

        let plain = CliError::from(&anyhow::anyhow!("boom"));
        assert!(plain.error_code.is_none());

        let missing = anyhow::Error::new(ActorResolutionError {
            message: "no actor".into(),
            code: "missing_actor",
        });
        assert_eq!(CliError::from(&missing).error_code.as_deref(), Some("missing_actor"));
    }

    #[test]
    fn invariant_text_is_not_shown() {
        let err = DocketError::invariant("IESG dimension of draft-x would be unset");
        let cli = CliError::from(&err);
        assert!(!cli.message.contains("draft-x"));
        assert_eq!(cli.error_code.as_deref(), Some("E5001"));
    }

    #[test]
    fn human_error_shows_code_and_suggestion() {
        let mut buf = Vec::new();
        let err = CliError::with_details("nope", "try again", "E9999");
        write_error(&mut buf, OutputMode::Text, &err).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "error[E9999]: nope\n  suggestion: try again\n");
    }

    #[test]
    fn json_error_is_wrapped() {
        let mut buf = Vec::new();
        write_error(&mut buf, OutputMode::Json, &CliError::new("nope")).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["error"]["message"], "nope");
        assert!(value["error"].get("suggestion").is_none());
    }
}
