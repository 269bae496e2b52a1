//! Response envelopes and JSON writers for the CLI shell

use crate::error::{AnalysisError, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Which analysis produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Stats,
    Correlation,
    Differential,
    Clustering,
}

impl Operation {
    #[must_use]
    pub const fn success_message(self) -> &'static str {
        match self {
            Self::Stats => "Statistical analysis completed successfully",
            Self::Correlation => "Correlation analysis completed successfully",
            Self::Differential => "Differential analysis completed successfully",
            Self::Clustering => "Clustering analysis completed successfully",
        }
    }
}

/// Uniform `{success, data|message}` wrapper around engine results
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

impl Envelope {
    /// Wrap a successful result
    ///
    /// # Errors
    /// Returns error if the result cannot be converted to JSON
    pub fn success<T: Serialize>(operation: Operation, data: &T) -> Result<Self> {
        Ok(Self {
            success: true,
            data: Some(serde_json::to_value(data)?),
            message: operation.success_message().to_string(),
            kind: None,
        })
    }

    /// Wrap a failed call
    #[must_use]
    pub fn failure(error: &AnalysisError) -> Self {
        Self {
            success: false,
            data: None,
            message: format!("Analysis failed: {error}"),
            kind: Some(error.kind()),
        }
    }
}

/// Write an envelope as pretty JSON to a file, or to stdout when no path is
/// given
///
/// # Errors
/// Returns error if serialization or the write fails
pub fn write_envelope(output: Option<&Path>, envelope: &Envelope) -> Result<()> {
    let json = serde_json::to_string_pretty(envelope)?;
    match output {
        Some(path) => fs::write(path, json)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}
