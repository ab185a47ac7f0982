//! HEIC/HEIF → JPEG conversion through an external program.
//!
//! No pure Rust HEIF decoder is mature enough to rely on, so uploads in
//! those formats are converted up front by a configured command line tool
//! (`heif-convert -q 95 <in> <out>` by default). Everything after conversion
//! sees an ordinary JPEG.

use crate::config::HeicConfig;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum HeicError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("{program} produced no output at {path}")]
    MissingOutput { program: String, path: String },
}

/// Converts HEIC/HEIF files to JPEG.
pub trait HeicConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), HeicError>;
}

/// True for the extensions that need conversion before decoding.
pub fn is_heic(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("heic") || e.eq_ignore_ascii_case("heif"))
}

/// Runs `program args... <input> <output>`.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &HeicConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

impl HeicConverter for CommandConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), HeicError> {
        debug!(program = %self.program, input = %input.display(), "Converting HEIC");
        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg(output)
            .output()
            .map_err(|source| HeicError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(HeicError::Failed {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        let produced = std::fs::metadata(output).is_ok_and(|m| m.len() > 0);
        if !produced {
            return Err(HeicError::MissingOutput {
                program: self.program.clone(),
                path: output.display().to_string(),
            });
        }
        Ok(())
    }
}
