//! DOCX → PDF conversion through an external command.
//!
//! The upload is written into a fresh scratch directory, the configured
//! command is run with `{input}` and `{outdir}` substituted, and the PDF it
//! leaves in the scratch directory is read back. The directory is a
//! [`tempfile::TempDir`], so it is removed on every exit path.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use docvault_core::{VaultError, VaultResult};

const INPUT_NAME: &str = "input.docx";
const OUTPUT_NAME: &str = "input.pdf";

#[derive(Debug, Clone)]
pub struct DocxConverter {
    argv: Vec<String>,
    scratch_root: Option<PathBuf>,
}

impl DocxConverter {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            scratch_root: None,
        }
    }

    /// Creates scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Converts a DOCX document and returns the PDF bytes.
    pub async fn convert(&self, docx: &[u8]) -> VaultResult<Vec<u8>> {
        let scratch = match &self.scratch_root {
            Some(root) => tempfile::Builder::new().prefix("docvault-").tempdir_in(root),
            None => tempfile::Builder::new().prefix("docvault-").tempdir(),
        }
        .map_err(|e| VaultError::Internal(format!("failed to create scratch dir: {}", e)))?;

        let input = scratch.path().join(INPUT_NAME);
        tokio::fs::write(&input, docx)
            .await
            .map_err(|e| VaultError::Internal(format!("failed to write scratch file: {}", e)))?;

        let argv = substitute(&self.argv, &input, scratch.path());
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| VaultError::Internal("docx converter command is empty".to_string()))?;
        debug!(program = %program, "converting docx to pdf");

        let output = Command::new(program)
            .args(args)
            .current_dir(scratch.path())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| VaultError::Upstream(format!("failed to run {}: {}", program, e)))?;
        if !output.status.success() {
            return Err(VaultError::Upstream(format!(
                "Conversion failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tokio::fs::read(scratch.path().join(OUTPUT_NAME))
            .await
            .map_err(|e| {
                VaultError::Upstream(format!("converter produced no {}: {}", OUTPUT_NAME, e))
            })
    }
}

fn substitute(argv: &[String], input: &Path, outdir: &Path) -> Vec<String> {
    let input = input.display().to_string();
    let outdir = outdir.display().to_string();
    argv.iter()
        .map(|a| a.replace("{input}", &input).replace("{outdir}", &outdir))
        .collect()
}
