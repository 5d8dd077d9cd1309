//! PDF → markdown conversion by shelling out to the MinerU CLI

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use paperflow_core::{Handler, ItemError, Produced, WorkItem};
use tokio::process::Command;

use crate::markdown::markdown_files;

/// How to invoke the converter.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Directory of `<id>.pdf` inputs
    pub pdf_dir: PathBuf,
    /// Converter output root; one `<id>/` directory per paper
    pub output_dir: PathBuf,
    /// Executable name or path
    pub command: String,
    pub backend: String,
    pub method: String,
    pub lang: String,
    /// Kill the converter after this long
    pub timeout: Option<Duration>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("data/pdfs"),
            output_dir: PathBuf::from("data/mineru"),
            command: "mineru".to_string(),
            backend: "pipeline".to_string(),
            method: "txt".to_string(),
            lang: "en".to_string(),
            timeout: None,
        }
    }
}

/// Last non-empty line of converter stderr (progress noise comes first).
fn stderr_tail(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

pub struct ConvertHandler {
    config: ConvertConfig,
}

impl ConvertHandler {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    fn command(&self, pdf: &std::path::Path) -> Command {
        let c = &self.config;
        let mut cmd = Command::new(&c.command);
        cmd.arg("-p")
            .arg(pdf)
            .arg("-o")
            .arg(&c.output_dir)
            .args(["-m", &c.method, "-b", &c.backend, "-l", &c.lang])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Handler for ConvertHandler {
    async fn handle(&self, item: &WorkItem) -> Result<Produced, ItemError> {
        let pdf = self.config.pdf_dir.join(format!("{item}.pdf"));
        if !tokio::fs::try_exists(&pdf).await? {
            return Err(ItemError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", pdf.display()),
            )));
        }

        log::debug!("{item}: running {} on {}", self.config.command, pdf.display());
        let run = self.command(&pdf).output();
        let output = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                ItemError::Process(format!(
                    "{} timed out after {}s",
                    self.config.command,
                    limit.as_secs()
                ))
            })?,
            None => run.await,
        }
        .map_err(|e| ItemError::Process(format!("failed to run {}: {e}", self.config.command)))?;

        if !output.status.success() {
            return Err(ItemError::Process(format!(
                "{} exited with {}: {}",
                self.config.command,
                output.status,
                stderr_tail(&output.stderr)
            )));
        }

        let produced = markdown_files(&self.config.output_dir, item)?.len() as u64;
        if produced == 0 {
            return Ok(Produced::NoWork("no_markdown".to_string()));
        }
        Ok(Produced::Units(produced))
    }
}
