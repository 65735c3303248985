use crate::config::OfficeConfig;
use crate::error::{CombineError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Exports spreadsheets to PDF. One value is one host application session.
#[allow(async_fn_in_trait)]
pub trait SpreadsheetExporter {
    /// Export `spreadsheet` into `out_dir` and return the written PDF.
    async fn export_pdf(&mut self, spreadsheet: &Path, out_dir: &Path) -> Result<PathBuf>;

    /// Release the session. Called on every exit path of a batch.
    async fn close(&mut self);
}

/// Acquires exporter sessions.
#[allow(async_fn_in_trait)]
pub trait HostLauncher {
    type Session: SpreadsheetExporter;

    async fn launch(&self) -> Result<Self::Session>;
}

/// Launches LibreOffice sessions as configured.
#[derive(Debug, Clone)]
pub struct OfficeLauncher {
    program: PathBuf,
    timeout: Duration,
    extra_args: Vec<String>,
}

impl OfficeLauncher {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(120),
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(config: &OfficeConfig) -> Self {
        Self::new(config.program.clone())
            .with_timeout(config.timeout())
            .with_extra_args(config.extra_args.clone())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl HostLauncher for OfficeLauncher {
    type Session = OfficeSession;

    async fn launch(&self) -> Result<OfficeSession> {
        OfficeSession::launch(self).await
    }
}

/// A headless, invisible LibreOffice session with a private user profile, so
/// exports never attach to an office instance the operator has open.
pub struct OfficeSession {
    program: PathBuf,
    timeout: Duration,
    extra_args: Vec<String>,
    profile: Option<TempDir>,
    exports: usize,
}

impl OfficeSession {
    pub async fn launch(launcher: &OfficeLauncher) -> Result<Self> {
        let unavailable = |message: String| CombineError::HostUnavailable {
            program: launcher.program.display().to_string(),
            message,
        };

        let mut probe = base_command(&launcher.program, &launcher.extra_args);
        probe
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(launcher.timeout, probe.output()).await {
            Err(_) => return Err(unavailable("did not answer --version in time".to_string())),
            Ok(Err(e)) => return Err(unavailable(e.to_string())),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return Err(unavailable(format!(
                "--version exited with {}",
                output.status
            )));
        }

        let profile = tempfile::Builder::new()
            .prefix("xlsx-pdf-combine-profile-")
            .tempdir()
            .map_err(|e| unavailable(format!("cannot create profile directory: {}", e)))?;

        info!(
            program = %launcher.program.display(),
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            profile = %profile.path().display(),
            "office session started"
        );

        Ok(Self {
            program: launcher.program.clone(),
            timeout: launcher.timeout,
            extra_args: launcher.extra_args.clone(),
            profile: Some(profile),
            exports: 0,
        })
    }

    pub fn exports(&self) -> usize {
        self.exports
    }

    pub fn is_open(&self) -> bool {
        self.profile.is_some()
    }

    fn profile_path(&self) -> Result<&Path> {
        self.profile
            .as_ref()
            .map(TempDir::path)
            .ok_or_else(|| CombineError::HostUnavailable {
                program: self.program.display().to_string(),
                message: "session is closed".to_string(),
            })
    }
}

impl SpreadsheetExporter for OfficeSession {
    async fn export_pdf(&mut self, spreadsheet: &Path, out_dir: &Path) -> Result<PathBuf> {
        let conversion_error = |message: String| CombineError::Conversion {
            path: spreadsheet.display().to_string(),
            message,
        };

        let stem = spreadsheet
            .file_stem()
            .ok_or_else(|| conversion_error("file has no name".to_string()))?;
        let mut expected_name = OsString::from(stem);
        expected_name.push(".pdf");
        let expected = out_dir.join(expected_name);

        let mut command = base_command(&self.program, &self.extra_args);
        command
            .arg("--headless")
            .arg("--invisible")
            .arg("--nologo")
            .arg("--nodefault")
            .arg("--norestore")
            .arg("--nolockcheck")
            .arg(format!("-env:UserInstallation={}", file_url(self.profile_path()?)))
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(spreadsheet)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(spreadsheet = %spreadsheet.display(), out_dir = %out_dir.display(), "exporting spreadsheet");

        let output = match timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(CombineError::Timeout {
                    path: spreadsheet.display().to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) => {
                return Err(CombineError::HostUnavailable {
                    program: self.program.display().to_string(),
                    message: e.to_string(),
                })
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return Err(conversion_error(format!(
                "office application exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // soffice can exit 0 without writing anything, e.g. for a corrupt workbook.
        if !expected.is_file() {
            return Err(conversion_error(format!(
                "office application produced no PDF at {}{}",
                expected.display(),
                describe_stderr(&output.stderr)
            )));
        }

        self.exports += 1;
        Ok(expected)
    }

    async fn close(&mut self) {
        if let Some(profile) = self.profile.take() {
            let path = profile.path().display().to_string();
            if let Err(e) = profile.close() {
                warn!(profile = %path, error = %e, "failed to remove office profile");
            }
            info!(exports = self.exports, "office session closed");
        }
    }
}

fn base_command(program: &Path, extra_args: &[String]) -> Command {
    let mut command = Command::new(program);
    command.args(extra_args);
    command
}

fn describe_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        String::new()
    } else {
        format!(": {}", text)
    }
}

/// `file://` URL for a local directory, as LibreOffice expects for
/// `-env:UserInstallation`.
fn file_url(path: &Path) -> String {
    let path = path
        .to_string_lossy()
        .replace('\\', "/")
        .replace('%', "%25")
        .replace(' ', "%20");

    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}
