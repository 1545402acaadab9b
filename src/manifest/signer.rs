//! Post-write hook for manifests.

use crate::error::{Result, ResultExt as _};
use std::path::Path;
use std::process::{Child, Command};
use std::thread;

/// Called once after a manifest has been persisted.
///
/// Failures are logged by the writer and never undo the write.
pub trait ManifestSigner: Send + Sync {
    fn sign(&self, manifest: &Path) -> Result<()>;
}

impl<F> ManifestSigner for F
where
    F: Fn(&Path) -> Result<()> + Send + Sync,
{
    fn sign(&self, manifest: &Path) -> Result<()> {
        self(manifest)
    }
}

/// Runs an external program with the manifest path as its final argument.
///
/// The program is spawned directly, never through a shell. Signing is
/// fire-and-forget: [`ManifestSigner::sign`] returns once the program has
/// started, and its exit status is only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSigner {
    program: String,
    args: Vec<String>,
}

impl CommandSigner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build from an argv list; `None` when it is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).with_args(args.iter().cloned()))
    }

    /// Split a command line on whitespace. No quoting is interpreted.
    pub fn parse(command: &str) -> Option<Self> {
        let argv: Vec<String> = command.split_whitespace().map(str::to_owned).collect();
        Self::from_argv(&argv)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Start the program on `manifest` without waiting for it.
    pub fn spawn(&self, manifest: &Path) -> Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(manifest)
            .spawn()
            .with_context(|| format!("Failed to run signing command '{}'", self.program))
    }
}

impl ManifestSigner for CommandSigner {
    fn sign(&self, manifest: &Path) -> Result<()> {
        let mut child = self.spawn(manifest)?;
        tracing::info!(
            "Started signing {} with '{}'",
            manifest.display(),
            self.program
        );

        // Reap in the background so the run never waits on the signer.
        let program = self.program.clone();
        let manifest = manifest.display().to_string();
        thread::spawn(move || match child.wait() {
            Ok(status) if status.success() => {
                tracing::debug!("Signing command '{program}' finished for {manifest}");
            }
            Ok(status) => {
                tracing::warn!("Signing command '{program}' exited with {status} for {manifest}");
            }
            Err(e) => tracing::warn!("Failed to wait for signing command '{program}': {e}"),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let signer = CommandSigner::parse("gpg --detach-sign  --armor").unwrap();
        assert_eq!(signer.program(), "gpg");
        assert_eq!(signer, CommandSigner::new("gpg").with_args(["--detach-sign", "--armor"]));

        assert!(CommandSigner::parse("   ").is_none());
        assert!(CommandSigner::from_argv(&[]).is_none());
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let signer = CommandSigner::new("datacert-no-such-signing-program");
        assert!(signer.sign(Path::new("manifest.json")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_not_verified() {
        assert!(CommandSigner::new("true").sign(Path::new("m.json")).is_ok());
        assert!(CommandSigner::new("false").sign(Path::new("m.json")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_manifest_path_is_final_argument() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let manifest = temp_dir.path().join("integrity.manifest.1.json");
        std::fs::write(&manifest, "{}").unwrap();

        // `sh -c` binds the first trailing argument to $0.
        let signer = CommandSigner::new("sh").with_args(["-c", "cp \"$0\" \"$0.sig\""]);
        let status = signer.spawn(&manifest).unwrap().wait().unwrap();

        assert!(status.success());
        assert!(temp_dir.path().join("integrity.manifest.1.json.sig").is_file());
    }
}
