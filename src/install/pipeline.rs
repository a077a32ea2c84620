//! The six-step install pipeline.
//!
//! Steps run strictly in order with no retries. Any failure aborts the run;
//! the only other way out is the "already up to date" early finish after
//! step 2. The scratch directory is released when the run state drops, on
//! every path.

use crate::archive::tar::extract_tar_gz;
use crate::config::{Endpoints, Environment, InstallLayout};
use crate::crypto::{ChecksumPresence, verify_against_page};
use crate::download::Transport;
use crate::error::InstallerError;
use crate::install::local::detect_existing;
use crate::install::scratch::{ScratchDir, ScratchRegistry};
use crate::models::{InstallOutcome, RemoteVersionInfo, Step};
use crate::output::Output;
use crate::platform::{Arch, archive_file_name};
use crate::shell::{ProfileAction, Shell, configure_profile};
use crate::version::{diff, normalize_tag, staleness_message, to_ordinal};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything a single install run needs, passed in explicitly
#[derive(Debug, Clone)]
pub struct InstallRequest<'a> {
    pub env: &'a Environment,
    pub endpoints: &'a Endpoints,
    /// Machine architecture name, normally `std::env::consts::ARCH`
    pub machine: &'a str,
}

enum StepFlow {
    Continue,
    Finish(InstallOutcome),
}

/// State accumulated across steps
struct Run<'a, T: Transport> {
    transport: &'a T,
    request: &'a InstallRequest<'a>,
    output: &'a Output,
    registry: &'a ScratchRegistry,
    layout: InstallLayout,
    remote: Option<RemoteVersionInfo>,
    scratch: Option<ScratchDir>,
    archive: Option<(PathBuf, String)>,
    reload_instruction: Option<String>,
}

/// Run all six steps against `transport`
pub fn run_install<T: Transport>(
    transport: &T,
    request: &InstallRequest<'_>,
    output: &Output,
    registry: &ScratchRegistry,
) -> Result<InstallOutcome> {
    let mut run = Run {
        transport,
        request,
        output,
        registry,
        layout: request.env.layout(),
        remote: None,
        scratch: None,
        archive: None,
        reload_instruction: None,
    };

    for step in Step::ALL {
        output.step(step.number(), Step::ALL.len(), step.description());
        debug!(%step, "starting step");

        match run.execute(step)? {
            StepFlow::Continue => {}
            StepFlow::Finish(outcome) => return Ok(outcome),
        }
    }

    let version = run.remote()?.version.clone();
    Ok(InstallOutcome::Installed {
        version,
        reload_instruction: run.reload_instruction.take(),
    })
}

impl<T: Transport> Run<'_, T> {
    fn execute(&mut self, step: Step) -> Result<StepFlow> {
        match step {
            Step::DiscoverRemote => self.discover_remote(),
            Step::DetectExisting => self.detect_existing(),
            Step::Download => self.download(),
            Step::Verify => self.verify(),
            Step::Extract => self.extract(),
            Step::Configure => self.configure(),
        }
    }

    fn remote(&self) -> Result<&RemoteVersionInfo> {
        self.remote
            .as_ref()
            .context("latest version was not resolved before it was needed")
    }

    fn archive(&self) -> Result<(&Path, &str)> {
        self.archive
            .as_ref()
            .map(|(path, name)| (path.as_path(), name.as_str()))
            .context("archive was not downloaded before it was needed")
    }

    /// Probe first, then transfer
    fn fetch_text(&self, url: &str) -> Result<String> {
        self.transport
            .probe(url)
            .with_context(|| format!("Connectivity check failed for {url}"))?;
        self.transport
            .fetch_text(url)
            .with_context(|| format!("Failed to fetch {url}"))
    }

    fn discover_remote(&mut self) -> Result<StepFlow> {
        let url = self.request.endpoints.version_url();
        let body = self.fetch_text(&url)?;

        let tag = body
            .split_whitespace()
            .next()
            .ok_or_else(|| InstallerError::MalformedVersion {
                input: body.clone(),
                reason: "version manifest is empty".to_string(),
            })?
            .to_string();
        let version = normalize_tag(&tag)
            .with_context(|| format!("Unexpected version manifest from {url}"))?;
        to_ordinal(&version)?;

        info!(%tag, %version, "latest release");
        self.output.status("Latest", &format!("go {version}"));
        self.remote = Some(RemoteVersionInfo { tag, version });
        Ok(StepFlow::Continue)
    }

    fn detect_existing(&mut self) -> Result<StepFlow> {
        let remote = self.remote()?.version.clone();

        let Some(local) = detect_existing(self.request.env, &self.layout) else {
            self.output.info("No existing installation found");
            return Ok(StepFlow::Continue);
        };

        if !local.canonical {
            self.output.warn(&format!(
                "found {} outside the managed location {}; it may shadow the new install on PATH",
                local.binary.display(),
                self.layout.binary.display()
            ));
        }

        let Some(installed) = local.version else {
            self.output.warn(&format!(
                "could not read the version of {}; reinstalling",
                local.binary.display()
            ));
            return Ok(StepFlow::Continue);
        };

        let local_ordinal = match to_ordinal(&installed) {
            Ok(ordinal) => ordinal,
            Err(e) => {
                self.output
                    .warn(&format!("cannot compare installed version: {e}"));
                return Ok(StepFlow::Continue);
            }
        };

        match diff(&installed, &remote)? {
            0 => {
                self.output.success(&format!(
                    "go {installed} is already the latest version, nothing to do"
                ));
                return Ok(StepFlow::Finish(InstallOutcome::UpToDate { version: installed }));
            }
            distance if local_ordinal < to_ordinal(&remote)? => {
                self.output.info(&format!(
                    "Installed go {installed} is {} than go {remote}",
                    staleness_message(distance)
                ));
            }
            _ => {
                self.output.info(&format!(
                    "Installed go {installed} differs from the latest release go {remote}"
                ));
            }
        }

        Ok(StepFlow::Continue)
    }

    fn download(&mut self) -> Result<StepFlow> {
        let tag = self.remote()?.tag.clone();
        let arch = Arch::from_machine(self.request.machine)?;
        let file_name = archive_file_name(&tag, arch);
        let url = self.request.endpoints.archive_url(&file_name);

        let scratch = self.registry.create(&self.request.env.tmpdir)?;
        let dest = scratch.path().join(&file_name);
        self.scratch = Some(scratch);

        self.transport
            .probe(&url)
            .with_context(|| format!("Connectivity check failed for {url}"))?;
        let bytes = self
            .transport
            .download(&url, &dest)
            .with_context(|| format!("Failed to download {url}"))?;

        self.output
            .status("Downloaded", &format!("{file_name} ({bytes} bytes)"));
        self.archive = Some((dest, file_name));
        Ok(StepFlow::Continue)
    }

    fn verify(&mut self) -> Result<StepFlow> {
        let url = self.request.endpoints.checksum_page_url();
        let page = self.fetch_text(&url)?;
        let (archive, file_name) = self.archive()?;

        let verification = verify_against_page(archive, file_name, &page)
            .with_context(|| format!("Checksum verification failed against {url}"))?;

        self.output
            .detail(&format!("SHA-256: {}", verification.pair.sha256));
        self.output
            .detail(&format!("SHA-512: {}", verification.pair.sha512));

        if verification.presence == ChecksumPresence::Sha512Only {
            self.output.warn(
                "only the SHA-512 digest was found on the checksum page; SHA-256 was expected",
            );
            self.output.status("Verified", "SHA-512 checksum matches");
        } else {
            self.output.status("Verified", "SHA-256 checksum matches");
        }

        Ok(StepFlow::Continue)
    }

    fn extract(&mut self) -> Result<StepFlow> {
        let install_dir = self.layout.install_dir.clone();
        let (archive, _) = self.archive()?;

        prepare_install_dir(&install_dir)?;

        let entries = extract_tar_gz(archive, &install_dir, 1)
            .with_context(|| format!("Failed to install into {}", install_dir.display()))?;

        self.output.status(
            "Installed",
            &format!("{entries} entries into {}", install_dir.display()),
        );
        Ok(StepFlow::Continue)
    }

    fn configure(&mut self) -> Result<StepFlow> {
        let env = self.request.env;
        let shell = Shell::detect(env.shell.as_deref());
        let outcome = configure_profile(shell, &self.layout.install_dir, &env.home)
            .context("Failed to update shell profile")?;

        let profile = outcome.profile.display();
        match outcome.action {
            ProfileAction::Unchanged => {
                self.output
                    .status("Profile", &format!("{profile} already configured"));
            }
            ProfileAction::AppendedBoth => {
                self.output
                    .status("Profile", &format!("added GOROOT and PATH to {profile}"));
            }
            ProfileAction::InsertedPath => {
                self.output
                    .status("Profile", &format!("added PATH entry to {profile}"));
            }
            ProfileAction::InsertedRoot => {
                self.output
                    .status("Profile", &format!("added GOROOT entry to {profile}"));
            }
        }

        if outcome.action != ProfileAction::Unchanged {
            self.reload_instruction = Some(outcome.reload_instruction);
        }
        Ok(StepFlow::Continue)
    }
}

/// Clear out any previous install and make sure the parent exists.
/// Every install is a clean replace.
fn prepare_install_dir(install_dir: &Path) -> Result<(), InstallerError> {
    if install_dir.exists() {
        if !install_dir.is_dir() {
            return Err(InstallerError::filesystem(
                format!("{} exists and is not a directory", install_dir.display()),
                std::io::Error::from(std::io::ErrorKind::AlreadyExists),
            ));
        }

        let non_empty = fs::read_dir(install_dir)
            .map_err(|e| {
                InstallerError::filesystem(
                    format!("Failed to read {}", install_dir.display()),
                    e,
                )
            })?
            .next()
            .is_some();

        if non_empty {
            debug!(dir = %install_dir.display(), "removing previous installation");
            fs::remove_dir_all(install_dir).map_err(|e| {
                InstallerError::filesystem(
                    format!("Failed to remove previous install: {}", install_dir.display()),
                    e,
                )
            })?;
        }
    }

    if let Some(parent) = install_dir.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            InstallerError::filesystem(format!("Failed to create {}", parent.display()), e)
        })?;
    }

    Ok(())
}
