use crate::config::{Environment, FileConfig, Settings};
use crate::download::HttpTransport;
use crate::install::{
    InstallRequest, ScratchRegistry, exit_on_interrupt, prompt_confirmation, run_install,
    run_uninstall, stdin_is_interactive,
};
use crate::models::{InstallOutcome, UninstallOutcome};
use crate::output::{Output, Verbosity, configure_colors, init_tracing};
use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::debug;

/// Install or remove the latest Go toolchain under $HOME/.go
#[derive(Parser, Debug)]
#[command(name = "go-installer", version = env!("GO_INSTALLER_VERSION"), about, long_about = None)]
pub struct Args {
    /// Remove the installed toolchain instead of installing
    #[arg(short, long, visible_alias = "remove")]
    pub uninstall: bool,
    /// Show digests and diagnostic logging
    #[arg(short, long)]
    pub verbose: bool,
    /// Only print warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    pub assume_yes: bool,
}

impl Args {
    pub fn settings(&self) -> Settings {
        Settings {
            verbose: self.verbose,
            quiet: self.quiet,
            assume_yes: self.assume_yes,
            uninstall: self.uninstall,
        }
    }
}

/// Parse the command line.
///
/// Help and version output exit 0; every other parse error prints usage and
/// exits 1.
pub fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    }
}

/// Main CLI entry point
pub fn run(settings: Settings) -> Result<()> {
    let env = Environment::from_process()?;
    configure_colors(env.no_color);

    let verbosity = Verbosity::from_flags(settings.verbose, settings.quiet);
    init_tracing(verbosity, env.no_color);
    let output = Output::new(verbosity);

    let registry = ScratchRegistry::new();
    exit_on_interrupt(registry.clone())?;

    if settings.uninstall {
        uninstall(&env, settings, &output)
    } else {
        install(&env, &registry, &output)
    }
}

fn install(env: &Environment, registry: &ScratchRegistry, output: &Output) -> Result<()> {
    let config = match FileConfig::default_path() {
        Some(path) => FileConfig::load(&path)?,
        None => FileConfig::default(),
    };
    let endpoints = config.endpoints();
    debug!(origin = %endpoints.origin, "using download origin");

    let transport = HttpTransport::new(&endpoints.user_agent);
    let request = InstallRequest {
        env,
        endpoints: &endpoints,
        machine: std::env::consts::ARCH,
    };

    match run_install(&transport, &request, output, registry)? {
        InstallOutcome::UpToDate { .. } => {}
        InstallOutcome::Installed {
            version,
            reload_instruction,
        } => {
            output.success(&format!(
                "go {version} installed to {}",
                env.layout().install_dir.display()
            ));
            if let Some(command) = reload_instruction {
                output.command_hint("To use it in this shell, run:", &command);
            }
        }
    }

    Ok(())
}

fn uninstall(env: &Environment, settings: Settings, output: &Output) -> Result<()> {
    let outcome = run_uninstall(
        env,
        settings.assume_yes,
        stdin_is_interactive(),
        output,
        &mut prompt_confirmation,
    )?;

    match outcome {
        UninstallOutcome::Removed { .. } => output.success("go toolchain removed"),
        UninstallOutcome::NotInstalled { .. } | UninstallOutcome::Aborted => {}
    }

    Ok(())
}
