use console::{StyledObject, style};
use std::fmt::Display;
use tracing_subscriber::EnvFilter;

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Self::Verbose,
            (false, true) => Self::Quiet,
            (false, false) => Self::Normal,
        }
    }
}

fn label<D: Display>(text: D) -> StyledObject<D> {
    style(text).green().bold()
}

/// Output handler shared by the pipeline and the uninstall routine
#[derive(Debug, Clone, Default)]
pub struct Output {
    verbosity: Verbosity,
}

impl Output {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Print a right-aligned status label followed by a message
    pub fn status(&self, action: &str, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            println!("{:>12} {}", label(action), message);
        }
    }

    /// Print a numbered pipeline step header
    pub fn step(&self, index: usize, total: usize, description: &str) {
        if self.verbosity >= Verbosity::Normal {
            println!(
                "{} {}",
                style(format!("[{index}/{total}]")).cyan().bold(),
                description
            );
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            println!("{message}");
        }
    }

    /// Only shown with --verbose
    pub fn detail(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            println!("{}", style(message).dim());
        }
    }

    pub fn success(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            println!("{} {}", style("✓").green(), message);
        }
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{}: {}", style("warning").yellow().bold(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}: {}", style("error").red().bold(), message);
    }

    /// Print an error and its cause chain
    pub fn report(&self, err: &anyhow::Error) {
        self.error(&err.to_string());
        for cause in err.chain().skip(1) {
            eprintln!("  {} {}", style("caused by:").dim(), cause);
        }
    }

    /// Command the user should run, rendered prominently
    pub fn command_hint(&self, prefix: &str, command: &str) {
        if self.verbosity >= Verbosity::Normal {
            println!("{prefix} {}", style(command).cyan().bold());
        }
    }
}

/// Apply NO_COLOR before anything is printed
pub fn configure_colors(no_color: bool) {
    if no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
}

/// Install the stderr tracing subscriber; RUST_LOG takes precedence
pub fn init_tracing(verbosity: Verbosity, no_color: bool) {
    let default_level = match verbosity {
        Verbosity::Verbose => "debug",
        Verbosity::Normal => "warn",
        Verbosity::Quiet => "error",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .try_init();
}
