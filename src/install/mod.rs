pub mod local;
pub mod pipeline;
pub mod scratch;
pub mod uninstall;

pub use pipeline::{InstallRequest, run_install};
pub use scratch::{INTERRUPT_EXIT_CODE, ScratchRegistry, exit_on_interrupt};
pub use uninstall::{prompt_confirmation, run_uninstall, stdin_is_interactive};
