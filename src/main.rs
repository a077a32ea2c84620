use go_installer::cli;
use go_installer::output::Output;

fn main() {
    let args = cli::parse_args();

    if let Err(err) = cli::run(args.settings()) {
        Output::default().report(&err);
        std::process::exit(1);
    }
}
