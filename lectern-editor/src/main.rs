use clap::Parser;
use log::debug;
use miette::{IntoDiagnostic, Result, WrapErr};

use lectern_editor::commands::Session;
use lectern_editor::{Cli, VERSION};

fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .format_timestamp(None)
        .init();
    debug!("lectern-editor {}", VERSION);

    let session = Session::new(&args);
    let stdout = std::io::stdout();
    session
        .run(&args.command, &mut stdout.lock())
        .into_diagnostic()
        .wrap_err_with(|| format!("{} failed", args.command.name()))
}
