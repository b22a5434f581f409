use std::{io, process::ExitCode, rc::Rc};

use async_two_ways::{run, Console, Style};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// stdout carries the program's output, so diagnostics go to stderr and stay
// quiet unless RUST_LOG asks for more.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    match run(Rc::new(Console::stdout()), Style::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "program failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
