use chrono::Local;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::process::ExitCode;
use todomd::cli;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let parsed = match cli::parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!("Run 'todomd --help' for usage.");
            return ExitCode::from(2);
        }
    };

    let level = match parsed.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = TermLogger::init(
        level,
        ConfigBuilder::new().set_time_level(LevelFilter::Off).build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    let now = Local::now().naive_local();
    let mut stdout = std::io::stdout().lock();
    match cli::run(&parsed, now, &mut stdout) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
