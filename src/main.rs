use clap::Parser;
use k2sphere::cli::{generate_completions, Args, Commands};
use k2sphere::config::{init_tracing, AppConfig};
use k2sphere::diagnostic::render_diagnostics;
use k2sphere::repl::Repl;
use owo_colors::OwoColorize;
use std::io;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(Commands::Complete { shell }) = args.command {
        generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    let config = AppConfig::from_args(&args);
    init_tracing(config.verbose);

    let interpreter = match config.interpreter() {
        Ok(interpreter) => interpreter,
        Err(e) => {
            let rendered = render_diagnostics("", "keywords", &[e.to_diagnostic()], config.color_enabled);
            eprint!("{}", rendered);
            return ExitCode::FAILURE;
        }
    };

    match (&args.command, &args.script) {
        (Some(Commands::Repl), _) => {
            tracing::debug!("starting repl");
            let stdin = io::stdin();
            let mut repl = Repl::new(interpreter, config.color_enabled);
            if let Err(e) = repl.run(stdin.lock(), io::stdout()) {
                error_message(&config, &format!("Error reading input: {}", e));
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        (_, Some(script)) => run_script(interpreter, script, &config),
        // clap's arg_required_else_help covers the empty invocation
        _ => ExitCode::from(2),
    }
}

fn run_script(mut interpreter: k2sphere::Interpreter, path: &Path, config: &AppConfig) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            error_message(config, &format!("Failed to read {}: {}", path.display(), e));
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(script = %path.display(), bytes = source.len(), "running script");

    match interpreter.run_source(&source) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            let file_name = path.display().to_string();
            let rendered = render_diagnostics(&source, &file_name, &[e.to_diagnostic()], config.color_enabled);
            eprint!("{}", rendered);
            ExitCode::FAILURE
        }
    }
}

fn error_message(config: &AppConfig, message: &str) {
    if config.color_enabled {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{}", message);
    }
}
