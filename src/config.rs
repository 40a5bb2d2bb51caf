use crate::cli::{Args, ColorChoice};
use crate::interpreter::{Interpreter, DEFAULT_LIB_DIR};
use crate::keywords::{ConfigError, KeywordTable};
use std::path::PathBuf;

/// Settings shared by script and REPL mode, collected from the command line.
pub struct AppConfig {
    pub color_enabled: bool,
    pub verbose: bool,
    pub keywords_path: Option<PathBuf>,
    pub lib_dir: PathBuf,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Self {
        let color_enabled = match args.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => atty::is(atty::Stream::Stderr) && atty::is(atty::Stream::Stdout),
        };

        AppConfig {
            color_enabled,
            verbose: args.verbose,
            keywords_path: args.keywords.clone(),
            lib_dir: args
                .lib_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LIB_DIR)),
        }
    }

    pub fn keyword_table(&self) -> Result<KeywordTable, ConfigError> {
        KeywordTable::resolve(self.keywords_path.as_deref())
    }

    /// A fresh interpreter wired to this configuration.
    pub fn interpreter(&self) -> Result<Interpreter, ConfigError> {
        Ok(Interpreter::with_keywords(self.keyword_table()?).with_lib_dir(self.lib_dir.clone()))
    }
}

/// Installs a stderr `tracing` subscriber.
///
/// `RUST_LOG` always wins; otherwise `--verbose` turns on debug output for
/// this crate and nothing is installed without it.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("k2sphere=debug"),
        Err(_) => return,
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
        .with(filter)
        .try_init();
}
