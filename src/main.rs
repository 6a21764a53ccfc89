// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error};

use crate::app_config::{Config, LogLevel, TranslationProvider};
use crate::app_controller::Controller;

mod app_config;
mod app_controller;
mod catalog;
mod engine;
mod errors;
mod language_utils;
mod placeholder;
mod providers;
mod retry;
mod storage;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "deepl")]
    DeepL,
    #[value(name = "google")]
    Google,
    #[value(name = "deepseek")]
    DeepSeek,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::DeepL => TranslationProvider::DeepL,
            CliTranslationProvider::Google => TranslationProvider::Google,
            CliTranslationProvider::DeepSeek => TranslationProvider::DeepSeek,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate untranslated entries of a PO catalog (default command)
    #[command(alias = "tr")]
    Translate(TranslateArgs),

    /// Generate shell completions for traduki
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input PO catalog to translate
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Output path; defaults to <input>_<lang>.po next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Translation backend to use
    #[arg(short, long, value_enum, default_value = "deepl")]
    provider: CliTranslationProvider,

    /// Target language code (e.g. 'es', 'fr', 'pt_BR')
    #[arg(short, long, default_value = "es")]
    target_lang: String,

    /// DeepL API key
    #[arg(long, env = "DEEPL_API_KEY", hide_env_values = true)]
    deepl_api_key: Option<String>,

    /// Google Cloud API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_api_key: Option<String>,

    /// DeepSeek API key
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    deepseek_api_key: Option<String>,

    /// Custom endpoint override for the selected backend
    #[arg(long, default_value = "")]
    endpoint: String,

    /// Entries per batch request; 1 disables batching
    #[arg(short, long, default_value_t = 1)]
    batch_size: usize,

    /// Parallel workers; cannot be combined with batching
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Delay between backend requests, in seconds
    #[arg(long, default_value_t = 0.5)]
    delay: f64,

    /// Disable the persistent translation cache
    #[arg(long)]
    no_cache: bool,

    /// Resume from the last checkpoint for this output path
    #[arg(short, long)]
    resume: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
#[command(
    name = "traduki",
    about = "Translate PO catalogs through DeepL, Google or DeepSeek",
    version
)]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color code for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let color = Self::color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {}\x1B[0m", color, now, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after parsing arguments if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "traduki", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

/// Assemble the configuration and run the translate command
async fn run_translate(args: TranslateArgs) -> Result<()> {
    if let Some(level) = &args.log_level {
        let log_level: LogLevel = level.clone().into();
        // Just update the max level without reinitializing the logger
        log::set_max_level(log_level.to_level_filter());
    }

    let provider: TranslationProvider = args.provider.into();

    let api_key = match provider {
        TranslationProvider::DeepL => args.deepl_api_key,
        TranslationProvider::Google => args.google_api_key,
        TranslationProvider::DeepSeek => args.deepseek_api_key,
    }
    .unwrap_or_default();

    if api_key.is_empty() {
        error!(
            "No API key for {}; set {} or pass the matching flag",
            provider.display_name(),
            provider.credential_var()
        );
        std::process::exit(1);
    }

    let config = Config {
        provider,
        target_language: args.target_lang.clone(),
        api_key,
        endpoint: args.endpoint,
        batch_size: args.batch_size,
        workers: args.workers,
        inter_request_delay_secs: args.delay,
        cache_enabled: !args.no_cache,
        resume: args.resume,
        storage_path: None,
        log_level: args.log_level.map(Into::into).unwrap_or_default(),
    };

    let output = args
        .output
        .unwrap_or_else(|| Controller::default_output_path(&args.input_file, &args.target_lang));

    let controller = Controller::with_config(config);
    let summary = controller.run(&args.input_file, &output).await?;

    if summary.failed > 0 {
        error!(
            "{} of {} units failed and were kept untranslated",
            summary.failed, summary.total
        );
    }

    Ok(())
}
