use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use marketscope::commands;
use marketscope::config::{Overrides, API_URL_ENV, OUTPUT_DIR_ENV, TIMEOUT_ENV};
use marketscope::types::ResearchType;

#[derive(Parser)]
#[command(name = "marketscope")]
#[command(about = "Market research from the terminal.

Submit a topic, watch the analysis being written, and open the finished report.")]
#[command(version)]
struct Cli {
  /// Base URL of the research backend
  #[arg(long, global = true, env = API_URL_ENV)]
  api_url: Option<String>,

  /// HTTP timeout in seconds
  #[arg(long, global = true, env = TIMEOUT_ENV)]
  timeout: Option<u64>,

  /// Show debug output and the session's error log
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Where reports go
#[derive(Args, Clone, Default)]
struct ReportArgs {
  /// Download the report without opening it
  #[arg(long)]
  no_open: bool,

  /// Directory to save reports in
  #[arg(long, env = OUTPUT_DIR_ENV)]
  output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
  /// Submit a new analysis and follow it until the report is ready
  Analyze {
    /// Market topic to research
    topic: Option<String>,
    /// Analysis type (see `marketscope types`)
    #[arg(long = "type", short = 't', value_enum)]
    analysis_type: Option<ResearchType>,
    /// Use example topic N (see `marketscope topics`)
    #[arg(long, short = 'e', conflicts_with = "topic")]
    example: Option<usize>,
    #[command(flatten)]
    report: ReportArgs,
  },
  /// Show an existing analysis: live progress, report or failure
  Show {
    /// Analysis identifier
    id: String,
    #[command(flatten)]
    report: ReportArgs,
  },
  /// Start a research run straight from a prompt
  Research {
    /// What to research
    prompt: String,
    /// Report type to fetch when the run finishes
    #[arg(long = "type", short = 't', value_enum, default_value = "market-research")]
    analysis_type: ResearchType,
    #[command(flatten)]
    report: ReportArgs,
  },
  /// List example topics
  Topics,
  /// List analysis types
  Types,
  /// Check the backend is reachable
  Status,
}

fn init_tracing(verbose: bool) {
  let filter = match std::env::var("RUST_LOG") {
    Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
    _ if verbose => EnvFilter::new("marketscope=debug,warn"),
    _ => EnvFilter::new("error"),
  };

  let _ = tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
    .with(filter)
    .try_init();
}

fn overrides(cli: &Cli, report: &ReportArgs) -> Overrides {
  Overrides {
    api_url: cli.api_url.clone(),
    timeout_secs: cli.timeout,
    output_dir: report.output_dir.clone(),
    no_open: report.no_open,
  }
}

/// With --verbose, list what went wrong during the run
fn replay_session_errors() {
  let errors = bentley::event_log::session().recent(None, Some(bentley::Level::Error));
  if errors.is_empty() {
    return;
  }
  bentley::verbose!("{} error(s) this session:", errors.len());
  for entry in errors.iter().rev() {
    bentley::verbose!(
      "  {} [{}] {}",
      entry.timestamp.format("%H:%M:%S"),
      entry.component,
      entry.message
    );
  }
}

async fn run(cli: Cli) -> Result<i32> {
  match &cli.command {
    Commands::Analyze { topic, analysis_type, example, report } => {
      let settings = commands::settings(overrides(&cli, report))?;
      commands::analyze::execute(settings, topic.as_deref(), *analysis_type, *example).await
    }
    Commands::Show { id, report } => {
      let settings = commands::settings(overrides(&cli, report))?;
      commands::show::execute(settings, id).await
    }
    Commands::Research { prompt, analysis_type, report } => {
      let settings = commands::settings(overrides(&cli, report))?;
      commands::research::execute(settings, prompt, *analysis_type).await
    }
    Commands::Topics => {
      commands::topics::execute();
      Ok(0)
    }
    Commands::Types => {
      commands::types::execute();
      Ok(0)
    }
    Commands::Status => {
      let settings = commands::settings(overrides(&cli, &ReportArgs::default()))?;
      commands::status::execute(settings).await
    }
  }
}

#[tokio::main]
async fn main() {
  let cli = Cli::parse();
  bentley::set_verbose(cli.verbose);
  init_tracing(cli.verbose);

  let code = match run(cli).await {
    Ok(code) => code,
    Err(err) => {
      bentley::error!("{:#}", err);
      1
    }
  };

  if bentley::is_verbose() {
    replay_session_errors();
  }
  process::exit(code);
}
