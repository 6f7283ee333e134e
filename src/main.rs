//! llmpipeline: run the agent teams and analysis tools from the terminal.
//!
//!   llmpipeline real-estate --city Austin --state TX --max-price 450000
//!   llmpipeline finance --income 5200 --expense Housing=1600 --debt "Card:3000:21:90"
//!   llmpipeline versions ./repo
//!   llmpipeline prioritize issues.json --limit 10
//!   llmpipeline docs ./repo
//!   slack-events | llmpipeline bridge --workers 4
//!
//! App commands need an LLM key (see `Config`); `--dry-run` runs them offline.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::json;

use llmpipeline::analysis::{self, PriorityWeights};
use llmpipeline::apps::debt::Debt;
use llmpipeline::apps::{financial_coach, real_estate, FinancialCoach, RealEstateTeam};
use llmpipeline::bridge::{ChatBridge, HttpTaskBackend, SessionStore, SlackSink, TaskPoller};
use llmpipeline::criteria::{FinancialProfile, PropertySearch};
use llmpipeline::errors::ApiError;
use llmpipeline::fetch::{DataFetcher, ExaSearcher, FirecrawlExtractor, StaticFetcher};
use llmpipeline::progress::{ProgressEvent, ProgressReporter};
use llmpipeline::render::render_markdown;
use llmpipeline::{ChatClient, ChatModel, ChatRequest, Config, PipelineResult};

#[derive(Parser)]
#[command(name = "llmpipeline", version, about = "Sequential LLM agent pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search listings and get a market analysis and valuation
    RealEstate(RealEstateArgs),
    /// Budget, savings and debt payoff coaching
    Finance(FinanceArgs),
    /// Report conflicting and unpinned versions in requirements files
    Versions {
        root: PathBuf,
    },
    /// Rank issues from a JSON file
    Prioritize {
        issues: PathBuf,
        /// Only print the top N issues
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Check READMEs against the files they mention
    Docs {
        root: PathBuf,
    },
    /// Relay chat events (JSON lines on stdin) to the task backend
    Bridge(BridgeArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    Firecrawl,
    Exa,
}

#[derive(Args)]
struct RealEstateArgs {
    #[arg(long)]
    city: String,
    /// State code, e.g. TX
    #[arg(long)]
    state: String,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    /// e.g. "single family", "condo"
    #[arg(long)]
    property_type: Option<String>,
    #[arg(long)]
    bedrooms: Option<u32>,
    #[arg(long)]
    bathrooms: Option<u32>,
    /// Wanted feature; repeat for several
    #[arg(long = "feature")]
    features: Vec<String>,
    #[arg(long, value_enum, default_value = "firecrawl")]
    source: Source,
    /// Use canned listings and an echo model instead of live APIs
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct FinanceArgs {
    /// Monthly take-home income
    #[arg(long)]
    income: f64,
    #[arg(long, default_value_t = 0)]
    dependants: u32,
    /// Monthly expense as CATEGORY=AMOUNT; repeat for several
    #[arg(long = "expense", value_parser = parse_expense)]
    expenses: Vec<(String, f64)>,
    /// Debt as NAME:BALANCE:APR:MINIMUM; repeat for several
    #[arg(long = "debt", value_parser = parse_debt)]
    debts: Vec<Debt>,
    /// Monthly amount available on top of minimum payments
    #[arg(long, default_value_t = 0.0)]
    extra_payment: f64,
    /// Use an echo model instead of a live API
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct BridgeArgs {
    /// Messages handled at the same time
    #[arg(long, default_value_t = 4)]
    workers: usize,
    /// Seconds between task status checks
    #[arg(long, default_value_t = 2)]
    poll_interval: u64,
    /// Status checks before giving up on a task
    #[arg(long, default_value_t = 150)]
    max_polls: u32,
}

fn parse_expense(raw: &str) -> Result<(String, f64), String> {
    let (category, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=AMOUNT, got '{}'", raw))?;
    let amount = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount in '{}'", raw))?;
    Ok((category.trim().to_string(), amount))
}

fn parse_debt(raw: &str) -> Result<Debt, String> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    let [name, balance, rate, minimum] = parts.as_slice() else {
        return Err(format!("expected NAME:BALANCE:APR:MINIMUM, got '{}'", raw));
    };
    let number = |value: &str| {
        value
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{}' in '{}'", value, raw))
    };
    Ok(Debt::new(*name, number(*balance)?, number(*rate)?, number(*minimum)?))
}

/// Progress bar over the pipeline's stages.
struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for BarReporter {
    fn on_stage_start(&self, index: usize, total: usize, stage: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(index as u64);
        self.bar.set_message(format!("{}...", stage));
    }

    fn on_stage_complete(&self, index: usize, total: usize, stage: &str, elapsed: Duration) {
        self.bar.set_position((index + 1) as u64);
        let event = ProgressEvent::Completed {
            index,
            total,
            stage: stage.to_string(),
            elapsed,
        };
        self.bar.println(event.describe());
    }

    fn on_stage_failed(&self, index: usize, total: usize, stage: &str, error: &str) {
        let event = ProgressEvent::Failed {
            index,
            total,
            stage: stage.to_string(),
            error: error.to_string(),
        };
        self.bar.println(event.describe());
    }
}

/// Offline stand-in for a chat model: answers with the prompt it was given.
struct EchoModel;

#[async_trait]
impl ChatModel for EchoModel {
    async fn complete(&self, request: ChatRequest) -> Result<String, ApiError> {
        Ok(format!("(dry run) Prompt received:\n\n{}", request.prompt))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

fn sample_listings(city: &str, state: &str) -> StaticFetcher {
    StaticFetcher::from_json(
        &json!([
            {
                "address": format!("101 Sample St, {}, {}", city, state),
                "price": "$385,000",
                "bedrooms": 3,
                "bathrooms": 2,
                "square_feet": 1650,
                "property_type": "Single family"
            },
            {
                "address": format!("22 Example Ave, {}, {}", city, state),
                "price": "$420,000",
                "bedrooms": 4,
                "description": "Corner lot with a pool"
            }
        ]),
        None,
    )
}

fn live_model(config: &Config) -> PipelineResult<Arc<dyn ChatModel>> {
    let client = ChatClient::from_config(config)?;
    tracing::info!(provider = %client.provider(), model = %client.model_name(), "Using model");
    Ok(Arc::new(client))
}

async fn real_estate_command(args: RealEstateArgs) -> PipelineResult<String> {
    let (model, fetcher): (Arc<dyn ChatModel>, Arc<dyn DataFetcher>) = if args.dry_run {
        (
            Arc::new(EchoModel),
            Arc::new(sample_listings(&args.city, &args.state)),
        )
    } else {
        let config = Config::from_env()?;
        let fetcher: Arc<dyn DataFetcher> = match args.source {
            Source::Firecrawl => Arc::new(FirecrawlExtractor::new(
                config.firecrawl_key()?,
                config.http_timeout,
            )?),
            Source::Exa => Arc::new(ExaSearcher::new(config.exa_key()?, config.http_timeout)?),
        };
        (live_model(&config)?, fetcher)
    };

    let criteria = PropertySearch {
        city: args.city,
        state: args.state,
        min_price: args.min_price,
        max_price: args.max_price,
        property_type: args.property_type,
        bedrooms: args.bedrooms,
        bathrooms: args.bathrooms,
        special_features: args.features,
    }
    .into();

    let progress = BarReporter::new();
    let result = RealEstateTeam::new(model, fetcher).run(criteria, &progress).await;
    progress.finish();

    Ok(render_markdown(&real_estate::report(&result?)))
}

async fn finance_command(args: FinanceArgs) -> PipelineResult<String> {
    let model: Arc<dyn ChatModel> = if args.dry_run {
        Arc::new(EchoModel)
    } else {
        live_model(&Config::from_env()?)?
    };

    let profile = FinancialProfile {
        monthly_income: args.income,
        dependants: args.dependants,
        expenses: args.expenses,
        debts: args.debts,
        extra_debt_payment: args.extra_payment,
    };

    let progress = BarReporter::new();
    let result = FinancialCoach::new(model).run(&profile, &progress).await;
    progress.finish();

    Ok(render_markdown(&financial_coach::report(&result?, &profile)))
}

async fn bridge_command(args: BridgeArgs) -> PipelineResult<String> {
    let config = Config::from_env()?;
    let store = Arc::new(SessionStore::open(&config.session_db_path)?);
    let backend = Arc::new(HttpTaskBackend::new(config.backend_url()?, config.http_timeout)?);
    let sink = Arc::new(SlackSink::new(config.slack_token()?, config.http_timeout)?);

    let poller = TaskPoller::new(Duration::from_secs(args.poll_interval.max(1)), args.max_polls);
    let stop = poller.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping task polls");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let bridge = Arc::new(ChatBridge::new(store, backend, sink, poller, args.workers));
    tracing::info!(
        workers = args.workers,
        sessions = %config.session_db_path.display(),
        "Reading chat events from stdin"
    );
    let summary = bridge.serve(tokio::io::BufReader::new(tokio::io::stdin())).await?;
    pretty(&summary)
}

fn pretty<T: Serialize>(value: &T) -> PipelineResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

async fn run(cli: Cli) -> PipelineResult<String> {
    match cli.command {
        Command::RealEstate(args) => real_estate_command(args).await,
        Command::Finance(args) => finance_command(args).await,
        Command::Versions { root } => pretty(&analysis::hunt_versions(&root)?),
        Command::Prioritize { issues, limit } => {
            let issues = analysis::load_issues(&analysis::read_file(&issues)?)?;
            let mut ranked = analysis::prioritize(issues, &PriorityWeights::default());
            if let Some(limit) = limit {
                ranked.truncate(limit);
            }
            pretty(&ranked)
        }
        Command::Docs { root } => pretty(&analysis::check_docs(&root)?),
        Command::Bridge(args) => bridge_command(args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llmpipeline=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = ?err, "Command failed");
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}
