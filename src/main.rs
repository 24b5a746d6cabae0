use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use research_finder::aggregator::{Aggregator, RunSummary};
use research_finder::config::{
    find_config_file, load_config, validate_config, Config, ConfigReport, LogFormat,
};
use research_finder::models::{Query, Record, SearchType};
use research_finder::sources::{available_sources, SourceRegistry};
use research_finder::ui::{self, SearchProgress, Status};
use research_finder::utils::CacheService;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code for invalid configuration or arguments
const EXIT_CONFIG_ERROR: u8 = 2;

/// Exit code when every selected source failed
const EXIT_ALL_FAILED: u8 = 1;

/// Research Finder - Search academic article providers and merge the results
#[derive(Parser, Debug)]
#[command(name = "research-finder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "hongkongkiwi")]
#[command(about = "Search academic article providers and merge the results", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress progress and non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Disable caching for this command
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table on a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self, is_terminal: bool) -> Self {
        match self {
            OutputFormat::Auto if is_terminal => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

/// Field the query is matched against
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SearchField {
    Keyword,
    Title,
    Author,
}

impl From<SearchField> for SearchType {
    fn from(field: SearchField) -> Self {
        match field {
            SearchField::Keyword => SearchType::Keyword,
            SearchField::Title => SearchType::Title,
            SearchField::Author => SearchType::Author,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search every enabled source and print unique records
    #[command(alias = "s")]
    Search {
        /// Search text
        query: String,

        /// Field to search
        #[arg(long = "type", short = 't', value_enum, default_value_t = SearchField::Keyword)]
        search_type: SearchField,

        /// Maximum results per source (default from config)
        #[arg(long, short)]
        limit: Option<usize>,

        /// Sources to query, in order (comma-separated ids; default: all enabled)
        #[arg(long, short, value_delimiter = ',')]
        source: Vec<String>,

        /// Earliest publication year
        #[arg(long)]
        year_min: Option<u16>,

        /// Latest publication year
        #[arg(long)]
        year_max: Option<u16>,

        /// Minimum citation count
        #[arg(long)]
        min_citations: Option<u32>,

        /// Number of sources fetched at the same time (default from config)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print records as they arrive instead of after the run
        #[arg(long)]
        stream: bool,
    },

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// List compiled-in sources and their configuration
    #[command(alias = "ls")]
    Sources,

    /// Inspect or create configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Remove every cache entry
    Clear,
    /// Remove expired and unreadable entries
    ClearExpired,
    /// Show cache statistics
    Stats,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write a starter configuration file
    Init {
        /// Target path (default: <config dir>/research-finder/config.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check the configuration and report problems
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(
            shell,
            &mut Cli::command(),
            "research-finder",
            &mut std::io::stdout(),
        );
        return ExitCode::SUCCESS;
    }

    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&Config::default(), cli.verbose, cli.quiet);
            ui::print_status(Status::Error, &format!("{:#}", e));
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    if let Some(timeout) = cli.timeout {
        config.http.timeout_seconds = timeout;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    init_tracing(&config, cli.verbose, cli.quiet);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            ui::print_status(Status::Error, &format!("{:#}", e));
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over flags and config.
fn init_tracing(config: &Config, verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => config.logging.level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("research_finder={}", level)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(cli: Cli, config: Config) -> Result<ExitCode> {
    let format = cli.output.resolve(ui::is_terminal());

    match cli.command {
        Commands::Search {
            query,
            search_type,
            limit,
            source,
            year_min,
            year_max,
            min_citations,
            concurrency,
            stream,
        } => {
            let report = validate_config(&config);
            if !report.is_ok() {
                print_report(&report);
                return Ok(ExitCode::from(EXIT_CONFIG_ERROR));
            }

            let mut query = Query::new(query)
                .search_type(search_type.into())
                .limit(limit.unwrap_or(config.search.default_limit))
                .years(year_min, year_max);
            if let Some(min) = min_citations {
                query = query.min_citations(min);
            }
            query.validate()?;

            let options = SearchOptions {
                concurrency: concurrency.unwrap_or(config.search.concurrency),
                stream,
                format,
                quiet: cli.quiet,
            };
            run_search(&config, &query, &source, options).await
        }

        Commands::Cache { action } => {
            let cache = CacheService::from_config(&config.cache);
            match action {
                CacheCommand::Clear => {
                    let removed = cache.clear().context("failed to clear cache")?;
                    ui::print_status(Status::Success, &format!("Removed {} cache entries", removed));
                }
                CacheCommand::ClearExpired => {
                    let removed = cache
                        .clear_expired()
                        .context("failed to clear expired cache entries")?;
                    ui::print_status(
                        Status::Success,
                        &format!("Removed {} expired cache entries", removed),
                    );
                }
                CacheCommand::Stats => {
                    let stats = cache.stats();
                    if format == OutputFormat::Json {
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    } else {
                        println!("{}", ui::cache_stats_table(&stats));
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Sources => {
            print_sources(&config, format)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Config { action } => match action {
            ConfigCommand::Show => {
                let shown = masked(&config);
                if format == OutputFormat::Json {
                    println!("{}", serde_json::to_string_pretty(&shown)?);
                } else {
                    print!("{}", shown.to_toml()?);
                }
                Ok(ExitCode::SUCCESS)
            }
            ConfigCommand::Init { path, force } => {
                let path = match path {
                    Some(path) => path,
                    None => dirs::config_dir()
                        .map(|dir| dir.join("research-finder").join("config.toml"))
                        .context("no platform config directory; pass a path")?,
                };
                if path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                Config::default().save(&path)?;
                ui::print_status(
                    Status::Success,
                    &format!("Wrote configuration to {}", path.display()),
                );
                Ok(ExitCode::SUCCESS)
            }
            ConfigCommand::Validate => {
                let report = validate_config(&config);
                if format == OutputFormat::Json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print_report(&report);
                    if report.is_ok() {
                        ui::print_status(Status::Success, "Configuration is valid");
                    }
                }
                Ok(if report.is_ok() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(EXIT_CONFIG_ERROR)
                })
            }
        },

        // Handled before configuration is loaded
        Commands::Completions { .. } => Ok(ExitCode::SUCCESS),
    }
}

#[derive(Debug, Clone, Copy)]
struct SearchOptions {
    concurrency: usize,
    stream: bool,
    format: OutputFormat,
    quiet: bool,
}

async fn run_search(
    config: &Config,
    query: &Query,
    selected: &[String],
    options: SearchOptions,
) -> Result<ExitCode> {
    let registry = SourceRegistry::from_config(config)?;
    let sources = if selected.is_empty() {
        registry.all().cloned().collect()
    } else {
        registry.select(selected)?
    };
    if sources.is_empty() {
        anyhow::bail!("no sources are enabled");
    }

    let progress = if options.quiet || !ui::is_stderr_terminal() {
        SearchProgress::hidden()
    } else {
        SearchProgress::new(sources.len())
    };
    let observer = progress.clone();

    let aggregator = Aggregator::new(CacheService::from_config(&config.cache))
        .with_sources(sources)
        .with_concurrency(options.concurrency)
        .with_request_timeout(config.http.timeout())
        .with_observer(move |event| observer.handle(event));

    let mut records = Vec::new();
    let mut stream = aggregator.stream(query)?;
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            next = stream.next() => match next {
                Some(record) if options.stream => print_streamed(&record, options.format)?,
                Some(record) => records.push(record),
                None => break,
            },
            _ = &mut interrupt => {
                progress.finish();
                ui::print_status(Status::Warning, "Interrupted; stopping search");
                break;
            }
        }
    }
    // Dropping the stream cancels the run if it was interrupted
    drop(stream);

    let summary = aggregator.summary();
    if !options.stream {
        print_records(&records, &summary, options.format)?;
    }
    if !options.quiet && !(options.format == OutputFormat::Json && !options.stream) {
        for line in ui::summary_lines(&summary) {
            eprintln!("{}", line);
        }
    }

    Ok(if summary.all_failed() {
        ExitCode::from(EXIT_ALL_FAILED)
    } else {
        ExitCode::SUCCESS
    })
}

/// Print one record as soon as it is produced
fn print_streamed(record: &Record, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(record)?),
        _ => println!("{}\n", ui::record_plain(record)),
    }
    Ok(())
}

fn print_records(records: &[Record], summary: &RunSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "records": records,
                "summary": summary,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for record in records {
                println!("{}\n", ui::record_plain(record));
            }
        }
        OutputFormat::Table | OutputFormat::Auto => {
            if records.is_empty() {
                ui::print_status(Status::Info, "No records found");
            } else {
                println!("{}", ui::records_table(records, ui::terminal_width()));
            }
        }
    }
    Ok(())
}

fn print_report(report: &ConfigReport) {
    for error in &report.errors {
        ui::print_status(Status::Error, error);
    }
    for warning in &report.warnings {
        ui::print_status(Status::Warning, warning);
    }
}

fn print_sources(config: &Config, format: OutputFormat) -> Result<()> {
    let descriptors = available_sources();

    if format == OutputFormat::Json {
        let rows: Vec<_> = descriptors
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "name": d.name,
                    "enabled": d.is_enabled(&config.search),
                    "credential": d.credential,
                    "credential_configured": d.has_credential(&config.credentials),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_header(vec!["", "ID", "Name", "Enabled", "Credential"]);

    for d in &descriptors {
        let credential = match d.credential {
            Some(var) if d.has_credential(&config.credentials) => format!("{} (set)", var),
            Some(var) => format!("{} (not set)", var),
            None => "-".to_string(),
        };
        table.add_row(vec![
            ui::source_icon(d.id).to_string(),
            d.id.to_string(),
            d.name.to_string(),
            if d.is_enabled(&config.search) { "yes" } else { "no" }.to_string(),
            credential,
        ]);
    }

    ui::print_section("Sources");
    println!("{table}");
    Ok(())
}

/// Copy of the configuration with secrets hidden
fn masked(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.credentials.semantic_scholar_api_key.is_some() {
        shown.credentials.semantic_scholar_api_key = Some("********".to_string());
    }
    if shown.credentials.pubmed_api_key.is_some() {
        shown.credentials.pubmed_api_key = Some("********".to_string());
    }
    shown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["research-finder", "search", "graph neural networks"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(cli.timeout.is_none());
        assert!(!cli.no_cache);

        match cli.command {
            Commands::Search {
                query,
                search_type,
                limit,
                source,
                stream,
                ..
            } => {
                assert_eq!(query, "graph neural networks");
                assert_eq!(search_type, SearchField::Keyword);
                assert!(limit.is_none());
                assert!(source.is_empty());
                assert!(!stream);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_search_arguments() {
        let cli = Cli::parse_from([
            "research-finder",
            "-vv",
            "search",
            "attention",
            "--type",
            "title",
            "-l",
            "5",
            "--source",
            "arxiv,openalex",
            "--year-min",
            "2017",
            "--min-citations",
            "10",
            "-o",
            "json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);

        match cli.command {
            Commands::Search {
                search_type,
                limit,
                source,
                year_min,
                year_max,
                min_citations,
                ..
            } => {
                assert_eq!(SearchType::from(search_type), SearchType::Title);
                assert_eq!(limit, Some(5));
                assert_eq!(source, vec!["arxiv", "openalex"]);
                assert_eq!(year_min, Some(2017));
                assert_eq!(year_max, None);
                assert_eq!(min_citations, Some(10));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_subcommands() {
        let cli = Cli::parse_from(["research-finder", "cache", "clear-expired"]);
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheCommand::ClearExpired
            }
        ));

        let cli = Cli::parse_from(["research-finder", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommand::Init { path: None, force: true }
            }
        ));

        let cli = Cli::parse_from(["research-finder", "ls"]);
        assert!(matches!(cli.command, Commands::Sources));

        assert!(Cli::try_parse_from(["research-finder"]).is_err());
    }

    #[test]
    fn test_output_format_resolution() {
        assert_eq!(OutputFormat::Auto.resolve(true), OutputFormat::Table);
        assert_eq!(OutputFormat::Auto.resolve(false), OutputFormat::Json);
        assert_eq!(OutputFormat::Plain.resolve(true), OutputFormat::Plain);
    }

    #[test]
    fn test_masked_hides_api_key() {
        let mut config = Config::default();
        config.credentials.semantic_scholar_api_key = Some("secret".into());
        config.credentials.openalex_email = Some("me@example.org".into());
        config.credentials.pubmed_api_key = Some("ncbi-secret".into());

        let shown = masked(&config);
        assert_eq!(
            shown.credentials.semantic_scholar_api_key.as_deref(),
            Some("********")
        );
        assert_eq!(shown.credentials.openalex_email.as_deref(), Some("me@example.org"));
        assert_eq!(shown.credentials.pubmed_api_key.as_deref(), Some("********"));
        assert!(!shown.to_toml().unwrap().contains("secret"));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
