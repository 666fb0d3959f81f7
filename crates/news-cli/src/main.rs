use anyhow::Context;
use chrono::Datelike;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use news_core::{ExecutionOutcome, Observability, VERSION};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod chat;
mod config;
mod render;
mod telemetry;

use chat::{export_target, ChatSession};
use config::AppConfig;
use telemetry::{BoxedLayer, Telemetry};

const LOG_ENV: &str = "NEWS_CREW_LOG";

fn cli() -> Command {
    Command::new("ai-news-crew")
        .version(VERSION)
        .about("AI News Crew - research any topic with a two-agent crew")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML configuration file (default: $NEWS_CREW_CONFIG)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .conflicts_with("quiet")
                .help("Enable debug logging"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only log errors"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Log output format"),
        )
        .subcommand(Command::new("chat").about("Interactive research session (default)"))
        .subcommand(
            Command::new("research")
                .about("Research a single topic and print the report")
                .arg(Arg::new("topic").required(true).help("Research topic"))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Also save the report to this file or directory"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a topic without running the crew")
                .arg(Arg::new("topic").required(true).help("Research topic")),
        )
        .subcommand(Command::new("config").about("Print the effective configuration"))
}

fn log_filter(quiet: bool, verbose: bool) -> EnvFilter {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level))
}

/// stderr logging under `filter`, plus the exporter layer with its own filter
fn subscriber(
    filter: EnvFilter,
    json: bool,
    telemetry: Option<BoxedLayer>,
) -> impl tracing::Subscriber + Send + Sync {
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let fmt: BoxedLayer = if json {
        fmt.json().with_filter(filter).boxed()
    } else {
        fmt.with_filter(filter).boxed()
    };

    let mut layers = vec![fmt];
    layers.extend(telemetry);
    tracing_subscriber::registry().with(layers)
}

fn init_tracing(filter: EnvFilter, json: bool, telemetry: Option<BoxedLayer>) -> anyhow::Result<()> {
    subscriber(filter, json, telemetry)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    match run(&matches) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    let config_path = matches.get_one::<PathBuf>("config");
    let config = AppConfig::load(config_path.map(PathBuf::as_path))
        .context("failed to load configuration")?;

    let telemetry = match matches.subcommand() {
        None | Some(("chat" | "research", _)) => Telemetry::init(&config.telemetry),
        _ => Telemetry::disabled("not used by this command"),
    };
    init_tracing(
        log_filter(matches.get_flag("quiet"), matches.get_flag("verbose")),
        matches.get_one::<String>("log-format").is_some_and(|f| f == "json"),
        telemetry.layer(),
    )?;
    tracing::debug!(
        backend = config.crew.kind(),
        observability = %telemetry.observability().status(),
        "configuration loaded"
    );

    // The exporter's HTTP client must not be created or dropped on a runtime thread
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(dispatch(matches, &config, telemetry.observability()));
    drop(runtime);
    telemetry.shutdown();
    result
}

async fn dispatch(
    matches: &ArgMatches,
    config: &AppConfig,
    observability: Arc<dyn Observability>,
) -> anyhow::Result<ExitCode> {
    match matches.subcommand() {
        None | Some(("chat", _)) => chat(config, observability).await,
        Some(("research", args)) => {
            let topic = args.get_one::<String>("topic").map_or("", String::as_str);
            research(config, observability, topic, args.get_one::<PathBuf>("output")).await
        }
        Some(("validate", args)) => {
            let topic = args.get_one::<String>("topic").map_or("", String::as_str);
            validate(config, topic)
        }
        Some(("config", _)) => {
            print!("{}", config.to_toml().context("failed to render configuration")?);
            Ok(ExitCode::SUCCESS)
        }
        Some((other, _)) => anyhow::bail!("unknown command: {other}"),
    }
}

async fn chat(config: &AppConfig, observability: Arc<dyn Observability>) -> anyhow::Result<ExitCode> {
    let mut pipeline = config
        .build_pipeline(observability)
        .context("invalid configuration")?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let styled = stdout.is_terminal();
    ChatSession::new()
        .with_styling(styled)
        .run(&mut pipeline, stdin, &mut stdout, current_year())
        .await?;
    Ok(ExitCode::SUCCESS)
}

async fn research(
    config: &AppConfig,
    observability: Arc<dyn Observability>,
    topic: &str,
    output: Option<&PathBuf>,
) -> anyhow::Result<ExitCode> {
    let mut pipeline = config
        .build_pipeline(observability)
        .context("invalid configuration")?;

    eprintln!("{}", render::RESEARCHING);
    let outcome = pipeline.submit(topic, current_year()).await;

    match &outcome {
        ExecutionOutcome::Success(report) => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", report.as_markdown())?;

            if let Some(output) = output {
                let export = report.export(&pipeline.session_id());
                let target = export_target(Some(output), &export.file_name);
                std::fs::write(&target, &export.bytes)
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("💾 Saved report to {}", target.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        ExecutionOutcome::Failure(failure) => {
            render::outcome(&mut std::io::stderr(), &outcome)?;
            Ok(if failure.category.is_execution_failure() {
                ExitCode::FAILURE
            } else {
                ExitCode::from(2)
            })
        }
    }
}

fn validate(config: &AppConfig, topic: &str) -> anyhow::Result<ExitCode> {
    config.topic.check().context("invalid topic rules")?;
    let result = news_core::Topic::parse(topic, &config.topic);
    render::validation(&mut std::io::stdout(), &result)?;
    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use news_core::{SessionId, SessionMetadata, TelemetryConfig, Topic, TopicRules};

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["ai-news-crew", "research", "Quantum computing", "-v", "--log-format", "json"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
        assert_eq!(matches.get_one::<String>("log-format").map(String::as_str), Some("json"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "research");
        assert_eq!(args.get_one::<String>("topic").map(String::as_str), Some("Quantum computing"));
    }

    #[test]
    fn no_subcommand_means_chat() {
        let matches = cli().try_get_matches_from(["ai-news-crew"]).unwrap();
        assert!(matches.subcommand().is_none());
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(cli().try_get_matches_from(["ai-news-crew", "-v", "-q"]).is_err());
    }

    #[test]
    fn session_span_is_recorded_at_default_log_level() {
        let telemetry = Telemetry::init(&TelemetryConfig::default());
        let observability = telemetry.observability();
        assert!(observability.status().is_active());

        let topic = Topic::parse("Quantum computing", &TopicRules::default()).unwrap();
        let metadata = SessionMetadata::new(SessionId::new(), topic, true);
        let subscriber = subscriber(EnvFilter::new("warn"), false, telemetry.layer());
        tracing::subscriber::with_default(subscriber, || {
            let span = observability.session_span(&metadata);
            assert!(!span.is_disabled());
        });
        telemetry.shutdown();
    }

    #[test]
    fn disabled_observability_adds_no_span() {
        let telemetry = Telemetry::init(&TelemetryConfig::disabled());
        let observability = telemetry.observability();

        let topic = Topic::parse("Quantum computing", &TopicRules::default()).unwrap();
        let metadata = SessionMetadata::new(SessionId::new(), topic, false);
        let subscriber = subscriber(EnvFilter::new("warn"), false, telemetry.layer());
        tracing::subscriber::with_default(subscriber, || {
            assert!(observability.session_span(&metadata).is_disabled());
        });
    }

    #[test]
    fn validate_exit_codes() {
        let config = AppConfig::default();
        assert_eq!(validate(&config, "Quantum computing").unwrap(), ExitCode::SUCCESS);
        assert_eq!(validate(&config, "AI").unwrap(), ExitCode::from(2));
    }
}
