use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use concord::config::{Config, ConfigOverrides};
use concord::models::{Frame, Score, Scorecard};
use concord::services::{
    AnalysisService, CostAnalyzer, CostRequest, DataClient, DatasetBuilder, DatasetRequest,
    FeedbackFinder, FindRequest, GraphQlClient, GroupBy, ScorecardFanOut, build_cost_report,
    default_group_by, empty_search_message, resolve_score, resolve_scorecard,
};
use concord::utils::{
    ApiResult, OutputFormat, TimeWindow, error_document, read_frame_csv, render, write_frame_csv,
};

#[derive(Parser, Debug)]
#[command(name = "concord")]
#[command(version, about = "Concord - Feedback Alignment Analytics")]
struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<String>,

    /// Account id (overrides config file)
    #[arg(long, value_name = "ID", global = true)]
    account: Option<String>,

    /// Data API endpoint URL (overrides config file)
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Data API key (overrides config file)
    #[arg(long, value_name = "KEY", global = true)]
    api_key: Option<String>,

    /// Logging level (overrides config file, e.g., "info,concord=debug")
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Output format: json or yaml
    #[arg(long, value_name = "FORMAT", global = true, default_value = "json")]
    format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize agreement between AI predictions and reviewer corrections
    Summary {
        /// Scorecard identifier (id, external id, key, or name) or "all"
        #[arg(long)]
        scorecard: String,
        /// Score identifier within the scorecard; omit to cover every score
        #[arg(long)]
        score: Option<String>,
        /// Days back to analyze (default: 14)
        #[arg(long)]
        days: Option<i64>,
        /// Start date (YYYY-MM-DD or ISO-8601); overrides --days
        #[arg(long)]
        start_date: Option<String>,
        /// End date (YYYY-MM-DD or ISO-8601)
        #[arg(long)]
        end_date: Option<String>,
        /// Fan-out width for "all" mode (1-16)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Search individual feedback items, edit-commented items first
    Find {
        #[arg(long)]
        scorecard: String,
        #[arg(long)]
        score: String,
        /// Filter by the original AI prediction value
        #[arg(long)]
        initial_value: Option<String>,
        /// Filter by the corrected reviewer value
        #[arg(long)]
        final_value: Option<String>,
        /// Maximum number of items to return
        #[arg(long)]
        limit: Option<usize>,
        /// Days back to search (default: 30)
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        /// Disable edit-comment prioritization when limiting
        #[arg(long)]
        no_prioritize: bool,
    },

    /// Build a training dataset by stratified confusion-cell sampling
    Dataset {
        #[arg(long)]
        scorecard: String,
        #[arg(long)]
        score: String,
        /// Days back to include (omit for all time)
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        /// Maximum total rows
        #[arg(long)]
        limit: Option<usize>,
        /// Maximum rows per confusion matrix cell
        #[arg(long)]
        limit_per_cell: Option<usize>,
        #[arg(long)]
        initial_value: Option<String>,
        #[arg(long)]
        final_value: Option<String>,
        /// Restrict the dataset to one specific feedback record
        #[arg(long)]
        feedback_id: Option<String>,
        /// Refresh values for the row set already stored in --output
        #[arg(long)]
        reload: bool,
        /// CSV file to write (and to read in reload mode)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Rename a score column: "Score Name=New Column"
        #[arg(long = "column-mapping", value_name = "FROM=TO")]
        column_mappings: Vec<String>,
    },

    /// Aggregate prediction costs from score results
    Costs {
        /// Scorecard identifier, or "all" for every scorecard
        #[arg(long)]
        scorecard: Option<String>,
        #[arg(long)]
        score: Option<String>,
        /// Window in hours (default: 1); ignored when --days is set
        #[arg(long)]
        hours: Option<i64>,
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        /// Grouping: scorecard, score, or scorecard_score
        #[arg(long)]
        group_by: Option<String>,
        /// Output mode: summary (default) or detail
        #[arg(long, default_value = "summary")]
        mode: String,
        /// Include per-group rows in summary mode
        #[arg(long)]
        breakdown: bool,
        /// Maximum cost-bearing results to load
        #[arg(long)]
        limit: Option<usize>,
        /// Fan-out width for "all" mode (1-16)
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

const SUMMARY_HEADER: &str = "Feedback Analysis Report Output\n\
\n\
This is the structured output from a feedback analysis process that:\n\
1. Retrieves feedback items from scorecards within a specified time range\n\
2. Analyzes agreement between initial and final answer values using Gwet's AC1 coefficient\n\
3. Provides statistical measures of inter-rater reliability and agreement\n\
4. Generates insights about feedback quality and consistency across evaluators\n\
\n\
The output contains agreement scores, statistical measures, detailed breakdowns,\n\
and analytical insights for understanding feedback consistency and reliability.";

const ALL_SCORECARDS_HEADER: &str = "All Scorecards Feedback Analysis Report\n\
\n\
This report analyzes every scorecard in the account that has feedback data,\n\
running full feedback analysis on each one and ranking them by overall AC1\n\
(agreement coefficient).\n\
\n\
Scorecards with no feedback data in the specified time period are automatically\n\
filtered out to keep the report focused and manageable.\n\
\n\
Scorecards are sorted from best to worst performing (by AC1).";

const COSTS_HEADER: &str = "Cost Analysis Report Output\n\
\n\
Aggregated prediction cost metrics over score results: headline totals,\n\
five-number summaries, and optional per-scorecard or per-score breakdowns.\n\
All monetary values are fixed-decimal, serialized as strings.";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format: OutputFormat = match cli.format.parse() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        },
    };

    let overrides = ConfigOverrides {
        config_path: cli.config.clone(),
        account_id: cli.account.clone(),
        api_url: cli.api_url.clone(),
        api_key: cli.api_key.clone(),
        log_level: cli.log_level.clone(),
    };

    let config = match Config::load(&overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        },
    };

    init_tracing(&config);
    tracing::info!("Concord starting up");

    let client: Arc<dyn DataClient> = Arc::new(GraphQlClient::new(
        &config.api.url,
        &config.api.key,
        config.api.timeout_secs,
    ));

    match run(cli.command, &config, client, format).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            tracing::error!("{}", e);
            let doc = error_document(&e.to_string());
            let rendered = render(&doc, format, None)
                .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", e));
            println!("{}", rendered);
            std::process::exit(1);
        },
    }
}

/// Tracing setup: env-filter level from config, console layer on stderr,
/// optional daily-rolling file layer.
fn init_tracing(config: &Config) {
    let log_filter = tracing_subscriber::EnvFilter::new(&config.logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    if let Some(log_file) = &config.logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
        let file_name = log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("concord.log");
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Keep the appender guard alive for the process lifetime
        Box::leak(Box::new(guard));
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(
    command: Command,
    config: &Config,
    client: Arc<dyn DataClient>,
    format: OutputFormat,
) -> ApiResult<String> {
    let account_id = config.api.account_id.clone();

    match command {
        Command::Summary { scorecard, score, days, start_date, end_date, concurrency } => {
            let window = TimeWindow::resolve(
                days,
                None,
                start_date.as_deref(),
                end_date.as_deref(),
                config.analysis.summary_days,
            )?;

            if scorecard.eq_ignore_ascii_case("all") {
                let fanout = ScorecardFanOut::new(client);
                let result = fanout
                    .feedback_all_scorecards(
                        &account_id,
                        &window,
                        concurrency.or(Some(config.analysis.feedback_concurrency)),
                    )
                    .await?;
                return render(&result, format, Some(ALL_SCORECARDS_HEADER));
            }

            let resolved = resolve_scorecard(client.as_ref(), &account_id, &scorecard).await?;
            let service = AnalysisService::new(client);
            match score {
                Some(score_ident) => {
                    let score = resolve_score(&resolved, &score_ident)?.clone();
                    let result = service
                        .summarize_score(&account_id, &resolved, &score, &window)
                        .await?;
                    render(&result, format, Some(SUMMARY_HEADER))
                },
                None => {
                    let result = service
                        .summarize_scorecard(&account_id, &resolved, None, &window)
                        .await?;
                    render(&result, format, Some(SUMMARY_HEADER))
                },
            }
        },

        Command::Find {
            scorecard,
            score,
            initial_value,
            final_value,
            limit,
            days,
            start_date,
            end_date,
            no_prioritize,
        } => {
            let window = TimeWindow::resolve(
                days,
                None,
                start_date.as_deref(),
                end_date.as_deref(),
                config.analysis.find_days,
            )?;

            let resolved = resolve_scorecard(client.as_ref(), &account_id, &scorecard).await?;
            let resolved_score = resolve_score(&resolved, &score)?.clone();

            let mut request =
                FindRequest::new(&account_id, &resolved.id, &resolved_score.id, window);
            request.initial_value = initial_value.clone();
            request.final_value = final_value.clone();
            request.limit = limit;
            request.prioritize_edit_comments = !no_prioritize;

            let finder = FeedbackFinder::new(client);
            let result = finder
                .search(resolved.display_name(), resolved_score.display_name(), &request)
                .await?;

            if result.feedback_items.is_empty() {
                let message = empty_search_message(
                    resolved_score.display_name(),
                    resolved.display_name(),
                    initial_value.as_deref(),
                    final_value.as_deref(),
                );
                let doc = serde_json::json!({ "context": result.context, "message": message });
                return render(&doc, format, None);
            }

            render(&result, format, None)
        },

        Command::Dataset {
            scorecard,
            score,
            days,
            start_date,
            end_date,
            limit,
            limit_per_cell,
            initial_value,
            final_value,
            feedback_id,
            reload,
            output,
            column_mappings,
        } => {
            let window = resolve_dataset_window(days, start_date.as_deref(), end_date.as_deref())?;
            let resolved = resolve_scorecard(client.as_ref(), &account_id, &scorecard).await?;
            let resolved_score = resolve_score(&resolved, &score)?.clone();

            let request = DatasetRequest {
                account_id: account_id.clone(),
                scorecard_id: resolved.id.clone(),
                score_id: resolved_score.id.clone(),
                score_name: resolved_score.display_name().to_string(),
                window,
                limit,
                limit_per_cell,
                initial_value,
                final_value,
                feedback_id,
                column_mappings: parse_column_mappings(&column_mappings)?,
            };

            let builder = DatasetBuilder::new(client);
            let frame = if reload {
                let path = output.as_ref().ok_or_else(|| {
                    concord::ApiError::validation("--output is required in reload mode")
                })?;
                let existing = read_frame_csv(path)?;
                builder.reload(&request, existing).await?
            } else {
                builder.build(&request).await?
            };

            if let Some(path) = &output {
                write_frame_csv(&frame, path)?;
                let doc = dataset_receipt(&frame, &resolved, &resolved_score, path);
                render(&doc, format, None)
            } else {
                render(&frame, format, None)
            }
        },

        Command::Costs {
            scorecard,
            score,
            hours,
            days,
            start_date,
            end_date,
            group_by,
            mode,
            breakdown,
            limit,
            concurrency,
        } => {
            // Hours drive the window unless days were requested explicitly
            let effective_hours = match (hours, days) {
                (Some(h), _) => Some(h),
                (None, Some(_)) => None,
                (None, None) => Some(config.costs.hours),
            };
            let window = TimeWindow::resolve(
                days,
                effective_hours,
                start_date.as_deref(),
                end_date.as_deref(),
                config.costs.days,
            )?;
            let explicit_window = start_date.is_some() || end_date.is_some();

            let mut request = CostRequest::new(&account_id);
            request.days = days.unwrap_or(config.costs.days);
            request.hours = effective_hours;
            request.max_items = limit;
            if explicit_window {
                request.window = Some(window.clone());
            }

            if scorecard.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("all")) {
                let fanout = ScorecardFanOut::new(client);
                let result = fanout
                    .costs_all_scorecards(
                        &request,
                        &window,
                        concurrency.or(Some(config.costs.concurrency)),
                    )
                    .await?;
                return render(&result, format, Some(COSTS_HEADER));
            }

            let mut scorecard_name = None;
            if let Some(scorecard_ident) = &scorecard {
                let resolved =
                    resolve_scorecard(client.as_ref(), &account_id, scorecard_ident).await?;
                scorecard_name = Some(resolved.display_name().to_string());
                if let Some(score_ident) = &score {
                    let resolved_score = resolve_score(&resolved, score_ident)?;
                    request.score_id = Some(resolved_score.id.clone());
                }
                request.scorecard_id = Some(resolved.id);
            }

            let group_by: Option<GroupBy> = match group_by.as_deref() {
                Some(raw) => Some(raw.parse()?),
                None => default_group_by(&request, breakdown),
            };

            let analyzer = CostAnalyzer::new(client);
            match mode.trim().to_lowercase().as_str() {
                "detail" => {
                    let analysis = analyzer.analyze(&request, group_by).await?;
                    render(&analysis, format, Some(COSTS_HEADER))
                },
                _ => {
                    let analysis = analyzer.analyze(&request, group_by).await?;
                    let raw = analyzer.list_raw(&request).await?;
                    let report = build_cost_report(
                        &analysis,
                        &raw,
                        scorecard_name,
                        breakdown && group_by.is_some(),
                    );
                    render(&report, format, Some(COSTS_HEADER))
                },
            }
        },
    }
}

/// Dataset windows may be unbounded: with no days and no explicit dates the
/// range covers all time.
fn resolve_dataset_window(
    days: Option<i64>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> ApiResult<TimeWindow> {
    if days.is_none() && start_date.is_none() && end_date.is_none() {
        return Ok(TimeWindow::new(
            chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            chrono::Utc::now(),
        ));
    }
    TimeWindow::resolve(days, None, start_date, end_date, 30)
}

fn parse_column_mappings(raw: &[String]) -> ApiResult<BTreeMap<String, String>> {
    let mut mappings = BTreeMap::new();
    for entry in raw {
        let Some((from, to)) = entry.split_once('=') else {
            return Err(concord::ApiError::validation(format!(
                "invalid column mapping '{}', expected FROM=TO",
                entry
            )));
        };
        mappings.insert(from.trim().to_string(), to.trim().to_string());
    }
    Ok(mappings)
}

fn dataset_receipt(
    frame: &Frame,
    scorecard: &Scorecard,
    score: &Score,
    path: &std::path::Path,
) -> serde_json::Value {
    serde_json::json!({
        "scorecard": scorecard.display_name(),
        "score": score.display_name(),
        "rows": frame.len(),
        "columns": frame.columns,
        "output": path.display().to_string(),
    })
}
