use std::path::{Path, PathBuf};

use agent_scorecard::models::QualityTier;
use agent_scorecard::{
    analyze, ingest, normalize, report, AgentRecord, AnalysisFilter, AnalyticsConfig, WeekWindow,
};
use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agent-scorecard")]
#[command(about = "Performance analytics for call-center agent exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map an export onto canonical records and print them as JSON
    Normalize {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the full analysis and emit it as JSON
    Analyze {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Rank qualified agents by risk score
    Score {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
#[command(group(
    ArgGroup::new("window")
        .args(["last_weeks", "from"])
        .multiple(false)
))]
struct FilterArgs {
    /// Only include this agent (repeatable)
    #[arg(long = "agent")]
    agents: Vec<String>,
    /// Only include qualified agents in this quality tier (repeatable)
    #[arg(long = "tier")]
    tiers: Vec<String>,
    /// Only include the most recent N weeks
    #[arg(long)]
    last_weeks: Option<usize>,
    /// First week of an inclusive range
    #[arg(long, requires = "to")]
    from: Option<String>,
    /// Last week of an inclusive range
    #[arg(long, requires = "from")]
    to: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> anyhow::Result<AnalysisFilter> {
        let quality_tiers = self
            .tiers
            .iter()
            .map(|tier| tier.parse::<QualityTier>().map_err(anyhow::Error::msg))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let weeks = match (self.last_weeks, self.from, self.to) {
            (Some(count), _, _) => WeekWindow::Last(count),
            (None, Some(from), Some(to)) => WeekWindow::Range { from, to },
            _ => WeekWindow::All,
        };

        Ok(AnalysisFilter {
            agents: self.agents,
            weeks,
            quality_tiers,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|value| value.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_records(input: &Path) -> anyhow::Result<Vec<AgentRecord>> {
    let table = ingest::load_table(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    Ok(normalize(&table.rows, &table.headers))
}

fn write_output(out: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Output written to {}.", path.display());
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize { input, out } => {
            let records = load_records(&input)?;
            let json = serde_json::to_string_pretty(&records)?;
            write_output(out.as_deref(), &json)?;
        }
        Commands::Analyze {
            input,
            filters,
            config,
            out,
        } => {
            let config = AnalyticsConfig::load(config.as_deref()).context("failed to load config")?;
            let records = load_records(&input)?;
            let analysis = analyze(&records, &filters.into_filter()?, &config);
            let json = serde_json::to_string_pretty(&analysis)?;
            write_output(out.as_deref(), &json)?;
        }
        Commands::Score {
            input,
            filters,
            config,
            limit,
        } => {
            let config = AnalyticsConfig::load(config.as_deref()).context("failed to load config")?;
            let records = load_records(&input)?;
            let analysis = analyze(&records, &filters.into_filter()?, &config);

            if analysis.risk_assessments.is_empty() {
                println!("No qualified agents found for this selection.");
                return Ok(());
            }

            let mut ranked: Vec<_> = analysis.risk_assessments.iter().collect();
            ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.agent.cmp(&b.agent)));

            println!("Qualified agents by risk score:");
            for risk in ranked.iter().take(limit.unwrap_or(config.attention_limit)) {
                println!("{}", report::format_risk_line(risk));
            }
        }
        Commands::Report {
            input,
            filters,
            config,
            out,
        } => {
            let config = AnalyticsConfig::load(config.as_deref()).context("failed to load config")?;
            let records = load_records(&input)?;
            let analysis = analyze(&records, &filters.into_filter()?, &config);
            let markdown = report::build_report(&analysis, &input.display().to_string());
            write_output(Some(&out), &markdown)?;
        }
    }

    Ok(())
}
