use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use visit_core::options::parse_options;
use visit_core::report::write_problem_csv;
use visit_core::time_codec;
use visit_core::*;

#[derive(Parser)]
#[command(name = "visitrec")]
#[command(about = "Clinical visit data capture engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a visit schema and list its activities in display order
    Schema {
        /// Schema JSON file (array of activities)
        #[arg(long)]
        schema: PathBuf,

        /// Show the current answer of each activity from this values file
        #[arg(long)]
        values: Option<PathBuf>,
    },

    /// Validate a snapshot of answers against a schema
    Validate {
        #[arg(long)]
        schema: PathBuf,

        /// Answers JSON file
        #[arg(long)]
        values: PathBuf,

        /// Already-evaluated rule results to merge (JSON array)
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Compute medication adherence and detected problems as JSON
    Adherence {
        #[arg(long)]
        schema: PathBuf,

        #[arg(long)]
        values: PathBuf,

        /// Visit date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        visit_date: Option<NaiveDate>,
    },

    /// Write detected problems with reviewer decisions as CSV
    Report {
        #[arg(long)]
        schema: PathBuf,

        #[arg(long)]
        values: PathBuf,

        /// Reviewer decisions JSON file
        #[arg(long)]
        reviews: Option<PathBuf>,

        #[arg(long)]
        visit_date: Option<NaiveDate>,
    },

    /// Parse `value|label` lines from stdin into select options
    Options,

    /// Time-of-day helpers
    Time {
        #[command(subcommand)]
        action: TimeAction,
    },
}

#[derive(Subcommand)]
enum TimeAction {
    /// Truncate a stored time to HH:MM
    Normalize { time: String },

    /// Format raw keystrokes as HH:MM
    Format { raw: String },

    /// Shift a time by minutes, wrapping around midnight
    Add {
        time: String,

        #[arg(long, allow_hyphen_values = true)]
        minutes: i64,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    visit_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::debug!(
        "Adherence bands: low {} / expected {}",
        config.adherence.low_threshold,
        config.adherence.expected_threshold
    );

    match cli.command {
        Commands::Schema { schema, values } => cmd_schema(&schema, values.as_deref(), &config),
        Commands::Validate {
            schema,
            values,
            rules,
        } => cmd_validate(&schema, &values, rules.as_deref(), &config),
        Commands::Adherence {
            schema,
            values,
            visit_date,
        } => cmd_adherence(&schema, &values, visit_date, &config),
        Commands::Report {
            schema,
            values,
            reviews,
            visit_date,
        } => cmd_report(&schema, &values, reviews.as_deref(), visit_date, &config),
        Commands::Options => cmd_options(),
        Commands::Time { action } => cmd_time(action),
    }
}

/// Load a schema, refusing to work with one that has structural problems
fn load_checked_schema(path: &Path) -> Result<Vec<Activity>> {
    let activities = load_schema(path)?;
    let errors = check_schema(&activities);
    if !errors.is_empty() {
        eprintln!("Schema validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Schema("Invalid schema".into()));
    }
    Ok(activities)
}

fn load_rules(path: Option<&Path>) -> Result<Vec<ValidationError>> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        }
        None => Ok(Vec::new()),
    }
}

fn evaluate(
    schema: &Path,
    values: &Path,
    visit_date: Option<NaiveDate>,
    config: &Config,
) -> Result<VisitReport> {
    let activities = load_checked_schema(schema)?;
    let values = FormValues::load_from(values)?;
    let detector = ProblemDetector::new(config.adherence.clone());

    let report = match visit_date {
        Some(date) => evaluate_visit(&activities, &values, &[], &date, &detector),
        None => evaluate_visit(&activities, &values, &[], &SystemClock, &detector),
    };
    Ok(report)
}

fn cmd_schema(schema: &Path, values: Option<&Path>, config: &Config) -> Result<()> {
    let activities = load_checked_schema(schema)?;
    let values = match values {
        Some(path) => Some(FormValues::load_from(path)?),
        None => None,
    };
    let placeholder = &config.display.empty_placeholder;

    for activity in sort_activities(&activities) {
        let marker = if activity.required { "*" } else { " " };
        let repeat = if activity.allow_multiple {
            format!(" x{}", activity.repetition_slots())
        } else {
            String::new()
        };
        let answer = match &values {
            Some(values) => {
                // Formulas are evaluated by the form, not here
                let shown = calculated::display_value(activity, values, None, placeholder)
                    .unwrap_or_else(|| values.value_or_default(activity).to_string());
                format!(" = {}", shown)
            }
            None => String::new(),
        };
        println!(
            "{:>4} {} {:<20} {}{}{}",
            activity.order,
            marker,
            activity.field_type(),
            activity.name,
            repeat,
            answer
        );
    }

    Ok(())
}

fn cmd_validate(
    schema: &Path,
    values: &Path,
    rules: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let activities = load_checked_schema(schema)?;
    let values = FormValues::load_from(values)?;
    let external = load_rules(rules)?;

    let errors = validation::evaluate(&activities, &values, &external);

    if errors.is_empty() {
        println!("✓ All required answers present");
        return Ok(());
    }

    for error in &errors {
        let tag = match error.rule.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        println!(
            "{:<7} {} [{}]: {}",
            tag, error.activity_name, error.field_key, error.rule.message
        );
    }
    println!("{} issue(s)", errors.len());

    let warnings_block = config.validation.warnings_block_submission;
    if validation::blocks_submission(&errors, warnings_block) {
        return Err(Error::Other("Submission blocked".into()));
    }
    Ok(())
}

fn cmd_adherence(
    schema: &Path,
    values: &Path,
    visit_date: Option<NaiveDate>,
    config: &Config,
) -> Result<()> {
    let report = evaluate(schema, values, visit_date, config)?;
    println!("{}", serde_json::to_string_pretty(&report.medications)?);
    Ok(())
}

fn cmd_report(
    schema: &Path,
    values: &Path,
    reviews: Option<&Path>,
    visit_date: Option<NaiveDate>,
    config: &Config,
) -> Result<()> {
    let report = evaluate(schema, values, visit_date, config)?;
    let reviews = match reviews {
        Some(path) => ReviewLog::load_from(path)?,
        None => ReviewLog::new(),
    };

    let count = write_problem_csv(&report, &reviews, io::stdout().lock())?;
    eprintln!("{} problem(s) written", count);
    Ok(())
}

fn cmd_options() -> Result<()> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;

    let options = parse_options(&text);
    println!("{}", serde_json::to_string_pretty(&options)?);
    Ok(())
}

fn cmd_time(action: TimeAction) -> Result<()> {
    let output = match action {
        TimeAction::Normalize { time } => time_codec::normalize(&time),
        TimeAction::Format { raw } => time_codec::format_while_typing(&raw),
        TimeAction::Add { time, minutes } => {
            let shifted = time_codec::add_minutes(&time_codec::normalize(&time), minutes);
            if shifted.is_empty() {
                return Err(Error::Other(format!("Invalid time: {}", time)));
            }
            shifted
        }
    };
    println!("{}", output);
    Ok(())
}
