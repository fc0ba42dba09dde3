//! Command-line entry point.
//!
//! Usage:
//!   failmodes train --train data/bootcamp_train.csv --test data/bootcamp_test.csv
//!   failmodes predict --input new_machines.csv
//!   failmodes evaluate --csv results/submission_long.csv --threshold 0.35
//!   failmodes describe --input data/bootcamp_train.csv

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use failmodes::artifacts::{
    ArtifactPaths, NUMERIC_SUMMARY_FILE, PREDICTIONS_BINARY_FILE, PREDICTIONS_FILE,
    PREDICTIONS_LONG_FILE,
};
use failmodes::dashboard::DashboardSession;
use failmodes::data::describe;
use failmodes::train::run_training;
use failmodes::{Frame, Label, ModelFamily, Profile, SchemaConfig, Threshold, TrainConfig};

#[derive(Parser)]
#[command(name = "failmodes", version, about = "Multi-label machine failure prediction")]
struct Cli {
    /// More output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train, calibrate the threshold and write submissions
    Train(TrainArgs),
    /// Score a CSV with the saved model
    Predict(PredictArgs),
    /// Submit a CSV to the remote evaluation API
    Evaluate(EvaluateArgs),
    /// Summarize the numeric columns of a CSV
    Describe(DescribeArgs),
}

#[derive(Args)]
struct TrainArgs {
    #[arg(long, default_value = "data/bootcamp_train.csv")]
    train: PathBuf,

    #[arg(long, default_value = "data/bootcamp_test.csv")]
    test: PathBuf,

    #[arg(long, value_enum, default_value_t = ModelFamily::Forest)]
    model: ModelFamily,

    #[arg(long, value_enum, default_value_t = Profile::Fast)]
    profile: Profile,

    /// Include the product id as a feature.
    #[arg(long)]
    use_id: bool,

    #[arg(long, default_value = "results")]
    results_dir: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Worker threads, 0 = all cores.
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// TOML file overriding dataset column names.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct PredictArgs {
    #[arg(long)]
    input: PathBuf,

    #[arg(long, default_value = "results")]
    results_dir: PathBuf,

    /// Overrides the saved threshold.
    #[arg(long)]
    threshold: Option<Threshold>,

    /// Where to write the probability tables. Default: the results dir.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args)]
struct EvaluateArgs {
    #[arg(long)]
    csv: PathBuf,

    #[arg(long, default_value = "0.30")]
    threshold: Threshold,

    #[arg(long, env = "BOOTCAMP_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Rename short label columns to long ones before upload.
    #[arg(long)]
    auto_map: bool,

    #[arg(long, default_value = "results/api_metrics_cli.json")]
    save_json: PathBuf,

    #[arg(long)]
    api_base: Option<String>,
}

#[derive(Args)]
struct DescribeArgs {
    #[arg(long)]
    input: PathBuf,

    #[arg(long, default_value_t = format!("results/{NUMERIC_SUMMARY_FILE}"))]
    out: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Train(args) => train(args),
        Command::Predict(args) => predict(args),
        Command::Evaluate(args) => evaluate(args),
        Command::Describe(args) => describe_csv(args),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn train(args: TrainArgs) -> anyhow::Result<()> {
    let schema = match &args.config {
        Some(path) => SchemaConfig::from_toml_file(path)?,
        None => SchemaConfig::default(),
    };
    let config = TrainConfig::builder()
        .family(args.model)
        .profile(args.profile)
        .use_product_id(args.use_id)
        .seed(args.seed)
        .n_threads(args.threads)
        .schema(schema)
        .build()?;

    let paths = ArtifactPaths::new(&args.results_dir);
    let outcome = run_training(&args.train, Some(args.test.as_path()), &config, &paths)
        .with_context(|| format!("training on {}", args.train.display()))?;

    println!(
        "best threshold: {:.2} | macro-F1: {:.4}",
        outcome.calibration.threshold.value(),
        outcome.calibration.macro_f1
    );
    println!("\n=== classification report (validation) ===\n{}", outcome.report);
    println!("artifacts in '{}'", paths.dir().display());
    Ok(())
}

fn predict(args: PredictArgs) -> anyhow::Result<()> {
    let session = DashboardSession::open(ArtifactPaths::new(&args.results_dir))
        .with_context(|| format!("loading model from {}", args.results_dir.display()))?;
    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let result = session.predict_csv(&bytes, args.threshold)?;

    let out_dir = args.out_dir.unwrap_or(args.results_dir);
    std::fs::create_dir_all(&out_dir)?;
    write_bytes(&out_dir.join(PREDICTIONS_FILE), &result.short_csv)?;
    write_bytes(&out_dir.join(PREDICTIONS_LONG_FILE), &result.long_csv)?;
    write_bytes(&out_dir.join(PREDICTIONS_BINARY_FILE), &result.binary_csv)?;

    let threshold = args.threshold.unwrap_or(session.default_threshold());
    println!("rows: {} | threshold: {}", result.predictions.n_rows(), threshold);
    for (label, count) in Label::ALL.iter().zip(result.positive_counts) {
        println!("{:>4}: {count}", label.short_name());
    }
    Ok(())
}

#[cfg(feature = "remote")]
fn evaluate(args: EvaluateArgs) -> anyhow::Result<()> {
    use failmodes::LabelCodec;
    use failmodes::remote::{EvaluationClient, RemoteConfig, TOKEN_ENV};

    let Some(token) = args.token.filter(|t| !t.is_empty()) else {
        bail!("set the token with --token or the {TOKEN_ENV} environment variable");
    };
    let mut config = RemoteConfig::new(token);
    if let Some(base) = args.api_base {
        config = config.with_api_base(base);
    }

    let codec = LabelCodec::default();
    let client = EvaluationClient::new(config)?;
    let metrics = client
        .evaluate_file(&args.csv, args.threshold, args.auto_map.then_some(&codec))
        .with_context(|| format!("evaluating {}", args.csv.display()))?;

    println!("{}", serde_json::to_string_pretty(&metrics)?);
    metrics.save(&args.save_json)?;
    Ok(())
}

#[cfg(not(feature = "remote"))]
fn evaluate(_args: EvaluateArgs) -> anyhow::Result<()> {
    bail!("remote evaluation is not available in this build (enable the 'remote' feature)")
}

fn describe_csv(args: DescribeArgs) -> anyhow::Result<()> {
    let frame = Frame::read_csv(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let summary = describe(&frame)?;
    let out = Path::new(&args.out);
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    summary.write_csv(out)?;
    print!("{}", String::from_utf8_lossy(&summary.to_csv_bytes()?));
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}
