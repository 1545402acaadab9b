use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use datacert::charts::{
    Aggregation, ChartChecker, ChartKind, ChartSpec, DEFAULT_TOLERANCE, FilterValue,
    load_chart_specs, load_materialized_charts, save_chart_metadata,
};
use datacert::certify::certify;
use datacert::config::CertConfig;
use datacert::error::CertError;
use datacert::frame::load_csv;
use datacert::manifest::{
    CommandSigner, ManifestWriter, latest_manifest_hash, load_chain, verify_chain,
};
use datacert::schema::{ValidateOptions, save_summary, validate_csv};
use datacert::signature::dataset_signature;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "datacert",
    version,
    about = "Certify a dataset and the artefacts derived from it"
)]
pub struct Cli {
    /// Directory for rolling log files. Defaults to the platform data directory.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a CSV dataset against a schema
    Validate {
        /// Dataset to validate
        #[arg(short, long)]
        data: PathBuf,

        /// Schema document (YAML or JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Append the report to this JSONL audit log
        #[arg(long)]
        log: Option<PathBuf>,

        /// Write the validation summary here
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Report errors without failing
        #[arg(long)]
        no_halt: bool,
    },
    /// Stamp a chart spec with the dataset's signature and save its metadata
    ChartSpec {
        /// Dataset the chart is built from
        #[arg(short, long)]
        data: PathBuf,

        /// Chart identifier, unique per chart
        #[arg(long)]
        id: String,

        /// Chart kind (bar, line, ...)
        #[arg(long)]
        kind: String,

        /// Category column
        #[arg(long)]
        x: String,

        /// Value column
        #[arg(long)]
        y: Option<String>,

        /// Aggregation (mean, sum, count)
        #[arg(long)]
        agg: Option<String>,

        /// Filter as COLUMN=VALUE; repeat a column to accept several values
        #[arg(long = "filter", value_name = "COLUMN=VALUE")]
        filters: Vec<String>,

        /// Directory for the chart metadata file
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Check materialized charts against the dataset
    Charts {
        /// Dataset the charts claim to summarise
        #[arg(short, long)]
        data: PathBuf,

        /// Directory of chart metadata files
        #[arg(long)]
        specs: PathBuf,

        /// Directory of `<identifier>.csv` chart outputs. Defaults to the specs directory.
        #[arg(long)]
        outputs: Option<PathBuf>,

        /// Write the chart validation report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Absolute tolerance for aggregated values
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
    },
    /// Write an integrity manifest for an output root
    Manifest {
        /// Output root holding the run artefacts
        #[arg(short, long)]
        root: PathBuf,

        /// Hash of the previous manifest
        #[arg(long, conflicts_with = "chain")]
        prev: Option<String>,

        /// Link to the latest manifest already under the root
        #[arg(long)]
        chain: bool,

        /// Signing command run with the manifest path as its last argument
        #[arg(long, env = "DATACERT_SIGN_CMD")]
        sign_cmd: Option<String>,
    },
    /// Verify the manifest chain of an output root
    VerifyChain {
        /// Output root holding the manifests
        #[arg(short, long)]
        root: PathBuf,
    },
    /// Run a full certification from a config file
    Run {
        /// YAML or JSON run configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Signing command, overriding the config's `sign_command`
        #[arg(long, env = "DATACERT_SIGN_CMD")]
        sign_cmd: Option<String>,
    },
}

pub fn run_command(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Validate {
            data,
            schema,
            log,
            summary,
            no_halt,
        } => handle_validate(data, schema, log, summary, no_halt),
        Commands::ChartSpec {
            data,
            id,
            kind,
            x,
            y,
            agg,
            filters,
            out,
        } => handle_chart_spec(data, id, kind, x, y, agg, &filters, out),
        Commands::Charts {
            data,
            specs,
            outputs,
            report,
            tolerance,
        } => handle_charts(data, specs, outputs, report, tolerance),
        Commands::Manifest {
            root,
            prev,
            chain,
            sign_cmd,
        } => handle_manifest(root, prev, chain, sign_cmd),
        Commands::VerifyChain { root } => handle_verify_chain(root),
        Commands::Run { config, sign_cmd } => handle_run(config, sign_cmd),
    }
}

fn handle_validate(
    data: PathBuf,
    schema: PathBuf,
    log: Option<PathBuf>,
    summary: Option<PathBuf>,
    no_halt: bool,
) -> Result<ExitCode> {
    let options = ValidateOptions {
        log_path: log,
        halt_on_error: !no_halt,
    };

    let report = match validate_csv(&data, &schema, &options) {
        Ok((_, report)) => report,
        Err(CertError::ValidationFailed { report, .. }) => {
            if let Some(path) = &summary {
                save_summary(&report, path)?;
            }
            println!("{}", serde_json::to_string_pretty(&report.summary())?);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &summary {
        save_summary(&report, path)?;
    }
    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    Ok(ExitCode::SUCCESS)
}

/// Parse repeated `COLUMN=VALUE` flags into per-column filters.
///
/// Values are read as JSON when they parse (`3`, `true`, `["A","B"]`) and as
/// plain strings otherwise. A column given more than once accepts any of its
/// values.
fn parse_filters(raw: &[String]) -> Result<BTreeMap<String, FilterValue>> {
    let mut values: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for item in raw {
        let Some((column, value)) = item.split_once('=') else {
            bail!("Invalid filter '{item}', expected COLUMN=VALUE");
        };
        let column = column.trim();
        if column.is_empty() {
            bail!("Invalid filter '{item}', column name is empty");
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
        match value {
            Value::Array(items) => values.entry(column.to_owned()).or_default().extend(items),
            other => values.entry(column.to_owned()).or_default().push(other),
        }
    }

    Ok(values
        .into_iter()
        .map(|(column, mut vals)| {
            let filter = if vals.len() == 1 {
                FilterValue::Equals(vals.remove(0))
            } else {
                FilterValue::OneOf(vals)
            };
            (column, filter)
        })
        .collect())
}

#[expect(clippy::too_many_arguments)]
fn handle_chart_spec(
    data: PathBuf,
    id: String,
    kind: String,
    x: String,
    y: Option<String>,
    agg: Option<String>,
    filters: &[String],
    out: PathBuf,
) -> Result<ExitCode> {
    let df = load_csv(&data)?;

    let mut spec = ChartSpec::new(id, ChartKind::from(kind), x);
    if let Some(y) = y {
        spec = spec.with_y(y);
    }
    if let Some(agg) = agg {
        spec = spec.with_aggregation(Aggregation::from(agg));
    }
    for (column, filter) in parse_filters(filters)? {
        spec = spec.with_filter(column, filter);
    }
    spec = spec.with_signature(dataset_signature(&df)?);

    let path = save_chart_metadata(&spec, &out)?;
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn handle_charts(
    data: PathBuf,
    specs_dir: PathBuf,
    outputs: Option<PathBuf>,
    report_path: Option<PathBuf>,
    tolerance: f64,
) -> Result<ExitCode> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        bail!("Tolerance must be a non-negative number, got {tolerance}");
    }

    let df = load_csv(&data)?;
    let specs = load_chart_specs(&specs_dir)?;
    let outputs_dir = outputs.unwrap_or_else(|| specs_dir.clone());
    let charts = load_materialized_charts(&outputs_dir, &specs)?;

    let report = ChartChecker::new(tolerance).validate(&df, &specs, &charts)?;
    if let Some(path) = &report_path {
        report.save(path)?;
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn handle_manifest(
    root: PathBuf,
    prev: Option<String>,
    chain: bool,
    sign_cmd: Option<String>,
) -> Result<ExitCode> {
    let prev = if chain {
        latest_manifest_hash(&root)?
    } else {
        prev
    };

    let mut writer = ManifestWriter::new();
    if let Some(cmd) = sign_cmd.as_deref() {
        let signer =
            CommandSigner::parse(cmd).context("Signing command must name a program")?;
        writer = writer.with_signer(signer);
    }

    let path = writer.write(&root, prev.as_deref())?;
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn handle_verify_chain(root: PathBuf) -> Result<ExitCode> {
    let chain = load_chain(&root)?;
    if chain.is_empty() {
        bail!("No manifests found under {}", root.display());
    }

    let report = verify_chain(&chain)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.is_intact() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn handle_run(config_path: PathBuf, sign_cmd: Option<String>) -> Result<ExitCode> {
    let mut config = CertConfig::load(&config_path)?;
    if let Some(cmd) = sign_cmd {
        let argv: Vec<String> = cmd.split_whitespace().map(str::to_owned).collect();
        if argv.is_empty() {
            bail!("Signing command must name a program");
        }
        config.sign_command = Some(argv);
    }

    let outcome = match certify(&config) {
        Ok(outcome) => outcome,
        Err(CertError::ValidationFailed { error_count, .. }) => {
            println!("Validation failed with {error_count} error(s); run halted");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    println!("Manifest: {}", outcome.manifest_path.display());
    println!("Manifest hash: {}", outcome.manifest_hash);
    println!(
        "Validation: {} error(s), {} warning(s)",
        outcome.validation.errors().count(),
        outcome.validation.warnings().count()
    );
    if let Some(charts) = &outcome.charts {
        println!(
            "Charts: {} error(s), {} warning(s)",
            charts.errors().count(),
            charts.warnings().count()
        );
    }

    Ok(if outcome.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
