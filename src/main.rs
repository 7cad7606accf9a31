mod annotate;
mod catalog;
mod classpath;
mod config;
mod descriptor;
mod edit;
mod engine;
mod facts;
mod inference;
mod ir;
mod program;
mod sarif;
mod scan;
mod telemetry;
#[cfg(test)]
mod test_harness;
mod visit;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use opentelemetry::KeyValue;
use serde::Serialize;
use serde_json::json;
use serde_sarif::sarif::{
    Artifact, Invocation, PropertyBag, ReportingDescriptor, Run, SCHEMA_URL, Sarif, Tool,
    ToolComponent,
};

use crate::config::{
    DEFAULT_QUALIFIER, EngineConfig, Qualifier, parse_known_nullable, parse_null_predicate,
};
use crate::edit::EditSet;
use crate::engine::{AnalysisStats, Engine};
use crate::sarif::{build_results, rule_descriptors};
use crate::scan::scan_inputs;
use crate::telemetry::{Telemetry, init_logging, with_span};

/// CLI arguments for nullspect execution.
#[derive(Parser, Debug)]
#[command(
    name = "nullspect",
    about = "Infer nullable returns and parameters from a parsed program model and emit qualifier edits.",
    version
)]
struct Cli {
    /// Program-model JSON file, or a directory searched for `*.json`.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Context-only program models; never edited.
    #[arg(long, value_name = "PATH")]
    classpath: Vec<PathBuf>,
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Sarif)]
    format: OutputFormat,
    /// Fully-qualified name of the nullable type-use qualifier.
    #[arg(long, value_name = "FQN", default_value = DEFAULT_QUALIFIER)]
    qualifier: String,
    /// Also annotate parameters of non-public methods.
    #[arg(long)]
    include_non_public_parameters: bool,
    /// Extra null-test helper, `OWNER#NAME` or `OWNER#NAME:not-null`.
    #[arg(long = "null-predicate", value_name = "OWNER#NAME[:not-null]")]
    null_predicates: Vec<String>,
    /// Extra library method whose result may be null.
    #[arg(long = "known-nullable", value_name = "OWNER#NAME")]
    known_nullable: Vec<String>,
    /// Stop propagating after this many fixpoint rounds.
    #[arg(long, value_name = "N")]
    max_rounds: Option<usize>,
    /// OTLP/HTTP endpoint receiving trace spans.
    #[arg(long, value_name = "URL")]
    otel: Option<String>,
    #[arg(long)]
    quiet: bool,
    #[arg(long)]
    timing: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Sarif,
    Edits,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let telemetry = cli.otel.clone().map(Telemetry::new).transpose()?;
    let result = run(cli, telemetry.as_ref());
    if let Some(telemetry) = &telemetry {
        telemetry.shutdown()?;
    }
    result
}

fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let qualifier = Qualifier::parse(&cli.qualifier)
        .with_context(|| format!("invalid --qualifier {}", cli.qualifier))?;
    let extra_null_predicates = cli
        .null_predicates
        .iter()
        .map(|value| {
            parse_null_predicate(value).with_context(|| format!("invalid --null-predicate {value}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let extra_known_nullable = cli
        .known_nullable
        .iter()
        .map(|value| {
            parse_known_nullable(value).with_context(|| format!("invalid --known-nullable {value}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if cli.max_rounds == Some(0) {
        anyhow::bail!("--max-rounds must be at least 1");
    }
    Ok(EngineConfig {
        qualifier,
        include_non_public_parameters: cli.include_non_public_parameters,
        extra_null_predicates,
        extra_known_nullable,
        max_rounds: cli.max_rounds,
    })
}

fn run(cli: Cli, telemetry: Option<&Telemetry>) -> Result<()> {
    if !cli.input.exists() {
        anyhow::bail!("input not found: {}", cli.input.display());
    }
    for entry in &cli.classpath {
        if !entry.exists() {
            anyhow::bail!("classpath entry not found: {}", entry.display());
        }
    }
    let config = engine_config(&cli)?;
    let qualifier = config.qualifier.qualified_name();

    let started_at = Instant::now();
    let scan_started_at = Instant::now();
    let scan = with_span(
        telemetry,
        "scan",
        &[KeyValue::new("nullspect.phase", "scan")],
        || scan_inputs(&cli.input, &cli.classpath, telemetry),
    )?;
    let scan_duration_ms = scan_started_at.elapsed().as_millis();

    let output = Engine::new(config).analyze(&scan.units, telemetry)?;

    let mut writer = output_writer(cli.output.as_deref())?;
    match cli.format {
        OutputFormat::Sarif => {
            let invocation = build_invocation(&InvocationStats {
                scan_duration_ms,
                file_count: scan.file_count,
                unit_count: scan.units.len(),
                artifact_count: scan.artifacts.len(),
                analysis: &output.stats,
            });
            let sarif = build_sarif(
                scan.artifacts,
                invocation,
                rule_descriptors(),
                &output.edits,
            );
            serde_json::to_writer_pretty(&mut writer, &sarif)
                .context("failed to serialize SARIF output")?;
        }
        OutputFormat::Edits => {
            let report = EditReport {
                qualifier,
                edits: &output.edits,
            };
            serde_json::to_writer_pretty(&mut writer, &report)
                .context("failed to serialize edit output")?;
        }
    }
    writer.write_all(b"\n").context("failed to write output")?;
    writer.flush().context("failed to flush output")?;

    if cli.timing && !cli.quiet {
        let timings = &output.stats.timings;
        eprintln!(
            "timing: total_ms={} scan_ms={} index_ms={} returns_ms={} parameters_ms={} annotate_ms={} units={} methods={} rounds={} stop={}",
            started_at.elapsed().as_millis(),
            scan_duration_ms,
            timings.index_duration_ms,
            timings.returns_duration_ms,
            timings.parameters_duration_ms,
            timings.annotate_duration_ms,
            scan.units.len(),
            output.stats.methods,
            output.stats.fixpoint.rounds,
            output.stats.fixpoint.stop_reason.as_str()
        );
    }

    Ok(())
}

/// Edit list handed to the rewrite step.
#[derive(Serialize)]
struct EditReport<'a> {
    qualifier: String,
    #[serde(flatten)]
    edits: &'a EditSet,
}

fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdout())),
        Some(path) => Ok(Box::new(
            File::create(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Ok(Box::new(io::stdout())),
    }
}

/// Metadata captured for SARIF invocation properties.
struct InvocationStats<'a> {
    scan_duration_ms: u128,
    file_count: usize,
    unit_count: usize,
    artifact_count: usize,
    analysis: &'a AnalysisStats,
}

fn build_invocation(stats: &InvocationStats<'_>) -> Invocation {
    let arguments: Vec<String> = std::env::args().collect();
    let command_line = arguments.join(" ");
    let mut properties = BTreeMap::new();
    properties.insert("nullspect.scan_ms".to_string(), json!(stats.scan_duration_ms));
    properties.insert("nullspect.file_count".to_string(), json!(stats.file_count));
    properties.insert("nullspect.unit_count".to_string(), json!(stats.unit_count));
    properties.insert(
        "nullspect.artifact_count".to_string(),
        json!(stats.artifact_count),
    );
    properties.insert(
        "nullspect.method_count".to_string(),
        json!(stats.analysis.methods),
    );
    properties.insert(
        "nullspect.fixpoint_rounds".to_string(),
        json!(stats.analysis.fixpoint.rounds),
    );
    properties.insert(
        "nullspect.fixpoint_stop".to_string(),
        json!(stats.analysis.fixpoint.stop_reason.as_str()),
    );
    properties.insert(
        "nullspect.defaulted_count".to_string(),
        json!(stats.analysis.fixpoint.defaulted.len()),
    );
    properties.insert(
        "nullspect.nullable_returns".to_string(),
        json!(stats.analysis.nullable_returns),
    );
    properties.insert(
        "nullspect.nullable_parameters".to_string(),
        json!(stats.analysis.nullable_parameters),
    );

    Invocation::builder()
        .execution_successful(true)
        .arguments(arguments)
        .command_line(command_line)
        .properties(PropertyBag::builder().additional_properties(properties).build())
        .build()
}

fn build_sarif(
    artifacts: Vec<Artifact>,
    invocation: Invocation,
    rules: Vec<ReportingDescriptor>,
    edits: &EditSet,
) -> Sarif {
    let driver = ToolComponent::builder()
        .name("nullspect")
        .information_uri("https://github.com/nullspect/nullspect")
        .rules(rules)
        .build();
    let tool = Tool {
        driver,
        extensions: None,
        properties: None,
    };
    let results = build_results(edits);
    let run = if artifacts.is_empty() {
        Run::builder()
            .tool(tool)
            .invocations(vec![invocation])
            .results(results)
            .build()
    } else {
        Run::builder()
            .tool(tool)
            .invocations(vec![invocation])
            .results(results)
            .artifacts(artifacts)
            .build()
    };

    Sarif::builder()
        .schema(SCHEMA_URL)
        .runs(vec![run])
        .version(json!("2.1.0"))
        .build()
}
