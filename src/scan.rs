use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jsonschema::{Draft, Validator};
use opentelemetry::KeyValue;
use serde_json::Value;
use serde_sarif::sarif::{Artifact, ArtifactLocation, ArtifactRoles};
use tracing::debug;

use crate::ir::CompilationUnit;
use crate::telemetry::{Telemetry, with_span};

const PROGRAM_MODEL_SCHEMA: &str = include_str!("../schema/program-model.schema.json");

/// Snapshot of loaded artifacts and units for a scan.
pub(crate) struct ScanOutput {
    pub(crate) artifacts: Vec<Artifact>,
    pub(crate) file_count: usize,
    pub(crate) units: Vec<CompilationUnit>,
}

struct Scanner<'t> {
    validator: Validator,
    telemetry: Option<&'t Telemetry>,
    artifacts: Vec<Artifact>,
    file_count: usize,
    units: Vec<CompilationUnit>,
}

/// Load program-model files: `input` holds the analysis targets and
/// `classpath` entries add context-only units.
pub(crate) fn scan_inputs(
    input: &Path,
    classpath: &[PathBuf],
    telemetry: Option<&Telemetry>,
) -> Result<ScanOutput> {
    let mut scanner = Scanner {
        validator: program_model_validator()?,
        telemetry,
        artifacts: Vec::new(),
        file_count: 0,
        units: Vec::new(),
    };

    scanner.scan_path(input, true, true)?;

    // Keep deterministic ordering by sorting classpath entries and directory listings.
    let mut classpath_entries = classpath.to_vec();
    classpath_entries.sort_by_key(|entry| path_key(entry));
    classpath_entries.dedup();
    for entry in classpath_entries {
        if entry == input {
            continue;
        }
        scanner.scan_path(&entry, false, true)?;
    }

    Ok(ScanOutput {
        artifacts: scanner.artifacts,
        file_count: scanner.file_count,
        units: scanner.units,
    })
}

fn program_model_validator() -> Result<Validator> {
    let schema: Value =
        serde_json::from_str(PROGRAM_MODEL_SCHEMA).context("parse program model schema")?;
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("build program model validator")
}

impl Scanner<'_> {
    fn scan_path(&mut self, path: &Path, is_input: bool, strict: bool) -> Result<()> {
        if path.is_dir() {
            return self.scan_dir(path, is_input);
        }
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
        match extension {
            "json" => {
                let attributes = [KeyValue::new(
                    "nullspect.model_path",
                    path.display().to_string(),
                )];
                with_span(self.telemetry, "model.scan", &attributes, || {
                    self.scan_model_file(path, is_input)
                })
            }
            _ if strict => anyhow::bail!("unsupported input file: {}", path.display()),
            _ => Ok(()),
        }
    }

    fn scan_dir(&mut self, path: &Path, is_input: bool) -> Result<()> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)
            .with_context(|| format!("failed to read directory {}", path.display()))?
        {
            let entry =
                entry.with_context(|| format!("failed to read entry under {}", path.display()))?;
            entries.push(entry.path());
        }

        entries.sort_by_key(|entry| path_key(entry));

        for entry in entries {
            self.scan_path(&entry, is_input, false)?;
        }
        Ok(())
    }

    fn scan_model_file(&mut self, path: &Path, is_input: bool) -> Result<()> {
        let data =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let document: Value = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let violations: Vec<String> = self
            .validator
            .iter_errors(&document)
            .map(|error| format!("{}: {error}", error.instance_path()))
            .collect();
        if !violations.is_empty() {
            anyhow::bail!(
                "{} does not match the program model schema: {}",
                path.display(),
                violations.join("; ")
            );
        }

        let units: Vec<CompilationUnit> = if document.is_array() {
            serde_path_to_error::deserialize(document)
        } else {
            serde_path_to_error::deserialize::<_, CompilationUnit>(document).map(|unit| vec![unit])
        }
        .with_context(|| format!("failed to decode {}", path.display()))?;

        self.file_count += 1;
        debug!(path = %path.display(), units = units.len(), is_input, "loaded program model");
        for mut unit in units {
            unit.is_analysis_target = is_input;
            if is_input {
                unit.artifact_index = self.push_source_artifact(&unit.path)?;
            }
            self.units.push(unit);
        }
        Ok(())
    }

    /// Record the source file of an analysis-target unit.
    fn push_source_artifact(&mut self, source_path: &str) -> Result<i64> {
        let role = serde_json::to_value(ArtifactRoles::AnalysisTarget)
            .context("serialize artifact role")?;
        let location = ArtifactLocation::builder().uri(source_path.to_string()).build();
        let artifact = Artifact::builder()
            .location(location)
            .roles(vec![role])
            .build();
        self.artifacts.push(artifact);
        Ok((self.artifacts.len() - 1) as i64)
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
