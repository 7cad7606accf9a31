use std::time::Instant;

use anyhow::Result;
use opentelemetry::KeyValue;
use tracing::info;

use crate::annotate::plan_edits;
use crate::catalog::LibraryCatalog;
use crate::classpath::resolve_classpath;
use crate::config::EngineConfig;
use crate::edit::EditSet;
use crate::facts::FactTable;
use crate::inference::fixpoint::{FixpointStats, infer_parameters, infer_returns};
use crate::ir::CompilationUnit;
use crate::program::build_program_index;
use crate::telemetry::{Telemetry, with_span};

/// Nullability inference engine.
pub(crate) struct Engine {
    config: EngineConfig,
    catalog: LibraryCatalog,
}

/// Timing breakdown of one engine run.
#[derive(Clone, Debug, Default)]
pub(crate) struct EngineTimings {
    pub(crate) index_duration_ms: u128,
    pub(crate) returns_duration_ms: u128,
    pub(crate) parameters_duration_ms: u128,
    pub(crate) annotate_duration_ms: u128,
}

#[derive(Clone, Debug)]
pub(crate) struct AnalysisStats {
    pub(crate) methods: usize,
    pub(crate) fixpoint: FixpointStats,
    pub(crate) nullable_returns: usize,
    pub(crate) nullable_parameters: usize,
    pub(crate) timings: EngineTimings,
}

/// Edits and statistics produced by one engine run.
pub(crate) struct EngineOutput {
    pub(crate) edits: EditSet,
    pub(crate) stats: AnalysisStats,
}

impl Engine {
    pub(crate) fn new(config: EngineConfig) -> Self {
        let mut catalog = LibraryCatalog::with_registered();
        for predicate in &config.extra_null_predicates {
            catalog.add_predicate(predicate);
        }
        for known in &config.extra_known_nullable {
            catalog.add_known_nullable(known);
        }
        Self { config, catalog }
    }

    pub(crate) fn analyze(
        &self,
        units: &[CompilationUnit],
        telemetry: Option<&Telemetry>,
    ) -> Result<EngineOutput> {
        let mut timings = EngineTimings::default();

        let index_started_at = Instant::now();
        let classpath = with_span(
            telemetry,
            "classpath",
            &[KeyValue::new("nullspect.phase", "classpath")],
            || resolve_classpath(units),
        )?;
        let index = with_span(
            telemetry,
            "program_index",
            &[KeyValue::new("nullspect.phase", "program_index")],
            || build_program_index(&classpath),
        )?;
        let mut facts = FactTable::seeded(&index, self.config.qualifier.simple_name());
        timings.index_duration_ms = index_started_at.elapsed().as_millis();

        let returns_started_at = Instant::now();
        let fixpoint = with_span(
            telemetry,
            "returns",
            &[KeyValue::new("nullspect.phase", "returns")],
            || {
                infer_returns(
                    &index,
                    &mut facts,
                    &self.catalog,
                    self.config.max_rounds,
                    telemetry,
                )
            },
        );
        timings.returns_duration_ms = returns_started_at.elapsed().as_millis();

        let parameters_started_at = Instant::now();
        infer_parameters(&index, &mut facts, &self.catalog, telemetry);
        timings.parameters_duration_ms = parameters_started_at.elapsed().as_millis();

        let annotate_started_at = Instant::now();
        let edits = with_span(
            telemetry,
            "annotate",
            &[KeyValue::new("nullspect.phase", "annotate")],
            || plan_edits(&index, &facts, &self.config),
        );
        timings.annotate_duration_ms = annotate_started_at.elapsed().as_millis();

        let stats = AnalysisStats {
            methods: index.len(),
            fixpoint,
            nullable_returns: facts.nullable_returns().count(),
            nullable_parameters: facts.nullable_parameters().count(),
            timings,
        };
        info!(
            methods = stats.methods,
            rounds = stats.fixpoint.rounds,
            nullable_returns = stats.nullable_returns,
            nullable_parameters = stats.nullable_parameters,
            edits = edits.annotations.len(),
            "analysis finished"
        );
        Ok(EngineOutput { edits, stats })
    }
}
