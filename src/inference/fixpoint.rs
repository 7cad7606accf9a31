//! Whole-program propagation of return nullability.
//!
//! Every round classifies the methods that still lack a concrete verdict
//! against the table as it stood when the round began, then commits the
//! results in signature order. Delegation chains therefore resolve one link
//! per round, and the driver stops as soon as a round changes nothing.

use opentelemetry::KeyValue;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::catalog::LibraryCatalog;
use crate::descriptor::ReturnKind;
use crate::facts::{FactTable, NullabilityVerdict};
use crate::inference::parameters::detect_parameter_nullability;
use crate::inference::returns::detect_return_nullability;
use crate::program::{MethodEntry, MethodSignature, ProgramIndex};
use crate::telemetry::{Telemetry, add_current_span_event, with_span};

/// Driver state between rounds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum DriverState {
    Scanning { round: usize },
    Converged,
}

/// Why the driver stopped scheduling rounds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum StopReason {
    /// Every classifiable method has a concrete verdict.
    Settled,
    /// A round produced no new concrete verdict.
    NoProgress,
    /// The configured round limit was reached.
    RoundLimit,
}

impl StopReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            StopReason::Settled => "settled",
            StopReason::NoProgress => "no_progress",
            StopReason::RoundLimit => "round_limit",
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct FixpointStats {
    pub(crate) rounds: usize,
    pub(crate) stop_reason: StopReason,
    /// Methods left pending when the driver stopped, resolved to `NonNull`.
    pub(crate) defaulted: Vec<MethodSignature>,
}

/// Methods whose return verdict can be derived from a body.
fn classifiable<'i, 'a>(index: &'i ProgramIndex<'a>) -> Vec<&'i MethodEntry<'a>> {
    index
        .methods()
        .filter(|entry| entry.has_body() && entry.return_kind == ReturnKind::Reference)
        .collect()
}

/// Run return-nullability rounds until the table converges.
pub(crate) fn infer_returns(
    index: &ProgramIndex<'_>,
    facts: &mut FactTable,
    catalog: &LibraryCatalog,
    max_rounds: Option<usize>,
    telemetry: Option<&Telemetry>,
) -> FixpointStats {
    let candidates = classifiable(index);
    let mut rounds = 0;
    let mut state = DriverState::Scanning { round: 0 };
    let mut stop_reason = StopReason::Settled;

    while let DriverState::Scanning { round } = state {
        let scheduled: Vec<&MethodEntry<'_>> = candidates
            .iter()
            .copied()
            .filter(|entry| facts.concrete_return(&entry.signature).is_none())
            .collect();
        if scheduled.is_empty() {
            stop_reason = StopReason::Settled;
            state = DriverState::Converged;
            continue;
        }
        if max_rounds.is_some_and(|limit| round >= limit) {
            stop_reason = StopReason::RoundLimit;
            state = DriverState::Converged;
            continue;
        }

        let attributes = [
            KeyValue::new("nullspect.phase", "fixpoint_round"),
            KeyValue::new("nullspect.round", round as i64),
            KeyValue::new("nullspect.scheduled", scheduled.len() as i64),
        ];
        let snapshot: &FactTable = facts;
        let verdicts: Vec<(MethodSignature, NullabilityVerdict)> =
            with_span(telemetry, "fixpoint_round", &attributes, || {
                scheduled
                    .par_iter()
                    .map(|entry| {
                        let verdict =
                            detect_return_nullability(entry.method, index, snapshot, catalog);
                        (entry.signature.clone(), verdict)
                    })
                    .collect()
            });

        // `scheduled` follows the arena's signature order, and so do commits.
        let mut progress = 0;
        for (signature, verdict) in verdicts {
            if facts.record_return(&signature, verdict) {
                progress += 1;
            }
        }
        rounds = round + 1;
        debug!(
            round = rounds,
            scheduled = scheduled.len(),
            progress,
            "fixpoint round finished"
        );

        state = if progress == 0 {
            stop_reason = StopReason::NoProgress;
            DriverState::Converged
        } else {
            DriverState::Scanning { round: rounds }
        };
    }

    finish(facts, rounds, stop_reason)
}

fn finish(facts: &mut FactTable, rounds: usize, stop_reason: StopReason) -> FixpointStats {
    for (signature, callees) in facts.pending_returns() {
        let callees: Vec<String> = callees.iter().map(ToString::to_string).collect();
        debug!(method = %signature, ?callees, "unresolved delegation; defaulting to non-null");
    }
    let defaulted = facts.default_pending_to_non_null();
    add_current_span_event(
        "fixpoint.finished",
        &[
            KeyValue::new("nullspect.rounds", rounds as i64),
            KeyValue::new("nullspect.defaulted", defaulted.len() as i64),
        ],
    );
    match stop_reason {
        StopReason::RoundLimit if !defaulted.is_empty() => warn!(
            rounds,
            pending = defaulted.len(),
            "round limit reached; remaining methods default to non-null"
        ),
        _ if !defaulted.is_empty() => info!(
            rounds,
            cycles = defaulted.len(),
            "delegation cycles without a null source default to non-null"
        ),
        _ => {}
    }
    FixpointStats {
        rounds,
        stop_reason,
        defaulted,
    }
}

/// Classify every reference parameter of every method with a body.
/// Returns the number of parameters found nullable.
pub(crate) fn infer_parameters(
    index: &ProgramIndex<'_>,
    facts: &mut FactTable,
    catalog: &LibraryCatalog,
    telemetry: Option<&Telemetry>,
) -> usize {
    let entries: Vec<&MethodEntry<'_>> = index.methods().filter(|entry| entry.has_body()).collect();
    let attributes = [KeyValue::new("nullspect.phase", "parameters")];
    let verdicts: Vec<(MethodSignature, usize, NullabilityVerdict)> =
        with_span(telemetry, "parameters", &attributes, || {
            entries
                .par_iter()
                .flat_map_iter(|entry| {
                    entry
                        .reference_parameters
                        .iter()
                        .enumerate()
                        .filter(|(_, is_reference)| **is_reference)
                        .map(|(position, _)| {
                            (
                                entry.signature.clone(),
                                position,
                                detect_parameter_nullability(entry, position, catalog),
                            )
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        });

    let mut nullable = 0;
    for (signature, position, verdict) in verdicts {
        if verdict == NullabilityVerdict::Nullable {
            nullable += 1;
        }
        facts.record_parameter(&signature, position, verdict);
    }
    nullable
}
