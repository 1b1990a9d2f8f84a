//! What a run segment hands back, and the log of accepted moves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sz_optimizer::StepReport;
use sz_types::FieldSet;
use uuid::Uuid;

/// Unique identifier of one supervised run (all of its segments).
pub type RunId = Uuid;

/// How a segment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    /// All configured runs were executed.
    Completed,
    /// Stopped or paused before the run count was reached.
    Stopped,
    /// A numerical or internal fault ended the segment.
    Failed,
}

/// Immutable snapshot produced once at the end of every segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub run_id: RunId,
    pub segment: u32,
    /// `true` iff the last run index reached the configured run count.
    pub completed: bool,
    /// Last run index reached (1-based; 0 if nothing ran yet).
    pub run: u64,
    /// Final fields, copied out of the worker. `None` if no field was ever
    /// seeded.
    pub fields: Option<FieldSet>,
    /// Energy of `fields`, when it has been evaluated.
    pub energy: Option<f64>,
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionOutcome {
    pub fn status(&self) -> OutcomeStatus {
        if self.failure.is_some() {
            OutcomeStatus::Failed
        } else if self.completed {
            OutcomeStatus::Completed
        } else {
            OutcomeStatus::Stopped
        }
    }

    /// Whether the overall run is over regardless of operator input.
    pub fn is_terminal(&self) -> bool {
        self.status() != OutcomeStatus::Stopped
    }
}

/// One accepted annealing move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedMove {
    pub run: u64,
    pub energy_from: f64,
    pub energy_to: f64,
    pub temperature: f64,
    pub probability: f64,
}

impl From<&StepReport> for AcceptedMove {
    fn from(report: &StepReport) -> Self {
        Self {
            run: report.iteration,
            energy_from: report.energy_current,
            energy_to: report.energy_candidate,
            temperature: report.temperature,
            probability: report.probability,
        }
    }
}

impl std::fmt::Display for AcceptedMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "run {}: accepted move from energy {:.6} to {:.6} at temperature {:.6} with probability {:.5}",
            self.run, self.energy_from, self.energy_to, self.temperature, self.probability
        )
    }
}

/// Accepted moves of one run, across all of its segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveLog {
    entries: Vec<AcceptedMove>,
}

impl MoveLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: AcceptedMove) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = AcceptedMove>) {
        self.entries.extend(entries);
    }

    pub fn entries(&self) -> &[AcceptedMove] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for MoveLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {entry}")?;
        }
        Ok(())
    }
}
