//! Drives a run as a sequence of worker segments, relaying operator commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::thread::{self, JoinHandle};
use sz_optimizer::SimulatedAnnealing;
use sz_types::{EngineConfig, Field, FieldSet, SzResult};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::commands::{CommandSource, ExecutionCommand, Unattended};
use crate::outcome::{ExecutionOutcome, MoveLog, OutcomeStatus, RunId};
use crate::worker::{SegmentResult, StopSignal, Worker};

pub const OPERATOR_INSTRUCTIONS: &str =
    "Enter \"P\" to pause or \"S\" to stop; while paused, \"S\" stops and anything else resumes.";

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Outcome of the last segment.
    pub outcome: ExecutionOutcome,
    /// Accepted moves of all segments, in order.
    pub moves: MoveLog,
    pub segments: u32,
}

/// How a segment's watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Watch {
    Finished,
    Paused,
    Stopped,
}

/// Owns the command source and restarts workers across pauses.
pub struct Supervisor<C> {
    config: EngineConfig,
    commands: C,
    run_id: RunId,
}

impl Supervisor<Unattended> {
    /// A supervisor without an operator: runs straight to completion.
    pub fn unattended(config: EngineConfig) -> SzResult<Self> {
        Self::new(config, Unattended)
    }
}

impl<C: CommandSource> Supervisor<C> {
    pub fn new(config: EngineConfig, commands: C) -> SzResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            commands,
            run_id: Uuid::new_v4(),
        })
    }

    /// Run until completion, failure, or an operator stop.
    pub fn execute(mut self) -> SzResult<RunReport> {
        info!(
            "Starting run {} with {} iterations",
            self.run_id, self.config.optimizer.number_of_runs
        );

        let mut annealer = SimulatedAnnealing::new(self.config.optimizer.clone());
        let mut run = 0;
        let mut prior: Option<Field> = None;
        let mut moves = MoveLog::new();
        let mut segment = 0;

        loop {
            segment += 1;
            let stop = StopSignal::new();
            let started_at = Utc::now();
            let handle = Worker::new(
                self.config.clone(),
                self.run_id,
                segment,
                run,
                prior.clone(),
                annealer,
                stop.clone(),
            )
            .spawn()?;

            let watch = self.watch(&handle, &stop);

            let SegmentResult {
                outcome,
                annealer: returned,
                moves: segment_moves,
            } = match self.join_segment(handle, segment, run, &prior, started_at) {
                Ok(result) => result,
                Err(outcome) => return Ok(self.finish(outcome, moves, segment)),
            };
            moves.extend(segment_moves);

            if outcome.is_terminal() || watch == Watch::Stopped {
                return Ok(self.finish(outcome, moves, segment));
            }

            info!(
                "Processing paused at run {}. Enter \"S\" to stop, anything else to resume.",
                outcome.run
            );
            let resume = match self.commands.wait() {
                Some(line) => ExecutionCommand::parse(&line),
                None => {
                    warn!("Command input closed while paused; stopping");
                    ExecutionCommand::Stop
                }
            };
            if resume == ExecutionCommand::Stop {
                return Ok(self.finish(outcome, moves, segment));
            }

            info!("Resuming at run {}", outcome.run);
            run = outcome.run;
            prior = outcome.fields.map(FieldSet::into_value);
            annealer = returned;
        }
    }

    /// Poll for commands until the worker thread has ended. A pause or stop
    /// raises the stop signal; input after that is left for the paused prompt.
    fn watch(&mut self, handle: &JoinHandle<SegmentResult>, stop: &StopSignal) -> Watch {
        let interval = self.config.poll_interval();
        let mut watch = Watch::Finished;
        while watch == Watch::Finished && !handle.is_finished() {
            let Some(line) = self.commands.poll(interval) else {
                continue;
            };
            let command = ExecutionCommand::parse(&line);
            info!("Operator command: {}", command);

            match command {
                ExecutionCommand::Pause => watch = Watch::Paused,
                ExecutionCommand::Stop => watch = Watch::Stopped,
                ExecutionCommand::Continue => {}
            }
        }

        if watch != Watch::Finished {
            stop.request();
            info!("Waiting for the processing to stop...");
            while !handle.is_finished() {
                thread::sleep(interval);
            }
        }
        watch
    }

    /// Collect the worker's result. A panicked worker becomes a failed
    /// outcome holding the field the segment started from.
    fn join_segment(
        &self,
        handle: JoinHandle<SegmentResult>,
        segment: u32,
        run: u64,
        prior: &Option<Field>,
        started_at: DateTime<Utc>,
    ) -> Result<SegmentResult, ExecutionOutcome> {
        handle.join().map_err(|payload| {
            let message = panic_message(payload.as_ref());
            error!("Worker segment {} panicked: {}", segment, message);
            ExecutionOutcome {
                run_id: self.run_id,
                segment,
                completed: false,
                run,
                fields: prior.clone().map(FieldSet::from_value),
                energy: None,
                failure: Some(format!("worker panicked: {message}")),
                started_at,
                finished_at: Utc::now(),
            }
        })
    }

    fn finish(&self, outcome: ExecutionOutcome, moves: MoveLog, segments: u32) -> RunReport {
        match outcome.status() {
            OutcomeStatus::Completed => info!("Run {} completed at run {}", self.run_id, outcome.run),
            OutcomeStatus::Stopped => info!("Run {} stopped at run {}", self.run_id, outcome.run),
            OutcomeStatus::Failed => error!(
                "Run {} failed at run {}: {}",
                self.run_id,
                outcome.run,
                outcome.failure.as_deref().unwrap_or("unknown failure")
            ),
        }
        if moves.is_empty() {
            info!("No moves were accepted");
        } else {
            info!("{} accepted moves:\n{}", moves.len(), moves);
        }

        RunReport {
            outcome,
            moves,
            segments,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
