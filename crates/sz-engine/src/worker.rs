//! One run segment: the annealing loop executed on a worker thread until it
//! finishes, fails, or is asked to stop.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use sz_optimizer::{ricci_jacobian, ricci_profile, AnnealState, RicciComponents, SimulatedAnnealing};
use sz_types::{internal_error, EngineConfig, Field, FieldSet, SzResult};
use tracing::{debug, info, warn};

use crate::outcome::{AcceptedMove, ExecutionOutcome, RunId};

/// Every this many grid samples the initialization summary logs one row.
const SUMMARY_STRIDE: usize = 100;

/// Cooperative stop request shared between a supervisor and its worker.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Progress through a segment.
#[derive(Debug)]
struct RunState {
    run: u64,
    /// Field to prime from: the resumed field, or `None` to seed the grid.
    pending: Option<Field>,
    current: Option<AnnealState>,
    primed: bool,
}

impl RunState {
    fn new(run: u64, pending: Option<Field>) -> Self {
        Self {
            run,
            pending,
            current: None,
            primed: false,
        }
    }

    /// The latest fields, primed or not.
    fn into_fields(self) -> (Option<FieldSet>, Option<f64>) {
        match self.current {
            Some(state) => (Some(state.fields), Some(state.energy)),
            None => (self.pending.map(FieldSet::from_value), None),
        }
    }
}

/// What a worker hands back when its thread ends.
#[derive(Debug)]
pub struct SegmentResult {
    pub outcome: ExecutionOutcome,
    /// The annealer, whose random stream continues in the next segment.
    pub annealer: SimulatedAnnealing,
    pub moves: Vec<AcceptedMove>,
}

/// Executes runs `start_run + 1 ..= number_of_runs`.
pub struct Worker {
    config: EngineConfig,
    run_id: RunId,
    segment: u32,
    start_run: u64,
    prior: Option<Field>,
    annealer: SimulatedAnnealing,
    stop: StopSignal,
}

impl Worker {
    pub fn new(
        config: EngineConfig,
        run_id: RunId,
        segment: u32,
        start_run: u64,
        prior: Option<Field>,
        annealer: SimulatedAnnealing,
        stop: StopSignal,
    ) -> Self {
        Self {
            config,
            run_id,
            segment,
            start_run,
            prior,
            annealer,
            stop,
        }
    }

    /// Run on a named thread.
    pub fn spawn(self) -> SzResult<JoinHandle<SegmentResult>> {
        let handle = thread::Builder::new()
            .name(format!("sz-worker-{}", self.segment))
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Run the segment to its end and report. Failures are captured in the
    /// outcome, never propagated.
    pub fn run(mut self) -> SegmentResult {
        let started_at = Utc::now();
        let total = self.config.optimizer.number_of_runs;
        info!(
            "Segment {} of run {} starting at run {} of {}",
            self.segment, self.run_id, self.start_run, total
        );

        let mut state = RunState::new(self.start_run, self.prior.take());
        let mut moves = Vec::new();
        let result = self.run_loop(&mut state, &mut moves);

        let run = state.run;
        let completed = result.is_ok() && run >= total;
        let failure = match result {
            Ok(()) => None,
            Err(e) => {
                warn!("Segment {} failed at run {}: {}", self.segment, run, e);
                Some(e.to_string())
            }
        };

        if completed {
            info!("Processing completed after {} runs", run);
        } else if failure.is_none() {
            info!("Processing stopped at run {}", run);
        }

        let (fields, energy) = state.into_fields();
        if let Some(fields) = &fields {
            report_final_fields(fields, energy);
        }

        SegmentResult {
            outcome: ExecutionOutcome {
                run_id: self.run_id,
                segment: self.segment,
                completed,
                run,
                fields,
                energy,
                failure,
                started_at,
                finished_at: Utc::now(),
            },
            annealer: self.annealer,
            moves,
        }
    }

    fn run_loop(&mut self, state: &mut RunState, moves: &mut Vec<AcceptedMove>) -> SzResult<()> {
        let total = self.config.optimizer.number_of_runs;

        while !self.stop.is_requested() && state.run < total {
            state.run += 1;
            if !state.primed {
                self.prime(state)?;
            }
            let current = state
                .current
                .as_mut()
                .ok_or_else(|| internal_error!("run {} started without primed fields", state.run))?;

            let report = self.annealer.step(current, state.run)?;
            if report.accepted {
                let accepted = AcceptedMove::from(&report);
                info!("Accepted: {}", accepted);
                moves.push(accepted);
            } else if report.probability >= self.config.rejection_report_threshold {
                info!(
                    "run {}: rejected move from energy {:.6} to {:.6} at temperature {:.6} with probability {:.5}",
                    report.iteration,
                    report.energy_current,
                    report.energy_candidate,
                    report.temperature,
                    report.probability
                );
            }

            let every = self.config.status_interval;
            if every > 0 && state.run % every == 0 {
                info!(
                    run = state.run,
                    energy = current.energy,
                    temperature = report.temperature,
                    "status"
                );
            }
        }
        Ok(())
    }

    /// Differentiate the starting field and evaluate its energy.
    fn prime(&self, state: &mut RunState) -> SzResult<()> {
        let value = match state.pending.take() {
            Some(field) => {
                info!("Resuming from a field of {} samples", field.len());
                field
            }
            None => {
                let field = self.config.grid.build()?;
                log_initialization(&field);
                field
            }
        };

        let primed = match AnnealState::prime(value.clone()) {
            Ok(primed) => primed,
            Err(e) => {
                state.pending = Some(value);
                return Err(e.into());
            }
        };
        info!("Initial energy: {:.6}", primed.energy);

        state.current = Some(primed);
        state.primed = true;
        Ok(())
    }
}

/// Grid indices shown in the initialization summary.
fn summary_rows(len: usize) -> impl Iterator<Item = usize> {
    let last = len.saturating_sub(1);
    (0..len).filter(move |&i| i % SUMMARY_STRIDE == 0 || i == last)
}

fn log_initialization(field: &Field) {
    info!("Initialized grid with {} samples", field.len());
    for i in summary_rows(field.len()) {
        let sample = &field.samples()[i];
        info!("  [{}] r = {:.6}, A = {:.6}, B = {:.6}", i, sample.r, sample.a, sample.b);
    }
}

fn report_final_fields(fields: &FieldSet, energy: Option<f64>) {
    match energy {
        Some(energy) => {
            info!("Final energy: {:.6}", energy);
            report_largest_residual(fields);
        }
        None => info!("Final fields were never evaluated"),
    }

    for (i, sample) in fields.value().iter().enumerate() {
        debug!("  [{}] r = {:.6}, A = {:.9}, B = {:.9}", i, sample.r, sample.a, sample.b);
    }
}

/// The grid point whose Ricci components are furthest from zero, with their
/// sensitivity to the metric values there.
#[derive(Debug, Clone, PartialEq)]
struct Residual {
    index: usize,
    r: f64,
    ricci: RicciComponents,
    /// Rows R00, R11, R22; columns d/dA, d/dB.
    jacobian: [[f64; 2]; 3],
}

fn largest_residual(fields: &FieldSet) -> SzResult<Option<Residual>> {
    let worst = ricci_profile(fields)?
        .into_iter()
        .enumerate()
        .max_by(|(_, x), (_, y)| x.sum_of_squares().total_cmp(&y.sum_of_squares()));

    let Some((index, ricci)) = worst else {
        return Ok(None);
    };
    let jacobian = ricci_jacobian(&fields.point(index)?)?;
    Ok(Some(Residual {
        index,
        r: fields.value().radius(index),
        ricci,
        jacobian,
    }))
}

fn report_largest_residual(fields: &FieldSet) {
    match largest_residual(fields) {
        Ok(Some(worst)) => {
            info!(
                "Largest residual at r = {:.6} (index {}): R00 = {:.3e}, R11 = {:.3e}, R22 = {:.3e}",
                worst.r, worst.index, worst.ricci.r00, worst.ricci.r11, worst.ricci.r22
            );
            let [r00, r11, r22] = worst.jacobian;
            info!(
                "  d/dA = ({:.3e}, {:.3e}, {:.3e}), d/dB = ({:.3e}, {:.3e}, {:.3e})",
                r00[0], r11[0], r22[0], r00[1], r11[1], r22[1]
            );
        }
        Ok(None) => {}
        Err(e) => debug!("No residual profile for the final fields: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sz_optimizer::differentiate_all;
    use sz_types::{FieldSample, GridSpec, OptimizerConfig, SeedProfile};
    use uuid::Uuid;

    fn config(runs: u64, divisor: f64) -> EngineConfig {
        EngineConfig::new(
            OptimizerConfig::new(runs)
                .with_neighbour_peak(0.05)
                .with_temperature(0.5, divisor)
                .with_seed(2024),
        )
        .with_grid(GridSpec::new(1.5, 20.0, 1.25).with_seed_profile(SeedProfile::Scaled))
        .with_status_interval(10)
    }

    fn worker(config: EngineConfig, start: u64, prior: Option<Field>, annealer: SimulatedAnnealing) -> Worker {
        Worker::new(config, Uuid::new_v4(), 1, start, prior, annealer, StopSignal::new())
    }

    fn fresh(config: &EngineConfig) -> SimulatedAnnealing {
        SimulatedAnnealing::new(config.optimizer.clone())
    }

    #[test]
    fn full_segment_completes_with_primed_fields() {
        let config = config(40, 40.0);
        let result = worker(config.clone(), 0, None, fresh(&config)).run();
        let outcome = result.outcome;

        assert!(outcome.completed);
        assert_eq!(outcome.run, 40);
        assert!(outcome.failure.is_none());
        assert!(outcome.finished_at >= outcome.started_at);

        let fields = outcome.fields.unwrap();
        let recomputed = AnnealState::prime(fields.value().clone()).unwrap();
        assert_eq!(recomputed.fields, fields);
        assert_eq!(Some(recomputed.energy), outcome.energy);
        assert!(result.moves.iter().all(|m| m.run >= 1 && m.run <= 40));
    }

    #[test]
    fn pausing_and_resuming_matches_an_uninterrupted_run() {
        let total = 60;
        let full_config = config(total, total as f64);
        let uninterrupted = worker(full_config.clone(), 0, None, fresh(&full_config)).run();

        // The first segment ends after 25 runs, as if paused there.
        let first_config = config(25, total as f64);
        let first = worker(first_config, 0, None, fresh(&full_config)).run();
        assert_eq!(first.outcome.run, 25);

        let prior = first.outcome.fields.map(FieldSet::into_value);
        let second = worker(full_config, 25, prior, first.annealer).run();

        assert!(second.outcome.completed);
        assert_eq!(second.outcome.run, total);
        assert_eq!(second.outcome.fields, uninterrupted.outcome.fields);
        assert_eq!(second.outcome.energy, uninterrupted.outcome.energy);

        let mut resumed_moves = first.moves;
        resumed_moves.extend(second.moves);
        assert_eq!(resumed_moves, uninterrupted.moves);
    }

    #[test]
    fn stop_before_the_first_run_keeps_the_prior_field() {
        let config = config(100, 100.0);
        let prior = config.grid.build().unwrap();
        let stop = StopSignal::new();
        stop.request();

        let result = Worker::new(
            config.clone(),
            Uuid::new_v4(),
            2,
            30,
            Some(prior.clone()),
            fresh(&config),
            stop,
        )
        .run();

        assert!(!result.outcome.completed);
        assert!(result.outcome.failure.is_none());
        assert_eq!(result.outcome.run, 30);
        assert_eq!(result.outcome.energy, None);
        assert_eq!(result.outcome.fields.unwrap().into_value(), prior);
        assert!(result.moves.is_empty());
    }

    #[test]
    fn numerical_failure_is_captured_in_the_outcome() {
        let config = config(10, 10.0);
        let short = Field::new(vec![
            FieldSample::new(1.5, 0.3, -3.0),
            FieldSample::new(2.0, 0.5, -2.0),
        ]);

        let result = worker(config.clone(), 0, Some(short.clone()), fresh(&config)).run();
        let outcome = result.outcome;

        assert!(!outcome.completed);
        assert_eq!(outcome.run, 1);
        assert!(outcome.failure.unwrap().contains("too short"));
        assert_eq!(outcome.fields.unwrap().into_value(), short);
    }

    #[test]
    fn initialization_summary_samples_every_hundredth_row_and_the_last() {
        let default_len = GridSpec::default().build().unwrap().len();
        let rows: Vec<usize> = summary_rows(default_len).collect();
        let mut expected: Vec<usize> = (0..default_len).step_by(100).collect();
        if (default_len - 1) % 100 != 0 {
            expected.push(default_len - 1);
        }
        assert_eq!(rows, expected);

        assert_eq!(summary_rows(3).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(summary_rows(201).collect::<Vec<_>>(), vec![0, 100, 200]);
        assert_eq!(summary_rows(0).count(), 0);
    }

    #[test]
    fn largest_residual_carries_its_sensitivities() {
        // A = B = 1 with no gradients: R22 = -2 everywhere, dR22/dB = 1.
        let field = Field::new(
            [1.5, 2.0, 3.0, 4.0]
                .iter()
                .map(|&r| FieldSample::new(r, 1.0, 1.0))
                .collect(),
        );
        let mut fields = FieldSet::from_value(field);
        differentiate_all(&mut fields).unwrap();

        let worst = largest_residual(&fields).unwrap().unwrap();
        // Ties resolve to the last maximum.
        assert_eq!(worst.index, 3);
        assert_eq!(worst.r, 4.0);
        assert_eq!(worst.ricci.r22, -2.0);
        assert_eq!(worst.jacobian, [[0.0, 0.0], [0.0, 0.0], [0.0, 1.0]]);

        let empty = FieldSet::from_value(Field::new(Vec::new()));
        assert_eq!(largest_residual(&empty).unwrap(), None);
    }

    #[test]
    fn spawned_worker_reports_through_join() {
        let config = config(5, 5.0);
        let handle = worker(config.clone(), 0, None, fresh(&config)).spawn().unwrap();
        let result = handle.join().unwrap();
        assert!(result.outcome.completed);
        assert_eq!(result.outcome.run, 5);
    }
}
