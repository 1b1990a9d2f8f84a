// Pausable execution of the Schwarzschild annealer: a worker thread runs the
// optimisation while a supervisor relays operator commands.

pub mod commands;
pub mod logging;
pub mod outcome;
pub mod supervisor;
pub mod worker;

pub use commands::{spawn_line_reader, stdin_commands, CommandSource, ExecutionCommand, Unattended};
pub use logging::{init_tracing, InitError};
pub use outcome::{AcceptedMove, ExecutionOutcome, MoveLog, OutcomeStatus, RunId};
pub use supervisor::{RunReport, Supervisor, OPERATOR_INSTRUCTIONS};
pub use worker::{SegmentResult, StopSignal, Worker};
