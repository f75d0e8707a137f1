// Task lifecycle states and the decisions the worker protocol derives from them.

pub mod states;

pub use states::{AttemptOutcome, RetryDecision, TaskStatus};
