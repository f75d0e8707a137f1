pub mod status_record;
pub mod task;

pub use status_record::StatusRecord;
pub use task::{short_id, Task, TaskBuilder};
