use proptest::prelude::*;

/// Priorities inside the built-in band, plus a margin outside it
pub fn priority_strategy() -> impl Strategy<Value = i32> {
    -2i32..=8
}

/// (priority, created_at offset in ms) pairs; offsets repeat on purpose
pub fn task_spec_strategy() -> impl Strategy<Value = Vec<(i32, i64)>> {
    prop::collection::vec((priority_strategy(), 0i64..20), 0..64)
}

/// Failure counts per task and a retry budget
pub fn retry_scenario_strategy() -> impl Strategy<Value = (u32, Vec<u32>)> {
    (0u32..6, prop::collection::vec(0u32..10, 1..16))
}
