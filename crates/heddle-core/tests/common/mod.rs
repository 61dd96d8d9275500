#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Once;

use heddle_core::{TaskError, TaskFn, TaskName, sync_task_fn};
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary.
///
/// Output is captured per test and shown only for failures (or with
/// `-- --nocapture`). Levels come from `RUST_LOG`, e.g. `RUST_LOG=heddle_core=debug`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Task that echoes its arguments.
pub fn echo() -> Arc<dyn TaskFn> {
    Arc::new(sync_task_fn(|args| Ok(args.clone())))
}

/// Task that always fails with `message`.
pub fn failing(message: &'static str) -> Arc<dyn TaskFn> {
    Arc::new(sync_task_fn(move |_| Err(TaskError::new(message))))
}

/// Task that returns a fixed label.
pub fn label(value: &'static str) -> Arc<dyn TaskFn> {
    Arc::new(sync_task_fn(move |_| Ok(json!(value))))
}

pub fn no_deps() -> Vec<TaskName> {
    Vec::new()
}
