//! Test support for the fleet scheduler.
//!
//! - [`MemState`]: an in-memory cluster snapshot
//! - [`FirstFitStack`]: a stack that picks the first candidate node
//! - [`Harness`]: a planner that records what it is asked to do
//! - [`mock`]: fixture builders

pub mod mock;

mod harness;
mod stack;
mod state;

pub use harness::{CommitMode, Harness};
pub use stack::{FirstFitStack, ASSIGNED_IP};
pub use state::MemState;

/// Install a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
