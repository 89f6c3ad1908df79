//! # Runtime
//!
//! Tokio runtime construction for heartbeat binaries.
//!
//! A Raspberry Pi has four cores and little memory while a CI runner has plenty
//! of both, so the runtime comes in three profiles:
//!
//! | profile            | workers                 | stack   | used by              |
//! |--------------------|-------------------------|---------|----------------------|
//! | `default`          | host parallelism        | 2 `MiB` | tests, ad-hoc tools  |
//! | `memory_efficient` | half the host, at least 1 | 1 `MiB` | acquisition node   |
//! | `high_performance` | host parallelism        | 4 `MiB` | heavy tooling        |
//!
//! `TOKIO_WORKER_THREADS` overrides the detected parallelism.
//!
//! ```rust,ignore
//! #[hb_runtime::main(memory_efficient)]
//! async fn main() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

pub use anyhow::Result;
pub use hb_derive::main;

use anyhow::Context;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

const MIB: usize = 1024 * 1024;
const FALLBACK_WORKERS: usize = 4;
const MAX_WORKERS: usize = 256;
const STACK_RANGE: (usize, usize) = (MIB / 2, 16 * MIB);

fn host_workers() -> usize {
    static WORKERS: OnceLock<usize> = OnceLock::new();
    *WORKERS.get_or_init(|| {
        std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .filter(|n| (1..=MAX_WORKERS).contains(n))
            .or_else(|| std::thread::available_parallelism().ok().map(usize::from))
            .unwrap_or(FALLBACK_WORKERS)
    })
}

/// Shape of the multi-threaded runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: host_workers(),
            stack_size: 2 * MIB,
            thread_name: "hb-worker".to_owned(),
            thread_keep_alive: Duration::from_secs(60),
        }
    }
}

impl RuntimeConfig {
    /// Preset for the acquisition node on a single-board computer.
    #[must_use]
    pub fn memory_efficient() -> Self {
        Self {
            worker_threads: (host_workers() / 2).max(1),
            stack_size: MIB,
            thread_name: "hb-node".to_owned(),
            thread_keep_alive: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn high_performance() -> Self {
        Self {
            stack_size: 4 * MIB,
            thread_name: "hb-hp".to_owned(),
            thread_keep_alive: Duration::from_secs(300),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    #[must_use]
    pub const fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    /// Worker count and stack size forced into range, blank thread names replaced.
    #[must_use]
    pub fn clamped(&self) -> Self {
        let thread_name = match self.thread_name.trim() {
            "" => Self::default().thread_name,
            name => name.to_owned(),
        };
        Self {
            worker_threads: self.worker_threads.clamp(1, MAX_WORKERS),
            stack_size: self.stack_size.clamp(STACK_RANGE.0, STACK_RANGE.1),
            thread_name,
            thread_keep_alive: self.thread_keep_alive,
        }
    }
}

/// Builds a multi-threaded runtime with IO and time drivers, clamping `config` first.
///
/// # Errors
/// Returns an error if the OS refuses to spawn the worker threads.
pub fn build_runtime_with_config(config: &RuntimeConfig) -> Result<Runtime> {
    let config = config.clamped();
    debug!(?config, "Building tokio runtime");

    Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name(config.thread_name)
        .thread_stack_size(config.stack_size)
        .thread_keep_alive(config.thread_keep_alive)
        .enable_all()
        .build()
        .context("Failed to initialize runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_values_are_clamped() {
        let wild = RuntimeConfig::default().with_worker_threads(0).with_stack_size(1).clamped();
        assert_eq!(wild.worker_threads, 1);
        assert_eq!(wild.stack_size, STACK_RANGE.0);

        let huge =
            RuntimeConfig::default().with_worker_threads(10_000).with_stack_size(usize::MAX).clamped();
        assert_eq!(huge.worker_threads, MAX_WORKERS);
        assert_eq!(huge.stack_size, STACK_RANGE.1);
    }

    #[test]
    fn blank_thread_name_falls_back() {
        let config = RuntimeConfig { thread_name: "  ".to_owned(), ..RuntimeConfig::default() };
        assert_eq!(config.clamped().thread_name, "hb-worker");
    }

    #[test]
    fn node_profile_is_the_lightest() {
        let node = RuntimeConfig::memory_efficient();
        assert!(node.worker_threads >= 1);
        assert!(node.worker_threads <= RuntimeConfig::default().worker_threads);
        assert!(node.stack_size < RuntimeConfig::high_performance().stack_size);
    }

    #[test]
    fn runtime_runs_futures() -> Result<()> {
        let runtime = build_runtime_with_config(&RuntimeConfig::default().with_worker_threads(1))?;
        assert_eq!(runtime.block_on(async { 21 * 2 }), 42);
        Ok(())
    }
}
