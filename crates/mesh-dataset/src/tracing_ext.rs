//! Tracing helpers for dataset operations.
//!
//! Enable output by installing a subscriber in the application:
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//!
//! // RUST_LOG=mesh_dataset=debug for per-folder detail,
//! // RUST_LOG=mesh_dataset::timing=info for timings only.
//! ```
//!
//! # Log Levels
//!
//! - **WARN**: skipped or failed folders, interpolation gaps, degenerate alignment
//! - **INFO**: stage summaries, timing, finished folders
//! - **DEBUG**: intermediate mesh state
//! - **TRACE**: per-operation section timing

use std::fmt::Display;
use std::time::Instant;

use tracing::{Span, debug, info, trace, warn};

use crate::batch::FolderOutcome;

/// A performance timer that logs its duration on drop.
///
/// ```rust,ignore
/// use mesh_dataset::tracing_ext::OperationTimer;
///
/// fn expensive_operation() {
///     let _timer = OperationTimer::new("expensive_operation");
///     // ... do work ...
/// } // Timer logs duration when dropped
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("mesh_operation", operation = name);
        debug!(target: "mesh_dataset::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Create a timer with mesh size fields.
    pub fn with_context(name: &'static str, face_count: usize, vertex_count: usize) -> Self {
        let span = tracing::info_span!(
            "mesh_operation",
            operation = name,
            faces = face_count,
            vertices = vertex_count
        );
        debug!(
            target: "mesh_dataset::timing",
            operation = name,
            faces = face_count,
            vertices = vertex_count,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        info!(
            target: "mesh_dataset::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", elapsed_ms),
            "Operation completed"
        );
    }
}

/// Log mesh statistics at debug level.
pub fn log_mesh_stats(mesh: &crate::Mesh, context: &str) {
    let (min_bounds, max_bounds) = mesh.bounds().unwrap_or_default();
    let dims = max_bounds - min_bounds;

    debug!(
        target: "mesh_dataset::mesh_state",
        context = context,
        vertices = mesh.vertex_count(),
        cells = mesh.face_count(),
        fields = ?mesh.field_names(),
        dimensions = format!("{:.2} x {:.2} x {:.2}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}

/// Log how a folder ended: info on success, warn otherwise.
pub fn log_folder_outcome<T: Display>(id: &str, outcome: &FolderOutcome<T>) {
    match outcome {
        FolderOutcome::Succeeded(summary) => {
            info!(target: "mesh_dataset::batch", folder = id, "Folder done: {}", summary);
        }
        FolderOutcome::Skipped(reason) => {
            warn!(target: "mesh_dataset::batch", folder = id, "Folder skipped: {}", reason);
        }
        FolderOutcome::Failed(error) => {
            warn!(
                target: "mesh_dataset::batch",
                folder = id,
                code = error.code().as_str(),
                "Folder failed: {}",
                error
            );
        }
        FolderOutcome::Cancelled => {
            debug!(target: "mesh_dataset::batch", folder = id, "Folder cancelled");
        }
    }
}

/// Log a performance-critical section at trace level.
///
/// Returns a guard that logs when dropped.
#[must_use]
pub fn log_perf_section(name: &'static str) -> impl Drop {
    struct PerfGuard {
        name: &'static str,
        start: Instant,
    }
    impl Drop for PerfGuard {
        fn drop(&mut self) {
            trace!(
                target: "mesh_dataset::perf",
                section = self.name,
                elapsed_us = self.start.elapsed().as_micros(),
                "Performance section completed"
            );
        }
    }
    PerfGuard {
        name,
        start: Instant::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mesh;
    use crate::batch::SkipReason;
    use crate::error::MeshError;

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::with_context("test_operation", 1, 3);
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10.0);
    }

    #[test]
    fn test_log_helpers_accept_every_outcome() {
        log_mesh_stats(&Mesh::new(), "empty");
        let _section = log_perf_section("section");

        let outcomes: Vec<FolderOutcome<String>> = vec![
            FolderOutcome::Succeeded("3 nodes".to_string()),
            FolderOutcome::Skipped(SkipReason::MissingFile("object.obj".to_string())),
            FolderOutcome::Failed(MeshError::empty_mesh("no vertices")),
            FolderOutcome::Cancelled,
        ];
        for outcome in &outcomes {
            log_folder_outcome("sim", outcome);
        }
    }
}
