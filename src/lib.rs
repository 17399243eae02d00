//! OpenCL-offloaded repeating-key XOR masking.
//!
//! Applies a byte-wise XOR of a data stream against a repeating key on
//! an OpenCL compute device. Per-byte work is independent, so the whole
//! payload dispatches as one 1-D parallel job.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │  Host (CPU)  │────▶│  OpenCL Device   │────▶│  Host (CPU) │
//! │  data + key  │     │  one work-item   │     │  masked     │
//! │  payloads    │     │  per data byte   │     │  output     │
//! └──────────────┘     └──────────────────┘     └─────────────┘
//! ```
//!
//! The host side is strictly sequential: select a device, build the
//! transform program, allocate and upload buffers, dispatch, drain the
//! queue, download. Every stage either succeeds or aborts the run;
//! device resources are released on all paths by scope.
//!
//! # Usage
//!
//! ```rust,no_run
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use clxor::engine::XorEngine;
//!
//! let engine = XorEngine::new()?;
//! println!("Using device: {}", engine.device_name());
//!
//! let masked = engine.apply(b"some payload", b"secret")?;
//! let original = engine.apply(&masked, b"secret")?;
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod engine;
pub mod io;
pub mod program;
pub mod xor;

/// Error types for clxor operations.
///
/// Every failure is terminal for the current run; there are no retries.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClxorError {
    /// No OpenCL platform is installed on this host.
    NoPlatform,
    /// No platform yielded a usable device of the requested class.
    NoDevice,
    /// The device could not satisfy a buffer allocation.
    Allocation(String),
    /// Program compilation or entry-point resolution failed.
    /// Carries the captured compiler build log.
    Build(String),
    /// A host/device copy failed or was rejected at the boundary.
    Transfer(String),
    /// Kernel enqueue failed.
    Dispatch(String),
    /// The device reported an error while draining the queue.
    Execution(String),
    /// The key payload is empty; wraparound indexing needs at least one byte.
    EmptyKey,
    /// A device capability query failed. Never fatal to the pipeline.
    Query(String),
    /// Host file I/O failed.
    Io(String),
}

impl std::fmt::Display for ClxorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPlatform => write!(f, "no OpenCL platform available"),
            Self::NoDevice => write!(f, "no usable compute device found"),
            Self::Allocation(msg) => write!(f, "device allocation failed: {msg}"),
            Self::Build(log) => write!(f, "program build failed: {log}"),
            Self::Transfer(msg) => write!(f, "buffer transfer failed: {msg}"),
            Self::Dispatch(msg) => write!(f, "kernel dispatch failed: {msg}"),
            Self::Execution(msg) => write!(f, "device execution failed: {msg}"),
            Self::EmptyKey => write!(f, "key must not be empty"),
            Self::Query(msg) => write!(f, "device query failed: {msg}"),
            Self::Io(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ClxorError {}

pub type ClxorResult<T> = Result<T, ClxorError>;
