//! llvmpack library exports.
//!
//! Exposes the pipeline components for integration testing; the binary
//! in `main.rs` is a thin CLI over these modules.

pub mod build;
pub mod bundle;
pub mod config;
pub mod download;
pub mod inspect;
pub mod pipeline;
pub mod process;
pub mod publish;
pub mod release;
pub mod retry;
pub mod target;
pub mod version;
