//! Script scheduling for vigil.
//!
//! This crate provides:
//! - `Runner` — the periodic scheduling loop driving script executions
//! - `Sandbox` — collaborator trait for the script execution environment
//! - `ScriptContext` — the capability bundle handed to each execution

pub mod runner;
pub mod sandbox;

pub use runner::{Runner, RunnerError, RunnerState};
pub use sandbox::{Sandbox, SandboxError, ScriptContext};
