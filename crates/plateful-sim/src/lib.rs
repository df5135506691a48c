//! Plateful Sim - workload simulator for the social ledger
//!
//! Drives the ledger with a seeded random workload on an in-memory store
//! and audits the invariants that must hold afterwards.

#![warn(unreachable_pub)]

pub mod logging;
pub mod simulator;

pub use simulator::{
    run_simulator, run_workload, ExpectedResult, SimulatedOperation, SimulatedWorld,
    SimulatorConfig, SimulatorReport, SimulatorStats, Violation,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
