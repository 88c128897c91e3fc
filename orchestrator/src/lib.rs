//! Drives the node staking scenario against a deployed `node_staking` program.
//!
//! The scenario is a fixed, ordered list of remote calls. Each call is
//! confirmed before the next one is sent, and the observable effects of the
//! calls are checked against the ledger as the run progresses.

pub mod addresses;
pub mod config;
pub mod error;
pub mod ledger;
pub mod report;
pub mod scenario;

pub use addresses::Addresses;
pub use config::{Config, ReportFormat};
pub use error::{OrchestratorError, Result};
pub use ledger::{PoolParams, PresaleParams, RpcLedger, StakingLedger};
pub use report::Report;
pub use scenario::{Scenario, ScenarioParams, ScenarioRun};
