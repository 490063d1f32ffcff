//! Cipherflow - Asynchronous MPC computation orchestration
//!
//! This library coordinates the off-chain multi-party computations a
//! confidential ledger exchange delegates for price matching, fill
//! calculation, and PnL calculation, and writes the results back on-chain
//! via callback transactions.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use cipherflow::alert::TracingAlertSink;
//! use cipherflow::config::OrchestratorConfig;
//! use cipherflow::orchestrator::Orchestrator;
//!
//! let config = OrchestratorConfig::new(program, counters_account);
//! let orchestrator = Orchestrator::new(config, ledger, locks, Arc::new(TracingAlertSink::new()));
//!
//! orchestrator.start().await?;
//! // ... results are discovered, deduplicated, and called back ...
//! orchestrator.stop().await?;
//! ```
//!
//! Results are discovered through two independent paths (periodic account
//! polling and a log-stream subscription), deduplicated per correlation id,
//! and each callback is submitted at most once under a cluster-wide writer
//! lease.

pub mod alert;
pub mod backend;
pub mod codec;
pub mod config;
pub mod dedup;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod logging;
pub mod notify;
pub mod orchestrator;
pub mod poller;
pub mod processor;
pub mod registry;
pub mod status;
pub mod subscription;
pub mod types;

pub use backend::ComputationBackend;
pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use status::{PollerStatus, SubscriptionStatus};
pub use types::{AccountRef, ComputationKind, CorrelationId, RequestStatus, Signature};

/// Version of the cipherflow library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
