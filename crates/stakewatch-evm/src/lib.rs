//! stakewatch-evm — EVM scraper, reconciliation engine, and poll loop.

pub mod builder;
pub mod client;
pub mod monitor;
pub mod scraper;

pub use builder::MonitorBuilder;
pub use client::{BlockHeader, LogFilter, RawLog, RpcClient, StateReader};
pub use monitor::{NetworkMonitor, PollSummary};
pub use scraper::{ReconcileResult, Reconciler};
