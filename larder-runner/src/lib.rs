//! LARDER Runner - Job Execution and CLI Support
//!
//! Drives proxy chains from JSON job descriptions and reports what each
//! command did, how long it took and how many reads reached the store.

pub mod config;
pub mod demo;
pub mod job;
pub mod report;
pub mod telemetry;

pub use config::{JobDefaults, LogFormat, RunnerConfig, CONFIG_ENV};
pub use demo::demo_jobs;
pub use job::{parse_jobs, read_jobs, Action, InventoryCommand, InventoryJob, JobRunner};
pub use report::{BatchReport, CacheSummary, CommandLog, JobOptions, JobReport, Outcome};
pub use telemetry::init_tracing;
