//! SectorPulse Runner — collection runs, persistence, scoring and reports.
//!
//! This crate builds on `sectorpulse-core` to provide:
//! - Configuration loading with environment overrides for secrets
//! - SQLite store with keyed upserts and named migrations
//! - Per-market collection pipeline with failure isolation
//! - Benchmark (sector ETF / index) collection feeding weekly momentum
//! - Cross-country scoring pass
//! - Daily report, sector and country detail views, message chunking
//! - Notification channel (Telegram or stdout)

pub mod benchmark;
pub mod config;
pub mod notify;
pub mod pipeline;
pub mod reporting;
pub mod scoring;
pub mod sources;
pub mod store;

pub use benchmark::{collect_benchmarks, default_benchmarks, BenchmarkSummary, BenchmarkTicker};
pub use config::{AppConfig, ConfigError, SourceConfig, SourceKind, TelegramConfig};
pub use notify::{deliver, Notifier, NotifyError, StdoutNotifier, TelegramNotifier};
pub use pipeline::{
    collect_market, collect_markets, CollectError, CollectOutcome, CollectionSummary, RunReport,
    TargetResult,
};
pub use reporting::{
    chunk_blocks, render_abnormal_report, render_country_detail, render_daily_report,
    render_sector_detail, render_trending, MESSAGE_LIMIT,
};
pub use scoring::run_scoring;
pub use sources::{build_adapter, ConfiguredSources, SourceFactory};
pub use store::{Store, StoreError, StoredInstrument};
