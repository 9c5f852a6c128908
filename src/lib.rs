//! Prometheus exporter for Tencent Cloud resource inventory.
//!
//! On each scrape the exporter lists resources through the Tencent Cloud
//! APIs and republishes them as presence gauges (value `1` per live
//! resource), labeled with per-resource identity fields.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Tencent Cloud  │<───>│    Registry     │<────│   HTTP Server   │
//! │  (es, cbs APIs) │     │  + Collectors   │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Every scrape is an independent fetch-map-encode cycle: collectors
//! paginate their list APIs through a shared authenticated transport, map
//! each returned item to one sample, and the registry renders the outcome.
//! Nothing is cached between scrapes.
//!
//! # Usage
//!
//! Export credentials and run the binary:
//!
//! ```bash
//! export TENCENTCLOUD_SECRET_ID=...
//! export TENCENTCLOUD_SECRET_KEY=...
//! tcinfo-exporter --config config.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod cbs;
pub mod client;
pub mod collector;
pub mod config;
pub mod credentials;
pub mod es;
pub mod http;
pub mod registry;

pub use cbs::CbsDisks;
pub use client::{ApiError, ApiRequest, ApiTransport, CloudClient};
pub use collector::{Collector, Descriptor, ResourceCollector, Sample};
pub use config::ExporterConfig;
pub use credentials::Credentials;
pub use es::EsInstances;
pub use http::HttpServer;
pub use registry::Registry;
