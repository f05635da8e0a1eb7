//! Hikari collector: cost observability for multi-step LLM workflows.
//!
//! Ingests OTLP-JSON trace spans carrying the `hikari.*` attribute
//! vocabulary, buffers them through database outages, persists them into a
//! TimescaleDB hypertable, and serves pipeline-level cost aggregation with
//! honest partial-coverage reporting.

pub mod api;
mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
