//! Ingest decoding and validation (stage 1 of the write path)
//!
//! Parses the OTLP-JSON envelope, flattens attributes, and classifies each
//! span as accepted-with-record or rejected-with-reason. The HTTP handler
//! enqueues the accepted records and reports the rejections; nothing here
//! touches the buffer or the database.

mod decode;
mod validate;

pub use decode::ExportTraceRequest;
pub use validate::{IngestOutcome, RejectReason, SpanRejection, process_request};
