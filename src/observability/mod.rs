//! Logging and trace export.
//!
//! ```text
//! tracing macros ─┬→ fmt layer → stderr
//!                 └→ tracing-opentelemetry → FileSpanExporter → JSON lines
//! ```
//!
//! The file export is enabled by `trace_file` in [`Config`](crate::Config).
//! Trace ids captured into worker requests link a user intent to the remote
//! call it caused.
//!
//! - [`init`]: Subscriber setup
//! - [`tracer`]: Tracer provider with file export
//! - [`span_formatter`]: Span to JSON conversion
//! - [`file_writer`]: Size-rotated line writer

mod file_writer;
mod init;
mod span_formatter;
mod tracer;

pub use init::init_tracing;
