//! Audit trace: line-range attribution and the ledger writer.

pub mod ranges;
pub mod writer;

pub use writer::TraceWriterHook;
