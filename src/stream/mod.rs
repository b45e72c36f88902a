//! Server-sent log streaming: framing, the background reader, and the consumer loop.

pub mod consumer;
pub mod reader;
pub mod sse;

pub use consumer::{consume_stream, ConsumeOutcome, ConsumerState};
pub use reader::LogStream;
