//! Line framing for `text/event-stream` bodies.
//!
//! Only `data: ` lines carry payloads; everything else (comments, `event:`,
//! `id:`, the blank separator lines) is skipped.

use crate::utils::constants::{SSE_DATA_PREFIX, SSE_DONE_SENTINEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseFrame<'a> {
    /// Payload of a `data: ` line.
    Data(&'a str),
    /// `data: [DONE]`, the end of the stream.
    Done,
    Skip,
}

pub fn classify_line(line: &str) -> SseFrame<'_> {
    let line = line.trim();
    if line.is_empty() {
        return SseFrame::Skip;
    }
    match line.strip_prefix(SSE_DATA_PREFIX) {
        Some(SSE_DONE_SENTINEL) => SseFrame::Done,
        Some(payload) => SseFrame::Data(payload),
        None => SseFrame::Skip,
    }
}

/// Reassembles `\n`-terminated lines from arbitrarily split body chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed, without the terminator.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    /// Whatever is left after the body ended without a final newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}
