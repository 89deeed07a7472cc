// Newline framing for the inbound byte stream
use bytes::BytesMut;

/// Accumulates stream chunks and yields complete newline-terminated lines.
///
/// Holds exactly the unterminated suffix of everything received so far. When
/// `max_line_bytes` is set, any line longer than the cap is dropped whole: the
/// buffered prefix is discarded as soon as it exceeds the cap and the rest of
/// that line is skipped up to the next newline. Whether a line is dropped
/// depends only on its length, never on how the stream was chunked.
#[derive(Debug)]
pub struct LineBuffer {
    pending: BytesMut,
    max_line_bytes: Option<usize>,
    discarding: bool,
    overflows: u64,
}

impl LineBuffer {
    pub fn new(max_line_bytes: Option<usize>) -> Self {
        Self {
            pending: BytesMut::with_capacity(1024),
            max_line_bytes,
            discarding: false,
            overflows: 0,
        }
    }

    /// Append a chunk and return every line it completed, in arrival order,
    /// without the trailing `\n`.
    pub fn append(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if self.exceeds_cap(self.pending.len() + head.len()) {
                self.record_overflow(self.pending.len() + head.len());
                self.pending.clear();
                continue;
            }

            self.pending.extend_from_slice(head);
            let line = self.pending.split();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        if !self.discarding {
            if self.exceeds_cap(self.pending.len() + rest.len()) {
                self.record_overflow(self.pending.len() + rest.len());
                self.pending.clear();
                self.discarding = true;
            } else {
                self.pending.extend_from_slice(rest);
            }
        }

        lines
    }

    /// Bytes currently held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of lines dropped for exceeding the cap.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    fn exceeds_cap(&self, len: usize) -> bool {
        self.max_line_bytes.is_some_and(|max| len > max)
    }

    fn record_overflow(&mut self, len: usize) {
        self.overflows += 1;
        tracing::warn!(
            len,
            max = self.max_line_bytes,
            overflows = self.overflows,
            "inbound line exceeds cap, dropping it"
        );
    }
}
