/// Prefix marking a line as an event record. The delimiter convention lives
/// here and nowhere else.
pub const RECORD_PREFIX: &str = "data: ";

/// Rebuilds complete event records from arbitrarily-chunked bytes.
///
/// Transport-level chunking can split one logical record across reads, or
/// pack several into one. Bytes are buffered until a newline completes a
/// line; only lines carrying [`RECORD_PREFIX`] are forwarded, with the
/// prefix stripped.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    tail: Vec<u8>,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk; returns the payloads of every record it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut records = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.tail.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];
            let line = std::mem::take(&mut self.tail);
            if let Some(payload) = payload_of(&line) {
                records.push(payload);
            }
        }
        self.tail.extend_from_slice(rest);
        records
    }

    /// Consumes the reassembler at channel close. A non-empty remainder is a
    /// partial line that never terminated; it is returned for diagnostics and
    /// must not be treated as a record.
    pub fn finish(self) -> Option<String> {
        if self.tail.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.tail).into_owned())
        }
    }
}

fn payload_of(line: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim_end_matches('\r');
    trimmed.strip_prefix(RECORD_PREFIX).map(str::to_string)
}
