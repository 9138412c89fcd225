use std::collections::VecDeque;

use crate::error::{ChatError, Result};

/// Byte buffer that reassembles SSE frames from arbitrarily split chunks.
///
/// Lines end at LF, CRLF or a bare CR. They are drained out of a `VecDeque`;
/// `data:` lines accumulate until a blank line closes the frame. Comment lines and the `event:`/`id:`/`retry:`
/// fields are ignored since the backend puts everything in `data`.
pub struct SseFrameBuffer {
    buffer: VecDeque<u8>,
    data_lines: Vec<String>,
}

impl SseFrameBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            data_lines: Vec::new(),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete frame payload, or `None` until more bytes arrive
    pub fn next_frame(&mut self) -> Option<Result<String>> {
        while let Some(line) = self.next_line() {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };

            if line.is_empty() {
                if self.data_lines.is_empty() {
                    continue;
                }
                return Some(Ok(self.take_frame()));
            }

            self.push_field(&line);
        }
        None
    }

    /// Flush whatever is left once the body has ended. A final frame is not
    /// always followed by a blank line.
    pub fn finish(&mut self) -> Option<Result<String>> {
        if !self.buffer.is_empty() {
            let rest: Vec<u8> = self.buffer.drain(..).collect();
            match String::from_utf8(rest) {
                Ok(line) => self.push_field(line.trim_end_matches(['\r', '\n'])),
                Err(e) => return Some(Err(ChatError::Stream(format!("Invalid UTF-8: {}", e)))),
            }
        }

        if self.data_lines.is_empty() {
            None
        } else {
            Some(Ok(self.take_frame()))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.data_lines.is_empty()
    }

    fn next_line(&mut self) -> Option<Result<String>> {
        let end = self.buffer.iter().position(|&b| b == b'\n' || b == b'\r')?;
        let terminator_len = match (self.buffer[end], self.buffer.get(end + 1)) {
            (b'\r', Some(b'\n')) => 2,
            // A trailing CR may be the first half of a CRLF split across chunks
            (b'\r', None) => return None,
            _ => 1,
        };

        let line_bytes: Vec<u8> = self.buffer.drain(..end).collect();
        self.buffer.drain(..terminator_len);

        match String::from_utf8(line_bytes) {
            Ok(line) => Some(Ok(line)),
            Err(e) => Some(Err(ChatError::Stream(format!("Invalid UTF-8: {}", e)))),
        }
    }

    fn push_field(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data_lines
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
    }

    fn take_frame(&mut self) -> String {
        let frame = self.data_lines.join("\n");
        self.data_lines.clear();
        frame
    }
}
