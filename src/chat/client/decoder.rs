use std::collections::VecDeque;

use bytes::Bytes;
use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use serde::Deserialize;

use crate::chat::error::ChatResult;

pub type ByteStream = BoxStream<'static, ChatResult<Bytes>>;
pub type FragmentStream = BoxStream<'static, ChatResult<String>>;

/// An unparseable line is re-attempted with at most this many following lines.
const MAX_CARRY_LINES: usize = 4;
const MAX_CARRY_BYTES: usize = 64 * 1024;

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl StreamChunk {
    fn into_text(self) -> Option<String> {
        self.choices.into_iter().next()?.delta?.content
    }
}

/// What a single event-stream line turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Fragment(String),
    /// Parsed fine, carried no text.
    Consumed,
    /// Not a complete payload, retry it joined with the next line.
    NeedsMore,
}

pub fn parse_line(line: &str) -> LineOutcome {
    let Some(payload) = line.strip_prefix("data:") else {
        return LineOutcome::NeedsMore;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => match chunk.into_text() {
            Some(text) if !text.is_empty() => LineOutcome::Fragment(text),
            _ => LineOutcome::Consumed,
        },
        Err(_) => LineOutcome::NeedsMore,
    }
}

fn is_terminator(line: &str) -> bool {
    line.strip_prefix("data:").map(str::trim) == Some("[DONE]")
}

/// Incremental event-stream decoder. Bytes go in through [`feed`](Self::feed), text
/// fragments come out in upstream order. Only the current partial line and a bounded
/// carry are held, never the answer itself.
#[derive(Debug, Default)]
pub struct FragmentDecoder {
    utf8_tail: Vec<u8>,
    buffer: String,
    carry: String,
    carried_lines: usize,
    started: bool,
    done: bool,
}

impl FragmentDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `[DONE]` was seen or [`finish`](Self::finish) ran.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut fragments = Vec::new();
        if self.done {
            return fragments;
        }

        let text = self.decode_utf8(chunk);
        self.buffer.push_str(&text);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].find('\n') {
            let end = start + offset;
            let line = self.buffer[start..end].trim_end_matches('\r').to_string();
            start = end + 1;

            if !self.resolve(&line, &mut fragments) {
                self.stop();
                return fragments;
            }
        }
        self.buffer.drain(..start);

        fragments
    }

    /// Flushes an unterminated last line once the body has ended.
    pub fn finish(&mut self) -> Vec<String> {
        let mut fragments = Vec::new();
        if self.done {
            return fragments;
        }

        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }

        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim_end_matches('\r');
        if !rest.is_empty() {
            self.resolve(rest, &mut fragments);
        }

        if !self.carry.is_empty() {
            log::warn!(
                "stream ended with {} bytes that never parsed, discarding them",
                self.carry.len()
            );
        }

        self.stop();
        fragments
    }

    /// Returns false when the terminator was reached.
    fn resolve(&mut self, line: &str, fragments: &mut Vec<String>) -> bool {
        if line.starts_with(':') {
            self.clear_carry();
            return true;
        }
        if is_terminator(line) {
            return false;
        }
        if line.is_empty() {
            return true;
        }

        let outcome = match self.carry.is_empty() {
            true => parse_line(line),
            false => self.recover(line),
        };

        match outcome {
            LineOutcome::Fragment(text) => self.emit(text, fragments),
            LineOutcome::Consumed => (),
            LineOutcome::NeedsMore => self.recirculate(line),
        }

        true
    }

    fn recover(&mut self, line: &str) -> LineOutcome {
        let joined = format!("{}{}", self.carry, line);

        match parse_line(&joined) {
            LineOutcome::NeedsMore => match parse_line(line) {
                LineOutcome::NeedsMore => LineOutcome::NeedsMore,
                outcome => {
                    log::debug!(
                        "dropping {} carried bytes, the next line parsed on its own",
                        self.carry.len()
                    );
                    self.clear_carry();
                    outcome
                }
            },
            outcome => {
                self.clear_carry();
                outcome
            }
        }
    }

    fn recirculate(&mut self, line: &str) {
        self.carry.push_str(line);
        self.carried_lines += 1;

        if self.carried_lines > MAX_CARRY_LINES || self.carry.len() > MAX_CARRY_BYTES {
            log::warn!(
                "giving up on {} bytes of stream data after {} lines",
                self.carry.len(),
                self.carried_lines
            );
            self.clear_carry();
        }
    }

    fn emit(&mut self, text: String, fragments: &mut Vec<String>) {
        if self.started {
            fragments.push(text);
            return;
        }

        let trimmed = text.trim_start();
        if trimmed.is_empty() {
            return;
        }

        self.started = true;
        fragments.push(trimmed.to_string());
    }

    fn clear_carry(&mut self) {
        self.carry.clear();
        self.carried_lines = 0;
    }

    fn stop(&mut self) {
        self.done = true;
        self.buffer.clear();
        self.utf8_tail.clear();
        self.clear_carry();
    }

    // a multibyte character may straddle two chunks, only an incomplete tail is kept
    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        self.utf8_tail.extend_from_slice(chunk);

        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.utf8_tail) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.utf8_tail.clear();
                    return text;
                }
                Err(e) => {
                    let (end, complete) = match e.error_len() {
                        Some(invalid) => (e.valid_up_to() + invalid, false),
                        None => (e.valid_up_to(), true),
                    };
                    text.push_str(&String::from_utf8_lossy(&self.utf8_tail[..end]));
                    self.utf8_tail.drain(..end);

                    if complete {
                        return text;
                    }
                }
            }
        }
    }
}

struct DecodeState {
    body: ByteStream,
    decoder: FragmentDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

/// Lazily decodes `body` into fragments. The body is not polled past `[DONE]`,
/// and a read error ends the sequence right after it is yielded.
pub fn decode_fragments(body: ByteStream) -> FragmentStream {
    let state = DecodeState {
        body,
        decoder: FragmentDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.ready.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let fragments = state.decoder.feed(&chunk);
                    state.ready.extend(fragments);
                    state.finished = state.decoder.is_done();
                }
                Some(Err(error)) => {
                    state.finished = true;
                    state.ready.clear();
                    return Some((Err(error), state));
                }
                None => {
                    let fragments = state.decoder.finish();
                    state.ready.extend(fragments);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
