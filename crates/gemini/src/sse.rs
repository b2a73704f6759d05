//! Server-sent event decoding for `?alt=sse` responses.

use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use world_core::{Chunk, ChunkStream, GenerationError};

use crate::wire::GenerateContentResponse;

/// Incremental SSE parser. Feed it raw body bytes, get back the `data`
/// payload of every event completed so far.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, GenerationError> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = decode_line(&line)?;
            if let Some(event) = self.feed_line(line) {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Flushes whatever is left once the body has ended.
    pub fn finish(&mut self) -> Result<Option<String>, GenerationError> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = decode_line(&rest)?;
            if let Some(event) = self.feed_line(line) {
                return Ok(Some(event));
            }
        }
        Ok(self.take_event())
    }

    fn feed_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.take_event();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}

fn decode_line(bytes: &[u8]) -> Result<&str, GenerationError> {
    let line = std::str::from_utf8(bytes)
        .map_err(|e| GenerationError::Malformed(format!("invalid UTF-8 in event stream: {e}")))?;
    Ok(line.trim_end_matches(|c| c == '\n' || c == '\r'))
}

fn parse_event(data: &str) -> Result<Option<Chunk>, GenerationError> {
    serde_json::from_str::<GenerateContentResponse>(data)
        .map_err(|e| GenerationError::Malformed(format!("invalid event payload: {e}")))?
        .into_chunk()
}

struct Decoding<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

impl<S> Decoding<S> {
    fn fail(&mut self) {
        self.done = true;
        self.pending.clear();
    }
}

/// Turns a response body into text chunks. The stream ends after the first error.
pub fn chunk_stream<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = Decoding {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(data) = st.pending.pop_front() {
                match parse_event(&data) {
                    Ok(Some(chunk)) => return Some((Ok(chunk), st)),
                    Ok(None) => continue,
                    Err(err) => {
                        st.fail();
                        return Some((Err(err), st));
                    }
                }
            }
            if st.done {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(bytes)) => match st.decoder.push(bytes.as_ref()) {
                    Ok(events) => st.pending.extend(events),
                    Err(err) => {
                        st.fail();
                        return Some((Err(err), st));
                    }
                },
                Some(Err(err)) => {
                    st.fail();
                    return Some((Err(GenerationError::Transport(err.to_string())), st));
                }
                None => {
                    st.done = true;
                    match st.decoder.finish() {
                        Ok(Some(event)) => st.pending.push_back(event),
                        Ok(None) => {}
                        Err(err) => return Some((Err(err), st)),
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(parts: Vec<&'static [u8]>) -> Vec<Result<Chunk, GenerationError>> {
        let body = stream::iter(parts.into_iter().map(Ok::<_, std::io::Error>));
        futures::executor::block_on(chunk_stream(body).collect())
    }

    fn event(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{text}\"}}]}}}}]}}\r\n\r\n"
        )
    }

    #[test]
    fn test_decoder_handles_split_lines() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\"").unwrap().is_empty());
        assert!(decoder.push(b":1}\n").unwrap().is_empty());
        assert_eq!(decoder.push(b"\n").unwrap(), vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_decoder_joins_multiline_data_and_skips_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder
            .push(b": keep-alive\r\nevent: message\r\ndata: one\r\ndata:two\r\n\r\n")
            .unwrap();
        assert_eq!(events, vec!["one\ntwo".to_string()]);
    }

    #[test]
    fn test_decoder_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap(), Some("tail".to_string()));
        assert_eq!(decoder.finish().unwrap(), None);
    }

    #[test]
    fn test_decoder_rejects_invalid_utf8() {
        let mut decoder = SseDecoder::new();
        assert!(matches!(
            decoder.push(b"data: \xff\xfe\n"),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_multibyte_text_split_across_reads() {
        let body = event("Hello 🌍");
        let bytes: &'static [u8] = Box::leak(body.into_bytes().into_boxed_slice());
        // Split inside the emoji.
        let split = bytes.iter().position(|&b| b == 0xF0).unwrap() + 2;
        let items = collect(vec![&bytes[..split], &bytes[split..]]);
        assert_eq!(items, vec![Ok(Chunk::new("Hello 🌍"))]);
    }

    #[test]
    fn test_stream_yields_chunks_in_order() {
        let body: &'static str = Box::leak(format!("{}{}", event("Hel"), event("lo")).into_boxed_str());
        let items = collect(vec![body.as_bytes()]);
        assert_eq!(items, vec![Ok(Chunk::new("Hel")), Ok(Chunk::new("lo"))]);
    }

    #[test]
    fn test_stream_stops_after_bad_payload() {
        let body: &'static str =
            Box::leak(format!("{}data: not json\n\n{}", event("a"), event("b")).into_boxed_str());
        let items = collect(vec![body.as_bytes()]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok(Chunk::new("a")));
        assert!(matches!(items[1], Err(GenerationError::Malformed(_))));
    }

    #[test]
    fn test_transport_error_ends_stream() {
        let body = stream::iter(vec![
            Ok(b"data: {\"candidates\":[]}\n\n".to_vec()),
            Err("connection reset"),
            Ok(b"never read".to_vec()),
        ]);
        let items: Vec<_> = futures::executor::block_on(chunk_stream(body).collect());
        assert_eq!(
            items,
            vec![Err(GenerationError::Transport("connection reset".to_string()))]
        );
    }
}
