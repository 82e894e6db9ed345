//! Line framing and parameter extraction for the AT command link.
//!
//! Commands arrive one byte at a time. [`LineFramer`] accumulates bytes into
//! a fixed-capacity line buffer and, when a CR or LF terminates a non-empty
//! line, copies it into a [`ReadBuffer`] for the dispatcher. The copy is
//! complete before the buffer is handed over, so the consumer never observes
//! a partially written line.
//!
//! Overflow is never an error for the producer: bytes beyond the line
//! capacity are dropped, and copies beyond the read capacity are truncated.

use bytes::{BufMut, BytesMut};
use tracing::{trace, warn};

/// Carriage return, one of the two line terminators.
pub const CR: u8 = b'\r';

/// Line feed, one of the two line terminators.
pub const LF: u8 = b'\n';

/// Separator between a command name and its parameters.
pub const PARAM_START: u8 = b'=';

/// Separator between parameters.
pub const PARAM_SEPARATOR: u8 = b',';

/// Default line buffer capacity, terminator slot included.
pub const DEFAULT_LINE_CAPACITY: usize = 255;

/// Default read buffer capacity.
pub const DEFAULT_READ_CAPACITY: usize = 125;

/// Whether `b` terminates a command line.
pub fn is_terminator(b: u8) -> bool {
    b == CR || b == LF
}

// ---------------------------------------------------------------------------
// ReadBuffer
// ---------------------------------------------------------------------------

/// A completed command line, owned by the consumer side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl ReadBuffer {
    /// Create an empty read buffer holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        ReadBuffer {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Copy `data` into the free space of the buffer.
    ///
    /// The remaining space is checked before copying; anything that does not
    /// fit is truncated. Returns the number of bytes actually copied.
    pub fn copy_from(&mut self, data: &[u8]) -> usize {
        let available = self.capacity - self.buf.len();
        let n = data.len().min(available);
        if n < data.len() {
            warn!(
                len = data.len(),
                available, "line exceeds read buffer space, truncating to fit"
            );
        }
        self.buf.put_slice(&data[..n]);
        n
    }

    /// The buffered line bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The buffered line as text, with invalid UTF-8 replaced.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard the buffered line.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

// ---------------------------------------------------------------------------
// LineFramer
// ---------------------------------------------------------------------------

/// Accumulates received bytes into command lines.
///
/// A line completes when a terminator arrives after at least one
/// non-terminator byte. Terminators are never stored, so a CR+LF pair or a
/// blank line does not produce an empty command.
#[derive(Debug)]
pub struct LineFramer {
    line: BytesMut,
    capacity: usize,
    read_capacity: usize,
}

impl LineFramer {
    /// Create a framer with the given line and read buffer capacities.
    ///
    /// `line_capacity` includes the slot taken by the terminator, so the
    /// longest line that can complete is `line_capacity - 1` bytes.
    pub fn new(line_capacity: usize, read_capacity: usize) -> Self {
        LineFramer {
            line: BytesMut::with_capacity(line_capacity),
            capacity: line_capacity,
            read_capacity,
        }
    }

    /// Number of bytes buffered for the line in progress.
    pub fn pending(&self) -> usize {
        self.line.len()
    }

    /// Feed one received byte.
    ///
    /// Returns the completed line when `b` terminates it. Never blocks and
    /// never fails: bytes that do not fit are dropped.
    pub fn on_byte(&mut self, b: u8) -> Option<ReadBuffer> {
        if self.line.len() >= self.capacity {
            if is_terminator(b) {
                // No room for the terminator: the line never fires. Drop the
                // overflowed content so the next line starts clean.
                warn!(
                    capacity = self.capacity,
                    "line buffer full at terminator, discarding line"
                );
                self.line.clear();
            }
            return None;
        }

        if !is_terminator(b) {
            self.line.put_u8(b);
            return None;
        }

        if self.line.is_empty() {
            // Lone terminator, e.g. the LF of a CR+LF pair.
            return None;
        }

        let mut read = ReadBuffer::with_capacity(self.read_capacity);
        read.copy_from(&self.line);
        trace!(line = %read.to_string_lossy(), "line complete");
        self.line.clear();
        Some(read)
    }

    /// Feed a run of bytes, collecting every completed line.
    pub fn feed(&mut self, data: &[u8]) -> Vec<ReadBuffer> {
        data.iter().filter_map(|&b| self.on_byte(b)).collect()
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        LineFramer::new(DEFAULT_LINE_CAPACITY, DEFAULT_READ_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Parameter extraction
// ---------------------------------------------------------------------------

/// Up to two parameters following a matched command name.
///
/// Absent or empty parameters are `None`, never an empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Params<'a> {
    pub first: Option<&'a str>,
    pub second: Option<&'a str>,
}

impl<'a> Params<'a> {
    /// No parameters.
    pub const NONE: Params<'static> = Params {
        first: None,
        second: None,
    };
}

/// Find the first occurrence of `needle` in `haystack`.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn non_empty_str(piece: &[u8]) -> Option<&str> {
    if piece.is_empty() {
        return None;
    }
    std::str::from_utf8(piece).ok()
}

/// Extract parameters from the bytes that follow a command name.
///
/// If `rest` starts with `=`, the remainder is split on `,` and the first two
/// pieces become the parameters. Otherwise both parameters are `None`.
///
/// # Examples
///
/// ```
/// use lora_per_at::protocol::extract_params;
///
/// let p = extract_params(b"=915000000");
/// assert_eq!(p.first, Some("915000000"));
/// assert_eq!(p.second, None);
///
/// let p = extract_params(b"=1,2");
/// assert_eq!((p.first, p.second), (Some("1"), Some("2")));
///
/// assert_eq!(extract_params(b"").first, None);
/// ```
pub fn extract_params(rest: &[u8]) -> Params<'_> {
    match rest.split_first() {
        Some((&PARAM_START, body)) => {
            let mut pieces = body.split(|&b| b == PARAM_SEPARATOR);
            let first = pieces.next().and_then(non_empty_str);
            let second = pieces.next().and_then(non_empty_str);
            Params { first, second }
        }
        _ => Params::NONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(framer: &mut LineFramer, data: &[u8]) -> Vec<String> {
        framer
            .feed(data)
            .iter()
            .map(ReadBuffer::to_string_lossy)
            .collect()
    }

    // -----------------------------------------------------------------------
    // LineFramer -- terminators
    // -----------------------------------------------------------------------

    #[test]
    fn lf_terminated_line() {
        let mut framer = LineFramer::default();
        assert_eq!(lines(&mut framer, b"AT+HELP\n"), vec!["AT+HELP"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn cr_terminated_line() {
        let mut framer = LineFramer::default();
        assert_eq!(lines(&mut framer, b"AT+START\r"), vec!["AT+START"]);
    }

    #[test]
    fn crlf_fires_once() {
        let mut framer = LineFramer::default();
        assert_eq!(lines(&mut framer, b"AT+SF=9\r\n"), vec!["AT+SF=9"]);
        assert_eq!(framer.pending(), 0);
        // The next line carries no leftover terminator.
        assert_eq!(lines(&mut framer, b"AT+CR=2\r\n"), vec!["AT+CR=2"]);
    }

    #[test]
    fn lone_terminator_never_fires() {
        let mut framer = LineFramer::default();
        assert!(framer.on_byte(LF).is_none());
        assert!(framer.on_byte(CR).is_none());
        assert!(framer.on_byte(LF).is_none());
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn single_byte_line_fires() {
        let mut framer = LineFramer::default();
        assert!(framer.on_byte(b'A').is_none());
        let line = framer.on_byte(LF).unwrap();
        assert_eq!(line.as_bytes(), b"A");
    }

    #[test]
    fn partial_deliveries_accumulate() {
        let mut framer = LineFramer::default();
        assert!(framer.feed(b"AT+FR").is_empty());
        assert!(framer.feed(b"EQ=9150").is_empty());
        assert_eq!(framer.pending(), 12);
        assert_eq!(lines(&mut framer, b"00000\n"), vec!["AT+FREQ=915000000"]);
    }

    #[test]
    fn several_lines_in_one_delivery() {
        let mut framer = LineFramer::default();
        assert_eq!(
            lines(&mut framer, b"AT+SF=8\nAT+BW=250\r\n\nAT+START\r"),
            vec!["AT+SF=8", "AT+BW=250", "AT+START"]
        );
    }

    /// A line fires iff a terminator follows at least one non-terminator
    /// byte since the last completion.
    #[test]
    fn fires_iff_content_precedes_terminator() {
        let input = b"\n\rA\n\n\rBC\r\r\nD";
        let mut framer = LineFramer::default();
        let mut seen_content = false;
        for &b in input {
            let fired = framer.on_byte(b).is_some();
            let expected = is_terminator(b) && seen_content;
            assert_eq!(fired, expected, "byte {b:#04x}");
            if fired {
                seen_content = false;
            } else if !is_terminator(b) {
                seen_content = true;
            }
        }
    }

    // -----------------------------------------------------------------------
    // LineFramer -- overflow
    // -----------------------------------------------------------------------

    #[test]
    fn full_line_without_terminator_never_fires() {
        let mut framer = LineFramer::new(8, 8);
        assert!(framer.feed(b"ABCDEFGH").is_empty());
        assert_eq!(framer.pending(), 8);
    }

    #[test]
    fn terminator_past_capacity_is_dropped() {
        let mut framer = LineFramer::new(8, 8);
        assert!(framer.feed(b"ABCDEFGH").is_empty());
        assert!(framer.on_byte(LF).is_none());
        // The overflowed line is gone; the framer recovers on the next line.
        assert_eq!(framer.pending(), 0);
        assert_eq!(lines(&mut framer, b"AT\n"), vec!["AT"]);
    }

    #[test]
    fn excess_bytes_dropped_silently() {
        let mut framer = LineFramer::new(4, 4);
        assert!(framer.feed(b"ABCDEFG").is_empty());
        assert_eq!(framer.pending(), 4);
    }

    #[test]
    fn longest_line_that_fits() {
        let mut framer = LineFramer::new(8, 16);
        assert_eq!(lines(&mut framer, b"ABCDEFG\n"), vec!["ABCDEFG"]);
    }

    #[test]
    fn copy_truncated_to_read_capacity() {
        let mut framer = LineFramer::new(32, 4);
        let line = framer.feed(b"AT+FREQ=1\n").pop().unwrap();
        assert_eq!(line.as_bytes(), b"AT+F");
        assert_eq!(line.capacity(), 4);
    }

    // -----------------------------------------------------------------------
    // ReadBuffer
    // -----------------------------------------------------------------------

    #[test]
    fn read_buffer_checks_remaining_space() {
        let mut buf = ReadBuffer::with_capacity(6);
        assert_eq!(buf.copy_from(b"AT+"), 3);
        assert_eq!(buf.copy_from(b"PER=1"), 3);
        assert_eq!(buf.as_bytes(), b"AT+PER");
        assert_eq!(buf.copy_from(b"X"), 0);
        buf.clear();
        assert!(buf.is_empty());
    }

    // -----------------------------------------------------------------------
    // Parameter extraction
    // -----------------------------------------------------------------------

    #[test]
    fn params_none_without_equals() {
        assert_eq!(extract_params(b""), Params::NONE);
        assert_eq!(extract_params(b" 12"), Params::NONE);
        assert_eq!(extract_params(b",12"), Params::NONE);
    }

    #[test]
    fn params_one_and_two() {
        let p = extract_params(b"=14");
        assert_eq!((p.first, p.second), (Some("14"), None));

        let p = extract_params(b"=868000000,3");
        assert_eq!((p.first, p.second), (Some("868000000"), Some("3")));
    }

    #[test]
    fn params_empty_pieces_are_none() {
        assert_eq!(extract_params(b"="), Params::NONE);

        let p = extract_params(b"=,5");
        assert_eq!((p.first, p.second), (None, Some("5")));

        let p = extract_params(b"=5,");
        assert_eq!((p.first, p.second), (Some("5"), None));
    }

    #[test]
    fn params_beyond_second_ignored() {
        let p = extract_params(b"=1,2,3");
        assert_eq!((p.first, p.second), (Some("1"), Some("2")));
    }

    #[test]
    fn params_invalid_utf8_is_none() {
        let p = extract_params(&[b'=', 0xFF, 0xFE, b',', b'7']);
        assert_eq!((p.first, p.second), (None, Some("7")));
    }

    #[test]
    fn find_subslice_positions() {
        assert_eq!(find_subslice(b"AT+FREQ=1", b"AT+FREQ"), Some(0));
        assert_eq!(find_subslice(b"xxAT+SF=7", b"AT+SF"), Some(2));
        assert_eq!(find_subslice(b"AT+S", b"AT+SF"), None);
        assert_eq!(find_subslice(b"AT", b""), None);
    }
}
