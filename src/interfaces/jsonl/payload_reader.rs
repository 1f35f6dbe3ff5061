use std::io::{self, BufRead};

/// One non-blank line of a JSON-lines source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadLine {
    /// 1-based line number in the source.
    pub number: usize,
    /// Line content with surrounding ASCII whitespace removed. Not
    /// guaranteed to be UTF-8.
    pub bytes: Vec<u8>,
}

/// Reads raw payloads from a JSON-lines source, one document per line.
///
/// Lines are handed out undecoded so the caller can pick the codec and
/// report a malformed line, invalid UTF-8 included, without stopping the
/// stream.
pub struct PayloadReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> PayloadReader<R> {
    /// Creates a new `PayloadReader` from any buffered source (e.g., a
    /// `BufReader<File>` or locked stdin).
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Returns an iterator that lazily yields the non-blank lines.
    ///
    /// Only I/O failures surface as errors.
    pub fn payloads(self) -> impl Iterator<Item = io::Result<PayloadLine>> {
        self.source
            .split(b'\n')
            .enumerate()
            .filter_map(|(index, line)| match line {
                Ok(bytes) if bytes.trim_ascii().is_empty() => None,
                Ok(bytes) => Some(Ok(PayloadLine {
                    number: index + 1,
                    bytes: bytes.trim_ascii().to_vec(),
                })),
                Err(e) => Some(Err(e)),
            })
    }
}
