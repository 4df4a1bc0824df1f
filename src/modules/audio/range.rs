//! Byte-range handling for the artifact endpoint.
//!
//! The grammar accepted is the single-range form `bytes=start-end`,
//! `bytes=start-` or `bytes=-suffix`. Anything else (including multipart
//! ranges) is treated exactly like an absent header, per RFC 9110's
//! permission to ignore Range, because podcast clients send a long tail of
//! malformed values.

/// A parsed header before clamping: `(start, end)` with `end` exclusive.
/// `start` may be negative for suffix ranges (`-500` -> start = -500).
type RawRange = (Option<i64>, Option<i64>);

/// What the response should look like for a given header and file size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Span {
    /// Plain 200 serving the entire file.
    Full { size: u64 },
    /// 206 serving `length` bytes from `start`; `start + length <= size`.
    Partial { start: u64, length: u64, size: u64 },
    /// 416 with `Content-Range: bytes */size`.
    Unsatisfiable { size: u64 },
}

impl Span {
    pub fn content_length(&self) -> u64 {
        match *self {
            Span::Full { size } => size,
            Span::Partial { length, .. } => length,
            Span::Unsatisfiable { .. } => 0,
        }
    }

    /// `Content-Range` value for 206 and 416 responses.
    pub fn content_range(&self) -> Option<String> {
        match *self {
            Span::Full { .. } => None,
            Span::Partial { start, length, size } => {
                Some(format!("bytes {}-{}/{}", start, start + length - 1, size))
            }
            Span::Unsatisfiable { size } => Some(format!("bytes */{size}")),
        }
    }
}

/// Computes the span to serve for an optional `Range` header value.
pub fn resolve(range_header: Option<&str>, size: u64) -> Span {
    let Some(raw) = range_header.and_then(parse) else {
        return Span::Full { size };
    };
    clamp(raw, size)
}

/// Parses a `Range` header value. Returns `None` for anything syntactically
/// off, which callers must treat as "no range requested".
fn parse(header: &str) -> Option<RawRange> {
    let (unit, value) = header.split_once('=')?;
    if unit.trim() != "bytes" {
        return None;
    }
    let value = value.trim();
    let (start_s, end_s) = value.split_once('-')?;
    let start = parse_bound(start_s)?;
    let end = parse_bound(end_s)?;
    match (start, end) {
        // "-500": the last 500 bytes. "-0" stays as-is and is rejected later.
        (None, Some(suffix)) if suffix != 0 => Some((Some(-suffix), None)),
        (None, Some(suffix)) => Some((None, Some(suffix))),
        // "0-99" means bytes 0..=99; store the end exclusively. An end
        // before the start makes the whole header invalid.
        (Some(start), Some(end)) if end >= start => Some((Some(start), Some(end + 1))),
        (Some(_), Some(_)) => None,
        (start, None) => Some((start, None)),
    }
}

fn parse_bound(s: &str) -> Option<Option<i64>> {
    if s.is_empty() {
        return Some(None);
    }
    s.parse::<i64>().ok().map(Some)
}

fn clamp(raw: RawRange, size: u64) -> Span {
    let (start, end) = raw;
    let size_i = size as i64;

    // Unsatisfiable exactly when the first requested byte is at or past the
    // end of the file, or a zero-length suffix was asked for.
    if start.is_some_and(|s| s >= size_i) || end == Some(0) {
        return Span::Unsatisfiable { size };
    }

    let start = match start {
        Some(s) if s < 0 => (size_i + s).max(0),
        Some(s) => s,
        None => 0,
    };
    let end = match end {
        Some(e) if e > size_i => size_i,
        Some(e) => e,
        None => size_i,
    };
    let length = (end - start).max(0) as u64;

    // Serving every byte is a plain 200 even when a Range header asked for
    // it; some players refuse a 206 reply to `bytes=0-`.
    if length == size {
        Span::Full { size }
    } else {
        Span::Partial {
            start: start as u64,
            length,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_header_serves_whole_file() {
        assert_eq!(resolve(None, 1000), Span::Full { size: 1000 });
    }

    #[test]
    fn open_ended_from_zero_is_a_plain_200() {
        assert_eq!(resolve(Some("bytes=0-"), 1000), Span::Full { size: 1000 });
    }

    #[test]
    fn prefix_range_is_partial() {
        assert_eq!(
            resolve(Some("bytes=0-99"), 1000),
            Span::Partial {
                start: 0,
                length: 100,
                size: 1000
            }
        );
    }

    #[test]
    fn partial_content_range_header() {
        let span = resolve(Some("bytes=0-99"), 1000);
        assert_eq!(span.content_length(), 100);
        assert_eq!(span.content_range().as_deref(), Some("bytes 0-99/1000"));
    }

    #[test]
    fn start_at_or_past_size_is_unsatisfiable() {
        assert_eq!(
            resolve(Some("bytes=1000-"), 1000),
            Span::Unsatisfiable { size: 1000 }
        );
        assert_eq!(
            resolve(Some("bytes=1005-1010"), 1000),
            Span::Unsatisfiable { size: 1000 }
        );
        assert_eq!(
            resolve(Some("bytes=1000-"), 1000).content_range().as_deref(),
            Some("bytes */1000")
        );
    }

    #[test]
    fn zero_length_suffix_is_unsatisfiable() {
        assert_eq!(
            resolve(Some("bytes=-0"), 1000),
            Span::Unsatisfiable { size: 1000 }
        );
    }

    #[test]
    fn suffix_serves_file_tail() {
        assert_eq!(
            resolve(Some("bytes=-100"), 1000),
            Span::Partial {
                start: 900,
                length: 100,
                size: 1000
            }
        );
    }

    #[test]
    fn suffix_longer_than_file_serves_everything() {
        assert_eq!(resolve(Some("bytes=-5000"), 1000), Span::Full { size: 1000 });
    }

    #[test]
    fn end_past_size_is_clamped() {
        assert_eq!(
            resolve(Some("bytes=500-99999"), 1000),
            Span::Partial {
                start: 500,
                length: 500,
                size: 1000
            }
        );
    }

    #[test]
    fn whole_file_via_explicit_end_is_a_plain_200() {
        assert_eq!(resolve(Some("bytes=0-999"), 1000), Span::Full { size: 1000 });
    }

    #[test]
    fn malformed_headers_act_as_absent() {
        for header in [
            "bytes",
            "bytes=",
            "bytes=abc-def",
            "items=0-5",
            "bytes=0-1,5-6",
            "bytes=1-2-3",
            "bytes=5-3",
            "0-99",
        ] {
            assert_eq!(resolve(Some(header), 1000), Span::Full { size: 1000 }, "{header}");
        }
    }

    #[test]
    fn mid_file_open_ended_range_is_partial() {
        assert_eq!(
            resolve(Some("bytes=400-"), 1000),
            Span::Partial {
                start: 400,
                length: 600,
                size: 1000
            }
        );
    }
}
