//! Range header parsing
//!
//! Single `bytes=` ranges only. Forms accepted: `start-end`, `start-` and the
//! suffix form `-N` (last N bytes).

use crate::error::StreamError;

/// Inclusive byte bounds into a file; always `start <= end < size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: u64,
}

impl RangeSpec {
    /// Number of bytes covered; never zero
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a file of `size` bytes
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// Parse a `Range` header against a file of `size` bytes.
///
/// Returns `Ok(None)` when the header asks for several ranges: the whole file
/// is served instead. Unparseable or out-of-bounds ranges are
/// `RangeNotSatisfiable`. An `end` past the last byte is clamped.
pub fn parse_range_header(header: &str, size: u64) -> Result<Option<RangeSpec>, StreamError> {
    let unsatisfiable = || StreamError::RangeNotSatisfiable { size };

    let (unit, set) = header.trim().split_once('=').ok_or_else(unsatisfiable)?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return Err(unsatisfiable());
    }
    if set.contains(',') {
        return Ok(None);
    }

    let (start_part, end_part) = set.trim().split_once('-').ok_or_else(unsatisfiable)?;
    let (start_part, end_part) = (start_part.trim(), end_part.trim());
    let last = size.checked_sub(1).ok_or_else(unsatisfiable)?;

    let (start, end) = if start_part.is_empty() {
        let suffix = parse_bound(end_part).ok_or_else(unsatisfiable)?;
        if suffix == 0 {
            return Err(unsatisfiable());
        }
        (size.saturating_sub(suffix), last)
    } else {
        let start = parse_bound(start_part).ok_or_else(unsatisfiable)?;
        let end = if end_part.is_empty() {
            last
        } else {
            parse_bound(end_part).ok_or_else(unsatisfiable)?
        };
        (start, end)
    };

    if start >= size || start > end {
        return Err(unsatisfiable());
    }

    Ok(Some(RangeSpec {
        start,
        end: end.min(last),
    }))
}

fn parse_bound(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
