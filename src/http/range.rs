//! HTTP Range request parsing module
//!
//! Range header parsing for partial and multi-range downloads, compliant with RFC 7233.
//! Overlapping ranges are rejected instead of merged so the body can always be
//! written in one forward pass over the artifact stream.

use std::str::FromStr;

use crate::error::RangeError;

/// Range unit prefix accepted in the `Range` header
const BYTES_UNIT: &str = "bytes=";

/// One satisfiable byte window of an artifact (both ends inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    end: u64,
    total_length: u64,
}

impl ByteRange {
    /// First byte position
    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Last byte position (inclusive)
    #[inline]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Complete length of the artifact the range was parsed against
    #[inline]
    pub const fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Number of bytes covered by the range, never zero
    #[inline]
    pub const fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value, e.g. `bytes 0-9/100`
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_length)
    }
}

/// `Content-Range` header value for a 416 response
pub fn unsatisfied_content_range(total_length: u64) -> String {
    format!("bytes */{total_length}")
}

/// Validated ranges of one request: non-empty, ascending, non-overlapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<ByteRange>,
}

impl RangeSet {
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ByteRange> {
        self.ranges.iter()
    }

    /// The only range, if the set holds exactly one
    pub fn single(&self) -> Option<ByteRange> {
        match self.ranges.as_slice() {
            [range] => Some(*range),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> &[ByteRange] {
        &self.ranges
    }
}

impl<'a> IntoIterator for &'a RangeSet {
    type Item = &'a ByteRange;
    type IntoIter = std::slice::Iter<'a, ByteRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

/// One comma-separated unit of the header, before resolving against a length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    /// `start-end`
    Bounded(u64, u64),
    /// `start-`
    From(u64),
    /// `-suffix`
    Suffix(u64),
}

impl FromStr for RangeSpec {
    type Err = RangeError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let malformed = || RangeError::Malformed(format!("invalid range spec '{spec}'"));

        let (start_str, end_str) = spec.split_once('-').ok_or_else(malformed)?;
        let start = parse_position(start_str).ok_or_else(malformed)?;
        let end = parse_position(end_str).ok_or_else(malformed)?;

        match (start, end) {
            (Some(start), Some(end)) => Ok(Self::Bounded(start, end)),
            (Some(start), None) => Ok(Self::From(start)),
            (None, Some(suffix)) => Ok(Self::Suffix(suffix)),
            (None, None) => Err(malformed()),
        }
    }
}

impl RangeSpec {
    /// Resolve against the artifact length, clamping the end (and suffix start)
    fn resolve(self, total_length: u64) -> Result<ByteRange, RangeError> {
        let last = total_length.checked_sub(1);
        let (start, end) = match (self, last) {
            (_, None) => {
                return Err(RangeError::Unsatisfiable(
                    "artifact is empty".to_string(),
                ))
            }
            (Self::Bounded(start, end), Some(last)) => (start, end.min(last)),
            (Self::From(start), Some(last)) => (start, last),
            (Self::Suffix(suffix), Some(last)) => (total_length.saturating_sub(suffix), last),
        };

        if start > end {
            return Err(RangeError::Unsatisfiable(format!(
                "start {start} is beyond end {end}"
            )));
        }

        Ok(ByteRange {
            start,
            end,
            total_length,
        })
    }
}

/// Parse a decimal byte position; `Some(None)` for an empty side
fn parse_position(s: &str) -> Option<Option<u64>> {
    if s.is_empty() {
        return Some(None);
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Overflowing u64 is treated as malformed
    s.parse::<u64>().ok().map(Some)
}

/// Parse HTTP Range header into validated, ordered, non-overlapping ranges
///
/// Supported formats, any number of them comma separated:
/// - `bytes=start-end` - Specific range, end clamped to the last byte
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes (whole artifact if larger)
///
/// # Examples
/// ```
/// use artifact_range::http::range::parse_range_header;
///
/// let ranges = parse_range_header("bytes=-1000", 51200).unwrap();
/// let range = ranges.single().unwrap();
/// assert_eq!((range.start(), range.end()), (50200, 51199));
///
/// assert!(parse_range_header("bytes=100-10", 5120).is_err());
/// ```
pub fn parse_range_header(range_header: &str, total_length: u64) -> Result<RangeSet, RangeError> {
    let specs = range_header
        .strip_prefix(BYTES_UNIT)
        .ok_or_else(|| RangeError::Malformed(format!("unsupported range unit in '{range_header}'")))?;

    if specs.is_empty() {
        return Err(RangeError::Unsatisfiable("empty range list".to_string()));
    }

    // Syntax of the whole header is checked before any spec is resolved
    let specs = specs
        .split(',')
        .map(str::parse::<RangeSpec>)
        .collect::<Result<Vec<_>, _>>()?;

    let mut ranges = specs
        .into_iter()
        .map(|spec| spec.resolve(total_length))
        .collect::<Result<Vec<_>, _>>()?;

    ranges.sort_by_key(ByteRange::start);

    let mut cursor = 0;
    for range in &ranges {
        if range.start < cursor {
            return Err(RangeError::Unsatisfiable(
                "ranges are overlapping".to_string(),
            ));
        }
        cursor = range.end + 1;
    }

    Ok(RangeSet { ranges })
}
