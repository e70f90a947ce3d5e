//! `multipart/byteranges` body framing (RFC 2046, section 5.1)
//!
//! ```text
//! multipart-body := dash-boundary CRLF body-part
//!                   *(delimiter CRLF body-part)
//!                   close-delimiter
//! ```
//!
//! Preamble, epilogue and transport padding are never sent.

use std::io::{self, Write};

use super::range::ByteRange;

/// boundary := 0*69<bchars> bcharsnospace
pub const BOUNDARY: &str = "THIS_STRING_SEPARATES_MULTIPART";

/// Response `Content-Type` of a multi-range response
pub const CONTENT_TYPE_BYTERANGES: &str =
    "multipart/byteranges; boundary=THIS_STRING_SEPARATES_MULTIPART";

/// Content type of every body part
pub const PART_CONTENT_TYPE: &str = "application/octet-stream";

const CRLF: &str = "\r\n";

/// dash-boundary := "--" boundary
const DASH_BOUNDARY: &str = "--THIS_STRING_SEPARATES_MULTIPART";

/// delimiter := CRLF dash-boundary
const DELIMITER: &str = "\r\n--THIS_STRING_SEPARATES_MULTIPART";

/// close-delimiter := delimiter "--"
const CLOSE_DELIMITER: &str = "\r\n--THIS_STRING_SEPARATES_MULTIPART--";

/// Write the boundary line and MIME headers that open one body part
///
/// The first part opens with the dash-boundary, later ones with the
/// delimiter. The part content follows directly after this call.
pub fn write_part_header<W: Write + ?Sized>(
    sink: &mut W,
    range: &ByteRange,
    first: bool,
) -> io::Result<()> {
    let opening = if first { DASH_BOUNDARY } else { DELIMITER };
    write!(
        sink,
        "{opening}{CRLF}Content-Type: {PART_CONTENT_TYPE}{CRLF}Content-Range: {}{CRLF}{CRLF}",
        range.content_range()
    )
}

/// Write the close-delimiter that ends the body (no trailing CRLF)
pub fn write_close_delimiter<W: Write + ?Sized>(sink: &mut W) -> io::Result<()> {
    sink.write_all(CLOSE_DELIMITER.as_bytes())
}
