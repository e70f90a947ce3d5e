//! Artifact response framing module
//!
//! Decides the response shape of an artifact download (full body, single
//! range, multipart/byteranges or 416), computes all protocol headers and
//! writes the body from the artifact stream.
//!
//! Framing happens in two steps. [`ResponseFramer::frame`] settles the
//! status and headers; [`FramedResponse::into_parts`] then hands them out
//! together with a [`BodyWriter`] that owns no headers, so nothing can change
//! them once body writing has started.

use std::io::{Read, Write};
use std::time::SystemTime;

use hyper::header::{
    HeaderName, HeaderValue, ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, ETAG, IF_RANGE, LAST_MODIFIED, RANGE, X_CONTENT_TYPE_OPTIONS,
};
use hyper::{HeaderMap, Method, StatusCode};
use tracing::{debug, error};

use super::conditional::{if_range_applies, strong_etag};
use super::copy::{copy_range, ProgressListener};
use super::disposition;
use super::multipart::{self, CONTENT_TYPE_BYTERANGES, PART_CONTENT_TYPE};
use super::range::{parse_range_header, unsatisfied_content_range, ByteRange, RangeSet};
use crate::error::StreamError;

/// Metadata of a stored artifact, supplied by the artifact store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// Size in bytes
    pub size: u64,
    /// Content hash, used as strong validator
    pub content_hash: String,
    /// Modification time, if the store knows it
    pub last_modified: Option<SystemTime>,
}

/// The parts of a download request the framer looks at
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    pub method: &'a Method,
    pub range: Option<&'a str>,
    pub if_range: Option<&'a str>,
}

impl<'a> DownloadRequest<'a> {
    /// Extract `Range` and `If-Range` from request headers
    ///
    /// A value that is not visible ASCII stays present as [`UNREADABLE_HEADER`],
    /// which no range or validator matches: such a `Range` is answered with
    /// 416 and such an `If-Range` falls back to the full body.
    pub fn from_headers(method: &'a Method, headers: &'a HeaderMap) -> Self {
        Self {
            method,
            range: readable(headers, &RANGE),
            if_range: readable(headers, &IF_RANGE),
        }
    }
}

/// Stand-in for a request header value that is not visible ASCII
pub const UNREADABLE_HEADER: &str = "\u{fffd}";

fn readable<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .map(|v| v.to_str().unwrap_or(UNREADABLE_HEADER))
}

/// Rendering path chosen for a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    /// 200 with the whole artifact
    Full { length: u64 },
    /// 206 with one range
    SingleRange(ByteRange),
    /// 206 with a multipart/byteranges body
    Multipart(RangeSet),
    /// 416, no body
    Unsatisfiable,
}

impl Transfer {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Full { .. } => StatusCode::OK,
            Self::SingleRange(_) | Self::Multipart(_) => StatusCode::PARTIAL_CONTENT,
            Self::Unsatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
        }
    }

    /// Artifact bytes the body will carry, multipart framing excluded
    pub fn requested_bytes(&self) -> u64 {
        match self {
            Self::Full { length } => *length,
            Self::SingleRange(range) => range.length(),
            Self::Multipart(ranges) => ranges.iter().map(ByteRange::length).sum(),
            Self::Unsatisfiable => 0,
        }
    }
}

/// Status and headers of a framed response
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Builds the response of one artifact download
#[derive(Debug, Clone, Copy)]
pub struct ResponseFramer<'a> {
    filename: &'a str,
    metadata: &'a ArtifactMetadata,
}

impl<'a> ResponseFramer<'a> {
    pub const fn new(filename: &'a str, metadata: &'a ArtifactMetadata) -> Self {
        Self { filename, metadata }
    }

    /// Choose the rendering path and compute status and headers
    pub fn frame(&self, request: &DownloadRequest<'_>) -> FramedResponse {
        let size = self.metadata.size;
        let etag = strong_etag(&self.metadata.content_hash);

        let mut headers = HeaderMap::new();
        self.insert(&mut headers, CONTENT_DISPOSITION, disposition::attachment(self.filename));
        if let Some(modified) = self.metadata.last_modified {
            self.insert(&mut headers, LAST_MODIFIED, httpdate::fmt_http_date(modified));
        }
        self.insert(&mut headers, ETAG, etag.clone());
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PART_CONTENT_TYPE));
        // Keep browsers from MIME-sniffing downloaded artifacts
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

        // Range is only defined for GET
        let range_header = if request.method == Method::GET {
            request.range
        } else {
            None
        };

        let transfer = match range_header {
            None => Transfer::Full { length: size },
            Some(range_header) => {
                debug!("range header for filename ({}) is: {range_header}", self.filename);
                if if_range_applies(request.if_range, &etag, self.metadata.last_modified) {
                    match parse_range_header(range_header, size) {
                        Ok(ranges) => match ranges.single() {
                            Some(range) => Transfer::SingleRange(range),
                            None => Transfer::Multipart(ranges),
                        },
                        Err(e) => {
                            debug!(
                                "range header ({range_header}) for filename ({}) is not satisfiable: {e}",
                                self.filename
                            );
                            Transfer::Unsatisfiable
                        }
                    }
                } else {
                    debug!("If-Range of filename ({}) does not match, sending all", self.filename);
                    Transfer::Full { length: size }
                }
            }
        };

        match &transfer {
            Transfer::Full { length } => {
                debug!("filename ({}) results into a full request", self.filename);
                headers.insert(CONTENT_LENGTH, HeaderValue::from(*length));
            }
            Transfer::SingleRange(range) => {
                debug!("filename ({}) results into a single range request", self.filename);
                self.insert(&mut headers, CONTENT_RANGE, range.content_range());
                headers.insert(CONTENT_LENGTH, HeaderValue::from(range.length()));
            }
            Transfer::Multipart(_) => {
                debug!("filename ({}) results into a multipart range request", self.filename);
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_BYTERANGES));
            }
            Transfer::Unsatisfiable => {
                self.insert(&mut headers, CONTENT_RANGE, unsatisfied_content_range(size));
            }
        }

        FramedResponse {
            head: ResponseHead {
                status: transfer.status(),
                headers,
            },
            body: BodyWriter {
                transfer,
                filename: self.filename.to_string(),
            },
        }
    }

    fn insert(&self, headers: &mut HeaderMap, name: HeaderName, value: String) {
        match HeaderValue::try_from(value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(e) => {
                // Only a filename with control characters gets here
                debug!("header {name} of filename ({}) not representable: {e}", self.filename);
                if name == CONTENT_DISPOSITION {
                    headers.insert(name, HeaderValue::from_static("attachment"));
                }
            }
        }
    }
}

/// Response head plus the pending body
#[derive(Debug)]
pub struct FramedResponse {
    head: ResponseHead,
    body: BodyWriter,
}

impl FramedResponse {
    pub const fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub const fn transfer(&self) -> &Transfer {
        &self.body.transfer
    }

    /// Commit the head; only the body is left to write
    pub fn into_parts(self) -> (ResponseHead, BodyWriter) {
        (self.head, self.body)
    }
}

/// Writes the body of a committed response
#[derive(Debug)]
pub struct BodyWriter {
    transfer: Transfer,
    filename: String,
}

impl BodyWriter {
    pub const fn transfer(&self) -> &Transfer {
        &self.transfer
    }

    pub fn requested_bytes(&self) -> u64 {
        self.transfer.requested_bytes()
    }

    /// Stream the body from the artifact `source` into `sink`
    ///
    /// The source is consumed and dropped on every exit path. A failure
    /// leaves a truncated body on the sink; the caller must abort the
    /// response instead of retrying.
    ///
    /// # Returns
    /// Number of artifact bytes written, multipart framing excluded
    pub fn write_to<R, W, L>(
        self,
        mut source: R,
        sink: &mut W,
        listener: &mut L,
    ) -> Result<u64, StreamError>
    where
        R: Read,
        W: Write + ?Sized,
        L: ProgressListener + ?Sized,
    {
        let result = match &self.transfer {
            Transfer::Full { length } => copy_range(&mut source, 0, *length, sink, listener),
            Transfer::SingleRange(range) => {
                copy_range(&mut source, range.start(), range.length(), sink, listener)
            }
            Transfer::Multipart(ranges) => write_multipart(&mut source, ranges, sink, listener),
            Transfer::Unsatisfiable => Ok(0),
        }
        .and_then(|written| {
            sink.flush()?;
            Ok(written)
        });

        if let Err(e) = &result {
            error!("streaming of file ({}) failed: {e}", self.filename);
        }
        result
    }
}

fn write_multipart<R, W, L>(
    source: &mut R,
    ranges: &RangeSet,
    sink: &mut W,
    listener: &mut L,
) -> Result<u64, StreamError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    L: ProgressListener + ?Sized,
{
    let mut stream_pos = 0;
    let mut written = 0;
    for (i, range) in ranges.iter().enumerate() {
        multipart::write_part_header(sink, range, i == 0)?;
        // Ranges are ascending and disjoint, so the skip is never negative
        written += copy_range(source, range.start() - stream_pos, range.length(), sink, listener)?;
        stream_pos = range.end() + 1;
    }
    multipart::write_close_delimiter(sink)?;
    Ok(written)
}
