//! Bounded stream copy with download progress reporting
//!
//! Copies one byte window from an artifact stream to the client sink. The
//! source is only ever read forward: callers express later windows as a skip
//! relative to the current stream position.

use std::io::{self, Read, Write};
use std::time::Instant;

use tracing::trace;

use crate::error::StreamError;

/// Copy buffer size (8 KiB)
pub const BUFFER_SIZE: usize = 0x2000;

/// Minimum progress step between two events, in percent of the window
const PROGRESS_STEP_PERCENT: u64 = 10;

/// Progress of one copied window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Bytes requested for the window
    pub requested_bytes: u64,
    /// Bytes shipped since the previous event
    pub shipped_since_last: u64,
    /// Bytes shipped for the window so far
    pub shipped_total: u64,
}

/// Receiver of progress events during a download
///
/// Implemented for every `FnMut(ProgressEvent)` closure.
pub trait ProgressListener {
    fn progress(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressListener for F {
    fn progress(&mut self, event: ProgressEvent) {
        self(event);
    }
}

/// Listener for callers that do not track progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn progress(&mut self, _event: ProgressEvent) {}
}

/// Per-request accumulator of progress events
///
/// One request may copy several windows (multipart), each reporting its own
/// `shipped_total`; this sums what was actually shipped across all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferProgress {
    requested: u64,
    shipped: u64,
    events: usize,
}

impl TransferProgress {
    pub const fn new(requested: u64) -> Self {
        Self {
            requested,
            shipped: 0,
            events: 0,
        }
    }

    pub const fn requested(&self) -> u64 {
        self.requested
    }

    pub const fn shipped(&self) -> u64 {
        self.shipped
    }

    pub const fn events(&self) -> usize {
        self.events
    }

    pub fn percent(&self) -> u64 {
        percent_of(self.shipped, self.requested)
    }

    pub const fn is_complete(&self) -> bool {
        self.shipped >= self.requested
    }
}

impl ProgressListener for TransferProgress {
    fn progress(&mut self, event: ProgressEvent) {
        self.shipped += event.shipped_since_last;
        self.events += 1;
    }
}

/// Share of `part` in `whole`, 100 for an empty whole
fn percent_of(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 100;
    }
    let percent = u128::from(part) * 100 / u128::from(whole);
    u64::try_from(percent).unwrap_or(u64::MAX)
}

/// Copy `length` bytes after discarding `skip` bytes of `source`
///
/// Reports progress at least every 10 percent of `length` and once at
/// completion. Fails if the source ends before `skip + length` bytes were
/// read or if the sink refuses a write.
///
/// # Returns
/// Number of bytes written to `sink` (always `length` on success)
pub fn copy_range<R, W, L>(
    source: &mut R,
    skip: u64,
    length: u64,
    sink: &mut W,
    listener: &mut L,
) -> Result<u64, StreamError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    L: ProgressListener + ?Sized,
{
    let started = Instant::now();
    trace!("Start of stream copy: skip {skip}, length {length}");

    if skip > 0 {
        let skipped = io::copy(&mut (&mut *source).take(skip), &mut io::sink())?;
        if skipped < skip {
            return Err(StreamError::SkipShortfall {
                requested: skip,
                skipped,
            });
        }
    }

    let mut buf = [0u8; BUFFER_SIZE];
    let mut shipped: u64 = 0;
    let mut shipped_since_last: u64 = 0;
    let mut reported_percent: u64 = 0;

    while shipped < length {
        let want = usize::try_from(length - shipped).map_or(BUFFER_SIZE, |n| n.min(BUFFER_SIZE));
        let read = match source.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        sink.write_all(&buf[..read])?;
        shipped += read as u64;
        shipped_since_last += read as u64;

        let percent = percent_of(shipped, length);
        // One event per crossed step boundary, so no step goes unreported
        if shipped == length
            || percent / PROGRESS_STEP_PERCENT > reported_percent / PROGRESS_STEP_PERCENT
        {
            reported_percent = percent;
            listener.progress(ProgressEvent {
                requested_bytes: length,
                shipped_since_last,
                shipped_total: shipped,
            });
            shipped_since_last = 0;
        }
    }

    if length == 0 {
        listener.progress(ProgressEvent {
            requested_bytes: 0,
            shipped_since_last: 0,
            shipped_total: 0,
        });
    }

    if shipped < length {
        if shipped_since_last > 0 {
            listener.progress(ProgressEvent {
                requested_bytes: length,
                shipped_since_last,
                shipped_total: shipped,
            });
        }
        return Err(StreamError::Shortfall {
            requested: length,
            missing: length - shipped,
        });
    }

    trace!(
        "Finished stream copy of {length} bytes in {} ms",
        started.elapsed().as_millis()
    );
    Ok(shipped)
}
