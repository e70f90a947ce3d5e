//! HTTP protocol layer module
//!
//! Range parsing, conditional evaluation, filename encoding, multipart
//! framing and bounded stream copying for artifact downloads. Nothing in
//! here knows about the server, the store or the async runtime.

pub mod conditional;
pub mod copy;
pub mod disposition;
pub mod framer;
pub mod multipart;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use copy::{copy_range, NoProgress, ProgressEvent, ProgressListener, TransferProgress};
pub use framer::{
    ArtifactMetadata, BodyWriter, DownloadRequest, FramedResponse, ResponseFramer, ResponseHead,
    Transfer,
};
pub use range::{parse_range_header, ByteRange, RangeSet};
pub use response::{
    build_404_response, build_405_response, build_500_response, build_checksum_response,
    build_framed_response, build_health_response, build_options_response, ResponseBody,
};
