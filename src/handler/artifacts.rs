//! Artifact download handler
//!
//! Store lookups and body copying are blocking; both run on the blocking
//! pool. The response head is returned as soon as the artifact is framed,
//! the body follows through a [`ChannelBody`](super::body::ChannelBody).

use std::io::{self, BufWriter, Read};
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::Response;
use tracing::{debug, error, info, warn};

use super::body::{self, ChannelWriter};
use super::router::{respond, AccessRecord, RequestContext};
use crate::config::AppState;
use crate::error::StoreError;
use crate::http::copy::BUFFER_SIZE;
use crate::http::disposition;
use crate::http::response::empty_body;
use crate::http::{
    self, BodyWriter, DownloadRequest, ProgressEvent, ProgressListener, ResponseBody,
    ResponseFramer, Transfer, TransferProgress,
};
use crate::store::OpenedArtifact;

/// Serve `name` from the store, honoring `Range` and `If-Range`
pub async fn serve_artifact(
    ctx: &RequestContext<'_>,
    name: &str,
    state: &Arc<AppState>,
    access: Option<AccessRecord>,
) -> Response<ResponseBody> {
    let store = Arc::clone(&state.store);
    let lookup = name.to_string();
    let opened = match tokio::task::spawn_blocking(move || store.open(&lookup)).await {
        Ok(Ok(opened)) => opened,
        Ok(Err(e)) => return respond(access, store_error_response(name, &e)),
        Err(e) => {
            error!("Open task for artifact '{name}' failed: {e}");
            return respond(access, http::build_500_response());
        }
    };
    let OpenedArtifact { metadata, reader } = opened;

    let request = DownloadRequest::from_headers(ctx.method, ctx.headers);
    let (head, body_writer) = ResponseFramer::new(name, &metadata)
        .frame(&request)
        .into_parts();

    if ctx.is_head || matches!(body_writer.transfer(), Transfer::Unsatisfiable) {
        return respond(access, http::build_framed_response(head, empty_body()));
    }

    let status = head.status.as_u16();
    let (writer, body) = body::channel(state.config.artifacts.stream_channel_capacity);
    let filename = name.to_string();
    tokio::task::spawn_blocking(move || {
        stream_body(body_writer, reader, writer, &filename, status, access);
    });

    http::build_framed_response(head, body.boxed())
}

/// Copy the body into the channel and write the access log once done
fn stream_body(
    body_writer: BodyWriter,
    reader: Box<dyn Read + Send>,
    writer: ChannelWriter,
    filename: &str,
    status: u16,
    access: Option<AccessRecord>,
) {
    let aborter = writer.clone();
    let mut sink = BufWriter::with_capacity(BUFFER_SIZE, writer);
    let mut progress = TransferProgress::new(body_writer.requested_bytes());
    let mut listener = |event: ProgressEvent| {
        progress.progress(event);
        debug!(
            "file ({filename}) shipped {} of {} bytes",
            event.shipped_total, event.requested_bytes
        );
    };

    let result = body_writer.write_to(reader, &mut sink, &mut listener);
    drop(sink);
    match result {
        Ok(written) => {
            info!(
                "file ({filename}) sent {written} bytes in {} progress events",
                progress.events()
            );
        }
        Err(e) => {
            warn!(
                "file ({filename}) aborted after {} of {} bytes ({}%)",
                progress.shipped(),
                progress.requested(),
                progress.percent()
            );
            aborter.abort(io::Error::other(e));
        }
    }

    if let Some(access) = access {
        access.finish(status, progress.shipped());
    }
}

/// Serve the checksum file `<hash>  <artifact>` of an artifact
pub async fn serve_checksum(
    ctx: &RequestContext<'_>,
    artifact: &str,
    checksum_name: &str,
    state: &Arc<AppState>,
    access: Option<AccessRecord>,
) -> Response<ResponseBody> {
    let store = Arc::clone(&state.store);
    let lookup = artifact.to_string();
    let response = match tokio::task::spawn_blocking(move || store.metadata(&lookup)).await {
        Ok(Ok(metadata)) => http::build_checksum_response(
            format!("{}  {artifact}", metadata.content_hash),
            &disposition::attachment(checksum_name),
            ctx.is_head,
        ),
        Ok(Err(e)) => store_error_response(artifact, &e),
        Err(e) => {
            error!("Checksum task for artifact '{artifact}' failed: {e}");
            http::build_500_response()
        }
    };
    respond(access, response)
}

fn store_error_response(name: &str, error: &StoreError) -> Response<ResponseBody> {
    if error.is_not_found() {
        debug!("Artifact '{name}' not served: {error}");
        http::build_404_response()
    } else {
        error!("Artifact '{name}' could not be opened: {error}");
        http::build_500_response()
    }
}
