//! Module `file_ops`
//!
//! Streams media files to HTTP clients, honouring single byte-range requests.
//! Bodies are read from disk chunk by chunk; dropping the body (client
//! disconnect) closes the file.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use log::{debug, info, warn};
use std::io::{self, SeekFrom};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::StreamError;
use crate::storage::ResolvedPath;
use crate::transfer::modes::MimePolicy;
use crate::transfer::range::parse_range_header;
use crate::transfer::results::StreamResponse;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024; // 64KB read chunks

/// Serves resolved media files with full or partial content.
///
/// Never re-checks confinement: callers hand it only paths produced by
/// `PathResolver`.
#[derive(Debug, Clone)]
pub struct RangeStreamer {
    mime_policy: MimePolicy,
    buffer_size: usize,
}

impl Default for RangeStreamer {
    fn default() -> Self {
        Self::new(MimePolicy::PerExtension, DEFAULT_BUFFER_SIZE)
    }
}

impl RangeStreamer {
    pub fn new(mime_policy: MimePolicy, buffer_size: usize) -> Self {
        Self {
            mime_policy,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Build the response for `file`, optionally limited by a `Range` header.
    ///
    /// * no header: `200` with the whole file
    /// * one satisfiable range: `206` with `Content-Range`
    /// * several ranges: the whole file, as if no header had been sent
    pub async fn stream(
        &self,
        file: &ResolvedPath,
        range_header: Option<&str>,
    ) -> Result<StreamResponse, StreamError> {
        let path = file.as_path();

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(StreamError::NotFound),
            Err(e) => {
                debug!("stat failed for /{}: {}", file.relative(), e);
                return Err(StreamError::NotFound);
            }
        };
        let size = metadata.len();

        let range = match range_header {
            Some(value) => parse_range_header(value, size)?,
            None => None,
        };

        let mut handle = File::open(path).await.map_err(|e| {
            debug!("open failed for /{}: {}", file.relative(), e);
            StreamError::NotFound
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        let content_type = self.mime_policy.content_type(path);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
        );

        let label = file.client_path();
        match range {
            Some(spec) => {
                handle
                    .seek(SeekFrom::Start(spec.start))
                    .await
                    .map_err(StreamError::InternalIo)?;
                insert_header(&mut headers, header::CONTENT_RANGE, &spec.content_range(size))?;
                insert_header(&mut headers, header::CONTENT_LENGTH, &spec.len().to_string())?;
                info!(
                    "Streaming {} bytes {}-{} of {} ({} bytes)",
                    label,
                    spec.start,
                    spec.end,
                    size,
                    spec.len()
                );
                Ok(StreamResponse {
                    status: StatusCode::PARTIAL_CONTENT,
                    headers,
                    body: self.body_for(handle, spec.len(), label),
                })
            }
            None => {
                insert_header(&mut headers, header::CONTENT_LENGTH, &size.to_string())?;
                info!("Streaming full file {} ({} bytes)", label, size);
                Ok(StreamResponse {
                    status: StatusCode::OK,
                    headers,
                    body: self.body_for(handle, size, label),
                })
            }
        }
    }

    fn body_for(&self, handle: File, length: u64, label: String) -> Body {
        Body::from_stream(exact_length(
            handle.take(length),
            length,
            self.buffer_size,
            label,
        ))
    }
}

fn insert_header(
    headers: &mut HeaderMap,
    name: header::HeaderName,
    value: &str,
) -> Result<(), StreamError> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| StreamError::InternalIo(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    headers.insert(name, value);
    Ok(())
}

/// Yields exactly `expected` bytes from `reader` or ends with an error.
///
/// A read failure or a file that shrinks mid-stream surfaces as a body error,
/// which makes the server abort the connection instead of finishing a
/// truncated response with a success status.
fn exact_length<R>(
    reader: R,
    expected: u64,
    capacity: usize,
    label: String,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let chunks = ReaderStream::with_capacity(reader, capacity);
    stream::unfold(
        (chunks, 0u64, false, label),
        move |(mut chunks, sent, failed, label)| async move {
            if failed {
                return None;
            }
            match chunks.next().await {
                Some(Ok(chunk)) => {
                    let sent = sent + chunk.len() as u64;
                    Some((Ok(chunk), (chunks, sent, false, label)))
                }
                Some(Err(e)) => {
                    warn!("Read error while streaming {} after {} bytes: {}", label, sent, e);
                    Some((Err(e), (chunks, sent, true, label)))
                }
                None if sent < expected => {
                    warn!(
                        "{} ended after {} of {} bytes; aborting response",
                        label, sent, expected
                    );
                    let err = io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "file shrank while streaming",
                    );
                    Some((Err(err), (chunks, sent, true, label)))
                }
                None => None,
            }
        },
    )
}
