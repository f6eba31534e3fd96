//! The zip-bundle handler: authorize once, then stream several objects'
//! datastreams back as one zip archive.

use super::{MAX_ID_LENGTH, require_view};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse, Response};
use futures::StreamExt;
use futures::io::AsyncWriteExt;
use portico_repo::{ByteStream, DatastreamInfo, RepoError, RepoResult};
use std::io;
use tokio::io::DuplexStream;
use tokio_util::io::ReaderStream;

/// In-flight buffer between the archive writer and the response body.
const ZIP_BUFFER: usize = 64 * 1024;

/// GET `/{id}/zip/{ids}`.
///
/// Streams a zip named `{id}.zip` bundling the configured datastream of
/// every comma-separated member id. Authorization is checked once,
/// against `{id}`. The archive is written straight into the response
/// body, so whole members are never buffered; the price is that a
/// member failing mid-stream can only truncate the archive, not change
/// the status. Member metadata is resolved up front so a missing member
/// still produces a clean 404.
pub async fn download_zip(
    State(state): State<AppState>,
    method: Method,
    Path((id, ids)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    // archives have no meaningful Content-Length to offer
    if method == Method::HEAD {
        return Ok((StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET")]).into_response());
    }
    if id.is_empty() || id.len() > MAX_ID_LENGTH {
        return Err(ApiError::NotFound(id));
    }

    require_view(state.checker.check(&headers, &id).await, &id)?;

    let members: Vec<String> = ids
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if members.is_empty() || members.iter().any(|m| m.len() > MAX_ID_LENGTH) {
        return Err(ApiError::NotFound(id));
    }

    let dsname = state.config.download.datastream.clone();
    let mut entries = Vec::with_capacity(members.len());
    for member in members {
        match state.repo.datastream_info(&member, &dsname).await {
            Ok(info) => entries.push((member, info)),
            Err(e) => {
                tracing::warn!(object_id = %member, datastream = %dsname, error = %e, "zip member lookup failed");
                return Err(ApiError::NotFound(member));
            }
        }
    }

    let (writer, reader) = tokio::io::duplex(ZIP_BUFFER);
    tokio::spawn(write_archive(state.clone(), dsname, entries, writer));

    let response_headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{id}.zip\""),
        ),
        (header::CACHE_CONTROL, "private".to_string()),
    ];
    Ok((
        StatusCode::OK,
        AppendHeaders(response_headers),
        Body::from_stream(ReaderStream::new(reader)),
    )
        .into_response())
}

async fn write_archive(
    state: AppState,
    dsname: String,
    entries: Vec<(String, DatastreamInfo)>,
    writer: DuplexStream,
) {
    if let Err(e) = try_write_archive(&state, &dsname, entries, writer).await {
        // the status line is long gone; the archive just ends short
        tracing::error!(error = %e, "zip stream aborted");
    }
}

async fn try_write_archive(
    state: &AppState,
    dsname: &str,
    entries: Vec<(String, DatastreamInfo)>,
    writer: DuplexStream,
) -> io::Result<()> {
    let mut archive = ZipFileWriter::with_tokio(writer);
    let token = state.config.download.external_token.as_deref();

    for (member, info) in entries {
        let name = if info.label.is_empty() {
            member.clone()
        } else {
            info.label.clone()
        };
        let mut stream = member_stream(state, dsname, &member, &info, token)
            .await
            .map_err(io::Error::other)?;

        let entry = ZipEntryBuilder::new(name.into(), Compression::Deflate);
        let mut sink = archive
            .write_entry_stream(entry)
            .await
            .map_err(io::Error::other)?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(io::Error::other)?;
            sink.write_all(&chunk).await?;
        }
        sink.close().await.map_err(io::Error::other)?;
    }

    archive.close().await.map_err(io::Error::other)?;
    Ok(())
}

/// Open the content stream for one archive member, from its external
/// location when one is usable, from the repository otherwise.
async fn member_stream(
    state: &AppState,
    dsname: &str,
    member: &str,
    info: &DatastreamInfo,
    token: Option<&str>,
) -> RepoResult<ByteStream> {
    if let (Some(token), Some("URL"), Some(location)) = (
        token,
        info.location_type.as_deref(),
        info.location.as_deref(),
    ) {
        let resp = state
            .http
            .get(location)
            .header("X-Api-Key", token)
            .send()
            .await?;
        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(match status {
                404 => RepoError::NotFound(location.to_string()),
                401 | 403 => RepoError::NotAuthorized(location.to_string()),
                _ => RepoError::UpstreamStatus {
                    status,
                    context: location.to_string(),
                },
            });
        }
        Ok(Box::pin(resp.bytes_stream().map(|c| c.map_err(RepoError::Transport))))
    } else {
        let (stream, _) = state.repo.datastream_content(member, dsname).await?;
        Ok(stream)
    }
}
