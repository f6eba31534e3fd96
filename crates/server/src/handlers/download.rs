//! The download handler: authorize, then proxy the object's content.

use super::{MAX_ID_LENGTH, require_view};
use crate::error::{ApiError, ApiResult};
use crate::seek::{HttpSeeker, StreamSeeker, serve_content};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use portico_repo::DatastreamInfo;
use std::io;

/// GET/HEAD `/{id}`.
///
/// Authorizes the request against the object's rights record, then
/// streams the configured datastream back with range support. Responses
/// carry a strong ETag derived from the datastream version, so
/// `If-None-Match` revalidation short-circuits before any content is
/// fetched.
pub async fn download(
    State(state): State<AppState>,
    method: Method,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if id.is_empty() || id.len() > MAX_ID_LENGTH {
        return Err(ApiError::NotFound(id));
    }

    require_view(state.checker.check(&headers, &id).await, &id)?;

    let dsname = &state.config.download.datastream;
    let info = match state.repo.datastream_info(&id, dsname).await {
        Ok(info) => info,
        Err(e) => {
            // a readable object without the datastream looks absent too
            tracing::warn!(object_id = %id, datastream = %dsname, error = %e, "datastream info fetch failed");
            return Err(ApiError::NotFound(id));
        }
    };

    let etag = format!("\"{}\"", info.version_id);
    if revalidates(&headers, &etag) {
        let mut resp = StatusCode::NOT_MODIFIED.into_response();
        append_header(&mut resp, header::ETAG, &etag);
        return Ok(resp);
    }

    let token = state.config.download.external_token.as_deref();
    let mut content_md5 = None;
    let mut resp = if let Some(location) = external_location(&info, token.is_some()) {
        let seeker = HttpSeeker::probe(
            state.http.clone(),
            location,
            token.map(str::to_string),
        )
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ApiError::NotFound(id.clone()),
            _ => ApiError::Internal(format!("external content for {id}: {e}")),
        })?
        .with_page_size(state.config.download.page_size);
        serve_content(&method, &headers, Box::new(seeker)).await
    } else {
        let (stream, content) = state.repo.datastream_content(&id, dsname).await?;
        content_md5 = content.md5;
        match content.length {
            Some(length) if length > 0 => {
                let seeker = StreamSeeker::new(stream, length);
                serve_content(&method, &headers, Box::new(seeker)).await
            }
            // no usable length; pass the stream through without
            // range support
            _ => {
                if method == Method::HEAD {
                    Body::empty().into_response()
                } else {
                    Body::from_stream(stream).into_response()
                }
            }
        }
    };

    let md5 = content_md5
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(&info.checksum);
    object_headers(&mut resp, &info, &etag, md5);
    Ok(resp)
}

/// The external URL to fetch from, when the datastream's content lives
/// outside the repository. External fetches need the API token; without
/// one configured the repository copy is served instead.
fn external_location(info: &DatastreamInfo, token_configured: bool) -> Option<&str> {
    if token_configured && info.location_type.as_deref() == Some("URL") {
        info.location.as_deref()
    } else {
        None
    }
}

/// True when `If-None-Match` names our ETag.
fn revalidates(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    value == "*" || value.split(',').any(|t| t.trim() == etag)
}

/// Attach the object-level response headers serve_content leaves to us.
fn object_headers(resp: &mut Response, info: &DatastreamInfo, etag: &str, md5: &str) {
    append_header(resp, header::ETAG, etag);
    append_header(resp, header::CACHE_CONTROL, "private");
    let content_type = if info.mime_type.is_empty() {
        "application/octet-stream"
    } else {
        &info.mime_type
    };
    append_header(resp, header::CONTENT_TYPE, content_type);
    if !info.label.is_empty() {
        let filename = info.label.replace('"', "");
        append_header(
            resp,
            header::CONTENT_DISPOSITION,
            &format!("inline; filename=\"{filename}\""),
        );
    }
    if !md5.is_empty() {
        append_header(resp, header::HeaderName::from_static("content-md5"), md5);
    }
}

fn append_header(resp: &mut Response, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        resp.headers_mut().insert(name, value);
    } else {
        tracing::warn!(header = %name, "dropping unrepresentable header value");
    }
}
