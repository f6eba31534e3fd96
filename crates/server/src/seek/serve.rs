use super::SeekRead;
use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse, Response};
use bytes::Bytes;
use std::io::SeekFrom;
use std::ops::RangeInclusive;

/// Read granularity when streaming a body out.
const CHUNK_SIZE: usize = 64 * 1024;

enum RangeOutcome {
    /// No Range header, or one we choose to answer with the full body.
    Full,
    /// A single satisfiable range.
    Partial(RangeInclusive<u64>),
    /// Present but malformed or entirely out of bounds.
    Unsatisfiable,
}

fn requested_range(headers: &HeaderMap, size: u64) -> RangeOutcome {
    let Some(value) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) else {
        return RangeOutcome::Full;
    };
    let Ok(parsed) = http_range_header::parse_range_header(value) else {
        return RangeOutcome::Unsatisfiable;
    };
    match parsed.validate(size) {
        // multipart/byteranges is not worth its complexity here; a
        // multi-range request gets the whole body back
        Ok(ranges) if ranges.len() == 1 => RangeOutcome::Partial(ranges[0].clone()),
        Ok(_) => RangeOutcome::Full,
        Err(_) => RangeOutcome::Unsatisfiable,
    }
}

/// Stream content out of `reader`, honoring a single `Range` header.
///
/// Produces 200 with the full body, 206 with `Content-Range` for a valid
/// single range, or 416 when the header is malformed or out of bounds.
/// HEAD requests get identical headers and no body. Headers specific to
/// the object (ETag, Content-Type, disposition) are the caller's to add.
pub async fn serve_content(
    method: &Method,
    request_headers: &HeaderMap,
    mut reader: Box<dyn SeekRead>,
) -> Response {
    let size = reader.size();

    let (status, start, len, content_range) = match requested_range(request_headers, size) {
        RangeOutcome::Full => (StatusCode::OK, 0, size, None),
        RangeOutcome::Partial(r) => {
            let (first, last) = (*r.start(), *r.end());
            (
                StatusCode::PARTIAL_CONTENT,
                first,
                last - first + 1,
                Some(format!("bytes {first}-{last}/{size}")),
            )
        }
        RangeOutcome::Unsatisfiable => {
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{size}"))],
            )
                .into_response();
        }
    };

    let mut headers = vec![
        (header::ACCEPT_RANGES, "bytes".to_string()),
        (header::CONTENT_LENGTH, len.to_string()),
    ];
    if let Some(cr) = content_range {
        headers.push((header::CONTENT_RANGE, cr));
    }

    if method == Method::HEAD {
        return (status, AppendHeaders(headers), Body::empty()).into_response();
    }

    if start > 0
        && let Err(e) = reader.seek(SeekFrom::Start(start)).await
    {
        tracing::error!(error = %e, "seek to range start failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let stream = futures::stream::unfold((reader, len), |(mut reader, remaining)| async move {
        if remaining == 0 {
            return None;
        }
        let mut buf = vec![0u8; CHUNK_SIZE.min(remaining as usize)];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), (reader, remaining - n as u64)))
            }
            Err(e) => {
                tracing::error!(error = %e, "read failed mid-body");
                Some((Err(e), (reader, 0)))
            }
        }
    });

    (status, AppendHeaders(headers), Body::from_stream(stream)).into_response()
}
