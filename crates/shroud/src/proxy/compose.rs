//! Response composition: mapping the chosen upstream response back onto
//! the client connection.

use super::forwarding::UpstreamResponse;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderMap};
use hyper::Response;

/// Whether the headers declare a chunked transfer encoding (any casing,
/// possibly one token among several).
pub fn is_chunked(headers: &HeaderMap) -> bool {
    headers.get_all(header::TRANSFER_ENCODING).iter().any(|v| {
        v.to_str()
            .map(|s| {
                s.split(',')
                    .any(|token| token.trim().eq_ignore_ascii_case("chunked"))
            })
            .unwrap_or(false)
    })
}

/// Compose the client-visible response from the chosen outcome.
///
/// Status, body and headers are copied verbatim, with one exception: a
/// `Transfer-Encoding: chunked` outcome drops any `Content-Length` so the
/// transport re-frames the relayed body with chunked encoding (hyper keys
/// its framing off the Transfer-Encoding header). Everything else,
/// including Host, cookies and redirects from the origin, relays unchanged.
pub fn compose(outcome: UpstreamResponse) -> Response<Full<Bytes>> {
    let chunked = is_chunked(&outcome.headers);

    let mut response = Response::new(Full::new(outcome.body));
    *response.status_mut() = outcome.status;
    *response.headers_mut() = outcome.headers;

    if chunked {
        response.headers_mut().remove(header::CONTENT_LENGTH);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use hyper::StatusCode;

    fn outcome(status: u16, headers: HeaderMap, body: &'static str) -> UpstreamResponse {
        UpstreamResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_status_and_body_copied() {
        let response = compose(outcome(404, HeaderMap::new(), "missing"));
        assert_eq!(response.status(), 404);
    }

    #[test]
    fn test_headers_relayed_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert("set-cookie", HeaderValue::from_static("session=1"));
        headers.insert("location", HeaderValue::from_static("https://elsewhere/"));
        headers.insert("content-encoding", HeaderValue::from_static("gzip"));

        let response = compose(outcome(301, headers, ""));
        assert_eq!(response.headers().get("set-cookie").unwrap(), "session=1");
        assert_eq!(
            response.headers().get("location").unwrap(),
            "https://elsewhere/"
        );
        assert_eq!(response.headers().get("content-encoding").unwrap(), "gzip");
    }

    #[test]
    fn test_chunked_drops_content_length() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::TRANSFER_ENCODING,
            HeaderValue::from_static("chunked"),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("2"));

        let response = compose(outcome(200, headers, "ok"));
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
        assert_eq!(
            response.headers().get(header::TRANSFER_ENCODING).unwrap(),
            "chunked"
        );
    }

    #[test]
    fn test_non_chunked_content_length_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("2"));

        let response = compose(outcome(200, headers, "ok"));
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "2");
    }

    #[test]
    fn test_is_chunked_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::TRANSFER_ENCODING,
            HeaderValue::from_static("Chunked"),
        );
        assert!(is_chunked(&headers));
    }

    #[test]
    fn test_is_chunked_multi_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::TRANSFER_ENCODING,
            HeaderValue::from_static("gzip, chunked"),
        );
        assert!(is_chunked(&headers));
    }

    #[test]
    fn test_is_chunked_other_encoding() {
        let mut headers = HeaderMap::new();
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("gzip"));
        assert!(!is_chunked(&headers));
    }

    #[test]
    fn test_is_chunked_absent() {
        assert!(!is_chunked(&HeaderMap::new()));
    }
}
