//! Synthetic responses for `data:` URLs.
//!
//! Pages legitimately reference inline resources (`data:image/png;base64,…`),
//! and those links must verify like any other. This transport decodes the
//! payload locally and answers with a 200 so the rest of the pipeline never
//! special-cases the scheme.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::{FetchError, Response, Transport};

const DEFAULT_MEDIATYPE: &str = "text/plain;charset=US-ASCII";

pub struct DataUriTransport;

impl Transport for DataUriTransport {
    /// Parse `data:[<mediatype>][;base64],<data>` into a 200 response.
    fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| invalid(url, "not a data: URL"))?;
        let (mediatype, payload) = rest
            .split_once(',')
            .ok_or_else(|| invalid(url, "missing ',' separator"))?;

        let mut bytes = urlencoding::decode_binary(payload.as_bytes()).into_owned();
        let mut mediatype = mediatype.to_string();
        if let Some(stripped) = mediatype.strip_suffix(";base64") {
            // base64 payloads are allowed embedded whitespace
            let compact: Vec<u8> = bytes
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            bytes = BASE64
                .decode(&compact)
                .map_err(|e| invalid(url, &e.to_string()))?;
            mediatype = stripped.to_string();
        }
        if mediatype.is_empty() {
            mediatype = DEFAULT_MEDIATYPE.to_string();
        }

        Ok(Response::synthetic(
            url,
            mediatype,
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    }
}

fn invalid(url: &str, why: &str) -> FetchError {
    FetchError::Transport(format!("invalid data: URL {url}: {why}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_html() {
        let resp = DataUriTransport
            .fetch("data:text/html;base64,PGg+aDwvaD4=")
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type.as_deref(), Some("text/html"));
        assert_eq!(resp.body, "<h>h</h>");
    }

    #[test]
    fn test_default_mediatype_and_percent_decoding() {
        let resp = DataUriTransport.fetch("data:,hello%20world").unwrap();
        assert_eq!(resp.content_type.as_deref(), Some(DEFAULT_MEDIATYPE));
        assert_eq!(resp.body, "hello world");
    }

    #[test]
    fn test_missing_comma_is_invalid() {
        assert!(matches!(
            DataUriTransport.fetch("data:text/plain"),
            Err(FetchError::Transport(_))
        ));
    }
}
