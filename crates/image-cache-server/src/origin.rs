//! Image fetching from the upstream origin

use crate::error::{ImageCacheError, Result};
use image_cache_store::CacheKey;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("image-cache-server/", env!("CARGO_PKG_VERSION"));

/// HTTP client for fetching images from the origin
pub struct OriginClient {
    client: Client,
    base_url: String,
}

impl OriginClient {
    pub fn new(base_url: &Url) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &Url) -> Self {
        Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    /// Origin URL for the image behind `key`
    pub fn image_url(&self, key: &CacheKey) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(key.as_str()))
    }

    /// Fetch the image for `key`, buffering the whole body.
    ///
    /// Single attempt; any transport error, non-success status, textual
    /// content type or empty body is an error.
    pub async fn fetch(&self, key: &CacheKey) -> Result<Vec<u8>> {
        let url = self.image_url(key);
        info!(key = %key, url = %url, "Fetching image from origin");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url = %url, "Origin rejected image request");
            return Err(ImageCacheError::OriginStatus(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(content_type) = content_type.as_deref() {
            if !is_binary_content_type(content_type) {
                return Err(ImageCacheError::OriginPayload(format!(
                    "unexpected content type {}",
                    content_type
                )));
            }
        }

        let data = response.bytes().await?.to_vec();
        if data.is_empty() {
            return Err(ImageCacheError::OriginPayload("empty body".to_string()));
        }

        debug!(
            key = %key,
            size = data.len(),
            content_type = ?content_type,
            "Fetched image from origin"
        );

        Ok(data)
    }
}

/// Whether a response with this content type carries raw binary data.
fn is_binary_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    !(mime.starts_with("text/")
        || mime == "application/json"
        || mime == "application/xml"
        || mime == "application/x-www-form-urlencoded")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> OriginClient {
        OriginClient::new(&Url::parse(base).unwrap()).unwrap()
    }

    #[test]
    fn test_image_url() {
        let origin = client("https://http.cat");
        let key = CacheKey::parse("404").unwrap();
        assert_eq!(origin.image_url(&key), "https://http.cat/404");
    }

    #[test]
    fn test_image_url_with_base_path() {
        let origin = client("http://localhost:4000/images/");
        let key = CacheKey::parse("200").unwrap();
        assert_eq!(origin.image_url(&key), "http://localhost:4000/images/200");
    }

    #[test]
    fn test_image_url_encodes_key() {
        let origin = client("https://http.cat");
        let key = CacheKey::parse("a b?c").unwrap();
        assert_eq!(origin.image_url(&key), "https://http.cat/a%20b%3Fc");
    }

    #[test]
    fn test_binary_content_types() {
        assert!(is_binary_content_type("image/jpeg"));
        assert!(is_binary_content_type("image/png"));
        assert!(is_binary_content_type("application/octet-stream"));
        assert!(!is_binary_content_type("text/html; charset=utf-8"));
        assert!(!is_binary_content_type("Application/JSON"));
        assert!(!is_binary_content_type("application/x-www-form-urlencoded"));
    }
}
