use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::HarvestConfig;

/// HTTP client plus the URL layout of the remote data API.
pub struct HttpSource {
    client: Client,
    api_base: String,
}

impl HttpSource {
    /// Build the shared client: per-attempt timeout, redirects followed, configured headers on every request.
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (k, v) in &config.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| anyhow!("invalid header name {:?}: {}", k, e))?;
            let value = HeaderValue::from_str(v)
                .map_err(|e| anyhow!("invalid value for header {}: {}", k, e))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    /// `{api}/{lang}/{index_file}`, or `{api}/{index_file}` when no language is given.
    pub fn index_url(&self, lang: Option<&str>, index_file: &str) -> String {
        match lang {
            Some(lang) => join_url(&self.api_base, &[lang, index_file]),
            None => join_url(&self.api_base, &[index_file]),
        }
    }

    /// `{api}/{lang}/{prefix}/{id}.json`
    pub fn detail_url(&self, lang: &str, prefix: &str, id: &str) -> String {
        let file = format!("{}.json", id);
        join_url(&self.api_base, &[lang, prefix, &file])
    }

    pub async fn get(&self, url: &str) -> reqwest::Result<Response> {
        debug!("GET {}", url);
        self.client.get(url).send().await
    }
}

fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        url.push('/');
        url.push_str(segment);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(api_base: &str) -> HttpSource {
        let config = HarvestConfig {
            api_base: api_base.to_string(),
            ..HarvestConfig::default()
        };
        HttpSource::new(&config).unwrap()
    }

    #[test]
    fn test_index_urls() {
        let src = source("https://api.example.com/ww/data/");
        assert_eq!(
            src.index_url(Some("en"), "character.json"),
            "https://api.example.com/ww/data/en/character.json"
        );
        assert_eq!(
            src.index_url(None, "character.json"),
            "https://api.example.com/ww/data/character.json"
        );
    }

    #[test]
    fn test_detail_url_without_trailing_slash_base() {
        let src = source("http://127.0.0.1:9/data");
        assert_eq!(
            src.detail_url("ja", "weapon", "21010011"),
            "http://127.0.0.1:9/data/ja/weapon/21010011.json"
        );
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let mut config = HarvestConfig::default();
        config
            .headers
            .insert("Bad Header".to_string(), "x".to_string());
        assert!(HttpSource::new(&config).is_err());
    }
}
