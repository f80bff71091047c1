//! Individual image sources consulted by the resolver chain.
//!
//! Every lookup here may fail for many mundane reasons (no such entity, page
//! without metadata, timeouts). Failures are reported as [`SourceError`] and
//! never leave the resolver chain.

use futures::StreamExt;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Method, Url};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::metadata::find_image_url;
use crate::fallback::{first_of, Attempt};
use crate::image_proxy::{validate_target, HostPolicy, HostResolver};

lazy_static! {
    static ref KNOWLEDGE_BASE_ID: Regex = Regex::new(r"^Q[0-9]+$").unwrap();
    static ref LANGUAGE_CODE: Regex = Regex::new(r"^[a-z][a-z0-9-]{1,11}$").unwrap();
}

/// Knowledge-base property holding an entity's image filename.
const IMAGE_PROPERTY: &str = "P18";

/// Conventional locations of a site's share image, probed in order.
pub const GUESSED_IMAGE_PATHS: &[&str] = &[
    "/og-image.jpg",
    "/og-image.png",
    "/images/og-image.jpg",
    "/social-share.jpg",
    "/share.jpg",
    "/hero.jpg",
];

/// Only the head of a page is needed to find its metadata.
const MAX_PAGE_BYTES: usize = 512 * 1024;

const MAX_SITE_REDIRECTS: usize = 5;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("not applicable: {0}")]
    NotApplicable(&'static str),

    #[error("no image found")]
    NoImage,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("refusing to fetch: {0}")]
    Blocked(String),

    #[error("invalid payload: {0}")]
    Payload(String),
}

/// Validates a knowledge-base identifier.
pub fn parse_knowledge_base_id(raw: &str) -> Option<&str> {
    let id = raw.trim();
    KNOWLEDGE_BASE_ID.is_match(id).then_some(id)
}

/// Splits a `lang:Title` encyclopedia reference.
///
/// Full URLs are not references, their scheme is not a language.
pub fn parse_encyclopedia_reference(raw: &str) -> Option<(&str, &str)> {
    let (lang, title) = raw.trim().split_once(':')?;
    let title = title.trim();
    if !LANGUAGE_CODE.is_match(lang) || title.is_empty() || title.starts_with("//") {
        return None;
    }
    Some((lang, title))
}

/// Parses a website tag, assuming https when the scheme is missing.
pub fn parse_website(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = if raw.contains("://") {
        Url::parse(raw).ok()?
    } else {
        Url::parse(&format!("https://{}", raw)).ok()?
    };
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), SourceError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(SourceError::Status(response.status().as_u16()))
    }
}

/// Entity lookups against the knowledge base (Wikidata).
pub struct KnowledgeBaseSource {
    client: reqwest::Client,
    base_url: String,
    media_repository_url: String,
    thumbnail_width: u32,
}

impl KnowledgeBaseSource {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        media_repository_url: &str,
        thumbnail_width: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            media_repository_url: media_repository_url.trim_end_matches('/').to_string(),
            thumbnail_width,
        }
    }

    /// Media repository URL serving `filename` at the thumbnail width.
    pub fn media_url(&self, filename: &str) -> String {
        let filename = filename.trim().replace(' ', "_");
        format!(
            "{}/wiki/Special:FilePath/{}?width={}",
            self.media_repository_url,
            urlencoding::encode(&filename),
            self.thumbnail_width
        )
    }

    pub async fn lookup(&self, id: &str) -> Result<String, SourceError> {
        let url = format!("{}/wiki/Special:EntityData/{}.json", self.base_url, id);
        let response = self.client.get(&url).send().await?;
        check_status(&response)?;
        let document: Value = response.json().await?;

        let entities = document
            .get("entities")
            .and_then(Value::as_object)
            .ok_or_else(|| SourceError::Payload("missing entities".to_string()))?;
        // Redirected entities are keyed by their target id.
        let entity = entities
            .get(id)
            .or_else(|| entities.values().next())
            .ok_or(SourceError::NoImage)?;

        let filename = entity
            .pointer(&format!("/claims/{}/0/mainsnak/datavalue/value", IMAGE_PROPERTY))
            .and_then(Value::as_str)
            .filter(|f| !f.trim().is_empty())
            .ok_or(SourceError::NoImage)?;

        Ok(self.media_url(filename))
    }
}

/// Thumbnail lookups against a language edition of the encyclopedia (Wikipedia).
pub struct EncyclopediaSource {
    client: reqwest::Client,
    url_template: String,
    thumbnail_width: u32,
}

impl EncyclopediaSource {
    /// `url_template` contains a `{lang}` placeholder, e.g. `https://{lang}.wikipedia.org`.
    pub fn new(client: reqwest::Client, url_template: &str, thumbnail_width: u32) -> Self {
        Self {
            client,
            url_template: url_template.trim_end_matches('/').to_string(),
            thumbnail_width,
        }
    }

    pub async fn lookup(&self, lang: &str, title: &str) -> Result<String, SourceError> {
        let url = format!("{}/w/api.php", self.url_template.replace("{lang}", lang));
        let width = self.thumbnail_width.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("action", "query"),
                ("prop", "pageimages"),
                ("format", "json"),
                ("redirects", "1"),
                ("pithumbsize", width.as_str()),
                ("titles", title),
            ])
            .send()
            .await?;
        check_status(&response)?;
        let document: Value = response.json().await?;

        document
            .pointer("/query/pages")
            .and_then(Value::as_object)
            .and_then(|pages| {
                pages.values().find_map(|page| {
                    page.pointer("/thumbnail/source")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
            })
            .ok_or(SourceError::NoImage)
    }
}

/// Image discovery on an attraction's own website.
///
/// Website tags are arbitrary user data. With a guard resolver set, every
/// hop is checked against the same public-address rules as the image proxy
/// before it is requested, redirects included.
pub struct SiteSource {
    client: reqwest::Client,
    guard: Option<Arc<dyn HostResolver>>,
}

impl SiteSource {
    /// `client` must not follow redirects on its own, hops are followed here.
    pub fn new(client: reqwest::Client, guard: Option<Arc<dyn HostResolver>>) -> Self {
        Self { client, guard }
    }

    async fn vet(&self, url: &Url) -> Result<(), SourceError> {
        match &self.guard {
            Some(resolver) => validate_target(url, &HostPolicy::AllowAll, resolver.as_ref())
                .await
                .map(|_| ())
                .map_err(|e| SourceError::Blocked(e.to_string())),
            None => Ok(()),
        }
    }

    /// Sends `method` to `url`, following redirects one vetted hop at a time.
    async fn send(&self, method: Method, url: Url) -> Result<reqwest::Response, SourceError> {
        let mut current = url;
        for _ in 0..=MAX_SITE_REDIRECTS {
            self.vet(&current).await?;
            let response = self
                .client
                .request(method.clone(), current.clone())
                .send()
                .await?;
            if !response.status().is_redirection() {
                return Ok(response);
            }
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or(SourceError::Status(response.status().as_u16()))?;
            current = current
                .join(location)
                .map_err(|e| SourceError::Payload(e.to_string()))?;
            debug!("Following site redirect to {}", current);
        }
        Err(SourceError::Payload("too many redirects".to_string()))
    }

    /// Fetches the page and scans its metadata for an image.
    pub async fn scrape(&self, site: &Url) -> Result<String, SourceError> {
        let response = self.send(Method::GET, site.clone()).await?;
        check_status(&response)?;
        // Relative candidates resolve against where the page actually lives.
        let page_url = response.url().clone();

        let mut html = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            html.extend_from_slice(&chunk?);
            if html.len() >= MAX_PAGE_BYTES {
                break;
            }
        }

        find_image_url(&String::from_utf8_lossy(&html), &page_url)
            .map(String::from)
            .ok_or(SourceError::NoImage)
    }

    /// Probes conventional share-image paths on the site's origin.
    ///
    /// A probe is accepted on a successful status with an `image/*`
    /// content-type, the bytes themselves are not inspected.
    pub async fn guess(&self, site: &Url) -> Result<String, SourceError> {
        let attempts: Vec<_> = GUESSED_IMAGE_PATHS
            .iter()
            .map(|path: &&'static str| {
                let candidate = site.join(path);
                move || async move {
                    let candidate = match candidate {
                        Ok(url) => url,
                        Err(e) => return Attempt::Fallthrough(SourceError::Payload(e.to_string())),
                    };
                    match self.probe(candidate).await {
                        // Every path shares the origin, no point probing the rest.
                        Err(SourceError::Blocked(reason)) => {
                            Attempt::Halt(SourceError::Blocked(reason))
                        }
                        other => other.into(),
                    }
                }
            })
            .collect();

        first_of(attempts)
            .await
            .map_err(|last| last.unwrap_or(SourceError::NoImage))
    }

    async fn probe(&self, candidate: Url) -> Result<String, SourceError> {
        let response = self.send(Method::HEAD, candidate.clone()).await?;
        check_status(&response)?;
        let is_image = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            debug!("Guessed path {} is not an image", candidate);
            return Err(SourceError::NoImage);
        }
        Ok(candidate.to_string())
    }
}
