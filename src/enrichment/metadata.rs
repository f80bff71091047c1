//! Extraction of a page's representative image from its HTML metadata.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use std::collections::HashMap;

lazy_static! {
    static ref META_TAG: Regex = Regex::new(r"(?is)<meta\b[^>]*>").unwrap();
    static ref LINK_TAG: Regex = Regex::new(r"(?is)<link\b[^>]*>").unwrap();
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"(?is)([a-z][a-z0-9:_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap();
}

/// Image metadata candidates, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTag {
    OpenGraphSecureUrl,
    OpenGraph,
    Twitter,
    LinkRelImage,
}

pub const IMAGE_TAG_PRIORITY: &[ImageTag] = &[
    ImageTag::OpenGraphSecureUrl,
    ImageTag::OpenGraph,
    ImageTag::Twitter,
    ImageTag::LinkRelImage,
];

fn parse_attributes(tag: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(tag)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps.get(2).or(caps.get(3)).or(caps.get(4))?.as_str();
            Some((name, decode_entities(value.trim())))
        })
        .collect()
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&#38;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

fn meta_content(metas: &[HashMap<String, String>], names: &[&str]) -> Vec<String> {
    metas
        .iter()
        .filter(|attrs| {
            let key = attrs
                .get("property")
                .or_else(|| attrs.get("name"))
                .map(|k| k.to_ascii_lowercase());
            key.map(|k| names.contains(&k.as_str())).unwrap_or(false)
        })
        .filter_map(|attrs| attrs.get("content").cloned())
        .collect()
}

/// Candidate values of `tag` in document order.
fn candidates_for(
    tag: ImageTag,
    metas: &[HashMap<String, String>],
    links: &[HashMap<String, String>],
) -> Vec<String> {
    match tag {
        ImageTag::OpenGraphSecureUrl => meta_content(metas, &["og:image:secure_url"]),
        ImageTag::OpenGraph => meta_content(metas, &["og:image", "og:image:url"]),
        ImageTag::Twitter => meta_content(metas, &["twitter:image", "twitter:image:src"]),
        ImageTag::LinkRelImage => links
            .iter()
            .filter(|attrs| {
                attrs
                    .get("rel")
                    .map(|rel| {
                        rel.split_whitespace()
                            .any(|r| r.eq_ignore_ascii_case("image_src"))
                    })
                    .unwrap_or(false)
            })
            .filter_map(|attrs| attrs.get("href").cloned())
            .collect(),
    }
}

/// Resolves a metadata value against the page address.
///
/// Rejects empty values, values containing the literal `undefined` and
/// anything that does not end up as an absolute http(s) URL.
pub fn resolve_candidate(page_url: &Url, candidate: &str) -> Option<Url> {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.contains("undefined") {
        return None;
    }
    let resolved = page_url.join(candidate).ok()?;
    match resolved.scheme() {
        "http" | "https" if resolved.host_str().is_some() => Some(resolved),
        _ => None,
    }
}

/// Finds the page's representative image, scanning tags in priority order.
pub fn find_image_url(html: &str, page_url: &Url) -> Option<Url> {
    let metas: Vec<_> = META_TAG
        .find_iter(html)
        .map(|m| parse_attributes(m.as_str()))
        .collect();
    let links: Vec<_> = LINK_TAG
        .find_iter(html)
        .map(|m| parse_attributes(m.as_str()))
        .collect();

    IMAGE_TAG_PRIORITY.iter().find_map(|tag| {
        candidates_for(*tag, &metas, &links)
            .iter()
            .find_map(|candidate| resolve_candidate(page_url, candidate))
    })
}
