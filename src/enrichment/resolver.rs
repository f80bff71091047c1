//! The image resolver chain.
//!
//! For one record the sources are consulted strictly in order
//! (knowledge base, encyclopedia, site metadata, guessed paths) and the first
//! one yielding a URL wins. Each step checks the shared cache under its own
//! key before going to the network and writes successful lookups back.

use futures::future::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::cache::{CacheNamespace, ImageCache};
use super::sources::{
    parse_encyclopedia_reference, parse_knowledge_base_id, parse_website, EncyclopediaSource,
    KnowledgeBaseSource, SiteSource, SourceError,
};
use crate::config::EnrichmentSettings;
use crate::fallback::{first_of, Attempt, BoxedAttempt};
use crate::geo::{Attraction, AttractionTags};
use crate::image_proxy::{HostResolver, SystemResolver};
use crate::server::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    KnowledgeBase,
    Encyclopedia,
    Site,
    Guess,
}

impl ImageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSource::KnowledgeBase => "knowledgebase",
            ImageSource::Encyclopedia => "encyclopedia",
            ImageSource::Site => "site",
            ImageSource::Guess => "guess",
        }
    }
}

pub struct ImageResolver {
    cache: Arc<dyn ImageCache>,
    knowledge_base: KnowledgeBaseSource,
    encyclopedia: EncyclopediaSource,
    site: SiteSource,
}

impl ImageResolver {
    pub fn new(
        settings: &EnrichmentSettings,
        user_agent: &str,
        cache: Arc<dyn ImageCache>,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(user_agent)
            .build()?;
        let site_client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let site_guard: Option<Arc<dyn HostResolver>> = if settings.allow_private_sites {
            None
        } else {
            Some(Arc::new(SystemResolver))
        };

        Ok(Self {
            cache,
            knowledge_base: KnowledgeBaseSource::new(
                client.clone(),
                &settings.knowledge_base_url,
                &settings.media_repository_url,
                settings.thumbnail_width,
            ),
            encyclopedia: EncyclopediaSource::new(
                client.clone(),
                &settings.encyclopedia_url_template,
                settings.thumbnail_width,
            ),
            site: SiteSource::new(site_client, site_guard),
        })
    }

    pub fn cache(&self) -> &Arc<dyn ImageCache> {
        &self.cache
    }

    /// Sets `record.image_url` from the first source that yields one.
    ///
    /// Records that already carry an image are left untouched and cause no
    /// lookups at all. Never fails, a miss leaves the field unset.
    pub async fn resolve(&self, record: &mut Attraction) {
        if record.image_url.is_some() {
            return;
        }

        match self.resolve_tags(&record.tags).await {
            Some(url) => record.image_url = Some(url),
            None => {
                debug!("No image found for {}", record.id);
                metrics::record_enrichment("miss");
            }
        }
    }

    async fn resolve_tags(&self, tags: &AttractionTags) -> Option<String> {
        let mut steps: Vec<BoxedAttempt<'_, String, SourceError>> = Vec::new();

        if let Some(id) = tags.wikidata.as_deref().and_then(parse_knowledge_base_id) {
            steps.push(Box::new(move || {
                self.cached(
                    CacheNamespace::KnowledgeBase.key(id),
                    ImageSource::KnowledgeBase,
                    self.knowledge_base.lookup(id),
                )
                .boxed()
            }));
        }

        if let Some((lang, title)) = tags
            .wikipedia
            .as_deref()
            .and_then(parse_encyclopedia_reference)
        {
            steps.push(Box::new(move || {
                self.cached(
                    CacheNamespace::Encyclopedia.key(&format!("{}:{}", lang, title)),
                    ImageSource::Encyclopedia,
                    self.encyclopedia.lookup(lang, title),
                )
                .boxed()
            }));
        }

        if let Some(website) = tags.website.as_deref() {
            if let Some(site) = parse_website(website) {
                let key = CacheNamespace::Site.key(website.trim());
                let guess_site = site.clone();
                let guess_key = key.clone();
                steps.push(Box::new(move || {
                    async move {
                        self.cached(key, ImageSource::Site, self.site.scrape(&site))
                            .await
                    }
                    .boxed()
                }));
                steps.push(Box::new(move || {
                    async move {
                        self.cached(guess_key, ImageSource::Guess, self.site.guess(&guess_site))
                            .await
                    }
                    .boxed()
                }));
            }
        }

        first_of(steps).await.ok()
    }

    /// Runs one chain step: cache first, then `lookup`, caching its result.
    async fn cached<F>(
        &self,
        key: String,
        source: ImageSource,
        lookup: F,
    ) -> Attempt<String, SourceError>
    where
        F: Future<Output = Result<String, SourceError>>,
    {
        if let Some(url) = self.cache.get(&key) {
            metrics::record_enrichment("cache");
            return Attempt::Success(url);
        }

        match lookup.await {
            Ok(url) => {
                self.cache.put(&key, &url);
                metrics::record_enrichment(source.as_str());
                Attempt::Success(url)
            }
            Err(err) => {
                debug!("Image source {} failed for {}: {}", source.as_str(), key, err);
                Attempt::Fallthrough(err)
            }
        }
    }
}
