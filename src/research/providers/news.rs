// src/research/providers/news.rs
//! Recent coverage from NewsAPI and GNews behind a single `news` source.
//! Backends run concurrently; articles are cleaned, de-duplicated and
//! sorted newest first.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::config::{NewsSettings, ResearchConfig};
use crate::research::clean_text;
use crate::research::error::ProviderError;
use crate::research::http::ProviderHttp;
use crate::research::types::{
    FetchOutcome, LookupTarget, NewsItem, SourceAdapter, SourceId, SourceRecord,
};

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct GnewsResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<RawOutlet>,
    author: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOutlet {
    name: Option<String>,
}

impl RawArticle {
    fn into_item(self) -> NewsItem {
        let or_unknown = |s: Option<String>| {
            s.map(|v| clean_text(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "Unknown".to_string())
        };
        NewsItem {
            title: clean_text(self.title.as_deref().unwrap_or_default()),
            description: clean_text(self.description.as_deref().unwrap_or_default()),
            url: self.url.unwrap_or_default().trim().to_string(),
            published_at: self.published_at.unwrap_or_default(),
            source: or_unknown(self.source.and_then(|o| o.name)),
            author: or_unknown(self.author),
            content: clean_text(self.content.as_deref().unwrap_or_default()),
        }
    }
}

pub struct NewsAdapter {
    http: ProviderHttp,
    newsapi_base: String,
    newsapi_key: String,
    gnews_base: String,
    gnews_key: String,
    settings: NewsSettings,
}

impl NewsAdapter {
    pub fn new(cfg: &ResearchConfig, http: ProviderHttp) -> Self {
        Self {
            http,
            newsapi_base: cfg.endpoints.newsapi.trim_end_matches('/').to_string(),
            newsapi_key: cfg.credentials.newsapi_key.clone(),
            gnews_base: cfg.endpoints.gnews.trim_end_matches('/').to_string(),
            gnews_key: cfg.credentials.gnews_api_key.clone(),
            settings: cfg.news.clone(),
        }
    }

    // Each backend over-fetches so the merged list still fills `limit` after dedup.
    fn per_backend(&self) -> usize {
        self.settings.limit.max(1) * 2
    }

    async fn from_newsapi(&self, query: &str) -> Result<Vec<NewsItem>, ProviderError> {
        let to = Utc::now();
        let from = to - Duration::days(self.settings.days_back.max(0));
        let url = format!("{}/everything", self.newsapi_base);
        let page_size = self.per_backend().to_string();
        let from_s = from.format("%Y-%m-%d").to_string();
        let to_s = to.format("%Y-%m-%d").to_string();

        let resp: NewsApiResponse = self
            .http
            .get_json("newsapi", |c| {
                c.get(&url).query(&[
                    ("q", query),
                    ("from", from_s.as_str()),
                    ("to", to_s.as_str()),
                    ("sortBy", "relevancy"),
                    ("pageSize", page_size.as_str()),
                    ("language", "en"),
                    ("apiKey", self.newsapi_key.as_str()),
                ])
            })
            .await?;

        if resp.status != "ok" {
            return Err(ProviderError::Payload(
                resp.message.unwrap_or_else(|| "unknown NewsAPI error".into()),
            ));
        }
        Ok(resp.articles.into_iter().map(RawArticle::into_item).collect())
    }

    async fn from_gnews(&self, query: &str) -> Result<Vec<NewsItem>, ProviderError> {
        let from = Utc::now() - Duration::days(self.settings.days_back.max(0));
        let url = format!("{}/search", self.gnews_base);
        let max = self.per_backend().to_string();
        let from_s = from.format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let resp: GnewsResponse = self
            .http
            .get_json("gnews", |c| {
                c.get(&url).query(&[
                    ("q", query),
                    ("lang", "en"),
                    ("max", max.as_str()),
                    ("from", from_s.as_str()),
                    ("apikey", self.gnews_key.as_str()),
                ])
            })
            .await?;

        Ok(resp.articles.into_iter().map(RawArticle::into_item).collect())
    }
}

#[async_trait]
impl SourceAdapter for NewsAdapter {
    fn source(&self) -> SourceId {
        SourceId::News
    }

    fn enabled(&self) -> bool {
        !self.newsapi_key.is_empty() || !self.gnews_key.is_empty()
    }

    async fn fetch(&self, target: &LookupTarget) -> FetchOutcome {
        let query = target.company_name.trim();
        let newsapi = async {
            if self.newsapi_key.is_empty() {
                None
            } else {
                Some(self.from_newsapi(query).await)
            }
        };
        let gnews = async {
            if self.gnews_key.is_empty() {
                None
            } else {
                Some(self.from_gnews(query).await)
            }
        };
        let (a, b) = tokio::join!(newsapi, gnews);

        let mut articles = Vec::new();
        let mut errors = Vec::new();
        let mut answered = false;
        for (backend, res) in [("newsapi", a), ("gnews", b)] {
            match res {
                Some(Ok(items)) => {
                    answered = true;
                    articles.extend(items);
                }
                Some(Err(ProviderError::NotFound)) => answered = true,
                Some(Err(e)) => {
                    tracing::warn!(target: "research", backend, error = %e, "news backend failed");
                    errors.push(format!("{backend}: {e}"));
                }
                None => {}
            }
        }

        if !answered && !errors.is_empty() {
            return FetchOutcome::Failed(errors.join("; "));
        }

        let items = merge_articles(articles, self.settings.limit);
        if items.is_empty() {
            return FetchOutcome::NotFound;
        }

        let mut record = SourceRecord::new(SourceId::News).with_extra("article_count", items.len() as i64);
        record.news = items;
        FetchOutcome::Found(record)
    }
}

/// Drop repeats (same URL, or same title ignoring case), newest first, cap at `limit`.
pub fn merge_articles(articles: Vec<NewsItem>, limit: usize) -> Vec<NewsItem> {
    let mut seen_urls = HashSet::new();
    let mut seen_titles = HashSet::new();
    let mut unique = Vec::with_capacity(articles.len());

    for a in articles {
        let title = a.title.to_lowercase();
        if !a.url.is_empty() && seen_urls.contains(&a.url) {
            continue;
        }
        if !title.is_empty() && seen_titles.contains(&title) {
            continue;
        }
        seen_urls.insert(a.url.clone());
        seen_titles.insert(title);
        unique.push(a);
    }

    // ISO-8601 timestamps sort lexically; stable sort keeps backend order on ties.
    unique.sort_by(|x, y| y.published_at.cmp(&x.published_at));
    unique.truncate(limit);
    unique
}
