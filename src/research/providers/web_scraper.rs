// src/research/providers/web_scraper.rs
//! Plain homepage scrape: name, description, social profile links and a
//! rough technology fingerprint. Regex over the raw HTML; no DOM.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::text;
use crate::config::ResearchConfig;
use crate::research::clean_text;
use crate::research::http::{clean_domain, ProviderHttp};
use crate::research::types::{
    FetchOutcome, FieldValue, LookupKey, LookupTarget, RecordField, SourceAdapter, SourceId,
    SourceRecord,
};

const MIN_PARAGRAPH_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 500;

static RE_META: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());
static RE_SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>").unwrap());
static RE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z_:\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static RE_PARA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").unwrap());
static RE_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<a\b[^>]*\bhref\s*=\s*["']([^"']+)["']"#).unwrap());
static RE_TWITTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?:)?//(?:www\.|mobile\.)?(?:twitter\.com|x\.com)/([A-Za-z0-9_]+)").unwrap()
});
static RE_LINKEDIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)linkedin\.com/company/([A-Za-z0-9\-_]+)").unwrap());
static RE_FACEBOOK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)facebook\.com/([A-Za-z0-9.\-_]+)").unwrap());
static RE_INSTAGRAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)instagram\.com/([A-Za-z0-9._]+)").unwrap());

/// Script/asset host fragments and the product they indicate.
const SCRIPT_FINGERPRINTS: [(&str, &str); 12] = [
    ("googletagmanager.com", "Google Tag Manager"),
    ("google-analytics.com", "Google Analytics"),
    ("cdn.shopify.com", "Shopify"),
    ("js.hs-scripts.com", "HubSpot"),
    ("js.hsforms.net", "HubSpot"),
    ("/wp-content/", "WordPress"),
    ("squarespace.com", "Squarespace"),
    ("static.wixstatic.com", "Wix"),
    ("js.stripe.com", "Stripe"),
    ("widget.intercom.io", "Intercom"),
    ("cdn.segment.com", "Segment"),
    ("static.hotjar.com", "Hotjar"),
];

/// What one homepage yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedPage {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub social: BTreeMap<String, String>,
    pub technologies: Vec<String>,
}

fn attributes(tag: &str) -> HashMap<String, String> {
    RE_ATTR
        .captures_iter(tag)
        .map(|c| {
            let v = c.get(2).or_else(|| c.get(3)).map_or("", |m| m.as_str());
            (
                c[1].to_ascii_lowercase(),
                html_escape::decode_html_entities(v).trim().to_string(),
            )
        })
        .collect()
}

/// Content of the first `<meta>` whose `key` attribute equals `value`.
fn meta_content(metas: &[HashMap<String, String>], key: &str, value: &str) -> Option<String> {
    metas
        .iter()
        .find(|m| m.get(key).is_some_and(|v| v.eq_ignore_ascii_case(value)))
        .and_then(|m| m.get("content"))
        .filter(|c| !c.is_empty())
        .cloned()
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn company_name(metas: &[HashMap<String, String>], title: &str, domain: &str) -> String {
    if let Some(site) = meta_content(metas, "property", "og:site_name") {
        return site;
    }
    if !title.is_empty() {
        let mut t = title;
        for sep in [" - ", " | ", " – "] {
            if let Some((head, _)) = t.split_once(sep) {
                t = head;
            }
        }
        return t.trim().to_string();
    }
    let d = clean_domain(domain);
    title_case(d.strip_prefix("www.").unwrap_or(&d).split('.').next().unwrap_or_default())
}

fn description(metas: &[HashMap<String, String>], html: &str) -> Option<String> {
    meta_content(metas, "name", "description")
        .or_else(|| meta_content(metas, "property", "og:description"))
        .or_else(|| {
            RE_PARA
                .captures_iter(html)
                .map(|c| clean_text(&c[1]))
                .find(|t| t.chars().count() > MIN_PARAGRAPH_CHARS)
                .map(|t| t.chars().take(MAX_DESCRIPTION_CHARS).collect())
        })
}

/// Social profiles linked from the page. First link per platform wins.
pub fn social_links(html: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut put = |k: &str, v: &str| {
        out.entry(k.to_string()).or_insert_with(|| v.to_string());
    };

    for c in RE_ANCHOR.captures_iter(html) {
        let href = html_escape::decode_html_entities(&c[1]).trim().to_string();
        let lower = href.to_lowercase();

        if let Some(m) = RE_TWITTER.captures(&href) {
            put("twitter_url", &href);
            put("twitter_id", &m[1]);
            put("twitter_handle", &format!("@{}", &m[1]));
        } else if lower.contains("linkedin.com/company") {
            put("linkedin_url", &href);
            if let Some(m) = RE_LINKEDIN.captures(&href) {
                put("linkedin_id", &m[1]);
                put("linkedin_vanity_name", &m[1]);
            }
        } else if lower.contains("facebook.com") {
            put("facebook_url", &href);
            if let Some(m) = RE_FACEBOOK.captures(&href) {
                put("facebook_id", &m[1]);
            }
        } else if lower.contains("instagram.com") {
            put("instagram_url", &href);
            if let Some(m) = RE_INSTAGRAM.captures(&href) {
                put("instagram_id", &m[1]);
            }
        } else if lower.contains("youtube.com") {
            put("youtube_url", &href);
        }
    }
    out
}

fn technologies(metas: &[HashMap<String, String>], html: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut add = |t: &str| {
        if !t.is_empty() && !out.iter().any(|x| x.eq_ignore_ascii_case(t)) {
            out.push(t.to_string());
        }
    };

    // "WordPress 6.4.2" -> "WordPress"
    if let Some(gen) = meta_content(metas, "name", "generator") {
        add(gen.split_whitespace().next().unwrap_or_default());
    }

    let srcs: Vec<String> = RE_SCRIPT
        .find_iter(html)
        .filter_map(|m| attributes(m.as_str()).remove("src"))
        .collect();
    for (needle, product) in SCRIPT_FINGERPRINTS {
        // Path fingerprints also show up in stylesheet and image URLs.
        let hit = if needle.starts_with('/') {
            html.contains(needle)
        } else {
            srcs.iter().any(|s| s.to_lowercase().contains(needle))
        };
        if hit {
            add(product);
        }
    }
    out
}

/// Parse a fetched homepage.
pub fn parse_page(html: &str, domain: &str) -> ScrapedPage {
    let metas: Vec<HashMap<String, String>> =
        RE_META.find_iter(html).map(|m| attributes(m.as_str())).collect();
    let title = RE_TITLE
        .captures(html)
        .map(|c| clean_text(&c[1]))
        .unwrap_or_default();

    ScrapedPage {
        name: company_name(&metas, &title, domain),
        description: description(&metas, html),
        social: social_links(html),
        technologies: technologies(&metas, html),
        title,
    }
}

pub struct WebScraperAdapter {
    http: ProviderHttp,
    scheme: String,
    enabled: bool,
}

impl WebScraperAdapter {
    pub fn new(cfg: &ResearchConfig, http: ProviderHttp) -> Self {
        Self {
            http,
            scheme: cfg.endpoints.scraper_scheme.clone(),
            enabled: cfg.scraper_enabled,
        }
    }

    fn url_for(&self, domain: &str) -> String {
        let d = domain.trim();
        if d.starts_with("http://") || d.starts_with("https://") {
            d.to_string()
        } else {
            format!("{}://{}", self.scheme, d)
        }
    }
}

fn to_record(page: ScrapedPage, domain: &str, final_url: &str) -> SourceRecord {
    let mut r = SourceRecord::new(SourceId::WebScraping);
    r.set(RecordField::Name, text(Some(page.name.as_str())));
    r.set(RecordField::Description, text(page.description.as_deref()));
    r.set(RecordField::Domain, text(Some(domain)));
    r.set(RecordField::Website, text(Some(final_url)));
    r.set(RecordField::SocialMedia, super::string_map(page.social));
    if !page.technologies.is_empty() {
        r.set(
            RecordField::Technologies,
            Some(FieldValue::List(
                page.technologies.into_iter().map(FieldValue::Text).collect(),
            )),
        );
    }
    r.set_extra("title", text(Some(page.title.as_str())));
    r.set_extra("url", text(Some(final_url)));
    r
}

#[async_trait]
impl SourceAdapter for WebScraperAdapter {
    fn source(&self) -> SourceId {
        SourceId::WebScraping
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn keyed_on(&self) -> LookupKey {
        LookupKey::Domain
    }

    async fn fetch(&self, target: &LookupTarget) -> FetchOutcome {
        let Some(raw) = target.domain.as_deref().filter(|d| !d.trim().is_empty()) else {
            return FetchOutcome::NotFound;
        };
        let url = self.url_for(raw);
        let domain = clean_domain(raw);

        match self.http.get_page("web_scraping", &url).await {
            Ok(page) => {
                let parsed = parse_page(&page.body, &domain);
                FetchOutcome::Found(to_record(parsed, &domain, &page.final_url))
            }
            Err(e) => FetchOutcome::from_error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head>
          <title>Acme Rockets | Home</title>
          <meta name="description" content="Acme builds reusable rockets &amp; anvils.">
          <meta content="WordPress 6.4.2" name="generator">
          <script src="https://www.googletagmanager.com/gtm.js?id=GTM-1"></script>
        </head><body>
          <a href="https://twitter.com/acmerockets">Twitter</a>
          <a href="https://www.linkedin.com/company/acme-rockets/">LinkedIn</a>
          <a href="https://www.facebook.com/acme.rockets">Facebook</a>
          <a href="https://www.youtube.com/@acme">YouTube</a>
          <a href="https://dropbox.com/s/file">not social</a>
        </body></html>
    "#;

    #[test]
    fn extracts_name_description_and_tech() {
        let p = parse_page(PAGE, "acme.com");
        assert_eq!(p.name, "Acme Rockets");
        assert_eq!(p.title, "Acme Rockets | Home");
        assert_eq!(
            p.description.as_deref(),
            Some("Acme builds reusable rockets & anvils.")
        );
        assert_eq!(p.technologies, vec!["WordPress", "Google Tag Manager"]);
    }

    #[test]
    fn extracts_social_profiles() {
        let s = social_links(PAGE);
        assert_eq!(s["twitter_handle"], "@acmerockets");
        assert_eq!(s["linkedin_id"], "acme-rockets");
        assert_eq!(s["linkedin_vanity_name"], "acme-rockets");
        assert_eq!(s["facebook_id"], "acme.rockets");
        assert!(s.contains_key("youtube_url"));
        assert!(!s.values().any(|v| v.contains("dropbox")));
    }

    #[test]
    fn og_site_name_beats_title_and_domain_is_last_resort() {
        let p = parse_page(
            r#"<meta property="og:site_name" content="Acme"><title>Welcome - Acme Inc</title>"#,
            "acme.com",
        );
        assert_eq!(p.name, "Acme");

        let p = parse_page("<html></html>", "www.acme.com");
        assert_eq!(p.name, "Acme");
        assert_eq!(p.description, None);
    }

    #[test]
    fn long_paragraph_is_fallback_description() {
        let body = format!("<p>short</p><p>{}</p>", "word ".repeat(150));
        let p = parse_page(&body, "acme.com");
        let d = p.description.unwrap();
        assert_eq!(d.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(d.starts_with("word word"));
    }

    #[test]
    fn bare_domain_gets_scheme() {
        let a = WebScraperAdapter::new(
            &ResearchConfig::default(),
            ProviderHttp::new(&Default::default(), Default::default()).unwrap(),
        );
        assert_eq!(a.url_for("acme.com"), "https://acme.com");
        assert_eq!(a.url_for("http://acme.com/about"), "http://acme.com/about");
    }
}
