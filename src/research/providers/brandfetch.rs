// src/research/providers/brandfetch.rs
//! Brandfetch brand API: name, description, industry, social links, logos
//! and brand colors for a domain.

use async_trait::async_trait;
use serde::Deserialize;

use super::{string_map, text};
use crate::config::ResearchConfig;
use crate::research::http::{clean_domain, ProviderHttp};
use crate::research::types::{
    FetchOutcome, FieldValue, LookupKey, LookupTarget, RecordField, SourceAdapter, SourceId,
    SourceRecord,
};

const SOCIAL_PLATFORMS: [&str; 4] = ["twitter", "linkedin", "facebook", "instagram"];

#[derive(Debug, Default, Deserialize)]
struct Brand {
    name: Option<String>,
    description: Option<String>,
    domain: Option<String>,
    industry: Option<String>,
    company: Option<BrandCompany>,
    #[serde(default)]
    links: Vec<BrandLink>,
    #[serde(default)]
    logos: Vec<BrandLogo>,
    #[serde(default)]
    colors: Vec<BrandColor>,
}

#[derive(Debug, Default, Deserialize)]
struct BrandCompany {
    #[serde(default)]
    industries: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrandLink {
    name: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrandLogo {
    #[serde(default)]
    formats: Vec<LogoFormat>,
}

#[derive(Debug, Deserialize)]
struct LogoFormat {
    format: Option<String>,
    src: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrandColor {
    hex: Option<String>,
}

pub struct BrandfetchAdapter {
    http: ProviderHttp,
    base: String,
    api_key: String,
}

impl BrandfetchAdapter {
    pub fn new(cfg: &ResearchConfig, http: ProviderHttp) -> Self {
        Self {
            http,
            base: cfg.endpoints.brandfetch.trim_end_matches('/').to_string(),
            api_key: cfg.credentials.brandfetch_api_key.clone(),
        }
    }
}

fn to_record(b: Brand, domain: &str) -> SourceRecord {
    let mut r = SourceRecord::new(SourceId::Brandfetch).with(RecordField::Domain, domain);
    r.set(RecordField::Name, text(b.name.as_deref()));
    r.set(RecordField::Description, text(b.description.as_deref()));

    let industry = b.industry.or_else(|| {
        b.company
            .and_then(|c| c.industries.into_iter().find_map(|i| i.name))
    });
    r.set(RecordField::Industry, text(industry.as_deref()));
    r.set(
        RecordField::Website,
        text(b.domain.as_deref()).or_else(|| text(Some(domain))),
    );

    let social = b.links.into_iter().filter_map(|l| {
        let kind = l.name?.trim().to_lowercase();
        SOCIAL_PLATFORMS
            .contains(&kind.as_str())
            .then(|| (kind, l.url.unwrap_or_default()))
    });
    r.set(RecordField::SocialMedia, string_map(social));

    // First PNG rendition of each logo.
    let logos: Vec<FieldValue> = b
        .logos
        .iter()
        .filter_map(|logo| {
            logo.formats
                .iter()
                .find(|f| f.format.as_deref() == Some("png"))
                .and_then(|f| text(f.src.as_deref()))
        })
        .collect();
    if let Some(first) = logos.first() {
        r.set_extra("logo", Some(first.clone()));
        r.set_extra("logos", Some(FieldValue::List(logos)));
    }

    let colors: Vec<FieldValue> = b
        .colors
        .iter()
        .filter_map(|c| text(c.hex.as_deref()))
        .collect();
    if !colors.is_empty() {
        r.set_extra("colors", Some(FieldValue::List(colors)));
    }
    r
}

#[async_trait]
impl SourceAdapter for BrandfetchAdapter {
    fn source(&self) -> SourceId {
        SourceId::Brandfetch
    }

    fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn keyed_on(&self) -> LookupKey {
        LookupKey::Domain
    }

    async fn fetch(&self, target: &LookupTarget) -> FetchOutcome {
        let Some(domain) = target.domain.as_deref().map(clean_domain).filter(|d| !d.is_empty())
        else {
            return FetchOutcome::NotFound;
        };
        let url = format!("{}/brands/{}", self.base, domain);

        match self
            .http
            .get_json::<Brand, _>("brandfetch", |c| c.get(&url).bearer_auth(&self.api_key))
            .await
        {
            Ok(b) => FetchOutcome::Found(to_record(b, &domain)),
            Err(e) => FetchOutcome::from_error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_known_platforms_and_png_logos() {
        let b: Brand = serde_json::from_str(
            r##"{
                "name": "Acme",
                "description": "Rockets and anvils",
                "domain": "acme.com",
                "company": {"industries": [{"name": "Manufacturing"}]},
                "links": [
                    {"name": "Twitter", "url": "https://twitter.com/acme"},
                    {"name": "crunchbase", "url": "https://crunchbase.com/acme"}
                ],
                "logos": [{"formats": [
                    {"format": "svg", "src": "https://cdn/acme.svg"},
                    {"format": "png", "src": "https://cdn/acme.png"}
                ]}],
                "colors": [{"hex": "#ff0000"}]
            }"##,
        )
        .unwrap();
        let r = to_record(b, "acme.com");
        assert_eq!(r.get(RecordField::Industry), Some(&FieldValue::from("Manufacturing")));
        let social = r.get(RecordField::SocialMedia).unwrap().as_map().unwrap();
        assert_eq!(social.keys().collect::<Vec<_>>(), vec!["twitter"]);
        assert_eq!(r.extra["logo"], FieldValue::from("https://cdn/acme.png"));
        assert_eq!(r.extra["colors"], FieldValue::List(vec![FieldValue::from("#ff0000")]));
    }
}
