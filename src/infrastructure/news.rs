//! MediaStack news client.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::config::MediaStackConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    data: Vec<Article>,
}

pub struct MediaStackNews {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
}

impl MediaStackNews {
    pub fn new(config: MediaStackConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url,
            access_key: config.access_key,
        }
    }

    pub async fn get_data(
        &self,
        date: NaiveDate,
        keywords: &str,
        limit: usize,
        language: &str,
        sort_by: &str,
    ) -> Result<Vec<Article>> {
        let url = format!("{}/news", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_key", self.access_key.as_str()),
                ("date", &date.format("%Y-%m-%d").to_string()),
                ("keywords", keywords),
                ("limit", &limit.to_string()),
                ("languages", language),
                ("sort", sort_by),
            ])
            .send()
            .await
            .context("Failed to fetch news from MediaStack")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("MediaStack news fetch failed: {}", error_text);
        }

        let body: NewsResponse = response
            .json()
            .await
            .context("Failed to parse MediaStack response")?;
        info!(%date, keywords, articles = body.data.len(), "fetched news");
        Ok(body.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_deserialization_tolerates_nulls() {
        let raw = r#"{
            "data": [
                {"title": "BTC rallies", "source": "example", "author": null,
                 "description": null, "url": null, "image": null,
                 "category": null, "language": "en", "country": null,
                 "published_at": "2023-01-02T09:00:00+00:00"}
            ]
        }"#;
        let parsed: NewsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].title.as_deref(), Some("BTC rallies"));
        assert!(parsed.data[0].author.is_none());
    }
}
