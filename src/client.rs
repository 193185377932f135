use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::Url;
use serde::Deserialize;

use crate::auth::Credential;
use crate::error::TransformError;

pub mod mock;

/// The two remote rewrites a chapter can go through.
///
/// Both resolve to the full transformed chapter body. Every kind of failure
/// (transport, status, body) collapses into [`TransformError::TransformFailed`].
pub trait TransformClient: Send + Sync + 'static {
    fn personalize(
        &self,
        chapter_id: &str,
        token: &Credential,
    ) -> impl Future<Output = Result<String, TransformError>> + Send;

    fn translate(
        &self,
        chapter_id: &str,
        token: &Credential,
    ) -> impl Future<Output = Result<String, TransformError>> + Send;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonalizeResponse {
    personalized_content: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_content: Option<String>,
}

pub struct HttpTransformClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTransformClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url).with_context(|| format!("invalid api base url {:?}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("api base url {} cannot carry a path", base_url);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// `chapter_id` is one path segment; a `/` inside it is percent-encoded.
    fn chapter_url(&self, chapter_id: &str, suffix: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("chapter")
                .push(chapter_id)
                .extend(suffix);
        }
        url
    }

    async fn get(&self, url: Url, token: &Credential) -> Result<String, TransformError> {
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(token.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| TransformError::failed(format!("request to {} failed: {}", url, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(TransformError::failed(format!("service error {}: {}", status, text)));
        }

        resp.text()
            .await
            .map_err(|e| TransformError::failed(format!("reading body failed: {}", e)))
    }
}

impl TransformClient for HttpTransformClient {
    fn personalize(
        &self,
        chapter_id: &str,
        token: &Credential,
    ) -> impl Future<Output = Result<String, TransformError>> + Send {
        let url = self.chapter_url(chapter_id, &["personalize"]);
        async move {
            let body = self.get(url, token).await?;
            parse_personalized(&body)
        }
    }

    fn translate(
        &self,
        chapter_id: &str,
        token: &Credential,
    ) -> impl Future<Output = Result<String, TransformError>> + Send {
        let url = self.chapter_url(chapter_id, &["translate", "urdu"]);
        async move {
            let body = self.get(url, token).await?;
            parse_translated(&body)
        }
    }
}

fn non_empty(content: Option<String>, field: &str) -> Result<String, TransformError> {
    content
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| TransformError::failed(format!("response missing {}", field)))
}

pub(crate) fn parse_personalized(body: &str) -> Result<String, TransformError> {
    let parsed: PersonalizeResponse = serde_json::from_str(body)
        .map_err(|e| TransformError::failed(format!("malformed response: {}", e)))?;
    non_empty(parsed.personalized_content, "personalizedContent")
}

pub(crate) fn parse_translated(body: &str) -> Result<String, TransformError> {
    let parsed: TranslateResponse = serde_json::from_str(body)
        .map_err(|e| TransformError::failed(format!("malformed response: {}", e)))?;
    non_empty(parsed.translated_content, "translatedContent")
}
