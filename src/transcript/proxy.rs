use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use super::vtt::vtt_to_text;
use super::{ProviderOutcome, TranscriptProvider};
use crate::VideoReference;

#[derive(Debug, Deserialize)]
struct VideoMetadata {
    #[serde(default)]
    captions: Vec<CaptionDescriptor>,
}

#[derive(Debug, Deserialize)]
struct CaptionDescriptor {
    /// Human-readable language name, e.g. "English (auto-generated)"
    #[serde(default, alias = "label")]
    language: String,
    #[serde(default, alias = "languageCode")]
    language_code: Option<String>,
    url: String,
}

impl CaptionDescriptor {
    fn is_english(&self) -> bool {
        let code_is_english = self
            .language_code
            .as_deref()
            .is_some_and(|code| code == "en" || code.starts_with("en-"));
        code_is_english || self.language == "en" || self.language.to_lowercase().starts_with("english")
    }
}

/// Caption tracks fetched through a list of Invidious-style proxy instances
pub struct ProxyNetworkProvider {
    client: reqwest::Client,
    instances: Vec<String>,
    timeout: Duration,
}

impl ProxyNetworkProvider {
    pub fn new(client: reqwest::Client, instances: Vec<String>, timeout: Duration) -> Self {
        Self {
            client,
            instances,
            timeout,
        }
    }

    async fn try_instance(&self, instance: &str, video_id: &str) -> ProviderOutcome {
        let base = instance.trim_end_matches('/');
        let metadata_url = format!("{base}/api/v1/videos/{video_id}");
        debug!("Fetching video metadata: {metadata_url}");

        let resp = match self.client.get(&metadata_url).send().await {
            Ok(resp) => resp,
            Err(e) => return ProviderOutcome::TransportError(format!("{metadata_url}: {e}")),
        };
        if !resp.status().is_success() {
            return ProviderOutcome::TransportError(format!("{metadata_url} returned {}", resp.status()));
        }
        let metadata: VideoMetadata = match resp.json().await {
            Ok(metadata) => metadata,
            Err(e) => return ProviderOutcome::TransportError(format!("{metadata_url}: invalid metadata: {e}")),
        };

        let Some(track) = metadata.captions.iter().find(|c| c.is_english()) else {
            return ProviderOutcome::Declined(format!("{base} has no English caption track"));
        };

        let caption_url = resolve_url(base, &track.url);
        debug!("Fetching caption track {:?}: {caption_url}", track.language);

        let resp = match self.client.get(&caption_url).send().await {
            Ok(resp) => resp,
            Err(e) => return ProviderOutcome::TransportError(format!("{caption_url}: {e}")),
        };
        if !resp.status().is_success() {
            return ProviderOutcome::TransportError(format!("{caption_url} returned {}", resp.status()));
        }
        match resp.text().await {
            Ok(payload) => ProviderOutcome::Transcript(vtt_to_text(&payload)),
            Err(e) => ProviderOutcome::TransportError(format!("{caption_url}: {e}")),
        }
    }
}

#[async_trait]
impl TranscriptProvider for ProxyNetworkProvider {
    fn name(&self) -> &'static str {
        "proxy-network"
    }

    async fn fetch(&self, video: &VideoReference) -> ProviderOutcome {
        let mut failures = Vec::new();
        let mut any_transport_error = false;

        for instance in &self.instances {
            let outcome = match tokio::time::timeout(self.timeout, self.try_instance(instance, video.as_str())).await {
                Ok(outcome) => outcome,
                Err(_) => ProviderOutcome::TransportError(format!("{instance} timed out after {:?}", self.timeout)),
            };
            match outcome {
                ProviderOutcome::Transcript(text) if !text.trim().is_empty() => {
                    debug!("Proxy {instance} returned a transcript for {video}");
                    return ProviderOutcome::Transcript(text);
                }
                ProviderOutcome::Transcript(_) => failures.push(format!("{instance} returned an empty track")),
                ProviderOutcome::Declined(reason) => failures.push(reason),
                ProviderOutcome::TransportError(reason) => {
                    any_transport_error = true;
                    failures.push(reason);
                }
            }
            debug!("Proxy attempt failed: {}", failures.last().map(String::as_str).unwrap_or_default());
        }

        if failures.is_empty() {
            return ProviderOutcome::Declined("no proxy instances configured".to_string());
        }
        let summary = failures.join("; ");
        if any_transport_error {
            ProviderOutcome::TransportError(summary)
        } else {
            ProviderOutcome::Declined(summary)
        }
    }
}

/// Caption URLs from proxies are usually host-relative.
fn resolve_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}
