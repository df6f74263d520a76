//! Caption acquisition with tiered fallback.
//!
//! A [`TranscriptChain`] holds independent providers in priority order and
//! returns the first non-empty transcript. A provider that declines or hits
//! a transport error only moves the chain to the next provider; exhausting
//! every provider is the one failure callers see.

pub mod captions;
pub mod proxy;
pub mod subtitles;
pub mod vtt;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::config::Config;
use crate::{SourceText, VideoReference};

/// What a single provider produced for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    /// Caption text, not yet guaranteed non-empty
    Transcript(String),
    /// Provider ran but has nothing for this video (no captions, no track)
    Declined(String),
    /// Network, timeout, process, or status failure
    TransportError(String),
}

#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, video: &VideoReference) -> ProviderOutcome;
}

pub struct TranscriptChain {
    providers: Vec<Box<dyn TranscriptProvider>>,
}

impl TranscriptChain {
    pub fn new(providers: Vec<Box<dyn TranscriptProvider>>) -> Self {
        Self { providers }
    }

    /// Official captions, then proxy instances, then the local subtitle tool.
    pub fn from_config(client: &reqwest::Client, config: &Config) -> Self {
        Self::new(vec![
            Box::new(captions::CaptionsApiProvider::new(
                client.clone(),
                "en",
                config.captions_timeout(),
            )),
            Box::new(proxy::ProxyNetworkProvider::new(
                client.clone(),
                config.proxy_instances.clone(),
                config.proxy_timeout(),
            )),
            Box::new(subtitles::SubtitleToolProvider::new(
                config.subtitle_tool.clone(),
                config.subtitle_client.clone(),
                config.scratch_dir(),
                config.subtitle_timeout(),
            )),
        ])
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolve `url` and try each provider until one yields text.
    pub async fn fetch(&self, url: &str) -> Option<SourceText> {
        let Some(video) = VideoReference::parse(url) else {
            debug!("No video ID in {url:?}, skipping transcript providers");
            return None;
        };
        self.fetch_video(&video).await
    }

    pub async fn fetch_video(&self, video: &VideoReference) -> Option<SourceText> {
        for provider in &self.providers {
            debug!("Trying transcript provider {} for {video}", provider.name());
            match provider.fetch(video).await {
                ProviderOutcome::Transcript(text) => match SourceText::new(&text) {
                    Some(source) => {
                        info!(
                            "Transcript for {video} from {} ({} chars)",
                            provider.name(),
                            source.as_str().chars().count()
                        );
                        return Some(source);
                    }
                    None => debug!("{} returned an empty transcript for {video}", provider.name()),
                },
                ProviderOutcome::Declined(reason) => {
                    debug!("{} declined {video}: {reason}", provider.name());
                }
                ProviderOutcome::TransportError(reason) => {
                    warn!("{} failed for {video}: {reason}", provider.name());
                }
            }
        }
        warn!("All transcript providers exhausted for {video}");
        None
    }
}
