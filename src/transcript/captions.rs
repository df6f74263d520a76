use std::time::Duration;

use async_trait::async_trait;
use eyre::{Result, bail};
use log::debug;
use regex::Regex;
use serde::Deserialize;

use super::{ProviderOutcome, TranscriptProvider};
use crate::VideoReference;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
}

/// Captions straight from YouTube's InnerTube player API
pub struct CaptionsApiProvider {
    client: reqwest::Client,
    lang: String,
    timeout: Duration,
}

/// Why the official API gave up; a missing track is a decline, anything else a transport error.
enum CaptionsFailure {
    NoCaptions,
    Transport(eyre::Report),
}

impl From<eyre::Report> for CaptionsFailure {
    fn from(e: eyre::Report) -> Self {
        CaptionsFailure::Transport(e)
    }
}

impl From<reqwest::Error> for CaptionsFailure {
    fn from(e: reqwest::Error) -> Self {
        CaptionsFailure::Transport(e.into())
    }
}

impl CaptionsApiProvider {
    pub fn new(client: reqwest::Client, lang: &str, timeout: Duration) -> Self {
        Self {
            client,
            lang: lang.to_string(),
            timeout,
        }
    }

    async fn fetch_fragments(&self, video_id: &str) -> Result<Vec<String>, CaptionsFailure> {
        let client = &self.client;
        let lang = self.lang.as_str();

        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        debug!("Fetching watch page: {watch_url}");

        let page_html = client
            .get(&watch_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("https://www.youtube.com/youtubei/v1/player?key={api_key}&prettyPrint=false");

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id
        });

        let resp: InnerTubePlayerResponse = client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let tracks = resp
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default();

        let Some(track) = pick_track(&tracks, lang) else {
            return Err(CaptionsFailure::NoCaptions);
        };
        debug!("Using caption track: lang={}", track.language_code);

        // Step 3: Fetch the caption XML
        let caption_xml = client
            .get(&track.base_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_caption_xml(&caption_xml)?)
    }
}

#[async_trait]
impl TranscriptProvider for CaptionsApiProvider {
    fn name(&self) -> &'static str {
        "captions-api"
    }

    async fn fetch(&self, video: &VideoReference) -> ProviderOutcome {
        match tokio::time::timeout(self.timeout, self.fetch_fragments(video.as_str())).await {
            Ok(Ok(fragments)) => ProviderOutcome::Transcript(fragments.join(" ")),
            Ok(Err(CaptionsFailure::NoCaptions)) => ProviderOutcome::Declined(format!("no captions available for video {video}")),
            Ok(Err(CaptionsFailure::Transport(e))) => ProviderOutcome::TransportError(format!("{e:#}")),
            Err(_) => ProviderOutcome::TransportError(format!("timed out after {:?}", self.timeout)),
        }
    }
}

/// Requested language if present, otherwise any English variant.
fn pick_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.language_code == lang)
        .or_else(|| tracks.iter().find(|t| t.language_code.starts_with("en")))
}

fn extract_api_key(html: &str) -> Result<String> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    let re2 = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#)?;
    if let Some(caps) = re2.captures(html) {
        return Ok(caps[1].to_string());
    }

    bail!("could not extract InnerTube API key from watch page");
}

/// Caption fragment texts of a timed-text XML document, in order
fn parse_caption_xml(xml: &str) -> Result<Vec<String>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut fragments = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                in_text = true;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                in_text = false;
            }
            Ok(Event::Text(ref e)) if in_text => {
                let raw_text = e.unescape().unwrap_or_default().to_string();
                let text = html_escape::decode_html_entities(&raw_text).trim().to_string();
                if !text.is_empty() {
                    fragments.push(text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(fragments)
}
