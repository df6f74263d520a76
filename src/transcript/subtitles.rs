use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use super::vtt::vtt_to_text;
use super::{ProviderOutcome, TranscriptProvider};
use crate::VideoReference;

const OUTPUT_BASENAME: &str = "transcript";

/// Auto-generated subtitles via a local yt-dlp install
pub struct SubtitleToolProvider {
    command: Vec<String>,
    client_profile: String,
    scratch_dir: PathBuf,
    timeout: Duration,
}

impl SubtitleToolProvider {
    pub fn new(command: Vec<String>, client_profile: String, scratch_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            command,
            client_profile,
            scratch_dir,
            timeout,
        }
    }

    fn tool_args(&self, output_base: &Path, url: &str) -> Vec<String> {
        vec![
            "--write-auto-sub".to_string(),
            "--skip-download".to_string(),
            "--sub-lang".to_string(),
            "en".to_string(),
            "--extractor-args".to_string(),
            format!("youtube:player_client={}", self.client_profile),
            "--output".to_string(),
            output_base.to_string_lossy().to_string(),
            url.to_string(),
        ]
    }

    async fn run_tool(&self, workdir: &Path, video: &VideoReference) -> ProviderOutcome {
        let Some((program, leading)) = self.command.split_first() else {
            return ProviderOutcome::Declined("no subtitle tool configured".to_string());
        };

        let output_base = workdir.join(OUTPUT_BASENAME);
        let args = self.tool_args(&output_base, &video.watch_url());
        debug!("Running subtitle tool: {program} {leading:?} {args:?}");

        let child = tokio::process::Command::new(program)
            .args(leading)
            .args(&args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(status)) if status.success() => {}
            Ok(Ok(status)) => return ProviderOutcome::TransportError(format!("{program} exited with status {status}")),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return ProviderOutcome::Declined(format!("{program} not found"));
            }
            Ok(Err(e)) => return ProviderOutcome::TransportError(format!("failed to run {program}: {e}")),
            Err(_) => return ProviderOutcome::TransportError(format!("{program} timed out after {:?}", self.timeout)),
        }

        let subtitle_path = workdir.join(format!("{OUTPUT_BASENAME}.en.vtt"));
        match tokio::fs::read_to_string(&subtitle_path).await {
            Ok(payload) => ProviderOutcome::Transcript(vtt_to_text(&payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ProviderOutcome::Declined(format!("{program} produced no English subtitles"))
            }
            Err(e) => ProviderOutcome::TransportError(format!("reading {}: {e}", subtitle_path.display())),
        }
    }
}

#[async_trait]
impl TranscriptProvider for SubtitleToolProvider {
    fn name(&self) -> &'static str {
        "subtitle-tool"
    }

    async fn fetch(&self, video: &VideoReference) -> ProviderOutcome {
        if let Err(e) = std::fs::create_dir_all(&self.scratch_dir) {
            return ProviderOutcome::TransportError(format!("creating {}: {e}", self.scratch_dir.display()));
        }
        // One directory per invocation; removed when `workdir` drops on every path.
        let workdir = match tempfile::Builder::new().prefix("studyx-subs-").tempdir_in(&self.scratch_dir) {
            Ok(dir) => dir,
            Err(e) => return ProviderOutcome::TransportError(format!("creating subtitle workdir: {e}")),
        };
        self.run_tool(workdir.path(), video).await
    }
}
