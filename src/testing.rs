//! Stub collaborators shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;

use crate::VideoReference;
use crate::completion::{Completer, Completion, CompletionBackend, CompletionError, Credential};
use crate::transcript::{ProviderOutcome, TranscriptProvider};

/// Client that never routes loopback stubs through an environment proxy
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().expect("build test client")
}

/// Minimal two-page PDF using the built-in Helvetica font
pub fn two_page_pdf() -> Vec<u8> {
    let page = |contents: usize| {
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {contents} 0 R /Resources << /Font << /F1 7 0 R >> >> >>"
        )
    };
    let stream = |text: &str| {
        let content = format!("BT /F1 24 Tf 72 700 Td ({text}) Tj ET");
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len())
    };
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 2 >>".to_string(),
        page(4),
        stream("Hello page one"),
        page(6),
        stream("Second page text"),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    pdf
}

/// Transcript provider returning a fixed outcome and counting calls
#[derive(Clone)]
pub struct StubProvider {
    name: &'static str,
    outcome: ProviderOutcome,
    calls: Arc<AtomicUsize>,
}

impl StubProvider {
    pub fn new(name: &'static str, outcome: ProviderOutcome) -> Self {
        Self {
            name,
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptProvider for StubProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, _video: &VideoReference) -> ProviderOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Completer replaying scripted results in order and recording prompts
#[derive(Default)]
pub struct ScriptedCompleter {
    responses: Mutex<VecDeque<Completion>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompleter {
    pub fn new(responses: Vec<Completion>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(&self, prompt: &str) -> Completion {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(CompletionError::Malformed("stub")))
    }
}

struct SharedCompleter(Arc<ScriptedCompleter>);

#[async_trait]
impl Completer for SharedCompleter {
    async fn complete(&self, prompt: &str) -> Completion {
        self.0.complete(prompt).await
    }
}

/// Backend handing out one shared scripted completer
pub struct StubBackend {
    pub completer: Arc<ScriptedCompleter>,
    connects: AtomicUsize,
}

impl StubBackend {
    pub fn new(responses: Vec<Completion>) -> Self {
        Self {
            completer: Arc::new(ScriptedCompleter::new(responses)),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl CompletionBackend for StubBackend {
    fn connect(&self, _credential: Credential) -> Box<dyn Completer> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Box::new(SharedCompleter(self.completer.clone()))
    }
}

impl CompletionBackend for Arc<StubBackend> {
    fn connect(&self, credential: Credential) -> Box<dyn Completer> {
        self.as_ref().connect(credential)
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

/// Loopback HTTP server answering every request through `handler(path)`
pub struct StubHttpServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StubHttpServer {
    pub fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + 'static,
    {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start stub server");
        let base_url = format!("http://{}", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(20)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let path = request.url().to_string();
                recorded.lock().unwrap().push(RecordedRequest {
                    method: request.method().to_string(),
                    path: path.clone(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.to_string(), h.value.to_string()))
                        .collect(),
                    body,
                });

                let (status, text) = handler(&path);
                let _ = request.respond(tiny_http::Response::from_string(text).with_status_code(status));
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubHttpServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
