#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Both pipelines end to end, with Ollama and the chat API mocked

use serde_json::json;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vault_rag::commands::{EXAMPLE_QUESTION, acquire_api_key};
use vault_rag::config::{Config, OllamaConfig};
use vault_rag::database::VectorStore;
use vault_rag::embeddings::OllamaClient;
use vault_rag::generation::ApiKey;
use vault_rag::pipeline::{IndexingPipeline, QueryPipeline};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const DIMENSION: u32 = 8;

/// Bag-of-letters embedding: similar texts get similar vectors
struct LetterEmbeddings;

fn letter_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.05_f32; DIMENSION as usize];
    for byte in text.to_lowercase().bytes().filter(u8::is_ascii_lowercase) {
        vector[usize::from(byte - b'a') % DIMENSION as usize] += 1.0;
    }
    vector
}

impl Respond for LetterEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .map(|text| letter_vector(text.as_str().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

struct Harness {
    dir: TempDir,
    config: Config,
    _ollama: MockServer,
    openai: MockServer,
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().expect("should create temp dir");
        fs::create_dir_all(dir.path().join("obsidian")).expect("should create vault");

        let ollama = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "0.6.0"})))
            .mount(&ollama)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": "all-minilm:latest"}]
            })))
            .mount(&ollama)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(LetterEmbeddings)
            .mount(&ollama)
            .await;

        let openai = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Focus and patience."},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&openai)
            .await;

        let address = ollama.address();
        let mut config = Config {
            base_dir: dir.path().join("data"),
            ollama: OllamaConfig {
                host: address.ip().to_string(),
                port: address.port(),
                embedding_dimension: DIMENSION,
                ..OllamaConfig::default()
            },
            ..Config::default()
        };
        config.vault.path = dir.path().join("obsidian");
        config.llm.api_base = openai.uri();
        config.embedder.progress_bar = false;

        Self {
            dir,
            config,
            _ollama: ollama,
            openai,
        }
    }

    fn vault(&self) -> &Path {
        &self.config.vault.path
    }

    fn write_note(&self, relative: &str, content: &str) {
        let path = self.vault().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("should create note dir");
        }
        fs::write(path, content).expect("should write note");
    }

    async fn index(&self) -> vault_rag::pipeline::IndexingReport {
        let store = VectorStore::open(&self.config)
            .await
            .expect("should open store");
        let client = OllamaClient::new(&self.config.ollama).expect("client builds");
        IndexingPipeline::new(&self.config, client, store)
            .expect("pipeline builds")
            .run()
            .await
            .expect("indexing succeeds")
    }

    async fn query(&self, question: &str) -> vault_rag::pipeline::Answer {
        let store = VectorStore::connect(&self.config)
            .await
            .expect("should connect store");
        let client = OllamaClient::new(&self.config.ollama).expect("client builds");
        QueryPipeline::new(&self.config, client, store, ApiKey::new("sk-test"))
            .expect("pipeline builds")
            .run(question)
            .await
            .expect("query succeeds")
    }

    async fn chat_requests(&self) -> Vec<serde_json::Value> {
        self.openai
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).expect("json body"))
            .collect()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn single_note_answers_example_question() {
    let harness = Harness::new().await;
    harness.write_note("notes.md", "Business strategy requires focus and patience.");

    let report = harness.index().await;
    assert_eq!(report.written, 1);

    let answer = harness.query(EXAMPLE_QUESTION).await;

    assert_eq!(answer.reply, "Focus and patience.");
    assert_eq!(answer.documents.len(), 1);
    assert_eq!(
        answer.documents[0].content,
        "Business strategy requires focus and patience."
    );
    assert!(answer.documents[0].file_path().is_some_and(|p| p.ends_with("notes.md")));

    let requests = harness.chat_requests().await;
    assert_eq!(requests.len(), 1);
    let sent = requests[0]["messages"][0]["content"]
        .as_str()
        .expect("prompt content is a string");
    assert!(sent.contains("Business strategy requires focus and patience."));
    assert!(sent.contains(&format!("Question: {EXAMPLE_QUESTION}")));
    assert_eq!(requests[0]["model"], json!("gpt-4o"));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_vault_still_calls_the_llm() {
    let harness = Harness::new().await;

    let report = harness.index().await;
    assert_eq!(report.written, 0);

    let store = VectorStore::connect(&harness.config)
        .await
        .expect("should connect store");
    assert_eq!(store.count_documents().await.expect("should count"), 0);

    let answer = harness.query(EXAMPLE_QUESTION).await;
    assert!(answer.documents.is_empty());
    assert!(answer.prompt[0].content.contains("Context:\n\n\nQuestion:"));
    assert_eq!(harness.chat_requests().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn every_file_yields_at_least_one_chunk() {
    let harness = Harness::new().await;
    let long_note: Vec<String> = (0..420).map(|i| format!("entry{i}")).collect();
    harness.write_note("empty.md", "");
    harness.write_note("short.md", "# Title\n\nA short note.");
    harness.write_note("projects/long.md", &long_note.join(" "));
    harness.write_note("projects/list.markdown", "- one\n- two\n  - nested");
    harness.write_note("attachments/diagram.svg", "<svg/>");

    let report = harness.index().await;

    assert_eq!(report.files_discovered, 5);
    assert_eq!(report.files_routed, 4);
    assert!(report.chunks >= report.files_routed);
    // 420 words with a stride of 100: windows at 0, 100, 200, 300
    assert_eq!(report.chunks, 3 + 4);
    assert_eq!(report.written, report.chunks);
}

#[tokio::test(flavor = "multi_thread")]
async fn reindexing_gives_the_same_record_count() {
    let harness = Harness::new().await;
    harness.write_note("a.md", "Alpha note about pricing.");
    harness.write_note("b.md", "Beta note about hiring.");

    harness.index().await;
    harness.index().await;

    let store = VectorStore::connect(&harness.config)
        .await
        .expect("should connect store");
    assert_eq!(store.count_documents().await.expect("should count"), 2);
    assert!(harness.dir.path().join("data/vectors").is_dir());
}

#[test]
#[serial]
fn api_key_comes_from_configured_variable() {
    let mut config = Config::default();
    config.llm.api_key_env = "VAULT_RAG_TEST_KEY".to_string();

    // SAFETY: serialized with every other test that touches the environment
    unsafe {
        std::env::set_var("VAULT_RAG_TEST_KEY", "sk-from-env");
    }
    let key = acquire_api_key(&config).expect("key is read from the environment");
    assert_eq!(key.expose(), "sk-from-env");

    // SAFETY: as above
    unsafe {
        std::env::remove_var("VAULT_RAG_TEST_KEY");
    }
}
