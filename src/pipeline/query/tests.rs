use super::*;
use crate::config::OllamaConfig;
use crate::database::DuplicatePolicy;
use crate::document::{META_FILE_PATH, Meta};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Embeds text by topic so retrieval has something to rank
struct TopicEmbeddings;

fn topic_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    vec![
        if lower.contains("business") { 1.0 } else { 0.0 },
        if lower.contains("garden") { 1.0 } else { 0.0 },
        0.1,
        0.1,
    ]
}

impl Respond for TopicEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .map(|text| topic_vector(text.as_str().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

async fn servers() -> (MockServer, MockServer) {
    let ollama = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(TopicEmbeddings)
        .mount(&ollama)
        .await;

    let openai = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Stay focused and patient."},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&openai)
        .await;

    (ollama, openai)
}

fn config_for(dir: &TempDir, ollama: &MockServer, openai: &MockServer) -> Config {
    let address = ollama.address();
    let mut config = Config {
        base_dir: dir.path().to_path_buf(),
        ollama: OllamaConfig {
            host: address.ip().to_string(),
            port: address.port(),
            embedding_dimension: 4,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    config.llm.api_base = openai.uri();
    config.embedder.progress_bar = false;
    config
}

fn stored(content: &str) -> Document {
    let mut meta = Meta::new();
    meta.insert(META_FILE_PATH.to_string(), json!("notes.md"));
    Document::new(content, meta).with_embedding(topic_vector(content))
}

#[tokio::test(flavor = "multi_thread")]
async fn answers_from_the_most_similar_chunk() {
    let dir = TempDir::new().expect("should create temp dir");
    let (ollama, openai) = servers().await;
    let mut config = config_for(&dir, &ollama, &openai);
    config.vector_store.top_k = 1;

    let store = VectorStore::open(&config).await.expect("store opens");
    store
        .upsert_documents(
            vec![
                stored("Business strategy requires focus and patience."),
                stored("The garden needs water."),
            ],
            DuplicatePolicy::Overwrite,
        )
        .await
        .expect("write succeeds");

    let client = OllamaClient::new(&config.ollama).expect("client builds");
    let pipeline = QueryPipeline::new(&config, client, store, ApiKey::new("sk-test"))
        .expect("pipeline builds");
    let answer = pipeline
        .run("Summarize my notes about business.")
        .await
        .expect("query succeeds");

    assert_eq!(answer.reply, "Stay focused and patient.");
    assert_eq!(answer.documents.len(), 1);
    assert_eq!(
        answer.documents[0].content,
        "Business strategy requires focus and patience."
    );
    assert!(answer.documents[0].embedding.is_some());
    assert!(
        answer.prompt[0]
            .content
            .contains("Business strategy requires focus and patience.")
    );
    assert!(!answer.prompt[0].content.contains("garden"));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_index_still_asks_the_llm() {
    let dir = TempDir::new().expect("should create temp dir");
    let (ollama, openai) = servers().await;
    let config = config_for(&dir, &ollama, &openai);

    let store = VectorStore::open(&config).await.expect("store opens");
    let client = OllamaClient::new(&config.ollama).expect("client builds");
    let pipeline = QueryPipeline::new(&config, client, store, ApiKey::new("sk-test"))
        .expect("pipeline builds");

    let answer = pipeline.run("Anything?").await.expect("query succeeds");

    assert!(answer.documents.is_empty());
    assert!(answer.prompt[0].content.contains("Context:\n\n\nQuestion: Anything?"));
    assert_eq!(answer.reply, "Stay focused and patient.");
}
