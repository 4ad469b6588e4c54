use super::*;
use crate::config::OllamaConfig;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// One 4-dimensional vector per input
struct LengthEmbeddings;

impl Respond for LengthEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .map(|text| {
                        let len = text.as_str().map_or(0, str::len) as f32;
                        vec![1.0, len, 0.5, 0.25]
                    })
                    .collect()
            })
            .unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

struct Fixture {
    _dir: TempDir,
    vault: PathBuf,
    config: Config,
    _ollama: MockServer,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().expect("should create temp dir");
    let vault = dir.path().join("vault");
    fs::create_dir_all(&vault).expect("should create vault");

    let ollama = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(LengthEmbeddings)
        .mount(&ollama)
        .await;

    let address = ollama.address();
    let mut config = Config {
        base_dir: dir.path().join("data"),
        ollama: OllamaConfig {
            host: address.ip().to_string(),
            port: address.port(),
            embedding_dimension: 4,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    config.vault.path = vault.clone();
    config.embedder.progress_bar = false;

    Fixture {
        _dir: dir,
        vault,
        config,
        _ollama: ollama,
    }
}

async fn pipeline_for(config: &Config) -> (IndexingPipeline, VectorStore) {
    let store = VectorStore::open(config).await.expect("store opens");
    let client = OllamaClient::new(&config.ollama).expect("client builds");
    let pipeline =
        IndexingPipeline::new(config, client, store.clone()).expect("pipeline builds");
    (pipeline, store)
}

#[tokio::test(flavor = "multi_thread")]
async fn report_counts_every_stage() {
    let fixture = fixture().await;
    fs::write(
        fixture.vault.join("notes.md"),
        "Business strategy requires focus and patience.",
    )
    .expect("write note");
    fs::create_dir_all(fixture.vault.join("deep/nested")).expect("create dirs");
    fs::write(
        fixture.vault.join("deep/nested/garden.MARKDOWN"),
        "# Garden\n\nTomatoes need sun.",
    )
    .expect("write note");
    fs::write(fixture.vault.join("photo.png"), [0x89, b'P', b'N', b'G']).expect("write png");
    fs::write(fixture.vault.join("broken.md"), [0xff, 0xfe, 0x00]).expect("write bad note");

    let (pipeline, store) = pipeline_for(&fixture.config).await;
    let report = pipeline.run().await.expect("indexing succeeds");

    assert_eq!(
        report,
        IndexingReport {
            files_discovered: 4,
            files_routed: 3,
            files_skipped: 1,
            documents: 2,
            chunks: 2,
            empty_chunks: 0,
            written: 2,
        }
    );
    assert_eq!(store.count_documents().await.expect("count"), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn long_notes_become_overlapping_chunks() {
    let fixture = fixture().await;
    let words: Vec<String> = (0..300).map(|i| format!("word{i}")).collect();
    fs::write(fixture.vault.join("long.md"), words.join(" ")).expect("write note");

    let (pipeline, store) = pipeline_for(&fixture.config).await;
    let report = pipeline.run().await.expect("indexing succeeds");

    assert_eq!(report.documents, 1);
    assert_eq!(report.chunks, 3);
    assert_eq!(store.count_documents().await.expect("count"), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn blank_notes_are_counted_as_empty_chunks() {
    let fixture = fixture().await;
    fs::write(fixture.vault.join("blank.md"), "").expect("write note");
    fs::write(fixture.vault.join("spaces.md"), "   \n\t\n").expect("write note");
    fs::write(fixture.vault.join("real.md"), "Tomatoes need sun.").expect("write note");

    let (pipeline, store) = pipeline_for(&fixture.config).await;
    let report = pipeline.run().await.expect("indexing succeeds");

    assert_eq!(report.files_routed, 3);
    assert_eq!(report.chunks, 3);
    assert_eq!(report.empty_chunks, 2);
    assert_eq!(store.count_documents().await.expect("count"), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn reindexing_rebuilds_instead_of_growing() {
    let fixture = fixture().await;
    fs::write(fixture.vault.join("a.md"), "alpha").expect("write note");
    fs::write(fixture.vault.join("b.md"), "beta").expect("write note");

    let (pipeline, _store) = pipeline_for(&fixture.config).await;
    pipeline.run().await.expect("first run");

    let (pipeline, store) = pipeline_for(&fixture.config).await;
    pipeline.run().await.expect("second run");

    assert_eq!(store.count_documents().await.expect("count"), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_vault_indexes_nothing() {
    let mut fixture = fixture().await;
    fixture.config.vault.path = fixture.vault.join("does-not-exist");

    let (pipeline, store) = pipeline_for(&fixture.config).await;
    let report = pipeline.run().await.expect("indexing succeeds");

    assert_eq!(report, IndexingReport::default());
    assert_eq!(store.count_documents().await.expect("count"), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn embedding_failure_is_fatal() {
    let fixture = fixture().await;
    fs::write(fixture.vault.join("a.md"), "alpha").expect("write note");

    let mut config = fixture.config.clone();
    config.ollama.embedding_dimension = 8;

    let (pipeline, _store) = pipeline_for(&config).await;
    let result = pipeline.run().await;

    assert!(matches!(result, Err(crate::VaultError::Embedding(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_rebuild_leaves_the_index_empty() {
    let fixture = fixture().await;
    fs::write(fixture.vault.join("a.md"), "alpha").expect("write note");
    fs::write(fixture.vault.join("b.md"), "beta").expect("write note");

    let (pipeline, _store) = pipeline_for(&fixture.config).await;
    pipeline.run().await.expect("first run");

    let mut offline = fixture.config.clone();
    offline.ollama.host = "127.0.0.1".to_string();
    offline.ollama.port = 9;

    offline.vector_store.recreate_index = false;
    let (pipeline, store) = pipeline_for(&offline).await;
    assert!(pipeline.run().await.is_err());
    assert_eq!(store.count_documents().await.expect("count"), 2);

    offline.vector_store.recreate_index = true;
    let (pipeline, store) = pipeline_for(&offline).await;
    assert!(pipeline.run().await.is_err());
    assert_eq!(store.count_documents().await.expect("count"), 0);
}
