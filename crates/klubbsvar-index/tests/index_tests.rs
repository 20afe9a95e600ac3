use std::fs;

use tempfile::TempDir;

use klubbsvar_core::types::{Chunk, DocType};
use klubbsvar_core::Error;
use klubbsvar_embed::{EmbedProvider, FakeProvider};
use klubbsvar_index::{
    build_dense, build_sparse, index_dir, load_manifest, IndexArtifacts, IndexMode, Searcher,
    TfidfSettings,
};

fn chunk(id: usize, text: &str, doc_type: DocType) -> Chunk {
    Chunk {
        id: format!("kb/doc.md#{id}"),
        text: text.to_string(),
        source: "kb/doc.md".to_string(),
        title: "Dokument".to_string(),
        doc_type,
        chunk_index: id,
        version_date: None,
        page: None,
    }
}

fn sample_chunks() -> Vec<Chunk> {
    vec![
        chunk(0, "Sesongkort og billetter kjøper du på nettsiden vår.", DocType::Ticketing),
        chunk(1, "Terminlisten viser alle kampene denne sesongen.", DocType::Schedule),
        chunk(2, "Stadion ligger midt i sentrum med god plass.", DocType::Venue),
        chunk(3, "Klubben ble grunnlagt for over hundre år siden.", DocType::History),
    ]
}

#[test]
fn sparse_roundtrip_preserves_rows_and_vectorizer() {
    let tmp = TempDir::new().unwrap();
    let artifacts = build_sparse(sample_chunks(), TfidfSettings::default());
    let query_before = artifacts
        .vectorizer
        .as_ref()
        .expect("sparse build carries a vectorizer")
        .transform("billetter sesongkort");
    artifacts.save(tmp.path()).expect("save");

    let loaded = IndexArtifacts::load(tmp.path()).expect("load");
    assert_eq!(loaded.manifest.mode, IndexMode::Sparse);
    assert_eq!(loaded.rows.len(), loaded.chunks.len());
    assert_eq!(loaded.chunks, sample_chunks());

    // The reloaded vectorizer projects queries into the identical space.
    let query_after = loaded
        .vectorizer
        .expect("vectorizer travels with the vectors")
        .transform("billetter sesongkort");
    assert_eq!(query_before, query_after);
}

#[test]
fn missing_directory_is_index_missing() {
    let tmp = TempDir::new().unwrap();
    match IndexArtifacts::load(tmp.path()) {
        Err(Error::IndexMissing { path }) => assert_eq!(path, index_dir(tmp.path())),
        other => panic!("expected IndexMissing, got {other:?}"),
    }
}

#[test]
fn row_count_mismatch_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    build_sparse(sample_chunks(), TfidfSettings::default())
        .save(tmp.path())
        .expect("save");

    // Drop the last vector row; metadata still has four.
    let vectors_path = index_dir(tmp.path()).join("vectors.jsonl");
    let content = fs::read_to_string(&vectors_path).unwrap();
    let truncated: Vec<&str> = content.lines().take(3).collect();
    fs::write(&vectors_path, truncated.join("\n")).unwrap();

    match IndexArtifacts::load(tmp.path()) {
        Err(Error::IndexCorrupt(msg)) => assert!(msg.contains("rows"), "{msg}"),
        other => panic!("expected IndexCorrupt, got {other:?}"),
    }
}

#[test]
fn missing_index_recovers_after_a_rebuild() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(
        Searcher::open(tmp.path(), None),
        Err(Error::IndexMissing { .. })
    ));

    build_sparse(sample_chunks(), TfidfSettings::default())
        .save(tmp.path())
        .expect("save");

    // Same process, fresh handle: no restart needed once artifacts exist.
    let searcher = Searcher::open(tmp.path(), None).expect("open after rebuild");
    assert_eq!(searcher.len(), 4);
}

#[test]
fn sparse_index_without_vectorizer_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    build_sparse(sample_chunks(), TfidfSettings::default())
        .save(tmp.path())
        .expect("save");
    fs::remove_file(index_dir(tmp.path()).join("vectorizer.json")).unwrap();
    assert!(matches!(
        IndexArtifacts::load(tmp.path()),
        Err(Error::IndexCorrupt(_))
    ));
}

#[test]
fn garbage_vector_file_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    build_sparse(sample_chunks(), TfidfSettings::default())
        .save(tmp.path())
        .expect("save");
    fs::write(index_dir(tmp.path()).join("vectors.jsonl"), "ikke json\n").unwrap();
    assert!(matches!(
        IndexArtifacts::load(tmp.path()),
        Err(Error::IndexCorrupt(_))
    ));
}

#[test]
fn empty_corpus_builds_a_zero_row_index() {
    let tmp = TempDir::new().unwrap();
    build_sparse(Vec::new(), TfidfSettings::default())
        .save(tmp.path())
        .expect("save");

    let searcher = Searcher::open(tmp.path(), None).expect("open");
    let hits = searcher.search("hva som helst", 5).expect("search");
    assert!(hits.is_empty());
}

#[test]
fn search_ranks_the_matching_chunk_first() {
    let tmp = TempDir::new().unwrap();
    build_sparse(sample_chunks(), TfidfSettings::default())
        .save(tmp.path())
        .expect("save");

    let searcher = Searcher::open(tmp.path(), None).expect("open");
    let hits = searcher.search("billetter og sesongkort", 4).expect("search");

    assert_eq!(hits.len(), 4);
    assert_eq!(hits[0].chunk.chunk_index, 0);
    assert!(hits[0].score > 0.0);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn search_returns_at_most_the_corpus_size() {
    let tmp = TempDir::new().unwrap();
    build_sparse(sample_chunks(), TfidfSettings::default())
        .save(tmp.path())
        .expect("save");
    let searcher = Searcher::open(tmp.path(), None).expect("open");
    assert_eq!(searcher.search("stadion", 100).expect("search").len(), 4);
}

#[test]
fn equal_scores_keep_corpus_order() {
    let chunks = vec![
        chunk(0, "billetter koster penger", DocType::Ticketing),
        chunk(1, "billetter koster penger", DocType::Ticketing),
        chunk(2, "noe helt annet står her", DocType::Unknown),
    ];
    let tmp = TempDir::new().unwrap();
    build_sparse(chunks, TfidfSettings::default())
        .save(tmp.path())
        .expect("save");
    let searcher = Searcher::open(tmp.path(), None).expect("open");

    let hits = searcher.search("billetter", 3).expect("search");
    assert_eq!(hits[0].chunk.chunk_index, 0);
    assert_eq!(hits[1].chunk.chunk_index, 1);
    assert_eq!(hits[0].score, hits[1].score);
}

#[test]
fn search_is_deterministic() {
    let tmp = TempDir::new().unwrap();
    build_sparse(sample_chunks(), TfidfSettings::default())
        .save(tmp.path())
        .expect("save");
    let searcher = Searcher::open(tmp.path(), None).expect("open");

    let a = searcher.search("kampene denne sesongen", 4).expect("search");
    let b = searcher.search("kampene denne sesongen", 4).expect("search");
    let ids = |hits: &[klubbsvar_core::types::SearchHit]| {
        hits.iter().map(|h| h.chunk.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&a), ids(&b));
}

#[test]
fn rebuild_replaces_the_published_index() {
    let tmp = TempDir::new().unwrap();
    build_sparse(sample_chunks(), TfidfSettings::default())
        .save(tmp.path())
        .expect("save");

    let replacement = vec![chunk(0, "helt nytt innhold om akademiet", DocType::Activities)];
    build_sparse(replacement, TfidfSettings::default())
        .save(tmp.path())
        .expect("rebuild");

    let searcher = Searcher::open(tmp.path(), None).expect("open");
    assert_eq!(searcher.len(), 1);
    assert!(!index_dir(tmp.path()).with_file_name("index.staging").exists());
}

#[test]
fn dense_roundtrip_with_matching_provider() {
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::default();
    let artifacts = build_dense(sample_chunks(), &provider).expect("build");
    artifacts.save(tmp.path()).expect("save");

    let manifest = load_manifest(tmp.path()).expect("manifest");
    assert_eq!(manifest.mode, IndexMode::Dense);
    assert_eq!(manifest.embedder_id.as_deref(), Some(provider.id()));
    assert_eq!(manifest.dim, Some(provider.dim()));

    let searcher =
        Searcher::open(tmp.path(), Some(Box::new(FakeProvider::default()))).expect("open");
    let hits = searcher.search("billetter kjøper du på nettsiden", 2).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.chunk_index, 0);
}

#[test]
fn dense_index_requires_a_provider() {
    let tmp = TempDir::new().unwrap();
    build_dense(sample_chunks(), &FakeProvider::default())
        .expect("build")
        .save(tmp.path())
        .expect("save");
    assert!(matches!(
        Searcher::open(tmp.path(), None),
        Err(Error::Config(_))
    ));
}

#[test]
fn dense_provider_identity_must_match() {
    let tmp = TempDir::new().unwrap();
    build_dense(sample_chunks(), &FakeProvider::default())
        .expect("build")
        .save(tmp.path())
        .expect("save");
    // Same family, different dimensionality → different identity.
    assert!(matches!(
        Searcher::open(tmp.path(), Some(Box::new(FakeProvider::new(32)))),
        Err(Error::IndexCorrupt(_))
    ));
}
