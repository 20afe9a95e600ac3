use std::fs;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use klubbsvar_answer::{Asker, Generator, DONT_KNOW};
use klubbsvar_core::chunk::ChunkingConfig;
use klubbsvar_core::ingest::CorpusLoader;
use klubbsvar_core::types::{Chunk, DocType};
use klubbsvar_core::{Error, Result};
use klubbsvar_embed::{EmbedProvider, FakeProvider};
use klubbsvar_index::{build_dense, build_sparse, Searcher, TfidfSettings};

/// Build and publish a small sparse index from two markdown files, then
/// open a searcher over it.
fn sparse_fixture() -> (TempDir, Searcher) {
    let tmp = TempDir::new().unwrap();
    let kb = tmp.path().join("kb");
    fs::create_dir_all(&kb).unwrap();
    fs::write(
        kb.join("billetter.md"),
        "Et sesongkort koster 1500 kroner. Kjøp på nettsiden vår.",
    )
    .unwrap();
    fs::write(
        kb.join("stadion.md"),
        "Føyka stadion har plass til mange tilskuere og ligger i Asker sentrum.",
    )
    .unwrap();

    let chunks = CorpusLoader::new(ChunkingConfig::default())
        .load_dir(&kb)
        .expect("load corpus");
    let data_dir = tmp.path().join("data");
    build_sparse(chunks, TfidfSettings::default())
        .save(&data_dir)
        .expect("save");
    let searcher = Searcher::open(&data_dir, None).expect("open");
    (tmp, searcher)
}

#[test]
fn season_ticket_question_is_answered_from_the_ticket_page() {
    let (_tmp, searcher) = sparse_fixture();
    let asker = Asker::new(searcher);

    let (text, sources) = asker.answer("hva koster et sesongkort", 3, &[]).expect("answer");

    assert_eq!(text, "Et sesongkort koster 1500 kroner.");
    assert!(!sources.is_empty());
    assert!(sources[0].chunk.source.ends_with("billetter.md"));
    assert_eq!(sources[0].chunk.doc_type, DocType::Ticketing);
}

#[test]
fn unrelated_question_returns_the_sentinel_with_raw_hits() {
    let (_tmp, searcher) = sparse_fixture();
    let asker = Asker::new(searcher);

    let (text, sources) = asker
        .answer("helt urelatert tullespørsmål om noe annet", 2, &[])
        .expect("answer");

    assert_eq!(text, DONT_KNOW);
    // Raw (pre-filter) hits are still surfaced for transparency.
    assert_eq!(sources.len(), 2);
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _: &str, _: &[&str], _: &[(String, String)]) -> Result<String> {
        Err(Error::Capability("nede for vedlikehold".to_string()))
    }
}

#[test]
fn failing_generator_degrades_to_extraction() {
    let (_tmp, searcher) = sparse_fixture();
    let asker = Asker::new(searcher).with_generator(Box::new(FailingGenerator));

    let (text, _) = asker.answer("hva koster et sesongkort", 3, &[]).expect("answer");
    assert_eq!(text, "Et sesongkort koster 1500 kroner.");
}

struct CannedGenerator(&'static str);

impl Generator for CannedGenerator {
    fn generate(&self, _: &str, _: &[&str], _: &[(String, String)]) -> Result<String> {
        Ok(self.0.to_string())
    }
}

#[test]
fn one_word_generation_is_replaced_by_the_sentinel() {
    let (_tmp, searcher) = sparse_fixture();
    let asker = Asker::new(searcher).with_generator(Box::new(CannedGenerator("Ja")));

    let (text, _) = asker.answer("hva koster et sesongkort", 3, &[]).expect("answer");
    assert_eq!(text, DONT_KNOW);
}

#[test]
fn empty_generation_falls_back_to_extraction() {
    let (_tmp, searcher) = sparse_fixture();
    let asker = Asker::new(searcher).with_generator(Box::new(CannedGenerator("   ")));

    let (text, _) = asker.answer("hva koster et sesongkort", 3, &[]).expect("answer");
    assert_eq!(text, "Et sesongkort koster 1500 kroner.");
}

#[derive(Clone, Default)]
struct ProbeGenerator {
    seen: Arc<Mutex<Option<(usize, usize)>>>,
}

impl Generator for ProbeGenerator {
    fn generate(
        &self,
        _: &str,
        passages: &[&str],
        history: &[(String, String)],
    ) -> Result<String> {
        *self.seen.lock().expect("probe lock") = Some((passages.len(), history.len()));
        Ok("Et generert svar kommer her.".to_string())
    }
}

#[test]
fn generator_gets_capped_context_and_history() {
    let (_tmp, searcher) = sparse_fixture();
    let probe = ProbeGenerator::default();
    let asker = Asker::new(searcher).with_generator(Box::new(probe.clone()));

    let history: Vec<(String, String)> = (0..5)
        .map(|i| (format!("spørsmål {i}"), format!("svar {i}")))
        .collect();
    let (text, _) = asker
        .answer("hva koster et sesongkort", 3, &history)
        .expect("answer");

    assert_eq!(text, "Et generert svar kommer her.");
    let (passages, turns) = probe.seen.lock().expect("probe lock").expect("generator ran");
    assert!(passages <= 5);
    assert_eq!(turns, 3);
}

/// Matches the identity of the provider that built the index but fails on
/// every call, like a dead network.
struct UnreachableProvider {
    id: String,
    dim: usize,
}

impl EmbedProvider for UnreachableProvider {
    fn id(&self) -> &str {
        &self.id
    }
    fn dim(&self) -> usize {
        self.dim
    }
    fn embed_batch(&self, _: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::Capability("tjenesten svarer ikke".to_string()))
    }
}

#[test]
fn dense_query_failure_falls_back_to_a_lexical_space() {
    let tmp = TempDir::new().unwrap();
    let chunks = vec![
        Chunk {
            id: "kb/billetter.md#0".to_string(),
            text: "Et sesongkort koster 1500 kroner. Kjøp på nettsiden vår.".to_string(),
            source: "kb/billetter.md".to_string(),
            title: "Billetter".to_string(),
            doc_type: DocType::Ticketing,
            chunk_index: 0,
            version_date: None,
            page: None,
        },
        Chunk {
            id: "kb/stadion.md#0".to_string(),
            text: "Stadion har plass til mange tilskuere og ligger i sentrum.".to_string(),
            source: "kb/stadion.md".to_string(),
            title: "Stadion".to_string(),
            doc_type: DocType::Venue,
            chunk_index: 0,
            version_date: None,
            page: None,
        },
    ];

    let builder = FakeProvider::default();
    build_dense(chunks, &builder)
        .expect("build")
        .save(tmp.path())
        .expect("save");

    let dead = UnreachableProvider {
        id: builder.id().to_string(),
        dim: builder.dim(),
    };
    let searcher = Searcher::open(tmp.path(), Some(Box::new(dead))).expect("open");
    let asker = Asker::new(searcher);

    // The embedding capability fails on every query, but answers still come.
    for _ in 0..2 {
        let (text, sources) = asker.answer("hva koster et sesongkort", 2, &[]).expect("answer");
        assert_eq!(text, "Et sesongkort koster 1500 kroner.");
        assert!(sources[0].chunk.source.ends_with("billetter.md"));
    }
}
