use std::env;
use std::path::{Path, PathBuf};

use klubbsvar_answer::{Asker, ChatGenerator};
use klubbsvar_core::chunk::ChunkingConfig;
use klubbsvar_core::config::{env_flag, expand_path, Config};
use klubbsvar_core::ingest::CorpusLoader;
use klubbsvar_core::Error;
use klubbsvar_embed::default_provider;
use klubbsvar_index::{
    build_dense, build_sparse, load_manifest, IndexMode, Searcher, TfidfSettings,
};

fn embed_model(config: &Config) -> String {
    config
        .get("embedding.model")
        .unwrap_or_else(|_| "text-embedding-3-small".to_string())
}

fn api_base_url(config: &Config) -> String {
    config
        .get("embedding.base_url")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
}

fn open_searcher(config: &Config, data_dir: &Path) -> klubbsvar_core::Result<Searcher> {
    let manifest = load_manifest(data_dir)?;
    let embedder = match manifest.mode {
        IndexMode::Sparse => None,
        IndexMode::Dense => Some(default_provider(&embed_model(config), &api_base_url(config))?),
    };
    Searcher::open(data_dir, embedder)
}

fn build_index(config: &Config, kb_dir: &Path, data_dir: &Path) -> anyhow::Result<()> {
    let chunking = ChunkingConfig {
        window: config.get("chunking.window").unwrap_or(700),
        overlap: config.get("chunking.overlap").unwrap_or(120),
    };
    let chunks = CorpusLoader::new(chunking).load_dir(kb_dir)?;
    if chunks.is_empty() {
        anyhow::bail!(
            "no source documents found under {}; nothing to build an index from",
            kb_dir.display()
        );
    }
    let dense = env_flag("USE_OPENAI", false)
        || config
            .get::<String>("index.mode")
            .map(|m| m == "dense")
            .unwrap_or(false);
    if dense {
        let provider = default_provider(&embed_model(config), &api_base_url(config))?;
        build_dense(chunks, provider.as_ref())?.save(data_dir)?;
    } else {
        build_sparse(chunks, TfidfSettings::default()).save(data_dir)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <question> [k]", args[0]);
        eprintln!("Example: {} 'hva koster et sesongkort?'", args[0]);
        std::process::exit(1);
    }
    let question = &args[1];
    let k: usize = args.get(2).and_then(|a| a.parse().ok()).unwrap_or(6);

    let config = Config::load()?;
    let kb_dir: PathBuf = {
        let dir: String = config.get("data.kb_dir").unwrap_or_else(|_| "kb".to_string());
        expand_path(dir)
    };
    let data_dir: PathBuf = {
        let dir: String = config.get("data.data_dir").unwrap_or_else(|_| "data".to_string());
        expand_path(dir)
    };

    let searcher = match open_searcher(&config, &data_dir) {
        Ok(s) => s,
        Err(Error::IndexMissing { path }) => {
            println!("[index] Mangler artefakter: {} – bygger…", path.display());
            build_index(&config, &kb_dir, &data_dir)?;
            open_searcher(&config, &data_dir)?
        }
        Err(e) => return Err(e.into()),
    };

    let mut asker = Asker::new(searcher);
    let generate = env_flag("USE_OPENAI", false)
        || config.get::<bool>("generation.enabled").unwrap_or(false);
    if generate {
        let model: String = config
            .get("generation.model")
            .unwrap_or_else(|_| "gpt-4o-mini".to_string());
        asker = asker.with_generator(Box::new(ChatGenerator::from_env(
            &model,
            &api_base_url(&config),
        )?));
    }

    let (text, sources) = asker.answer(question, k, &[])?;

    println!("\n💬 {}", text);
    if !sources.is_empty() {
        println!("\nKilder:");
        for (i, hit) in sources.iter().enumerate() {
            println!(
                "  {}. score={:.4} [{}] {} — {}",
                i + 1,
                hit.score,
                hit.chunk.doc_type.as_str(),
                hit.chunk.title,
                hit.chunk.id
            );
        }
    }
    Ok(())
}
