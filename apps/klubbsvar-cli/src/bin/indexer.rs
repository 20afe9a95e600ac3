use std::{env, path::PathBuf};

use klubbsvar_core::chunk::ChunkingConfig;
use klubbsvar_core::config::{env_flag, expand_path, Config};
use klubbsvar_core::ingest::CorpusLoader;
use klubbsvar_embed::default_provider;
use klubbsvar_index::{build_dense, build_sparse, TfidfSettings};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;

    let args: Vec<String> = env::args().skip(1).collect();
    let kb_dir = args
        .iter()
        .find(|a| !a.starts_with('-'))
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let dir: String = config.get("data.kb_dir").unwrap_or_else(|_| "kb".to_string());
            expand_path(dir)
        });
    let data_dir: PathBuf = {
        let dir: String = config.get("data.data_dir").unwrap_or_else(|_| "data".to_string());
        expand_path(dir)
    };

    println!("klubbsvar indexer\n=================");
    println!("Knowledge directory: {}", kb_dir.display());
    println!("Artifact directory:  {}", data_dir.display());

    let chunking = ChunkingConfig {
        window: config.get("chunking.window").unwrap_or(700),
        overlap: config.get("chunking.overlap").unwrap_or(120),
    };
    let chunks = CorpusLoader::new(chunking).load_dir(&kb_dir)?;
    println!("Processed {} chunks", chunks.len());

    // USE_OPENAI=1 selects embedding-backed vectors, like the query side.
    let dense = env_flag("USE_OPENAI", false)
        || config
            .get::<String>("index.mode")
            .map(|m| m == "dense")
            .unwrap_or(false);

    let rows = chunks.len();
    if dense {
        let model: String = config
            .get("embedding.model")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());
        let base_url: String = config
            .get("embedding.base_url")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let provider = default_provider(&model, &base_url)?;
        println!("Embedding {} chunks with {}…", rows, provider.id());
        let published = build_dense(chunks, provider.as_ref())?.save(&data_dir)?;
        println!("\n✅ Dense index with {} rows published to {}", rows, published.display());
    } else {
        let published = build_sparse(chunks, TfidfSettings::default()).save(&data_dir)?;
        println!("\n✅ Sparse index with {} rows published to {}", rows, published.display());
    }

    println!("\n💡 To search, use: cargo run --bin klubbsvar-search '<query>'");
    println!("💡 To ask, use: cargo run --bin klubbsvar-ask '<question>'");
    Ok(())
}
