use std::env;
use std::path::PathBuf;

use klubbsvar_core::config::{expand_path, Config};
use klubbsvar_embed::default_provider;
use klubbsvar_index::{load_manifest, IndexMode, Searcher};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [k]", args[0]);
        eprintln!("Example: {} 'billetter sesongkort' 5", args[0]);
        std::process::exit(1);
    }
    let query = &args[1];
    let k: usize = args.get(2).and_then(|a| a.parse().ok()).unwrap_or(10);

    let config = Config::load()?;
    let data_dir: PathBuf = {
        let dir: String = config.get("data.data_dir").unwrap_or_else(|_| "data".to_string());
        expand_path(dir)
    };

    let manifest = load_manifest(&data_dir)?;
    let embedder = match manifest.mode {
        IndexMode::Sparse => None,
        IndexMode::Dense => {
            let model: String = config
                .get("embedding.model")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string());
            let base_url: String = config
                .get("embedding.base_url")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
            Some(default_provider(&model, &base_url)?)
        }
    };
    let searcher = Searcher::open(&data_dir, embedder)?;

    let results = searcher.search(query, k)?;
    println!("🔍 Found {} results for: \"{}\"", results.len(), query);
    for (i, hit) in results.iter().enumerate() {
        println!(
            "\n  {}. score={:.4}  id={}  doc_type={}  title={}",
            i + 1,
            hit.score,
            hit.chunk.id,
            hit.chunk.doc_type.as_str(),
            hit.chunk.title
        );
        let snippet: String = hit.chunk.text.chars().take(120).collect();
        println!("     📝 {}", snippet);
    }
    Ok(())
}
