//! `ragline doctor`: diagnose the installation.

use ragline_config::AppConfig;
use ragline_search::InMemorySearch;
use std::path::Path;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Ragline doctor");
    println!("==============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  [fail] No config file, run `ragline onboard`");
        println!("\n  1 issue found.");
        return Ok(());
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Config file valid");
            config
        }
        Err(e) => {
            println!("  [fail] Config file invalid: {e}");
            println!("\n  1 issue found.");
            return Ok(());
        }
    };

    if config.has_api_key() || config.provider == "ollama" {
        println!("  [ok]   API key configured");
    } else {
        println!("  [warn] No API key configured, set RAGLINE_API_KEY");
        issues += 1;
    }

    match config.search.corpus_path.as_deref() {
        Some(corpus) => {
            let images = config.search.images_path.as_deref().map(Path::new);
            match InMemorySearch::load(Path::new(corpus), images) {
                Ok(search) if search.document_count() == 0 => {
                    println!("  [warn] Corpus {corpus} has no documents");
                    issues += 1;
                }
                Ok(search) => println!(
                    "  [ok]   Corpus loaded: {} documents, {} images",
                    search.document_count(),
                    search.image_count()
                ),
                Err(e) => {
                    println!("  [fail] Corpus unusable: {e}");
                    issues += 1;
                }
            }
        }
        None => {
            println!("  [fail] No corpus configured (search.corpus_path)");
            issues += 1;
        }
    }

    let citation = config.storage.citation_base_url();
    if citation.is_empty() {
        println!("  [info] No citation base URL; citations are plain titles");
    } else {
        println!("  [ok]   Citations resolve against {citation}");
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
