//! `ragline onboard`: first-time setup.

use ragline_config::AppConfig;

const SAMPLE_CORPUS: &str = concat!(
    r#"{"title": "benefits-overview.pdf#page=1", "content": "The Northwind Standard plan covers medical, vision, and dental services.", "category": "benefits"}"#,
    "\n",
    r#"{"title": "benefits-overview.pdf#page=2", "content": "Northwind Health Plus adds orthodontics and a lower copay for specialist visits.", "category": "benefits"}"#,
    "\n",
    r#"{"title": "employee-handbook.pdf#page=4", "content": "Employees accrue paid time off from their first day of work.", "category": "handbook"}"#,
    "\n",
);

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let corpus_path = config_dir.join("corpus.jsonl");

    println!("Ragline, first-time setup");
    println!("=========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if corpus_path.exists() {
        println!("  Corpus exists: {}", corpus_path.display());
    } else {
        std::fs::write(&corpus_path, SAMPLE_CORPUS)?;
        println!("  Created sample corpus: {}", corpus_path.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
    } else {
        let corpus = corpus_path.display().to_string();
        std::fs::write(&config_path, AppConfig::default_toml(Some(&corpus)))?;
        println!("  Created config.toml at: {}", config_path.display());
        println!("\n  Next steps:");
        println!("   1. Set RAGLINE_API_KEY or add api_key to {}", config_path.display());
        println!("   2. Replace the sample corpus with your own JSONL documents");
        println!("   3. Run: ragline chat\n");
    }

    println!("Setup complete. Run `ragline doctor` to check the installation.\n");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_corpus_is_jsonl() {
        for line in SAMPLE_CORPUS.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["title"].is_string());
            assert!(value["content"].is_string());
        }
    }
}
