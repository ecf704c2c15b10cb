//! `ragline config`: configuration management commands.

use ragline_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warning: {w}");
                }
            }

            println!();
            println!("   Provider:     {}", config.provider);
            println!("   Base URL:     {}", config.resolved_base_url());
            println!("   Query model:  {}", config.pipeline.query_model);
            println!("   Embeddings:   {}", config.pipeline.embedding_model);
            println!(
                "   Corpus:       {}",
                config.search.corpus_path.as_deref().unwrap_or("(none)")
            );
            println!(
                "   Images:       {}",
                config.search.image_vectorizer_model.as_deref().unwrap_or("off")
            );
            println!("   Variants:     {}", config.experiments.variants.len());
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Problems that do not stop loading but will stop `chat`.
fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.has_api_key() && config.provider != "ollama" {
        warnings.push("No API key set (set RAGLINE_API_KEY or OPENAI_API_KEY)".to_string());
    }

    match config.search.corpus_path.as_deref() {
        None => warnings.push("No corpus configured (search.corpus_path)".to_string()),
        Some(path) if !std::path::Path::new(path).exists() => {
            warnings.push(format!("Corpus file not found: {path}"))
        }
        Some(_) => {}
    }

    if config.search.image_vectorizer_model.is_some() && config.storage.access_token.is_none() {
        warnings.push("Image search is on but storage.access_token is not set".to_string());
    }

    for (name, value) in &config.experiments.variants {
        let known = match name.as_str() {
            "chat_properties" => {
                value.trim_start().starts_with('{')
                    || config.experiments.chat_properties.contains_key(&value.to_lowercase())
            }
            "answer_prefix" => {
                value.trim_start().starts_with('{')
                    || config.experiments.answer_prefix.contains_key(&value.to_lowercase())
            }
            _ => true,
        };
        if !known {
            warnings.push(format!("Variant {name} = {value:?} has no matching treatment"));
        }
    }

    warnings
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    if config.storage.access_token.is_some() {
        config.storage.access_token = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
