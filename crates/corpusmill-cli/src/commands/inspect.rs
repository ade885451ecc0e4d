//! Inspect command - summarize a corpus configuration.

use std::path::PathBuf;

use colored::Colorize;
use corpusmill::{AttributeConfig, AttributeType, CorpusSchema};

use super::load_config;

pub fn run(
    directory: PathBuf,
    config: Option<PathBuf>,
    json_output: bool,
    _verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_config(&directory, config)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary(&schema))?);
        return Ok(());
    }

    let meta = &schema.meta;
    println!(
        "{} {} (version {}, {})",
        "Corpus".cyan().bold(),
        meta.name.white().bold(),
        meta.version,
        if meta.date.is_empty() { "undated" } else { meta.date.as_str() }
    );
    if !meta.corpus_description.is_empty() {
        println!("  {}", meta.corpus_description);
    }
    println!();

    println!("{}", "Layers:".yellow().bold());
    for (name, layer) in &schema.layer {
        let anchors: Vec<String> = schema
            .anchored_dimensions(name)
            .iter()
            .map(|dimension| {
                if layer.is_partially_anchored(*dimension) {
                    format!("{} (partial)", dimension)
                } else {
                    dimension.to_string()
                }
            })
            .collect();
        let contains = layer
            .contains
            .as_deref()
            .map(|c| format!(" contains {}", c))
            .unwrap_or_default();
        println!(
            "  {} [{:?}]{} anchored on {}",
            name.white().bold(),
            layer.layer_type,
            contains,
            if anchors.is_empty() {
                "nothing".to_string()
            } else {
                anchors.join(", ")
            }
        );
        for (attribute, config) in &layer.attributes {
            println!("    {:<16} {}", attribute, describe(config));
        }
    }

    if !schema.global_attributes.is_empty() {
        println!();
        println!("{}", "Global attributes:".yellow().bold());
        for (name, global) in &schema.global_attributes {
            let keys: Vec<&str> = global.keys.keys().map(String::as_str).collect();
            println!("  {:<18} keys: {}", name, keys.join(", "));
        }
    }

    if !meta.media_slots.is_empty() {
        println!();
        println!("{}", "Media slots:".yellow().bold());
        for (slot, media) in &meta.media_slots {
            println!(
                "  {:<18} {:?}{}",
                slot,
                media.media_type,
                if media.is_optional { " (optional)" } else { "" }
            );
        }
    }
    Ok(())
}

fn describe(config: &AttributeConfig) -> String {
    let kind = config.kind();
    let mut text = kind.to_string();
    match kind {
        AttributeType::Categorical => {
            let count = config.values.as_ref().map_or(0, Vec::len);
            text.push_str(&format!(" ({} values)", count));
        }
        AttributeType::Labels => {
            if let Some(width) = config.nlabels {
                text.push_str(&format!(" ({} labels)", width));
            }
        }
        AttributeType::Ref => {
            if let Some(target) = &config.reference {
                text.push_str(&format!(" -> {}", target));
            }
        }
        _ => {}
    }
    if config.nullable {
        text.push_str(", nullable");
    }
    text
}

fn summary(schema: &CorpusSchema) -> serde_json::Value {
    let layers: serde_json::Map<String, serde_json::Value> = schema
        .layer
        .iter()
        .map(|(name, layer)| {
            let attributes: serde_json::Map<String, serde_json::Value> = layer
                .attributes
                .iter()
                .map(|(attribute, config)| (attribute.clone(), describe(config).into()))
                .collect();
            let value = serde_json::json!({
                "columns": schema.main_columns(name),
                "contains": layer.contains,
                "attributes": attributes,
            });
            (name.clone(), value)
        })
        .collect();
    serde_json::json!({
        "name": schema.meta.name,
        "version": schema.meta.version,
        "first_class": schema.first_class,
        "layers": layers,
        "global_attributes": schema.global_attributes.keys().collect::<Vec<_>>(),
    })
}
