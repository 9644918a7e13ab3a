//! Entity and configuration loading

use anyhow::{Context, Result};
use itinera_app::EngineConfig;
use itinera_core::Entity;
use std::fs;
use std::path::Path;

/// Read an entity JSON file
pub fn load_entity(path: &Path) -> Result<Entity> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let entity =
        parse_entity(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        entity = %entity.id,
        works = entity.works.len(),
        routes = entity.route_count(),
        "loaded entity"
    );
    Ok(entity)
}

pub fn parse_entity(json: &str) -> Result<Entity> {
    let entity: Entity = serde_json::from_str(json)?;
    if entity.route_count() == 0 {
        anyhow::bail!("entity '{}' has no routes", entity.id);
    }
    Ok(entity)
}

/// Load the engine config, or the defaults when no file is given
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Invalid configuration in {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}
