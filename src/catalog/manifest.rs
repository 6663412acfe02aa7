//! Plugin registration
//!
//! A plugin is a folder holding a `plugin.json` manifest and the script or
//! binary it launches. Composite plugins point at a second JSON file listing
//! their links. Field names from the older manifest format are accepted as
//! aliases.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::SqliteCatalog;
use crate::error::{Error, Result};
use crate::models::{CommandEntry, CommandLink, CommandMode, StepConfig, Visibility};

/// Manifest file expected in every plugin folder
pub const MANIFEST_FILE: &str = "plugin.json";

/// Contents of `plugin.json`
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "label")]
    pub visibility: Visibility,
    pub mode: CommandMode,

    // Terminal plugins
    #[serde(default)]
    pub waitable: bool,
    #[serde(default, alias = "associatable")]
    pub supports_incremental_query: bool,
    #[serde(default, alias = "source_path")]
    pub target_path: Option<String>,
    #[serde(default, alias = "execute_path")]
    pub executor_path: Option<String>,
    /// Legacy flag. `true`: the target runs directly and any executor is
    /// ignored. `false`: the target needs `executor_path` to run. Absent:
    /// an executor is used whenever `executor_path` is non-empty.
    #[serde(default)]
    pub executable: Option<bool>,
    #[serde(default)]
    pub preset_input: String,

    // Composite plugins
    #[serde(default, alias = "configure_path")]
    pub links_path: Option<String>,
}

/// Contents of a composite plugin's link file
#[derive(Debug, Clone, Deserialize)]
struct LinkFile {
    #[serde(alias = "CommandCombination")]
    links: Vec<LinkSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct LinkSpec {
    name: String,
    #[serde(default = "default_link_waitable")]
    waitable: bool,
    #[serde(default)]
    input: Option<String>,
}

fn default_link_waitable() -> bool {
    true
}

/// What a registration wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredPlugin {
    pub name: String,
    pub mode: CommandMode,
    /// Link count for composites, 0 for terminals
    pub links: usize,
}

/// Register (or re-register) the plugin in `folder`
pub fn register_plugin(catalog: &SqliteCatalog, folder: &Path) -> Result<RegisteredPlugin> {
    let manifest_path = folder.join(MANIFEST_FILE);
    let manifest = read_json::<PluginManifest>(&manifest_path)?;

    if manifest.name.trim().is_empty() {
        return Err(invalid(&manifest_path, "name cannot be empty"));
    }

    let entry = CommandEntry::new(manifest.name.clone(), manifest.mode)
        .with_description(manifest.description.clone())
        .with_visibility(manifest.visibility);

    let registered = match manifest.mode {
        CommandMode::Terminal => {
            let step = terminal_step(&manifest, folder, &manifest_path)?;
            catalog.register_terminal(&entry, &step)?;
            RegisteredPlugin {
                name: manifest.name,
                mode: CommandMode::Terminal,
                links: 0,
            }
        }
        CommandMode::Composite => {
            let links_path = manifest
                .links_path
                .as_deref()
                .map(|p| resolve_path(folder, p))
                .ok_or_else(|| invalid(&manifest_path, "composite plugin needs links_path"))?;
            let link_file = read_json::<LinkFile>(&links_path)?;
            let links: Vec<CommandLink> = link_file
                .links
                .into_iter()
                .enumerate()
                .map(|(idx, spec)| {
                    let link = CommandLink::new(manifest.name.clone(), idx as i64, spec.name)
                        .waitable(spec.waitable);
                    match spec.input {
                        Some(input) if !input.is_empty() => link.with_input(input),
                        _ => link,
                    }
                })
                .collect();
            catalog.register_composite(&entry, &links)?;
            RegisteredPlugin {
                name: manifest.name,
                mode: CommandMode::Composite,
                links: links.len(),
            }
        }
    };

    info!(
        "Registered {} plugin '{}' from {}",
        registered.mode.as_str(),
        registered.name,
        folder.display()
    );
    Ok(registered)
}

fn terminal_step(manifest: &PluginManifest, folder: &Path, manifest_path: &Path) -> Result<StepConfig> {
    let target = manifest
        .target_path
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| invalid(manifest_path, "terminal plugin needs target_path"))?;

    let mut step = StepConfig::new(manifest.name.clone(), path_string(&resolve_path(folder, target)))
        .waitable(manifest.waitable)
        .associatable(manifest.supports_incremental_query)
        .with_preset_input(manifest.preset_input.clone());
    step.description = manifest.description.clone();
    step.visibility = manifest.visibility;

    let executor = manifest.executor_path.as_deref().filter(|p| !p.trim().is_empty());
    match (manifest.executable, executor) {
        (Some(true), Some(ignored)) => {
            debug!("'{}' is executable; ignoring executor '{}'", manifest.name, ignored);
        }
        (Some(false), None) => {
            return Err(invalid(
                manifest_path,
                "plugin is not executable and has no executor_path",
            ));
        }
        (_, Some(executor)) => {
            step = step.with_executor(executor_string(folder, executor));
        }
        (_, None) => {}
    }

    Ok(step)
}

/// Executors given as bare program names (`python3`) are looked up on PATH
/// at launch; anything with a separator is taken relative to the plugin.
fn executor_string(folder: &Path, executor: &str) -> String {
    if executor.contains('/') || executor.contains('\\') {
        path_string(&resolve_path(folder, executor))
    } else {
        executor.to_string()
    }
}

fn resolve_path(folder: &Path, relative: &str) -> PathBuf {
    let path = Path::new(relative);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        let joined = folder.join(path);
        fs::canonicalize(&joined).unwrap_or(joined)
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| invalid(path, &e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| invalid(path, &e.to_string()))
}

fn invalid(path: &Path, reason: &str) -> Error {
    Error::ManifestInvalid {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
