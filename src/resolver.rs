//! Command Resolution
//!
//! Turns a typed name into either a list of name suggestions or an ordered
//! queue of terminal steps. Composite commands are flattened depth-first in
//! link order; link overrides accumulate down the path.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::catalog::{CommandCatalog, DEFAULT_FETCH_BATCH_SIZE, DEFAULT_SUGGESTION_LIMIT};
use crate::error::{Error, Result};
use crate::models::{CommandEntry, CommandLink, CommandMode, ResolvedChain, StepConfig};

/// Whether a closure walk finished cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureStatus {
    Valid,
    Cycle,
}

/// A terminal reached by the closure walk with the overrides its path applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureLeaf {
    pub name: String,
    /// AND of every `waitable_override` on the path
    pub inherited_waitable: bool,
    /// Nearest `preset_input_override` on the path
    pub inherited_preset_input: Option<String>,
}

/// Every terminal reachable from a root, in pre-order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    pub status: ClosureStatus,
    /// Empty when `status` is `Cycle`
    pub leaves: Vec<ClosureLeaf>,
}

#[derive(Debug, Clone)]
struct Inherited {
    waitable: bool,
    preset: Option<String>,
}

enum Walk {
    Continue,
    Cycle,
}

/// Catalog rows already read during one walk; shared subcomposites hit the
/// catalog once no matter how many paths reach them
#[derive(Default)]
struct NodeCache {
    entries: HashMap<String, Option<CommandEntry>>,
    links: HashMap<String, Vec<CommandLink>>,
}

impl NodeCache {
    fn entry(
        &mut self,
        catalog: &dyn CommandCatalog,
        name: &str,
        allow_restricted: bool,
    ) -> Result<Option<CommandEntry>> {
        if let Some(cached) = self.entries.get(name) {
            return Ok(cached.clone());
        }
        let entry = catalog.entry(name, allow_restricted).map_err(as_storage)?;
        self.entries.insert(name.to_string(), entry.clone());
        Ok(entry)
    }

    fn links(&mut self, catalog: &dyn CommandCatalog, parent: &str) -> Result<Vec<CommandLink>> {
        if let Some(cached) = self.links.get(parent) {
            return Ok(cached.clone());
        }
        let links = catalog.links(parent).map_err(as_storage)?;
        self.links.insert(parent.to_string(), links.clone());
        Ok(links)
    }
}

/// Resolves names against a command catalog
#[derive(Clone)]
pub struct Resolver {
    catalog: Arc<dyn CommandCatalog>,
    suggestion_limit: usize,
    fetch_batch_size: usize,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("suggestion_limit", &self.suggestion_limit)
            .field("fetch_batch_size", &self.fetch_batch_size)
            .finish()
    }
}

impl Resolver {
    /// Create a resolver with the default limits
    pub fn new(catalog: Arc<dyn CommandCatalog>) -> Self {
        Self {
            catalog,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            fetch_batch_size: DEFAULT_FETCH_BATCH_SIZE,
        }
    }

    /// Override the suggestion cap and lookup batch size (both clamped to at least 1)
    pub fn with_limits(mut self, suggestion_limit: usize, fetch_batch_size: usize) -> Self {
        self.suggestion_limit = suggestion_limit.max(1);
        self.fetch_batch_size = fetch_batch_size.max(1);
        self
    }

    /// Underlying catalog
    pub fn catalog(&self) -> &Arc<dyn CommandCatalog> {
        &self.catalog
    }

    /// Names matching `prefix`, best ranked first
    pub fn suggest(&self, prefix: &str, allow_restricted: bool) -> Result<Vec<String>> {
        self.catalog
            .search(prefix, allow_restricted, self.suggestion_limit)
            .map_err(as_storage)
    }

    /// Expand `name` into its ordered terminal steps
    pub fn resolve(&self, name: &str, allow_restricted: bool) -> Result<ResolvedChain> {
        let closure = self.closure(name, allow_restricted)?;

        if closure.status == ClosureStatus::Cycle {
            warn!("Refusing to resolve '{}': circular reference", name);
            return Err(Error::CycleDetected {
                name: name.to_string(),
            });
        }
        if closure.leaves.is_empty() {
            return Err(Error::NotFound {
                name: name.to_string(),
            });
        }

        let rows = self.fetch_rows(&closure.leaves, allow_restricted)?;
        let steps: Vec<StepConfig> = closure
            .leaves
            .iter()
            .filter_map(|leaf| {
                let Some(row) = rows.get(&leaf.name) else {
                    warn!("Terminal '{}' has no step row, skipping", leaf.name);
                    return None;
                };
                let mut step = row.clone();
                step.waitable = step.waitable && leaf.inherited_waitable;
                if let Some(preset) = &leaf.inherited_preset_input {
                    step.preset_input = preset.clone();
                }
                Some(step)
            })
            .collect();

        if steps.is_empty() {
            return Err(Error::NotFound {
                name: name.to_string(),
            });
        }

        debug!("Resolved '{}' into {} step(s)", name, steps.len());
        Ok(ResolvedChain::new(name, steps))
    }

    /// Walk the link graph from `name` and report every terminal it reaches
    ///
    /// Fails with `NotFound` when the root itself is absent or hidden.
    pub fn closure(&self, name: &str, allow_restricted: bool) -> Result<Closure> {
        let mut cache = NodeCache::default();
        let root = cache
            .entry(self.catalog.as_ref(), name, allow_restricted)?
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;

        let mut leaves = Vec::new();
        let inherited = Inherited {
            waitable: true,
            preset: None,
        };

        match root.mode {
            CommandMode::Terminal => leaves.push(ClosureLeaf {
                name: root.name.clone(),
                inherited_waitable: inherited.waitable,
                inherited_preset_input: inherited.preset,
            }),
            CommandMode::Composite => {
                let mut path = vec![root.name.clone()];
                if let Walk::Cycle =
                    self.walk(&root, allow_restricted, &mut path, &inherited, &mut cache, &mut leaves)?
                {
                    return Ok(Closure {
                        status: ClosureStatus::Cycle,
                        leaves: Vec::new(),
                    });
                }
            }
        }

        Ok(Closure {
            status: ClosureStatus::Valid,
            leaves,
        })
    }

    fn walk(
        &self,
        parent: &CommandEntry,
        allow_restricted: bool,
        path: &mut Vec<String>,
        inherited: &Inherited,
        cache: &mut NodeCache,
        leaves: &mut Vec<ClosureLeaf>,
    ) -> Result<Walk> {
        for link in cache.links(self.catalog.as_ref(), &parent.name)? {
            if path.iter().any(|ancestor| *ancestor == link.child) {
                debug!(
                    "Cycle: '{}' links back to '{}' (path {:?})",
                    parent.name, link.child, path
                );
                return Ok(Walk::Cycle);
            }

            let Some(child) = cache.entry(self.catalog.as_ref(), &link.child, allow_restricted)?
            else {
                trace!("Link {} -> {} skipped: absent or hidden", parent.name, link.child);
                continue;
            };

            let next = Inherited {
                waitable: inherited.waitable && link.overrides.waitable_override,
                preset: link
                    .overrides
                    .preset_input_override
                    .clone()
                    .or_else(|| inherited.preset.clone()),
            };

            match child.mode {
                CommandMode::Terminal => leaves.push(ClosureLeaf {
                    name: child.name,
                    inherited_waitable: next.waitable,
                    inherited_preset_input: next.preset,
                }),
                CommandMode::Composite => {
                    path.push(child.name.clone());
                    let walk = self.walk(&child, allow_restricted, path, &next, cache, leaves)?;
                    path.pop();
                    if let Walk::Cycle = walk {
                        return Ok(Walk::Cycle);
                    }
                }
            }
        }

        Ok(Walk::Continue)
    }

    /// Fetch step rows for every distinct leaf, `fetch_batch_size` names per query
    fn fetch_rows(
        &self,
        leaves: &[ClosureLeaf],
        allow_restricted: bool,
    ) -> Result<HashMap<String, StepConfig>> {
        let mut seen = HashSet::new();
        let names: Vec<String> = leaves
            .iter()
            .filter(|leaf| seen.insert(leaf.name.as_str()))
            .map(|leaf| leaf.name.clone())
            .collect();

        let mut rows = HashMap::with_capacity(names.len());
        for chunk in names.chunks(self.fetch_batch_size) {
            let steps = self
                .catalog
                .fetch_steps(chunk, allow_restricted)
                .map_err(|e| {
                    error!("Step lookup failed for batch of {}: {}", chunk.len(), e);
                    as_storage(e)
                })?;
            for step in steps {
                rows.insert(step.name.clone(), step);
            }
        }

        Ok(rows)
    }
}

/// Every catalog failure surfaces as a storage error
fn as_storage(err: Error) -> Error {
    match err {
        Error::Storage { .. } => err,
        other => Error::Storage {
            reason: other.to_string(),
        },
    }
}
