//! Resource kinds declared on a TOML manifest, with their resources served from JSON fixtures

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use serde_json::Value;

use crate::{
    action::ActionRegistry,
    config::{CatalogConfig, KeyBindingsConfig},
    model::{DataFetcher, DisplayFormatter, Resource},
    service::Registry,
    using,
};

using! {
    pub format,
    pub manifest,
    pub fixture,
}

const BUILTIN_MANIFEST: &str = include_str!("../../catalog/manifest.toml");
const BUILTIN_DATA: &[(&str, &str)] = &[
    ("data/instances.json", include_str!("../../catalog/data/instances.json")),
    ("data/vpcs.json", include_str!("../../catalog/data/vpcs.json")),
    ("data/queues.json", include_str!("../../catalog/data/queues.json")),
    ("data/functions.json", include_str!("../../catalog/data/functions.json")),
    ("data/log_groups.json", include_str!("../../catalog/data/log_groups.json")),
    ("data/stacks.json", include_str!("../../catalog/data/stacks.json")),
];

/// A loaded catalog: every declared kind along with its resources
pub struct Catalog {
    kinds: Vec<CatalogKind>,
}

struct CatalogKind {
    manifest: Arc<KindManifest>,
    items: Arc<Vec<Resource>>,
}

impl Catalog {
    /// Loads the configured manifest, or the built-in one when there's none
    pub fn load(config: &CatalogConfig) -> Result<Self> {
        match &config.manifest {
            Some(path) => Self::from_file(path),
            None => Self::builtin(),
        }
    }

    /// Loads the built-in demo catalog
    pub fn builtin() -> Result<Self> {
        let manifest = Manifest::parse(BUILTIN_MANIFEST).wrap_err("Couldn't parse the built-in catalog")?;
        Self::build(manifest, |data| {
            BUILTIN_DATA
                .iter()
                .find(|(path, _)| *path == data)
                .map(|(_, content)| (*content).to_owned())
                .ok_or_else(|| eyre!("The built-in catalog has no {data} file"))
        })
    }

    /// Loads a manifest file, data files are resolved relative to its directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).wrap_err_with(|| format!("Couldn't read manifest {}", path.display()))?;
        let manifest = Manifest::parse(&raw).wrap_err_with(|| format!("Couldn't parse manifest {}", path.display()))?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        Self::build(manifest, |data| {
            let file = base.join(data);
            fs::read_to_string(&file).wrap_err_with(|| format!("Couldn't read data file {}", file.display()))
        })
    }

    fn build(manifest: Manifest, read: impl Fn(&str) -> Result<String>) -> Result<Self> {
        let mut kinds = Vec::with_capacity(manifest.kinds.len());
        for kind in manifest.kinds {
            let raw = read(&kind.data)?;
            let payloads: Vec<Value> =
                serde_json::from_str(&raw).wrap_err_with(|| format!("Data file {} must hold an array", kind.data))?;
            let items = build_resources(&kind, payloads);
            tracing::debug!("Loaded {} resources for {}", items.len(), kind.key());
            kinds.push(CatalogKind {
                manifest: Arc::new(kind),
                items: Arc::new(items),
            });
        }
        Ok(Self { kinds })
    }

    /// Number of declared kinds
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Registers every kind, alias and action of the catalog.
    ///
    /// Action shortcuts bound to a key binding can't be triggered, so they're skipped with a warning.
    pub fn register_all(&self, registry: &Registry, actions: &ActionRegistry, keybindings: &KeyBindingsConfig) {
        for kind in &self.kinds {
            let manifest = &kind.manifest;
            let key = manifest.key();

            let fetcher = {
                let manifest = manifest.clone();
                let items = kind.items.clone();
                Arc::new(move || Arc::new(FixtureFetcher::new(&manifest, items.clone())) as Arc<dyn DataFetcher>)
            };
            let formatter = {
                let manifest = manifest.clone();
                Arc::new(move || Arc::new(ManifestFormatter::new(manifest.clone())) as Arc<dyn DisplayFormatter>)
            };
            registry.register(&manifest.domain, &manifest.kind, fetcher, formatter);
            for alias in &manifest.aliases {
                registry.register_alias(alias, &manifest.domain, &manifest.kind);
            }

            for action in &manifest.actions {
                if keybindings.is_reserved(action.key) {
                    tracing::warn!(
                        "Skipping action {} of {key}: its shortcut '{}' is bound to a key binding",
                        action.name,
                        action.key
                    );
                    continue;
                }
                if manifest.navigations.iter().any(|n| n.key == action.key) {
                    tracing::warn!(
                        "Action {} of {key} shares the shortcut '{}' with a navigation, the action takes precedence",
                        action.name,
                        action.key
                    );
                }
                actions.register(&key, action.to_action());
            }
        }
    }
}

/// Builds a service browsing the built-in catalog on the default demo selection
#[cfg(test)]
pub(crate) fn demo_service(read_only: bool) -> crate::service::CloudScopeService {
    demo_service_with(Arc::new(FixtureInvoker), read_only)
}

/// Builds a service browsing the built-in catalog, invoking provider operations through the given invoker
#[cfg(test)]
pub(crate) fn demo_service_with(
    invoker: Arc<dyn crate::action::ApiInvoker>,
    read_only: bool,
) -> crate::service::CloudScopeService {
    use crate::{
        action::ActionExecutor,
        config::BrowserConfig,
        service::{CloudScopeService, Selection},
    };

    let registry = Arc::new(Registry::new());
    let actions = Arc::new(ActionRegistry::new());
    Catalog::builtin()
        .unwrap()
        .register_all(&registry, &actions, &KeyBindingsConfig::default());
    let executor = Arc::new(ActionExecutor::new(invoker, read_only));
    CloudScopeService::new(
        registry,
        actions,
        executor,
        vec![Selection::new("default", "us-east-1")],
        BrowserConfig::default(),
    )
    .unwrap()
}
