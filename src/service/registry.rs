use std::{collections::HashMap, sync::Arc};

use itertools::Itertools;
use parking_lot::RwLock;

use crate::{
    errors::{Result, UserFacingError},
    model::{DataFetcher, DisplayFormatter, FetcherFactory, FormatterFactory, ResourceKey},
};

/// Process-wide catalog of resource kinds.
///
/// It's populated once at startup and then shared (through an [`Arc`]) with every component that needs lookups, so
/// the lock is only contended on registration.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    /// Registration order, needed for prefix resolution
    order: Vec<ResourceKey>,
    entries: HashMap<ResourceKey, KindEntry>,
    aliases: HashMap<String, ResourceKey>,
}

#[derive(Clone)]
struct KindEntry {
    fetcher: FetcherFactory,
    formatter: FormatterFactory,
}

/// The fetcher and formatter of a registered kind
#[derive(Clone)]
pub struct KindHandle {
    pub key: ResourceKey,
    pub fetcher: Arc<dyn DataFetcher>,
    pub formatter: Arc<dyn DisplayFormatter>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind, replacing any previous registration of the same key
    pub fn register(
        &self,
        domain: impl Into<String>,
        kind: impl Into<String>,
        fetcher: FetcherFactory,
        formatter: FormatterFactory,
    ) {
        let key = ResourceKey::new(domain, kind);
        let mut inner = self.inner.write();
        if inner.entries.insert(key.clone(), KindEntry { fetcher, formatter }).is_some() {
            tracing::warn!("Kind {key} was already registered, replacing it");
        } else {
            tracing::trace!("Registered kind {key}");
            inner.order.push(key);
        }
    }

    /// Registers a short or historical name for a kind
    pub fn register_alias(&self, alias: impl AsRef<str>, domain: impl Into<String>, kind: impl Into<String>) {
        let alias = alias.as_ref().trim().to_lowercase();
        let key = ResourceKey::new(domain, kind);
        tracing::trace!("Registered alias {alias} -> {key}");
        self.inner.write().aliases.insert(alias, key);
    }

    /// Retrieves the fetcher and formatter of a kind
    pub fn get(&self, key: &ResourceKey) -> Result<KindHandle> {
        let entry = self
            .inner
            .read()
            .entries
            .get(key)
            .cloned()
            .ok_or_else(|| UserFacingError::ResourceNotFound(key.to_string()))?;
        // Factories are invoked outside of the lock
        Ok(KindHandle {
            key: key.clone(),
            fetcher: (entry.fetcher)(),
            formatter: (entry.formatter)(),
        })
    }

    /// Checks whether the given kind is registered
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.inner.read().entries.contains_key(key)
    }

    /// Resolves the user input into a registered kind.
    ///
    /// Aliases are attempted first, then an exact `domain/kind` and finally a prefix match: the first registered domain
    /// matching the text and, within it, the first kind whose name starts with the remainder.
    pub fn resolve(&self, text: &str) -> Result<ResourceKey> {
        let text = text.trim();
        let lower = text.to_lowercase();
        let inner = self.inner.read();

        if let Some(key) = inner.aliases.get(&lower) {
            return Ok(key.clone());
        }

        if let Ok(key) = lower.parse::<ResourceKey>()
            && inner.entries.contains_key(&key)
        {
            return Ok(key);
        }

        if !lower.is_empty() {
            let (domain_prefix, kind_prefix) = match lower.split_once(['/', ' ', ':']) {
                Some((d, k)) => (d.trim(), Some(k.trim())),
                None => (lower.as_str(), None),
            };
            for domain in inner.order.iter().map(|k| k.domain.as_str()).unique() {
                let remainder = if domain.starts_with(domain_prefix) {
                    kind_prefix.unwrap_or_default()
                } else if kind_prefix.is_none() && domain_prefix.starts_with(domain) {
                    domain_prefix[domain.len()..].trim_start_matches(['-', '_'])
                } else {
                    continue;
                };
                // Only the first matching domain is considered
                return inner
                    .order
                    .iter()
                    .find(|k| k.domain == domain && k.kind.starts_with(remainder))
                    .cloned()
                    .ok_or_else(|| UserFacingError::ResourceNotFound(text.to_owned()).into());
            }
        }

        Err(UserFacingError::ResourceNotFound(text.to_owned()).into())
    }

    /// Lists the registered kinds, in registration order
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.inner.read().order.clone()
    }

    /// Lists the registered aliases for the given kind, sorted
    pub fn aliases_of(&self, key: &ResourceKey) -> Vec<String> {
        let inner = self.inner.read();
        let mut aliases = inner
            .aliases
            .iter()
            .filter(|(_, k)| *k == key)
            .map(|(a, _)| a.clone())
            .collect::<Vec<_>>();
        aliases.sort();
        aliases
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        errors::AppError,
        model::{Column, FetchContext, Resource, SummaryField},
    };

    struct NoopFetcher;
    #[async_trait]
    impl DataFetcher for NoopFetcher {
        async fn list(&self, _ctx: &FetchContext) -> Result<Vec<Resource>> {
            Ok(vec![Resource::new("x")])
        }
    }

    struct NoopFormatter;
    impl DisplayFormatter for NoopFormatter {
        fn columns(&self) -> Vec<Column> {
            vec![]
        }

        fn render_detail(&self, resource: &Resource) -> String {
            resource.id().to_owned()
        }

        fn render_summary(&self, _resource: &Resource) -> Vec<SummaryField> {
            vec![]
        }
    }

    fn register(registry: &Registry, domain: &str, kind: &str) {
        registry.register(
            domain,
            kind,
            Arc::new(|| Arc::new(NoopFetcher) as Arc<dyn DataFetcher>),
            Arc::new(|| Arc::new(NoopFormatter) as Arc<dyn DisplayFormatter>),
        );
    }

    fn registry() -> Registry {
        let registry = Registry::new();
        register(&registry, "ec2", "instances");
        register(&registry, "ec2", "images");
        register(&registry, "ecs", "clusters");
        register(&registry, "sqs", "queues");
        registry.register_alias("q", "sqs", "queues");
        registry
    }

    fn is_not_found(res: Result<impl Sized>) -> bool {
        matches!(res, Err(AppError::UserFacing(UserFacingError::ResourceNotFound(_))))
    }

    #[tokio::test]
    async fn test_get() -> color_eyre::Result<()> {
        let registry = registry();
        let handle = registry
            .get(&ResourceKey::new("sqs", "queues"))
            .map_err(AppError::into_report)?;
        let items = handle
            .fetcher
            .list(&FetchContext::new("default", "us-east-1"))
            .await
            .map_err(AppError::into_report)?;
        assert_eq!(items.len(), 1);
        assert!(is_not_found(registry.get(&ResourceKey::new("sqs", "topics"))));
        Ok(())
    }

    #[test]
    fn test_register_last_write_wins_keeps_order() {
        let registry = registry();
        register(&registry, "ec2", "instances");
        assert_eq!(registry.keys().len(), 4);
        assert_eq!(registry.keys()[0], ResourceKey::new("ec2", "instances"));
    }

    #[test]
    fn test_resolve_alias_first() {
        let registry = registry();
        registry.register_alias("ec2/images", "ec2", "instances");
        assert_eq!(registry.resolve("Q").ok(), Some(ResourceKey::new("sqs", "queues")));
        assert_eq!(
            registry.resolve("ec2/images").ok(),
            Some(ResourceKey::new("ec2", "instances"))
        );
    }

    #[test]
    fn test_resolve_exact() {
        let registry = registry();
        assert_eq!(
            registry.resolve("ECS/clusters").ok(),
            Some(ResourceKey::new("ecs", "clusters"))
        );
    }

    #[test]
    fn test_resolve_prefix() {
        let registry = registry();
        assert_eq!(registry.resolve("ec").ok(), Some(ResourceKey::new("ec2", "instances")));
        assert_eq!(registry.resolve("ec2/im").ok(), Some(ResourceKey::new("ec2", "images")));
        assert_eq!(registry.resolve("ec2 im").ok(), Some(ResourceKey::new("ec2", "images")));
        assert_eq!(registry.resolve("ec2images").ok(), Some(ResourceKey::new("ec2", "images")));
        assert_eq!(registry.resolve("sq").ok(), Some(ResourceKey::new("sqs", "queues")));
    }

    #[test]
    fn test_resolve_prefix_first_domain_only() {
        let registry = registry();
        // "ec" matches "ec2" first, which has no "clusters" kind
        assert!(is_not_found(registry.resolve("ec/clusters")));
        assert!(is_not_found(registry.resolve("lambda")));
        assert!(is_not_found(registry.resolve("")));
    }

    #[test]
    fn test_aliases_of() {
        let registry = registry();
        registry.register_alias("queues", "sqs", "queues");
        assert_eq!(registry.aliases_of(&ResourceKey::new("sqs", "queues")), vec!["q", "queues"]);
    }
}
