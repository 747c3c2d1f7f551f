use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    action::{ActionDef, ActionExecutor, ActionOutcome, ActionRegistry},
    config::BrowserConfig,
    errors::{AppError, Result, UserFacingError},
    model::{FetchContext, Page, Resource, ResourceKey},
};

pub mod context;
pub mod registry;

pub use context::{Selection, refresh_all};
pub use registry::{KindHandle, Registry};

/// Service shared by every surface to look up kinds, fetch their resources and run their actions
#[derive(Clone)]
pub struct CloudScopeService {
    registry: Arc<Registry>,
    actions: Arc<ActionRegistry>,
    executor: Arc<ActionExecutor>,
    selections: Arc<Vec<Selection>>,
    browser: BrowserConfig,
}

impl CloudScopeService {
    /// Creates a new instance of `CloudScopeService`, with at least one selection
    pub fn new(
        registry: Arc<Registry>,
        actions: Arc<ActionRegistry>,
        executor: Arc<ActionExecutor>,
        selections: Vec<Selection>,
        browser: BrowserConfig,
    ) -> Result<Self> {
        if selections.is_empty() {
            return Err(color_eyre::eyre::eyre!("At least one profile must be selected").into());
        }
        Ok(Self {
            registry,
            actions,
            executor,
            selections: Arc::new(selections),
            browser,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    pub fn browser_config(&self) -> &BrowserConfig {
        &self.browser
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Short description of the active selections, like `dev@eu-west-1` or `dev,prod@eu-west-1`
    pub fn selection_label(&self) -> String {
        let regions = self.selections.iter().map(|s| s.region.as_str()).collect::<Vec<_>>();
        if regions.iter().all(|r| *r == regions[0]) {
            let profiles = self.selections.iter().map(|s| s.profile.as_str()).collect::<Vec<_>>();
            format!("{}@{}", profiles.join(","), regions[0])
        } else {
            self.selections.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",")
        }
    }

    /// Resolves a kind typed by the user and returns its handle
    pub fn open(&self, text: &str) -> Result<KindHandle> {
        let key = self.registry.resolve(text)?;
        self.registry.get(&key)
    }

    /// Context of the primary selection, used for pagination and actions
    pub fn primary_context(&self, cancellation_token: &CancellationToken) -> FetchContext {
        self.selections[0].context(cancellation_token)
    }

    /// Whether the kind is browsed page by page.
    ///
    /// Only a single selection is paginated, multiple selections are fully fetched and merged.
    pub fn is_paginated(&self, handle: &KindHandle) -> bool {
        self.selections.len() == 1 && handle.fetcher.as_paginated().is_some()
    }

    /// Fetches the first page of resources of a kind.
    ///
    /// Kinds without pagination (or multiple selections) are fully fetched in a single page without continuation.
    #[instrument(skip_all, fields(kind = %handle.key))]
    pub async fn fetch_first(&self, handle: &KindHandle, cancellation_token: &CancellationToken) -> Result<Page> {
        if self.is_paginated(handle) {
            return self.fetch_page(handle, cancellation_token, None).await;
        }
        let items = if self.selections.len() == 1 {
            let ctx = self.primary_context(cancellation_token);
            ctx.ensure_active()?;
            handle.fetcher.list(&ctx).await.map_err(into_fetch_error)?
        } else {
            let fetcher = handle.fetcher.clone();
            refresh_all(&self.selections, cancellation_token, |ctx| {
                let fetcher = fetcher.clone();
                async move {
                    ctx.ensure_active()?;
                    fetcher.list(&ctx).await.map_err(into_fetch_error)
                }
            })
            .await?
            .into_iter()
            .flat_map(|(_, items)| items)
            .collect()
        };
        tracing::debug!("Fetched {} resources", items.len());
        Ok(Page {
            items,
            next_token: None,
        })
    }

    /// Fetches a page of resources of a paginated kind, on the primary selection
    #[instrument(skip_all, fields(kind = %handle.key))]
    pub async fn fetch_page(
        &self,
        handle: &KindHandle,
        cancellation_token: &CancellationToken,
        token: Option<String>,
    ) -> Result<Page> {
        let paginated = handle
            .fetcher
            .as_paginated()
            .ok_or_else(|| UserFacingError::FetchFailed(format!("{} can't be paginated", handle.key)))?;
        let ctx = self.primary_context(cancellation_token);
        ctx.ensure_active()?;
        let page = paginated
            .list_page(&ctx, self.browser.page_size, token.as_deref())
            .await
            .map_err(into_fetch_error)?;
        tracing::debug!("Fetched a page of {} resources", page.items.len());
        Ok(Page {
            next_token: page.continuation().map(String::from),
            items: page.items,
        })
    }

    /// Fetches every resource of a kind, draining all of its pages
    #[instrument(skip_all, fields(kind = %handle.key))]
    pub async fn fetch_all(&self, handle: &KindHandle, cancellation_token: &CancellationToken) -> Result<Vec<Resource>> {
        let mut page = self.fetch_first(handle, cancellation_token).await?;
        let mut items = std::mem::take(&mut page.items);
        while let Some(token) = page.next_token.take() {
            page = self.fetch_page(handle, cancellation_token, Some(token)).await?;
            items.append(&mut page.items);
        }
        Ok(items)
    }

    /// Actions of a kind available for the given resource
    pub fn applicable_actions(&self, key: &ResourceKey, resource: &Resource) -> Vec<ActionDef> {
        self.actions.applicable(key, resource)
    }

    /// Runs an action on a resource through the executor, on the primary selection
    pub async fn execute_action(
        &self,
        handle: &KindHandle,
        action: &ActionDef,
        resource: &Resource,
        cancellation_token: &CancellationToken,
    ) -> Result<ActionOutcome> {
        let ctx = self.primary_context(cancellation_token);
        self.executor
            .execute(
                &handle.key,
                action,
                resource,
                &ctx,
                handle.formatter.as_variable_provider(),
            )
            .await
    }
}

/// Downgrades unexpected errors from a fetcher into a user-facing fetch failure, so they're rendered on the surface
fn into_fetch_error(err: AppError) -> AppError {
    match err {
        AppError::UserFacing(_) => err,
        AppError::Unexpected(report) => {
            tracing::warn!("Fetch failed: {report:?}");
            UserFacingError::FetchFailed(report.to_string()).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use color_eyre::eyre::eyre;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        action::ApiInvoker,
        model::{Column, DataFetcher, DisplayFormatter, PaginatedFetcher, SummaryField},
    };

    struct Paged {
        total: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataFetcher for Paged {
        async fn list(&self, _ctx: &FetchContext) -> Result<Vec<Resource>> {
            Ok((0..self.total).map(|i| Resource::new(format!("r-{i}"))).collect())
        }

        fn as_paginated(&self) -> Option<&dyn PaginatedFetcher> {
            Some(self)
        }
    }

    #[async_trait]
    impl PaginatedFetcher for Paged {
        async fn list_page(&self, _ctx: &FetchContext, page_size: usize, token: Option<&str>) -> Result<Page> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let start: usize = token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let end = (start + page_size).min(self.total);
            Ok(Page {
                items: (start..end).map(|i| Resource::new(format!("r-{i}"))).collect(),
                next_token: (end < self.total).then(|| end.to_string()),
            })
        }
    }

    struct PerProfile;

    #[async_trait]
    impl DataFetcher for PerProfile {
        async fn list(&self, ctx: &FetchContext) -> Result<Vec<Resource>> {
            if ctx.profile == "broken" {
                return Err(eyre!("access denied").into());
            }
            Ok(vec![Resource::new(format!("{}-1", ctx.profile))])
        }
    }

    struct Plain;

    impl DisplayFormatter for Plain {
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

    struct NoopInvoker;

    #[async_trait]
    impl ApiInvoker for NoopInvoker {
        async fn invoke(&self, _: &FetchContext, _: &ResourceKey, op: &str, _: &Resource) -> Result<String> {
            Ok(op.to_owned())
        }
    }

    fn service(selections: Vec<Selection>, page_size: usize) -> CloudScopeService {
        let registry = Registry::new();
        registry.register(
            "test",
            "paged",
            Arc::new(|| {
                Arc::new(Paged {
                    total: 7,
                    calls: AtomicUsize::new(0),
                }) as Arc<dyn DataFetcher>
            }),
            Arc::new(|| Arc::new(Plain) as Arc<dyn DisplayFormatter>),
        );
        registry.register(
            "test",
            "profiles",
            Arc::new(|| Arc::new(PerProfile) as Arc<dyn DataFetcher>),
            Arc::new(|| Arc::new(Plain) as Arc<dyn DisplayFormatter>),
        );
        let browser = BrowserConfig {
            page_size,
            ..Default::default()
        };
        CloudScopeService::new(
            Arc::new(registry),
            Arc::new(ActionRegistry::new()),
            Arc::new(ActionExecutor::new(Arc::new(NoopInvoker), false)),
            selections,
            browser,
        )
        .unwrap()
    }

    #[test]
    fn test_requires_selection() {
        let res = CloudScopeService::new(
            Arc::new(Registry::new()),
            Arc::new(ActionRegistry::new()),
            Arc::new(ActionExecutor::new(Arc::new(NoopInvoker), false)),
            vec![],
            BrowserConfig::default(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_selection_label() {
        let service = service(Selection::for_profiles(&["dev".into(), "prod".into()], "eu-west-1"), 3);
        assert_eq!(service.selection_label(), "dev,prod@eu-west-1");
        let service = service_with(vec![Selection::new("dev", "eu-west-1"), Selection::new("dev", "us-east-1")]);
        assert_eq!(service.selection_label(), "dev@eu-west-1,dev@us-east-1");
    }

    fn service_with(selections: Vec<Selection>) -> CloudScopeService {
        service(selections, 3)
    }

    #[tokio::test]
    async fn test_fetch_first_page() {
        let service = service_with(vec![Selection::new("dev", "eu-west-1")]);
        let handle = service.open("test/paged").unwrap();
        assert!(service.is_paginated(&handle));
        let page = service.fetch_first(&handle, &CancellationToken::new()).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.next_token.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_fetch_all_drains_pages() {
        let service = service_with(vec![Selection::new("dev", "eu-west-1")]);
        let handle = service.open("test/paged").unwrap();
        let items = service.fetch_all(&handle, &CancellationToken::new()).await.unwrap();
        let ids: Vec<_> = items.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["r-0", "r-1", "r-2", "r-3", "r-4", "r-5", "r-6"]);
    }

    #[tokio::test]
    async fn test_multiple_selections_merge() {
        let service = service_with(Selection::for_profiles(
            &["dev".into(), "broken".into(), "prod".into()],
            "eu-west-1",
        ));
        let handle = service.open("test/profiles").unwrap();
        assert!(!service.is_paginated(&handle));
        let page = service.fetch_first(&handle, &CancellationToken::new()).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["dev-1", "prod-1"]);
        assert_eq!(page.next_token, None);
    }

    #[tokio::test]
    async fn test_fetch_error_is_user_facing() {
        let service = service_with(vec![Selection::new("broken", "eu-west-1")]);
        let handle = service.open("test/profiles").unwrap();
        let res = service.fetch_first(&handle, &CancellationToken::new()).await;
        assert!(matches!(
            res,
            Err(AppError::UserFacing(UserFacingError::FetchFailed(msg))) if msg == "access denied"
        ));
    }

    #[tokio::test]
    async fn test_cancelled_fetch() {
        let service = service_with(vec![Selection::new("dev", "eu-west-1")]);
        let handle = service.open("test/profiles").unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let res = service.fetch_first(&handle, &token).await;
        assert!(matches!(res, Err(AppError::UserFacing(UserFacingError::Cancelled))));
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let service = service_with(vec![Selection::new("dev", "eu-west-1")]);
        assert!(matches!(
            service.open("nothing/here"),
            Err(AppError::UserFacing(UserFacingError::ResourceNotFound(_)))
        ));
    }
}
