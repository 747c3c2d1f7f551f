use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{Column, Navigation, Resource, SummaryField};
use crate::errors::{Result, UserFacingError};

/// Account and region a fetch is performed against
#[derive(Clone, Debug)]
pub struct FetchContext {
    /// Credentials profile name
    pub profile: String,
    /// Provider region
    pub region: String,
    cancellation_token: CancellationToken,
}

impl FetchContext {
    pub fn new(profile: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            region: region.into(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Links this context to the given cancellation token
    pub fn with_cancellation(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// Fails with [`UserFacingError::Cancelled`] if the context has expired.
    ///
    /// Fetchers are expected to call this before issuing any provider call, there's no forced preemption.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            Err(UserFacingError::Cancelled.into())
        } else {
            Ok(())
        }
    }
}

/// A single page of resources
#[derive(Debug, Default)]
pub struct Page {
    pub items: Vec<Resource>,
    /// Opaque continuation token, absent or empty when there are no more pages
    pub next_token: Option<String>,
}

impl Page {
    /// Returns the continuation token, if there are more pages
    pub fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Retrieves the resources of a kind
#[async_trait]
pub trait DataFetcher: Send + Sync {
    /// Lists every resource of the kind for the given context
    async fn list(&self, ctx: &FetchContext) -> Result<Vec<Resource>>;

    /// Returns this fetcher as a [`PaginatedFetcher`], when it supports fetching page by page
    fn as_paginated(&self) -> Option<&dyn PaginatedFetcher> {
        None
    }
}

/// Optional capability of a [`DataFetcher`] to fetch resources incrementally
#[async_trait]
pub trait PaginatedFetcher: Send + Sync {
    /// Lists a single page of up to `page_size` resources, starting at `token` (or the beginning when `None`)
    async fn list_page(&self, ctx: &FetchContext, page_size: usize, token: Option<&str>) -> Result<Page>;
}

/// Presents the resources of a kind.
///
/// Every method must be a pure function of its inputs, formatters never perform I/O.
pub trait DisplayFormatter: Send + Sync {
    /// Columns displayed on the browser table, in order
    fn columns(&self) -> Vec<Column>;

    /// Renders the full detail of a resource, as multi-line text
    fn render_detail(&self, resource: &Resource) -> String;

    /// Renders the most relevant fields of a resource
    fn render_summary(&self, resource: &Resource) -> Vec<SummaryField>;

    /// Payload fields that can be used to filter this kind, when explicitly declared.
    ///
    /// When `None`, any payload field is looked up.
    fn filter_fields(&self) -> Option<Vec<String>> {
        None
    }

    /// Returns this formatter as a [`Navigator`], if the kind declares jumps to other kinds
    fn as_navigator(&self) -> Option<&dyn Navigator> {
        None
    }

    /// Returns the metric to overlay as an extra column, if any
    fn metric(&self) -> Option<MetricSpec> {
        None
    }

    /// Returns this formatter as a [`VariableProvider`], if the kind exposes extra substitution values
    fn as_variable_provider(&self) -> Option<&dyn VariableProvider> {
        None
    }
}

/// Optional capability of a [`DisplayFormatter`] to declare cross-kind navigations
pub trait Navigator: Send + Sync {
    fn navigations(&self, resource: &Resource) -> Vec<Navigation>;
}

/// Optional capability of a [`DisplayFormatter`] to expose kind-specific values for command templates, like a
/// private address or a log group name
pub trait VariableProvider: Send + Sync {
    fn variables(&self, resource: &Resource) -> BTreeMap<String, String>;
}

/// A single metric series overlaid as an extra column
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricSpec {
    /// Column header
    pub label: String,
    /// Payload field holding the latest datapoint
    pub field: String,
    /// Unit appended to the value, like `%` or `MB`
    pub unit: String,
    /// Column width
    pub width: u16,
}

impl MetricSpec {
    /// Builds the column displaying this metric, or `-` when there's no datapoint
    pub fn to_column(&self) -> Column {
        let field = self.field.clone();
        let unit = self.unit.clone();
        Column::new(self.label.clone(), self.width, move |r| {
            let value = r.field_str(&field);
            if value.is_empty() {
                String::from("-")
            } else if unit.is_empty() {
                value
            } else {
                format!("{value} {unit}")
            }
        })
    }
}

/// Factory producing the [`DataFetcher`] of a kind
pub type FetcherFactory = Arc<dyn Fn() -> Arc<dyn DataFetcher> + Send + Sync>;

/// Factory producing the [`DisplayFormatter`] of a kind
pub type FormatterFactory = Arc<dyn Fn() -> Arc<dyn DisplayFormatter> + Send + Sync>;
