use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::instrument;

use super::KindManifest;
use crate::{
    action::ApiInvoker,
    errors::{Result, UserFacingError},
    model::{
        Column, DataFetcher, DisplayFormatter, FetchContext, FieldLookup, MetricSpec, Navigation, Navigator, Page,
        PaginatedFetcher, Resource, ResourceKey, SummaryField, VariableProvider, locate_field,
    },
    utils::Tags,
};

/// Builds the resources of a kind from their JSON payloads.
///
/// Payloads without an identifier are skipped.
pub fn build_resources(kind: &KindManifest, payloads: Vec<Value>) -> Vec<Resource> {
    payloads
        .into_iter()
        .filter_map(|payload| {
            let resource = build_resource(kind, payload);
            if resource.is_none() {
                tracing::warn!("Skipping a {} payload without {}", kind.key(), kind.id_field);
            }
            resource
        })
        .collect()
}

fn build_resource(kind: &KindManifest, payload: Value) -> Option<Resource> {
    let probe = Resource::new("").with_raw(payload);
    let id = probe.field_str(&kind.id_field);
    if id.is_empty() {
        return None;
    }
    let tags = kind
        .tags_field
        .as_deref()
        .and_then(|field| locate_field(probe.raw(), field))
        .and_then(parse_tags);
    let name = kind
        .name_field
        .as_deref()
        .map(|field| probe.field_str(field))
        .filter(|name| !name.is_empty())
        .or_else(|| {
            let tag = kind.name_tag.as_deref()?;
            tags.as_ref()?.get(tag).filter(|v| !v.is_empty()).cloned()
        })
        .unwrap_or_else(|| id.clone());
    let arn = kind.arn_field.as_deref().map(|f| probe.field_str(f)).unwrap_or_default();

    let mut resource = Resource::new(id).with_name(name).with_arn(arn);
    if let Some(tags) = tags {
        resource = resource.with_tags(tags);
    }
    Some(resource.with_raw(probe.into_raw()))
}

/// Reads tags either from an object or from a list of `{ "Key": .., "Value": .. }` entries
fn parse_tags(value: &Value) -> Option<Tags> {
    match value {
        Value::Object(map) => Some(
            map.iter()
                .map(|(k, v)| (k.clone(), v.as_str().map(String::from).unwrap_or_else(|| v.to_string())))
                .collect(),
        ),
        Value::Array(entries) => Some(
            entries
                .iter()
                .filter_map(|entry| {
                    let key = locate_field(entry, "Key")?.as_str()?;
                    let value = locate_field(entry, "Value").and_then(Value::as_str).unwrap_or_default();
                    Some((key.to_owned(), value.to_owned()))
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Renders a field of a resource as declared on the manifest.
///
/// Besides payload fields, the resource's own attributes are available as `@id`, `@name`, `@arn` and `@tag:<key>`.
pub fn field_value(resource: &Resource, field: &str) -> String {
    match field {
        "@id" => resource.id().to_owned(),
        "@name" => resource.name().to_owned(),
        "@arn" => resource.arn().to_owned(),
        _ => match field.strip_prefix("@tag:") {
            Some(tag) => resource.tags().and_then(|t| t.get(tag)).cloned().unwrap_or_default(),
            None => resource.field_str(field),
        },
    }
}

/// Serves the resources of a kind from memory
pub struct FixtureFetcher {
    key: ResourceKey,
    items: Arc<Vec<Resource>>,
    paginated: bool,
    profile_field: Option<String>,
    region_field: Option<String>,
}

impl FixtureFetcher {
    pub fn new(kind: &KindManifest, items: Arc<Vec<Resource>>) -> Self {
        Self {
            key: kind.key(),
            items,
            paginated: kind.paginated,
            profile_field: kind.profile_field.clone(),
            region_field: kind.region_field.clone(),
        }
    }

    /// Resources belonging to the context, those without a profile or region belong to every context
    fn scoped(&self, ctx: &FetchContext) -> Vec<&Resource> {
        let belongs = |resource: &Resource, field: &Option<String>, expected: &str| match field {
            Some(field) => match resource.field(field) {
                FieldLookup::Value(value) => value == expected,
                FieldLookup::Missing | FieldLookup::Empty => true,
            },
            None => true,
        };
        self.items
            .iter()
            .filter(|r| belongs(r, &self.profile_field, &ctx.profile) && belongs(r, &self.region_field, &ctx.region))
            .collect()
    }
}

#[async_trait]
impl DataFetcher for FixtureFetcher {
    #[instrument(skip_all, fields(kind = %self.key, profile = %ctx.profile, region = %ctx.region))]
    async fn list(&self, ctx: &FetchContext) -> Result<Vec<Resource>> {
        ctx.ensure_active()?;
        let items = self.scoped(ctx).into_iter().cloned().collect::<Vec<_>>();
        tracing::debug!("Listed {} resources", items.len());
        Ok(items)
    }

    fn as_paginated(&self) -> Option<&dyn PaginatedFetcher> {
        if self.paginated { Some(self) } else { None }
    }
}

#[async_trait]
impl PaginatedFetcher for FixtureFetcher {
    #[instrument(skip_all, fields(kind = %self.key, profile = %ctx.profile, region = %ctx.region))]
    async fn list_page(&self, ctx: &FetchContext, page_size: usize, token: Option<&str>) -> Result<Page> {
        ctx.ensure_active()?;
        let offset = match token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| UserFacingError::FetchFailed(format!("invalid continuation token '{token}'")))?,
            None => 0,
        };
        let scoped = self.scoped(ctx);
        let end = offset.saturating_add(page_size.max(1)).min(scoped.len());
        let items = scoped
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|r| (*r).clone())
            .collect::<Vec<_>>();
        let next_token = (end < scoped.len()).then(|| end.to_string());
        tracing::debug!("Listed {} resources from offset {offset}", items.len());
        Ok(Page { items, next_token })
    }
}

/// Presents a kind as declared on its manifest
pub struct ManifestFormatter {
    kind: Arc<KindManifest>,
}

impl ManifestFormatter {
    pub fn new(kind: Arc<KindManifest>) -> Self {
        Self { kind }
    }
}

impl DisplayFormatter for ManifestFormatter {
    fn columns(&self) -> Vec<Column> {
        self.kind
            .columns
            .iter()
            .map(|column| {
                let field = column.field.clone();
                let format = column.format;
                Column::new(&column.name, column.width, move |r| {
                    format.render(&field_value(r, &field), Utc::now())
                })
            })
            .collect()
    }

    fn render_detail(&self, resource: &Resource) -> String {
        serde_json::to_string_pretty(resource.raw()).unwrap_or_else(|_| resource.raw().to_string())
    }

    fn render_summary(&self, resource: &Resource) -> Vec<SummaryField> {
        let mut fields = vec![
            SummaryField::new("ID", resource.id()),
            SummaryField::new("Name", resource.name()),
        ];
        if !resource.arn().is_empty() {
            fields.push(SummaryField::new("ARN", resource.arn()));
        }
        let now = Utc::now();
        fields.extend(
            self.kind
                .summary
                .iter()
                .map(|s| SummaryField::new(&s.label, s.format.render(&field_value(resource, &s.field), now))),
        );
        fields
    }

    fn filter_fields(&self) -> Option<Vec<String>> {
        self.kind.filter_fields.clone()
    }

    fn as_navigator(&self) -> Option<&dyn Navigator> {
        if self.kind.navigations.is_empty() { None } else { Some(self) }
    }

    fn metric(&self) -> Option<MetricSpec> {
        self.kind.metric_spec()
    }

    fn as_variable_provider(&self) -> Option<&dyn VariableProvider> {
        if self.kind.variables.is_empty() { None } else { Some(self) }
    }
}

impl Navigator for ManifestFormatter {
    fn navigations(&self, resource: &Resource) -> Vec<Navigation> {
        self.kind
            .navigations
            .iter()
            .filter_map(|nav| {
                let value = field_value(resource, &nav.value_field);
                if value.is_empty() {
                    return None;
                }
                Some(Navigation {
                    key: nav.key,
                    label: nav.label.clone(),
                    target: nav.target.clone(),
                    filter_field: nav.filter_field.clone(),
                    filter_value: value,
                })
            })
            .collect()
    }
}

impl VariableProvider for ManifestFormatter {
    fn variables(&self, resource: &Resource) -> BTreeMap<String, String> {
        self.kind
            .variables
            .iter()
            .map(|(name, field)| (name.clone(), field_value(resource, field)))
            .collect()
    }
}

/// Simulates provider operations, there's no real account behind the catalog
#[derive(Default)]
pub struct FixtureInvoker;

#[async_trait]
impl ApiInvoker for FixtureInvoker {
    #[instrument(skip_all, fields(kind = %key, profile = %ctx.profile, region = %ctx.region))]
    async fn invoke(
        &self,
        ctx: &FetchContext,
        key: &ResourceKey,
        operation: &str,
        resource: &Resource,
    ) -> Result<String> {
        ctx.ensure_active()?;
        tracing::info!("Invoked {operation} on {}", resource.id());
        Ok(format!("{operation} requested for {}", resource.name()))
    }
}
