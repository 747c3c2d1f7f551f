use std::collections::BTreeMap;

use color_eyre::{Result, eyre::eyre};
use serde::Deserialize;

use super::CellFormat;
use crate::{
    action::{ActionDef, ActionKind, Confirmation, FollowUp},
    model::{MetricSpec, ResourceKey},
};

/// A catalog of resource kinds backed by JSON fixtures
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub kinds: Vec<KindManifest>,
}

/// Declaration of a single resource kind
#[derive(Clone, Debug, Deserialize)]
pub struct KindManifest {
    pub domain: String,
    pub kind: String,
    /// Short names resolving to this kind on the command line
    #[serde(default)]
    pub aliases: Vec<String>,
    /// JSON file (relative to the manifest) holding an array of resource payloads
    pub data: String,
    /// Whether the kind is fetched page by page
    #[serde(default)]
    pub paginated: bool,
    /// Payload field holding the resource identifier
    pub id_field: String,
    /// Payload field holding the resource name, defaults to the identifier
    pub name_field: Option<String>,
    /// Tag whose value is used as the name, when `name_field` is not set or empty
    pub name_tag: Option<String>,
    /// Payload field holding the global identifier
    pub arn_field: Option<String>,
    /// Payload field holding the tags, either a map or a list of `{ Key, Value }` objects
    pub tags_field: Option<String>,
    /// Payload fields holding the profile and region a resource belongs to, resources without them belong to all
    pub profile_field: Option<String>,
    pub region_field: Option<String>,
    /// Explicit list of filterable payload fields
    pub filter_fields: Option<Vec<String>>,
    #[serde(default)]
    pub columns: Vec<ColumnManifest>,
    /// Fields displayed on the summary of the detail view
    #[serde(default)]
    pub summary: Vec<SummaryManifest>,
    pub metric: Option<MetricManifest>,
    #[serde(default)]
    pub navigations: Vec<NavigationManifest>,
    #[serde(default)]
    pub actions: Vec<ActionManifest>,
    /// Extra substitution variables for command templates, mapping the variable name to a payload field
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ColumnManifest {
    pub name: String,
    /// Payload field, or one of the resource attributes (`@id`, `@name`, `@arn`, `@tag:<key>`)
    pub field: String,
    #[serde(default = "default_width")]
    pub width: u16,
    #[serde(default)]
    pub format: CellFormat,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SummaryManifest {
    pub label: String,
    pub field: String,
    #[serde(default)]
    pub format: CellFormat,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetricManifest {
    pub label: String,
    pub field: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_width")]
    pub width: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NavigationManifest {
    pub key: char,
    pub label: String,
    pub target: ResourceKey,
    /// Field of the target kind to filter by
    pub filter_field: String,
    /// Field of the current resource holding the filter value
    pub value_field: String,
}

/// Type of a declared action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Exec,
    Api,
    Navigate,
}

/// Follow-up of a declared action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpManifest {
    Refresh,
    Back,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ActionManifest {
    pub name: String,
    pub key: char,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub description: Option<String>,
    /// Command template, for `exec` actions
    pub command: Option<String>,
    /// Provider operation, for `api` actions
    pub operation: Option<String>,
    /// Target kind, for `navigate` actions
    pub target: Option<ResourceKey>,
    pub filter_field: Option<String>,
    pub filter_value: Option<String>,
    #[serde(default)]
    pub confirm: Confirmation,
    /// Token to type on typed confirmations, defaults to the tail of the resource identifier
    pub confirm_token: Option<String>,
    pub follow_up: Option<FollowUpManifest>,
    /// Restricts the action to resources whose `when_field` equals any of `when_in`
    pub when_field: Option<String>,
    #[serde(default)]
    pub when_in: Vec<String>,
}

fn default_width() -> u16 {
    16
}

impl Manifest {
    /// Parses a manifest from its TOML representation
    pub fn parse(raw: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(raw)?;
        for kind in &manifest.kinds {
            if kind.columns.is_empty() {
                return Err(eyre!("Kind {}/{} must declare at least one column", kind.domain, kind.kind));
            }
        }
        Ok(manifest)
    }
}

impl KindManifest {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.domain, &self.kind)
    }

    pub fn metric_spec(&self) -> Option<MetricSpec> {
        self.metric.as_ref().map(|m| MetricSpec {
            label: m.label.clone(),
            field: m.field.clone(),
            unit: m.unit.clone(),
            width: m.width,
        })
    }
}

impl ActionManifest {
    /// Builds the action definition.
    ///
    /// Missing fields required by the action type are kept as empty values, so the action is reported as
    /// misconfigured when triggered rather than silently dropped.
    pub fn to_action(&self) -> ActionDef {
        let kind = match self.action_type {
            ActionType::Exec => ActionKind::Exec {
                command: self.command.clone().unwrap_or_default(),
            },
            ActionType::Api => ActionKind::Api {
                operation: self.operation.clone(),
            },
            ActionType::Navigate => match &self.target {
                Some(target) => ActionKind::Navigate {
                    target: target.clone(),
                    filter_field: self.filter_field.clone().unwrap_or_default(),
                    filter_value: self.filter_value.clone().unwrap_or_else(|| String::from("${ID}")),
                },
                None => ActionKind::Api { operation: None },
            },
        };
        let mut action = ActionDef::new(&self.name, self.key, kind).with_confirm(self.confirm);
        if let Some(description) = &self.description {
            action = action.with_description(description);
        }
        if let Some(token) = &self.confirm_token {
            action = action.with_confirm_token(token);
        }
        match self.follow_up {
            Some(FollowUpManifest::Refresh) => action = action.with_follow_up(FollowUp::Refresh),
            Some(FollowUpManifest::Back) => action = action.with_follow_up(FollowUp::Back),
            None => (),
        }
        if let Some(field) = &self.when_field {
            action = action.when_field_in(field, self.when_in.clone());
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::Resource;

    const MANIFEST: &str = r#"
        [[kinds]]
        domain = "ec2"
        kind = "instances"
        aliases = ["vm"]
        data = "instances.json"
        paginated = true
        id_field = "InstanceId"
        name_tag = "Name"

        [[kinds.columns]]
        name = "STATE"
        field = "State.Name"
        width = 10

        [[kinds.columns]]
        name = "LAUNCHED"
        field = "LaunchTime"
        format = "age"

        [[kinds.actions]]
        name = "terminate"
        key = "T"
        type = "api"
        operation = "TerminateInstances"
        confirm = "typed"
        confirm_token = "terminate"
        follow_up = "refresh"
        when_field = "State.Name"
        when_in = ["running", "stopped"]

        [[kinds.actions]]
        name = "broken"
        key = "b"
        type = "api"
    "#;

    #[test]
    fn test_parse() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.kinds.len(), 1);
        let kind = &manifest.kinds[0];
        assert_eq!(kind.key(), ResourceKey::new("ec2", "instances"));
        assert!(kind.paginated);
        assert_eq!(kind.columns[0].width, 10);
        assert_eq!(kind.columns[1].width, 16);
        assert_eq!(kind.columns[1].format, CellFormat::Age);
        assert_eq!(kind.metric_spec(), None);
    }

    #[test]
    fn test_action_conversion() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let terminate = manifest.kinds[0].actions[0].to_action();
        assert_eq!(terminate.confirm, Confirmation::Typed);
        assert_eq!(terminate.confirm_token.as_deref(), Some("terminate"));
        assert_eq!(terminate.follow_up, Some(FollowUp::Refresh));
        assert_eq!(
            terminate.kind,
            ActionKind::Api {
                operation: Some(String::from("TerminateInstances"))
            }
        );
        let running = Resource::new("i-1").with_raw(json!({ "State": { "Name": "running" } }));
        let pending = Resource::new("i-2").with_raw(json!({ "State": { "Name": "pending" } }));
        assert!(terminate.applies_to(&running));
        assert!(!terminate.applies_to(&pending));

        // Kept, to be reported when triggered
        let broken = manifest.kinds[0].actions[1].to_action();
        assert_eq!(broken.kind, ActionKind::Api { operation: None });
    }

    #[test]
    fn test_kind_without_columns() {
        let res = Manifest::parse(
            r#"
            [[kinds]]
            domain = "s3"
            kind = "buckets"
            data = "buckets.json"
            id_field = "Name"
            "#,
        );
        assert!(res.is_err());
    }
}
