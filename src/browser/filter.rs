use std::sync::Arc;

use crate::{
    model::{Column, FieldLookup, Resource},
    utils::{TagExpr, fuzzy_match, last_path_segment, looks_like_global_id},
};

/// Exact field match, set when navigating from another kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Checks whether the resource passes this filter.
    ///
    /// The identifier and name are compared first, then the last path segment of the value when it looks like a
    /// global identifier. Otherwise the payload field is looked up: a located field must equal the value, while a
    /// field that can't be located lets the resource through, as the fetcher is assumed to have filtered it already.
    ///
    /// When the kind declares its filterable fields, any other field is considered not located.
    pub fn matches(&self, resource: &Resource, declared_fields: Option<&[String]>) -> bool {
        let value = self.value.as_str();
        if resource.id() == value || resource.name() == value {
            return true;
        }
        if looks_like_global_id(value) {
            let segment = last_path_segment(value);
            if resource.id() == segment || resource.name() == segment {
                return true;
            }
        }
        let declared = declared_fields.is_none_or(|fields| fields.iter().any(|f| f.eq_ignore_ascii_case(&self.field)));
        if !declared {
            return true;
        }
        match resource.field(&self.field) {
            FieldLookup::Missing => true,
            FieldLookup::Empty => false,
            FieldLookup::Value(v) => v == value,
        }
    }
}

/// The three independent filters of a browsing surface
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Set by inbound navigation, cleared by the user
    pub field: Option<FieldFilter>,
    pub tag: Option<TagExpr>,
    /// Free-text fuzzy pattern, empty means no filter
    pub text: String,
}

impl FilterState {
    /// Whether no filter is active
    pub fn is_empty(&self) -> bool {
        self.field.is_none() && self.tag.is_none() && self.text.is_empty()
    }

    /// Whether the free-text filter is active
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Checks whether the pattern matches the resource identifier, name or any rendered column value.
///
/// An empty pattern is no filter at all.
pub fn matches_text(resource: &Resource, columns: &[Column], pattern: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    fuzzy_match(resource.id(), pattern)
        || fuzzy_match(resource.name(), pattern)
        || columns.iter().any(|c| fuzzy_match(&c.value(resource), pattern))
}

/// Applies the filters in order (field, tag, then text), returning the indices of the matching resources.
///
/// The original order is always preserved.
pub fn apply(
    resources: &[Arc<Resource>],
    filter: &FilterState,
    columns: &[Column],
    declared_fields: Option<&[String]>,
) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..resources.len()).collect();
    if let Some(field) = &filter.field {
        indices.retain(|&ix| field.matches(&resources[ix], declared_fields));
    }
    if let Some(tag) = &filter.tag {
        indices.retain(|&ix| tag.matches(resources[ix].tags()));
    }
    if filter.has_text() {
        indices.retain(|&ix| matches_text(&resources[ix], columns, &filter.text));
    }
    indices
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::utils::Tags;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn resources() -> Vec<Arc<Resource>> {
        vec![
            Resource::new("i-001")
                .with_name("web-1")
                .with_tags(tags(&[("env", "prod"), ("team", "Platform-Core")]))
                .with_raw(json!({ "VpcId": "vpc-1", "State": "running" }))
                .shared(),
            Resource::new("i-002")
                .with_name("AgentCoreStackdev")
                .with_tags(Tags::new())
                .with_raw(json!({ "VpcId": "vpc-2", "State": "stopped" }))
                .shared(),
            Resource::new("i-003")
                .with_name("batch")
                .with_raw(json!({ "State": "running", "SubnetId": "" }))
                .shared(),
        ]
    }

    fn columns() -> Vec<Column> {
        vec![Column::new("STATE", 10, |r| r.field_str("State"))]
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let res = resources();
        assert_eq!(apply(&res, &FilterState::default(), &columns(), None), vec![0, 1, 2]);
        assert_eq!(apply(&[], &FilterState::default(), &columns(), None), Vec::<usize>::new());
    }

    #[test]
    fn test_field_filter_by_id_and_name() {
        let res = resources();
        let filter = FieldFilter::new("InstanceId", "web-1");
        assert!(filter.matches(&res[0], None));
        // The field isn't on the payload, so the other resources are assumed to be filtered by the fetcher
        assert!(filter.matches(&res[1], None));
    }

    #[test]
    fn test_field_filter_by_payload() {
        let res = resources();
        let filter = FilterState {
            field: Some(FieldFilter::new("VpcId", "vpc-1")),
            ..Default::default()
        };
        // i-003 has no VpcId at all, so it passes through
        assert_eq!(apply(&res, &filter, &columns(), None), vec![0, 2]);
    }

    #[test]
    fn test_field_filter_empty_field_doesnt_match() {
        let res = resources();
        let filter = FieldFilter::new("SubnetId", "subnet-1");
        assert!(!filter.matches(&res[2], None));
    }

    #[test]
    fn test_field_filter_global_identifier() {
        let res = resources();
        let filter = FieldFilter::new("VpcId", "arn:aws:ec2:eu-west-1:123456789012:instance/i-002");
        assert!(filter.matches(&res[1], None));
        assert!(!filter.matches(&res[0], None));
    }

    #[test]
    fn test_field_filter_declared_fields() {
        let res = resources();
        let declared = vec![String::from("SubnetId")];
        // VpcId is not declared, so it's considered not located
        let filter = FieldFilter::new("VpcId", "vpc-9");
        assert!(filter.matches(&res[0], Some(&declared)));
        assert!(!filter.matches(&res[0], None));
    }

    #[test]
    fn test_tag_filter() {
        let res = resources();
        let filter = FilterState {
            tag: TagExpr::parse("env=prod"),
            ..Default::default()
        };
        assert_eq!(apply(&res, &filter, &columns(), None), vec![0]);
        let filter = FilterState {
            tag: TagExpr::parse("team~core"),
            ..Default::default()
        };
        assert_eq!(apply(&res, &filter, &columns(), None), vec![0]);
    }

    #[test]
    fn test_text_filter() {
        let res = resources();
        let filter = FilterState {
            text: String::from("acd"),
            ..Default::default()
        };
        assert_eq!(apply(&res, &filter, &columns(), None), vec![1]);
        // Matches on the rendered columns too
        let filter = FilterState {
            text: String::from("RUN"),
            ..Default::default()
        };
        assert_eq!(apply(&res, &filter, &columns(), None), vec![0, 2]);
    }

    #[test]
    fn test_filters_compose() {
        let res = resources();
        let filter = FilterState {
            field: Some(FieldFilter::new("State", "running")),
            tag: TagExpr::parse("env"),
            text: String::from("web"),
        };
        assert_eq!(apply(&res, &filter, &columns(), None), vec![0]);
    }
}
