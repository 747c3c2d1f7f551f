use std::{fmt, sync::Arc};

use serde_json::Value;

use crate::utils::Tags;

/// One instance of a cloud object, as returned by a data-fetcher.
///
/// Resources are immutable once built and shared through [`Arc`] between the raw list and the visible rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    id: String,
    name: String,
    arn: String,
    tags: Option<Tags>,
    raw: Value,
}

/// The outcome of looking up a field on the provider payload of a [`Resource`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldLookup {
    /// The field couldn't be located at all
    Missing,
    /// The field exists but holds no value (null or empty string)
    Empty,
    /// The field exists and has a value, rendered as a string
    Value(String),
}

impl Resource {
    /// Creates a new resource with the given identifier, using it as the name too
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            arn: String::new(),
            tags: None,
            raw: Value::Null,
        }
    }

    /// Sets the human label
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the global identifier
    pub fn with_arn(mut self, arn: impl Into<String>) -> Self {
        self.arn = arn.into();
        self
    }

    /// Sets the tags, an empty map is kept distinct from absent tags
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Sets the underlying provider payload
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// Wraps this resource in an [`Arc`]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    pub fn tags(&self) -> Option<&Tags> {
        self.tags.as_ref()
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Looks up a field on the provider payload, see [`locate_field`]
    pub fn field(&self, name: &str) -> FieldLookup {
        locate_field(&self.raw, name).map_or(FieldLookup::Missing, lookup_value)
    }

    /// Renders a payload field as a display string, or an empty string if missing
    pub fn field_str(&self, name: &str) -> String {
        match self.field(name) {
            FieldLookup::Value(v) => v,
            FieldLookup::Missing | FieldLookup::Empty => String::new(),
        }
    }
}

/// Locates a field on a provider payload.
///
/// The name is tried as an exact top-level key first, then case-insensitively, and finally as a dotted path
/// (`State.Name`) where each segment is matched case-insensitively.
pub fn locate_field<'v>(raw: &'v Value, name: &str) -> Option<&'v Value> {
    let Value::Object(map) = raw else {
        return None;
    };
    if let Some(value) = map.get(name) {
        return Some(value);
    }
    if let Some((_, value)) = map.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        return Some(value);
    }
    if !name.contains('.') {
        return None;
    }
    name.split('.').try_fold(raw, |current, segment| match current {
        Value::Object(map) => map.iter().find(|(k, _)| k.eq_ignore_ascii_case(segment)).map(|(_, v)| v),
        _ => None,
    })
}

fn lookup_value(value: &Value) -> FieldLookup {
    match value {
        Value::Null => FieldLookup::Empty,
        Value::String(s) if s.is_empty() => FieldLookup::Empty,
        Value::String(s) => FieldLookup::Value(s.clone()),
        Value::Bool(b) => FieldLookup::Value(b.to_string()),
        Value::Number(n) => FieldLookup::Value(n.to_string()),
        Value::Array(a) if a.is_empty() => FieldLookup::Empty,
        other => FieldLookup::Value(other.to_string()),
    }
}

/// A display-time projection of a resource into a single cell
#[derive(Clone)]
pub struct Column {
    /// Header label
    pub name: String,
    /// Target width, in terminal columns
    pub width: u16,
    render: Arc<dyn Fn(&Resource) -> String + Send + Sync>,
}

impl Column {
    /// Creates a new column with the given render function
    pub fn new(name: impl Into<String>, width: u16, render: impl Fn(&Resource) -> String + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            width,
            render: Arc::new(render),
        }
    }

    /// Renders the value of this column for the given resource
    pub fn value(&self, resource: &Resource) -> String {
        (self.render)(resource)
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

/// A labeled value shown on the summary of a resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryField {
    pub label: String,
    pub value: String,
}

impl SummaryField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}
