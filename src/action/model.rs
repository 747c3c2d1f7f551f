use std::{fmt, sync::Arc};

use serde::Deserialize;

use crate::{
    errors::AppError,
    model::{Navigation, Resource, ResourceKey},
};

/// What an action does when executed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionKind {
    /// Runs an external process, built from a command template.
    ///
    /// The host suspends its own rendering while the process runs, since it may be interactive.
    Exec { command: String },
    /// Calls a provider API operation
    Api { operation: Option<String> },
    /// Opens a browser for another kind, filtered by a field of the selected resource
    Navigate {
        target: ResourceKey,
        filter_field: String,
        /// Template for the filter value, like `${ID}`
        filter_value: String,
    },
}

impl ActionKind {
    /// Whether this action may change the state of the selected resource or its account
    pub fn is_mutating(&self) -> bool {
        !matches!(self, ActionKind::Navigate { .. })
    }
}

/// The confirmation required before running an action
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Confirmation {
    /// Runs right away
    #[default]
    None,
    /// A yes/no prompt
    Simple,
    /// The user must type a token, derived from the resource identifier
    Typed,
}

/// Event emitted after an action completes successfully
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FollowUp {
    /// Re-fetch the current kind
    Refresh,
    /// Close the current surface
    Back,
    /// Open a new surface
    Navigate(Navigation),
}

/// Restricts an action to resources in certain states
pub type Applicability = Arc<dyn Fn(&Resource) -> bool + Send + Sync>;

/// Declarative descriptor of an operation available for a kind
#[derive(Clone)]
pub struct ActionDef {
    /// Unique name within the kind, also used by the read-only allow-lists
    pub name: String,
    /// Key that triggers the action on the browser
    pub shortcut: char,
    pub kind: ActionKind,
    pub confirm: Confirmation,
    /// Token to type on typed confirmations, instead of the tail of the resource identifier
    pub confirm_token: Option<String>,
    /// Short description, for the help line
    pub description: String,
    /// Event to emit after success
    pub follow_up: Option<FollowUp>,
    applies_to: Option<Applicability>,
}

impl ActionDef {
    pub fn new(name: impl Into<String>, shortcut: char, kind: ActionKind) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            shortcut,
            kind,
            confirm: Confirmation::None,
            confirm_token: None,
            follow_up: None,
            applies_to: None,
        }
    }

    pub fn exec(name: impl Into<String>, shortcut: char, command: impl Into<String>) -> Self {
        Self::new(name, shortcut, ActionKind::Exec { command: command.into() })
    }

    pub fn api(name: impl Into<String>, shortcut: char, operation: impl Into<String>) -> Self {
        Self::new(
            name,
            shortcut,
            ActionKind::Api {
                operation: Some(operation.into()),
            },
        )
    }

    pub fn with_confirm(mut self, confirm: Confirmation) -> Self {
        self.confirm = confirm;
        self
    }

    /// Sets the token to type on typed confirmations, an empty token keeps the default one
    pub fn with_confirm_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.confirm_token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = Some(follow_up);
        self
    }

    /// Restricts the action to resources matching the predicate
    pub fn when(mut self, predicate: impl Fn(&Resource) -> bool + Send + Sync + 'static) -> Self {
        self.applies_to = Some(Arc::new(predicate));
        self
    }

    /// Restricts the action to resources whose payload `field` equals any of the values, ignoring case
    pub fn when_field_in(self, field: impl Into<String>, values: Vec<String>) -> Self {
        let field = field.into();
        self.when(move |r| {
            let current = r.field_str(&field);
            values.iter().any(|v| v.eq_ignore_ascii_case(&current))
        })
    }

    /// Checks whether this action can be applied to the given resource
    pub fn applies_to(&self, resource: &Resource) -> bool {
        self.applies_to.as_ref().is_none_or(|p| p(resource))
    }
}

impl fmt::Debug for ActionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDef")
            .field("name", &self.name)
            .field("shortcut", &self.shortcut)
            .field("kind", &self.kind)
            .field("confirm", &self.confirm)
            .field("confirm_token", &self.confirm_token)
            .field("follow_up", &self.follow_up)
            .field("conditional", &self.applies_to.is_some())
            .finish()
    }
}

/// The result of running an action, always surfaced to the invoking surface
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    /// Human message
    pub message: String,
    /// Error description, when failed
    pub error: Option<String>,
    pub follow_up: Option<FollowUp>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            follow_up: None,
        }
    }

    pub fn failure(action: &str, err: &AppError) -> Self {
        Self {
            success: false,
            message: format!("Action '{action}' failed"),
            error: Some(err.to_status_line()),
            follow_up: None,
        }
    }

    pub fn with_follow_up(mut self, follow_up: Option<FollowUp>) -> Self {
        self.follow_up = follow_up;
        self
    }

    /// The line to display on the status bar
    pub fn status_line(&self) -> String {
        match &self.error {
            Some(err) => err.clone(),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::errors::UserFacingError;

    #[test]
    fn test_applicability() {
        let action = ActionDef::api("start", 's', "StartInstances")
            .when_field_in("State.Name", vec![String::from("stopped")]);
        let stopped = Resource::new("i-1").with_raw(json!({ "State": { "Name": "Stopped" } }));
        let running = Resource::new("i-2").with_raw(json!({ "State": { "Name": "running" } }));
        assert!(action.applies_to(&stopped));
        assert!(!action.applies_to(&running));
        assert!(ActionDef::exec("ssh", 'x', "ssh ${ID}").applies_to(&running));
    }

    #[test]
    fn test_failure_result() {
        let err = AppError::from(UserFacingError::ReadOnlyDenied {
            action: String::from("terminate"),
        });
        let res = ActionResult::failure("terminate", &err);
        assert!(!res.success);
        assert_eq!(
            res.status_line(),
            "Action 'terminate' is blocked by read-only mode, use :readonly to toggle it"
        );
    }
}
