//! Confirmation state machine for pending actions.
//!
//! ```text
//! None ──request(Simple)──▶ Simple ──accept──▶ None (run)
//!   │                        └──cancel──▶ None
//!   └──request(Typed)───▶ Typed ──submit(match)──▶ None (run)
//!                           ├──submit(mismatch)──▶ Typed (input kept)
//!                           └──cancel──▶ None (input cleared)
//! ```

use std::sync::Arc;

use super::{ActionDef, Confirmation};
use crate::model::{Resource, ResourceKey};

/// An action waiting to be run on a resource
#[derive(Clone, Debug)]
pub struct PendingAction {
    pub key: ResourceKey,
    pub action: ActionDef,
    pub resource: Arc<Resource>,
}

/// The confirmation state of a browsing surface
#[derive(Clone, Debug, Default)]
pub enum ConfirmState {
    #[default]
    None,
    /// Waiting for a yes/no answer
    Simple(PendingAction),
    /// Waiting for the user to type `token`
    Typed {
        pending: PendingAction,
        token: String,
        input: String,
    },
}

/// Returns the default confirmation token for a resource identifier: its last `len` characters, without leading
/// separators.
///
/// # Examples
///
/// ```rust
/// # use cloudscope::action::default_confirm_token;
/// assert_eq!(default_confirm_token("i-12345", 6), "12345");
/// assert_eq!(default_confirm_token("i-0abc12345", 6), "c12345");
/// assert_eq!(default_confirm_token("db", 6), "db");
/// ```
pub fn default_confirm_token(id: &str, len: usize) -> String {
    let count = id.chars().count();
    let suffix: String = id.chars().skip(count.saturating_sub(len)).collect();
    let trimmed = suffix.trim_start_matches(|c: char| !c.is_alphanumeric());
    if trimmed.is_empty() { suffix } else { trimmed.to_owned() }
}

impl ConfirmState {
    /// Requests the confirmation of an action.
    ///
    /// Typed confirmations use the token declared by the action, or the last `suffix_len` characters of the resource
    /// identifier if it declares none. Returns the pending action straight away if no confirmation is required,
    /// leaving the state untouched.
    pub fn request(&mut self, pending: PendingAction, suffix_len: usize) -> Option<PendingAction> {
        let token = pending.action.confirm_token.clone();
        self.request_with_token(pending, token, suffix_len)
    }

    /// Requests the confirmation of an action, with a token supplied by the caller for typed confirmations
    pub fn request_with_token(
        &mut self,
        pending: PendingAction,
        token: Option<String>,
        suffix_len: usize,
    ) -> Option<PendingAction> {
        match pending.action.confirm {
            Confirmation::None => Some(pending),
            Confirmation::Simple => {
                *self = ConfirmState::Simple(pending);
                None
            }
            Confirmation::Typed => {
                let token = token
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| default_confirm_token(pending.resource.id(), suffix_len));
                *self = ConfirmState::Typed {
                    pending,
                    token,
                    input: String::new(),
                };
                None
            }
        }
    }

    /// Whether a confirmation is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self, ConfirmState::None)
    }

    /// The pending action, if a confirmation is in progress
    pub fn pending(&self) -> Option<&PendingAction> {
        match self {
            ConfirmState::None => None,
            ConfirmState::Simple(pending) | ConfirmState::Typed { pending, .. } => Some(pending),
        }
    }

    /// Appends a char to the typed input
    pub fn push(&mut self, c: char) {
        if let ConfirmState::Typed { input, .. } = self {
            input.push(c);
        }
    }

    /// Removes the last char of the typed input
    pub fn pop(&mut self) {
        if let ConfirmState::Typed { input, .. } = self {
            input.pop();
        }
    }

    /// Accepts the confirmation.
    ///
    /// Simple confirmations are always accepted, typed ones only if the input equals the token. On a mismatch the
    /// state and input are kept so the user can fix a typo.
    pub fn submit(&mut self) -> Option<PendingAction> {
        match self {
            ConfirmState::None => None,
            ConfirmState::Simple(_) => match std::mem::take(self) {
                ConfirmState::Simple(pending) => Some(pending),
                _ => None,
            },
            ConfirmState::Typed { token, input, .. } => {
                if input != token {
                    tracing::debug!("Typed confirmation doesn't match");
                    return None;
                }
                match std::mem::take(self) {
                    ConfirmState::Typed { pending, .. } => Some(pending),
                    _ => None,
                }
            }
        }
    }

    /// Cancels any confirmation in progress, clearing the typed input
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending() {
            tracing::debug!("Cancelled confirmation of {}", pending.action.name);
        }
        *self = ConfirmState::None;
    }

    /// The prompt to display while a confirmation is in progress
    pub fn prompt(&self) -> Option<String> {
        match self {
            ConfirmState::None => None,
            ConfirmState::Simple(p) => Some(format!("Run '{}' on {}? [y/N]", p.action.name, p.resource.name())),
            ConfirmState::Typed { pending, token, input } => Some(format!(
                "Type '{token}' to confirm '{}' on {}: {input}",
                pending.action.name,
                pending.resource.name()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pending(id: &str, confirm: Confirmation) -> PendingAction {
        PendingAction {
            key: ResourceKey::new("ec2", "instances"),
            action: ActionDef::api("terminate", 'T', "TerminateInstances").with_confirm(confirm),
            resource: Resource::new(id).shared(),
        }
    }

    fn typed(state: &mut ConfirmState, text: &str) {
        text.chars().for_each(|c| state.push(c));
    }

    #[test]
    fn test_no_confirmation() {
        let mut state = ConfirmState::default();
        assert!(state.request(pending("i-1", Confirmation::None), 6).is_some());
        assert!(!state.is_active());
    }

    #[test]
    fn test_simple_confirmation() {
        let mut state = ConfirmState::default();
        assert!(state.request(pending("i-1", Confirmation::Simple), 6).is_none());
        assert!(state.is_active());
        assert_eq!(state.submit().map(|p| p.action.name), Some(String::from("terminate")));
        assert!(!state.is_active());
    }

    #[test]
    fn test_typed_confirmation_match() {
        let mut state = ConfirmState::default();
        assert!(state.request(pending("i-12345", Confirmation::Typed), 6).is_none());
        typed(&mut state, "12345");
        let accepted = state.submit();
        assert_eq!(accepted.map(|p| p.resource.id().to_owned()), Some(String::from("i-12345")));
        assert!(!state.is_active());
        assert!(matches!(state, ConfirmState::None));
    }

    #[test]
    fn test_typed_confirmation_mismatch_keeps_state() {
        let mut state = ConfirmState::default();
        state.request(pending("i-12345", Confirmation::Typed), 6);
        typed(&mut state, "1234");
        assert!(state.submit().is_none());
        let ConfirmState::Typed { token, input, .. } = &state else {
            panic!("expected typed confirmation");
        };
        assert_eq!(token, "12345");
        assert_eq!(input, "1234");

        // Fix the typo
        state.push('5');
        assert!(state.submit().is_some());
    }

    #[test]
    fn test_cancel_clears_input() {
        let mut state = ConfirmState::default();
        state.request(pending("i-12345", Confirmation::Typed), 6);
        typed(&mut state, "123");
        state.cancel();
        assert!(matches!(state, ConfirmState::None));
        assert!(state.submit().is_none());
        // A new request starts with an empty buffer
        state.request(pending("i-12345", Confirmation::Typed), 6);
        assert!(matches!(&state, ConfirmState::Typed { input, .. } if input.is_empty()));
    }

    #[test]
    fn test_typed_confirmation_declared_token() {
        let mut state = ConfirmState::default();
        let mut request = pending("i-12345", Confirmation::Typed);
        request.action = request.action.with_confirm_token("terminate");
        state.request(request, 6);
        assert!(matches!(&state, ConfirmState::Typed { token, .. } if token == "terminate"));
        typed(&mut state, "12345");
        assert!(state.submit().is_none());
        state.cancel();

        state.request_with_token(pending("i-12345", Confirmation::Typed), Some(String::from("prod-db")), 6);
        typed(&mut state, "prod-db");
        assert!(state.submit().is_some());

        // An empty token falls back to the identifier suffix
        state.request_with_token(pending("i-12345", Confirmation::Typed), Some(String::new()), 6);
        assert!(matches!(&state, ConfirmState::Typed { token, .. } if token == "12345"));
    }

    #[test]
    fn test_pop() {
        let mut state = ConfirmState::default();
        state.request(pending("i-12345", Confirmation::Typed), 6);
        typed(&mut state, "123x");
        state.pop();
        assert!(matches!(&state, ConfirmState::Typed { input, .. } if input == "123"));
    }
}
