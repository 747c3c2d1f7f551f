use std::{
    fmt,
    process::Stdio,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use color_eyre::eyre::Context;
use tokio::process::Command;
use tracing::instrument;

use super::{ActionDef, ActionKind, ActionResult, FollowUp, policy, substitute};
use crate::{
    errors::{Result, UserFacingError},
    model::{FetchContext, Navigation, Resource, ResourceKey, VariableProvider},
};

/// Calls provider API operations on behalf of actions
#[async_trait]
pub trait ApiInvoker: Send + Sync {
    /// Invokes the operation on the resource, returning a human message on success
    async fn invoke(&self, ctx: &FetchContext, key: &ResourceKey, operation: &str, resource: &Resource)
    -> Result<String>;
}

/// An external process to be run by the host, once it has suspended its own rendering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalCommand {
    /// Name of the action that built this command
    pub action: String,
    pub program: String,
    pub args: Vec<String>,
    /// Event to emit if the process succeeds
    pub follow_up: Option<FollowUp>,
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl ExternalCommand {
    /// Spawns the process directly (never through a shell), inheriting stdio, and waits for it to finish
    #[instrument(skip_all, fields(action = %self.action))]
    pub async fn run(&self) -> ActionResult {
        tracing::info!("Running: {self}");
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .wrap_err_with(|| format!("Couldn't launch {}", self.program));
        match status {
            Ok(status) if status.success() => {
                ActionResult::success(format!("'{}' completed", self.action)).with_follow_up(self.follow_up.clone())
            }
            Ok(status) => {
                let err = UserFacingError::ProcessFailed(format!("{} exited with {status}", self.program));
                ActionResult::failure(&self.action, &err.into())
            }
            Err(report) => {
                tracing::warn!("{report:?}");
                let err = UserFacingError::ProcessFailed(format!("{report}"));
                ActionResult::failure(&self.action, &err.into())
            }
        }
    }
}

/// What the host must do after an action has been accepted
#[derive(Debug)]
pub enum ActionOutcome {
    /// The action completed, the result must be surfaced
    Done(ActionResult),
    /// An external process must be run with the TUI suspended
    Suspend(ExternalCommand),
}

/// Runs actions through validation, the read-only policy and variable substitution
pub struct ActionExecutor {
    invoker: Arc<dyn ApiInvoker>,
    read_only: AtomicBool,
}

impl ActionExecutor {
    pub fn new(invoker: Arc<dyn ApiInvoker>, read_only: bool) -> Self {
        Self {
            invoker,
            read_only: AtomicBool::new(read_only),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::Relaxed)
    }

    /// Toggles the read-only mode, returning the new value
    pub fn toggle_read_only(&self) -> bool {
        let previous = self.read_only.fetch_xor(true, Ordering::Relaxed);
        tracing::info!("Read-only mode is now {}", if previous { "off" } else { "on" });
        !previous
    }

    /// Executes an action on a resource.
    ///
    /// The checks run in a fixed order: configuration, applicability, read-only policy and variable substitution. No
    /// provider call is issued, nor process built, unless every check passes.
    #[instrument(skip_all, fields(action = %action.name, resource = %resource.id()))]
    pub async fn execute(
        &self,
        key: &ResourceKey,
        action: &ActionDef,
        resource: &Resource,
        ctx: &FetchContext,
        provider: Option<&dyn VariableProvider>,
    ) -> Result<ActionOutcome> {
        policy::validate(action)?;
        if !action.applies_to(resource) {
            return Err(UserFacingError::ActionNotApplicable {
                action: action.name.clone(),
            }
            .into());
        }
        policy::check_read_only(action, self.is_read_only())?;

        let vars = substitute::resource_variables(resource, ctx, provider);
        match &action.kind {
            ActionKind::Navigate {
                target,
                filter_field,
                filter_value,
            } => {
                let value = substitute::substitute_value(&action.name, filter_value, &vars)?;
                let navigation = Navigation {
                    key: action.shortcut,
                    label: action.description.clone(),
                    target: target.clone(),
                    filter_field: filter_field.clone(),
                    filter_value: value,
                };
                Ok(ActionOutcome::Done(
                    ActionResult::success(format!("Opening {target}")).with_follow_up(Some(FollowUp::Navigate(navigation))),
                ))
            }
            ActionKind::Api { operation } => {
                let operation = operation.as_deref().unwrap_or_default();
                ctx.ensure_active()?;
                tracing::info!("Invoking {operation} on {key}");
                let message = self.invoker.invoke(ctx, key, operation, resource).await?;
                Ok(ActionOutcome::Done(
                    ActionResult::success(message).with_follow_up(action.follow_up.clone()),
                ))
            }
            ActionKind::Exec { command } => {
                let mut args = substitute::substitute_args(&action.name, command, &vars)?.into_iter();
                let program = args.next().ok_or_else(|| UserFacingError::ActionMisconfigured {
                    action: action.name.clone(),
                    reason: String::from("external actions require a command"),
                })?;
                Ok(ActionOutcome::Suspend(ExternalCommand {
                    action: action.name.clone(),
                    program,
                    args: args.collect(),
                    follow_up: action.follow_up.clone(),
                }))
            }
        }
    }
}
