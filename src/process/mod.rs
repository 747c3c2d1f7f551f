use color_eyre::Result;
use tokio_util::sync::CancellationToken;

use crate::{component::Component, config::Config, service::CloudScopeService};

pub mod browse;
pub mod kinds;
pub mod list;

/// Represents the final outcome of a [`Process`] execution
#[derive(Debug, Default)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct ProcessOutput {
    /// Whether the process was successful, affecting the exit code
    pub success: bool,
    /// Text to be printed to stdout
    pub stdout: Option<String>,
    /// Text to be printed to stderr
    pub stderr: Option<String>,
}

impl ProcessOutput {
    /// Creates a successful output, with no content
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Creates a failed output, with no content
    pub fn fail() -> Self {
        Self::default()
    }

    /// Sets the text to print on stdout
    pub fn stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }

    /// Sets the text to print on stderr
    pub fn stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }
}

/// Trait for non-interactive processes
pub trait Process {
    /// Executes the process non-interactively and returns the output
    async fn execute(
        self,
        config: Config,
        service: CloudScopeService,
        cancellation_token: CancellationToken,
    ) -> Result<ProcessOutput>;
}

/// Trait for processes rendered on the TUI
pub trait InteractiveProcess {
    /// Converts the process into the first surface to display
    fn into_component(
        self,
        config: Config,
        service: CloudScopeService,
        cancellation_token: CancellationToken,
    ) -> Result<Box<dyn Component>>;
}
