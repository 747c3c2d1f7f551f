use std::{
    fmt,
    panic::{self, UnwindSafe},
    path::PathBuf,
    process,
};

use color_eyre::{Report, Section, config::HookBuilder, owo_colors::style};
use futures_util::FutureExt;
use tokio::sync::mpsc;

/// Initializes error and panics handling
pub async fn init<F>(log_path: Option<PathBuf>, fut: F) -> color_eyre::Result<()>
where
    F: Future<Output = color_eyre::Result<()>> + UnwindSafe,
{
    tracing::trace!("Initializing error handlers");
    let panic_section = if let Some(log_path) = log_path {
        format!(
            "This is a bug. Consider reporting it along with the logs found at {}",
            log_path.display()
        )
    } else {
        String::from(
            "This is a bug. Logs were not generated, consider enabling them on the config or running with \
             CLOUDSCOPE_LOG=debug.",
        )
    };
    let (panic_hook, eyre_hook) = HookBuilder::default()
        .panic_section(panic_section.clone())
        .display_env_section(false)
        .display_location_section(true)
        .capture_span_trace_by_default(true)
        .into_hooks();

    let (panic_tx, mut panic_rx) = mpsc::channel(1);

    eyre_hook.install()?;
    panic::set_hook(Box::new(move |panic_info| {
        // The terminal might still be in raw mode here, the report is printed once the main future is dropped
        let panic_report = panic_hook.panic_report(panic_info).to_string();
        tracing::error!("Error: {}", strip_ansi_escapes::strip_str(&panic_report));
        if panic_tx.try_send(panic_report).is_err() {
            tracing::error!("Error sending panic report");
            process::exit(2);
        }
    }));

    tokio::select! {
        biased;
        panic_report = panic_rx.recv().fuse() => {
            match panic_report {
                Some(report) => eprintln!("{report}"),
                None => {
                    eprintln!(
                        "{}\n\n{panic_section}",
                        style().bright_red().style("A panic occurred, but the detailed report could not be captured.")
                    );
                    tracing::error!("A panic occurred, but the detailed report could not be captured.");
                }
            }
            process::exit(1);
        }
        res = Box::pin(fut).catch_unwind() => {
            match res {
                Ok(r) => r
                    .with_section(move || panic_section)
                    .inspect_err(|err| tracing::error!("Error: {}", strip_ansi_escapes::strip_str(format!("{err:?}")))),
                Err(err) => {
                    if let Ok(report) = panic_rx.try_recv() {
                        eprintln!("{report}");
                    } else if let Some(err) = err.downcast_ref::<&str>() {
                        print_panic_msg(err, panic_section);
                    } else if let Some(err) = err.downcast_ref::<String>() {
                        print_panic_msg(err, panic_section);
                    } else {
                        eprintln!(
                            "{}\n\n{panic_section}",
                            style().bright_red().style("An unexpected panic happened")
                        );
                        tracing::error!("An unexpected panic happened");
                    }
                    process::exit(1);
                }
            }
        }
    }
}

fn print_panic_msg(err: impl AsRef<str>, panic_section: String) {
    let err = err.as_ref();
    eprintln!(
        "{}\nMessage: {}\n\n{panic_section}",
        style().bright_red().style("The application panicked (crashed)."),
        style().blue().style(err)
    );
    tracing::error!("Panic: {err}");
}

/// Result alias for operations that can fail with an [`AppError`]
pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// Top-level error type for the application.
///
/// User-facing errors are meant to be rendered inline on the surface that triggered the operation, while unexpected
/// errors bubble up as a [`Report`].
#[derive(Debug)]
pub enum AppError {
    /// An error the user can understand and act upon
    UserFacing(UserFacingError),
    /// An unexpected error occurred
    Unexpected(Report),
}

/// Errors rendered to the user, without aborting the surface that triggered them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFacingError {
    /// The requested domain/kind pair is not registered
    ResourceNotFound(String),
    /// The data-fetcher failed to retrieve resources
    FetchFailed(String),
    /// The action is registered with an invalid configuration
    ActionMisconfigured { action: String, reason: String },
    /// The action was blocked by the read-only policy
    ReadOnlyDenied { action: String },
    /// A value to be substituted in a command contains shell metacharacters
    UnsafeValue { placeholder: String },
    /// The action can't be applied to the selected resource
    ActionNotApplicable { action: String },
    /// The column referenced by a command doesn't exist
    UnknownColumn(String),
    /// The command typed in the browser is not valid
    InvalidCommand(String),
    /// The operation was cancelled before completing
    Cancelled,
    /// An external process couldn't be launched or failed
    ProcessFailed(String),
}

impl fmt::Display for UserFacingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserFacingError::ResourceNotFound(what) => write!(f, "Unknown resource type: {what}"),
            UserFacingError::FetchFailed(msg) => write!(f, "Couldn't fetch resources: {msg}"),
            UserFacingError::ActionMisconfigured { action, reason } => {
                write!(f, "Action '{action}' is misconfigured: {reason}")
            }
            UserFacingError::ReadOnlyDenied { action } => {
                write!(f, "Action '{action}' is blocked by read-only mode, use :readonly to toggle it")
            }
            UserFacingError::UnsafeValue { placeholder } => {
                write!(f, "Refusing to run: the value for ${{{placeholder}}} contains shell metacharacters")
            }
            UserFacingError::ActionNotApplicable { action } => {
                write!(f, "Action '{action}' is not available for the selected resource")
            }
            UserFacingError::UnknownColumn(col) => write!(f, "No column matches '{col}'"),
            UserFacingError::InvalidCommand(msg) => write!(f, "Invalid command: {msg}"),
            UserFacingError::Cancelled => write!(f, "Operation cancelled"),
            UserFacingError::ProcessFailed(msg) => write!(f, "Process failed: {msg}"),
        }
    }
}

impl AppError {
    /// Converts this error into a [`Report`]
    pub fn into_report(self) -> Report {
        match self {
            AppError::UserFacing(err) => Report::msg(err.to_string()),
            AppError::Unexpected(report) => report,
        }
    }

    /// Renders the error as a single line, suitable for the status bar of a surface
    pub fn to_status_line(&self) -> String {
        match self {
            AppError::UserFacing(err) => err.to_string(),
            AppError::Unexpected(report) => format!("Unexpected error: {report}"),
        }
    }
}

impl From<UserFacingError> for AppError {
    fn from(err: UserFacingError) -> Self {
        Self::UserFacing(err)
    }
}

impl<T> From<T> for AppError
where
    T: Into<Report>,
{
    fn from(err: T) -> Self {
        Self::Unexpected(err.into())
    }
}

/// Similar to the `std::dbg!` macro, but generates `tracing` events rather than printing to stdout
#[macro_export]
macro_rules! trace_dbg {
    (target: $target:expr, level: $level:expr, $ex:expr) => {
        {
            match $ex {
                value => {
                    tracing::event!(target: $target, $level, ?value, stringify!($ex));
                    value
                }
            }
        }
    };
    (level: $level:expr, $ex:expr) => {
        trace_dbg!(target: module_path!(), level: $level, $ex)
    };
    (target: $target:expr, $ex:expr) => {
        trace_dbg!(target: $target, level: tracing::Level::DEBUG, $ex)
    };
    ($ex:expr) => {
        trace_dbg!(level: tracing::Level::DEBUG, $ex)
    };
}
