use std::{panic::AssertUnwindSafe, process, sync::Arc};

use cloudscope::{
    action::{ActionExecutor, ActionRegistry},
    app::App,
    catalog::{Catalog, FixtureInvoker},
    cli::{Cli, CliProcess},
    config::Config,
    errors::{self, AppError},
    logging,
    service::{CloudScopeService, Registry, Selection},
};
use color_eyre::Result;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let (cli, cli_process) = Cli::parse_process();

    // Command line flags take precedence over the config file
    let mut config = Config::init(cli.config)?;
    if cli.read_only {
        config.read_only = true;
    }
    if !cli.profiles.is_empty() {
        config.context.profiles = cli.profiles;
    }
    if let Some(region) = cli.region {
        config.context.region = region;
    }

    let (log_path, filter) = logging::resolve_path_and_filter(&config);
    let logs_enabled = filter.is_some();
    logging::init(&log_path, filter)?;

    errors::init(
        logs_enabled.then_some(log_path),
        AssertUnwindSafe(run(config, cli_process)),
    )
    .await
}

async fn run(config: Config, cli_process: CliProcess) -> Result<()> {
    let cancellation_token = CancellationToken::new();
    let ctrl_c_token = cancellation_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Ctrl+C received, cancelling token");
                ctrl_c_token.cancel();
            }
            Err(err) => tracing::error!("Couldn't listen for Ctrl+C: {err}"),
        }
    });

    let catalog = Catalog::load(&config.catalog)?;
    tracing::info!("Loaded {} resource kinds", catalog.len());
    let registry = Arc::new(Registry::new());
    let actions = Arc::new(ActionRegistry::new());
    catalog.register_all(&registry, &actions, &config.keybindings);

    let executor = Arc::new(ActionExecutor::new(Arc::new(FixtureInvoker), config.read_only));
    let selections = Selection::for_profiles(&config.context.profiles, &config.context.region);
    let service = CloudScopeService::new(registry, actions, executor, selections, config.browser)
        .map_err(AppError::into_report)?;

    let output = App::new(cancellation_token).run(config, service, cli_process).await?;

    if let Some(stdout) = output.stdout {
        println!("{stdout}");
    }
    if let Some(stderr) = output.stderr {
        eprintln!("{stderr}");
    }
    if !output.success {
        process::exit(1);
    }
    Ok(())
}
