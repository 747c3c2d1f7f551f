use color_eyre::{Result, eyre::eyre};
use tokio_util::sync::CancellationToken;

use super::InteractiveProcess;
use crate::{
    cli::BrowseProcess,
    component::{Component, SurfaceContext, browser::BrowserComponent},
    config::Config,
    errors::AppError,
    service::{CloudScopeService, KindHandle},
};

impl InteractiveProcess for BrowseProcess {
    fn into_component(
        self,
        config: Config,
        service: CloudScopeService,
        cancellation_token: CancellationToken,
    ) -> Result<Box<dyn Component>> {
        let (handle, error) = match self.resource.as_deref().map(|r| service.open(r)) {
            Some(Ok(handle)) => (handle, None),
            Some(Err(AppError::UserFacing(err))) => {
                tracing::warn!("{err}, falling back to the first kind");
                (first_kind(&service)?, Some(err.to_string()))
            }
            Some(Err(AppError::Unexpected(report))) => return Err(report),
            None => (first_kind(&service)?, None),
        };
        tracing::info!("Browsing {}", handle.key);

        let ctx = SurfaceContext::new(&config, service, cancellation_token);
        let browser = BrowserComponent::new(ctx, handle, self.filter);
        Ok(Box::new(match error {
            Some(err) => browser.with_error(err),
            None => browser,
        }))
    }
}

fn first_kind(service: &CloudScopeService) -> Result<KindHandle> {
    let key = service
        .registry()
        .keys()
        .into_iter()
        .next()
        .ok_or_else(|| eyre!("The catalog doesn't declare any resource kind"))?;
    service.registry().get(&key).map_err(AppError::into_report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::demo_service;

    #[test]
    fn test_browse_defaults_to_first_kind() {
        let component = BrowseProcess::default()
            .into_component(Config::default(), demo_service(false), CancellationToken::new())
            .unwrap();
        assert_eq!(component.name(), "BrowserComponent");
    }

    #[test]
    fn test_browse_unknown_kind_falls_back() {
        let process = BrowseProcess {
            resource: Some(String::from("nope")),
            filter: None,
        };
        let component = process.into_component(Config::default(), demo_service(false), CancellationToken::new());
        assert!(component.is_ok());
    }
}
