use itertools::Itertools;
use tokio_util::sync::CancellationToken;

use super::{Process, ProcessOutput};
use crate::{cli::KindsProcess, config::Config, service::CloudScopeService, utils::fit_width};

impl Process for KindsProcess {
    async fn execute(
        self,
        _config: Config,
        service: CloudScopeService,
        _cancellation_token: CancellationToken,
    ) -> color_eyre::Result<ProcessOutput> {
        let registry = service.registry();
        let keys = registry.keys();
        let width = keys.iter().map(|k| k.to_string().len()).max().unwrap_or_default();
        let lines = keys
            .iter()
            .filter_map(|key| {
                let handle = registry.get(key).ok()?;
                let aliases = registry.aliases_of(key).join(", ");
                let paging = if handle.fetcher.as_paginated().is_some() { "  (paginated)" } else { "" };
                Some(format!("{}  {aliases}{paging}", fit_width(&key.to_string(), width)))
            })
            .join("\n");
        Ok(ProcessOutput::success().stdout(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::demo_service;

    #[tokio::test]
    async fn test_kinds_lists_aliases() {
        let output = KindsProcess {}
            .execute(Config::default(), demo_service(false), CancellationToken::new())
            .await
            .unwrap();
        assert!(output.success);
        let stdout = output.stdout.unwrap();
        let instances = stdout.lines().find(|l| l.starts_with("ec2/instances")).unwrap();
        assert!(instances.contains("vm"));
        assert!(instances.ends_with("(paginated)"));
    }
}
