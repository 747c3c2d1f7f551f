use itertools::Itertools;
use tokio_util::sync::CancellationToken;

use super::{Process, ProcessOutput};
use crate::{
    browser::BrowserState,
    cli::ListProcess,
    config::{Config, Theme},
    errors::AppError,
    format_error, format_msg,
    model::Page,
    service::CloudScopeService,
    utils::fit_width,
};

impl Process for ListProcess {
    async fn execute(
        self,
        config: Config,
        service: CloudScopeService,
        cancellation_token: CancellationToken,
    ) -> color_eyre::Result<ProcessOutput> {
        let handle = match service.open(&self.resource) {
            Ok(handle) => handle,
            Err(err) => return into_output(&config.theme, err),
        };

        let page = if self.all {
            service
                .fetch_all(&handle, &cancellation_token)
                .await
                .map(|items| Page { items, next_token: None })
        } else {
            service.fetch_first(&handle, &cancellation_token).await
        };
        let page = match page {
            Ok(page) => page,
            Err(err) => return into_output(&config.theme, err),
        };

        let mut columns = handle.formatter.columns();
        if let Some(metric) = handle.formatter.metric() {
            columns.push(metric.to_column());
        }
        let mut state = BrowserState::new(
            columns,
            handle.formatter.filter_fields(),
            service.browser_config().pagination_policy(),
        );
        state.replace_all(page.items, page.next_token);
        if self.filter.is_some() {
            state.set_field_filter(self.filter);
        }
        if self.tag.is_some() {
            state.set_tag_filter(self.tag);
        }
        if let Some(query) = self.query {
            state.set_text_filter(query);
        }
        if let Some(column) = self.sort {
            let args = if self.desc { format!("desc {column}") } else { column };
            if let Err(err) = state.apply_sort_command(&args) {
                return into_output(&config.theme, err);
            }
        }

        tracing::info!("Listing {} of {} {} resources", state.visible_len(), state.total(), handle.key);
        let mut output = ProcessOutput::success().stdout(render_table(&state));
        if state.pagination().has_more {
            output = output.stderr(format_msg!(
                config.theme,
                "Only the first page of {} was fetched, use --all to fetch every page",
                handle.key
            ));
        }
        Ok(output)
    }
}

/// Renders user-facing errors on stderr, unexpected ones are propagated
fn into_output(theme: &Theme, err: AppError) -> color_eyre::Result<ProcessOutput> {
    match err {
        AppError::UserFacing(err) => Ok(ProcessOutput::fail().stderr(format_error!(theme, "{err}"))),
        AppError::Unexpected(report) => Err(report),
    }
}

/// Renders the visible resources as plain text, with a header line and one line per resource
fn render_table(state: &BrowserState) -> String {
    let widths = state.columns().iter().map(|c| c.width as usize).collect::<Vec<_>>();
    let header = state
        .header_labels()
        .iter()
        .zip(&widths)
        .map(|(label, width)| fit_width(label, *width))
        .join(" ");
    let rows = state.visible().map(|resource| {
        state
            .columns()
            .iter()
            .zip(&widths)
            .map(|(column, width)| fit_width(&column.value(resource), *width))
            .join(" ")
    });
    std::iter::once(header)
        .chain(rows)
        .map(|line| line.trim_end().to_owned())
        .join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{browser::FieldFilter, catalog::demo_service};

    fn list(resource: &str) -> ListProcess {
        ListProcess {
            resource: resource.to_owned(),
            query: None,
            filter: None,
            tag: None,
            sort: None,
            desc: false,
            all: false,
        }
    }

    async fn run(process: ListProcess) -> ProcessOutput {
        process
            .execute(Config::default(), demo_service(false), CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_first_page() {
        let output = run(list("vm")).await;
        assert!(output.success);
        let stdout = output.stdout.unwrap();
        assert_eq!(stdout.lines().count(), 51);
        assert!(stdout.lines().next().unwrap().starts_with("ID"));
        assert!(output.stderr.unwrap().contains("--all"));
    }

    #[tokio::test]
    async fn test_list_all_pages() {
        let output = run(ListProcess { all: true, ..list("vm") }).await;
        assert_eq!(output.stdout.unwrap().lines().count(), 74);
        assert_eq!(output.stderr, None);
    }

    #[tokio::test]
    async fn test_list_field_filter() {
        let output = run(ListProcess {
            filter: Some(FieldFilter::new("VpcId", "vpc-does-not-exist")),
            all: true,
            ..list("vm")
        })
        .await;
        assert_eq!(output.stdout.unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn test_list_unknown_kind() {
        let output = run(list("nope")).await;
        assert!(!output.success);
        assert!(output.stderr.unwrap().contains("Unknown resource type: nope"));
    }

    #[tokio::test]
    async fn test_list_unknown_sort_column() {
        let output = run(ListProcess {
            sort: Some(String::from("nope")),
            ..list("vpc")
        })
        .await;
        assert!(!output.success);
        assert!(output.stderr.unwrap().contains("No column matches 'nope'"));
    }
}
