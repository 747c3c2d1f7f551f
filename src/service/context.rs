use std::fmt;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{errors::Result, model::FetchContext};

/// An account/region pair selected by the user
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selection {
    pub profile: String,
    pub region: String,
}

impl Selection {
    pub fn new(profile: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            region: region.into(),
        }
    }

    /// Builds the fetch context for this selection, linked to the given token
    pub fn context(&self, cancellation_token: &CancellationToken) -> FetchContext {
        FetchContext::new(&self.profile, &self.region).with_cancellation(cancellation_token.child_token())
    }

    /// Builds the list of selections for every profile, on the same region
    pub fn for_profiles(profiles: &[String], region: &str) -> Vec<Self> {
        profiles.iter().map(|p| Self::new(p, region)).collect()
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.profile, self.region)
    }
}

/// Runs `fetch` concurrently for every selection, waiting for all of them.
///
/// Partial success is accepted: the successful subset is returned as long as at least one selection resolved,
/// otherwise the first error is returned. Each fetch receives its own context, cancelled along with the given token.
#[instrument(skip_all, fields(selections = selections.len()))]
pub async fn refresh_all<T, F, Fut>(
    selections: &[Selection],
    cancellation_token: &CancellationToken,
    fetch: F,
) -> Result<Vec<(Selection, T)>>
where
    F: Fn(FetchContext) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let futures = selections.iter().map(|selection| {
        let ctx = selection.context(cancellation_token);
        let fut = fetch(ctx);
        async move { (selection.clone(), fut.await) }
    });

    let mut succeeded = Vec::with_capacity(selections.len());
    let mut first_error = None;
    for (selection, res) in join_all(futures).await {
        match res {
            Ok(value) => succeeded.push((selection, value)),
            Err(err) => {
                tracing::warn!("Refresh failed for {selection}: {}", err.to_status_line());
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) if succeeded.is_empty() => Err(err),
        _ => {
            tracing::debug!("Refreshed {} selections", succeeded.len());
            Ok(succeeded)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::errors::{AppError, UserFacingError};

    fn selections() -> Vec<Selection> {
        vec![
            Selection::new("dev", "eu-west-1"),
            Selection::new("prod", "eu-west-1"),
            Selection::new("audit", "eu-west-1"),
        ]
    }

    #[tokio::test]
    async fn test_partial_success() {
        let token = CancellationToken::new();
        let res = refresh_all(&selections(), &token, |ctx| async move {
            let res: Result<usize> = if ctx.profile == "prod" {
                Err(UserFacingError::FetchFailed(String::from("denied")).into())
            } else {
                Ok(ctx.profile.len())
            };
            res
        })
        .await;
        let Ok(values) = res else {
            panic!("expected partial success");
        };
        assert_eq!(
            values,
            vec![
                (Selection::new("dev", "eu-west-1"), 3),
                (Selection::new("audit", "eu-west-1"), 5)
            ]
        );
    }

    #[tokio::test]
    async fn test_all_failed_returns_first_error() {
        let token = CancellationToken::new();
        let res: Result<Vec<(Selection, ())>> = refresh_all(&selections(), &token, |ctx| async move {
            Err(AppError::from(UserFacingError::FetchFailed(ctx.profile)))
        })
        .await;
        assert!(matches!(
            res,
            Err(AppError::UserFacing(UserFacingError::FetchFailed(p))) if p == "dev"
        ));
    }

    #[tokio::test]
    async fn test_runs_concurrently() {
        let token = CancellationToken::new();
        let started = tokio::time::Instant::now();
        let res = refresh_all(&selections(), &token, |_| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, AppError>(())
        })
        .await;
        assert_eq!(res.map(|v| v.len()).ok(), Some(3));
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_cancellation_is_checked() {
        let token = CancellationToken::new();
        token.cancel();
        let res = refresh_all(&selections(), &token, |ctx| async move {
            ctx.ensure_active()?;
            Ok::<_, AppError>(())
        })
        .await;
        assert!(matches!(res, Err(AppError::UserFacing(UserFacingError::Cancelled))));
    }

    #[tokio::test]
    async fn test_no_selections() {
        let token = CancellationToken::new();
        let res = refresh_all(&[], &token, |_| async { Ok::<_, AppError>(1) }).await;
        assert_eq!(res.map(|v| v.len()).ok(), Some(0));
    }
}
