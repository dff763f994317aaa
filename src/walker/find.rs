//! Choosing the provider that serves a range

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::SourceCacheContext;
use crate::core::{DepwalkError, DepwalkResult};
use crate::library::{Framework, LibraryDependencyTarget, LibraryIdentity, LibraryRange};
use crate::walker::{DependencyProvider, RemoteMatch, RemoteWalkContext};

/// Find the library that should satisfy `range`
///
/// Projects are consulted first and the first one that answers wins. For
/// packages, a fixed range tries local sources first and stops there on an
/// exact floor match; otherwise local and remote answers compete and the
/// better version wins. Floating ranges always ask every source.
pub async fn find_library_match(
    context: &RemoteWalkContext,
    range: &LibraryRange,
    framework: &Framework,
    cache: &SourceCacheContext,
    token: &CancellationToken,
) -> DepwalkResult<Option<RemoteMatch>> {
    let constraint = range.type_constraint();

    if constraint.intersects(LibraryDependencyTarget::PROJECT | LibraryDependencyTarget::EXTERNAL_PROJECT) {
        for provider in &context.project_providers {
            context.metrics.inc_find_requests();
            let found = match provider.find_library(range, framework, cache, token).await {
                Ok(found) => found,
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };
            if let Some(library) = found.filter(|library| constraint.allows(library.library_type())) {
                return Ok(Some(RemoteMatch {
                    library,
                    provider: Arc::clone(provider),
                }));
            }
        }
    }

    if !constraint.contains(LibraryDependencyTarget::PACKAGE) {
        return Ok(None);
    }

    let remote = context.eligible_remote_providers(range.name());
    if remote.is_empty() && context.package_namespaces.is_some() {
        return Err(DepwalkError::NamespaceMisconfiguration {
            package: range.name().to_string(),
        });
    }

    let floating = range.version_range().is_some_and(|v| v.is_floating());
    if floating {
        let providers: Vec<_> = context.local_providers.iter().cloned().chain(remote).collect();
        return find_best_across(context, &providers, range, framework, cache, token).await;
    }

    let local = find_best_across(context, &context.local_providers, range, framework, cache, token).await?;
    if let Some(local) = &local {
        if is_unbeatable(range, &local.library) {
            return Ok(Some(local.clone()));
        }
    }

    let remote = find_best_across(context, &remote, range, framework, cache, token).await?;
    Ok(match (local, remote) {
        (Some(local), Some(remote)) => {
            if compare(range, &remote.library, &local.library) == Ordering::Greater {
                Some(remote)
            } else {
                Some(local)
            }
        }
        (local, remote) => local.or(remote),
    })
}

fn is_unbeatable(range: &LibraryRange, library: &LibraryIdentity) -> bool {
    match (range.version_range(), library.version()) {
        (Some(version_range), Some(version)) => version_range.is_unbeatable(version),
        _ => false,
    }
}

/// How `candidate` ranks against `current` for `range`; `Greater` is better
fn compare(range: &LibraryRange, candidate: &LibraryIdentity, current: &LibraryIdentity) -> Ordering {
    match (range.version_range(), candidate.version(), current.version()) {
        (Some(version_range), Some(candidate), Some(current)) => {
            if candidate == current {
                Ordering::Equal
            } else if version_range.is_better(Some(current), candidate) {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        _ => Ordering::Equal,
    }
}

/// Ask every provider at once and keep the best answer
///
/// Equal answers go to the provider listed first. The race ends early once
/// the best answer can not be beaten and every provider listed before it has
/// replied. Past the timeout, whatever was collected is used; with nothing
/// collected the lookup fails. Providers still running when the race ends are
/// dropped.
pub async fn find_best_across(
    context: &RemoteWalkContext,
    providers: &[Arc<dyn DependencyProvider>],
    range: &LibraryRange,
    framework: &Framework,
    cache: &SourceCacheContext,
    token: &CancellationToken,
) -> DepwalkResult<Option<RemoteMatch>> {
    if providers.is_empty() {
        return Ok(None);
    }

    let deadline = Instant::now() + context.find_timeout;
    let mut pending: FuturesUnordered<BoxFuture<'_, (usize, DepwalkResult<Option<LibraryIdentity>>)>> = providers
        .iter()
        .enumerate()
        .map(|(index, provider)| {
            context.metrics.inc_find_requests();
            async move { (index, provider.find_library(range, framework, cache, token).await) }.boxed()
        })
        .collect();

    let mut answered = vec![false; providers.len()];
    let mut best: Option<(usize, LibraryIdentity)> = None;

    loop {
        if let Some((index, library)) = &best {
            if is_unbeatable(range, library) && answered[..*index].iter().all(|a| *a) {
                break;
            }
        }

        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(DepwalkError::Cancelled),
            next = tokio::time::timeout_at(deadline, pending.next()) => next,
        };

        let (index, result) = match next {
            Ok(Some(answer)) => answer,
            Ok(None) => break,
            Err(_) => {
                if answered.iter().any(|a| *a) {
                    warn!(
                        "Timed out looking up '{}', using the sources that answered",
                        range
                    );
                    break;
                }
                return Err(DepwalkError::Timeout(context.find_timeout.as_secs()));
            }
        };
        answered[index] = true;

        let found = match result {
            Ok(found) => found,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        let Some(library) = found else {
            continue;
        };
        if !range.type_constraint().allows(library.library_type()) {
            continue;
        }
        let satisfies = match (range.version_range(), library.version()) {
            (Some(version_range), Some(version)) => version_range.satisfies(version),
            _ => true,
        };
        if !satisfies {
            continue;
        }

        let replace = match &best {
            None => true,
            Some((best_index, current)) => match compare(range, &library, current) {
                Ordering::Greater => true,
                Ordering::Equal => index < *best_index,
                Ordering::Less => false,
            },
        };
        if replace {
            best = Some((index, library));
        }
    }

    Ok(best.map(|(index, library)| {
        debug!("'{}' resolved to {} from '{}'", range, library, providers[index].source());
        RemoteMatch {
            library,
            provider: Arc::clone(&providers[index]),
        }
    }))
}
