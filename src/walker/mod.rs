//! Asynchronous dependency walk
//!
//! The walker expands a root request into a tree by asking providers for a
//! match and its dependencies, one node per declared edge. Siblings are
//! expanded concurrently but land in declaration order. Every
//! `(range, framework)` pair is resolved at most once per walker, and every
//! `(identity, framework, source)` dependency list is fetched at most once,
//! however many branches ask for it at the same time.

mod central;
mod context;
mod find;
mod provider;
mod runtime;

use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{settle, AsyncMemo, MemoLookup, SourceCacheContext};
use crate::core::{DepwalkError, DepwalkResult};
use crate::graph::{Disposition, GraphItem, GraphNode, GraphTree, NodeId};
use crate::library::{
    same_name, Framework, LibraryDependency, LibraryIdentity, LibraryRange, LibraryType,
};

pub use central::TransitiveCentralPackageVersions;
pub use context::{PackageNamespaces, RemoteWalkContext, DEFAULT_FIND_TIMEOUT};
pub use find::{find_best_across, find_library_match};
pub use provider::{
    DependencyProvider, LibraryDependencyInfo, ProviderKind, RemoteMatch, RemoteResolveResult,
};
pub use runtime::{RuntimeDependency, RuntimeDescription, RuntimeGraph};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DependencyKey {
    identity: LibraryIdentity,
    framework: Framework,
    source: String,
}

impl DependencyKey {
    fn of(found: &RemoteMatch, framework: &Framework) -> Self {
        Self {
            identity: found.library.clone(),
            framework: framework.clone(),
            source: found.provider.source().to_string(),
        }
    }
}

struct WalkCaches {
    find_library_entry_cache: AsyncMemo<(LibraryRange, Framework), GraphItem<RemoteResolveResult>>,
    dependency_info_cache: AsyncMemo<DependencyKey, LibraryDependencyInfo>,
}

/// Names and declared dependencies of the nodes above the one being expanded
struct Ancestry {
    name_key: String,
    dependencies: Vec<LibraryDependency>,
    parent: Option<Arc<Ancestry>>,
}

impl Ancestry {
    /// This node followed by its ancestors up to the root
    fn chain(&self) -> impl Iterator<Item = &Ancestry> {
        std::iter::successors(Some(self), |current| current.parent.as_deref())
    }
}

/// One edge waiting to be expanded
struct Edge {
    range: LibraryRange,
    parent: Option<Arc<Ancestry>>,
    expand: bool,
    disposition: Disposition,
    central: bool,
}

/// Subtree built by one expansion, turned into a [`GraphTree`] at the end
struct WalkedNode {
    range: LibraryRange,
    item: GraphItem<RemoteResolveResult>,
    disposition: Disposition,
    children: Vec<WalkedNode>,
}

/// State of a single `walk` call
struct WalkState<'a> {
    framework: Framework,
    runtime: Option<(&'a str, &'a RuntimeGraph)>,
    recursive: bool,
    /// Central versions declared by the root
    pins: Vec<LibraryDependency>,
    central: TransitiveCentralPackageVersions,
}

impl WalkState<'_> {
    fn pin_named(&self, name: &str) -> Option<&LibraryDependency> {
        self.pins
            .iter()
            .find(|pin| same_name(pin.name(), name))
    }

    /// Next requested pin, in root declaration order
    fn next_pin(&self) -> Option<LibraryDependency> {
        self.pins
            .iter()
            .find(|pin| self.central.try_take_name(pin.name()).is_some())
            .cloned()
    }
}

/// Whether a dependency asks for more than a nearer declaration of the same
/// name allows
fn floor_exceeds(nearer: &LibraryDependency, dependency: &LibraryDependency) -> bool {
    match (
        nearer.library_range.version_range(),
        dependency.library_range.version_range(),
    ) {
        (Some(nearer), Some(requested)) => !nearer.is_greater_than_or_equal_to(requested),
        _ => false,
    }
}

pub struct RemoteDependencyWalker {
    context: Arc<RemoteWalkContext>,
    caches: Arc<WalkCaches>,
    token: CancellationToken,
}

impl RemoteDependencyWalker {
    pub fn new(context: Arc<RemoteWalkContext>) -> Self {
        Self {
            context,
            caches: Arc::new(WalkCaches {
                find_library_entry_cache: AsyncMemo::new(),
                dependency_info_cache: AsyncMemo::new(),
            }),
            token: CancellationToken::new(),
        }
    }

    /// Observe `token` in every provider call of every walk
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn context(&self) -> &RemoteWalkContext {
        &self.context
    }

    /// Build the dependency tree of `root`
    ///
    /// Unresolvable requests become unresolved nodes. Provider faults, a
    /// package that stays missing after one retry, namespace misconfiguration
    /// and cancellation fail the whole walk. With `recursive` off only the
    /// root's direct dependencies are resolved.
    pub async fn walk(
        &self,
        root: LibraryRange,
        framework: Framework,
        runtime_identifier: Option<&str>,
        runtime_graph: Option<&RuntimeGraph>,
        recursive: bool,
    ) -> DepwalkResult<GraphTree<RemoteResolveResult>> {
        let root_item = self.find_library_entry(&root, &framework).await?;
        let pins: Vec<LibraryDependency> = root_item
            .data
            .dependencies
            .iter()
            .filter(|dependency| dependency.is_central_pin())
            .cloned()
            .collect();

        let state = WalkState {
            framework,
            runtime: runtime_identifier.zip(runtime_graph),
            recursive,
            pins,
            central: TransitiveCentralPackageVersions::new(),
        };

        let mut walked = self
            .walk_edge(
                &state,
                Edge {
                    range: root.clone(),
                    parent: None,
                    expand: true,
                    disposition: Disposition::Acceptable,
                    central: false,
                },
            )
            .await?;

        // Pins some transitive edge asked for become direct children of the
        // root, each walked like any other subtree
        if walked.item.is_resolved() && !state.pins.is_empty() {
            let root_ancestry = Arc::new(Ancestry {
                name_key: walked.item.key().name_key(),
                dependencies: walked.item.data.dependencies.clone(),
                parent: None,
            });
            while let Some(pin) = state.next_pin() {
                self.context.metrics.inc_central_injections();
                debug!("Injecting central version {} under {}", pin.library_range, root);
                let child = self
                    .walk_edge(
                        &state,
                        Edge {
                            range: pin.library_range.clone(),
                            parent: Some(Arc::clone(&root_ancestry)),
                            expand: state.recursive,
                            disposition: Disposition::Acceptable,
                            central: true,
                        },
                    )
                    .await?;
                walked.children.push(child);
            }
        }

        debug!(
            "Walked {}: {} lookups and {} dependency lists cached",
            root,
            self.caches.find_library_entry_cache.len(),
            self.caches.dependency_info_cache.len()
        );
        Ok(into_tree(walked))
    }

    fn walk_edge<'a>(
        &'a self,
        state: &'a WalkState<'a>,
        edge: Edge,
    ) -> BoxFuture<'a, DepwalkResult<WalkedNode>> {
        async move {
            if self.token.is_cancelled() {
                return Err(DepwalkError::Cancelled);
            }

            let mut item = self.find_library_entry(&edge.range, &state.framework).await?;
            if edge.central {
                item = item.with_central_transitive(true);
            }
            let mut node = WalkedNode {
                range: edge.range,
                item,
                disposition: edge.disposition,
                children: Vec::new(),
            };
            if !edge.expand || !node.item.is_resolved() {
                return Ok(node);
            }

            let mut dependencies = node.item.data.dependencies.clone();
            if let Some((rid, graph)) = state.runtime {
                if node.item.key().library_type() == LibraryType::Package {
                    dependencies.extend(graph.find_runtime_dependencies(rid, node.item.key().name())?);
                }
            }

            let is_root = edge.parent.is_none();
            let ancestry = Arc::new(Ancestry {
                name_key: node.item.key().name_key(),
                dependencies,
                parent: edge.parent,
            });

            let children: Vec<_> = ancestry
                .dependencies
                .iter()
                .filter(|dependency| !(is_root && dependency.is_central_pin()))
                .map(|dependency| {
                    let name_key = dependency.library_range.name_key();
                    if !is_root {
                        if let Some(pin) = state.pin_named(dependency.name()) {
                            if state.central.try_add(pin.name()) {
                                debug!("{} is pinned centrally, queued for injection", pin.name());
                            }
                        }
                    }

                    let cycle = ancestry.chain().any(|a| a.name_key == name_key);
                    let downgraded = ancestry.parent.as_deref().is_some_and(|parent| {
                        parent.chain().any(|a| {
                            a.dependencies.iter().any(|nearer| {
                                nearer.library_range.name_key() == name_key
                                    && floor_exceeds(nearer, dependency)
                            })
                        })
                    });

                    self.walk_edge(
                        state,
                        Edge {
                            range: dependency.library_range.clone(),
                            parent: Some(Arc::clone(&ancestry)),
                            expand: state.recursive && !cycle,
                            disposition: if downgraded {
                                Disposition::PotentiallyDowngraded
                            } else {
                                Disposition::Acceptable
                            },
                            central: false,
                        },
                    )
                })
                .collect();

            node.children = try_join_all(children).await?;
            Ok(node)
        }
        .boxed()
    }

    /// Memoized match plus dependencies for one request
    async fn find_library_entry(
        &self,
        range: &LibraryRange,
        framework: &Framework,
    ) -> DepwalkResult<GraphItem<RemoteResolveResult>> {
        let mut started = false;
        let entry = self
            .caches
            .find_library_entry_cache
            .get_or_compute((range.clone(), framework.clone()), || {
                started = true;
                let context = Arc::clone(&self.context);
                let caches = Arc::clone(&self.caches);
                let token = self.token.clone();
                let range = range.clone();
                let framework = framework.clone();
                async move { resolve_entry(&context, &caches, &token, &range, &framework).await }
            })
            .await;

        if started {
            self.context.metrics.cache_miss();
        } else {
            self.context.metrics.cache_hit();
        }
        entry
    }
}

async fn resolve_entry(
    context: &RemoteWalkContext,
    caches: &WalkCaches,
    token: &CancellationToken,
    range: &LibraryRange,
    framework: &Framework,
) -> DepwalkResult<GraphItem<RemoteResolveResult>> {
    let cache = context.cache_context;
    let Some(found) = find_library_match(context, range, framework, &cache, token).await? else {
        context.metrics.inc_unresolved();
        debug!("Unable to resolve {}", range);
        return Ok(GraphItem::new(
            LibraryIdentity::unresolved(range),
            RemoteResolveResult::unresolved(),
        ));
    };

    let key = DependencyKey::of(&found, framework);
    let first = dependency_lookup(context, caches, token, &found, framework, cache);
    let (found, info) = match settle(first.clone()).await {
        Ok(info) => (found, info),
        Err(e) if e.is_not_found() => {
            context.metrics.inc_retries();
            warn!(
                "{} was listed by '{}' but could not be retrieved, retrying",
                found.library,
                found.provider.source()
            );

            let refreshed = cache.with_refresh_memory_cache();
            let retried = find_library_match(context, range, framework, &refreshed, token)
                .await?
                .ok_or_else(|| {
                    DepwalkError::fatal(
                        range.name(),
                        format!("{} is no longer offered by any source", found.library),
                    )
                })?;
            let retried_key = DependencyKey::of(&retried, framework);
            let fetch = dependency_fetch(context, token, &retried, framework, refreshed);
            let lookup = if retried_key == key {
                caches.dependency_info_cache.relookup(key, &first, fetch)
            } else {
                caches.dependency_info_cache.lookup(retried_key, fetch)
            };
            let info = settle(lookup).await.map_err(|e| {
                if e.is_not_found() {
                    DepwalkError::fatal(retried.library.name(), e.to_string())
                } else {
                    e
                }
            })?;
            (retried, info)
        }
        Err(e) => return Err(e),
    };

    Ok(GraphItem::new(
        found.library.clone(),
        RemoteResolveResult {
            match_: Some(found),
            dependencies: info.dependencies,
        },
    ))
}

/// Shared dependency fetch for one found match
fn dependency_lookup(
    context: &RemoteWalkContext,
    caches: &WalkCaches,
    token: &CancellationToken,
    found: &RemoteMatch,
    framework: &Framework,
    cache: SourceCacheContext,
) -> MemoLookup<LibraryDependencyInfo> {
    caches.dependency_info_cache.lookup(
        DependencyKey::of(found, framework),
        dependency_fetch(context, token, found, framework, cache),
    )
}

fn dependency_fetch(
    context: &RemoteWalkContext,
    token: &CancellationToken,
    found: &RemoteMatch,
    framework: &Framework,
    cache: SourceCacheContext,
) -> impl FnOnce() -> BoxFuture<'static, DepwalkResult<LibraryDependencyInfo>> {
    let provider = Arc::clone(&found.provider);
    let identity = found.library.clone();
    let framework = framework.clone();
    let token = token.clone();
    let metrics = Arc::clone(&context.metrics);

    move || {
        async move {
            metrics.inc_dependency_requests();
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(DepwalkError::Cancelled),
                info = provider.get_dependencies(&identity, &framework, &cache, &token) => info,
            }
        }
        .boxed()
    }
}

fn into_tree(root: WalkedNode) -> GraphTree<RemoteResolveResult> {
    let WalkedNode {
        range,
        item,
        disposition,
        children,
    } = root;
    let mut node = GraphNode::with_item(range, item);
    node.set_disposition(disposition);

    let mut tree = GraphTree::new(node);
    let root = tree.root();
    attach(&mut tree, root, children);
    tree
}

/// Insert children depth-first so node ids follow pre-order
fn attach(tree: &mut GraphTree<RemoteResolveResult>, parent: NodeId, children: Vec<WalkedNode>) {
    for child in children {
        let mut node = GraphNode::with_item(child.range, child.item);
        node.set_disposition(child.disposition);
        let id = tree.add_inner_node(parent, node);
        attach(tree, id, child.children);
    }
}
