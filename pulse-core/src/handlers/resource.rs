//! Async data resources.
//!
//! A [`Resource`] keeps the lifecycle of an async fetch in three signals:
//! `data`, `loading` and `error`. Resources can be registered under tags;
//! [`invalidate`] refetches every live resource carrying a tag.
//!
//! # Registry
//!
//! Tags map to weak references, so registering a resource never keeps it
//! alive. Dead entries are pruned when their tag is invalidated.

use std::future::Future;
use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;

use crate::reactive::{batch, ReadOnly, Signal};

/// Boxed fetch function.
pub type Fetcher<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// How to fetch a resource and which tags it answers to.
pub struct ResourceConfig<T, E> {
    fetch: Fetcher<T, E>,
    tags: Vec<String>,
}

impl<T, E> ResourceConfig<T, E> {
    /// Fetch with `fetch`, no tags.
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            fetch: Arc::new(move || fetch().boxed()),
            tags: Vec::new(),
        }
    }

    /// Add one tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add several tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Something the tag registry can refetch.
trait Refetch: Send + Sync {
    fn refetch(&self) -> BoxFuture<'static, ()>;
}

static TAGS: OnceLock<DashMap<String, Vec<Weak<dyn Refetch>>>> = OnceLock::new();

fn tags() -> &'static DashMap<String, Vec<Weak<dyn Refetch>>> {
    TAGS.get_or_init(DashMap::new)
}

fn same_error<E>(a: &Option<Arc<E>>, b: &Option<Arc<E>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

struct ResourceInner<T, E>
where
    T: Clone + Send + Sync + PartialEq + 'static,
    E: Send + Sync + 'static,
{
    data: Signal<Option<T>>,
    loading: Signal<bool>,
    error: Signal<Option<Arc<E>>>,
    fetch: Fetcher<T, E>,
}

impl<T, E> Refetch for ResourceInner<T, E>
where
    T: Clone + Send + Sync + PartialEq + 'static,
    E: Send + Sync + 'static,
{
    fn refetch(&self) -> BoxFuture<'static, ()> {
        self.loading.set(true);

        let data = self.data.clone();
        let loading = self.loading.clone();
        let error = self.error.clone();
        let pending = (self.fetch)();

        async move {
            let outcome = pending.await;
            batch(|| {
                match outcome {
                    Ok(value) => {
                        data.set(Some(value));
                        error.set(None);
                    }
                    Err(err) => error.set(Some(Arc::new(err))),
                }
                loading.set(false);
            });
        }
        .boxed()
    }
}

/// An async value tracked through signals.
pub struct Resource<T, E>
where
    T: Clone + Send + Sync + PartialEq + 'static,
    E: Send + Sync + 'static,
{
    inner: Arc<ResourceInner<T, E>>,
}

impl<T, E> Resource<T, E>
where
    T: Clone + Send + Sync + PartialEq + 'static,
    E: Send + Sync + 'static,
{
    /// Build a resource and register its tags, without fetching.
    pub fn new(config: ResourceConfig<T, E>) -> Self {
        let inner = Arc::new(ResourceInner {
            data: Signal::new(None),
            loading: Signal::new(false),
            error: Signal::with_equality(None, same_error::<E>),
            fetch: config.fetch,
        });

        for tag in config.tags {
            let weak: Weak<dyn Refetch> = Arc::downgrade(&inner) as Weak<dyn Refetch>;
            tags().entry(tag).or_default().push(weak);
        }

        Self { inner }
    }

    /// Last successfully fetched value.
    pub fn data(&self) -> ReadOnly<Option<T>> {
        self.inner.data.as_readonly()
    }

    /// Whether a fetch is in flight.
    pub fn loading(&self) -> ReadOnly<bool> {
        self.inner.loading.as_readonly()
    }

    /// Error from the last failed fetch, cleared by the next success.
    pub fn error(&self) -> ReadOnly<Option<Arc<E>>> {
        self.inner.error.as_readonly()
    }

    /// Fetch again.
    ///
    /// `loading` flips to true immediately; the returned future completes
    /// once the result has been committed.
    pub fn refetch(&self) -> impl Future<Output = ()> + Send + 'static {
        self.inner.refetch()
    }
}

impl<T, E> Clone for Resource<T, E>
where
    T: Clone + Send + Sync + PartialEq + 'static,
    E: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Build a resource and start its first fetch on the current Tokio runtime.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn resource<T, E>(config: ResourceConfig<T, E>) -> Resource<T, E>
where
    T: Clone + Send + Sync + PartialEq + 'static,
    E: Send + Sync + 'static,
{
    let resource = Resource::new(config);
    tokio::spawn(resource.refetch());
    resource
}

/// Refetch every live resource registered under `tag`.
///
/// All refetches start (and flip `loading`) before this returns; the future
/// resolves with the number of resources refetched once they have all
/// settled.
pub fn invalidate(tag: &str) -> impl Future<Output = usize> + Send + 'static {
    let live: Vec<Arc<dyn Refetch>> = match tags().get_mut(tag) {
        Some(mut entries) => {
            entries.retain(|entry| entry.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        }
        None => Vec::new(),
    };

    tracing::debug!(tag, count = live.len(), "invalidating resources");

    let fetches: Vec<_> = live.iter().map(|resource| resource.refetch()).collect();
    let count = fetches.len();
    async move {
        join_all(fetches).await;
        count
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
