// /////////////////////////////////////////////////////////////////////////////
// Conveyor
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The fluent builder and materialization entry point.
//!
//! A [`Pipeline<T>`] is an immutable chain of operator descriptors rooted at
//! a [`Source`]. Builder methods consume `self` and return a new
//! `Pipeline<U>` wrapping a closure that, when called, materializes the
//! whole chain upstream-first into a single boxed iterator. The closure is
//! cheap to clone (it is held behind an `Arc`) and may be called more than
//! once — each call is an independent materialization per invariant 2: the
//! source factory runs again, and any per-iteration state the operators hold
//! (reorder buffers, open groups, worker pools, ...) is freshly built.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use conveyor_domain::{BatchSize, Concurrency, DeliveryOrder, ErrorKind, Interval, PerSecond, StreamError};

use crate::item::{BoxIter, Item, OpResult};
use crate::operators::batch::Batch;
use crate::operators::catch::Catch;
use crate::operators::chain::Chain;
use crate::operators::concurrent::ConcurrentMap;
use crate::operators::concurrent_async::ConcurrentMapAsync;
use crate::operators::filter::Filter;
use crate::operators::flatten::{FlattenConcurrent, FlattenSequential};
use crate::operators::limit::Limit;
use crate::operators::observe::Observe;
use crate::operators::slow::Slow;
use crate::source::Source;
use crate::time::system_clock;
use crate::validation;

type Materializer<T> = Arc<dyn Fn() -> Result<BoxIter<T>, StreamError> + Send + Sync>;

pub struct Pipeline<T> {
    materialize: Materializer<T>,
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Pipeline { materialize: Arc::clone(&self.materialize) }
    }
}

impl<T: Send + 'static> Pipeline<T> {
    pub fn from_source<S>(source: S) -> Self
    where
        S: Source<T> + 'static,
    {
        let source = Arc::new(source);
        Pipeline { materialize: Arc::new(move || source.materialize()) }
    }

    /// Materializes the chain into a single-pass iterator. Each call is an
    /// independent materialization: the source factory is invoked again.
    pub fn iter(&self) -> Result<BoxIter<T>, StreamError> {
        (self.materialize)()
    }

    /// `map`: transforms each element through `transform`, always running
    /// through the bounded concurrent-worker engine (`concurrency = 1` still
    /// uses it, just with a single worker).
    pub fn map<U, F>(self, transform: F, concurrency: Concurrency, ordered: DeliveryOrder) -> Pipeline<U>
    where
        F: Fn(T) -> OpResult<U> + Send + Sync + 'static,
        U: Send + 'static,
    {
        let transform = Arc::new(transform);
        let upstream = self.materialize;
        Pipeline {
            materialize: Arc::new(move || {
                let upstream_iter = upstream()?;
                let t = Arc::clone(&transform);
                Ok(Box::new(ConcurrentMap::new(upstream_iter, move |v: T| t(v), concurrency, ordered.is_ordered(), "map")) as BoxIter<U>)
            }),
        }
    }

    /// `foreach`: `map` that discards the transform's result and re-yields
    /// the original element.
    pub fn foreach<F>(self, effect: F, concurrency: Concurrency, ordered: DeliveryOrder) -> Pipeline<T>
    where
        F: Fn(&T) -> OpResult<()> + Send + Sync + 'static,
    {
        self.map(
            move |v: T| {
                effect(&v)?;
                Ok(v)
            },
            concurrency,
            ordered,
        )
    }

    /// `amap`: the cooperative-tasks counterpart of [`Pipeline::map`]. Must
    /// be materialized from inside a tokio runtime; workers are spawned on
    /// the handle of whichever runtime is current when the chain is built.
    pub fn amap<U, F, Fut>(self, transform: F, concurrency: Concurrency, ordered: DeliveryOrder) -> Pipeline<U>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = OpResult<U>> + Send + 'static,
        U: Send + 'static,
    {
        let transform = Arc::new(transform);
        let upstream = self.materialize;
        Pipeline {
            materialize: Arc::new(move || {
                let upstream_iter = upstream()?;
                let t = Arc::clone(&transform);
                let handle = tokio::runtime::Handle::current();
                Ok(Box::new(ConcurrentMapAsync::new(upstream_iter, move |v: T| t(v), concurrency.get(), ordered.is_ordered(), "amap", handle)) as BoxIter<U>)
            }),
        }
    }

    /// `aforeach`: the cooperative-tasks counterpart of [`Pipeline::foreach`].
    /// Requires `T: Clone` because the element must be kept around while an
    /// owned copy is moved into the effect's future.
    pub fn aforeach<F, Fut>(self, effect: F, concurrency: Concurrency, ordered: DeliveryOrder) -> Pipeline<T>
    where
        T: Clone,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = OpResult<()>> + Send + 'static,
    {
        self.amap(
            move |v: T| {
                let keep = v.clone();
                let fut = effect(v);
                async move {
                    fut.await?;
                    Ok(keep)
                }
            },
            concurrency,
            ordered,
        )
    }

    pub fn filter<F>(self, predicate: F) -> Pipeline<T>
    where
        F: Fn(&T) -> OpResult<bool> + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        let upstream = self.materialize;
        Pipeline {
            materialize: Arc::new(move || {
                let upstream_iter = upstream()?;
                let p = Arc::clone(&predicate);
                Ok(Box::new(Filter::new(upstream_iter, move |v: &T| p(v))) as BoxIter<T>)
            }),
        }
    }

    /// `limit`/`truncate`: at least one of `count` or `when` is required,
    /// checked eagerly here rather than at first iteration.
    pub fn limit<F>(self, count: Option<usize>, when: Option<F>) -> Result<Pipeline<T>, StreamError>
    where
        F: Fn(&T) -> OpResult<bool> + Send + Sync + 'static,
    {
        validation::validate_limit(count, when.is_some())?;
        let when = when.map(Arc::new);
        let upstream = self.materialize;
        Ok(Pipeline {
            materialize: Arc::new(move || {
                let upstream_iter = upstream()?;
                let when_fn = when.clone().map(|w| move |v: &T| w(v));
                Ok(Box::new(Limit::new(upstream_iter, count, when_fn)) as BoxIter<T>)
            }),
        })
    }

    /// `slow`/`throttle`: at least one of `per_second` or `interval` is
    /// required; validated eagerly.
    pub fn slow(self, per_second: Option<PerSecond>, interval: Option<Interval>) -> Result<Pipeline<T>, StreamError> {
        let min_gap = validation::validate_slow(per_second, interval)?;
        let upstream = self.materialize;
        Ok(Pipeline {
            materialize: Arc::new(move || {
                let upstream_iter = upstream()?;
                Ok(Box::new(Slow::new(upstream_iter, min_gap, system_clock())) as BoxIter<T>)
            }),
        })
    }

    pub fn observe(self, label: impl Into<String>) -> Pipeline<T> {
        let label = label.into();
        let upstream = self.materialize;
        Pipeline {
            materialize: Arc::new(move || {
                let upstream_iter = upstream()?;
                Ok(Box::new(Observe::new(upstream_iter, label.clone())) as BoxIter<T>)
            }),
        }
    }

    /// `catch`: `kinds` empty means "every kind"; `when` defaults to
    /// always-true; `replacement` is a factory so a non-`Clone` `T` can
    /// still be substituted once per absorbed element.
    pub fn catch<W, R>(self, kinds: HashSet<ErrorKind>, when: Option<W>, replacement: Option<R>, finally_raise: bool) -> Pipeline<T>
    where
        W: Fn(&StreamError) -> bool + Send + Sync + 'static,
        R: Fn() -> T + Send + Sync + 'static,
    {
        let when = when.map(Arc::new);
        let replacement = replacement.map(Arc::new);
        let upstream = self.materialize;
        Pipeline {
            materialize: Arc::new(move || {
                let upstream_iter = upstream()?;
                let when_box: Option<Box<dyn FnMut(&StreamError) -> bool + Send>> = when.clone().map(|w| {
                    let boxed: Box<dyn FnMut(&StreamError) -> bool + Send> = Box::new(move |e: &StreamError| w(e));
                    boxed
                });
                let replacement_fn = replacement.clone().map(|r| move || r());
                Ok(Box::new(Catch::new(upstream_iter, kinds.clone(), when_box, replacement_fn, finally_raise)) as BoxIter<T>)
            }),
        }
    }

    /// `batch`/`group`: tumbling batches keyed by `by` (default: a single
    /// group, via [`Pipeline::batch`] below, which supplies the constant
    /// key).
    pub fn group_by<K, F>(self, size: BatchSize, interval: Interval, by: F) -> Pipeline<Vec<T>>
    where
        K: Eq + Hash + Clone + Send + 'static,
        F: Fn(&T) -> OpResult<K> + Send + Sync + 'static,
    {
        let by = Arc::new(by);
        let upstream = self.materialize;
        Pipeline {
            materialize: Arc::new(move || {
                let upstream_iter = upstream()?;
                let b = Arc::clone(&by);
                Ok(Box::new(Batch::new(upstream_iter, size, interval, move |v: &T| b(v), system_clock())) as BoxIter<Vec<T>>)
            }),
        }
    }

    /// `batch`: the unkeyed tumbling-batch convenience — a single open group
    /// at a time, closed by `size`, `interval`, or exhaustion.
    pub fn batch(self, size: BatchSize, interval: Interval) -> Pipeline<Vec<T>> {
        self.group_by(size, interval, |_: &T| Ok(()))
    }

    /// `flatten`: drains up to `concurrency` sub-iterables admitted via
    /// `open`, which obtains a sub-iterator from an upstream element (its
    /// "iter-initializer" — a failure here surfaces at that position without
    /// consuming upstream further than the concurrency budget allows).
    pub fn flatten<V, O>(self, concurrency: Concurrency, open: O) -> Pipeline<V>
    where
        O: Fn(T) -> Result<BoxIter<V>, StreamError> + Send + Sync + 'static,
        V: Send + 'static,
    {
        let open: Arc<dyn Fn(T) -> Result<BoxIter<V>, StreamError> + Send + Sync> = Arc::new(open);
        let upstream = self.materialize;
        Pipeline {
            materialize: Arc::new(move || {
                let upstream_iter = upstream()?;
                let o = Arc::clone(&open);
                if concurrency.get() == 1 {
                    Ok(Box::new(FlattenSequential::new(upstream_iter, o)) as BoxIter<V>)
                } else {
                    Ok(Box::new(FlattenConcurrent::new(upstream_iter, o, concurrency.get())) as BoxIter<V>)
                }
            }),
        }
    }

    /// `flatten` convenience for the common case where each upstream element
    /// is itself an ordinary iterable (no fallible iter-initializer needed).
    pub fn flatten_iterables<V>(self, concurrency: Concurrency) -> Pipeline<V>
    where
        T: IntoIterator<Item = V> + Send + 'static,
        T::IntoIter: Send + 'static,
        V: Send + 'static,
    {
        self.flatten(concurrency, |t: T| Ok(Box::new(t.into_iter().map(Ok)) as BoxIter<V>))
    }

    /// `chain`: concatenates `self` followed by `other`, in order.
    pub fn chain_with(self, other: Pipeline<T>) -> Pipeline<T> {
        Pipeline::chain(vec![self, other])
    }

    /// `chain`: concatenates any number of pipelines, in the order given.
    pub fn chain(streams: Vec<Pipeline<T>>) -> Pipeline<T> {
        Pipeline {
            materialize: Arc::new(move || {
                let boxed: Result<Vec<Box<dyn Iterator<Item = Item<T>> + Send>>, StreamError> = streams.iter().map(Pipeline::iter).collect();
                Ok(Box::new(Chain::new(boxed?)) as BoxIter<T>)
            }),
        }
    }

    /// Drains the materialized iterator, discarding values, and reports how
    /// many elements were consumed (successes and in-position errors alike)
    /// plus the last error observed, if any.
    pub fn run_count(&self) -> Result<(usize, Option<StreamError>), StreamError> {
        let iter = self.iter()?;
        Ok(drain_count(iter))
    }
}

fn drain_count<T>(iter: BoxIter<T>) -> (usize, Option<StreamError>) {
    let mut count = 0;
    let mut last_err = None;
    for item in iter {
        count += 1;
        if let Err(e) = item {
            last_err = Some(e);
        }
    }
    (count, last_err)
}
