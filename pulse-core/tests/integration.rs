//! Integration Tests for Reactive System
//!
//! These tests verify that signals, computeds, effects and batches work
//! together correctly through the public API only.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pulse_core::handlers::{bind, Resource, ResourceConfig};
use pulse_core::{
    action, batch, cleanup, computed, effect, is_tracking, signal, untracked, with_reversion,
    Cleanup, Readable,
};

fn spy() -> (Arc<AtomicI32>, Arc<AtomicI32>) {
    let count = Arc::new(AtomicI32::new(0));
    (count.clone(), count)
}

/// A write outside any batch reaches an effect through a computed once.
#[test]
fn write_propagates_through_computed() {
    let s = signal(0);
    let s1 = s.clone();
    let d = computed(move || s1.get() * 2);

    let (calls, calls_clone) = spy();
    let last = Arc::new(AtomicI32::new(-1));
    let (d1, last_clone) = (d.clone(), last.clone());
    let _effect = effect(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        last_clone.store(d1.get(), Ordering::SeqCst);
    });

    s.set(1);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(last.load(Ordering::SeqCst), 2);
    assert_eq!(d.get(), 2);
}

/// Several writes in one batch reach the effect once, with the final value.
#[test]
fn batch_coalesces_writes() {
    let s = signal(0);
    let s1 = s.clone();
    let d = computed(move || s1.get() * 2);

    let (calls, calls_clone) = spy();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (d1, seen_clone) = (d.clone(), seen.clone());
    let _effect = effect(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        seen_clone.lock().push(d1.get());
    });

    batch(|| {
        s.set(1);
        s.set(2);
        s.set(3);
    });

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*seen.lock(), vec![0, 6]);
    assert_eq!(d.get(), 6);
}

/// Two computeds over one signal are both settled before their shared
/// effect runs, batched or not.
#[test]
fn diamond_never_shows_mixed_values() {
    let price = signal(10);
    let (p1, p2) = (price.clone(), price.clone());
    let net = computed(move || p1.get());
    let gross = computed(move || p2.get() * 2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (n, g, seen_clone) = (net.clone(), gross.clone(), seen.clone());
    let _effect = effect(move || {
        let pair = (n.get(), g.get());
        seen_clone.lock().push(pair);
    });

    price.set(20);
    batch(|| {
        price.set(30);
        price.set(40);
    });

    assert_eq!(*seen.lock(), vec![(10, 20), (20, 40), (40, 80)]);
}

/// A failed task rolls both signals back in a single notification.
#[tokio::test]
async fn failed_task_reverts_state() {
    let a = signal(1);
    let b = signal(2);

    let (calls, calls_clone) = spy();
    let (a1, b1) = (a.clone(), b.clone());
    let observer = effect(move || {
        a1.get();
        b1.get();
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    let (a2, b2) = (a.clone(), b.clone());
    let result: Result<(), String> = with_reversion(&[&a, &b], async move {
        a2.set(5);
        b2.set(6);
        Err("server said no".to_string())
    })
    .await;

    assert_eq!(result, Err("server said no".to_string()));
    assert_eq!(a.peek(), 1);
    assert_eq!(b.peek(), 2);
    // creation, a=5, b=6, then a single rollback run
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(observer.run_count(), 4);
}

/// Disposing twice is harmless and runs the cleanup at most once.
#[test]
fn double_dispose_runs_cleanup_once() {
    let plain = effect(|| {});
    plain.dispose();
    plain.dispose();
    assert!(plain.is_disposed());

    let (cleanups, cleanups_clone) = spy();
    let with_cleanup = effect(move || -> Cleanup {
        let c = cleanups_clone.clone();
        cleanup(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    });
    with_cleanup.dispose();
    with_cleanup.dispose();
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}

#[test]
fn peek_never_links_or_notifies() {
    let s = signal(1);
    let (calls, calls_clone) = spy();
    let s1 = s.clone();
    let e = effect(move || {
        s1.peek();
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(e.dependency_count(), 0);
    assert_eq!(s.subscriber_count(), 0);
    s.set(2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn equal_write_is_a_no_op() {
    let s = signal("same".to_string());
    let (calls, calls_clone) = spy();
    let _sub = s.subscribe(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    s.set("same".to_string());
    s.update(|value| value.clone());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(s.subscriber_count(), 1);
}

#[test]
fn computed_is_lazy_then_eager() {
    let s = signal(1);
    let (evaluations, evaluations_clone) = spy();
    let s1 = s.clone();
    let c = computed(move || {
        evaluations_clone.fetch_add(1, Ordering::SeqCst);
        s1.get() + 1
    });

    s.set(2);
    assert_eq!(evaluations.load(Ordering::SeqCst), 0);

    assert_eq!(c.get(), 3);
    assert_eq!(evaluations.load(Ordering::SeqCst), 1);

    // no readers, still recomputes on change
    s.set(3);
    assert_eq!(evaluations.load(Ordering::SeqCst), 2);
    s.set(3);
    assert_eq!(evaluations.load(Ordering::SeqCst), 2);
}

#[test]
fn effect_prunes_untaken_branch() {
    let flag = signal(true);
    let a = signal(0);
    let b = signal(0);

    let (calls, calls_clone) = spy();
    let (f1, a1, b1) = (flag.clone(), a.clone(), b.clone());
    let _effect = effect(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        if f1.get() {
            a1.get();
        } else {
            b1.get();
        }
    });

    flag.set(false);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    a.set(1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    b.set(1);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn disposed_effect_never_runs_again() {
    let s = signal(0);
    let (calls, calls_clone) = spy();
    let s1 = s.clone();
    let e = effect(move || {
        s1.get();
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    e.dispose();
    s.set(1);
    batch(|| s.set(2));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(s.subscriber_count(), 0);
}

#[test]
fn action_batches_and_untracked_hides_reads() {
    let first = signal("Ada".to_string());
    let last = signal("Lovelace".to_string());

    let (calls, calls_clone) = spy();
    let (f1, l1) = (first.clone(), last.clone());
    let _effect = effect(move || {
        f1.get();
        untracked(|| {
            assert!(!is_tracking());
            l1.get();
        });
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    let (f2, l2) = (first.clone(), last.clone());
    let rename = action(move |(given, family): (String, String)| {
        f2.set(given);
        l2.set(family);
    });

    rename(("Grace".to_string(), "Hopper".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // only `last` changed, and it was read untracked
    last.set("Murray".to_string());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn readonly_view_follows_source() {
    let s = signal(1);
    let view = s.as_readonly();
    let rendered = Arc::new(AtomicI32::new(0));

    let r = rendered.clone();
    let _binding = bind(view.clone(), move |value: i32| r.store(value, Ordering::SeqCst));

    s.set(7);
    assert_eq!(view.peek(), 7);
    assert_eq!(Readable::get(&view), 7);
    assert_eq!(rendered.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn resource_drives_effects() {
    let users = Resource::new(ResourceConfig::new(|| async {
        Ok::<_, String>(vec!["ada".to_string(), "grace".to_string()])
    }));

    let (loading_runs, loading_clone) = spy();
    let loading = users.loading();
    let _effect = effect(move || {
        loading.get();
        loading_clone.fetch_add(1, Ordering::SeqCst);
    });

    users.refetch().await;

    assert_eq!(users.data().peek().map(|names| names.len()), Some(2));
    // creation, loading=true, loading=false
    assert_eq!(loading_runs.load(Ordering::SeqCst), 3);
}
