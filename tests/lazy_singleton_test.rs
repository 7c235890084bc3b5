#![cfg(not(loom))]

use lone::{LazySingleton, State};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_get_returns_identical_instance() {
    let lazy = LazySingleton::new(|| String::from("only one"));
    let a = lazy.get();
    let b = lazy.get();
    assert!(std::ptr::eq(a, b));
    assert!(std::ptr::eq(a, &*lazy));
}

#[test]
fn test_instance_type_comes_from_recipe() {
    // No annotations: `T` is fixed by the closure's return type alone, even
    // when the first call made is one that never runs the recipe.
    let lazy = LazySingleton::new(|| vec![1u8, 2, 3]);
    assert!(lazy.get_if_initialized().is_none());
    assert_eq!(lazy.state(), State::Unset);

    let by_fn = LazySingleton::new(LateField::build);
    assert!(!by_fn.is_initialized());
    assert_eq!(by_fn.marker, MARKER);
}

#[test]
fn test_nothing_built_before_first_get() {
    let builds = AtomicUsize::new(0);
    let lazy = LazySingleton::new(|| builds.fetch_add(1, Ordering::SeqCst));

    assert_eq!(lazy.state(), State::Unset);
    assert!(!lazy.is_initialized());
    assert_eq!(lazy.get_if_initialized(), None);
    assert_eq!(builds.load(Ordering::SeqCst), 0);

    assert_eq!(*lazy.get(), 0);
    assert_eq!(lazy.state(), State::Set);
    assert_eq!(lazy.get_if_initialized(), Some(&0));
}

#[test]
fn test_single_construction_under_race() {
    const THREADS: usize = 64;

    let builds = AtomicUsize::new(0);
    let lazy = LazySingleton::new(|| {
        builds.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which other callers arrive mid-construction.
        thread::sleep(Duration::from_millis(20));
        vec![0u8; 64]
    });
    let barrier = Barrier::new(THREADS);

    let addresses: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    lazy.get() as *const Vec<u8> as usize
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(addresses.iter().all(|&addr| addr == addresses[0]));
}

#[test]
fn test_sequential_access_is_idempotent() {
    let builds = AtomicUsize::new(0);
    let lazy = LazySingleton::new(|| {
        builds.fetch_add(1, Ordering::SeqCst);
        Box::new(42u64)
    });

    let first: *const Box<u64> = lazy.get();
    for _ in 0..1000 {
        assert!(std::ptr::eq(first, lazy.get()));
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

const MARKER: u64 = 0xDEAD_BEEF;

struct LateField {
    payload: Vec<u64>,
    marker: u64,
}

impl LateField {
    fn build() -> Self {
        let mut value = LateField {
            payload: Vec::new(),
            marker: 0,
        };
        value.payload = (0..4096).collect();
        thread::yield_now();
        // Set last, so a reader that sees the slot early would read zero.
        value.marker = MARKER;
        value
    }
}

#[test]
fn test_readers_never_observe_partial_instance() {
    const THREADS: usize = 32;

    for _ in 0..20 {
        let lazy = LazySingleton::new(LateField::build);
        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    loop {
                        // Spin on the lock-free path as well as the blocking one.
                        if let Some(value) = lazy.get_if_initialized() {
                            assert_eq!(value.marker, MARKER);
                            assert_eq!(value.payload.len(), 4096);
                            assert_eq!(value.payload[4095], 4095);
                            break;
                        }
                        if lazy.state() == State::Unset {
                            let value = lazy.get();
                            assert_eq!(value.marker, MARKER);
                        }
                    }
                });
            }
        });
    }
}

#[derive(Debug)]
struct Stamped {
    created_at: u64,
}

#[test]
fn test_concurrent_callers_share_creation_tick() {
    const CALLERS: usize = 100;

    let clock = AtomicU64::new(1);
    let lazy = LazySingleton::new(|| Stamped {
        created_at: clock.fetch_add(1, Ordering::SeqCst),
    });
    let barrier = Barrier::new(CALLERS);

    let ticks: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    lazy.get().created_at
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(ticks.len(), CALLERS);
    assert!(ticks.iter().all(|&tick| tick == 1));
    assert_eq!(clock.load(Ordering::SeqCst), 2);
}

#[test]
fn test_panicking_recipe_can_be_retried() {
    let attempts = AtomicUsize::new(0);
    let lazy = LazySingleton::new(|| {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first construction fails");
        }
        "second time lucky"
    });

    let first = panic::catch_unwind(AssertUnwindSafe(|| *lazy.get()));
    assert!(first.is_err());
    assert_eq!(lazy.state(), State::Unset);

    assert_eq!(*lazy.get(), "second time lucky");
    assert_eq!(*lazy.get(), "second time lucky");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_waiters_take_over_after_winner_panics() {
    const THREADS: usize = 8;

    let attempts = AtomicUsize::new(0);
    let lazy = LazySingleton::new(|| {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        if attempt == 0 {
            panic!("winner fails");
        }
        attempt
    });
    let barrier = Barrier::new(THREADS);

    let outcomes: Vec<Option<usize>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    panic::catch_unwind(AssertUnwindSafe(|| *lazy.get())).ok()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // Exactly one caller saw the panic; everyone else got the retry's value.
    assert_eq!(outcomes.iter().filter(|o| o.is_none()).count(), 1);
    assert!(outcomes.iter().flatten().all(|&v| v == 1));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_state_is_constructing_while_recipe_runs() {
    let entered = AtomicBool::new(false);
    let release = Mutex::new(());
    let held = release.lock().unwrap();

    let lazy = LazySingleton::new(|| {
        entered.store(true, Ordering::SeqCst);
        let _wait = release.lock().unwrap();
        7u32
    });

    thread::scope(|s| {
        let builder = s.spawn(|| *lazy.get());

        while !entered.load(Ordering::SeqCst) {
            thread::yield_now();
        }
        assert_eq!(lazy.state(), State::Constructing);
        assert_eq!(lazy.get_if_initialized(), None);

        drop(held);
        assert_eq!(builder.join().unwrap(), 7);
    });

    assert_eq!(lazy.state(), State::Set);
}

/// Consumers receive the owner by reference instead of reaching for a global.
struct Service<'a> {
    config: &'a LazySingleton<Vec<String>>,
}

impl Service<'_> {
    fn first_key(&self) -> &str {
        &self.config.get()[0]
    }
}

#[test]
fn test_explicit_owner_shared_by_reference() {
    let config: LazySingleton<Vec<String>> =
        LazySingleton::new(|| vec!["listen".to_owned(), "port".to_owned()]);
    let a = Service { config: &config };
    let b = Service { config: &config };

    assert!(std::ptr::eq(a.first_key(), b.first_key()));
    assert_eq!(config.into_inner().map(|v| v.len()), Some(2));
}

#[test]
fn test_default_uses_type_default() {
    let lazy: LazySingleton<Vec<u8>> = LazySingleton::default();
    assert!(lazy.get().is_empty());
    assert_eq!(format!("{lazy:?}"), "LazySingleton { slot: OnceSlot([]), .. }");
}

static PROCESS_WIDE: LazySingleton<AtomicUsize> = LazySingleton::new(|| AtomicUsize::new(100));

#[test]
fn test_static_singleton_is_shared_across_threads() {
    thread::scope(|s| {
        for _ in 0..10 {
            s.spawn(|| {
                PROCESS_WIDE.fetch_add(1, Ordering::SeqCst);
            });
        }
    });
    assert_eq!(PROCESS_WIDE.load(Ordering::SeqCst), 110);
}
