//! Exhaustive interleaving checks of the double-checked publish.
//!
//! Run with `RUSTFLAGS="--cfg loom" cargo test --release --test loom_lazy_singleton`.

#![cfg(loom)]

use lone::{LazySingleton, State, TryLazySingleton};
use loom::sync::atomic::{AtomicUsize, Ordering};
use loom::sync::Arc;
use loom::thread;

struct Pair {
    left: u64,
    right: u64,
}

#[test]
fn loom_racing_getters_build_once() {
    loom::model(|| {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let lazy = Arc::new(LazySingleton::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Pair { left: 1, right: 2 }
        }));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let lazy = lazy.clone();
                thread::spawn(move || {
                    let pair = lazy.get();
                    (pair.left, pair.right)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), (1, 2));
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn loom_fast_path_reader_sees_whole_value() {
    loom::model(|| {
        let lazy = Arc::new(LazySingleton::new(|| Pair { left: 7, right: 9 }));

        let reader = {
            let lazy = lazy.clone();
            thread::spawn(move || {
                if let Some(pair) = lazy.get_if_initialized() {
                    assert_eq!((pair.left, pair.right), (7, 9));
                }
            })
        };

        let pair = lazy.get();
        assert_eq!((pair.left, pair.right), (7, 9));
        reader.join().unwrap();
        assert_eq!(lazy.state(), State::Set);
    });
}

#[test]
fn loom_failure_leaves_slot_for_next_caller() {
    loom::model(|| {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let lazy = Arc::new(TryLazySingleton::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("first attempt fails")
            } else {
                Ok(5u32)
            }
        }));

        let other = {
            let lazy = lazy.clone();
            thread::spawn(move || lazy.get().ok().copied())
        };

        let mine = lazy.get().ok().copied();
        let theirs = other.join().unwrap();

        // One caller saw the failure, the other built the value.
        let mut outcomes = [mine, theirs];
        outcomes.sort();
        assert_eq!(outcomes, [None, Some(5)]);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    });
}
