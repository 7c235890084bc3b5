//! Settings holder
//!
//! One process-wide `Settings`, built on first use from whichever thread asks
//! first, plus a fallible variant whose first load fails.

use lone::{singleton, TryLazySingleton};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[derive(Debug)]
struct Settings {
    workers: usize,
    name: String,
}

static LOADS: AtomicUsize = AtomicUsize::new(0);

singleton! {
    fn settings() -> Settings = {
        LOADS.fetch_add(1, Ordering::SeqCst);
        println!("  Loading settings...");
        Settings { workers: 4, name: "holder".to_owned() }
    };
}

fn main() {
    println!("Settings Holder");
    println!("===============");

    println!("\n1. Concurrent first access:");
    thread::scope(|s| {
        for i in 0..4 {
            s.spawn(move || {
                let settings = settings();
                println!("  thread {i} sees {:p} ({})", settings, settings.name);
            });
        }
    });
    println!("  Loads: {}", LOADS.load(Ordering::SeqCst));

    println!("\n2. Fallible recipe:");
    let attempts = AtomicUsize::new(0);
    let workers = TryLazySingleton::new(|| {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Err("config file not mounted yet")
        } else {
            Ok(settings().workers * 2)
        }
    });

    match workers.get() {
        Ok(n) => println!("  workers: {n}"),
        Err(e) => println!("  first attempt failed: {e}"),
    }
    match workers.get() {
        Ok(n) => println!("  workers after retry: {n}"),
        Err(e) => println!("  retry failed: {e}"),
    }
    println!("  Attempts: {}", attempts.load(Ordering::SeqCst));
    println!("  Settings: {:?}", settings());
}
