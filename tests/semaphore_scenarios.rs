//! Behavioural scenarios for both semaphore backends and the public handle
//!
//! Each scenario runs against every backend available on the host, plus once
//! through `Semaphore`, which uses whatever the process registry installed.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use dualsem::{Semaphore, WaitStatus};

// =============================================================================
// ROUND-TRIP AND POLLING
// =============================================================================

#[test]
fn test_initial_value_roundtrip() {
    for (name, make) in common::backends() {
        for initial in [0, 1, 17, 32 * 1024] {
            let sem = make(initial);
            assert_eq!(sem.value(), initial, "backend {}", name);
        }
    }
    assert_eq!(Semaphore::new(42).unwrap().value(), 42);
}

#[test]
fn test_three_polls_then_timeout() {
    for (name, make) in common::backends() {
        let sem = make(3);
        for _ in 0..3 {
            assert_eq!(sem.wait_timeout_ns(0).unwrap(), WaitStatus::Acquired, "backend {}", name);
        }
        assert_eq!(sem.wait_timeout_ns(0).unwrap(), WaitStatus::TimedOut, "backend {}", name);
        assert_eq!(sem.value(), 0, "backend {}", name);
    }
}

#[test]
fn test_poll_never_blocks() {
    for (name, make) in common::backends() {
        let sem = make(0);
        let start = Instant::now();
        for _ in 0..1000 {
            assert_eq!(sem.wait_timeout_ns(0).unwrap(), WaitStatus::TimedOut);
        }
        assert!(start.elapsed() < Duration::from_secs(1), "backend {} blocked on poll", name);
    }
}

// =============================================================================
// BLOCKING WAITS
// =============================================================================

#[test]
fn test_infinite_wait_returns_after_late_post() {
    for (name, make) in common::backends() {
        let sem = make(0);
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.wait_timeout_ns(-1).unwrap())
        };

        thread::sleep(Duration::from_millis(100));
        assert!(!waiter.is_finished(), "backend {} returned without a post", name);

        sem.post().unwrap();
        assert_eq!(waiter.join().unwrap(), WaitStatus::Acquired, "backend {}", name);
        assert_eq!(sem.value(), 0);
    }
}

#[test]
fn test_bounded_wait_times_out() {
    for (name, make) in common::backends() {
        let sem = make(0);
        let start = Instant::now();
        assert_eq!(sem.wait_timeout_ns(40_000_000).unwrap(), WaitStatus::TimedOut);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(35), "backend {} woke after {:?}", name, elapsed);
        assert!(elapsed < Duration::from_secs(2), "backend {} overslept: {:?}", name, elapsed);
    }
}

#[test]
fn test_one_post_releases_exactly_one_of_ten() {
    for (name, make) in common::backends() {
        let sem = make(0);
        let barrier = Arc::new(Barrier::new(11));

        let waiters: Vec<_> = (0..10)
            .map(|_| {
                let sem = Arc::clone(&sem);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let start = Instant::now();
                    let status = sem.wait_timeout_ns(50_000_000).unwrap();
                    (status, start.elapsed())
                })
            })
            .collect();

        barrier.wait();
        thread::sleep(Duration::from_millis(10));
        sem.post().unwrap();

        let results: Vec<_> = waiters.into_iter().map(|h| h.join().unwrap()).collect();
        let acquired = results.iter().filter(|(s, _)| *s == WaitStatus::Acquired).count();
        assert_eq!(acquired, 1, "backend {}", name);

        for (status, elapsed) in &results {
            if *status == WaitStatus::TimedOut {
                assert!(*elapsed >= Duration::from_millis(45), "backend {} timed out early: {:?}", name, elapsed);
            }
        }
        assert_eq!(sem.value(), 0, "backend {}", name);
    }
}

#[test]
fn test_successes_bounded_by_initial_plus_posts() {
    const INITIAL: u32 = 2;
    const POSTS: usize = 3;
    const WAITERS: usize = 8;

    for (name, make) in common::backends() {
        let sem = make(INITIAL);
        let acquired = Arc::new(AtomicUsize::new(0));

        let waiters: Vec<_> = (0..WAITERS)
            .map(|_| {
                let sem = Arc::clone(&sem);
                let acquired = Arc::clone(&acquired);
                thread::spawn(move || {
                    if sem.wait_timeout_ns(300_000_000).unwrap() == WaitStatus::Acquired {
                        acquired.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for _ in 0..POSTS {
            sem.post().unwrap();
        }
        for waiter in waiters {
            waiter.join().unwrap();
        }

        assert_eq!(acquired.load(Ordering::SeqCst), INITIAL as usize + POSTS, "backend {}", name);
        assert_eq!(sem.value(), 0, "backend {}", name);
    }
}

// =============================================================================
// PUBLIC HANDLE
// =============================================================================

#[test]
fn test_handle_shared_across_threads() {
    let sem = Arc::new(Semaphore::new(0).unwrap());
    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let sem = Arc::clone(&sem);
            thread::spawn(move || {
                for _ in 0..100 {
                    sem.wait().unwrap();
                }
            })
        })
        .collect();

    for _ in 0..400 {
        sem.post().unwrap();
    }
    for consumer in consumers {
        consumer.join().unwrap();
    }
    assert_eq!(sem.value(), 0);
}

#[test]
fn test_handles_created_later_share_backend() {
    let first = Semaphore::new(0).unwrap();
    let second = Semaphore::new(0).unwrap();
    assert_eq!(first.backend(), second.backend());
    assert_eq!(dualsem::active_backend(), Some(first.backend()));
}
