//! Integration tests: retry engine against the real clock and threads.
//!
//! Covers cancellation from another thread, deadline tokens, and the public
//! `retry` / `retry_with_cancel` entry points end to end.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rebound_core::retry::ManualClock;
use rebound_core::{
    retry, retry_with_cancel, AttemptError, CancelToken, RetryError, RetryOptions, Retrier,
    Termination,
};

fn fast(max_attempts: u32) -> RetryOptions {
    RetryOptions::builder()
        .max_attempts(max_attempts)
        .period(Duration::from_millis(1))
        .backoff_factor(1.0)
        .build()
        .unwrap()
}

#[test]
fn retry_eventually_succeeds_with_real_clock() {
    let mut calls = 0;
    let res = retry(
        || {
            calls += 1;
            if calls < 3 {
                Err(std::io::Error::other("flaky"))
            } else {
                Ok(())
            }
        },
        &fast(5),
    );
    assert!(res.succeeded());
    assert_eq!(calls, 3);
    assert_eq!(res.errors().len(), 2);
    assert!(res.into_result().is_ok());
}

#[test]
fn panicking_work_never_unwinds_out_of_retry() {
    let res = retry(|| -> Result<(), String> { panic!("for retry") }, &fast(3));
    assert!(!res.succeeded());
    assert_eq!(res.attempts(), 3);
    assert!(res.errors().iter().all(AttemptError::is_panic));
    assert_eq!(
        res.latest(),
        Some(&AttemptError::Panicked("for retry".to_string()))
    );
}

#[test]
fn latest_only_with_panics_keeps_one_error() {
    let options = RetryOptions::builder()
        .max_attempts(3)
        .period(Duration::from_millis(1))
        .return_latest_only(true)
        .build()
        .unwrap();
    let res = retry(|| -> Result<(), String> { panic!("panic") }, &options);
    assert_eq!(res.errors().len(), 1);
    assert_eq!(res.termination(), Termination::Exhausted);
    match res.into_result() {
        Err(RetryError::Exhausted { attempts, errors }) => {
            assert_eq!(attempts, 3);
            assert_eq!(errors.len(), 1);
        }
        other => panic!("expected exhausted, got {:?}", other),
    }
}

#[test]
fn cancel_from_other_thread_interrupts_long_wait() {
    let token = CancelToken::new();
    let remote = token.clone();
    let options = RetryOptions::builder()
        .max_attempts(10)
        .period(Duration::from_secs(60))
        .build()
        .unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let counted = Arc::clone(&calls);

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.cancel();
    });

    let start = Instant::now();
    let res = retry_with_cancel(
        &token,
        |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("unavailable")
        },
        &options,
    );
    canceller.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(30));
    assert_eq!(res.termination(), Termination::Cancelled);
    assert!(!res.succeeded());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(res.errors().len(), 1);
}

#[test]
fn deadline_token_acts_as_timeout() {
    let token = CancelToken::with_timeout(Duration::from_millis(100));
    let options = RetryOptions::builder()
        .max_attempts(1_000)
        .period(Duration::from_millis(10))
        .backoff_factor(1.0)
        .build()
        .unwrap();
    let mut calls = 0u32;
    let res = retry_with_cancel(
        &token,
        |_| {
            calls += 1;
            Err::<(), _>("still down")
        },
        &options,
    );
    assert_eq!(res.termination(), Termination::Cancelled);
    assert!(calls >= 1);
    assert!(calls < 1_000);
    assert_eq!(res.errors().len() as u32, calls);
}

#[test]
fn work_observes_its_token_and_can_bail_out() {
    let token = CancelToken::new();
    let remote = token.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        remote.cancel();
    });
    let res = retry_with_cancel(
        &token,
        |t| {
            // Long-running work that chooses to honour cancellation.
            match t.wait_timeout(Duration::from_secs(60)) {
                rebound_core::retry::WaitOutcome::Cancelled => Err("interrupted"),
                rebound_core::retry::WaitOutcome::TimedOut => Ok(()),
            }
        },
        &fast(5),
    );
    canceller.join().unwrap();
    assert_eq!(res.termination(), Termination::Cancelled);
    assert_eq!(res.errors(), &[AttemptError::Failed("interrupted")]);
}

#[test]
fn default_schedule_on_virtual_clock() {
    let clock = ManualClock::new();
    let res = Retrier::new(RetryOptions::default())
        .with_clock(&clock)
        .run(|| Err::<(), _>("fake error"));
    assert_eq!(res.attempts(), 5);
    assert_eq!(
        clock.waits(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(150),
            Duration::from_millis(225),
            Duration::from_micros(337_500),
        ]
    );
}
