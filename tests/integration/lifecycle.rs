//! Chain lifecycle integration tests.
//!
//! Covers the invocation-count contract: a once chain fires exactly once
//! and no earlier than its interval, finite chains fire exactly N times,
//! unlimited chains tick until cancelled, and cancellation never
//! interrupts an in-flight invocation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use recur::testing::CallbackProbe;
use recur::Timer;

#[tokio::test]
async fn test_once_chain_fires_exactly_once_after_interval() {
    let timer = Timer::new();
    let probe = CallbackProbe::new();

    let _handle = timer
        .start(probe.callback(), Duration::from_millis(50), Timer::ONCE)
        .unwrap();

    // Nothing may fire before the interval elapses.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(probe.count(), 0);

    probe.wait_for_count(1, Duration::from_secs(1)).await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(probe.count(), 1);
}

#[tokio::test]
async fn test_cancel_before_first_fire_yields_zero_invocations() {
    let timer = Timer::new();
    let probe = CallbackProbe::new();

    let handle = timer
        .start(probe.callback(), Duration::from_millis(50), Timer::ONCE)
        .unwrap();
    timer.cancel(&handle);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(probe.count(), 0);
}

#[tokio::test]
async fn test_zero_interval_finite_chain_fires_n_times() {
    let timer = Timer::new();
    let probe = CallbackProbe::new();

    let _handle = timer
        .start(probe.callback(), Duration::ZERO, 2)
        .unwrap();

    probe.wait_for_count(2, Duration::from_secs(1)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(probe.count(), 2);
}

#[tokio::test]
async fn test_finite_chain_invocations_are_separated_by_interval() {
    let timer = Timer::new();
    let interval = Duration::from_millis(20);
    let timestamps: Arc<Mutex<Vec<tokio::time::Instant>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&timestamps);

    let _handle = timer
        .start(
            move |_signal| {
                recorder.lock().unwrap().push(tokio::time::Instant::now());
                std::future::ready(())
            },
            interval,
            3,
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    let recorded = timestamps.lock().unwrap().clone();
    assert_eq!(recorded.len(), 3);
    for pair in recorded.windows(2) {
        assert!(
            pair[1] - pair[0] >= interval,
            "invocations closer than the interval: {:?}",
            pair[1] - pair[0]
        );
    }
}

#[tokio::test]
async fn test_unlimited_chain_ticks_until_cancelled() {
    let timer = Timer::new();
    let probe = CallbackProbe::new();

    let handle = timer
        .start(
            probe.callback(),
            Duration::from_millis(5),
            Timer::UNLIMITED_RECURRENCE,
        )
        .unwrap();

    probe.wait_for_count(3, Duration::from_secs(1)).await;
    timer.cancel(&handle);

    // Any invocation already past its wait boundary may still land, but
    // after that the count must stop increasing.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = probe.count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(probe.count(), settled);
    assert!(settled >= 3);
}

#[tokio::test]
async fn test_cancel_never_interrupts_in_flight_invocation() {
    let timer = Timer::new();
    let probe = CallbackProbe::new();

    let handle = timer
        .start(
            probe.slow_callback(Duration::from_millis(60)),
            Duration::from_millis(1),
            Timer::UNLIMITED_RECURRENCE,
        )
        .unwrap();

    // Cancel while the first invocation body is still running.
    tokio::time::sleep(Duration::from_millis(20)).await;
    timer.cancel(&handle);

    // The in-flight body runs to completion; no further invocations start.
    probe.wait_for_count(1, Duration::from_secs(1)).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(probe.count(), 1);
}

#[tokio::test]
async fn test_disposed_handle_is_inert() {
    let timer = Timer::new();
    let probe = CallbackProbe::new();

    let handle = timer
        .start(probe.callback(), Duration::from_secs(3600), Timer::ONCE)
        .unwrap();
    handle.dispose();

    assert!(handle.is_disposed());
    assert!(!handle.try_cancel());
    // Repeated disposal is a safe no-op.
    handle.dispose();
    assert!(!timer.is_tracked(&handle));
}

#[tokio::test]
async fn test_callback_can_observe_cancellation_mid_body() {
    let timer = Timer::new();
    let probe = CallbackProbe::new();

    let handle = timer
        .start(
            probe.callback(),
            Duration::from_millis(5),
            Timer::UNLIMITED_RECURRENCE,
        )
        .unwrap();

    probe.wait_for_count(1, Duration::from_secs(1)).await;
    assert!(!probe.observed_cancelled());
    timer.cancel(&handle);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Once cancelled, any invocation that still landed saw a set signal;
    // either way the probe never reports a set signal before the cancel.
    assert!(handle.is_cancelled());
}
