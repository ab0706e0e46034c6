//! Integration tests for core-async on native platforms.
//!
//! These tests drive the combinators from spawned tasks so values really do
//! arrive from independent producers.

use core_async::stream::{combine_latest, watch_stream, ReactiveStreamExt};
use core_async::{sync, task};
use futures::StreamExt;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[tokio::test]
async fn test_watch_sources_combine_across_tasks() {
    let (progress_tx, progress_rx) = sync::watch::channel(0u8);
    let (flag_tx, flag_rx) = sync::watch::channel(false);

    let progress = watch_stream(progress_rx).map(Ok::<_, ()>);
    let flag = watch_stream(flag_rx).map(Ok::<_, ()>);
    let mut merged = combine_latest(progress, flag).dedup();

    assert_eq!(merged.next().await, Some(Ok((0, false))));

    let producer = task::spawn(async move {
        flag_tx.send(true).unwrap();
        flag_tx
    });
    let flag_tx = producer.await.unwrap();
    assert_eq!(merged.next().await, Some(Ok((0, true))));

    progress_tx.send(40).unwrap();
    assert_eq!(merged.next().await, Some(Ok((40, true))));

    drop(progress_tx);
    drop(flag_tx);
    assert_eq!(merged.next().await, None);
}

#[tokio::test]
async fn test_watch_stream_coalesces_rapid_updates() {
    let (tx, rx) = sync::watch::channel(0);
    let mut values = watch_stream(rx);

    assert_eq!(values.next().await, Some(0));

    for i in 1..=5 {
        tx.send(i).unwrap();
    }

    assert_eq!(values.next().await, Some(5));
}

#[tokio::test]
async fn test_rwlock() {
    let lock = sync::RwLock::new(vec![1, 2, 3]);
    {
        let read = lock.read().await;
        assert_eq!(read.len(), 3);
    }
    lock.write().await.push(4);
    assert_eq!(lock.read().await.len(), 4);
}
