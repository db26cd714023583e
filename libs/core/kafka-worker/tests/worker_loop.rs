//! Consumer loop behaviour against a scripted in-memory queue.

use async_trait::async_trait;
use kafka_worker::{KafkaConfig, MessageSource, ProcessError, Processor, QueueMessage, Worker, WorkerError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Queue that hands out scripted results, then blocks forever once empty.
#[derive(Clone, Default)]
struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Result<QueueMessage, WorkerError>>>>,
    committed: Arc<Mutex<Vec<i64>>>,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn with_messages(offsets: impl IntoIterator<Item = i64>) -> Self {
        let source = Self::default();
        for offset in offsets {
            source.push(Ok(message(offset)));
        }
        source
    }

    fn push(&self, item: Result<QueueMessage, WorkerError>) {
        self.script.lock().unwrap().push_back(item);
    }

    fn committed(&self) -> Vec<i64> {
        self.committed.lock().unwrap().clone()
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn fetch_one(&self) -> Result<QueueMessage, WorkerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(item) => item,
            None => std::future::pending().await,
        }
    }

    async fn commit(&self, message: &QueueMessage) -> Result<(), WorkerError> {
        self.committed.lock().unwrap().push(message.offset);
        Ok(())
    }
}

/// Records the order messages were processed in.
#[derive(Clone, Default)]
struct RecordingProcessor {
    seen: Arc<Mutex<Vec<i64>>>,
}

#[async_trait]
impl Processor for RecordingProcessor {
    async fn process(&self, message: &QueueMessage, _shutdown: watch::Receiver<bool>) -> Result<(), ProcessError> {
        self.seen.lock().unwrap().push(message.offset);
        if message.offset % 2 == 0 {
            Ok(())
        } else {
            Err(ProcessError::permanent("odd offsets are rejected"))
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Blocks until shutdown, then reports cancellation.
struct StallingProcessor;

#[async_trait]
impl Processor for StallingProcessor {
    async fn process(&self, _message: &QueueMessage, mut shutdown: watch::Receiver<bool>) -> Result<(), ProcessError> {
        kafka_worker::shutdown_requested(&mut shutdown).await;
        Err(ProcessError::Canceled)
    }

    fn name(&self) -> &'static str {
        "stalling"
    }
}

fn message(offset: i64) -> QueueMessage {
    QueueMessage::new("postback", 0, offset, format!("GET,http://h/{offset}").into_bytes())
}

fn config() -> KafkaConfig {
    KafkaConfig::default().with_fetch_failure_threshold(4)
}

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_messages_are_processed_and_committed_in_fetch_order() {
    let source = ScriptedSource::with_messages(0..5);
    let processor = RecordingProcessor::default();
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(Worker::new(source.clone(), processor.clone(), &config()).run(rx));

    let watched = source.clone();
    wait_until(move || watched.committed().len() == 5).await;
    tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should stop")
        .unwrap();

    assert!(result.is_ok());
    assert_eq!(*processor.seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(source.committed(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_shutdown_interrupts_blocking_fetch() {
    let source = ScriptedSource::default();
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(Worker::new(source.clone(), RecordingProcessor::default(), &config()).run(rx));

    let watched = source.clone();
    wait_until(move || watched.fetches() == 1).await;
    tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("blocked fetch must not delay shutdown")
        .unwrap();

    assert!(result.is_ok());
    assert!(source.committed().is_empty());
}

#[tokio::test]
async fn test_cancellation_during_processing_leaves_message_uncommitted() {
    let source = ScriptedSource::with_messages([10, 11]);
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(Worker::new(source.clone(), StallingProcessor, &config()).run(rx));

    let watched = source.clone();
    wait_until(move || watched.fetches() == 1).await;
    tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should stop")
        .unwrap();

    assert!(result.is_ok());
    assert!(source.committed().is_empty());
    assert_eq!(source.fetches(), 1, "no further fetch after cancellation");
}

#[tokio::test]
async fn test_interleaved_fetch_failures_below_threshold_do_not_abort() {
    let source = ScriptedSource::default();
    source.push(Err(WorkerError::fetch("timeout")));
    source.push(Err(WorkerError::fetch("timeout")));
    source.push(Ok(message(1)));
    source.push(Err(WorkerError::fetch("timeout")));
    source.push(Err(WorkerError::fetch("timeout")));
    source.push(Err(WorkerError::fetch("timeout")));
    source.push(Ok(message(2)));
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(Worker::new(source.clone(), RecordingProcessor::default(), &config()).run(rx));

    let watched = source.clone();
    wait_until(move || watched.committed().len() == 2).await;
    tx.send(true).unwrap();

    let result = handle.await.unwrap();
    assert!(result.is_ok());
    assert_eq!(source.committed(), vec![1, 2]);
}

#[tokio::test]
async fn test_consecutive_fetch_failures_abort_at_threshold() {
    let source = ScriptedSource::default();
    for _ in 0..10 {
        source.push(Err(WorkerError::fetch("broker down")));
    }
    let (_tx, rx) = watch::channel(false);

    let result = Worker::new(source.clone(), RecordingProcessor::default(), &config())
        .run(rx)
        .await;

    assert!(matches!(result, Err(WorkerError::FetchThresholdExceeded { failures: 4, .. })));
    assert_eq!(source.fetches(), 4);
}

/// Requests shutdown from inside the fetch, then delivers the message anyway.
struct ShutdownOnFetchSource {
    shutdown: watch::Sender<bool>,
    committed: Arc<Mutex<Vec<i64>>>,
}

#[async_trait]
impl MessageSource for ShutdownOnFetchSource {
    async fn fetch_one(&self) -> Result<QueueMessage, WorkerError> {
        self.shutdown.send_replace(true);
        Ok(message(7))
    }

    async fn commit(&self, message: &QueueMessage) -> Result<(), WorkerError> {
        self.committed.lock().unwrap().push(message.offset);
        Ok(())
    }
}

#[tokio::test]
async fn test_shutdown_observed_after_fetch_skips_processing_and_commit() {
    let (tx, rx) = watch::channel(false);
    let committed = Arc::new(Mutex::new(Vec::new()));
    let source = ShutdownOnFetchSource {
        shutdown: tx,
        committed: Arc::clone(&committed),
    };
    let processor = RecordingProcessor::default();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        Worker::new(source, processor.clone(), &config()).run(rx),
    )
    .await
    .expect("worker should stop");

    assert!(result.is_ok());
    assert!(processor.seen.lock().unwrap().is_empty());
    assert!(committed.lock().unwrap().is_empty());
}
