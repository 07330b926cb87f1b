//! Bounded packet queue between the import worker and the pipeline
//!
//! The worker side pushes records through [`PacketSink`]; when the queue is full the push
//! blocks, which throttles file reads to the speed of the consumer. The consumer side,
//! [`PacketStream`], can be polled without blocking ([`PacketStream::poll`]) or iterated
//! with blocking semantics.
//!
//! Records are delivered in FIFO order, which is the order of frames in the file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{
    self, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError,
};
use tracing::warn;

use crate::error::ImportOutcome;
use crate::source::CaptureSource;

/// Default number of queue slots
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default delay between two cancellation checks of a producer blocked on a full queue
pub const DEFAULT_PUSH_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Cooperative cancellation flag, checked by the worker at every block boundary
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Create the two ends of a packet queue for `source`
pub fn packet_queue<T>(
    capacity: usize,
    source: Arc<CaptureSource>,
    cancel: CancelToken,
    poll_interval: Duration,
) -> (PacketSink<T>, PacketStream<T>) {
    let (sender, receiver) = channel::bounded(capacity.max(1));
    let sink = PacketSink {
        sender,
        cancel: cancel.clone(),
        poll_interval,
    };
    let stream = PacketStream {
        receiver,
        source,
        cancel,
        worker: None,
    };
    (sink, stream)
}

/// Producer end of the queue, handed to packet handlers
pub struct PacketSink<T> {
    sender: Sender<T>,
    cancel: CancelToken,
    poll_interval: Duration,
}

impl<T> Clone for PacketSink<T> {
    fn clone(&self) -> Self {
        PacketSink {
            sender: self.sender.clone(),
            cancel: self.cancel.clone(),
            poll_interval: self.poll_interval,
        }
    }
}

impl<T> PacketSink<T> {
    /// Queue a record, blocking while the queue is full
    ///
    /// Returns `false` if the record was dropped because the consumer went away or the
    /// import was cancelled.
    pub fn push(&self, record: T) -> bool {
        let mut record = record;
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            match self.sender.send_timeout(record, self.poll_interval) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(r)) => record = r,
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }

    /// Number of records waiting in the queue
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Result of a non-blocking poll
#[derive(Debug, PartialEq, Eq)]
pub enum Polled<T> {
    /// Nothing queued right now, but the import is still running
    Pending,
    Item(T),
    /// The import is complete and every record has been delivered
    Done,
}

impl<T> Polled<T> {
    pub fn into_item(self) -> Option<T> {
        match self {
            Polled::Item(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Polled::Done)
    }
}

/// Consumer end of the queue
///
/// Iterating blocks until the next record is available and ends once the import is
/// complete and the queue is drained. Dropping the stream cancels the import.
pub struct PacketStream<T> {
    receiver: Receiver<T>,
    source: Arc<CaptureSource>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl<T> PacketStream<T> {
    pub(crate) fn set_worker(&mut self, worker: JoinHandle<()>) {
        self.worker = Some(worker);
    }

    /// True while records may still be delivered
    ///
    /// This does not mean a record is available now: [`poll`](PacketStream::poll) can
    /// still return [`Polled::Pending`].
    pub fn has_next(&self) -> bool {
        !(self.source.is_complete() && self.receiver.is_empty())
    }

    /// Take the next record without blocking
    pub fn poll(&self) -> Polled<T> {
        match self.receiver.try_recv() {
            Ok(t) => Polled::Item(t),
            Err(TryRecvError::Empty) => {
                if self.has_next() {
                    Polled::Pending
                } else {
                    Polled::Done
                }
            }
            Err(TryRecvError::Disconnected) => Polled::Done,
        }
    }

    /// Take the next record, waiting at most `timeout`
    pub fn poll_timeout(&self, timeout: Duration) -> Polled<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(t) => Polled::Item(t),
            Err(RecvTimeoutError::Timeout) => {
                if self.has_next() {
                    Polled::Pending
                } else {
                    Polled::Done
                }
            }
            Err(RecvTimeoutError::Disconnected) => Polled::Done,
        }
    }

    /// Number of records waiting in the queue
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Ask the worker to stop at the next block boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn source(&self) -> &Arc<CaptureSource> {
        &self.source
    }

    /// Final outcome, once the import is complete
    pub fn outcome(&self) -> Option<&ImportOutcome> {
        self.source.outcome()
    }

    /// Wait for the worker thread to exit
    ///
    /// The worker blocks while the queue is full, so the caller must drain the stream or
    /// [`cancel`](PacketStream::cancel) it first. Returns `false` if the worker panicked.
    pub fn join(&mut self) -> bool {
        match self.worker.take() {
            Some(handle) => match handle.join() {
                Ok(()) => true,
                Err(_) => {
                    warn!("Import worker for {} panicked", self.source.path().display());
                    false
                }
            },
            None => true,
        }
    }
}

impl<T> Iterator for PacketStream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

impl<T> Drop for PacketStream<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn queue(capacity: usize) -> (PacketSink<u32>, PacketStream<u32>, Arc<CaptureSource>) {
        let source = Arc::new(CaptureSource::new("test", 0));
        let (sink, stream) = packet_queue(
            capacity,
            source.clone(),
            CancelToken::new(),
            Duration::from_millis(5),
        );
        (sink, stream, source)
    }

    #[test]
    fn poll_distinguishes_pending_and_done() {
        let (sink, stream, source) = queue(4);
        assert_eq!(stream.poll(), Polled::Pending);
        assert!(sink.push(1));
        assert!(sink.push(2));
        assert_eq!(stream.poll(), Polled::Item(1));
        drop(sink);
        source.complete(ImportOutcome::Completed);
        assert!(stream.has_next());
        assert_eq!(stream.poll(), Polled::Item(2));
        assert!(!stream.has_next());
        assert_eq!(stream.poll(), Polled::Done);
    }

    #[test]
    fn blocking_iteration_preserves_order() {
        let (sink, stream, source) = queue(2);
        let producer = thread::spawn(move || {
            for i in 0..50 {
                assert!(sink.push(i));
            }
            source.complete(ImportOutcome::Completed);
        });
        let items: Vec<u32> = stream.collect();
        producer.join().expect("producer");
        assert_eq!(items, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn cancel_unblocks_full_queue() {
        let (sink, stream, _source) = queue(1);
        assert!(sink.push(1));
        let producer = thread::spawn(move || sink.push(2));
        stream.cancel();
        assert!(!producer.join().expect("producer"));
    }

    #[test]
    fn dropped_stream_rejects_records() {
        let (sink, stream, _source) = queue(1);
        drop(stream);
        assert!(sink.is_cancelled());
        assert!(!sink.push(1));
    }
}
