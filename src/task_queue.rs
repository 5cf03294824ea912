use std::sync::mpsc;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

/// A single-consumer, FIFO queue of closures that executes every
/// state-mutating `PeerConnection` operation in order (spec §4.1, §5).
///
/// Every embedder-facing operation enqueues a closure and returns; the
/// worker thread drains the queue strictly in enqueue order, so
/// re-entrant enqueues made from within a running closure always run
/// after the current one returns. There is no async runtime underneath
/// this core (see SPEC_FULL.md §5): the worker is a plain OS thread and
/// "awaiting a promise" is the caller blocking on a one-shot channel
/// that the enqueued closure replies through.
pub struct TaskQueue {
    sender: mpsc::Sender<Message>,
    worker: Option<thread::JoinHandle<()>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel::<Message>();
        let worker = thread::Builder::new()
            .name("rtc-coordinator-worker".into())
            .spawn(move || {
                for message in receiver {
                    match message {
                        Message::Run(job) => job(),
                        Message::Shutdown => break,
                    }
                }
            })
            .expect("failed to spawn peer connection worker thread");
        TaskQueue {
            sender,
            worker: Some(worker),
        }
    }

    /// Posts a closure to the worker. Returns immediately; the closure
    /// itself is responsible for checking `is_closed` before mutating
    /// state.
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // Ignore the send error: it only happens after `close()`, at
        // which point every queued task is already meant to be a no-op.
        let _ = self.sender.send(Message::Run(Box::new(job)));
    }

    /// Runs `job` on the worker and blocks the calling thread until it
    /// replies, modeling the promise-based suspension points of spec §5
    /// (create-offer/create-answer/set-*-description all "signal the
    /// promise when done").
    pub fn enqueue_and_wait<F, T>(&self, job: F) -> T
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel::<T>();
        self.enqueue(move || {
            let result = job();
            let _ = reply_tx.send(result);
        });
        reply_rx
            .recv()
            .expect("worker thread dropped the reply channel without a response")
    }

    /// Stops the worker loop. Every task already queued ahead of this
    /// call still runs (FIFO order); nothing queued after it will.
    pub fn close(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.close();
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_enqueue_and_wait_returns_result() {
        let queue = TaskQueue::new();
        let result = queue.enqueue_and_wait(|| 1 + 1);
        assert_eq!(result, 2);
    }

    #[test]
    fn test_tasks_run_in_enqueue_order() {
        let queue = TaskQueue::new();
        let order = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..10 {
            let order = Arc::clone(&order);
            handles.push(queue.enqueue_and_wait(move || {
                let prev = order.fetch_add(1, Ordering::SeqCst);
                assert_eq!(prev, i);
                prev
            }));
        }
        assert_eq!(order.load(Ordering::SeqCst), 10);
        assert_eq!(handles, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_reentrant_enqueue_runs_after_current_task() {
        let queue = Arc::new(TaskQueue::new());
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let inner_queue = Arc::clone(&queue);
        let inner_log = Arc::clone(&log);
        queue.enqueue_and_wait(move || {
            inner_log.lock().unwrap().push("outer");
            let log2 = Arc::clone(&inner_log);
            // Enqueued from inside the running task, so it is guaranteed to
            // land behind any task enqueued by a caller waiting on this one.
            inner_queue.enqueue(move || {
                log2.lock().unwrap().push("inner");
            });
        });

        // The re-entrant task was enqueued before this call was made, so
        // waiting on it guarantees "inner" already ran.
        queue.enqueue_and_wait(|| ());
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
    }
}
