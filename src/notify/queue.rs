use super::{Mail, Notifier};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle, time::timeout};
use tracing::{debug, error, info, warn, Instrument};

/// Handle for queueing mail to the background notification worker.
#[derive(Clone, Debug)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<Mail>,
}

impl NotificationQueue {
    /// Spawn the worker and return the queue handle feeding it.
    ///
    /// The worker stops once every handle has been dropped and the queue is drained.
    #[must_use]
    pub fn spawn(notifier: Arc<dyn Notifier>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Mail>();

        let worker = tokio::spawn(
            async move {
                while let Some(mail) = rx.recv().await {
                    match notifier.send(&mail).await {
                        Ok(()) => info!(to = ?mail.to, subject = %mail.subject, "notification sent"),
                        Err(err) => error!(
                            to = ?mail.to,
                            subject = %mail.subject,
                            "notification failed: {err:#}"
                        ),
                    }
                }

                debug!("notification queue closed");
            }
            .instrument(tracing::info_span!("notification.worker")),
        );

        (Self { tx }, worker)
    }

    /// Queue `mail` for delivery without waiting for it.
    ///
    /// Returns `false` if the worker is gone; the failure is logged, not raised.
    pub fn enqueue(&self, mail: Mail) -> bool {
        match self.tx.send(mail) {
            Ok(()) => true,
            Err(err) => {
                error!(to = ?err.0.to, "notification worker unavailable, mail dropped");
                false
            }
        }
    }
}

/// Wait up to `within` for `worker` to deliver what is still queued.
///
/// Every queue handle must be dropped first or the worker never finishes.
/// Returns `false` when mail may have been lost.
pub async fn drain(worker: JoinHandle<()>, within: Duration) -> bool {
    match timeout(within, worker).await {
        Ok(Ok(())) => {
            debug!("notification queue drained");
            true
        }
        Ok(Err(err)) => {
            error!("notification worker stopped abnormally: {err}");
            false
        }
        Err(_) => {
            warn!("notification queue not drained after {within:?}, pending mail dropped");
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    struct ChannelNotifier(mpsc::UnboundedSender<Mail>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        async fn send(&self, mail: &Mail) -> Result<()> {
            self.0.send(mail.clone()).map_err(|_| anyhow!("receiver gone"))
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _mail: &Mail) -> Result<()> {
            Err(anyhow!("smtp unreachable"))
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let (queue, _worker) = NotificationQueue::spawn(Arc::new(ChannelNotifier(sent_tx)));

        assert!(queue.enqueue(Mail::new("a@example.com", "one", "1")));
        assert!(queue.enqueue(Mail::new("b@example.com", "two", "2")));

        let first = timeout(Duration::from_secs(1), sent_rx.recv()).await.unwrap().unwrap();
        let second = timeout(Duration::from_secs(1), sent_rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.subject, "one");
        assert_eq!(second.subject, "two");
    }

    #[tokio::test]
    async fn test_worker_survives_failures() {
        let (queue, worker) = NotificationQueue::spawn(Arc::new(FailingNotifier));
        assert!(queue.enqueue(Mail::new("a@example.com", "one", "1")));
        assert!(queue.enqueue(Mail::new("b@example.com", "two", "2")));

        drop(queue);
        timeout(Duration::from_secs(1), worker).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_drain_delivers_pending_mail() {
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let (queue, worker) = NotificationQueue::spawn(Arc::new(ChannelNotifier(sent_tx)));
        assert!(queue.enqueue(Mail::new("a@example.com", "one", "1")));
        assert!(queue.enqueue(Mail::new("b@example.com", "two", "2")));
        drop(queue);

        assert!(drain(worker, Duration::from_secs(1)).await);
        assert_eq!(sent_rx.try_recv().unwrap().subject, "one");
        assert_eq!(sent_rx.try_recv().unwrap().subject, "two");
    }

    #[tokio::test]
    async fn test_drain_times_out_while_handles_live() {
        let (queue, worker) = NotificationQueue::spawn(Arc::new(FailingNotifier));
        assert!(!drain(worker, Duration::from_millis(50)).await);
        drop(queue);
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_stopped() {
        let (queue, worker) = NotificationQueue::spawn(Arc::new(FailingNotifier));
        worker.abort();
        let _ = worker.await;
        assert!(!queue.enqueue(Mail::new("a@example.com", "one", "1")));
    }
}
