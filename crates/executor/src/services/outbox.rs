use std::sync::Arc;

use render::Artifact;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::services::platform::{BotPlatform, PublishError};

struct PublishJob {
    artifact: Artifact,
    caption: String,
    reply: oneshot::Sender<Result<(), PublishError>>,
}

/// Single-consumer queue in front of the broadcast destination. Both the
/// interactive path and the broadcaster publish through a clone of this.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::Sender<PublishJob>,
}

impl Outbox {
    pub fn spawn(
        platform: Arc<dyn BotPlatform>,
        destination: i64,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(Self::run(platform, destination, rx));
        (Self { tx }, handle)
    }

    /// Queues one artifact and waits for its delivery outcome.
    pub async fn publish(&self, artifact: Artifact, caption: String) -> Result<(), PublishError> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(PublishJob {
                artifact,
                caption,
                reply,
            })
            .await
            .map_err(|_| PublishError::OutboxClosed)?;

        outcome.await.map_err(|_| PublishError::OutboxClosed)?
    }

    async fn run(
        platform: Arc<dyn BotPlatform>,
        destination: i64,
        mut rx: mpsc::Receiver<PublishJob>,
    ) {
        info!("Starting outbox for destination {}", destination);

        while let Some(job) = rx.recv().await {
            let file_name = job.artifact.file_name.clone();
            let result = platform
                .publish_artifact(destination, job.artifact, &job.caption)
                .await;

            match &result {
                Ok(()) => debug!("Published {} to {}", file_name, destination),
                // Reported back to the caller, never fatal here
                Err(e) => error!("Failed to publish {}: {}", file_name, e),
            }

            // The caller may have gone away; nothing to do then
            let _ = job.reply.send(result);
        }

        info!("Outbox channel closed. Stopping service.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::RecordingPlatform;
    use std::sync::atomic::Ordering;

    fn artifact(name: &str) -> Artifact {
        Artifact {
            file_name: name.to_string(),
            bytes: name.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_jobs_are_published_to_the_destination() {
        let platform = Arc::new(RecordingPlatform::default());
        let (outbox, _handle) = Outbox::spawn(platform.clone(), -100, 8);

        outbox.publish(artifact("a.png"), "first".to_string()).await.unwrap();
        outbox.publish(artifact("b.png"), "second".to_string()).await.unwrap();

        let published = platform.published();
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|p| p.destination == -100));
        assert_eq!(published[0].caption, "first");
        assert_eq!(published[1].artifact.file_name, "b.png");
    }

    #[tokio::test]
    async fn test_concurrent_publishers_each_get_their_outcome() {
        let platform = Arc::new(RecordingPlatform::default());
        let (outbox, _handle) = Outbox::spawn(platform.clone(), 7, 2);

        let mut tasks = Vec::new();
        for i in 0..10 {
            let outbox = outbox.clone();
            tasks.push(tokio::spawn(async move {
                outbox.publish(artifact(&format!("{}.png", i)), i.to_string()).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut captions: Vec<String> = platform.published().into_iter().map(|p| p.caption).collect();
        captions.sort_by_key(|c| c.parse::<u32>().unwrap());
        assert_eq!(captions, (0..10).map(|i| i.to_string()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_platform_failure_is_returned_to_caller() {
        let platform = Arc::new(RecordingPlatform::default());
        platform.fail_publish.store(true, Ordering::SeqCst);
        let (outbox, _handle) = Outbox::spawn(platform.clone(), 7, 2);

        let err = outbox.publish(artifact("a.png"), "x".to_string()).await.unwrap_err();
        assert!(matches!(err, PublishError::Platform(_)));

        platform.fail_publish.store(false, Ordering::SeqCst);
        outbox.publish(artifact("b.png"), "y".to_string()).await.unwrap();
        assert_eq!(platform.published().len(), 1);
    }

    #[tokio::test]
    async fn test_stopped_outbox_reports_closed() {
        let platform = Arc::new(RecordingPlatform::default());
        let (outbox, handle) = Outbox::spawn(platform, 7, 2);
        handle.abort();
        let _ = handle.await;

        let err = outbox.publish(artifact("a.png"), "x".to_string()).await.unwrap_err();
        assert!(matches!(err, PublishError::OutboxClosed));
    }
}
