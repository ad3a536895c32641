use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::pipeline::{FileEvent, PostOutput, PostPipeline};

/// Result of processing one file event
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub message_id: i64,
    pub output: PostOutput,
}

/// Single intake loop that runs every inbound file event on its own task
pub struct Dispatcher {
    pipeline: PostPipeline,
    events: mpsc::Receiver<FileEvent>,
    outcomes: mpsc::Sender<DispatchOutcome>,
}

impl Dispatcher {
    pub fn new(
        pipeline: PostPipeline,
        events: mpsc::Receiver<FileEvent>,
        outcomes: mpsc::Sender<DispatchOutcome>,
    ) -> Self {
        Self {
            pipeline,
            events,
            outcomes,
        }
    }

    /// Create a dispatcher together with its event sender and outcome receiver
    pub fn channel(
        pipeline: PostPipeline,
        capacity: usize,
    ) -> (mpsc::Sender<FileEvent>, mpsc::Receiver<DispatchOutcome>, Self) {
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (outcome_tx, outcome_rx) = mpsc::channel(capacity);
        (event_tx, outcome_rx, Self::new(pipeline, event_rx, outcome_tx))
    }

    /// Run until every event sender is dropped and all spawned work has
    /// finished. Returns the number of events that were processed.
    pub async fn run(mut self) -> usize {
        tracing::info!("Dispatcher started");

        let mut tasks = JoinSet::new();
        let mut seen = HashSet::new();
        let mut processed = 0usize;

        while let Some(event) = self.events.recv().await {
            if !seen.insert(event.message_id) {
                tracing::debug!(message_id = event.message_id, "Duplicate event, skipping");
                continue;
            }

            if self.pipeline.is_posted(event.message_id).await {
                tracing::info!(message_id = event.message_id, "Already posted, skipping");
                continue;
            }

            processed += 1;
            let pipeline = self.pipeline.clone();
            let outcomes = self.outcomes.clone();
            tasks.spawn(async move {
                let output = pipeline.process(&event).await;
                let outcome = DispatchOutcome {
                    message_id: event.message_id,
                    output,
                };
                if outcomes.send(outcome).await.is_err() {
                    tracing::warn!(message_id = event.message_id, "Outcome receiver dropped");
                }
            });

            // Reap finished tasks so the set does not grow without bound.
            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    tracing::error!("Dispatch task failed: {}", e);
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!("Dispatch task failed: {}", e);
            }
        }

        tracing::info!(processed, "Dispatcher stopped");
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use reelforge_parser::FilenameParser;
    use tempfile::TempDir;

    use crate::config::ComposerConfig;
    use crate::images::{PosterComposer, PosterStorage, TextFace};
    use crate::metadata::{MetadataProvider, TmdbProvider};
    use crate::resolver::PosterResolver;
    use crate::store::{CacheStore, SqliteCacheStore};

    fn pipeline(dir: &TempDir) -> PostPipeline {
        let store: Arc<dyn CacheStore> = Arc::new(SqliteCacheStore::in_memory().unwrap());
        // No API key: every lookup degrades to the fallback background.
        let provider: Arc<dyn MetadataProvider> =
            Arc::new(TmdbProvider::new(String::new(), "en-US".into()).unwrap());
        let fallback = dir.path().join("missing-fallback.jpg");
        let resolver = PosterResolver::new(
            Arc::clone(&store),
            provider,
            PosterStorage::new(dir.path().join("raw")),
            fallback.clone(),
        );
        let composer = PosterComposer::with_faces(
            ComposerConfig::default(),
            dir.path().join("out"),
            fallback,
            TextFace::Builtin,
            TextFace::Builtin,
        );
        PostPipeline::new(FilenameParser::default(), resolver, composer, store)
    }

    #[tokio::test]
    async fn test_dispatches_every_event() {
        let dir = TempDir::new().unwrap();
        let (events, mut outcomes, dispatcher) = Dispatcher::channel(pipeline(&dir), 8);
        let handle = tokio::spawn(dispatcher.run());

        events.send(FileEvent::new(1, "Jawan.2023.1080p.mkv")).await.unwrap();
        events.send(FileEvent::new(2, "Beast.Games.S02E06.720p.WEB-DL.mkv")).await.unwrap();
        drop(events);

        assert_eq!(handle.await.unwrap(), 2);

        let mut ids = Vec::new();
        while let Some(outcome) = outcomes.recv().await {
            assert!(outcome.output.caption.contains("**Title:**"));
            ids.push(outcome.message_id);
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_skips_posted_and_duplicate_events() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir);
        pipeline.record_posted(10, "Leo").await.unwrap();

        let (events, mut outcomes, dispatcher) = Dispatcher::channel(pipeline, 8);
        let handle = tokio::spawn(dispatcher.run());

        events.send(FileEvent::new(10, "Leo.2023.mkv")).await.unwrap();
        events.send(FileEvent::new(11, "Leo.2023.720p.mkv")).await.unwrap();
        events.send(FileEvent::new(11, "Leo.2023.720p.mkv")).await.unwrap();
        drop(events);

        assert_eq!(handle.await.unwrap(), 1);
        assert_eq!(outcomes.recv().await.unwrap().message_id, 11);
        assert!(outcomes.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stops_when_senders_dropped() {
        let dir = TempDir::new().unwrap();
        let (events, _outcomes, dispatcher) = Dispatcher::channel(pipeline(&dir), 1);
        drop(events);
        assert_eq!(dispatcher.run().await, 0);
    }
}
