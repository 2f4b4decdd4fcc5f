use std::{sync::Arc, time::Duration};

use futures::{Stream, StreamExt};
use jui_lib::prelude::{DownloadChapter, DownloaderStatus};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

use crate::domain::{
    repositories::{RepositoryError, download::DownloadRepository},
    services::download::DownloadStateTracker,
};

pub type Snapshot = Result<Vec<DownloadChapter>, RepositoryError>;

/// Feeds every snapshot of `snapshots` to `tracker`, one at a time and in
/// the order they arrive. Failed snapshots are logged and skipped.
pub fn start<R, S>(tracker: Arc<DownloadStateTracker<R>>, snapshots: S) -> JoinHandle<()>
where
    R: DownloadRepository + 'static,
    S: Stream<Item = Snapshot> + Send + 'static,
{
    tokio::spawn(async move {
        let mut snapshots = Box::pin(snapshots);
        while let Some(snapshot) = snapshots.next().await {
            match snapshot {
                Ok(snapshot) => {
                    trace!("received snapshot with {} downloads", snapshot.len());
                    tracker.update(&snapshot);
                }
                Err(e) => {
                    warn!("failed to receive download snapshot: {e}");
                }
            }
        }

        info!("download snapshot stream ended");
    })
}

/// Asks the server for its downloader status every `period`
pub fn poll<R>(repo: Arc<R>, period: Duration) -> impl Stream<Item = Snapshot> + Send + 'static
where
    R: DownloadRepository + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    IntervalStream::new(interval).then(move |_| {
        let repo = repo.clone();
        async move {
            repo.get_download_status()
                .await
                .map(|status| status.queue)
        }
    })
}

/// Decodes downloader status frames pushed by the server. `frames` is any
/// text source carrying one JSON `DownloaderStatus` per item, such as a
/// websocket relay piped into `jui watch --stdin`.
pub fn frames<S>(frames: S) -> impl Stream<Item = Snapshot>
where
    S: Stream<Item = String>,
{
    frames.map(|frame| {
        serde_json::from_str::<DownloaderStatus>(&frame)
            .map(|status| status.queue)
            .map_err(RepositoryError::from)
    })
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::stream;
    use jui_lib::prelude::{Chapter, DownloadState, DownloaderState};

    use super::*;
    use crate::domain::entities::download::ChapterDownloadState;

    #[derive(Default)]
    struct MockDownloadRepository {
        statuses: Mutex<Vec<DownloaderStatus>>,
    }

    #[async_trait]
    impl DownloadRepository for MockDownloadRepository {
        async fn start_download(&self, _chapter: &Chapter) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn stop_download(&self, _chapter: &Chapter) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn delete_download(&self, _chapter: &Chapter) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn get_download_status(&self) -> Result<DownloaderStatus, RepositoryError> {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.is_empty() {
                return Err(RepositoryError::Status(502, "Bad Gateway".to_string()));
            }
            Ok(statuses.remove(0))
        }
    }

    fn entry(manga_id: i64, chapter_index: i64) -> DownloadChapter {
        DownloadChapter {
            manga_id,
            chapter_index,
            state: DownloadState::Downloading,
            progress: 0.5,
            tries: 0,
        }
    }

    fn tracker() -> Arc<DownloadStateTracker<MockDownloadRepository>> {
        Arc::new(DownloadStateTracker::new(MockDownloadRepository::default()))
    }

    fn chapter(manga_id: i64, index: i64) -> Chapter {
        Chapter {
            manga_id,
            index,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_snapshots_applied_in_order() {
        let tracker = tracker();
        let first = tracker.track(chapter(5, 2));
        let second = tracker.track(chapter(5, 3));

        let snapshots = stream::iter(vec![
            Ok(vec![entry(5, 2)]),
            Ok(vec![entry(5, 3)]),
            Ok(vec![entry(5, 3)]),
        ]);

        start(tracker.clone(), snapshots).await.unwrap();

        assert_eq!(first.download_state().get(), ChapterDownloadState::Downloaded);
        assert_eq!(second.download_state().get(), ChapterDownloadState::Downloading);
    }

    #[tokio::test]
    async fn test_failed_snapshot_is_skipped() {
        let tracker = tracker();
        let item = tracker.track(chapter(1, 1));

        let snapshots = stream::iter(vec![
            Ok(vec![entry(1, 1)]),
            Err(RepositoryError::Status(502, "Bad Gateway".to_string())),
            Ok(vec![]),
        ]);

        start(tracker.clone(), snapshots).await.unwrap();

        assert_eq!(item.download_state().get(), ChapterDownloadState::Downloaded);
    }

    #[tokio::test]
    async fn test_decode_frames() {
        let frames = frames(stream::iter(vec![
            r#"{"status":"Started","queue":[{"chapterIndex":2,"mangaId":5,"state":"Downloading","progress":0.3,"tries":0}]}"#.to_string(),
            "not json".to_string(),
            r#"{"status":"Stopped","queue":[]}"#.to_string(),
        ]))
        .collect::<Vec<_>>()
        .await;

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].as_ref().unwrap()[0].key(), chapter(5, 2).key());
        assert!(matches!(frames[1], Err(RepositoryError::Decode(_))));
        assert!(frames[2].as_ref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_download_status() {
        let repo = Arc::new(MockDownloadRepository::default());
        repo.statuses.lock().unwrap().extend([
            DownloaderStatus {
                status: DownloaderState::Started,
                queue: vec![entry(2, 1), entry(2, 2)],
            },
            DownloaderStatus {
                status: DownloaderState::Stopped,
                queue: vec![],
            },
        ]);

        let snapshots = poll(repo, Duration::from_millis(5))
            .take(3)
            .collect::<Vec<_>>()
            .await;

        assert_eq!(snapshots[0].as_ref().unwrap().len(), 2);
        assert!(snapshots[1].as_ref().unwrap().is_empty());
        assert!(snapshots[2].is_err());
    }
}
