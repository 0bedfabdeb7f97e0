mod viewport;

use std::sync::Arc;

use reelcore_config::{ConfigError, Settings};
use reelcore_store::RecordStore;
use reelcore_task::{PendingTask, PrimeLimit, TaskChannel, TaskError};
use tracing::info;

pub use viewport::{ViewportController, ViewportError, VisibleSlice};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start background worker")]
    Spawn(#[from] std::io::Error),
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Interactive viewport plus the background task channel, built from [`Settings`].
pub struct ReelService {
    pub settings: Settings,
    viewport: ViewportController,
    tasks: TaskChannel,
}

impl ReelService {
    pub fn new(settings: Settings, store: Arc<RecordStore>) -> Result<Self, ServiceError> {
        settings.validate()?;
        let geometry = settings
            .viewport
            .geometry()
            .map_err(ConfigError::from)?;
        let tasks = TaskChannel::spawn(settings.task.cancel_check_interval)?;

        info!(
            records = store.len(),
            row_extent = geometry.row_extent(),
            viewport_extent = geometry.viewport_extent(),
            overscan = geometry.overscan(),
            "service ready"
        );

        Ok(Self {
            settings,
            viewport: ViewportController::new(store, geometry),
            tasks,
        })
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    pub fn tasks(&self) -> &TaskChannel {
        &self.tasks
    }

    /// Dispatches a prime count, falling back to the configured default limit.
    pub fn start_prime_count(&self, limit: Option<PrimeLimit>) -> Result<PendingTask, TaskError> {
        let limit = match limit {
            Some(limit) => limit,
            None => PrimeLimit::new(self.settings.task.default_prime_limit)?,
        };
        self.tasks.dispatch(limit)
    }

    pub fn shutdown(self) -> Result<(), ServiceError> {
        self.tasks.shutdown()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcore_store::{Category, Rating, Record};
    use reelcore_task::{ChannelState, TaskOutcome};

    fn store(len: usize) -> Arc<RecordStore> {
        let records = (0..len)
            .map(|i| {
                Record::new(
                    i as u32,
                    format!("Movie {}", i + 1),
                    Rating::new(1.5).unwrap(),
                    Category::ALL[i % Category::ALL.len()],
                )
            })
            .collect();
        Arc::new(RecordStore::new(records).unwrap())
    }

    #[test]
    fn invalid_settings_fail_at_construction() {
        let mut settings = Settings::default();
        settings.viewport.row_extent = 0;
        assert!(matches!(
            ReelService::new(settings, store(3)),
            Err(ServiceError::Config(_))
        ));
    }

    #[tokio::test]
    async fn viewport_stays_usable_while_task_runs() {
        let mut settings = Settings::default();
        settings.task.default_prime_limit = 10;
        let mut service = ReelService::new(settings, store(1_000)).unwrap();

        let pending = service.start_prime_count(None).unwrap();
        service.viewport_mut().on_scroll(800.0).unwrap();
        assert_eq!(service.viewport().range().start_index, 20);

        let outcome = pending.wait().await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!((report.match_count, report.last_match), (4, 7));
        assert_eq!(service.tasks().state(), ChannelState::Idle);
    }

    #[tokio::test]
    async fn explicit_limit_overrides_default() {
        let service = ReelService::new(Settings::default(), store(10)).unwrap();
        let pending = service
            .start_prime_count(Some(PrimeLimit::new(100).unwrap()))
            .unwrap();
        match pending.wait().await.unwrap() {
            TaskOutcome::Completed { report, .. } => assert_eq!(report.last_match, 97),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn shutdown_joins_worker() {
        let service = ReelService::new(Settings::default(), store(10)).unwrap();
        service.shutdown().unwrap();
    }
}
