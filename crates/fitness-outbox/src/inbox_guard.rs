//! Idempotent handler wrapper backed by the inbox ledger.

use std::sync::Arc;

use async_trait::async_trait;
use fitness_core::clock::Clock;
use fitness_core::error::DomainError;
use fitness_core::event::{EventContext, IntegrationEvent};
use fitness_core::handler::EventHandler;
use fitness_core::inbox::{InboxStatus, InboxStore};
use fitness_core::outbox::truncate_error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::InboxGuardConfig;

/// Runs the wrapped handler at most once to completion per
/// `(consumer, event_id)`.
///
/// The side effect and the ledger update are separate local commits. A crash
/// between them leaves the row `processing`; the next delivery reclaims it
/// once it is older than the configured lease, so the side effect may run
/// twice in that window.
pub struct IdempotentHandler<H> {
    inner: H,
    inbox: Arc<dyn InboxStore>,
    clock: Arc<dyn Clock>,
    config: InboxGuardConfig,
}

impl<H> IdempotentHandler<H> {
    /// Wraps `inner`, recording its runs in `inbox`.
    #[must_use]
    pub fn new(
        inner: H,
        inbox: Arc<dyn InboxStore>,
        clock: Arc<dyn Clock>,
        config: InboxGuardConfig,
    ) -> Self {
        Self {
            inner,
            inbox,
            clock,
            config,
        }
    }
}

#[async_trait]
impl<E, H> EventHandler<E> for IdempotentHandler<H>
where
    E: IntegrationEvent,
    H: EventHandler<E>,
{
    fn consumer(&self) -> &str {
        self.inner.consumer()
    }

    async fn handle(
        &self,
        event: &E,
        ctx: &EventContext,
        cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        let consumer = self.inner.consumer();
        let event_id = ctx.event_id;
        let now = self.clock.now();

        match self.inbox.find(consumer, event_id).await? {
            Some(row) if row.status == InboxStatus::Completed => {
                debug!(consumer, %event_id, "already completed, skipping");
                return Ok(());
            }
            Some(row) => {
                let stale_before = now - self.config.processing_lease;
                if !self
                    .inbox
                    .reclaim(consumer, event_id, stale_before, now)
                    .await?
                {
                    return Err(DomainError::InFlight {
                        consumer: consumer.to_owned(),
                        event_id,
                    });
                }
                if row.status == InboxStatus::Processing {
                    warn!(consumer, %event_id, claimed_at = %row.claimed_at, "reclaimed abandoned inbox claim");
                }
            }
            None => {
                if !self
                    .inbox
                    .try_begin(consumer, event_id, &ctx.event_type, now)
                    .await?
                {
                    debug!(consumer, %event_id, "claimed concurrently, skipping");
                    return Ok(());
                }
            }
        }

        match self.inner.handle(event, ctx, cancel).await {
            Ok(()) => self.inbox.complete(consumer, event_id, self.clock.now()).await,
            Err(err) => {
                let message = truncate_error(&err.to_string());
                if let Err(ledger_err) = self
                    .inbox
                    .fail(consumer, event_id, &message, self.clock.now())
                    .await
                {
                    warn!(consumer, %event_id, error = %ledger_err, "could not record handler failure");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use fitness_core::inbox::InboxRecord;
    use fitness_test_support::{
        FailingHandler, FixedClock, InMemoryInboxStore, ManualClock, RecordingHandler, TestEvent,
    };
    use uuid::Uuid;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn event_and_ctx() -> (TestEvent, EventContext) {
        let event = TestEvent {
            subject_id: Uuid::new_v4(),
            value: "deadlift".to_owned(),
        };
        let ctx = EventContext {
            event_id: Uuid::new_v4(),
            event_type: "test.event".to_owned(),
            created_at: start(),
            correlation_id: None,
            trace_id: None,
        };
        (event, ctx)
    }

    fn guard<H>(
        inner: H,
        inbox: &Arc<InMemoryInboxStore>,
        clock: Arc<dyn Clock>,
        lease: TimeDelta,
    ) -> IdempotentHandler<H> {
        IdempotentHandler::new(
            inner,
            Arc::clone(inbox) as Arc<dyn InboxStore>,
            clock,
            InboxGuardConfig {
                processing_lease: lease,
            },
        )
    }

    #[tokio::test]
    async fn test_second_delivery_after_success_is_a_no_op() {
        // Arrange
        let inner = Arc::new(RecordingHandler::new("projection"));
        let inbox = Arc::new(InMemoryInboxStore::new());
        let handler = guard(
            Arc::clone(&inner),
            &inbox,
            Arc::new(FixedClock(start())),
            TimeDelta::zero(),
        );
        let (event, ctx) = event_and_ctx();
        let cancel = CancellationToken::new();

        // Act
        handler.handle(&event, &ctx, &cancel).await.unwrap();
        handler.handle(&event, &ctx, &cancel).await.unwrap();

        // Assert
        assert_eq!(inner.call_count(), 1);
        let row = inbox.row("projection", ctx.event_id).unwrap();
        assert_eq!(row.status, InboxStatus::Completed);
        assert_eq!(row.processed_at, Some(start()));
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_rethrown() {
        // Arrange
        let inbox = Arc::new(InMemoryInboxStore::new());
        let handler = guard(
            FailingHandler::always("projection"),
            &inbox,
            Arc::new(FixedClock(start())),
            TimeDelta::zero(),
        );
        let (event, ctx) = event_and_ctx();

        // Act
        let result = handler.handle(&event, &ctx, &CancellationToken::new()).await;

        // Assert
        assert!(result.is_err());
        let row = inbox.row("projection", ctx.event_id).unwrap();
        assert_eq!(row.status, InboxStatus::Failed);
        assert!(row.error.unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_failed_row_is_retried_on_next_delivery() {
        // Arrange
        let inner = Arc::new(FailingHandler::times("projection", 1));
        let inbox = Arc::new(InMemoryInboxStore::new());
        let handler = guard(
            Arc::clone(&inner),
            &inbox,
            Arc::new(FixedClock(start())),
            TimeDelta::zero(),
        );
        let (event, ctx) = event_and_ctx();
        let cancel = CancellationToken::new();

        // Act
        let first = handler.handle(&event, &ctx, &cancel).await;
        let second = handler.handle(&event, &ctx, &cancel).await;

        // Assert
        assert!(first.is_err());
        assert!(second.is_ok());
        assert_eq!(inner.call_count(), 2);
        let row = inbox.row("projection", ctx.event_id).unwrap();
        assert_eq!(row.status, InboxStatus::Completed);
        assert!(row.error.is_none());
        assert_eq!(inbox.len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_processing_claim_reports_in_flight() {
        // Arrange
        let inner = Arc::new(RecordingHandler::new("projection"));
        let inbox = Arc::new(InMemoryInboxStore::new());
        let (event, ctx) = event_and_ctx();
        inbox
            .try_begin("projection", ctx.event_id, "test.event", start())
            .await
            .unwrap();
        let handler = guard(
            Arc::clone(&inner),
            &inbox,
            Arc::new(FixedClock(start() + TimeDelta::seconds(10))),
            TimeDelta::minutes(5),
        );

        // Act
        let result = handler.handle(&event, &ctx, &CancellationToken::new()).await;

        // Assert
        assert!(matches!(result, Err(DomainError::InFlight { .. })));
        assert_eq!(inner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_processing_claim_is_reclaimed_after_lease() {
        // Arrange
        let inner = Arc::new(RecordingHandler::new("projection"));
        let inbox = Arc::new(InMemoryInboxStore::new());
        let (event, ctx) = event_and_ctx();
        inbox
            .try_begin("projection", ctx.event_id, "test.event", start())
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new(start()));
        clock.advance(TimeDelta::minutes(6));
        let handler = guard(
            Arc::clone(&inner),
            &inbox,
            Arc::clone(&clock) as Arc<dyn Clock>,
            TimeDelta::minutes(5),
        );

        // Act
        handler
            .handle(&event, &ctx, &CancellationToken::new())
            .await
            .unwrap();

        // Assert
        assert_eq!(inner.call_count(), 1);
        let row = inbox.row("projection", ctx.event_id).unwrap();
        assert_eq!(row.status, InboxStatus::Completed);
        assert_eq!(row.created_at, start());
    }

    /// A ledger where the lookup always misses and the insert always loses
    /// the race, as when another instance claims the row in between.
    struct RacingInbox;

    #[async_trait]
    impl InboxStore for RacingInbox {
        async fn find(
            &self,
            _consumer: &str,
            _event_id: Uuid,
        ) -> Result<Option<InboxRecord>, DomainError> {
            Ok(None)
        }

        async fn try_begin(
            &self,
            _consumer: &str,
            _event_id: Uuid,
            _event_type: &str,
            _at: DateTime<Utc>,
        ) -> Result<bool, DomainError> {
            Ok(false)
        }

        async fn reclaim(
            &self,
            _consumer: &str,
            _event_id: Uuid,
            _stale_before: DateTime<Utc>,
            _at: DateTime<Utc>,
        ) -> Result<bool, DomainError> {
            Ok(false)
        }

        async fn complete(
            &self,
            _consumer: &str,
            _event_id: Uuid,
            _at: DateTime<Utc>,
        ) -> Result<(), DomainError> {
            panic!("complete must not be called after a lost race");
        }

        async fn fail(
            &self,
            _consumer: &str,
            _event_id: Uuid,
            _error: &str,
            _at: DateTime<Utc>,
        ) -> Result<(), DomainError> {
            panic!("fail must not be called after a lost race");
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_returns_success_without_action() {
        // Arrange
        let inner = Arc::new(RecordingHandler::new("projection"));
        let handler = IdempotentHandler::new(
            Arc::clone(&inner),
            Arc::new(RacingInbox),
            Arc::new(FixedClock(start())),
            InboxGuardConfig::default(),
        );
        let (event, ctx) = event_and_ctx();

        // Act
        let result = handler.handle(&event, &ctx, &CancellationToken::new()).await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(inner.call_count(), 0);
    }
}
