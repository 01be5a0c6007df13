//! Consumer-side handler contract.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::DomainError;
use crate::event::{EventContext, IntegrationEvent};

/// A side effect run in response to an integration event.
///
/// The engine calls `handle` at least once per logical event. Handlers must
/// tolerate being re-invoked for an event they already applied: a failure of
/// any sibling handler causes every handler of that event to run again.
#[async_trait]
pub trait EventHandler<E: IntegrationEvent>: Send + Sync {
    /// Name of the consumer, used as the inbox ledger key.
    fn consumer(&self) -> &str;

    /// Applies the side effect for `event`.
    ///
    /// # Errors
    ///
    /// Any error is reported to the processor, which decides between retry
    /// and poisoning. Handlers never decide retry policy themselves.
    async fn handle(
        &self,
        event: &E,
        ctx: &EventContext,
        cancel: &CancellationToken,
    ) -> Result<(), DomainError>;
}

#[async_trait]
impl<E, H> EventHandler<E> for Arc<H>
where
    E: IntegrationEvent,
    H: EventHandler<E> + ?Sized,
{
    fn consumer(&self) -> &str {
        (**self).consumer()
    }

    async fn handle(
        &self,
        event: &E,
        ctx: &EventContext,
        cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        (**self).handle(event, ctx, cancel).await
    }
}
