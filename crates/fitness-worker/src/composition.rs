//! Explicit wiring of the registry, the per-backend processors and the
//! worker.

use std::collections::BTreeMap;
use std::sync::Arc;

use fitness_core::clock::Clock;
use fitness_core::outbox::OutboxStore;
use fitness_outbox::config::{InboxGuardConfig, ProcessorConfig};
use fitness_outbox::dispatcher::Dispatcher;
use fitness_outbox::processor::OutboxProcessor;
use fitness_outbox::registry::EventRegistry;
use fitness_outbox::worker::OutboxWorker;
use fitness_store::pg_inbox_store::PgInboxStore;
use fitness_store::pg_outbox_store::PgOutboxStore;
use fitness_users::domain::events::ProfileUpdated;
use fitness_workouts::infrastructure::pg_user_profile_projection::PgUserProfileProjection;
use sqlx::PgPool;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

/// Backend label of the users datastore.
pub const USERS_BACKEND: &str = "users";
/// Backend label of the workouts datastore.
pub const WORKOUTS_BACKEND: &str = "workouts";

/// Connection pools of the physical datastores.
#[derive(Debug, Clone)]
pub struct Pools {
    /// Users datastore.
    pub users: PgPool,
    /// Workouts datastore.
    pub workouts: PgPool,
}

/// The composed engine and the state its HTTP surface reads.
#[derive(Debug)]
pub struct Composition {
    /// Background worker draining every backend.
    pub worker: OutboxWorker,
    /// Shared state for the HTTP routes.
    pub state: AppState,
}

/// Builds the event registry every module contributes to.
///
/// # Errors
///
/// Returns `AppError::Config` if two event types claim one discriminator.
pub fn build_registry(
    pools: &Pools,
    clock: &Arc<dyn Clock>,
    inbox: InboxGuardConfig,
) -> Result<EventRegistry, AppError> {
    let builder = EventRegistry::builder().event::<ProfileUpdated>();
    let builder = fitness_workouts::register(
        builder,
        Arc::new(PgUserProfileProjection::new(pools.workouts.clone())),
        Arc::new(PgInboxStore::new(pools.workouts.clone())),
        Arc::clone(clock),
        inbox,
    );
    let registry = builder.build()?;

    info!(registry = ?registry, "event registry built");
    Ok(registry)
}

/// Wires one processor per backend over a shared dispatcher.
///
/// # Errors
///
/// Returns `AppError::Config` for an invalid processor configuration or an
/// inconsistent registry.
pub fn compose(
    pools: &Pools,
    clock: Arc<dyn Clock>,
    processor: &ProcessorConfig,
    inbox: InboxGuardConfig,
) -> Result<Composition, AppError> {
    processor.validate()?;

    let registry = build_registry(pools, &clock, inbox)?;
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry)));

    let mut outboxes: BTreeMap<String, Arc<dyn OutboxStore>> = BTreeMap::new();
    outboxes.insert(
        USERS_BACKEND.to_string(),
        Arc::new(PgOutboxStore::new(pools.users.clone())),
    );
    outboxes.insert(
        WORKOUTS_BACKEND.to_string(),
        Arc::new(PgOutboxStore::new(pools.workouts.clone())),
    );

    let processors = outboxes
        .iter()
        .map(|(backend, store)| {
            OutboxProcessor::new(
                backend.clone(),
                Arc::clone(store),
                Arc::clone(&dispatcher),
                Arc::clone(&clock),
                processor.clone(),
            )
        })
        .collect();

    Ok(Composition {
        worker: OutboxWorker::new(processors, processor.poll_interval),
        state: AppState::new(outboxes),
    })
}
