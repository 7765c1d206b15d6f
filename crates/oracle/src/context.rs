//! Service wiring.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::events::{ChannelEventSink, EventRecorder, EventSink, NullEventSink};
use crate::feature_store::{FeatureCache, InMemoryFeatureStore, NullFeatureCache};
use crate::gate::ApiKeyGate;
use crate::locks::EntityLocks;
use crate::pipeline::{PipelineSettings, ScoringPipeline};
use crate::poh::PohService;
use crate::reputation::ReputationService;
use crate::scheduler::RefreshScheduler;
use crate::sources::SignalCollector;
use crate::storage::Storage;

/// Every long-lived service, built once from the configuration.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub storage: Storage,
    pub features: Arc<dyn FeatureCache>,
    pub events: Arc<dyn EventSink>,
    pub pipeline: ScoringPipeline,
    pub gate: ApiKeyGate,
    pub poh: PohService,
    pub reputation: ReputationService,
    pub scheduler: RefreshScheduler,
}

impl AppContext {
    /// Connect storage, run migrations and wire the services.
    ///
    /// The returned recorder (present when events are enabled) must be
    /// spawned to drain the event channel into storage.
    pub async fn build(config: Config) -> Result<(Self, Option<EventRecorder>)> {
        config.validate()?;

        let storage = Storage::connect(&config.database)
            .await
            .context("Failed to open storage")?;
        storage.run_migrations().await?;

        let features: Arc<dyn FeatureCache> = if config.features.enabled {
            Arc::new(InMemoryFeatureStore::new(Duration::from_secs(
                config.features.ttl_secs,
            )))
        } else {
            info!("Feature cache disabled");
            Arc::new(NullFeatureCache)
        };

        let (events, recorder): (Arc<dyn EventSink>, Option<EventRecorder>) =
            if config.events.enabled {
                let (sink, rx) = ChannelEventSink::new(config.events.capacity);
                (Arc::new(sink), Some(EventRecorder::new(rx, storage.clone())))
            } else {
                info!("Event publishing disabled");
                (Arc::new(NullEventSink), None)
            };

        let collector = SignalCollector::from_config(&config.sources)?;

        let pipeline = ScoringPipeline::new(
            collector.clone(),
            features.clone(),
            Arc::new(storage.clone()),
            Arc::new(storage.clone()),
            events.clone(),
            EntityLocks::new(),
            PipelineSettings {
                oracle_address: config.oracle.address.clone(),
                history_cap: config.scheduler.history_cap,
                significant_change_threshold: config.scheduler.significant_change_threshold,
            },
        );

        let gate = ApiKeyGate::new(storage.clone(), events.clone());
        let poh = PohService::new(
            storage.clone(),
            collector,
            Arc::new(storage.clone()),
            pipeline.clone(),
            events.clone(),
            config.credentials.clone(),
        );
        let reputation = ReputationService::new(features.clone(), pipeline.clone());
        let scheduler = RefreshScheduler::new(pipeline.clone(), config.scheduler.clone());

        let context = Self {
            config: Arc::new(config),
            storage,
            features,
            events,
            pipeline,
            gate,
            poh,
            reputation,
            scheduler,
        };
        Ok((context, recorder))
    }
}
