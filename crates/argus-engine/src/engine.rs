//! The orchestration pass: signals → selection → dispatch → merge.

use std::sync::Arc;

use argus_config::ArgusConfig;
use argus_core::ids::{PREFIX_INVESTIGATION, generate_id};
use argus_core::{
    CallOutcome, Catalog, CatalogHandle, InvestigationReport, ReportSection, SignalSet,
    SubjectInput,
};
use argus_dispatch::Dispatcher;
use argus_merge::Merger;
use argus_select::{
    HttpRankingOracle, RankingOracle, Selection, SelectorOptions, select_ranked,
};
use argus_store::ConfigStore;
use argus_workflow::{CollectRequest, OrchestrationPass, PassError};
use async_trait::async_trait;
use chrono::Utc;

use crate::error::EngineError;

/// Per-run overrides of the configured selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvestigateOptions {
    pub limit: Option<usize>,
    /// Only consider these source ids.
    pub sources: Option<Vec<String>>,
}

/// Signals and selection for a subject, without dispatching anything.
#[derive(Debug, Clone)]
pub struct Plan {
    pub signals: SignalSet,
    pub selection: Selection,
}

pub struct Engine {
    catalog: CatalogHandle,
    selector: SelectorOptions,
    oracle: Option<Arc<dyn RankingOracle>>,
    dispatcher: Dispatcher,
    merger: Merger,
}

impl Engine {
    pub fn new(catalog: Catalog, selector: SelectorOptions, dispatcher: Dispatcher) -> Self {
        Self {
            catalog: CatalogHandle::new(catalog),
            selector,
            oracle: None,
            dispatcher,
            merger: Merger::default(),
        }
    }

    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn RankingOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    #[must_use]
    pub fn with_merger(mut self, merger: Merger) -> Self {
        self.merger = merger;
        self
    }

    /// Production engine: catalog from the store, `reqwest` dispatcher,
    /// HTTP ranking oracle when one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the catalog cannot be loaded or a client
    /// cannot be built.
    pub fn from_config(config: &ArgusConfig, store: &dyn ConfigStore) -> Result<Self, EngineError> {
        let catalog = store.list_sources()?;
        let dispatcher = Dispatcher::from_config(&config.dispatch)?;
        let selector = SelectorOptions::from_config(&config.selector)
            .with_oracle_timeout(std::time::Duration::from_secs(config.oracle.timeout_secs));
        let mut engine = Self::new(catalog, selector, dispatcher);
        if let Some(oracle) = HttpRankingOracle::from_config(&config.oracle)? {
            tracing::debug!(endpoint = oracle.endpoint(), "ranking oracle enabled");
            engine = engine.with_oracle(Arc::new(oracle));
        }
        Ok(engine)
    }

    #[must_use]
    pub const fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    /// Swap in the store's current catalog. Runs already in flight keep
    /// the snapshot they started with.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the catalog cannot be loaded.
    pub fn reload_catalog(&self, store: &dyn ConfigStore) -> Result<(), EngineError> {
        let catalog = store.list_sources()?;
        tracing::info!(sources = catalog.len(), "catalog reloaded");
        self.catalog.replace(catalog);
        Ok(())
    }

    /// Extract signals and select candidates without dispatching.
    pub async fn plan(&self, subject: &SubjectInput, options: &InvestigateOptions) -> Plan {
        let catalog = self.catalog.snapshot();
        self.plan_with(&catalog, subject, options).await
    }

    async fn plan_with(
        &self,
        catalog: &Catalog,
        subject: &SubjectInput,
        options: &InvestigateOptions,
    ) -> Plan {
        let signals = subject.extract();
        let mut selector = self
            .selector
            .clone()
            .with_only_sources(options.sources.clone());
        if let Some(limit) = options.limit {
            selector = selector.with_limit(limit);
        }
        let selection =
            select_ranked(&signals, catalog, &selector, self.oracle.as_deref()).await;
        Plan { signals, selection }
    }

    /// Run one full orchestration pass for `subject`.
    ///
    /// Always produces a report; a subject with no usable signals yields a
    /// report with the single "no data" section.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Core`] only if a report id cannot be generated.
    pub async fn investigate(
        &self,
        subject: &SubjectInput,
        options: &InvestigateOptions,
    ) -> Result<InvestigationReport, EngineError> {
        let catalog = self.catalog.snapshot();
        self.investigate_with(&catalog, subject, options).await
    }

    /// [`investigate`](Self::investigate) against a fixed catalog snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Core`] only if a report id cannot be generated.
    pub async fn investigate_with(
        &self,
        catalog: &Arc<Catalog>,
        subject: &SubjectInput,
        options: &InvestigateOptions,
    ) -> Result<InvestigationReport, EngineError> {
        let id = generate_id(PREFIX_INVESTIGATION)?;
        let Plan { signals, selection } = self.plan_with(catalog, subject, options).await;
        tracing::info!(
            investigation = %id,
            signals = signals.present().count(),
            candidates = selection.candidates.len(),
            truncated = selection.truncated,
            "investigation started"
        );

        let outcomes = self
            .dispatcher
            .dispatch(Arc::clone(catalog), selection.candidates)
            .await;
        let sections = self.merger.merge(catalog, &outcomes);

        Ok(InvestigationReport {
            id,
            generated_at: Utc::now(),
            signals,
            sections,
            outcomes,
            exclusions: selection.exclusions,
            ranking: selection.ranking,
            truncated: selection.truncated,
        })
    }
}

#[async_trait]
impl OrchestrationPass for Engine {
    fn snapshot(&self) -> Arc<Catalog> {
        self.catalog.snapshot()
    }

    async fn collect(
        &self,
        catalog: &Arc<Catalog>,
        request: &CollectRequest,
    ) -> Result<InvestigationReport, PassError> {
        let options = InvestigateOptions {
            limit: request.limit,
            sources: request.sources.clone(),
        };
        self.investigate_with(catalog, &request.subject, &options)
            .await
            .map_err(|e| PassError(e.to_string()))
    }

    fn assemble(&self, catalog: &Catalog, outcomes: &[CallOutcome]) -> Vec<ReportSection> {
        self.merger.merge(catalog, outcomes)
    }
}
