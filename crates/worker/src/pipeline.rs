use anyhow::Context;
use macroquad_core::cache::MacroSnapshotCache;
use macroquad_core::config::Settings;
use macroquad_core::domain::snapshot::MacroSnapshot;
use macroquad_core::engine::DecisionEngine;
use macroquad_core::fundamentals::NaverStockClient;
use macroquad_core::ingest::{FredClient, MacroIngestor, SeriesCatalog};
use macroquad_core::llm::openai::OpenAiClient;
use macroquad_core::llm::prompts::PromptStore;
use macroquad_core::llm::ReasoningProvider;
use macroquad_core::publish::DailyPublisher;
use macroquad_core::scheduler::MacroScheduler;
use macroquad_core::storage::LocalReportStorage;
use macroquad_core::views::{StockOpinionBuilder, TieredReportBuilder};
use std::path::Path;
use std::sync::Arc;

/// Wires core components from [`Settings`]. Clients are built lazily so a
/// command only needs the credentials it actually uses. Every command reads
/// its snapshot through the shared cache.
pub struct Pipeline {
    settings: Settings,
    prompts: PromptStore,
    cache: Arc<MacroSnapshotCache>,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        let prompts = PromptStore::from_settings(&settings);
        Self {
            settings,
            prompts,
            cache: Arc::new(MacroSnapshotCache::new()),
        }
    }

    pub fn cache(&self) -> &Arc<MacroSnapshotCache> {
        &self.cache
    }

    pub fn ingestor(&self) -> anyhow::Result<MacroIngestor> {
        let fred = FredClient::from_settings(&self.settings).context("FRED client init failed")?;
        Ok(MacroIngestor::new(
            Arc::new(fred),
            SeriesCatalog::from_settings(&self.settings),
        ))
    }

    fn reasoning(&self) -> anyhow::Result<Arc<dyn ReasoningProvider>> {
        let client = OpenAiClient::from_settings(&self.settings).context("OpenAI client init failed")?;
        Ok(Arc::new(client))
    }

    pub fn engine(&self) -> anyhow::Result<DecisionEngine> {
        Ok(DecisionEngine::new(
            self.reasoning()?,
            self.prompts.clone(),
            &self.settings.openai_model,
        ))
    }

    pub fn report_builder(&self) -> anyhow::Result<TieredReportBuilder> {
        Ok(TieredReportBuilder::with_provider(
            self.reasoning()?,
            self.prompts.clone(),
            &self.settings.openai_report_model,
        ))
    }

    pub fn opinion_builder(&self) -> anyhow::Result<StockOpinionBuilder> {
        let stocks = NaverStockClient::from_settings(&self.settings).context("stock client init failed")?;
        let reasoning = self.reasoning()?;
        Ok(StockOpinionBuilder::new(
            Arc::new(stocks),
            self.engine()?,
            reasoning,
            self.prompts.clone(),
            &self.settings.openai_model,
        ))
    }

    pub fn storage(&self) -> LocalReportStorage {
        LocalReportStorage::from_settings(&self.settings)
    }

    pub fn scheduler(&self) -> anyhow::Result<MacroScheduler> {
        Ok(MacroScheduler::new(Arc::new(self.ingestor()?), self.cache.clone()))
    }

    pub fn publisher(&self) -> anyhow::Result<DailyPublisher> {
        Ok(DailyPublisher::new(
            self.cache.clone(),
            self.engine()?,
            self.report_builder()?,
            Arc::new(self.storage()),
        ))
    }

    /// Fills the cache from a JSON file when given, otherwise from a manual
    /// ingest, and returns what the cache now holds.
    pub async fn snapshot(&self, path: Option<&Path>) -> anyhow::Result<MacroSnapshot> {
        match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("read snapshot {} failed", path.display()))?;
                let snapshot = serde_json::from_str(&raw)
                    .with_context(|| format!("parse snapshot {} failed", path.display()))?;
                self.cache.put(snapshot);
            }
            None => {
                self.scheduler()?.trigger_now().await?;
            }
        }
        self.cache.latest().context("macro cache is empty")
    }
}
