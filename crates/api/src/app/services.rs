use std::sync::Arc;

use anyhow::Context;

use tillcredit_credit::{
    CreditEvaluator, CreditRecordStore, CreditSettings, HistoryProvider, HistoryReader,
};
use tillcredit_infra::{CreditFixture, InMemoryCreditStore, PostgresCreditStore};

use crate::config::{ApiConfig, StoreConfig};

pub type SharedStore = Arc<dyn CreditRecordStore>;
pub type SharedHistory = Arc<dyn HistoryProvider>;

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub credit: CreditEvaluator<SharedStore>,
    pub history: HistoryReader<SharedStore, SharedHistory>,
    backend: &'static str,
}

impl AppServices {
    pub fn new(store: SharedStore, history: SharedHistory, settings: CreditSettings, backend: &'static str) -> Self {
        Self {
            credit: CreditEvaluator::new(store.clone(), settings),
            history: HistoryReader::new(store, history),
            backend,
        }
    }

    /// Wire both ports to one in-memory store.
    pub fn in_memory(store: InMemoryCreditStore, settings: CreditSettings) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store, settings, "in_memory")
    }

    pub fn postgres(store: PostgresCreditStore, settings: CreditSettings) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store, settings, "postgres")
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let settings = CreditSettings {
        include_unbilled: config.include_unbilled,
    };

    match &config.store {
        StoreConfig::InMemory { fixtures } => {
            let store = match fixtures {
                Some(path) => {
                    let fixture = CreditFixture::load(path)
                        .with_context(|| format!("failed to load CREDIT_FIXTURES from {}", path.display()))?;
                    InMemoryCreditStore::from_fixture(fixture)?
                }
                None => {
                    tracing::warn!("CREDIT_FIXTURES not set; starting with an empty in-memory store");
                    InMemoryCreditStore::new()
                }
            };
            Ok(AppServices::in_memory(store, settings))
        }
        StoreConfig::Postgres { database_url } => {
            let store = PostgresCreditStore::connect(database_url)
                .await
                .context("failed to connect to Postgres")?;
            store.ensure_schema().await.context("failed to apply schema")?;
            Ok(AppServices::postgres(store, settings))
        }
    }
}
