//! Single entry point consumers call for observation data.

use crate::chain::SourceChain;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{DataSourceResult, Provenance, TimeRange};
use crate::region::RegionQuery;
use crate::synthetic;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tracing::info;

/// Stateless facade over the source chain. Safe to share between tasks;
/// concurrent calls do not coordinate and may issue duplicate requests.
pub struct DataService {
    chain: SourceChain,
    seed: Option<u64>,
}

impl DataService {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            chain: SourceChain::from_config(config)?,
            seed: config.synthetic.seed,
        })
    }

    pub fn chain(&self) -> &SourceChain {
        &self.chain
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Resolve observations for a window and region. Always returns data;
    /// `provenance` is `Real` only when an ERDDAP tier answered.
    pub async fn fetch(&self, range: TimeRange, requested: RegionQuery) -> DataSourceResult {
        let now = Utc::now();
        let mut rng = self.rng();

        let resolution = self.chain.resolve(range, requested, now, &mut rng).await;
        let provenance = if resolution.tier.is_real() {
            Provenance::Real
        } else {
            Provenance::Synthetic
        };

        let result = DataSourceResult::new(
            resolution.records,
            provenance,
            resolution.source,
            Utc::now(),
        );

        info!(
            "Fetched {} observations from {} floats across {} regions ({:?}, source {})",
            result.records.len(),
            result.total_floats,
            result.regions_present.len(),
            result.provenance,
            result.source
        );
        result
    }

    /// Like [`fetch`](Self::fetch), abandoned as soon as `cancel` flips to `true`.
    ///
    /// Abandoning drops the in-flight request future, which aborts the HTTP call.
    pub async fn fetch_cancellable(
        &self,
        range: TimeRange,
        requested: RegionQuery,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<DataSourceResult> {
        if *cancel.borrow() {
            return Err(AppError::Cancelled);
        }

        tokio::select! {
            result = self.fetch(range, requested) => Ok(result),
            _ = wait_for_cancel(&mut cancel) => {
                info!("Fetch for {} / {} cancelled by caller", range, requested);
                Err(AppError::Cancelled)
            }
        }
    }

    /// Generated data for exploratory panels; never touches the network.
    pub fn preview(&self, range: TimeRange, requested: RegionQuery) -> DataSourceResult {
        let now = Utc::now();
        let records = synthetic::generate(range, requested, now, &mut self.rng());
        DataSourceResult::new(records, Provenance::Synthetic, "synthetic", now)
    }
}

async fn wait_for_cancel(cancel: &mut watch::Receiver<bool>) {
    loop {
        if cancel.changed().await.is_err() {
            // Sender dropped without cancelling
            std::future::pending::<()>().await;
        }
        if *cancel.borrow() {
            return;
        }
    }
}
