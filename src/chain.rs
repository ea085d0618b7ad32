use crate::config::{Config, EndpointConfig};
use crate::error::{AppError, Result};
use crate::fetcher::{erddap_urls, Fetcher};
use crate::models::{ObservationRecord, TimeRange};
use crate::parser::{ParseContext, PayloadFormat};
use crate::region::RegionQuery;
use crate::synthetic;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Priority level of a candidate source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Primary,
    Secondary,
    Alternative,
    Synthetic,
}

impl Tier {
    pub fn default_timeout(&self) -> Duration {
        match self {
            Tier::Primary => Duration::from_secs(15),
            Tier::Secondary => Duration::from_secs(12),
            Tier::Alternative | Tier::Synthetic => Duration::from_secs(10),
        }
    }

    /// Only the ERDDAP tiers count as real data.
    pub fn is_real(&self) -> bool {
        matches!(self, Tier::Primary | Tier::Secondary)
    }
}

/// One external source: where to ask and how to read the answer.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub base_url: String,
    pub format: PayloadFormat,
    pub tier: Tier,
    /// Per-request bound; a split region issues several requests
    pub timeout: Duration,
    /// ERDDAP variables named in the query; unused by the probe
    pub variables: Vec<String>,
}

impl Candidate {
    fn from_endpoint(endpoint: &EndpointConfig, format: PayloadFormat, tier: Tier) -> Self {
        Self {
            name: endpoint.name.clone(),
            base_url: endpoint.base_url.clone(),
            format,
            tier,
            timeout: endpoint
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or_else(|| tier.default_timeout()),
            variables: endpoint
                .variables
                .clone()
                .unwrap_or_else(|| format.default_variables()),
        }
    }

    /// Every URL needed to cover `requested`; the probe always has exactly one.
    pub fn request_urls(
        &self,
        range: TimeRange,
        requested: RegionQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Url>> {
        match self.format.extension() {
            Some(ext) => erddap_urls(&self.base_url, ext, &self.variables, range, requested, now),
            None => {
                let url = Url::parse(&self.base_url).map_err(|e| {
                    AppError::Config(format!("Invalid endpoint URL '{}': {}", self.base_url, e))
                })?;
                Ok(vec![url])
            }
        }
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?} tier)", self.name, self.tier)
    }
}

/// Records plus the tier and candidate that produced them.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub records: Vec<ObservationRecord>,
    pub tier: Tier,
    pub source: String,
}

/// Try each item in order and return the first non-empty success.
///
/// Failures and empty results are logged and skipped; no item is attempted twice.
pub async fn first_non_empty<'a, C, F, Fut, T>(
    candidates: &'a [C],
    mut attempt: F,
) -> Option<(&'a C, Vec<T>)>
where
    C: std::fmt::Display,
    F: FnMut(&'a C) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    for candidate in candidates {
        match attempt(candidate).await {
            Ok(items) if !items.is_empty() => return Some((candidate, items)),
            Ok(_) => debug!("{} returned no records, moving on", candidate),
            Err(e) => warn!("{} failed: {}", candidate, e),
        }
    }
    None
}

pub struct SourceChain {
    fetcher: Fetcher,
    candidates: Vec<Candidate>,
}

impl SourceChain {
    pub fn new(fetcher: Fetcher, candidates: Vec<Candidate>) -> Self {
        Self {
            fetcher,
            candidates,
        }
    }

    /// Primary JSON endpoints, then secondary CSV endpoints, then the probe.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = Fetcher::new(&config.user_agent)?;

        let mut candidates: Vec<Candidate> = config
            .sources
            .primary
            .iter()
            .map(|e| Candidate::from_endpoint(e, PayloadFormat::TabularJson, Tier::Primary))
            .collect();
        candidates.extend(config.sources.secondary.iter().map(|e| {
            Candidate::from_endpoint(e, PayloadFormat::DelimitedText, Tier::Secondary)
        }));
        if let Some(alternative) = &config.sources.alternative {
            candidates.push(Candidate::from_endpoint(
                alternative,
                PayloadFormat::ReachabilityProbe,
                Tier::Alternative,
            ));
        }

        Ok(Self::new(fetcher, candidates))
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    async fn attempt(
        &self,
        candidate: &Candidate,
        range: TimeRange,
        ctx: &ParseContext,
    ) -> Result<Vec<ObservationRecord>> {
        let mut records = Vec::new();

        // Any failing part fails the candidate; a partial region is not an answer
        for url in candidate.request_urls(range, ctx.requested, ctx.now)? {
            let payload = self.fetcher.download(&url, candidate.timeout).await?;
            records.extend(candidate.format.parse(&payload, ctx)?);
        }

        for (id, record) in records.iter_mut().enumerate() {
            record.id = id;
        }
        Ok(records)
    }

    /// Walk the candidates in order; fall back to generated data when all fail.
    pub async fn resolve<R: Rng>(
        &self,
        range: TimeRange,
        requested: RegionQuery,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Resolution {
        let ctx = ParseContext::new(requested, now);

        let winner = first_non_empty(&self.candidates, |c| self.attempt(c, range, &ctx)).await;

        if let Some((candidate, records)) = winner {
            info!(
                "Resolved {} records from {} ({:?} tier)",
                records.len(),
                candidate.name,
                candidate.tier
            );
            return Resolution {
                records,
                tier: candidate.tier,
                source: candidate.name.clone(),
            };
        }

        warn!(
            "All {} sources failed for {} / {}, generating synthetic data",
            self.candidates.len(),
            range,
            requested
        );
        Resolution {
            records: synthetic::generate(range, requested, now, rng),
            tier: Tier::Synthetic,
            source: "synthetic".to_string(),
        }
    }
}
