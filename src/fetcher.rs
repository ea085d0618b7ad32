use crate::error::{AppError, Result};
use crate::models::TimeRange;
use crate::region::{classification_boxes, RegionQuery};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;

        Ok(Self { client })
    }

    /// Single GET bounded by `timeout`. Non-2xx responses are errors; nothing is retried.
    pub async fn download(&self, url: &Url, timeout: Duration) -> Result<String> {
        debug!("Requesting {} (timeout {:?})", url, timeout);

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;

        let content = response.text().await?;
        debug!(
            "Received {} bytes from {}",
            content.len(),
            url.host_str().unwrap_or("?")
        );
        Ok(content)
    }
}

/// Build ERDDAP tabledap queries: `{base}.{ext}?vars&time>=...&latitude>=...`.
///
/// The wildcard yields one unconstrained query. A named region yields one
/// query per classification box, since tabledap constraints can only be
/// ANDed and basins crossing the antimeridian need two longitude ranges.
pub fn erddap_urls(
    base_url: &str,
    extension: &str,
    variables: &[String],
    range: TimeRange,
    requested: RegionQuery,
    now: DateTime<Utc>,
) -> Result<Vec<Url>> {
    let endpoint = format!("{}.{}", base_url.trim_end_matches('/'), extension);
    let base = Url::parse(&endpoint)
        .map_err(|e| AppError::Config(format!("Invalid endpoint URL '{}': {}", endpoint, e)))?;

    let since = range.start(now).to_rfc3339_opts(SecondsFormat::Secs, true);
    let query = format!("{}&time>={}", variables.join(","), since);

    let boxes = requested
        .region()
        .map(classification_boxes)
        .unwrap_or_default();
    if boxes.is_empty() {
        let mut url = base;
        url.set_query(Some(&query));
        return Ok(vec![url]);
    }

    Ok(boxes
        .iter()
        .map(|bounds| {
            let mut url = base.clone();
            url.set_query(Some(&format!(
                "{}&latitude>={}&latitude<={}&longitude>={}&longitude<={}",
                query, bounds.lat_min, bounds.lat_max, bounds.lon_min, bounds.lon_max
            )));
            url
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PayloadFormat;
    use crate::region::Region;
    use chrono::TimeZone;

    fn decoded(url: &Url) -> String {
        url.query()
            .unwrap_or_default()
            .replace("%3E", ">")
            .replace("%3C", "<")
    }

    fn build(extension: &str, range: TimeRange, requested: RegionQuery) -> Vec<Url> {
        let format = match extension {
            "json" => PayloadFormat::TabularJson,
            _ => PayloadFormat::DelimitedText,
        };
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        erddap_urls(
            "https://erddap.example.org/erddap/tabledap/ArgoFloats/",
            extension,
            &format.default_variables(),
            range,
            requested,
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_erddap_url_global() {
        let urls = build("csv", TimeRange::LastWeek, RegionQuery::All);
        assert_eq!(urls.len(), 1);

        assert_eq!(urls[0].path(), "/erddap/tabledap/ArgoFloats.csv");
        let query = decoded(&urls[0]);
        assert!(query.starts_with("platform_number,time,latitude,longitude,pres,temp,psal&"));
        assert!(query.contains("time>=2024-01-08T00:00:00Z"));
        assert!(!query.contains("latitude>="));
    }

    #[test]
    fn test_erddap_url_with_region_box() {
        let urls = build(
            "csv",
            TimeRange::LastMonth,
            RegionQuery::Named(Region::ArabianSea),
        );
        assert_eq!(urls.len(), 1);

        let query = decoded(&urls[0]);
        assert!(query.contains("time>=2023-12-16T00:00:00Z"));
        assert!(query.contains("latitude>=0&latitude<=25&longitude>=50&longitude<=77"));
    }

    #[test]
    fn test_erddap_urls_cover_both_halves_of_pacific() {
        let urls = build(
            "json",
            TimeRange::LastWeek,
            RegionQuery::Named(Region::NorthPacific),
        );
        assert_eq!(urls.len(), 2);

        let queries: Vec<String> = urls.iter().map(decoded).collect();
        assert!(queries
            .iter()
            .any(|q| q.contains("longitude>=120&longitude<=180")));
        assert!(queries
            .iter()
            .any(|q| q.contains("longitude>=-180&longitude<=-80")));
        assert!(queries
            .iter()
            .all(|q| q.contains("latitude>=0&latitude<=66")));
    }

    #[test]
    fn test_json_request_names_bgc_variables() {
        let urls = build("json", TimeRange::LastWeek, RegionQuery::All);
        let query = decoded(&urls[0]);
        assert!(query.starts_with(
            "platform_number,time,latitude,longitude,pres,temp,psal,doxy,chla,nitrate&"
        ));
    }

    #[test]
    fn test_erddap_url_rejects_garbage() {
        let result = erddap_urls(
            "not a url",
            "json",
            &[],
            TimeRange::LastWeek,
            RegionQuery::All,
            Utc::now(),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_fetcher_builds() {
        assert!(Fetcher::new("argo-feed/0.1.0").is_ok());
    }
}
