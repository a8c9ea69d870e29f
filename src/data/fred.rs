//! FRED API integration for the 30-year fixed mortgage rate series.

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::SourceKind;
use crate::error::PanelError;
use crate::io::ingest::parse_number;

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
const OBS_LIMIT: usize = 100_000;

/// Weekly average 30-year fixed mortgage rate, in percent.
pub const MORTGAGE_SERIES: &str = "MORTGAGE30US";

/// Origin label used in errors and source summaries for FRED fetches.
pub const FRED_ORIGIN: &str = "FRED";

pub struct FredClient {
    client: Client,
    api_key: String,
}

impl FredClient {
    pub fn from_env() -> Result<Self, PanelError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("FRED_API_KEY")
            .map_err(|_| fred_error("missing FRED_API_KEY in environment (.env)"))?;
        Ok(Self {
            client: Client::new(),
            api_key,
        })
    }

    /// Fetch every observation of a series, oldest first. Missing values are dropped.
    pub fn fetch_series(&self, series_id: &str) -> Result<Vec<(NaiveDate, f64)>, PanelError> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[
                ("series_id", series_id),
                ("api_key", &self.api_key),
                ("file_type", "json"),
                ("sort_order", "asc"),
                ("limit", &OBS_LIMIT.to_string()),
            ])
            .send()
            .map_err(|e| fred_error(format!("request for {series_id} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(fred_error(format!(
                "request for {series_id} failed with status {}",
                resp.status()
            )));
        }

        let body: ObservationsResponse = resp
            .json()
            .map_err(|e| fred_error(format!("failed to parse response for {series_id}: {e}")))?;

        let out = parse_observations(body.observations)?;
        if out.is_empty() {
            return Err(fred_error(format!("no observations returned for series {series_id}")));
        }
        log::debug!("FRED {series_id}: {} observations", out.len());
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

fn parse_observations(observations: Vec<Observation>) -> Result<Vec<(NaiveDate, f64)>, PanelError> {
    let mut out = Vec::with_capacity(observations.len());
    for obs in observations {
        // FRED marks missing observations with ".".
        let Some(value) = parse_number(&obs.value) else {
            continue;
        };
        let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
            .map_err(|e| fred_error(format!("invalid FRED date '{}': {e}", obs.date)))?;
        out.push((date, value));
    }
    Ok(out)
}

fn fred_error(message: impl Into<String>) -> PanelError {
    PanelError::Read {
        kind: SourceKind::MortgageRates,
        origin: FRED_ORIGIN.to_string(),
        message: message.into(),
    }
}
