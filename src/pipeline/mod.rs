//! One Extract → Transform → Load cycle.
//!
//! Stages run to completion one after another; scheduling is left to
//! whatever invokes [`EtlPipeline::run_once`] (cron, a systemd timer, ...).

use crate::config::EtlConfig;
use crate::credentials::TokenStore;
use crate::error::EtlError;
use crate::extract::Extractor;
use crate::load::Loader;
use crate::transform::Transformer;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Counts from one run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Plays returned by the provider
    pub fetched: usize,
    /// Canonical rows produced
    pub normalized: usize,
    /// Rows that were new to the store
    pub inserted: usize,
    /// Why the provider call produced nothing, when it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_error: Option<String>,
}

pub struct EtlPipeline {
    extractor: Extractor,
    transformer: Transformer,
    loader: Loader,
    fetch_limit: u32,
}

impl EtlPipeline {
    pub fn new(extractor: Extractor, transformer: Transformer, loader: Loader, fetch_limit: u32) -> Self {
        Self {
            extractor,
            transformer,
            loader,
            fetch_limit,
        }
    }

    /// Wires all three stages from validated configuration.
    pub fn from_config(config: &EtlConfig, token_store: Arc<dyn TokenStore>) -> Result<Self, EtlError> {
        config.validate_etl()?;

        let extractor = Extractor::new(
            token_store,
            config.spotify.recently_played_url.clone(),
            Duration::from_secs(config.spotify.request_timeout_seconds),
        )?;
        let transformer = Transformer::new(config.target_timezone()?);
        let loader = Loader::open(&config.store.database_path, &config.store.table_name)?;

        Ok(Self::new(extractor, transformer, loader, config.spotify.fetch_limit))
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Runs the cycle once and logs exactly one outcome line.
    pub async fn run_once(&mut self) -> Result<RunReport, EtlError> {
        let result = self.run_stages().await;

        match &result {
            Ok(RunReport {
                upstream_error: Some(reason),
                ..
            }) => {
                warn!(reason = %reason, "0 new events recorded: upstream error");
            }
            Ok(report) if report.inserted > 0 => {
                info!(
                    fetched = report.fetched,
                    inserted = report.inserted,
                    "{} new events recorded",
                    report.inserted
                );
            }
            Ok(report) if report.fetched == 0 => {
                info!("0 new events recorded: no data received from the provider");
            }
            Ok(report) if report.normalized == 0 => {
                warn!(
                    fetched = report.fetched,
                    "0 new events recorded: provider data was malformed"
                );
            }
            Ok(report) => {
                info!(
                    fetched = report.fetched,
                    "0 new events recorded: store is already up to date"
                );
            }
            Err(EtlError::NoCredential(location)) => {
                error!(location = %location, "0 new events recorded: no credential stored");
            }
            Err(EtlError::Parse { value }) => {
                error!(played_at = %value, "0 new events recorded: timestamp format changed upstream");
            }
            Err(e) => {
                error!(error = %e, "0 new events recorded: run failed");
            }
        }

        result
    }

    async fn run_stages(&mut self) -> Result<RunReport, EtlError> {
        let outcome = self.extractor.fetch_outcome(self.fetch_limit).await?;
        let rows = self.transformer.normalize(&outcome.events)?;
        let inserted = self.loader.merge(&rows)?;

        Ok(RunReport {
            fetched: outcome.events.len(),
            normalized: rows.len(),
            inserted,
            upstream_error: outcome.upstream_error,
        })
    }
}
