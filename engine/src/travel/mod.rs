//! Travel-time lookups with a 7-day cache and a monthly API quota
//!
//! Every lookup goes through [`TravelTimeService::estimate`]. Cached answers
//! are free; otherwise a SerpApi directions call is spent from the monthly
//! budget. When the budget is gone, or the API fails, callers get the
//! configured fallback duration instead of an error.

pub mod serpapi;

use crate::config::TravelConfig;
use crate::secrets::SecretCache;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use sdk::errors::EngineError;
use sdk::types::{TravelMode, TravelSource, TravelTimeRequest, TravelTimeResponse, TravelUsage};
use serpapi::DirectionsClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub const SERPAPI_KEY: &str = "SERPAPI_KEY";

/// Something that can tell how long a trip takes, never failing.
///
/// Conflict detection and the travel handler depend on this rather than on
/// the concrete service.
#[async_trait]
pub trait TravelTimeSource: Send + Sync {
    async fn minutes_between(&self, from: &str, to: &str, mode: TravelMode) -> u32;
}

#[derive(Debug, Clone, Copy)]
struct CachedDuration {
    minutes: u32,
    cached_at: DateTime<Utc>,
}

#[derive(Debug)]
struct QuotaState {
    cache: HashMap<String, CachedDuration>,
    calls_used: u32,
    /// (year, month) the counter belongs to
    period: (i32, u32),
    reset_date: DateTime<Utc>,
}

impl QuotaState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            cache: HashMap::new(),
            calls_used: 0,
            period: (now.year(), now.month()),
            reset_date: now,
        }
    }

    /// Zero the counter once the calendar month (UTC) changes
    fn roll_period(&mut self, now: DateTime<Utc>) {
        let period = (now.year(), now.month());
        if period != self.period {
            info!(
                "New quota period {}-{:02}, resetting {} used calls",
                period.0, period.1, self.calls_used
            );
            self.period = period;
            self.calls_used = 0;
            self.reset_date = now;
        }
    }
}

pub struct TravelTimeService {
    config: TravelConfig,
    secrets: Arc<SecretCache>,
    client: DirectionsClient,
    state: Mutex<QuotaState>,
}

impl TravelTimeService {
    pub fn new(config: TravelConfig, secrets: Arc<SecretCache>) -> Self {
        let client = DirectionsClient::new(config.base_url.clone());
        Self {
            config,
            secrets,
            client,
            state: Mutex::new(QuotaState::new(Utc::now())),
        }
    }

    pub fn cache_key(from: &str, to: &str, mode: TravelMode) -> String {
        format!("{}_{}_{}", from.to_lowercase(), to.to_lowercase(), mode)
    }

    fn remaining(&self, used: u32) -> u32 {
        self.config.monthly_quota.saturating_sub(used)
    }

    pub async fn estimate(
        &self,
        request: TravelTimeRequest,
    ) -> Result<TravelTimeResponse, EngineError> {
        self.estimate_at(request, Utc::now()).await
    }

    /// [`estimate`](Self::estimate) with an explicit clock
    pub async fn estimate_at(
        &self,
        request: TravelTimeRequest,
        now: DateTime<Utc>,
    ) -> Result<TravelTimeResponse, EngineError> {
        let (from, to) = match (request.from.as_deref(), request.to.as_deref()) {
            (Some(f), Some(t)) if !f.trim().is_empty() && !t.trim().is_empty() => (f, t),
            _ => {
                return Err(EngineError::InvalidRequest(
                    "Missing from or to location".to_string(),
                ))
            }
        };
        let mode = request.mode.unwrap_or(self.config.default_mode);
        let key = Self::cache_key(from, to, mode);

        // Cache and quota are checked, and a call slot reserved, under one lock
        {
            let mut state = self.state.lock().expect("travel state lock poisoned");
            state.roll_period(now);

            if let Some(cached) = state.cache.get(&key).copied() {
                if now - cached.cached_at < Duration::days(self.config.cache_ttl_days) {
                    debug!("[CACHE HIT] {} -> {}: {}min", from, to, cached.minutes);
                    return Ok(TravelTimeResponse {
                        duration: cached.minutes,
                        source: TravelSource::Cache,
                        api_calls_remaining: Some(self.remaining(state.calls_used)),
                        warning: None,
                        error: None,
                    });
                }
                state.cache.remove(&key);
            }

            if state.calls_used >= self.config.monthly_quota {
                warn!("[API LIMIT REACHED] Using fallback estimate");
                return Ok(TravelTimeResponse {
                    duration: self.config.fallback_minutes,
                    source: TravelSource::Estimate,
                    api_calls_remaining: Some(0),
                    warning: Some("API limit reached, using default estimate".to_string()),
                    error: None,
                });
            }

            state.calls_used += 1;
        }

        let api_key = match self.secrets.get_secret(SERPAPI_KEY) {
            Ok(key) => key,
            Err(e) => {
                self.release_call();
                return Err(e);
            }
        };

        match self
            .client
            .travel_minutes(api_key.unsecure(), from, to, mode)
            .await
        {
            Ok(Some(minutes)) => {
                let mut state = self.state.lock().expect("travel state lock poisoned");
                state.cache.insert(
                    key,
                    CachedDuration {
                        minutes,
                        cached_at: now,
                    },
                );
                info!(
                    "[API CALL {}/{}] {} -> {}: {}min",
                    state.calls_used, self.config.monthly_quota, from, to, minutes
                );
                Ok(TravelTimeResponse {
                    duration: minutes,
                    source: TravelSource::Api,
                    api_calls_remaining: Some(self.remaining(state.calls_used)),
                    warning: None,
                    error: None,
                })
            }
            Ok(None) => {
                let state = self.state.lock().expect("travel state lock poisoned");
                warn!("Directions for {} -> {} had no duration", from, to);
                Ok(TravelTimeResponse {
                    duration: self.config.fallback_minutes,
                    source: TravelSource::Estimate,
                    api_calls_remaining: Some(self.remaining(state.calls_used)),
                    warning: Some("No route duration returned, using default estimate".to_string()),
                    error: None,
                })
            }
            Err(e) => {
                self.release_call();
                warn!("Directions lookup failed: {}", e);
                let message = match &e {
                    EngineError::Upstream { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                Ok(TravelTimeResponse {
                    duration: self.config.fallback_minutes,
                    source: TravelSource::Estimate,
                    api_calls_remaining: None,
                    warning: None,
                    error: Some(message),
                })
            }
        }
    }

    fn release_call(&self) {
        let mut state = self.state.lock().expect("travel state lock poisoned");
        state.calls_used = state.calls_used.saturating_sub(1);
    }

    pub fn usage(&self) -> TravelUsage {
        self.usage_at(Utc::now())
    }

    pub fn usage_at(&self, now: DateTime<Utc>) -> TravelUsage {
        let mut state = self.state.lock().expect("travel state lock poisoned");
        state.roll_period(now);
        TravelUsage {
            api_calls_used: state.calls_used,
            api_calls_remaining: self.remaining(state.calls_used),
            cache_size: state.cache.len(),
            reset_date: state.reset_date,
        }
    }
}

#[async_trait]
impl TravelTimeSource for TravelTimeService {
    async fn minutes_between(&self, from: &str, to: &str, mode: TravelMode) -> u32 {
        match self.estimate(TravelTimeRequest::new(from, to, mode)).await {
            Ok(response) => response.duration,
            Err(e) => {
                warn!("Travel time unavailable ({}), assuming {} min", e, self.config.fallback_minutes);
                self.config.fallback_minutes
            }
        }
    }
}
