//! USD spot prices (CoinGecko `simple/price`)
//!
//! Successful lookups are cached for the configured TTL. A failed lookup
//! is not cached; the configured fallback price is returned instead so
//! fee estimation never stalls on the price source.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::log_warn;
use crate::rpc::Transport;
use crate::utils::cache::TtlCache;

/// `{"ethereum": {"usd": 2500.12}}`
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct SimplePriceResponse(HashMap<String, HashMap<String, f64>>);

pub struct PriceOracle {
    config: Arc<EngineConfig>,
    transport: Arc<dyn Transport>,
    cache: Mutex<TtlCache<String, f64>>,
}

impl PriceOracle {
    pub fn new(config: Arc<EngineConfig>, transport: Arc<dyn Transport>) -> Self {
        let cache = Mutex::new(TtlCache::new(config.price_cache_ttl()));
        Self {
            config,
            transport,
            cache,
        }
    }

    fn cached(&self, price_id: &str) -> Option<f64> {
        self.cache.lock().ok()?.get(price_id)
    }

    fn remember(&self, price_id: &str, price: f64) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(price_id.to_string(), price);
        }
    }

    async fn fetch(&self, price_id: &str) -> EngineResult<f64> {
        let url = self.config.price_url_for(&[price_id]);
        let body = self
            .transport
            .get_text(&url, self.config.request_timeout())
            .await?;
        let response: SimplePriceResponse = serde_json::from_str(&body)
            .map_err(|e| EngineError::parse_error(format!("Invalid price response: {}", e)))?;
        response
            .0
            .get(price_id)
            .and_then(|quotes| quotes.get("usd"))
            .copied()
            .filter(|price| price.is_finite() && *price > 0.0)
            .ok_or_else(|| EngineError::parse_error(format!("No USD price for {}", price_id)))
    }

    /// USD price for a CoinGecko id: cache, then live source, then fallback.
    pub async fn usd_price(&self, price_id: &str) -> f64 {
        if let Some(price) = self.cached(price_id) {
            return price;
        }
        match self.fetch(price_id).await {
            Ok(price) => {
                self.remember(price_id, price);
                price
            }
            Err(e) => {
                let fallback = self.config.fallback_price(price_id);
                log_warn!(
                    "fees::prices",
                    "Price lookup failed, using fallback",
                    price_id = price_id,
                    fallback = fallback,
                    error = e
                );
                fallback
            }
        }
    }
}
