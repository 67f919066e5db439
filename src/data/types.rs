use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One observed bid, as ingested from the bid panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidRecord {
    pub bidder: String,
    pub round: i64,
    pub market: i64,
    pub category: String,
    pub quantity: i64,
    pub price: i64,
    /// `None` when the source row carried a missing-value sentinel.
    pub rivals_quantity: Option<i64>,
}

impl BidRecord {
    pub fn market_key(&self) -> MarketKey {
        MarketKey {
            market: self.market,
            category: self.category.clone(),
        }
    }
}

/// A market is identified by its number together with its category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketKey {
    pub market: i64,
    pub category: String,
}

impl MarketKey {
    pub fn new(market: i64, category: impl Into<String>) -> Self {
        Self {
            market,
            category: category.into(),
        }
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.market, self.category)
    }
}

/// Demand of one bidder in one round, aligned to the bidder's market catalog.
///
/// Persisted as a plain four-element array:
/// `[round, quantities, prices, rivals_quantities]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundDemand {
    pub round: i64,
    pub quantities: Vec<i64>,
    pub prices: Vec<i64>,
    pub rivals_quantities: Vec<i64>,
}

impl RoundDemand {
    /// Zero-filled vectors for a catalog of `width` markets.
    pub fn empty(round: i64, width: usize) -> Self {
        Self {
            round,
            quantities: vec![0; width],
            prices: vec![0; width],
            rivals_quantities: vec![0; width],
        }
    }

    pub fn width(&self) -> usize {
        self.quantities.len()
    }
}

impl Serialize for RoundDemand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (
            self.round,
            &self.quantities,
            &self.prices,
            &self.rivals_quantities,
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RoundDemand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (round, quantities, prices, rivals_quantities) =
            <(i64, Vec<i64>, Vec<i64>, Vec<i64>)>::deserialize(deserializer)?;

        Ok(Self {
            round,
            quantities,
            prices,
            rivals_quantities,
        })
    }
}
