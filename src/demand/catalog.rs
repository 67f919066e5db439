use indexmap::IndexSet;

use crate::data::types::{BidRecord, MarketKey};

/// Distinct markets a bidder ever bid in, in first-seen order.
///
/// Position in the catalog is the index used by every demand vector
/// assembled for that bidder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketCatalog {
    keys: IndexSet<MarketKey>,
}

impl MarketCatalog {
    pub fn build(partition: &[BidRecord]) -> Self {
        let mut keys = IndexSet::new();
        for record in partition {
            keys.insert(record.market_key());
        }
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &MarketKey> {
        self.keys.iter()
    }

    pub fn get(&self, index: usize) -> Option<&MarketKey> {
        self.keys.get_index(index)
    }

    pub fn index_of(&self, key: &MarketKey) -> Option<usize> {
        self.keys.get_index_of(key)
    }
}
