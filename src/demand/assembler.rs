use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::data::types::{BidRecord, RoundDemand};
use crate::demand::catalog::MarketCatalog;
use crate::demand::DuplicatePolicy;

/// Round demand series of one bidder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub rounds: Vec<RoundDemand>,
    /// Records that shared a (round, market) slot with an earlier record.
    pub duplicates: usize,
}

/// Missing rivals' quantity is reported as zero.
fn rivals_or_zero(rivals_quantity: Option<i64>) -> i64 {
    rivals_quantity.unwrap_or(0)
}

/// Build one aligned demand tuple per round the bidder bid in, ascending by
/// round. Markets without a record in a round stay zero in all three vectors.
pub fn assemble_rounds(
    partition: &[BidRecord],
    catalog: &MarketCatalog,
    policy: DuplicatePolicy,
) -> Assembly {
    let mut by_round: BTreeMap<i64, Vec<&BidRecord>> = BTreeMap::new();
    for record in partition {
        by_round.entry(record.round).or_default().push(record);
    }

    let width = catalog.len();
    let mut assembly = Assembly::default();

    for (round, records) in by_round {
        let mut demand = RoundDemand::empty(round, width);
        let mut filled = vec![false; width];

        for record in records {
            let key = record.market_key();
            let Some(i) = catalog.index_of(&key) else {
                warn!(
                    "Bidder {} round {}: market {} not in catalog, ignoring",
                    record.bidder, round, key
                );
                continue;
            };

            if filled[i] {
                assembly.duplicates += 1;
                debug!(
                    "Bidder {} round {}: duplicate record for market {}",
                    record.bidder, round, key
                );
                if policy == DuplicatePolicy::KeepFirst {
                    continue;
                }
            }

            demand.quantities[i] = record.quantity;
            demand.prices[i] = record.price;
            demand.rivals_quantities[i] = rivals_or_zero(record.rivals_quantity);
            filled[i] = true;
        }

        assembly.rounds.push(demand);
    }

    assembly
}
