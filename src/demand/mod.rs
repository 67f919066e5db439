pub mod assembler;
pub mod catalog;
pub mod partition;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::DemandConfig;
use crate::data::types::{BidRecord, RoundDemand};
use assembler::{assemble_rounds, Assembly};
use catalog::MarketCatalog;
use partition::partition_by_bidder;

/// Bidder to aligned round demand series, in bidder first-seen order.
pub type DemandPanel = IndexMap<String, Vec<RoundDemand>>;

/// Which record wins when a bidder has several records for the same
/// market in the same round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    KeepFirst,
    KeepLast,
}

fn demand_for_bidder(partition: &[BidRecord], policy: DuplicatePolicy) -> Assembly {
    let catalog = MarketCatalog::build(partition);
    assemble_rounds(partition, &catalog, policy)
}

/// Partition, catalog and assemble every bidder.
pub fn build_panel(records: Vec<BidRecord>, config: &DemandConfig) -> DemandPanel {
    let partitions = partition_by_bidder(records);
    info!("Partitioned bids into {} bidders", partitions.len());

    let policy = config.duplicate_policy;
    let assembled: Vec<(String, Assembly)> = if config.parallel {
        partitions
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(bidder, partition)| {
                let assembly = demand_for_bidder(&partition, policy);
                (bidder, assembly)
            })
            .collect()
    } else {
        partitions
            .into_iter()
            .map(|(bidder, partition)| {
                let assembly = demand_for_bidder(&partition, policy);
                (bidder, assembly)
            })
            .collect()
    };

    let mut panel = DemandPanel::with_capacity(assembled.len());
    for (bidder, assembly) in assembled {
        if assembly.duplicates > 0 {
            warn!(
                "Bidder {}: {} duplicate (round, market) records resolved with {:?}",
                bidder, assembly.duplicates, policy
            );
        }
        panel.insert(bidder, assembly.rounds);
    }

    panel
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelSummary {
    pub bidders: usize,
    pub rounds: usize,
    pub widest_catalog: usize,
}

impl PanelSummary {
    pub fn from_panel(panel: &DemandPanel) -> Self {
        Self {
            bidders: panel.len(),
            rounds: panel.values().map(Vec::len).sum(),
            widest_catalog: panel
                .values()
                .filter_map(|rounds| rounds.first())
                .map(RoundDemand::width)
                .max()
                .unwrap_or(0),
        }
    }
}
