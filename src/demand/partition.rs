use indexmap::IndexMap;

use crate::data::types::BidRecord;

/// Records of one bidder, in input order.
pub type BidderPartitions = IndexMap<String, Vec<BidRecord>>;

/// Split the record set into one partition per bidder.
///
/// Bidders are keyed by exact string match and appear in first-seen order;
/// each partition keeps the relative order of its records.
pub fn partition_by_bidder(records: Vec<BidRecord>) -> BidderPartitions {
    let mut partitions = BidderPartitions::new();

    for record in records {
        partitions
            .entry(record.bidder.clone())
            .or_default()
            .push(record);
    }

    partitions
}
