//! Per-node statistics (§6) and the running-mean helper used throughout
//! the block/transaction pipelines to update them incrementally.

use serde::Serialize;

/// Incremental (Welford-style, but first-moment only) running mean:
/// folds one more sample into `(mean, count)` without keeping history.
pub fn running_mean(mean: f64, count: u64, sample: f64) -> f64 {
    mean + (sample - mean) / (count + 1) as f64
}

/// The 32-field per-node statistics record produced at `Node::stop` (§6).
/// Field names are `snake_case` on the wire — this crate has no interop
/// requirement with the original camelCase record.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatistics {
    pub node_id: u64,

    pub mean_block_receive_time: f64,
    pub mean_block_propagation_time: f64,
    pub mean_block_size: f64,
    pub total_blocks: u64,

    pub miner: bool,
    pub miner_generated_blocks: u64,
    pub miner_average_block_gen_interval: f64,
    pub miner_average_block_size: f64,
    pub hash_rate: f64,

    pub inv_received_bytes: u64,
    pub inv_sent_bytes: u64,
    pub get_headers_received_bytes: u64,
    pub get_headers_sent_bytes: u64,
    pub headers_received_bytes: u64,
    pub headers_sent_bytes: u64,
    pub get_data_received_bytes: u64,
    pub get_data_sent_bytes: u64,
    pub block_received_bytes: u64,
    pub block_sent_bytes: u64,

    pub longest_fork: u64,
    pub blocks_in_forks: u64,
    pub connections: u64,
    pub block_timeouts: u64,

    pub node_generated_transaction: u64,
    pub mean_endorsement_time: f64,
    pub mean_ordering_time: f64,
    pub mean_validation_time: f64,
    pub mean_latency: f64,

    pub node_type: u8,
    pub mean_number_of_transactions: f64,

    #[serde(skip)]
    sample_counts: SampleCounts,
}

/// Per-field sample counts backing the running means above, kept out of
/// the serialized record.
#[derive(Debug, Clone, Default)]
struct SampleCounts {
    block_receive: u64,
    block_propagation: u64,
    block_size: u64,
    miner_interval: u64,
    miner_size: u64,
    endorsement: u64,
    ordering: u64,
    validation: u64,
    latency: u64,
    number_of_transactions: u64,
}

impl NodeStatistics {
    pub fn new(node_id: u64, node_type: u8, miner: bool, hash_rate: f64) -> Self {
        NodeStatistics {
            node_id,
            mean_block_receive_time: 0.0,
            mean_block_propagation_time: 0.0,
            mean_block_size: 0.0,
            total_blocks: 1, // genesis
            miner,
            miner_generated_blocks: 0,
            miner_average_block_gen_interval: 0.0,
            miner_average_block_size: 0.0,
            hash_rate,
            inv_received_bytes: 0,
            inv_sent_bytes: 0,
            get_headers_received_bytes: 0,
            get_headers_sent_bytes: 0,
            headers_received_bytes: 0,
            headers_sent_bytes: 0,
            get_data_received_bytes: 0,
            get_data_sent_bytes: 0,
            block_received_bytes: 0,
            block_sent_bytes: 0,
            longest_fork: 1,
            blocks_in_forks: 0,
            connections: 0,
            block_timeouts: 0,
            node_generated_transaction: 0,
            mean_endorsement_time: 0.0,
            mean_ordering_time: 0.0,
            mean_validation_time: 0.0,
            mean_latency: 0.0,
            node_type,
            mean_number_of_transactions: 0.0,
            sample_counts: SampleCounts::default(),
        }
    }

    pub fn record_block_receive_time(&mut self, sample: f64) {
        self.mean_block_receive_time =
            running_mean(self.mean_block_receive_time, self.sample_counts.block_receive, sample);
        self.sample_counts.block_receive += 1;
    }

    pub fn record_block_propagation_time(&mut self, sample: f64) {
        self.mean_block_propagation_time = running_mean(
            self.mean_block_propagation_time,
            self.sample_counts.block_propagation,
            sample,
        );
        self.sample_counts.block_propagation += 1;
    }

    pub fn record_block_size(&mut self, sample: f64) {
        self.mean_block_size =
            running_mean(self.mean_block_size, self.sample_counts.block_size, sample);
        self.sample_counts.block_size += 1;
    }

    pub fn record_miner_block_gen_interval(&mut self, sample: f64) {
        self.miner_average_block_gen_interval = running_mean(
            self.miner_average_block_gen_interval,
            self.sample_counts.miner_interval,
            sample,
        );
        self.sample_counts.miner_interval += 1;
    }

    pub fn record_miner_block_size(&mut self, sample: f64) {
        self.miner_average_block_size =
            running_mean(self.miner_average_block_size, self.sample_counts.miner_size, sample);
        self.sample_counts.miner_size += 1;
    }

    pub fn record_endorsement_time(&mut self, sample: f64) {
        self.mean_endorsement_time =
            running_mean(self.mean_endorsement_time, self.sample_counts.endorsement, sample);
        self.sample_counts.endorsement += 1;
    }

    pub fn record_ordering_time(&mut self, sample: f64) {
        self.mean_ordering_time =
            running_mean(self.mean_ordering_time, self.sample_counts.ordering, sample);
        self.sample_counts.ordering += 1;
    }

    pub fn record_validation_time(&mut self, sample: f64) {
        self.mean_validation_time =
            running_mean(self.mean_validation_time, self.sample_counts.validation, sample);
        self.sample_counts.validation += 1;
    }

    pub fn record_latency(&mut self, sample: f64) {
        self.mean_latency = running_mean(self.mean_latency, self.sample_counts.latency, sample);
        self.sample_counts.latency += 1;
    }

    pub fn record_number_of_transactions(&mut self, sample: f64) {
        self.mean_number_of_transactions = running_mean(
            self.mean_number_of_transactions,
            self.sample_counts.number_of_transactions,
            sample,
        );
        self.sample_counts.number_of_transactions += 1;
    }
}
