pub mod disagreement;
pub mod network;
pub mod results;
pub mod sampling;
pub mod stats;

pub use disagreement::{minimum_disagreement, minimum_disagreement_with};
pub use network::{EdgeCovariate, Network, NetworkLoader, NetworkWriter, NodeCovariate};
pub use results::{MetricEvaluator, PlotOptions, PlotRequest, ResultsGrid};
pub use sampling::{SamplerConfig, SamplingStrategy, SubnetworkSample, SubnetworkSampler};
pub use stats::{add_network_stats, rel_mse, robust_mse};
