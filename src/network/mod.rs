pub mod construction;
pub mod covariates;
pub mod model;

pub use construction::{NetworkLoader, NetworkWriter};
pub use covariates::{EdgeCovariate, NodeCovariate};
pub use model::{EdgeAttributes, Network, NodeAttributes, NodeName, RawNetwork};
