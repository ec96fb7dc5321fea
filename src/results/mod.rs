pub mod grid;
pub mod plot;

pub use grid::{MetricEvaluator, ResultsGrid};
pub use plot::{PlotOptions, PlotRequest};
