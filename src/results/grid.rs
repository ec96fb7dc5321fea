use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use indexmap::{IndexMap, IndexSet};
use log::debug;
use ndarray::{Array2, Axis};

use crate::network::Network;

pub type AdjacencyMetricFn = dyn Fn(&Array2<f64>) -> f64 + Send + Sync;
pub type NetworkMetricFn = dyn Fn(&Network) -> f64 + Send + Sync;
pub type ModelPairMetricFn<M> = dyn Fn(&M, &M) -> f64 + Send + Sync;
pub type NetworkModelMetricFn<M> = dyn Fn(&Network, &M, &M) -> f64 + Send + Sync;

pub enum MetricEvaluator<M> {
    Adjacency(Arc<AdjacencyMetricFn>),
    Network(Arc<NetworkMetricFn>),
    ModelPair(Arc<ModelPairMetricFn<M>>),
    NetworkAndModelPair(Arc<NetworkModelMetricFn<M>>),
}

impl<M> MetricEvaluator<M> {
    pub fn adjacency<F>(f: F) -> Self
    where
        F: Fn(&Array2<f64>) -> f64 + Send + Sync + 'static,
    {
        Self::Adjacency(Arc::new(f))
    }

    pub fn network<F>(f: F) -> Self
    where
        F: Fn(&Network) -> f64 + Send + Sync + 'static,
    {
        Self::Network(Arc::new(f))
    }

    pub fn model_pair<F>(f: F) -> Self
    where
        F: Fn(&M, &M) -> f64 + Send + Sync + 'static,
    {
        Self::ModelPair(Arc::new(f))
    }

    pub fn network_and_model_pair<F>(f: F) -> Self
    where
        F: Fn(&Network, &M, &M) -> f64 + Send + Sync + 'static,
    {
        Self::NetworkAndModelPair(Arc::new(f))
    }
}

impl<M> Clone for MetricEvaluator<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Adjacency(f) => Self::Adjacency(Arc::clone(f)),
            Self::Network(f) => Self::Network(Arc::clone(f)),
            Self::ModelPair(f) => Self::ModelPair(Arc::clone(f)),
            Self::NetworkAndModelPair(f) => Self::NetworkAndModelPair(Arc::clone(f)),
        }
    }
}

struct Metric<M> {
    // None marks a derived metric, which record skips.
    evaluator: Option<MetricEvaluator<M>>,
    data: Array2<f64>,
}

/// Dense grid over subnetwork sizes (rows) and repetitions (columns), one
/// storage matrix per registered metric. Cells hold NaN until recorded.
pub struct ResultsGrid<M = ()> {
    sub_sizes: IndexSet<usize>,
    num_reps: usize,
    title: Option<String>,
    metrics: IndexMap<String, Metric<M>>,
}

impl<M> ResultsGrid<M> {
    pub fn new(sub_sizes: &[usize], num_reps: usize) -> Result<Self> {
        if num_reps == 0 {
            bail!("a results grid needs at least one repetition column");
        }
        let mut sizes: IndexSet<usize> = IndexSet::with_capacity(sub_sizes.len());
        for &size in sub_sizes {
            if !sizes.insert(size) {
                bail!("subnetwork size {size} listed more than once");
            }
        }
        Ok(Self {
            sub_sizes: sizes,
            num_reps,
            title: None,
            metrics: IndexMap::new(),
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn num_reps(&self) -> usize {
        self.num_reps
    }

    pub fn sub_sizes(&self) -> Vec<usize> {
        self.sub_sizes.iter().copied().collect()
    }

    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.keys().map(String::as_str).collect()
    }

    /// Register a metric under `name`, replacing any metric of the same name.
    pub fn register(&mut self, name: impl Into<String>, evaluator: MetricEvaluator<M>) -> String {
        let name = name.into();
        let metric = Metric {
            evaluator: Some(evaluator),
            data: self.empty_storage(self.num_reps),
        };
        self.metrics.insert(name.clone(), metric);
        name
    }

    pub fn record(
        &mut self,
        size: usize,
        rep: usize,
        network: &Network,
        data_model: Option<&M>,
        fit_model: Option<&M>,
    ) -> Result<()> {
        let row = self
            .sub_sizes
            .get_index_of(&size)
            .ok_or_else(|| anyhow!("size {size} is not a registered subnetwork size"))?;
        if rep >= self.num_reps {
            bail!("repetition {rep} outside 0..{}", self.num_reps);
        }

        let mut adjacency: Option<Array2<f64>> = None;
        for (name, metric) in &mut self.metrics {
            let evaluator = match &metric.evaluator {
                Some(evaluator) => evaluator,
                None => continue,
            };
            let value = match evaluator {
                MetricEvaluator::Adjacency(f) => {
                    let matrix = adjacency.get_or_insert_with(|| network.adjacency_matrix());
                    f(matrix)
                }
                MetricEvaluator::Network(f) => f(network),
                MetricEvaluator::ModelPair(f) => {
                    let (data, fit) = require_models(name, data_model, fit_model)?;
                    f(data, fit)
                }
                MetricEvaluator::NetworkAndModelPair(f) => {
                    let (data, fit) = require_models(name, data_model, fit_model)?;
                    f(network, data, fit)
                }
            };
            metric.data[[row, rep]] = value;
        }
        Ok(())
    }

    /// Derive `name` as the per-row mean squared difference between two
    /// recorded metrics. Later recording does not refresh the result.
    pub fn estimate_mse(&mut self, name: &str, true_name: &str, estimate_name: &str) -> Result<()> {
        let true_data = &self.lookup(true_name)?.data;
        let estimate_data = &self.lookup(estimate_name)?.data;

        let rows = self.sub_sizes.len();
        let mut data = Array2::from_elem((rows, 1), f64::NAN);
        for row in 0..rows {
            let diff = &true_data.row(row) - &estimate_data.row(row);
            data[[row, 0]] = diff.iter().map(|d| d * d).sum::<f64>() / diff.len() as f64;
        }

        debug!("derived metric '{name}' from '{true_name}' vs '{estimate_name}'");
        self.metrics.insert(
            name.to_string(),
            Metric {
                evaluator: None,
                data,
            },
        );
        Ok(())
    }

    pub fn row_means(&self, name: &str) -> Result<Vec<f64>> {
        let metric = self.lookup(name)?;
        let means = metric
            .data
            .mean_axis(Axis(1))
            .ok_or_else(|| anyhow!("metric '{name}' has no repetition columns"))?;
        Ok(means.to_vec())
    }

    pub fn values(&self, name: &str) -> Result<&Array2<f64>> {
        Ok(&self.lookup(name)?.data)
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (name, metric) in &self.metrics {
            let means: Vec<f64> = metric
                .data
                .rows()
                .into_iter()
                .map(|row| row.sum() / row.len() as f64)
                .collect();
            let _ = writeln!(out, "{name}: {means:?}");
        }
        out
    }

    /// A fresh grid with the same registrations but unwritten storage; derived
    /// metrics are not carried over.
    pub fn empty_copy(&self) -> ResultsGrid<M> {
        let mut metrics = IndexMap::with_capacity(self.metrics.len());
        for (name, metric) in &self.metrics {
            if let Some(evaluator) = &metric.evaluator {
                metrics.insert(
                    name.clone(),
                    Metric {
                        evaluator: Some(evaluator.clone()),
                        data: self.empty_storage(self.num_reps),
                    },
                );
            }
        }
        ResultsGrid {
            sub_sizes: self.sub_sizes.clone(),
            num_reps: self.num_reps,
            title: self.title.clone(),
            metrics,
        }
    }

    fn lookup(&self, name: &str) -> Result<&Metric<M>> {
        self.metrics
            .get(name)
            .ok_or_else(|| anyhow!("unknown metric '{name}'"))
    }

    fn empty_storage(&self, columns: usize) -> Array2<f64> {
        Array2::from_elem((self.sub_sizes.len(), columns), f64::NAN)
    }
}

fn require_models<'a, M>(
    name: &str,
    data_model: Option<&'a M>,
    fit_model: Option<&'a M>,
) -> Result<(&'a M, &'a M)> {
    match (data_model, fit_model) {
        (Some(data), Some(fit)) => Ok((data, fit)),
        _ => bail!("metric '{name}' needs both a data model and a fit model"),
    }
}
