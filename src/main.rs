use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;

use netsweep::{
    add_network_stats, Network, NetworkLoader, PlotOptions, PlotRequest, ResultsGrid,
    SamplerConfig, SamplingStrategy, SubnetworkSampler,
};

const NODE_COUNT: usize = 400;
const BLOCK_SIZE: usize = 5;
const NUM_REPS: usize = 5;
const BASE_SEED: u64 = 137;

const STRATEGIES: [SamplingStrategy; 4] = [
    SamplingStrategy::Node,
    SamplingStrategy::Edge,
    SamplingStrategy::Link,
    SamplingStrategy::LinkForward,
];

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

fn parse_args() -> Result<PathBuf> {
    let mut args = env::args().skip(1);
    let output = args.next();
    if let Some(extra) = args.next() {
        anyhow::bail!("Unexpected extra argument: {extra}");
    }
    Ok(output.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("plots")))
}

fn main() -> Result<()> {
    init_logging();
    let output_dir = parse_args()?;
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("ensure output directory {:?}", output_dir))?;

    info!(
        "Building ring-of-blocks network ({} nodes, block size {})",
        NODE_COUNT, BLOCK_SIZE
    );
    let network = build_ring_network(NODE_COUNT, BLOCK_SIZE);
    info!(
        "Network ready: {} nodes, {} edges",
        network.node_count(),
        network.edge_count()
    );

    let sub_sizes: Vec<usize> = (1..=10).map(|step| step * 10).collect();

    info!("Starting sampling sweep");
    let sweep_start = Instant::now();
    for (index, &strategy) in STRATEGIES.iter().enumerate() {
        let seed_base = BASE_SEED + (index as u64) * 1000;
        run_sweep(&network, strategy, &sub_sizes, seed_base, &output_dir)?;
    }
    info!("Sampling sweep completed in {:?}", sweep_start.elapsed());

    Ok(())
}

// One block points at the next: node b * D + i links to every node
// ((b + 1) * D + j) mod N, so every node has out- and in-degree D.
fn build_ring_network(node_count: usize, block_size: usize) -> Network {
    let blocks = node_count / block_size;
    let mut edges = Vec::with_capacity(node_count * block_size);
    for block in 0..blocks {
        for i in 0..block_size {
            let source = format!("n_{}", block * block_size + i);
            for j in 0..block_size {
                let target = format!("n_{}", ((block + 1) * block_size + j) % node_count);
                edges.push((source.clone(), target));
            }
        }
    }
    NetworkLoader::from_edge_names(edges.iter().map(|(s, t)| (s.as_str(), t.as_str())))
}

fn run_sweep(
    network: &Network,
    strategy: SamplingStrategy,
    sub_sizes: &[usize],
    seed_base: u64,
    output_dir: &Path,
) -> Result<()> {
    let label = strategy.label();
    let strategy_start = Instant::now();
    info!("Strategy {label}: sweep start");

    let mut grid: ResultsGrid = ResultsGrid::new(sub_sizes, NUM_REPS)?.with_title(label);
    add_network_stats(&mut grid);

    for (size_index, &size) in sub_sizes.iter().enumerate() {
        let config = SamplerConfig {
            train_size: size,
            test_size: 0,
            strategy,
            seed: Some(seed_base + size_index as u64),
        };
        let mut sampler = SubnetworkSampler::new(network, config)
            .with_context(|| format!("configure {label} sampler for size {size}"))?;
        for rep in 0..NUM_REPS {
            let sample = sampler
                .sample()
                .with_context(|| format!("{label} sample of size {size}, repetition {rep}"))?;
            let subnetwork = network.subnetwork(&sample.train)?;
            grid.record(size, rep, &subnetwork, None, None)?;
        }
    }

    for line in grid.summary().lines() {
        info!("Strategy {label}: {line}");
    }

    let svg = grid.plot(&standard_requests())?;
    let path = output_dir.join(format!("{label}.svg"));
    fs::write(&path, svg).with_context(|| format!("write plot to {:?}", path))?;
    info!(
        "Strategy {label}: sweep done in {:?}, plot at {:?}",
        strategy_start.elapsed(),
        path
    );
    Ok(())
}

fn standard_requests() -> Vec<PlotRequest> {
    let mean_from_zero = PlotOptions {
        plot_mean: true,
        y_min: Some(0.0),
        ..PlotOptions::default()
    };
    vec![
        PlotRequest::metric("Average degree").with_options(mean_from_zero.clone()),
        PlotRequest::group("Out-degree", &["Max out-degree", "Min out-degree"])
            .with_options(mean_from_zero.clone()),
        PlotRequest::group("In-degree", &["Max in-degree", "Min in-degree"])
            .with_options(mean_from_zero.clone()),
        PlotRequest::metric("Self-loop density").with_options(mean_from_zero),
    ]
}
