use anyhow::{anyhow, bail, Result};
use log::debug;
use plotters::element::DashedPathElement;
use plotters::prelude::*;

use crate::results::grid::ResultsGrid;

const SUBPLOT_WIDTH: u32 = 640;
const SUBPLOT_HEIGHT: u32 = 220;
const SERIES_COLORS: [RGBColor; 5] = [RED, BLUE, GREEN, MAGENTA, CYAN];

/// Rendering options for one subplot.
#[derive(Debug, Clone, Default)]
pub struct PlotOptions {
    /// Draw the per-row mean as a line instead of scattering every repetition.
    pub plot_mean: bool,
    pub baseline: Option<f64>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub loglog: bool,
}

/// One subplot request: a y-axis label plus the metrics overlaid in it.
#[derive(Debug, Clone)]
pub struct PlotRequest {
    pub label: String,
    pub metrics: Vec<String>,
    pub options: PlotOptions,
}

impl PlotRequest {
    pub fn metric(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            metrics: vec![name],
            options: PlotOptions::default(),
        }
    }

    pub fn group(label: impl Into<String>, metrics: &[&str]) -> Self {
        Self {
            label: label.into(),
            metrics: metrics.iter().map(|name| name.to_string()).collect(),
            options: PlotOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PlotOptions) -> Self {
        self.options = options;
        self
    }
}

impl<M> ResultsGrid<M> {
    /// Render the requested metric groups as stacked subplots sharing the
    /// subnetwork-size x-axis, into an SVG document string. An empty request
    /// list plots every metric, one subplot each.
    pub fn plot(&self, requests: &[PlotRequest]) -> Result<String> {
        render(self, requests)
    }
}

struct Subplot {
    label: String,
    options: PlotOptions,
    // Points actually drawn per overlaid metric, non-finite cells dropped.
    series: Vec<Vec<(f64, f64)>>,
}

fn render<M>(grid: &ResultsGrid<M>, requests: &[PlotRequest]) -> Result<String> {
    let default_requests: Vec<PlotRequest>;
    let requests = if requests.is_empty() {
        default_requests = grid
            .metric_names()
            .into_iter()
            .map(PlotRequest::metric)
            .collect();
        &default_requests
    } else {
        requests
    };
    if requests.is_empty() {
        bail!("nothing to plot: the grid has no metrics");
    }

    let xs: Vec<f64> = grid.sub_sizes().iter().map(|&size| size as f64).collect();
    let subplots = requests
        .iter()
        .map(|request| gather_subplot(grid, request, &xs))
        .collect::<Result<Vec<_>>>()?;

    debug!("rendering {} stacked subplots", subplots.len());

    let total_height = SUBPLOT_HEIGHT * subplots.len() as u32;
    let mut buffer = String::new();
    {
        let root =
            SVGBackend::with_string(&mut buffer, (SUBPLOT_WIDTH, total_height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        let areas = root.split_evenly((subplots.len(), 1));
        let blank_labels = |_: &f64| String::new();

        for (position, (area, subplot)) in areas.iter().zip(subplots.iter()).enumerate() {
            let last = position + 1 == subplots.len();
            let options = &subplot.options;
            let (x_lo, x_hi) = x_range(&xs, options.loglog)?;
            let (y_lo, y_hi) = y_range(subplot);

            let mut builder = ChartBuilder::on(area);
            builder
                .margin(10)
                .x_label_area_size(if last { 36 } else { 12 })
                .y_label_area_size(56);
            if position == 0 {
                if let Some(title) = grid.title() {
                    builder.caption(title, ("sans-serif", 18));
                }
            }

            if options.loglog {
                let (y_lo, y_hi) = positive_range(y_lo, y_hi);
                let mut chart = builder
                    .build_cartesian_2d((x_lo..x_hi).log_scale(), (y_lo..y_hi).log_scale())
                    .map_err(plot_err)?;
                let mut mesh = chart.configure_mesh();
                mesh.y_desc(subplot.label.as_str());
                if last {
                    mesh.x_desc("N_sub");
                } else {
                    mesh.x_label_formatter(&blank_labels);
                }
                mesh.draw().map_err(plot_err)?;

                for (index, points) in subplot.series.iter().enumerate() {
                    let color = SERIES_COLORS[index % SERIES_COLORS.len()];
                    // Log axes cannot place nonpositive coordinates.
                    let drawable: Vec<(f64, f64)> = points
                        .iter()
                        .copied()
                        .filter(|&(x, y)| x > 0.0 && y > 0.0)
                        .collect();
                    if options.plot_mean {
                        chart
                            .draw_series(LineSeries::new(drawable, &color))
                            .map_err(plot_err)?;
                    } else {
                        chart
                            .draw_series(
                                drawable
                                    .into_iter()
                                    .map(|(x, y)| Circle::new((x, y), 3, color.filled())),
                            )
                            .map_err(plot_err)?;
                    }
                }
                if let Some(baseline) = options.baseline {
                    if baseline > 0.0 {
                        chart
                            .draw_series(std::iter::once(DashedPathElement::new(
                                vec![(x_lo, baseline), (x_hi, baseline)],
                                6,
                                3,
                                BLACK,
                            )))
                            .map_err(plot_err)?;
                    }
                }
            } else {
                let mut chart = builder
                    .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
                    .map_err(plot_err)?;
                let mut mesh = chart.configure_mesh();
                mesh.y_desc(subplot.label.as_str());
                if last {
                    mesh.x_desc("N_sub");
                } else {
                    mesh.x_label_formatter(&blank_labels);
                }
                mesh.draw().map_err(plot_err)?;

                for (index, points) in subplot.series.iter().enumerate() {
                    let color = SERIES_COLORS[index % SERIES_COLORS.len()];
                    if options.plot_mean {
                        chart
                            .draw_series(LineSeries::new(points.clone(), &color))
                            .map_err(plot_err)?;
                    } else {
                        chart
                            .draw_series(
                                points
                                    .iter()
                                    .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
                            )
                            .map_err(plot_err)?;
                    }
                }
                if let Some(baseline) = options.baseline {
                    chart
                        .draw_series(std::iter::once(DashedPathElement::new(
                            vec![(x_lo, baseline), (x_hi, baseline)],
                            6,
                            3,
                            BLACK,
                        )))
                        .map_err(plot_err)?;
                }
            }
        }
        root.present().map_err(plot_err)?;
    }
    Ok(buffer)
}

fn gather_subplot<M>(grid: &ResultsGrid<M>, request: &PlotRequest, xs: &[f64]) -> Result<Subplot> {
    if request.metrics.is_empty() {
        bail!("plot request '{}' names no metrics", request.label);
    }

    let mut series = Vec::with_capacity(request.metrics.len());
    for name in &request.metrics {
        let data = grid.values(name)?;
        let mut points = Vec::new();
        if request.options.plot_mean {
            let means = grid.row_means(name)?;
            for (&x, &y) in xs.iter().zip(means.iter()) {
                if y.is_finite() {
                    points.push((x, y));
                }
            }
        } else {
            for rep in 0..data.ncols() {
                for (row, &x) in xs.iter().enumerate() {
                    let y = data[[row, rep]];
                    if y.is_finite() {
                        points.push((x, y));
                    }
                }
            }
        }
        series.push(points);
    }

    Ok(Subplot {
        label: request.label.clone(),
        options: request.options.clone(),
        series,
    })
}

fn x_range(xs: &[f64], loglog: bool) -> Result<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &x in xs {
        if loglog && x <= 0.0 {
            continue;
        }
        lo = lo.min(x);
        hi = hi.max(x);
    }
    if !lo.is_finite() || !hi.is_finite() {
        bail!("no plottable subnetwork sizes");
    }
    if loglog {
        return Ok(positive_range(lo, hi));
    }
    Ok(pad_range(lo, hi))
}

fn y_range(subplot: &Subplot) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for points in &subplot.series {
        for &(_, y) in points {
            lo = lo.min(y);
            hi = hi.max(y);
        }
    }
    if let Some(baseline) = subplot.options.baseline {
        lo = lo.min(baseline);
        hi = hi.max(baseline);
    }
    if !lo.is_finite() || !hi.is_finite() {
        lo = 0.0;
        hi = 1.0;
    }
    let (mut lo, mut hi) = pad_range(lo, hi);
    if let Some(y_min) = subplot.options.y_min {
        lo = y_min;
    }
    if let Some(y_max) = subplot.options.y_max {
        hi = y_max;
    }
    if hi <= lo {
        hi = lo + 1.0;
    }
    (lo, hi)
}

fn pad_range(lo: f64, hi: f64) -> (f64, f64) {
    if lo == hi {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

fn positive_range(lo: f64, hi: f64) -> (f64, f64) {
    let lo = if lo > 0.0 { lo } else { 1e-3 };
    let hi = if hi > lo { hi } else { lo * 10.0 };
    (lo, hi)
}

fn plot_err<E: std::fmt::Display>(err: E) -> anyhow::Error {
    anyhow!("plot rendering failed: {err}")
}
