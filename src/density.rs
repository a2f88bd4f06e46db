/*!
Posterior density plots of one or more models.

Every distinct variable label gets one surface; each model that has the label overlays its
density there. Continuous samples are drawn as a kernel density estimate restricted to the
highest posterior density interval, discrete samples as a histogram.

```rust
use mcmc_viz::data::{var_iter, InferenceData};
use mcmc_viz::density::{plot_density, DensityOptions};
use mcmc_viz::rcparams::RcParams;
use ndarray::Array3;

let draws = Array3::from_shape_fn((2, 250, 1), |(c, d, _)| ((c * 250 + d) as f64 * 0.37).sin());
let data = InferenceData::new().add_continuous("mu", draws);
let entries = var_iter(&data, None, true)?;

let opts = DensityOptions { show: Some(false), ..Default::default() };
let axes = plot_density(None, &[entries], &opts, &RcParams::default())?;
assert_eq!(axes.n_figures(), 1);
# Ok::<(), mcmc_viz::error::PlotError>(())
```
*/

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::data::{PlotterEntry, Samples};
use crate::error::{PlotError, PlotResult};
use crate::figure::{
    ClickPolicy, Figure, FillStyle, GlyphId, Legend, LegendItem, LegendPlace, LineStyle, Muted,
    Orientation, Title,
};
use crate::grid::{grid_shape, AxesGrid};
use crate::rcparams::{merge_options, Options, RcParams};
use crate::render;
use crate::stats::{
    check_credible_interval, fast_kde, get_bins, histogram, hpd, point_estimate_continuous,
    point_estimate_discrete, PointEstimate, DEFAULT_BW,
};

/// Colours handed out to models, in order, when the caller gives none.
pub const DEFAULT_COLORS: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const MARKER_LINE: &str = "black";
const TITLE_FONT_SIZE: &str = "13pt";

#[derive(Debug, Clone)]
pub struct DensityOptions {
    pub bw: f64,
    pub figsize: Option<(f64, f64)>,
    pub rows: Option<usize>,
    pub cols: Option<usize>,
    pub line_width: f64,
    pub markersize: f64,
    /// Mass of the highest posterior density interval, in `(0, 1]`.
    pub credible_interval: f64,
    pub point_estimate: Option<PointEstimate>,
    pub hpd_markers: bool,
    pub outline: bool,
    /// Fill opacity; `0` draws no fill for continuous samples.
    pub shade: f64,
    /// One legend label per model.
    pub data_labels: Option<Vec<String>>,
    /// One colour per model.
    pub colors: Option<Vec<String>>,
    pub backend_kwargs: Options,
    pub show: Option<bool>,
}

impl Default for DensityOptions {
    fn default() -> Self {
        Self {
            bw: DEFAULT_BW,
            figsize: None,
            rows: None,
            cols: None,
            line_width: 2.0,
            markersize: 6.0,
            credible_interval: 0.94,
            point_estimate: Some(PointEstimate::Mean),
            hpd_markers: false,
            outline: true,
            shade: 0.0,
            data_labels: None,
            colors: None,
            backend_kwargs: Options::new(),
            show: None,
        }
    }
}

impl DensityOptions {
    /// Credible interval and point estimate taken from `stats.*` rcParams, everything else
    /// at its default.
    pub fn from_rc(rc: &RcParams) -> PlotResult<Self> {
        let credible_interval = rc
            .get("stats.credible_interval")?
            .as_f64()
            .ok_or_else(|| PlotError::InvalidOption {
                key: "stats.credible_interval".to_string(),
                reason: "expected a number".to_string(),
            })?;
        let point_estimate = match rc.get_str("stats.point_estimate")? {
            "none" => None,
            name => Some(name.parse()?),
        };
        Ok(Self {
            credible_interval,
            point_estimate,
            ..Self::default()
        })
    }
}

/// Distinct labels over all models, in the order they are first seen.
pub fn all_labels(to_plot: &[Vec<PlotterEntry>]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for entry in to_plot.iter().flatten() {
        let label = entry.label();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

fn model_colors(n_models: usize, colors: Option<&[String]>) -> PlotResult<Vec<String>> {
    match colors {
        Some(colors) if colors.len() < n_models => Err(PlotError::InvalidOption {
            key: "colors".to_string(),
            reason: format!("{} colours for {n_models} models", colors.len()),
        }),
        Some(colors) => Ok(colors.to_vec()),
        None => Ok((0..n_models)
            .map(|i| DEFAULT_COLORS[i % DEFAULT_COLORS.len()].to_string())
            .collect()),
    }
}

/// Samples inside `[lo, hi]`.
pub fn restrict_to_interval(values: &[f64], (lo, hi): (f64, f64)) -> Vec<f64> {
    values
        .iter()
        .copied()
        .filter(|v| (lo..=hi).contains(v))
        .collect()
}

/// Shaded region under a curve: back along the baseline, then over the curve, closed at the
/// last point.
fn area_under(x: &[f64], density: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut xs: Vec<f64> = x.iter().rev().copied().collect();
    xs.extend_from_slice(x);
    xs.extend(x.last().copied());

    let mut ys = vec![0.0; x.len()];
    ys.extend_from_slice(density);
    ys.push(0.0);
    (xs, ys)
}

struct Style<'a> {
    color: &'a str,
    opts: &'a DensityOptions,
}

impl Style<'_> {
    fn line(&self) -> LineStyle {
        LineStyle::new(self.color, self.opts.line_width)
    }

    fn muted(&self) -> Option<Muted> {
        Some(Muted::faded(self.color))
    }
}

/// Draws a continuous sample; returns its glyphs and the support of the density.
///
/// A sample too small for a density estimate (for instance a credible interval holding a
/// single draw) draws no curve; its support is the range of the kept samples.
fn draw_continuous(
    figure: &mut Figure,
    values: &[f64],
    style: &Style,
) -> PlotResult<(Vec<GlyphId>, (f64, f64))> {
    let opts = style.opts;
    let restricted;
    let sample = if opts.credible_interval != 1.0 {
        restricted = restrict_to_interval(values, hpd(values, opts.credible_interval)?);
        &restricted[..]
    } else {
        values
    };

    let mut kde = match fast_kde(sample, opts.bw) {
        Ok(kde) => kde,
        Err(PlotError::Degenerate(reason)) => {
            warn!(%reason, samples = sample.len(), "density estimate skipped");
            let lo = sample.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            return Ok((Vec::new(), (lo, hi)));
        }
        Err(err) => return Err(err),
    };
    kde.density *= opts.credible_interval;
    let x = kde.grid().to_vec();
    let density = kde.density.to_vec();
    let (xmin, xmax) = (kde.xmin, kde.xmax);
    let y_first = density.first().copied().unwrap_or_default();
    let y_last = density.last().copied().unwrap_or_default();

    let mut plotted = Vec::new();
    if opts.outline {
        plotted.push(figure.line(x.clone(), density.clone(), style.line(), None));
        plotted.push(figure.line(
            vec![xmin, xmin],
            vec![-y_first / 100.0, y_first],
            style.line(),
            style.muted(),
        ));
        plotted.push(figure.line(
            vec![xmax, xmax],
            vec![-y_last / 100.0, y_last],
            style.line(),
            style.muted(),
        ));
    }
    if opts.shade > 0.0 {
        let (xs, ys) = area_under(&x, &density);
        plotted.push(figure.patch(
            xs,
            ys,
            FillStyle {
                color: style.color.to_string(),
                alpha: opts.shade,
            },
            style.muted(),
        ));
    }
    Ok((plotted, (xmin, xmax)))
}

/// Draws a discrete sample as a histogram; returns its glyphs and the HPD interval.
fn draw_discrete(
    figure: &mut Figure,
    values: &[f64],
    style: &Style,
) -> PlotResult<(Vec<GlyphId>, (f64, f64))> {
    let opts = style.opts;
    let interval = hpd(values, opts.credible_interval)?;
    let bins = get_bins(values)?;
    let hist = histogram(values, &bins)?;
    let edges = hist.edges.to_vec();

    let fill = if opts.outline {
        None
    } else {
        Some(FillStyle {
            color: style.color.to_string(),
            alpha: opts.shade,
        })
    };
    let id = figure.quad(
        edges[..edges.len() - 1].to_vec(),
        edges[1..].to_vec(),
        hist.density.to_vec(),
        0.0,
        style.color.to_string(),
        fill,
        style.muted(),
    );
    Ok((vec![id], interval))
}

fn draw_entry(
    figure: &mut Figure,
    entry: &PlotterEntry,
    style: &Style,
) -> PlotResult<Vec<GlyphId>> {
    let opts = style.opts;
    let label = entry.label();
    let values = entry.values.flatten().to_vec();
    if values.is_empty() {
        return Err(PlotError::EmptySample(label));
    }

    let (mut plotted, (xmin, xmax)) = match &entry.values {
        Samples::Continuous(_) => draw_continuous(figure, &values, style)?,
        Samples::Discrete(_) => draw_discrete(figure, &values, style)?,
    };

    if opts.hpd_markers {
        let size = opts.markersize;
        plotted.push(figure.diamond(xmin, 0.0, size, style.color, MARKER_LINE));
        plotted.push(figure.diamond(xmax, 0.0, size, style.color, MARKER_LINE));
    }

    if let Some(estimate) = opts.point_estimate {
        let est = match &entry.values {
            Samples::Continuous(_) => point_estimate_continuous(estimate, &values, opts.bw)?,
            Samples::Discrete(a) => {
                point_estimate_discrete(estimate, &a.iter().copied().collect::<Vec<_>>())?
            }
        };
        plotted.push(figure.circle(est, 0.0, opts.markersize, style.color, MARKER_LINE));
    }

    figure.set_title(Title::new(label).font_size(TITLE_FONT_SIZE));
    Ok(plotted)
}

/// Overlays the densities of every model, one surface per distinct variable label.
///
/// When `data_labels` is given each surface gets a legend above the plot with one item per
/// model drawn there; clicking an item mutes that model's glyphs. A continuous sample too
/// small for a density estimate draws only its markers and logs a warning.
pub fn plot_density(
    axes: Option<AxesGrid>,
    to_plot: &[Vec<PlotterEntry>],
    opts: &DensityOptions,
    rc: &RcParams,
) -> PlotResult<AxesGrid> {
    check_credible_interval(opts.credible_interval)?;
    let labels = all_labels(to_plot);
    if labels.is_empty() {
        return Err(PlotError::NothingToPlot);
    }
    let colors = model_colors(to_plot.len(), opts.colors.as_deref())?;
    if let Some(data_labels) = &opts.data_labels {
        if data_labels.len() < to_plot.len() {
            return Err(PlotError::InvalidOption {
                key: "data_labels".to_string(),
                reason: format!("{} labels for {} models", data_labels.len(), to_plot.len()),
            });
        }
    }

    let kwargs = merge_options(&[
        &rc.backend_kwarg_defaults(&[("dpi", "plot.bokeh.figure.dpi")])?,
        &opts.backend_kwargs,
    ]);
    let mut axes = AxesGrid::resolve(axes, || {
        let (rows, cols) = grid_shape(labels.len(), opts.rows, opts.cols, rc)?;
        AxesGrid::create(labels.len(), rows, cols, opts.figsize, false, false, &kwargs)
    })?;
    if axes.n_figures() < labels.len() {
        warn!(
            surfaces = axes.n_figures(),
            labels = labels.len(),
            "axes grid has fewer surfaces than labels; extra labels are not drawn"
        );
    }

    let axis_map: HashMap<&str, usize> = labels
        .iter()
        .take(axes.n_figures())
        .enumerate()
        .map(|(idx, label)| (label.as_str(), idx))
        .collect();

    // Per surface, the legend items in model order.
    let mut legend_items: Vec<Vec<LegendItem>> = vec![Vec::new(); axis_map.len()];
    for (m_idx, plotters) in to_plot.iter().enumerate() {
        let style = Style {
            color: &colors[m_idx],
            opts,
        };
        for entry in plotters {
            let label = entry.label();
            let Some(&idx) = axis_map.get(label.as_str()) else {
                continue;
            };
            let figure = axes
                .figure_mut(idx)
                .ok_or_else(|| PlotError::MissingAxis(label.clone()))?;
            debug!(label = %label, model = m_idx, "drawing density");
            let plotted = draw_entry(figure, entry, &style)?;

            if let Some(data_labels) = &opts.data_labels {
                legend_items[idx].push(LegendItem {
                    label: data_labels[m_idx].clone(),
                    renderers: plotted,
                });
            }
        }
    }

    for (idx, items) in legend_items.into_iter().enumerate() {
        if items.is_empty() {
            continue;
        }
        let Some(figure) = axes.figure_mut(idx) else {
            continue;
        };
        let mut legend = Legend::new(items);
        legend.location = "center_right".to_string();
        legend.orientation = Orientation::Horizontal;
        legend.click_policy = ClickPolicy::Mute;
        figure.add_legend(legend, LegendPlace::Above);
    }

    render::show_layout(&axes, opts.show, rc)?;
    Ok(axes)
}
