//! Autocorrelation stem plots.
//!
//! One surface per plotter entry; every surface shares a single x range and a single y range
//! so panning one plot pans all of them.

use ndarray::prelude::*;
use tracing::{debug, warn};

use crate::data::PlotterEntry;
use crate::error::{PlotError, PlotResult};
use crate::figure::{DataRange, Figure, LineStyle, RangeBounds, SharedRange, Title};
use crate::grid::{grid_shape, AxesGrid};
use crate::rcparams::{merge_options, OptionValue, Options, RcParams};
use crate::render;
use crate::stats::autocorr;

const STEM_COLOR: &str = "black";
const BASELINE_COLOR: &str = "steelblue";

#[derive(Debug, Clone)]
pub struct AutocorrOptions {
    /// Number of lags drawn, `[0, max_lag)`.
    pub max_lag: usize,
    pub figsize: Option<(f64, f64)>,
    pub rows: Option<usize>,
    pub cols: Option<usize>,
    pub line_width: f64,
    /// Join all chains before computing the autocorrelation.
    pub combined: bool,
    /// Range settings, `bounds_x_range` and `bounds_y_range`.
    pub backend_config: Options,
    /// Figure settings such as `width`, `height`, `dpi` or `tools`.
    pub backend_kwargs: Options,
    pub show: Option<bool>,
}

impl Default for AutocorrOptions {
    fn default() -> Self {
        Self {
            max_lag: 100,
            figsize: None,
            rows: None,
            cols: None,
            line_width: 1.5,
            combined: false,
            backend_config: Options::new(),
            backend_kwargs: Options::new(),
            show: None,
        }
    }
}

fn range_bounds(key: &str, value: Option<&OptionValue>) -> PlotResult<RangeBounds> {
    match value {
        None => Ok(RangeBounds::Auto),
        Some(v) if v.as_str() == Some("auto") => Ok(RangeBounds::Auto),
        Some(v) => v
            .as_pair()
            .map(|(lo, hi)| RangeBounds::Fixed(lo, hi))
            .ok_or_else(|| PlotError::InvalidOption {
                key: key.to_string(),
                reason: "expected \"auto\" or a (low, high) pair".to_string(),
            }),
    }
}

/// Range settings: rcParam defaults overridden by the caller's `backend_config`.
///
/// `plot.bokeh.bounds_x_range` only becomes a default when it is a fixed pair; `"auto"`
/// leaves the x bounds to the sample size.
pub fn autocorr_config(backend_config: &Options, rc: &RcParams) -> PlotResult<Options> {
    let mut defaults =
        rc.backend_kwarg_defaults(&[("bounds_y_range", "plot.bokeh.bounds_y_range")])?;
    let rc_x = rc.get("plot.bokeh.bounds_x_range")?;
    if rc_x.as_pair().is_some() {
        defaults.insert("bounds_x_range".to_string(), rc_x.clone());
    }
    Ok(merge_options(&[&defaults, backend_config]))
}

/// Shared x range: `[0, max_lag]`, bounded by `bounds_x_range` when configured or by the
/// size of the first entry's samples.
pub fn x_range(
    max_lag: usize,
    config: &Options,
    plotters: &[PlotterEntry],
) -> PlotResult<SharedRange> {
    let bounds = match config.get("bounds_x_range") {
        Some(v) => range_bounds("bounds_x_range", Some(v))?,
        None => {
            let first = plotters.first().ok_or(PlotError::NothingToPlot)?;
            RangeBounds::Fixed(0.0, first.values.len() as f64)
        }
    };
    Ok(DataRange::new(0.0, max_lag as f64)
        .bounds(bounds)
        .min_interval(5.0)
        .shared())
}

/// Shared y range: always `[-1, 1]`.
pub fn y_range(config: &Options) -> PlotResult<SharedRange> {
    let bounds = range_bounds("bounds_y_range", config.get("bounds_y_range"))?;
    Ok(DataRange::new(-1.0, 1.0)
        .bounds(bounds)
        .min_interval(0.1)
        .shared())
}

fn draw_stems(figure: &mut Figure, acf: ArrayView1<f64>, max_lag: usize, line_width: f64) {
    let n = max_lag.min(acf.len());
    let lags: Vec<f64> = (0..n).map(|lag| lag as f64).collect();
    figure.segment(
        lags.clone(),
        vec![0.0; n],
        lags,
        acf.slice(s![..n]).to_vec(),
        LineStyle::new(STEM_COLOR, line_width),
    );
}

/// Draws the autocorrelation of every entry on its own surface.
///
/// With `combined` the chains of an entry are joined into one sequence; otherwise each chain
/// is drawn as its own stem series on the entry's surface.
pub fn plot_autocorr(
    axes: Option<AxesGrid>,
    plotters: &[PlotterEntry],
    opts: &AutocorrOptions,
    rc: &RcParams,
) -> PlotResult<AxesGrid> {
    if plotters.is_empty() {
        return Err(PlotError::NothingToPlot);
    }

    let config = autocorr_config(&opts.backend_config, rc)?;
    let kwargs = merge_options(&[&rc.backend_kwarg_defaults(&[])?, &opts.backend_kwargs]);

    let mut axes = AxesGrid::resolve(axes, || {
        let (rows, cols) = grid_shape(plotters.len(), opts.rows, opts.cols, rc)?;
        AxesGrid::create(plotters.len(), rows, cols, opts.figsize, true, true, &kwargs)
    })?;
    if axes.n_figures() < plotters.len() {
        warn!(
            surfaces = axes.n_figures(),
            entries = plotters.len(),
            "axes grid has fewer surfaces than entries; extra entries are not drawn"
        );
    }

    let x = x_range(opts.max_lag, &config, plotters)?;
    let y = y_range(&config)?;

    for (figure, entry) in axes.figures_mut().zip(plotters) {
        let label = entry.label();
        let series = if opts.combined {
            vec![entry.values.flatten()]
        } else {
            entry.values.chains()
        };
        debug!(label = %label, series = series.len(), "drawing autocorrelation");

        for values in &series {
            let acf = autocorr(values.view())?;
            draw_stems(figure, acf.view(), opts.max_lag, opts.line_width);
        }
        figure.line(
            vec![0.0, opts.max_lag as f64],
            vec![0.0, 0.0],
            LineStyle::new(BASELINE_COLOR, opts.line_width),
            None,
        );

        figure.set_title(Title::new(label));
        figure.set_x_range(&x);
        figure.set_y_range(&y);
    }

    render::show_layout(&axes, opts.show, rc)?;
    Ok(axes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Samples, Selection};
    use crate::figure::Glyph;
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};
    use std::rc::Rc;

    fn ar1(n_chains: usize, n_draws: usize, seed: u64) -> Samples {
        let mut rng = SmallRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut draws = Array2::<f64>::zeros((n_chains, n_draws));
        for mut chain in draws.outer_iter_mut() {
            let mut prev = 0.0;
            for v in chain.iter_mut() {
                prev = 0.8 * prev + noise.sample(&mut rng);
                *v = prev;
            }
        }
        Samples::Continuous(draws)
    }

    fn opts() -> AutocorrOptions {
        AutocorrOptions {
            max_lag: 20,
            combined: true,
            show: Some(false),
            ..Default::default()
        }
    }

    #[test]
    fn x_bounds_default_to_sample_length() {
        let plotters = vec![PlotterEntry::new("mu", Selection::new(), ar1(2, 150, 1))];
        let range = x_range(20, &Options::new(), &plotters).unwrap();
        let range = *range.borrow();
        assert_eq!(range.bounds, RangeBounds::Fixed(0.0, 300.0));
        assert_eq!((range.start, range.end), (0.0, 20.0));
        assert_eq!(range.min_interval, 5.0);

        let mut config = Options::new();
        config.insert("bounds_x_range".into(), (0.0, 50.0).into());
        let range = x_range(20, &config, &plotters).unwrap();
        assert_eq!(range.borrow().bounds, RangeBounds::Fixed(0.0, 50.0));
    }

    #[test]
    fn x_bounds_from_rc_params() {
        let plotters = vec![PlotterEntry::new("mu", Selection::new(), ar1(1, 90, 8))];

        let config = autocorr_config(&Options::new(), &RcParams::default()).unwrap();
        assert!(!config.contains_key("bounds_x_range"));
        let range = x_range(20, &config, &plotters).unwrap();
        assert_eq!(range.borrow().bounds, RangeBounds::Fixed(0.0, 90.0));

        let mut rc = RcParams::default();
        rc.set("plot.bokeh.bounds_x_range", (0.0, 80.0)).unwrap();
        let config = autocorr_config(&Options::new(), &rc).unwrap();
        let range = x_range(20, &config, &plotters).unwrap();
        assert_eq!(range.borrow().bounds, RangeBounds::Fixed(0.0, 80.0));

        let mut caller = Options::new();
        caller.insert("bounds_x_range".into(), "auto".into());
        let config = autocorr_config(&caller, &rc).unwrap();
        let range = x_range(20, &config, &plotters).unwrap();
        assert_eq!(range.borrow().bounds, RangeBounds::Auto);
    }

    #[test]
    fn y_range_is_unit_interval() {
        let mut config = Options::new();
        config.insert("bounds_y_range".into(), "auto".into());
        let range = *y_range(&config).unwrap().borrow();
        assert_eq!((range.start, range.end), (-1.0, 1.0));
        assert_eq!(range.bounds, RangeBounds::Auto);

        config.insert("bounds_y_range".into(), (-2.0, 2.0).into());
        let range = *y_range(&config).unwrap().borrow();
        assert_eq!((range.start, range.end), (-1.0, 1.0));
        assert_eq!(range.bounds, RangeBounds::Fixed(-2.0, 2.0));

        config.insert("bounds_y_range".into(), true.into());
        assert!(y_range(&config).is_err());
    }

    #[test]
    fn stems_baseline_and_shared_ranges() {
        let plotters = vec![
            PlotterEntry::new("mu", Selection::new(), ar1(2, 200, 2)),
            PlotterEntry::new("tau", Selection::new(), ar1(2, 200, 3)),
        ];
        let axes = plot_autocorr(None, &plotters, &opts(), &RcParams::default()).unwrap();
        let figs: Vec<&Figure> = axes.figures().collect();
        assert_eq!(figs.len(), 2);
        assert!(Rc::ptr_eq(&figs[0].x_range, &figs[1].x_range));
        assert!(Rc::ptr_eq(&figs[0].y_range, &figs[1].y_range));
        assert_eq!(figs[1].title.as_ref().unwrap().text, "tau");

        match &figs[0].glyphs()[0] {
            Glyph::Segments { x0, y0, y1, line, .. } => {
                assert_eq!(x0.len(), 20);
                assert!(y0.iter().all(|&v| v == 0.0));
                assert_abs_diff_eq!(y1[0], 1.0, epsilon = 1e-12);
                assert!(y1.iter().all(|v| (-1.0..=1.0 + 1e-12).contains(v)));
                assert_eq!(line.color, "black");
            }
            other => panic!("expected stems, got {other:?}"),
        }
        match &figs[0].glyphs()[1] {
            Glyph::Line { xs, ys, line, .. } => {
                assert_eq!(xs, &vec![0.0, 20.0]);
                assert_eq!(ys, &vec![0.0, 0.0]);
                assert_eq!(line.color, "steelblue");
            }
            other => panic!("expected baseline, got {other:?}"),
        }
    }

    #[test]
    fn separate_chains_overlay_on_one_surface() {
        let plotters = vec![PlotterEntry::new("mu", Selection::new(), ar1(3, 100, 4))];
        let opts = AutocorrOptions {
            combined: false,
            ..opts()
        };
        let axes = plot_autocorr(None, &plotters, &opts, &RcParams::default()).unwrap();
        let fig = axes.get(0, 0).unwrap();
        let stems = fig
            .glyphs()
            .iter()
            .filter(|g| matches!(g, Glyph::Segments { .. }))
            .count();
        assert_eq!(stems, 3);
    }

    #[test]
    fn injected_grid_is_used_and_truncates() {
        let plotters = vec![
            PlotterEntry::new("a", Selection::new(), ar1(1, 50, 5)),
            PlotterEntry::new("b", Selection::new(), ar1(1, 50, 6)),
        ];
        let injected = AxesGrid::from_figure(Figure::new(321, 123));
        let axes =
            plot_autocorr(Some(injected), &plotters, &opts(), &RcParams::default()).unwrap();
        assert_eq!(axes.shape(), (1, 1));
        let fig = axes.get(0, 0).unwrap();
        assert_eq!(fig.width, 321);
        assert_eq!(fig.title.as_ref().unwrap().text, "a");
    }

    #[test]
    fn constant_chain_is_an_error() {
        let plotters = vec![PlotterEntry::new(
            "c",
            Selection::new(),
            Samples::Continuous(Array2::from_elem((1, 30), 2.0)),
        )];
        assert!(matches!(
            plot_autocorr(None, &plotters, &opts(), &RcParams::default()),
            Err(PlotError::Degenerate(_))
        ));
        assert!(matches!(
            plot_autocorr(None, &[], &opts(), &RcParams::default()),
            Err(PlotError::NothingToPlot)
        ));
    }
}
