/*!
Plotly backend for recorded figures.

Every [`Figure`] becomes its own [`plotly::Plot`]; a grid becomes one HTML page laying the
plots out in rows and columns. Legend groups follow the recorded legend items so that
clicking an entry toggles every trace the model drew on that figure.
*/

use plotly::common::{
    Anchor, Fill, Font, Line, Marker, MarkerSymbol, Mode,
    Orientation as PlotlyOrientation, Title as PlotlyTitle,
};
use plotly::layout::{Axis, ItemClick, Layout, Legend as PlotlyLegend};
use plotly::{Plot, Scatter};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::error::PlotResult;
use crate::figure::{
    ClickPolicy, Figure, Glyph, GlyphId, Legend, LegendPlace, MarkerKind, Orientation,
    Title,
};
use crate::grid::AxesGrid;
use crate::rcparams::RcParams;

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

type Trace = Box<Scatter<Option<f64>, Option<f64>>>;

fn some(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

/// Joins independent pieces into one trace, separated by gaps.
fn with_gaps<I>(pieces: I) -> (Vec<Option<f64>>, Vec<Option<f64>>)
where
    I: IntoIterator<Item = Vec<(f64, f64)>>,
{
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for piece in pieces {
        for (x, y) in piece {
            xs.push(Some(x));
            ys.push(Some(y));
        }
        xs.push(None);
        ys.push(None);
    }
    (xs, ys)
}

fn glyph_trace(glyph: &Glyph) -> Trace {
    match glyph {
        Glyph::Segments {
            x0,
            y0,
            x1,
            y1,
            line,
        } => {
            let (xs, ys) = with_gaps(
                (0..x0.len()).map(|i| vec![(x0[i], y0[i]), (x1[i], y1[i])]),
            );
            Scatter::new(xs, ys)
                .mode(Mode::Lines)
                .line(Line::new().color(line.color.clone()).width(line.width))
        }
        Glyph::Line { xs, ys, line, .. } => Scatter::new(some(xs), some(ys))
            .mode(Mode::Lines)
            .line(Line::new().color(line.color.clone()).width(line.width)),
        Glyph::Patch { xs, ys, fill, .. } => Scatter::new(some(xs), some(ys))
            .mode(Mode::Lines)
            .fill(Fill::ToSelf)
            .fill_color(fill.color.clone())
            .opacity(fill.alpha)
            .line(Line::new().width(0.0)),
        Glyph::Quads {
            left,
            right,
            top,
            bottom,
            line_color,
            fill,
            ..
        } => {
            let (xs, ys) = with_gaps((0..left.len()).map(|i| {
                vec![
                    (left[i], *bottom),
                    (left[i], top[i]),
                    (right[i], top[i]),
                    (right[i], *bottom),
                    (left[i], *bottom),
                ]
            }));
            let trace = Scatter::new(xs, ys)
                .mode(Mode::Lines)
                .line(Line::new().color(line_color.clone()));
            match fill {
                Some(fill) => trace
                    .fill(Fill::ToSelf)
                    .fill_color(fill.color.clone())
                    .opacity(fill.alpha),
                None => trace,
            }
        }
        Glyph::Markers {
            xs,
            ys,
            kind,
            size,
            fill_color,
            line_color,
        } => {
            let symbol = match kind {
                MarkerKind::Circle => MarkerSymbol::Circle,
                MarkerKind::Diamond => MarkerSymbol::Diamond,
            };
            Scatter::new(some(xs), some(ys)).mode(Mode::Markers).marker(
                Marker::new()
                    .symbol(symbol)
                    .size(size.round() as usize)
                    .color(fill_color.clone())
                    .line(Line::new().color(line_color.clone()).width(1.0)),
            )
        }
    }
}

/// Font sizes such as `13pt` or `16px`; only the number is kept.
fn font_size(size: &str) -> Option<usize> {
    size.trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim()
        .parse::<f64>()
        .ok()
        .map(|v| v.round() as usize)
}

fn plotly_title(title: &Title) -> PlotlyTitle {
    let text = title.text.replace('\n', "<br>");
    let out = PlotlyTitle::from(text.as_str());
    match title.font_size.as_deref().and_then(font_size) {
        Some(size) => out.font(Font::new().size(size)),
        None => out,
    }
}

fn plotly_legend(legend: &Legend) -> PlotlyLegend {
    let orientation = match legend.orientation {
        Orientation::Horizontal => PlotlyOrientation::Horizontal,
        Orientation::Vertical => PlotlyOrientation::Vertical,
    };
    // Plotly has no muting; toggling visibility is the closest match.
    let item_click = match legend.click_policy {
        ClickPolicy::None => ItemClick::False,
        ClickPolicy::Mute => ItemClick::Toggle,
    };
    let out = PlotlyLegend::new()
        .orientation(orientation)
        .item_click(item_click);
    match legend.place {
        LegendPlace::Above => out
            .x(1.0)
            .x_anchor(Anchor::Right)
            .y(1.02)
            .y_anchor(Anchor::Bottom),
        LegendPlace::Center => out
            .x(0.5)
            .x_anchor(Anchor::Center)
            .y(0.5)
            .y_anchor(Anchor::Middle),
    }
}

/// Glyph id to (legend label, whether this glyph carries the visible legend entry).
fn legend_lookup(figure: &Figure) -> HashMap<GlyphId, (String, bool)> {
    let mut lookup = HashMap::new();
    if let Some(legend) = &figure.legend {
        for item in &legend.items {
            for (pos, id) in item.renderers.iter().enumerate() {
                lookup.insert(*id, (item.label.clone(), pos == 0));
            }
        }
    }
    lookup
}

/// Converts one recorded figure into a Plotly plot.
pub fn figure_to_plot(figure: &Figure) -> Plot {
    let mut plot = Plot::new();
    let legend = legend_lookup(figure);

    for (id, glyph) in figure.glyphs().iter().enumerate() {
        let trace = glyph_trace(glyph);
        let trace = match legend.get(&id) {
            Some((label, first)) => trace
                .name(label.as_str())
                .legend_group(label.as_str())
                .show_legend(*first),
            None => trace.show_legend(false),
        };
        plot.add_trace(trace);
    }

    let x = *figure.x_range.borrow();
    let y = *figure.y_range.borrow();
    let mut layout = Layout::new()
        .width(figure.width)
        .height(figure.height)
        .x_axis(Axis::new().range(vec![x.start, x.end]))
        .y_axis(Axis::new().range(vec![y.start, y.end]))
        .show_legend(figure.legend.is_some());
    if let Some(title) = &figure.title {
        layout = layout.title(plotly_title(title));
    }
    if let Some(legend) = &figure.legend {
        layout = layout.legend(plotly_legend(legend));
    }
    plot.set_layout(layout);
    plot
}

/// One HTML page holding every figure of `grid`, empty cells kept as spacers.
pub fn gridplot_html(grid: &AxesGrid, toolbar_location: &str) -> String {
    let (_, cols) = grid.shape();
    let mut cells = String::new();
    for (idx, cell) in grid.cells().iter().enumerate() {
        match cell {
            Some(figure) => {
                let div_id = format!("mcmc-viz-{idx}");
                let plot = figure_to_plot(figure);
                cells.push_str(&format!(
                    "<div class=\"cell\">{}</div>\n",
                    plot.to_inline_html(Some(div_id.as_str()))
                ));
            }
            None => cells.push_str("<div class=\"cell empty\"></div>\n"),
        }
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n\
         <script src=\"{PLOTLY_JS}\"></script>\n</head>\n<body>\n\
         <div class=\"gridplot\" data-toolbar=\"{toolbar_location}\" \
         style=\"display: grid; grid-template-columns: repeat({cols}, max-content); gap: 8px;\">\n\
         {cells}</div>\n</body>\n</html>\n"
    )
}

/// Writes the grid page to `path`.
pub fn save_html<P: AsRef<Path>>(
    grid: &AxesGrid,
    path: P,
    toolbar_location: &str,
) -> PlotResult<()> {
    std::fs::write(path.as_ref(), gridplot_html(grid, toolbar_location))?;
    info!(path = %path.as_ref().display(), "wrote plot page");
    Ok(())
}

/// Renders and opens the grid when `show` (or `plot.bokeh.show`) asks for it.
///
/// Returns the written page. The page stays in the temp dir after the call, since the viewer
/// reads it asynchronously. A viewer that fails to launch is logged, not returned.
pub fn show_layout(
    grid: &AxesGrid,
    show: Option<bool>,
    rc: &RcParams,
) -> PlotResult<Option<PathBuf>> {
    if !rc.backend_show(show)? {
        return Ok(None);
    }
    let toolbar_location = rc.get_str("plot.bokeh.layout.toolbar_location")?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let path =
        std::env::temp_dir().join(format!("mcmc-viz-{}-{stamp}.html", std::process::id()));
    save_html(grid, &path, toolbar_location)?;
    open_in_browser(&path);
    Ok(Some(path))
}

fn open_in_browser(path: &Path) {
    #[cfg(target_os = "macos")]
    let mut command = Command::new("open");
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = Command::new("xdg-open");

    command.arg(path);
    match spawn_reaped(command) {
        Ok(_) => debug!(path = %path.display(), "opened plot page"),
        Err(err) => warn!(path = %path.display(), %err, "could not open a viewer"),
    }
}

/// Starts `command` and waits for it on a background thread so it never lingers as a zombie.
fn spawn_reaped(
    mut command: Command,
) -> std::io::Result<JoinHandle<std::io::Result<ExitStatus>>> {
    let mut child = command.spawn()?;
    Ok(thread::spawn(move || child.wait()))
}
