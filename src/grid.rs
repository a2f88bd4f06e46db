//! Grids of drawing surfaces.
//!
//! Adapters either draw into a grid handed in by the caller or build one with
//! [`AxesGrid::create`]; [`AxesGrid::resolve`] is the single place where that choice is made.

use crate::error::{PlotError, PlotResult};
use crate::figure::Figure;
use crate::rcparams::{Options, RcParams};

/// `rows x cols` cells in row-major order; unused cells are `None`.
#[derive(Debug, Clone)]
pub struct AxesGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Figure>>,
}

impl AxesGrid {
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<Option<Figure>>) -> PlotResult<Self> {
        if cells.len() != rows * cols {
            return Err(PlotError::InvalidOption {
                key: "axes".to_string(),
                reason: format!("{} cells do not fill a {rows}x{cols} grid", cells.len()),
            });
        }
        Ok(Self { rows, cols, cells })
    }

    /// Row-major nested cells; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<Option<Figure>>>) -> PlotResult<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != n_cols) {
            return Err(PlotError::InvalidOption {
                key: "axes".to_string(),
                reason: "rows of the axes grid differ in length".to_string(),
            });
        }
        Self::from_cells(n_rows, n_cols, rows.into_iter().flatten().collect())
    }

    /// A single surface as a `1 x 1` grid.
    pub fn from_figure(figure: Figure) -> Self {
        Self {
            rows: 1,
            cols: 1,
            cells: vec![Some(figure)],
        }
    }

    /// Builds `rows x cols` figures for `length_plotters` plots.
    ///
    /// Figure size is `figsize * dpi` when `figsize` is given, else the `width` / `height`
    /// kwargs. With `sharex` / `sharey` every figure holds the first figure's range handle.
    /// Cells past `length_plotters` stay empty.
    pub fn create(
        length_plotters: usize,
        rows: usize,
        cols: usize,
        figsize: Option<(f64, f64)>,
        sharex: bool,
        sharey: bool,
        backend_kwargs: &Options,
    ) -> PlotResult<Self> {
        if rows * cols < length_plotters {
            return Err(PlotError::GridTooSmall {
                rows,
                cols,
                needed: length_plotters,
            });
        }

        let (width, height) = figure_size(figsize, backend_kwargs)?;
        let tools = backend_kwargs
            .get("tools")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let output_backend = backend_kwargs
            .get("output_backend")
            .and_then(|v| v.as_str())
            .unwrap_or("canvas")
            .to_string();

        let mut cells: Vec<Option<Figure>> = Vec::with_capacity(rows * cols);
        for idx in 0..rows * cols {
            if idx >= length_plotters {
                cells.push(None);
                continue;
            }
            let mut figure = Figure::new(width, height);
            figure.tools = tools.clone();
            figure.output_backend = output_backend.clone();
            if let Some(Some(first)) = cells.first() {
                if sharex {
                    figure.set_x_range(&first.x_range);
                }
                if sharey {
                    figure.set_y_range(&first.y_range);
                }
            }
            cells.push(Some(figure));
        }

        Ok(Self { rows, cols, cells })
    }

    /// Returns the caller's grid when there is one, otherwise whatever `create` builds.
    pub fn resolve<F>(axes: Option<AxesGrid>, create: F) -> PlotResult<Self>
    where
        F: FnOnce() -> PlotResult<Self>,
    {
        match axes {
            Some(axes) => Ok(axes),
            None => create(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Figure> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells[row * self.cols + col].as_ref()
    }

    pub fn cells(&self) -> &[Option<Figure>] {
        &self.cells
    }

    /// Populated figures in row-major order.
    pub fn figures(&self) -> impl Iterator<Item = &Figure> {
        self.cells.iter().flatten()
    }

    pub fn figures_mut(&mut self) -> impl Iterator<Item = &mut Figure> {
        self.cells.iter_mut().flatten()
    }

    pub fn n_figures(&self) -> usize {
        self.figures().count()
    }

    /// The `idx`-th populated figure.
    pub fn figure_mut(&mut self, idx: usize) -> Option<&mut Figure> {
        self.figures_mut().nth(idx)
    }
}

fn figure_size(
    figsize: Option<(f64, f64)>,
    backend_kwargs: &Options,
) -> PlotResult<(usize, usize)> {
    let pixels = |key: &str| -> PlotResult<usize> {
        backend_kwargs
            .get(key)
            .and_then(|v| v.as_usize())
            .ok_or_else(|| PlotError::InvalidOption {
                key: key.to_string(),
                reason: "expected a pixel count".to_string(),
            })
    };
    match figsize {
        Some((w, h)) => {
            let dpi = backend_kwargs
                .get("dpi")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| PlotError::InvalidOption {
                    key: "dpi".to_string(),
                    reason: "expected a number".to_string(),
                })?;
            Ok(((w * dpi) as usize, (h * dpi) as usize))
        }
        None => Ok((pixels("width")?, pixels("height")?)),
    }
}

/// Rows and columns for `n_items` plots, at most `max_cols` wide and, once wider than one
/// row, at least three columns.
pub fn default_grid(n_items: usize, max_cols: usize) -> (usize, usize) {
    let min_cols = 3.min(max_cols);
    if n_items <= max_cols {
        return (1, n_items.max(1));
    }
    let in_bounds = |v: i64| v.clamp(min_cols as i64, max_cols as i64) as usize;
    let ideal = in_bounds((n_items as f64).sqrt().round() as i64);
    for offset in [0, 1, -1, 2, -2] {
        let cols = in_bounds(ideal as i64 + offset);
        if n_items % cols == 0 {
            return (n_items / cols, cols);
        }
    }
    (n_items / ideal + 1, ideal)
}

/// Grid shape for `n_items` plots from optional caller rows / cols.
///
/// Missing dimensions are filled in so every plot fits; `plot.max_subplots` caps `n_items`.
pub fn grid_shape(
    n_items: usize,
    rows: Option<usize>,
    cols: Option<usize>,
    rc: &RcParams,
) -> PlotResult<(usize, usize)> {
    let max = rc.get_usize("plot.max_subplots")?;
    if n_items > max {
        return Err(PlotError::TooManySubplots {
            requested: n_items,
            max,
        });
    }
    let shape = match (rows, cols) {
        (Some(r), Some(c)) => (r, c),
        (Some(r), None) => (r, n_items.div_ceil(r.max(1))),
        (None, Some(c)) => (n_items.div_ceil(c.max(1)), c),
        (None, None) => default_grid(n_items, 4),
    };
    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rcparams::OptionValue;
    use std::rc::Rc;

    fn kwargs() -> Options {
        RcParams::default().backend_kwarg_defaults(&[]).unwrap()
    }

    #[test]
    fn default_grid_shapes() {
        assert_eq!(default_grid(1, 4), (1, 1));
        assert_eq!(default_grid(4, 4), (1, 4));
        assert_eq!(default_grid(5, 4), (2, 3));
        assert_eq!(default_grid(6, 4), (2, 3));
        assert_eq!(default_grid(9, 4), (3, 3));
        assert_eq!(default_grid(10, 4), (4, 3));
        assert_eq!(default_grid(16, 4), (4, 4));
    }

    #[test]
    fn grid_shape_fills_missing_dimension() {
        let rc = RcParams::default();
        assert_eq!(grid_shape(7, None, Some(2), &rc).unwrap(), (4, 2));
        assert_eq!(grid_shape(7, Some(2), None, &rc).unwrap(), (2, 4));
        assert_eq!(grid_shape(3, Some(5), Some(5), &rc).unwrap(), (5, 5));
        assert!(matches!(
            grid_shape(41, None, None, &rc),
            Err(PlotError::TooManySubplots { .. })
        ));
    }

    #[test]
    fn create_leaves_unused_cells_empty_and_shares_ranges() {
        let grid = AxesGrid::create(5, 2, 3, None, true, false, &kwargs()).unwrap();
        assert_eq!(grid.shape(), (2, 3));
        assert_eq!(grid.n_figures(), 5);
        assert!(grid.get(1, 2).is_none());

        let first = grid.get(0, 0).unwrap();
        let last = grid.get(1, 1).unwrap();
        assert!(Rc::ptr_eq(&first.x_range, &last.x_range));
        assert!(!Rc::ptr_eq(&first.y_range, &last.y_range));
        assert_eq!((first.width, first.height), (500, 500));
        assert_eq!(first.output_backend, "webgl");
    }

    #[test]
    fn create_scales_figsize_by_dpi() {
        let mut kw = kwargs();
        kw.insert("dpi".into(), OptionValue::Int(100));
        let grid = AxesGrid::create(1, 1, 1, Some((4.0, 3.0)), false, false, &kw).unwrap();
        let fig = grid.get(0, 0).unwrap();
        assert_eq!((fig.width, fig.height), (400, 300));
    }

    #[test]
    fn create_rejects_small_grids() {
        assert!(matches!(
            AxesGrid::create(7, 2, 3, None, false, false, &kwargs()),
            Err(PlotError::GridTooSmall { needed: 7, .. })
        ));
    }

    #[test]
    fn resolve_prefers_injected_grid() {
        let injected = AxesGrid::from_figure(Figure::new(123, 45));
        let grid = AxesGrid::resolve(Some(injected), || {
            panic!("factory must not run when a grid is injected")
        })
        .unwrap();
        assert_eq!(grid.get(0, 0).unwrap().width, 123);

        let created = AxesGrid::resolve(None, || {
            AxesGrid::create(2, 1, 2, None, false, false, &kwargs())
        })
        .unwrap();
        assert_eq!(created.n_figures(), 2);
    }

    #[test]
    fn from_rows_checks_shape() {
        let ok = AxesGrid::from_rows(vec![
            vec![Some(Figure::new(1, 1)), None],
            vec![Some(Figure::new(1, 1)), Some(Figure::new(1, 1))],
        ])
        .unwrap();
        assert_eq!(ok.shape(), (2, 2));
        assert_eq!(ok.n_figures(), 3);

        assert!(AxesGrid::from_rows(vec![vec![None], vec![None, None]]).is_err());
    }
}
