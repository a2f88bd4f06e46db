/*!
Drawing surfaces.

A [`Figure`] records the primitives issued on it (segments, lines, patches, quads and
markers), its title, its ranges and its legend. Nothing is rasterised here; the
[`render`](crate::render) module turns recorded figures into Plotly plots.

Glyph methods return a [`GlyphId`] so legends can refer back to what a model drew.
*/

use std::cell::RefCell;
use std::rc::Rc;

/// Index of a glyph within its figure.
pub type GlyphId = usize;

/// A solid stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
}

impl LineStyle {
    pub fn new<C: Into<String>>(color: C, width: f64) -> Self {
        Self {
            color: color.into(),
            width,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillStyle {
    pub color: String,
    pub alpha: f64,
}

/// How a glyph looks once its legend entry is muted.
#[derive(Debug, Clone, PartialEq)]
pub struct Muted {
    pub color: String,
    pub alpha: f64,
}

impl Muted {
    /// Same colour at 20% opacity.
    pub fn faded<C: Into<String>>(color: C) -> Self {
        Self {
            color: color.into(),
            alpha: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Circle,
    Diamond,
}

/// A recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum Glyph {
    /// Independent straight segments from `(x0[i], y0[i])` to `(x1[i], y1[i])`.
    Segments {
        x0: Vec<f64>,
        y0: Vec<f64>,
        x1: Vec<f64>,
        y1: Vec<f64>,
        line: LineStyle,
    },
    Line {
        xs: Vec<f64>,
        ys: Vec<f64>,
        line: LineStyle,
        muted: Option<Muted>,
    },
    /// A closed, filled polygon.
    Patch {
        xs: Vec<f64>,
        ys: Vec<f64>,
        fill: FillStyle,
        muted: Option<Muted>,
    },
    /// Axis aligned rectangles; `fill: None` draws outlines only.
    Quads {
        left: Vec<f64>,
        right: Vec<f64>,
        top: Vec<f64>,
        bottom: f64,
        line_color: String,
        fill: Option<FillStyle>,
        muted: Option<Muted>,
    },
    Markers {
        xs: Vec<f64>,
        ys: Vec<f64>,
        kind: MarkerKind,
        size: f64,
        fill_color: String,
        line_color: String,
    },
}

/// Hard limits a range may be panned or zoomed to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeBounds {
    Auto,
    Fixed(f64, f64),
}

/// Visible interval of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataRange {
    pub start: f64,
    pub end: f64,
    pub bounds: RangeBounds,
    /// Smallest span the range may be zoomed to.
    pub min_interval: f64,
}

impl DataRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            bounds: RangeBounds::Auto,
            min_interval: 0.0,
        }
    }

    pub fn bounds(mut self, bounds: RangeBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn min_interval(mut self, min_interval: f64) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn shared(self) -> SharedRange {
        Rc::new(RefCell::new(self))
    }
}

/// A range handle that several figures can hold; a zoom on one is seen by all of them.
pub type SharedRange = Rc<RefCell<DataRange>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Title {
    pub text: String,
    pub font_size: Option<String>,
}

impl Title {
    pub fn new<T: Into<String>>(text: T) -> Self {
        Self {
            text: text.into(),
            font_size: None,
        }
    }

    pub fn font_size<S: Into<String>>(mut self, size: S) -> Self {
        self.font_size = Some(size.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendItem {
    pub label: String,
    pub renderers: Vec<GlyphId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// What clicking a legend entry does to its glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickPolicy {
    None,
    Mute,
}

/// Where a legend is placed relative to the plot area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPlace {
    Above,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub items: Vec<LegendItem>,
    pub location: String,
    pub orientation: Orientation,
    pub click_policy: ClickPolicy,
    pub place: LegendPlace,
}

impl Legend {
    pub fn new(items: Vec<LegendItem>) -> Self {
        Self {
            items,
            location: "top_right".to_string(),
            orientation: Orientation::Vertical,
            click_policy: ClickPolicy::None,
            place: LegendPlace::Center,
        }
    }
}

/// One drawing surface.
#[derive(Debug, Clone)]
pub struct Figure {
    pub width: usize,
    pub height: usize,
    pub tools: String,
    pub output_backend: String,
    pub title: Option<Title>,
    pub x_range: SharedRange,
    pub y_range: SharedRange,
    pub legend: Option<Legend>,
    glyphs: Vec<Glyph>,
}

impl Figure {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            tools: String::new(),
            output_backend: "canvas".to_string(),
            title: None,
            x_range: DataRange::new(0.0, 1.0).shared(),
            y_range: DataRange::new(0.0, 1.0).shared(),
            legend: None,
            glyphs: Vec::new(),
        }
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn glyph(&self, id: GlyphId) -> Option<&Glyph> {
        self.glyphs.get(id)
    }

    fn push(&mut self, glyph: Glyph) -> GlyphId {
        self.glyphs.push(glyph);
        self.glyphs.len() - 1
    }

    pub fn segment(
        &mut self,
        x0: Vec<f64>,
        y0: Vec<f64>,
        x1: Vec<f64>,
        y1: Vec<f64>,
        line: LineStyle,
    ) -> GlyphId {
        self.push(Glyph::Segments { x0, y0, x1, y1, line })
    }

    pub fn line(
        &mut self,
        xs: Vec<f64>,
        ys: Vec<f64>,
        line: LineStyle,
        muted: Option<Muted>,
    ) -> GlyphId {
        self.push(Glyph::Line {
            xs,
            ys,
            line,
            muted,
        })
    }

    pub fn patch(
        &mut self,
        xs: Vec<f64>,
        ys: Vec<f64>,
        fill: FillStyle,
        muted: Option<Muted>,
    ) -> GlyphId {
        self.push(Glyph::Patch {
            xs,
            ys,
            fill,
            muted,
        })
    }

    /// Rectangles `[left[i], right[i]] x [bottom, top[i]]`.
    #[allow(clippy::too_many_arguments)]
    pub fn quad(
        &mut self,
        left: Vec<f64>,
        right: Vec<f64>,
        top: Vec<f64>,
        bottom: f64,
        line_color: String,
        fill: Option<FillStyle>,
        muted: Option<Muted>,
    ) -> GlyphId {
        self.push(Glyph::Quads {
            left,
            right,
            top,
            bottom,
            line_color,
            fill,
            muted,
        })
    }

    fn marker(
        &mut self,
        kind: MarkerKind,
        x: f64,
        y: f64,
        size: f64,
        fill_color: &str,
        line_color: &str,
    ) -> GlyphId {
        self.push(Glyph::Markers {
            xs: vec![x],
            ys: vec![y],
            kind,
            size,
            fill_color: fill_color.to_string(),
            line_color: line_color.to_string(),
        })
    }

    pub fn diamond(
        &mut self,
        x: f64,
        y: f64,
        size: f64,
        fill_color: &str,
        line_color: &str,
    ) -> GlyphId {
        self.marker(MarkerKind::Diamond, x, y, size, fill_color, line_color)
    }

    pub fn circle(
        &mut self,
        x: f64,
        y: f64,
        size: f64,
        fill_color: &str,
        line_color: &str,
    ) -> GlyphId {
        self.marker(MarkerKind::Circle, x, y, size, fill_color, line_color)
    }

    /// Replaces the x range handle, joining whatever figures already share `range`.
    pub fn set_x_range(&mut self, range: &SharedRange) {
        self.x_range = Rc::clone(range);
    }

    pub fn set_y_range(&mut self, range: &SharedRange) {
        self.y_range = Rc::clone(range);
    }

    pub fn set_title(&mut self, title: Title) {
        self.title = Some(title);
    }

    /// Attaches `legend` at `place`, replacing any previous legend.
    pub fn add_legend(&mut self, mut legend: Legend, place: LegendPlace) {
        legend.place = place;
        self.legend = Some(legend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_ids_are_sequential() {
        let mut fig = Figure::new(300, 200);
        let a = fig.line(vec![0.0, 1.0], vec![0.0, 1.0], LineStyle::new("black", 1.0), None);
        let b = fig.circle(0.5, 0.0, 6.0, "red", "black");
        assert_eq!((a, b), (0, 1));
        assert!(matches!(
            fig.glyph(b),
            Some(Glyph::Markers {
                kind: MarkerKind::Circle,
                ..
            })
        ));
        assert_eq!(fig.glyphs().len(), 2);
    }

    #[test]
    fn shared_ranges_follow_each_other() {
        let range = DataRange::new(0.0, 10.0).min_interval(5.0).shared();
        let mut a = Figure::new(100, 100);
        let mut b = Figure::new(100, 100);
        a.set_x_range(&range);
        b.set_x_range(&range);

        a.x_range.borrow_mut().end = 4.0;
        assert_eq!(b.x_range.borrow().end, 4.0);
        assert!(Rc::ptr_eq(&a.x_range, &b.x_range));
        assert!(!Rc::ptr_eq(&a.y_range, &b.y_range));
    }

    #[test]
    fn legend_placement() {
        let mut fig = Figure::new(100, 100);
        let id = fig.line(vec![0.0], vec![0.0], LineStyle::new("blue", 1.0), None);
        fig.add_legend(
            Legend::new(vec![LegendItem {
                label: "model".into(),
                renderers: vec![id],
            }]),
            LegendPlace::Above,
        );
        let legend = fig.legend.as_ref().unwrap();
        assert_eq!(legend.place, LegendPlace::Above);
        assert_eq!(legend.items[0].renderers, vec![0]);
    }
}
