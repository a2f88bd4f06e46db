/*!
Layered plotting defaults.

Options are resolved per call by an explicit, ordered merge:

1. library defaults ([`RcParams::default`]),
2. an optional rc file (TOML) layered on top of them ([`RcParams::from_env`],
   [`RcParams::from_file`]),
3. the options passed by the caller.

Nothing is global: every adapter takes the [`RcParams`] it should read from.

# Example

```rust
use mcmc_viz::rcparams::{merge_options, OptionValue, Options, RcParams};

let rc = RcParams::from_toml_str(r#"
[plot.bokeh.figure]
dpi = 72
"#)?;

let defaults = rc.backend_kwarg_defaults(&[])?;
let mut caller = Options::new();
caller.insert("width".into(), OptionValue::Int(300));
let merged = merge_options(&[&defaults, &caller]);

assert_eq!(merged["dpi"], OptionValue::Int(72));
assert_eq!(merged["width"], OptionValue::Int(300));
# Ok::<(), mcmc_viz::error::PlotError>(())
```
*/

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{PlotError, PlotResult};

/// Environment variable naming an rc file layered over the library defaults.
pub const RC_ENV_VAR: &str = "MCMC_VIZ_RC";

/// A single option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Pair(f64, f64),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integers widen to floats, everything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Int(i) => Some(*i as f64),
            OptionValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            OptionValue::Int(i) => usize::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<(f64, f64)> {
        match self {
            OptionValue::Pair(lo, hi) => Some((*lo, *hi)),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(value.into())
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl From<(f64, f64)> for OptionValue {
    fn from((lo, hi): (f64, f64)) -> Self {
        OptionValue::Pair(lo, hi)
    }
}

/// Option name to value, as passed to the adapters (`backend_kwargs`, `backend_config`).
pub type Options = BTreeMap<String, OptionValue>;

/// Merges option maps in order; later layers win.
pub fn merge_options(layers: &[&Options]) -> Options {
    let mut merged = Options::new();
    for layer in layers {
        for (key, value) in layer.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Validator {
    Bool,
    PositiveInt,
    UnitInterval,
    Bounds,
    PointEstimate,
    OneOf(&'static [&'static str]),
    AnyStr,
}

impl Validator {
    fn check(self, key: &str, value: &OptionValue) -> PlotResult<()> {
        let invalid = |reason: &str| PlotError::InvalidOption {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        match self {
            Validator::Bool => value
                .as_bool()
                .map(|_| ())
                .ok_or_else(|| invalid("expected a boolean")),
            Validator::PositiveInt => match value.as_usize() {
                Some(v) if v > 0 => Ok(()),
                _ => Err(invalid("expected a positive integer")),
            },
            Validator::UnitInterval => match value.as_f64() {
                Some(v) if v > 0.0 && v <= 1.0 => Ok(()),
                _ => Err(invalid("expected a number in (0, 1]")),
            },
            Validator::Bounds => match value {
                OptionValue::Str(s) if s == "auto" => Ok(()),
                OptionValue::Pair(lo, hi) if lo < hi => Ok(()),
                _ => Err(invalid("expected \"auto\" or an increasing pair of numbers")),
            },
            Validator::PointEstimate => match value.as_str() {
                Some("mean" | "median" | "mode" | "none") => Ok(()),
                _ => Err(invalid("expected one of mean, median, mode, none")),
            },
            Validator::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.iter().any(|a| *a == s) => Ok(()),
                _ => Err(invalid(&format!("expected one of {}", allowed.join(", ")))),
            },
            Validator::AnyStr => value
                .as_str()
                .map(|_| ())
                .ok_or_else(|| invalid("expected a string")),
        }
    }
}

fn defaults() -> Vec<(&'static str, OptionValue, Validator)> {
    vec![
        ("plot.bokeh.bounds_x_range", "auto".into(), Validator::Bounds),
        ("plot.bokeh.bounds_y_range", "auto".into(), Validator::Bounds),
        ("plot.bokeh.figure.dpi", 60i64.into(), Validator::PositiveInt),
        ("plot.bokeh.figure.height", 500i64.into(), Validator::PositiveInt),
        ("plot.bokeh.figure.width", 500i64.into(), Validator::PositiveInt),
        (
            "plot.bokeh.layout.toolbar_location",
            "above".into(),
            Validator::OneOf(&["above", "below", "left", "right", "none"]),
        ),
        (
            "plot.bokeh.output_backend",
            "webgl".into(),
            Validator::OneOf(&["canvas", "svg", "webgl"]),
        ),
        ("plot.bokeh.show", true.into(), Validator::Bool),
        (
            "plot.bokeh.tools",
            "reset,pan,box_zoom,wheel_zoom,lasso_select,undo,save,hover".into(),
            Validator::AnyStr,
        ),
        ("plot.max_subplots", 40i64.into(), Validator::PositiveInt),
        ("stats.credible_interval", 0.94.into(), Validator::UnitInterval),
        ("stats.point_estimate", "mean".into(), Validator::PointEstimate),
    ]
}

fn validator_for(key: &str) -> Option<Validator> {
    defaults()
        .into_iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, _, v)| v)
}

/// Validated plotting defaults keyed by dotted names such as `plot.bokeh.figure.dpi`.
#[derive(Debug, Clone, PartialEq)]
pub struct RcParams {
    values: BTreeMap<String, OptionValue>,
}

impl Default for RcParams {
    fn default() -> Self {
        let values = defaults()
            .into_iter()
            .map(|(key, value, _)| (key.to_string(), value))
            .collect();
        Self { values }
    }
}

impl RcParams {
    /// Library defaults overlaid with the rc file named by [`RC_ENV_VAR`], if set.
    pub fn from_env() -> PlotResult<Self> {
        match std::env::var_os(RC_ENV_VAR) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Library defaults overlaid with a TOML rc file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlotResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "loading rc file");
        Self::from_toml_str(&text)
    }

    /// Library defaults overlaid with TOML text.
    ///
    /// Keys may be written as quoted dotted names (`"plot.bokeh.show" = false`)
    /// or as nested tables (`[plot.bokeh]` / `show = false`).
    pub fn from_toml_str(text: &str) -> PlotResult<Self> {
        let table: toml::Table = text.parse()?;
        let mut flat = Vec::new();
        flatten_table("", &table, &mut flat);

        let mut rc = Self::default();
        for (key, value) in flat {
            let value: OptionValue = value.try_into()?;
            rc.set(&key, value)?;
        }
        Ok(rc)
    }

    pub fn get(&self, key: &str) -> PlotResult<&OptionValue> {
        self.values
            .get(key)
            .ok_or_else(|| PlotError::UnknownOption(key.to_string()))
    }

    /// Sets a known key after validating the value.
    pub fn set<V: Into<OptionValue>>(&mut self, key: &str, value: V) -> PlotResult<()> {
        let validator =
            validator_for(key).ok_or_else(|| PlotError::UnknownOption(key.to_string()))?;
        let value = value.into();
        validator.check(key, &value)?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get_bool(&self, key: &str) -> PlotResult<bool> {
        self.get(key)?.as_bool().ok_or_else(|| PlotError::InvalidOption {
            key: key.to_string(),
            reason: "expected a boolean".to_string(),
        })
    }

    pub fn get_usize(&self, key: &str) -> PlotResult<usize> {
        self.get(key)?.as_usize().ok_or_else(|| PlotError::InvalidOption {
            key: key.to_string(),
            reason: "expected a non-negative integer".to_string(),
        })
    }

    pub fn get_str(&self, key: &str) -> PlotResult<&str> {
        self.get(key)?.as_str().ok_or_else(|| PlotError::InvalidOption {
            key: key.to_string(),
            reason: "expected a string".to_string(),
        })
    }

    /// Figure keyword defaults.
    ///
    /// `extra` pairs an output name with the rcParam it is read from and takes precedence
    /// over the standard entries (`tools`, `output_backend`, `dpi`, `width`, `height`).
    pub fn backend_kwarg_defaults(&self, extra: &[(&str, &str)]) -> PlotResult<Options> {
        let mut out = Options::new();
        let standard = [
            ("tools", "plot.bokeh.tools"),
            ("output_backend", "plot.bokeh.output_backend"),
            ("dpi", "plot.bokeh.figure.dpi"),
            ("width", "plot.bokeh.figure.width"),
            ("height", "plot.bokeh.figure.height"),
        ];
        for (name, key) in extra.iter().chain(standard.iter()) {
            if !out.contains_key(*name) {
                out.insert(name.to_string(), self.get(key)?.clone());
            }
        }
        Ok(out)
    }

    /// Resolves an optional caller `show` flag against `plot.bokeh.show`.
    pub fn backend_show(&self, show: Option<bool>) -> PlotResult<bool> {
        match show {
            Some(show) => Ok(show),
            None => self.get_bool("plot.bokeh.show"),
        }
    }
}

fn flatten_table(prefix: &str, table: &toml::Table, out: &mut Vec<(String, toml::Value)>) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten_table(&full, inner, out),
            other => out.push((full, other.clone())),
        }
    }
}
