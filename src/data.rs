/*!
Posterior draws and the plotter entries the adapters iterate over.

A [`PlotterEntry`] is one `(variable, selection, samples)` triple; its samples are a
`chain x draw` array. [`var_iter`] cuts an [`InferenceData`] (variables stored as
`chain x draw x dim` arrays) into such entries.

# Example

```rust
use mcmc_viz::data::{var_iter, InferenceData};
use ndarray::Array3;

let draws = Array3::<f64>::zeros((2, 100, 3));
let data = InferenceData::new()
    .add_continuous("theta", draws)
    .with_coords("theta", "school", &["a", "b", "c"])?;

let combined = var_iter(&data, None, true)?;
assert_eq!(combined.len(), 3);
assert_eq!(combined[0].label(), "theta\na");

let per_chain = var_iter(&data, Some(&["theta"]), false)?;
assert_eq!(per_chain.len(), 6);
assert_eq!(per_chain[1].label(), "theta\n1, a");
# Ok::<(), mcmc_viz::error::PlotError>(())
```
*/

use ndarray::prelude::*;

use crate::error::{PlotError, PlotResult};

/// Samples of one plotter entry, shaped `chain x draw`.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Continuous(Array2<f64>),
    Discrete(Array2<i64>),
}

impl Samples {
    /// Total number of values across all chains.
    pub fn len(&self) -> usize {
        match self {
            Samples::Continuous(a) => a.len(),
            Samples::Discrete(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All chains joined into one sequence, chain after chain.
    pub fn flatten(&self) -> Array1<f64> {
        match self {
            Samples::Continuous(a) => a.iter().copied().collect(),
            Samples::Discrete(a) => a.iter().map(|&v| v as f64).collect(),
        }
    }

    /// One sequence per chain.
    pub fn chains(&self) -> Vec<Array1<f64>> {
        match self {
            Samples::Continuous(a) => a.outer_iter().map(|row| row.to_owned()).collect(),
            Samples::Discrete(a) => a
                .outer_iter()
                .map(|row| row.mapv(|v| v as f64))
                .collect(),
        }
    }
}

/// Ordered coordinate name to value pairs picking one slice of a variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(Vec<(String, String)>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<N: Into<String>, V: ToString>(mut self, name: N, value: V) -> Self {
        self.0.push((name.into(), value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Title of a variable slice: the name, then the selected values on the next line.
pub fn make_label(var_name: &str, selection: &Selection) -> String {
    if selection.is_empty() {
        return var_name.to_string();
    }
    let values: Vec<&str> = selection.iter().map(|(_, v)| v).collect();
    format!("{var_name}\n{}", values.join(", "))
}

/// One variable slice handed to the plotting adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotterEntry {
    pub var_name: String,
    pub selection: Selection,
    pub values: Samples,
}

impl PlotterEntry {
    pub fn new<N: Into<String>>(var_name: N, selection: Selection, values: Samples) -> Self {
        Self {
            var_name: var_name.into(),
            selection,
            values,
        }
    }

    pub fn label(&self) -> String {
        make_label(&self.var_name, &self.selection)
    }
}

/// Draws of one variable, shaped `chain x draw x dim`.
#[derive(Debug, Clone, PartialEq)]
pub enum Draws {
    Continuous(Array3<f64>),
    Discrete(Array3<i64>),
}

impl Draws {
    fn shape(&self) -> (usize, usize, usize) {
        let s = match self {
            Draws::Continuous(a) => a.dim(),
            Draws::Discrete(a) => a.dim(),
        };
        (s.0, s.1, s.2)
    }

    fn slice(&self, chains: std::ops::Range<usize>, dim: usize) -> Samples {
        match self {
            Draws::Continuous(a) => Samples::Continuous(a.slice(s![chains, .., dim]).to_owned()),
            Draws::Discrete(a) => Samples::Discrete(a.slice(s![chains, .., dim]).to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub draws: Draws,
    /// Name and labels of the last dimension, if it has any.
    pub coords: Option<(String, Vec<String>)>,
}

/// Named variables of a posterior, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceData {
    variables: Vec<Variable>,
}

impl InferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_continuous<N: Into<String>>(self, name: N, draws: Array3<f64>) -> Self {
        self.add(name.into(), Draws::Continuous(draws))
    }

    pub fn add_discrete<N: Into<String>>(self, name: N, draws: Array3<i64>) -> Self {
        self.add(name.into(), Draws::Discrete(draws))
    }

    fn add(mut self, name: String, draws: Draws) -> Self {
        self.variables.retain(|v| v.name != name);
        self.variables.push(Variable {
            name,
            draws,
            coords: None,
        });
        self
    }

    /// Labels the last dimension of `var_name`; one label per entry of that dimension.
    pub fn with_coords(
        mut self,
        var_name: &str,
        dim_name: &str,
        labels: &[&str],
    ) -> PlotResult<Self> {
        let variable = self
            .variables
            .iter_mut()
            .find(|v| v.name == var_name)
            .ok_or_else(|| PlotError::UnknownVariable(var_name.to_string()))?;
        let (_, _, n_dims) = variable.draws.shape();
        if labels.len() != n_dims {
            return Err(PlotError::InvalidOption {
                key: format!("{var_name}.{dim_name}"),
                reason: format!("expected {n_dims} labels, got {}", labels.len()),
            });
        }
        variable.coords = Some((
            dim_name.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
        ));
        Ok(self)
    }

    pub fn var_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> PlotResult<&Variable> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| PlotError::UnknownVariable(name.to_string()))
    }
}

/// Cuts the requested variables (all when `None`) into plotter entries.
///
/// Every entry of the last dimension becomes its own entry. With `combined` each entry holds
/// all chains; otherwise every chain gets its own entry with `chain` prepended to the selection.
pub fn var_iter(
    data: &InferenceData,
    var_names: Option<&[&str]>,
    combined: bool,
) -> PlotResult<Vec<PlotterEntry>> {
    let names: Vec<&str> = match var_names {
        Some(names) => names.to_vec(),
        None => data.var_names(),
    };

    let mut entries = Vec::new();
    for name in names {
        let variable = data.get(name)?;
        let (n_chains, _, n_dims) = variable.draws.shape();
        for dim in 0..n_dims {
            let coord = match &variable.coords {
                Some((dim_name, labels)) => Some((dim_name.as_str(), labels[dim].clone())),
                None if n_dims > 1 => Some(("dim", dim.to_string())),
                None => None,
            };
            let selection_for = |chain: Option<usize>| {
                let mut selection = Selection::new();
                if let Some(chain) = chain {
                    selection = selection.with("chain", chain);
                }
                if let Some((dim_name, value)) = &coord {
                    selection = selection.with(*dim_name, value);
                }
                selection
            };

            if combined {
                entries.push(PlotterEntry::new(
                    name,
                    selection_for(None),
                    variable.draws.slice(0..n_chains, dim),
                ));
            } else {
                for chain in 0..n_chains {
                    entries.push(PlotterEntry::new(
                        name,
                        selection_for(Some(chain)),
                        variable.draws.slice(chain..chain + 1, dim),
                    ));
                }
            }
        }
    }
    Ok(entries)
}
