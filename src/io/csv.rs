/*!
# Posterior draws as CSV

Draws are stored one row per `(chain, sample)` pair with a header of `chain`, `sample` and one
`dim_i` column per dimension. Enable via the `csv` feature.
*/

use ndarray::{Array3, Axis};
use std::fs::File;
use std::path::Path;

use csv::{Reader, Writer};

use crate::error::{PlotError, PlotResult};

/**
Saves draws shaped **chain × sample × dimension** as a CSV file.

# Examples

```rust
use mcmc_viz::io::csv::{load_csv, save_csv};
use ndarray::arr3;

let data = arr3(&[[[1.0, 2.0], [3.0, 4.0]], [[5.0, 6.0], [7.0, 8.0]]]);
let file = tempfile::NamedTempFile::new()?;

save_csv(&data, file.path())?;
assert_eq!(load_csv(file.path())?, data);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn save_csv<T: std::fmt::Display, P: AsRef<Path>>(
    data: &Array3<T>,
    path: P,
) -> PlotResult<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);
    let n_dims = data.shape()[2];

    let mut header: Vec<String> = vec!["chain".to_string(), "sample".to_string()];
    header.extend((0..n_dims).map(|i| format!("dim_{}", i)));
    wtr.write_record(&header)?;

    for (chain_idx, chain) in data.axis_iter(Axis(0)).enumerate() {
        for (sample_idx, sample) in chain.axis_iter(Axis(0)).enumerate() {
            let mut row = vec![chain_idx.to_string(), sample_idx.to_string()];
            row.extend(sample.iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

fn parse_field<T: std::str::FromStr>(record: usize, field: Option<&str>) -> PlotResult<T> {
    let field = field.ok_or_else(|| PlotError::MalformedRecord {
        record,
        reason: "missing field".to_string(),
    })?;
    field.trim().parse().map_err(|_| PlotError::MalformedRecord {
        record,
        reason: format!("cannot parse `{field}`"),
    })
}

/// Loads a file written by [`save_csv`] back into a **chain × sample × dimension** array.
///
/// Rows may come in any order, but every `(chain, sample)` pair up to the largest indices
/// must appear exactly once.
pub fn load_csv<P: AsRef<Path>>(path: P) -> PlotResult<Array3<f64>> {
    let mut rdr = Reader::from_path(path)?;
    let header = rdr.headers()?.clone();
    if header.get(0) != Some("chain") || header.get(1) != Some("sample") {
        return Err(PlotError::MalformedRecord {
            record: 0,
            reason: "header must start with `chain,sample`".to_string(),
        });
    }
    let n_dims = header.len() - 2;

    let mut rows: Vec<(usize, usize, Vec<f64>)> = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let line = idx + 1;
        if record.len() != n_dims + 2 {
            return Err(PlotError::MalformedRecord {
                record: line,
                reason: format!("expected {} fields, got {}", n_dims + 2, record.len()),
            });
        }
        let chain: usize = parse_field(line, record.get(0))?;
        let sample: usize = parse_field(line, record.get(1))?;
        let values = (2..n_dims + 2)
            .map(|i| parse_field(line, record.get(i)))
            .collect::<PlotResult<Vec<f64>>>()?;
        rows.push((chain, sample, values));
    }

    let n_chains = rows.iter().map(|r| r.0 + 1).max().unwrap_or(0);
    let n_samples = rows.iter().map(|r| r.1 + 1).max().unwrap_or(0);
    let mut data = Array3::<f64>::zeros((n_chains, n_samples, n_dims));
    let mut seen = vec![false; n_chains * n_samples];
    for (line, (chain, sample, values)) in rows.into_iter().enumerate() {
        let slot = &mut seen[chain * n_samples + sample];
        if *slot {
            return Err(PlotError::MalformedRecord {
                record: line + 1,
                reason: format!("duplicate chain {chain}, sample {sample}"),
            });
        }
        *slot = true;
        for (d, v) in values.into_iter().enumerate() {
            data[[chain, sample, d]] = v;
        }
    }
    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(PlotError::MalformedRecord {
            record: 0,
            reason: format!(
                "missing chain {}, sample {}",
                missing / n_samples,
                missing % n_samples
            ),
        });
    }
    Ok(data)
}
