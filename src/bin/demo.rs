//! Simulates a few autocorrelated chains and writes their autocorrelation and density plots
//! as HTML pages into the current directory.

use mcmc_viz::autocorr::{plot_autocorr, AutocorrOptions};
use mcmc_viz::data::{var_iter, InferenceData};
use mcmc_viz::density::{plot_density, DensityOptions};
use mcmc_viz::rcparams::RcParams;
use mcmc_viz::render::save_html;
use ndarray::Array3;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, Poisson};
use std::error::Error;

const N_CHAINS: usize = 4;
const N_DRAWS: usize = 1000;
const SEED: u64 = 42;

/// AR(1) chains `x[t] = mean + rho * (x[t-1] - mean) + noise`, one column per entry of `rhos`.
fn ar1_draws(
    rng: &mut SmallRng,
    mean: f64,
    rhos: &[f64],
) -> Result<Array3<f64>, Box<dyn Error>> {
    let noise = Normal::new(0.0, 1.0)?;
    let mut draws = Array3::<f64>::zeros((N_CHAINS, N_DRAWS, rhos.len()));
    for chain in 0..N_CHAINS {
        for (dim, rho) in rhos.iter().enumerate() {
            let mut prev = mean;
            for draw in 0..N_DRAWS {
                prev = mean + rho * (prev - mean) + noise.sample(rng);
                draws[[chain, draw, dim]] = prev;
            }
        }
    }
    Ok(draws)
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut rng = SmallRng::seed_from_u64(SEED);
    let rc = RcParams::from_env()?;

    let counts = Poisson::new(3.0)?;
    let k = Array3::from_shape_fn((N_CHAINS, N_DRAWS, 1), |_| counts.sample(&mut rng) as i64);

    let centered = InferenceData::new()
        .add_continuous("mu", ar1_draws(&mut rng, 1.0, &[0.9])?)
        .add_continuous("theta", ar1_draws(&mut rng, 0.0, &[0.2, 0.5, 0.8])?)
        .with_coords("theta", "school", &["Choate", "Deerfield", "Hotchkiss"])?
        .add_discrete("k", k);
    let non_centered = InferenceData::new()
        .add_continuous("mu", ar1_draws(&mut rng, 1.2, &[0.3])?)
        .add_continuous("theta", ar1_draws(&mut rng, 0.3, &[0.1, 0.1, 0.1])?)
        .with_coords("theta", "school", &["Choate", "Deerfield", "Hotchkiss"])?;

    let toolbar = rc.get_str("plot.bokeh.layout.toolbar_location")?;

    let autocorr = plot_autocorr(
        None,
        &var_iter(&centered, Some(&["mu", "theta"]), true)?,
        &AutocorrOptions {
            max_lag: 50,
            combined: true,
            show: Some(false),
            ..Default::default()
        },
        &rc,
    )?;
    save_html(&autocorr, "autocorr.html", toolbar)?;
    println!("Wrote autocorr.html ({} plots)", autocorr.n_figures());

    let density = plot_density(
        None,
        &[
            var_iter(&centered, None, true)?,
            var_iter(&non_centered, None, true)?,
        ],
        &DensityOptions {
            shade: 0.2,
            hpd_markers: true,
            data_labels: Some(vec!["centered".to_string(), "non centered".to_string()]),
            show: Some(false),
            ..DensityOptions::from_rc(&rc)?
        },
        &rc,
    )?;
    save_html(&density, "density.html", toolbar)?;
    println!("Wrote density.html ({} plots)", density.n_figures());

    Ok(())
}
