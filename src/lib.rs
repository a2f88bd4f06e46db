//! Autocorrelation and posterior density plots for MCMC diagnostics.
//!
//! Draws are cut into plotter entries with [`data::var_iter`], drawn onto recorded figures by
//! [`autocorr::plot_autocorr`] or [`density::plot_density`] and rendered to HTML through
//! [`render`]. Defaults come from [`rcparams::RcParams`].

pub mod autocorr;
pub mod data;
pub mod density;
pub mod error;
pub mod figure;
pub mod grid;
pub mod io;
pub mod rcparams;
pub mod render;
pub mod stats;
