//! Summary statistics drawn by the diagnostic plots: autocorrelation, highest posterior
//! density intervals, kernel density estimates, histograms and point estimates.

use ndarray::prelude::*;
use ndarray_stats::QuantileExt;
use num_traits::ToPrimitive;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::{PlotError, PlotResult};

/// Upper bound on the number of grid points of [`fast_kde`].
pub const KDE_POINTS: usize = 200;

/// Default bandwidth scaling of [`fast_kde`].
pub const DEFAULT_BW: f64 = 4.5;

/// Fails unless `credible_interval` lies in `(0, 1]`.
pub fn check_credible_interval(credible_interval: f64) -> PlotResult<()> {
    if credible_interval > 0.0 && credible_interval <= 1.0 {
        Ok(())
    } else {
        Err(PlotError::InvalidCredibleInterval(credible_interval))
    }
}

/// Converts any primitive numeric slice to `f64`, dropping values that do not fit.
pub fn to_f64_vec<T: ToPrimitive>(values: &[T]) -> Vec<f64> {
    values.iter().filter_map(|v| v.to_f64()).collect()
}

/// Autocovariance of a single chain for every lag `0..n`, computed with an FFT.
///
/// The chain is centred and zero padded to `2n` so the circular correlation equals the
/// linear one. Lag `k` is normalised by `n`, not by `n - k`.
pub fn autocov(x: ArrayView1<f64>) -> PlotResult<Array1<f64>> {
    let n = x.len();
    if n == 0 {
        return Err(PlotError::EmptySample("autocovariance".to_string()));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(PlotError::Degenerate(
            "chain contains non-finite values".to_string(),
        ));
    }

    let mean = x.sum() / n as f64;
    let m = 2 * n;
    let mut buffer: Vec<Complex<f64>> = x
        .iter()
        .map(|&v| Complex::new(v - mean, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)).take(m - n))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(m).process(&mut buffer);
    for c in buffer.iter_mut() {
        *c = Complex::new(c.norm_sqr(), 0.0);
    }
    planner.plan_fft_inverse(m).process(&mut buffer);

    // rustfft leaves the inverse unnormalised.
    let scale = 1.0 / (m as f64 * n as f64);
    Ok(buffer[..n].iter().map(|c| c.re * scale).collect())
}

/// Autocorrelation of a single chain for every lag `0..n`; lag 0 is exactly 1.
///
/// A constant chain has no defined autocorrelation and is rejected.
pub fn autocorr(x: ArrayView1<f64>) -> PlotResult<Array1<f64>> {
    if let Some(first) = x.first() {
        if x.iter().all(|v| v == first) {
            return Err(PlotError::Degenerate(
                "autocorrelation of a constant chain is undefined".to_string(),
            ));
        }
    }
    let cov = autocov(x)?;
    let var = cov[0];
    Ok(cov.mapv(|c| c / var))
}

/// Narrowest interval containing `credible_interval` of the (sorted) samples.
///
/// The interval spans `floor(credible_interval * n)` order statistics; with
/// `credible_interval = 1` it is the full sample range. Non-finite values are ignored.
pub fn hpd(values: &[f64], credible_interval: f64) -> PlotResult<(f64, f64)> {
    check_credible_interval(credible_interval)?;
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(PlotError::EmptySample("hpd".to_string()));
    }
    sorted.sort_unstable_by(f64::total_cmp);

    let n = sorted.len();
    let interval_idx_inc = ((credible_interval * n as f64).floor() as usize).min(n - 1);
    let n_intervals = n - interval_idx_inc;
    let widths: Array1<f64> = (0..n_intervals)
        .map(|i| sorted[i + interval_idx_inc] - sorted[i])
        .collect();
    let min_idx = widths.argmin()?;

    Ok((sorted[min_idx], sorted[min_idx + interval_idx_inc]))
}

/// A density evaluated on `density.len()` evenly spaced points over `[xmin, xmax]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Kde {
    pub density: Array1<f64>,
    pub xmin: f64,
    pub xmax: f64,
}

impl Kde {
    /// The evaluation points of `density`.
    pub fn grid(&self) -> Array1<f64> {
        Array1::linspace(self.xmin, self.xmax, self.density.len())
    }

    /// Location of the highest density.
    pub fn argmax(&self) -> PlotResult<f64> {
        let idx = self.density.argmax()?;
        Ok(self.grid()[idx])
    }
}

/// Gaussian kernel density estimate on a histogram grid.
///
/// The samples are binned on `min(n^(1/3) * ln(n) * bw * 2, 200)` bins between their
/// minimum and maximum, the grid is reflected at both ends and convolved with a Gaussian
/// window whose width follows Scott's rule scaled by `ln(n) * bw`.
pub fn fast_kde(values: &[f64], bw: f64) -> PlotResult<Kde> {
    let x: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if x.is_empty() {
        return Err(PlotError::EmptySample("kde".to_string()));
    }
    let view = ArrayView1::from(&x);
    let xmin = *view.min()?;
    let xmax = *view.max()?;

    let len_x = x.len() as f64;
    let log_len_x = len_x.ln() * bw;
    let n_bins = ((len_x.powf(1.0 / 3.0) * log_len_x * 2.0) as usize).min(KDE_POINTS);
    if n_bins < 2 {
        return Err(PlotError::Degenerate(format!(
            "kde needs at least two bins, {} samples give {n_bins}",
            x.len()
        )));
    }

    let (lo, hi) = if xmin == xmax {
        (xmin - 0.5, xmax + 0.5)
    } else {
        (xmin, xmax)
    };
    let edges = Array1::linspace(lo, hi, n_bins + 1).to_vec();
    let grid = histogram(&x, &edges)?.density;

    let scotts_factor = len_x.powf(-0.2);
    let kern_nx = ((scotts_factor * 2.0 * PI * log_len_x) as usize).max(1);
    let kernel = gaussian_window(kern_nx, scotts_factor * log_len_x);

    // Reflect npad bins at both ends, leaving out the outermost bin on the left.
    let npad = n_bins.min(2 * kern_nx);
    let left = npad.min(n_bins - 1);
    let mut padded = Vec::with_capacity(left + n_bins + npad);
    padded.extend((1..=left).rev().map(|i| grid[i]));
    padded.extend(grid.iter().copied());
    padded.extend((n_bins + 1 - npad..n_bins).rev().map(|i| grid[i]));

    let convolved = convolve_same(&padded, &kernel);
    let norm_factor = (2.0 * PI * log_len_x.powi(2) * scotts_factor.powi(2)).sqrt();
    let density: Array1<f64> = convolved[npad..npad + n_bins]
        .iter()
        .map(|d| d / norm_factor)
        .collect();

    Ok(Kde {
        density,
        xmin,
        xmax,
    })
}

/// Symmetric Gaussian window of `m` points with standard deviation `std` (in points).
fn gaussian_window(m: usize, std: f64) -> Vec<f64> {
    let centre = (m as f64 - 1.0) / 2.0;
    (0..m)
        .map(|i| {
            let z = (i as f64 - centre) / std;
            (-0.5 * z * z).exp()
        })
        .collect()
}

/// Direct convolution, cropped to the length of `signal` around the centre of the full output.
fn convolve_same(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let k = kernel.len();
    let start = (k - 1) / 2;
    (0..signal.len())
        .map(|i| {
            let pos = i + start;
            kernel
                .iter()
                .enumerate()
                .filter(|(j, _)| *j <= pos && pos - *j < signal.len())
                .map(|(j, w)| signal[pos - j] * w)
                .sum()
        })
        .collect()
}

/// Counts and normalised densities of a histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub counts: Array1<f64>,
    pub density: Array1<f64>,
    pub edges: Array1<f64>,
}

/// Bins `values` on the given increasing `edges`.
///
/// Bins are half open except the last one, which includes its right edge; values outside
/// `[edges[0], edges[last]]` are not counted.
pub fn histogram(values: &[f64], edges: &[f64]) -> PlotResult<Histogram> {
    if edges.len() < 2 {
        return Err(PlotError::Degenerate(
            "histogram needs at least two bin edges".to_string(),
        ));
    }
    let n_bins = edges.len() - 1;
    let first = edges[0];
    let last = edges[n_bins];

    let mut counts = Array1::<f64>::zeros(n_bins);
    for &v in values.iter().filter(|v| (first..=last).contains(*v)) {
        let idx = edges.partition_point(|e| *e <= v).saturating_sub(1);
        counts[idx.min(n_bins - 1)] += 1.0;
    }

    let total = counts.sum();
    if total == 0.0 {
        return Err(PlotError::EmptySample("histogram".to_string()));
    }
    let density = Array1::from_iter(
        counts
            .iter()
            .zip(edges.windows(2))
            .map(|(c, w)| c / (total * (w[1] - w[0]))),
    );

    Ok(Histogram {
        counts,
        density,
        edges: Array1::from_vec(edges.to_vec()),
    })
}

/// Linearly interpolated percentile of already sorted values, `q` in `[0, 100]`.
fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Integer-aligned bin edges for discrete samples.
///
/// The bin width is the rounded maximum of 1, Sturges' estimate and the
/// Freedman-Diaconis estimate; the edges start at the sample minimum and cover the maximum.
pub fn get_bins(values: &[f64]) -> PlotResult<Vec<f64>> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(PlotError::EmptySample("bins".to_string()));
    }
    sorted.sort_unstable_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let x_min = sorted[0].trunc();
    let x_max = sorted[sorted.len() - 1].trunc();

    let bins_sturges = (x_max - x_min) / (n.log2() + 1.0);
    let iqr = percentile_sorted(&sorted, 75.0) - percentile_sorted(&sorted, 25.0);
    let bins_fd = 2.0 * iqr * n.powf(-1.0 / 3.0);
    let width = 1.0_f64.max(bins_sturges).max(bins_fd).round_ties_even();

    let stop = x_max + width + 1.0;
    let count = ((stop - x_min) / width).ceil() as usize;
    Ok((0..count).map(|i| x_min + i as f64 * width).collect())
}

/// A single value summarising a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointEstimate {
    Mean,
    Median,
    Mode,
}

impl FromStr for PointEstimate {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(PointEstimate::Mean),
            "median" => Ok(PointEstimate::Median),
            "mode" => Ok(PointEstimate::Mode),
            other => Err(PlotError::UnknownPointEstimate(other.to_string())),
        }
    }
}

impl fmt::Display for PointEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PointEstimate::Mean => "mean",
            PointEstimate::Median => "median",
            PointEstimate::Mode => "mode",
        };
        write!(f, "{name}")
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    percentile_sorted(&sorted, 50.0)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Point estimate of continuous samples; the mode is the peak of [`fast_kde`].
pub fn point_estimate_continuous(
    estimate: PointEstimate,
    values: &[f64],
    bw: f64,
) -> PlotResult<f64> {
    if values.is_empty() {
        return Err(PlotError::EmptySample(estimate.to_string()));
    }
    match estimate {
        PointEstimate::Mean => Ok(mean(values)),
        PointEstimate::Median => Ok(median(values)),
        PointEstimate::Mode => fast_kde(values, bw)?.argmax(),
    }
}

/// Point estimate of discrete samples; the mode is the most frequent value
/// (the smallest one on ties).
pub fn point_estimate_discrete(estimate: PointEstimate, values: &[i64]) -> PlotResult<f64> {
    if values.is_empty() {
        return Err(PlotError::EmptySample(estimate.to_string()));
    }
    match estimate {
        PointEstimate::Mean => Ok(mean(&to_f64_vec(values))),
        PointEstimate::Median => Ok(median(&to_f64_vec(values))),
        PointEstimate::Mode => {
            let mut sorted = values.to_vec();
            sorted.sort_unstable();
            let mut best = (sorted[0], 0usize);
            let mut run = (sorted[0], 0usize);
            for &v in &sorted {
                if v == run.0 {
                    run.1 += 1;
                } else {
                    run = (v, 1);
                }
                if run.1 > best.1 {
                    best = run;
                }
            }
            Ok(best.0 as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn ar1(n: usize, phi: f64, seed: u64) -> Array1<f64> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut out = Array1::<f64>::zeros(n);
        for i in 1..n {
            out[i] = phi * out[i - 1] + noise.sample(&mut rng);
        }
        out
    }

    #[test]
    fn autocov_matches_direct_sum() {
        let x = array![1.0, 3.0, 2.0, 5.0, 4.0, 0.5];
        let n = x.len();
        let m = x.mean().unwrap();
        let fft = autocov(x.view()).unwrap();
        for lag in 0..n {
            let direct: f64 = (0..n - lag)
                .map(|i| (x[i] - m) * (x[i + lag] - m))
                .sum::<f64>()
                / n as f64;
            assert_abs_diff_eq!(fft[lag], direct, epsilon = 1e-10);
        }
    }

    #[test]
    fn autocorr_of_ar1_chain() {
        let x = ar1(20_000, 0.9, 42);
        let rho = autocorr(x.view()).unwrap();
        assert_eq!(rho.len(), x.len());
        assert_abs_diff_eq!(rho[0], 1.0, epsilon = 1e-12);
        assert!((rho[1] - 0.9).abs() < 0.03, "lag-1 autocorrelation was {}", rho[1]);
        assert!(rho[1] > rho[5] && rho[5] > rho[20]);
    }

    #[test]
    fn autocorr_rejects_constant_and_empty_chains() {
        assert!(matches!(
            autocorr(Array1::from_elem(10, 3.0).view()),
            Err(PlotError::Degenerate(_))
        ));
        assert!(matches!(
            autocorr(Array1::<f64>::zeros(0).view()),
            Err(PlotError::EmptySample(_))
        ));
        assert!(autocorr(array![1.0, f64::NAN, 2.0].view()).is_err());
    }

    #[test]
    fn hpd_picks_narrowest_interval() {
        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(hpd(&x, 0.8).unwrap(), (1.0, 9.0));
        assert_eq!(hpd(&x, 1.0).unwrap(), (1.0, 10.0));

        let skewed = [0.0, 0.1, 0.2, 0.3, 0.4, 5.0, 9.0, 10.0];
        assert_eq!(hpd(&skewed, 0.5).unwrap(), (0.0, 0.4));
    }

    #[test]
    fn hpd_validates_input() {
        assert!(matches!(
            hpd(&[1.0, 2.0], 0.0),
            Err(PlotError::InvalidCredibleInterval(_))
        ));
        assert!(matches!(
            hpd(&[1.0, 2.0], 1.2),
            Err(PlotError::InvalidCredibleInterval(_))
        ));
        assert!(matches!(hpd(&[], 0.5), Err(PlotError::EmptySample(_))));
    }

    #[test]
    fn kde_is_normalised_and_peaks_at_the_mode() {
        let mut rng = SmallRng::seed_from_u64(7);
        let normal = Normal::new(2.0, 1.0).unwrap();
        let x: Vec<f64> = (0..5_000).map(|_| normal.sample(&mut rng)).collect();
        let kde = fast_kde(&x, DEFAULT_BW).unwrap();

        assert_eq!(kde.density.len(), KDE_POINTS);
        assert!(kde.density.iter().all(|d| *d >= 0.0));
        let dx = (kde.xmax - kde.xmin) / kde.density.len() as f64;
        let mass = kde.density.sum() * dx;
        assert!((mass - 1.0).abs() < 0.1, "kde mass was {mass}");
        assert!((kde.argmax().unwrap() - 2.0).abs() < 0.3);
    }

    #[test]
    fn kde_rejects_tiny_samples() {
        assert!(matches!(fast_kde(&[1.0], DEFAULT_BW), Err(PlotError::Degenerate(_))));
        assert!(matches!(fast_kde(&[], DEFAULT_BW), Err(PlotError::EmptySample(_))));
    }

    #[test]
    fn histogram_closes_last_bin() {
        let hist = histogram(&[0.0, 0.5, 1.0, 2.0, 2.0, 7.0], &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(hist.counts, array![2.0, 3.0]);
        assert_abs_diff_eq!(hist.density, array![0.4, 0.6], epsilon = 1e-12);
    }

    #[test]
    fn bins_cover_integer_support() {
        let x: Vec<f64> = (0..100).map(|i| (i % 10) as f64).collect();
        let bins = get_bins(&x).unwrap();
        assert_eq!(bins[0], 0.0);
        assert!(*bins.last().unwrap() >= 9.0);
        let width = bins[1] - bins[0];
        assert!(width >= 1.0);
        assert!(bins.windows(2).all(|w| w[1] - w[0] == width));
    }

    #[test]
    fn point_estimates() {
        let x = [1.0, 2.0, 2.0, 3.0, 10.0];
        assert_abs_diff_eq!(
            point_estimate_continuous(PointEstimate::Mean, &x, DEFAULT_BW).unwrap(),
            3.6
        );
        assert_abs_diff_eq!(
            point_estimate_continuous(PointEstimate::Median, &x, DEFAULT_BW).unwrap(),
            2.0
        );

        let k = [4, 1, 1, 3, 3, 2];
        assert_eq!(point_estimate_discrete(PointEstimate::Mode, &k).unwrap(), 1.0);
        assert_eq!(point_estimate_discrete(PointEstimate::Median, &k).unwrap(), 2.5);
    }

    #[test]
    fn point_estimate_names() {
        assert_eq!("mode".parse::<PointEstimate>().unwrap(), PointEstimate::Mode);
        assert_eq!(PointEstimate::Median.to_string(), "median");
        assert!(matches!(
            "average".parse::<PointEstimate>(),
            Err(PlotError::UnknownPointEstimate(_))
        ));
    }
}
