//! End-to-end checks of the density plot across models and data kinds.

use approx::assert_relative_eq;
use mcmc_viz::data::{var_iter, InferenceData};
use mcmc_viz::density::{plot_density, DensityOptions};
use mcmc_viz::figure::{ClickPolicy, Glyph, MarkerKind};
use mcmc_viz::rcparams::RcParams;
use mcmc_viz::render::figure_to_plot;
use mcmc_viz::stats::PointEstimate;
use ndarray::Array3;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Binomial, Distribution, Normal};

fn model(seed: u64, mu: f64) -> InferenceData {
    let mut rng = SmallRng::seed_from_u64(seed);
    let normal = Normal::new(mu, 1.0).unwrap();
    let binomial = Binomial::new(20, 0.3).unwrap();
    let theta = Array3::from_shape_fn((2, 500, 2), |_| normal.sample(&mut rng));
    let hits = Array3::from_shape_fn((2, 500, 1), |_| binomial.sample(&mut rng) as i64);
    InferenceData::new()
        .add_continuous("theta", theta)
        .with_coords("theta", "group", &["a", "b"])
        .unwrap()
        .add_discrete("hits", hits)
}

fn quiet() -> DensityOptions {
    DensityOptions {
        show: Some(false),
        ..Default::default()
    }
}

fn markers(glyphs: &[Glyph], wanted: MarkerKind) -> Vec<f64> {
    glyphs
        .iter()
        .filter_map(|g| match g {
            Glyph::Markers { kind, xs, .. } if *kind == wanted => Some(xs[0]),
            _ => None,
        })
        .collect()
}

#[test]
fn test_two_models_overlay_on_shared_labels() {
    let to_plot = vec![
        var_iter(&model(1, 0.0), None, true).unwrap(),
        var_iter(&model(2, 3.0), Some(&["theta"]), true).unwrap(),
    ];
    let opts = DensityOptions {
        data_labels: Some(vec!["prior".into(), "posterior".into()]),
        hpd_markers: true,
        shade: 0.25,
        ..quiet()
    };
    let axes = plot_density(None, &to_plot, &opts, &RcParams::default()).unwrap();
    assert_eq!(axes.n_figures(), 3);

    let titles: Vec<&str> = axes
        .figures()
        .map(|f| f.title.as_ref().unwrap().text.as_str())
        .collect();
    assert_eq!(titles, vec!["theta\na", "theta\nb", "hits"]);

    let theta_a = axes.get(0, 0).unwrap();
    let legend = theta_a.legend.as_ref().unwrap();
    assert_eq!(legend.items.len(), 2);
    assert_eq!(legend.click_policy, ClickPolicy::Mute);
    assert_eq!(markers(theta_a.glyphs(), MarkerKind::Diamond).len(), 4);
    assert_eq!(markers(theta_a.glyphs(), MarkerKind::Circle).len(), 2);

    let hits = axes.get(0, 2).unwrap();
    assert_eq!(hits.legend.as_ref().unwrap().items.len(), 1);

    let json = figure_to_plot(theta_a).to_json();
    assert!(json.contains("\"legendgroup\":\"posterior\""));
}

#[test]
fn test_hpd_markers_bracket_point_estimate() {
    let to_plot = vec![var_iter(&model(3, 1.0), Some(&["theta"]), true).unwrap()];
    for estimate in [PointEstimate::Mean, PointEstimate::Median, PointEstimate::Mode] {
        let opts = DensityOptions {
            hpd_markers: true,
            point_estimate: Some(estimate),
            credible_interval: 0.5,
            ..quiet()
        };
        let axes = plot_density(None, &to_plot, &opts, &RcParams::default()).unwrap();
        let glyphs = axes.get(0, 0).unwrap().glyphs();
        let bounds = markers(glyphs, MarkerKind::Diamond);
        let est = markers(glyphs, MarkerKind::Circle)[0];
        assert!(bounds[0] < est && est < bounds[1], "{estimate}: {bounds:?} vs {est}");
        assert_relative_eq!(est, 1.0, epsilon = 0.3);
    }
}

#[test]
fn test_full_interval_keeps_every_sample() {
    let to_plot = vec![var_iter(&model(4, 0.0), Some(&["theta"]), true).unwrap()];
    let values = to_plot[0][0].values.flatten();
    let (lo, hi) = (
        values.iter().copied().fold(f64::INFINITY, f64::min),
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    );
    let opts = DensityOptions {
        credible_interval: 1.0,
        hpd_markers: true,
        point_estimate: None,
        ..quiet()
    };
    let axes = plot_density(None, &to_plot, &opts, &RcParams::default()).unwrap();
    let bounds = markers(axes.get(0, 0).unwrap().glyphs(), MarkerKind::Diamond);
    assert_eq!(bounds, vec![lo, hi]);
}

#[test]
fn test_discrete_histogram_integrates_to_one() {
    let to_plot = vec![var_iter(&model(5, 0.0), Some(&["hits"]), true).unwrap()];
    let axes = plot_density(None, &to_plot, &quiet(), &RcParams::default()).unwrap();
    match &axes.get(0, 0).unwrap().glyphs()[0] {
        Glyph::Quads {
            left, right, top, fill, ..
        } => {
            assert!(fill.is_none());
            let area: f64 = left
                .iter()
                .zip(right)
                .zip(top)
                .map(|((l, r), t)| (r - l) * t)
                .sum();
            assert_relative_eq!(area, 1.0, epsilon = 1e-9);
        }
        other => panic!("expected quads, got {other:?}"),
    }
}
