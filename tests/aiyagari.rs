//! End-to-end tests of the full pipeline on the calibrated Aiyagari
//! economy: load the specification, solve the steady state, perturb it
//! and simulate shock responses.

use approx::assert_relative_eq;
use ham::models::aiyagari_spec;
use ham::{AggregateModel, Equilibrium, PerturbOptions, SteadyStateOptions};

fn steady_state_options() -> SteadyStateOptions {
    SteadyStateOptions {
        bracket: (2.0, 30.0),
        tol: 1e-4,
        ..Default::default()
    }
}

fn solved_economy() -> (AggregateModel, Equilibrium) {
    let model = aiyagari_spec().unwrap().build().unwrap();
    let eq = model.find_steady_state(&steady_state_options()).unwrap();
    (model, eq)
}

#[test]
fn steady_state_clears_the_capital_market() {
    let (model, eq) = solved_economy();

    // Supply equals demand within the bisection tolerance
    assert!(
        (eq.total_assets() - eq.capital).abs() < 5e-3,
        "excess supply {} at K = {}",
        eq.total_assets() - eq.capital,
        eq.capital
    );

    // The interest rate lies between capital-destroying and the level at
    // which discounting no longer offsets returns
    let beta = 0.96;
    let delta = 0.08;
    assert!(eq.prices.r > -delta);
    assert!(eq.prices.r < 1.0 / beta - 1.0);
    assert!(eq.prices.w > 0.0);

    // The distribution is a proper histogram
    assert_relative_eq!(eq.distribution.sum(), 1.0, epsilon = 1e-8);
    assert!(eq.distribution.iter().all(|&m| m >= 0.0));
    assert_eq!(eq.distribution.nrows(), model.chain().n_states());
    assert_eq!(eq.distribution.ncols(), model.grid().len());
}

#[test]
fn higher_income_states_hold_more_wealth() {
    let (_, eq) = solved_economy();

    let grid = eq.savings.grid();
    let mut means = Vec::new();
    for e in 0..eq.distribution.nrows() {
        let row = eq.distribution.row(e);
        let mass: f64 = row.sum();
        let mean: f64 = row
            .iter()
            .enumerate()
            .map(|(i, m)| m * grid.node(i))
            .sum::<f64>()
            / mass;
        means.push(mean);
    }

    // Markov nodes are ordered, so the last state has the highest income
    assert!(
        means.last().unwrap() > means.first().unwrap(),
        "conditional mean wealth {:?} should increase with income",
        means
    );
}

#[test]
fn productivity_shock_raises_capital_then_fades() {
    let (model, eq) = solved_economy();
    let peq = model
        .perturb(
            &eq,
            &PerturbOptions {
                horizon: 120,
                ..Default::default()
            },
        )
        .unwrap();

    assert!(peq.spectral_radius() < 1.0);

    let steps = peq.response(&[0.01]).unwrap();
    assert_eq!(steps.len(), 120);

    // The exogenous state decays at the AR(1) rate
    let rho = model.aggregate_shock().rho();
    assert_relative_eq!(steps[0].exogenous, 0.01, epsilon = 1e-12);
    assert_relative_eq!(steps[1].exogenous, 0.01 * rho, epsilon = 1e-10);

    // Capital responds with a lag, peaks, and returns toward the steady
    // state
    let base = steps[0].capital;
    let deviations: Vec<f64> = steps.iter().map(|s| s.capital - base).collect();
    let max_dev = deviations.iter().cloned().fold(0.0, f64::max);

    assert!(max_dev > 1e-4, "capital shows no response to the shock");
    assert!(
        deviations.last().unwrap().abs() < 0.25 * max_dev,
        "capital response has not decayed (last {:.2e}, peak {:.2e})",
        deviations.last().unwrap(),
        max_dev
    );

    // Mass is conserved along the whole trajectory
    for step in &steps {
        assert_relative_eq!(step.distribution.sum(), 1.0, epsilon = 1e-8);
    }
}

#[test]
fn zero_shock_response_stays_at_the_steady_state() {
    let (model, eq) = solved_economy();
    let peq = model
        .perturb(
            &eq,
            &PerturbOptions {
                horizon: 30,
                ..Default::default()
            },
        )
        .unwrap();

    let steps = peq.response(&[]).unwrap();
    let base = steps[0].capital;
    for step in &steps {
        assert_eq!(step.exogenous, 0.0);
        assert!((step.capital - base).abs() < 1e-10);
    }
}

#[test]
fn linear_and_nonlinear_responses_agree_for_small_shocks() {
    let (model, eq) = solved_economy();
    let peq = model
        .perturb(
            &eq,
            &PerturbOptions {
                horizon: 40,
                ..Default::default()
            },
        )
        .unwrap();

    let shock = [1e-3];
    let linear = peq.response(&shock).unwrap();
    let nonlinear = peq.simulate_nonlinear(&shock).unwrap();

    let max_dev = nonlinear
        .iter()
        .map(|s| (s.capital - nonlinear[0].capital).abs())
        .fold(0.0, f64::max);
    let max_diff = linear
        .iter()
        .zip(nonlinear.iter())
        .map(|(a, b)| (a.capital - b.capital).abs())
        .fold(0.0, f64::max);

    assert!(max_dev > 0.0);
    assert!(
        max_diff < 0.1 * max_dev + 1e-8,
        "linear and non-linear capital paths diverge: diff {max_diff:.2e}, response {max_dev:.2e}"
    );
}

#[test]
fn specification_round_trips_through_a_file() {
    let spec = aiyagari_spec().unwrap();

    let dir = std::env::temp_dir();
    let path = dir.join("ham_aiyagari_roundtrip.toml");
    std::fs::write(&path, ham::models::AIYAGARI_TOML).unwrap();

    let reloaded = ham::ModelSpec::from_path(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(reloaded.name, spec.name);
    assert_eq!(reloaded.grid, spec.grid);
    assert!(reloaded.build().is_ok());
}
