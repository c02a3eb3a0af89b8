use approx::assert_relative_eq;
use qsb_obs::{Observable, PauliString};
use qsb_proto::{BasisRotatedCircuit, CircuitSpec, GroundTruth, Sampler, StatePrep};
use qsb_sim::{Statevector, StatevectorSampler};

fn expect(circuit: &CircuitSpec, label: &str) -> f64 {
    let state = Statevector::prepare(circuit).expect("state");
    state.expectation(&label.parse::<PauliString>().expect("label"))
}

#[test]
fn ghz_correlations() {
    let ghz = CircuitSpec::new("ghz", 2, StatePrep::Ghz).expect("circuit");
    assert_relative_eq!(expect(&ghz, "ZZ"), 1.0, epsilon = 1e-12);
    assert_relative_eq!(expect(&ghz, "XX"), 1.0, epsilon = 1e-12);
    assert_relative_eq!(expect(&ghz, "YY"), -1.0, epsilon = 1e-12);
    assert_relative_eq!(expect(&ghz, "XY"), 0.0, epsilon = 1e-12);
    assert_relative_eq!(expect(&ghz, "ZI"), 0.0, epsilon = 1e-12);
    assert_relative_eq!(expect(&ghz, "II"), 1.0, epsilon = 1e-12);
}

#[test]
fn product_state_bloch_components() {
    let (theta, phi) = (1.1, 0.4);
    let circuit = CircuitSpec::new(
        "product",
        2,
        StatePrep::Product {
            angles: vec![(theta, phi), (0.0, 0.0)],
        },
    )
    .expect("circuit");
    assert_relative_eq!(expect(&circuit, "ZI"), theta.cos(), epsilon = 1e-12);
    assert_relative_eq!(expect(&circuit, "XI"), theta.sin() * phi.cos(), epsilon = 1e-12);
    assert_relative_eq!(expect(&circuit, "YI"), theta.sin() * phi.sin(), epsilon = 1e-12);
    assert_relative_eq!(expect(&circuit, "XZ"), theta.sin() * phi.cos(), epsilon = 1e-12);
}

#[test]
fn ground_truth_scales_by_coefficient() {
    let circuit = CircuitSpec::new("zero", 1, StatePrep::Zero).expect("circuit");
    let sampler = StatevectorSampler::ideal();
    let observable = Observable::parse("z", "Z", -0.5).expect("observable");
    assert_relative_eq!(sampler.compute_expectation(&circuit, &observable).expect("truth"), -0.5);

    let wide = Observable::parse("zz", "ZZ", 1.0).expect("observable");
    assert_eq!(
        sampler.compute_expectation(&circuit, &wide).unwrap_err().code(),
        "observable-qubit-mismatch"
    );
}

#[test]
fn amplitudes_are_normalised() {
    let circuit = CircuitSpec::new(
        "amps",
        1,
        StatePrep::Amplitudes {
            real: vec![3.0, 4.0],
            imag: vec![0.0, 0.0],
        },
    )
    .expect("circuit");
    assert_relative_eq!(expect(&circuit, "Z"), (9.0 - 16.0) / 25.0, epsilon = 1e-12);

    let zero = CircuitSpec::new(
        "null",
        1,
        StatePrep::Amplitudes {
            real: vec![0.0, 0.0],
            imag: vec![0.0, 0.0],
        },
    )
    .expect("circuit");
    assert_eq!(Statevector::prepare(&zero).unwrap_err().code(), "zero-norm-state");
    let short = CircuitSpec::new(
        "short",
        2,
        StatePrep::Amplitudes {
            real: vec![1.0],
            imag: vec![0.0],
        },
    );
    assert_eq!(short.unwrap_err().code(), "circuit-prep-mismatch");
}

#[test]
fn rotations_map_eigenstates_to_zero() {
    // |+⟩ on qubit 0 and |+i⟩ on qubit 1.
    let circuit = CircuitSpec::new(
        "eigen",
        2,
        StatePrep::Product {
            angles: vec![
                (std::f64::consts::FRAC_PI_2, 0.0),
                (std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2),
            ],
        },
    )
    .expect("circuit");
    let basis: PauliString = "XY".parse().expect("basis");
    let rotated = BasisRotatedCircuit::new(&circuit, &basis).expect("rotated");
    let result = StatevectorSampler::ideal().sample(&rotated, 200, 9).expect("sample");
    assert_eq!(result.counts().get("00"), Some(&200));
}

#[test]
fn readout_noise_shrinks_z_expectation() {
    let circuit = CircuitSpec::new("zero", 1, StatePrep::Zero).expect("circuit");
    let basis: PauliString = "Z".parse().expect("basis");
    let rotated = BasisRotatedCircuit::new(&circuit, &basis).expect("rotated");
    let noisy = StatevectorSampler::with_readout_error(0.1).expect("sampler");
    let result = noisy.sample(&rotated, 20_000, 4).expect("sample");
    let ones = result.counts().get("1").copied().unwrap_or(0) as f64;
    let z = 1.0 - 2.0 * ones / 20_000.0;
    assert!((z - 0.8).abs() < 0.03, "z = {z}");
    assert_eq!(
        StatevectorSampler::with_readout_error(0.7).unwrap_err().code(),
        "invalid-readout-error"
    );
}
