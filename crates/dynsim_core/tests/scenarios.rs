use approx::assert_relative_eq;
use dynsim_core::solvers::{SolveParameters, SolverRegistry};
use dynsim_core::{
    DynamicSystemState, EngineSettings, EquationSystem, EvaluatorKind, NewtonSettings,
    SharedSystem,
};
use std::sync::Arc;

fn system(sources: &[&str], settings: &EngineSettings) -> SharedSystem {
    Arc::new(EquationSystem::from_sources(sources, settings).expect("system should build"))
}

fn registry() -> SolverRegistry {
    SolverRegistry::standard(NewtonSettings::default()).expect("registry should build")
}

fn final_state(
    solver: &str,
    stages: usize,
    system: SharedSystem,
    initial: &DynamicSystemState,
    step: f64,
    steps: usize,
) -> DynamicSystemState {
    registry()
        .build(solver, stages)
        .expect("solver should exist")
        .solve(system, initial, SolveParameters::new(step))
        .expect("solve should start")
        .nth(steps - 1)
        .expect("stream is unbounded")
        .expect("step should succeed")
}

#[test]
fn rk4_tracks_the_harmonic_oscillator() {
    let oscillator = system(&["x' = y", "y' = -x"], &EngineSettings::default());
    let initial = DynamicSystemState::new(0.0, [("x", 1.0), ("y", 0.0)]);
    let state = final_state("rk4", 1, oscillator, &initial, 0.01, 100);
    assert_relative_eq!(state.independent(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(state.get("x").expect("x"), 1.0f64.cos(), epsilon = 1e-9);
    assert_relative_eq!(state.get("y").expect("y"), -(1.0f64.sin()), epsilon = 1e-9);
}

#[test]
fn initial_state_order_does_not_matter() {
    let oscillator = system(&["x' = y", "y' = -x"], &EngineSettings::default());
    let forward = DynamicSystemState::new(0.0, [("x", 1.0), ("y", 0.5)]);
    let reversed = DynamicSystemState::new(0.0, [("y", 0.5), ("x", 1.0)]);
    let a = final_state("heun", 1, Arc::clone(&oscillator), &forward, 0.1, 5);
    let b = final_state("heun", 1, oscillator, &reversed, 0.1, 5);
    assert_eq!(a, b);
    assert_eq!(a.names(), ["x", "y"]);
}

#[test]
fn evaluators_produce_the_same_trajectory() {
    let sources = ["x' = sin(y) * x ^ 2 - ln(2 + t)", "y' = exp(-x) / (1 + y ^ 2)"];
    let interpreted = EngineSettings::default();
    let compiled = EngineSettings {
        evaluator: EvaluatorKind::Bytecode,
        ..EngineSettings::default()
    };
    let initial = DynamicSystemState::new(0.0, [("x", 0.3), ("y", -0.2)]);
    let a = final_state("kutta3", 1, system(&sources, &interpreted), &initial, 0.05, 20);
    let b = final_state("kutta3", 1, system(&sources, &compiled), &initial, 0.05, 20);
    for (left, right) in a.values().iter().zip(b.values()) {
        assert_relative_eq!(*left, *right, epsilon = 1e-12);
    }
}

#[test]
fn semi_implicit_stays_bounded_where_euler_diverges() {
    let stiff = system(&["x' = -50 * (x - cos(t))"], &EngineSettings::default());
    let initial = DynamicSystemState::new(0.0, [("x", 0.0)]);

    let semi = final_state("semi_implicit", 1, Arc::clone(&stiff), &initial, 0.1, 50);
    assert!(semi.values()[0].abs() < 2.0, "semi-implicit: {:?}", semi);

    let euler = final_state("euler", 1, stiff, &initial, 0.1, 50);
    assert!(euler.values()[0].abs() > 1e6, "euler: {:?}", euler);
}

#[test]
fn extrapolation_sharpens_explicit_euler() {
    let logistic = system(&["x' = x * (1 - x)"], &EngineSettings::default());
    let initial = DynamicSystemState::new(0.0, [("x", 0.1)]);
    let exact = 1.0 / (1.0 + 9.0 * (-2.0f64).exp());

    let plain = final_state("euler", 1, Arc::clone(&logistic), &initial, 0.1, 20);
    let boosted = final_state("euler", 4, logistic, &initial, 0.1, 20);
    let plain_error = (plain.values()[0] - exact).abs();
    let boosted_error = (boosted.values()[0] - exact).abs();
    assert!(
        boosted_error * 1e3 < plain_error,
        "plain {plain_error}, extrapolated {boosted_error}"
    );
}

#[test]
fn toml_settings_drive_the_whole_pipeline() {
    let settings = EngineSettings::from_toml_str(
        r#"
        evaluator = "bytecode"
        independent_variable = "s"

        [newton]
        max_iterations = 30
        "#,
    )
    .expect("settings should load");
    let ramp = EquationSystem::from_sources(&["x' = s"], &settings).expect("system should build");
    assert_eq!(
        ramp.equation("x").expect("equation").evaluator(),
        EvaluatorKind::Bytecode
    );

    let registry = SolverRegistry::standard(settings.newton).expect("registry should build");
    let state = registry
        .build("midpoint", 1)
        .expect("solver should exist")
        .solve(
            Arc::new(ramp),
            &DynamicSystemState::new(0.0, [("x", 0.0)]),
            SolveParameters::new(0.5),
        )
        .expect("solve should start")
        .nth(3)
        .expect("stream is unbounded")
        .expect("step should succeed");
    assert_relative_eq!(state.independent(), 2.0);
    // Leapfrog after an Euler start: 0, 0.5, 1, 2
    assert_relative_eq!(state.values()[0], 2.0, epsilon = 1e-12);
}

#[test]
fn finite_difference_jacobian_matches_the_symbolic_one() {
    let numeric = EngineSettings::from_toml_str(
        r#"
        jacobian = "finite_difference"

        [finite_difference]
        scheme = "central"
        increment = 1e-7
        "#,
    )
    .expect("settings should load");
    let sources = ["x' = -50 * (x - cos(t))"];
    let initial = DynamicSystemState::new(0.0, [("x", 0.0)]);

    let symbolic = system(&sources, &EngineSettings::default());
    let estimated = system(&sources, &numeric);
    let a = final_state("semi_implicit", 1, symbolic, &initial, 0.1, 50);
    let b = final_state("semi_implicit", 1, estimated, &initial, 0.1, 50);
    assert_relative_eq!(a.values()[0], b.values()[0], epsilon = 1e-9);
}
