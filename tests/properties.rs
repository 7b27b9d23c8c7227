use faer_core::Mat;
use proptest::prelude::*;

use upwind1d::{
    faer_add::{bitwise_eq, first_divergence, to_vec},
    initial::hat,
    Backend, Config, DataParallel, Driver, LaunchConfig, ScalarLoop, StepFunction, ThreadOrder,
    DEFAULT_TOLERANCE,
};

fn solve<S: StepFunction<f64>>(config: Config, method: S) -> (Mat<f64>, Mat<f64>) {
    let params = config.params::<f64>().unwrap();
    let u0 = hat(&params);

    let mut driver = Driver::new(params, method, u0.as_ref()).unwrap();
    driver.run().unwrap();
    (u0, driver.into_solution())
}

fn thread_order() -> impl Strategy<Value = ThreadOrder> {
    prop_oneof![
        Just(ThreadOrder::Forward),
        Just(ThreadOrder::Reverse),
        (1usize..40).prop_map(ThreadOrder::Strided),
    ]
}

#[test]
fn hat_on_sixteen_points() {
    let params = Config::new(16, 0, 15.0, 0.25).params::<f64>().unwrap();
    let u0 = to_vec(hat(&params).as_ref());

    for (i, (x, u)) in params.space().iter().zip(u0).enumerate() {
        let expected = if (0.5..=1.0).contains(&x) { 2.0 } else { 1.0 };
        assert_eq!(u, expected, "index {i}, x = {x}");
    }
}

#[test]
fn hat_generation_is_reproducible() {
    let params = Config::default().params::<f32>().unwrap();
    assert!(bitwise_eq(hat(&params).as_ref(), hat(&params).as_ref()));
}

#[test]
fn zero_steps_return_the_initial_condition() {
    for backend in Backend::ALL {
        let (u0, u) = solve(Config::new(300, 0, 15.0, 0.25), backend.step_function::<f64>());
        assert!(bitwise_eq(u0.as_ref(), u.as_ref()), "{backend}");
    }
}

#[test]
fn field_stays_between_the_hat_levels() {
    for backend in Backend::ALL {
        let (_, u) = solve(Config::new(100, 50, 15.0, 0.25), backend.step_function::<f64>());

        for (i, x) in to_vec(u.as_ref()).into_iter().enumerate() {
            assert!((1.0..=2.0).contains(&x), "{backend}: u[{i}] = {x}");
        }
    }
}

#[test]
fn shock_travels_downstream() {
    let (u0, u) = solve(Config::new(1024, 300, 15.0, 0.25), ScalarLoop);

    let peak = |u: &Mat<f64>| {
        to_vec(u.as_ref())
            .into_iter()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, x)| if x > acc.1 { (i, x) } else { acc })
            .0
    };

    // the plateau moves right at a speed between 1 and 2
    assert!(peak(&u) > peak(&u0) + 50);
}

#[test]
fn default_configuration_agrees_across_backends() {
    let config = Config::default().with_nt(60);
    let (_, reference) = solve(config, Backend::Vectorized.step_function::<f64>());

    for backend in [Backend::ScalarLoop, Backend::DataParallel] {
        let (_, u) = solve(config, backend.step_function::<f64>());
        assert_eq!(
            first_divergence(reference.as_ref(), u.as_ref(), DEFAULT_TOLERANCE),
            None,
            "{backend}"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn backends_agree(nx in 2usize..600, nt in 0usize..60, sigma in 0.05f64..0.45) {
        let config = Config::new(nx, nt, 15.0, sigma);
        let (_, reference) = solve(config, Backend::Vectorized.step_function::<f64>());

        for backend in [Backend::ScalarLoop, Backend::DataParallel] {
            let (_, u) = solve(config, backend.step_function::<f64>());
            prop_assert!(
                first_divergence(reference.as_ref(), u.as_ref(), DEFAULT_TOLERANCE).is_none(),
                "{} diverges from the vectorized backend", backend
            );
        }
    }

    #[test]
    fn left_boundary_never_moves(nx in 2usize..400, nt in 0usize..80) {
        for backend in Backend::ALL {
            let (u0, u) = solve(Config::new(nx, nt, 15.0, 0.25), backend.step_function::<f64>());
            prop_assert_eq!(u.as_ref().read(0, 0), u0.as_ref().read(0, 0));
        }
    }

    #[test]
    fn scheduling_does_not_change_the_field(
        nx in 2usize..500,
        block_dim in 1usize..96,
        extra_blocks in 0usize..4,
        order in thread_order(),
    ) {
        let config = Config::new(nx, 25, 15.0, 0.25);
        let (_, expected) = solve(config, ScalarLoop);

        let grid_dim = (nx + block_dim - 1) / block_dim + extra_blocks;
        let launch = LaunchConfig::default()
            .with_block_dim(block_dim)
            .with_grid_dim(grid_dim)
            .with_order(order);
        let (_, u) = solve(config, DataParallel::new(launch).unwrap());

        prop_assert!(bitwise_eq(expected.as_ref(), u.as_ref()));
    }
}
