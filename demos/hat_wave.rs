use upwind1d::{
    initial::hat, Config, DataParallel, Driver, FiniteCheck, Logger, Recorder, SimError,
};

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let params = Config::default().with_nx(200).with_nt(100).params::<f64>()?;
    let u0 = hat(&params);

    let mut recorder = Recorder::<f64>::new();
    let mut driver = Driver::new(params, DataParallel::default(), u0.as_ref())?
        .with_time_sampling(25)
        .with_observer(Logger)
        .with_observer(FiniteCheck)
        .with_observer(&mut recorder);

    println!("{driver}");
    driver.run()?;
    drop(driver);

    let xs: Vec<f64> = params.space().iter().collect();
    for snapshot in recorder.snapshots() {
        let field = snapshot.field.as_ref();
        let (peak, x) = (0..field.nrows())
            .map(|i| (field.read(i, 0), xs[i]))
            .fold((f64::MIN, 0.0), |acc, p| if p.0 > acc.0 { p } else { acc });
        println!(
            "step {:>4} (t = {:.3}): peak {:.4} at x = {:.3}",
            snapshot.iter, snapshot.time, peak, x
        );
    }

    Ok(())
}
