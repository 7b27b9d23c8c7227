use tracing::info;

use upwind1d::{Config, Harness, LaunchConfig, SimError};

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt::init();

    let config = Config::default();
    info!("problem summary: {config}");

    let harness = Harness::new(config).with_launch(LaunchConfig::default().with_block_dim(768));

    let report = harness.run::<f64>()?;
    println!("{report}");

    info!("grid size sweep");
    for report in harness.sweep::<f32>([1024, 2048, 4096, 8192, 16384])? {
        println!("{report}");
    }

    info!("done");

    Ok(())
}
