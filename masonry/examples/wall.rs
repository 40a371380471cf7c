use std::time::Duration;

use masonry::{
    Reporter, Simulation,
    builder::{ConcurrentBuilder, SerialBuilder},
    report::{CostReport, StdoutReporter},
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();
    let input = concat!(env!("CARGO_MANIFEST_DIR"), "/data/wall.txt");

    // Two workers for fourteen sections: slower than one worker per section,
    // but the wall costs exactly the same.
    let concurrent = Simulation::builder()
        .name("Two-worker crew")
        .input(input)
        .builder(
            ConcurrentBuilder::builder()
                .workers(2)
                .round_timeout(Duration::from_secs(5))
                .build(),
        )
        .build()
        .run()
        .await
        .unwrap();

    let serial = Simulation::builder()
        .name("Serial reference")
        .input(input)
        .builder(SerialBuilder::builder().build())
        .build()
        .run()
        .await
        .unwrap();

    assert_eq!(concurrent.overall(), serial.overall());
    println!(
        "crew took {} days, serial reference {} days",
        concurrent.rounds, serial.rounds
    );

    StdoutReporter
        .report(&CostReport::from(concurrent))
        .await
        .unwrap();
}
