//! Scripted receiver session on a simulated link.
//!
//! Feeds a fixed AT command script to a rig whose radio is a [`SimRadio`]
//! losing one frame in ten, and prints the console output and the report.
//! No hardware is needed.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p lora-per --example scripted_receiver
//! ```

use lora_per::PerRigBuilder;
use lora_per_test_harness::{MockTransport, SimRadio};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut console = MockTransport::new();
    console.push_rx(b"AT+TRSW=1\r\nAT+SF=9\r\nAT+NBFRAME=50\r\nAT+START\r\n");
    console.end_input();
    let output = console.sent_log();

    let radio = SimRadio::new(Some(2024)).with_loss(0.1);
    let mut rig = PerRigBuilder::new(radio)
        .build_with_transport(Box::new(console))
        .await?;

    let report = rig.run().await?;
    print!("{}", output.text());

    if let Some(report) = report {
        println!("summary: {report}");
    }
    Ok(())
}
