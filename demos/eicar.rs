//! EICAR stream scan - upload the EICAR test file and print the verdict.
//!
//! ```sh
//! cargo run --example eicar -- tcp://127.0.0.1:3310
//! ```
//!
//! Any working daemon reports the stream as FOUND; the EICAR file is
//! harmless and exists exactly for this check.

use clamd_client::{Clamd, EICAR};
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/var/run/clamav/clamd.ctl".to_string());

    let clamd = Clamd::new(&address);

    // Hold the sender; dropping it would cancel the scan.
    let (_cancel, cancel_rx) = oneshot::channel();

    let mut responses = clamd.scan_stream(EICAR, cancel_rx).await?;
    while let Some(record) = responses.next().await {
        println!("{} [{}]", record.raw, record.status);
    }

    Ok(())
}
