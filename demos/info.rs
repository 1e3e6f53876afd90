//! Daemon info - ping the daemon and print version and statistics.
//!
//! ```sh
//! cargo run --example info -- tcp://127.0.0.1:3310
//! cargo run --example info -- /var/run/clamav/clamd.ctl
//! ```

use clamd_client::Clamd;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/var/run/clamav/clamd.ctl".to_string());

    let clamd = Clamd::new(&address);

    clamd.ping().await?;
    println!("daemon at {address} is alive");

    let mut version = clamd.version().await?;
    while let Some(record) = version.next().await {
        println!("version: {}", record.raw);
    }

    let stats = clamd.stats().await?;
    println!("pools:    {}", stats.pools);
    println!("state:    {}", stats.state);
    println!("threads:  {}", stats.threads);
    println!("queue:    {}", stats.queue);
    println!("memstats: {}", stats.memstats);

    Ok(())
}
