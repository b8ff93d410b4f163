#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examdrop::run().await {
        eprintln!("examdrop fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
