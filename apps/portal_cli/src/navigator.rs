use account_flow::{Navigator, RedirectDecision};
use async_trait::async_trait;
use tracing::info;

/// Stands in for the browser: the destination is printed on stdout.
pub struct StdoutNavigator;

#[async_trait]
impl Navigator for StdoutNavigator {
    async fn navigate(&self, destination: &RedirectDecision) -> anyhow::Result<()> {
        info!(%destination, "navigating");
        println!("navigate: {destination}");
        Ok(())
    }
}
