//! DotFlyer worker entry point.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotflyer_worker::run().await
}
