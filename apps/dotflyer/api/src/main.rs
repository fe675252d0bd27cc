//! DotFlyer API entry point.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotflyer_api::run().await
}
