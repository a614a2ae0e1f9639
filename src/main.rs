#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog_engine_lib::run().await
}
