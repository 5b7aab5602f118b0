#[tokio::main]
async fn main() -> anyhow::Result<()> {
    authcache::run().await
}
