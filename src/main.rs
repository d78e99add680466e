#[tokio::main]
async fn main() -> anyhow::Result<()> {
    roundkeeper::node::run_cli().await
}
