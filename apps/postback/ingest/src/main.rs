//! Postback Ingest API - Entry Point

#[tokio::main]
async fn main() -> eyre::Result<()> {
    postback_ingest::run().await
}
