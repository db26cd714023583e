//! Postback Delivery Agent - Entry Point
//!
//! Exits with a non-zero status when the worker aborts.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    postback_deliver::run().await
}
