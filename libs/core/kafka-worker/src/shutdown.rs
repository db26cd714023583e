use tokio::sync::watch;

/// Resolve once the shutdown flag is `true`.
///
/// Returns immediately if shutdown was already requested. If every sender is
/// dropped without requesting shutdown, this never resolves: nobody is left
/// to ask for it.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_when_already_requested() {
        let (_tx, mut rx) = watch::channel(true);
        tokio::time::timeout(Duration::from_secs(1), shutdown_requested(&mut rx))
            .await
            .expect("should resolve immediately");
    }

    #[tokio::test]
    async fn test_resolves_on_signal() {
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(true);
        });
        tokio::time::timeout(Duration::from_secs(5), shutdown_requested(&mut rx))
            .await
            .expect("should resolve after send");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let result = tokio::time::timeout(Duration::from_secs(60), shutdown_requested(&mut rx)).await;
        assert!(result.is_err(), "must not resolve without a shutdown request");
    }
}
