//! Binds a TCP listener where exactly one client is served at a time: a
//! new connection supersedes whatever connection came before it, the
//! same "new connection replaces any prior one" contract each of
//! Speech-Rec's three ports follows.

use std::future::Future;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

pub async fn bind_single_client<F, Fut>(addr: &str, mut on_connect: F) -> std::io::Result<()>
where
    F: FnMut(TcpStream) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "bound single-client port");
    let current: Arc<parking_lot::Mutex<Option<oneshot::Sender<()>>>> =
        Arc::new(parking_lot::Mutex::new(None));

    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::info!(%peer, %addr, "client connected");
        let (kill_tx, kill_rx) = oneshot::channel();
        if let Some(prev) = current.lock().replace(kill_tx) {
            let _ = prev.send(());
        }

        let fut = on_connect(socket);
        tokio::spawn(async move {
            tokio::select! {
                _ = fut => {}
                _ = kill_rx => {
                    tracing::info!(%peer, "connection superseded by a newer client");
                }
            }
        });
    }
}
