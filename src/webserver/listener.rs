/// Accept loop
///
/// Every accepted socket is classified by its request line first: raw
/// framing faults are written straight to the socket, everything else is
/// served by hyper with the axum router. Every response except a protocol
/// switch carries `Connection: close` (see `middleware`), so each request
/// arrives on a fresh connection and goes through classification.
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinSet;

use crate::{
    config::FaultConfig,
    logger::{self, LogTag},
    webserver::raw,
};

/// Back-off after a failed accept (e.g. too many open files)
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Accept until `shutdown` fires, then abort every in-flight connection
pub async fn run_accept_loop(
    listener: TcpListener,
    router: Router,
    faults: Arc<FaultConfig>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                logger::debug(LogTag::Webserver, "Received shutdown signal, stopping accept loop");
                break;
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_connection(
                        stream,
                        peer,
                        router.clone(),
                        Arc::clone(&faults),
                    ));
                }
                Err(e) => {
                    logger::warning(LogTag::Webserver, &format!("Accept failed: {}", e));
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            },

            // Reap finished connections so the set does not grow unbounded
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    let in_flight = connections.len();
    connections.abort_all();
    while connections.join_next().await.is_some() {}

    logger::debug(
        LogTag::Webserver,
        &format!("Accept loop stopped ({} connection(s) aborted)", in_flight),
    );
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    faults: Arc<FaultConfig>,
) {
    let _ = stream.set_nodelay(true);

    match raw::classify(&stream).await {
        Ok(Some(fault)) => {
            logger::debug(LogTag::Faults, &format!("{:?} fault for {}", fault, peer));
            if let Err(e) = raw::inject(fault, stream, &faults).await {
                logger::debug(
                    LogTag::Faults,
                    &format!("Raw fault write to {} failed: {}", peer, e),
                );
            }
            return;
        }
        Ok(None) => {}
        Err(e) => {
            logger::verbose(LogTag::Webserver, &format!("Peek from {} failed: {}", peer, e));
            return;
        }
    }

    let service = TowerToHyperService::new(router);
    let result = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .with_upgrades()
        .await;

    if let Err(e) = result {
        // Clients abandoning slow or large responses land here
        logger::verbose(
            LogTag::Webserver,
            &format!("Connection from {} ended with error: {}", peer, e),
        );
    }
}
