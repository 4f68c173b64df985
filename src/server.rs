//! HTTP server setup and lifecycle management.
//!
//! Builds the broker and bridge handler state from configuration and runs
//! a plain HTTP/1.1 accept loop. TLS is the edge platform's problem; this
//! process only ever sits behind it.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::bridge::BridgeHandler;
use crate::broker::BrokerHandler;
use crate::cache::MemoryCache;
use crate::cli::Cli;
use crate::error::BreakwaterError;
use crate::gate::RateLimiter;
use crate::jwks::JwksCache;
use crate::jwt::Verifier;
use crate::report::ErrorReporter;
use crate::router::route_request;
use crate::session::CookieConfig;
use crate::sigv4::Signer;
use crate::store::ObjectStoreClient;
use crate::upstream::{ChatClient, Provisioner};

pub struct Server {
    cli: Cli,
}

impl Server {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub async fn run(self) -> Result<(), BreakwaterError> {
        let addr = format!("{}:{}", self.cli.host, self.cli.port);
        let addr: SocketAddr = addr.parse().map_err(|err| {
            BreakwaterError::Configuration(format!("Failed to parse address '{addr}': {err}"))
        })?;

        let (broker, bridge) = build_handlers(&self.cli)?;

        info!(
            address = %addr,
            bucket = %self.cli.s3_bucket,
            endpoint = %self.cli.s3_endpoint,
            region = %self.cli.s3_region,
            upstream = %self.cli.upstream_url,
            "Starting breakwater..."
        );

        let listener = TcpListener::bind(addr).await?;
        serve(listener, broker, bridge).await
    }
}

/// Accept loop over an already-bound listener. Split from [`Server::run`] so
/// tests can bind an ephemeral port themselves.
pub async fn serve(
    listener: TcpListener,
    broker: Arc<BrokerHandler>,
    bridge: Arc<BridgeHandler>,
) -> Result<(), BreakwaterError> {
    loop {
        let (stream, remote_addr) = listener.accept().await?;
        debug!(remote_addr = %remote_addr, "Accepted new connection");

        let io = TokioIo::new(stream);
        let broker = broker.clone();
        let bridge = bridge.clone();

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(
                    io,
                    service_fn(move |req| {
                        let broker = Arc::clone(&broker);
                        let bridge = Arc::clone(&bridge);
                        async move { route_request(req, remote_addr, broker, bridge).await }
                    }),
                )
                .await
            {
                debug!(error = %err, remote_addr = %remote_addr, "Error serving connection");
            }
        });
    }
}

/// Wire up both handler families from configuration. Shared state is the
/// in-process stand-in for the platform's edge KV cache.
pub fn build_handlers(
    cli: &Cli,
) -> Result<(Arc<BrokerHandler>, Arc<BridgeHandler>), BreakwaterError> {
    let cache = Arc::new(MemoryCache::new());
    let reporter = ErrorReporter::new(cli.error_report_dsn.clone());

    let signer = Signer::new(
        cli.s3_access_key_id.clone(),
        cli.s3_secret_access_key.clone(),
        cli.s3_region.clone(),
        cli.s3_bucket.clone(),
        &cli.s3_endpoint,
        cli.s3_path_style,
    )?;
    let store = Arc::new(ObjectStoreClient::new(signer));
    let limiter = RateLimiter::new(cache.clone(), cli.presign_rate_limit);
    let broker = Arc::new(BrokerHandler::new(store, limiter, reporter.clone()));

    let verifier = Verifier::new(
        JwksCache::new(cache),
        cli.jwks_url.clone(),
        cli.jwt_issuer.clone(),
        cli.jwt_audience.clone(),
    );
    let chat = ChatClient::new(cli.upstream_url.clone(), cli.upstream_admin_token.clone());
    let provisioner = Arc::new(Provisioner::new(
        chat,
        cli.upstream_team_id.clone(),
        cli.upstream_channel_id.clone(),
    ));
    let cookie = CookieConfig {
        name: cli.cookie_name.clone(),
        domain: cli.cookie_domain.clone(),
        secure: cli.cookie_secure,
        ttl_secs: cli.cookie_ttl_secs,
    };
    let bridge = Arc::new(BridgeHandler::new(verifier, provisioner, cookie, reporter));

    Ok((broker, bridge))
}
