//! Named counters/gauges exposed over Prometheus exposition format.
//! Declared with `lazy_static!` over the `prometheus` crate, the same
//! registration pattern `lighthouse_metrics` uses elsewhere in the
//! consensus-client ecosystem; this module plays that helper crate's
//! role directly since the watcher is a single small binary rather than a
//! multi-crate workspace.

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, IntGauge, Registry, TextEncoder};
use slog::{error, info, Logger};
use std::convert::Infallible;
use std::net::SocketAddr;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();

    /// Current observed slot.
    pub static ref SLOT: IntGauge = {
        let gauge = IntGauge::new("slot", "Current observed slot").unwrap();
        REGISTRY.register(Box::new(gauge.clone())).unwrap();
        gauge
    };

    /// Current observed epoch.
    pub static ref EPOCH: IntGauge = {
        let gauge = IntGauge::new("epoch", "Current observed epoch").unwrap();
        REGISTRY.register(Box::new(gauge.clone())).unwrap();
        gauge
    };

    /// Watched keys in active statuses.
    pub static ref OUR_ACTIVE_VALIDATORS_COUNT: IntGauge = {
        let gauge = IntGauge::new("our_active_validators_count", "Our active validators count").unwrap();
        REGISTRY.register(Box::new(gauge.clone())).unwrap();
        gauge
    };

    /// All active validators on chain.
    pub static ref TOTAL_ACTIVE_VALIDATORS_COUNT: IntGauge = {
        let gauge = IntGauge::new("total_active_validators_count", "Total active validators count").unwrap();
        REGISTRY.register(Box::new(gauge.clone())).unwrap();
        gauge
    };

    /// Incremented with `slot=""`,`epoch=""` (global) AND with the real
    /// labels, so a dashboard can alert on the total without pre-declaring
    /// every slot/epoch combination.
    pub static ref MISSED_BLOCK_PROPOSALS_COUNT: IntCounterVec = {
        let counter = IntCounterVec::new(
            prometheus::Opts::new("missed_block_proposals_count", "Missed block proposals count"),
            &["slot", "epoch"],
        )
        .unwrap();
        REGISTRY.register(Box::new(counter.clone())).unwrap();
        counter
    };

    /// Percent in [0, 100].
    pub static ref RATE_OF_NOT_OPTIMAL_ATTESTATION_INCLUSION: prometheus::Gauge = {
        let gauge = prometheus::Gauge::new(
            "rate_of_not_optimal_attestation_inclusion",
            "Rate of not optimal attestation inclusion",
        )
        .unwrap();
        REGISTRY.register(Box::new(gauge.clone())).unwrap();
        gauge
    };
}

/// Force registration of every metric above, so the first scrape always
/// sees all six series even before the engine has touched them.
pub fn init() {
    lazy_static::initialize(&SLOT);
    lazy_static::initialize(&EPOCH);
    lazy_static::initialize(&OUR_ACTIVE_VALIDATORS_COUNT);
    lazy_static::initialize(&TOTAL_ACTIVE_VALIDATORS_COUNT);
    lazy_static::initialize(&MISSED_BLOCK_PROPOSALS_COUNT);
    lazy_static::initialize(&RATE_OF_NOT_OPTIMAL_ATTESTATION_INCLUSION);
}

async fn serve_metrics(_req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).expect("prometheus encoding cannot fail");

    Ok(Response::builder()
        .header("Content-Type", encoder.format_type())
        .body(Body::from(buffer))
        .expect("static response is well-formed"))
}

/// Spawns the Prometheus exposition server as a background task, exposing
/// every metric at `GET /metrics` on `port`.
pub fn spawn_server(port: u16, log: Logger) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let make_svc = make_service_fn(|_conn| async { Ok::<_, Infallible>(service_fn(serve_metrics)) });

    tokio::spawn(async move {
        info!(log, "starting metrics server"; "addr" => addr.to_string());
        let server = Server::bind(&addr).serve(make_svc);
        if let Err(e) = server.await {
            error!(log, "metrics server error"; "error" => e.to_string());
        }
    });
}
