//! Minimal end-to-end demo of the three-hop flow.
//!
//! - Client solves a puzzle for `/api/data` and attaches the proof headers.
//! - Edge validates the proof and adds the trust signature.
//! - Origin checks the signature and admits the request.
//! - The same request is then replayed and rejected at the edge.
//!
//! Run with `RUST_LOG=debug` to see each decision.

use std::error::Error;
use std::sync::Arc;

use http::{HeaderMap, HeaderValue};
use tokio::sync::mpsc;
use tollgate::{generate_context, Config, Decision, PuzzleSolver, TrustVerifier, Validator};
use tracing_subscriber::EnvFilter;

const ENDPOINT: &str = "/api/data";

#[derive(Debug)]
enum Hop {
    Forwarded(HeaderMap),
    Rejected(u16, String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_json(
        r#"{
            "endpoints": ["/api/*"],
            "secret": "demo-secret",
            "difficulty": 12,
            "rate_limit": {"enabled": true, "requests_per_minute": 5}
        }"#,
    )?;

    let validator = Arc::new(Validator::from_config(&config)?);
    let origin = Arc::new(TrustVerifier::new(&config)?);

    // Client
    let solver = PuzzleSolver::from_config(&config)?;
    let context = generate_context(
        config.algorithm,
        config.context_mode,
        "tollgate-demo/0.1",
        None,
    );
    let proof = solver.solve(ENDPOINT, &context).await?;
    println!(
        "solved: ts={} nonce={} stamp={}",
        proof.timestamp, proof.nonce, proof.stamp
    );

    let mut request = HeaderMap::new();
    proof.apply_to(&mut request)?;

    let (edge_tx, mut edge_rx) = mpsc::channel::<HeaderMap>(4);
    let (origin_tx, mut origin_rx) = mpsc::channel::<Hop>(4);

    // Edge task: validate and forward.
    let edge = tokio::spawn({
        let validator = validator.clone();
        async move {
            while let Some(mut headers) = edge_rx.recv().await {
                let hop = match validator.decide(ENDPOINT, &headers) {
                    Decision::Pass => Hop::Forwarded(headers),
                    Decision::Proceed { headers: added } => {
                        for (name, value) in added {
                            if let Ok(value) = HeaderValue::from_str(&value) {
                                headers.insert(name, value);
                            }
                        }
                        Hop::Forwarded(headers)
                    }
                    Decision::Reject(rejection) => {
                        Hop::Rejected(rejection.status().as_u16(), rejection.body())
                    }
                };
                if origin_tx.send(hop).await.is_err() {
                    break;
                }
            }
        }
    });

    edge_tx.send(request.clone()).await?;
    edge_tx.send(request).await?;
    drop(edge_tx);

    while let Some(hop) = origin_rx.recv().await {
        match hop {
            Hop::Forwarded(headers) => match origin.decide(ENDPOINT, &headers) {
                Decision::Reject(rejection) => {
                    println!("origin rejected: {} {}", rejection.status(), rejection.body())
                }
                _ => println!("origin admitted request"),
            },
            Hop::Rejected(status, body) => println!("edge rejected: {status} {body}"),
        }
    }

    edge.await?;
    Ok(())
}
