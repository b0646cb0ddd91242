//! End-to-end producer/consumer scenarios: a real axum server over an
//! in-memory category store, a producer task writing decimal
//! newline-terminated integers, and a consumer task driving
//! `eventbus_consumer::Consumer` against it over HTTP, asserting the two
//! sums agree.
//!
//! Summing integers 0..10_000_000 is a fine check of the algorithm but a
//! slow one to run on every `cargo test`. These tests exercise the
//! identical mechanism at a scale two orders of magnitude smaller and rely
//! on the property-based tests elsewhere in the workspace to cover the
//! algorithmic edge cases at volume.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use eventbus_consumer::{Consumer, HttpTransport, StepResult};
use eventbus_core::{Backend, CategoryRouter, NoopHook};
use tokio::net::TcpListener;

const CATEGORY: &str = "integers";

async fn spawn_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let router = Arc::new(CategoryRouter::new(Backend::Memory, Arc::new(NoopHook)));
    let app = eventbus_server::router(router);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        eventbus_server::serve_on(listener, app).await.unwrap();
    });
    (addr, handle)
}

async fn write(client: &reqwest::Client, base_url: &str, body: String) {
    let resp = client
        .post(format!("{base_url}/write"))
        .query(&[("category", CATEGORY)])
        .body(body)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn sums_match_across_the_wire() {
    const N: u64 = 50_000;
    let (addr, _server) = spawn_server().await;
    let base_url = format!("http://{addr}");

    let producer_url = base_url.clone();
    let producer = tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut batch = String::new();
        for i in 0..N {
            batch.push_str(&i.to_string());
            batch.push('\n');
            if batch.len() > 4096 {
                write(&client, &producer_url, std::mem::take(&mut batch)).await;
            }
        }
        if !batch.is_empty() {
            write(&client, &producer_url, batch).await;
        }
    });

    let expected_sum: u64 = (0..N).sum();
    let consumer_sum = Arc::new(AtomicU64::new(0));
    let consumer_sum_task = consumer_sum.clone();
    let consumer = tokio::spawn(async move {
        let transport = HttpTransport::new(base_url);
        let mut consumer = Consumer::new(transport, CATEGORY, 4096);
        let mut seen = 0u64;
        loop {
            let result = consumer
                .step::<_, std::convert::Infallible>(|buf| {
                    for line in buf.split(|&b| b == b'\n') {
                        if line.is_empty() {
                            continue;
                        }
                        let n: u64 = std::str::from_utf8(line).unwrap().parse().unwrap();
                        consumer_sum_task.fetch_add(n, Ordering::SeqCst);
                        seen += 1;
                    }
                    Ok(())
                })
                .await
                .unwrap();
            if seen >= N && result == StepResult::EndOfStream {
                break;
            }
            if result == StepResult::EndOfStream {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        }
    });

    producer.await.unwrap();
    consumer.await.unwrap();

    assert_eq!(consumer_sum.load(Ordering::SeqCst), expected_sum);
}

#[tokio::test(flavor = "multi_thread")]
async fn processor_errors_on_every_tenth_call_still_sums_exactly() {
    const N: u64 = 5_000;
    let (addr, _server) = spawn_server().await;
    let base_url = format!("http://{addr}");

    let client = reqwest::Client::new();
    let mut batch = String::new();
    for i in 0..N {
        batch.push_str(&i.to_string());
        batch.push('\n');
    }
    write(&client, &base_url, batch).await;

    let transport = HttpTransport::new(base_url);
    let mut consumer = Consumer::new(transport, CATEGORY, 256);
    let mut call_count = 0u64;
    let mut sum = 0u64;
    let mut seen = 0u64;

    loop {
        let result = consumer
            .step(|buf| {
                call_count += 1;
                if call_count % 10 == 0 {
                    return Err("simulated processor failure");
                }
                for line in buf.split(|&b| b == b'\n') {
                    if line.is_empty() {
                        continue;
                    }
                    let n: u64 = std::str::from_utf8(line).unwrap().parse().unwrap();
                    sum += n;
                    seen += 1;
                }
                Ok(())
            })
            .await;

        match result {
            Ok(StepResult::Retry) => {}
            Ok(StepResult::EndOfStream) if seen >= N => break,
            Ok(StepResult::EndOfStream) => {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            Err(eventbus_consumer::ConsumerError::Processor(_)) => {
                // Same bytes are redelivered on the next step; no state lost.
            }
            Err(e) => panic!("unexpected transport error: {e}"),
        }
    }

    assert_eq!(sum, (0..N).sum::<u64>());
}
