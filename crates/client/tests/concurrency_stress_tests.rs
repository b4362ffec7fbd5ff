//! Stress tests for the shared session and origin caches.
//!
//! Readers and writers hammer the stores from many worker threads, touching
//! the two caches in opposite orders. A deadlock shows up as a timeout.

use std::sync::Arc;
use std::time::Duration;

use safeguard_client::{CacheTtl, Credentials, EndpointCache, SessionState, SessionStore};
use secrecy::{ExposeSecret, SecretString};

const WORKERS: usize = 16;
const ROUNDS: usize = 500;

fn session(round: usize) -> SessionState {
    SessionState::issued_now(
        Some(SecretString::new(format!("raw-{round}").into())),
        SecretString::new(format!("session-{round}").into()),
        Duration::from_secs(60 + round as u64),
        Credentials::AccessToken,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_session_replacement_is_never_torn() {
    let store = Arc::new(SessionStore::new());
    store.replace(session(0));

    let mut tasks = Vec::new();
    for worker in 0..WORKERS {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            for round in 0..ROUNDS {
                if worker % 2 == 0 {
                    store.replace(session(round));
                } else {
                    let snapshot = store.snapshot();
                    let raw = snapshot.token().unwrap().expose_secret().to_string();
                    let token = snapshot.session_token().unwrap().expose_secret().to_string();
                    let n: u64 = raw.trim_start_matches("raw-").parse().unwrap();
                    assert_eq!(token, format!("session-{n}"));
                    assert_eq!(snapshot.valid_for(), Duration::from_secs(60 + n));
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::time::timeout(Duration::from_secs(30), async {
        for task in tasks {
            task.await.unwrap();
        }
    })
    .await
    .expect("session store workers deadlocked");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_caches_accessed_in_opposite_orders() {
    let appliance = Arc::new(EndpointCache::new("appliance"));
    let leader = Arc::new(EndpointCache::new("leader"));
    let store = Arc::new(SessionStore::new());
    appliance
        .write("https://appliance.example.com", CacheTtl::Forever)
        .unwrap();

    let mut tasks = Vec::new();
    for worker in 0..WORKERS {
        let appliance = Arc::clone(&appliance);
        let leader = Arc::clone(&leader);
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            for round in 0..ROUNDS {
                let url = format!("https://node{}.example.com:8443", round % 4);
                if worker % 2 == 0 {
                    let _ = appliance.read();
                    leader.write(&url, CacheTtl::Expiring(Duration::ZERO)).unwrap();
                    store.replace(session(round));
                } else {
                    let _ = store.session_token();
                    let _ = leader.is_expired();
                    if let Some(current) = leader.read() {
                        assert!(current.starts_with("https://node"));
                        assert!(current.ends_with(":8443"));
                    }
                    let _ = appliance.origin();
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::time::timeout(Duration::from_secs(30), async {
        for task in tasks {
            task.await.unwrap();
        }
    })
    .await
    .expect("cache workers deadlocked");

    assert_eq!(
        appliance.read().as_deref(),
        Some("https://appliance.example.com:443")
    );
    assert!(leader.read().is_some());
}
