//! User profile example binary
//!
//! Runs a few lifecycle thunks against an in-memory directory and prints the
//! store after each one.

use action_thunk_core::metrics::register_metrics;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_profile::{ProfileAction, ProfileStore, UserDirectory, fetch_profile, rename_profile};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_profile=debug,action_thunk_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    register_metrics();

    println!("=== User Profile Example: Lifecycle Action Thunks ===\n");

    let store = ProfileStore::new();
    let directory = Arc::new(
        UserDirectory::with_sample_users().with_latency(Duration::from_millis(40)),
    );
    let fetch = fetch_profile()?;
    let rename = rename_profile()?;

    println!(">>> Renaming before anything is loaded");
    let renamed = rename.run("Countess".to_string(), store.api(Arc::clone(&directory)));
    println!("Returned: {:?}", renamed.await);
    println!("State: {:?}\n", store.state());
    store.dispatch(ProfileAction::DismissError);

    println!(">>> Fetching user 1");
    let pending = fetch.run(1, store.api(Arc::clone(&directory)));
    println!("Loading while pending: {}", store.state().loading);
    let user = pending.await;
    println!("Returned: {user:?}");
    println!("State: {:?}\n", store.state());

    println!(">>> Renaming the loaded user");
    let renamed = rename.run("Ada King".to_string(), store.api(Arc::clone(&directory)));
    println!("Returned: {:?}", renamed.await);
    println!("State: {:?}\n", store.state());

    println!(">>> Fetching user 404");
    let user = fetch.run(404, store.api(Arc::clone(&directory))).await;
    println!("Returned: {user:?}");
    println!("State: {:?}\n", store.state());

    println!(">>> Fetching user 0");
    let user = fetch.run(0, store.api(directory)).await;
    println!("Returned: {user:?}");
    println!("State: {:?}\n", store.state());

    println!("=== Dispatched action types ===");
    for tag in store.history() {
        println!("  {tag}");
    }

    Ok(())
}
