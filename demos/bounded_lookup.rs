use anvilq::prelude::*;
use anvilq::init_logging;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

async fn lookup_company(query: &'static str) -> AnvilResult<Vec<String>> {
    // Simulated network latency, longer queries take longer
    tokio::time::sleep(Duration::from_millis(40 * query.len() as u64)).await;
    if query.is_empty() {
        return Err(AnvilError::invalid_argument("empty search query"));
    }
    Ok(vec![format!("{} Inc.", query), format!("{} Holdings", query)])
}

#[tokio::main]
async fn main() -> AnvilResult<()> {
    let config = QueueConfig::development().with_name("lookups");
    init_logging(&config.logging)?;

    // At most two lookups in flight at any time
    let lookups = BoundedConcurrencyQueue::with_config(config)?;
    let handles: Vec<_> = ["ac", "acm", "acme", ""]
        .into_iter()
        .map(|query| (query, lookups.add_to_queue(move || lookup_company(query))))
        .collect();

    for (query, handle) in handles {
        match handle.await {
            Ok(matches) => println!("🔨 '{}' -> {:?}", query, matches),
            Err(e) => println!("🔨 '{}' failed: {}", query, e),
        }
    }

    // Appends to a shared list, one at a time and in order
    let writes = SerialQueue::with_config(QueueConfig::default().with_name("writes"))?;
    let log = Arc::new(Mutex::new(Vec::new()));
    for entry in ["created", "updated", "archived"] {
        let log = log.clone();
        let _ = writes.add_to_queue(move || async move {
            log.lock().await.push(entry);
            Ok(())
        });
    }
    writes.wait_idle().await;
    println!("🔨 write log: {:?}", log.lock().await);

    println!("🔨 lookup stats: {:?}", lookups.stats());
    lookups.shutdown(Duration::from_secs(1)).await?;
    writes.shutdown_default().await?;
    Ok(())
}
