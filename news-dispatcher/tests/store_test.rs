//! Postgres ledger tests. They need a reachable database in
//! `TEST_DATABASE_URL` and are skipped when it is not set.

use anyhow::Result;
use interfaces::{DeliveryRecord, Destination, ItemStore};
use news_dispatcher::PgItemStore;
use std::env;
use uuid::Uuid;

async fn connect() -> Result<Option<PgItemStore>> {
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("Skipping: TEST_DATABASE_URL not set");
        return Ok(None);
    };

    let store = PgItemStore::new(&database_url).await?;
    store.setup_schema().await?;
    // Schema creation must be repeatable at every startup.
    store.setup_schema().await?;
    Ok(Some(store))
}

#[tokio::test]
async fn test_delivery_record_insert_is_conditional() -> Result<()> {
    let Some(store) = connect().await? else {
        return Ok(());
    };

    let entry_id = format!("store-test-{}", Uuid::new_v4());
    assert!(store.find_delivery_record(&entry_id).await?.is_none());

    let first = DeliveryRecord::new(&entry_id, "First title", "https://example.com/first");
    assert!(store.insert_delivery_record(&first).await?);

    let second = DeliveryRecord::new(&entry_id, "Second title", "https://example.com/second");
    assert!(!store.insert_delivery_record(&second).await?);

    let found = store
        .find_delivery_record(&entry_id)
        .await?
        .expect("record should exist after insert");
    assert_eq!(found.entry_id, entry_id);
    assert_eq!(found.title, "First title");
    assert_eq!(found.link, "https://example.com/first");
    Ok(())
}

#[tokio::test]
async fn test_destination_config_upsert() -> Result<()> {
    let Some(store) = connect().await? else {
        return Ok(());
    };

    store
        .set_destination_config(&Destination::ChatId(-1001234567890))
        .await?;
    let config = store.get_destination_config().await?.expect("config should be stored");
    assert_eq!(config.news_channel, Destination::ChatId(-1001234567890));

    let handle = Destination::Handle("@animenews".to_string());
    store.set_destination_config(&handle).await?;
    let config = store.get_destination_config().await?.expect("config should be stored");
    assert_eq!(config.news_channel, handle);
    Ok(())
}
