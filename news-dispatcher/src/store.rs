use anyhow::Result;
use async_trait::async_trait;
use interfaces::{CONFIG_KEY, DeliveryRecord, Destination, DestinationConfig, ItemStore};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

/// Postgres-backed dedup ledger and channel configuration.
pub struct PgItemStore {
    pool: PgPool,
}

impl PgItemStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sent_news (
                entry_id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                link TEXT NOT NULL DEFAULT '',
                sent_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS global_settings (
                id TEXT PRIMARY KEY,
                news_channel TEXT NOT NULL,
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Item store schema ready");
        Ok(())
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn find_delivery_record(&self, entry_id: &str) -> Result<Option<DeliveryRecord>> {
        let row = sqlx::query("SELECT entry_id, title, link, sent_at FROM sent_news WHERE entry_id = $1")
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| DeliveryRecord {
            entry_id: r.get("entry_id"),
            title: r.get("title"),
            link: r.get("link"),
            sent_at: r.get("sent_at"),
        }))
    }

    async fn insert_delivery_record(&self, record: &DeliveryRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO sent_news (entry_id, title, link, sent_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (entry_id) DO NOTHING
            "#,
        )
        .bind(&record.entry_id)
        .bind(&record.title)
        .bind(&record.link)
        .bind(record.sent_at)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            debug!("Delivery record for {} already existed", record.entry_id);
        }
        Ok(inserted)
    }

    async fn get_destination_config(&self) -> Result<Option<DestinationConfig>> {
        let row = sqlx::query("SELECT news_channel FROM global_settings WHERE id = $1")
            .bind(CONFIG_KEY)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| DestinationConfig {
            news_channel: Destination::from_stored(r.get::<String, _>("news_channel").as_str()),
        }))
    }

    async fn set_destination_config(&self, destination: &Destination) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO global_settings (id, news_channel, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (id)
            DO UPDATE SET
                news_channel = EXCLUDED.news_channel,
                updated_at = NOW()
            "#,
        )
        .bind(CONFIG_KEY)
        .bind(destination.to_stored())
        .execute(&self.pool)
        .await?;

        info!("News channel set to {}", destination);
        Ok(())
    }
}
