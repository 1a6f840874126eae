use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub struct DBClient {
    pool: PgPool,
}

impl DBClient {
    pub async fn new(url: &str) -> anyhow::Result<DBClient> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(url)
            .await?;

        Ok(DBClient { pool })
    }

    pub fn conn(&self) -> &PgPool {
        &self.pool
    }
}
