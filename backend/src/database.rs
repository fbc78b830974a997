// Module database - PostgreSQL connection pool and read/write operations
// over the highway reference tables (rest_areas, interchanges, sync_logs).
// The request pipeline only ever reads; writes happen through the sync job.

use std::env;
use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use shared::{Coordinate, Direction, StoreEntry};

use crate::models::{Interchange, RestAreaCandidate};

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Invalid row data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Read access the request path needs. `Database` is the production
/// implementation; tests drive the router with an in-memory one.
pub trait RestAreaStore: Send + Sync + 'static {
    fn load_rest_areas(
        &self,
    ) -> impl Future<Output = Result<Vec<RestAreaCandidate>, DatabaseError>> + Send;

    fn load_interchanges(
        &self,
        route_names: &[String],
    ) -> impl Future<Output = Result<Vec<Interchange>, DatabaseError>> + Send;

    fn fetch_facilities(
        &self,
        rest_area_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, DatabaseError>> + Send;

    fn fetch_stores(
        &self,
        rest_area_id: &str,
    ) -> impl Future<Output = Result<Vec<StoreEntry>, DatabaseError>> + Send;
}

/// Outcome row of one ingestion run.
#[derive(Debug, Clone, FromRow)]
pub struct SyncLog {
    pub id: i32,
    pub sync_type: String,
    pub status: String,
    pub total_count: i32,
    pub error_message: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct RestAreaRow {
    id: String,
    name: String,
    route_name: String,
    route_code: Option<String>,
    direction_raw: Option<String>,
    route_direction: String,
    lat: Option<f64>,
    lng: Option<f64>,
    facilities: Vec<String>,
}

#[derive(Debug, FromRow)]
struct InterchangeRow {
    id: String,
    name: String,
    route_name: String,
    route_no: Option<String>,
    direction: String,
    weight: i32,
    lat: f64,
    lng: f64,
    prev_id: Option<String>,
    next_id: Option<String>,
}

#[derive(Debug, FromRow)]
struct StoreRow {
    store_code: String,
    store_name: String,
    store_type: Option<String>,
    popular_items: Vec<String>,
}

pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create new database connection pool from `DATABASE_URL`.
    pub async fn new() -> Result<Self, DatabaseError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| {
            DatabaseError::ConfigError("DATABASE_URL environment variable not set".to_string())
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool created");

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        // SQLx query() cannot handle multiple statements, so we use a raw
        // connection for the migration file.
        let mut conn = self.pool.acquire().await?;

        let migration_sql = include_str!("../migrations/20250805_create_highway_tables.sql");
        sqlx::raw_sql(migration_sql).execute(&mut *conn).await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Full refresh of the rest_areas table from one ingestion batch.
    pub async fn replace_rest_areas(
        &self,
        areas: &[RestAreaCandidate],
    ) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM rest_areas").execute(&mut *tx).await?;

        let mut inserted = 0u64;
        for area in areas {
            let result = sqlx::query(
                r#"
                INSERT INTO rest_areas (
                    id, name, route_name, route_code, direction_raw,
                    route_direction, lat, lng, facilities
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&area.id)
            .bind(&area.name)
            .bind(&area.route_name)
            .bind(&area.route_code)
            .bind(&area.direction_raw)
            .bind(direction_to_str(area.route_direction.unwrap_or(Direction::Unknown)))
            .bind(area.coordinates.map(|c| c.lat))
            .bind(area.coordinates.map(|c| c.lng))
            .bind(&area.facilities)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        tracing::info!("rest_areas refreshed: {} rows", inserted);
        Ok(inserted)
    }

    /// Full refresh of the interchanges table from one ingestion batch.
    pub async fn replace_interchanges(
        &self,
        interchanges: &[Interchange],
    ) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM interchanges")
            .execute(&mut *tx)
            .await?;

        let mut inserted = 0u64;
        for ic in interchanges {
            let result = sqlx::query(
                r#"
                INSERT INTO interchanges (
                    id, name, route_name, route_no, direction, weight,
                    lat, lng, prev_id, next_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&ic.id)
            .bind(&ic.name)
            .bind(&ic.route_name)
            .bind(&ic.route_no)
            .bind(direction_to_str(ic.direction))
            .bind(ic.weight)
            .bind(ic.coordinates.lat)
            .bind(ic.coordinates.lng)
            .bind(&ic.prev_id)
            .bind(&ic.next_id)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        tracing::info!("interchanges refreshed: {} rows", inserted);
        Ok(inserted)
    }

    /// Record the outcome of one ingestion run.
    pub async fn record_sync(
        &self,
        sync_type: &str,
        status: &str,
        total_count: i32,
        error_message: Option<&str>,
    ) -> Result<SyncLog, DatabaseError> {
        let log = sqlx::query_as::<_, SyncLog>(
            r#"
            INSERT INTO sync_logs (sync_type, status, total_count, error_message)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(sync_type)
        .bind(status)
        .bind(total_count)
        .bind(error_message)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    pub async fn latest_sync(&self, sync_type: &str) -> Result<Option<SyncLog>, DatabaseError> {
        let log = sqlx::query_as::<_, SyncLog>(
            "SELECT * FROM sync_logs WHERE sync_type = $1 ORDER BY synced_at DESC LIMIT 1",
        )
        .bind(sync_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(log)
    }
}

impl RestAreaStore for Database {
    async fn load_rest_areas(&self) -> Result<Vec<RestAreaCandidate>, DatabaseError> {
        let rows = sqlx::query_as::<_, RestAreaRow>("SELECT * FROM rest_areas ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("loaded {} rest areas", rows.len());
        Ok(rows.into_iter().map(RestAreaCandidate::from).collect())
    }

    async fn load_interchanges(
        &self,
        route_names: &[String],
    ) -> Result<Vec<Interchange>, DatabaseError> {
        let rows = sqlx::query_as::<_, InterchangeRow>(
            "SELECT * FROM interchanges WHERE route_name = ANY($1) ORDER BY route_name, weight",
        )
        .bind(route_names)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Interchange::from).collect())
    }

    async fn fetch_facilities(&self, rest_area_id: &str) -> Result<Vec<String>, DatabaseError> {
        let names: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT facility_name FROM rest_area_facilities
            WHERE rest_area_id = $1
            ORDER BY facility_name
            "#,
        )
        .bind(rest_area_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names.into_iter().map(|(n,)| n).collect())
    }

    async fn fetch_stores(&self, rest_area_id: &str) -> Result<Vec<StoreEntry>, DatabaseError> {
        let rows = sqlx::query_as::<_, StoreRow>(
            r#"
            SELECT store_code, store_name, store_type, popular_items
            FROM rest_area_stores
            WHERE rest_area_id = $1
            ORDER BY store_code
            "#,
        )
        .bind(rest_area_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StoreEntry {
                store_code: r.store_code,
                store_name: r.store_name,
                store_type: r.store_type,
                popular_items: r.popular_items,
            })
            .collect())
    }
}

impl From<RestAreaRow> for RestAreaCandidate {
    fn from(row: RestAreaRow) -> Self {
        let coordinates = match (row.lat, row.lng) {
            (Some(lat), Some(lng)) => {
                let c = Coordinate { lat, lng };
                crate::extract::is_domestic(c).then_some(c)
            }
            _ => None,
        };
        RestAreaCandidate {
            id: row.id,
            name: row.name,
            route_name: row.route_name,
            route_code: row.route_code,
            direction_raw: row.direction_raw,
            route_direction: Some(parse_direction(&row.route_direction)),
            coordinates,
            facilities: row.facilities,
        }
    }
}

impl From<InterchangeRow> for Interchange {
    fn from(row: InterchangeRow) -> Self {
        Interchange {
            id: row.id,
            name: row.name,
            route_name: row.route_name,
            route_no: row.route_no,
            direction: parse_direction(&row.direction),
            weight: row.weight,
            coordinates: Coordinate {
                lat: row.lat,
                lng: row.lng,
            },
            prev_id: row.prev_id,
            next_id: row.next_id,
        }
    }
}

pub fn direction_to_str(d: Direction) -> &'static str {
    match d {
        Direction::Up => "UP",
        Direction::Down => "DOWN",
        Direction::Both => "BOTH",
        Direction::Unknown => "UNKNOWN",
    }
}

pub fn parse_direction(s: &str) -> Direction {
    match s {
        "UP" => Direction::Up,
        "DOWN" => Direction::Down,
        "BOTH" => Direction::Both,
        _ => Direction::Unknown,
    }
}
