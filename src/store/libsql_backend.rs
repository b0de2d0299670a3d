//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, Value, params};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::choice::Choice;
use crate::error::DatabaseError;
use crate::generation::{GenerationRecord, MealRecord, MealType, NewGeneration, NewMeal, PlanScope};
use crate::profile::{DietaryRestriction, Gender, Goal, UserId, UserProfile};
use crate::store::migrations;
use crate::store::traits::Database;
use crate::subscription::{Subscription, SubscriptionPlan};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    /// Serializes writes so a transaction on the shared connection never
    /// picks up another task's statements.
    write_lock: Mutex<()>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
            write_lock: Mutex::new(()),
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests and the CLI demo).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
            write_lock: Mutex::new(()),
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    // Try RFC 3339 first (our canonical write format)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // SQLite datetime() output
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ndt.and_utc());
    }
    Err(DatabaseError::Serialization(format!(
        "invalid timestamp '{s}'"
    )))
}

/// Decode a stored enum name, rejecting anything the type doesn't know.
fn parse_choice<C: Choice>(column: &str, raw: &str) -> Result<C, DatabaseError> {
    C::from_key(raw).ok_or_else(|| {
        DatabaseError::Serialization(format!("unknown {column} '{raw}'"))
    })
}

fn text(row: &libsql::Row, idx: i32, ctx: &str) -> Result<String, DatabaseError> {
    row.get::<String>(idx)
        .map_err(|e| DatabaseError::Query(format!("{ctx}: column {idx}: {e}")))
}

fn integer(row: &libsql::Row, idx: i32, ctx: &str) -> Result<i64, DatabaseError> {
    row.get::<i64>(idx)
        .map_err(|e| DatabaseError::Query(format!("{ctx}: column {idx}: {e}")))
}

fn unsigned(row: &libsql::Row, idx: i32, ctx: &str) -> Result<u32, DatabaseError> {
    let value = integer(row, idx, ctx)?;
    u32::try_from(value).map_err(|_| {
        DatabaseError::Serialization(format!("{ctx}: column {idx} out of range: {value}"))
    })
}

fn optional_text(row: &libsql::Row, idx: i32, ctx: &str) -> Result<Option<String>, DatabaseError> {
    match row
        .get_value(idx)
        .map_err(|e| DatabaseError::Query(format!("{ctx}: column {idx}: {e}")))?
    {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(DatabaseError::Serialization(format!(
            "{ctx}: column {idx} expected text, got {other:?}"
        ))),
    }
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> Value {
    match s {
        Some(s) => Value::Text(s.to_string()),
        None => Value::Null,
    }
}

/// Map a libsql Row to a UserProfile.
///
/// Column order matches PROFILE_COLUMNS.
fn row_to_profile(row: &libsql::Row) -> Result<UserProfile, DatabaseError> {
    const CTX: &str = "row_to_profile";
    let gender = optional_text(row, 2, CTX)?
        .map(|g| parse_choice::<Gender>("gender", &g))
        .transpose()?;

    Ok(UserProfile {
        user_id: integer(row, 0, CTX)?,
        age: unsigned(row, 1, CTX)?,
        gender,
        weight_kg: unsigned(row, 3, CTX)?,
        height_cm: unsigned(row, 4, CTX)?,
        goal: parse_choice::<Goal>("goal", &text(row, 5, CTX)?)?,
        dietary_restriction: parse_choice::<DietaryRestriction>(
            "dietary restriction",
            &text(row, 6, CTX)?,
        )?,
        updated_at: parse_datetime(&text(row, 7, CTX)?)?,
    })
}

/// Column order matches SUBSCRIPTION_COLUMNS.
fn row_to_subscription(row: &libsql::Row) -> Result<Subscription, DatabaseError> {
    const CTX: &str = "row_to_subscription";
    Ok(Subscription {
        user_id: integer(row, 0, CTX)?,
        plan: parse_choice::<SubscriptionPlan>("plan", &text(row, 1, CTX)?)?,
        currency: text(row, 2, CTX)?,
        activated_at: parse_datetime(&text(row, 3, CTX)?)?,
        expires_at: parse_datetime(&text(row, 4, CTX)?)?,
        active: integer(row, 5, CTX)? != 0,
    })
}

/// Column order matches GENERATION_COLUMNS.
fn row_to_generation(row: &libsql::Row) -> Result<GenerationRecord, DatabaseError> {
    const CTX: &str = "row_to_generation";
    let scope_str = text(row, 2, CTX)?;
    let scope: PlanScope = scope_str
        .parse()
        .map_err(DatabaseError::Serialization)?;

    Ok(GenerationRecord {
        id: integer(row, 0, CTX)?,
        user_id: integer(row, 1, CTX)?,
        scope,
        calories: unsigned(row, 3, CTX)?,
        meal_type: parse_choice::<MealType>("meal type", &text(row, 4, CTX)?)?,
        created_at: parse_datetime(&text(row, 5, CTX)?)?,
    })
}

/// Column order matches MEAL_COLUMNS.
fn row_to_meal(row: &libsql::Row) -> Result<MealRecord, DatabaseError> {
    const CTX: &str = "row_to_meal";
    Ok(MealRecord {
        id: integer(row, 0, CTX)?,
        user_id: integer(row, 1, CTX)?,
        slot: text(row, 2, CTX)?,
        name: text(row, 3, CTX)?,
        calories: unsigned(row, 4, CTX)?,
        protein_g: unsigned(row, 5, CTX)?,
        carbs_g: unsigned(row, 6, CTX)?,
        fat_g: unsigned(row, 7, CTX)?,
        created_at: parse_datetime(&text(row, 8, CTX)?)?,
    })
}

fn limit_param(limit: Option<usize>) -> i64 {
    // SQLite treats a negative LIMIT as "no limit".
    limit
        .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
        .unwrap_or(-1)
}

/// Insert one generation row, returning its id.
async fn insert_generation(
    conn: &Connection,
    generation: &NewGeneration,
) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(
            "INSERT INTO generation_history (user_id, scope, calories, meal_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
            params![
                generation.user_id,
                generation.scope.as_str(),
                i64::from(generation.calories),
                generation.meal_type.key(),
                generation.created_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("insert_generation: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => integer(&row, 0, "insert_generation"),
        Ok(None) => Err(DatabaseError::Query(
            "insert_generation: no id returned".to_string(),
        )),
        Err(e) => Err(DatabaseError::Query(format!("insert_generation: {e}"))),
    }
}

/// Rows per multi-row meal INSERT, well under SQLite's bound-variable limit.
const MEAL_ROWS_PER_INSERT: usize = 100;

/// Insert meals in multi-row statements, returning their ids in order.
/// Callers wrap this in a transaction when the batch must land as a unit.
async fn insert_meals(conn: &Connection, meals: &[NewMeal]) -> Result<Vec<i64>, DatabaseError> {
    let mut ids = Vec::with_capacity(meals.len());

    for batch in meals.chunks(MEAL_ROWS_PER_INSERT) {
        let mut placeholders = Vec::with_capacity(batch.len());
        let mut values: Vec<Value> = Vec::with_capacity(batch.len() * 8);
        for (i, meal) in batch.iter().enumerate() {
            let base = i * 8;
            placeholders.push(format!(
                "(?{}, ?{}, ?{}, ?{}, ?{}, ?{}, ?{}, ?{})",
                base + 1,
                base + 2,
                base + 3,
                base + 4,
                base + 5,
                base + 6,
                base + 7,
                base + 8
            ));
            values.extend([
                Value::Integer(meal.user_id),
                Value::Text(meal.slot.clone()),
                Value::Text(meal.name.clone()),
                Value::Integer(i64::from(meal.calories)),
                Value::Integer(i64::from(meal.protein_g)),
                Value::Integer(i64::from(meal.carbs_g)),
                Value::Integer(i64::from(meal.fat_g)),
                Value::Text(meal.created_at.to_rfc3339()),
            ]);
        }

        let sql = format!(
            "INSERT INTO meals (user_id, slot, name, calories, protein_g, carbs_g, fat_g, created_at)
             VALUES {} RETURNING id",
            placeholders.join(", ")
        );

        let mut rows = conn
            .query(&sql, values)
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_meals: {e}")))?;

        let mut batch_ids = Vec::with_capacity(batch.len());
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_meals: {e}")))?
        {
            batch_ids.push(integer(&row, 0, "insert_meals")?);
        }
        batch_ids.sort_unstable();
        ids.extend(batch_ids);
    }
    Ok(ids)
}

// ── Trait implementation ────────────────────────────────────────────

const PROFILE_COLUMNS: &str =
    "user_id, age, gender, weight_kg, height_cm, goal, dietary_restriction, updated_at";

const SUBSCRIPTION_COLUMNS: &str = "user_id, plan, currency, activated_at, expires_at, active";

const GENERATION_COLUMNS: &str = "id, user_id, scope, calories, meal_type, created_at";

const MEAL_COLUMNS: &str =
    "id, user_id, slot, name, calories, protein_g, carbs_g, fat_g, created_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Profiles ────────────────────────────────────────────────────

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        let _write = self.write_lock.lock().await;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO user_profiles (user_id, age, gender, weight_kg, height_cm, goal, dietary_restriction, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (user_id) DO UPDATE SET
                age = ?2, gender = ?3, weight_kg = ?4, height_cm = ?5,
                goal = ?6, dietary_restriction = ?7, updated_at = ?8",
            params![
                profile.user_id,
                i64::from(profile.age),
                opt_text(profile.gender.map(|g| g.key())),
                i64::from(profile.weight_kg),
                i64::from(profile.height_cm),
                profile.goal.key(),
                profile.dietary_restriction.key(),
                profile.updated_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("put_profile: {e}")))?;

        debug!(user_id = profile.user_id, "Profile stored");
        Ok(())
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_profile(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_profile: {e}"))),
        }
    }

    // ── Subscriptions ───────────────────────────────────────────────

    async fn put_subscription(&self, subscription: &Subscription) -> Result<(), DatabaseError> {
        let _write = self.write_lock.lock().await;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO subscriptions (user_id, plan, currency, activated_at, expires_at, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (user_id) DO UPDATE SET
                plan = ?2, currency = ?3, activated_at = ?4, expires_at = ?5, active = ?6",
            params![
                subscription.user_id,
                subscription.plan.key(),
                subscription.currency.as_str(),
                subscription.activated_at.to_rfc3339(),
                subscription.expires_at.to_rfc3339(),
                i64::from(subscription.active),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("put_subscription: {e}")))?;
        Ok(())
    }

    async fn get_subscription(
        &self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_subscription: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_subscription(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_subscription: {e}"))),
        }
    }

    // ── Generation history ──────────────────────────────────────────

    async fn append_generation(&self, generation: &NewGeneration) -> Result<i64, DatabaseError> {
        let _write = self.write_lock.lock().await;
        insert_generation(self.conn(), generation).await
    }

    async fn list_generations(
        &self,
        user_id: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<GenerationRecord>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {GENERATION_COLUMNS} FROM generation_history
                     WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2"
                ),
                params![user_id, limit_param(limit)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_generations: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_generations: {e}")))?
        {
            records.push(row_to_generation(&row)?);
        }
        Ok(records)
    }

    // ── Meals ───────────────────────────────────────────────────────

    async fn record_generation(
        &self,
        generation: &NewGeneration,
        meals: &[NewMeal],
    ) -> Result<(i64, Vec<i64>), DatabaseError> {
        let _write = self.write_lock.lock().await;
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("record_generation: begin: {e}")))?;

        let written = async {
            let record_id = insert_generation(&tx, generation).await?;
            let meal_ids = insert_meals(&tx, meals).await?;
            Ok::<_, DatabaseError>((record_id, meal_ids))
        }
        .await;

        match written {
            Ok(ids) => {
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::Query(format!("record_generation: commit: {e}")))?;
                Ok(ids)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback of generation record failed");
                }
                Err(e)
            }
        }
    }

    async fn recent_meals(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<MealRecord>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {MEAL_COLUMNS} FROM meals
                     WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2"
                ),
                params![user_id, limit_param(Some(limit))],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_meals: {e}")))?;

        let mut meals = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_meals: {e}")))?
        {
            meals.push(row_to_meal(&row)?);
        }
        Ok(meals)
    }
}
