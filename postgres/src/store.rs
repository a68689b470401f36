//! [`RegistrationStore`] over a `PostgreSQL` pool.

use crate::error::{is_registration_id_taken, storage, violated_key};
use crate::query::{push_filter, push_page};
use crate::row::{COLUMNS, ColumnValues, RegistrationRow, into_registrations};
use crate::stats;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reunion_core::error::{ConflictField, ExistingRegistration, RegistryError, Result};
use reunion_core::query::{ListQuery, Page};
use reunion_core::registration_id::{ASSIGN_ATTEMPTS, RegistrationId, next_after};
use reunion_core::stats::RegistrationStats;
use reunion_core::store::{KeyConflict, RegistrationStore};
use reunion_core::types::{NewRegistration, Registration, UniqueKeys};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Registration store backed by the `registrations` table.
///
/// Registration numbers come from `registration_number_seq`. Uniqueness of
/// email, mobile and transaction ID is enforced by table constraints, so a
/// write that races past [`RegistrationStore::find_conflict`] still fails
/// with a conflict.
///
/// # Example
///
/// ```no_run
/// use reunion_postgres::PostgresRegistrationStore;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresRegistrationStore::connect("postgres://localhost/reunion", 10, Duration::from_secs(30)).await?;
/// store.migrate().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresRegistrationStore {
    pool: PgPool,
}

impl PostgresRegistrationStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool of up to `max_connections`, waiting at most
    /// `acquire_timeout` for a connection.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| storage("connect to database", &e))?;
        Ok(Self::from_pool(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations, then move the registration sequence past any
    /// number already in the table.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if a migration or the sequence update fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RegistryError::Storage(format!("Migration failed: {e}")))?;
        self.sync_sequence().await
    }

    async fn sync_sequence(&self) -> Result<()> {
        let highest: Option<String> = sqlx::query_scalar(
            r"
            SELECT registration_id FROM registrations
            WHERE registration_id ~ '^REG[0-9]{5,}$'
            ORDER BY length(registration_id) DESC, registration_id DESC
            LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage("read highest registration ID", &e))?;

        let next = next_after(highest.as_deref()).sequence().unwrap_or(1);
        let next = i64::try_from(next).unwrap_or(i64::MAX);
        sqlx::query(
            r"
            SELECT setval('registration_number_seq', $1, false)
            WHERE $1 > (
                SELECT CASE WHEN is_called THEN last_value + 1 ELSE last_value END
                FROM registration_number_seq
            )
            ",
        )
        .bind(next)
        .execute(&self.pool)
        .await
        .map_err(|e| storage("advance registration sequence", &e))?;
        debug!(next, "Registration sequence synchronised");
        Ok(())
    }

    async fn next_registration_id(&self, now: DateTime<Utc>, attempt: u32) -> RegistrationId {
        let next: std::result::Result<i64, sqlx::Error> = sqlx::query_scalar("SELECT nextval('registration_number_seq')")
            .fetch_one(&self.pool)
            .await;
        match next {
            Ok(n) => match u64::try_from(n) {
                Ok(n) => return RegistrationId::from_sequence(n),
                Err(_) => warn!(value = n, "Registration sequence returned a negative value"),
            },
            Err(e) => warn!(error = %e, "Registration sequence unavailable"),
        }
        let fallback = RegistrationId::fallback(now, attempt);
        metrics::counter!("reunion_registration_id_fallbacks_total").increment(1);
        warn!(registration_id = %fallback, "Using clock-derived registration ID");
        fallback
    }

    async fn insert_row(
        &self,
        values: &ColumnValues<'_>,
        registration_id: &RegistrationId,
        transaction_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> std::result::Result<RegistrationRow, sqlx::Error> {
        let details = values.details;
        let sql = format!(
            r"
            INSERT INTO registrations (
                id, registration_id, name, email, mobile, gender, batch, roll_number,
                food_choice, expected_arrival_time, overnight_accommodation,
                adults, children, infants, guests, volunteer, committee, sponsor,
                program_ideas, skills, contribution_amount, payment_status,
                payment_transaction_id, verified, attended, is_email_sent,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, 'pending', $22, FALSE, FALSE, FALSE, $23, $23
            )
            RETURNING {COLUMNS}
            "
        );
        sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(registration_id.as_str())
            .bind(&details.name)
            .bind(&details.email)
            .bind(&details.mobile)
            .bind(values.gender)
            .bind(values.batch)
            .bind(&details.roll_number)
            .bind(details.food_choice.as_str())
            .bind(details.expected_arrival_time.as_str())
            .bind(details.overnight_accommodation.as_str())
            .bind(values.adults)
            .bind(values.children)
            .bind(values.infants)
            .bind(sqlx::types::Json(&details.guests))
            .bind(sqlx::types::Json(&details.volunteer))
            .bind(sqlx::types::Json(&details.committee))
            .bind(sqlx::types::Json(&details.sponsor))
            .bind(&details.program_ideas)
            .bind(&details.skills)
            .bind(values.contribution_amount)
            .bind(transaction_id)
            .bind(now)
            .fetch_one(&self.pool)
            .await
    }

    async fn fetch_existing(&self, field: ConflictField, keys: UniqueKeys<'_>) -> Option<ExistingRegistration> {
        let (column, value) = match field {
            ConflictField::Email => ("email", keys.email),
            ConflictField::Mobile => ("mobile", keys.mobile),
            ConflictField::TransactionId => return None,
        };
        let sql = format!("SELECT email, mobile, created_at FROM registrations WHERE {column} = $1");
        let found = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await;
        existing_or_log(field, found)
    }

    /// Turn a failed write into a conflict when a unique constraint fired.
    async fn write_error(&self, action: &str, error: &sqlx::Error, keys: UniqueKeys<'_>) -> RegistryError {
        match violated_key(error) {
            Some(field) => {
                debug!(%field, "Unique constraint rejected write");
                RegistryError::conflict(field, self.fetch_existing(field, keys).await)
            },
            None => storage(action, error),
        }
    }

    async fn fetch_where(&self, condition: &str, value: &str) -> Result<Vec<Registration>> {
        let sql = format!("SELECT {COLUMNS} FROM registrations WHERE {condition} ORDER BY created_at, id");
        let rows: Vec<RegistrationRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage("load registrations", &e))?;
        into_registrations(rows)
    }
}

/// The conflicting record's details; a failed lookup is logged and dropped.
fn existing_or_log(
    field: ConflictField,
    found: std::result::Result<Option<(String, String, DateTime<Utc>)>, sqlx::Error>,
) -> Option<ExistingRegistration> {
    match found {
        Ok(row) => row.map(|(email, mobile, created_at)| ExistingRegistration { email, mobile, created_at }),
        Err(e) => {
            warn!(%field, error = %e, "Could not load the record holding a conflicting key");
            None
        },
    }
}

/// Pick the highest-priority conflict among rows sharing any key.
pub(crate) fn first_conflict(
    rows: Vec<(String, String, Option<String>, DateTime<Utc>)>,
    keys: UniqueKeys<'_>,
) -> Option<KeyConflict> {
    let holds = |field: ConflictField, row: &(String, String, Option<String>, DateTime<Utc>)| match field {
        ConflictField::Email => row.0 == keys.email,
        ConflictField::Mobile => row.1 == keys.mobile,
        ConflictField::TransactionId => keys.transaction_id.is_some() && row.2.as_deref() == keys.transaction_id,
    };
    [ConflictField::Email, ConflictField::Mobile, ConflictField::TransactionId]
        .into_iter()
        .find_map(|field| {
            rows.iter().find(|row| holds(field, row)).map(|row| KeyConflict {
                field,
                existing: ExistingRegistration {
                    email: row.0.clone(),
                    mobile: row.1.clone(),
                    created_at: row.3,
                },
            })
        })
}

#[async_trait]
impl RegistrationStore for PostgresRegistrationStore {
    async fn insert(&self, registration: NewRegistration, now: DateTime<Utc>) -> Result<Registration> {
        let values = ColumnValues::new(&registration.details, registration.contribution_amount)?;

        for attempt in 0..ASSIGN_ATTEMPTS {
            let registration_id = self.next_registration_id(now, attempt).await;
            match self
                .insert_row(&values, &registration_id, registration.payment_transaction_id.as_deref(), now)
                .await
            {
                Ok(row) => {
                    let stored = Registration::try_from(row)?;
                    debug!(registration_id = %stored.registration_id, "Registration inserted");
                    return Ok(stored);
                },
                Err(e) if is_registration_id_taken(&e) => {
                    warn!(%registration_id, attempt, "Registration ID already taken; drawing another");
                },
                Err(e) => return Err(self.write_error("insert registration", &e, registration.unique_keys()).await),
            }
        }
        Err(RegistryError::Storage(format!(
            "No unused registration ID after {ASSIGN_ATTEMPTS} attempts"
        )))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Registration>> {
        let sql = format!("SELECT {COLUMNS} FROM registrations WHERE id = $1");
        sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage("load registration", &e))?
            .map(Registration::try_from)
            .transpose()
    }

    async fn get_by_registration_id(&self, registration_id: &str) -> Result<Option<Registration>> {
        Ok(self
            .fetch_where("registration_id = $1", registration_id)
            .await?
            .into_iter()
            .next())
    }

    async fn update(&self, registration: &Registration) -> Result<Registration> {
        let values = ColumnValues::new(&registration.details, registration.contribution_amount)?;
        let details = values.details;

        let sql = format!(
            r"
            UPDATE registrations SET
                name = $2, email = $3, mobile = $4, gender = $5, batch = $6, roll_number = $7,
                food_choice = $8, expected_arrival_time = $9, overnight_accommodation = $10,
                adults = $11, children = $12, infants = $13, guests = $14,
                volunteer = $15, committee = $16, sponsor = $17,
                program_ideas = $18, skills = $19, contribution_amount = $20,
                payment_status = $21, payment_transaction_id = $22,
                verified = $23, verified_at = $24, attended = $25, attendance_marked_at = $26,
                is_email_sent = $27, updated_at = $28
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        );
        let result = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(registration.id)
            .bind(&details.name)
            .bind(&details.email)
            .bind(&details.mobile)
            .bind(values.gender)
            .bind(values.batch)
            .bind(&details.roll_number)
            .bind(details.food_choice.as_str())
            .bind(details.expected_arrival_time.as_str())
            .bind(details.overnight_accommodation.as_str())
            .bind(values.adults)
            .bind(values.children)
            .bind(values.infants)
            .bind(sqlx::types::Json(&details.guests))
            .bind(sqlx::types::Json(&details.volunteer))
            .bind(sqlx::types::Json(&details.committee))
            .bind(sqlx::types::Json(&details.sponsor))
            .bind(&details.program_ideas)
            .bind(&details.skills)
            .bind(values.contribution_amount)
            .bind(registration.payment_status.as_str())
            .bind(registration.payment_transaction_id.as_deref())
            .bind(registration.verified)
            .bind(registration.verified_at)
            .bind(registration.attended)
            .bind(registration.attendance_marked_at)
            .bind(registration.is_email_sent)
            .bind(registration.updated_at)
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(Some(row)) => Registration::try_from(row),
            Ok(None) => Err(RegistryError::NotFound(registration.id.to_string())),
            Err(e) => Err(self.write_error("update registration", &e, registration.unique_keys()).await),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM registrations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage("delete registration", &e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_conflict(&self, keys: UniqueKeys<'_>, exclude: Option<Uuid>) -> Result<Option<KeyConflict>> {
        let rows: Vec<(String, String, Option<String>, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT email, mobile, payment_transaction_id, created_at
            FROM registrations
            WHERE (email = $1 OR mobile = $2 OR ($3::TEXT IS NOT NULL AND payment_transaction_id = $3))
              AND ($4::UUID IS NULL OR id <> $4)
            ORDER BY created_at, id
            ",
        )
        .bind(keys.email)
        .bind(keys.mobile)
        .bind(keys.transaction_id)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("check unique keys", &e))?;
        Ok(first_conflict(rows, keys))
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Registration>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM registrations");
        push_filter(&mut count, &query.filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage("count registrations", &e))?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM registrations"));
        push_filter(&mut select, &query.filter);
        push_page(&mut select, query);
        let rows: Vec<RegistrationRow> = select
            .build_query_as::<RegistrationRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage("list registrations", &e))?;

        Ok(Page {
            items: into_registrations(rows)?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn search(&self, term: &str) -> Result<Vec<Registration>> {
        self.fetch_where(
            "payment_transaction_id = $1 OR email = LOWER($1) OR UPPER(registration_id) = UPPER($1)",
            term,
        )
        .await
    }

    async fn stats(&self) -> Result<RegistrationStats> {
        stats::compute(&self.pool).await
    }

    async fn unsent(&self) -> Result<Vec<Registration>> {
        let sql = format!("SELECT {COLUMNS} FROM registrations WHERE NOT is_email_sent ORDER BY created_at, id");
        let rows: Vec<RegistrationRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage("load unsent registrations", &e))?;
        into_registrations(rows)
    }

    async fn set_email_sent(&self, id: Uuid, sent: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE registrations SET is_email_sent = $2 WHERE id = $1")
            .bind(id)
            .bind(sent)
            .execute(&self.pool)
            .await
            .map_err(|e| storage("record email outcome", &e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn all(&self) -> Result<Vec<Registration>> {
        let sql = format!("SELECT {COLUMNS} FROM registrations ORDER BY created_at, id");
        let rows: Vec<RegistrationRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage("export registrations", &e))?;
        info!(count = rows.len(), "Registrations exported");
        into_registrations(rows)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| storage("reach database", &e))?;
        Ok(())
    }
}
