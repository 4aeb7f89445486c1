use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};
use uuid::Uuid;

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the daemon indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    /// IANA timezone identifier, e.g. `"America/New_York"`. Never validated
    /// at write time — streak computation falls back to UTC if it is stale.
    pub timezone: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub task_id: String,
    /// Planned focus duration in minutes (1..=120).
    pub duration: i64,
    /// 'in_progress' | 'completed' | 'cancelled'. Terminal states are never
    /// mutated again — see `complete_session` / `cancel_session`.
    pub status: String,
    pub start_time: String,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AchievementRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon_url: Option<String>,
    /// JSON criterion, e.g. `{"kind":"streak","threshold":7}`.
    pub criterion: String,
    pub created_at: String,
}

/// Catalog entry joined with the caller's grant (if any).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AchievementStatusRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon_url: Option<String>,
    pub unlocked_at: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GrantRow {
    pub id: String,
    pub user_id: String,
    pub achievement_id: String,
    pub unlocked_at: String,
}

/// Result of an insert-if-absent against the grant ledger.
///
/// `AlreadyGranted` is a normal outcome (a concurrent check won the race or
/// the grant predates this check), never an error.
#[derive(Debug)]
pub enum GrantOutcome {
    Granted(GrantRow),
    AlreadyGranted,
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("focusd.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .foreign_keys(true)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("src/storage/migrations")
            .run(pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    // ─── Users ──────────────────────────────────────────────────────────────

    pub async fn create_user(&self, email: &str, timezone: &str) -> Result<UserRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, email, timezone, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(email)
        .bind(timezone)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_user(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after insert"))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn update_user_timezone(&self, id: &str, timezone: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET timezone = ?, updated_at = ? WHERE id = ?")
            .bind(timezone)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a user and all owned rows (tasks, sessions, tokens, grants)
    /// via ON DELETE CASCADE.
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Auth tokens ────────────────────────────────────────────────────────

    pub async fn insert_auth_token(&self, token_hash: &str, user_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO auth_tokens (token_hash, user_id, created_at) VALUES (?, ?, ?)")
            .bind(token_hash)
            .bind(user_id)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn user_id_for_token(&self, token_hash: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM auth_tokens WHERE token_hash = ?")
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    pub async fn delete_auth_tokens_for_user(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM auth_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Tasks ──────────────────────────────────────────────────────────────

    pub async fn create_task(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<TaskRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO tasks (id, user_id, title, description, is_completed, created_at, updated_at)
             VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_task(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("task not found after insert"))
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<TaskRow>> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_tasks(&self, user_id: &str) -> Result<Vec<TaskRow>> {
        with_timeout(async {
            Ok(
                sqlx::query_as("SELECT * FROM tasks WHERE user_id = ? ORDER BY created_at DESC")
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?,
            )
        })
        .await
    }

    pub async fn update_task(
        &self,
        id: &str,
        title: Option<&str>,
        description: Option<Option<&str>>,
        is_completed: Option<bool>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        if let Some(title) = title {
            sqlx::query("UPDATE tasks SET title = ?, updated_at = ? WHERE id = ?")
                .bind(title)
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        if let Some(description) = description {
            sqlx::query("UPDATE tasks SET description = ?, updated_at = ? WHERE id = ?")
                .bind(description)
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        if let Some(done) = is_completed {
            sqlx::query("UPDATE tasks SET is_completed = ?, updated_at = ? WHERE id = ?")
                .bind(done)
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn delete_task(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Focus sessions ─────────────────────────────────────────────────────

    pub async fn create_session(
        &self,
        user_id: &str,
        task_id: &str,
        duration: i64,
    ) -> Result<SessionRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO sessions (id, user_id, task_id, duration, status, start_time)
             VALUES (?, ?, ?, ?, 'in_progress', ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(task_id)
        .bind(duration)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_session(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("session not found after insert"))
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        Ok(sqlx::query_as("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Atomically move an in-progress session to a terminal state.
    ///
    /// The status guard in the WHERE clause makes the transition race-safe:
    /// two concurrent complete/cancel calls cannot both succeed. Returns
    /// `true` if this call performed the transition.
    pub async fn finish_session(&self, id: &str, status: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE sessions SET status = ?, end_time = ?
             WHERE id = ? AND status = 'in_progress'",
        )
        .bind(status)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Paginated session history, newest first. Both filters are optional.
    pub async fn list_sessions(
        &self,
        user_id: &str,
        task_id: Option<&str>,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionRow>> {
        with_timeout(async {
            match (task_id, status) {
                (Some(tid), Some(st)) => Ok(sqlx::query_as(
                    "SELECT * FROM sessions
                     WHERE user_id = ? AND task_id = ? AND status = ?
                     ORDER BY start_time DESC LIMIT ? OFFSET ?",
                )
                .bind(user_id)
                .bind(tid)
                .bind(st)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?),
                (Some(tid), None) => Ok(sqlx::query_as(
                    "SELECT * FROM sessions WHERE user_id = ? AND task_id = ?
                     ORDER BY start_time DESC LIMIT ? OFFSET ?",
                )
                .bind(user_id)
                .bind(tid)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?),
                (None, Some(st)) => Ok(sqlx::query_as(
                    "SELECT * FROM sessions WHERE user_id = ? AND status = ?
                     ORDER BY start_time DESC LIMIT ? OFFSET ?",
                )
                .bind(user_id)
                .bind(st)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?),
                (None, None) => Ok(sqlx::query_as(
                    "SELECT * FROM sessions WHERE user_id = ?
                     ORDER BY start_time DESC LIMIT ? OFFSET ?",
                )
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?),
            }
        })
        .await
    }

    // ─── Completed-session aggregates ───────────────────────────────────────
    //
    // Read-only queries feeding the streak and achievement engines. Scoped to
    // status = 'completed' — cancelled sessions never count toward anything.

    pub async fn completed_session_count(&self, user_id: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sessions WHERE user_id = ? AND status = 'completed'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Sum of `duration` (minutes) over the user's completed sessions.
    pub async fn total_completed_minutes(&self, user_id: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(duration), 0) FROM sessions
             WHERE user_id = ? AND status = 'completed'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Start instants of every completed session, most recent first.
    pub async fn completed_session_start_times(
        &self,
        user_id: &str,
    ) -> Result<Vec<DateTime<Utc>>> {
        with_timeout(async {
            let rows: Vec<(String,)> = sqlx::query_as(
                "SELECT start_time FROM sessions
                 WHERE user_id = ? AND status = 'completed'
                 ORDER BY start_time DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
            rows.into_iter()
                .map(|(ts,)| {
                    DateTime::parse_from_rfc3339(&ts)
                        .map(|dt| dt.with_timezone(&Utc))
                        .with_context(|| format!("malformed session start_time: {ts}"))
                })
                .collect()
        })
        .await
    }

    // ─── Achievement catalog ────────────────────────────────────────────────

    /// Insert a catalog entry unless one with the same name already exists.
    /// Idempotent — safe to run on every startup.
    pub async fn seed_achievement(
        &self,
        name: &str,
        description: &str,
        icon_url: Option<&str>,
        criterion: &str,
    ) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO achievements (id, name, description, icon_url, criterion, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(&id)
        .bind(name)
        .bind(description)
        .bind(icon_url)
        .bind(criterion)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Full catalog in stable order — evaluation order must be deterministic.
    pub async fn list_achievements(&self) -> Result<Vec<AchievementRow>> {
        Ok(
            sqlx::query_as("SELECT * FROM achievements ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Catalog joined with the user's grants: every achievement, with
    /// `unlocked_at` set iff this user holds a grant for it.
    pub async fn achievements_with_unlock_status(
        &self,
        user_id: &str,
    ) -> Result<Vec<AchievementStatusRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT a.id, a.name, a.description, a.icon_url, ua.unlocked_at
                 FROM achievements a
                 LEFT JOIN user_achievements ua
                   ON ua.achievement_id = a.id AND ua.user_id = ?
                 ORDER BY a.created_at ASC, a.id ASC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    /// Only the achievements this user has unlocked, newest grant first.
    pub async fn unlocked_achievements(&self, user_id: &str) -> Result<Vec<AchievementStatusRow>> {
        Ok(sqlx::query_as(
            "SELECT a.id, a.name, a.description, a.icon_url, ua.unlocked_at
             FROM user_achievements ua
             JOIN achievements a ON a.id = ua.achievement_id
             WHERE ua.user_id = ?
             ORDER BY ua.unlocked_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ─── Grant ledger ───────────────────────────────────────────────────────

    pub async fn has_grant(&self, user_id: &str, achievement_id: &str) -> Result<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM user_achievements WHERE user_id = ? AND achievement_id = ?",
        )
        .bind(user_id)
        .bind(achievement_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 > 0)
    }

    pub async fn grant_count(&self, user_id: &str) -> Result<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_achievements WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    /// Insert-if-absent against the grant ledger.
    ///
    /// The UNIQUE(user_id, achievement_id) constraint arbitrates concurrent
    /// attempts — ON CONFLICT DO NOTHING turns a lost race into
    /// `GrantOutcome::AlreadyGranted` instead of an error. This is the only
    /// synchronization point for "award once"; no in-process lock exists,
    /// since the daemon may run alongside other instances of itself.
    pub async fn try_grant(&self, user_id: &str, achievement_id: &str) -> Result<GrantOutcome> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO user_achievements (id, user_id, achievement_id, unlocked_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, achievement_id) DO NOTHING",
        )
        .bind(&id)
        .bind(user_id)
        .bind(achievement_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(GrantOutcome::AlreadyGranted);
        }
        Ok(GrantOutcome::Granted(GrantRow {
            id,
            user_id: user_id.to_string(),
            achievement_id: achievement_id.to_string(),
            unlocked_at: now,
        }))
    }
}
