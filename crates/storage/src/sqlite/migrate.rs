use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

/// Schema history, oldest first. Versions are applied once, in order.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    statements: &[
        r"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            exam_set_id INTEGER,
            part INTEGER NOT NULL CHECK (part BETWEEN 1 AND 7),
            prompt TEXT NOT NULL,
            choices TEXT NOT NULL,
            correct_choice TEXT NOT NULL,
            passage_id TEXT
        )
        ",
        r"
        CREATE TABLE IF NOT EXISTS exam_results (
            id INTEGER PRIMARY KEY,
            session_id TEXT NOT NULL UNIQUE,
            exam_set_id INTEGER,
            termination TEXT NOT NULL,
            started_at TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
            correct_count INTEGER NOT NULL CHECK (correct_count >= 0),
            score_percent INTEGER NOT NULL CHECK (score_percent BETWEEN 0 AND 100),
            time_spent_seconds INTEGER NOT NULL CHECK (time_spent_seconds >= 0),
            config TEXT NOT NULL,
            score TEXT NOT NULL,
            answers TEXT NOT NULL
        )
        ",
        "CREATE INDEX IF NOT EXISTS idx_questions_set_part ON questions (exam_set_id, part, id)",
        "CREATE INDEX IF NOT EXISTS idx_exam_results_submitted ON exam_results (submitted_at)",
    ],
}];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    let current = current.unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(migration.version)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    Ok(())
}
