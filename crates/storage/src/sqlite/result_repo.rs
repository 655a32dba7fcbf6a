use exam_core::model::{SessionId, Submission};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{exam_set_id_to_i64, map_result_row, ser};
use crate::repository::{ExamResultRepository, ResultRow, StorageError};

const RESULT_COLUMNS: &str = r"
    id, session_id, termination, started_at, submitted_at, config, score, answers
";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait::async_trait]
impl ExamResultRepository for SqliteRepository {
    async fn append_result(&self, submission: &Submission) -> Result<i64, StorageError> {
        let score = submission.score();
        let time_spent = i64::try_from(score.time_spent_seconds)
            .map_err(|_| StorageError::Serialization("time_spent_seconds overflow".into()))?;

        let res = sqlx::query(
            r"
                INSERT INTO exam_results (
                    session_id, exam_set_id, termination, started_at, submitted_at,
                    total_questions, correct_count, score_percent, time_spent_seconds,
                    config, score, answers
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
        )
        .bind(submission.session_id().to_string())
        .bind(exam_set_id_to_i64(submission.exam_set_id())?)
        .bind(submission.termination().as_str())
        .bind(submission.started_at())
        .bind(submission.submitted_at())
        .bind(i64::from(score.total_questions))
        .bind(i64::from(score.correct_count))
        .bind(i64::from(score.score_percent))
        .bind(time_spent)
        .bind(serde_json::to_string(submission.config()).map_err(ser)?)
        .bind(serde_json::to_string(score).map_err(ser)?)
        .bind(serde_json::to_string(submission.answers()).map_err(ser)?)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                StorageError::Connection(e.to_string())
            }
        })?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: i64) -> Result<Submission, StorageError> {
        let sql = format!("SELECT {RESULT_COLUMNS} FROM exam_results WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        Ok(map_result_row(&row)?.submission)
    }

    async fn find_result_id(&self, session_id: SessionId) -> Result<Option<i64>, StorageError> {
        let row = sqlx::query("SELECT id FROM exam_results WHERE session_id = ?1")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| r.try_get::<i64, _>("id").map_err(ser))
            .transpose()
    }

    async fn list_recent_results(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM exam_results ORDER BY submitted_at DESC, id DESC LIMIT ?1"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row(&row)?);
        }
        Ok(out)
    }
}
