use exam_core::model::{ExamSetId, Part, Question};
use std::collections::BTreeSet;

use super::SqliteRepository;
use super::mapping::{exam_set_id_to_i64, id_i64, map_question_row, ser};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(
        &self,
        exam_set_id: Option<ExamSetId>,
        question: &Question,
    ) -> Result<(), StorageError> {
        let id = id_i64("question_id", question.id().value())?;
        let exam_set = exam_set_id_to_i64(exam_set_id)?;
        let choices = serde_json::to_string(question.choices()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO questions (id, exam_set_id, part, prompt, choices, correct_choice, passage_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                exam_set_id = excluded.exam_set_id,
                part = excluded.part,
                prompt = excluded.prompt,
                choices = excluded.choices,
                correct_choice = excluded.correct_choice,
                passage_id = excluded.passage_id
            ",
        )
        .bind(id)
        .bind(exam_set)
        .bind(i64::from(question.part().number()))
        .bind(question.prompt())
        .bind(choices)
        .bind(question.correct_choice())
        .bind(question.passage_id().map(|p| p.as_str().to_owned()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_candidates(
        &self,
        exam_set_id: Option<ExamSetId>,
        parts: &BTreeSet<Part>,
    ) -> Result<Vec<Question>, StorageError> {
        if parts.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
                SELECT id, part, prompt, choices, correct_choice, passage_id
                FROM questions
                WHERE part IN (
            ",
        );
        for i in 0..parts.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');
        if exam_set_id.is_some() {
            sql.push_str(" AND exam_set_id = ?");
            sql.push_str(&(parts.len() + 1).to_string());
        }
        sql.push_str(" ORDER BY part ASC, id ASC");

        let mut query = sqlx::query(&sql);
        for part in parts {
            query = query.bind(i64::from(part.number()));
        }
        if let Some(set) = exam_set_id_to_i64(exam_set_id)? {
            query = query.bind(set);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }
}
