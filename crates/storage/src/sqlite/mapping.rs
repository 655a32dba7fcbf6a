use exam_core::model::{
    Answer, ExamConfiguration, ExamSetId, Part, PassageId, Question, QuestionId, ScoreResult,
    SessionId, Submission, TerminationReason,
};
use sqlx::Row;

use crate::repository::{ResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn exam_set_id_to_i64(id: Option<ExamSetId>) -> Result<Option<i64>, StorageError> {
    id.map(|s| id_i64("exam_set_id", s.value())).transpose()
}

pub(crate) fn part_from_i64(v: i64) -> Result<Part, StorageError> {
    let raw = u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid part: {v}")))?;
    Part::new(raw).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let part = part_from_i64(row.try_get::<i64, _>("part").map_err(ser)?)?;
    let prompt: String = row.try_get("prompt").map_err(ser)?;
    let choices: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("choices").map_err(ser)?).map_err(ser)?;
    let correct_choice: String = row.try_get("correct_choice").map_err(ser)?;
    let passage_id = row
        .try_get::<Option<String>, _>("passage_id")
        .map_err(ser)?
        .map(PassageId::new);

    Question::new(id, part, prompt, choices, correct_choice, passage_id).map_err(ser)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<ResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let session_id: SessionId = row
        .try_get::<String, _>("session_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let termination =
        TerminationReason::parse(&row.try_get::<String, _>("termination").map_err(ser)?)
            .map_err(ser)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let submitted_at = row.try_get("submitted_at").map_err(ser)?;

    let config: ExamConfiguration =
        serde_json::from_str(&row.try_get::<String, _>("config").map_err(ser)?).map_err(ser)?;
    config.validate().map_err(ser)?;
    let score: ScoreResult =
        serde_json::from_str(&row.try_get::<String, _>("score").map_err(ser)?).map_err(ser)?;
    let answers: Vec<Answer> =
        serde_json::from_str(&row.try_get::<String, _>("answers").map_err(ser)?).map_err(ser)?;

    let submission = Submission::new(
        session_id,
        config,
        score,
        answers,
        started_at,
        submitted_at,
        termination,
    )
    .map_err(ser)?;

    Ok(ResultRow::new(id, submission))
}
