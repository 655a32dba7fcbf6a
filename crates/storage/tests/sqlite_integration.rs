use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use exam_core::model::{
    Answer, ExamConfiguration, ExamSetId, Part, PartBreakdown, PassageId, Question, QuestionId,
    ScoreResult, SessionId, Submission, TerminationReason,
};
use exam_core::time::fixed_now;
use storage::repository::{ExamResultRepository, QuestionRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn part(n: u8) -> Part {
    Part::new(n).unwrap()
}

fn build_question(id: u64, part_no: u8, passage: Option<&str>) -> Question {
    Question::new(
        QuestionId::new(id),
        part(part_no),
        format!("Q{id}"),
        vec!["A".into(), "B".into(), "C".into(), "D".into()],
        "B",
        passage.map(PassageId::new),
    )
    .unwrap()
}

fn build_submission(minutes_offset: i64, reason: TerminationReason) -> Submission {
    let config = ExamConfiguration::standard([5, 7], 2, 1)
        .unwrap()
        .with_exam_set(ExamSetId::new(1));
    let started = fixed_now() + Duration::minutes(minutes_offset);
    let mut per_part = BTreeMap::new();
    per_part.insert(
        part(5),
        PartBreakdown {
            total: 1,
            correct: 1,
            accuracy: 100,
        },
    );
    per_part.insert(
        part(7),
        PartBreakdown {
            total: 1,
            correct: 0,
            accuracy: 0,
        },
    );
    Submission::new(
        SessionId::generate(),
        config,
        ScoreResult {
            total_questions: 2,
            correct_count: 1,
            answered_count: 1,
            score_percent: 50,
            time_spent_seconds: 60,
            per_part,
        },
        vec![
            Answer {
                question_id: QuestionId::new(1),
                selected_choice: Some("B".into()),
                elapsed_ms: 12_000,
            },
            Answer {
                question_id: QuestionId::new(2),
                selected_choice: None,
                elapsed_ms: 0,
            },
        ],
        started,
        started + Duration::seconds(60),
        reason,
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_question_bank_filters_and_orders() {
    let repo = connect("memdb_questions").await;
    let set = ExamSetId::new(1);

    repo.upsert_question(Some(set), &build_question(3, 7, Some("doc-1")))
        .await
        .unwrap();
    repo.upsert_question(Some(set), &build_question(1, 5, None))
        .await
        .unwrap();
    repo.upsert_question(Some(set), &build_question(2, 3, Some("conv-1")))
        .await
        .unwrap();
    repo.upsert_question(None, &build_question(4, 5, None))
        .await
        .unwrap();

    let parts: BTreeSet<Part> = [part(5), part(7)].into_iter().collect();
    let in_set = repo.list_candidates(Some(set), &parts).await.unwrap();
    let ids: Vec<u64> = in_set.iter().map(|q| q.id().value()).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(
        in_set[1].passage_id().map(PassageId::as_str),
        Some("doc-1")
    );
    assert_eq!(in_set[0].choices().len(), 4);

    let bank = repo.list_candidates(None, &parts).await.unwrap();
    assert_eq!(bank.len(), 3);
}

#[tokio::test]
async fn sqlite_upsert_replaces_question() {
    let repo = connect("memdb_upsert").await;
    repo.upsert_question(None, &build_question(1, 5, None))
        .await
        .unwrap();
    let updated = Question::new(
        QuestionId::new(1),
        part(6),
        "Edited",
        vec!["A".into(), "B".into()],
        "A",
        None,
    )
    .unwrap();
    repo.upsert_question(None, &updated).await.unwrap();

    let parts: BTreeSet<Part> = [part(5), part(6)].into_iter().collect();
    let all = repo.list_candidates(None, &parts).await.unwrap();
    assert_eq!(all, vec![updated]);
}

#[tokio::test]
async fn sqlite_results_roundtrip_and_conflict() {
    let repo = connect("memdb_results").await;
    let submission = build_submission(0, TerminationReason::TimeExpired);

    let id = repo.append_result(&submission).await.unwrap();
    let fetched = repo.get_result(id).await.unwrap();
    assert_eq!(fetched, submission);

    let err = repo.append_result(&submission).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
    assert_eq!(
        repo.find_result_id(submission.session_id()).await.unwrap(),
        Some(id)
    );
    assert_eq!(
        repo.find_result_id(SessionId::generate()).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn sqlite_recent_results_newest_first() {
    let repo = connect("memdb_recent").await;
    let first = build_submission(0, TerminationReason::UserSubmitted);
    let second = build_submission(30, TerminationReason::TimeExpired);
    repo.append_result(&first).await.unwrap();
    repo.append_result(&second).await.unwrap();

    let rows = repo.list_recent_results(10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].submission.session_id(), second.session_id());
    assert_eq!(rows[1].submission.termination(), TerminationReason::UserSubmitted);
}

#[tokio::test]
async fn sqlite_missing_result_is_not_found() {
    let repo = connect("memdb_missing").await;
    let err = repo.get_result(42).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}
