use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use exam_core::ManualTicks;
use exam_core::model::{
    ExamConfiguration, ExamSetId, Part, PassageId, Question, QuestionId, SessionId,
    SessionStatus, Submission, TerminationReason,
};
use exam_core::time::manual_clock;
use services::{
    BankQuestionSupply, ExamServices, ExamSessionService, LoadFailure, RetryPolicy,
    SessionError, SessionTick,
};
use storage::repository::{
    ExamResultRepository, InMemoryRepository, QuestionRepository, ResultRow, Storage,
    StorageError,
};

fn question(id: u64, part: u8, correct: &str, passage: Option<&str>) -> Question {
    Question::new(
        QuestionId::new(id),
        Part::new(part).unwrap(),
        format!("Question {id}"),
        vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct,
        passage.map(PassageId::new),
    )
    .unwrap()
}

async fn seeded_storage(set: ExamSetId) -> Storage {
    let storage = Storage::in_memory();
    let bank = [
        question(1, 2, "A", None),
        question(2, 2, "B", None),
        question(3, 5, "C", None),
        question(4, 5, "D", None),
        question(5, 7, "A", Some("notice")),
        question(6, 7, "B", Some("notice")),
    ];
    for q in &bank {
        storage.questions.upsert_question(Some(set), q).await.unwrap();
    }
    storage
}

#[tokio::test]
async fn full_attempt_is_scored_and_stored() {
    let set = ExamSetId::new(1);
    let storage = seeded_storage(set).await;
    let services = ExamServices::from_storage(storage, manual_clock(), false);

    let config = ExamConfiguration::standard([2, 5, 7], 6, 10)
        .unwrap()
        .with_exam_set(set);
    let mut session = services
        .sessions()
        .open_session(config, ManualTicks::new())
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::NotStarted);
    let order: Vec<u64> = session.questions().iter().map(|q| q.id().value()).collect();
    assert_eq!(order, vec![1, 2, 3, 4, 5, 6]);

    session.start().unwrap();
    session.select_answer(QuestionId::new(1), "A").unwrap();
    session.next().unwrap();
    session.select_answer(QuestionId::new(2), "C").unwrap();
    session.go_to(4).unwrap();
    session.select_answer(QuestionId::new(5), "A").unwrap();
    session.select_answer(QuestionId::new(6), "B").unwrap();
    for _ in 0..120 {
        session.tick();
    }

    let persisted = services
        .sessions()
        .submit_and_persist(&mut session)
        .await
        .unwrap();
    assert_eq!(persisted.score.correct_count, 3);
    assert_eq!(persisted.score.answered_count, 4);
    assert_eq!(persisted.score.score_percent, 50);
    assert_eq!(persisted.score.time_spent_seconds, 120);
    assert_eq!(session.result_id(), Some(persisted.result_id));

    let stored = services.results().get_result(persisted.result_id).await.unwrap();
    assert_eq!(stored.termination(), TerminationReason::UserSubmitted);
    assert_eq!(stored.exam_set_id(), Some(set));
    assert_eq!(stored.score(), &persisted.score);

    let again = services.sessions().persist_result(&mut session).await.unwrap();
    assert_eq!(again, persisted.result_id);
    let recent = services.results().list_recent_results(10).await.unwrap();
    assert_eq!(recent.len(), 1);
}

#[tokio::test]
async fn expired_attempt_is_stored_once() {
    let set = ExamSetId::new(1);
    let storage = seeded_storage(set).await;
    let services = ExamServices::from_storage(storage, manual_clock(), false);
    let config = ExamConfiguration::standard([5], 2, 1)
        .unwrap()
        .with_exam_set(set);
    let mut session = services
        .sessions()
        .open_session(config, ManualTicks::new())
        .await
        .unwrap();
    session.start().unwrap();
    session.select_answer(QuestionId::new(3), "C").unwrap();

    let mut expired = None;
    for _ in 0..90 {
        if let SessionTick::Expired(score) = session.tick() {
            assert!(expired.is_none(), "expiry delivered twice");
            expired = Some(score);
        }
    }
    let score = expired.expect("session should expire");
    assert_eq!(session.status(), SessionStatus::Expired);
    assert_eq!(score.correct_count, 1);
    assert_eq!(score.time_spent_seconds, 60);

    let id = services.sessions().persist_result(&mut session).await.unwrap();
    let stored = services.results().get_result(id).await.unwrap();
    assert_eq!(stored.termination(), TerminationReason::TimeExpired);
    assert!(matches!(
        services.sessions().submit_and_persist(&mut session).await,
        Err(SessionError::AlreadySubmitted)
    ));
}

#[tokio::test]
async fn unknown_exam_set_fails_to_load() {
    let storage = seeded_storage(ExamSetId::new(1)).await;
    let services = ExamServices::from_storage(storage, manual_clock(), false);
    let config = ExamConfiguration::unlimited([5], 2)
        .unwrap()
        .with_exam_set(ExamSetId::new(99));
    let err = services
        .sessions()
        .open_session(config, ManualTicks::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::LoadFailed(LoadFailure::NoQuestions)
    ));
}

#[tokio::test]
async fn persisting_an_unfinished_session_is_rejected() {
    let set = ExamSetId::new(1);
    let storage = seeded_storage(set).await;
    let services = ExamServices::from_storage(storage, manual_clock(), false);
    let config = ExamConfiguration::unlimited([5], 2)
        .unwrap()
        .with_exam_set(set);
    let mut session = services
        .sessions()
        .open_session(config, ManualTicks::new())
        .await
        .unwrap();
    session.start().unwrap();
    let err = services
        .sessions()
        .persist_result(&mut session)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));
}

/// Result sink that fails a configurable number of writes. With
/// `store_before_failing`, the failing write still lands, as if only the
/// reply had been lost.
struct FlakySink {
    inner: InMemoryRepository,
    failures_left: AtomicU32,
    store_before_failing: bool,
    appends: AtomicU32,
}

impl FlakySink {
    fn new(failures: u32, store_before_failing: bool) -> Self {
        Self {
            inner: InMemoryRepository::new(),
            failures_left: AtomicU32::new(failures),
            store_before_failing,
            appends: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ExamResultRepository for FlakySink {
    async fn append_result(&self, submission: &Submission) -> Result<i64, StorageError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !failing {
            return self.inner.append_result(submission).await;
        }
        if self.store_before_failing {
            self.inner.append_result(submission).await?;
        }
        Err(StorageError::Connection("sink unavailable".into()))
    }

    async fn get_result(&self, id: i64) -> Result<Submission, StorageError> {
        self.inner.get_result(id).await
    }

    async fn find_result_id(&self, session_id: SessionId) -> Result<Option<i64>, StorageError> {
        self.inner.find_result_id(session_id).await
    }

    async fn list_recent_results(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError> {
        self.inner.list_recent_results(limit).await
    }
}

async fn service_with_sink(sink: Arc<FlakySink>) -> ExamSessionService {
    let bank = InMemoryRepository::new();
    bank.upsert_question(None, &question(1, 5, "A", None))
        .await
        .unwrap();
    bank.upsert_question(None, &question(2, 5, "B", None))
        .await
        .unwrap();
    ExamSessionService::new(
        manual_clock(),
        Arc::new(BankQuestionSupply::new(Arc::new(bank))),
        sink,
    )
}

#[tokio::test]
async fn failed_write_keeps_the_result_for_retry() {
    let sink = Arc::new(FlakySink::new(1, false));
    let service = service_with_sink(Arc::clone(&sink)).await;
    let config = ExamConfiguration::standard([5], 2, 5).unwrap();
    let mut session = service.open_session(config, ManualTicks::new()).await.unwrap();
    session.start().unwrap();
    session.select_answer(QuestionId::new(1), "A").unwrap();

    let err = service.submit_and_persist(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::PersistenceFailed(_)));
    assert!(err.is_retryable());
    assert_eq!(session.status(), SessionStatus::Submitted);
    assert_eq!(session.result_id(), None);
    let score = session.score().cloned().unwrap();

    let id = service.persist_result(&mut session).await.unwrap();
    assert_eq!(sink.get_result(id).await.unwrap().score(), &score);
    assert_eq!(sink.appends.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn lost_reply_is_recovered_without_duplicates() {
    let sink = Arc::new(FlakySink::new(1, true));
    let service = service_with_sink(Arc::clone(&sink)).await;
    let config = ExamConfiguration::unlimited([5], 2).unwrap();
    let mut session = service.open_session(config, ManualTicks::new()).await.unwrap();
    session.start().unwrap();
    session.submit().unwrap();

    assert!(service.persist_result(&mut session).await.is_err());
    let id = service.persist_result(&mut session).await.unwrap();
    assert_eq!(session.result_id(), Some(id));
    assert_eq!(sink.list_recent_results(10).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_rides_out_transient_failures() {
    let sink = Arc::new(FlakySink::new(2, false));
    let service = service_with_sink(Arc::clone(&sink)).await;
    let config = ExamConfiguration::unlimited([5], 2).unwrap();
    let mut session = service.open_session(config, ManualTicks::new()).await.unwrap();
    session.start().unwrap();
    session.submit().unwrap();

    let policy = RetryPolicy {
        attempts: 3,
        backoff: Duration::from_millis(100),
    };
    let id = service
        .persist_with_retry(&mut session, policy)
        .await
        .unwrap();
    assert_eq!(session.result_id(), Some(id));
    assert_eq!(sink.appends.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_gives_up_after_its_attempts() {
    let sink = Arc::new(FlakySink::new(5, false));
    let service = service_with_sink(Arc::clone(&sink)).await;
    let config = ExamConfiguration::unlimited([5], 2).unwrap();
    let mut session = service.open_session(config, ManualTicks::new()).await.unwrap();
    session.start().unwrap();
    session.submit().unwrap();

    let err = service
        .persist_with_retry(&mut session, RetryPolicy::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::PersistenceFailed(_)));
    assert_eq!(sink.appends.load(Ordering::SeqCst), 3);
    assert!(session.score().is_some());
}
