mod common;

use common::{create_test_db, sample_seed, seeded_db, user};
use scentquiz::catalog::QuestionKind;
use scentquiz::db::{AnswerInput, SessionStatus, StageAdvance};
use scentquiz::names;

fn answer(question_id: &str, value: Option<&str>, text: Option<&str>) -> AnswerInput {
    AnswerInput {
        question_id: question_id.to_string(),
        value: value.map(str::to_string),
        text: text.map(str::to_string),
    }
}

#[tokio::test]
async fn migrations_are_recorded_once() {
    let db = create_test_db().await;
    assert!(db.migration_applied("V1").await.unwrap());
    assert!(!db.migration_applied("V999").await.unwrap());
}

// ----- catalog -----

#[tokio::test]
async fn seeded_catalog_loads_in_order() {
    let db = seeded_db().await;
    let catalog = db.load_catalog().await.unwrap();

    let groups: Vec<_> = catalog.groups().iter().map(|g| g.id.as_str()).collect();
    assert_eq!(groups, ["part1", "part2", "part3", "part4"]);
    assert_eq!(catalog.question_count(), 8);

    let part1 = catalog.stage_group(1).unwrap();
    let ids: Vec<_> = part1.questions.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, ["q1-1", "q1-2", "q1-7"]);

    let values: Vec<_> = part1.questions[0].options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, ["A", "B", "C", "D", "E"]);
    assert_eq!(catalog.option("q1-7", "B").unwrap().label, "和睦");

    let q4 = catalog.question("q4").unwrap();
    assert_eq!(q4.kind, QuestionKind::ImageMultiple);
    assert_eq!(q4.images_path.as_deref(), Some("/images/smell/"));
    assert_eq!(q4.image_range, Some(serde_json::json!(true)));
    assert!(q4.options.is_empty());
    assert!(q4.is_generated());

    let q29 = catalog.question("q2-9").unwrap();
    assert_eq!(q29.show_text_when.as_deref(), Some("yes"));
}

#[tokio::test]
async fn reseeding_replaces_by_id() {
    let db = seeded_db().await;
    let mut seed = sample_seed();
    seed.question_groups[0].questions[0].text = "改过的题目".to_string();
    seed.question_groups[0].questions[0].options.truncate(2);
    db.load_seed(&seed).await.unwrap();

    let catalog = db.load_catalog().await.unwrap();
    assert_eq!(catalog.question_count(), 8);
    let q = catalog.question("q1-1").unwrap();
    assert_eq!(q.text, "改过的题目");
    assert_eq!(q.options.len(), 2);
}

#[tokio::test]
async fn fragrance_categories_filter_by_type() {
    let db = seeded_db().await;

    let citrus = db.fragrance_categories_by_type("柑橘类").await.unwrap();
    let ids: Vec<_> = citrus.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["citrus", "citrus_lemon"]);
    assert_eq!(citrus[0].intensity, Some(6));
    assert_eq!(citrus[0].core_trait_1.as_deref(), Some("柑橘/强"));

    assert!(db.fragrance_categories_by_type("皮革类").await.unwrap().is_empty());
}

// ----- users -----

#[tokio::test]
async fn user_sessions_resolve_to_users() {
    let db = create_test_db().await;
    let alice = db.ensure_user("alice", false).await.unwrap();
    let again = db.ensure_user("alice", false).await.unwrap();
    assert_eq!(alice.id, again.id);
    assert!(!alice.is_admin);

    let token = db.create_user_session(alice.id).await.unwrap();
    let found = db.get_user_by_session(&token).await.unwrap().unwrap();
    assert_eq!(found.username, "alice");
    assert!(db.get_user_by_session("nope").await.unwrap().is_none());

    let promoted = db.ensure_user("alice", true).await.unwrap();
    assert!(promoted.is_admin);
    let kept = db.ensure_user("alice", false).await.unwrap();
    assert!(kept.is_admin, "admin flag is never revoked implicitly");
}

// ----- sessions -----

#[tokio::test]
async fn new_session_starts_at_first_stage() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;

    let session = db.create_session(u.id).await.unwrap();
    assert!(session.session_id.starts_with(names::SESSION_ID_PREFIX));
    assert_eq!(session.status, SessionStatus::InProgress);
    assert_eq!(session.current_part, names::FIRST_STAGE);
    assert!(session.end_time.is_none());
    assert!(!session.has_preferences());

    let loaded = db.get_session(&session.session_id).await.unwrap().unwrap();
    assert_eq!(loaded.id, session.id);
}

#[tokio::test]
async fn creating_a_session_abandons_the_previous_attempt() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;

    let first = db.create_session(u.id).await.unwrap();
    let second = db.create_session(u.id).await.unwrap();

    let first = db.get_session(&first.session_id).await.unwrap().unwrap();
    assert_eq!(first.status, SessionStatus::Abandoned);

    let incomplete = db.find_incomplete_session(u.id).await.unwrap().unwrap();
    assert_eq!(incomplete.session_id, second.session_id);
}

#[tokio::test]
async fn completion_sets_end_time_and_duration() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;
    let session = db.create_session(u.id).await.unwrap();

    let completed = db.complete_session(&session).await.unwrap().unwrap();
    assert_eq!(completed.status, SessionStatus::Completed);
    let end = completed.end_time.unwrap();
    assert_eq!(
        completed.duration_ms,
        Some((end - completed.start_time).num_milliseconds())
    );

    assert!(db.complete_session(&session).await.unwrap().is_none());
    assert!(db.abandon_session(session.id).await.unwrap().is_none());
}

#[tokio::test]
async fn only_in_progress_sessions_can_be_deleted() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;

    let open = db.create_session(u.id).await.unwrap();
    db.upsert_answer(open.id, &answer("q1-1", Some("A"), None))
        .await
        .unwrap();
    assert!(db.delete_session(open.id).await.unwrap());
    assert!(db.get_session(&open.session_id).await.unwrap().is_none());

    let done = db.create_session(u.id).await.unwrap();
    db.complete_session(&done).await.unwrap();
    assert!(!db.delete_session(done.id).await.unwrap());
    assert!(db.get_session(&done.session_id).await.unwrap().is_some());
}

#[tokio::test]
async fn history_is_most_recent_first_with_answer_counts() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;
    let other = user(&db, "other").await;

    let mut created = Vec::new();
    for _ in 0..3 {
        let session = db.create_session(u.id).await.unwrap();
        created.push(session.session_id.clone());
    }
    let last = db.get_session(&created[2]).await.unwrap().unwrap();
    db.upsert_answer(last.id, &answer("q1-1", Some("A"), None))
        .await
        .unwrap();
    db.upsert_answer(last.id, &answer("q1-2", Some("B"), None))
        .await
        .unwrap();
    db.create_session(other.id).await.unwrap();

    let history = db.list_sessions(u.id, 10).await.unwrap();
    let ids: Vec<_> = history.iter().map(|s| s.session.session_id.clone()).collect();
    assert_eq!(ids, [created[2].clone(), created[1].clone(), created[0].clone()]);
    assert_eq!(history[0].answer_count, 2);
    assert_eq!(history[1].answer_count, 0);

    assert_eq!(db.list_sessions(u.id, 2).await.unwrap().len(), 2);
}

// ----- answers -----

#[tokio::test]
async fn upsert_replaces_the_previous_answer() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;
    let session = db.create_session(u.id).await.unwrap();

    db.upsert_answer(session.id, &answer("q2-9", Some("yes"), Some("香奈儿5号")))
        .await
        .unwrap()
        .unwrap();
    let second = db
        .upsert_answer(session.id, &answer("q2-9", Some("no"), None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.value.as_deref(), Some("no"));
    assert_eq!(second.text, None, "text is cleared when omitted");
    assert_eq!(second.part, names::FIRST_STAGE);

    let stored = db.get_answers(session.id, None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].value.as_deref(), Some("no"));
    assert_eq!(stored[0].text, None);
    assert_eq!(db.answers_count(session.id).await.unwrap(), 1);
}

#[tokio::test]
async fn upsert_is_refused_outside_in_progress() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;
    let session = db.create_session(u.id).await.unwrap();
    db.abandon_session(session.id).await.unwrap();

    let stored = db
        .upsert_answer(session.id, &answer("q1-1", Some("A"), None))
        .await
        .unwrap();
    assert!(stored.is_none());
    assert_eq!(db.answers_count(session.id).await.unwrap(), 0);
}

#[tokio::test]
async fn answers_come_back_in_catalog_order_and_filter_by_stage() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;
    let session = db.create_session(u.id).await.unwrap();

    let stage1 = [answer("q1-7", Some("E"), None), answer("q1-1", Some("A"), None)];
    let advanced = db
        .advance_stage(
            &session,
            StageAdvance {
                stage: 1,
                answers: &stage1,
                preferences: None,
                complete: false,
            },
        )
        .await
        .unwrap()
        .unwrap();
    db.upsert_answer(advanced.id, &answer("q2-2", Some("A"), None))
        .await
        .unwrap();

    let all = db.get_answers(session.id, None).await.unwrap();
    let ids: Vec<_> = all.iter().map(|a| a.question_id.as_str()).collect();
    assert_eq!(ids, ["q1-1", "q1-7", "q2-2"]);

    let second = db.get_answers(session.id, Some(&[2])).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].question_id, "q2-2");
    assert_eq!(second[0].part, 2);
}

// ----- stage advance -----

#[tokio::test]
async fn stage_advance_is_compare_and_set() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;
    let session = db.create_session(u.id).await.unwrap();

    let answers = [answer("q1-1", Some("A"), None)];
    let advance = || StageAdvance {
        stage: 1,
        answers: &answers,
        preferences: None,
        complete: false,
    };

    let first = db.advance_stage(&session, advance()).await.unwrap().unwrap();
    assert_eq!(first.current_part, 2);

    let replay = db.advance_stage(&session, advance()).await.unwrap();
    assert!(replay.is_none());

    let current = db.get_session(&session.session_id).await.unwrap().unwrap();
    assert_eq!(current.current_part, 2);
    assert_eq!(db.answers_count(session.id).await.unwrap(), 1);
}

#[tokio::test]
async fn rejected_stage_advance_writes_no_answers() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;
    let session = db.create_session(u.id).await.unwrap();

    let answers = [answer("q2-2", Some("A"), None)];
    let rejected = db
        .advance_stage(
            &session,
            StageAdvance {
                stage: 2,
                answers: &answers,
                preferences: None,
                complete: false,
            },
        )
        .await
        .unwrap();

    assert!(rejected.is_none());
    assert_eq!(db.answers_count(session.id).await.unwrap(), 0);
}

#[tokio::test]
async fn final_advance_records_preferences_and_completion() {
    let db = seeded_db().await;
    let u = user(&db, "u").await;
    let mut session = db.create_session(u.id).await.unwrap();

    for stage in 1..=4 {
        let preferences = (stage == 3).then_some(("木质类", "花卉类"));
        session = db
            .advance_stage(
                &session,
                StageAdvance {
                    stage,
                    answers: &[],
                    preferences,
                    complete: stage == 4,
                },
            )
            .await
            .unwrap()
            .unwrap();

        if stage == 3 {
            assert_eq!(session.main_fragrance, "木质类");
            assert_eq!(session.secondary_fragrance, "花卉类");
            assert!(session.is_in_progress());
        }
    }

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.current_part, 5);
    assert_eq!(session.main_fragrance, "木质类", "preferences survive completion");
    let end = session.end_time.unwrap();
    assert_eq!(
        session.duration_ms,
        Some((end - session.start_time).num_milliseconds())
    );
}
