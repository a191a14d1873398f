use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

mod common;

// Correct option per question of the bundled quiz.
const CORRECT: [usize; 5] = [1, 2, 3, 0, 1];

fn wrong(question: usize) -> usize {
    (CORRECT[question] + 1) % 4
}

#[tokio::test]
async fn test_new_session_starts_on_start_screen() {
    let app = common::create_test_app().await;

    let (status, session) = common::send(&app, "POST", "/api/sessions", None).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["phase"], "start");
    assert_eq!(session["quiz"]["title"], "Molecular Basis of Inheritance");
    assert_eq!(session["quiz"]["max_mistakes"], 3);
    assert_eq!(session["quiz"]["points_per_correct"], 4.0);
    assert_eq!(session["quiz"]["starting_powerups"], json!({
        "extra_time": 2,
        "fifty_fifty": 1,
        "extra_life": 1
    }));
    assert!(session["question"].is_null());
    assert_eq!(session["lives"], 3);
    assert_eq!(session["level"], 1);
}

#[tokio::test]
async fn test_begin_shows_first_question_without_answers_revealed() {
    let app = common::create_test_app().await;
    let id = common::start_session(&app).await;

    let (status, session) = common::send(&app, "GET", &format!("/api/sessions/{}", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["timer_seconds"], 30);
    assert_eq!(session["question"]["number"], 1);
    assert_eq!(session["question"]["total"], 5);
    assert_eq!(session["question"]["remaining"], 5);

    let options = session["question"]["options"].as_array().unwrap();
    assert_eq!(options.len(), 4);
    assert!(options.iter().all(|o| o.get("is_correct").is_none()));
}

#[tokio::test]
async fn test_correct_then_wrong_answer_scores() {
    let app = common::create_test_app().await;
    let id = common::start_session(&app).await;

    let first = common::answer(&app, &id, Some(CORRECT[0])).await;
    assert_eq!(first["outcome"]["correct"], true);
    // base 4 + time bonus floor(30/10)
    assert_eq!(first["outcome"]["points"], 7.0);
    assert_eq!(first["session"]["score"], 7.0);
    assert_eq!(first["session"]["streak"], 1);
    assert_eq!(first["session"]["question"]["number"], 2);

    let second = common::answer(&app, &id, Some(wrong(1))).await;
    assert_eq!(second["outcome"]["correct"], false);
    assert_eq!(second["outcome"]["points"], -1.0);
    assert!(second["outcome"]["correct_answer"].is_string());
    assert_eq!(second["session"]["score"], 6.0);
    assert_eq!(second["session"]["lives"], 2);
    assert_eq!(second["session"]["streak"], 0);
}

#[tokio::test]
async fn test_three_mistakes_end_the_quiz_and_store_results() {
    let app = common::create_test_app().await;
    let id = common::start_session(&app).await;

    common::answer(&app, &id, Some(CORRECT[0])).await;
    common::answer(&app, &id, Some(wrong(1))).await;
    common::answer(&app, &id, Some(wrong(2))).await;
    let last = common::answer(&app, &id, Some(wrong(3))).await;

    assert_eq!(last["outcome"]["finished"], true);
    assert_eq!(last["session"]["phase"], "summary");
    assert_eq!(last["session"]["lives"], 0);
    assert_eq!(last["session"]["summary"]["answered"], 4);
    assert_eq!(last["session"]["summary"]["total_questions"], 5);

    let (status, results) = common::send(&app, "GET", "/api/results", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["score"], 4.0);
    assert_eq!(results["totalQuestions"], 5);
    assert_eq!(results["answeredQuestions"].as_array().unwrap().len(), 4);
    assert_eq!(results["answeredQuestions"][0]["correct"], true);
    assert_eq!(results["summary"]["correct_answers"], 1);
    assert_eq!(results["summary"]["accuracy_percent"], 20);
    assert_eq!(results["summary"]["completion_percent"], 80);
}

#[tokio::test]
async fn test_perfect_run_finishes_after_last_question() {
    let app = common::create_test_app().await;
    let id = common::start_session(&app).await;

    let mut last = serde_json::Value::Null;
    for correct in CORRECT {
        last = common::answer(&app, &id, Some(correct)).await;
    }

    assert_eq!(last["outcome"]["finished"], true);
    assert_eq!(last["session"]["phase"], "summary");
    assert_eq!(last["session"]["summary"]["accuracy_percent"], 100);
    assert_eq!(last["session"]["combo_multiplier"], 2.0);

    // Answers after the end are ignored
    let ignored = common::answer(&app, &id, Some(0)).await;
    assert!(ignored["outcome"].is_null());
    assert_eq!(ignored["session"]["score"], last["session"]["score"]);
}

#[tokio::test]
async fn test_try_again_resets_score_but_keeps_xp() {
    let app = common::create_test_app().await;
    let id = common::start_session(&app).await;

    common::answer(&app, &id, Some(CORRECT[0])).await;
    common::answer(&app, &id, Some(wrong(1))).await;
    common::answer(&app, &id, Some(wrong(2))).await;
    let finished = common::answer(&app, &id, Some(wrong(3))).await;
    let xp = finished["session"]["xp"].as_u64().unwrap();
    assert!(xp > 0);

    let (status, again) =
        common::send(&app, "POST", &format!("/api/sessions/{}/begin", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["phase"], "playing");
    assert_eq!(again["score"], 0.0);
    assert_eq!(again["lives"], 3);
    assert_eq!(again["answered_count"], 0);
    assert_eq!(again["question"]["number"], 1);
    assert_eq!(again["xp"], xp);
}

#[tokio::test]
async fn test_out_of_range_answer_is_ignored() {
    let app = common::create_test_app().await;
    let id = common::start_session(&app).await;

    let response = common::answer(&app, &id, Some(9)).await;

    assert!(response["outcome"].is_null());
    assert_eq!(response["session"]["question"]["number"], 1);
    assert_eq!(response["session"]["lives"], 3);
}

#[tokio::test]
async fn test_answer_for_another_question_is_ignored() {
    let app = common::create_test_app().await;
    let id = common::start_session(&app).await;
    common::answer(&app, &id, Some(CORRECT[0])).await;

    let (status, stale) = common::send(
        &app,
        "POST",
        &format!("/api/sessions/{}/answers", id),
        Some(json!({ "question_index": 0, "option_index": CORRECT[0] })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(stale["outcome"].is_null());
    assert_eq!(stale["session"]["question"]["number"], 2);
    assert_eq!(stale["session"]["answered_count"], 1);

    let (_, current) = common::send(
        &app,
        "POST",
        &format!("/api/sessions/{}/answers", id),
        Some(json!({ "question_index": 1, "option_index": CORRECT[1] })),
    )
    .await;
    assert_eq!(current["outcome"]["correct"], true);
}

#[tokio::test]
async fn test_null_answer_counts_as_timeout() {
    let app = common::create_test_app().await;
    let id = common::start_session(&app).await;

    let response = common::answer(&app, &id, None).await;

    assert_eq!(response["outcome"]["timed_out"], true);
    assert_eq!(response["outcome"]["correct"], false);
    assert_eq!(response["session"]["score"], -1.0);
}

#[tokio::test]
async fn test_answer_before_begin_is_ignored() {
    let app = common::create_test_app().await;
    let (_, created) = common::send(&app, "POST", "/api/sessions", None).await;
    let id = created["id"].as_str().unwrap();

    let response = common::answer(&app, id, Some(1)).await;

    assert!(response["outcome"].is_null());
    assert_eq!(response["session"]["phase"], "start");
}

#[tokio::test]
async fn test_malformed_answer_body_returns_400() {
    let app = common::create_test_app().await;
    let id = common::start_session(&app).await;

    let (status, body) = common::send(
        &app,
        "POST",
        &format!("/api/sessions/{}/answers", id),
        Some(json!({ "option_index": "first" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse JSON request body"));
}

#[tokio::test]
async fn test_unknown_session_returns_404() {
    let app = common::create_test_app().await;
    let missing = Uuid::new_v4();

    for (method, uri) in [
        ("GET", format!("/api/sessions/{}", missing)),
        ("POST", format!("/api/sessions/{}/begin", missing)),
        ("GET", format!("/api/sessions/{}/stream", missing)),
    ] {
        let (status, body) = common::send(&app, method, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(body["error"], "Session not found");
    }
}

#[tokio::test]
async fn test_results_missing_before_any_quiz_finishes() {
    let app = common::create_test_app().await;

    let (status, body) = common::send(&app, "GET", "/api/results", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"],
        "No quiz results found. Please complete a quiz first."
    );
    assert_eq!(body["back_to_quiz"], "/api/sessions");
}
