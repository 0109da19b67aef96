use std::sync::Arc;
use std::time::Duration;

use scorecard::catalog::{CourseCatalog, StaticCatalog};
use scorecard::db;
use scorecard::error::{PersistenceError, TrackerError};
use scorecard::models::{Course, FairwayResult, Hazard, Hole};
use scorecard::persistence::{MemoryGateway, PersistenceGateway, SqliteGateway};
use scorecard::services::{MAX_STROKES_PER_HOLE, RoundTracker, ScoreEntry, TrackerState};

const PARS_18: [i32; 18] = [4, 5, 4, 3, 4, 3, 4, 5, 4, 4, 4, 3, 4, 4, 5, 3, 4, 5];

fn course_18() -> Course {
    Course {
        id: "oakmont".to_string(),
        name: "Oakmont".to_string(),
        location: "Oakmont, PA".to_string(),
        par: 72,
        total_yardage: Some(7255),
        holes: PARS_18
            .iter()
            .enumerate()
            .map(|(i, par)| Hole {
                number: i as u32 + 1,
                par: *par,
                yardage: 400,
                handicap: i as u32 + 1,
            })
            .collect(),
        tees: Vec::new(),
    }
}

fn course_9() -> Course {
    let mut course = course_18();
    course.id = "oakmont-front".to_string();
    course.holes.truncate(9);
    course.par = course.holes.iter().map(|h| h.par).sum();
    course
}

fn tracker_with(gateway: Arc<MemoryGateway>) -> RoundTracker {
    RoundTracker::new(gateway, Duration::from_secs(5))
}

#[tokio::test]
async fn test_start_round_initializes_every_hole() {
    for course in [course_9(), course_18()] {
        let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
        let count = course.hole_count();
        tracker
            .start_round(Arc::new(course))
            .await
            .expect("Failed to start round");

        assert_eq!(tracker.state(), TrackerState::InProgress);
        assert_eq!(tracker.current_hole(), Some(1));
        for n in 1..=count {
            let score = tracker.hole_score(n).expect("hole initialized");
            assert_eq!(score.strokes, 0);
            assert_eq!(score.putts, 0);
            assert!(!score.green_in_regulation);
        }
        assert!(tracker.hole_score(count + 1).is_none());
    }
}

#[tokio::test]
async fn test_start_round_persists_placeholders() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut tracker = tracker_with(gateway.clone());
    let round_id = tracker
        .start_round(Arc::new(course_18()))
        .await
        .expect("Failed to start round")
        .id
        .clone();

    let stored = gateway
        .load_round(&round_id)
        .await
        .expect("load")
        .expect("round persisted");
    assert_eq!(stored.hole_scores.len(), 18);
    assert_eq!(stored.starting_hole, 1);
    assert_eq!(stored.total_holes, 18);
    assert!(!stored.is_complete);
}

#[tokio::test]
async fn test_record_before_start_fails() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    let result = tracker.record_hole_score(ScoreEntry::new(4, 2, true)).await;

    assert!(matches!(result, Err(TrackerError::NoActiveRound)));
    assert_eq!(tracker.state(), TrackerState::Idle);
    assert_eq!(tracker.total_strokes(), 0);
    assert_eq!(tracker.total_putts(), 0);
    assert_eq!(tracker.greens_in_regulation(), 0);
    assert_eq!(tracker.average_putts_per_hole(), 0.0);
    assert_eq!(tracker.greens_in_regulation_percentage(), 0.0);
    assert!(matches!(
        tracker.navigate_to_hole(1),
        Err(TrackerError::NoActiveRound)
    ));
}

#[tokio::test]
async fn test_record_advances_without_completing() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    tracker.start_round(Arc::new(course_18())).await.expect("start");

    for k in 1..18 {
        assert_eq!(tracker.current_hole(), Some(k));
        let state = tracker
            .record_hole_score(ScoreEntry::new(4, 2, false))
            .await
            .expect("record");
        assert_eq!(state, TrackerState::InProgress);
        assert_eq!(tracker.current_hole(), Some(k + 1));
        assert!(!tracker.round().expect("round").is_complete);
    }
}

#[tokio::test]
async fn test_final_hole_completes_round() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut tracker = tracker_with(gateway.clone());
    tracker.start_round(Arc::new(course_9())).await.expect("start");

    for _ in 0..9 {
        tracker
            .record_hole_score(ScoreEntry::new(5, 2, false))
            .await
            .expect("record");
    }

    assert_eq!(tracker.state(), TrackerState::Complete);
    assert_eq!(tracker.current_hole(), Some(9));

    let round = tracker.round().expect("round").clone();
    assert!(round.is_complete);
    assert_eq!(round.totals.total_strokes, 45);
    assert!(round.completed_at.is_some());

    let stored = gateway
        .load_round(&round.id)
        .await
        .expect("load")
        .expect("stored");
    assert!(stored.is_complete);
    assert_eq!(stored.totals, round.totals);

    let again = tracker.record_hole_score(ScoreEntry::new(3, 1, true)).await;
    assert!(matches!(again, Err(TrackerError::RoundComplete)));
    assert_eq!(tracker.total_strokes(), 45);
}

#[tokio::test]
async fn test_navigate_bounds_and_idempotence() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    tracker.start_round(Arc::new(course_18())).await.expect("start");
    tracker
        .record_hole_score(ScoreEntry::new(3, 1, true))
        .await
        .expect("record");

    let before = tracker.stats();
    tracker.navigate_to_hole(2).expect("navigate to current");
    assert_eq!(tracker.stats(), before);
    assert_eq!(tracker.current_hole(), Some(2));

    assert!(matches!(
        tracker.navigate_to_hole(0),
        Err(TrackerError::InvalidHoleNumber(0))
    ));
    assert!(matches!(
        tracker.navigate_to_hole(19),
        Err(TrackerError::InvalidHoleNumber(19))
    ));
    assert_eq!(tracker.current_hole(), Some(2));

    tracker.navigate_to_hole(18).expect("navigate to last");
    assert_eq!(tracker.current_hole(), Some(18));
    assert_eq!(tracker.stats(), before);
}

#[tokio::test]
async fn test_rerecording_hole_last_write_wins() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    tracker.start_round(Arc::new(course_18())).await.expect("start");

    tracker
        .record_hole_score(ScoreEntry::new(6, 3, false))
        .await
        .expect("first");
    tracker.navigate_to_hole(1).expect("back to 1");
    tracker
        .record_hole_score(ScoreEntry::new(4, 2, true))
        .await
        .expect("second");

    assert_eq!(tracker.current_hole(), Some(2));
    assert_eq!(tracker.hole_score(1).map(|s| s.strokes), Some(4));
    assert_eq!(tracker.total_strokes(), 4);
    assert_eq!(tracker.total_putts(), 2);
    assert_eq!(tracker.greens_in_regulation(), 1);
}

#[tokio::test]
async fn test_aggregates_match_recorded_scores() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    tracker.start_round(Arc::new(course_18())).await.expect("start");

    let entries = [(5, 2, false), (4, 1, true), (7, 3, false), (3, 2, true)];
    for (strokes, putts, gir) in entries {
        tracker
            .record_hole_score(ScoreEntry::new(strokes, putts, gir))
            .await
            .expect("record");

        let round = tracker.round().expect("round");
        let strokes: u32 = round.hole_scores.iter().map(|s| s.strokes).sum();
        let putts: u32 = round.hole_scores.iter().map(|s| s.putts).sum();
        let greens = round
            .hole_scores
            .iter()
            .filter(|s| s.green_in_regulation)
            .count() as u32;
        assert_eq!(tracker.total_strokes(), strokes);
        assert_eq!(tracker.total_putts(), putts);
        assert_eq!(tracker.greens_in_regulation(), greens);
    }
}

#[tokio::test]
async fn test_even_par_round_scenario() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    tracker.start_round(Arc::new(course_18())).await.expect("start");

    for strokes in PARS_18 {
        tracker
            .record_hole_score(ScoreEntry::new(strokes as u32, 2, true))
            .await
            .expect("record");
    }

    assert_eq!(tracker.total_strokes(), 72);
    assert_eq!(tracker.total_par(), 72);
    assert_eq!(tracker.total_score(), 0);
    assert_eq!(tracker.score_display(), "E");
    assert!((tracker.average_putts_per_hole() - 2.0).abs() < f64::EPSILON);
    assert!((tracker.greens_in_regulation_percentage() - 100.0).abs() < f64::EPSILON);
    assert_eq!(tracker.state(), TrackerState::Complete);
}

#[tokio::test]
async fn test_relative_to_par() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    tracker.start_round(Arc::new(course_18())).await.expect("start");
    assert_eq!(tracker.hole_score_relative_to_par(1), None);
    assert_eq!(tracker.hole_score(2).map(|s| s.strokes), Some(0));
    assert_eq!(tracker.hole_score_relative_to_par(2), None);

    tracker
        .record_hole_score(ScoreEntry::new(3, 1, true))
        .await
        .expect("record");

    assert_eq!(tracker.hole_score_relative_to_par(1), Some(-1));
    assert_eq!(tracker.hole_score_relative_to_par(2), None);
    assert_eq!(tracker.hole_score_relative_to_par(40), None);
}

#[tokio::test]
async fn test_partial_round_gir_percentage() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    tracker.start_round(Arc::new(course_18())).await.expect("start");

    for i in 0..9 {
        tracker
            .record_hole_score(ScoreEntry::new(4, 2, i < 6))
            .await
            .expect("record");
    }

    assert!((tracker.greens_in_regulation_percentage() - 66.67).abs() < 0.01);
    assert_eq!(tracker.current_hole(), Some(10));
    assert_eq!(tracker.score_display(), "-36");

    let summary = tracker.summary().expect("summary");
    assert_eq!(summary.score_through_played, "E");
    assert_eq!(summary.holes.len(), 18);
}

#[tokio::test]
async fn test_invalid_scores_rejected() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    tracker.start_round(Arc::new(course_9())).await.expect("start");

    assert!(matches!(
        tracker.record_hole_score(ScoreEntry::new(0, 0, false)).await,
        Err(TrackerError::InvalidScore { .. })
    ));
    assert!(matches!(
        tracker.record_hole_score(ScoreEntry::new(3, 4, false)).await,
        Err(TrackerError::InvalidScore { strokes: 3, putts: 4 })
    ));
    assert_eq!(tracker.current_hole(), Some(1));
}

#[tokio::test]
async fn test_stroke_count_is_capped() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    tracker.start_round(Arc::new(course_9())).await.expect("start");

    assert!(matches!(
        tracker.record_hole_score(ScoreEntry::new(u32::MAX, 0, false)).await,
        Err(TrackerError::InvalidScore { .. })
    ));
    assert!(matches!(
        tracker
            .record_hole_score(ScoreEntry::new(MAX_STROKES_PER_HOLE + 1, 2, false))
            .await,
        Err(TrackerError::InvalidScore { .. })
    ));
    assert_eq!(tracker.current_hole(), Some(1));
    assert_eq!(tracker.total_strokes(), 0);

    tracker
        .record_hole_score(ScoreEntry::new(MAX_STROKES_PER_HOLE, 2, false))
        .await
        .expect("record the maximum");
    tracker
        .record_hole_score(ScoreEntry::new(1, 0, false))
        .await
        .expect("record after the maximum");

    assert_eq!(tracker.total_strokes(), MAX_STROKES_PER_HOLE + 1);
    assert_eq!(tracker.hole_score_relative_to_par(1), Some(26));
    assert_eq!(tracker.total_score(), 31 - 36);
    assert_eq!(tracker.score_display(), "-5");
}

#[tokio::test]
async fn test_entry_details_are_kept() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    tracker.start_round(Arc::new(course_9())).await.expect("start");

    let mut entry = ScoreEntry::new(6, 2, false);
    entry.fairway = Some(FairwayResult::Right);
    entry.hazards.insert(Hazard::Water);
    entry.hazards.insert(Hazard::Penalty);
    tracker.record_hole_score(entry).await.expect("record");

    let score = tracker.hole_score(1).expect("score");
    assert_eq!(score.fairway, Some(FairwayResult::Right));
    assert!(score.hazards.contains(&Hazard::Water));
    assert!(score.hazards.contains(&Hazard::Penalty));
}

#[tokio::test]
async fn test_failed_save_leaves_state_intact() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut tracker = tracker_with(gateway.clone());
    let round_id = tracker
        .start_round(Arc::new(course_18()))
        .await
        .expect("start")
        .id
        .clone();

    gateway.set_fail_saves(true);
    let result = tracker.record_hole_score(ScoreEntry::new(4, 2, true)).await;
    assert!(matches!(
        result,
        Err(TrackerError::PersistenceFailed(PersistenceError::Unavailable(_)))
    ));
    assert_eq!(tracker.current_hole(), Some(1));
    assert_eq!(tracker.total_strokes(), 0);
    assert_eq!(tracker.hole_score(1).map(|s| s.strokes), Some(0));

    gateway.set_fail_saves(false);
    tracker
        .record_hole_score(ScoreEntry::new(4, 2, true))
        .await
        .expect("retry succeeds");
    assert_eq!(tracker.current_hole(), Some(2));
    assert_eq!(tracker.total_strokes(), 4);

    let stored = gateway
        .load_round(&round_id)
        .await
        .expect("load")
        .expect("stored");
    assert_eq!(stored.hole_score(1).map(|s| s.strokes), Some(4));
}

#[tokio::test]
async fn test_failed_start_keeps_previous_round() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut tracker = tracker_with(gateway.clone());
    tracker.start_round(Arc::new(course_9())).await.expect("start");
    tracker
        .record_hole_score(ScoreEntry::new(4, 2, true))
        .await
        .expect("record");

    gateway.set_fail_saves(true);
    let result = tracker.start_round(Arc::new(course_18())).await;
    assert!(matches!(result, Err(TrackerError::PersistenceFailed(_))));
    assert_eq!(tracker.course().map(|c| c.id.as_str()), Some("oakmont-front"));
    assert_eq!(tracker.current_hole(), Some(2));
    assert_eq!(gateway.list_rounds().await.expect("list").len(), 1);
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut tracker = RoundTracker::new(gateway.clone(), Duration::from_millis(50));
    tracker.start_round(Arc::new(course_9())).await.expect("start");

    gateway.set_save_delay(Some(Duration::from_millis(500))).await;
    let result = tracker.record_hole_score(ScoreEntry::new(4, 2, true)).await;
    assert!(matches!(
        result,
        Err(TrackerError::PersistenceFailed(PersistenceError::Timeout(_)))
    ));
    assert_eq!(tracker.current_hole(), Some(1));
    assert_eq!(tracker.total_strokes(), 0);

    gateway.set_save_delay(None).await;
    tracker
        .record_hole_score(ScoreEntry::new(4, 2, true))
        .await
        .expect("record after store recovers");
    assert_eq!(tracker.current_hole(), Some(2));
}

#[tokio::test]
async fn test_start_round_errors() {
    let mut tracker = tracker_with(Arc::new(MemoryGateway::new()));
    let catalog = StaticCatalog::with_courses(vec![course_18()]).expect("catalog");

    let missing = tracker.start_round_for(&catalog, "pebble").await;
    assert!(matches!(missing, Err(TrackerError::CourseNotFound(id)) if id == "pebble"));

    let mut empty = course_9();
    empty.holes.clear();
    let result = tracker.start_round(Arc::new(empty)).await;
    assert!(matches!(result, Err(TrackerError::EmptyCourse(_))));
    assert_eq!(tracker.state(), TrackerState::Idle);

    tracker
        .start_round_for(&catalog, "oakmont")
        .await
        .expect("start from catalog");
    assert_eq!(tracker.total_par(), 72);
}

#[tokio::test]
async fn test_start_round_rejects_gapped_hole_numbers() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut tracker = tracker_with(gateway.clone());

    let mut gapped = course_9();
    gapped.holes[2].number = 10;
    let result = tracker.start_round(Arc::new(gapped)).await;

    assert!(matches!(result, Err(TrackerError::InvalidCourse(_))));
    assert_eq!(tracker.state(), TrackerState::Idle);
    assert!(gateway.list_rounds().await.expect("list").is_empty());

    let mut short = course_9();
    short.holes.truncate(3);
    let result = tracker.start_round(Arc::new(short)).await;
    assert!(matches!(result, Err(TrackerError::InvalidCourse(_))));
}

#[tokio::test]
async fn test_trackers_with_own_gateways_share_a_pool() {
    let pool = db::connect_memory().await.expect("Failed to create test db");
    let course = Arc::new(course_9());
    let mut first = RoundTracker::new(
        Arc::new(SqliteGateway::new(pool.clone())),
        Duration::from_secs(5),
    );
    let mut second = RoundTracker::new(
        Arc::new(SqliteGateway::new(pool.clone())),
        Duration::from_secs(5),
    );

    let first_id = first.start_round(course.clone()).await.expect("first").id.clone();
    let second_id = second.start_round(course).await.expect("second").id.clone();
    for strokes in [4, 5] {
        first
            .record_hole_score(ScoreEntry::new(strokes, 2, false))
            .await
            .expect("first record");
        second
            .record_hole_score(ScoreEntry::new(strokes + 1, 2, false))
            .await
            .expect("second record");
    }

    let reader = SqliteGateway::new(pool);
    let stored_first = reader
        .load_round(&first_id)
        .await
        .expect("load")
        .expect("first round saved");
    let stored_second = reader
        .load_round(&second_id)
        .await
        .expect("load")
        .expect("second round saved");
    assert_eq!(stored_first.hole_score(2).map(|s| s.strokes), Some(5));
    assert_eq!(stored_second.hole_score(2).map(|s| s.strokes), Some(6));
}

#[tokio::test]
async fn test_course_shared_between_trackers() {
    let course = Arc::new(course_18());
    let mut first = tracker_with(Arc::new(MemoryGateway::new()));
    let mut second = tracker_with(Arc::new(MemoryGateway::new()));

    first.start_round(course.clone()).await.expect("first");
    second.start_round(course.clone()).await.expect("second");
    first
        .record_hole_score(ScoreEntry::new(5, 2, false))
        .await
        .expect("record");

    assert_eq!(first.total_strokes(), 5);
    assert_eq!(second.total_strokes(), 0);
    assert_ne!(
        first.round().map(|r| r.id.clone()),
        second.round().map(|r| r.id.clone())
    );
}

#[tokio::test]
async fn test_resume_after_restart() {
    let path = std::env::temp_dir().join(format!("scorecard-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());
    let catalog = StaticCatalog::with_courses(vec![course_18()]).expect("catalog");

    let round_id = {
        let pool = db::connect(&url).await.expect("Failed to open db");
        let gateway = Arc::new(SqliteGateway::new(pool.clone()));
        let mut tracker = RoundTracker::new(gateway, Duration::from_secs(5));
        let round_id = tracker
            .start_round_for(&catalog, "oakmont")
            .await
            .expect("start")
            .id
            .clone();
        for strokes in [4, 6, 3] {
            tracker
                .record_hole_score(ScoreEntry::new(strokes, 2, strokes == 3))
                .await
                .expect("record");
        }
        pool.close().await;
        round_id
    };

    let pool = db::connect(&url).await.expect("Failed to reopen db");
    let gateway = Arc::new(SqliteGateway::new(pool.clone()));
    let mut tracker = RoundTracker::new(gateway.clone(), Duration::from_secs(5));

    let state = tracker.resume(&catalog, &round_id).await.expect("resume");
    assert_eq!(state, TrackerState::InProgress);
    assert_eq!(tracker.current_hole(), Some(4));
    assert_eq!(tracker.total_strokes(), 13);
    assert_eq!(tracker.greens_in_regulation(), 1);
    assert_eq!(tracker.hole_score_relative_to_par(2), Some(1));

    let missing = tracker.resume(&catalog, "no-such-round").await;
    assert!(matches!(missing, Err(TrackerError::RoundNotFound(_))));
    assert_eq!(tracker.current_hole(), Some(4));

    let history = gateway.list_rounds().await.expect("list");
    assert_eq!(history.len(), 1);
    assert!(catalog.get_course("oakmont").await.is_ok());

    pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}
