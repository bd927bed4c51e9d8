//! Integration tests for the turn controller state machine.

use modelmate::{
    BoardState, EndReason, MatchEvent, MatchSession, ModelClient, ModelPlayer, MoveProvider,
    ProviderReply, ScriptedPlayer, ScriptedReply, SessionLog, SessionMode, SessionOptions, Side,
    Tally, TurnResolution,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;

fn scripted(name: &str, replies: &[&'static str]) -> Box<dyn MoveProvider> {
    Box::new(ScriptedPlayer::with_texts(
        name.to_string(),
        replies.iter().copied(),
    ))
}

fn scripted_human(name: &str, replies: &[&str]) -> Box<dyn MoveProvider> {
    Box::new(ScriptedPlayer::human(
        name.to_string(),
        replies
            .iter()
            .map(|t| ScriptedReply::Text(t.to_string()))
            .collect::<Vec<_>>(),
    ))
}

fn transports(name: &str, count: usize) -> Box<dyn MoveProvider> {
    Box::new(ScriptedPlayer::model(
        name.to_string(),
        std::iter::repeat_n(ScriptedReply::Transport, count),
    ))
}

struct Fixture {
    session: MatchSession,
    event_rx: mpsc::UnboundedReceiver<MatchEvent>,
    log_path: PathBuf,
    _dir: tempfile::TempDir,
}

fn fixture(
    white: Box<dyn MoveProvider>,
    black: Box<dyn MoveProvider>,
    mode: SessionMode,
    games: u32,
) -> Fixture {
    fixture_rosters(vec![white], vec![black], mode, games)
}

fn fixture_rosters(
    white: Vec<Box<dyn MoveProvider>>,
    black: Vec<Box<dyn MoveProvider>>,
    mode: SessionMode,
    games: u32,
) -> Fixture {
    let dir = tempfile::tempdir().expect("create temp dir");
    let log_path = dir.path().join("session.log");
    let log = SessionLog::open(&log_path).expect("open session log");
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let options = SessionOptions {
        mode,
        max_attempts: 5,
        retry_delay_ms: 0,
        move_delay_ms: 0,
        games,
    };
    let session = MatchSession::new(white, black, log, event_tx, options);
    Fixture {
        session,
        event_rx,
        log_path,
        _dir: dir,
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<MatchEvent>) -> Vec<MatchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn legal_move_in_prose_is_applied() {
    let mut fx = fixture(
        scripted("alpha", &["I'll play e2e4 to open."]),
        scripted("beta", &[]),
        SessionMode::Competitive,
        1,
    );

    let outcome = fx.session.play_turn().await.expect("turn completes");
    assert_eq!(outcome.side, Side::White);
    assert_eq!(
        outcome.resolution,
        TurnResolution::MoveApplied("e2e4".to_string())
    );
    assert_eq!(outcome.attempts, 1);
    assert_eq!(fx.session.board().side_to_move(), Side::Black);
    assert_eq!(fx.session.board().history(), ["e2e4".to_string()]);

    let events = drain(&mut fx.event_rx);
    assert!(events.iter().any(|e| matches!(
        e,
        MatchEvent::TurnCompleted { outcome, .. }
            if outcome.resolution == TurnResolution::MoveApplied("e2e4".to_string())
    )));
}

#[tokio::test]
async fn five_illegal_attempts_skip_the_turn() {
    // Black keeps proposing White's opening move, which is never Black's to
    // make after it has been played.
    let mut fx = fixture(
        scripted("alpha", &["e2e4"]),
        scripted("beta", &["e2e4", "e2e4", "e2e4", "e2e4", "e2e4"]),
        SessionMode::Competitive,
        1,
    );

    let white_turn = fx.session.play_turn().await.expect("white turn");
    assert_eq!(
        white_turn.resolution,
        TurnResolution::MoveApplied("e2e4".to_string())
    );

    let black_turn = fx.session.play_turn().await.expect("black turn");
    assert_eq!(black_turn.side, Side::Black);
    assert_eq!(black_turn.resolution, TurnResolution::Skipped);
    assert_eq!(black_turn.attempts, 5);

    // No board mutation from the failed attempts; control is back with White.
    assert_eq!(fx.session.board().history(), ["e2e4".to_string()]);
    assert_eq!(fx.session.board().side_to_move(), Side::White);
}

#[tokio::test]
async fn four_failures_then_legal_move_applies_and_resets() {
    let mut fx = fixture(
        scripted("alpha", &["e2e4", "g1f3"]),
        scripted(
            "beta",
            &["no move comes to mind", "", "e2e4", "b1c3", "e7e5", "b8c6"],
        ),
        SessionMode::Competitive,
        1,
    );

    fx.session.play_turn().await.expect("white turn");

    let black_turn = fx.session.play_turn().await.expect("black turn");
    assert_eq!(
        black_turn.resolution,
        TurnResolution::MoveApplied("e7e5".to_string())
    );
    assert_eq!(black_turn.attempts, 5);

    fx.session.play_turn().await.expect("white second turn");

    // Attempt counting starts fresh on Black's next turn.
    let black_again = fx.session.play_turn().await.expect("black second turn");
    assert_eq!(
        black_again.resolution,
        TurnResolution::MoveApplied("b8c6".to_string())
    );
    assert_eq!(black_again.attempts, 1);
}

#[tokio::test]
async fn transport_failures_consume_attempts_and_log_distinctly() {
    let mut fx = fixture(
        scripted("alpha", &["e2e4"]),
        transports("beta", 5),
        SessionMode::Competitive,
        1,
    );

    fx.session.play_turn().await.expect("white turn");
    let black_turn = fx.session.play_turn().await.expect("black turn");
    assert_eq!(black_turn.resolution, TurnResolution::Skipped);
    assert_eq!(black_turn.attempts, 5);

    let log = std::fs::read_to_string(&fx.log_path).expect("read log");
    let transport_attempts = log
        .lines()
        .filter(|l| l.contains("\"event\":\"attempt\"") && l.contains("\"outcome\":\"transport\""))
        .count();
    assert_eq!(transport_attempts, 5);
}

#[tokio::test]
async fn human_unparseable_input_ends_the_game() {
    let mut fx = fixture(
        scripted("alpha", &["e2e4"]),
        scripted_human("you", &["z9z9"]),
        SessionMode::Training,
        1,
    );

    let reason = fx.session.run_game(1).await.expect("game runs");
    assert_eq!(reason, EndReason::Resigned { loser: Side::Black });

    // A single failed attempt, no retry.
    let log = std::fs::read_to_string(&fx.log_path).expect("read log");
    let attempts = log
        .lines()
        .filter(|l| l.contains("\"event\":\"attempt\"") && l.contains("\"actor\":\"you\""))
        .count();
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn human_illegal_move_ends_the_game() {
    let mut fx = fixture(
        scripted("alpha", &["e2e4"]),
        scripted_human("you", &["e2e4"]),
        SessionMode::Training,
        1,
    );

    let reason = fx.session.run_game(1).await.expect("game runs");
    assert_eq!(reason, EndReason::Resigned { loser: Side::Black });
    // Training games never touch the competitive tally.
    assert_eq!(fx.session.tally(), &Tally::default());
}

#[tokio::test]
async fn both_sides_stalling_aborts_the_game() {
    let mut fx = fixture(
        scripted("alpha", &["pass", "pass", "pass", "pass", "pass"]),
        scripted("beta", &["pass", "pass", "pass", "pass", "pass"]),
        SessionMode::Competitive,
        1,
    );

    let reason = fx.session.run_game(1).await.expect("game runs");
    assert_eq!(reason, EndReason::Aborted);
    assert!(fx.session.board().history().is_empty());
    assert_eq!(fx.session.tally().draws, 1);
}

#[tokio::test]
async fn skip_with_stalled_side_in_check_aborts() {
    // White walks a knight to f6 with check while Black never answers;
    // the final skip would hand White a capturable king, so the game ends.
    let mut fx = fixture(
        scripted("alpha", &["b1c3", "c3d5", "d5f6"]),
        scripted(
            "beta",
            &[
                "x", "x", "x", "x", "x", "x", "x", "x", "x", "x", "x", "x", "x", "x", "x",
            ],
        ),
        SessionMode::Competitive,
        1,
    );

    let reason = fx.session.run_game(1).await.expect("game runs");
    assert_eq!(reason, EndReason::Aborted);
    assert_eq!(fx.session.board().history().len(), 3);
}

#[tokio::test]
async fn checkmate_ends_the_game_and_scores_the_tally() {
    let mut fx = fixture(
        scripted("alpha", &["f2f3", "g2g4"]),
        scripted("beta", &["e7e5", "d8h4"]),
        SessionMode::Competitive,
        1,
    );

    let reason = fx.session.run_game(1).await.expect("game runs");
    assert_eq!(reason, EndReason::Checkmate { winner: Side::Black });
    assert_eq!(fx.session.tally().black_wins, 1);

    let events = drain(&mut fx.event_rx);
    assert!(events.iter().any(|e| matches!(
        e,
        MatchEvent::GameOver { reason: EndReason::Checkmate { winner: Side::Black }, .. }
    )));
}

#[tokio::test]
async fn abort_flag_ends_the_game_between_turns() {
    let mut fx = fixture(
        scripted("alpha", &[]),
        scripted("beta", &[]),
        SessionMode::Competitive,
        1,
    );

    fx.session
        .abort_handle()
        .store(true, std::sync::atomic::Ordering::Relaxed);
    let reason = fx.session.run_game(1).await.expect("game runs");
    // No provider is ever consulted; the side to move forfeits.
    assert_eq!(reason, EndReason::Resigned { loser: Side::White });
}

/// Scripted side that raises the abort flag while delivering its last move,
/// like a user quitting the moment the final move lands.
struct QuittingPlayer {
    name: String,
    replies: VecDeque<String>,
    abort: Arc<OnceLock<Arc<AtomicBool>>>,
}

#[async_trait::async_trait]
impl MoveProvider for QuittingPlayer {
    async fn provide(&mut self, _board: &BoardState) -> ProviderReply {
        let raw = self.replies.pop_front().unwrap_or_default();
        if self.replies.is_empty() {
            if let Some(flag) = self.abort.get() {
                flag.store(true, Ordering::Relaxed);
            }
        }
        ProviderReply::Text {
            prompt: None,
            raw,
            stderr: None,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[tokio::test]
async fn quit_during_the_mating_move_reports_checkmate() {
    let abort_slot = Arc::new(OnceLock::new());
    let black = Box::new(QuittingPlayer {
        name: "beta".to_string(),
        replies: ["e7e5", "d8h4"].into_iter().map(String::from).collect(),
        abort: Arc::clone(&abort_slot),
    });
    let mut fx = fixture(
        scripted("alpha", &["f2f3", "g2g4"]),
        black,
        SessionMode::Competitive,
        1,
    );
    abort_slot
        .set(fx.session.abort_handle())
        .expect("slot is empty");

    // The abort lands in the same turn as the mate; the finished game
    // still reports its true reason, not a resignation.
    let reason = fx.session.run_game(1).await.expect("game runs");
    assert_eq!(reason, EndReason::Checkmate { winner: Side::Black });
    assert_eq!(fx.session.tally().black_wins, 1);
}

#[tokio::test]
async fn series_plays_all_games_and_accumulates_the_tally() {
    let mut fx = fixture(
        scripted("alpha", &["f2f3", "g2g4", "f2f3", "g2g4"]),
        scripted("beta", &["e7e5", "d8h4", "e7e5", "d8h4"]),
        SessionMode::Competitive,
        2,
    );

    let tally = fx.session.run().await.expect("series runs");
    assert_eq!(tally.black_wins, 2);
    assert_eq!(tally.white_wins, 0);

    let log = std::fs::read_to_string(&fx.log_path).expect("read log");
    let starts = log
        .lines()
        .filter(|l| l.contains("\"event\":\"start\""))
        .count();
    let ends = log
        .lines()
        .filter(|l| l.contains("\"event\":\"end\""))
        .count();
    assert_eq!(starts, 1);
    assert_eq!(ends, 2);
    // Every line is a self-contained JSON object with a timestamp.
    for line in log.lines() {
        let value: serde_json::Value = serde_json::from_str(line).expect("valid JSON line");
        assert!(value.get("ts").is_some());
        assert!(value.get("event").is_some());
    }
}

#[tokio::test]
async fn training_roster_rotates_to_the_second_model() {
    // The first model burns its five attempts; the tandem partner answers.
    let models: Vec<Box<dyn MoveProvider>> = vec![
        scripted("alpha", &["x", "x", "x", "x", "x"]),
        scripted("gamma", &["e2e4"]),
    ];
    let mut fx = fixture_rosters(
        models,
        vec![scripted_human("you", &[])],
        SessionMode::Training,
        1,
    );

    let outcome = fx.session.play_turn().await.expect("model turn");
    assert_eq!(
        outcome.resolution,
        TurnResolution::MoveApplied("e2e4".to_string())
    );
    assert_eq!(outcome.attempts, 6);
}

#[tokio::test]
async fn model_exchange_is_logged_with_prompt_and_output() {
    // A real subprocess stands in for the model runtime.
    let client = ModelClient::new(
        vec![
            "sh".to_string(),
            "-c".to_string(),
            "cat >/dev/null; echo \"I'll play e2e4 to open.\"".to_string(),
        ],
        "stub-model",
        Duration::from_secs(10),
    );
    let mut fx = fixture(
        Box::new(ModelPlayer::new(client)),
        scripted("beta", &[]),
        SessionMode::Competitive,
        1,
    );

    let outcome = fx.session.play_turn().await.expect("white turn");
    assert_eq!(
        outcome.resolution,
        TurnResolution::MoveApplied("e2e4".to_string())
    );

    let log = std::fs::read_to_string(&fx.log_path).expect("read log");
    let exchange = log
        .lines()
        .find(|l| l.contains("\"event\":\"exchange\""))
        .expect("exchange entry present");
    let value: serde_json::Value = serde_json::from_str(exchange).expect("valid JSON");
    assert_eq!(value["model"], "stub-model");
    assert!(value["prompt"].as_str().unwrap().starts_with("Chess state:"));
    assert!(value["stdout"].as_str().unwrap().contains("e2e4"));
    assert_eq!(value["outcome"], "legal");
}
