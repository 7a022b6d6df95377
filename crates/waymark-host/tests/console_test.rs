//! Integration tests for the console host.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use waymark_core::gateway::ProgressGateway;
use waymark_core::progress::Namespace;
use waymark_host::console::Console;
use waymark_progress_store::MemoryGateway;
use waymark_scenes::application::catalog::{CatalogFormat, parse_catalog};
use waymark_test_support::FixedClock;

const CATALOG: &str = r#"{"scenes":[
  {"id":"home-intro","priority":72,
   "triggers":[{"type":"enter-screen","screen":"home"}],
   "steps":[
     {"type":"say","speaker":"guide","text":"intro.welcome"},
     {"type":"triggerReward","kind":"pack","payload":{"tier":"starter"}},
     {"type":"setFlag","flag":"intro_done","value":true},
     {"type":"end"}]},
  {"id":"shop-tip","priority":10,
   "triggers":[{"type":"enter-screen","screen":"shop"}],
   "steps":[
     {"type":"wait","ms":400},
     {"type":"say","text":"shop.tip"}]},
  {"id":"arena-rounds","priority":5,
   "triggers":[{"type":"enter-screen","screen":"arena"}],
   "steps":[
     {"type":"label","name":"top"},
     {"type":"wait","ms":1000},
     {"type":"say","text":"arena.round"},
     {"type":"goto","label":"top"}]}
]}"#;

fn console(gateway: Arc<MemoryGateway>) -> Console {
    let report = parse_catalog(CATALOG, CatalogFormat::Json).unwrap();
    let mut console = Console::new(gateway, Arc::new(FixedClock::default()));
    console.register_scenes(report.scenes);
    console
}

async fn run_lines(console: Console, input: &str) -> Vec<Value> {
    let mut output = Vec::new();
    console
        .run(BufReader::new(input.as_bytes()), &mut output)
        .await
        .unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn of_kind<'a>(lines: &'a [Value], kind: &str) -> Vec<&'a Value> {
    lines.iter().filter(|line| line["kind"] == kind).collect()
}

#[tokio::test]
async fn test_scene_runs_to_completion_and_persists() {
    // Arrange
    let gateway = Arc::new(MemoryGateway::new());
    let mut console = console(gateway.clone());
    console.load(Namespace::user("player-1")).await;
    let input = concat!(
        r#"{"op":"event","event":{"type":"enter-screen","screen":"home"}}"#,
        "\n",
        r#"{"op":"ack"}"#,
        "\n",
    );

    // Act
    let lines = run_lines(console, input).await;

    // Assert
    let snapshots = of_kind(&lines, "snapshot");
    assert_eq!(
        snapshots[0]["snapshot"]["dialogue"]["text"],
        "intro.welcome"
    );
    assert_eq!(
        snapshots[0]["snapshot"]["state"]["wait"]["for"],
        "acknowledgement"
    );
    let commands = of_kind(&lines, "command");
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0]["command"]["command"], "triggerReward");
    assert_eq!(commands[0]["command"]["payload"]["tier"], "starter");
    let event_types: Vec<&str> = of_kind(&lines, "event")
        .iter()
        .filter_map(|line| line["eventType"].as_str())
        .collect();
    assert_eq!(
        event_types,
        vec![
            "scenes.scene_started",
            "scenes.command_dispatched",
            "scenes.flag_changed",
            "scenes.scene_ended",
        ]
    );

    let stored = gateway
        .load(&Namespace::user("player-1"))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.flag("intro_done"));
    assert!(stored.is_completed("home-intro"));
}

#[tokio::test]
async fn test_invalid_requests_report_errors_and_continue() {
    let console = console(Arc::new(MemoryGateway::new()));
    let input = "not json\n{\"op\":\"choose\",\"index\":0}\n{\"op\":\"peek\",\"event\":{\"type\":\"enter-screen\",\"screen\":\"home\"}}\n";

    let lines = run_lines(console, input).await;

    let errors = of_kind(&lines, "error");
    assert_eq!(errors.len(), 2);
    assert!(errors[0]["message"].as_str().unwrap().starts_with("invalid request"));
    assert!(errors[1]["message"].as_str().unwrap().contains("no scene is active"));
    let eligible = of_kind(&lines, "eligible");
    assert_eq!(eligible[0]["sceneIds"], serde_json::json!(["home-intro"]));
}

#[tokio::test]
async fn test_manual_resume_continues_wait_step() {
    let console = console(Arc::new(MemoryGateway::new()));
    let input = concat!(
        r#"{"op":"event","event":{"type":"enter-screen","screen":"shop"}}"#,
        "\n",
        r#"{"op":"resume"}"#,
        "\n",
    );

    let lines = run_lines(console, input).await;

    let snapshots = of_kind(&lines, "snapshot");
    assert_eq!(
        snapshots[0]["snapshot"]["state"]["wait"]["for"],
        "timer"
    );
    assert_eq!(
        snapshots.last().unwrap()["snapshot"]["dialogue"]["text"],
        "shop.tip"
    );
}

/// Runs a console on a background task and talks to it over in-memory pipes.
struct Live {
    requests: tokio::io::DuplexStream,
    responses: tokio::io::Lines<BufReader<tokio::io::DuplexStream>>,
}

impl Live {
    fn start(console: Console) -> Self {
        let (requests, console_input) = tokio::io::duplex(4096);
        let (console_output, responses) = tokio::io::duplex(4096);
        tokio::spawn(console.run(BufReader::new(console_input), console_output));
        Self {
            requests,
            responses: BufReader::new(responses).lines(),
        }
    }

    async fn send(&mut self, request: &str) {
        self.requests.write_all(request.as_bytes()).await.unwrap();
        self.requests.write_all(b"\n").await.unwrap();
    }

    async fn next_of_kind(&mut self, kind: &str) -> Value {
        self.next_matching(kind, |_| true).await
    }

    async fn next_matching(&mut self, kind: &str, accept: impl Fn(&Value) -> bool) -> Value {
        loop {
            let line = self.responses.next_line().await.unwrap().unwrap();
            let value: Value = serde_json::from_str(&line).unwrap();
            if value["kind"] == kind && accept(&value) {
                return value;
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_wait_step_resumes_on_timer() {
    // Arrange
    let mut live = Live::start(console(Arc::new(MemoryGateway::new())));

    // Act
    live.send(r#"{"op":"event","event":{"type":"enter-screen","screen":"shop"}}"#)
        .await;

    // Assert
    let waiting = live.next_of_kind("snapshot").await;
    assert_eq!(waiting["snapshot"]["state"]["wait"]["ms"], 400);
    let resumed = live.next_of_kind("snapshot").await;
    assert_eq!(resumed["snapshot"]["dialogue"]["text"], "shop.tip");
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_anchors_reports_ready() {
    let mut live = Live::start(console(Arc::new(MemoryGateway::new())));

    live.send(r#"{"op":"waitForAnchors","anchorIds":["home.play"],"maxAttempts":20}"#)
        .await;
    live.send(r#"{"op":"registerAnchor","anchorId":"home.play","rect":{"x":0,"y":0,"width":80,"height":32}}"#)
        .await;

    let ready = live.next_of_kind("anchorsReady").await;
    assert_eq!(ready["anchorIds"], serde_json::json!(["home.play"]));
}

fn waiting_for(snapshot: &Value, wait: &str) -> bool {
    snapshot["snapshot"]["state"]["wait"]["for"] == wait
}

#[tokio::test(start_paused = true)]
async fn test_timer_from_earlier_visit_does_not_end_later_wait() {
    // Arrange
    let mut live = Live::start(console(Arc::new(MemoryGateway::new())));
    live.send(r#"{"op":"event","event":{"type":"enter-screen","screen":"arena"}}"#)
        .await;
    let first = live
        .next_matching("snapshot", |line| waiting_for(line, "timer"))
        .await;
    live.send(r#"{"op":"resume"}"#).await;
    live.next_matching("snapshot", |line| waiting_for(line, "acknowledgement"))
        .await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    // Act
    live.send(r#"{"op":"ack"}"#).await;
    let acked_at = tokio::time::Instant::now();
    let second = live
        .next_matching("snapshot", |line| waiting_for(line, "timer"))
        .await;
    let round = live
        .next_matching("snapshot", |line| waiting_for(line, "acknowledgement"))
        .await;

    // Assert
    assert_ne!(first["snapshot"]["resumeTicket"], second["snapshot"]["resumeTicket"]);
    assert_eq!(round["snapshot"]["dialogue"]["text"], "arena.round");
    assert!(acked_at.elapsed() >= Duration::from_millis(1000));
}
