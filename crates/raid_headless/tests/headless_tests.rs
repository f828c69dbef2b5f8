//! End-to-end checks of the shipped scenarios and the line protocol.

use std::io::Cursor;
use std::path::PathBuf;

use raid_headless::{run_match, MatchConfig, PolicyKind, Scenario, Session};
use serde_json::Value;

fn scenario_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

fn responses(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn shipped_scenarios_load_and_build() {
    let mut count = 0;
    for entry in std::fs::read_dir(scenario_dir()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "ron") {
            let scenario = Scenario::load(&path).unwrap();
            let sim = scenario.build().unwrap();
            assert_eq!(sim.roster().len(), scenario.roster.len(), "{}", path.display());
            count += 1;
        }
    }
    assert!(count >= 3);
}

#[test]
fn raid_scenario_file_matches_builtin_layout() {
    let file = Scenario::load(scenario_dir().join("raid_3v3.ron")).unwrap();
    assert_eq!(file.name, "raid_3v3");
    assert_eq!(file.seed, 1337);
    assert!(file
        .roster
        .iter()
        .filter(|e| e.id % 2 == 0)
        .all(|e| e.policy == PolicyKind::Rush));
}

#[test]
fn scripted_duel_runs_from_file() {
    let scenario = Scenario::load(scenario_dir().join("duel_1v1.ron")).unwrap();
    let result = run_match(&MatchConfig::new(scenario).with_max_ticks(240)).unwrap();
    assert!(result.metrics.duration_ticks <= 240);
    assert_eq!(result.metrics.seed, 42);
}

#[test]
fn protocol_session_over_buffers() {
    let scenario = Scenario::load(scenario_dir().join("external_2v2.ron")).unwrap();
    let mut session = Session::new(scenario.build().unwrap());

    let input = concat!(
        r#"{"cmd":"step","actions":{"1":[2,1,0,0,2],"2":[0,1,0,1,2]}}"#,
        "\n",
        r#"{"cmd":"step"}"#,
        "\n",
        r#"{"cmd":"hash"}"#,
        "\n",
        r#"{"cmd":"quit"}"#,
        "\n",
        r#"{"cmd":"step"}"#,
        "\n",
    );
    let mut output = Vec::new();
    session.serve(Cursor::new(input), &mut output).unwrap();

    let lines = responses(&output);
    let kinds: Vec<&str> = lines.iter().map(|v| v["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, ["ready", "observations", "observations", "hash", "bye"]);
    assert_eq!(lines[1]["tick"], 1);
    assert_eq!(lines[2]["tick"], 2);
    assert_eq!(lines[3]["tick"], 2);
}
