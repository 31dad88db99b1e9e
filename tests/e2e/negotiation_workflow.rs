//! E2E Scenario: repeated negotiation rounds, per-strategy totals and agent
//! fallback.

use super::common::TestRoot;

#[test]
fn test_repeated_rounds_accumulate_strategy_stats() {
    let root = TestRoot::new();

    root.log_step("Run three rounds");
    let data = root.robot(&[
        "negotiate",
        "We would like to offer 195k.",
        "--repeat",
        "3",
        "--context",
        "benefits=remote,equity",
    ]);
    assert_eq!(data["rounds"], 3);
    assert_eq!(data["cancelled"], false);

    let stats = data["strategy_stats"].as_object().unwrap();
    let wins: u64 = stats.values().map(|s| s["wins"].as_u64().unwrap()).sum();
    let runs: u64 = stats.values().map(|s| s["runs"].as_u64().unwrap()).sum();
    assert_eq!(wins, 3);
    assert_eq!(runs, 9);
}

#[test]
fn test_transcript_alternates_speakers() {
    let root = TestRoot::new();
    let data = root.robot(&["negotiate", "Our offer is 200k.", "--transcript"]);

    for result in data["results"].as_array().unwrap() {
        let chain = result["response_chain"].as_array().unwrap();
        // Opening reply plus one HR/candidate exchange per round.
        assert_eq!(chain.len(), 5);
        assert_eq!(chain[0]["speaker"], "candidate");
        assert_eq!(chain[1]["speaker"], "hr");
    }
}

#[test]
fn test_missing_agent_degrades_to_base_salary() {
    let root = TestRoot::with_config(
        r#"
[negotiation]
base_salary = 180000
target_salary = 220000
agent = "none"
seed = 3
"#,
    );
    let data = root.robot(&["negotiate", "We offer 210k."]);
    assert_eq!(data["agent"], "none");
    assert_eq!(data["final_offer"], 180_000.0);
    for result in data["results"].as_array().unwrap() {
        assert_eq!(result["confidence_score"], 0.3);
    }
}
