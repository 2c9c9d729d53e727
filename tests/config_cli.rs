use predicates::str::{contains, diff};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_config(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be available")
        .as_nanos();
    path.push(format!("mediflow-config-{}.{}", nanos, extension));
    fs::write(&path, contents).expect("config write should succeed");
    path
}

const NURSE_A_LATE_WEEK: &str = r#"{
  "optimiser": {
    "staff": [
      {"name": "Nurse_A", "cost": 25, "max_hours": 40,
       "availability": ["Wed_AM", "Thu_AM", "Fri_AM"]},
      {"name": "Nurse_B", "cost": 25, "max_hours": 40,
       "availability": ["Mon_PM", "Tue_PM", "Wed_PM", "Thu_PM", "Fri_PM"]},
      {"name": "Nurse_C", "cost": 25, "max_hours": 40,
       "availability": ["Mon_AM", "Tue_AM", "Wed_AM", "Thu_AM", "Fri_AM"]},
      {"name": "Tech_D", "cost": 20, "max_hours": 40,
       "availability": ["Mon_AM", "Mon_PM", "Tue_AM", "Tue_PM", "Wed_AM",
                        "Wed_PM", "Thu_AM", "Thu_PM", "Fri_AM", "Fri_PM"]}
    ],
    "shift_requirements": {
      "Mon_AM": 2, "Mon_PM": 2, "Tue_AM": 2, "Tue_PM": 2, "Wed_AM": 2,
      "Wed_PM": 2, "Thu_AM": 2, "Thu_PM": 2, "Fri_AM": 2, "Fri_PM": 2
    }
  }
}"#;

#[test]
fn late_week_availability_is_infeasible() {
    let path = write_temp_config(NURSE_A_LATE_WEEK, "json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mediflow");
    cmd.args(["optimize", "--config", path.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(contains("Status: infeasible"))
        .stdout(contains(
            "Mon needs 4 staff-shifts but only 3 staff are available that day (one shift per day each)",
        ))
        .stdout(contains("Make 1 more staff available on Mon or reduce Mon's requirements by 1"));
}

#[test]
fn late_week_availability_analysis_summary() {
    let path = write_temp_config(NURSE_A_LATE_WEEK, "json");

    // Mon and Tue headcount, plus seven shifts with no spare candidate.
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mediflow");
    cmd.args([
        "analyze",
        "--config",
        path.to_str().unwrap(),
        "--format",
        "summary",
    ]);
    cmd.assert()
        .success()
        .stdout(diff("issues: 9\nblocking: true\n"));
}

#[test]
fn toml_simulator_section_fills_missing_flags() {
    let config = r#"
[simulator]
arrival_rate = 8.0
service_rate = 5.0
servers = 2
hours = 10.0
seed = 11
"#;
    let path = write_temp_config(config, "toml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mediflow");
    cmd.args([
        "simulate",
        "--config",
        path.to_str().unwrap(),
        "--servers",
        "4",
        "--format",
        "json",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("\"arrival_rate\": 8.0"))
        .stdout(contains("\"service_rate\": 5.0"))
        .stdout(contains("\"servers\": 4"))
        .stdout(contains("\"seed\": 11"));
}

#[test]
fn toml_roster_optimises_single_staff() {
    let config = r#"
[optimiser]
days = ["Mon", "Tue"]
periods = ["AM"]
shift_requirements = { Mon_AM = 1, Tue_AM = 1 }

[[optimiser.staff]]
name = "Cheap"
cost = 10.0
max_hours = 40.0
availability = ["Mon_AM", "Tue_AM"]

[[optimiser.staff]]
name = "Dear"
cost = 50.0
max_hours = 40.0
availability = ["Mon_AM", "Tue_AM"]
"#;
    let path = write_temp_config(config, "toml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mediflow");
    cmd.args([
        "optimize",
        "--config",
        path.to_str().unwrap(),
        "--format",
        "summary",
    ]);
    cmd.assert()
        .success()
        .stdout(diff("status: optimal\ntotal_cost: 160.00\n"));
}
