use predicates::str::{contains, diff};

#[test]
fn optimize_default_clinic_summary_is_stable() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mediflow");
    cmd.args(["optimize", "--format", "summary"]);
    cmd.assert()
        .success()
        .stdout(diff("status: optimal\ntotal_cost: 2552.00\n"));
}

#[test]
fn optimize_default_clinic_human_lists_roster() {
    let expected = concat!(
        "Status: optimal\n",
        "Total cost: $2552.00\n",
        "Assignments:\n",
        "Nurse_A: Mon_AM, Tue_AM, Wed_AM, Thu_AM, Fri_AM (40h)\n",
        "Nurse_B: Mon_PM, Tue_PM, Wed_PM, Thu_PM, Fri_PM (40h)\n",
        "Nurse_C: Tue_AM, Thu_AM (16h)\n",
        "Tech_D: Mon_AM, Tue_PM, Wed_AM, Thu_PM, Fri_AM (40h)\n",
    );
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mediflow");
    cmd.arg("optimize");
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn seeded_simulation_is_repeatable() {
    let run = || {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mediflow");
        cmd.args(["simulate", "--seed", "42", "--hours", "20", "--format", "json"]);
        let output = cmd.assert().success().get_output().stdout.clone();
        String::from_utf8(output).expect("stdout should be utf-8")
    };
    let first = run();
    assert_eq!(first, run());
    assert!(first.contains("\"seed\": 42"));
}

#[test]
fn overloaded_clinic_is_critical() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mediflow");
    cmd.args([
        "simulate",
        "--arrival-rate",
        "20",
        "--service-rate",
        "4",
        "--servers",
        "3",
        "--hours",
        "30",
        "--seed",
        "3",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("Severity: CRITICAL"))
        .stdout(contains("to bring rho below 1.0."))
        .stdout(contains("Status: System unstable: more staff required."));
}

#[test]
fn simulate_summary_reports_severity() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mediflow");
    cmd.args(["simulate", "--seed", "1", "--format", "summary"]);
    cmd.assert()
        .success()
        .stdout(contains("severity: "))
        .stdout(contains("patients_served: "));
}
