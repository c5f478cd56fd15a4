//! Integration tests for error handling and user-facing diagnostics.

mod common;

use assert_cmd::Command;
use common::{TestRepo, basic_instance};
use predicates::prelude::*;

#[test]
fn help_lists_all_commands() {
    Command::cargo_bin("fleetrender")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("render")
                .and(predicate::str::contains("list-clusters"))
                .and(predicate::str::contains("list-apps")),
        );
}

#[test]
fn missing_instance_is_a_fatal_error() {
    let repo = TestRepo::new().unwrap();

    let output = repo.run(&["-i", "nope", "list-clusters"]).unwrap();
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("nope"), "stderr: {}", output.stderr);
}

#[test]
fn missing_instance_flag_suggests_the_env_variable() {
    let repo = TestRepo::new().unwrap();
    basic_instance(&repo, "prod").unwrap();

    let output = repo.run(&["list-clusters"]).unwrap();
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("FLEETRENDER_INSTANCE"), "stderr: {}", output.stderr);
}

#[test]
fn invalid_selector_reports_the_pattern() {
    let repo = TestRepo::new().unwrap();
    basic_instance(&repo, "prod").unwrap();

    let output = repo.run(&["-i", "prod", "list-clusters", "cluster-["]).unwrap();
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("cluster-["), "stderr: {}", output.stderr);
}

#[test]
fn unparsable_instance_yaml_names_the_file() {
    let repo = TestRepo::new().unwrap();
    basic_instance(&repo, "prod").unwrap();
    repo.write_instance_file("prod", "broken.yaml", "clusters: [unclosed\n").unwrap();

    let output = repo.run(&["-i", "prod", "list-clusters"]).unwrap();
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("broken.yaml"), "stderr: {}", output.stderr);
}

#[test]
fn application_named_common_is_rejected() {
    let repo = TestRepo::new().unwrap();
    basic_instance(&repo, "prod").unwrap();
    repo.write_instance_file(
        "prod",
        "conflict.yaml",
        r"
clusterGroupApps:
  extras:
    applications:
      - name: common
",
    )
    .unwrap();

    let output = repo.run(&["-i", "prod", "list-apps"]).unwrap();
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("common"), "stderr: {}", output.stderr);
}
