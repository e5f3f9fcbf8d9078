#![allow(deprecated)]

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const AGENT: &str = r#"
apiVersion: nodeagent.dev/v1
kind: NodeAgent
metadata:
  name: agent
  namespace: observability
spec:
  cluster:
    name: prod
  agent:
    key: secret-key
    mode: INFRASTRUCTURE
"#;

const AGENT_WITHOUT_KEY: &str = r#"
apiVersion: nodeagent.dev/v1
kind: NodeAgent
metadata:
  name: agent
  namespace: observability
spec:
  zone:
    name: eu-west
"#;

fn operator() -> Command {
    let mut cmd = Command::cargo_bin("node-agent-operator").unwrap();
    cmd.env_remove("NODE_AGENT_OPERATOR_CONFIG").env_remove("LOG_LEVEL");
    cmd
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_crds_prints_node_agent_definition() {
    operator()
        .arg("crds")
        .assert()
        .success()
        .stdout(predicate::str::contains("name: nodeagents.nodeagent.dev"));
}

#[test]
fn test_no_subcommand_prints_help_and_fails() {
    operator()
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("render"));
}

#[test]
fn test_render_prints_daemonset() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "agent.yaml", AGENT);

    operator()
        .args(["render", "--file", &path])
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: DaemonSet"))
        .stdout(predicate::str::contains("nodeagent.dev/configuration-hash"))
        .stdout(predicate::str::contains("nodeagent.dev/agent-mode: INFRASTRUCTURE"))
        .stdout(predicate::str::contains("agent.observability.svc.cluster.local"));
}

#[test]
fn test_render_reads_stdin() {
    operator()
        .args(["render", "--file", "-", "--output", "json"])
        .write_stdin(AGENT)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"DaemonSet\""));
}

#[test]
fn test_render_absent_prints_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "agent.yaml", AGENT_WITHOUT_KEY);

    operator()
        .args(["render", "--file", &path])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("SkippingDaemonSet"));
}

#[test]
fn test_render_applies_config_file_and_overrides() {
    let dir = TempDir::new().unwrap();
    let agent = write_file(&dir, "agent.yaml", AGENT);
    let config = write_file(&dir, "operator.yaml", "builder:\n  default_image_tag: \"1.2.3\"\n");

    operator()
        .args(["render", "--file", &agent, "--config", &config, "--cluster-domain", "example.internal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("containers.nodeagent.dev/node-agent/agent:1.2.3"))
        .stdout(predicate::str::contains("agent.observability.svc.example.internal"));
}

#[test]
fn test_render_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.yaml").to_string_lossy().into_owned();

    operator()
        .args(["render", "--file", &path])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_render_without_namespace_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "agent.yaml", &AGENT.replace("  namespace: observability\n", ""));

    operator()
        .args(["render", "--file", &path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing object key"));
}
