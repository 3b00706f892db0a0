//! Integration tests for CLI commands
//!
//! Only the commands that work without a cluster are driven end to end.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run deckhand command
fn deckhand(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_deckhand"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute deckhand")
}

const DEPLOYMENT: &str = "apiVersion: apps/v1
kind: Deployment
metadata:
  name: {{ release.name }}
spec:
  replicas: {{ values.replicas }}
  selector:
    matchLabels:
      app: {{ release.name }}
  template:
    spec:
      containers:
      - name: web
        image: {{ values.image }}
{%- if values.probes %}
        readinessProbe:
          httpGet:
            path: /healthz
            port: 8080
{%- endif %}
";

const CONFIGMAP: &str = "apiVersion: v1
kind: ConfigMap
metadata:
  name: {{ release.name }}-settings
  namespace: {{ release.namespace }}
data:
  level: {{ values.level | quote }}
";

/// Write a chart and a manifest pointing at it, returning the manifest path
fn fixture(dir: &Path, templates: &[(&str, &str)]) -> String {
    let chart = dir.join("chart");
    fs::create_dir_all(chart.join("templates")).unwrap();
    fs::write(chart.join("Chart.yaml"), "name: web\nversion: 1.2.0\n").unwrap();
    fs::write(
        chart.join("values.yaml"),
        "replicas: 1\nimage: nginx:1.25\nlevel: info\nprobes: true\n",
    )
    .unwrap();
    for (name, content) in templates {
        fs::write(chart.join("templates").join(name), content).unwrap();
    }

    fs::write(dir.join("base.yaml"), "replicas: 2\n").unwrap();

    let manifest = dir.join("release.yaml");
    fs::write(
        &manifest,
        "name: frontend\nnamespace: apps\nchart: ./chart\nvalues:\n  - base.yaml\n",
    )
    .unwrap();
    manifest.to_string_lossy().into_owned()
}

fn standard_fixture(dir: &Path) -> String {
    fixture(
        dir,
        &[("deployment.yaml", DEPLOYMENT), ("configmap.yaml", CONFIGMAP)],
    )
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

mod template_command {
    use super::*;

    #[test]
    fn test_template_renders_in_path_order() {
        let dir = TempDir::new().unwrap();
        let manifest = standard_fixture(dir.path());

        let output = deckhand(&["template", &manifest]);

        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        let out = stdout(&output);
        let configmap = out.find("# Source: web/templates/configmap.yaml").unwrap();
        let deployment = out.find("# Source: web/templates/deployment.yaml").unwrap();
        assert!(configmap < deployment);
        assert!(out.contains("name: frontend-settings"));
        assert!(out.contains("namespace: apps"));
    }

    #[test]
    fn test_manifest_value_files_applied() {
        let dir = TempDir::new().unwrap();
        let manifest = standard_fixture(dir.path());

        let out = stdout(&deckhand(&["template", &manifest]));

        assert!(out.contains("replicas: 2"));
        assert!(out.contains("image: nginx:1.25"));
    }

    #[test]
    fn test_command_line_overrides_win() {
        let dir = TempDir::new().unwrap();
        let manifest = standard_fixture(dir.path());
        let extra = dir.path().join("extra.yaml");
        fs::write(&extra, "replicas: 3\nimage: nginx:1.26\n").unwrap();

        let output = deckhand(&[
            "template",
            &manifest,
            "-f",
            &extra.to_string_lossy(),
            "--set",
            "replicas=5",
        ]);

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("replicas: 5"));
        assert!(out.contains("image: nginx:1.26"));
    }

    #[test]
    fn test_render_alias() {
        let dir = TempDir::new().unwrap();
        let manifest = standard_fixture(dir.path());

        let output = deckhand(&["render", &manifest]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("kind: Deployment"));
    }

    #[test]
    fn test_notes_printed_last() {
        let dir = TempDir::new().unwrap();
        let manifest = fixture(
            dir.path(),
            &[
                ("configmap.yaml", CONFIGMAP),
                ("NOTES.txt", "Release {{ release.name }} is ready"),
            ],
        );

        let out = stdout(&deckhand(&["template", &manifest]));

        assert!(out.trim_end().ends_with("NOTES:\nRelease frontend is ready"));
        assert!(!out.contains("# Source: web/templates/NOTES.txt"));
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn test_lint_ok() {
        let dir = TempDir::new().unwrap();
        let manifest = standard_fixture(dir.path());

        let output = deckhand(&["lint", &manifest]);

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("# Source: web/templates/deployment.yaml"));
        assert!(out.contains("OK"));
        assert!(!out.contains("no liveness nor readiness probe"));
    }

    #[test]
    fn test_lint_violation_is_advisory() {
        let dir = TempDir::new().unwrap();
        let manifest = standard_fixture(dir.path());

        let output = deckhand(&["lint", &manifest, "--set", "probes=false"]);

        assert!(output.status.success());
        assert!(stdout(&output)
            .contains("deploy/frontend container web has no liveness nor readiness probe"));
    }

    #[test]
    fn test_lint_strict_fails() {
        let dir = TempDir::new().unwrap();
        let manifest = standard_fixture(dir.path());

        let output = deckhand(&["lint", &manifest, "--strict", "--set", "probes=false"]);

        assert_eq!(output.status.code(), Some(8));
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.yaml");

        let output = deckhand(&["template", &missing.to_string_lossy()]);

        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_malformed_override() {
        let dir = TempDir::new().unwrap();
        let manifest = standard_fixture(dir.path());

        let output = deckhand(&["template", &manifest, "--set", "replicas"]);

        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_missing_chart() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("release.yaml");
        fs::write(&manifest, "name: frontend\nnamespace: apps\nchart: ./nowhere\n").unwrap();

        let output = deckhand(&["template", &manifest.to_string_lossy()]);

        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn test_template_error() {
        let dir = TempDir::new().unwrap();
        let manifest = fixture(dir.path(), &[("broken.yaml", "value: {{ values.missing.key }}\n")]);

        let output = deckhand(&["template", &manifest]);

        assert_eq!(output.status.code(), Some(3));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("broken.yaml"));
    }
}
