//! Integration tests for pkgassets

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A restored project: package folder on disk plus a graph document
    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let packages = dir.path().join("packages");
            fs::create_dir_all(packages.join("foo").join("1.0.0")).unwrap();

            let graph = serde_json::json!({
                "packageFolders": [packages],
                "targets": [{
                    "framework": "net8.0",
                    "libraries": [{
                        "name": "Foo",
                        "version": "1.0.0",
                        "type": "package",
                        "compile": [{ "path": "ref/net8.0/Foo.dll" }],
                        "runtime": [{ "path": "lib/net8.0/Foo.dll" }, { "path": "lib/net8.0/_._" }]
                    }]
                }],
                "logs": [{ "code": "NU1603", "level": "Warning", "message": "approximate match for Foo" }]
            });
            fs::create_dir_all(dir.path().join("obj")).unwrap();
            fs::write(
                dir.path().join("obj").join("project.assets.json"),
                serde_json::to_string_pretty(&graph).unwrap(),
            )
            .unwrap();

            Self { dir }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn graph(&self) -> PathBuf {
            self.path().join("obj").join("project.assets.json")
        }

        fn cache(&self) -> PathBuf {
            self.path().join("obj").join("project.assets.cache")
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("pkgassets");
            cmd.env("PKGASSETS_CONFIG", self.path().join("config.toml"));
            cmd
        }

        fn resolve(&self, extra: &[&str]) -> Command {
            let mut cmd = self.cmd();
            cmd.arg("resolve")
                .arg(self.graph())
                .args(["--project", "App.csproj", "--framework", "net8.0"])
                .args(extra);
            cmd
        }
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("pkgassets")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Resolve package assets from a dependency graph"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("pkgassets")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pkgassets"));
    }

    #[test]
    fn config_path_honors_override() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_lists_sections() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[resolve]").and(predicate::str::contains("[cache]")));
    }

    #[test]
    fn config_init_creates_file() {
        let ws = Workspace::new();
        ws.cmd().args(["config", "init"]).assert().success();
        assert!(ws.path().join("config.toml").exists());
    }

    #[test]
    fn resolve_writes_cache_next_to_graph() {
        let ws = Workspace::new();
        ws.resolve(&["--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("RuntimeAssemblies"))
            .stdout(predicate::str::contains("Foo.dll"))
            .stdout(predicate::str::contains("_._").not());

        let bytes = fs::read(ws.cache()).unwrap();
        assert_eq!(&bytes[..4], b"PKGA");
    }

    #[test]
    fn second_resolve_reuses_cache() {
        let ws = Workspace::new();
        ws.resolve(&["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"regenerated\": true"));
        ws.resolve(&["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"regenerated\": false"))
            .stdout(predicate::str::contains("\"HintPath\""));
    }

    #[test]
    fn resolve_reports_restore_warnings() {
        let ws = Workspace::new();
        ws.resolve(&[])
            .assert()
            .success()
            .stderr(predicate::str::contains("approximate match for Foo"));
    }

    #[test]
    fn resolve_without_cache_leaves_no_file() {
        let ws = Workspace::new();
        ws.resolve(&["--no-cache", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Foo.dll"));
        assert!(!ws.cache().exists());
    }

    #[test]
    fn resolve_unknown_framework_fails() {
        let ws = Workspace::new();
        let mut cmd = ws.cmd();
        cmd.arg("resolve")
            .arg(ws.graph())
            .args(["--project", "App.csproj", "--framework", "net472"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("net472"));
    }

    #[test]
    fn resolve_missing_graph_fails() {
        let ws = Workspace::new();
        let mut cmd = ws.cmd();
        cmd.arg("resolve")
            .arg(ws.path().join("missing.json"))
            .args(["--project", "App.csproj", "--framework", "net8.0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn inspect_shows_group_counts() {
        let ws = Workspace::new();
        ws.resolve(&["--format", "plain"]).assert().success();

        ws.cmd()
            .arg("inspect")
            .arg(ws.cache())
            .args(["--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("RuntimeAssemblies\t1"))
            .stdout(predicate::str::contains("LogMessages\t1"));
    }

    #[test]
    fn inspect_rejects_garbage() {
        let ws = Workspace::new();
        let junk = ws.path().join("junk.cache");
        fs::write(&junk, b"definitely not a cache").unwrap();

        ws.cmd()
            .arg("inspect")
            .arg(&junk)
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid"));
    }

    #[test]
    fn completions_generate() {
        cargo_bin_cmd!("pkgassets")
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("pkgassets"));
    }
}
