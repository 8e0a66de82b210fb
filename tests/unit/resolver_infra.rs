//! Tests for the adb-backed resolver, inventory, and deleter adapters,
//! driven through a scripted `CommandRunner` double.

use std::collections::BTreeSet;
use std::process::Output;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use appcull::application::outcome::RunOutcome;
use appcull::application::ports::{AppSetResolver, PackageInventory};
use appcull::application::services::cleanup::delete_non_required_apps;
use appcull::domain::{CleanupDirective, UserId};
use appcull::infra::adb::Adb;
use appcull::infra::command_runner::CommandRunner;
use appcull::infra::resolver::DeviceAppSetResolver;
use appcull::infra::snapshot::SnapshotStore;

use crate::helpers::{exit_status, set};
use crate::mocks::{CountingCallback, StaticInventory, StaticResolver};

// ── Scripted adb double ───────────────────────────────────────────────────────

/// Returns canned output per `pm` verb and records every invocation.
struct ScriptedAdb {
    list_stdout: String,
    list_exit: i32,
    uninstall_stdout: String,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedAdb {
    fn listing(packages: &[&str]) -> Self {
        let list_stdout = packages
            .iter()
            .map(|p| format!("package:{p}\n"))
            .collect::<String>();
        Self {
            list_stdout,
            list_exit: 0,
            uninstall_stdout: "Success\n".to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing_list() -> Self {
        Self {
            list_stdout: String::new(),
            list_exit: 1,
            uninstall_stdout: String::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_uninstall_stdout(mut self, stdout: &str) -> Self {
        self.uninstall_stdout = stdout.to_string();
        self
    }

    /// Handle to the call log that survives moving the runner into `Adb`.
    fn calls_handle(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.calls)
    }
}

impl CommandRunner for ScriptedAdb {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        assert_eq!(program, "adb");
        self.calls
            .lock()
            .expect("lock")
            .push(args.iter().map(|s| (*s).to_string()).collect());
        if args.contains(&"uninstall") {
            return Ok(Output {
                status: exit_status(0),
                stdout: self.uninstall_stdout.clone().into_bytes(),
                stderr: Vec::new(),
            });
        }
        Ok(Output {
            status: exit_status(self.list_exit),
            stdout: self.list_stdout.clone().into_bytes(),
            stderr: b"pm error".to_vec(),
        })
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<Output> {
        self.run(program, args).await
    }
}

fn resolver_with(
    adb: Arc<Adb<ScriptedAdb>>,
    dir: &tempfile::TempDir,
    policy_yaml: Option<&str>,
) -> DeviceAppSetResolver<ScriptedAdb> {
    let policy_path = dir.path().join("appcull.yaml");
    if let Some(yaml) = policy_yaml {
        std::fs::write(&policy_path, yaml).expect("write policy");
    }
    DeviceAppSetResolver::new(
        adb,
        policy_path,
        SnapshotStore::new(dir.path().join("state")),
    )
}

// ── Resolver ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_run_treats_every_system_app_as_new() {
    let dir = tempfile::tempdir().expect("tempdir");
    let adb = Arc::new(Adb::new(ScriptedAdb::listing(&["com.a", "com.b"]), None));
    let resolver = resolver_with(adb, &dir, Some("required_apps: []\n"));

    let new_system = resolver.new_system_apps(UserId(0)).await.expect("resolve");
    assert_eq!(new_system, set(&["com.a", "com.b"]));
}

#[tokio::test]
async fn snapshot_diff_yields_only_added_packages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path().join("state"));
    store
        .save(UserId(0), &set(&["com.a"]))
        .await
        .expect("seed snapshot");

    let adb = Arc::new(Adb::new(ScriptedAdb::listing(&["com.a", "com.b"]), None));
    let resolver = resolver_with(adb, &dir, Some("required_apps: []\n"));

    let new_system = resolver.new_system_apps(UserId(0)).await.expect("resolve");
    assert_eq!(new_system, set(&["com.b"]));
}

#[tokio::test]
async fn non_required_subtracts_the_required_policy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let adb = Arc::new(Adb::new(
        ScriptedAdb::listing(&["com.required", "com.extra"]),
        None,
    ));
    let resolver = resolver_with(adb, &dir, Some("required_apps:\n  - com.required\n"));

    let non_required = resolver
        .non_required_apps(UserId(0))
        .await
        .expect("resolve");
    assert_eq!(non_required, set(&["com.extra"]));
}

#[tokio::test]
async fn malformed_policy_entry_fails_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    let adb = Arc::new(Adb::new(ScriptedAdb::listing(&["com.a"]), None));
    let resolver = resolver_with(adb, &dir, Some("required_apps:\n  - 'com..broken'\n"));

    assert!(resolver.non_required_apps(UserId(0)).await.is_err());
}

#[tokio::test]
async fn missing_policy_file_fails_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    let adb = Arc::new(Adb::new(ScriptedAdb::listing(&["com.a"]), None));
    let resolver = resolver_with(adb, &dir, None);

    assert!(resolver.non_required_apps(UserId(0)).await.is_err());
}

#[tokio::test]
async fn pm_list_failure_fails_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    let adb = Arc::new(Adb::new(ScriptedAdb::failing_list(), None));
    let resolver = resolver_with(adb, &dir, Some("required_apps: []\n"));

    assert!(resolver.new_system_apps(UserId(0)).await.is_err());
}

#[tokio::test]
async fn record_snapshot_persists_the_device_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    let adb = Arc::new(Adb::new(ScriptedAdb::listing(&["com.a", "com.b"]), None));
    let resolver = resolver_with(Arc::clone(&adb), &dir, Some("required_apps: []\n"));

    resolver.record_snapshot(UserId(0)).await.expect("record");

    let store = SnapshotStore::new(dir.path().join("state"));
    assert_eq!(
        store.load(UserId(0)).await.expect("load"),
        Some(set(&["com.a", "com.b"]))
    );
}

#[tokio::test]
async fn queries_are_scoped_to_user_and_serial() {
    let runner = ScriptedAdb::listing(&["com.a"]);
    let calls = runner.calls_handle();
    let adb = Adb::new(runner, Some("emulator-5554".to_string()));

    let _ = adb.list_system_packages(UserId(7)).await.expect("list");

    let recorded = calls.lock().expect("lock").clone();
    assert_eq!(recorded.len(), 1);
    assert_eq!(
        recorded[0],
        vec!["-s", "emulator-5554", "shell", "pm", "list", "packages", "-s", "--user", "7"]
    );
}

// ── Inventory ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn inventory_matches_exact_package_names_only() {
    let adb = Adb::new(ScriptedAdb::listing(&["com.example.mailx"]), None);
    assert!(
        !adb.is_installed_system_app("com.example.mail", UserId(0))
            .await
            .expect("query")
    );

    let adb = Adb::new(
        ScriptedAdb::listing(&["com.example.mail", "com.example.mailx"]),
        None,
    );
    assert!(
        adb.is_installed_system_app("com.example.mail", UserId(0))
            .await
            .expect("query")
    );
}

#[tokio::test]
async fn inventory_error_when_pm_fails() {
    let adb = Adb::new(ScriptedAdb::failing_list(), None);
    assert!(
        adb.is_installed_system_app("com.a", UserId(0))
            .await
            .is_err()
    );
}

// ── Deleter, end to end through the cleanup service ───────────────────────────

#[tokio::test]
async fn adb_deleter_reports_success_through_the_cleanup_run() {
    let adb = Adb::new(ScriptedAdb::listing(&["com.a"]), None);
    let resolver = StaticResolver::new(Some(set(&["com.a"])), Some(set(&["com.a"])));
    let (callback, outcome) = CountingCallback::new();

    delete_non_required_apps(
        &CleanupDirective::default(),
        UserId(0),
        &resolver,
        &adb,
        &adb,
        callback.clone(),
    )
    .await;

    assert_eq!(outcome.await.expect("outcome"), RunOutcome::Success);
    assert_eq!(callback.successes(), 1);
}

#[tokio::test]
async fn adb_deleter_reports_failure_through_the_cleanup_run() {
    let runner = ScriptedAdb::listing(&["com.a"])
        .with_uninstall_stdout("Failure [DELETE_FAILED_INTERNAL_ERROR]\n");
    let adb = Adb::new(runner, None);
    let resolver = StaticResolver::new(Some(set(&["com.a"])), Some(set(&["com.a"])));
    let inventory = StaticInventory {
        installed: set(&["com.a"]),
    };
    let (callback, outcome) = CountingCallback::new();

    delete_non_required_apps(
        &CleanupDirective::default(),
        UserId(0),
        &resolver,
        &inventory,
        &adb,
        callback.clone(),
    )
    .await;

    assert_eq!(outcome.await.expect("outcome"), RunOutcome::Error(0));
    assert_eq!(callback.errors(), 1);
}
