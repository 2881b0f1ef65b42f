//! Plan selection against a real directory tree.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use plancheck_core::discovery::{
    ChangeProbe, DiscoveryError, DocumentLocator, GitStatusProbe, ProbeOutcome, ScanConfig,
};
use plancheck_test_utils::TestWorkspace;

struct StaticProbe(Vec<PathBuf>);

#[async_trait]
impl ChangeProbe for StaticProbe {
    fn name(&self) -> &str {
        "static"
    }

    async fn changed_files(&self, _dir: &Path) -> ProbeOutcome<Vec<PathBuf>> {
        ProbeOutcome::Completed(self.0.clone())
    }
}

fn locator(ws: &TestWorkspace, scan: ScanConfig, changed: &[&str]) -> DocumentLocator {
    let probe = StaticProbe(changed.iter().map(PathBuf::from).collect());
    DocumentLocator::new(ws.path(), scan, Box::new(probe))
}

#[tokio::test]
async fn picks_the_most_recently_modified_plan() {
    let ws = TestWorkspace::new();
    let older = ws.write_plan("older.md", "# older");
    ws.set_age(&older, Duration::from_secs(120));
    let newer = ws.write_plan("newer.md", "# newer");
    ws.set_age(&newer, Duration::from_secs(5));

    let chosen = locator(&ws, ScanConfig::default(), &[])
        .locate(None)
        .await
        .unwrap();
    assert_eq!(chosen, newer);
}

#[tokio::test]
async fn custom_extension_and_window() {
    let ws = TestWorkspace::new();
    let plan = ws.write("plans/feature.plan", "# plan");
    ws.set_age(&plan, Duration::from_secs(20 * 60));
    ws.write("plans/feature.md", "# not a plan");

    let scan = ScanConfig::new("plans", "plan", 30);
    assert_eq!(scan.extension, ".plan");
    let chosen = locator(&ws, scan, &[]).locate(None).await.unwrap();
    assert_eq!(chosen, plan);

    let narrow = ScanConfig::new("plans", ".plan", 10);
    let err = locator(&ws, narrow, &[]).locate(None).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::NoCandidates { .. }));
}

#[tokio::test]
async fn stale_but_uncommitted_plan_is_found() {
    let ws = TestWorkspace::new();
    let plan = ws.write_plan("draft.md", "# draft");
    ws.set_age(&plan, Duration::from_secs(24 * 3600));

    let chosen = locator(&ws, ScanConfig::default(), &["specs/draft.md"])
        .locate(None)
        .await
        .unwrap();
    assert_eq!(chosen, plan);
}

#[tokio::test]
async fn missing_directory_reports_no_candidates() {
    let ws = TestWorkspace::new();
    let err = locator(&ws, ScanConfig::default(), &[])
        .locate(None)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "No recent plan file found in specs/*.md"
    );
}

#[tokio::test]
async fn git_probe_degrades_without_a_repository() {
    let ws = TestWorkspace::new();
    let plan = ws.write_plan("fresh.md", "# fresh");

    let probe = GitStatusProbe::new(Duration::from_secs(5)).in_dir(ws.path());
    let locator = DocumentLocator::new(ws.path(), ScanConfig::default(), Box::new(probe));
    assert_eq!(locator.locate(None).await.unwrap(), plan);
}
