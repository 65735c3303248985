mod common;

use common::{page_widths, write_pdf};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use xlsx_pdf_combine::ui::{BatchProgress, NoopProgress};
use xlsx_pdf_combine::{
    CombineError, Config, ConfirmationGate, ErrorPolicy, Gate, GracefulShutdown, HostLauncher,
    MergeOrder, Mode, Pipeline, ProgressObserver, Result, RunOutcome, RunReport,
    SpreadsheetExporter,
};

type Events = Arc<Mutex<Vec<String>>>;

/// Exports a six-page PDF per spreadsheet; page widths encode the root name.
struct FakeOffice {
    events: Events,
    failing: HashSet<String>,
}

struct FakeSession {
    events: Events,
    failing: HashSet<String>,
}

impl FakeOffice {
    fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            failing: HashSet::new(),
        }
    }

    fn failing_on(mut self, root_name: &str) -> Self {
        self.failing.insert(root_name.to_string());
        self
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl HostLauncher for FakeOffice {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession> {
        self.events.lock().unwrap().push("launch".to_string());
        Ok(FakeSession {
            events: self.events.clone(),
            failing: self.failing.clone(),
        })
    }
}

impl SpreadsheetExporter for FakeSession {
    async fn export_pdf(&mut self, spreadsheet: &Path, out_dir: &Path) -> Result<PathBuf> {
        let stem = spreadsheet.file_stem().unwrap().to_string_lossy().to_string();
        self.events.lock().unwrap().push(format!("export {}", stem));

        if self.failing.contains(&stem) {
            return Err(CombineError::Conversion {
                path: spreadsheet.display().to_string(),
                message: "workbook is corrupt".to_string(),
            });
        }

        let exported = out_dir.join(format!("{}.pdf", stem));
        write_pdf(&exported, 6, exported_tag(&stem)).unwrap();
        Ok(exported)
    }

    async fn close(&mut self) {
        self.events.lock().unwrap().push("close".to_string());
    }
}

/// Scripted answers; unlisted gates are accepted.
struct Answers(Vec<(Gate, bool)>);

impl ConfirmationGate for Answers {
    fn confirm(&mut self, gate: Gate, _prompt: &str) -> Result<bool> {
        Ok(self
            .0
            .iter()
            .find(|(g, _)| *g == gate)
            .map(|(_, answer)| *answer)
            .unwrap_or(true))
    }

    fn select_mode(&mut self) -> Result<Mode> {
        Ok(Mode::XlsxPdf)
    }
}

/// Observer calls as `event completed/total [item]`.
#[derive(Default)]
struct RecordedProgress(Vec<String>);

impl ProgressObserver for RecordedProgress {
    fn batch_started(&mut self, progress: &BatchProgress) {
        self.0.push(format!("start {}/{}", progress.completed, progress.total));
    }

    fn item_finished(&mut self, progress: &BatchProgress) {
        self.0.push(format!(
            "item {}/{} {}",
            progress.completed,
            progress.total,
            progress.current_item.as_deref().unwrap_or("")
        ));
    }

    fn batch_finished(&mut self, progress: &BatchProgress) {
        self.0.push(format!("finish {}/{}", progress.completed, progress.total));
    }
}

fn document_tag(root_name: &str) -> i64 {
    match root_name {
        "Alpha" => 1,
        "Beta" => 2,
        _ => 3,
    }
}

fn exported_tag(root_name: &str) -> i64 {
    document_tag(root_name) + 10
}

/// `Alpha` and `Beta` pairs (documents have 4 pages), plus one lone spreadsheet.
fn workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for name in ["Alpha", "Beta"] {
        common::touch(&root.join(format!("sheets/{}.xlsx", name))).unwrap();
        write_pdf(&root.join(format!("{}.pdf", name)), 4, document_tag(name)).unwrap();
    }
    common::touch(&root.join("Lonely.xlsx")).unwrap();
    temp_dir
}

fn pipeline(config: Config) -> Pipeline {
    Pipeline::new(config, GracefulShutdown::new_for_test())
}

async fn run(
    config: Config,
    root: &Path,
    office: &FakeOffice,
    answers: Vec<(Gate, bool)>,
) -> Result<RunOutcome> {
    run_observed(config, root, office, answers, &mut NoopProgress).await
}

async fn run_observed<O: ProgressObserver>(
    config: Config,
    root: &Path,
    office: &FakeOffice,
    answers: Vec<(Gate, bool)>,
    observer: &mut O,
) -> Result<RunOutcome> {
    let pipeline = pipeline(config);
    let plan = pipeline.plan(Mode::XlsxPdf, root, &root.join("output"))?;
    pipeline
        .execute(&plan, office, &mut Answers(answers), observer)
        .await
}

fn completed(outcome: RunOutcome) -> RunReport {
    match outcome {
        RunOutcome::Completed(report) => report,
        RunOutcome::Cancelled { gate } => panic!("run cancelled at {}", gate),
    }
}

#[tokio::test]
async fn merges_each_pair_then_combines_in_root_name_order() {
    let temp_dir = workspace();
    let root = temp_dir.path();
    let office = FakeOffice::new();

    let report = completed(run(Config::default(), root, &office, vec![]).await.unwrap());

    // Document pages 0..3, then exported pages 3..5.
    let alpha = root.join("output/Alpha.pdf");
    assert_eq!(page_widths(&alpha).unwrap(), vec![100, 101, 102, 1103, 1104]);

    let outputs: Vec<&str> = report.batch.outputs.iter().map(|o| o.root_name.as_str()).collect();
    assert_eq!(outputs, vec!["Alpha", "Beta"]);

    let combined = report.combined.unwrap();
    assert_eq!(combined.path, root.join("output/Combined_1-2.pdf"));
    assert_eq!(combined.pages, report.batch.total_pages());
    assert_eq!(
        page_widths(&combined.path).unwrap(),
        vec![100, 101, 102, 1103, 1104, 200, 201, 202, 1203, 1204]
    );

    assert_eq!(office.events(), vec!["launch", "export Alpha", "export Beta", "close"]);
}

#[tokio::test]
async fn exported_first_order_and_suffix() {
    let temp_dir = workspace();
    let root = temp_dir.path();
    let office = FakeOffice::new();

    let mut config = Config::default();
    config.merge.order = MergeOrder::ExportedFirst;
    config.merge.output_suffix = "_Merged".to_string();

    completed(run(config, root, &office, vec![(Gate::FinalMerge, false)]).await.unwrap());

    assert_eq!(
        page_widths(&root.join("output/Beta_Merged.pdf")).unwrap(),
        vec![1203, 1204, 200, 201, 202]
    );
}

#[tokio::test]
async fn declining_final_merge_keeps_pair_outputs_only() {
    let temp_dir = workspace();
    let root = temp_dir.path();
    let office = FakeOffice::new();

    let report = completed(
        run(Config::default(), root, &office, vec![(Gate::FinalMerge, false)])
            .await
            .unwrap(),
    );

    assert!(report.combined.is_none());
    assert!(root.join("output/Alpha.pdf").is_file());
    assert!(root.join("output/Beta.pdf").is_file());
    assert!(!root.join("output/Combined_1-2.pdf").exists());
}

#[tokio::test]
async fn declining_a_gate_writes_nothing_and_never_launches() {
    for gate in [Gate::Summary, Gate::Start] {
        let temp_dir = workspace();
        let root = temp_dir.path();
        let office = FakeOffice::new();

        let outcome = run(Config::default(), root, &office, vec![(gate, false)])
            .await
            .unwrap();

        match outcome {
            RunOutcome::Cancelled { gate: declined } => assert_eq!(declined, gate),
            RunOutcome::Completed(_) => panic!("expected cancellation at {}", gate),
        }
        assert!(!root.join("output").exists());
        assert!(office.events().is_empty());
    }
}

#[tokio::test]
async fn abort_policy_stops_at_first_failure_and_closes_session() {
    let temp_dir = workspace();
    let root = temp_dir.path();
    let office = FakeOffice::new().failing_on("Alpha");

    let result = run(Config::default(), root, &office, vec![]).await;

    assert!(matches!(result, Err(CombineError::Conversion { .. })));
    assert!(!root.join("output/Alpha.pdf").exists());
    assert!(!root.join("output/Beta.pdf").exists());
    assert_eq!(office.events(), vec!["launch", "export Alpha", "close"]);
}

#[tokio::test]
async fn skip_policy_records_failure_and_continues() {
    let temp_dir = workspace();
    let root = temp_dir.path();
    let office = FakeOffice::new().failing_on("Alpha");

    let mut config = Config::default();
    config.merge.on_error = ErrorPolicy::Skip;

    let report = completed(run(config, root, &office, vec![]).await.unwrap());

    assert_eq!(report.batch.errors.len(), 1);
    assert_eq!(report.batch.errors[0].root_name, "Alpha");
    assert!(report.batch.errors[0].message.contains("corrupt"));
    assert_eq!(report.batch.outputs.len(), 1);

    let combined = report.combined.unwrap();
    assert_eq!(combined.path, root.join("output/Combined_1-1.pdf"));
    assert_eq!(combined.pages, 5);
    assert_eq!(office.events().last().map(String::as_str), Some("close"));
}

#[tokio::test]
async fn rerun_asks_before_reusing_non_empty_output() {
    let temp_dir = workspace();
    let root = temp_dir.path();

    completed(run(Config::default(), root, &FakeOffice::new(), vec![]).await.unwrap());

    // The output directory is not scanned, so the second plan is unchanged.
    let office = FakeOffice::new();
    let outcome = run(
        Config::default(),
        root,
        &office,
        vec![(Gate::OverwriteOutput, false)],
    )
    .await
    .unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled { gate: Gate::OverwriteOutput }));
    assert!(office.events().is_empty());
}

#[tokio::test]
async fn duplicate_names_fail_before_any_gate() {
    let temp_dir = workspace();
    let root = temp_dir.path();
    write_pdf(&root.join("archive/Alpha.pdf"), 1, 9).unwrap();

    let office = FakeOffice::new();
    let result = run(Config::default(), root, &office, vec![]).await;

    match result {
        Err(CombineError::DuplicateFiles { groups }) => {
            assert_eq!(groups.len(), 1);
            assert_eq!(
                groups[0].paths,
                vec![root.join("Alpha.pdf"), root.join("archive/Alpha.pdf")]
            );
        }
        other => panic!("expected duplicate error, got {:?}", other.map(|_| ())),
    }
    assert!(!root.join("output").exists());
    assert!(office.events().is_empty());
}

#[tokio::test]
async fn progress_is_reported_once_per_pair() {
    let temp_dir = workspace();
    let root = temp_dir.path();
    let mut progress = RecordedProgress::default();

    completed(
        run_observed(Config::default(), root, &FakeOffice::new(), vec![], &mut progress)
            .await
            .unwrap(),
    );

    assert_eq!(
        progress.0,
        vec!["start 0/2", "item 1/2 Alpha", "item 2/2 Beta", "finish 2/2"]
    );
}

#[tokio::test]
async fn progress_batch_finishes_on_abort() {
    let temp_dir = workspace();
    let root = temp_dir.path();
    let office = FakeOffice::new().failing_on("Beta");
    let mut progress = RecordedProgress::default();

    let result = run_observed(Config::default(), root, &office, vec![], &mut progress).await;

    assert!(matches!(result, Err(CombineError::Conversion { .. })));
    assert_eq!(progress.0, vec!["start 0/2", "item 1/2 Alpha", "finish 1/2"]);
}

#[tokio::test]
async fn cancelled_runs_report_no_progress() {
    let temp_dir = workspace();
    let root = temp_dir.path();
    let mut progress = RecordedProgress::default();

    let outcome = run_observed(
        Config::default(),
        root,
        &FakeOffice::new(),
        vec![(Gate::Start, false)],
        &mut progress,
    )
    .await
    .unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled { gate: Gate::Start }));
    assert!(progress.0.is_empty());
}
