use crate::config::{Config, ErrorPolicy, MergeOrder};
use crate::error::{CombineError, Result, UserFriendlyError};
use crate::office::{HostLauncher, SpreadsheetExporter};
use crate::pairing::MatchedPair;
use crate::pdf::{self, ExtractedPages, PdfPart};
use crate::pipeline::{
    BatchResult, ConfirmationGate, Gate, ItemError, ItemOutput, Mode, OutputDirState, RunOutcome,
    RunPlan, RunReport,
};
use crate::ui::progress::{BatchProgress, ProgressObserver};
use crate::ui::GracefulShutdown;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs one planned batch. Items are processed strictly one after another.
pub struct Pipeline {
    config: Config,
    shutdown: GracefulShutdown,
}

impl Pipeline {
    pub fn new(config: Config, shutdown: GracefulShutdown) -> Self {
        Self { config, shutdown }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn plan(&self, mode: Mode, working_dir: &Path, output_dir: &Path) -> Result<RunPlan> {
        RunPlan::build(&self.config, mode, working_dir, output_dir)
    }

    /// Confirm and run `plan`. Nothing is written before the start gate passes.
    pub async fn execute<L, G, O>(
        &self,
        plan: &RunPlan,
        launcher: &L,
        gate: &mut G,
        observer: &mut O,
    ) -> Result<RunOutcome>
    where
        L: HostLauncher,
        G: ConfirmationGate + ?Sized,
        O: ProgressObserver + ?Sized,
    {
        let started = Instant::now();

        if plan.item_count() == 0 {
            return Err(CombineError::NothingToMerge { count: 0 });
        }

        if let Some(declined) = confirm_plan(plan, gate)? {
            info!(gate = %declined, "run cancelled at gate");
            return Ok(RunOutcome::Cancelled { gate: declined });
        }

        fs::create_dir_all(&plan.output_dir).map_err(|e| CombineError::Access {
            path: plan.output_dir.display().to_string(),
            message: e.to_string(),
        })?;

        let (batch, combined) = match plan.mode {
            Mode::XlsxPdf => self.combine_pairs(plan, launcher, gate, observer).await?,
            Mode::PdfFirstPage => self.combine_first_pages(plan, observer)?,
        };

        Ok(RunOutcome::Completed(RunReport::new(
            plan,
            batch,
            combined,
            started.elapsed(),
        )))
    }

    async fn combine_pairs<L, G, O>(
        &self,
        plan: &RunPlan,
        launcher: &L,
        gate: &mut G,
        observer: &mut O,
    ) -> Result<(BatchResult, Option<ItemOutput>)>
    where
        L: HostLauncher,
        G: ConfirmationGate + ?Sized,
        O: ProgressObserver + ?Sized,
    {
        let temp_dir = tempfile::Builder::new()
            .prefix("xlsx-pdf-combine-")
            .tempdir_in(&plan.temp_root)
            .map_err(|e| CombineError::Access {
                path: plan.temp_root.display().to_string(),
                message: e.to_string(),
            })?;

        let mut session = launcher.launch().await?;

        let mut batch = BatchResult::default();
        let mut progress = BatchProgress::new("Converting and merging", plan.pairing.pair_count());
        observer.batch_started(&progress);

        let result = self
            .convert_each(plan, &mut session, temp_dir.path(), observer, &mut progress, &mut batch)
            .await;

        observer.batch_finished(&progress);
        session.close().await;
        result?;

        if batch.outputs.is_empty() {
            return Ok((batch, None));
        }

        let prompt = format!(
            "Combine all {} output files into {}?",
            batch.outputs.len(),
            display_name(&plan.combined_output_path(batch.outputs.len()))
        );
        if !gate.confirm(Gate::FinalMerge, &prompt)? {
            info!("final merge declined");
            return Ok((batch, None));
        }

        let combined = self.final_merge(plan, &batch)?;
        Ok((batch, Some(combined)))
    }

    async fn convert_each<S, O>(
        &self,
        plan: &RunPlan,
        session: &mut S,
        temp_dir: &Path,
        observer: &mut O,
        progress: &mut BatchProgress,
        batch: &mut BatchResult,
    ) -> Result<()>
    where
        S: SpreadsheetExporter,
        O: ProgressObserver + ?Sized,
    {
        for pair in &plan.pairing.pairs {
            self.shutdown.check_shutdown()?;

            // Dropping the export on a forced stop kills the office child.
            let converted = tokio::select! {
                converted = self.convert_pair(plan, pair, session, temp_dir) => converted,
                _ = self.shutdown.forced() => Err(CombineError::Interrupted),
            };

            match converted {
                Ok(output) => {
                    info!(root_name = %output.root_name, pages = output.pages, "merged pair");
                    batch.outputs.push(output);
                }
                Err(e) => self.record_failure(&pair.root_name, e, batch)?,
            }

            progress.finish_item(pair.root_name.as_str());
            observer.item_finished(progress);
        }

        Ok(())
    }

    async fn convert_pair<S: SpreadsheetExporter>(
        &self,
        plan: &RunPlan,
        pair: &MatchedPair,
        session: &mut S,
        temp_dir: &Path,
    ) -> Result<ItemOutput> {
        let exported = session.export_pdf(&pair.spreadsheet, temp_dir).await?;
        debug!(root_name = %pair.root_name, exported = %exported.display(), "exported spreadsheet");

        let merge = &self.config.merge;
        let document = PdfPart::new(&pair.document, merge.document_pages.clone());
        let exported = PdfPart::new(exported, merge.exported_pages.clone());
        let parts = match merge.order {
            MergeOrder::DocumentFirst => [document, exported],
            MergeOrder::ExportedFirst => [exported, document],
        };

        let path = plan.output_path(&pair.root_name, &merge.output_suffix);
        let summary = pdf::combine(&parts, &path)?;

        Ok(ItemOutput {
            root_name: pair.root_name.clone(),
            path,
            pages: summary.pages,
        })
    }

    /// Concatenate every per-pair output, in processing order.
    fn final_merge(&self, plan: &RunPlan, batch: &BatchResult) -> Result<ItemOutput> {
        let parts: Vec<PdfPart> = batch
            .outputs
            .iter()
            .map(|output| PdfPart::whole(&output.path))
            .collect();
        let path = plan.combined_output_path(parts.len());
        let summary = pdf::combine(&parts, &path)?;

        info!(path = %path.display(), pages = summary.pages, "wrote combined output");

        Ok(ItemOutput {
            root_name: display_stem(&path),
            path,
            pages: summary.pages,
        })
    }

    fn combine_first_pages<O>(
        &self,
        plan: &RunPlan,
        observer: &mut O,
    ) -> Result<(BatchResult, Option<ItemOutput>)>
    where
        O: ProgressObserver + ?Sized,
    {
        let mut batch = BatchResult::default();
        let mut extracted = Vec::with_capacity(plan.documents.len());
        let mut progress = BatchProgress::new("Extracting pages", plan.documents.len());
        observer.batch_started(&progress);

        let result = self.extract_each(plan, observer, &mut progress, &mut batch, &mut extracted);
        observer.batch_finished(&progress);
        result?;

        if extracted.is_empty() {
            return Err(CombineError::NothingToMerge { count: 0 });
        }

        let path = plan.combined_output_path(extracted.len());
        let pages = extracted.iter().map(ExtractedPages::page_count).sum();
        let mut document = pdf::merge(extracted)?;
        pdf::save_atomically(&mut document, &path)?;

        info!(path = %path.display(), pages, "wrote combined output");

        let combined = ItemOutput {
            root_name: display_stem(&path),
            path,
            pages,
        };
        Ok((batch, Some(combined)))
    }

    fn extract_each<O>(
        &self,
        plan: &RunPlan,
        observer: &mut O,
        progress: &mut BatchProgress,
        batch: &mut BatchResult,
        extracted: &mut Vec<ExtractedPages>,
    ) -> Result<()>
    where
        O: ProgressObserver + ?Sized,
    {
        let selection = &self.config.merge.first_page_pages;

        for document in &plan.documents {
            self.shutdown.check_shutdown()?;

            match pdf::extract(&document.path, selection) {
                Ok(pages) => extracted.push(pages),
                Err(e) => self.record_failure(&document.root_name, e, batch)?,
            }

            progress.finish_item(document.root_name.as_str());
            observer.item_finished(progress);
        }

        Ok(())
    }

    /// Keep going past an item failure under the skip policy; stop otherwise.
    fn record_failure(&self, root_name: &str, error: CombineError, batch: &mut BatchResult) -> Result<()> {
        if self.config.merge.on_error == ErrorPolicy::Skip && error.is_item_failure() {
            warn!(root_name, error = %error, "skipping failed item");
            batch.errors.push(ItemError {
                root_name: root_name.to_string(),
                message: error.user_message(),
            });
            Ok(())
        } else {
            Err(error)
        }
    }
}

/// Walk the pre-batch gates; returns the gate the operator declined, if any.
fn confirm_plan<G>(plan: &RunPlan, gate: &mut G) -> Result<Option<Gate>>
where
    G: ConfirmationGate + ?Sized,
{
    let mut gates = vec![(Gate::Summary, "Is the above information correct?".to_string())];

    if plan.output_state == OutputDirState::NotEmpty {
        gates.push((
            Gate::OverwriteOutput,
            format!(
                "Directory {} already exists and is NOT empty; Continue?",
                plan.output_dir.display()
            ),
        ));
    }

    gates.push((Gate::Start, "Start?".to_string()));

    for (point, prompt) in gates {
        if !gate.confirm(point, &prompt)? {
            return Ok(Some(point));
        }
    }

    Ok(None)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn display_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
