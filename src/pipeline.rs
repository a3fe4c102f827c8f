use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::api::Credentials;
use crate::config::Config;
use crate::error::Result;
use crate::subtitle::{read_srt, write_srt, SubtitleEntry};
use crate::translate::batch::partition;
use crate::translate::script::to_simplified;
use crate::translate::{BatchReconciler, Translator, TranslatorFactory};

/// Timing and health of one processed batch
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch: usize,
    pub entries: usize,
    pub elapsed: Duration,
    pub degraded: bool,
    pub shortfall: usize,
}

impl BatchReport {
    pub fn lines_per_second(&self) -> f64 {
        self.entries as f64 / self.elapsed.as_secs_f64().max(0.001)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub entries: usize,
    pub batches: usize,
    pub degraded_batches: usize,
    pub shortfall_entries: usize,
    pub elapsed: Duration,
    pub output: PathBuf,
}

/// Drives a whole subtitle file through the translator
pub struct Pipeline {
    config: Config,
    translator: Box<dyn Translator>,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: Config, credentials: Credentials) -> Result<Self> {
        config.validate()?;
        let translator = TranslatorFactory::create_translator(config.api.clone(), credentials)?;
        Ok(Self::with_translator(config, translator))
    }

    pub fn with_translator(config: Config, translator: Box<dyn Translator>) -> Self {
        Self {
            config,
            translator,
            show_progress: true,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Translate `input` into `output`. The output is written only after every batch is done.
    pub async fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<PipelineSummary> {
        let input = input.as_ref();
        let output = output.as_ref();
        info!("Translating subtitles: {} -> {}", input.display(), output.display());

        let started = Instant::now();
        let entries = read_srt(input).await?;
        let (translated, reports) = self.translate_entries(&entries).await;
        write_srt(&translated, output).await?;

        let summary = PipelineSummary {
            entries: translated.len(),
            batches: reports.len(),
            degraded_batches: reports.iter().filter(|r| r.degraded).count(),
            shortfall_entries: reports.iter().map(|r| r.shortfall).sum(),
            elapsed: started.elapsed(),
            output: output.to_path_buf(),
        };
        info!(
            "Translated {} entries in {} batches ({} degraded, {} entries short) in {:.1?}",
            summary.entries,
            summary.batches,
            summary.degraded_batches,
            summary.shortfall_entries,
            summary.elapsed
        );
        Ok(summary)
    }

    /// Translate entries batch by batch. Output keeps input order even with
    /// several batches in flight.
    pub async fn translate_entries(&self, entries: &[SubtitleEntry]) -> (Vec<SubtitleEntry>, Vec<BatchReport>) {
        let settings = &self.config.translate;
        let reconciler = BatchReconciler::new(self.translator.as_ref(), settings);
        let total_batches = entries.len().div_ceil(settings.batch_size.max(1));
        let progress = self.progress_bar(entries.len() as u64);

        let mut translated = Vec::with_capacity(entries.len());
        let mut reports = Vec::with_capacity(total_batches);

        let mut batches = stream::iter(partition(entries, settings.batch_size).enumerate())
            .map(|(batch_index, batch)| {
                let reconciler = &reconciler;
                async move {
                    let started = Instant::now();
                    let outcome = reconciler.process(batch).await;
                    (batch_index, outcome, started.elapsed())
                }
            })
            .buffered(settings.concurrency.max(1));

        while let Some((batch_index, outcome, elapsed)) = batches.next().await {
            let report = BatchReport {
                batch: batch_index + 1,
                entries: outcome.entries.len(),
                elapsed,
                degraded: outcome.degraded,
                shortfall: outcome.shortfall,
            };

            if report.degraded {
                warn!(
                    "Batch {}/{} fell back to original text for some entries",
                    report.batch, total_batches
                );
            }
            info!(
                "Batch {}/{}: {} entries in {:.2?} ({:.1} lines/s)",
                report.batch,
                total_batches,
                report.entries,
                report.elapsed,
                report.lines_per_second()
            );

            progress.inc(report.entries as u64);
            progress.set_message(format!(
                "batch {}/{} | {:.1} lines/s",
                report.batch,
                total_batches,
                report.lines_per_second()
            ));

            translated.extend(outcome.entries);
            reports.push(report);
        }

        progress.finish_and_clear();
        (translated, reports)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}

/// Convert every entry of `input` to simplified Chinese without any network call
pub async fn simplify_file<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<usize> {
    let entries = read_srt(input).await?;
    let simplified: Vec<SubtitleEntry> = entries
        .iter()
        .map(|entry| entry.with_content(to_simplified(&entry.content)))
        .collect();

    write_srt(&simplified, output).await?;
    Ok(simplified.len())
}

/// `{stem}_{suffix}.srt` next to the input file
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitles".to_string());
    input.with_file_name(format!("{}_{}.srt", stem, suffix))
}
