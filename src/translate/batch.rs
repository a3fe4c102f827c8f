// Batch reconciliation
//
// A batch of subtitle entries is sent as one newline-joined request and the
// answer is split back by line. The service does not promise to keep the
// line count, so every position without a matching line keeps its original
// text. Index and timing always come from the input entry.

use tracing::{debug, warn};

use super::script::{contains_cjk, to_simplified};
use super::{Outcome, Translator};
use crate::config::{TranslateConfig, TranslationMode};
use crate::subtitle::SubtitleEntry;

/// Languages passed through untouched in per-entry mode
const CHINESE_TAGS: [&str; 2] = ["zh", "zh-TW"];

/// Result of one batch, always the same length and order as the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub entries: Vec<SubtitleEntry>,
    /// At least one request fell back to the original text
    pub degraded: bool,
    /// Entries that kept their text because the answer had too few lines
    pub shortfall: usize,
}

/// Split `entries` into contiguous batches of at most `batch_size`
pub fn partition(entries: &[SubtitleEntry], batch_size: usize) -> std::slice::Chunks<'_, SubtitleEntry> {
    entries.chunks(batch_size.max(1))
}

/// Newline-joined request text for a batch
pub fn join_batch(batch: &[SubtitleEntry]) -> String {
    batch
        .iter()
        .map(|entry| entry.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map `translated` back onto `batch` line by line.
/// Returns the new entries and the number of entries left untranslated.
pub fn reconcile(batch: &[SubtitleEntry], translated: &str) -> (Vec<SubtitleEntry>, usize) {
    let lines: Vec<&str> = translated
        .trim_end_matches(['\r', '\n'])
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let entries: Vec<SubtitleEntry> = batch
        .iter()
        .enumerate()
        .map(|(i, entry)| match lines.get(i) {
            Some(line) => entry.with_content(*line),
            None => entry.clone(),
        })
        .collect();

    let shortfall = batch.len().saturating_sub(lines.len());
    if shortfall > 0 {
        warn!(
            "Translation returned {} lines for {} entries, keeping original text for {} entries starting at #{}",
            lines.len(),
            batch.len(),
            shortfall,
            batch[lines.len()].index
        );
    } else if lines.len() > batch.len() {
        warn!(
            "Translation returned {} lines for {} entries, ignoring the surplus",
            lines.len(),
            batch.len()
        );
    }

    (entries, shortfall)
}

/// Translates batches of entries through a `Translator`
pub struct BatchReconciler<'a> {
    translator: &'a dyn Translator,
    mode: TranslationMode,
    source_language: String,
    target_language: String,
}

impl<'a> BatchReconciler<'a> {
    pub fn new(translator: &'a dyn Translator, config: &TranslateConfig) -> Self {
        Self {
            translator,
            mode: config.mode,
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
        }
    }

    /// Translate one batch according to the configured mode
    pub async fn process(&self, batch: &[SubtitleEntry]) -> BatchOutcome {
        match self.mode {
            TranslationMode::Batch => self.translate_batch(batch).await,
            TranslationMode::PerEntry => self.translate_entries(batch).await,
        }
    }

    /// One request for the whole batch, split back by line
    pub async fn translate_batch(&self, batch: &[SubtitleEntry]) -> BatchOutcome {
        let combined = join_batch(batch);
        let outcome = self
            .translator
            .translate(&combined, &self.source_language, &self.target_language)
            .await;

        if outcome.degraded {
            return BatchOutcome {
                entries: batch.to_vec(),
                degraded: true,
                shortfall: 0,
            };
        }

        let (entries, shortfall) = reconcile(batch, &outcome.value);
        BatchOutcome {
            entries,
            degraded: false,
            shortfall,
        }
    }

    /// Entry by entry: simplify Chinese locally, detect and translate the rest
    pub async fn translate_entries(&self, batch: &[SubtitleEntry]) -> BatchOutcome {
        let mut entries = Vec::with_capacity(batch.len());
        let mut degraded = false;

        for entry in batch {
            let outcome = self.translate_entry(entry).await;
            degraded |= outcome.degraded;
            entries.push(outcome.value);
        }

        BatchOutcome {
            entries,
            degraded,
            shortfall: 0,
        }
    }

    pub async fn translate_entry(&self, entry: &SubtitleEntry) -> Outcome<SubtitleEntry> {
        if entry.content.trim().is_empty() {
            return Outcome::fresh(entry.clone());
        }
        if contains_cjk(&entry.content) {
            debug!("Entry #{} is already Chinese, simplifying locally", entry.index);
            return Outcome::fresh(entry.with_content(to_simplified(&entry.content)));
        }

        let language = self.translator.detect_language(&entry.content).await;
        if CHINESE_TAGS.contains(&language.value.as_str()) {
            return Outcome::fresh(entry.clone());
        }

        let translated = self
            .translator
            .translate(&entry.content, &language.value, &self.target_language)
            .await;
        if translated.degraded {
            warn!("Entry #{} kept its original text", entry.index);
            return Outcome::fallback(entry.clone());
        }
        Outcome::fresh(entry.with_content(translated.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::MockTranslator;
    use std::time::Duration;

    fn entries(texts: &[&str]) -> Vec<SubtitleEntry> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let start = Duration::from_secs(i as u64 * 2);
                SubtitleEntry::new(i as u32 + 1, start, start + Duration::from_secs(1), *text)
            })
            .collect()
    }

    fn config(mode: TranslationMode) -> TranslateConfig {
        TranslateConfig {
            mode,
            ..TranslateConfig::default()
        }
    }

    fn assert_same_frame(output: &[SubtitleEntry], input: &[SubtitleEntry]) {
        assert_eq!(output.len(), input.len());
        for (out, original) in output.iter().zip(input) {
            assert_eq!(out.index, original.index);
            assert_eq!(out.start, original.start);
            assert_eq!(out.end, original.end);
        }
    }

    #[test]
    fn partition_keeps_order_and_sizes() {
        let input = entries(&["a", "b", "c", "d", "e", "f", "g"]);
        let sizes: Vec<usize> = partition(&input, 5).map(<[SubtitleEntry]>::len).collect();
        assert_eq!(sizes, vec![5, 2]);

        let flattened: Vec<u32> = partition(&input, 3).flatten().map(|e| e.index).collect();
        assert_eq!(flattened, (1..=7).collect::<Vec<_>>());
        assert_eq!(partition(&input, 0).count(), 7);
    }

    #[test]
    fn reconcile_maps_lines_by_position() {
        let batch = entries(&["one", "two", "three"]);
        let (output, shortfall) = reconcile(&batch, "一\n二\n三");
        assert_eq!(shortfall, 0);
        let texts: Vec<&str> = output.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(texts, vec!["一", "二", "三"]);
        assert_same_frame(&output, &batch);
    }

    #[test]
    fn shortfall_keeps_original_text() {
        let batch = entries(&["one", "two", "three", "four", "five"]);
        let (output, shortfall) = reconcile(&batch, "一\n二\n三");

        assert_eq!(shortfall, 2);
        let texts: Vec<&str> = output.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(texts, vec!["一", "二", "三", "four", "five"]);
        assert_same_frame(&output, &batch);
    }

    #[test]
    fn surplus_lines_are_ignored() {
        let batch = entries(&["one", "two"]);
        let (output, shortfall) = reconcile(&batch, "一\n二\n三");
        assert_eq!(shortfall, 0);
        assert_eq!(output[1].content, "二");
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn trailing_newline_and_crlf_do_not_shift_lines() {
        let batch = entries(&["one", "two"]);
        let (output, shortfall) = reconcile(&batch, "一\r\n二\r\n");
        assert_eq!(shortfall, 0);
        assert_eq!(output[0].content, "一");
        assert_eq!(output[1].content, "二");
    }

    #[tokio::test]
    async fn batch_sends_joined_text_once() {
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .withf(|text, source, target| text == "one\ntwo\nthree" && source == "auto" && target == "zh")
            .times(1)
            .returning(|_, _, _| Outcome::fresh("一\n二\n三".to_string()));

        let batch = entries(&["one", "two", "three"]);
        let reconciler = BatchReconciler::new(&translator, &config(TranslationMode::Batch));
        let outcome = reconciler.process(&batch).await;

        assert!(!outcome.degraded);
        assert_eq!(outcome.entries[2].content, "三");
        assert_same_frame(&outcome.entries, &batch);
    }

    #[tokio::test]
    async fn failed_batch_keeps_every_entry() {
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .returning(|text, _, _| Outcome::fallback(text.to_string()));

        // Multi-line content must survive a fallback untouched
        let batch = entries(&["line one\nline two", "three", "four"]);
        let reconciler = BatchReconciler::new(&translator, &config(TranslationMode::Batch));
        let outcome = reconciler.process(&batch).await;

        assert!(outcome.degraded);
        assert_eq!(outcome.entries, batch);
    }

    #[tokio::test]
    async fn chinese_entry_never_reaches_the_service() {
        let mut translator = MockTranslator::new();
        translator.expect_detect_language().times(0);
        translator.expect_translate().times(0);

        let batch = entries(&["你好", "這是繁體字"]);
        let reconciler = BatchReconciler::new(&translator, &config(TranslationMode::PerEntry));
        let outcome = reconciler.process(&batch).await;

        assert_eq!(outcome.entries[0].content, "你好");
        assert_eq!(outcome.entries[1].content, "这是繁体字");
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn blank_entry_skips_detection() {
        let mut translator = MockTranslator::new();
        translator.expect_detect_language().times(0);
        translator.expect_translate().times(0);

        let batch = entries(&[""]);
        let reconciler = BatchReconciler::new(&translator, &config(TranslationMode::PerEntry));
        let outcome = reconciler.process(&batch).await;

        assert_eq!(outcome.entries, batch);
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn detected_chinese_passes_through() {
        let mut translator = MockTranslator::new();
        translator
            .expect_detect_language()
            .times(1)
            .returning(|_| Outcome::fresh("zh-TW".to_string()));
        translator.expect_translate().times(0);

        let batch = entries(&["Ni hao"]);
        let reconciler = BatchReconciler::new(&translator, &config(TranslationMode::PerEntry));
        let outcome = reconciler.process(&batch).await;
        assert_eq!(outcome.entries, batch);
    }

    #[tokio::test]
    async fn per_entry_translates_with_detected_source() {
        let mut translator = MockTranslator::new();
        translator
            .expect_detect_language()
            .returning(|_| Outcome::fresh("ja".to_string()));
        translator
            .expect_translate()
            .withf(|text, source, target| text == "ありがとう" && source == "ja" && target == "zh")
            .times(1)
            .returning(|_, _, _| Outcome::fresh("谢谢".to_string()));

        let batch = entries(&["ありがとう"]);
        let reconciler = BatchReconciler::new(&translator, &config(TranslationMode::PerEntry));
        let outcome = reconciler.process(&batch).await;

        assert_eq!(outcome.entries[0].content, "谢谢");
        assert_same_frame(&outcome.entries, &batch);
    }

    #[tokio::test]
    async fn per_entry_failure_is_isolated() {
        let mut translator = MockTranslator::new();
        translator
            .expect_detect_language()
            .returning(|_| Outcome::fallback("auto".to_string()));
        translator.expect_translate().returning(|text, _, _| {
            if text == "broken" {
                Outcome::fallback(text.to_string())
            } else {
                Outcome::fresh(text.to_uppercase())
            }
        });

        let batch = entries(&["fine", "broken", "also fine"]);
        let reconciler = BatchReconciler::new(&translator, &config(TranslationMode::PerEntry));
        let outcome = reconciler.process(&batch).await;

        let texts: Vec<&str> = outcome.entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(texts, vec!["FINE", "broken", "ALSO FINE"]);
        assert!(outcome.degraded);
    }
}
