use std::fmt::Write as _;

use serde::Serialize;

use crate::alignment::keyphrase::{KeyPhraseStats, PhraseCounts};
use crate::alignment::scoring::{BatchAggregate, ErrorCounts, FailedItem, ScoreSummary, ScoredPair};
use crate::types::{Alignment, AlignmentOp, OpKind};

const SCHEMA_VERSION: u32 = 1;
const SINGLE_ITEM_ID: &str = "utterance";

const HTML_STYLE: &str = "\
body { font-family: sans-serif; margin: 1.5em; }
table { border-collapse: collapse; margin-bottom: 1em; }
td, th { border: 1px solid #ccc; padding: 2px 8px; text-align: right; }
th:first-child, td:first-child { text-align: left; }
.tokens { line-height: 1.2; margin-bottom: 1.5em; }
.tok { display: inline-block; margin: 2px; padding: 2px 4px; text-align: center; vertical-align: top; }
.tok > span { display: block; min-height: 1.2em; }
.tok .ref { color: #555; font-size: 0.85em; }
.match { background: transparent; }
.substitution { background: #fff59d; }
.insertion { background: #c8e6c9; }
.deletion { background: #ffcdd2; }
.legend .tok { font-size: 0.85em; }
";

#[derive(Debug, Clone, Serialize, Default)]
pub struct Report {
    pub schema_version: u32,
    pub meta: Meta,
    pub summary: SummaryBlock,
    pub key_phrases: KeyPhraseBlock,
    pub items: Vec<ItemReport>,
    pub failures: Vec<FailureEntry>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Meta {
    /// Filled in by the caller; rendering never reads the clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocess_rule: Option<String>,
    pub item_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SummaryBlock {
    /// `None` when the pooled reference is empty.
    pub wer: Option<f64>,
    pub substitution_rate: Option<f64>,
    pub insertion_rate: Option<f64>,
    pub deletion_rate: Option<f64>,
    pub counts: ErrorCounts,
}

impl SummaryBlock {
    fn from_counts(counts: ErrorCounts) -> Self {
        Self {
            wer: counts.wer().ok(),
            substitution_rate: counts.substitution_rate().ok(),
            insertion_rate: counts.insertion_rate().ok(),
            deletion_rate: counts.deletion_rate().ok(),
            counts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyPhraseRow {
    pub phrase: String,
    #[serde(flatten)]
    pub counts: PhraseCounts,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
}

impl KeyPhraseRow {
    fn new(phrase: &str, counts: PhraseCounts) -> Self {
        Self {
            phrase: phrase.to_string(),
            counts,
            precision: counts.precision(),
            recall: counts.recall(),
            f1: counts.f1(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct KeyPhraseBlock {
    pub phrases: Vec<KeyPhraseRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<KeyPhraseRow>,
}

impl KeyPhraseBlock {
    fn from_stats(stats: &[KeyPhraseStats]) -> Self {
        if stats.is_empty() {
            return Self::default();
        }
        let totals: PhraseCounts = stats.iter().map(|s| s.counts).sum();
        Self {
            phrases: stats
                .iter()
                .map(|s| KeyPhraseRow::new(&s.phrase, s.counts))
                .collect(),
            totals: Some(KeyPhraseRow::new("all key phrases", totals)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub id: String,
    pub summary: SummaryBlock,
    pub key_phrases: Vec<KeyPhraseRow>,
    pub edits: String,
    pub ops: Vec<AlignmentOp>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub id: String,
    pub error: String,
}

/// Renders one scored pair. `key_phrase_stats` fills the key-phrase block;
/// pass `&summary.key_phrases` for the usual case.
pub fn render(
    alignment: &Alignment,
    summary: &ScoreSummary,
    key_phrase_stats: &[KeyPhraseStats],
) -> Report {
    let item = item_report(SINGLE_ITEM_ID, alignment, summary, key_phrase_stats);
    let notes = mismatched_notes(key_phrase_stats);
    Report {
        schema_version: SCHEMA_VERSION,
        meta: Meta {
            item_count: 1,
            ..Meta::default()
        },
        summary: SummaryBlock::from_counts(summary.counts),
        key_phrases: KeyPhraseBlock::from_stats(key_phrase_stats),
        items: vec![item],
        failures: Vec::new(),
        notes,
    }
}

/// Renders several scored pairs as independent blocks under one combined
/// summary taken from `aggregate`.
pub fn render_batch(
    items: &[ScoredPair],
    aggregate: &BatchAggregate,
    failures: &[FailedItem],
) -> Report {
    let item_reports = items
        .iter()
        .map(|pair| {
            item_report(
                &pair.id,
                &pair.alignment,
                &pair.summary,
                &pair.summary.key_phrases,
            )
        })
        .collect();

    let mut notes = mismatched_notes(&aggregate.key_phrases);
    if aggregate.counts.reference_len == 0 && !items.is_empty() {
        notes.push("pooled reference is empty; word error rate is undefined".to_string());
    }

    Report {
        schema_version: SCHEMA_VERSION,
        meta: Meta {
            item_count: items.len(),
            failed_count: failures.len(),
            ..Meta::default()
        },
        summary: SummaryBlock::from_counts(aggregate.counts),
        key_phrases: KeyPhraseBlock::from_stats(&aggregate.key_phrases),
        items: item_reports,
        failures: failures
            .iter()
            .map(|failed| FailureEntry {
                id: failed.id.clone(),
                error: failed.error.to_string(),
            })
            .collect(),
        notes,
    }
}

fn item_report(
    id: &str,
    alignment: &Alignment,
    summary: &ScoreSummary,
    key_phrase_stats: &[KeyPhraseStats],
) -> ItemReport {
    ItemReport {
        id: id.to_string(),
        summary: SummaryBlock::from_counts(summary.counts),
        key_phrases: key_phrase_stats
            .iter()
            .map(|s| KeyPhraseRow::new(&s.phrase, s.counts))
            .collect(),
        edits: alignment.edit_string(),
        ops: alignment.ops().to_vec(),
    }
}

fn mismatched_notes(stats: &[KeyPhraseStats]) -> Vec<String> {
    stats
        .iter()
        .filter_map(KeyPhraseStats::diagnostic)
        .map(|err| err.to_string())
        .collect()
}

impl Report {
    /// Three summary lines: total error rate, per-kind details, key phrases.
    pub fn summary_lines(&self) -> [String; 3] {
        let counts = &self.summary.counts;
        let total = match self.summary.wer {
            Some(wer) => format!("Total Error Rate: {}", format_rate(Some(wer))),
            None => "Total Error Rate: undefined (empty reference)".to_string(),
        };
        let details = format!(
            "Details: ref words={}, hyp words={}, matches={}, substitutions={} ({}), insertions={} ({}), deletions={} ({})",
            counts.reference_len,
            counts.hypothesis_len,
            counts.matches,
            counts.substitutions,
            format_rate(self.summary.substitution_rate),
            counts.insertions,
            format_rate(self.summary.insertion_rate),
            counts.deletions,
            format_rate(self.summary.deletion_rate),
        );
        let key_phrases = match self.key_phrases.totals.as_ref() {
            Some(totals) => format!(
                "Key Phrases: occurrences={}, hits={}, misses={}, precision={}, recall={}, F1={}",
                totals.counts.reference_occurrences,
                totals.counts.hits,
                totals.counts.misses,
                format_rate(totals.precision),
                format_rate(totals.recall),
                format_rate(totals.f1),
            ),
            None => "Key Phrases: none tracked".to_string(),
        };
        [total, details, key_phrases]
    }

    /// Plain-text rendering: summary lines, then one REF/HYP/EVAL grid per
    /// item with errors upper-cased and gaps filled with `*`.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for line in self.summary_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        for row in &self.key_phrases.phrases {
            let _ = writeln!(
                out,
                "  {:<24} ref={} hit={} miss={} hyp={} recall={}",
                row.phrase,
                row.counts.reference_occurrences,
                row.counts.hits,
                row.counts.misses,
                row.counts.hypothesis_occurrences,
                format_rate(row.recall),
            );
        }
        for note in &self.notes {
            let _ = writeln!(out, "note: {note}");
        }
        for failure in &self.failures {
            let _ = writeln!(out, "failed: {}: {}", failure.id, failure.error);
        }
        for item in &self.items {
            out.push('\n');
            let _ = writeln!(
                out,
                "== {} WER {} (S={} I={} D={} N={})",
                item.id,
                format_rate(item.summary.wer),
                item.summary.counts.substitutions,
                item.summary.counts.insertions,
                item.summary.counts.deletions,
                item.summary.counts.reference_len,
            );
            out.push_str(&text_grid(&item.ops));
        }
        out
    }

    /// Self-contained HTML document. Every token and message is escaped.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>Transcript alignment report</title>\n<style>\n");
        html.push_str(HTML_STYLE);
        html.push_str("</style>\n</head>\n<body>\n");

        html.push_str("<section class=\"summary\">\n<h2>Summary</h2>\n");
        for line in self.summary_lines() {
            let _ = writeln!(html, "<div>{}</div>", escape_html(&line));
        }
        if let Some(generated_at) = self.meta.generated_at.as_deref() {
            let _ = writeln!(html, "<div>Generated: {}</div>", escape_html(generated_at));
        }
        if let Some(rule) = self.meta.preprocess_rule.as_deref() {
            let _ = writeln!(html, "<div>Preprocessing: {}</div>", escape_html(rule));
        }
        html.push_str(&counts_table(&self.summary));
        html.push_str("</section>\n");

        if !self.key_phrases.phrases.is_empty() {
            html.push_str("<section class=\"key-phrases\">\n<h2>Key phrases</h2>\n");
            html.push_str(&key_phrase_table(&self.key_phrases));
            html.push_str("</section>\n");
        }

        if !self.notes.is_empty() || !self.failures.is_empty() {
            html.push_str("<section class=\"notes\">\n<h2>Notes</h2>\n<ul>\n");
            for note in &self.notes {
                let _ = writeln!(html, "<li>{}</li>", escape_html(note));
            }
            for failure in &self.failures {
                let _ = writeln!(
                    html,
                    "<li class=\"failure\">{}: {}</li>",
                    escape_html(&failure.id),
                    escape_html(&failure.error)
                );
            }
            html.push_str("</ul>\n</section>\n");
        }

        html.push_str("<section class=\"alignments\">\n<h2>Alignments</h2>\n");
        html.push_str(&legend());
        for item in &self.items {
            let _ = writeln!(
                html,
                "<div class=\"item\" id=\"item-{}\">\n<h3>{} (WER {})</h3>",
                escape_html(&item.id),
                escape_html(&item.id),
                escape_html(&format_rate(item.summary.wer)),
            );
            html.push_str("<div class=\"tokens\">");
            for op in &item.ops {
                html.push_str(&op_html(op));
            }
            html.push_str("</div>\n</div>\n");
        }
        html.push_str("</section>\n</body>\n</html>\n");
        html
    }
}

fn counts_table(summary: &SummaryBlock) -> String {
    let counts = &summary.counts;
    let mut table = String::from("<table>\n<tr><th>kind</th><th>count</th><th>rate</th></tr>\n");
    let rows = [
        ("substitutions", counts.substitutions, summary.substitution_rate),
        ("insertions", counts.insertions, summary.insertion_rate),
        ("deletions", counts.deletions, summary.deletion_rate),
    ];
    for (name, count, rate) in rows {
        let _ = writeln!(
            table,
            "<tr><td>{name}</td><td>{count}</td><td>{}</td></tr>",
            format_rate(rate)
        );
    }
    let _ = writeln!(
        table,
        "<tr><td>matches</td><td>{}</td><td></td></tr>\n<tr><td>reference words</td><td>{}</td><td></td></tr>",
        counts.matches, counts.reference_len
    );
    table.push_str("</table>\n");
    table
}

fn key_phrase_table(block: &KeyPhraseBlock) -> String {
    let mut table = String::from(
        "<table>\n<tr><th>phrase</th><th>in reference</th><th>hits</th><th>misses</th><th>in hypothesis</th><th>precision</th><th>recall</th><th>F1</th></tr>\n",
    );
    for row in block.phrases.iter().chain(block.totals.as_ref()) {
        let _ = writeln!(
            table,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&row.phrase),
            row.counts.reference_occurrences,
            row.counts.hits,
            row.counts.misses,
            row.counts.hypothesis_occurrences,
            format_rate(row.precision),
            format_rate(row.recall),
            format_rate(row.f1),
        );
    }
    table.push_str("</table>\n");
    table
}

fn legend() -> String {
    let mut legend = String::from("<div class=\"legend\">");
    for kind in [
        OpKind::Match,
        OpKind::Substitution,
        OpKind::Insertion,
        OpKind::Deletion,
    ] {
        let _ = write!(
            legend,
            "<span class=\"tok {0}\"><span>{0}</span></span>",
            kind_class(kind)
        );
    }
    legend.push_str("</div>\n");
    legend
}

/// Hypothesis on top, reference below. Hypothesis words that do not belong
/// in the transcript are struck through.
fn op_html(op: &AlignmentOp) -> String {
    let hyp = op
        .hypothesis
        .as_ref()
        .map(|token| escape_html(token.as_str()))
        .unwrap_or_else(|| "&nbsp;".to_string());
    let reference = op
        .reference
        .as_ref()
        .map(|token| escape_html(token.as_str()))
        .unwrap_or_else(|| "&nbsp;".to_string());
    let hyp = match op.kind {
        OpKind::Substitution | OpKind::Insertion => format!("<del>{hyp}</del>"),
        OpKind::Match | OpKind::Deletion => hyp,
    };
    format!(
        "<span class=\"tok {class}\" title=\"{class}\"><span class=\"hyp\">{hyp}</span><span class=\"ref\">{reference}</span></span>",
        class = kind_class(op.kind),
    )
}

fn kind_class(kind: OpKind) -> &'static str {
    match kind {
        OpKind::Match => "match",
        OpKind::Substitution => "substitution",
        OpKind::Insertion => "insertion",
        OpKind::Deletion => "deletion",
    }
}

fn text_grid(ops: &[AlignmentOp]) -> String {
    let mut ref_row = String::from("REF: ");
    let mut hyp_row = String::from("HYP: ");
    let mut eval_row = String::from("EVAL:");

    for op in ops {
        let (hyp, reference) = match op.kind {
            OpKind::Match => (
                op.hypothesis.as_ref().map(|t| t.to_string()).unwrap_or_default(),
                op.reference.as_ref().map(|t| t.to_string()).unwrap_or_default(),
            ),
            OpKind::Substitution => (
                op.hypothesis.as_ref().map(|t| t.as_str().to_uppercase()).unwrap_or_default(),
                op.reference.as_ref().map(|t| t.as_str().to_uppercase()).unwrap_or_default(),
            ),
            OpKind::Insertion => (
                op.hypothesis.as_ref().map(|t| t.as_str().to_uppercase()).unwrap_or_default(),
                String::new(),
            ),
            OpKind::Deletion => (
                String::new(),
                op.reference.as_ref().map(|t| t.as_str().to_uppercase()).unwrap_or_default(),
            ),
        };
        let width = hyp.chars().count().max(reference.chars().count()).max(1);
        let hyp = if hyp.is_empty() { "*".repeat(width) } else { hyp };
        let reference = if reference.is_empty() {
            "*".repeat(width)
        } else {
            reference
        };
        let mark = if op.kind.is_error() {
            op.kind.as_char().to_string()
        } else {
            String::new()
        };
        let _ = write!(ref_row, " {}", pad(&reference, width));
        let _ = write!(hyp_row, " {}", pad(&hyp, width));
        let _ = write!(eval_row, " {}", pad(&mark, width));
    }

    let mut out = String::new();
    for row in [ref_row, hyp_row, eval_row] {
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let mut padded = String::with_capacity(width);
    padded.push_str(text);
    padded.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    padded
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(value) => format!("{:.2}%", value * 100.0),
        None => "n/a".to_string(),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::edit_distance::align;
    use crate::alignment::keyphrase::KeyPhrase;
    use crate::alignment::scoring::score;
    use crate::alignment::tokenization::{tokenize, PreprocessRule};
    use crate::error::GradingError;

    const HYP: &str = "hi this is amed and i love eating pancakes with or without a syrup";
    const REF: &str = "hi this is ahmed and i love eating pancakes with or without a syrup";

    fn scored(id: &str, hyp: &str, reference: &str, phrases: &[&str]) -> ScoredPair {
        let rule = PreprocessRule::RemoveComments;
        let alignment = align(&tokenize(hyp, rule), &tokenize(reference, rule));
        let phrases: Vec<KeyPhrase> = phrases
            .iter()
            .map(|p| KeyPhrase::new(p, rule).unwrap())
            .collect();
        let summary = score(&alignment, &phrases);
        ScoredPair {
            id: id.to_string(),
            alignment,
            summary,
        }
    }

    #[test]
    fn render_single_pair_summary() {
        let pair = scored("a", HYP, REF, &["ahmed"]);
        let report = render(&pair.alignment, &pair.summary, &pair.summary.key_phrases);
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.summary.counts.substitutions, 1);
        assert!((report.summary.wer.unwrap() - 1.0 / 14.0).abs() < 1e-12);
        let lines = report.summary_lines();
        assert_eq!(lines[0], "Total Error Rate: 7.14%");
        assert!(lines[1].contains("substitutions=1"));
        assert!(lines[2].contains("misses=1"));
    }

    #[test]
    fn html_marks_substitution_side_by_side() {
        let pair = scored("a", HYP, REF, &[]);
        let html = render(&pair.alignment, &pair.summary, &[]).to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(
            "<span class=\"tok substitution\" title=\"substitution\"><span class=\"hyp\"><del>amed</del></span><span class=\"ref\">ahmed</span></span>"
        ));
        assert!(html.contains(
            "<span class=\"tok match\" title=\"match\"><span class=\"hyp\">syrup</span><span class=\"ref\">syrup</span></span>"
        ));
        assert!(!html.contains("class=\"key-phrases\""));
    }

    #[test]
    fn html_escapes_tokens() {
        let pair = scored("<x>", "a <b>", "a c&d", &[]);
        let html = render(&pair.alignment, &pair.summary, &[]).to_html();
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains("c&amp;d"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn insertion_and_deletion_render_empty_side() {
        let inserted = scored("a", "x a", "a", &[]);
        let html = render(&inserted.alignment, &inserted.summary, &[]).to_html();
        assert!(html.contains(
            "<span class=\"tok insertion\" title=\"insertion\"><span class=\"hyp\"><del>x</del></span><span class=\"ref\">&nbsp;</span></span>"
        ));

        let deleted = scored("b", "a", "a b", &[]);
        let html = render(&deleted.alignment, &deleted.summary, &[]).to_html();
        assert!(html.contains(
            "<span class=\"tok deletion\" title=\"deletion\"><span class=\"hyp\">&nbsp;</span><span class=\"ref\">b</span></span>"
        ));
    }

    #[test]
    fn text_grid_aligns_columns() {
        let pair = scored("a", "a x c", "a b c d", &[]);
        let report = render(&pair.alignment, &pair.summary, &[]);
        let text = report.to_text();
        assert!(text.contains("REF:  a B c D\n"));
        assert!(text.contains("HYP:  a X c *\n"));
        assert!(text.contains("EVAL:   S   D\n"));
    }

    #[test]
    fn batch_report_has_blocks_under_one_summary() {
        let items = vec![
            scored("short", "a x", "a b", &["b"]),
            scored("long", "a b c d e f g h", "a b c d e f g h", &["b"]),
        ];
        let aggregate: BatchAggregate = items.iter().map(|p| &p.summary).collect();
        let failures = vec![FailedItem {
            id: "bad".to_string(),
            error: GradingError::InvalidPreprocessingRule {
                name: "x".to_string(),
                expected: "identity",
            },
        }];
        let report = render_batch(&items, &aggregate, &failures);
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.meta.failed_count, 1);
        assert!((report.summary.wer.unwrap() - 0.1).abs() < 1e-12);
        let totals = report.key_phrases.totals.as_ref().unwrap();
        assert_eq!(totals.counts.reference_occurrences, 2);
        assert_eq!(totals.counts.hits, 1);

        let html = report.to_html();
        assert_eq!(html.matches("<div class=\"item\"").count(), 2);
        assert_eq!(html.matches("<section class=\"summary\">").count(), 1);
        assert!(html.contains("class=\"failure\">bad:"));
    }

    #[test]
    fn empty_reference_renders_undefined() {
        let pair = scored("a", "words here", "", &["ahmed"]);
        let report = render(&pair.alignment, &pair.summary, &pair.summary.key_phrases);
        assert!(report.summary.wer.is_none());
        assert_eq!(
            report.summary_lines()[0],
            "Total Error Rate: undefined (empty reference)"
        );
        assert_eq!(report.notes.len(), 1);
        assert!(report.notes[0].contains("ahmed"));
    }

    #[test]
    fn report_serializes_to_json() {
        let pair = scored("a", HYP, REF, &["ahmed"]);
        let report = render(&pair.alignment, &pair.summary, &pair.summary.key_phrases);
        let value = serde_json::to_value(&report).expect("serializable report");
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["items"][0]["edits"], "MMMSMMMMMMMMMM");
        assert_eq!(value["items"][0]["ops"][3]["kind"], "substitution");
        assert_eq!(value["key_phrases"]["phrases"][0]["misses"], 1);
        assert!(value["meta"].get("generated_at").is_none());
    }
}
