//! Log sanitization: strips clinical values and identifiers from log output.
//!
//! Formatted log lines are scanned for:
//! - Clinical `field=value` / `"field": value` pairs (any of the thirteen form keys)
//! - UUIDs (assessment ids)
//! - Key material (signing seeds, signatures, long hex tokens)
//!
//! The pipeline never passes raw field values to logging calls; this is the
//! fallback for anything that slips through (e.g. a `Debug` dump of a record).
//!
//! Input is capped per call (see `CARDIOGRADE_SANITIZE_MAX_BYTES`).

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<SanitizePatterns> = OnceLock::new();

/// Defaults to 16 KiB; override with `CARDIOGRADE_SANITIZE_MAX_BYTES`.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

const MAX_BYTES_ENV: &str = "CARDIOGRADE_SANITIZE_MAX_BYTES";

struct SanitizePattern {
    regex: Regex,
    replacement: &'static str,
}

struct SanitizePatterns {
    set: RegexSet,
    patterns: Vec<SanitizePattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var(MAX_BYTES_ENV)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn get_patterns() -> &'static SanitizePatterns {
    PATTERNS.get_or_init(|| {
        let rules: Vec<(&'static str, &'static str)> = vec![
            // Clinical form values, plain or JSON-quoted keys
            (
                r#""?\b(age|sex|cp|trestbps|chol|fbs|restecg|thalch|exang|oldpeak|slope|ca|thal)\b"?\s*[:=]\s*(?:"[^"]*"|[^\s,;}\]]+)"#,
                "${1}=[REDACTED]",
            ),
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-UUID]",
            ),
            (
                r"(?i)\b(?:secret|private[_-]?key|seed|signature|sig|key)\b\s*[:=]\s*[A-Za-z0-9+/]{32,}={0,2}",
                "[REDACTED-SECRET]",
            ),
            (r"\b[0-9a-fA-F]{32,}\b", "[REDACTED-KEY]"),
        ];

        // Static patterns; a failure here is a programming error.
        let set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| SanitizePattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        SanitizePatterns { set, patterns }
    })
}

/// Redact clinical values, identifiers and key material from `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let pattern = &patterns.patterns[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .to_string();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check whether `input` contains anything `sanitize` would redact.
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    get_patterns().set.is_match(prefix)
}

/// `MakeWriter` for the fmt layer that redacts clinical `field=value` pairs,
/// UUIDs and key material before anything reaches the log sink.
///
/// Patterns match plain text, so the fmt layer must run with
/// `with_ansi(false)`.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

/// Holds one event's formatted bytes and forwards them a complete line at a
/// time, each passed through [`sanitize`].
///
/// A line that grows past twice `CARDIOGRADE_SANITIZE_MAX_BYTES` without a
/// newline is emitted early, capped and marked `[TRUNCATED]`.
pub struct SanitizingWriter<W> {
    inner: W,
    pending: Vec<u8>,
}

impl<W> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }
}

impl<W> SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let redacted = sanitize(&String::from_utf8_lossy(bytes));
        self.inner.write_all(redacted.as_bytes())
    }

    fn emit_complete_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(())
    }

    fn emit_remainder(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        Ok(())
    }
}

impl<W> std::io::Write for SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);

        if self.pending.len() > max_sanitize_bytes().saturating_mul(2) {
            self.emit_remainder()?;
            self.inner.write_all(b"\n[TRUNCATED]\n")?;
            return Ok(buf.len());
        }

        self.emit_complete_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.emit_complete_lines()?;
        self.emit_remainder()?;
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sanitize_clinical_pairs() {
        let sanitized = sanitize("record age=63 chol=233 cp=\"typical angina\" done");
        assert_eq!(
            sanitized,
            "record age=[REDACTED] chol=[REDACTED] cp=[REDACTED] done"
        );
    }

    #[test]
    fn test_sanitize_json_record() {
        let sanitized = sanitize(r#"{"age":63.0,"sex":"Male","thalch":150}"#);
        assert!(!sanitized.contains("63"));
        assert!(!sanitized.contains("Male"));
        assert!(!sanitized.contains("150"));
        assert!(sanitized.contains("thalch=[REDACTED]"));
    }

    #[test]
    fn test_leaves_pipeline_messages_alone() {
        let line = "Assessment complete: severity=2, confidence=41.20%";
        assert_eq!(sanitize(line), line);
        assert!(!contains_sensitive("Step 2: Encoding and scaling features..."));
        assert!(!contains_sensitive("Loaded softmax classifier from models/severity_model.json"));
    }

    #[test]
    fn test_sanitize_uuid() {
        let sanitized = sanitize("assessment 550e8400-e29b-41d4-a716-446655440000 stored");
        assert!(sanitized.contains("[REDACTED-UUID]"));
        assert!(!sanitized.contains("550e8400"));
    }

    #[test]
    fn test_sanitize_key_material() {
        let sanitized = sanitize("seed=QWxhZGRpbjpvcGVuIHNlc2FtZSB3aXRoIGxvbmcgc2VjcmV0");
        assert!(sanitized.contains("[REDACTED-SECRET]"));

        let sanitized = sanitize("pub 0123456789abcdef0123456789abcdef0123");
        assert!(sanitized.contains("[REDACTED-KEY]"));
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let sanitized = sanitize_with_limit("prefix é suffix that is long", 8);
        assert!(sanitized.ends_with(" [TRUNCATED]"));
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let mut out = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut out);
            writer.write_all(b"first age=").expect("write");
            writer.write_all(b"70\nsecond line\n").expect("write");
            writer.flush().expect("flush");
        }
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "first age=[REDACTED]\nsecond line\n"
        );
    }

    #[test]
    fn test_writer_caps_unterminated_line() {
        let mut out = Vec::new();
        let long = "x".repeat(max_sanitize_bytes() * 2 + 1);
        {
            let mut writer = SanitizingWriter::new(&mut out);
            writer.write_all(long.as_bytes()).expect("write");
            assert!(writer.pending.is_empty());
        }
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.ends_with("[TRUNCATED]\n[TRUNCATED]\n"));
        assert!(text.len() < long.len());
    }
}
