//! Session log: append-only raw lines and their classification for display.

/// Display severity of a log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Neutral,
    Info,
    Success,
    Warning,
    Error,
}

/// A classified log line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Text between the leading brackets, empty if the line has none.
    pub time: String,
    pub severity: Severity,
    pub text: String,
}

/// Marker classes in match priority. Markers are lowercase; matching is
/// case-insensitive. Summary must stay ahead of success: a summary line
/// reports counts and is shown as info even when it says 成功.
const RULES: &[(Severity, &[&str])] = &[
    (Severity::Error, &["错误", "error", "failed"]),
    (Severity::Warning, &["警告", "warning"]),
    (Severity::Info, &["汇总:"]),
    (Severity::Success, &["成功", "success"]),
];

/// Split `"[<time>] <text>"` and resolve its severity.
pub fn classify(line: &str) -> LogEntry {
    let (time, text) = split_time(line);
    let lower = text.to_lowercase();
    let severity = RULES
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(sev, _)| *sev)
        .unwrap_or(Severity::Neutral);
    LogEntry {
        time: time.to_string(),
        severity,
        text: text.to_string(),
    }
}

fn split_time(line: &str) -> (&str, &str) {
    if let Some(rest) = line.strip_prefix('[')
        && let Some(end) = rest.find(']')
    {
        return (&rest[..end], rest[end + 1..].trim_start());
    }
    ("", line)
}

/// Ordered, append-only session log. Lines are stored as composed
/// (`"[HH:MM:SS] message"`) and classified only when read.
#[derive(Clone, Debug, Default)]
pub struct LogBook {
    lines: Vec<String>,
}

impl LogBook {
    /// Append `message` stamped with the local wall-clock time.
    pub fn push(&mut self, message: impl AsRef<str>) {
        let now = chrono::Local::now().format("%H:%M:%S").to_string();
        self.push_at(&now, message);
    }

    /// Append `message` with an explicit time stamp.
    pub fn push_at(&mut self, time: &str, message: impl AsRef<str>) {
        let line = format!("[{}] {}", time, message.as_ref());
        tracing::debug!("session log: {line}");
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Classified view of the last `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<LogEntry> {
        let lines = self.lines();
        let start = lines.len().saturating_sub(n);
        lines[start..].iter().map(|l| classify(l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localized_error_line() {
        let e = classify("[10:00:01] 错误: 文件格式不支持");
        assert_eq!(e.severity, Severity::Error);
        assert_eq!(e.text, "错误: 文件格式不支持");
        assert_eq!(e.time, "10:00:01");
    }

    #[test]
    fn english_markers_are_case_insensitive() {
        assert_eq!(classify("[t] Upload FAILED").severity, Severity::Error);
        assert_eq!(classify("[t] Warning: empty row").severity, Severity::Warning);
        assert_eq!(classify("[t] SUCCESS").severity, Severity::Success);
    }

    #[test]
    fn error_beats_warning_and_success() {
        let e = classify("[t] 警告 then error after 成功");
        assert_eq!(e.severity, Severity::Error);
        assert_eq!(classify("[t] warning: partial success").severity, Severity::Warning);
    }

    #[test]
    fn summary_beats_success() {
        let e = classify("[09:12:00] [a.xlsx] 汇总: 店铺 3, 成功 2");
        assert_eq!(e.severity, Severity::Info);
    }

    #[test]
    fn unmarked_line_is_neutral() {
        let e = classify("[09:12:00] [a.xlsx] 开始处理...");
        assert_eq!(e.severity, Severity::Neutral);
        assert_eq!(e.text, "[a.xlsx] 开始处理...");
    }

    #[test]
    fn line_without_time_keeps_whole_text() {
        let e = classify("plain text");
        assert_eq!(e.time, "");
        assert_eq!(e.text, "plain text");
    }

    #[test]
    fn log_book_preserves_order_and_duplicates() {
        let mut log = LogBook::default();
        log.push_at("10:00:00", "b");
        log.push_at("10:00:00", "a");
        log.push_at("10:00:00", "a");
        assert_eq!(log.lines(), ["[10:00:00] b", "[10:00:00] a", "[10:00:00] a"]);
        let tail = log.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].text, "a");
        // classification never rewrites the stored line
        assert_eq!(log.lines()[0], "[10:00:00] b");
    }
}
