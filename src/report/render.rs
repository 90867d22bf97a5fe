//! Fixed-layout text summary. Downstream log scrapers match these labels, so the
//! structure must not drift.

use std::fmt::Write as _;

use crate::report::snapshot::MetricsSnapshot;

/// Shown in place of a statistic the snapshot does not carry.
pub const NOT_AVAILABLE: &str = "N/A";

const RULE: &str = "====================================";
const TITLE: &str = "     K6 LOAD TEST SUMMARY";

const RULE_COLOR: &str = "\x1b[1;36m";
const SECTION_COLOR: &str = "\x1b[1;97m";
const RESET: &str = "\x1b[0m";

/// Presentation knobs. Neither changes the report's content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Prefix for every non-blank line.
    pub indent: String,
    /// Wrap rules and section headers in ANSI color codes.
    pub colors: bool,
}

impl RenderOptions {
    /// Options with the given line prefix and color switch.
    #[must_use]
    pub fn new(indent: impl Into<String>, colors: bool) -> Self {
        Self {
            indent: indent.into(),
            colors,
        }
    }

    fn rule(&self) -> String {
        self.paint(RULE_COLOR, RULE)
    }

    fn section(&self, label: &str) -> String {
        self.paint(SECTION_COLOR, label)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Render the summary block. Pure: same snapshot and options, same bytes.
#[must_use]
pub fn render_text(snapshot: &MetricsSnapshot, options: &RenderOptions) -> String {
    let i = options.indent.as_str();
    let d = &snapshot.duration;
    let mut out = String::new();

    let _ = writeln!(out, "{i}{}", options.rule());
    let _ = writeln!(out, "{i}{}", options.paint(SECTION_COLOR, TITLE));
    let _ = writeln!(out, "{i}{}", options.rule());
    out.push('\n');

    let _ = writeln!(out, "{i}{}", options.section("Requests:"));
    let _ = writeln!(out, "{i}  Total: {}", snapshot.request_count);
    let _ = writeln!(out, "{i}  RPS: {}", fixed2(snapshot.request_rate));
    out.push('\n');

    let _ = writeln!(out, "{i}{}", options.section("Response Time (ms):"));
    let _ = writeln!(out, "{i}  Average: {}", fixed2(d.avg));
    let _ = writeln!(out, "{i}  P50: {}", fixed2(d.p50));
    let _ = writeln!(out, "{i}  P95: {}", fixed2(d.p95));
    let _ = writeln!(out, "{i}  P99: {}", fixed2(d.p99));
    let _ = writeln!(out, "{i}  Max: {}", fixed2(d.max));
    out.push('\n');

    let _ = writeln!(out, "{i}{}", options.section("Errors:"));
    let _ = writeln!(out, "{i}  Failed requests: {}", percent(snapshot.failure_rate));
    let _ = writeln!(out, "{i}  Error rate: {}", percent(snapshot.custom_error_rate));
    out.push('\n');

    let vus = snapshot
        .max_concurrency
        .map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string());
    let _ = writeln!(out, "{i}{} {vus}", options.section("Virtual Users:"));
    out.push('\n');

    let _ = writeln!(out, "{i}{}", options.rule());
    out
}

fn fixed2(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.2}"))
}

fn percent(rate: Option<f64>) -> String {
    rate.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |r| format!("{:.2}%", r * 100.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::snapshot::DurationStats;

    fn known_snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            request_count: 1000,
            request_rate: Some(33.33),
            duration: DurationStats {
                avg: Some(120.5),
                p50: Some(100.0),
                p95: Some(250.75),
                p99: Some(400.0),
                max: Some(600.0),
            },
            failure_rate: Some(0.005),
            custom_error_rate: Some(0.002),
            max_concurrency: Some(100),
            engine: None,
        }
    }

    const EXPECTED: &str = "\
====================================
     K6 LOAD TEST SUMMARY
====================================

Requests:
  Total: 1000
  RPS: 33.33

Response Time (ms):
  Average: 120.50
  P50: 100.00
  P95: 250.75
  P99: 400.00
  Max: 600.00

Errors:
  Failed requests: 0.50%
  Error rate: 0.20%

Virtual Users: 100

====================================
";

    fn strip_ansi(text: &str) -> String {
        let mut out = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for t in chars.by_ref() {
                    if t == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn matches_fixed_layout_exactly() {
        let text = render_text(&known_snapshot(), &RenderOptions::default());
        assert_eq!(text, EXPECTED);
    }

    #[test]
    fn indent_prefixes_every_non_blank_line() {
        let text = render_text(&known_snapshot(), &RenderOptions::new(" ", false));
        for line in text.lines() {
            assert!(line.is_empty() || line.starts_with(' '), "{line:?}");
        }
        let unindented: String = text
            .lines()
            .map(|l| l.strip_prefix(' ').unwrap_or(l))
            .collect::<Vec<_>>()
            .join("\n")
            + "\n";
        assert_eq!(unindented, EXPECTED);
    }

    #[test]
    fn colors_never_change_content() {
        let colored = render_text(&known_snapshot(), &RenderOptions::new("  ", true));
        let plain = render_text(&known_snapshot(), &RenderOptions::new("  ", false));
        assert_ne!(colored, plain);
        assert!(colored.contains("\x1b["));
        assert_eq!(strip_ansi(&colored), plain);
    }

    #[test]
    fn rendering_is_idempotent() {
        let snap = known_snapshot();
        let options = RenderOptions::new(" ", true);
        assert_eq!(render_text(&snap, &options), render_text(&snap, &options));
    }

    #[test]
    fn missing_statistics_render_as_sentinel() {
        let snap = MetricsSnapshot::default();
        let text = render_text(&snap, &RenderOptions::default());
        assert!(text.contains("  Total: 0\n"));
        assert!(text.contains("  RPS: N/A\n"));
        for label in ["Average", "P50", "P95", "P99", "Max"] {
            assert!(text.contains(&format!("  {label}: N/A\n")), "{label}");
        }
        assert!(text.contains("  Failed requests: N/A\n"));
        assert!(text.contains("  Error rate: N/A\n"));
        assert!(text.contains("Virtual Users: N/A\n"));
    }
}
