//! Result formatters, selected by name.

use std::fmt::Write as _;

use preflight_types::{CheckResult, Results, TestLibrary, UserResponse};

pub const FORMAT_JSON: &str = "json";
pub const FORMAT_JUNIT: &str = "junitxml";
pub const FORMAT_TEXT: &str = "text";

/// Every formatter name [`new_by_name`] accepts.
pub const ALL_FORMATS: &[&str] = &[FORMAT_JSON, FORMAT_JUNIT, FORMAT_TEXT];

#[derive(Debug, thiserror::Error)]
pub enum FormatterError {
    #[error("unknown formatter {name:?} (expected one of: {})", ALL_FORMATS.join(", "))]
    Unknown { name: String },

    #[error("{formatter} formatter failed: {source}")]
    Serialize {
        formatter: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub trait ResponseFormatter {
    fn name(&self) -> &'static str;
    /// Extension of the results file, without the dot.
    fn file_extension(&self) -> &'static str;
    fn format(&self, results: &Results) -> Result<Vec<u8>, FormatterError>;
}

pub fn new_by_name(name: &str) -> Result<Box<dyn ResponseFormatter>, FormatterError> {
    match name {
        FORMAT_JSON => Ok(Box::new(JsonFormatter)),
        FORMAT_JUNIT => Ok(Box::new(JunitFormatter)),
        FORMAT_TEXT => Ok(Box::new(TextFormatter)),
        other => Err(FormatterError::Unknown {
            name: other.to_string(),
        }),
    }
}

pub fn test_library() -> TestLibrary {
    TestLibrary {
        name: "preflight".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

pub struct JsonFormatter;

impl ResponseFormatter for JsonFormatter {
    fn name(&self) -> &'static str {
        FORMAT_JSON
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn format(&self, results: &Results) -> Result<Vec<u8>, FormatterError> {
        let response = UserResponse::from_results(results, test_library());
        let mut out = serde_json::to_vec_pretty(&response).map_err(|source| {
            FormatterError::Serialize {
                formatter: FORMAT_JSON,
                source,
            }
        })?;
        out.push(b'\n');
        Ok(out)
    }
}

/// JUnit XML, one `<testsuite>` per image and one `<testcase>` per check.
pub struct JunitFormatter;

impl ResponseFormatter for JunitFormatter {
    fn name(&self) -> &'static str {
        FORMAT_JUNIT
    }

    fn file_extension(&self) -> &'static str {
        "xml"
    }

    fn format(&self, results: &Results) -> Result<Vec<u8>, FormatterError> {
        Ok(render_junit(results).into_bytes())
    }
}

fn render_junit(results: &Results) -> String {
    let total_ms: u64 = all_checks(results).map(|(_, c)| c.elapsed_ms).sum();

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        "<testsuites name=\"preflight\" tests=\"{}\" failures=\"{}\" errors=\"{}\">",
        results.total(),
        results.failed.len(),
        results.errors.len()
    );
    let _ = writeln!(
        out,
        "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{}\" timestamp=\"{}\">",
        escape_xml(&results.tested_image),
        results.total(),
        results.failed.len(),
        results.errors.len(),
        millis_as_secs(total_ms),
        escape_xml(&results.tested_on)
    );
    let _ = writeln!(
        out,
        "    <properties><property name=\"platform\" value=\"{}\"/></properties>",
        escape_xml(&results.platform)
    );

    for (outcome, check) in all_checks(results) {
        let _ = writeln!(
            out,
            "    <testcase classname=\"{}\" name=\"{}\" time=\"{}\">",
            escape_xml(&results.tested_image),
            escape_xml(&check.name),
            millis_as_secs(check.elapsed_ms)
        );
        match outcome {
            Outcome::Passed => {}
            Outcome::Failed => {
                let _ = writeln!(
                    out,
                    "      <failure message=\"{}\" type=\"\">{}</failure>",
                    escape_xml(&check.reason),
                    escape_xml(&check.help)
                );
            }
            Outcome::Errored => {
                let _ = writeln!(
                    out,
                    "      <error message=\"{}\" type=\"\">{}</error>",
                    escape_xml(&check.reason),
                    escape_xml(&check.help)
                );
            }
        }
        let _ = writeln!(
            out,
            "      <system-out>{}</system-out>",
            escape_xml(&check.description)
        );
        out.push_str("    </testcase>\n");
    }

    out.push_str("  </testsuite>\n");
    out.push_str("</testsuites>\n");
    out
}

/// Human-readable summary, one table row per check.
pub struct TextFormatter;

impl ResponseFormatter for TextFormatter {
    fn name(&self) -> &'static str {
        FORMAT_TEXT
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn format(&self, results: &Results) -> Result<Vec<u8>, FormatterError> {
        Ok(render_text(results).into_bytes())
    }
}

fn render_text(results: &Results) -> String {
    let verdict = if results.passed_overall {
        "PASSED"
    } else {
        "FAILED"
    };

    let mut out = String::new();
    let _ = writeln!(out, "## preflight: {verdict}\n");
    let _ = writeln!(
        out,
        "Image `{}` (platform: `{}`, tested on: {})\n",
        escape_md(&results.tested_image),
        escape_md(&results.platform),
        results.tested_on
    );

    if results.total() == 0 {
        out.push_str("No checks ran.\n");
        return out;
    }

    out.push_str("| Result | Check | Elapsed | Details |\n");
    out.push_str("|---|---|---|---|\n");
    for (outcome, check) in all_checks(results) {
        let details = if check.reason.is_empty() {
            escape_md(&check.description)
        } else {
            escape_md(&check.reason)
        };
        let _ = writeln!(
            out,
            "| {} | `{}` | {}ms | {} |",
            outcome.as_str(),
            escape_md(&check.name),
            check.elapsed_ms,
            details
        );
    }
    out.push('\n');
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Passed,
    Failed,
    Errored,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Failed => "FAILED",
            Outcome::Errored => "ERROR",
        }
    }
}

fn all_checks(results: &Results) -> impl Iterator<Item = (Outcome, &CheckResult)> {
    let tag = |o| move |c| (o, c);
    results
        .passed
        .iter()
        .map(tag(Outcome::Passed))
        .chain(results.failed.iter().map(tag(Outcome::Failed)))
        .chain(results.errors.iter().map(tag(Outcome::Errored)))
}

fn millis_as_secs(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Escapes special XML characters in a string.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_md(s: &str) -> String {
    s.replace('|', "\\|").replace('`', "\\`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_testkit::sample_results;

    #[test]
    fn lookup_by_name() {
        assert_eq!(new_by_name("json").unwrap().file_extension(), "json");
        assert_eq!(new_by_name("junitxml").unwrap().name(), "junitxml");
        assert_eq!(new_by_name("text").unwrap().file_extension(), "txt");
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = new_by_name("yaml").err().unwrap();
        assert_eq!(
            err.to_string(),
            "unknown formatter \"yaml\" (expected one of: json, junitxml, text)"
        );
    }

    #[test]
    fn json_output_is_a_user_response() {
        let bytes = JsonFormatter.format(&sample_results::failing()).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["image"], "quay.io/example/app");
        assert_eq!(v["passed"], false);
        assert_eq!(v["test_library"]["name"], "preflight");
        assert_eq!(v["results"]["failed"][0]["name"], "HasTagOrDigest");
        preflight_testkit::validate_user_response_json(&v).unwrap();
    }

    #[test]
    fn junit_counts_and_escapes() {
        let xml = String::from_utf8(JunitFormatter.format(&sample_results::failing()).unwrap())
            .unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("tests=\"3\" failures=\"1\" errors=\"1\""));
        assert!(xml.contains("<failure message=\"image reference has no tag or digest\""));
        assert!(xml.contains("could not evaluate &lt;check&gt; &amp; friends"));
        assert!(xml.trim_end().ends_with("</testsuites>"));
    }

    #[test]
    fn text_table_lists_every_check() {
        let text = String::from_utf8(TextFormatter.format(&sample_results::failing()).unwrap())
            .unwrap();
        assert!(text.starts_with("## preflight: FAILED"));
        assert!(text.contains("| PASSED | `ReferenceIsValid` |"));
        assert!(text.contains("| FAILED | `HasTagOrDigest` |"));
        assert!(text.contains("| ERROR | `Flaky` |"));
    }

    #[test]
    fn text_without_checks() {
        let mut r = sample_results::passing();
        r.passed.clear();
        let text = String::from_utf8(TextFormatter.format(&r).unwrap()).unwrap();
        assert!(text.contains("No checks ran."));
    }

    #[test]
    fn millis_render_as_seconds() {
        assert_eq!(millis_as_secs(0), "0.000");
        assert_eq!(millis_as_secs(1234), "1.234");
    }
}
