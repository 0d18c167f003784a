//! JUnit report parsing: XML outcome tallies and the HTML summary duration.

use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use reporthive_core::TestTally;
use std::path::{Path, PathBuf};

static HTML_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*?>").expect("Invalid HTML tag regex"));

/// Counters read from one report file.
#[derive(Debug, Default, Clone, Copy)]
struct FileCounts {
    tests: i64,
    skipped: i64,
    failures: i64,
    flaky: i64,
}

fn attr_i64(element: &BytesStart<'_>, key: &[u8]) -> Option<i64> {
    for attr in element.attributes() {
        let attr = attr.ok()?;
        if attr.key.as_ref() == key {
            return attr.unescape_value().ok()?.trim().parse().ok();
        }
    }
    None
}

/// Parse one JUnit XML document.
///
/// The root element must carry integer `tests`, `skipped`, and `failures`
/// attributes; flaky tests are `<flakyFailure>` children of `<testcase>`
/// elements. Anything missing or malformed yields `None`.
fn parse_report(xml: &str) -> Option<FileCounts> {
    let mut reader = Reader::from_str(xml);
    let mut counts: Option<FileCounts> = None;
    let mut stack: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                handle_element(&element, &stack, &mut counts)?;
                stack.push(element.local_name().as_ref().to_vec());
            }
            Ok(Event::Empty(element)) => {
                handle_element(&element, &stack, &mut counts)?;
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }

    counts
}

fn handle_element(
    element: &BytesStart<'_>,
    stack: &[Vec<u8>],
    counts: &mut Option<FileCounts>,
) -> Option<()> {
    match counts {
        // The first element is the document root carrying the totals.
        None => {
            *counts = Some(FileCounts {
                tests: attr_i64(element, b"tests")?,
                skipped: attr_i64(element, b"skipped")?,
                failures: attr_i64(element, b"failures")?,
                flaky: 0,
            });
        }
        Some(counts) => {
            if element.local_name().as_ref() == b"flakyFailure"
                && stack.last().map(Vec::as_slice) == Some(b"testcase")
            {
                counts.flaky += 1;
            }
        }
    }
    Some(())
}

fn collect_xml_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_xml_files(&path, files);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
}

/// Sum test outcomes over every `*.xml` report below `dir`.
///
/// A directory without parsable reports yields the zero tally; a report file
/// that exists but cannot be interpreted poisons the whole scan to `None`
/// (callers substitute zeros). Failed excludes flaky: a reported failure
/// that also carries a `flakyFailure` entry counts as flaky only.
pub fn scan_junit_xml(dir: &Path) -> Option<TestTally> {
    let mut files = Vec::new();
    collect_xml_files(dir, &mut files);

    let mut total = 0;
    let mut tally = TestTally::default();

    for file in files {
        let xml = std::fs::read_to_string(&file).ok()?;
        let counts = parse_report(&xml)?;
        total += counts.tests;
        tally.skipped += counts.skipped;
        tally.flaky += counts.flaky;
        tally.failed += counts.failures - counts.flaky;
    }

    tally.success = total - tally.flaky - tally.failed;
    Some(tally)
}

/// Parse the elapsed-time token of a JUnit HTML summary (`1h2m3.5s`,
/// `45.2s`, `2m0.5s`, ...) into seconds, rounded to milliseconds.
fn parse_elapsed(token: &str) -> Option<f64> {
    let mut rest = token;

    let hours = match rest.split_once('h') {
        Some((h, tail)) => {
            rest = tail;
            h.parse::<f64>().ok()?
        }
        None => 0.0,
    };

    let minutes = match rest.split_once('m') {
        Some((m, tail)) => {
            rest = tail;
            m.parse::<f64>().ok()?
        }
        None => 0.0,
    };

    let seconds = match rest.split_once('s') {
        Some((s, _)) => s.parse::<f64>().ok()?,
        None => 0.0,
    };

    let total = seconds + minutes * 60.0 + hours * 3600.0;
    Some((total * 1000.0).round() / 1000.0)
}

/// Extract the test duration in seconds from a generated HTML report page.
///
/// The page renders a summary block which, with tags stripped and line
/// breaks removed, collapses into a single token shaped like
/// `Summary12tests2failures0ignored1m30.5sduration85%successful`. Any shape
/// that does not match yields `None`; this is never an error.
pub fn parse_html_duration(path: &Path) -> Option<f64> {
    let html = std::fs::read_to_string(path).ok()?;
    let text = HTML_TAG_REGEX.replace_all(&html, "");
    let text = text.replace(['\r', '\n'], "");

    let summary = text
        .split(' ')
        .find(|part| part.starts_with("Summary") && part.contains("tests"))?;

    let token = summary.split_once("ignored")?.1.split_once("duration")?.0;
    parse_elapsed(token)
}
