//! Raw check-output parsing.
//!
//! Converts the text produced by a test or lint run into structured
//! [`Failure`] records. Strategies are tried in order and the first one
//! that yields results wins; stack traces are the most information-dense
//! source and are preferred when present. Empty or malformed input yields
//! an empty list, never an error.

use regex::Regex;
use tracing::debug;

use crate::domain::{Failure, Language, UNKNOWN_LINE};

/// Lines scanned backward from a stack frame for the assertion message.
const MESSAGE_WINDOW: usize = 10;

/// Parse raw check output into failures.
pub fn parse(raw_output: &str, language: Language) -> Vec<Failure> {
    if raw_output.trim().is_empty() {
        return Vec::new();
    }
    let lines: Vec<&str> = raw_output.lines().collect();

    let failures = parse_stack_traces(&lines);
    if !failures.is_empty() {
        debug!(count = failures.len(), "parsed failures from stack traces");
        return failures;
    }

    let failures = parse_summary(&lines);
    if !failures.is_empty() {
        debug!(count = failures.len(), "parsed failures from summary");
        return failures;
    }

    parse_framework_lines(&lines, language)
}

/// Strategy 1: stack frames referencing a test file with line:column.
///
/// Matches frames like `at Object.toBe (src/__tests__/sum.test.ts:6:23)`,
/// then walks a small window backward for an `Expected:`/`Received:`-style
/// assertion line to use as the message.
fn parse_stack_traces(lines: &[&str]) -> Vec<Failure> {
    let frame_re =
        Regex::new(r"at\s+[\w.$\[\]<> ]+\s*\(([^()]+\.(?:test|spec)\.[A-Za-z0-9]+):(\d+):(\d+)\)")
            .unwrap();

    let mut failures = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !line.contains("at ") {
            continue;
        }
        let Some(caps) = frame_re.captures(line) else {
            continue;
        };
        let file = caps[1].to_string();
        let line_num: u32 = caps[2].parse().unwrap_or(UNKNOWN_LINE);

        let mut message = "Test failed".to_string();
        for prev in lines[i.saturating_sub(MESSAGE_WINDOW)..i].iter().rev() {
            let trimmed = prev.trim();
            if trimmed.contains("Expected:")
                || trimmed.contains("Received:")
                || trimmed.contains("expect(received)")
            {
                message = trimmed.to_string();
                break;
            }
        }

        failures.push(Failure {
            file,
            line: line_num,
            message,
            check: "jest-test".to_string(),
        });
    }
    failures
}

/// Strategy 2: results-summary line with a failure count.
///
/// Locates `Tests:  N failed, ...` and walks backward collecting
/// `FAIL <path>` lines until the declared count or start of output.
fn parse_summary(lines: &[&str]) -> Vec<Failure> {
    let count_re = Regex::new(r"(\d+)\s+failed").unwrap();
    let fail_re = Regex::new(r"FAIL\s+(\S+\.(?:test|spec)\.[A-Za-z0-9]+)").unwrap();

    let mut failures = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !(line.contains("Tests:") && line.contains("failed")) {
            continue;
        }
        let Some(caps) = count_re.captures(line) else {
            continue;
        };
        let fail_count: usize = caps[1].parse().unwrap_or(0);

        for prev in lines[..i].iter().rev() {
            if failures.len() >= fail_count {
                break;
            }
            if !prev.contains("FAIL") {
                continue;
            }
            if let Some(file_caps) = fail_re.captures(prev) {
                failures.push(Failure {
                    file: file_caps[1].to_string(),
                    line: 1,
                    message: "Test failed (see test file)".to_string(),
                    check: "jest-test".to_string(),
                });
            }
        }
    }
    failures
}

/// Strategy 3: per-framework failure marker lines.
///
/// For Python, matches pytest's `FAILED <path>.py::<test>` markers; the
/// message is the following line when present.
fn parse_framework_lines(lines: &[&str], language: Language) -> Vec<Failure> {
    let marker_re = match language {
        Language::Python => Regex::new(r"FAILED\s+(\S+\.py)::(\w+)").unwrap(),
        // JavaScript output is fully covered by the first two strategies.
        Language::JavaScript => return Vec::new(),
    };

    let mut failures = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = marker_re.captures(line) else {
            continue;
        };
        let message = lines
            .get(i + 1)
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .unwrap_or("Test failed")
            .to_string();

        failures.push(Failure {
            file: caps[1].to_string(),
            line: UNKNOWN_LINE,
            message,
            check: caps[2].to_string(),
        });
    }
    failures
}

/// Parse lint-runner JSON output into failures.
///
/// Accepts ESLint's array format and flake8's object format, one JSON
/// document per line; anything unparseable is skipped.
pub fn parse_lint_json(raw_output: &str) -> Vec<Failure> {
    let mut failures = Vec::new();
    for line in raw_output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
            continue;
        };

        if let Some(results) = value.as_array() {
            // ESLint: [{"filePath": ..., "messages": [{"line": ..., "message": ...}]}]
            for result in results {
                let file = result
                    .get("filePath")
                    .and_then(|f| f.as_str())
                    .unwrap_or_default();
                let Some(messages) = result.get("messages").and_then(|m| m.as_array()) else {
                    continue;
                };
                for msg in messages {
                    failures.push(Failure {
                        file: file.to_string(),
                        line: msg.get("line").and_then(|l| l.as_u64()).unwrap_or(0) as u32,
                        message: msg
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or("Lint violation")
                            .to_string(),
                        check: "linting".to_string(),
                    });
                }
            }
        } else if let Some(files) = value.as_object() {
            // flake8: {"path.py": [{"line_number": ..., "text": ...}]}
            for (file, issues) in files {
                let Some(issues) = issues.as_array() else {
                    continue;
                };
                for issue in issues {
                    failures.push(Failure {
                        file: file.clone(),
                        line: issue
                            .get("line_number")
                            .and_then(|l| l.as_u64())
                            .unwrap_or(0) as u32,
                        message: issue
                            .get("text")
                            .and_then(|t| t.as_str())
                            .unwrap_or("Lint violation")
                            .to_string(),
                        check: "linting".to_string(),
                    });
                }
            }
        }
    }
    failures
}
