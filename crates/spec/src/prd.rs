// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The PRD context resolver (§4.E): resolves a task's PRD refs against an
//! external Markdown document, hashes the document to detect drift, and
//! assembles a caller-facing context bundle with a character budget.

use lodestar_core::{PrdBinding, PrdRef};
use sha2::{Digest, Sha256};

/// A heading-derived section of the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSection {
    pub anchor: String,
    pub text: String,
    pub warning: Option<String>,
}

/// Slugify a Markdown heading the way GitHub does: lowercase, spaces to
/// hyphens, strip everything that isn't alphanumeric or a hyphen.
fn slugify(heading_text: &str) -> String {
    let lowered = heading_text.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut last_was_hyphen = false;
    for c in lowered.chars() {
        if c.is_alphanumeric() {
            slug.push(c);
            last_was_hyphen = false;
        } else if c.is_whitespace() || c == '-' {
            if !last_was_hyphen && !slug.is_empty() {
                slug.push('-');
                last_was_hyphen = true;
            }
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

struct Heading {
    level: usize,
    slug: String,
    line: usize,
}

fn headings(source: &str) -> Vec<Heading> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let trimmed = line.trim_start();
            let level = trimmed.chars().take_while(|c| *c == '#').count();
            if level == 0 || level > 6 {
                return None;
            }
            let text = trimmed[level..].trim();
            if text.is_empty() {
                return None;
            }
            Some(Heading { level, slug: slugify(text), line: i })
        })
        .collect()
}

/// Resolve a section by anchor: from the matching heading through the line
/// before the next heading of the same or higher level.
fn extract_by_anchor(source: &str, anchor: &str) -> Option<String> {
    let target = anchor.trim_start_matches('#');
    let lines: Vec<&str> = source.lines().collect();
    let all_headings = headings(source);
    let (idx, heading) = all_headings.iter().enumerate().find(|(_, h)| h.slug == target)?;
    let end = all_headings[idx + 1..]
        .iter()
        .find(|h| h.level <= heading.level)
        .map(|h| h.line)
        .unwrap_or(lines.len());
    Some(lines[heading.line..end].join("\n"))
}

fn extract_by_lines(source: &str, start: u32, end: u32) -> (String, bool) {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len() as u32;
    let clamped_end = end.min(total.max(1));
    let past_eof = end > total;
    let start_idx = start.saturating_sub(1).min(lines.len() as u32) as usize;
    let end_idx = clamped_end.min(lines.len() as u32) as usize;
    let text = if start_idx < end_idx { lines[start_idx..end_idx].join("\n") } else { String::new() };
    (text, past_eof)
}

/// Resolve every ref on a task's PRD binding into a [`LiveSection`]. Missing
/// anchors produce a warning rather than failing the whole call (§4.E).
pub fn extract_sections(source: &str, refs: &[PrdRef]) -> Vec<LiveSection> {
    refs.iter()
        .map(|r| {
            if let Some((start, end)) = r.lines {
                let (text, past_eof) = extract_by_lines(source, start, end);
                let warning = past_eof.then(|| format!("ref {:?} line range extends past EOF", r.anchor));
                LiveSection { anchor: r.anchor.clone(), text, warning }
            } else {
                match extract_by_anchor(source, &r.anchor) {
                    Some(text) => LiveSection { anchor: r.anchor.clone(), text, warning: None },
                    None => LiveSection {
                        anchor: r.anchor.clone(),
                        text: String::new(),
                        warning: Some(format!("anchor {:?} not found", r.anchor)),
                    },
                }
            }
        })
        .collect()
}

/// Deterministic digest of the full source bytes.
pub fn hash(source: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    pub changed: bool,
    /// Refs whose anchor disappeared or whose line range now extends past
    /// EOF, populated only when `changed` is true.
    pub affected_refs: Vec<String>,
}

pub fn drift(source: &str, binding: &PrdBinding) -> DriftReport {
    let current_hash = hash(source.as_bytes());
    let changed = current_hash != binding.hash;
    let affected_refs = if changed {
        extract_sections(source, &binding.refs)
            .into_iter()
            .filter(|s| s.warning.is_some())
            .map(|s| s.anchor)
            .collect()
    } else {
        Vec::new()
    };
    DriftReport { changed, affected_refs }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredContext {
    pub excerpt: String,
    pub live_sections: Vec<LiveSection>,
    pub body: String,
    pub truncated: bool,
    pub drift: DriftReport,
}

/// Assemble the excerpt, freshly-resolved live sections, and a concatenated
/// body trimmed to `char_budget` characters.
pub fn deliver(source: &str, binding: &PrdBinding, char_budget: usize) -> DeliveredContext {
    let live_sections = extract_sections(source, &binding.refs);
    let drift_report = drift(source, binding);
    let mut body = String::new();
    for section in &live_sections {
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(&section.text);
    }
    let truncated = body.chars().count() > char_budget;
    let body = if truncated { body.chars().take(char_budget).collect() } else { body };
    DeliveredContext { excerpt: binding.excerpt.clone(), live_sections, body, truncated, drift: drift_report }
}

#[cfg(test)]
#[path = "prd_tests.rs"]
mod tests;
