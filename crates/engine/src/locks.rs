// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! Advisory lock-overlap detection for `task.claim` (§3.1): `locks` is an
//! ordered list of path-glob strings "used only to generate warnings on
//! claim" — never to reject one.

use globset::{Glob, GlobSetBuilder};

/// True if any glob in `a` matches one of `b`'s pattern strings taken as a
/// literal candidate path, or vice versa. There is no filesystem to
/// consult at claim time, only the two lock lists, so glob-vs-glob
/// intersection is approximated by testing each side's patterns as literal
/// paths against the other side's glob set.
pub fn overlaps(a: &[String], b: &[String]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    any_glob_matches(a, b) || any_glob_matches(b, a)
}

fn any_glob_matches(globs: &[String], candidates: &[String]) -> bool {
    let mut builder = GlobSetBuilder::new();
    let mut built_any = false;
    for pattern in globs {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
            built_any = true;
        }
    }
    if !built_any {
        return false;
    }
    let Ok(set) = builder.build() else {
        return false;
    };
    candidates.iter().any(|c| set.is_match(c.as_str()))
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
