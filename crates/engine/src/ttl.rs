// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! Human lease-duration parsing for `task.claim`/`task.renew` and the
//! `LODESTAR_DEFAULT_TTL` override (§6.5). Accepts a bare integer count of
//! seconds followed by `s`, `m`, or `h`.

use chrono::Duration;
use lodestar_core::LodestarError;

pub fn parse_human_duration(input: &str) -> Result<Duration, LodestarError> {
    let input = input.trim();
    let invalid = || LodestarError::InvalidInput {
        field: "ttl".to_string(),
        reason: format!("{input:?} is not a duration like \"15m\" or \"1h\""),
    };
    if input.is_empty() {
        return Err(invalid());
    }
    let (digits, unit) = input.split_at(input.len() - 1);
    let count: i64 = digits.parse().map_err(|_| invalid())?;
    match unit {
        "s" => Ok(Duration::seconds(count)),
        "m" => Ok(Duration::minutes(count)),
        "h" => Ok(Duration::hours(count)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
#[path = "ttl_tests.rs"]
mod tests;
