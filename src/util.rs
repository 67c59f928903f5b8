use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Number of `step`-long rounds needed to cover `total`; zero when either is zero.
pub fn rounds_within(total: Duration, step: Duration) -> u32 {
    if total.is_zero() || step.is_zero() {
        return 0;
    }
    let rounds = total.as_millis().div_ceil(step.as_millis());
    u32::try_from(rounds).unwrap_or(u32::MAX)
}
