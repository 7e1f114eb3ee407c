//! Deterministic artifact naming.
//!
//! Artifact ids are `YYMMDD_HHMM_<base>` with a numeric `_2`, `_3`, …
//! disambiguator appended on collision. The timestamp prefix doubles as the
//! durable record of creation time, which is what makes restart
//! reconciliation possible without persisting schedules. Consumers provide
//! their own uniqueness predicate so the allocation logic stays pure.

use std::future::Future;

use time::{Date, Month, OffsetDateTime, Time};

/// Base name used when neither the caller nor the source text yields one.
pub const DEFAULT_BASE: &str = "dokument";

/// Extension of the generated document file.
pub const DOCUMENT_EXT: &str = "docx";

/// Extension of the paired source-text file.
pub const SOURCE_EXT: &str = "txt";

const MAX_BASE_LEN: usize = 30;
const TIMESTAMP_PREFIX_LEN: usize = 11;

pub fn document_name(id: &str) -> String {
    format!("{id}.{DOCUMENT_EXT}")
}

pub fn source_name(id: &str) -> String {
    format!("{id}.{SOURCE_EXT}")
}

/// `YYMMDD_HHMM` prefix for the given instant.
pub fn timestamp_prefix(now: OffsetDateTime) -> String {
    format!(
        "{:02}{:02}{:02}_{:02}{:02}",
        now.year().rem_euclid(100),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute()
    )
}

/// Parse the creation instant back out of an artifact id or filename.
///
/// Returns `None` when the name does not start with a valid `YYMMDD_HHMM`
/// prefix. Two-digit years are interpreted as 20xx.
pub fn parse_timestamp_prefix(name: &str) -> Option<OffsetDateTime> {
    let prefix = name.get(..TIMESTAMP_PREFIX_LEN)?;
    let bytes = prefix.as_bytes();
    if bytes[6] != b'_' {
        return None;
    }

    let digits = |range: std::ops::Range<usize>| -> Option<u8> {
        prefix.get(range)?.parse().ok()
    };

    let year = i32::from(digits(0..2)?) + 2000;
    let month = Month::try_from(digits(2..4)?).ok()?;
    let day = digits(4..6)?;
    let hour = digits(7..9)?;
    let minute = digits(9..11)?;

    let date = Date::from_calendar_date(year, month, day).ok()?;
    let time = Time::from_hms(hour, minute, 0).ok()?;
    Some(OffsetDateTime::new_utc(date, time))
}

/// Strip an artifact filename down to its id (the stem shared by the
/// document and source-text files).
pub fn artifact_id_of(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(&format!(".{DOCUMENT_EXT}"))
        .or_else(|| file_name.strip_suffix(&format!(".{SOURCE_EXT}")))
}

/// Sanitize a caller-supplied base name: document extensions and markdown
/// symbols are removed, path separators and whitespace collapse to
/// underscores, and the result is capped at 30 characters. Returns `None`
/// when nothing usable remains.
pub fn sanitize_base(raw: &str) -> Option<String> {
    let mut cleaned = raw.trim().to_string();
    for suffix in [".docx", ".doc"] {
        if let Some(stripped) = cleaned.strip_suffix(suffix) {
            cleaned = stripped.to_string();
        }
    }

    let mut base = String::with_capacity(cleaned.len());
    for ch in cleaned.chars() {
        if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            base.push(ch);
        } else if ch.is_whitespace() || ch == '/' || ch == '\\' {
            base.push('_');
        }
        // Markdown markers and other punctuation are dropped outright.
    }

    let base: String = base.trim_matches('_').chars().take(MAX_BASE_LEN).collect();
    let base = base.trim_matches('_').to_string();
    if base.is_empty() { None } else { Some(base) }
}

/// Derive a base name from the first non-empty line of the source text,
/// falling back to [`DEFAULT_BASE`].
pub fn derive_base_from_text(text: &str) -> String {
    text.lines()
        .find(|line| !line.trim().is_empty())
        .and_then(sanitize_base)
        .unwrap_or_else(|| DEFAULT_BASE.to_string())
}

/// Allocate a collision-free artifact id for `(base_name, now)`.
///
/// The `is_unique` predicate must return `true` when the candidate id is not
/// already taken. On collision a monotonic numeric suffix (`_2`, `_3`, …) is
/// appended; the loop terminates because the existing-id set is finite.
pub fn allocate<F>(base_name: Option<&str>, now: OffsetDateTime, mut is_unique: F) -> String
where
    F: FnMut(&str) -> bool,
{
    let base = resolve_base(base_name);
    let candidate = format!("{}_{base}", timestamp_prefix(now));

    if is_unique(&candidate) {
        return candidate;
    }

    let mut attempt: u64 = 2;
    loop {
        let suffixed = format!("{candidate}_{attempt}");
        if is_unique(&suffixed) {
            return suffixed;
        }
        attempt += 1;
    }
}

/// Async variant of [`allocate`] that awaits the uniqueness predicate.
pub async fn allocate_async<F, Fut>(
    base_name: Option<&str>,
    now: OffsetDateTime,
    mut is_unique: F,
) -> String
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = bool>,
{
    let base = resolve_base(base_name);
    let candidate = format!("{}_{base}", timestamp_prefix(now));

    if is_unique(candidate.clone()).await {
        return candidate;
    }

    let mut attempt: u64 = 2;
    loop {
        let suffixed = format!("{candidate}_{attempt}");
        if is_unique(suffixed.clone()).await {
            return suffixed;
        }
        attempt += 1;
    }
}

fn resolve_base(base_name: Option<&str>) -> String {
    base_name
        .and_then(sanitize_base)
        .unwrap_or_else(|| DEFAULT_BASE.to_string())
}
