//! Response line parsing.
//!
//! The daemon answers every command with newline-delimited text lines.
//! Scan responses follow a fixed grammar:
//!
//! ```text
//! <path>: [<description> [(<hash>:<size>)] ]<status>
//! ```
//!
//! where `status` is `OK`, `FOUND` or `ERROR`, `path`, `description`
//! and `hash` contain no colon, and `size` is a decimal integer. The
//! signature group only appears together with a description, and a
//! description may appear without a group. Matching is anchored: the
//! entire line must fit the grammar.
//!
//! Parsing never fails. A line outside the grammar yields a record
//! with [`ScanStatus::ParseError`] and the raw text preserved, so one
//! malformed line cannot abort a multi-line response.

/// Scan outcome reported by a single response line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// No virus found.
    Ok,
    /// A virus was found.
    Found,
    /// The daemon reported a scanning error.
    Error,
    /// The line did not match the response grammar.
    ParseError,
}

impl ScanStatus {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "OK" => Some(Self::Ok),
            "FOUND" => Some(Self::Found),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    /// The wire token for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Found => "FOUND",
            Self::Error => "ERROR",
            Self::ParseError => "PARSE ERROR",
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// The raw response line, trimmed of trailing whitespace.
    pub raw: String,
    /// Path of the scanned file; empty when not applicable.
    pub path: String,
    /// Human-readable description (the signature name on a match).
    pub description: String,
    /// Hash of the matched content; empty unless reported.
    pub hash: String,
    /// Size in bytes of the matched content; zero unless reported.
    pub size: u64,
    /// Scan status for this line.
    pub status: ScanStatus,
}

impl ScanResult {
    fn parse_error(raw: &str, description: impl Into<String>) -> Self {
        Self {
            raw: raw.to_string(),
            path: String::new(),
            description: description.into(),
            hash: String::new(),
            size: 0,
            status: ScanStatus::ParseError,
        }
    }
}

/// Parse one response line into a [`ScanResult`]. Never fails.
pub fn parse_response_line(line: &str) -> ScanResult {
    match parse_line(line) {
        Ok(result) => result,
        Err(description) => ScanResult::parse_error(line, description),
    }
}

/// Single-pass anchored parse. `Err` carries the diagnostic for the
/// resulting PARSE ERROR record.
fn parse_line(line: &str) -> Result<ScanResult, String> {
    const NO_MATCH: &str = "response did not match the expected grammar";

    // `<path>: ` - path is non-empty and colon-free, so it ends at the
    // first colon, which must be followed by a space.
    let colon = line.find(':').ok_or(NO_MATCH)?;
    let path = &line[..colon];
    if path.is_empty() {
        return Err(NO_MATCH.to_string());
    }
    let rest = line[colon + 1..].strip_prefix(' ').ok_or(NO_MATCH)?;

    // Bare status form: `<path>: OK`
    if let Some(status) = ScanStatus::from_token(rest) {
        return Ok(ScanResult {
            raw: line.to_string(),
            path: path.to_string(),
            description: String::new(),
            hash: String::new(),
            size: 0,
            status,
        });
    }

    // Description form: `<desc>[ (<hash>:<size>)] <status>` - the
    // status is the token after the last space.
    let (body, status_token) = rest.rsplit_once(' ').ok_or(NO_MATCH)?;
    if body.is_empty() {
        return Err(NO_MATCH.to_string());
    }
    let status = ScanStatus::from_token(status_token)
        .ok_or_else(|| format!("invalid status field: {status_token}"))?;

    let (description, hash, size) = parse_body(body).ok_or(NO_MATCH)?;

    Ok(ScanResult {
        raw: line.to_string(),
        path: path.to_string(),
        description: description.to_string(),
        hash: hash.to_string(),
        size,
        status,
    })
}

/// Split the description body into `(desc, hash, size)`.
///
/// A colon in the body is only legal as the separator inside a
/// trailing `(<hash>:<size>)` group. The description itself may
/// contain parentheses, so the group opens at the last `(` before the
/// colon.
fn parse_body(body: &str) -> Option<(&str, &str, u64)> {
    let Some(colon) = body.find(':') else {
        // No signature group; the whole body is the description.
        return Some((body, "", 0));
    };

    if body[colon + 1..].contains(':') || !body.ends_with(')') {
        return None;
    }

    let size_digits = &body[colon + 1..body.len() - 1];
    if size_digits.is_empty() || !size_digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let open = body[..colon].rfind('(')?;
    let description = &body[..open];
    let hash = &body[open + 1..colon];
    if description.is_empty() || hash.is_empty() {
        return None;
    }

    // Overflow of the numeric field is silently treated as zero.
    let size = size_digits.parse().unwrap_or(0);

    Some((description, hash, size))
}
