//! Control panel response parsing
//!
//! The panel answers with `&`-joined `key=value` pairs, both sides
//! URL-encoded. `error=0` signals success; on failure the readable
//! message is in `text`, falling back to `details`. Existence checks
//! return the mailbox names as repeated `list` values.

/// Typed view of a parsed control panel response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResponse {
    pub success: bool,
    /// Whether the body carried the panel's `error` field at all.
    /// Proxy and gateway error pages do not, even when they happen to
    /// contain `=` characters, and must not be read as a panel verdict.
    pub recognized: bool,
    pub message: Option<String>,
    pub list: Vec<String>,
}

impl HostResponse {
    /// Failure message, with the panel's default wording when it sent
    /// neither `text` nor `details`.
    pub fn message_or_default(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "unknown mail host error".to_string())
    }
}

fn decode(raw: &str) -> String {
    // '+' means space in this encoding.
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}

/// Parse a response body. Segments split on `&`, each on the first `=`;
/// a segment without `=` becomes a key with an empty value.
pub fn parse_response(body: &str) -> HostResponse {
    let mut error_flag: Option<String> = None;
    let mut text: Option<String> = None;
    let mut details: Option<String> = None;
    let mut list: Vec<String> = Vec::new();

    for segment in body.trim().split('&') {
        if segment.is_empty() {
            continue;
        }

        let (raw_key, raw_value) = segment.split_once('=').unwrap_or((segment, ""));
        let key = decode(raw_key);
        let value = decode(raw_value);

        match key.as_str() {
            "error" => error_flag = Some(value),
            "text" => text = Some(value),
            "details" => details = Some(value),
            // DirectAdmin emits "list[]" for repeated values.
            "list" | "list[]" => list.push(value),
            _ => {}
        }
    }

    HostResponse {
        success: error_flag.as_deref() == Some("0"),
        recognized: error_flag.is_some(),
        message: text.or(details),
        list,
    }
}
