//! Structured payload reformatting

/// Pretty-print a JSON payload
///
/// The JSON document starts at the first `{` or `[`; any text before it
/// (a timestamp, a level tag) is kept in front of the first line. Returns
/// `None` when the rest does not parse as JSON.
pub fn pretty_print(text: &str) -> Option<Vec<String>> {
    let start = text.find(['{', '['])?;
    let (lead, body) = text.split_at(start);

    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let pretty = serde_json::to_string_pretty(&value).ok()?;

    let mut lines: Vec<String> = pretty.lines().map(str::to_string).collect();
    if let Some(first) = lines.first_mut() {
        first.insert_str(0, lead);
    }
    Some(lines)
}
