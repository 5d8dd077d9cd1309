//! Best-effort cleanup of model replies before JSON parsing

use paperflow_core::ItemError;

use crate::schema::PaperInfo;

/// Outermost `{ ... }` of the reply (drops code fences and chatter around it).
fn outer_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Remove commas directly before `}` or `]`, outside string literals.
fn strip_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in json.char_indices() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let rest = json[i + 1..].trim_start();
                if !(rest.starts_with('}') || rest.starts_with(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Extract the JSON object from a model reply and fix trailing commas.
pub fn repair_json(reply: &str) -> Option<String> {
    outer_object(reply).map(strip_trailing_commas)
}

/// Repair and parse a reply into [`PaperInfo`].
pub fn parse_paper_info(reply: &str) -> Result<PaperInfo, ItemError> {
    let json = repair_json(reply).ok_or_else(|| ItemError::parse("no JSON object in reply"))?;
    serde_json::from_str(&json).map_err(|e| ItemError::parse(format!("invalid paper info: {e}")))
}
