//! Split markdown into sections on level-1 headers

/// One header-delimited chunk of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Level-1 header text; empty for text before the first header
    pub title: String,
    /// Body without the header line, trimmed
    pub text: String,
}

fn is_fence(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("```") || t.starts_with("~~~")
}

fn level1_title(line: &str) -> Option<&str> {
    line.strip_prefix("# ").map(str::trim)
}

/// Split on `# ` headers outside fenced code blocks.
///
/// Deeper headers stay inside their parent section. Sections whose body is
/// blank are dropped.
pub fn split_sections(markdown: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut title = String::new();
    let mut body: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let mut flush = |title: &str, body: &mut Vec<&str>| {
        let text = body.join("\n").trim().to_string();
        if !text.is_empty() {
            sections.push(Section {
                title: title.to_string(),
                text,
            });
        }
        body.clear();
    };

    for line in markdown.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some(t) = level1_title(line) {
                flush(&title, &mut body);
                title = t.to_string();
                continue;
            }
        }
        body.push(line);
    }
    flush(&title, &mut body);
    sections
}
