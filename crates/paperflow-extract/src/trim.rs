//! Drop the bibliography so it doesn't eat the model's context

use std::sync::LazyLock;

use regex::Regex;

/// A heading naming the references section. Converters sometimes emit
/// letter-spaced headings ("R E F E R E N C E S").
static REFERENCES_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*#+[ \t]*(?:R\s*E\s*F\s*E\s*R\s*E\s*N\s*C\s*E\s*S?|R\s*E\s*F|REFERENCES?|Ref)\b.*$",
    )
    .expect("references pattern should compile")
});

/// Text before the first references heading, trailing whitespace removed.
pub fn main_content(markdown: &str) -> &str {
    let end = REFERENCES_HEADING
        .find(markdown)
        .map_or(markdown.len(), |m| m.start());
    markdown[..end].trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuts_at_references() {
        let md = "# Intro\nText.\n\n# References\n[1] Someone 2020.";
        assert_eq!(main_content(md), "# Intro\nText.");
    }

    #[test]
    fn any_depth_and_case() {
        assert_eq!(main_content("body\n### REFERENCE\nx"), "body");
        assert_eq!(main_content("body\n#references and notes\nx"), "body");
        assert_eq!(main_content("body\n  ## Ref.\nx"), "body");
    }

    #[test]
    fn spaced_letters() {
        assert_eq!(main_content("body\n# R E F E R E N C E S\nx"), "body");
    }

    #[test]
    fn words_starting_with_ref_are_kept() {
        let md = "# Reflections on design\nbody\n# Referee notes\nmore";
        assert_eq!(main_content(md), md);
    }

    #[test]
    fn plain_line_is_not_heading() {
        let md = "See References below.\nReferences\nx";
        assert_eq!(main_content(md), md);
    }

    #[test]
    fn no_heading_keeps_everything() {
        assert_eq!(main_content("only text  \n\n"), "only text");
        assert_eq!(main_content(""), "");
    }
}
