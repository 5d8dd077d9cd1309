//! Paper markdown → embeddable chunks

use paperflow_mineru::split_sections;

/// One section of one paper, ready to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub paper_id: String,
    pub paper_title: String,
    /// Level-1 header the text sits under ("" before the first header)
    pub section: String,
    pub text: String,
}

/// Stable chunk id: same paper and position always hash to the same id.
pub fn chunk_id(paper_id: &str, ordinal: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(paper_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(ordinal as u64).to_le_bytes());
    hasher.finalize().to_hex().as_str()[..32].to_string()
}

/// Split a paper into section chunks; blank sections are dropped.
pub fn chunk_paper(paper_id: &str, paper_title: &str, markdown: &str) -> Vec<Chunk> {
    split_sections(markdown)
        .into_iter()
        .enumerate()
        .map(|(i, s)| Chunk {
            id: chunk_id(paper_id, i),
            paper_id: paper_id.to_string(),
            paper_title: paper_title.to_string(),
            section: s.title,
            text: s.text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_and_distinct() {
        assert_eq!(chunk_id("12", 0), chunk_id("12", 0));
        assert_ne!(chunk_id("12", 0), chunk_id("12", 1));
        assert_ne!(chunk_id("12", 0), chunk_id("120", 0));
        assert_eq!(chunk_id("12", 0).len(), 32);
    }

    #[test]
    fn chunks_carry_paper_metadata() {
        let md = "Preamble\n# Intro\nHello\n# Empty\n\n# Method\nSurvey";
        let chunks = chunk_paper("5", "A Paper", md);
        let sections: Vec<&str> = chunks.iter().map(|c| c.section.as_str()).collect();
        assert_eq!(sections, ["", "Intro", "Method"]);
        assert!(chunks.iter().all(|c| c.paper_id == "5" && c.paper_title == "A Paper"));
        assert_eq!(chunks[2].id, chunk_id("5", 2));
    }

    #[test]
    fn blank_document_has_no_chunks() {
        assert!(chunk_paper("1", "", "\n\n").is_empty());
    }
}
