//! Instructions sent with every transcript

pub const SYSTEM_PROMPT: &str = r#"You extract structured information from the transcript of an academic paper.

Read the abstract first to understand the paper's main question. Then identify every hypothesis or research question the paper states, with its independent and dependent variables (comma separated when there are several), the method used to test it, the result and the conclusion. Finally list the paper's keywords and write a short summary of its contributions, method and conclusions.

Only use information present in the transcript. Reply with a single JSON object and nothing else:

{
  "keywords": ["..."],
  "summary": "...",
  "content": [
    {
      "type": "hypothesis | research question",
      "description": "...",
      "iv": "...",
      "iv_description": "...",
      "dv": "...",
      "dv_description": "...",
      "method": "...",
      "result": "...",
      "conclusion": "..."
    }
  ]
}

Use an empty list for "content" when the paper states no hypotheses or research questions."#;

/// User message carrying the transcript.
pub fn transcript_message(text: &str) -> String {
    format!("Below is the transcript of the paper:\n\n{text}")
}
