//! Fixed prompt text and grounding-block rendering.

use ragline_core::retrieval::DocumentRecord;

/// System prompt for turning the latest question into a search query.
pub const QUERY_SYSTEM_PROMPT: &str = "You are a helpful AI assistant, generate search query for followup question.
Make your respond simple and precise. Return the query only, do not return any other text.
e.g.
Northwind Health Plus AND standard plan.
standard plan AND dental AND employee benefit.
";

/// System prompt for the grounded answer.
pub const ANSWER_SYSTEM_PROMPT: &str =
    "You are a system assistant who helps the company employees with their questions. Be brief in your answers";

/// System prompt for follow-up suggestions.
pub const FOLLOWUP_SYSTEM_PROMPT: &str = "You are a helpful AI assistant";

/// Stands in for the source block when retrieval returned nothing.
pub const NO_SOURCE: &str = "no source available.";

/// Render passages as `title:content`, one per line.
pub fn render_documents(documents: &[DocumentRecord]) -> String {
    if documents.is_empty() {
        return NO_SOURCE.to_string();
    }
    documents
        .iter()
        .map(|d| format!("{}:{}", d.title, d.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Grounding message for text-only answers.
pub fn text_grounding(sources: &str) -> String {
    format!(
        r#" ## Source ##
{sources}
## End ##

You answer needs to be a json object with the following format.
{{
    "answer": // the answer to the question, add a source reference to the end of each sentence. e.g. Apple is a fruit [reference1.pdf][reference2.pdf]. If no source available, put the answer as I don't know.
    "thoughts": // brief thoughts on how you came up with the answer, e.g. what sources you used, what you thought about, etc.
}}
Don't put your answer between ```json and ```, return the json string directly."#
    )
}

/// Text part of the multimodal grounding message.
pub fn image_grounding(sources: &str) -> String {
    format!(
        r#"## Source ##
{sources}
## End ##

Answer question based on available source and images.
Your answer needs to be a json object with answer and thoughts field.
Don't put your answer between ```json and ```, return the json string directly. e.g {{"answer": "I don't know", "thoughts": "I don't know"}}"#
    )
}

/// User message asking for three follow-up questions about `answer`.
pub fn followup_request(answer: &str) -> String {
    format!(
        r#"Generate three follow-up question based on the answer you just generated.
# Answer
{answer}

# Format of the response
Return the follow-up question as a json string list. Don't put your answer between ```json and ```, return the json string directly.
e.g.
[
    "What is the deductible?",
    "What is the co-pay?",
    "What is the out-of-pocket maximum?"
]"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_documents_render_sentinel() {
        assert_eq!(render_documents(&[]), NO_SOURCE);
        assert!(text_grounding(&render_documents(&[])).contains("no source available."));
    }

    #[test]
    fn documents_render_title_content_lines() {
        let docs = vec![
            DocumentRecord::new("planA", "dental covered"),
            DocumentRecord::new("planB", "vision covered"),
        ];
        assert_eq!(render_documents(&docs), "planA:dental covered\nplanB:vision covered");
    }

    #[test]
    fn grounding_blocks_mandate_answer_and_thoughts() {
        for prompt in [text_grounding("x:y"), image_grounding("x:y")] {
            assert!(prompt.contains("## Source ##\nx:y\n## End ##"));
            assert!(prompt.contains("\"answer\""));
            assert!(prompt.contains("thoughts"));
            assert!(prompt.contains("Don't put your answer between ```json and ```"));
        }
    }

    #[test]
    fn followup_request_embeds_answer() {
        let prompt = followup_request("Dental is covered [planA]");
        assert!(prompt.contains("# Answer\nDental is covered [planA]\n"));
        assert!(prompt.contains("json string list"));
    }
}
