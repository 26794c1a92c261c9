//! Topic suggestion prompt and response parsing.

/// Build the prompt asking for `count` blog topics grounded in `excerpt`.
pub fn suggestion_prompt(excerpt: &str, count: usize) -> String {
    format!(
        "Based on the following content extracted from a technical knowledge base:\n\
         ---\n\
         {excerpt}\n\
         ---\n\
         Suggest {count} specific, interesting topics for blog posts. \
         Return only the list of topics, one per line, without numbering or explanations."
    )
}

/// Split a free-form response into topics: one per line, trimmed, blanks
/// dropped, response order preserved.
///
/// No further structure is inferred. A line like `1. Foo` stays `1. Foo`.
pub fn parse_topics(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
