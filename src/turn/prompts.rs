//! Prompt templates for the inline pipeline.

/// Reply the classifier gives for casual chat.
pub const CASUAL_MARKER: &str = "True";

/// Ask the model whether `prompt` is small talk.
pub fn classification_prompt(prompt: &str) -> String {
    format!(
        "\
Decide whether the following user input is casual chat.
If it is casual chat (greetings, small talk, everyday conversation), reply \"True\".
If it is business related (packaging, equipment, technical support), reply \"False\".

User input: {prompt}

Reply with only \"True\" or \"False\" and nothing else."
    )
}

/// Persona for casual replies.
pub const ASSISTANT_PERSONA: &str = "\
You are a professional enterprise knowledge assistant for a packaging equipment manufacturer. \
You answer employee questions clearly and accurately, based on internal reference material.

Guidelines:
- Use professional, well-formed language adapted to the user.
- Keep the conversation natural, warm and professional.
- Break complex questions down into steps.";

/// Ask for a friendly conversational reply.
pub fn casual_prompt(prompt: &str) -> String {
    format!(
        "Answer the user in a friendly way, keeping the conversation natural, warm and \
         professional.\nUser input: {prompt}"
    )
}

/// Ask the model to rewrite a drafted technical answer as a JSON envelope.
pub fn formatting_prompt(reference_text: &str, draft: &str) -> String {
    format!(
        "\
Rewrite the technical answer below in a friendlier, professional form.

Rules:
1. When the answer matches the knowledge base, quote the relevant clause with its source \
section, explain it, and give an example where useful.
2. When several sections apply, say \"based on several related clauses\", list each \
requirement, and explain how they relate.
3. When the knowledge base may not cover the question, say so, list the three most \
relevant clauses, and suggest contacting the department lead.
4. Quote key figures exactly. Break complex procedures into numbered steps.
5. For restricted or confidential topics, cite the confidentiality policy and suggest \
contacting the systems department.

<knowledge_base>
{reference_text}
</knowledge_base>

Technical answer:
{draft}

Reply with JSON only, in this shape:
{{
    \"answer\": \"the rewritten answer\",
    \"confidence\": \"a 0-1 confidence score for the answer\",
    \"related_questions\": [\"follow-up question 1\", \"follow-up question 2\", \"follow-up question 3\"]
}}"
    )
}
