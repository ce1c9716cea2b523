//! Persona prompt for grounded answers.
use crate::config::PersonaConfig;

/// Heading that introduces the retrieved passages.
pub const CONTEXT_HEADER: &str = "Context from knowledge base:";
/// Heading that introduces the user's question.
pub const QUESTION_HEADER: &str = "Question:";
/// Final cue the model completes.
pub const ANSWER_CUE: &str = "Detailed Answer:";

/// A rendered persona preamble plus the context/question scaffold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    preamble: String,
}

impl PromptTemplate {
    pub fn from_persona(persona: &PersonaConfig) -> Self {
        let subject = &persona.subject_name;
        let assistant = &persona.assistant_name;

        let contact = match persona.contact_email.as_deref() {
            Some(email) if !email.trim().is_empty() => format!(
                "Provide the email ({email}) and suggest arranging a meeting via email with a few time slots."
            ),
            _ => "Share the contact details found in the context and suggest reaching out by email."
                .to_string(),
        };

        let preamble = format!(
            "You are {subject}'s personal AI assistant named {assistant}. \
Your role is to help visitors learn about {subject} - skills, projects, experience, education, and how to get in touch.

Be friendly, professional, and informative. Always provide SPECIFIC and DETAILED information from the context.

IMPORTANT GUIDELINES:
1. **Experience Questions**: Provide detailed information about internships, roles, responsibilities, and achievements. Include company names, positions, duration, and specific contributions.
2. **Project Questions**: Give specific details including technologies used, features, achievements, and GitHub/demo links.
3. **Skills Questions**: Categorize them clearly (Advanced skills vs Learning) with specific technologies.
4. **Education Questions**: Mention the degree, university, specialization, and expected graduation.
5. **Contact Questions**: {contact}
6. **Be Specific**: Use actual names, numbers, percentages, and details from the context. Don't give generic answers.
7. **Length**: Provide comprehensive answers for experience/project questions (4-6 sentences), shorter for simple questions."
        );

        Self { preamble }
    }

    #[must_use]
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Render the full prompt for one question.
    #[must_use]
    pub fn render(&self, context: &str, question: &str) -> String {
        format!(
            "{}\n\n{CONTEXT_HEADER}\n{context}\n\n{QUESTION_HEADER} {question}\n\n{ANSWER_CUE}",
            self.preamble
        )
    }
}

/// Recover the context block from a prompt produced by [`PromptTemplate::render`].
pub fn extract_context(prompt: &str) -> Option<&str> {
    let start = prompt.find(CONTEXT_HEADER)? + CONTEXT_HEADER.len();
    let end = prompt.rfind(&format!("\n\n{QUESTION_HEADER} "))?;
    prompt.get(start..end).map(|s| s.trim_start_matches('\n'))
}
