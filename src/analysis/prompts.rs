// src/analysis/prompts.rs
//! Prompt templates and placeholder analyses

use crate::types::{AnalysisKind, AnalysisRequest};

/// Marker line appended to every placeholder so readers can tell it apart
pub const PLACEHOLDER_NOTE: &str =
    "*Note: This is a mock analysis. Please add your Gemini API key for real AI-powered insights.*";

pub fn render(request: &AnalysisRequest) -> String {
    match request {
        AnalysisRequest::Transcript(t) => transcript_review(&t.transcript_text),
        AnalysisRequest::Icebreaker(i) => icebreaker_strategy(&i.linkedin_bio, &i.pitch_deck),
    }
}

pub fn transcript_review(transcript_text: &str) -> String {
    format!(
        r#"Review this meeting transcript and provide a comprehensive analysis:

{}

Please provide insights in the following format:

**What went well:**
- [List specific positive aspects and why they were effective]

**Areas for improvement:**
- [List specific areas that could be enhanced]

**Recommendations for next time:**
- [List actionable suggestions for future meetings]

**Key takeaways:**
- [Summarize the most important points from the meeting]

Focus on communication effectiveness, meeting structure, participant engagement, and actionable outcomes.
Be specific, actionable, and encouraging in your feedback."#,
        transcript_text
    )
}

pub fn icebreaker_strategy(linkedin_bio: &str, pitch_deck: &str) -> String {
    format!(
        r#"Analyze this LinkedIn bio and pitch deck to create a comprehensive cold outreach strategy:

**LinkedIn Bio:**
{}

**Pitch Deck:**
{}

Please provide a detailed analysis in the following format:

**Company Information:**
- Company LinkedIn: [Extract or infer]
- Website: [Extract or infer]

**Buying Signals from Pitch Deck:**
- [List specific buying signals]
- Why they matter: [Explain significance]
- Source of information: [Where this signal comes from]
- Discovery triggers: [What questions this raises]

**Smart Questions to Ask:**
**At Company Level:**
- [List strategic company-level questions]

**At Role Level:**
- [List role-specific questions]

**Preferred Buying Style:**
- [Analyze and infer their buying style]
- How you inferred this: [Explain your reasoning]

**Top 5 Things They'd Like from Your Deck:**
- [List the most relevant aspects]
- [Explain why each is valuable to them]

**Potential Concerns/Clarifications Needed:**
- [Identify unclear, irrelevant, or less valuable parts]
- Why they may not be clear/relevant: [Explain]
- What to do instead: [Suggest alternatives]

**Summary:**
[Brief summary of key insights]

**3 Reflection Questions to Prepare for the Meeting:**
1. [Strategic preparation question]
2. [Tactical preparation question]
3. [Relationship-building question]

Focus on creating actionable insights that will help with cold outreach and meeting preparation."#,
        linkedin_bio, pitch_deck
    )
}

/// Substitute analysis used when the provider cannot produce one
pub fn placeholder(kind: AnalysisKind) -> String {
    let body = match kind {
        AnalysisKind::Transcript => TRANSCRIPT_PLACEHOLDER,
        AnalysisKind::Icebreaker => ICEBREAKER_PLACEHOLDER,
    };
    format!("{}\n\n{}", body, PLACEHOLDER_NOTE)
}

pub fn is_placeholder(analysis: &str) -> bool {
    analysis.trim_end().ends_with(PLACEHOLDER_NOTE)
}

const TRANSCRIPT_PLACEHOLDER: &str = r#"**What went well:**
- The meeting had clear participants and agenda
- Good structure with introduction and conclusion
- Participants were engaged in the discussion

**Areas for improvement:**
- Could benefit from more specific action items
- Consider adding time allocations for each topic
- Include follow-up meeting scheduling

**Recommendations for next time:**
- Create a detailed agenda with time slots
- Assign action items with deadlines
- Send meeting summary within 24 hours

**Key takeaways:**
- Meeting covered important quarterly planning topics
- Team collaboration was effective
- Clear next steps were identified"#;

const ICEBREAKER_PLACEHOLDER: &str = r#"**Company Information:**
- Company LinkedIn: [Extract from bio]
- Website: [Extract from bio]

**Buying Signals from Pitch Deck:**
- [Analyze pitch deck for buying signals]
- Why they matter: [Explain significance]
- Source of information: [Where this signal comes from]
- Discovery triggers: [What questions this raises]

**Smart Questions to Ask:**
**At Company Level:**
- What are your current priorities for this quarter?
- How do you measure success in your role?

**At Role Level:**
- What challenges are you currently facing?
- What solutions have you tried so far?

**Preferred Buying Style:**
- [Analyze bio for buying style indicators]
- How you inferred this: [Explain reasoning]

**Top 5 Things They'd Like from Your Deck:**
- [List relevant aspects from pitch deck]
- [Explain value to this specific person]

**Potential Concerns/Clarifications Needed:**
- [Identify unclear parts]
- Why they may not be clear: [Explain]
- What to do instead: [Suggest alternatives]

**Summary:**
Key insights for cold outreach strategy.

**3 Reflection Questions to Prepare for the Meeting:**
1. How can I best position our solution for their specific needs?
2. What objections might they have and how can I address them?
3. How can I build rapport and trust quickly?"#;
