pub const SUMMARY_SEPARATOR: &str = "===SPLIT===";
pub const FLASHCARDS_MARKER: &str = "===FLASHCARDS===";
pub const QUIZ_MARKER: &str = "===QUIZ===";

/// Closing line the narration must end with
pub const NARRATION_SIGN_OFF: &str = "Any questions?";

pub const NOTES_PROMPT: &str = r#"You are an expert academic tutor working from the material below.

1. Write a SUMMARY of about 250 words.
   - Use `$$...$$` for block math and `$...$` for inline math.
2. Write the line "===SPLIT===" on its own.
3. Write DETAILED NOTES in Markdown.
   - Use ## for topics and ### for sub-topics.
   - **Bold** key terms.
   - Use `$$...$$` for equations.
   - Draw diagrams with Mermaid.js. Name nodes A, B, C and put their labels in quotes:
     ```mermaid
     graph TD;
        A["Concept Start"] --> B["Process Step"];
        B --> C["Result"];
     ```
"#;

pub const STUDY_AIDS_PROMPT: &str = r#"Create study aids for the material below. Use exactly this layout, one item per line:

===FLASHCARDS===
Front: [Term] | Back: [Definition]
===QUIZ===
Q: [Question] | A: [Option 1] | B: [Option 2] | C: [Option 3] | Answer: [Full answer text]
"#;

pub const NARRATION_PROMPT: &str = r#"Turn this summary into a teaching monologue.
- You are the narrator, speaking directly to one student.
- This script will be read aloud: never write mathematical notation or symbols. Say them in words ("x squared", "the integral of f from a to b").
- Keep paragraphs short, three or four sentences at most.
- End the script with the line "Any questions?".
"#;

pub const CHAT_PROMPT: &str = "You are a patient tutor. Answer the student's question using the study material as context. \
If the material does not cover the question, say so and answer from general knowledge.";

/// Instruction block followed by the material it applies to.
pub fn with_content(instructions: &str, content: &str) -> String {
    format!("{instructions}\n\nCONTENT:\n{content}")
}
