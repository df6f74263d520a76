use std::fmt::Write;

use crate::study::StudyBundle;

/// Render a bundle as plain text sections
pub fn render_text(bundle: &StudyBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "SUMMARY\n\n{}\n", bundle.summary);
    let _ = writeln!(out, "NOTES\n\n{}\n", bundle.notes);

    let _ = writeln!(out, "FLASHCARDS\n");
    for card in &bundle.flashcards {
        let _ = writeln!(out, "{} :: {}", card.front, card.back);
    }

    let _ = writeln!(out, "\nQUIZ\n");
    for (i, item) in bundle.quiz.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, item.question);
        for option in &item.options {
            let _ = writeln!(out, "   - {option}");
        }
        let _ = writeln!(out, "   Answer: {}", item.answer);
    }

    let _ = writeln!(out, "\nPODCAST SCRIPT\n\n{}", bundle.podcast_script);
    out.trim_end().to_string()
}

/// Render a bundle as pretty JSON
pub fn render_json(bundle: &StudyBundle) -> String {
    serde_json::to_string_pretty(bundle).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Render a bundle as a Markdown study sheet
pub fn render_markdown(bundle: &StudyBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Study Notes\n\n## Summary\n\n{}\n", bundle.summary);
    let _ = writeln!(out, "{}\n", bundle.notes);

    if !bundle.flashcards.is_empty() {
        let _ = writeln!(out, "## Flashcards\n\n| Front | Back |\n|---|---|");
        for card in &bundle.flashcards {
            let _ = writeln!(out, "| {} | {} |", escape_cell(&card.front), escape_cell(&card.back));
        }
        out.push('\n');
    }

    if !bundle.quiz.is_empty() {
        let _ = writeln!(out, "## Quiz\n");
        for (i, item) in bundle.quiz.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, item.question);
            for option in &item.options {
                let _ = writeln!(out, "   - {option}");
            }
            let _ = writeln!(out, "\n   <details><summary>Answer</summary>{}</details>\n", item.answer);
        }
    }

    let _ = writeln!(out, "## Podcast Script\n\n{}", bundle.podcast_script);
    out.trim_end().to_string()
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
