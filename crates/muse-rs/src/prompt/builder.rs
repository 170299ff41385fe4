//! Builder for mentor instructions.
//!
//! An instruction is a preamble followed by paragraphs and bullet blocks,
//! joined with blank lines. Blocks render as a bold heading followed by one
//! `- ` line per directive.

/// Render a bullet block: `**Heading:**` then one `- item` line per entry.
pub fn render_block(heading: &str, items: &[&str]) -> String {
    let mut out = format!("**{heading}:**");
    for item in items {
        out.push_str("\n- ");
        out.push_str(item);
    }
    out
}

/// Assembles an instruction from ordered parts.
///
/// Empty paragraphs and blocks without items are skipped.
///
/// ```
/// use muse_rs::prompt::InstructionBuilder;
///
/// let text = InstructionBuilder::new("You are a mentor.")
///     .paragraph("You love mysteries.")
///     .block("Rules", &["Be kind", "Be brief"])
///     .block("Nothing", &[])
///     .build();
///
/// assert_eq!(
///     text,
///     "You are a mentor.\n\nYou love mysteries.\n\n**Rules:**\n- Be kind\n- Be brief"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct InstructionBuilder {
    parts: Vec<String>,
}

impl InstructionBuilder {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            parts: vec![preamble.into()],
        }
    }

    /// Append a free-text paragraph as its own section.
    pub fn paragraph(mut self, text: &str) -> Self {
        let text = text.trim();
        if !text.is_empty() {
            self.parts.push(text.to_string());
        }
        self
    }

    /// Append a bullet block as its own section.
    pub fn block(mut self, heading: &str, items: &[&str]) -> Self {
        if !items.is_empty() {
            self.parts.push(render_block(heading, items));
        }
        self
    }

    pub fn build(self) -> String {
        self.parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
