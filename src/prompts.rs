//! Prompt text for HTML generation.
//!
//! Every instruction sent to a model lives here so prompt changes touch one
//! file and unit tests can inspect the assembled prompt without a provider.
//! The rules are content policy, not per-request knobs: only the extracted
//! text and the template/requirements vary between calls.

/// Bootstrap stylesheet the model may link.
pub const BOOTSTRAP_CDN: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css";

/// Tailwind script the model may link.
pub const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

/// Stand-in for the requirements block when no template was supplied.
pub const NO_TEMPLATE_HINT: &str = "No template was provided. Choose a clean, professional report \
layout with a title, clearly separated sections, and lists or tables wherever the content is \
tabular or enumerated.";

const ROLE: &str = "You are a professional document formatter, content analyst, and HTML \
structuring expert. Transform raw extracted content into a clean, complete, professional HTML \
document that follows the requested output format.";

const OUTPUT_RULES: &str = r#"OUTPUT RULES (MANDATORY):
- Return ONLY the final HTML document
- No explanations, comments, introductions, or summaries
- Do NOT wrap the output in markdown code fences
- No conversational phrases or confirmations
- The response must start with <!DOCTYPE html> or <html> and end with </html>"#;

const CONTENT_RULES: &str = r#"CONTENT RULES:
- Preserve ALL meaningful information; omit nothing
- Identify headings, sections, lists, tables, and key data points
- Keep the logical hierarchy and relationships between pieces of content
- Normalise inconsistent formatting from the source text
- Never invent or hallucinate information that is not in the extracted content
- Content that does not clearly fit the template goes in the most relevant section; do not drop it"#;

const STRUCTURE_RULES: &str = r#"STRUCTURE RULES:
- Follow the provided template or format description strictly
- Use semantic elements (header, section, article, table, ul, li, footer)
- Use a proper heading hierarchy (h1, then h2, then h3)
- Keep indentation consistent; the document must be valid and ready to open in a browser"#;

/// Assemble the single prompt sent to every model in the chain.
///
/// `template` is embedded verbatim; a blank template is replaced by
/// [`NO_TEMPLATE_HINT`].
pub fn build_generation_prompt(extracted_text: &str, template: &str) -> String {
    let requirements = if template.trim().is_empty() {
        NO_TEMPLATE_HINT
    } else {
        template
    };

    format!(
        "{ROLE}\n\n\
         {OUTPUT_RULES}\n\n\
         {CONTENT_RULES}\n\n\
         EXTRACTED CONTENT:\n{extracted_text}\n\n\
         OUTPUT FORMAT REQUIREMENTS:\n{requirements}\n\n\
         {STRUCTURE_RULES}\n\n\
         {styling}\n\n\
         Generate the final HTML document now:\n",
        styling = styling_rules(),
    )
}

fn styling_rules() -> String {
    format!(
        "STYLING OPTIONS (use only these):\n\
         - Custom CSS inside <style> tags or inline style attributes\n\
         - Bootstrap: <link rel=\"stylesheet\" href=\"{BOOTSTRAP_CDN}\">\n\
         - Tailwind: <script src=\"{TAILWIND_CDN}\"></script>\n\
         - Put any CDN reference in <head>; use readable contrast, spacing and font sizes"
    )
}
