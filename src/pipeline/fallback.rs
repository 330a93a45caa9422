//! Text-based fallback: build an HTML document without any model.
//!
//! Used only when every model in the chain has failed. [`synthesize`] is a
//! pure function of `(extracted_text, template)` and never fails; it is the
//! error boundary of last resort.
//!
//! ## Two modes
//!
//! * **Template filling** (non-blank template): light-weight cues are pulled
//!   from the text ([`DocumentCues`]) and pushed through an ordered list of
//!   [`SubstitutionRule`]s. Order matters when two rules could match the same
//!   span, so it is fixed and exposed via [`substitution_rules`].
//! * **Freeform** (blank template): [`infer_sections`] splits the text on
//!   heading-shaped lines and each section is rendered as a titled block.
//!
//! Every piece of extracted text is escaped with [`escape_html`] before it is
//! inserted into markup.

use crate::pipeline::postprocess::is_html_document;
use once_cell::sync::Lazy;
use regex::Regex;

/// Lines at or below this many characters are not content lines.
pub const MIN_CONTENT_LINE_CHARS: usize = 15;

/// Content lines shown when no section structure could be inferred.
pub const GENERIC_BLOCK_LINES: usize = 20;

pub const DEFAULT_ENTITY: &str = "Untitled Document";
pub const DEFAULT_GRADE: &str = "B+";
pub const DEFAULT_SCORE: &str = "85";

/// Filler used when a placeholder has no derivable value.
const EMPTY_VALUE: &str = "&mdash;";

const RECOMMENDATION_KEYWORDS: &[&str] = &["recommend", "improve", "should"];

const CANNED_STATUS: &[&str] = &[
    "Analysis Complete",
    "Overall Status: Good",
    "Structure: Reviewed",
    "Content Quality: High",
    "Coverage: Complete",
    "Formatting: Consistent",
    "Review: Finished",
];

const WORK_HISTORY_PHRASE: &str = "Document Analysis and Review";

/// Escape text for insertion into HTML element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 8);
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Build a complete HTML document from extracted text, with or without a template.
pub fn synthesize(extracted_text: &str, template: &str) -> String {
    if template.trim().is_empty() {
        render_freeform(extracted_text)
    } else {
        fill_template(extracted_text, template)
    }
}

// ── Cues ─────────────────────────────────────────────────────────────────

static RE_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)(?:\breport[ \t]+for[ \t]+|^[ \t]*(?:name|full[ \t]+name|website|site|url|domain|title|company|organi[sz]ation|client|candidate|project|document|subject)[ \t]*:[ \t]*)([^\r\n]*[^\s])",
    )
    .unwrap()
});

static RE_GRADE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)grade[:\s]*([A-F][+-]?)(?:[^A-Za-z]|$)").unwrap());

static RE_SCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i:score)[:\s]*([0-9]+)").unwrap());

/// Structural hints pulled from unstructured text.
///
/// All fields hold raw (unescaped) text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentCues {
    /// First labelled entity line (`Website: …`, `Name: …`, `Report for …`).
    pub entity: String,
    /// Letter grade `A`–`F` with optional `+`/`-`.
    pub grade: String,
    /// Numeric score.
    pub score: String,
    /// Trimmed lines longer than [`MIN_CONTENT_LINE_CHARS`].
    pub content_lines: Vec<String>,
    /// Content lines mentioning recommend / improve / should.
    pub recommendations: Vec<String>,
}

impl DocumentCues {
    pub fn from_text(text: &str) -> Self {
        let entity = RE_ENTITY
            .captures(text)
            .map(|c| c[1].trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ENTITY.to_string());
        let grade = RE_GRADE
            .captures(text)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| DEFAULT_GRADE.to_string());
        let score = RE_SCORE
            .captures(text)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| DEFAULT_SCORE.to_string());

        let content_lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| l.chars().count() > MIN_CONTENT_LINE_CHARS)
            .map(str::to_string)
            .collect();
        let recommendations = content_lines
            .iter()
            .filter(|l| {
                let lower = l.to_lowercase();
                RECOMMENDATION_KEYWORDS.iter().any(|k| lower.contains(k))
            })
            .cloned()
            .collect();

        Self {
            entity,
            grade,
            score,
            content_lines,
            recommendations,
        }
    }

    /// Values consumed, in order and cyclically, by `Not available` sentinels.
    pub fn data_points(&self) -> Vec<String> {
        let mut points = vec![self.entity.clone(), self.grade.clone(), self.score.clone()];
        points.extend(CANNED_STATUS.iter().map(|s| s.to_string()));
        points
    }

    /// Contact address derived from the entity name.
    pub fn contact_address(&self) -> String {
        let slug: String = self
            .entity
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            .collect();
        let slug = if slug.is_empty() { "example.com".to_string() } else { slug };
        format!("contact@{slug}")
    }

    /// First `n` recommendation lines, or content lines when there are none.
    fn highlights(&self, n: usize) -> Vec<&str> {
        let source = if self.recommendations.is_empty() {
            &self.content_lines
        } else {
            &self.recommendations
        };
        source.iter().take(n).map(String::as_str).collect()
    }
}

// ── Substitution rules ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Replacement {
    /// Every match gets the same (already escaped) markup.
    Fixed(String),
    /// Each match consumes the next value, wrapping around.
    Cycle(Vec<String>),
}

/// One placeholder pattern and the value that replaces it.
#[derive(Debug, Clone)]
pub struct SubstitutionRule {
    pub name: &'static str,
    pattern: Regex,
    replacement: Replacement,
}

impl SubstitutionRule {
    fn fixed(name: &'static str, pattern: &str, markup: String) -> Self {
        Self {
            name,
            pattern: compile(pattern),
            replacement: Replacement::Fixed(markup),
        }
    }

    fn cycle(name: &'static str, pattern: &str, values: Vec<String>) -> Self {
        Self {
            name,
            pattern: compile(pattern),
            replacement: Replacement::Cycle(values),
        }
    }

    pub fn is_match(&self, html: &str) -> bool {
        self.pattern.is_match(html)
    }

    /// Cut `template` around each match, filling the matched spans.
    ///
    /// `next` is the cycle position, carried across calls so a cyclic rule
    /// keeps counting over every template piece it visits.
    fn split(&self, template: &str, next: &mut usize) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut last = 0;
        for m in self.pattern.find_iter(template) {
            if m.start() > last {
                pieces.push(Piece::Template(template[last..m.start()].to_string()));
            }
            pieces.push(Piece::Filled(self.value(next)));
            last = m.end();
        }
        if last < template.len() {
            pieces.push(Piece::Template(template[last..].to_string()));
        }
        pieces
    }

    fn value(&self, next: &mut usize) -> String {
        match &self.replacement {
            Replacement::Fixed(markup) => markup.clone(),
            Replacement::Cycle(values) if values.is_empty() => EMPTY_VALUE.to_string(),
            Replacement::Cycle(values) => {
                let v = values[*next % values.len()].clone();
                *next += 1;
                v
            }
        }
    }
}

/// Template text still open to later rules, or a value already inserted.
#[derive(Debug, Clone)]
enum Piece {
    Template(String),
    Filled(String),
}

impl Piece {
    fn as_str(&self) -> &str {
        match self {
            Piece::Template(s) | Piece::Filled(s) => s,
        }
    }
}

// Patterns are compile-time constants; an invalid one is a programming error
// caught by the unit tests, so fall back to a never-matching pattern.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| Regex::new(r"[^\s\S]").unwrap())
}

fn joined(lines: &[&str], sep: &str) -> String {
    if lines.is_empty() {
        EMPTY_VALUE.to_string()
    } else {
        lines
            .iter()
            .map(|l| escape_html(l))
            .collect::<Vec<_>>()
            .join(sep)
    }
}

/// The ordered substitution rules for a set of cues.
///
/// 1. `Not available` → entity, grade, score, then canned status strings (cyclic)
/// 2. `Information not found in document` → up to 3 recommendation lines
/// 3. `[Name…]` → entity
/// 4. `[Email…]` → derived contact address
/// 5. `[Experience…]` → up to 2 recommendation lines
/// 6. `[Work history]` → canned phrase
/// 7. known semantic placeholders (`[TITLE]`, `[WEBSITE]`, `[SEO_GRADE]`, …)
/// 8. any remaining `[UPPER_CASE]` placeholder → successive content lines (cyclic)
pub fn substitution_rules(cues: &DocumentCues) -> Vec<SubstitutionRule> {
    let entity = escape_html(&cues.entity);
    let data_points = cues.data_points().iter().map(|s| escape_html(s)).collect();
    let content = cues.content_lines.iter().map(|s| escape_html(s)).collect();

    vec![
        SubstitutionRule::cycle("not-available", "Not available", data_points),
        SubstitutionRule::fixed(
            "information-not-found",
            "Information not found in document",
            joined(&cues.highlights(3), "<br><br>"),
        ),
        SubstitutionRule::fixed("name", r"(?i)\[name[^\]]*\]", entity.clone()),
        SubstitutionRule::fixed(
            "email",
            r"(?i)\[email[^\]]*\]",
            escape_html(&cues.contact_address()),
        ),
        SubstitutionRule::fixed(
            "experience",
            r"(?i)\[experience[^\]]*\]",
            joined(&cues.highlights(2), "<br>"),
        ),
        SubstitutionRule::fixed(
            "work-history",
            r"(?i)\[work history\]",
            WORK_HISTORY_PHRASE.to_string(),
        ),
        SubstitutionRule::fixed(
            "entity",
            r"(?i)\[(?:title|website|website_name|candidate_name|company)\]",
            entity,
        ),
        SubstitutionRule::fixed("grade", r"(?i)\[(?:seo_)?grade\]", escape_html(&cues.grade)),
        SubstitutionRule::fixed("score", r"(?i)\[(?:seo_)?score\]", escape_html(&cues.score)),
        SubstitutionRule::fixed(
            "summary",
            r"(?i)\[(?:summary|professional_summary)\]",
            joined(
                &cues
                    .content_lines
                    .iter()
                    .take(3)
                    .map(String::as_str)
                    .collect::<Vec<_>>(),
                "<br>",
            ),
        ),
        SubstitutionRule::fixed(
            "recommendations",
            r"(?i)\[recommendations\]",
            joined(
                &cues
                    .recommendations
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>(),
                "<br><br>",
            ),
        ),
        SubstitutionRule::cycle("generic", r"\[[A-Z][A-Z0-9_ ]*\]", content),
    ]
}

/// Template-filling mode.
pub fn fill_template(extracted_text: &str, template: &str) -> String {
    let cues = DocumentCues::from_text(extracted_text);
    // Rules only ever see template text; inserted values are never rescanned.
    let mut pieces = vec![Piece::Template(template.to_string())];
    for rule in substitution_rules(&cues) {
        let mut next = 0usize;
        pieces = pieces
            .into_iter()
            .flat_map(|piece| match piece {
                Piece::Template(t) => rule.split(&t, &mut next),
                filled => vec![filled],
            })
            .collect();
    }
    let filled: String = pieces.iter().map(Piece::as_str).collect();

    let filled = filled.trim();
    if is_html_document(filled) {
        filled.to_string()
    } else {
        // A format description or fragment rather than a document.
        render_document(&escape_html(&cues.entity), filled)
    }
}

// ── Section inference ────────────────────────────────────────────────────

/// A heading and the lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: Vec<String>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: Vec::new(),
        }
    }
}

static RE_MARKDOWN_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}\s+(.+?)\s*#*$").unwrap());

static RE_BANNER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^={3,}\s*(.*?)\s*={3,}$").unwrap());

static RE_UNDERLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:={3,}|-{3,})$").unwrap());

const MAX_CAPS_HEADING_CHARS: usize = 60;
const MAX_COLON_HEADING_CHARS: usize = 40;
const MAX_UNDERLINED_HEADING_CHARS: usize = 80;

/// Title of `line` if it is shaped like a heading.
fn heading_title(line: &str) -> Option<String> {
    if let Some(c) = RE_BANNER.captures(line) {
        let inner = c[1].trim();
        return (!inner.is_empty()).then(|| inner.to_string());
    }
    if let Some(c) = RE_MARKDOWN_HEADING.captures(line) {
        return Some(c[1].to_string());
    }

    let len = line.chars().count();
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    if len <= MAX_CAPS_HEADING_CHARS
        && letters >= 2
        && line.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase)
    {
        return Some(line.trim_end_matches(':').trim().to_string());
    }

    if let Some(stripped) = line.strip_suffix(':') {
        let stripped = stripped.trim();
        if len <= MAX_COLON_HEADING_CHARS
            && !stripped.is_empty()
            && stripped.split_whitespace().count() <= 5
        {
            return Some(stripped.to_string());
        }
    }
    None
}

/// Split text into titled sections.
///
/// Returns an empty list when no heading-shaped line exists. Lines before
/// the first heading become an "Overview" section.
pub fn infer_sections(text: &str) -> Vec<Section> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut sections: Vec<Section> = Vec::new();
    let mut preamble: Vec<String> = Vec::new();
    let mut current: Option<Section> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if line.is_empty() {
            i += 1;
            continue;
        }

        let underlined = lines
            .get(i + 1)
            .is_some_and(|next| RE_UNDERLINE.is_match(next))
            && !RE_UNDERLINE.is_match(line)
            && line.chars().count() <= MAX_UNDERLINED_HEADING_CHARS;

        let title = if underlined {
            Some(line.to_string())
        } else if RE_UNDERLINE.is_match(line) {
            // Stray horizontal rule.
            i += 1;
            continue;
        } else {
            heading_title(line)
        };

        match title {
            Some(t) => {
                sections.extend(current.take());
                current = Some(Section::new(t));
                i += if underlined { 2 } else { 1 };
                continue;
            }
            None => match current.as_mut() {
                Some(section) => section.body.push(line.to_string()),
                None => preamble.push(line.to_string()),
            },
        }
        i += 1;
    }
    sections.extend(current);

    if !sections.is_empty() && !preamble.is_empty() {
        sections.insert(
            0,
            Section {
                title: "Overview".to_string(),
                body: preamble,
            },
        );
    }
    sections
}

// ── Rendering ────────────────────────────────────────────────────────────

fn is_bullet(line: &str) -> Option<&str> {
    ["- ", "* ", "• "]
        .iter()
        .find_map(|p| line.strip_prefix(p))
        .map(str::trim)
}

fn render_body(lines: &[String]) -> String {
    let mut html = String::new();
    let mut in_list = false;
    for line in lines {
        match is_bullet(line) {
            Some(item) => {
                if !in_list {
                    html.push_str("      <ul>\n");
                    in_list = true;
                }
                html.push_str(&format!("        <li>{}</li>\n", escape_html(item)));
            }
            None => {
                if in_list {
                    html.push_str("      </ul>\n");
                    in_list = false;
                }
                html.push_str(&format!("      <p>{}</p>\n", escape_html(line)));
            }
        }
    }
    if in_list {
        html.push_str("      </ul>\n");
    }
    html
}

fn render_section(title: &str, lines: &[String]) -> String {
    format!(
        "    <section class=\"section\">\n      <h2>{}</h2>\n{}    </section>\n",
        escape_html(title),
        render_body(lines)
    )
}

/// Freeform mode: sections if any can be inferred, else a single generic block.
pub fn render_freeform(extracted_text: &str) -> String {
    let sections = infer_sections(extracted_text);
    let body = if sections.is_empty() {
        let mut lines: Vec<String> = extracted_text
            .lines()
            .map(str::trim)
            .filter(|l| l.chars().count() > MIN_CONTENT_LINE_CHARS)
            .take(GENERIC_BLOCK_LINES)
            .map(str::to_string)
            .collect();
        if lines.is_empty() {
            // Short or empty input: keep whatever non-blank lines exist.
            lines = extracted_text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .take(GENERIC_BLOCK_LINES)
                .map(str::to_string)
                .collect();
        }
        if lines.is_empty() {
            lines.push("No content could be extracted from the document.".to_string());
        }
        render_section("Document Content", &lines)
    } else {
        sections
            .iter()
            .map(|s| render_section(&s.title, &s.body))
            .collect()
    };
    render_document("Formatted Document", &body)
}

/// Standalone document shell. `title` must already be escaped.
fn render_document(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>
    body {{ font-family: 'Segoe UI', system-ui, sans-serif; background: #f4f6f9; margin: 0; padding: 40px; color: #1e293b; }}
    .container {{ max-width: 900px; margin: 0 auto; background: #fff; padding: 48px; border-radius: 12px; box-shadow: 0 4px 20px rgba(0,0,0,0.08); }}
    header {{ border-bottom: 3px solid #2563eb; padding-bottom: 20px; margin-bottom: 32px; }}
    h1 {{ margin: 0; font-size: 2em; }}
    .section {{ margin: 28px 0; }}
    .section h2 {{ font-size: 1.3em; padding-bottom: 8px; border-bottom: 2px solid #e2e8f0; }}
    .section p, .section li {{ line-height: 1.7; color: #475569; }}
    footer {{ margin-top: 48px; padding-top: 16px; border-top: 1px solid #e2e8f0; color: #94a3b8; font-size: 0.85em; text-align: center; }}
  </style>
</head>
<body>
  <div class="container">
    <header><h1>{title}</h1></header>
{body}    <footer>
      <p>Generated by text-based processing (AI model unavailable). Content was structured heuristically from the extracted text.</p>
    </footer>
  </div>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEO_TEXT: &str = "Website Report for example.org\n\
        Grade: A-\n\
        Score: 92\n\
        You should improve the meta descriptions on all pages.\n\
        We recommend compressing hero images to under 200KB.\n\
        Page titles are unique and descriptive across the site.\n";

    #[test]
    fn escape_covers_all_specials() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn cues_from_seo_report() {
        let cues = DocumentCues::from_text(SEO_TEXT);
        assert_eq!(cues.entity, "example.org");
        assert_eq!(cues.grade, "A-");
        assert_eq!(cues.score, "92");
        assert_eq!(cues.recommendations.len(), 2);
        assert_eq!(cues.contact_address(), "contact@example.org");
    }

    #[test]
    fn cues_defaults_when_absent() {
        let cues = DocumentCues::from_text("nothing useful here");
        assert_eq!(cues.entity, DEFAULT_ENTITY);
        assert_eq!(cues.grade, DEFAULT_GRADE);
        assert_eq!(cues.score, DEFAULT_SCORE);
        assert_eq!(cues.contact_address(), "contact@untitled-document");
    }

    #[test]
    fn labelled_entity_line() {
        let cues = DocumentCues::from_text("Intro line\nName: Ada Lovelace\nWebsite: other.net");
        assert_eq!(cues.entity, "Ada Lovelace");
    }

    #[test]
    fn grade_ignores_words() {
        let cues = DocumentCues::from_text("Grade: Excellent overall");
        assert_eq!(cues.grade, DEFAULT_GRADE);
        let cues = DocumentCues::from_text("Overall grade B+ this quarter");
        assert_eq!(cues.grade, "B+");
    }

    #[test]
    fn grade_letter_any_case() {
        assert_eq!(DocumentCues::from_text("grade: b+\nscore 70").grade, "b+");
    }

    #[test]
    fn report_for_stays_on_its_line() {
        let cues = DocumentCues::from_text("Annual report for\n\nRevenue grew 10 percent");
        assert_eq!(cues.entity, DEFAULT_ENTITY);
        let cues = DocumentCues::from_text("Quarterly report for\tNorthwind ");
        assert_eq!(cues.entity, "Northwind");
    }

    #[test]
    fn not_available_filled_in_order() {
        let template = "<html><body><p>Not available</p><p>Not available</p><p>Not available</p></body></html>";
        let html = fill_template(SEO_TEXT, template);
        assert_eq!(
            html,
            "<html><body><p>example.org</p><p>A-</p><p>92</p></body></html>"
        );
    }

    #[test]
    fn not_available_wraps_around() {
        let cues = DocumentCues::from_text(SEO_TEXT);
        let n = cues.data_points().len();
        let template = format!(
            "<html><body>{}</body></html>",
            "<i>Not available</i>".repeat(n + 1)
        );
        let html = fill_template(SEO_TEXT, &template);
        assert!(html.ends_with("<i>example.org</i></body></html>"), "got: {html}");
    }

    #[test]
    fn information_not_found_gets_recommendations() {
        let template = "<html><body><div>Information not found in document</div></body></html>";
        let html = fill_template(SEO_TEXT, template);
        assert!(html.contains(
            "You should improve the meta descriptions on all pages.<br><br>We recommend"
        ));
    }

    #[test]
    fn bracket_placeholders_resolved() {
        let template = "<html><body>[Name] [EMAIL ADDRESS] [Experience] [Work history] [SEO_SCORE] [KEY_FINDINGS]</body></html>";
        let html = fill_template(SEO_TEXT, template);
        assert!(html.contains("example.org contact@example.org"));
        assert!(html.contains(WORK_HISTORY_PHRASE));
        assert!(html.contains(" 92 "));
        assert!(!html.contains('['), "got: {html}");
    }

    #[test]
    fn specific_rules_win_over_generic() {
        let rules = substitution_rules(&DocumentCues::from_text(SEO_TEXT));
        let names: Vec<&str> = rules.iter().map(|r| r.name).collect();
        let generic = names.iter().position(|n| *n == "generic").unwrap();
        assert_eq!(generic, names.len() - 1);
        assert_eq!(names[0], "not-available");
        assert!(rules[generic].is_match("[ANYTHING_ELSE]"));
        assert!(!rules[generic].is_match("input[type=\"text\"]"));
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let text = "Name: ACME [LLC] Holdings\nQuarterly filing for the holding company.";
        let template = "<html><body><p>Not available</p><p>[KEY_FINDINGS]</p></body></html>";
        assert_eq!(
            fill_template(text, template),
            "<html><body><p>ACME [LLC] Holdings</p><p>Name: ACME [LLC] Holdings</p></body></html>"
        );

        let text = "We should fix [Name] fields in the form.";
        let template = "<html><body><p>Information not found in document</p><p>[Name]</p></body></html>";
        assert_eq!(
            fill_template(text, template),
            "<html><body><p>We should fix [Name] fields in the form.</p><p>Untitled Document</p></body></html>"
        );
    }

    #[test]
    fn cycle_continues_across_template_pieces() {
        let template = "<html><body>[FIRST] [NAME] [SECOND]</body></html>";
        assert_eq!(
            fill_template(SEO_TEXT, template),
            "<html><body>Website Report for example.org example.org \
             You should improve the meta descriptions on all pages.</body></html>"
        );
    }

    #[test]
    fn css_attribute_selectors_survive() {
        let template = "<html><head><style>input[type=\"text\"] { color: red; }</style></head><body></body></html>";
        assert_eq!(fill_template(SEO_TEXT, template), template);
    }

    #[test]
    fn fragment_template_is_wrapped() {
        let html = fill_template(SEO_TEXT, "Summary: [SUMMARY]");
        assert!(is_html_document(&html));
        assert!(html.contains("Website Report for example.org"));
    }

    #[test]
    fn infer_markdown_and_caps_headings() {
        let text = "# Introduction\nFirst line.\nSECOND PART\nBody two.\nAnother body line.";
        let sections = infer_sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Introduction");
        assert_eq!(sections[0].body, vec!["First line."]);
        assert_eq!(sections[1].title, "SECOND PART");
        assert_eq!(sections[1].body.len(), 2);
    }

    #[test]
    fn infer_underlined_and_colon_headings() {
        let text = "Summary\n=======\nAll good.\nNext steps:\nShip it.";
        let sections = infer_sections(text);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Summary", "Next steps"]);
    }

    #[test]
    fn infer_file_banners_and_preamble() {
        let text = "loose intro text\n\n=== FILE 1: a.txt ===\nalpha\n\n=== FILE 2: b.txt ===\nbeta";
        let sections = infer_sections(text);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Overview", "FILE 1: a.txt", "FILE 2: b.txt"]);
    }

    #[test]
    fn infer_nothing_from_prose() {
        assert!(infer_sections("just a sentence of prose here.\nand another one.").is_empty());
    }

    #[test]
    fn freeform_generic_block() {
        let html = render_freeform("this line is long enough to count\nshort");
        assert!(is_html_document(&html));
        assert!(html.contains("<h2>Document Content</h2>"));
        assert!(html.contains("this line is long enough to count"));
        assert!(html.contains("AI model unavailable"));
    }

    #[test]
    fn freeform_renders_bullets() {
        let html = render_freeform("FINDINGS\n- one\n- two\nclosing remark");
        assert!(html.contains("<ul>"));
        assert!(html.contains("<li>one</li>"));
        assert!(html.contains("<p>closing remark</p>"));
    }

    #[test]
    fn synthesize_never_empty() {
        for (text, template) in [("", ""), ("", "   "), ("x", ""), ("", "<b>[X]</b>")] {
            let html = synthesize(text, template);
            assert!(is_html_document(&html), "not a document for {text:?}/{template:?}");
        }
    }

    #[test]
    fn synthesize_escapes_script() {
        let text = "HEADER\n<script>alert('x')</script> & more text here";
        let html = synthesize(text, "");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
    }
}
