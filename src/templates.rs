//! Built-in HTML templates and format-description templates.
//!
//! Templates are complete HTML documents with `[UPPER_SNAKE]` placeholders.
//! They are sent verbatim to the model as the output-shape requirement and
//! are filled directly by the text-based fallback when every model fails.
//!
//! Two sources:
//!
//! * the catalog ([`catalog`], [`find`]): five named layouts selectable by id
//! * [`template_for_description`]: a layout chosen from a free-text format
//!   description such as "candidate profile" or "SEO summary"

use crate::pipeline::fallback::escape_html;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    #[serde(skip)]
    pub html: String,
}

/// Catalog listing without the HTML body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSummary {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
}

impl From<&Template> for TemplateSummary {
    fn from(t: &Template) -> Self {
        Self {
            id: t.id,
            name: t.name,
            description: t.description,
            category: t.category,
        }
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// One titled block of a template body.
struct Block<'a> {
    title: &'a str,
    placeholder: &'a str,
    highlight: bool,
}

const fn block<'a>(title: &'a str, placeholder: &'a str) -> Block<'a> {
    Block {
        title,
        placeholder,
        highlight: false,
    }
}

const fn highlight<'a>(title: &'a str, placeholder: &'a str) -> Block<'a> {
    Block {
        title,
        placeholder,
        highlight: true,
    }
}

fn layout(title: &str, accent: &str, header: &str, blocks: &[Block<'_>], footer: &str) -> String {
    let mut body = String::new();
    for b in blocks {
        let class = if b.highlight { "content highlight-box" } else { "content" };
        body.push_str(&format!(
            "    <section class=\"section\">\n      <h2 class=\"section-title\">{}</h2>\n      <div class=\"{class}\">{}</div>\n    </section>\n",
            b.title, b.placeholder
        ));
    }
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>
    body {{ font-family: 'Segoe UI', system-ui, sans-serif; background: #f4f6f9; margin: 0; padding: 40px; color: #1e293b; }}
    .container {{ max-width: 900px; margin: 0 auto; background: #fff; padding: 48px; border-radius: 12px; box-shadow: 0 4px 20px rgba(0,0,0,0.1); }}
    header {{ text-align: center; border-bottom: 3px solid {accent}; padding-bottom: 28px; margin-bottom: 36px; }}
    header h1 {{ font-size: 2.2em; margin: 0 0 8px; }}
    .meta {{ color: #64748b; }}
    .section {{ margin: 32px 0; }}
    .section-title {{ font-size: 1.35em; font-weight: 600; padding-bottom: 8px; border-bottom: 2px solid #e2e8f0; }}
    .content {{ color: #475569; line-height: 1.8; }}
    .highlight-box {{ background: #f0f9ff; border-left: 4px solid {accent}; padding: 18px; border-radius: 4px; }}
    footer {{ text-align: center; margin-top: 48px; padding-top: 18px; border-top: 1px solid #e2e8f0; color: #94a3b8; font-size: 0.9em; }}
  </style>
</head>
<body>
  <div class="container">
    <header>
{header}
    </header>
{body}    <footer><p>{footer}</p></footer>
  </div>
</body>
</html>"#
    )
}

// ── Catalog ──────────────────────────────────────────────────────────────

static CATALOG: Lazy<Vec<Template>> = Lazy::new(|| {
    vec![
        Template {
            id: "professional-report",
            name: "Professional Report",
            description: "Clean, formal report layout with sections for summary, analysis, and recommendations",
            category: "Business",
            html: layout(
                "[TITLE]",
                "#2563eb",
                "      <h1>[TITLE]</h1>\n      <p class=\"meta\">Generated on [DATE] | Professional Analysis Report</p>",
                &[
                    block("Executive Summary", "[SUMMARY]"),
                    block("Key Findings", "[KEY_DETAILS]"),
                    block("Detailed Analysis", "[ANALYSIS]"),
                    highlight("Recommendations", "[RECOMMENDATIONS]"),
                ],
                "Professionally formatted report",
            ),
        },
        Template {
            id: "seo-report",
            name: "SEO Analysis Report",
            description: "Comprehensive SEO audit template with metrics, scores, and improvement suggestions",
            category: "Marketing",
            html: seo_layout(),
        },
        Template {
            id: "resume",
            name: "Professional Resume",
            description: "Modern resume layout with sections for experience, skills, and education",
            category: "Career",
            html: layout(
                "[CANDIDATE_NAME] - Resume",
                "#0f766e",
                "      <h1>[CANDIDATE_NAME]</h1>\n      <p class=\"meta\">[PROFESSIONAL_TITLE]</p>\n      <p class=\"meta\">[CONTACT_INFO]</p>",
                &[
                    block("Professional Summary", "[PROFESSIONAL_SUMMARY]"),
                    block("Experience", "[EXPERIENCE]"),
                    block("Skills", "[SKILLS]"),
                    block("Projects", "[PROJECTS]"),
                    block("Education", "[EDUCATION]"),
                    block("Certifications", "[CERTIFICATIONS]"),
                    block("Languages", "[LANGUAGES]"),
                ],
                "Curriculum vitae",
            ),
        },
        Template {
            id: "meeting-notes",
            name: "Meeting Notes",
            description: "Organized meeting minutes with attendees, agenda, action items",
            category: "Business",
            html: layout(
                "[MEETING_TITLE]",
                "#7c3aed",
                "      <h1>[MEETING_TITLE]</h1>\n      <p class=\"meta\">[DATE] | [TIME] | [LOCATION]</p>",
                &[
                    block("Attendees", "[ATTENDEES]"),
                    block("Agenda", "[AGENDA]"),
                    block("Discussion", "[DISCUSSION]"),
                    block("Decisions", "[DECISIONS]"),
                    highlight("Action Items", "[ACTION_ITEMS]"),
                    block("Next Steps", "[NEXT_STEPS]"),
                ],
                "Meeting minutes",
            ),
        },
        Template {
            id: "invoice",
            name: "Invoice",
            description: "Professional invoice template with line items and totals",
            category: "Finance",
            html: layout(
                "Invoice #[INVOICE_NUMBER]",
                "#1d4ed8",
                "      <h1>[COMPANY_NAME]</h1>\n      <p class=\"meta\">[COMPANY_ADDRESS]</p>\n      <p class=\"meta\">Invoice #[INVOICE_NUMBER] | Date: [DATE] | Due: [DUE_DATE]</p>",
                &[
                    block("Bill To", "[CLIENT_NAME]<br>[CLIENT_ADDRESS]"),
                    block(
                        "Line Items",
                        "<table><thead><tr><th>Description</th><th>Qty</th><th>Rate</th><th>Amount</th></tr></thead><tbody>[LINE_ITEMS]</tbody></table>",
                    ),
                    block("Totals", "Subtotal: [SUBTOTAL]<br>Tax: [TAX]<br><strong>Total: [TOTAL]</strong>"),
                    block("Payment Details", "[PAYMENT_DETAILS]"),
                    block("Notes", "[NOTES]"),
                ],
                "Thank you for your business",
            ),
        },
    ]
});

fn seo_layout() -> String {
    layout(
        "SEO Analysis Report - [WEBSITE]",
        "#667eea",
        "      <h1>SEO Analysis Report</h1>\n      <p class=\"meta\">[WEBSITE]</p>\n      <p><strong>[SEO_SCORE]</strong> Overall SEO Score | Grade <strong>[SEO_GRADE]</strong></p>\n      <p class=\"meta\">Performance [PERFORMANCE_SCORE] | Accessibility [ACCESSIBILITY_SCORE] | Best Practices [BEST_PRACTICES]</p>",
        &[
            block("Key Findings", "[KEY_FINDINGS]"),
            block("Issues Found", "[ISSUES]"),
            highlight("Recommendations", "[RECOMMENDATIONS]"),
            block("Technical Details", "[TECHNICAL_DETAILS]"),
        ],
        "Report generated on [DATE]",
    )
}

/// Every built-in template, in display order.
pub fn catalog() -> &'static [Template] {
    &CATALOG
}

/// Catalog listing without HTML bodies.
pub fn summaries() -> Vec<TemplateSummary> {
    CATALOG.iter().map(TemplateSummary::from).collect()
}

pub fn find(id: &str) -> Option<&'static Template> {
    CATALOG.iter().find(|t| t.id == id)
}

// ── Format descriptions ──────────────────────────────────────────────────

/// Pick a template for a free-text output-format description.
///
/// * mentions candidate / profile / resume → candidate profile layout
/// * mentions seo / website → SEO analysis layout
/// * anything else → a generic report titled with the description
pub fn template_for_description(description: &str) -> String {
    let d = description.to_lowercase();
    if ["candidate", "profile", "resume"].iter().any(|k| d.contains(k)) {
        layout(
            "Candidate Profile Report",
            "#2c3e50",
            "      <h1>[CANDIDATE_NAME]</h1>\n      <p class=\"meta\">[PROFESSIONAL_TITLE]</p>\n      <p class=\"meta\">[CONTACT_INFO]</p>",
            &[
                block("Professional Summary", "[PROFESSIONAL_SUMMARY]"),
                block("Technical Skills", "[TECHNICAL_SKILLS]"),
                block("Experience &amp; Projects", "[EXPERIENCE_PROJECTS]"),
                block("Education", "[EDUCATION]"),
                highlight("Key Achievements", "[ACHIEVEMENTS]"),
                block("Languages &amp; Additional Information", "[LANGUAGES_ADDITIONAL]"),
            ],
            "Candidate profile",
        )
    } else if d.contains("seo") || d.contains("website") {
        layout(
            "Website Analysis Report",
            "#667eea",
            "      <h1>[WEBSITE_NAME]</h1>\n      <p>Grade <strong>[SEO_GRADE]</strong> | Score <strong>[SEO_SCORE]</strong></p>",
            &[
                block("Key Findings", "[KEY_FINDINGS]"),
                highlight("Recommendations", "[RECOMMENDATIONS]"),
                block("Technical Analysis", "[TECHNICAL_DETAILS]"),
            ],
            "Website analysis",
        )
    } else {
        let title = escape_html(description.trim());
        layout(
            &format!("{title} Report"),
            "#333333",
            &format!("      <h1>{title}</h1>\n      <p class=\"meta\">Professional Analysis Report</p>"),
            &[
                block("Executive Summary", "[SUMMARY]"),
                block("Key Details", "[KEY_DETAILS]"),
                block("Analysis", "[ANALYSIS]"),
                block("Recommendations", "[RECOMMENDATIONS]"),
            ],
            "Formatted report",
        )
    }
}

// ── Caller-supplied values ───────────────────────────────────────────────

/// Replace `{{key}}` and `[KEY]` placeholders with caller-supplied values.
///
/// Keys match `{{key}}` exactly and `[KEY]` in upper case. Values are
/// inserted as-is and may contain markup. Unknown placeholders are left for
/// the model (or the fallback) to fill.
pub fn fill_placeholders(template: &str, values: &BTreeMap<String, String>) -> String {
    values.iter().fold(template.to_string(), |html, (key, value)| {
        html.replace(&format!("{{{{{key}}}}}"), value)
            .replace(&format!("[{}]", key.to_uppercase()), value)
    })
}
