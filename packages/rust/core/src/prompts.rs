//! Prompt templates for the model-backed stages.
//!
//! Templates are static text with `{name}` placeholders. [`render`] fills the
//! named placeholders and leaves everything else untouched, including braces
//! that do not match a supplied name.

/// Sentinel the detection stage emits when nothing is found.
pub const NO_FALLACIES_SENTINEL: &str = "No logical fallacies detected.";

pub const SUMMARY_TEMPLATE: &str = "\
You are a communications expert. Analyze this news article and create a precise 5-sentence summary.

INSTRUCTIONS:
- Be accurate, do not invent information
- Focus on main arguments and evidence
- Think step by step

LOGICAL FALLACIES TO WATCH FOR:
{fallacies}

ARTICLE:
{content}

SUMMARY (5 sentences):";

pub const DETECTION_TEMPLATE: &str = "\
You are an ethics professor reviewing a news article for logical fallacies.

Use only the fallacies defined below. For each fallacy you find, report:
1. **Fallacy**: the name as listed in the definitions
2. **Evidence**: a short direct quote from the article
3. **Reasoning**: why the quoted passage commits this fallacy
4. **Confidence**: one of Low, Medium, or High

If the article contains no logical fallacies, respond with exactly:
No logical fallacies detected.

FALLACY DEFINITIONS:
{fallacies}

ARTICLE:
{content}

ANALYSIS:";

pub const EXPLANATION_TEMPLATE: &str = "\
You are a patient teacher of critical thinking. For each fallacy identified below,
write a short educational explanation for a general reader:
- What the fallacy is, in plain language
- How it shows up in the quoted evidence
- How a careful reader could recognize and counter it

If the analysis states that no logical fallacies were detected, explain briefly what
that means for how the article can be read.

DETECTED FALLACIES:
{detected_fallacies}

EDUCATIONAL EXPLANATIONS:";

pub const SYNTHESIS_TEMPLATE: &str = "\
You are an editor preparing a final media-literacy report on a news article.
Combine the article summary and the educational analysis into one report with:
1. **Overview**: what the article argues
2. **Reasoning Quality**: the main weaknesses found, ordered by importance
3. **Reader Guidance**: what a reader should keep in mind

ARTICLE SUMMARY:
{summary}

EDUCATIONAL ANALYSIS:
{explanations}

FINAL REPORT:";

/// Substitute each `{name}` in `template` with its value.
///
/// Values are inserted verbatim and never re-scanned, so article text that
/// happens to contain `{content}` is not expanded again.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let values_len: usize = vars.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + values_len);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });

        match replaced {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
