//! Instruction templates
//!
//! Every generation request picks one template and fills in the target
//! platform and the caller's raw idea. All templates share the same
//! inference call; they differ only in the text around the two slots.

use serde::{Deserialize, Serialize};

/// Platform label used when the caller does not name one
pub const DEFAULT_PLATFORM: &str = "Generic";

const PLATFORM_SLOT: &str = "{platform}";
const IDEA_SLOT: &str = "{user_prompt}";

const REWRITE_TEMPLATE: &str = r#"
You are a professional AI prompt engineer whose job is to transform rough, unclear, or weak user input into a precise, high-quality, results-driven prompt.

The rewritten prompt should be optimized for this target platform:
{platform}

Your goal is to make the user’s intent clearer, more structured, and more effective so that the chosen AI platform produces a significantly better result.

You must follow ALL of these rules:

• Output a single rewritten prompt — no explanations, no analysis, no commentary  
• Do not include lists, bullet points, or numbered steps  
• Do not include quotation marks  
• Do not include headings  
• Do not mention the user, rules, or yourself  
• Do not repeat the input — improve it  

The rewritten prompt must:
- Be clearer than the original  
- Be more specific than the original  
- Preserve the user’s intent  
- Remove ambiguity  
- Add useful constraints where appropriate  
- Use natural, professional language  

If the input is vague, infer the most likely intent and make it concrete.  
If the input is short, expand it.  
If the input is messy, clean it up.  
If the input is detailed, refine and sharpen it.

Adapt tone, structure, and phrasing to match the selected platform when relevant.

The output should feel like something written by a skilled professional who knows exactly how to get the best possible result from an AI.

User input:
{user_prompt}
"#;

const CINEMATIC_TEMPLATE: &str = r#"
You are a concept artist and director of photography who writes prompts for AI image generators.

Write one image prompt tuned for this image platform:
{platform}

Turn the idea below into a single cinematic scene. Describe the subject, the setting, the moment in time, the lighting, the lens and camera angle, the color palette, and the overall mood. Favor concrete visual detail over abstract adjectives, and use the vocabulary the chosen platform responds to best.

Rules:
• Output only the prompt, as one flowing paragraph
• No explanations, headings, lists, or quotation marks
• Do not mention the user, these rules, or yourself
• Keep it under 120 words

Idea:
{user_prompt}
"#;

const STRUCTURED_TEMPLATE: &str = r#"
You are an expert prompt writer for AI image generators.

Target platform:
{platform}

Rewrite the idea below as an image prompt of exactly five lines, in this order and with these labels:
Subject: who or what is shown, with defining details
Setting: where and when the scene takes place
Style: medium, artistic influence, and rendering quality
Lighting: light sources, time of day, and atmosphere
Camera: framing, angle, and lens

Rules:
• Exactly five lines, nothing before or after them
• No explanations, quotation marks, or commentary
• Do not mention the user, these rules, or yourself

Idea:
{user_prompt}
"#;

/// The instruction variants a caller can request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptTemplate {
    /// Rewrite a rough text prompt for a chat/text platform
    #[default]
    Rewrite,
    /// Single-paragraph cinematic image prompt
    Cinematic,
    /// Five labelled lines for image generators
    Structured,
}

impl PromptTemplate {
    pub const ALL: [PromptTemplate; 3] = [
        PromptTemplate::Rewrite,
        PromptTemplate::Cinematic,
        PromptTemplate::Structured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptTemplate::Rewrite => "rewrite",
            PromptTemplate::Cinematic => "cinematic",
            PromptTemplate::Structured => "structured",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            PromptTemplate::Rewrite => REWRITE_TEMPLATE,
            PromptTemplate::Cinematic => CINEMATIC_TEMPLATE,
            PromptTemplate::Structured => STRUCTURED_TEMPLATE,
        }
    }

    /// Build the final instruction for `platform` and `idea`
    pub fn render(&self, platform: &str, idea: &str) -> String {
        fill_slots(self.text(), platform, idea)
    }
}

// Single left-to-right pass: substituted values are never rescanned, so
// braces inside caller input stay literal.
fn fill_slots(template: &str, platform: &str, idea: &str) -> String {
    let mut out = String::with_capacity(template.len() + platform.len() + idea.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(after) = tail.strip_prefix(PLATFORM_SLOT) {
            out.push_str(platform);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(IDEA_SLOT) {
            out.push_str(idea);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_has_both_slots() {
        for template in PromptTemplate::ALL {
            assert!(template.text().contains(PLATFORM_SLOT), "{}", template.as_str());
            assert!(template.text().contains(IDEA_SLOT), "{}", template.as_str());
        }
    }

    #[test]
    fn test_render_fills_slots() {
        let instruction = PromptTemplate::Rewrite.render("Midjourney", "a cat on a skateboard");
        assert!(instruction.contains("target platform:\nMidjourney\n"));
        assert!(instruction.ends_with("User input:\na cat on a skateboard\n"));
        assert!(!instruction.contains(PLATFORM_SLOT));
        assert!(!instruction.contains(IDEA_SLOT));
    }

    #[test]
    fn test_rewrite_rule_lines_keep_hard_breaks() {
        let text = PromptTemplate::Rewrite.text();
        assert!(text.contains("no analysis, no commentary  \n"));
        assert!(text.contains("- Be clearer than the original  \n"));
        assert!(text.contains("If the input is messy, clean it up.  \n"));
        assert!(text.contains("refine and sharpen it.\n"));
    }

    #[test]
    fn test_render_leaves_caller_braces_alone() {
        let instruction = fill_slots("[{platform}] {user_prompt} {other}", "{user_prompt}", "{platform} json {a: 1}");
        assert_eq!(instruction, "[{user_prompt}] {platform} json {a: 1} {other}");
    }

    #[test]
    fn test_template_names() {
        assert_eq!(PromptTemplate::default(), PromptTemplate::Rewrite);
        let parsed: PromptTemplate = serde_json::from_str("\"structured\"").unwrap();
        assert_eq!(parsed, PromptTemplate::Structured);
        assert!(serde_json::from_str::<PromptTemplate>("\"poem\"").is_err());
        assert_eq!(PromptTemplate::Cinematic.as_str(), "cinematic");
    }
}
