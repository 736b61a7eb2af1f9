use hearth_core::{config::ModesConfig, types::Mode};
use tracing::info;

/// Marker the web UI prepends when the user pastes code for review.
pub const CODE_MARKER: &str = "CODE_SNIPPET:";

/// Math triggers, matched case-insensitively against the trimmed message.
const SOLVE_TRIGGERS: &[&str] = &["solve:", "/solve"];

const MATH_SYSTEM_SUFFIX: &str = " When solving math problems, ALWAYS provide step-by-step \
    reasoning and show intermediate steps clearly. Use numbered steps and explain why.";

const CODE_SYSTEM_SUFFIX: &str = " When reviewing code, be concise, constructive, and include \
    corrected example code if you recommend changes.";

/// System text plus user text for a single generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    /// Single prompt string for `/api/generate`: system, blank line, user.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

// ---------------------------------------------------------------------------
// ModeProfiles
// ---------------------------------------------------------------------------

/// Persona text per [`Mode`]. Built once at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct ModeProfiles {
    neutral: String,
    gf: String,
    professional: String,
    funny: String,
}

impl Default for ModeProfiles {
    fn default() -> Self {
        Self {
            neutral: default_neutral(),
            gf: default_gf(),
            professional: default_professional(),
            funny: default_funny(),
        }
    }
}

impl ModeProfiles {
    /// Built-in personas with any configured replacements applied.
    pub fn from_config(overrides: &ModesConfig) -> Self {
        let defaults = Self::default();
        let pick = |custom: &Option<String>, fallback: String, mode: Mode| match custom {
            Some(text) if !text.trim().is_empty() => {
                info!(mode = %mode, "using configured persona");
                text.clone()
            }
            _ => fallback,
        };

        Self {
            neutral: pick(&overrides.neutral, defaults.neutral, Mode::Neutral),
            gf: pick(&overrides.gf, defaults.gf, Mode::Gf),
            professional: pick(
                &overrides.professional,
                defaults.professional,
                Mode::Professional,
            ),
            funny: pick(&overrides.funny, defaults.funny, Mode::Funny),
        }
    }

    pub fn get(&self, mode: Mode) -> &str {
        match mode {
            Mode::Neutral => &self.neutral,
            Mode::Gf => &self.gf,
            Mode::Professional => &self.professional,
            Mode::Funny => &self.funny,
        }
    }

    /// Lookup by wire tag; unknown tags get the neutral persona.
    pub fn get_by_tag(&self, tag: &str) -> &str {
        self.get(Mode::from_tag(tag))
    }
}

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// What the user is asking for, decided from the message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent<'a> {
    Solve { problem: &'a str },
    CodeReview { code: &'a str },
    Chat,
}

impl<'a> Intent<'a> {
    /// First match wins: math, then code review, then plain chat.
    fn classify(message: &'a str) -> Self {
        let trimmed = message.trim();
        if SOLVE_TRIGGERS
            .iter()
            .any(|t| starts_with_ignore_ascii_case(trimmed, t))
        {
            return Intent::Solve {
                problem: extract_problem(trimmed),
            };
        }

        if let Some(code) = message.strip_prefix(CODE_MARKER) {
            return Intent::CodeReview { code: code.trim() };
        }

        Intent::Chat
    }
}

/// Maps a chat message and persona to the system and user prompt text.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    profiles: ModeProfiles,
}

impl PromptBuilder {
    pub fn new(profiles: ModeProfiles) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &ModeProfiles {
        &self.profiles
    }

    /// Classify `message` and build the prompt pair. Never fails.
    pub fn build(&self, message: &str, mode: Mode) -> PromptPair {
        let base = self.profiles.get(mode);

        match Intent::classify(message) {
            Intent::Solve { problem } => PromptPair {
                system: format!("{base}{MATH_SYSTEM_SUFFIX}"),
                user: format!(
                    "User asked for a step-by-step mathematical solution. Provide extremely \
                     clear, step-by-step reasoning. Use numbered steps, show intermediate \
                     calculations, and if helpful include short explanations for why each \
                     step is valid. Do not skip steps. Problem: {problem}\n\nAssistant:"
                ),
            },
            Intent::CodeReview { code } => PromptPair {
                system: format!("{base}{CODE_SYSTEM_SUFFIX}"),
                user: format!(
                    "User provided a code snippet. Provide a readable review: point out bugs, \
                     suggest improvements, explain what it does, and optionally provide a \
                     cleaned-up version if appropriate. Reply with: 1) Short summary \
                     2) Issues/bugs (if any) 3) Recommended improvements 4) Example improved \
                     code. Code:\n\n{code}\n\nAssistant:"
                ),
            },
            Intent::Chat => PromptPair {
                system: base.to_string(),
                user: format!("User: {message}\nAssistant:"),
            },
        }
    }
}

/// Text after the first `:`, else after the first whitespace, else nothing.
fn extract_problem(trimmed: &str) -> &str {
    if let Some((_, rest)) = trimmed.split_once(':') {
        return rest.trim();
    }
    trimmed
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

fn starts_with_ignore_ascii_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn default_neutral() -> String {
    "You are a highly knowledgeable AI assistant. Answer questions clearly, concisely, and \
     accurately. Keep tone neutral, friendly, and respectful. Avoid jokes, sarcasm, or \
     emotional language. Focus on clarity and useful information. Provide examples or \
     step-by-step explanations when relevant."
        .to_string()
}

fn default_gf() -> String {
    "You are a caring, affectionate AI assistant, responding with warmth and empathy, like a \
     supportive girlfriend. Use sweet and loving language."
        .to_string()
}

fn default_professional() -> String {
    "You are a professional AI assistant. Provide clear, concise, and accurate answers. Use \
     formal and polished language suitable for workplace or academic discussions. Structure \
     responses logically, with numbered points or bullet lists where applicable. Avoid jokes, \
     slang, or casual phrases. Be thorough and precise."
        .to_string()
}

fn default_funny() -> String {
    "You are a humorous AI assistant, responding with wit and lighthearted jokes to entertain \
     the user."
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PromptBuilder {
        PromptBuilder::default()
    }

    #[test]
    fn solve_prefixes_trigger_math_prompt() {
        for msg in [
            "solve: 2x + 3 = 7",
            "Solve: 2x + 3 = 7",
            "/solve 2x + 3 = 7",
            "/SOLVE 2x + 3 = 7",
            "   sOlVe:2x + 3 = 7  ",
        ] {
            let pair = builder().build(msg, Mode::Neutral);
            assert!(pair.user.contains("step-by-step"), "{msg}");
            assert!(pair.user.contains("Problem: 2x + 3 = 7\n\nAssistant:"), "{msg}");
            assert!(!pair.user.to_lowercase().contains("solve:"), "{msg}");
            assert!(!pair.user.to_lowercase().contains("/solve"), "{msg}");
        }
    }

    #[test]
    fn solve_appends_math_suffix_to_persona() {
        let pair = builder().build("/solve 1+1", Mode::Funny);
        let base = default_funny();
        assert!(pair.system.starts_with(&base));
        assert!(pair.system.ends_with(MATH_SYSTEM_SUFFIX));
    }

    #[test]
    fn solve_prefers_colon_over_space() {
        let pair = builder().build("/solve ratio 3:4", Mode::Neutral);
        assert!(pair.user.contains("Problem: 4\n\nAssistant:"));
    }

    #[test]
    fn bare_solve_trigger_yields_empty_problem() {
        let pair = builder().build("/solve", Mode::Neutral);
        assert!(pair.user.ends_with("Problem: \n\nAssistant:"));

        let pair = builder().build("solve:", Mode::Neutral);
        assert!(pair.user.ends_with("Problem: \n\nAssistant:"));
    }

    #[test]
    fn code_marker_requests_four_part_review() {
        let pair = builder().build("CODE_SNIPPET: fn main() {}", Mode::Professional);

        let sections = [
            "1) Short summary",
            "2) Issues/bugs",
            "3) Recommended improvements",
            "4) Example improved code",
        ];
        let positions: Vec<usize> = sections
            .iter()
            .map(|s| pair.user.find(s).expect(s))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(pair.user.contains("Code:\n\nfn main() {}\n\nAssistant:"));
        assert!(pair.system.starts_with(&default_professional()));
        assert!(pair.system.ends_with(CODE_SYSTEM_SUFFIX));
    }

    #[test]
    fn code_marker_is_case_sensitive() {
        let pair = builder().build("code_snippet: x = 1", Mode::Neutral);
        assert_eq!(pair.user, "User: code_snippet: x = 1\nAssistant:");
        assert_eq!(pair.system, default_neutral());
    }

    #[test]
    fn empty_code_passes_through() {
        let pair = builder().build("CODE_SNIPPET:", Mode::Neutral);
        assert!(pair.user.contains("Code:\n\n\n\nAssistant:"));
    }

    #[test]
    fn math_wins_over_code_marker() {
        // "solve:" is checked first even when the rest looks like code
        let pair = builder().build("solve: CODE_SNIPPET: 1+1", Mode::Neutral);
        assert!(pair.system.ends_with(MATH_SYSTEM_SUFFIX));
    }

    #[test]
    fn plain_message_is_wrapped_verbatim() {
        let pair = builder().build("  hello there ", Mode::Gf);
        assert_eq!(pair.user, "User:   hello there \nAssistant:");
        assert_eq!(pair.system, default_gf());
    }

    #[test]
    fn unknown_mode_uses_neutral_persona() {
        let profiles = ModeProfiles::default();
        assert_eq!(profiles.get_by_tag("pirate"), profiles.get(Mode::Neutral));

        let b = builder();
        for msg in ["hi", "/solve 1+1", "CODE_SNIPPET: x"] {
            assert_eq!(
                b.build(msg, Mode::from_tag("pirate")).system,
                b.build(msg, Mode::Neutral).system
            );
        }
    }

    #[test]
    fn combined_joins_with_blank_line() {
        let pair = PromptPair {
            system: "sys".to_string(),
            user: "User: hi\nAssistant:".to_string(),
        };
        assert_eq!(pair.combined(), "sys\n\nUser: hi\nAssistant:");
    }

    #[test]
    fn configured_persona_replaces_builtin() {
        let overrides = ModesConfig {
            funny: Some("Only puns.".to_string()),
            gf: Some("   ".to_string()),
            ..Default::default()
        };
        let profiles = ModeProfiles::from_config(&overrides);
        assert_eq!(profiles.get(Mode::Funny), "Only puns.");
        // blank overrides are ignored
        assert_eq!(profiles.get(Mode::Gf), default_gf());
        assert_eq!(profiles.get(Mode::Neutral), default_neutral());
    }
}
