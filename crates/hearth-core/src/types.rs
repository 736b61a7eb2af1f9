use std::fmt;

/// Persona preset selecting the system instruction prefix.
///
/// Wire tags are `neutral`, `gf`, `professional` and `funny`. Anything else
/// resolves to [`Mode::Neutral`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Neutral,
    /// Affectionate, warm persona.
    Gf,
    Professional,
    Funny,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Neutral, Mode::Gf, Mode::Professional, Mode::Funny];

    /// Resolve a wire tag. Matching is exact; unknown tags fall back to neutral.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "gf" => Mode::Gf,
            "professional" => Mode::Professional,
            "funny" => Mode::Funny,
            _ => Mode::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Neutral => "neutral",
            Mode::Gf => "gf",
            Mode::Professional => "professional",
            Mode::Funny => "funny",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
