use std::fmt;

/// The two unlearning methods this tool pits against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Cognac,
    CognacDescent,
}

impl Variant {
    /// Processing order. Ties in the comparison go to the first entry.
    pub const ALL: [Variant; 2] = [Variant::Cognac, Variant::CognacDescent];

    /// Name understood by `--unlearning_model` and used as the key in result logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Cognac => "cognac",
            Variant::CognacDescent => "cognac-descent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Variant::Cognac => "Cognac (full method)",
            Variant::CognacDescent => "Cognac-Descent (descent only)",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
