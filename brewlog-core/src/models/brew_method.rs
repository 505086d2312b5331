use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The brewing methods a journal entry can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrewMethod {
    #[serde(rename = "French Press")]
    FrenchPress,
    #[serde(rename = "Pour Over")]
    PourOver,
    #[serde(rename = "Espresso")]
    Espresso,
    #[serde(rename = "AeroPress")]
    AeroPress,
    #[serde(rename = "Cold Brew")]
    ColdBrew,
    #[serde(rename = "Chemex")]
    Chemex,
    #[serde(rename = "V60")]
    V60,
    #[serde(rename = "Moka Pot")]
    MokaPot,
    #[serde(rename = "Drip Coffee")]
    DripCoffee,
}

impl BrewMethod {
    pub const ALL: [BrewMethod; 9] = [
        BrewMethod::FrenchPress,
        BrewMethod::PourOver,
        BrewMethod::Espresso,
        BrewMethod::AeroPress,
        BrewMethod::ColdBrew,
        BrewMethod::Chemex,
        BrewMethod::V60,
        BrewMethod::MokaPot,
        BrewMethod::DripCoffee,
    ];

    /// The literal label stored with each entry.
    pub fn as_str(&self) -> &'static str {
        match self {
            BrewMethod::FrenchPress => "French Press",
            BrewMethod::PourOver => "Pour Over",
            BrewMethod::Espresso => "Espresso",
            BrewMethod::AeroPress => "AeroPress",
            BrewMethod::ColdBrew => "Cold Brew",
            BrewMethod::Chemex => "Chemex",
            BrewMethod::V60 => "V60",
            BrewMethod::MokaPot => "Moka Pot",
            BrewMethod::DripCoffee => "Drip Coffee",
        }
    }
}

/// Returns true if `value` is exactly one of the stored method labels.
pub fn is_brew_method(value: &str) -> bool {
    BrewMethod::ALL.iter().any(|m| m.as_str() == value)
}

impl fmt::Display for BrewMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrewMethod {
    type Err = String;

    /// Accepts the stored label in any case, with spaces, dashes or
    /// underscores between words ("pour over", "pour-over", "POUR_OVER").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        BrewMethod::ALL
            .into_iter()
            .find(|m| normalize(m.as_str()) == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = BrewMethod::ALL.iter().map(|m| m.as_str()).collect();
                format!(
                    "Invalid brew method '{}'. Valid options: {}",
                    s,
                    valid.join(", ")
                )
            })
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}
