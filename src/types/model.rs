use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a completion model identifier.
///
/// This can be a predefined model or a custom string value for models served by
/// compatible endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (fine-tunes, self-hosted, or future models)
    Custom(String),
}

/// Known text-completion models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// GPT-3.5 Turbo Instruct
    #[serde(rename = "gpt-3.5-turbo-instruct")]
    Gpt35TurboInstruct,

    /// Davinci 002
    #[serde(rename = "davinci-002")]
    Davinci002,

    /// Babbage 002
    #[serde(rename = "babbage-002")]
    Babbage002,
}

impl KnownModel {
    const ALL: [KnownModel; 3] = [
        KnownModel::Gpt35TurboInstruct,
        KnownModel::Davinci002,
        KnownModel::Babbage002,
    ];

    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Gpt35TurboInstruct => "gpt-3.5-turbo-instruct",
            KnownModel::Davinci002 => "davinci-002",
            KnownModel::Babbage002 => "babbage-002",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{}", known_model),
            Model::Custom(custom) => write!(f, "{}", custom),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnownModel::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

impl FromStr for Model {
    type Err = String;

    /// Never fails: unrecognized names become [`Model::Custom`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<KnownModel>()
            .map(Model::Known)
            .unwrap_or_else(|_| Model::Custom(s.to_string())))
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gpt35TurboInstruct)
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Model::Custom(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::Custom(model.to_string())
    }
}
