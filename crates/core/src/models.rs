use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    Say,
    Call,
    Whatsapp,
    EmailsRead,
    #[default]
    Unknown,
}

impl IntentAction {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Say => "say",
            Self::Call => "call",
            Self::Whatsapp => "whatsapp",
            Self::EmailsRead => "emails_read",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Es,
    En,
}

impl Language {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }
}

/// Structured result returned for every query.
///
/// Payload fields only carry data for the action they belong to; everything
/// else stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResponse {
    #[serde(default)]
    pub action: IntentAction,
    pub say: Option<String>,
    pub call_number: Option<String>,
    pub call_contact: Option<String>,
    pub whatsapp_contact: Option<String>,
    pub whatsapp_message: Option<String>,
    pub emails: Option<Vec<String>>,
}

impl IntentResponse {
    /// Field names accepted from external classifier payloads.
    pub const FIELDS: [&'static str; 7] = [
        "action",
        "say",
        "call_number",
        "call_contact",
        "whatsapp_contact",
        "whatsapp_message",
        "emails",
    ];

    pub fn new(action: IntentAction) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    pub fn with_say(mut self, text: impl Into<String>) -> Self {
        self.say = Some(text.into());
        self
    }

    pub fn is_recognized_field(name: &str) -> bool {
        Self::FIELDS.iter().any(|field| *field == name)
    }
}
