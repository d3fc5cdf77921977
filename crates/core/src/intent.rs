use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{IntentAction, IntentResponse, Language};

pub const CALL_CONFIRMATION_PREFIX: &str = "Llamando a";
pub const GREETING_REPLY: &str = "Hola, ¿qué necesitas?";
pub const EMAILS_READ_REPLY: &str = "Te leo los últimos correos.";
pub const SAMPLE_EMAILS: [&str; 2] = [
    "Gmail: Mick — Confirmación de fecha para shutters",
    "Gmail: Anderson — Vauxhall next Wednesday",
];

/// Intent categories in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Whatsapp,
    Call,
    EmailsRead,
    Greeting,
}

impl IntentCategory {
    pub const ORDER: [IntentCategory; 4] = [
        IntentCategory::Whatsapp,
        IntentCategory::Call,
        IntentCategory::EmailsRead,
        IntentCategory::Greeting,
    ];

    pub fn action(self) -> IntentAction {
        match self {
            Self::Whatsapp => IntentAction::Whatsapp,
            Self::Call => IntentAction::Call,
            Self::EmailsRead => IntentAction::EmailsRead,
            Self::Greeting => IntentAction::Say,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Whatsapp => "whatsapp",
            Self::Call => "call",
            Self::EmailsRead => "emails_read",
            Self::Greeting => "greeting",
        }
    }
}

#[derive(Debug, Error)]
pub enum RuleTableError {
    #[error("invalid {language:?} pattern for {category:?} rule: {source}")]
    InvalidPattern {
        category: IntentCategory,
        language: Language,
        #[source]
        source: regex::Error,
    },
}

type RuleBuilder = fn(&Captures<'_>) -> IntentResponse;

struct RuleSpec {
    category: IntentCategory,
    language: Language,
    pattern: &'static str,
    build: RuleBuilder,
}

// Category order is significant: the messaging shape requires a contact/message
// separator and must be tried before the looser call shape.
const STANDARD_RULES: &[RuleSpec] = &[
    RuleSpec {
        category: IntentCategory::Whatsapp,
        language: Language::Es,
        pattern: r"(?i)(whatsapp|wasap|manda|envía|enviar) (a )?(?P<contact>[^:]+): (?P<message>.+)$",
        build: build_whatsapp,
    },
    RuleSpec {
        category: IntentCategory::Whatsapp,
        language: Language::En,
        pattern: r"(?i)(send|whatsapp) to (?P<contact>[^:]+): (?P<message>.+)$",
        build: build_whatsapp,
    },
    RuleSpec {
        category: IntentCategory::Call,
        language: Language::Es,
        pattern: r"(?i)llama(r)? a (?P<contact>.+)$",
        build: build_call,
    },
    RuleSpec {
        category: IntentCategory::Call,
        language: Language::En,
        pattern: r"(?i)call (?P<contact>.+)$",
        build: build_call,
    },
    RuleSpec {
        category: IntentCategory::EmailsRead,
        language: Language::Es,
        pattern: r"(?i)(léeme|lee|leer)( mis)? (correos|emails|gmail)",
        build: build_emails_read,
    },
    RuleSpec {
        category: IntentCategory::EmailsRead,
        language: Language::En,
        pattern: r"(?i)(read|check) (my )?(emails|gmail)",
        build: build_emails_read,
    },
    RuleSpec {
        category: IntentCategory::Greeting,
        language: Language::Es,
        pattern: r"(?i)hola|buenos dias|buenas tardes|buenas noches",
        build: build_greeting,
    },
];

static STANDARD_TABLE: Lazy<RuleTable> =
    Lazy::new(|| RuleTable::try_standard().expect("built-in intent patterns compile"));

/// Trims surrounding whitespace; casing, punctuation and inner spacing are kept.
pub fn normalize_query(input: &str) -> String {
    input.trim().to_string()
}

#[derive(Clone)]
pub struct Rule {
    pub category: IntentCategory,
    pub language: Language,
    regex: Regex,
    build: RuleBuilder,
}

impl Rule {
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn evaluate(&self, text: &str) -> Option<IntentResponse> {
        self.regex.captures(text).map(|caps| (self.build)(&caps))
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("category", &self.category)
            .field("language", &self.language)
            .field("pattern", &self.regex.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub category: IntentCategory,
    pub language: Language,
    pub response: IntentResponse,
}

/// Ordered, read-only set of intent rules.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn try_standard() -> Result<Self, RuleTableError> {
        let mut rules = Vec::with_capacity(STANDARD_RULES.len());
        for spec in STANDARD_RULES {
            let regex =
                Regex::new(spec.pattern).map_err(|source| RuleTableError::InvalidPattern {
                    category: spec.category,
                    language: spec.language,
                    source,
                })?;
            rules.push(Rule {
                category: spec.category,
                language: spec.language,
                regex,
                build: spec.build,
            });
        }
        Ok(Self { rules })
    }

    pub fn standard() -> Self {
        RuleTable::clone(&STANDARD_TABLE)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the first matching rule's response. Rules are stored category
    /// by category, language variants in order, so the first hit in storage
    /// order is also the first hit in category order.
    pub fn match_query(&self, query: &str) -> Option<RuleMatch> {
        self.rules.iter().find_map(|rule| {
            rule.evaluate(query).map(|response| RuleMatch {
                category: rule.category,
                language: rule.language,
                response,
            })
        })
    }
}

fn build_whatsapp(caps: &Captures<'_>) -> IntentResponse {
    let contact = trimmed_capture(caps, "contact");
    let message = trimmed_capture(caps, "message");

    let mut response = IntentResponse::new(IntentAction::Whatsapp)
        .with_say(format!("Ok, enviando WhatsApp a {contact}."));
    response.whatsapp_contact = Some(contact);
    response.whatsapp_message = Some(message);
    response
}

fn build_call(caps: &Captures<'_>) -> IntentResponse {
    let contact = trimmed_capture(caps, "contact");

    let mut response = IntentResponse::new(IntentAction::Call)
        .with_say(format!("{CALL_CONFIRMATION_PREFIX} {contact}."));
    response.call_contact = Some(contact);
    response
}

fn build_emails_read(_caps: &Captures<'_>) -> IntentResponse {
    let mut response = IntentResponse::new(IntentAction::EmailsRead).with_say(EMAILS_READ_REPLY);
    response.emails = Some(SAMPLE_EMAILS.iter().map(ToString::to_string).collect());
    response
}

fn build_greeting(_caps: &Captures<'_>) -> IntentResponse {
    IntentResponse::new(IntentAction::Say).with_say(GREETING_REPLY)
}

fn trimmed_capture(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().trim())
        .unwrap_or_default()
        .to_string()
}
