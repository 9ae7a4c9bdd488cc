use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Write,
    Suggest,
    Chat,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Write => "WRITE",
            Intent::Suggest => "SUGGEST",
            Intent::Chat => "CHAT",
        }
    }
}

const WRITE_KEYWORDS: &[&str] = &[
    "eintragen",
    "neuer termin",
    "erinnere mich",
    "aufgabe",
    "planen",
    "hinzufügen",
    "termin am",
    "termin um",
    "notiere",
    "schreibe auf",
    "kannst du mir",
    "trag mir",
    "trage",
    "trag",
    "ich würde gerne",
    "ich möchte",
    "ich will",
    "brauche einen termin",
];

const SUGGEST_KEYWORDS: &[&str] = &[
    "schlag mir",
    "schlag vor",
    "wann passt",
    "finde einen termin",
    "wann habe ich zeit",
    "wann ist platz",
    "lücke",
    "frei",
    "empfehle",
    "vorschlag",
    "wie sieht es aus",
    "was liegt an",
    "termine",
    "nächste woche",
    "meine woche",
    "wochenübersicht",
    "zeig mir meine termine",
    "wie sieht meine nächste woche aus",
    "wie sieht meine woche aus",
    "was habe ich",
];

/// Ordered rule evaluation: explicit scheduling verbs dominate the fuzzier
/// availability vocabulary, so WRITE is checked before SUGGEST.
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    if WRITE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Intent::Write;
    }
    if SUGGEST_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Intent::Suggest;
    }
    let mentions_time_question =
        lower.contains("wann") || lower.contains("habe") || lower.contains("hab");
    if mentions_time_question && lower.contains("zeit") {
        return Intent::Suggest;
    }
    Intent::Chat
}
