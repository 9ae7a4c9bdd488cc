//! Language-specific word tables for the German extractor. These are data,
//! not logic: swapping the language means swapping this module.

/// German month names in calendar order.
pub const MONTHS: &[(&str, u32)] = &[
    ("januar", 1),
    ("februar", 2),
    ("märz", 3),
    ("april", 4),
    ("mai", 5),
    ("juni", 6),
    ("juli", 7),
    ("august", 8),
    ("september", 9),
    ("oktober", 10),
    ("november", 11),
    ("dezember", 12),
];

/// German weekday names, Monday first (chrono's numbering).
pub const WEEKDAYS: &[&str] = &[
    "montag",
    "dienstag",
    "mittwoch",
    "donnerstag",
    "freitag",
    "samstag",
    "sonntag",
];

pub const PM_WORDS: &[&str] = &[
    "abend",
    "abends",
    "nachmittag",
    "nachmittags",
    "spät",
    "später",
];

pub const NIGHT_WORDS: &[&str] = &["nacht", "nachts"];

pub const URGENT_WORDS: &[&str] = &[
    "wichtig",
    "dringend",
    "eilig",
    "hohe priorität",
    "alarm",
    "priorität hoch",
    "!",
];

/// Color words users mention that the calendar cannot render. They are
/// surfaced back to the user instead of being silently dropped.
pub const UNSUPPORTED_COLORS: &[&str] = &[
    "lila", "orange", "schwarz", "weiß", "grau", "pink", "braun", "türkis", "violett", "gold",
    "silber", "bunt", "magenta", "beige",
];

/// Words stripped from an utterance before the residual tokens are treated
/// as a title: temporal words, fillers, politeness, recurrence, color and
/// priority vocabulary.
pub const STOP_WORDS: &[&str] = &[
    "morgen",
    "übermorgen",
    "heute",
    "uhr",
    "am",
    "um",
    "den",
    "der",
    "die",
    "das",
    "termin",
    "eintragen",
    "planen",
    "bitte",
    "ich",
    "brauche",
    "einen",
    "habe",
    "montag",
    "dienstag",
    "mittwoch",
    "donnerstag",
    "freitag",
    "samstag",
    "sonntag",
    "hätte",
    "gerne",
    "mit",
    "dem",
    "titel",
    "namens",
    "betreff",
    "für",
    "ein",
    "eine",
    "mir",
    "uns",
    "wir",
    "wollen",
    "möchte",
    "möchten",
    "soll",
    "heißen",
    "lauten",
    "erinnere",
    "mich",
    "an",
    "aufgabe",
    "notiere",
    "schreibe",
    "auf",
    "kannst",
    "du",
    "trag",
    "fürs",
    "ans",
    "ins",
    "vom",
    "zum",
    "zur",
    "hallo",
    "hi",
    "hey",
    "guten",
    "tag",
    "moin",
    "servus",
    "abend",
    "mittag",
    "nacht",
    "vormittag",
    "nachmittag",
    "früh",
    "spät",
    "mal",
    "eben",
    "schnell",
    "kurz",
    "danke",
    "trage",
    "nächsten",
    "nächste",
    "kommenden",
    "kommende",
    "nächstes",
    "dieses",
    "diesen",
    "muss",
    "musst",
    "sry",
    "sorry",
    "ups",
    "upps",
    "entschuldigung",
    "pardon",
    "verzeihung",
    "spielen",
    "gehen",
    "machen",
    "tun",
    "lernen",
    "üben",
    "treffen",
    "sehen",
    "egal",
    "ganz",
    "einerlei",
    "entscheide",
    "entscheidest",
    "wählen",
    "wähle",
    "such",
    "aussuchen",
    "mach",
    "machst",
    "nimm",
    "nehmen",
    "ok",
    "okay",
    "gut",
    "alles",
    "klar",
    "passt",
    "dann",
    "lieber",
    "doch",
    "aber",
    "sonst",
    "wann",
    "hast",
    "zeit",
    "passen",
    "würde",
    "lücke",
    "frei",
    "schlag",
    "schlage",
    "vor",
    "empfehle",
    "empfehlen",
    "welcher",
    "welche",
    "welchem",
    "wichtig",
    "dringend",
    "eilig",
    "alarm",
    "hohe",
    "priorität",
    "mittel",
    "normale",
    "rot",
    "grün",
    "blau",
    "gelb",
    "farbe",
    "markiere",
    "in",
    "täglich",
    "wöchentlich",
    "monatlich",
    "jeden",
    "woche",
    "monat",
];

/// Phrases that mean "you pick" and trigger adoption of a previously
/// offered slot from the conversation history.
pub const AUTO_PICK_PHRASES: &[&str] = &[
    "entscheide",
    "wähle",
    "such aus",
    "egal",
    "mach du",
    "nimm einen",
    "nimm den",
];
