//! Keyword heuristic assigning a [`DocType`] to a document.

use crate::types::DocType;

// Keyword lists are Norwegian because the corpus is. Categories are not
// mutually exclusive in keyword space (a venue page may mention parking and
// contact details), so matching runs in a fixed priority order and the first
// hit wins — required for reproducible assignments.
const TICKETING: &[&str] = &[
    "billett", "billetter", "sesongkort", "foyka+", "foyka plus", "pris", "kostnad", "inngang",
    "adgang",
];
const SCHEDULE: &[&str] = &[
    "terminliste", "kamp", "kamper", "resultat", "resultater", "tabell", "serie", "postnord",
];
const CONTACT: &[&str] = &[
    "kontakt", "telefon", "tlf", "mail", "e-post", "epost", "adresse", "kirkeveien", "postadresse",
];
const COMMUNITY: &[&str] = &[
    "samfunn", "gatelag", "asker united", "hæppe", "brobygger", "samfunnslag",
    "aktivt lokalsamfunn", "sammen for fotball",
];
const HISTORY: &[&str] = &[
    "historie", "historisk", "stiftet", "grunnlagt", "rekord", "adelskalender", "fakta",
    "spillere", "topp", "legender",
];
const VENUE: &[&str] = &[
    "stadion", "føyka", "foyka", "fotballhuset", "tribune", "kapasitet", "parkering", "vip",
    "medie",
];
const ROSTER: &[&str] = &[
    "a-lag", "spillere", "keeper", "forsvar", "midtbane", "angrep", "trener", "spillertropp",
    "lag",
];
const SPONSORSHIP: &[&str] = &[
    "marked", "partner", "sponsor", "synlighet", "nettverk", "sponsoravtale",
];
const ACTIVITIES: &[&str] = &[
    "akademi", "camp", "obos", "trening", "aktivitet", "kurs", "leir",
];

const PRIORITY: &[(DocType, &[&str])] = &[
    (DocType::Ticketing, TICKETING),
    (DocType::Schedule, SCHEDULE),
    (DocType::Contact, CONTACT),
    (DocType::Community, COMMUNITY),
    (DocType::History, HISTORY),
    (DocType::Venue, VENUE),
    (DocType::Roster, ROSTER),
    (DocType::Sponsorship, SPONSORSHIP),
    (DocType::Activities, ACTIVITIES),
];

impl DocType {
    /// Infer a document's category from its filename and the start of its
    /// content. Pure and deterministic: the same inputs always classify the
    /// same way.
    pub fn infer(filename: &str, text: &str) -> DocType {
        let prefix: String = text.chars().take(400).collect();
        let haystack = format!("{} {}", filename, prefix).to_lowercase();
        for (doc_type, keywords) in PRIORITY {
            if keywords.iter().any(|kw| haystack.contains(kw)) {
                return *doc_type;
            }
        }
        DocType::Unknown
    }
}
