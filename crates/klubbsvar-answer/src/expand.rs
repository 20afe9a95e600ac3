//! Domain-aware query expansion.
//!
//! A static synonym table maps football-club topics to trigger words. When a
//! trigger appears in the (lowercased, boilerplate-stripped) query, the
//! topic's whole word list joins the search terms, and topics that
//! correspond to a document category mark that category as preferred for
//! re-ranking. Queries with no trigger pass through untouched — the common
//! case, not an error.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use klubbsvar_core::types::DocType;

const BILLETT: &[&str] = &[
    "billett", "billetter", "sesongkort", "sesong-kort", "sesongabonnement", "foyka+",
    "foyka plus", "pris", "priser", "kostnad", "inngang", "adgang",
];
const KAMP: &[&str] = &[
    "kamp", "kamper", "terminliste", "kampdag", "kampdager", "avspark", "match", "program",
    "kampstart",
];
const PARKERING: &[&str] = &[
    "parkering", "parkere", "p-plass", "p-plasser", "parkeringsplass", "easypark", "bil",
];
const STADION: &[&str] = &[
    "stadion", "arena", "føyka", "foyka", "anlegg", "tribune", "stadio", "fotballhuset",
];
const MEDLEMSKAP: &[&str] = &[
    "medlemskap", "medlem", "kontingent", "medlemskontingent", "innmelding", "bli medlem",
];
const KONTAKT: &[&str] = &[
    "kontakt", "telefon", "tlf", "mail", "e-post", "email", "adresse", "epost",
];
const APNINGSTIDER: &[&str] = &["åpningstider", "åpner", "åpent", "stengt", "åpningstid"];
const SPONSOR: &[&str] = &[
    "sponsor", "sponsorer", "partner", "partnere", "marked", "bedriftsnettverk",
];
const SAMFUNN: &[&str] = &[
    "samfunn", "gatelag", "asker united", "community", "sammen for fotball", "aktiviteter",
];
const HISTORIE: &[&str] = &[
    "historie", "historisk", "grunnlagt", "stiftet", "rekord", "legender", "fakta",
];
const LAG: &[&str] = &[
    "lag", "spillere", "spillertropp", "trener", "keeper", "forsvar", "midtbane", "angrep",
    "a-lag",
];
const MARKED: &[&str] = &[
    "marked", "partner", "sponsor", "sponsorer", "nettverk", "synlighet",
];
const AKTIVITET: &[&str] = &[
    "aktivitet", "akademi", "camp", "kurs", "leir", "trening", "lek",
];

const SYNONYMS: &[&[&str]] = &[
    BILLETT,
    KAMP,
    PARKERING,
    STADION,
    MEDLEMSKAP,
    KONTAKT,
    APNINGSTIDER,
    SPONSOR,
    SAMFUNN,
    HISTORIE,
    LAG,
    MARKED,
    AKTIVITET,
];

/// Trigger lists keyed to the document category they should boost.
const DOC_HINTS: &[(DocType, &[&str])] = &[
    (DocType::Ticketing, BILLETT),
    (DocType::Schedule, KAMP),
    (DocType::Contact, KONTAKT),
    (DocType::Community, SAMFUNN),
    (DocType::History, HISTORIE),
    (DocType::Venue, STADION),
    (DocType::Roster, LAG),
    (DocType::Sponsorship, MARKED),
    (DocType::Activities, AKTIVITET),
];

// Brand mentions carry no topical signal and would bias matching.
static CLUB_NAMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\basker fotball\b|\basker fk\b|\bføyka\b").expect("static regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    /// Original query, optionally extended with the matched synonym terms.
    pub query: String,
    /// Categories whose hits get the re-rank bonus.
    pub preferred: BTreeSet<DocType>,
    /// Deduplicated, sorted terms — sorted for determinism, not ranking.
    pub terms: Vec<String>,
}

pub fn expand_query(query: &str) -> Expansion {
    let lowered = query.to_lowercase();
    let stripped = CLUB_NAMES.replace_all(&lowered, " ");
    let stripped = stripped.trim();

    let mut preferred = BTreeSet::new();
    for (doc_type, triggers) in DOC_HINTS {
        if triggers.iter().any(|t| stripped.contains(t)) {
            preferred.insert(*doc_type);
        }
    }

    let mut terms = BTreeSet::new();
    for words in SYNONYMS {
        if words.iter().any(|t| stripped.contains(t)) {
            terms.extend(words.iter().map(|w| w.to_string()));
        }
    }
    let terms: Vec<String> = terms.into_iter().collect();

    let expanded = if terms.is_empty() {
        query.to_string()
    } else {
        format!("{} {}", query, terms.join(" "))
    };

    Expansion {
        query: expanded,
        preferred,
        terms,
    }
}
