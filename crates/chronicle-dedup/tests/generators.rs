#![allow(dead_code)]

use chronicle_core::identity::{CountryDefinition, CountryIdentityTable};
use chronicle_core::model::{Catalog, CatalogEntry, EventRecord, Slot};
use proptest::prelude::*;
use serde_json::{Number, Value, json};

pub const CATEGORIES: &[&str] = &["war", "politics", "culture"];

const COUNTRIES: &[&str] = &["Türkiye", "Turkiye", "Turkey", "Fransa", "France", "Atlantis"];

const TITLES: &[&str] = &[
    "12 Eylül Darbesi",
    "12 eylül darbesi.",
    "12 Eylül Askeri Darbesi",
    "Berlin Duvarının Yıkılışı",
    "Berlin Duvarının Yıkılması",
    "Mayıs 68",
    "Guernica",
    "The Silence of the Lambs",
    "Silence of the Lambs",
];

const LINKS: &[&str] = &["https://tr.wikipedia.org/wiki/A", "https://tr.wikipedia.org/wiki/B"];

const DESCRIPTIONS: &[&str] = &["", "kısa", "biraz daha uzun", "en uzun açıklama metni burada"];

const FIGURES: &[&str] = &["Kenan Evren", " Turgut Özal ", "", "Atatürk"];

pub fn table() -> CountryIdentityTable {
    CountryIdentityTable::from_definitions([
        CountryDefinition::new("Türkiye", Some("TR")).with_english("Turkey"),
        CountryDefinition::new("Fransa", Some("FR")).with_english("France"),
    ])
}

/// Canonical name the pipeline will give `spelling`.
pub fn canonical(table: &CountryIdentityTable, spelling: &str) -> String {
    table
        .lookup(spelling)
        .map_or_else(|| spelling.to_string(), |id| id.name.clone())
}

fn pick(pool: &'static [&'static str]) -> impl Strategy<Value = &'static str> + Clone {
    prop::sample::select(pool)
}

fn arb_identity() -> impl Strategy<Value = (&'static str, i64, &'static str, &'static str)> + Clone
{
    (pick(COUNTRIES), 1980i64..1982, pick(CATEGORIES), pick(TITLES))
}

fn arb_richness() -> impl Strategy<Value = Richness> + Clone {
    (
        prop::option::of(pick(LINKS)),
        prop::option::of(Just("dQw4w9WgXcQ")),
        prop::option::of(pick(DESCRIPTIONS)),
        prop::option::of((-1i64..3, -1i64..3)),
        prop::option::of(0u32..500),
        prop::collection::vec(pick(FIGURES), 0..3),
        prop::option::of(prop::collection::vec(pick(&["darbe", "soğuk savaş", "protesto"]), 0..3)),
        prop::option::of(pick(&["manual", "batch-7"])),
    )
        .prop_map(
            |(link, media, description, coords, casualties, figures, tags, source)| Richness {
                link,
                media,
                description,
                coords,
                casualties,
                figures,
                tags,
                source,
            },
        )
}

#[derive(Debug, Clone)]
struct Richness {
    link: Option<&'static str>,
    media: Option<&'static str>,
    description: Option<&'static str>,
    coords: Option<(i64, i64)>,
    casualties: Option<u32>,
    figures: Vec<&'static str>,
    tags: Option<Vec<&'static str>>,
    source: Option<&'static str>,
}

fn build(index: usize, identity: (&str, i64, &str, &str), rich: Richness) -> EventRecord {
    let (country, year, category, title) = identity;
    let mut record = EventRecord::new(format!("ev_{index:02}"), country, year, category, title);
    record.external_link = rich.link.map(str::to_string).into();
    if let Some(media) = rich.media {
        record.media_link = Slot::Value(media.to_string());
    }
    if let Some(description) = rich.description {
        record.description = Slot::Value(description.to_string());
    }
    if let Some((lat, lon)) = rich.coords {
        record.lat = Slot::Value(Number::from(lat));
        record.lon = Slot::Value(Number::from(lon));
    }
    record.casualties = rich.casualties.map(Number::from).into();
    if !rich.figures.is_empty() {
        record.key_figures = Slot::Value(rich.figures.iter().map(|f| (*f).to_string()).collect());
    }
    if let Some(tags) = rich.tags {
        record.tags = Slot::Value(tags.iter().map(|t| (*t).to_string()).collect());
    }
    if let Some(source) = rich.source {
        record.extra.insert("source".to_string(), json!(source));
    }
    record
}

/// Records with unique ids and consistent decades.
pub fn arb_events() -> impl Strategy<Value = Vec<EventRecord>> {
    prop::collection::vec((arb_identity(), arb_richness()), 0..14).prop_map(|drafts| {
        drafts
            .into_iter()
            .enumerate()
            .map(|(i, (identity, rich))| build(i, identity, rich))
            .collect()
    })
}

pub fn catalog_of(events: Vec<EventRecord>) -> Catalog {
    let categories = CATEGORIES
        .iter()
        .map(|c| ((*c).to_string(), json!({"label": c})))
        .collect::<serde_json::Map<String, Value>>();
    Catalog::new(categories, events.into_iter().map(CatalogEntry::Event).collect())
}
