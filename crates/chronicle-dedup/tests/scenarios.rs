//! End-to-end scenarios over small catalogs.

use chronicle_core::canonicalize::CountryFilter;
use chronicle_core::config::ChronicleConfig;
use chronicle_core::identity::{CountryDefinition, CountryIdentityTable};
use chronicle_core::model::{Catalog, EventRecord, Slot};
use chronicle_core::validate::ViolationKind;
use chronicle_dedup::Pipeline;
use chronicle_dedup::review::{ReviewFloors, near_misses};
use chronicle_dedup::rules::RuleKind;
use serde_json::{Value, json};

const COUP_LINK: &str = "https://tr.wikipedia.org/wiki/12_Eylül_Darbesi";
const WALL_LINK: &str = "https://tr.wikipedia.org/wiki/Berlin_Duvarı";

fn table() -> CountryIdentityTable {
    CountryIdentityTable::from_definitions([
        CountryDefinition::new("Türkiye", Some("TR")).with_english("Turkey"),
        CountryDefinition::new("Fransa", Some("FR")).with_english("France"),
        CountryDefinition::new("Almanya", Some("DE"))
            .with_english("Germany")
            .with_aliases(["Batı Almanya", "Doğu Almanya"]),
    ])
}

fn categories() -> Value {
    json!({
        "revolution": {"label": "Devrim", "color": "#c0392b"},
        "politics": {"label": "Siyaset", "color": "#2980b9"},
        "war": {"label": "Savaş", "color": "#7f8c8d"},
        "culture": {"label": "Kültür", "color": "#8e44ad"}
    })
}

fn catalog(events: Value) -> Catalog {
    Catalog::from_value(json!({
        "categories": categories(),
        "events": events,
        "metadata": {"version": 3}
    }))
    .unwrap()
}

fn ids(c: &Catalog) -> Vec<String> {
    c.events().map(|(_, e)| e.id.clone()).collect()
}

fn event<'c>(c: &'c Catalog, id: &str) -> &'c EventRecord {
    c.events().map(|(_, e)| e).find(|e| e.id == id).unwrap()
}

#[test]
fn scenario_a_spelling_variants_merge_into_one_rich_record() {
    let table = table();
    let pipeline = Pipeline::new(&table, &ChronicleConfig::default()).unwrap();
    let mut c = catalog(json!([
        {"id": "ev_1980_a", "country_name": "Turkiye", "year": 1980, "decade": "1980s",
         "category": "revolution", "title": "12 Eylül Darbesi",
         "description": "Askeri darbe.", "wikipedia_url": COUP_LINK},
        {"id": "ev_1980_b", "country_code": "tr", "country_name": "Türkiye", "year": 1980,
         "decade": "1980s", "category": "revolution", "title": "12 Eylül darbesi.",
         "description": "12 Eylül 1980'de Türk Silahlı Kuvvetleri yönetime el koydu.",
         "key_figures": ["Kenan Evren"]},
        {"id": "ev_1980_c", "country_name": "Türkiye", "year": 1980, "decade": "1980s",
         "category": "revolution", "title": "12 Eylül Askeri Darbesi"}
    ]));

    let report = pipeline.run(&mut c, None);

    assert!(report.is_clean(), "{:?}", report.validation.violations);
    assert_eq!(report.canonicalization.names_changed, 1);
    assert_eq!(ids(&c), ["ev_1980_a", "ev_1980_c"]);

    let survivor = event(&c, "ev_1980_a");
    assert_eq!(survivor.country_name, "Türkiye");
    assert_eq!(survivor.country_code, Slot::Value("TR".to_string()));
    assert_eq!(survivor.external_link, Slot::Value(COUP_LINK.to_string()));
    assert_eq!(
        survivor.description_text(),
        "12 Eylül 1980'de Türk Silahlı Kuvvetleri yönetime el koydu."
    );
    assert_eq!(survivor.key_figures(), ["Kenan Evren"]);

    let merge = &report.merges[0];
    assert_eq!(merge.absorbed, ["ev_1980_b"]);
    assert_eq!(merge.links[0].rule, RuleKind::ExactTitleKey);

    // the reworded title is left for a person to decide
    let misses = near_misses(
        &c,
        pipeline.cascade(),
        pipeline.normalizer(),
        ReviewFloors::default(),
        |_| true,
    );
    assert_eq!(misses.len(), 1);
    assert_eq!(misses[0].b.id, "ev_1980_c");
    assert!(misses[0].char_ratio > 0.80 && misses[0].char_ratio < 0.85);
}

#[test]
fn scenario_b_shared_link_merges_reworded_titles() {
    let table = table();
    let pipeline = Pipeline::new(&table, &ChronicleConfig::default()).unwrap();
    let mut c = catalog(json!([
        {"id": "ev_1989_wall_1", "country_name": "Almanya", "year": 1989, "decade": "1980s",
         "category": "politics", "title": "Berlin Duvarının Yıkılışı",
         "wikipedia_url": WALL_LINK, "lat": 52.52, "lon": 13.40},
        {"id": "ev_1989_wall_2", "country_name": "Doğu Almanya", "year": 1989,
         "decade": "1980s", "category": "politics", "title": "Berlin Duvarının Yıkılması",
         "wikipedia_url": format!(" {WALL_LINK} "), "youtube_video_id": "zmRPP2BHJvo",
         "tags": ["soğuk savaş"]}
    ]));

    let report = pipeline.run(&mut c, None);

    assert!(report.is_clean());
    assert_eq!(report.merges.len(), 1);
    assert_eq!(report.merges[0].links[0].rule, RuleKind::SharedExternalLink);
    // the media link outranks the coordinates
    assert_eq!(report.merges[0].survivor, "ev_1989_wall_2");

    let survivor = event(&c, "ev_1989_wall_2");
    assert!(survivor.has_coordinates());
    assert_eq!(survivor.tags.get().unwrap(), &["soğuk savaş"]);
    assert_eq!(report.countries["Almanya"].removed, 1);
}

#[test]
fn scenario_c_different_categories_stay_apart() {
    let table = table();
    let pipeline = Pipeline::new(&table, &ChronicleConfig::default()).unwrap();
    let mut c = catalog(json!([
        {"id": "ev_1937_picasso", "country_name": "France", "year": 1937, "decade": "1930s",
         "category": "culture", "title": "Picasso Guernica'yı Yarattı"},
        {"id": "ev_1937_spain", "country_name": "Fransa", "year": 1937, "decade": "1930s",
         "category": "war", "title": "İspanya İç Savaşı"}
    ]));

    let report = pipeline.run(&mut c, None);

    assert!(report.merges.is_empty());
    assert_eq!(report.comparisons, 1);
    assert_eq!(c.event_count(), 2);
    assert!(report.is_clean());
}

#[test]
fn scenario_d_unknown_country_is_reported_not_dropped() {
    let table = CountryIdentityTable::from_definitions([CountryDefinition::new(
        "Fransa",
        Some("FR"),
    )]);
    let pipeline = Pipeline::new(&table, &ChronicleConfig::default()).unwrap();
    let mut c = catalog(json!([
        {"id": "ev_1980", "country_code": "TR", "country_name": "Turkiye", "year": 1980,
         "decade": "1980s", "category": "revolution", "title": "12 Eylül Darbesi"}
    ]));
    let before = c.clone();

    let report = pipeline.run(&mut c, None);

    assert_eq!(c, before);
    assert_eq!(report.canonicalization.unknown.get("Turkiye"), Some(&1));
    assert_eq!(
        report.validation.counts(),
        [(ViolationKind::UnknownCountry, 1)]
    );

    let mut config = ChronicleConfig::default();
    config.validation.allow_unknown_countries = true;
    let lenient = Pipeline::new(&table, &config).unwrap();
    let report = lenient.run(&mut c, None);
    assert!(report.is_clean());
    assert_eq!(report.validation.notices.len(), 1);
}

#[test]
fn scenario_e_decade_mismatch_is_flagged_before_and_after() {
    let table = table();
    let pipeline = Pipeline::new(&table, &ChronicleConfig::default()).unwrap();
    let mut c = catalog(json!([
        {"id": "ev_1987", "country_name": "Türkiye", "year": 1987, "decade": "1990s",
         "category": "politics", "title": "Anayasa Referandumu"}
    ]));

    let report = pipeline.run(&mut c, None);

    for stage in [&report.preflight, &report.validation] {
        assert_eq!(stage.violations.len(), 1);
        let v = &stage.violations[0];
        assert_eq!(v.kind, ViolationKind::DecadeMismatch);
        assert_eq!(v.expected, "1980s");
        assert_eq!(v.actual, "1990s");
    }
    assert_eq!(event(&c, "ev_1987").decade, Slot::Value("1990s".to_string()));
}

#[test]
fn filter_accepts_any_spelling_and_leaves_others_untouched() {
    let table = table();
    let pipeline = Pipeline::new(&table, &ChronicleConfig::default()).unwrap();
    let mut c = catalog(json!([
        {"id": "a", "country_name": "Turkey", "year": 1980, "decade": "1980s",
         "category": "revolution", "title": "12 Eylül Darbesi"},
        {"id": "b", "country_name": "Türkiye", "year": 1980, "decade": "1980s",
         "category": "revolution", "title": "12 EYLÜL DARBESİ"},
        {"id": "c", "country_name": "France", "year": 1968, "decade": "1960s",
         "category": "politics", "title": "Mayıs 68"},
        {"id": "d", "country_name": "Fransa", "year": 1968, "decade": "1960s",
         "category": "politics", "title": "mayıs 68"}
    ]));

    let filter = CountryFilter::new(["turkiye"], &table);
    let report = pipeline.run(&mut c, Some(&filter));

    assert_eq!(report.merges.len(), 1);
    assert_eq!(ids(&c), ["a", "c", "d"]);
    assert_eq!(event(&c, "c").country_name, "France");
}

#[test]
fn untouched_top_level_keys_survive() {
    let table = table();
    let pipeline = Pipeline::new(&table, &ChronicleConfig::default()).unwrap();
    let mut c = catalog(json!([]));
    pipeline.run(&mut c, None);
    let out = c.to_value().unwrap();
    let keys: Vec<&str> = out.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["categories", "events", "metadata"]);
    assert_eq!(out["metadata"], json!({"version": 3}));
}

#[test]
fn untouched_record_keeps_its_key_order_beside_a_merge() {
    let table = table();
    let pipeline = Pipeline::new(&table, &ChronicleConfig::default()).unwrap();
    let untouched = json!({
        "country_code": "FR", "country_name": "Fransa", "year": 1968, "decade": "1960s",
        "category": "culture", "title": "Mayıs 68", "source": "manual", "id": "ev_1968"
    });
    let mut c = catalog(json!([
        {"country_code": "TR", "country_name": "Türkiye", "year": 1980, "decade": "1980s",
         "category": "revolution", "title": "12 Eylül Darbesi", "id": "ev_1980_a",
         "wikipedia_url": COUP_LINK},
        untouched.clone(),
        {"id": "ev_1980_b", "country_code": "TR", "country_name": "Türkiye", "year": 1980,
         "decade": "1980s", "category": "revolution", "title": "12 Eylül darbesi.",
         "tags": ["darbe"]}
    ]));

    let report = pipeline.run(&mut c, None);
    assert_eq!(report.merges.len(), 1);

    let out = c.to_value().unwrap();
    let events = out["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(
        serde_json::to_string(&events[1]).unwrap(),
        serde_json::to_string(&untouched).unwrap()
    );

    let survivor: Vec<&str> = events[0].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        survivor,
        [
            "country_code", "country_name", "year", "decade", "category", "title", "id",
            "wikipedia_url", "tags"
        ]
    );
}
