//! Survivor selection and lossless field merging.
//!
//! Within an equivalence class every record is ranked by how much it carries:
//! encyclopedia link, then media link, then a real location, then casualties,
//! then description length. The best record survives; every other record is
//! folded into it field by field, best first. A field is only ever filled or
//! lengthened, never cleared.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};

use chronicle_core::model::{EventRecord, Slot};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Richness of a record, most significant component first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RankKey {
    pub external_link: bool,
    pub media_link: bool,
    pub coordinates: bool,
    pub casualties: bool,
    pub description_len: usize,
}

impl RankKey {
    #[must_use]
    pub fn of(record: &EventRecord) -> Self {
        Self {
            external_link: record.has_external_link(),
            media_link: record.has_media_link(),
            coordinates: record.has_coordinates(),
            casualties: record.has_casualties(),
            description_len: record.description_len(),
        }
    }
}

/// Positions of `records`, best first: highest rank, then smallest id.
///
/// The first position is the survivor. The result depends only on record
/// contents, never on the order of `records`.
#[must_use]
pub fn rank_order(records: &[&EventRecord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&x, &y| {
        let (a, b) = (records[x], records[y]);
        Reverse(RankKey::of(a))
            .cmp(&Reverse(RankKey::of(b)))
            .then_with(|| a.id.cmp(&b.id))
    });
    order
}

/// Merged survivor of one class.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Position of the survivor in the slice passed to [`resolve`].
    pub survivor_pos: usize,
    pub survivor: EventRecord,
    /// Ids of the folded records, in fold order.
    pub absorbed: Vec<String>,
    /// Fields of the survivor that changed.
    pub fields: BTreeSet<String>,
}

/// Pick the survivor of `class` and fold the rest into a copy of it.
///
/// Returns `None` for an empty class.
#[must_use]
pub fn resolve(class: &[&EventRecord]) -> Option<Resolution> {
    let order = rank_order(class);
    let (&survivor_pos, losers) = order.split_first()?;

    let mut survivor = class[survivor_pos].clone();
    let mut fields = BTreeSet::new();
    let mut absorbed = Vec::with_capacity(losers.len());

    for &pos in losers {
        let loser = class[pos];
        let changed = merge_into(&mut survivor, loser);
        debug!(
            survivor = %survivor.id,
            loser = %loser.id,
            fields = ?changed,
            "folded duplicate"
        );
        fields.extend(changed);
        absorbed.push(loser.id.clone());
    }

    Some(Resolution {
        survivor_pos,
        survivor,
        absorbed,
        fields,
    })
}

// ---------------------------------------------------------------------------
// Field merging
// ---------------------------------------------------------------------------

/// Fold `loser` into `survivor`. Returns the names of the fields that changed.
pub fn merge_into(survivor: &mut EventRecord, loser: &EventRecord) -> Vec<String> {
    let mut changed = Vec::new();
    let mut note = |field: &str, did: bool| {
        if did {
            changed.push(field.to_string());
        }
    };

    note("description", merge_description(survivor, loser));
    note(
        "wikipedia_url",
        fill_text(&mut survivor.external_link, &loser.external_link),
    );
    note(
        "youtube_video_id",
        fill_text(&mut survivor.media_link, &loser.media_link),
    );
    note("coordinates", merge_coordinates(survivor, loser));
    note(
        "country_code",
        fill_text(&mut survivor.country_code, &loser.country_code),
    );
    note(
        "casualties",
        fill_slot(&mut survivor.casualties, &loser.casualties),
    );
    note("key_figures", merge_key_figures(survivor, loser));
    note("tags", merge_tags(survivor, loser));
    changed.extend(merge_extra(survivor, loser));

    changed
}

fn merge_description(survivor: &mut EventRecord, loser: &EventRecord) -> bool {
    if loser.description_len() > survivor.description_len() {
        survivor.description = loser.description.clone();
        return true;
    }
    false
}

/// Copy a text field from the loser when the survivor's is missing or blank.
fn fill_text(target: &mut Slot<String>, source: &Slot<String>) -> bool {
    if target.non_empty().is_some() || source.non_empty().is_none() {
        return false;
    }
    *target = source.clone();
    true
}

/// Copy a field from the loser when the survivor's is missing or null.
fn fill_slot<T: Clone>(target: &mut Slot<T>, source: &Slot<T>) -> bool {
    if target.is_set() || !source.is_set() {
        return false;
    }
    *target = source.clone();
    true
}

fn merge_coordinates(survivor: &mut EventRecord, loser: &EventRecord) -> bool {
    if survivor.has_coordinates() || !loser.has_coordinates() {
        return false;
    }
    survivor.lat = loser.lat.clone();
    survivor.lon = loser.lon.clone();
    true
}

fn merge_key_figures(survivor: &mut EventRecord, loser: &EventRecord) -> bool {
    let mut seen = HashSet::new();
    let merged: Vec<String> = survivor
        .key_figures()
        .iter()
        .chain(loser.key_figures())
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .map(str::to_string)
        .collect();

    if merged.as_slice() == survivor.key_figures() {
        return false;
    }
    survivor.key_figures.set(merged);
    true
}

fn merge_tags(survivor: &mut EventRecord, loser: &EventRecord) -> bool {
    let Some(extra) = loser.tags.get() else {
        return false;
    };
    let own = survivor.tags.get().map_or(&[][..], Vec::as_slice);
    let merged: Vec<String> = own
        .iter()
        .chain(extra)
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    if survivor.tags.is_set() && merged.as_slice() == own {
        return false;
    }
    survivor.tags.set(merged);
    true
}

/// Copy unknown fields the survivor lacks or holds empty. Returns the keys
/// copied.
fn merge_extra(survivor: &mut EventRecord, loser: &EventRecord) -> Vec<String> {
    let mut copied = Vec::new();
    for (key, value) in &loser.extra {
        if is_blank(value) {
            continue;
        }
        if survivor.extra.get(key).is_some_and(|v| !is_blank(v)) {
            continue;
        }
        survivor.extra.insert(key.clone(), value.clone());
        copied.push(key.clone());
    }
    copied
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
