/// Localized string tables (`item-names.json` and friends).
use crate::catalog::StringRef;
use crate::locale::{LocaleCode, LocaleRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringEntry {
    pub id: u32,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(flatten)]
    pub locales: LocaleRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    entries: Vec<StringEntry>,
}

impl StringTable {
    pub fn new(entries: Vec<StringEntry>) -> Self {
        Self { entries }
    }

    /// The game ships these files with a UTF-8 BOM; it is ignored.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let json = json.strip_prefix('\u{feff}').unwrap_or(json);
        Ok(Self {
            entries: serde_json::from_str(json)?,
        })
    }

    /// Pretty-printed with two-space indentation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }

    pub fn entries(&self) -> &[StringEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_id(&self, id: u32) -> Option<&StringEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn by_key(&self, key: &str) -> Option<&StringEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Numbered refs match on id, keyed refs on `Key`.
    pub fn find(&self, reference: &StringRef) -> Option<&StringEntry> {
        match reference.id {
            Some(id) => self.by_id(id),
            None => self.by_key(reference.key),
        }
    }

    fn position(&self, reference: &StringRef) -> Option<usize> {
        match reference.id {
            Some(id) => self.entries.iter().position(|entry| entry.id == id),
            None => self.entries.iter().position(|entry| entry.key == reference.key),
        }
    }

    fn next_id(&self) -> u32 {
        self.entries
            .iter()
            .map(|entry| entry.id)
            .max()
            .map_or(1, |id| id + 1)
    }

    /// Write `value(locale)` into every selected locale of the referenced
    /// record. A missing record is appended with only those locales filled.
    pub fn upsert<F>(&mut self, reference: &StringRef, selected: &[LocaleCode], value: F)
    where
        F: Fn(LocaleCode) -> String,
    {
        let index = match self.position(reference) {
            Some(index) => index,
            None => {
                let id = reference.id.unwrap_or_else(|| self.next_id());
                self.entries.push(StringEntry {
                    id,
                    key: reference.key.to_string(),
                    locales: LocaleRecord::default(),
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[index];
        for locale in selected {
            entry.locales.set(*locale, value(*locale));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CommonItem, GemGroup};

    const SAMPLE: &str = "\u{feff}[
  {\"id\": 2256, \"Key\": \"gcr\", \"enUS\": \"Chipped Ruby\", \"ruRU\": \"Осколок рубина\"},
  {\"id\": 4000, \"Key\": \"gld\", \"enUS\": \"ÿc4Gold\"}
]";

    #[test]
    fn parses_bom_prefixed_tables() {
        let table = StringTable::parse(SAMPLE).unwrap();
        assert_eq!(table.len(), 2);
        let gold = table.find(&CommonItem::Gold.string_ref()).unwrap();
        assert_eq!(gold.locales.get(LocaleCode::EnUs), "ÿc4Gold");
        assert_eq!(gold.locales.get(LocaleCode::DeDe), "");
        let ruby = table.find(&GemGroup::Rubies.string_refs()[0]).unwrap();
        assert_eq!(ruby.key, "gcr");
    }

    #[test]
    fn upsert_updates_only_selected_locales() {
        let mut table = StringTable::parse(SAMPLE).unwrap();
        let selected = [LocaleCode::EnUs, LocaleCode::RuRu];
        table.upsert(&GemGroup::Rubies.string_refs()[0], &selected, |locale| {
            format!("R1-{locale}")
        });
        let ruby = table.by_id(2256).unwrap();
        assert_eq!(ruby.locales.get(LocaleCode::EnUs), "R1-enUS");
        assert_eq!(ruby.locales.get(LocaleCode::RuRu), "R1-ruRU");
        assert_eq!(ruby.locales.get(LocaleCode::ZhCn), "");
    }

    #[test]
    fn upsert_appends_missing_records() {
        let mut table = StringTable::parse(SAMPLE).unwrap();
        table.upsert(&CommonItem::Keys.string_ref(), &[LocaleCode::EnUs], |_| "Key".into());
        let added = table.by_key("key").unwrap();
        assert_eq!(added.id, 4001);
        assert_eq!(added.locales.get(LocaleCode::EnUs), "Key");
        assert_eq!(added.locales.get(LocaleCode::RuRu), "");
    }

    #[test]
    fn serializes_game_field_names() {
        let table = StringTable::parse(SAMPLE).unwrap();
        let json = table.to_json().unwrap();
        assert!(json.contains("\"Key\": \"gcr\""));
        assert!(json.contains("\n  {"));
        assert_eq!(StringTable::parse(&json).unwrap(), table);
    }
}
