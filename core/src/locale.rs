//! Language codes and the per-locale string record shared by every editable entity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The thirteen languages shipped by the game's string tables, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LocaleCode {
    #[serde(rename = "enUS")]
    EnUs,
    #[serde(rename = "ruRU")]
    RuRu,
    #[serde(rename = "zhTW")]
    ZhTw,
    #[serde(rename = "deDE")]
    DeDe,
    #[serde(rename = "esES")]
    EsEs,
    #[serde(rename = "frFR")]
    FrFr,
    #[serde(rename = "itIT")]
    ItIt,
    #[serde(rename = "koKR")]
    KoKr,
    #[serde(rename = "plPL")]
    PlPl,
    #[serde(rename = "esMX")]
    EsMx,
    #[serde(rename = "jaJP")]
    JaJp,
    #[serde(rename = "ptBR")]
    PtBr,
    #[serde(rename = "zhCN")]
    ZhCn,
}

impl LocaleCode {
    pub const ALL: [LocaleCode; 13] = [
        LocaleCode::EnUs,
        LocaleCode::RuRu,
        LocaleCode::ZhTw,
        LocaleCode::DeDe,
        LocaleCode::EsEs,
        LocaleCode::FrFr,
        LocaleCode::ItIt,
        LocaleCode::KoKr,
        LocaleCode::PlPl,
        LocaleCode::EsMx,
        LocaleCode::JaJp,
        LocaleCode::PtBr,
        LocaleCode::ZhCn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LocaleCode::EnUs => "enUS",
            LocaleCode::RuRu => "ruRU",
            LocaleCode::ZhTw => "zhTW",
            LocaleCode::DeDe => "deDE",
            LocaleCode::EsEs => "esES",
            LocaleCode::FrFr => "frFR",
            LocaleCode::ItIt => "itIT",
            LocaleCode::KoKr => "koKR",
            LocaleCode::PlPl => "plPL",
            LocaleCode::EsMx => "esMX",
            LocaleCode::JaJp => "jaJP",
            LocaleCode::PtBr => "ptBR",
            LocaleCode::ZhCn => "zhCN",
        }
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown locale code: {0}")]
pub struct UnknownLocale(pub String);

impl FromStr for LocaleCode {
    type Err = UnknownLocale;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LocaleCode::ALL
            .into_iter()
            .find(|code| code.as_str() == value)
            .ok_or_else(|| UnknownLocale(value.to_string()))
    }
}

/// One string per language. Every code is always present; unset ones are empty.
///
/// Serialized with the game's own field names so the same record shape is used
/// for persisted settings and for the string tables on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleRecord {
    #[serde(rename = "enUS", default)]
    pub en_us: String,
    #[serde(rename = "ruRU", default)]
    pub ru_ru: String,
    #[serde(rename = "zhTW", default)]
    pub zh_tw: String,
    #[serde(rename = "deDE", default)]
    pub de_de: String,
    #[serde(rename = "esES", default)]
    pub es_es: String,
    #[serde(rename = "frFR", default)]
    pub fr_fr: String,
    #[serde(rename = "itIT", default)]
    pub it_it: String,
    #[serde(rename = "koKR", default)]
    pub ko_kr: String,
    #[serde(rename = "plPL", default)]
    pub pl_pl: String,
    #[serde(rename = "esMX", default)]
    pub es_mx: String,
    #[serde(rename = "jaJP", default)]
    pub ja_jp: String,
    #[serde(rename = "ptBR", default)]
    pub pt_br: String,
    #[serde(rename = "zhCN", default)]
    pub zh_cn: String,
}

impl LocaleRecord {
    /// A record with the same text in every language.
    pub fn filled(value: &str) -> Self {
        let mut record = Self::default();
        for code in LocaleCode::ALL {
            record.set(code, value);
        }
        record
    }

    pub fn get(&self, code: LocaleCode) -> &str {
        self.slot(code)
    }

    pub fn set(&mut self, code: LocaleCode, value: impl Into<String>) {
        *self.slot_mut(code) = value.into();
    }

    /// Value for `code`, falling back to enUS when it is empty.
    pub fn get_or_english(&self, code: LocaleCode) -> &str {
        let value = self.get(code);
        if value.is_empty() {
            &self.en_us
        } else {
            value
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocaleCode, &str)> + '_ {
        LocaleCode::ALL.into_iter().map(move |code| (code, self.get(code)))
    }

    pub fn is_blank(&self) -> bool {
        self.iter().all(|(_, value)| value.is_empty())
    }

    /// Shallow merge: codes named in the patch are replaced, the rest are kept.
    pub fn apply(&mut self, patch: &LocalePatch) {
        for (code, value) in patch {
            self.set(*code, value.clone());
        }
    }

    fn slot(&self, code: LocaleCode) -> &String {
        match code {
            LocaleCode::EnUs => &self.en_us,
            LocaleCode::RuRu => &self.ru_ru,
            LocaleCode::ZhTw => &self.zh_tw,
            LocaleCode::DeDe => &self.de_de,
            LocaleCode::EsEs => &self.es_es,
            LocaleCode::FrFr => &self.fr_fr,
            LocaleCode::ItIt => &self.it_it,
            LocaleCode::KoKr => &self.ko_kr,
            LocaleCode::PlPl => &self.pl_pl,
            LocaleCode::EsMx => &self.es_mx,
            LocaleCode::JaJp => &self.ja_jp,
            LocaleCode::PtBr => &self.pt_br,
            LocaleCode::ZhCn => &self.zh_cn,
        }
    }

    fn slot_mut(&mut self, code: LocaleCode) -> &mut String {
        match code {
            LocaleCode::EnUs => &mut self.en_us,
            LocaleCode::RuRu => &mut self.ru_ru,
            LocaleCode::ZhTw => &mut self.zh_tw,
            LocaleCode::DeDe => &mut self.de_de,
            LocaleCode::EsEs => &mut self.es_es,
            LocaleCode::FrFr => &mut self.fr_fr,
            LocaleCode::ItIt => &mut self.it_it,
            LocaleCode::KoKr => &mut self.ko_kr,
            LocaleCode::PlPl => &mut self.pl_pl,
            LocaleCode::EsMx => &mut self.es_mx,
            LocaleCode::JaJp => &mut self.ja_jp,
            LocaleCode::PtBr => &mut self.pt_br,
            LocaleCode::ZhCn => &mut self.zh_cn,
        }
    }
}

/// Partial locale update. Only the codes present are written.
pub type LocalePatch = BTreeMap<LocaleCode, String>;

/// Build a [`LocalePatch`] from `(code, text)` pairs.
pub fn locale_patch<I, S>(entries: I) -> LocalePatch
where
    I: IntoIterator<Item = (LocaleCode, S)>,
    S: Into<String>,
{
    entries
        .into_iter()
        .map(|(code, value)| (code, value.into()))
        .collect()
}

pub fn default_selected_locales() -> Vec<LocaleCode> {
    vec![LocaleCode::EnUs, LocaleCode::RuRu]
}

/// enUS is always selected. Duplicates are dropped and the result follows table order.
pub fn normalize_selected_locales(codes: &[LocaleCode]) -> Vec<LocaleCode> {
    LocaleCode::ALL
        .into_iter()
        .filter(|code| *code == LocaleCode::EnUs || codes.contains(code))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_with_game_field_names() {
        let mut record = LocaleRecord::default();
        record.set(LocaleCode::RuRu, "Огонь");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ruRU"], "Огонь");
        assert_eq!(json["zhCN"], "");
        assert_eq!(json.as_object().unwrap().len(), 13);
    }

    #[test]
    fn missing_fields_deserialize_as_empty() {
        let record: LocaleRecord = serde_json::from_str(r#"{"enUS":"Fire"}"#).unwrap();
        assert_eq!(record.get(LocaleCode::EnUs), "Fire");
        assert_eq!(record.get(LocaleCode::PlPl), "");
    }

    #[test]
    fn patch_only_touches_named_codes() {
        let mut record = LocaleRecord::default();
        record.set(LocaleCode::EnUs, "Fire");
        record.set(LocaleCode::RuRu, "Огонь");
        record.apply(&locale_patch([(LocaleCode::EnUs, "Ice")]));
        assert_eq!(record.get(LocaleCode::EnUs), "Ice");
        assert_eq!(record.get(LocaleCode::RuRu), "Огонь");
    }

    #[test]
    fn english_fallback_applies_to_empty_values() {
        let mut record = LocaleRecord::default();
        record.set(LocaleCode::EnUs, "Gold");
        assert_eq!(record.get_or_english(LocaleCode::DeDe), "Gold");
        record.set(LocaleCode::DeDe, "Gold (de)");
        assert_eq!(record.get_or_english(LocaleCode::DeDe), "Gold (de)");
    }

    #[test]
    fn selected_locales_always_contain_english() {
        let normalized = normalize_selected_locales(&[LocaleCode::ZhCn, LocaleCode::RuRu, LocaleCode::RuRu]);
        assert_eq!(
            normalized,
            vec![LocaleCode::EnUs, LocaleCode::RuRu, LocaleCode::ZhCn]
        );
    }

    #[test]
    fn parses_codes_from_strings() {
        assert_eq!("koKR".parse::<LocaleCode>().unwrap(), LocaleCode::KoKr);
        assert!("xxXX".parse::<LocaleCode>().is_err());
    }
}
