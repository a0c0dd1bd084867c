//! Static catalog of every editable entry and where it lives in the game's string tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// String table files under `data/local/lng/strings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StringFile {
    ItemNames,
    ItemNameAffixes,
    ItemModifiers,
    ItemRunes,
}

impl StringFile {
    pub const ALL: [StringFile; 4] = [
        StringFile::ItemNames,
        StringFile::ItemNameAffixes,
        StringFile::ItemModifiers,
        StringFile::ItemRunes,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            StringFile::ItemNames => "item-names.json",
            StringFile::ItemNameAffixes => "item-nameaffixes.json",
            StringFile::ItemModifiers => "item-modifiers.json",
            StringFile::ItemRunes => "item-runes.json",
        }
    }
}

/// Address of one record in a string table. Records with a fixed numeric id are
/// matched by id, the rest by their `Key` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringRef {
    pub file: StringFile,
    pub key: &'static str,
    pub id: Option<u32>,
}

impl StringRef {
    const fn keyed(file: StringFile, key: &'static str) -> Self {
        Self { file, key, id: None }
    }

    const fn numbered(file: StringFile, key: &'static str, id: u32) -> Self {
        Self {
            file,
            key,
            id: Some(id),
        }
    }
}

macro_rules! catalog_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $json:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $json)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $json),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

catalog_enum!(
    /// Single-entry items shown on the common page.
    CommonItem {
        Arrows => "arrows",
        Bolts => "bolts",
        StaminaPotions => "staminaPotions",
        Antidotes => "antidotes",
        ThawingPotions => "thawingPotions",
        Amulets => "amulets",
        Rings => "rings",
        Jewels => "jewels",
        SmallCharms => "smallCharms",
        LargeCharms => "largeCharms",
        GrandCharms => "grandCharms",
        Gold => "gold",
        Keys => "keys",
    }
);

impl CommonItem {
    pub fn string_ref(self) -> StringRef {
        let key = match self {
            CommonItem::Arrows => "aqv",
            CommonItem::Bolts => "cqv",
            CommonItem::StaminaPotions => "vps",
            CommonItem::Antidotes => "yps",
            CommonItem::ThawingPotions => "wms",
            CommonItem::Amulets => "amu",
            CommonItem::Rings => "rin",
            CommonItem::Jewels => "jew",
            CommonItem::SmallCharms => "cm1",
            CommonItem::LargeCharms => "cm2",
            CommonItem::GrandCharms => "cm3",
            CommonItem::Gold => "gld",
            CommonItem::Keys => "key",
        };
        StringRef::keyed(StringFile::ItemNames, key)
    }
}

catalog_enum!(
    /// Tiered consumables on the common page.
    PotionGroup {
        HealthPotions => "healthPotions",
        ManaPotions => "manaPotions",
        RejuvenationPotions => "rejuvenationPotions",
        Identify => "identify",
        Portal => "portal",
        UberKeys => "uberKeys",
        Essences => "essences",
        PoisonPotions => "poisonPotions",
        FirePotions => "firePotions",
    }
);

impl PotionGroup {
    pub fn string_refs(self) -> Vec<StringRef> {
        let keys: &[&'static str] = match self {
            PotionGroup::HealthPotions => &["hp1", "hp2", "hp3", "hp4", "hp5"],
            PotionGroup::ManaPotions => &["mp1", "mp2", "mp3", "mp4", "mp5"],
            PotionGroup::RejuvenationPotions => &["rvs", "rvl"],
            PotionGroup::Identify => &["isc", "ibk"],
            PotionGroup::Portal => &["tsc", "tbk"],
            PotionGroup::UberKeys => &["pk1", "pk2", "pk3"],
            PotionGroup::Essences => &["tes", "ceh", "bet", "fed", "toa"],
            PotionGroup::PoisonPotions => &["gps", "gpm", "gpl"],
            PotionGroup::FirePotions => &["ops", "opm", "opl"],
        };
        keys.iter()
            .map(|key| StringRef::keyed(StringFile::ItemNames, key))
            .collect()
    }
}

catalog_enum!(
    /// Gem families, each with five quality levels from chipped to perfect.
    GemGroup {
        Skulls => "skulls",
        Amethysts => "amethysts",
        Topazes => "topazes",
        Sapphires => "sapphires",
        Emeralds => "emeralds",
        Rubies => "rubies",
        Diamonds => "diamonds",
    }
);

impl GemGroup {
    pub fn string_refs(self) -> Vec<StringRef> {
        use StringFile::{ItemNameAffixes as Affixes, ItemNames as Names};
        let (keys, first_id, affix_index): ([&'static str; 5], u32, Option<usize>) = match self {
            GemGroup::Amethysts => (["gcv", "gfv", "gsv", "gzv", "gpv"], 2236, None),
            GemGroup::Topazes => (["gcy", "gfy", "gsy", "gly", "gpy"], 2241, None),
            GemGroup::Sapphires => (["gcb", "gfb", "gsb", "glb", "gpb"], 2246, Some(2)),
            GemGroup::Emeralds => (["gcg", "gfg", "gsg", "glg", "gpg"], 2251, Some(2)),
            GemGroup::Rubies => (["gcr", "gfr", "gsr", "glr", "gpr"], 2256, Some(2)),
            GemGroup::Diamonds => (["gcw", "gfw", "gsw", "glw", "gpw"], 2261, Some(2)),
            GemGroup::Skulls => (["skc", "skf", "sku", "skl", "skz"], 2277, None),
        };
        keys.iter()
            .enumerate()
            .map(|(index, key)| {
                let file = if affix_index == Some(index) { Affixes } else { Names };
                StringRef::numbered(file, key, first_id + index as u32)
            })
            .collect()
    }
}

catalog_enum!(
    /// Item-page groups that are edited as leveled tabs.
    ItemGroup {
        DifficultyClassMarkers => "difficultyClassMarkers",
        QualityPrefixes => "qualityPrefixes",
    }
);

/// Name-affix ids of the "Damaged" prefix.
pub const DAMAGED_PREFIX_IDS: [u32; 2] = [1723, 1725];
/// Name-affix ids of the "Superior" prefix.
pub const SUPERIOR_PREFIX_IDS: [u32; 2] = [1724, 20910];

/// Both records behind a quality-prefix level (0 = damaged, 1 = superior).
pub fn quality_prefix_refs(level: usize) -> Vec<StringRef> {
    let (key, ids) = match level {
        0 => ("Damaged", DAMAGED_PREFIX_IDS),
        1 => ("Superior", SUPERIOR_PREFIX_IDS),
        _ => return Vec::new(),
    };
    ids.iter()
        .map(|id| StringRef::numbered(StringFile::ItemNameAffixes, key, *id))
        .collect()
}

catalog_enum!(
    Rune {
        El => "el", Eld => "eld", Tir => "tir", Nef => "nef", Eth => "eth",
        Ith => "ith", Tal => "tal", Ral => "ral", Ort => "ort", Thul => "thul",
        Amn => "amn", Sol => "sol", Shael => "shael", Dol => "dol", Hel => "hel",
        Io => "io", Lum => "lum", Ko => "ko", Fal => "fal", Lem => "lem",
        Pul => "pul", Um => "um", Mal => "mal", Ist => "ist", Gul => "gul",
        Vex => "vex", Ohm => "ohm", Lo => "lo", Sur => "sur", Ber => "ber",
        Jah => "jah", Cham => "cham", Zod => "zod",
    }
);

impl Rune {
    /// 1-based position in the rune ladder, used for numbering.
    pub fn number(self) -> u32 {
        Rune::ALL
            .iter()
            .position(|rune| *rune == self)
            .map(|index| index as u32 + 1)
            .unwrap_or(0)
    }

    pub fn item_code(self) -> String {
        format!("r{:02}", self.number())
    }

    pub fn string_ref(self) -> StringRef {
        // The rune name records reuse the item code as their key.
        let code: &'static str = RUNE_CODES[self.number() as usize - 1];
        StringRef::keyed(StringFile::ItemRunes, code)
    }

    pub fn english_name(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

const RUNE_CODES: [&str; 33] = [
    "r01", "r02", "r03", "r04", "r05", "r06", "r07", "r08", "r09", "r10", "r11", "r12", "r13",
    "r14", "r15", "r16", "r17", "r18", "r19", "r20", "r21", "r22", "r23", "r24", "r25", "r26",
    "r27", "r28", "r29", "r30", "r31", "r32", "r33",
];

/// Every category that stores leveled groups, addressed uniformly by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "category", content = "group", rename_all = "camelCase")]
pub enum LeveledKey {
    Potion(PotionGroup),
    Gem(GemGroup),
    Item(ItemGroup),
}

impl LeveledKey {
    pub fn level_count(self) -> usize {
        match self {
            LeveledKey::Potion(group) => match group {
                PotionGroup::HealthPotions | PotionGroup::ManaPotions | PotionGroup::Essences => 5,
                PotionGroup::RejuvenationPotions | PotionGroup::Identify | PotionGroup::Portal => 2,
                PotionGroup::UberKeys | PotionGroup::PoisonPotions | PotionGroup::FirePotions => 3,
            },
            LeveledKey::Gem(_) => 5,
            LeveledKey::Item(ItemGroup::DifficultyClassMarkers) => 3,
            LeveledKey::Item(ItemGroup::QualityPrefixes) => 2,
        }
    }

    pub fn all() -> Vec<LeveledKey> {
        PotionGroup::ALL
            .iter()
            .map(|group| LeveledKey::Potion(*group))
            .chain(GemGroup::ALL.iter().map(|group| LeveledKey::Gem(*group)))
            .chain(ItemGroup::ALL.iter().map(|group| LeveledKey::Item(*group)))
            .collect()
    }
}

impl From<PotionGroup> for LeveledKey {
    fn from(group: PotionGroup) -> Self {
        LeveledKey::Potion(group)
    }
}

impl From<GemGroup> for LeveledKey {
    fn from(group: GemGroup) -> Self {
        LeveledKey::Gem(group)
    }
}

impl From<ItemGroup> for LeveledKey {
    fn from(group: ItemGroup) -> Self {
        LeveledKey::Item(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rune_numbers_follow_ladder() {
        assert_eq!(Rune::El.number(), 1);
        assert_eq!(Rune::Ber.number(), 30);
        assert_eq!(Rune::Zod.number(), 33);
        assert_eq!(Rune::Zod.item_code(), "r33");
        assert_eq!(Rune::Ber.string_ref().key, "r30");
        assert_eq!(Rune::Shael.english_name(), "Shael");
    }

    #[test]
    fn gem_ids_are_contiguous_and_split_across_files() {
        let refs = GemGroup::Rubies.string_refs();
        let ids: Vec<u32> = refs.iter().filter_map(|r| r.id).collect();
        assert_eq!(ids, vec![2256, 2257, 2258, 2259, 2260]);
        assert_eq!(refs[2].file, StringFile::ItemNameAffixes);
        assert_eq!(refs[0].file, StringFile::ItemNames);
        assert!(GemGroup::Topazes
            .string_refs()
            .iter()
            .all(|r| r.file == StringFile::ItemNames));
    }

    #[test]
    fn potion_refs_match_level_counts() {
        for group in PotionGroup::ALL {
            assert_eq!(
                group.string_refs().len(),
                LeveledKey::Potion(*group).level_count(),
                "{group}"
            );
        }
    }

    #[test]
    fn catalog_keys_serialize_as_camel_case() {
        let json = serde_json::to_string(&PotionGroup::RejuvenationPotions).unwrap();
        assert_eq!(json, "\"rejuvenationPotions\"");
        assert_eq!(CommonItem::ALL.len(), 13);
        assert_eq!(Rune::ALL.len(), 33);
    }
}
