use crate::catalog::Rune;
use crate::color::{remove_color_codes, GameColor};
use crate::locale::{LocaleCode, LocalePatch, LocaleRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NUMBER_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?:\(\s*\d+\s*\)|\[\s*\d+\s*\]|\|\s*\d+)\s*$").expect("valid rune number regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuneMode {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DividerType {
    Parentheses,
    Brackets,
    Pipe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberingSettings {
    pub show: bool,
    pub divider_type: DividerType,
    pub divider_color: GameColor,
    pub number_color: GameColor,
}

impl Default for NumberingSettings {
    fn default() -> Self {
        Self {
            show: false,
            divider_type: DividerType::Parentheses,
            divider_color: GameColor::White,
            number_color: GameColor::Yellow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRuneSettings {
    #[serde(default)]
    pub numbering: NumberingSettings,
    /// 0 = no box, 1 = normal box, 2 = wide box.
    #[serde(default)]
    pub box_size: u8,
    pub box_limiters: String,
    pub box_limiters_color: GameColor,
    pub color: GameColor,
}

impl Default for AutoRuneSettings {
    fn default() -> Self {
        Self {
            numbering: NumberingSettings::default(),
            box_size: 0,
            box_limiters: "~".to_string(),
            box_limiters_color: GameColor::White,
            color: GameColor::White,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRuneSettings {
    #[serde(default)]
    pub locales: LocaleRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuneSettings {
    pub mode: RuneMode,
    #[serde(default)]
    pub is_highlighted: bool,
    #[serde(default)]
    pub auto_settings: AutoRuneSettings,
    #[serde(default)]
    pub manual_settings: ManualRuneSettings,
}

impl Default for RuneSettings {
    fn default() -> Self {
        Self {
            mode: RuneMode::Auto,
            is_highlighted: false,
            auto_settings: AutoRuneSettings::default(),
            manual_settings: ManualRuneSettings::default(),
        }
    }
}

impl RuneSettings {
    pub fn apply(&mut self, patch: &RunePatch) {
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
        if let Some(highlighted) = patch.is_highlighted {
            self.is_highlighted = highlighted;
        }
        if let Some(auto) = &patch.auto_settings {
            self.auto_settings = auto.clone();
        }
        self.manual_settings.locales.apply(&patch.locales);
    }

    /// Final in-game name for `locale`.
    ///
    /// Manual mode writes the edited text with its lines reversed, since the game
    /// stacks multi-line names bottom-up. Auto mode colors the base name and adds
    /// the configured numbering and box decoration.
    pub fn render_name(&self, rune: Rune, locale: LocaleCode) -> String {
        let locales = &self.manual_settings.locales;
        let base = locales.get_or_english(locale);
        if self.mode == RuneMode::Manual {
            return base.lines().rev().collect::<Vec<_>>().join("\n");
        }

        let base = if base.is_empty() {
            format!("{} Rune", rune.english_name())
        } else {
            remove_color_codes(base)
        };
        let auto = &self.auto_settings;
        let mut name = format!("{}{}", auto.color.code(), base);

        if auto.numbering.show {
            let divider = auto.numbering.divider_color.code();
            let number = auto.numbering.number_color.code();
            let n = rune.number();
            match auto.numbering.divider_type {
                DividerType::Parentheses => {
                    name = format!("{name} {divider}({number}{n}{divider})");
                }
                DividerType::Brackets => {
                    name = format!("{name} {divider}[{number}{n}{divider}]");
                }
                DividerType::Pipe => {
                    name = format!("{name} {divider}| {number}{n}");
                }
            }
        }

        let padding = match auto.box_size {
            1 => 4,
            2 => 8,
            _ => return name,
        };
        let limiter = format!("{}{}", auto.box_limiters_color.code(), auto.box_limiters);
        let spaces = " ".repeat(padding);
        format!("{limiter}{spaces}{name}{spaces}{limiter}")
    }
}

/// Strip color codes, box limiters, and numbering from a rune name read from disk.
pub fn extract_base_rune_name(text: &str, box_limiters: &str) -> String {
    let mut name = remove_color_codes(text).trim().to_string();
    if !box_limiters.is_empty()
        && name.len() > box_limiters.len() * 2
        && name.starts_with(box_limiters)
        && name.ends_with(box_limiters)
    {
        name = name[box_limiters.len()..name.len() - box_limiters.len()]
            .trim()
            .to_string();
    }
    NUMBER_SUFFIX.replace(&name, "").trim().to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunePatch {
    pub mode: Option<RuneMode>,
    pub is_highlighted: Option<bool>,
    /// Replaces the auto-mode block as a whole.
    pub auto_settings: Option<AutoRuneSettings>,
    #[serde(default)]
    pub locales: LocalePatch,
}

/// Numbering and box styling shared across runes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralRuneSettings {
    pub divider_type: DividerType,
    pub divider_color: GameColor,
    pub number_color: GameColor,
    pub box_limiters: String,
    pub box_limiters_color: GameColor,
}

impl Default for GeneralRuneSettings {
    fn default() -> Self {
        Self {
            divider_type: DividerType::Parentheses,
            divider_color: GameColor::White,
            number_color: GameColor::Yellow,
            box_limiters: "~".to_string(),
            box_limiters_color: GameColor::White,
        }
    }
}

impl GeneralRuneSettings {
    pub fn apply(&mut self, patch: &GeneralRunePatch) {
        if let Some(divider_type) = patch.divider_type {
            self.divider_type = divider_type;
        }
        if let Some(color) = patch.divider_color {
            self.divider_color = color;
        }
        if let Some(color) = patch.number_color {
            self.number_color = color;
        }
        if let Some(limiters) = &patch.box_limiters {
            self.box_limiters = limiters.clone();
        }
        if let Some(color) = patch.box_limiters_color {
            self.box_limiters_color = color;
        }
    }

    /// Push the shared styling into one rune, keeping its own show/size/color choices.
    pub fn stamp(&self, rune: &mut RuneSettings) {
        let auto = &mut rune.auto_settings;
        auto.numbering.divider_type = self.divider_type;
        auto.numbering.divider_color = self.divider_color;
        auto.numbering.number_color = self.number_color;
        auto.box_limiters = self.box_limiters.clone();
        auto.box_limiters_color = self.box_limiters_color;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralRunePatch {
    pub divider_type: Option<DividerType>,
    pub divider_color: Option<GameColor>,
    pub number_color: Option<GameColor>,
    pub box_limiters: Option<String>,
    pub box_limiters_color: Option<GameColor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ber() -> RuneSettings {
        let mut settings = RuneSettings::default();
        settings.manual_settings.locales.set(LocaleCode::EnUs, "Ber Rune");
        settings.manual_settings.locales.set(LocaleCode::RuRu, "Руна Бер");
        settings
    }

    #[test]
    fn plain_auto_name_is_colored() {
        assert_eq!(ber().render_name(Rune::Ber, LocaleCode::EnUs), "ÿc0Ber Rune");
        assert_eq!(ber().render_name(Rune::Ber, LocaleCode::DeDe), "ÿc0Ber Rune");
    }

    #[test]
    fn numbering_styles() {
        let mut settings = ber();
        settings.auto_settings.numbering.show = true;
        assert_eq!(
            settings.render_name(Rune::Ber, LocaleCode::RuRu),
            "ÿc0Руна Бер ÿc0(ÿc930ÿc0)"
        );
        settings.auto_settings.numbering.divider_type = DividerType::Brackets;
        assert_eq!(
            settings.render_name(Rune::Ber, LocaleCode::EnUs),
            "ÿc0Ber Rune ÿc0[ÿc930ÿc0]"
        );
        settings.auto_settings.numbering.divider_type = DividerType::Pipe;
        assert_eq!(
            settings.render_name(Rune::Ber, LocaleCode::EnUs),
            "ÿc0Ber Rune ÿc0| ÿc930"
        );
    }

    #[test]
    fn box_wraps_name() {
        let mut settings = ber();
        settings.auto_settings.box_size = 1;
        settings.auto_settings.color = GameColor::Orange;
        assert_eq!(
            settings.render_name(Rune::Ber, LocaleCode::EnUs),
            "ÿc0~    ÿc@Ber Rune    ÿc0~"
        );
        settings.auto_settings.box_size = 2;
        let wide = settings.render_name(Rune::Ber, LocaleCode::EnUs);
        assert!(wide.starts_with("ÿc0~        ÿc@"));
    }

    #[test]
    fn manual_mode_keeps_text() {
        let mut settings = ber();
        settings.mode = RuneMode::Manual;
        settings.manual_settings.locales.set(LocaleCode::EnUs, "ÿc1BER!");
        assert_eq!(settings.render_name(Rune::Ber, LocaleCode::EnUs), "ÿc1BER!");
        settings.manual_settings.locales.set(LocaleCode::EnUs, "Ber\nHigh Rune");
        assert_eq!(
            settings.render_name(Rune::Ber, LocaleCode::EnUs),
            "High Rune\nBer"
        );
    }

    #[test]
    fn extracts_base_name_from_decorated_text() {
        let mut settings = ber();
        settings.auto_settings.numbering.show = true;
        settings.auto_settings.box_size = 2;
        let rendered = settings.render_name(Rune::Ber, LocaleCode::EnUs);
        assert_eq!(extract_base_rune_name(&rendered, "~"), "Ber Rune");
        assert_eq!(extract_base_rune_name("Jah Rune | 31", "~"), "Jah Rune");
        assert_eq!(extract_base_rune_name("El Rune", "~"), "El Rune");
    }

    #[test]
    fn general_settings_stamp_styling_only() {
        let general = GeneralRuneSettings {
            divider_type: DividerType::Pipe,
            number_color: GameColor::Red,
            ..Default::default()
        };
        let mut settings = ber();
        settings.auto_settings.numbering.show = true;
        settings.auto_settings.box_size = 1;
        general.stamp(&mut settings);
        assert!(settings.auto_settings.numbering.show);
        assert_eq!(settings.auto_settings.box_size, 1);
        assert_eq!(settings.auto_settings.numbering.divider_type, DividerType::Pipe);
        assert_eq!(settings.auto_settings.numbering.number_color, GameColor::Red);
    }
}
