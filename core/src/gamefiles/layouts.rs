//! UI layout edits: shared stash tab labels, the encyclopedia HUD button, and
//! the intro video placeholders.

use super::{ensure_dirs, GameFileError, GameFiles, GameFs, SettingsUpdate};
use crate::settings::{
    EncyclopediaLanguage, StashPatch, StashRenameSettings, TweaksPatch, TweaksSettings,
    STASH_TAB_COUNT,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;

pub const BANK_LAYOUT_FILE: &str = "bankexpansionlayouthd.json";
pub const HUD_PANEL_FILE: &str = "hudpanelhd.json";
pub const INTRO_VIDEO_FILES: [&str; 3] = ["blizzardlogos.webm", "d2intro.webm", "logoanim.webm"];

const PERSONAL_TAB: &str = "@personal";
const ENCYCLOPEDIA_BUTTON: &str = "BlizzlessEncyclopediaButRu";
const RUN_BUTTON_TYPE: &str = "RunButtonWidget";

static LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|\s)//.*$").expect("valid line comment regex"));
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid trailing comma regex"));
static ENCYCLOPEDIA_MESSAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"PanelManager:OpenPanel:BlizzlessEncyclopediabut(en|ru)")
        .expect("valid encyclopedia message regex")
});

/// Layout files carry `//` comments and trailing commas that strict JSON rejects.
pub fn sanitize_json(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let without_comments = LINE_COMMENT.replace_all(text, "$1");
    TRAILING_COMMA
        .replace_all(&without_comments, "$1")
        .into_owned()
}

fn parse_layout(path: &Path, text: &str) -> Result<Value, GameFileError> {
    serde_json::from_str(&sanitize_json(text)).map_err(|source| GameFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn to_json_with_indent(value: &Value, indent: &[u8]) -> Result<String, GameFileError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn children(node: &Value) -> &[Value] {
    node.get("children")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

fn is_tab_bar(node: &Value) -> bool {
    node.get("type").and_then(Value::as_str) == Some("TabBarWidget")
}

/// The seven shared tab labels of the first tab bar that has them.
pub fn find_stash_tabs(root: &Value) -> Option<[String; STASH_TAB_COUNT]> {
    for node in children(root) {
        if is_tab_bar(node) {
            if let Some(strings) = node.pointer("/fields/textStrings").and_then(Value::as_array) {
                let shared = match strings.len() {
                    8 if strings[0].as_str() == Some(PERSONAL_TAB) => &strings[1..],
                    STASH_TAB_COUNT => &strings[..],
                    _ => &[][..],
                };
                if shared.len() == STASH_TAB_COUNT {
                    let labels: Vec<String> = shared
                        .iter()
                        .map(|value| match value {
                            Value::String(label) => label.clone(),
                            other => other.to_string(),
                        })
                        .collect();
                    return labels.try_into().ok();
                }
            }
        }
        if let Some(tabs) = find_stash_tabs(node) {
            return Some(tabs);
        }
    }
    None
}

/// Rewrite every matching tab bar; returns how many were changed.
pub fn replace_stash_tabs(root: &mut Value, tabs: &[String; STASH_TAB_COUNT]) -> usize {
    let Some(nodes) = root.get_mut("children").and_then(Value::as_array_mut) else {
        return 0;
    };
    let mut replaced = 0;
    for node in nodes {
        if is_tab_bar(node) {
            if let Some(strings) = node
                .pointer_mut("/fields/textStrings")
                .and_then(Value::as_array_mut)
            {
                let personal = strings.len() == 8 && strings[0].as_str() == Some(PERSONAL_TAB);
                if personal || strings.len() == STASH_TAB_COUNT {
                    let mut labels: Vec<Value> = Vec::with_capacity(8);
                    if personal {
                        labels.push(Value::from(PERSONAL_TAB));
                    }
                    labels.extend(tabs.iter().map(|tab| Value::from(tab.as_str())));
                    *strings = labels;
                    replaced += 1;
                }
            }
        }
        replaced += replace_stash_tabs(node, tabs);
    }
    replaced
}

/// The widget list of a HUD layout: the root array, or the first `children`
/// array found.
fn widget_list(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => match map.get("children") {
            Some(Value::Array(items)) => Some(items),
            _ => map.values().find_map(widget_list),
        },
        _ => None,
    }
}

fn widget_list_mut(value: &mut Value) -> Option<&mut Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => {
            if map.get("children").is_some_and(Value::is_array) {
                return map.get_mut("children").and_then(Value::as_array_mut);
            }
            map.values_mut().find_map(widget_list_mut)
        }
        _ => None,
    }
}

fn is_encyclopedia_button(widget: &Value) -> bool {
    widget.get("name").and_then(Value::as_str) == Some(ENCYCLOPEDIA_BUTTON)
}

pub fn encyclopedia_button(language: EncyclopediaLanguage) -> Value {
    json!({
        "type": "ButtonWidget",
        "name": ENCYCLOPEDIA_BUTTON,
        "fields": {
            "rect": { "x": 630, "y": 305, "scale": 0.2 },
            "filename": "BlizzlessEncyclopedia\\scroll_enc",
            "hoveredFrame": 1,
            "pressedFrame": 2,
            "tooltipString": "@dictEnc",
            "onClickMessage": format!(
                "PanelManager:OpenPanel:BlizzlessEncyclopediabut{}",
                language.as_str()
            ),
        }
    })
}

/// Language of the installed encyclopedia button, `None` when absent.
pub fn find_encyclopedia(root: &Value) -> Option<EncyclopediaLanguage> {
    let widget = widget_list(root)?
        .iter()
        .find(|widget| is_encyclopedia_button(widget))?;
    let language = widget
        .pointer("/fields/onClickMessage")
        .and_then(Value::as_str)
        .and_then(|message| ENCYCLOPEDIA_MESSAGE.captures(message))
        .map(|caps| match &caps[1] {
            "ru" => EncyclopediaLanguage::Ru,
            _ => EncyclopediaLanguage::En,
        });
    Some(language.unwrap_or(EncyclopediaLanguage::En))
}

/// Remove any existing button, then insert a fresh one after the run button
/// (or at the end) when enabled. Returns false if the layout has no widget list.
pub fn set_encyclopedia(root: &mut Value, enabled: bool, language: EncyclopediaLanguage) -> bool {
    let Some(widgets) = widget_list_mut(root) else {
        return false;
    };
    widgets.retain(|widget| !is_encyclopedia_button(widget));
    if enabled {
        let button = encyclopedia_button(language);
        match widgets
            .iter()
            .position(|widget| widget.get("type").and_then(Value::as_str) == Some(RUN_BUTTON_TYPE))
        {
            Some(index) => widgets.insert(index + 1, button),
            None => widgets.push(button),
        }
    }
    true
}

impl<F: GameFs> GameFiles<F> {
    pub fn read_stash_tabs(&self) -> Result<SettingsUpdate, GameFileError> {
        let (path, contents) = self.read_layout(BANK_LAYOUT_FILE)?;
        let root = parse_layout(&path, &contents)?;
        let tabs = find_stash_tabs(&root).ok_or_else(|| GameFileError::Layout {
            path: path.clone(),
            message: "no stash tab labels found".into(),
        })?;
        Ok(SettingsUpdate {
            stash: Some(StashPatch {
                tabs: tabs.into_iter().enumerate().collect(),
            }),
            ..Default::default()
        })
    }

    /// Written back with four-space indentation, like the shipped file.
    pub fn apply_stash_tabs(&self, settings: &StashRenameSettings) -> Result<(), GameFileError> {
        let (path, contents) = self.read_layout(BANK_LAYOUT_FILE)?;
        let mut root = parse_layout(&path, &contents)?;
        if replace_stash_tabs(&mut root, &settings.tabs) == 0 {
            return Err(GameFileError::Layout {
                path,
                message: "no stash tab labels found".into(),
            });
        }
        self.write(&path, &to_json_with_indent(&root, b"    ")?)
    }

    /// True when every intro video is an empty placeholder.
    pub fn intro_videos_skipped(&self) -> bool {
        let dir = self.layout().intro_video_dir();
        INTRO_VIDEO_FILES.iter().all(|name| {
            self.fs()
                .read_text(&dir.join(name))
                .is_ok_and(|contents| contents.is_empty())
        })
    }

    /// Enabling writes empty placeholders; disabling removes only placeholders
    /// that are still empty.
    pub fn apply_intro_videos(&self, skip: bool) -> Result<(), GameFileError> {
        let dir = self.layout().intro_video_dir();
        if skip {
            ensure_dirs(&[&dir]).map_err(|source| GameFileError::Write {
                path: dir.clone(),
                source,
            })?;
            for name in INTRO_VIDEO_FILES {
                self.write(&dir.join(name), "")?;
            }
            return Ok(());
        }
        for name in INTRO_VIDEO_FILES {
            let path = dir.join(name);
            let placeholder = self
                .fs()
                .read_text(&path)
                .is_ok_and(|contents| contents.is_empty());
            if placeholder {
                self.fs()
                    .remove_file(&path)
                    .map_err(|source| GameFileError::Write { path, source })?;
            }
        }
        Ok(())
    }

    /// Encyclopedia state from the HUD layout plus the intro video state. A
    /// missing button only clears `encyclopediaEnabled`; the language is kept.
    pub fn read_tweaks(&self) -> Result<SettingsUpdate, GameFileError> {
        let (path, contents) = self.read_layout(HUD_PANEL_FILE)?;
        let root = parse_layout(&path, &contents)?;
        let language = find_encyclopedia(&root);
        Ok(SettingsUpdate {
            tweaks: Some(TweaksPatch {
                encyclopedia_enabled: Some(language.is_some()),
                encyclopedia_language: language,
                skip_intro_videos: Some(self.intro_videos_skipped()),
            }),
            ..Default::default()
        })
    }

    pub fn apply_tweaks(&self, tweaks: &TweaksSettings) -> Result<(), GameFileError> {
        let (path, contents) = self.read_layout(HUD_PANEL_FILE)?;
        let mut root = parse_layout(&path, &contents)?;
        if !set_encyclopedia(
            &mut root,
            tweaks.encyclopedia_enabled,
            tweaks.encyclopedia_language,
        ) {
            return Err(GameFileError::Layout {
                path,
                message: "no widget list found".into(),
            });
        }
        self.write(&path, &to_json_with_indent(&root, b"  ")?)?;
        self.apply_intro_videos(tweaks.skip_intro_videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamefiles::{GameLayout, LocalGameFs};
    use std::fs;
    use tempfile::tempdir;

    const HUD: &str = r#"{
    // hud panel
    "type": "Widget",
    "children": [
        { "type": "RunButtonWidget", "name": "Run", },
        { "type": "ButtonWidget", "name": "Menu" },
    ],
}"#;

    const BANK: &str = r#"{
    "children": [
        { "type": "Widget", "children": [
            { "type": "TabBarWidget", "fields": { "textStrings": ["@personal", "@shared", "@shared", "@shared", "@shared", "@shared", "@shared", "@shared"] } }
        ] }
    ]
}"#;

    fn game_with(file: &str, contents: &str) -> (tempfile::TempDir, GameFiles<LocalGameFs>) {
        let dir = tempdir().unwrap();
        let layout = GameLayout::from_game_path(dir.path().to_str().unwrap()).unwrap();
        let [primary, _] = layout.layout_candidates(file);
        fs::create_dir_all(primary.parent().unwrap()).unwrap();
        fs::write(&primary, contents).unwrap();
        (dir, GameFiles::new(LocalGameFs::new(), layout))
    }

    #[test]
    fn sanitizes_comments_and_trailing_commas() {
        let value: Value = serde_json::from_str(&sanitize_json(HUD)).unwrap();
        assert_eq!(children(&value).len(), 2);
        let url = sanitize_json(r#"{"a": "http://x"}"#);
        assert_eq!(url, r#"{"a": "http://x"}"#);
    }

    #[test]
    fn encyclopedia_goes_after_run_button() {
        let mut root: Value = serde_json::from_str(&sanitize_json(HUD)).unwrap();
        assert_eq!(find_encyclopedia(&root), None);
        assert!(set_encyclopedia(&mut root, true, EncyclopediaLanguage::Ru));
        let widgets = children(&root);
        assert_eq!(widgets.len(), 3);
        assert!(is_encyclopedia_button(&widgets[1]));
        assert_eq!(find_encyclopedia(&root), Some(EncyclopediaLanguage::Ru));

        // Re-applying replaces rather than duplicates.
        set_encyclopedia(&mut root, true, EncyclopediaLanguage::En);
        assert_eq!(children(&root).len(), 3);
        assert_eq!(find_encyclopedia(&root), Some(EncyclopediaLanguage::En));

        set_encyclopedia(&mut root, false, EncyclopediaLanguage::En);
        assert_eq!(children(&root).len(), 2);
    }

    #[test]
    fn stash_tabs_round_trip_through_file() {
        let (_dir, game) = game_with(BANK_LAYOUT_FILE, BANK);
        let update = game.read_stash_tabs().unwrap();
        let patch = update.stash.unwrap();
        assert_eq!(patch.tabs.len(), STASH_TAB_COUNT);
        assert_eq!(patch.tabs[&0], "@shared");

        let mut settings = StashRenameSettings::default();
        settings.set_tab(0, "Runes");
        settings.set_tab(6, "Gems");
        game.apply_stash_tabs(&settings).unwrap();

        let [path, _] = game.layout().layout_candidates(BANK_LAYOUT_FILE);
        let written = fs::read_to_string(path).unwrap();
        assert!(written.contains("\n    \"children\""));
        let root: Value = serde_json::from_str(&written).unwrap();
        let tabs = find_stash_tabs(&root).unwrap();
        assert_eq!(tabs[0], "Runes");
        assert_eq!(tabs[6], "Gems");
        assert!(written.contains("@personal"));
    }

    #[test]
    fn seven_entry_tab_bar_is_recognized() {
        let root = json!({ "children": [ { "type": "TabBarWidget", "fields": {
            "textStrings": ["a", "b", "c", "d", "e", "f", "g"] } } ] });
        let tabs = find_stash_tabs(&root).unwrap();
        assert_eq!(tabs[6], "g");
        let root = json!({ "children": [ { "type": "TabBarWidget", "fields": {
            "textStrings": ["a", "b"] } } ] });
        assert!(find_stash_tabs(&root).is_none());
    }

    #[test]
    fn tweaks_apply_and_read_back() {
        let (_dir, game) = game_with(HUD_PANEL_FILE, HUD);
        let tweaks = TweaksSettings {
            encyclopedia_enabled: true,
            encyclopedia_language: EncyclopediaLanguage::Ru,
            skip_intro_videos: true,
        };
        game.apply_tweaks(&tweaks).unwrap();
        assert!(game.intro_videos_skipped());

        let patch = game.read_tweaks().unwrap().tweaks.unwrap();
        assert_eq!(patch.encyclopedia_enabled, Some(true));
        assert_eq!(patch.encyclopedia_language, Some(EncyclopediaLanguage::Ru));
        assert_eq!(patch.skip_intro_videos, Some(true));

        game.apply_tweaks(&TweaksSettings {
            encyclopedia_enabled: false,
            skip_intro_videos: false,
            ..tweaks
        })
        .unwrap();
        assert!(!game.intro_videos_skipped());
        let patch = game.read_tweaks().unwrap().tweaks.unwrap();
        assert_eq!(patch.encyclopedia_enabled, Some(false));
        assert_eq!(patch.encyclopedia_language, None);
    }

    #[test]
    fn real_intro_videos_are_never_removed() {
        let (_dir, game) = game_with(HUD_PANEL_FILE, HUD);
        let video_dir = game.layout().intro_video_dir();
        fs::create_dir_all(&video_dir).unwrap();
        fs::write(video_dir.join("d2intro.webm"), "webm").unwrap();
        game.apply_intro_videos(false).unwrap();
        assert!(video_dir.join("d2intro.webm").exists());
    }
}
