/// In-game color codes (`ÿc` + one character) used by the string tables.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static COLOR_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ÿc[0-9a-zA-Z@:;MNOPQRSTAU]").expect("valid color code regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameColor {
    White,
    Gray,
    Black,
    Beige,
    Lightred,
    Red,
    Dimred,
    Orange,
    Lightgold,
    Yellow,
    Green,
    Dimgreen,
    Indigo,
    Lightindigo,
    Turquoise,
    Lightblue,
    Pink,
    Purple,
}

impl GameColor {
    pub fn code(self) -> &'static str {
        match self {
            GameColor::White => "ÿc0",
            GameColor::Gray => "ÿc5",
            GameColor::Black => "ÿc6",
            GameColor::Beige => "ÿcM",
            GameColor::Lightred => "ÿc1",
            GameColor::Red => "ÿcU",
            GameColor::Dimred => "ÿcS",
            GameColor::Orange => "ÿc@",
            GameColor::Lightgold => "ÿc7",
            GameColor::Yellow => "ÿc9",
            GameColor::Green => "ÿc2",
            GameColor::Dimgreen => "ÿcA",
            GameColor::Indigo => "ÿc3",
            GameColor::Lightindigo => "ÿcP",
            GameColor::Turquoise => "ÿcN",
            GameColor::Lightblue => "ÿcT",
            GameColor::Pink => "ÿcO",
            GameColor::Purple => "ÿc;",
        }
    }
}

pub fn remove_color_codes(text: &str) -> String {
    COLOR_CODE.replace_all(text, "").into_owned()
}

pub fn has_color_codes(text: &str) -> bool {
    COLOR_CODE.is_match(text)
}
