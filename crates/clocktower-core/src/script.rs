//! Scripts: which characters exist and the order they wake in.

use serde::{Deserialize, Serialize};

use crate::character::Character;

/// A set of characters and their night orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Script name.
    pub name: String,
    /// Characters that may be in play.
    pub characters: Vec<Character>,
    /// Wake order on the first night.
    pub first_night: Vec<Character>,
    /// Wake order on every later night.
    pub other_nights: Vec<Character>,
}

impl Script {
    /// Trouble Brewing, plus the travelers the engine resolves itself.
    pub fn trouble_brewing() -> Self {
        use Character::{
            Baron, Bureaucrat, Butler, Chef, Drunk, Empath, FortuneTeller, Imp, Investigator,
            Librarian, Mayor, Monk, Poisoner, Ravenkeeper, Recluse, Saint, ScarletWoman, Slayer,
            Soldier, Spy, Thief, Undertaker, Virgin, Washerwoman,
        };
        Self {
            name: "Trouble Brewing".to_owned(),
            characters: vec![
                Washerwoman,
                Librarian,
                Investigator,
                Chef,
                Empath,
                FortuneTeller,
                Undertaker,
                Monk,
                Ravenkeeper,
                Virgin,
                Slayer,
                Soldier,
                Mayor,
                Butler,
                Drunk,
                Recluse,
                Saint,
                Poisoner,
                Spy,
                ScarletWoman,
                Baron,
                Imp,
            ],
            first_night: vec![
                Bureaucrat,
                Thief,
                Poisoner,
                Washerwoman,
                Librarian,
                Investigator,
                Chef,
                Empath,
                FortuneTeller,
                Butler,
                Spy,
            ],
            other_nights: vec![
                Bureaucrat,
                Thief,
                Poisoner,
                Monk,
                ScarletWoman,
                Imp,
                Ravenkeeper,
                Empath,
                FortuneTeller,
                Butler,
                Undertaker,
                Spy,
            ],
        }
    }

    /// Look up a built-in script by name.
    pub fn builtin(name: &str) -> Option<Self> {
        let wanted: String = name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match wanted.as_str() {
            "tb" | "troublebrewing" => Some(Self::trouble_brewing()),
            _ => None,
        }
    }

    /// Whether `character` is on the script.
    pub fn has(&self, character: Character) -> bool {
        self.characters.contains(&character)
    }

    /// The wake order for the night following `day_number` days.
    pub fn night_order(&self, day_number: u32) -> &[Character] {
        if day_number == 0 {
            &self.first_night
        } else {
            &self.other_nights
        }
    }
}
