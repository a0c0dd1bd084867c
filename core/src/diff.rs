//! Unsaved-change detection against the active profile's saved snapshot.
//!
//! Equality is the derived structural `PartialEq` of the settings types:
//! vectors compare element-wise, maps compare key sets and then values, and
//! `None` never equals `Some(_)`. Selectors should be as narrow as the UI
//! element that asks, since each query compares only what the selector returns.

use crate::settings::{Section, SettingsDocument};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BaselineState {
    /// No profile is active, so there is nothing to compare against.
    NoBaseline,
    /// Every profile-scoped section matches the saved snapshot.
    Clean,
    Dirty,
}

#[derive(Debug, Clone, Copy)]
pub struct BaselineDiff<'a> {
    live: &'a SettingsDocument,
    baseline: Option<&'a SettingsDocument>,
}

impl<'a> BaselineDiff<'a> {
    pub fn new(live: &'a SettingsDocument, baseline: Option<&'a SettingsDocument>) -> Self {
        Self { live, baseline }
    }

    pub fn baseline(&self) -> Option<&'a SettingsDocument> {
        self.baseline
    }

    /// Whether the selected subtree differs from the baseline.
    /// Always false when there is no baseline.
    pub fn has_changed<T, F>(&self, select: F) -> bool
    where
        T: PartialEq + ?Sized,
        F: for<'d> Fn(&'d SettingsDocument) -> &'d T,
    {
        match self.baseline {
            Some(baseline) => select(self.live) != select(baseline),
            None => false,
        }
    }

    /// Like [`BaselineDiff::has_changed`] for selectors that build a value,
    /// for example an `Option` for an entry that may be absent on either side.
    pub fn has_changed_value<T, F>(&self, select: F) -> bool
    where
        T: PartialEq,
        F: Fn(&SettingsDocument) -> T,
    {
        match self.baseline {
            Some(baseline) => select(self.live) != select(baseline),
            None => false,
        }
    }

    pub fn section_changed(&self, section: Section) -> bool {
        match self.baseline {
            Some(baseline) => !self.live.section_eq(baseline, section),
            None => false,
        }
    }

    pub fn changed_sections(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|section| self.section_changed(*section))
            .collect()
    }

    pub fn state(&self) -> BaselineState {
        if self.baseline.is_none() {
            return BaselineState::NoBaseline;
        }
        let dirty = Section::ALL
            .into_iter()
            .filter(|section| section.is_profile_scoped())
            .any(|section| self.section_changed(section));
        if dirty {
            BaselineState::Dirty
        } else {
            BaselineState::Clean
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CommonItem, GemGroup};
    use crate::locale::LocaleCode;

    #[test]
    fn no_baseline_never_reports_changes() {
        let live = SettingsDocument::default();
        let diff = BaselineDiff::new(&live, None);
        assert!(!diff.has_changed(|doc| &doc.tweaks));
        assert!(!diff.has_changed_value(|doc| doc.runes.len() + 1));
        assert!(diff.changed_sections().is_empty());
        assert_eq!(diff.state(), BaselineState::NoBaseline);
    }

    #[test]
    fn narrow_selectors_only_see_their_subtree() {
        let baseline = SettingsDocument::default();
        let mut live = baseline.clone();
        live.gems.get_mut(&GemGroup::Emeralds).unwrap().levels[4]
            .locales
            .set(LocaleCode::EnUs, "Perfect Emerald!");

        let diff = BaselineDiff::new(&live, Some(&baseline));
        assert!(diff.has_changed(|doc| doc.gems[&GemGroup::Emeralds].levels[4].locales.get(LocaleCode::EnUs)));
        assert!(!diff.has_changed(|doc| &doc.gems[&GemGroup::Emeralds].levels[3]));
        assert!(!diff.has_changed(|doc| &doc.common));
        assert_eq!(diff.changed_sections(), vec![Section::Gems]);
        assert_eq!(diff.state(), BaselineState::Dirty);
    }

    #[test]
    fn absence_differs_from_empty() {
        let baseline = SettingsDocument::default();
        let mut live = baseline.clone();
        live.items.items.insert("hax".into(), Default::default());
        let diff = BaselineDiff::new(&live, Some(&baseline));
        assert!(diff.has_changed_value(|doc| doc.items.items.get("hax").cloned()));
        assert!(!diff.has_changed_value(|doc| doc.items.items.get("axe").cloned()));
    }

    #[test]
    fn global_sections_do_not_dirty_the_profile() {
        let baseline = SettingsDocument::default();
        let mut live = baseline.clone();
        live.app.debug_mode = true;
        live.tweaks.skip_intro_videos = true;
        let diff = BaselineDiff::new(&live, Some(&baseline));
        assert_eq!(diff.changed_sections(), vec![Section::App, Section::Tweaks]);
        assert_eq!(diff.state(), BaselineState::Clean);
        assert!(!diff.has_changed(|doc| &doc.common.items[&CommonItem::Gold]));
    }
}
