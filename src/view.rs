//! What a rendering host needs to draw a chapter and its action bar.
//! Everything here is derived; nothing is stored.

use crate::auth::AuthSnapshot;
use crate::state::{Axis, AxisStatus, TransformState};

pub const URDU_LABEL: &str = "اردو ترجمہ";
pub const ENGLISH_LABEL: &str = "English";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlsVisibility {
    /// Sign-in state still resolving.
    Loading,
    /// Signed out: no transform controls at all.
    Hidden,
    Shown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonView {
    pub label: &'static str,
    pub enabled: bool,
    pub active: bool,
    pub busy: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChapterAction {
    TogglePersonalization,
    ToggleTranslation,
    RevertAll,
    DismissError,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterView {
    pub chapter_id: String,
    pub content: String,
    pub is_rtl: bool,
    pub controls: ControlsVisibility,
    pub personalize: ButtonView,
    pub translate: ButtonView,
    pub show_revert: bool,
    pub error: Option<String>,
}

impl ChapterView {
    pub fn derive(state: &TransformState, auth: &AuthSnapshot) -> Self {
        let controls = if auth.loading {
            ControlsVisibility::Loading
        } else if auth.is_signed_in() {
            ControlsVisibility::Shown
        } else {
            ControlsVisibility::Hidden
        };
        let busy = state.pending_axis().is_some();
        let button = |axis: Axis, idle: &'static str, active: &'static str, working: &'static str| {
            let status = state.status(axis);
            ButtonView {
                label: match status {
                    AxisStatus::Pending => working,
                    AxisStatus::Active => active,
                    AxisStatus::Idle | AxisStatus::Failed => idle,
                },
                enabled: !busy,
                active: status == AxisStatus::Active,
                busy: status == AxisStatus::Pending,
            }
        };

        Self {
            chapter_id: state.chapter_id().to_string(),
            content: state.displayed().to_string(),
            is_rtl: state.is_rtl(),
            controls,
            personalize: button(
                Axis::Personalization,
                "Personalize This Chapter",
                "Original Content",
                "Personalizing...",
            ),
            translate: button(Axis::Translation, URDU_LABEL, ENGLISH_LABEL, "Translating..."),
            show_revert: state.is_active(Axis::Personalization) || state.is_active(Axis::Translation),
            error: state.last_error().map(str::to_string),
        }
    }

    pub fn direction(&self) -> &'static str {
        if self.is_rtl {
            "rtl"
        } else {
            "ltr"
        }
    }
}

/// The page-wide language button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageToggleView {
    pub label: &'static str,
    pub hint: &'static str,
    pub page_direction: &'static str,
}

impl LanguageToggleView {
    pub fn derive(is_urdu: bool) -> Self {
        if is_urdu {
            Self {
                label: ENGLISH_LABEL,
                hint: "Switch to English",
                page_direction: "rtl",
            }
        } else {
            Self {
                label: URDU_LABEL,
                hint: "Switch to Urdu",
                page_direction: "ltr",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;

    fn signed_in() -> AuthSnapshot {
        AuthSnapshot::signed_in("ada", Credential::new("t"))
    }

    #[test]
    fn idle_chapter_offers_both_transforms() {
        let state = TransformState::new("intro", "Hello");
        let view = ChapterView::derive(&state, &signed_in());
        assert_eq!(view.controls, ControlsVisibility::Shown);
        assert_eq!(view.personalize.label, "Personalize This Chapter");
        assert_eq!(view.translate.label, URDU_LABEL);
        assert!(view.personalize.enabled && view.translate.enabled);
        assert!(!view.show_revert);
        assert_eq!(view.direction(), "ltr");
    }

    #[test]
    fn pending_axis_disables_both_buttons() {
        let mut state = TransformState::new("intro", "Hello");
        state.begin(Axis::Translation);
        let view = ChapterView::derive(&state, &signed_in());
        assert_eq!(view.translate.label, "Translating...");
        assert!(view.translate.busy);
        assert!(!view.translate.enabled);
        assert!(!view.personalize.enabled);
        assert!(!view.personalize.busy);
    }

    #[test]
    fn active_translation_is_rtl_with_revert() {
        let mut state = TransformState::new("intro", "Hello");
        state.activate(Axis::Translation, "سلام".into());
        let view = ChapterView::derive(&state, &signed_in());
        assert_eq!(view.content, "سلام");
        assert_eq!(view.direction(), "rtl");
        assert_eq!(view.translate.label, ENGLISH_LABEL);
        assert!(view.translate.active);
        assert!(view.show_revert);
    }

    #[test]
    fn controls_follow_auth_state() {
        let state = TransformState::new("intro", "Hello");
        let loading = AuthSnapshot { loading: true, ..AuthSnapshot::default() };
        assert_eq!(ChapterView::derive(&state, &loading).controls, ControlsVisibility::Loading);
        assert_eq!(
            ChapterView::derive(&state, &AuthSnapshot::default()).controls,
            ControlsVisibility::Hidden
        );
    }

    #[test]
    fn language_toggle_offers_the_other_language() {
        assert_eq!(LanguageToggleView::derive(false).label, URDU_LABEL);
        let urdu = LanguageToggleView::derive(true);
        assert_eq!(urdu.label, ENGLISH_LABEL);
        assert_eq!(urdu.page_direction, "rtl");
    }
}
