//! egui rendering of [`ChapterView`] and the language toggle. Returns the
//! clicked action; the caller decides what to do with it.

use egui::{Align, Button, Color32, Layout, RichText, ScrollArea, Ui};

use crate::view::{ButtonView, ChapterAction, ChapterView, ControlsVisibility, LanguageToggleView};

fn action_button(ui: &mut Ui, view: &ButtonView) -> bool {
    ui.horizontal(|ui| {
        if view.busy {
            ui.spinner();
        }
        ui.add_enabled(view.enabled, Button::new(view.label).selected(view.active))
            .clicked()
    })
    .inner
}

pub fn show_chapter(ui: &mut Ui, view: &ChapterView) -> Option<ChapterAction> {
    let mut action = None;

    match view.controls {
        ControlsVisibility::Loading => {
            ui.label("Loading...");
        }
        ControlsVisibility::Hidden => {}
        ControlsVisibility::Shown => {
            ui.horizontal(|ui| {
                if action_button(ui, &view.personalize) {
                    action = Some(ChapterAction::TogglePersonalization);
                }
                if action_button(ui, &view.translate) {
                    action = Some(ChapterAction::ToggleTranslation);
                }
                if view.show_revert && ui.button("Revert to Original").clicked() {
                    action = Some(ChapterAction::RevertAll);
                }
            });
            if let Some(err) = &view.error {
                ui.horizontal(|ui| {
                    ui.colored_label(Color32::from_rgb(0xC0, 0x39, 0x2B), err);
                    if ui.small_button("x").clicked() {
                        action = Some(ChapterAction::DismissError);
                    }
                });
            }
        }
    }

    ui.separator();
    let align = if view.is_rtl { Align::Max } else { Align::Min };
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.with_layout(Layout::top_down(align), |ui| {
                ui.label(RichText::new(&view.content));
            });
        });

    action
}

/// True when the page-wide toggle was clicked.
pub fn show_language_toggle(ui: &mut Ui, is_urdu: bool) -> bool {
    let view = LanguageToggleView::derive(is_urdu);
    ui.add(Button::new(view.label).selected(is_urdu))
        .on_hover_text(view.hint)
        .clicked()
}
