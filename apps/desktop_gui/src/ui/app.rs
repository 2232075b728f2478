use client_core::{
    screen::{CONFIRM_MESSAGE, CONFIRM_TITLE, EMPTY_STATE_TEXT},
    Mutation, MirrorStatus, TodoScreen,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{Item, ItemId, ItemState};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{UiError, UiErrorCategory, UiErrorContext, UiEvent},
    orchestration::dispatch_backend_command,
};

const ADD_BUTTON_LABEL: &str = "Add new Todo item";
const CLEAR_ALL_LABEL: &str = "Remove all todos";
const INPUT_HINT: &str = "What needs to be done?";

pub struct TodoApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    screen: TodoScreen,
    mirror_status: MirrorStatus,
    status: String,
    last_error: Option<UiError>,
    backend_available: bool,
}

impl TodoApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            screen: TodoScreen::new(),
            mirror_status: MirrorStatus::Connecting,
            status: "Connecting...".to_string(),
            last_error: None,
            backend_available: true,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => {
                    if err.context() == UiErrorContext::BackendStartup {
                        self.backend_available = false;
                    }
                    self.status = err.message().to_string();
                    self.last_error = Some(err);
                }
                UiEvent::Snapshot { items, status } => {
                    self.screen.apply_snapshot(items);
                    self.mirror_status = status;
                    self.status = match status {
                        MirrorStatus::Connecting => "Connecting...".to_string(),
                        MirrorStatus::Live => "Live".to_string(),
                        MirrorStatus::Ended => {
                            "Subscription ended; showing last known items".to_string()
                        }
                    };
                }
            }
        }
    }

    fn send(&mut self, mutation: Mutation) -> bool {
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Mutate(mutation),
            &mut self.status,
        )
    }

    /// The input is cleared only once the create is queued for the backend.
    fn submit_draft(&mut self) {
        let typed = self.screen.draft().to_string();
        if let Some(mutation) = self.screen.submit() {
            if !self.send(mutation) {
                self.screen.set_draft(typed);
            }
        }
    }

    fn show_input_row(&mut self, ui: &mut egui::Ui) {
        let mut submit = false;
        ui.horizontal(|ui| {
            let input_width = (ui.available_width() - 160.0).max(120.0);
            let response = ui.add(
                egui::TextEdit::singleline(self.screen.draft_mut())
                    .hint_text(INPUT_HINT)
                    .desired_width(input_width),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
                response.request_focus();
            }
            if ui.button(ADD_BUTTON_LABEL).clicked() {
                submit = true;
            }
        });
        if submit {
            self.submit_draft();
        }
    }

    fn show_items(&mut self, ui: &mut egui::Ui) {
        if self.screen.is_empty() {
            ui.add_space(12.0);
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new(EMPTY_STATE_TEXT).italics().weak());
            });
            return;
        }

        let mut pending = Vec::new();
        egui::ScrollArea::vertical()
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for (item, state) in self.screen.rows() {
                    if let Some(action) = show_item_row(ui, item, state) {
                        pending.extend(match action {
                            RowAction::Toggle(id) => self.screen.toggle(&id),
                            RowAction::Remove(id) => self.screen.remove(&id),
                        });
                    }
                }
            });
        for mutation in pending {
            self.send(mutation);
        }
    }

    fn show_confirm_dialog(&mut self, ctx: &egui::Context) {
        if !self.screen.is_confirming_clear_all() {
            return;
        }
        let mut confirmed = false;
        let mut cancelled = false;
        egui::Window::new(CONFIRM_TITLE)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(CONFIRM_MESSAGE);
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        cancelled = true;
                    }
                    if ui.button("OK").clicked() {
                        confirmed = true;
                    }
                });
            });
        if cancelled {
            self.screen.cancel_clear_all();
        } else if confirmed {
            if let Some(mutation) = self.screen.confirm_clear_all() {
                self.send(mutation);
            }
        }
    }

    fn show_status_line(&self, ui: &mut egui::Ui) {
        match &self.last_error {
            Some(err) if err.message() == self.status => {
                let prefix = match err.category() {
                    UiErrorCategory::Transport => "Connection problem",
                    UiErrorCategory::Validation => "Configuration problem",
                    UiErrorCategory::Unknown => "Error",
                };
                ui.colored_label(
                    egui::Color32::LIGHT_RED,
                    format!("{prefix}: {}", self.status),
                );
            }
            _ => {
                ui.small(self.status.as_str());
            }
        }
    }
}

enum RowAction {
    Toggle(ItemId),
    Remove(ItemId),
}

fn row_fill(state: ItemState) -> egui::Color32 {
    match state {
        ItemState::Completed => egui::Color32::LIGHT_GREEN,
        ItemState::Pending => egui::Color32::LIGHT_BLUE,
    }
}

fn show_item_row(ui: &mut egui::Ui, item: &Item, state: ItemState) -> Option<RowAction> {
    let mut action = None;
    egui::Frame::new()
        .fill(row_fill(state))
        .corner_radius(egui::CornerRadius::same(4))
        .inner_margin(egui::Margin::symmetric(8, 4))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                let mut done = item.done;
                if ui.checkbox(&mut done, "").changed() {
                    action = Some(RowAction::Toggle(item.id.clone()));
                }
                let mut text = egui::RichText::new(&item.text).color(egui::Color32::BLACK);
                if state.is_done() {
                    text = text.strikethrough();
                }
                if ui
                    .add(egui::Label::new(text).sense(egui::Sense::click()))
                    .clicked()
                {
                    action = Some(RowAction::Toggle(item.id.clone()));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("Delete").clicked() {
                        action = Some(RowAction::Remove(item.id.clone()));
                    }
                });
            });
        });
    ui.add_space(4.0);
    action
}

impl eframe::App for TodoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        egui::TopBottomPanel::bottom("status_line")
            .resizable(false)
            .show(ctx, |ui| self.show_status_line(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(self.screen.header());
            ui.separator();
            ui.add_enabled_ui(self.backend_available, |ui| {
                self.show_input_row(ui);
                ui.add_space(8.0);
                self.show_items(ui);
                ui.add_space(8.0);
                if ui.button(CLEAR_ALL_LABEL).clicked() {
                    self.screen.request_clear_all();
                }
            });
        });

        self.show_confirm_dialog(ctx);

        // Snapshots arrive over the channel; poll for them.
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
