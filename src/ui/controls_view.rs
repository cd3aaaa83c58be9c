use egui::{Align, Button, Color32, Layout, ProgressBar, RichText, TextEdit, Ui};
use egui_dropdown::DropDownBox;
use log::warn;

use fleetview::dashboard::{
    DashboardAction, NoticeKind, PAGE_SIZES, TimeRange, parse_range_input,
};

use super::DashboardApp;

impl DashboardApp {
    pub(crate) fn vehicle_bar(&mut self, ui: &mut Ui) {
        ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
            ui.label(RichText::new("Vehicle: ").color(Color32::WHITE));
            let vehicle_ids = self.controller.vehicle_ids().to_vec();
            ui.add(
                DropDownBox::from_iter(
                    vehicle_ids.iter(),
                    "vehicle_dropbox",
                    &mut self.vehicle_input,
                    |ui, text| ui.selectable_label(false, text),
                )
                .filter_by_input(false),
            );

            // only exact picks re-query, partial typing does not
            if self.vehicle_input != self.controller.state().vehicle_id()
                && vehicle_ids.contains(&self.vehicle_input)
            {
                self.dispatch(DashboardAction::SelectVehicle(self.vehicle_input.clone()));
            }

            if ui.button("All Vehicles").clicked() {
                self.vehicle_input.clear();
                self.dispatch(DashboardAction::SelectVehicle(String::new()));
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let upload_button = ui.add_enabled(
                    self.uploading.is_none(),
                    Button::new("📂 Upload CSV"),
                );
                if upload_button.clicked()
                    && let Some(path) = rfd::FileDialog::new()
                        .add_filter("CSV", &["csv"])
                        .pick_file()
                {
                    self.start_upload(path);
                }
            });
        });
    }

    pub(crate) fn upload_status(&mut self, ui: &mut Ui) {
        if let Some(progress) = self.controller.upload_progress() {
            ui.add(
                ProgressBar::new(progress as f32 / 100.)
                    .fill(super::PALETTE_BLUE)
                    .text(format!("Upload Progress: {}%", progress)),
            );
        }
        if let Some(notice) = self.controller.notice() {
            let color = match notice.kind {
                NoticeKind::Info => Color32::GRAY,
                NoticeKind::Success => Color32::LIGHT_GREEN,
                NoticeKind::Error => Color32::LIGHT_RED,
            };
            ui.label(RichText::new(&notice.text).color(color));
        }
    }

    pub(crate) fn range_filter(&mut self, ui: &mut Ui) {
        ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
            ui.label("Initial Timestamp:");
            ui.add(
                TextEdit::singleline(&mut self.initial_input)
                    .hint_text("YYYY-MM-DDTHH:MM")
                    .desired_width(150.),
            );
            ui.label("Final Timestamp:");
            ui.add(
                TextEdit::singleline(&mut self.final_input)
                    .hint_text("YYYY-MM-DDTHH:MM")
                    .desired_width(150.),
            );

            if ui.button("Apply").clicked() {
                match (
                    parse_range_input(&self.initial_input),
                    parse_range_input(&self.final_input),
                ) {
                    (Ok(initial), Ok(last)) => {
                        self.dispatch(DashboardAction::ApplyRange(TimeRange { initial, last }))
                    }
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Not applying range filter: {}", e);
                        self.controller.input_rejected(&e);
                    }
                }
            }
            if ui.button("Reset").clicked() {
                self.initial_input.clear();
                self.final_input.clear();
                self.dispatch(DashboardAction::ResetRange);
            }
        });
    }

    pub(crate) fn pagination_bar(&mut self, ui: &mut Ui) {
        ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
            ui.label("Rows per page:");
            let mut page_size = self.controller.state().page_size();
            egui::ComboBox::from_id_salt("page_size")
                .selected_text(page_size.to_string())
                .show_ui(ui, |ui| {
                    for size in PAGE_SIZES {
                        ui.selectable_value(&mut page_size, size, size.to_string());
                    }
                });
            if page_size != self.controller.state().page_size() {
                self.dispatch(DashboardAction::SetPageSize(page_size));
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let at_end = self.controller.is_last_page();
                if ui.add_enabled(!at_end, Button::new(">>")).clicked() {
                    self.dispatch(DashboardAction::LastPage);
                }
                if ui.add_enabled(!at_end, Button::new(">")).clicked() {
                    self.dispatch(DashboardAction::NextPage);
                }

                ui.label(format!("of {}", self.controller.total_pages()));
                let mut page_input = self.controller.page_input().to_string();
                let response = ui.add(TextEdit::singleline(&mut page_input).desired_width(40.));
                if response.changed() {
                    self.controller.set_page_input(&page_input);
                }
                if response.lost_focus() {
                    self.dispatch(DashboardAction::CommitPageInput);
                }
                ui.label("Page");

                let at_start = self.controller.is_first_page();
                if ui.add_enabled(!at_start, Button::new("<")).clicked() {
                    self.dispatch(DashboardAction::PreviousPage);
                }
                if ui.add_enabled(!at_start, Button::new("<<")).clicked() {
                    self.dispatch(DashboardAction::FirstPage);
                }
            });
        });
    }
}
