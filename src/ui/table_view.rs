use egui::{Color32, RichText, Sense, Ui};
use egui_extras::{Column, TableBuilder};

use fleetview::dashboard::{DashboardAction, SortColumn};

use super::DashboardApp;

const HEADER_HEIGHT: f32 = 24.;
const ROW_HEIGHT: f32 = 20.;

impl DashboardApp {
    pub(crate) fn records_table(&mut self, ui: &mut Ui) {
        let sort = self.controller.state().sort();
        let tz = *self.controller.timezone();
        let mut clicked_column = None;

        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .column(Column::auto().at_least(170.))
            .columns(Column::remainder(), SortColumn::ALL.len() - 1)
            .header(HEADER_HEIGHT, |mut header| {
                for column in SortColumn::ALL {
                    header.col(|ui| {
                        let mut text = column.label().to_string();
                        if sort.column == column {
                            text = format!("{} {}", text, sort.direction.arrow());
                        }
                        let label = ui.add(
                            egui::Label::new(RichText::new(text).strong().color(Color32::WHITE))
                                .sense(Sense::click()),
                        );
                        if label.clicked() {
                            clicked_column = Some(column);
                        }
                    });
                }
            })
            .body(|mut body| {
                if self.controller.records().is_empty() {
                    body.row(ROW_HEIGHT, |mut row| {
                        row.col(|ui| {
                            ui.label(RichText::new("No data available").color(Color32::GRAY));
                        });
                    });
                    return;
                }
                for record in self.controller.records() {
                    body.row(ROW_HEIGHT, |mut row| {
                        row.col(|ui| {
                            ui.label(record.local_timestamp(&tz));
                        });
                        row.col(|ui| {
                            ui.label(record.speed_label());
                        });
                        row.col(|ui| {
                            ui.label(record.odometer.to_string());
                        });
                        row.col(|ui| {
                            ui.label(record.soc.to_string());
                        });
                        row.col(|ui| {
                            ui.label(record.elevation.to_string());
                        });
                        row.col(|ui| {
                            ui.label(record.shift_state_label());
                        });
                    });
                }
            });

        if let Some(column) = clicked_column {
            self.dispatch(DashboardAction::Sort(column));
        }
    }
}
