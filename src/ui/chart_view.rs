use egui::Ui;
use egui_plot::{Legend, Line, PlotPoints, Points};

use fleetview::vehicle_data::chart_time_label;

use super::{DashboardApp, PALETTE_BLUE, PALETTE_GRID, PALETTE_LIGHT_BLUE};

impl DashboardApp {
    pub(crate) fn soc_chart(&mut self, ui: &mut Ui) {
        let tz = *self.controller.timezone();
        let series = self.controller.soc_series();
        let markers = series.clone();

        ui.visuals_mut().widgets.noninteractive.bg_stroke.color = PALETTE_GRID;
        // x values are epoch seconds, labels follow the configured timezone
        egui_plot::Plot::new("soc_chart")
            .legend(Legend::default())
            .include_y(0.)
            .include_y(100.)
            .x_axis_formatter(move |mark, _range| chart_time_label(mark.value, &tz))
            .label_formatter(move |name, point| {
                format!("{}\n{}: {:.0}%", chart_time_label(point.x, &tz), name, point.y)
            })
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new("SOC (%)", PlotPoints::new(series))
                        .color(PALETTE_BLUE)
                        .fill(0.),
                );
                plot_ui.points(
                    Points::new("SOC samples", PlotPoints::new(markers))
                        .color(PALETTE_LIGHT_BLUE)
                        .radius(2.),
                );
            });
    }
}
