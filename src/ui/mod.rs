mod chart_view;
mod controls_view;
mod table_view;

use std::{path::PathBuf, sync::Arc, time::Instant};

use egui::{Color32, Visuals, style::Widgets};
use log::{error, info, warn};

use fleetview::{
    DashboardAction, DashboardController, DashboardError, HttpBackend,
    config::AppConfig,
    upload::dataset_name_for,
    worker::{NetworkWorker, WorkerCommand, WorkerEvent},
};

pub(crate) const PALETTE_BLACK: Color32 = Color32::from_rgb(12, 12, 12);
pub(crate) const PALETTE_SLATE: Color32 = Color32::from_rgb(31, 41, 55);
pub(crate) const PALETTE_GRID: Color32 = Color32::from_rgb(55, 65, 81);
pub(crate) const PALETTE_BLUE: Color32 = Color32::from_rgb(37, 99, 235);
pub(crate) const PALETTE_LIGHT_BLUE: Color32 = Color32::from_rgb(173, 216, 230);

/// `DashboardApp` browses the telemetry served by the backend.
///
/// All network calls go through a [`NetworkWorker`]; the app only drains its
/// events at the start of every frame and feeds them to the
/// [`DashboardController`].
pub struct DashboardApp {
    controller: DashboardController,
    worker: NetworkWorker,
    app_config: AppConfig,
    vehicle_input: String,
    initial_input: String,
    final_input: String,
    uploading: Option<PathBuf>,
}

impl DashboardApp {
    pub fn new(
        app_config: AppConfig,
        cc: &eframe::CreationContext<'_>,
    ) -> Result<Self, DashboardError> {
        let default_visuals = Visuals {
            dark_mode: true,
            hyperlink_color: PALETTE_BLUE,
            faint_bg_color: PALETTE_SLATE,
            panel_fill: PALETTE_BLACK,
            button_frame: true,
            widgets: Widgets::dark(),
            striped: true,
            ..Default::default()
        };
        cc.egui_ctx.set_visuals(default_visuals);

        let backend = HttpBackend::new(&app_config.api_base_url)?;
        let repaint_ctx = cc.egui_ctx.clone();
        let worker = NetworkWorker::spawn(backend, Arc::new(move || repaint_ctx.request_repaint()))?;
        let controller = DashboardController::new(app_config.page_size, app_config.tz()?);
        info!(
            "Dashboard connected to {} ({})",
            app_config.api_base_url,
            controller.timezone()
        );

        let mut app = Self {
            controller,
            worker,
            app_config,
            vehicle_input: String::new(),
            initial_input: String::new(),
            final_input: String::new(),
            uploading: None,
        };
        app.dispatch(DashboardAction::Refresh);
        Ok(app)
    }

    pub(crate) fn dispatch(&mut self, action: DashboardAction) {
        let pending = self.controller.apply(action);
        let generation = pending.generation;
        if let Err(e) = self.worker.send(WorkerCommand::Fetch(pending)) {
            self.controller.reconcile(generation, Err(e));
        }
    }

    pub(crate) fn start_upload(&mut self, path: PathBuf) {
        let Some(vehicle_id) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(dataset_name_for)
        else {
            warn!("Ignoring upload of {:?}, no dataset name", path);
            return;
        };
        self.controller.begin_upload();
        self.uploading = Some(path.clone());
        if let Err(e) = self.worker.send(WorkerCommand::Upload { path, vehicle_id }) {
            self.uploading = None;
            self.controller.upload_failed(&e);
        }
    }

    fn pump_events(&mut self) {
        let events: Vec<WorkerEvent> = self.worker.try_iter().collect();
        for event in events {
            match event {
                WorkerEvent::Page { generation, result } => {
                    self.controller.reconcile(generation, result);
                }
                WorkerEvent::UploadProgress(progress) => {
                    self.controller.on_upload_progress(progress)
                }
                WorkerEvent::UploadMessage(message) => self.controller.on_upload_message(&message),
                WorkerEvent::UploadComplete => {
                    let pending = self.controller.on_upload_complete();
                    let generation = pending.generation;
                    if let Err(e) = self.worker.send(WorkerCommand::Fetch(pending)) {
                        self.controller.reconcile(generation, Err(e));
                    }
                }
                WorkerEvent::UploadFinished { vehicle_id, result } => {
                    self.uploading = None;
                    match result {
                        Ok(_) => {
                            let pending =
                                self.controller.upload_succeeded(&vehicle_id, Instant::now());
                            self.vehicle_input = vehicle_id;
                            let generation = pending.generation;
                            if let Err(e) = self.worker.send(WorkerCommand::Fetch(pending)) {
                                self.controller.reconcile(generation, Err(e));
                            }
                        }
                        Err(e) => self.controller.upload_failed(&e),
                    }
                }
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.app_config.page_size = self.controller.state().page_size();
        if let Err(e) = self.app_config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_events();
        self.controller.expire_notice(Instant::now());

        egui::TopBottomPanel::top("controls")
            .frame(egui::Frame::new().inner_margin(8))
            .show(ctx, |ui| {
                ui.heading("Vehicle Dashboard");
                ui.add_space(6.);
                self.vehicle_bar(ui);
                self.upload_status(ui);
                ui.add_space(6.);
                self.range_filter(ui);
            });

        egui::TopBottomPanel::bottom("pagination")
            .frame(egui::Frame::new().inner_margin(8))
            .show(ctx, |ui| {
                self.pagination_bar(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let chart_height = (ui.available_height() * 0.4).max(180.);
            let table_height = ui.available_height() - chart_height - 12.;
            ui.allocate_ui(egui::vec2(ui.available_width(), table_height), |ui| {
                self.records_table(ui);
            });
            ui.separator();
            self.soc_chart(ui);
        });

        // wake up once more to clear an expiring notice
        if let Some(expires_at) = self.controller.notice().and_then(|n| n.expires_at()) {
            ctx.request_repaint_after(expires_at.saturating_duration_since(Instant::now()));
        }
    }
}
