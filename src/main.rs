mod api;
mod config;
mod dashboard;
mod error;
mod model;
mod products;
mod ui;
mod worker;

use api::HttpApi;
use clap::Parser;
use config::Config;
use eframe::egui;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use ui::AdminApp;
use worker::Worker;

fn main() -> eframe::Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = config.validate() {
        error!("{e}");
        std::process::exit(2);
    }

    let api = match HttpApi::new(&config) {
        Ok(api) => api,
        Err(e) => {
            error!("Failed to create HTTP client: {e}");
            std::process::exit(1);
        }
    };
    let base_url = api.base_url().to_string();
    info!(%base_url, timeout_secs = config.timeout_secs, "starting admin panel");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([960.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Admin Panel",
        options,
        Box::new(move |cc| {
            ui::set_custom_style(&cc.egui_ctx);

            let ctx = cc.egui_ctx.clone();
            let worker = Worker::new(Arc::new(api), move || ctx.request_repaint())?;
            Ok(Box::new(AdminApp::new(worker, base_url)))
        }),
    )
}
