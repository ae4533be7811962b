#![warn(clippy::all, rust_2018_idioms)]

//! Pin placement on an emergency-response area map.
//!
//! Pins are dropped on a background image, named, recolored by category,
//! moved and exported. Each pin's position resolves to a coarse grid cell
//! such as `C3` for radio dispatch.

mod app;
pub mod canvas;
pub mod config;
pub mod error;
pub mod export;
pub mod file_picker;
pub mod geometry;
pub mod grid;
pub mod pin;
pub mod reconcile;
pub mod registry;
pub mod session;
pub mod surface;

pub use app::MapApp;
pub use config::MapConfig;
pub use error::{ConfigurationError, MapError, ParseError};
pub use geometry::{Frame, Position};
pub use pin::{Category, Pin};
pub use registry::{DeletionPolicy, PinRegistry, PinUpdate};
pub use session::MapSession;

use eframe::NativeOptions;

#[cfg(target_os = "android")]
use egui_winit::winit;

impl MapApp {
    /// Run the app with provided NativeOptions.
    pub fn run(options: NativeOptions) -> Result<(), eframe::Error> {
        eframe::run_native(
            "dispatch_map",
            options,
            Box::new(|cc| Ok(Box::new(MapApp::new(cc)))),
        )
    }
}

#[cfg(target_os = "android")]
#[allow(unsafe_code)]
#[unsafe(no_mangle)]
pub extern "C" fn android_main(app: winit::platform::android::activity::AndroidApp) {
    use eframe::Renderer;

    unsafe {
        std::env::set_var("RUST_BACKTRACE", "full");
    }
    android_logger::init_once(
        android_logger::Config::default().with_max_level(log::LevelFilter::Info),
    );

    let options = NativeOptions {
        android_app: Some(app),
        renderer: Renderer::Wgpu,
        ..Default::default()
    };

    if let Err(e) = MapApp::run(options) {
        log::error!("dispatch_map exited with error: {e}");
    }
}
