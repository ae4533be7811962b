use egui::{Color32, ColorImage, TextureOptions};

use crate::canvas::{CanvasView, MapCanvas};
use crate::config::MapConfig;
use crate::file_picker::{self, PickPurpose, PickedFile};
use crate::geometry::CoordinateSpace;
use crate::grid::GridFormat;
use crate::pin::Category;
use crate::registry::DeletionPolicy;
use crate::session::MapSession;
use crate::surface;

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct MapApp {
    config: MapConfig,

    /// Category used for newly placed pins.
    category: Category,

    // Persist the last opened map image path (optional)
    image_path: Option<String>,

    /// Pins as a session document, refreshed on save.
    document: String,

    #[serde(skip)]
    session: MapSession,

    #[serde(skip)]
    canvas: MapCanvas,

    #[serde(skip)]
    image: Option<image::RgbaImage>,

    #[serde(skip)]
    texture: Option<egui::TextureHandle>,

    #[serde(skip)]
    selected: Option<u32>,

    #[serde(skip)]
    notice: Option<String>,

    #[serde(skip)]
    error: Option<String>,
}

const MAP_PATH: &str = "assets/map.jpg"; // Default map image; use Open map… to pick a different file

/// Edits collected while drawing the pin list, applied once the list is drawn.
enum PinAction {
    Rename(u32, String),
    Recategorize(u32, Category),
    Delete(u32),
    ClearAll,
}

impl Default for MapApp {
    fn default() -> Self {
        Self {
            config: MapConfig::default(),
            category: Category::EmsPrimary,
            image_path: Some(MAP_PATH.to_owned()),
            document: String::new(),
            session: MapSession::default(),
            canvas: MapCanvas::default(),
            image: None,
            texture: None,
            selected: None,
            notice: None,
            error: None,
        }
    }
}

impl MapApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Load previous app state (if any).
        let mut this: Self = if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        };

        this.session = MapSession::new(this.config.clone());
        if !this.document.is_empty() {
            if let Err(e) = this.session.load_document(this.document.as_bytes()) {
                log::warn!("discarding stored pins: {e}");
                this.error = Some(format!("Stored pins could not be restored: {e}"));
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let path = this.image_path.clone().unwrap_or_else(|| MAP_PATH.to_owned());
            if let Err(e) = this.load_image_file(std::path::Path::new(&path)) {
                this.error = Some(format!("Failed to load map '{path}': {e}"));
            }
        }

        this.refresh_canvas();
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        this
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn load_image_file(&mut self, path: &std::path::Path) -> Result<(), String> {
        let img = image::open(path).map_err(|e| e.to_string())?.to_rgba8();
        self.image_path = Some(path.to_string_lossy().to_string());
        self.set_image(img);
        Ok(())
    }

    fn load_image_bytes(&mut self, bytes: &[u8]) -> Result<(), String> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| e.to_string())?
            .to_rgba8();
        self.set_image(img);
        Ok(())
    }

    /// Adopts a new background image; the frame follows its size.
    fn set_image(&mut self, img: image::RgbaImage) {
        let (w, h) = img.dimensions();
        log::info!("map image loaded: {w}x{h}");
        let mut config = self.session.config().clone();
        config.set_image_size(w, h);
        self.apply_config(config);
        self.image = Some(img);
        // Invalidate the texture; ensure_texture rebuilds it on the next frame
        self.texture = None;
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        if let Some(img) = &self.image {
            let size = [img.width() as usize, img.height() as usize];
            let color = ColorImage::from_rgba_unmultiplied(size, img.as_raw());
            self.texture = Some(ctx.load_texture("map", color, TextureOptions::LINEAR));
        }
    }

    fn apply_config(&mut self, config: MapConfig) {
        self.session.set_config(config);
        self.config = self.session.config().clone();
        self.refresh_canvas();
    }

    /// Redraws the canvas objects from the registry.
    fn refresh_canvas(&mut self) {
        let markers = self.session.markers();
        self.canvas
            .load(surface::to_objects(&markers, self.session.config().marker_radius));
    }

    fn open(&mut self, purpose: PickPurpose) {
        match file_picker::pick(purpose) {
            Ok(Some(file)) => self.handle_picked(file),
            Ok(None) => {}
            Err(e) => self.error = Some(e),
        }
    }

    fn handle_picked(&mut self, file: PickedFile) {
        let result = match file.purpose {
            PickPurpose::MapImage => self.load_image_bytes(&file.bytes).map(|()| {
                #[cfg(not(target_arch = "wasm32"))]
                if let Some(path) = &file.path {
                    self.image_path = Some(path.to_string_lossy().to_string());
                }
                format!("Loaded map {}", file.name)
            }),
            PickPurpose::PinImport => self
                .session
                .import_json(&file.bytes)
                .map(|n| {
                    self.selected = None;
                    self.refresh_canvas();
                    format!("Imported {n} pins from {}", file.name)
                })
                .map_err(|e| format!("Import of {} rejected: {e}", file.name)),
            PickPurpose::Config => MapConfig::from_json(&file.bytes)
                .map(|config| {
                    self.apply_config(config);
                    format!("Loaded settings from {}", file.name)
                })
                .map_err(|e| format!("{}: {e}", file.name)),
        };
        match result {
            Ok(notice) => {
                self.notice = Some(notice);
                self.error = None;
            }
            Err(e) => self.error = Some(e),
        }
    }

    fn export(&mut self, name: &str, mime: &str, bytes: &[u8]) {
        match file_picker::save(name, mime, bytes) {
            Ok(true) => self.notice = Some(format!("Exported {name}")),
            Ok(false) => {}
            Err(e) => self.error = Some(e),
        }
    }

    fn apply_pin_action(&mut self, action: PinAction) {
        let result = match action {
            PinAction::Rename(id, label) => self.session.rename(id, &label).map(|_| ()),
            PinAction::Recategorize(id, category) => {
                self.session.recategorize(id, category).map(|_| ())
            }
            PinAction::Delete(id) => {
                self.selected = None;
                self.session.delete(id)
            }
            PinAction::ClearAll => {
                self.selected = None;
                self.session.clear();
                Ok(())
            }
        };
        if let Err(e) = result {
            self.notice = Some(e.to_string());
        }
        self.refresh_canvas();
    }

    fn settings_ui(&mut self, ui: &mut egui::Ui) {
        let mut config = self.session.config().clone();

        ui.horizontal(|ui| {
            ui.label("Columns:");
            ui.add(egui::DragValue::new(&mut config.grid.cols).range(1..=52));
            ui.label("Rows:");
            ui.add(egui::DragValue::new(&mut config.grid.rows).range(1..=52));
        });
        ui.horizontal(|ui| {
            ui.label("Label:");
            egui::ComboBox::from_id_salt("grid_format")
                .selected_text(config.grid.format.name())
                .show_ui(ui, |ui| {
                    for format in GridFormat::ALL {
                        ui.selectable_value(&mut config.grid.format, format, format.name());
                    }
                });
            ui.checkbox(&mut config.invert_y, "Row 1 at bottom");
        });
        ui.horizontal(|ui| {
            ui.label("Padding L/R/T/B:");
            for value in [
                &mut config.padding.left,
                &mut config.padding.right,
                &mut config.padding.top,
                &mut config.padding.bottom,
            ] {
                ui.add(egui::DragValue::new(value).range(0.0..=10_000.0).speed(1.0));
            }
        });
        ui.horizontal(|ui| {
            ui.label("On delete:");
            egui::ComboBox::from_id_salt("deletion_policy")
                .selected_text(config.deletion_policy.name())
                .show_ui(ui, |ui| {
                    for policy in DeletionPolicy::ALL {
                        ui.selectable_value(&mut config.deletion_policy, policy, policy.name());
                    }
                });
            ui.label("Marker radius:");
            ui.add(egui::DragValue::new(&mut config.marker_radius).range(1.0..=100.0));
        });
        ui.horizontal(|ui| {
            ui.label("Coordinates:");
            ui.radio_value(&mut config.coordinate_space, CoordinateSpace::Pixel, "pixels");
            ui.radio_value(&mut config.coordinate_space, CoordinateSpace::Normalized, "0..100");
        });
        if config.coordinate_space != self.session.config().coordinate_space {
            if let Some(img) = &self.image {
                config.set_image_size(img.width(), img.height());
            }
        }

        if config != *self.session.config() {
            self.apply_config(config);
        }

        for problem in self.session.config().grid_spec().validate(self.session.config().frame()) {
            ui.colored_label(Color32::YELLOW, problem.to_string());
        }
    }

    fn pins_ui(&mut self, ui: &mut egui::Ui) -> Vec<PinAction> {
        let mut actions = Vec::new();
        if self.session.pins().is_empty() {
            ui.label("No pins placed yet.");
            return actions;
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("pin_table").striped(true).show(ui, |ui| {
                ui.strong("ID");
                ui.strong("Cell");
                ui.strong("Name");
                ui.strong("Type");
                ui.end_row();

                for pin in self.session.pins() {
                    let selected = self.selected == Some(pin.id);
                    if ui.selectable_label(selected, format!("#{}", pin.id)).clicked() {
                        self.selected = Some(pin.id);
                    }
                    ui.label(self.session.cell(pin));

                    let mut label = pin.label.clone();
                    let edit = egui::TextEdit::singleline(&mut label)
                        .id_salt(("pin_label", pin.id))
                        .hint_text(pin.category.display_name())
                        .desired_width(120.0);
                    if ui.add(edit).changed() {
                        actions.push(PinAction::Rename(pin.id, label));
                    }

                    let mut category = pin.category;
                    egui::ComboBox::from_id_salt(("pin_category", pin.id))
                        .selected_text(category.display_name())
                        .show_ui(ui, |ui| {
                            for c in Category::ALL {
                                ui.selectable_value(&mut category, c, c.display_name());
                            }
                        });
                    if category != pin.category {
                        actions.push(PinAction::Recategorize(pin.id, category));
                    }

                    if ui.small_button("🗑").on_hover_text("Delete pin").clicked() {
                        actions.push(PinAction::Delete(pin.id));
                    }
                    ui.end_row();
                }
            });
        });
        actions
    }
}

impl eframe::App for MapApp {
    /// Called by the framework to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.config = self.session.config().clone();
        self.document = String::from_utf8_lossy(&self.session.save_document()).into_owned();
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Files picked in the browser arrive asynchronously.
        while let Some(file) = file_picker::take_picked() {
            self.handle_picked(file);
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open map image…").clicked() {
                        self.open(PickPurpose::MapImage);
                    }
                    if ui.button("Load settings…").clicked() {
                        self.open(PickPurpose::Config);
                    }
                    if ui.button("Import pins (JSON)…").clicked() {
                        self.open(PickPurpose::PinImport);
                    }
                    ui.separator();
                    if ui.button("Export JSON…").clicked() {
                        let bytes = self.session.export_json();
                        self.export("pins.json", "application/json", &bytes);
                    }
                    if ui.button("Export CSV…").clicked() {
                        let bytes = self.session.export_csv();
                        self.export("pins.csv", "text/csv", &bytes);
                    }
                    if ui.button("Save settings…").clicked() {
                        let bytes = self.session.config().to_json();
                        self.export("map_settings.json", "application/json", &bytes);
                    }
                    // NOTE: no File->Quit on web pages!
                    if !cfg!(target_arch = "wasm32") {
                        ui.separator();
                        if ui.button("Quit").clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    }
                });
                ui.add_space(16.0);

                egui::widgets::global_theme_preference_buttons(ui);
            });
        });

        egui::SidePanel::right("pin_panel")
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| {
                ui.heading("Pin type");
                for category in Category::ALL {
                    let [r, g, b] = category.rgb();
                    ui.horizontal(|ui| {
                        ui.colored_label(Color32::from_rgb(r, g, b), "⏺");
                        ui.radio_value(&mut self.category, category, category.display_name());
                    });
                }
                ui.small("Click the map to place a pin, drag to move it, right-click to remove it.");

                ui.separator();
                let mut actions = Vec::new();
                if ui.button("Clear all pins").clicked() {
                    actions.push(PinAction::ClearAll);
                }

                egui::CollapsingHeader::new("Grid settings").show(ui, |ui| self.settings_ui(ui));

                ui.separator();
                ui.heading("Pins");
                if let Some(pin) = self.selected.and_then(|id| self.session.registry().get(id)) {
                    if let Some(marker) = self
                        .session
                        .markers()
                        .into_iter()
                        .find(|m| m.id == pin.id)
                    {
                        ui.label(marker.popup_text);
                    }
                }
                actions.extend(self.pins_ui(ui));
                for action in actions {
                    self.apply_pin_action(action);
                }

                if let Some(notice) = &self.notice {
                    ui.separator();
                    ui.label(notice);
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(err) = &self.error {
                ui.colored_label(Color32::RED, err);
                ui.label("Place your map image at assets/map.jpg or use File → Open map image….");
            }

            self.ensure_texture(ctx);
            let markers = self.session.markers();
            let config = self.session.config();
            let spec = config.grid_spec();
            let view = CanvasView {
                texture: self.texture.as_ref(),
                frame: config.frame(),
                spec: &spec,
                markers: &markers,
                fill: self.category,
                radius: config.marker_radius,
            };
            let response = self.canvas.show(ui, &view);

            if let Some(index) = response.selected {
                self.selected = self.session.pins().get(index).map(|p| p.id);
            }
            if let Some(index) = response.removed {
                if self.session.delete_at(index).is_some_and(|id| self.selected == Some(id)) {
                    self.selected = None;
                }
                self.refresh_canvas();
            }
            if let Some(event) = response.event {
                match event.interaction() {
                    Ok(interaction) => {
                        let outcome = self.session.handle(interaction, self.category);
                        if let Some(id) = self.session.placed_pin(&outcome) {
                            self.selected = Some(id);
                        }
                    }
                    Err(e) => log::warn!("ignoring canvas event: {e}"),
                }
                self.refresh_canvas();
            }
        });
    }
}
