//! The map canvas: the background image with circles drawn on top.
//!
//! Like a drawing-canvas widget, it only knows a flat list of circle objects
//! with no pin ids. Added and moved circles are reported as the complete
//! object list, which the app reconciles against the registry. A removal is
//! reported by index instead, since index pairing would shift every later pin.

use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, TextureHandle};

use crate::geometry::{Frame, Position};
use crate::grid::{self, GridSpec};
use crate::pin::Category;
use crate::surface::{Click, Marker, SurfaceEvent, SurfaceObject};

const GRID_COLOR: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 90);
const LABEL_COLOR: Color32 = Color32::from_rgb(250, 250, 250);
const OUTLINE: Color32 = Color32::WHITE;

#[derive(Default)]
pub struct CanvasResponse {
    /// Set when the user changed the drawing.
    pub event: Option<SurfaceEvent>,
    /// Index of a circle the user clicked on.
    pub selected: Option<usize>,
    /// Index the removed circle had before it was taken off the canvas.
    pub removed: Option<usize>,
}

/// Everything the canvas draws besides its own objects.
pub struct CanvasView<'a> {
    pub texture: Option<&'a TextureHandle>,
    pub frame: Frame,
    pub spec: &'a GridSpec,
    /// Index-aligned with the canvas objects.
    pub markers: &'a [Marker],
    /// Category of newly placed circles.
    pub fill: Category,
    pub radius: f64,
}

#[derive(Default)]
pub struct MapCanvas {
    objects: Vec<SurfaceObject>,
    dragging: Option<usize>,
}

/// Maps between screen points and frame coordinates for one drawn rect.
struct Projection {
    rect: Rect,
    frame: Frame,
}

impl Projection {
    fn to_frame(&self, p: Pos2) -> Position {
        Position::new(
            f64::from((p.x - self.rect.min.x) / self.rect.width()) * self.frame.width,
            f64::from((p.y - self.rect.min.y) / self.rect.height()) * self.frame.height,
        )
    }

    fn to_screen(&self, p: Position) -> Pos2 {
        Pos2::new(
            self.rect.min.x + (p.x / self.frame.width) as f32 * self.rect.width(),
            self.rect.min.y + (p.y / self.frame.height) as f32 * self.rect.height(),
        )
    }

    fn scale(&self) -> f32 {
        self.rect.width() / self.frame.width as f32
    }
}

impl MapCanvas {
    /// Replaces the drawn objects, e.g. after the registry changed elsewhere.
    pub fn load(&mut self, objects: Vec<SurfaceObject>) {
        self.objects = objects;
        self.dragging = None;
    }

    pub fn objects(&self) -> &[SurfaceObject] {
        &self.objects
    }

    fn hit(&self, point: Position) -> Option<usize> {
        // Topmost first: later objects are drawn above earlier ones.
        self.objects.iter().rposition(|o| o.is_circle() && o.contains(point))
    }

    /// Takes the circle under `point` off the canvas and returns its index.
    fn remove_at(&mut self, point: Position) -> Option<usize> {
        let index = self.hit(point)?;
        self.objects.remove(index);
        self.dragging = None;
        Some(index)
    }

    fn snapshot(&self, click: Option<Click>) -> SurfaceEvent {
        SurfaceEvent {
            last_click: click,
            objects: Some(self.objects.clone()),
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, view: &CanvasView<'_>) -> CanvasResponse {
        let frame = view.frame;
        let mut out = CanvasResponse::default();
        if frame.is_degenerate() {
            ui.label("Map frame has no area.");
            return out;
        }

        // Fit the frame into the available space while preserving aspect ratio.
        let avail = ui.available_size();
        let aspect = (frame.height / frame.width) as f32;
        let mut size = egui::vec2(avail.x.max(10.0), avail.x.max(10.0) * aspect);
        if size.y > avail.y {
            size = egui::vec2(avail.y.max(10.0) / aspect, avail.y.max(10.0));
        }
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let proj = Projection { rect, frame };
        let painter = ui.painter_at(rect);

        match view.texture {
            Some(tex) => {
                painter.image(
                    tex.id(),
                    rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
            None => {
                painter.rect_filled(rect, 0.0, Color32::from_gray(60));
            }
        }
        draw_grid(&painter, &proj, view.spec);

        if response.drag_started() {
            self.dragging = response
                .interact_pointer_pos()
                .and_then(|p| self.hit(proj.to_frame(p)));
        }
        if response.dragged() {
            if let Some(obj) = self.dragging.and_then(|i| self.objects.get_mut(i)) {
                let delta = response.drag_delta();
                let c = obj.center();
                let moved = Position::new(
                    c.x + f64::from(delta.x / proj.scale()),
                    c.y + f64::from(delta.y / proj.scale()),
                );
                obj.set_center(frame.clamp(moved));
            }
        }
        if response.drag_stopped() && self.dragging.take().is_some() {
            out.event = Some(self.snapshot(None));
        }

        if response.clicked() {
            if let Some(p) = response.interact_pointer_pos() {
                let point = proj.to_frame(p);
                match self.hit(point) {
                    Some(i) => out.selected = Some(i),
                    None => {
                        let point = frame.clamp(point);
                        self.objects
                            .push(SurfaceObject::circle(point, view.radius, view.fill.color()));
                        out.event = Some(self.snapshot(Some(Click {
                            x: point.x,
                            y: point.y,
                        })));
                    }
                }
            }
        }
        if response.secondary_clicked() {
            out.removed = response
                .interact_pointer_pos()
                .and_then(|p| self.remove_at(proj.to_frame(p)));
        }

        let hovered = response.hover_pos().and_then(|p| self.hit(proj.to_frame(p)));
        for (i, obj) in self.objects.iter().enumerate() {
            let center = proj.to_screen(obj.center());
            let [r, g, b] = Category::from_color(obj.fill.as_deref().unwrap_or_default()).rgb();
            let r_screen = (obj.radius as f32 * proj.scale()).max(4.0);
            let width = if hovered == Some(i) || self.dragging == Some(i) { 3.0 } else { 1.5 };
            painter.circle(center, r_screen, Color32::from_rgb(r, g, b), Stroke::new(width, OUTLINE));

            if let Some(marker) = view.markers.get(i) {
                let text = if hovered == Some(i) {
                    marker.tooltip_text.clone()
                } else {
                    marker.id.to_string()
                };
                painter.text(
                    center + egui::vec2(r_screen + 3.0, 0.0),
                    Align2::LEFT_CENTER,
                    text,
                    FontId::proportional(13.0),
                    LABEL_COLOR,
                );
            }
        }

        out
    }
}

fn draw_grid(painter: &egui::Painter, proj: &Projection, spec: &GridSpec) {
    let (xs, ys) = spec.lines(proj.frame);
    let (Some(&x0), Some(&x1), Some(&y0), Some(&y1)) = (xs.first(), xs.last(), ys.first(), ys.last())
    else {
        return;
    };
    let stroke = Stroke::new(1.0, GRID_COLOR);
    let top = proj.to_screen(Position::new(0.0, y0)).y;
    let bottom = proj.to_screen(Position::new(0.0, y1)).y;
    let left = proj.to_screen(Position::new(x0, 0.0)).x;
    let right = proj.to_screen(Position::new(x1, 0.0)).x;

    for &x in &xs {
        let sx = proj.to_screen(Position::new(x, 0.0)).x;
        painter.line_segment([Pos2::new(sx, top), Pos2::new(sx, bottom)], stroke);
    }
    for (i, pair) in xs.windows(2).enumerate() {
        if let [a, b] = pair {
            let mid = proj.to_screen(Position::new((a + b) / 2.0, 0.0)).x;
            painter.text(
                Pos2::new(mid, top + 2.0),
                Align2::CENTER_TOP,
                grid::column_letters(i),
                FontId::proportional(14.0),
                LABEL_COLOR,
            );
        }
    }
    for &y in &ys {
        let sy = proj.to_screen(Position::new(0.0, y)).y;
        painter.line_segment([Pos2::new(left, sy), Pos2::new(right, sy)], stroke);
    }
    for (j, pair) in ys.windows(2).enumerate() {
        if let [a, b] = pair {
            let mid = proj.to_screen(Position::new(0.0, (a + b) / 2.0)).y;
            painter.text(
                Pos2::new(left + 4.0, mid),
                Align2::LEFT_CENTER,
                spec.row_number_at(j).to_string(),
                FontId::proportional(14.0),
                LABEL_COLOR,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_round_trip() {
        let proj = Projection {
            rect: Rect::from_min_size(Pos2::new(10.0, 20.0), egui::vec2(400.0, 200.0)),
            frame: Frame::new(800.0, 400.0),
        };
        let p = proj.to_frame(Pos2::new(210.0, 120.0));
        assert_eq!(p, Position::new(400.0, 200.0));
        assert_eq!(proj.to_screen(p), Pos2::new(210.0, 120.0));
        assert_eq!(proj.scale(), 0.5);
    }

    #[test]
    fn test_hit_prefers_topmost_circle() {
        let mut canvas = MapCanvas::default();
        canvas.load(vec![
            SurfaceObject::circle(Position::new(50.0, 50.0), 8.0, "#ff0000"),
            SurfaceObject::circle(Position::new(54.0, 50.0), 8.0, "#0066ff"),
        ]);
        assert_eq!(canvas.hit(Position::new(52.0, 50.0)), Some(1));
        assert_eq!(canvas.hit(Position::new(44.0, 50.0)), Some(0));
        assert_eq!(canvas.hit(Position::new(200.0, 50.0)), None);
    }

    #[test]
    fn test_remove_at_reports_index_of_removed_circle() {
        let mut canvas = MapCanvas::default();
        canvas.load(vec![
            SurfaceObject::circle(Position::new(100.0, 100.0), 8.0, "#ff0000"),
            SurfaceObject::circle(Position::new(200.0, 100.0), 8.0, "#ff8c00"),
            SurfaceObject::circle(Position::new(300.0, 100.0), 8.0, "#0066ff"),
        ]);
        assert_eq!(canvas.remove_at(Position::new(101.0, 99.0)), Some(0));
        let centers: Vec<f64> = canvas.objects().iter().map(|o| o.center().x).collect();
        assert_eq!(centers, vec![200.0, 300.0]);
        assert_eq!(canvas.remove_at(Position::new(500.0, 100.0)), None);
        assert_eq!(canvas.objects().len(), 2);
    }

    #[test]
    fn test_snapshot_reports_every_object() {
        let mut canvas = MapCanvas::default();
        canvas.load(vec![SurfaceObject::circle(Position::new(5.0, 5.0), 8.0, "#000000")]);
        let event = canvas.snapshot(None);
        assert_eq!(event.objects.map(|o| o.len()), Some(1));
        assert_eq!(canvas.objects().len(), 1);
    }
}
