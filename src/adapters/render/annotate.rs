use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::adapters::render::font::LabelFont;
use crate::application::ports::AnnotatorPort;
use crate::domain::detection::Detection;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]); // rojo
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationStyle {
    pub box_color: Rgb<u8>,
    pub text_color: Rgb<u8>,
    pub line_width: u32,
}

impl AnnotationStyle {
    /// Instantánea de depuración del servidor.
    pub fn server() -> Self {
        Self { box_color: BOX_COLOR, text_color: TEXT_COLOR, line_width: 2 }
    }

    /// Vista del cliente, con trazo más grueso.
    pub fn client() -> Self {
        Self { line_width: 3, ..Self::server() }
    }
}

/// Dibuja cajas y etiquetas `"{label} {score:.2}"` sobre una copia de la imagen.
pub struct AnnotationRenderer {
    font: LabelFont,
    style: AnnotationStyle,
}

impl AnnotationRenderer {
    pub fn new(font: LabelFont, style: AnnotationStyle) -> Self {
        Self { font, style }
    }

    pub fn draw_detections(&self, canvas: &mut RgbImage, detections: &[Detection]) {
        for det in detections {
            self.draw_box(canvas, det);
            self.draw_label(canvas, det);
        }
    }

    fn draw_box(&self, canvas: &mut RgbImage, det: &Detection) {
        let [x_min, y_min, _, _] = det.bbox;
        // Coordenadas inclusivas: una caja [x, x] ocupa un píxel.
        let w = (det.width() + 1).max(1) as u32;
        let h = (det.height() + 1).max(1) as u32;

        // El grosor crece hacia dentro.
        for t in 0..self.style.line_width {
            let (inner_w, inner_h) = (w.saturating_sub(2 * t), h.saturating_sub(2 * t));
            if inner_w == 0 || inner_h == 0 {
                break;
            }
            let rect = Rect::at(x_min + t as i32, y_min + t as i32).of_size(inner_w, inner_h);
            draw_hollow_rect_mut(canvas, rect, self.style.box_color);
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, det: &Detection) {
        let [x_min, y_min, _, _] = det.bbox;
        let text = det.caption();
        let (tw, th) = self.font.text_size(&text);

        let background = Rect::at(x_min, y_min).of_size(tw.max(1), th.max(1));
        draw_filled_rect_mut(canvas, background, self.style.box_color);
        self.font.draw(canvas, self.style.text_color, x_min, y_min, &text);
    }
}

impl AnnotatorPort for AnnotationRenderer {
    fn render(&self, image: &DynamicImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        self.draw_detections(&mut canvas, detections);
        canvas
    }
}
