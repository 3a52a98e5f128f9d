use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;

/// Tamaño original y factores para volver de la entrada del modelo a píxeles de la imagen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub scale_x: f32,
    pub scale_y: f32,
}

pub struct PreparedInput {
    pub tensor: Array4<f32>,
    pub geometry: FrameGeometry,
}

/// Redimensiona (sin letterbox) a `imgsz x imgsz` y normaliza a NCHW en [0, 1].
pub fn prepare(image: &DynamicImage, imgsz: u32) -> PreparedInput {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, imgsz, imgsz, FilterType::Triangle);

    let size = imgsz as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        tensor[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        tensor[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        tensor[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }

    PreparedInput {
        tensor,
        geometry: FrameGeometry {
            width: rgb.width(),
            height: rgb.height(),
            scale_x: rgb.width() as f32 / imgsz as f32,
            scale_y: rgb.height() as f32 / imgsz as f32,
        },
    }
}
