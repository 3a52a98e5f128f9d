use anyhow::{Context, Result};
use ndarray::Array4;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use std::path::Path;

use crate::adapters::onnx::output::RawTensor;

/// Sesión ONNX de YOLO. `run` necesita `&mut self`: quien la comparta debe serializar.
pub struct OnnxYoloEngine {
    session: Session,
}

impl OnnxYoloEngine {
    pub fn load(path: &Path, intra_threads: usize) -> Result<Self> {
        let model_bytes = fs::read(path)
            .with_context(|| format!("reading model weights {}", path.display()))?;

        let mut builder = Session::builder()?.with_intra_threads(intra_threads)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let session = builder.commit_from_memory(&model_bytes)?;
        Ok(Self { session })
    }

    /// Ejecuta el modelo y copia la primera salida fuera de la sesión.
    pub fn run(&mut self, input: Array4<f32>) -> Result<RawTensor> {
        let input_shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let (data, _) = input.into_raw_vec_and_offset();
        let input_tensor = Value::from_array((input_shape, data))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let shape = shape_out.iter().map(|&x| x.max(0) as usize).collect();
        Ok(RawTensor { shape, data: data_out.to_vec() })
    }
}
