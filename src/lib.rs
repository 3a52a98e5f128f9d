//! Detección de objetos YOLO expuesta por HTTP.
//!
//! Capas: `domain` (contrato de detección y errores), `application` (puertos y
//! caso de uso) y `adapters` (ONNX, render, disco, HTTP y cliente).

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
