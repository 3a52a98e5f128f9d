pub mod detector;
pub mod labels;
pub mod model_catalog;
pub mod output;
pub mod preprocess;
pub mod yolo_engine;
