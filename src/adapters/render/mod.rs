pub mod annotate;
pub mod font;
