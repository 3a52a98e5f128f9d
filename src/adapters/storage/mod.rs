pub mod annotated_file;
