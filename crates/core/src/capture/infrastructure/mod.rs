pub mod image_file_sink;
pub mod image_sequence_source;
pub mod null_sink;
pub mod source_factory;
pub mod synthetic_source;
