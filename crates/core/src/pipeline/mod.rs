pub mod infrastructure;
pub mod frame_processor;
pub mod pipeline_controller;
pub mod pipeline_executor;
pub mod pipeline_logger;
