pub mod access_gate;
pub mod frame_sink;
pub mod frame_source;
