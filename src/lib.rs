pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod raster;
pub mod stitch;
