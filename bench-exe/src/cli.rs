use argh::FromArgs;
use scene::log;

/// CLI options for the renderer benchmark
#[derive(Debug, Clone, FromArgs)]
pub struct CLIOptions {
    /// verbose level: off, error, warn, info, debug
    #[argh(option)]
    pub verbose: Option<log::LevelFilter>,
    /// canvas width in pixels
    #[argh(option, default = "640")]
    pub width: i32,
    /// canvas height in pixels
    #[argh(option, default = "400")]
    pub height: i32,
    /// vertical slices rendered in parallel
    #[argh(option, default = "4")]
    pub slices: usize,
    /// frames to render
    #[argh(option, default = "1000")]
    pub frames: u32,
    /// ignore light levels and distance attenuation
    #[argh(option, default = "false")]
    pub fullbright: bool,
    /// draw flat interiors row by row instead of batching rectangles
    #[argh(option, default = "false")]
    pub no_batch: bool,
}
