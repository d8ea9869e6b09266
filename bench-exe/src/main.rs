//! Headless benchmark driver: renders the synthetic cross scene over and
//! over while sweeping the camera, reporting traversal counters and frame
//! throughput.

mod cli;

use std::error::Error;
use std::time::Instant;

use glam::Vec2;
use render_soft::{RenderOptions, SliceSet};
use scene::log::{self, info};
use scene::{Player, cross_scene};
use simplelog::TermLogger;

use crate::cli::CLIOptions;

fn main() -> Result<(), Box<dyn Error>> {
    let options: CLIOptions = argh::from_env();

    TermLogger::init(
        options.verbose.unwrap_or(log::LevelFilter::Info),
        simplelog::ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut scene = cross_scene();
    let mut player = Player::new(Vec2::new(-128.0, 0.0), 0.0);
    player.update_height(&scene);

    let mut slices = SliceSet::new(options.width, options.height, options.slices);
    slices.set_options(RenderOptions {
        fullbright: options.fullbright,
        no_batch: options.no_batch,
    });
    let mut framebuffer = vec![0u8; (options.width * options.height) as usize];

    info!(
        "rendering {} frames at {}x{} over {} slices",
        options.frames, options.width, options.height, options.slices
    );
    let start = Instant::now();
    for frame in 0..options.frames {
        slices.render(&scene, &player, &mut framebuffer);
        scene.frame_count += 1;
        player.set_angle(frame as f32 * 0.5);
    }
    let elapsed = start.elapsed().as_secs_f64();

    let counts = slices.counts();
    info!(
        "last frame: {} nodes, {} segments, {} things",
        counts.nodes, counts.segments, counts.things
    );
    info!(
        "{} frames in {:.3}s, {:.1} fps",
        options.frames,
        elapsed,
        options.frames as f64 / elapsed
    );
    // Keep the framebuffer observable so the loop cannot be elided.
    let checksum: u64 = framebuffer.iter().map(|&p| u64::from(p)).sum();
    info!("framebuffer checksum {checksum:#x}");
    Ok(())
}
