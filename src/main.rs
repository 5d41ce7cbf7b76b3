//! Cell Arena headless runner
//!
//! Runs a scripted session against the simulation and logs how the player's
//! mass moves. Usage: `cell-arena [settings.json] [seed]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::cell::Cell;
    use std::rc::Rc;

    use cell_arena::{Settings, SettingsError};
    use cell_arena::consts::SIM_DT;
    use cell_arena::sim::{Arena, Stepper, TickInput};
    use glam::Vec2;

    env_logger::init();
    log::info!("Cell Arena (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => match Settings::load(&path) {
            Ok(settings) => settings,
            Err(err @ SettingsError::Io { .. }) => {
                log::warn!("{err}; using default settings");
                Settings::default()
            }
            Err(err) => {
                log::error!("{err}");
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(0xC311);

    let mut arena = Arena::new(settings, seed);
    let peak = Rc::new(Cell::new(0.0f32));
    let peak_sink = Rc::clone(&peak);
    arena.player.subscribe(move |total| {
        log::debug!("Total points: {total:.2}");
        if total > peak_sink.get() {
            peak_sink.set(total);
        }
    });

    // 60 s of play at a 30 Hz frame rate: circle the arena, split every
    // 3 s and eject every 5 s
    let mut stepper = Stepper::default();
    let frame_dt = SIM_DT * 2.0;
    let frames = (60.0 / frame_dt) as u32;
    let mut input = TickInput::default();
    for frame in 0..frames {
        let t = frame as f32 * frame_dt;
        input.target = Some(Vec2::new(t.cos(), t.sin()) * 30.0);
        if frame % 90 == 45 {
            input.split = Some(Vec2::new(t.cos(), t.sin()));
        }
        if frame % 150 == 75 {
            input.eject = Some(Vec2::new(-t.sin(), t.cos()));
        }
        stepper.advance(&mut arena, &mut input, frame_dt);

        if frame % 300 == 0 {
            log::info!(
                "t={:>5.1}s cells={:>2} total={:.2}",
                arena.now(),
                arena.cells().len(),
                arena.total_points()
            );
        }
    }

    let hazard_mass: f32 = arena.hazards.iter().map(|h| h.absorbed_mass).sum();
    println!("seed:           {seed}");
    println!("ticks:          {}", arena.time_ticks);
    println!("cells:          {}", arena.cells().len());
    println!("total points:   {:.2}", arena.total_points());
    println!("peak points:    {:.2}", peak.get());
    println!("pickups active: {}", arena.pickups.active_count());
    println!("hazard mass:    {hazard_mass:.2}");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No headless runner on wasm; embed the library instead
}
