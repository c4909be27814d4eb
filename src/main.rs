//! Arkanoid core headless runner
//!
//! Plays a session on autopilot with a fixed-timestep loop and reports how
//! it went. Usage: `arkanoid-core [tuning.json] [seconds]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use anyhow::{Context, Result};

    use arkanoid_core::Tuning;
    use arkanoid_core::consts::*;
    use arkanoid_core::sim::{GamePhase, Session, SessionEvent, TickInput};

    /// Simulated display refresh
    const FRAME_DT: f32 = 1.0 / 60.0;

    struct Runner {
        session: Session,
        input: TickInput,
        accumulator: f32,
        aborted_ticks: u32,
        blocks_demolished: u32,
        power_ups: u32,
    }

    impl Runner {
        fn new(session: Session) -> Self {
            Self {
                session,
                input: TickInput {
                    idle_mode: true,
                    ..Default::default()
                },
                accumulator: 0.0,
                aborted_ticks: 0,
                blocks_demolished: 0,
                power_ups: 0,
            }
        }

        /// Run simulation ticks for one frame
        fn update(&mut self, dt: f32) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                if self.session.tick(&self.input, SIM_DT).is_err() {
                    // Already logged by the resolver; the next tick starts clean
                    self.aborted_ticks += 1;
                }
                self.accumulator -= SIM_DT;
                substeps += 1;
            }

            for event in self.session.drain_events() {
                match event {
                    SessionEvent::BlockDemolished { .. } => self.blocks_demolished += 1,
                    SessionEvent::PowerUp(_) => self.power_ups += 1,
                    _ => {}
                }
            }
        }
    }

    pub fn run() -> Result<()> {
        let mut args = std::env::args().skip(1);
        let tuning = match args.next() {
            Some(path) => Tuning::load(&path).with_context(|| format!("loading tuning from {path}"))?,
            None => Tuning::default(),
        };
        let seconds: f32 = match args.next() {
            Some(s) => s.parse().with_context(|| format!("invalid duration `{s}`"))?,
            None => 120.0,
        };

        let session = Session::new(tuning).context("starting session")?;
        let mut runner = Runner::new(session);

        let frames = (seconds / FRAME_DT).ceil() as u64;
        for _ in 0..frames {
            runner.update(FRAME_DT);
            if runner.session.phase() == GamePhase::GameOver {
                break;
            }
        }

        let session = &runner.session;
        log::info!(
            "Finished after {:.1}s simulated: level {}, score {}, lives {}",
            session.time_ticks() as f32 * SIM_DT,
            session.level(),
            session.score(),
            session.lives()
        );
        if runner.aborted_ticks > 0 {
            log::warn!("{} ticks aborted by resolver errors", runner.aborted_ticks);
        }

        println!("level:             {}", session.level());
        println!("score:             {}", session.score());
        println!("high score:        {}", session.high_score());
        println!("lives:             {}", session.lives());
        println!("blocks demolished: {}", runner.blocks_demolished);
        println!("power-ups:         {}", runner.power_ups);
        println!("phase:             {:?}", session.phase());
        println!(
            "snapshot:          {}",
            session.snapshot().to_json().context("serializing snapshot")?
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("Arkanoid core (headless) starting...");
    headless::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host on the web; nothing to run here
}
