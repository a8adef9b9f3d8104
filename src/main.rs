use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};

use vehicle_sim::laps::LapTracker;
use vehicle_sim::net::start_websocket_server;
use vehicle_sim::sim_loop::{LoopState, SimulationLoop};
use vehicle_sim::state::{Command, ServerMessage, SharedSession};
use vehicle_sim::vehicle::{ControlInput, ParameterSet, WheelId};

/// Render-side poll rate cap (frames per second).
const DEFAULT_FPS: u32 = 200;

#[derive(Parser, Debug)]
#[command(name = "vehicle-sim", version, about = "Fixed-timestep vehicle dynamics simulator")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run the simulation and stream snapshots over WebSocket
    Serve {
        #[command(flatten)]
        vehicle: VehicleArgs,

        #[arg(long, default_value = "0.0.0.0:9001")]
        addr: String,

        /// Poll rate of the simulation loop
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,

        /// Track length for lap counting (m)
        #[arg(long, default_value_t = 2000.0)]
        track_length: f32,
    },
    /// Headless run with constant inputs; prints a summary
    Drive {
        #[command(flatten)]
        vehicle: VehicleArgs,

        #[arg(long, default_value_t = 10.0)]
        seconds: f64,

        #[arg(long, default_value_t = 1.0)]
        throttle: f32,

        #[arg(long, default_value_t = 0.0)]
        brake: f32,

        #[arg(long, default_value_t = 0.0)]
        steer: f32,

        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,

        #[arg(long, default_value_t = 2000.0)]
        track_length: f32,
    },
    /// Print the flat persistence mapping of a vehicle as JSON
    Params {
        #[command(flatten)]
        vehicle: VehicleArgs,
    },
}

#[derive(Args, Debug)]
struct VehicleArgs {
    /// Built-in vehicle (gt86, urus, truck)
    #[arg(long, default_value = "gt86")]
    preset: String,

    /// Vehicle parameters as JSON (overrides --preset)
    #[arg(long)]
    params: Option<PathBuf>,
}

impl VehicleArgs {
    /// (vehicle name, parameters)
    fn load(&self) -> Result<(String, ParameterSet)> {
        match &self.params {
            Some(path) => Ok((vehicle_name(path), load_params_file(path)?)),
            None => {
                let params = ParameterSet::preset(&self.preset).ok_or_else(|| {
                    anyhow!(
                        "unknown preset `{}` (expected one of {:?})",
                        self.preset,
                        ParameterSet::PRESETS
                    )
                })?;
                Ok((self.preset.clone(), params))
            }
        }
    }
}

fn vehicle_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "custom".to_string())
}

fn load_params_file(path: &Path) -> Result<ParameterSet> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let params: ParameterSet =
        serde_json::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
    params.validate()?;
    Ok(params)
}

fn frame_period(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Cmd::Serve { vehicle, addr, fps, track_length } => {
            let (name, params) = vehicle.load()?;
            serve(name, params, addr, fps, track_length).await
        }
        Cmd::Drive { vehicle, seconds, throttle, brake, steer, fps, track_length } => {
            let (name, params) = vehicle.load()?;
            drive(&name, params, seconds, ControlInput::new(throttle, brake, steer), fps, track_length)
        }
        Cmd::Params { vehicle } => {
            let (_, params) = vehicle.load()?;
            println!("{}", serde_json::to_string_pretty(&params.to_flat_map())?);
            Ok(())
        }
    }
}

async fn serve(name: String, params: ParameterSet, addr: String, fps: u32, track_length: f32) -> Result<()> {
    println!("🚀 Starting vehicle simulation server ({name})...");

    let session = Arc::new(Mutex::new(SharedSession::new(name)));

    tokio::spawn({
        let session = Arc::clone(&session);
        async move {
            if let Err(e) = start_websocket_server(addr, session).await {
                eprintln!("❌ WebSocket server: {e:#}");
            }
        }
    });

    let mut sim = SimulationLoop::new();
    sim.start(params.clone())?;
    let mut laps = LapTracker::new(track_length);
    let mut last_tick = 0;

    let mut ticker = interval(frame_period(fps));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let elapsed = now - last;
        last = now;

        let mut s = session.lock().await;

        // 1) Lifecycle commands queued by clients
        for cmd in s.drain_commands() {
            let res = match cmd {
                Command::Start => {
                    let res = sim.start(params.clone());
                    if res.is_ok() {
                        laps = LapTracker::new(track_length);
                        last_tick = 0;
                    }
                    res
                }
                Command::Pause => sim.pause(),
                Command::Resume => sim.resume(),
                Command::Stop => sim.stop(),
            };
            if let Err(e) = res {
                eprintln!("⚠️ {e}");
            }
        }

        // 2) Step physics
        let was_running = sim.state() == LoopState::Running;
        let report = sim.advance(elapsed, s.take_input());
        if report.dropped_time > 0.0 {
            eprintln!("⏱️ Dropped {:.3}s of simulation time", report.dropped_time);
        }

        // 3) Broadcast
        if let Some(snapshot) = sim.snapshot() {
            if snapshot.tick != last_tick {
                last_tick = snapshot.tick;
                if let Some(event) = laps.update(&snapshot) {
                    println!("🏁 Lap {} in {:.2}s", event.lap, event.lap_time);
                    if let Some(json) = ServerMessage::Lap(&event).to_json() {
                        s.broadcast(&json);
                    }
                }
            }
            let msg = ServerMessage::Snapshot { state: snapshot.as_ref(), loop_state: sim.state() };
            if let Some(json) = msg.to_json() {
                s.broadcast(&json);
            }
        }

        if was_running && sim.state() == LoopState::Stopped {
            if let Some(json) = sim.fault().and_then(|f| ServerMessage::Fault(f).to_json()) {
                s.broadcast(&json);
            }
        }
    }
}

fn drive(name: &str, params: ParameterSet, seconds: f64, input: ControlInput, fps: u32, track_length: f32) -> Result<()> {
    println!(
        "🚗 {name}: {:.0} kg, peak torque {:.0} N·m, {} gears",
        params.mass,
        params.torque_curve.peak(),
        params.gear_ratios.len()
    );

    let mut sim = SimulationLoop::new();
    sim.start(params)?;
    let mut laps = LapTracker::new(track_length);

    let frame = frame_period(fps);
    let frames = (seconds * fps.max(1) as f64).ceil() as u64;

    for _ in 0..frames {
        sim.advance(frame, input);
        if sim.state() != LoopState::Running {
            break;
        }
        if let Some(snapshot) = sim.snapshot() {
            if let Some(event) = laps.update(&snapshot) {
                println!("🏁 Lap {} in {:.2}s", event.lap, event.lap_time);
            }
        }
    }

    if let Some(fault) = sim.fault() {
        return Err(anyhow!("simulation faulted: {fault}"));
    }

    let state = sim.snapshot().ok_or_else(|| anyhow!("no snapshot published"))?;
    let (v_long, _) = state.chassis.local_velocity();
    let (wheelbase, track) = sim.params().map_or((1.0, 1.0), |p| (p.wheelbase, p.track_width));
    println!(
        "📊 t={:.2}s  speed={:.1} km/h  gear={}  rpm={:.0}  distance={:.1} m",
        state.time,
        v_long * 3.6,
        state.engine.gear + 1,
        state.engine.rpm,
        state.telemetry.distance
    );
    println!(
        "   pitch={:.2}°  roll={:.2}°  lap {} +{:.2}s  score={:.0}",
        state.pitch(wheelbase).to_degrees(),
        state.roll(track).to_degrees(),
        laps.laps() + 1,
        laps.current_lap_time(),
        laps.score()
    );
    println!(
        "   fuel={:.2} g/s  tire wear={:.2}%",
        state.telemetry.fuel_rate, state.telemetry.tire_wear
    );
    let loads: Vec<String> = WheelId::ALL
        .iter()
        .map(|id| format!("{id}={:.0}N", state.corner(*id).normal_load))
        .collect();
    println!("   loads {}", loads.join("  "));
    println!("{}", serde_json::to_string_pretty(&laps.result(name))?);
    Ok(())
}
