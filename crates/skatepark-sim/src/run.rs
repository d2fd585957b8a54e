//! Scenario runner and report formatting.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use skatepark::premade::{build_track_set, PremadeShape, TrackSetConfig};
use skatepark::{PhysicsConfig, Simulation, Skater, Transition, Vector2};
use tracing::{debug, info};

/// Fraction of the way along the track the skater is dropped by default.
const DEFAULT_DROP_FRACTION: f64 = 0.1;

/// What to simulate.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Track to build.
    pub shape: PremadeShape,
    /// Simulated seconds.
    pub duration: f64,
    /// Frames per second.
    pub fps: u32,
    /// Emit a sample every this many frames.
    pub sample_every: usize,
    /// Where to drop the skater; near the start of the track if `None`.
    pub drop_point: Option<Vector2>,
}

/// The skater at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub on_track: bool,
    pub kinetic: f64,
    pub potential: f64,
    pub thermal: f64,
    pub total: f64,
}

impl Sample {
    fn of(time: f64, skater: &Skater) -> Self {
        Self {
            time,
            x: skater.position().x,
            y: skater.position().y,
            speed: skater.speed(),
            on_track: skater.track().is_some(),
            kinetic: skater.kinetic_energy(),
            potential: skater.potential_energy(),
            thermal: skater.thermal_energy(),
            total: skater.total_energy(),
        }
    }
}

/// Totals over the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub track: &'static str,
    pub frames: usize,
    pub substeps: usize,
    pub energy_corrections: usize,
    pub max_drift: f64,
    pub landings: usize,
    pub departures: usize,
    pub ground_strikes: usize,
    pub initial_energy: f64,
    pub final_energy: f64,
}

/// Samples and summary of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub samples: Vec<Sample>,
    pub summary: Summary,
}

/// Builds the track, drops the skater and runs the clock.
///
/// # Errors
///
/// Fails if the configuration does not validate or the scenario is empty.
pub fn run(config: PhysicsConfig, scenario: &Scenario) -> Result<Report> {
    anyhow::ensure!(scenario.fps > 0, "fps must be positive");
    anyhow::ensure!(
        scenario.duration.is_finite() && scenario.duration >= 0.0,
        "duration must be a non-negative number of seconds"
    );

    let (tracks, ids) = build_track_set(&TrackSetConfig::fixed(&[scenario.shape]))
        .context("failed to build the track")?;
    let drop_point = match (scenario.drop_point, tracks.get(ids[0])) {
        (Some(p), _) => p,
        (None, Some(track)) => {
            track.point_at(track.min_u() + DEFAULT_DROP_FRACTION * (track.max_u() - track.min_u()))
        }
        (None, None) => anyhow::bail!("track was not built"),
    };

    let mut sim = Simulation::with_tracks(config, tracks).context("invalid physics configuration")?;
    sim.drag_start(drop_point);
    sim.drag_end();
    info!(
        track = scenario.shape.name(),
        x = drop_point.x,
        y = drop_point.y,
        on_track = sim.skater().track().is_some(),
        "skater dropped"
    );

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = (scenario.duration * f64::from(scenario.fps)).round() as usize;
    let dt = 1.0 / f64::from(scenario.fps);
    let every = scenario.sample_every.max(1);

    let mut summary = Summary {
        track: scenario.shape.name(),
        frames,
        initial_energy: sim.skater().total_energy(),
        ..Summary::default()
    };
    let mut samples = vec![Sample::of(0.0, sim.skater())];

    for frame in 1..=frames {
        if let Some(stats) = sim.tick(dt) {
            summary.substeps += stats.substeps;
            summary.energy_corrections += stats.energy_corrections;
            summary.max_drift = summary.max_drift.max(stats.max_drift);
            for transition in &stats.transitions {
                debug!(frame, ?transition, "transition");
                match transition {
                    Transition::Landed(_) => summary.landings += 1,
                    Transition::LeftTrack(_) | Transition::FlewOffEnd(_) | Transition::TrackVanished(_) => {
                        summary.departures += 1;
                    }
                    Transition::StruckGround => summary.ground_strikes += 1,
                }
            }
        }
        if frame % every == 0 || frame == frames {
            samples.push(Sample::of(frame as f64 * dt, sim.skater()));
        }
    }

    summary.final_energy = sim.skater().total_energy();
    info!(
        frames,
        drift = summary.final_energy - summary.initial_energy,
        corrections = summary.energy_corrections,
        "run finished"
    );
    Ok(Report { samples, summary })
}

/// Writes the report as aligned columns followed by a summary block.
///
/// # Errors
///
/// Propagates write errors.
pub fn write_text(report: &Report, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "{:>7} {:>8} {:>8} {:>8} {:>5} {:>10} {:>10} {:>10} {:>10}",
        "t", "x", "y", "speed", "track", "kinetic", "potential", "thermal", "total"
    )?;
    for s in &report.samples {
        writeln!(
            out,
            "{:>7.3} {:>8.3} {:>8.3} {:>8.3} {:>5} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
            s.time,
            s.x,
            s.y,
            s.speed,
            if s.on_track { "yes" } else { "no" },
            s.kinetic,
            s.potential,
            s.thermal,
            s.total
        )?;
    }

    let summary = &report.summary;
    writeln!(out)?;
    writeln!(out, "track:              {}", summary.track)?;
    writeln!(out, "frames:             {}", summary.frames)?;
    writeln!(out, "substeps:           {}", summary.substeps)?;
    writeln!(out, "landings:           {}", summary.landings)?;
    writeln!(out, "departures:         {}", summary.departures)?;
    writeln!(out, "ground strikes:     {}", summary.ground_strikes)?;
    writeln!(out, "energy corrections: {}", summary.energy_corrections)?;
    writeln!(out, "max drift (J):      {:.3e}", summary.max_drift)?;
    writeln!(
        out,
        "energy (J):         {:.6} -> {:.6}",
        summary.initial_energy, summary.final_energy
    )?;
    Ok(())
}

/// Writes one JSON object per sample, then the summary under a `summary` key.
///
/// # Errors
///
/// Propagates serialization and write errors.
pub fn write_json(report: &Report, out: &mut impl Write) -> Result<()> {
    for sample in &report.samples {
        serde_json::to_writer(&mut *out, sample)?;
        writeln!(out)?;
    }
    serde_json::to_writer(&mut *out, &serde_json::json!({ "summary": report.summary }))?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(shape: PremadeShape, duration: f64) -> Scenario {
        Scenario {
            shape,
            duration,
            fps: 60,
            sample_every: 6,
            drop_point: None,
        }
    }

    #[test]
    fn test_default_drop_lands_on_the_track() {
        let report = run(PhysicsConfig::default(), &scenario(PremadeShape::Parabola, 1.0)).unwrap();
        assert!(report.samples[0].on_track);
        assert_eq!(report.summary.frames, 60);
        assert_eq!(report.summary.substeps, 240);
        // frame 0, then every sixth frame
        assert_eq!(report.samples.len(), 11);
        assert!((report.summary.final_energy - report.summary.initial_energy).abs() < 1e-6);
    }

    #[test]
    fn test_drop_onto_the_ground() {
        let mut s = scenario(PremadeShape::Slope, 2.0);
        s.drop_point = Some(Vector2::new(8.0, 2.0));
        let report = run(PhysicsConfig::default(), &s).unwrap();
        assert_eq!(report.summary.ground_strikes, 1);
        let last = report.samples.last().unwrap();
        assert_eq!(last.y, 0.0);
        assert!((last.thermal - 60.0 * 9.8 * 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_zero_fps() {
        let mut s = scenario(PremadeShape::Parabola, 1.0);
        s.fps = 0;
        assert!(run(PhysicsConfig::default(), &s).is_err());
    }

    #[test]
    fn test_json_lines() {
        let report = run(PhysicsConfig::default(), &scenario(PremadeShape::Loop, 0.2)).unwrap();
        let mut out = Vec::new();
        write_json(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), report.samples.len() + 1);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["time"], 0.0);
        let last: serde_json::Value = serde_json::from_str(lines[lines.len() - 1]).unwrap();
        assert_eq!(last["summary"]["track"], "loop");
    }

    #[test]
    fn test_text_report() {
        let report = run(PhysicsConfig::default(), &scenario(PremadeShape::DoubleWell, 0.5)).unwrap();
        let mut out = Vec::new();
        write_text(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("      t"));
        assert!(text.contains("track:              double-well"));
    }
}
