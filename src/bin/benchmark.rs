use std::time::Instant;

use anyhow::Result;
use tui_automata::audio::AudioBands;
use tui_automata::clock::FrameTime;
use tui_automata::config::ModeKind;
use tui_automata::modes::{VisualMode, make_mode};
use tui_automata::tuning::Tuning;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Which {
    Road,
    Clouds,
    Both,
}

struct Args {
    which: Which,
    frames: usize,
    view_w: usize,
    view_h: usize,
    paint_w: usize,
    paint_h: usize,
    seed: u64,
    lenia_stride: u32,
    silent: bool,
    ci_smoke: bool,
    max_ms: f64,
}

fn parse_args() -> Args {
    let mut args = Args {
        which: Which::Both,
        frames: 240,
        view_w: 640,
        view_h: 400,
        paint_w: 160,
        paint_h: 88,
        seed: 7,
        lenia_stride: 1,
        silent: false,
        ci_smoke: false,
        max_ms: 33.0,
    };

    let argv = std::env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0usize;
    while i < argv.len() {
        let k = argv[i].as_str();
        let v = argv.get(i + 1).map(|s| s.as_str());
        match (k, v) {
            ("--mode", Some("road")) => {
                args.which = Which::Road;
                i += 2;
            }
            ("--mode", Some("clouds")) => {
                args.which = Which::Clouds;
                i += 2;
            }
            ("--mode", Some("both")) => {
                args.which = Which::Both;
                i += 2;
            }
            ("--frames", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.frames = n.max(1);
                }
                i += 2;
            }
            ("--large", _) => {
                args.view_w = 1280;
                args.view_h = 800;
                i += 1;
            }
            ("--seed", Some(x)) => {
                if let Ok(n) = x.parse::<u64>() {
                    args.seed = n;
                }
                i += 2;
            }
            ("--stride", Some(x)) => {
                if let Ok(n) = x.parse::<u32>() {
                    args.lenia_stride = n.max(1);
                }
                i += 2;
            }
            ("--silent", _) => {
                args.silent = true;
                i += 1;
            }
            ("--ci-smoke", _) => {
                args.ci_smoke = true;
                i += 1;
            }
            ("--max-ms", Some(x)) => {
                if let Ok(n) = x.parse::<f64>() {
                    args.max_ms = n.max(0.1);
                }
                args.ci_smoke = true;
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }
    args
}

/// Slow sine sweeps per band with a beat every 12 frames and a harder one every 24.
fn synth_audio(t: f32, step: usize) -> AudioBands {
    let bass = ((t * 1.9).sin() * 0.5 + 0.5).powf(1.15);
    let mid = ((t * 2.8 + 0.7).sin() * 0.5 + 0.5).powf(1.08);
    let treble = ((t * 5.2 + 1.3).sin() * 0.5 + 0.5).powf(1.02);
    let hard_hit = step % 24 == 0;
    let soft_hit = step % 12 == 0;

    AudioBands {
        bass,
        mid,
        treble,
        overall: (bass * 0.5 + mid * 0.3 + treble * 0.2).clamp(0.0, 1.0),
        beat_detected: hard_hit || soft_hit,
        beat_intensity: if hard_hit {
            0.95
        } else if soft_hit {
            0.55
        } else {
            0.0
        },
    }
}

fn p95(samples: &mut [f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.sort_by(|a, b| a.total_cmp(b));
    let idx = ((samples.len() as f64 * 0.95).ceil() as usize).clamp(1, samples.len()) - 1;
    samples[idx]
}

fn bench_mode(kind: ModeKind, args: &Args, tuning: &Tuning) -> (f64, f64) {
    let mut mode = make_mode(kind, tuning, args.seed);
    mode.on_resize(args.view_w, args.view_h);
    mode.set_lenia_stride(args.lenia_stride);
    let mut pixels = vec![0u8; args.paint_w * args.paint_h * 4];
    let mut step_ms = Vec::with_capacity(args.frames);
    let mut lit = 0usize;

    let start = Instant::now();
    for f in 0..args.frames {
        let time = FrameTime::fixed(f as u64, 1.0 / 30.0);
        let audio = (!args.silent).then(|| synth_audio(time.t, f));

        let t0 = Instant::now();
        mode.step(audio.as_ref(), &time);
        mode.paint(&mut pixels, args.paint_w, args.paint_h, time.t);
        step_ms.push(t0.elapsed().as_secs_f64() * 1000.0);

        if pixels.chunks_exact(4).any(|px| px[0] != 0 || px[1] != 0 || px[2] != 0) {
            lit += 1;
        }
    }
    let elapsed = start.elapsed();
    let avg = elapsed.as_secs_f64() * 1000.0 / args.frames as f64;
    let p95 = p95(&mut step_ms);
    let (gw, gh) = mode.grid_size();
    println!(
        "{:<7} grid={}x{} {:>8.3} ms/frame avg  p95 {:>8.3}  lit={}/{}  {}",
        mode.name(),
        gw,
        gh,
        avg,
        p95,
        lit,
        args.frames,
        mode.hud_stats()
    );
    (avg, p95)
}

fn main() -> Result<()> {
    let args = parse_args();
    let tuning = Tuning::default();
    println!(
        "benchmark: frames={} view={}x{} paint={}x{} seed={} stride={} audio={}",
        args.frames,
        args.view_w,
        args.view_h,
        args.paint_w,
        args.paint_h,
        args.seed,
        args.lenia_stride,
        if args.silent { "none" } else { "synthetic" }
    );

    let kinds: &[ModeKind] = match args.which {
        Which::Road => &[ModeKind::Road],
        Which::Clouds => &[ModeKind::Clouds],
        Which::Both => &[ModeKind::Road, ModeKind::Clouds],
    };

    let mut slow = Vec::new();
    for &kind in kinds {
        let (avg, p95) = bench_mode(kind, &args, &tuning);
        if args.ci_smoke && avg > args.max_ms {
            slow.push((kind, avg, p95));
        }
    }

    if args.ci_smoke {
        if !slow.is_empty() {
            eprintln!("CI smoke: FAIL");
            for (kind, avg, p95) in slow {
                eprintln!(
                    "  slow mode: {:?} ({:.3} ms/frame avg, p95 {:.3} > {:.3})",
                    kind, avg, p95, args.max_ms
                );
            }
            anyhow::bail!("ci smoke failed");
        }
        println!("CI smoke: PASS (max_ms={:.3})", args.max_ms);
    }
    Ok(())
}
