use crate::audio::{AudioBandProvider, AudioBands, AudioSystem, Silence};
use crate::clock::{FrameBudget, SimulationClock};
use crate::config::{AudioSource, Config, ModeKind};
use crate::modes::{ModeAction, VisualMode, make_mode};
use crate::render::{Frame, make_renderer};
use crate::terminal::TerminalGuard;
use crate::tuning::Tuning;
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::BufWriter;
use std::time::{Duration, Instant};
use tracing::info;

/// Terminal cells are treated as 8×16 px when choosing the engine grid size.
pub const CELL_PX: (usize, usize) = (8, 16);

/// Upper bound for the Lenia stride chosen by the frame budget.
const MAX_LENIA_STRIDE: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Quit,
    NextMode,
    SelectMode(ModeKind),
    Reseed,
    Action(ModeAction),
    TogglePause,
    ToggleHud,
    ToggleHelp,
    /// Multiplies the audio gain.
    Intensity(f32),
}

pub fn command_for_key(code: KeyCode, mods: KeyModifiers) -> Option<Command> {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return Some(Command::Quit);
    }
    let cmd = match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Command::Quit,
        KeyCode::Tab | KeyCode::Char('m') | KeyCode::Char('M') => Command::NextMode,
        KeyCode::Char('1') => Command::SelectMode(ModeKind::Road),
        KeyCode::Char('2') => Command::SelectMode(ModeKind::Clouds),
        KeyCode::Char('r') | KeyCode::Char('R') => Command::Reseed,
        KeyCode::Char('g') | KeyCode::Char('G') => Command::Action(ModeAction::Glider),
        KeyCode::Char('e') | KeyCode::Char('E') => Command::Action(ModeAction::Earthquake),
        KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::Char(' ') => Command::TogglePause,
        KeyCode::Char('h') | KeyCode::Char('H') => Command::ToggleHud,
        KeyCode::Char('?') | KeyCode::F(1) => Command::ToggleHelp,
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => Command::Intensity(1.1),
        KeyCode::Char('-') | KeyCode::Char('_') | KeyCode::Down => Command::Intensity(1.0 / 1.1),
        _ => return None,
    };
    Some(cmd)
}

/// Engine viewport in pixels for a terminal of `cols × rows`.
pub fn view_px(cols: u16, rows: u16) -> (usize, usize) {
    (cols as usize * CELL_PX.0, rows as usize * CELL_PX.1)
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let tuning = Tuning::load(cfg.tuning.as_deref())
        .with_context(|| format!("load tuning file {:?}", cfg.tuning))?;
    let seed = cfg.seed.unwrap_or_else(|| fastrand::u64(..));

    let provider: Box<dyn AudioBandProvider> = match cfg.source {
        AudioSource::Mic => Box::new(
            AudioSystem::new(cfg.device.as_deref())
                .with_context(|| format!("start audio (device={:?})", cfg.device))?,
        ),
        AudioSource::None => Box::new(Silence),
    };

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());
    let mut renderer = make_renderer(cfg.renderer);
    let (px_w_mul, px_h_mul) = cfg.renderer.pixels_per_cell();

    let mut last_size = TerminalGuard::size()?;
    if last_size.0 < 4 || last_size.1 < 2 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            last_size.0,
            last_size.1
        ));
    }

    let mut kind = cfg.mode;
    let mut mode = make_mode(kind, &tuning, seed);
    let (vw, vh) = view_px(last_size.0, last_size.1);
    mode.on_resize(vw, vh);
    info!(mode = mode.name(), seed, "started");

    let mut show_hud = true;
    let mut show_help = false;
    let mut intensity = 1.0f32;
    let mut clock = SimulationClock::new();
    let mut budget = FrameBudget::new(cfg.adaptive, MAX_LENIA_STRIDE);
    let mut fps = FpsCounter::new();
    let mut pixels: Vec<u8> = Vec::new();
    let target_ms = 1000.0 / cfg.fps.max(1) as f32;

    loop {
        let now = Instant::now();

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    let Some(cmd) = command_for_key(k.code, k.modifiers) else {
                        continue;
                    };
                    match cmd {
                        Command::Quit => return Ok(()),
                        Command::NextMode | Command::SelectMode(_) => {
                            let next = match cmd {
                                Command::SelectMode(k) => k,
                                _ => kind.next(),
                            };
                            if next != kind {
                                kind = next;
                                mode = make_mode(kind, &tuning, seed);
                                let (vw, vh) = view_px(last_size.0, last_size.1);
                                mode.on_resize(vw, vh);
                                info!(mode = mode.name(), "mode switched");
                            }
                        }
                        Command::Reseed => {
                            mode.reseed();
                            info!(mode = mode.name(), "reseeded");
                        }
                        Command::Action(a) => {
                            mode.action(a);
                        }
                        Command::TogglePause => clock.toggle_pause(),
                        Command::ToggleHud => show_hud = !show_hud,
                        Command::ToggleHelp => show_help = !show_help,
                        Command::Intensity(f) => intensity = (intensity * f).clamp(0.1, 4.0),
                    }
                }
                Event::Resize(c, r) => {
                    last_size = (c, r);
                    let (vw, vh) = view_px(c, r);
                    mode.on_resize(vw, vh);
                }
                _ => {}
            }
        }

        // Resize events can be missed by some terminals.
        let sz = TerminalGuard::size()?;
        if sz != last_size {
            last_size = sz;
            let (vw, vh) = view_px(sz.0, sz.1);
            mode.on_resize(vw, vh);
        }

        let time = clock.tick(now);
        let audio: Option<AudioBands> = provider.bands().map(|b| b.scaled(intensity));

        let step_start = Instant::now();
        mode.set_lenia_stride(budget.stride());
        if !clock.paused() {
            mode.step(audio.as_ref(), &time);
        }
        let step_ms = step_start.elapsed().as_secs_f32() * 1000.0;

        let (term_cols, term_rows) = last_size;
        let hud_rows: u16 = if show_hud && term_rows > 2 { 1 } else { 0 };
        let visual_rows = term_rows.saturating_sub(hud_rows).max(1);
        let w = term_cols as usize * px_w_mul;
        let h = visual_rows as usize * px_h_mul;
        pixels.resize(w * h * 4, 0);
        mode.paint(&mut pixels, w, h, time.t);

        let hud = if show_hud {
            build_hud(
                &*mode,
                fps.fps(),
                step_ms,
                budget.stride(),
                intensity,
                audio.as_ref(),
                clock.paused(),
            )
        } else {
            String::new()
        };
        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows,
            pixel_width: w,
            pixel_height: h,
            pixels_rgba: &pixels,
            hud: &hud,
            hud_rows,
            overlay: show_help.then_some(help_popup_text()),
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, &mut out)?;

        let total_ms = now.elapsed().as_secs_f32() * 1000.0;
        fps.tick();
        budget.update(total_ms, target_ms);

        let target = Duration::from_secs_f32(target_ms / 1000.0);
        let elapsed = now.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

pub fn build_hud(
    mode: &dyn VisualMode,
    fps: f32,
    step_ms: f32,
    stride: u32,
    intensity: f32,
    audio: Option<&AudioBands>,
    paused: bool,
) -> String {
    let (gw, gh) = mode.grid_size();
    let audio_label = match audio {
        Some(a) => format!(
            "b{:.2} m{:.2} t{:.2}{}",
            a.bass,
            a.mid,
            a.treble,
            if a.beat_detected { " *" } else { "" }
        ),
        None => "no audio".to_string(),
    };
    format!(
        "{} {}x{} | {:.0} fps {:.1} ms{} | {} | gain {:.2} {}{}",
        mode.name(),
        gw,
        gh,
        fps,
        step_ms,
        if stride > 1 { format!(" /{stride}") } else { String::new() },
        mode.hud_stats(),
        intensity,
        audio_label,
        if paused { " | paused" } else { "" },
    )
}

fn help_popup_text() -> &'static str {
    "Hotkeys\n\
tab or m  switch mode\n\
1 / 2  road / clouds\n\
r  reseed\n\
g  spawn glider (clouds)\n\
e  earthquake (road)\n\
p or space  pause\n\
+ / -  audio gain\n\
h  show/hide HUD\n\
? or F1  toggle this help\n\
q or esc  quit"
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = self.frames as f32 / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
