use tui_automata::app::build_hud;
use tui_automata::audio::AudioBands;
use tui_automata::clock::FrameTime;
use tui_automata::events::{EventSpot, VisualEvent};
use tui_automata::modes::{CloudsMode, ModeAction, RoadMode, VisualMode, paint_events, paint_scaled};
use tui_automata::render::{AsciiRenderer, Frame, HalfBlockRenderer, Renderer};
use tui_automata::tuning::Tuning;

/// Build a solid-color RGBA pixel buffer.
fn solid_pixels(w: usize, h: usize, r: u8, g: u8, b: u8) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for px in buf.chunks_exact_mut(4) {
        px[0] = r;
        px[1] = g;
        px[2] = b;
        px[3] = 255;
    }
    buf
}

fn gradient_pixels(w: usize, h: usize) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) * 4;
            let t = (x as f32 / w.max(1) as f32 * 255.0) as u8;
            buf[i] = t;
            buf[i + 1] = 128;
            buf[i + 2] = 255 - t;
            buf[i + 3] = 255;
        }
    }
    buf
}

fn make_frame<'a>(
    cols: u16,
    visual_rows: u16,
    pw: usize,
    ph: usize,
    pixels: &'a [u8],
    sync: bool,
) -> Frame<'a> {
    Frame {
        term_cols: cols,
        term_rows: visual_rows + 2,
        visual_rows,
        pixel_width: pw,
        pixel_height: ph,
        pixels_rgba: pixels,
        hud: "Road 80x50 | grains 160",
        hud_rows: 1,
        overlay: None,
        sync_updates: sync,
    }
}

fn lit_pixels(buf: &[u8]) -> usize {
    buf.chunks_exact(4)
        .filter(|px| px[0] != 0 || px[1] != 0 || px[2] != 0)
        .count()
}

// ── ASCII renderer ──────────────────────────────────────────────────────────

#[test]
fn ascii_renders_solid_frame() {
    let pixels = solid_pixels(10, 5, 200, 200, 200);
    let frame = make_frame(10, 5, 10, 5, &pixels, false);
    let mut out = Vec::new();
    AsciiRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("\x1b[H"), "missing home cursor");
    assert!(s.contains("\x1b[?7l"), "missing autowrap-off");
    assert!(s.contains("\x1b[?7h"), "missing autowrap-on");
    assert!(s.contains("38;2;200;200;200"), "missing FG color");
    assert!(s.contains("grains 160"), "HUD text missing");
    assert!(!s.contains("\x1b[?2026h"), "sync disabled but emitted");
}

#[test]
fn ascii_maps_black_to_blank_and_white_to_dense() {
    let mut pixels = solid_pixels(2, 1, 255, 255, 255);
    pixels[..3].fill(0);
    let frame = make_frame(2, 1, 2, 1, &pixels, false);
    let mut out = Vec::new();
    AsciiRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("38;2;0;0;0m "), "blank cell missing: {s:?}");
    assert!(s.contains("38;2;255;255;255m@"), "dense glyph missing: {s:?}");
}

#[test]
fn ascii_skips_zero_size() {
    let pixels = solid_pixels(1, 1, 0, 0, 0);
    let frame = make_frame(0, 0, 0, 0, &pixels, false);
    let mut out = Vec::new();
    AsciiRenderer::new().render(&frame, &mut out).unwrap();
    assert!(out.is_empty(), "expected empty output for zero-size frame");
}

#[test]
fn ascii_reports_short_pixel_buffer() {
    let pixels = solid_pixels(2, 2, 10, 10, 10);
    let frame = make_frame(8, 4, 8, 4, &pixels, true);
    let mut out = Vec::new();
    AsciiRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("pixel buffer too small"));
    assert!(s.ends_with("\x1b[?2026l"), "sync must be closed");
}

#[test]
fn ascii_renders_overlay_popup() {
    let pixels = solid_pixels(40, 20, 50, 50, 50);
    let mut frame = make_frame(40, 20, 40, 20, &pixels, false);
    frame.overlay = Some("Hotkeys\nq quit");
    let mut out = Vec::new();
    AsciiRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("| Hotkeys"), "overlay text missing");
    assert!(s.contains("| q quit"), "overlay second line missing");
}

// ── HalfBlock renderer ─────────────────────────────────────────────────────

#[test]
fn halfblock_renders_gradient_frame() {
    let pixels = gradient_pixels(8, 8);
    let frame = make_frame(8, 4, 8, 8, &pixels, true);
    let mut out = Vec::new();
    HalfBlockRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.starts_with("\x1b[?2026h"), "missing sync-begin");
    assert!(s.ends_with("\x1b[?2026l"), "missing sync-end");
    assert_eq!(s.matches('\u{2580}').count(), 32);
    assert!(s.contains("38;2;"), "missing FG escape");
    assert!(s.contains("48;2;"), "missing BG escape");
}

#[test]
fn halfblock_skips_dimension_mismatch() {
    let pixels = solid_pixels(4, 4, 100, 100, 100);
    let frame = make_frame(4, 4, 4, 4, &pixels, false);
    let mut out = Vec::new();
    HalfBlockRenderer::new().render(&frame, &mut out).unwrap();
    assert!(out.is_empty(), "expected empty output for dimension mismatch");
}

#[test]
fn halfblock_resets_color_cache_each_frame() {
    let mut renderer = HalfBlockRenderer::new();

    let red = solid_pixels(4, 4, 255, 0, 0);
    let mut out1 = Vec::new();
    renderer
        .render(&make_frame(4, 2, 4, 4, &red, false), &mut out1)
        .unwrap();
    assert!(String::from_utf8_lossy(&out1).contains("38;2;255;0;0"));

    let mut out2 = Vec::new();
    renderer
        .render(&make_frame(4, 2, 4, 4, &red, false), &mut out2)
        .unwrap();
    let s2 = String::from_utf8_lossy(&out2);
    assert_eq!(s2.matches("38;2;255;0;0").count(), 1, "colour emitted once per frame");
}

#[test]
fn halfblock_clips_hud_to_width() {
    let pixels = solid_pixels(6, 2, 0, 0, 0);
    let mut frame = make_frame(6, 1, 6, 2, &pixels, false);
    frame.hud = "Clouds gen 12";
    let mut out = Vec::new();
    HalfBlockRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("Clouds"));
    assert!(!s.contains("gen 12"));
}

// ── Mode painting ───────────────────────────────────────────────────────────

#[test]
fn paint_scaled_fills_every_pixel() {
    let mut buf = vec![0u8; 6 * 4 * 4];
    paint_scaled(&mut buf, 6, 4, 3, 2, |gx, gy| [gx as u8 * 10 + 1, gy as u8 * 10 + 1, 7]);
    assert!(buf.chunks_exact(4).all(|px| px[3] == 255 && px[2] == 7));
    // Pixel (5, 3) samples grid cell (2, 1).
    let i = (3 * 6 + 5) * 4;
    assert_eq!(&buf[i..i + 2], &[21, 11]);
}

#[test]
fn paint_scaled_ignores_short_buffers() {
    let mut buf = vec![0u8; 8];
    paint_scaled(&mut buf, 4, 4, 2, 2, |_, _| [255, 255, 255]);
    assert!(buf.iter().all(|&b| b == 0));
}

#[test]
fn events_glow_at_their_grid_position() {
    let mut buf = vec![0u8; 20 * 20 * 4];
    let events = [VisualEvent::Predation(EventSpot::new(5.0, 5.0, 1.0, 1.0))];
    paint_events(&mut buf, 20, 20, 10, 10, &events);
    let at = |x: usize, y: usize| buf[(y * 20 + x) * 4];
    assert!(at(10, 10) > 200, "centre not lit");
    assert!(at(11, 10) > 0 && at(11, 10) < at(10, 10), "arm should be dimmer");
    assert_eq!(at(0, 0), 0);
    assert_eq!(lit_pixels(&buf), 5);
}

#[test]
fn road_mode_paints_the_seeded_pile() {
    let mut mode = RoadMode::new(&Tuning::default(), 11);
    mode.on_resize(640, 400);
    assert_eq!(mode.grid_size(), (80, 50));
    let mut buf = vec![0u8; 80 * 50 * 4];
    mode.paint(&mut buf, 80, 50, 0.0);
    assert!(lit_pixels(&buf) > 0);

    assert!(mode.action(ModeAction::Earthquake));
    assert!(!mode.action(ModeAction::Glider));
    assert!(mode.hud_stats().contains("grains"));
}

#[test]
fn clouds_mode_paints_and_spawns_gliders() {
    let mut mode = CloudsMode::new(&Tuning::default(), 5);
    let mut buf = vec![0u8; 100 * 66 * 4];
    mode.step(None, &FrameTime::fixed(1, 1.0 / 30.0));
    mode.paint(&mut buf, 100, 66, 0.0);
    assert!(lit_pixels(&buf) > 0);

    let before = mode.engine().gliders().len();
    if before < Tuning::default().ecosystem.max_gliders {
        assert!(mode.action(ModeAction::Glider));
        assert_eq!(mode.engine().gliders().len(), before + 1);
    }
    assert!(!mode.action(ModeAction::Earthquake));
}

#[test]
fn hud_lists_mode_audio_and_pause_state() {
    let mode = RoadMode::new(&Tuning::default(), 1);
    let quiet = build_hud(&mode, 29.6, 1.25, 1, 1.0, None, true);
    assert!(quiet.starts_with("Road 80x50"), "{quiet}");
    assert!(quiet.contains("no audio"));
    assert!(quiet.ends_with("paused"));

    let beat = AudioBands {
        bass: 0.5,
        beat_detected: true,
        ..AudioBands::default()
    };
    let loud = build_hud(&mode, 30.0, 2.0, 3, 1.5, Some(&beat), false);
    assert!(loud.contains("b0.50"));
    assert!(loud.contains(" *"));
    assert!(loud.contains("/3"));
    assert!(!loud.contains("paused"));
}
