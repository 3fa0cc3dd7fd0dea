use std::time::{Duration, Instant};
use tui_automata::audio::{AtomicAudioBands, AudioBandProvider, AudioBands, BandAnalyzer, Silence};
use tui_automata::clock::{FrameBudget, MAX_DT, SimulationClock};
use tui_automata::events::{EventLog, EventSpot, VisualEvent};
use tui_automata::grid::{Grid, GridSizing, LARGE_VIEWPORT_PX};
use tui_automata::palette::{ColorBias, cloud_color, grain_color};
use tui_automata::regions::{VisitedSet, find_regions};

// ── Grid ────────────────────────────────────────────────────────────────────

#[test]
fn grid_wraps_and_bounds_checks() {
    let mut g = Grid::<u8>::new(4, 3);
    g.set(3, 2, 7);
    assert_eq!(*g.get_wrapped(-1, -1), 7);
    assert_eq!(g.wrap(5, -4), (1, 2));
    assert_eq!(g.checked_index(-1, 0), None);
    assert_eq!(g.checked_index(3, 2), Some(11));
    assert_eq!(g.coords(11), (3, 2));
    assert!(g.get(4, 0).is_none());
    g.set(9, 9, 1);
    assert_eq!(g.cells().iter().filter(|&&c| c != 0).count(), 1);
}

#[test]
fn torus_delta_takes_the_short_way_round() {
    assert_eq!(Grid::<u8>::torus_delta(1.0, 9.0, 10), -2.0);
    assert_eq!(Grid::<u8>::torus_delta(9.0, 1.0, 10), 2.0);
    assert_eq!(Grid::<u8>::torus_delta(2.0, 4.0, 10), 2.0);
}

#[test]
fn sizing_switches_at_the_viewport_threshold() {
    let s = GridSizing::new((80, 50), (120, 80));
    assert_eq!(s.dims_for_view(LARGE_VIEWPORT_PX, 600), (80, 50));
    assert_eq!(s.dims_for_view(LARGE_VIEWPORT_PX + 1, 600), (120, 80));
}

// ── Regions ─────────────────────────────────────────────────────────────────

#[test]
fn visited_set_inserts_once() {
    let mut v = VisitedSet::new(130);
    assert!(v.insert(129));
    assert!(!v.insert(129));
    assert!(v.contains(129));
    assert!(!v.insert(500));
    v.clear();
    assert!(!v.contains(129));
}

#[test]
fn flood_fill_finds_diagonal_neighbours() {
    let mut g = Grid::<u8>::new(8, 8);
    for (x, y) in [(1, 1), (2, 2), (3, 3), (6, 1)] {
        g.set(x, y, 1);
    }
    let mut regions = find_regions(&g, false, |&c| c != 0);
    regions.sort_by_key(|r| r.size());

    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].size(), 1);
    let diag = &regions[1];
    assert_eq!(diag.size(), 3);
    assert_eq!((diag.bbox_width(), diag.bbox_height()), (3, 3));
}

#[test]
fn flood_fill_joins_across_the_seam_only_when_wrapping() {
    let mut g = Grid::<u8>::new(6, 4);
    g.set(0, 1, 1);
    g.set(5, 1, 1);
    assert_eq!(find_regions(&g, false, |&c| c != 0).len(), 2);
    let wrapped = find_regions(&g, true, |&c| c != 0);
    assert_eq!(wrapped.len(), 1);
    assert_eq!(wrapped[0].bbox_width(), 6);
}

#[test]
fn flood_fill_handles_a_full_grid_without_recursion() {
    let g = Grid::filled(300, 300, 1u8);
    let regions = find_regions(&g, true, |&c| c != 0);
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].size(), 90_000);
}

// ── Events ──────────────────────────────────────────────────────────────────

#[test]
fn event_log_drops_oldest_at_capacity() {
    let mut log = EventLog::new(2);
    for i in 0..3 {
        log.push(VisualEvent::Topple(EventSpot::new(i as f32, 0.0, 1.0, 1.0)));
    }
    assert_eq!(log.len(), 2);
    assert_eq!(log.entries()[0].spot().x, 1.0);
}

#[test]
fn event_log_keeps_newest_under_sustained_overflow() {
    let mut log = EventLog::new(3);
    for i in 0..500 {
        log.push(VisualEvent::Topple(EventSpot::new(i as f32, 0.0, 1.0, 1.0)));
        assert!(log.len() <= 3);
    }
    let xs: Vec<f32> = log.entries().iter().map(|ev| ev.spot().x).collect();
    assert_eq!(xs, [497.0, 498.0, 499.0]);
}

#[test]
fn event_log_fades_by_ttl() {
    let mut log = EventLog::new(8);
    log.push(VisualEvent::Feeding(EventSpot::new(0.0, 0.0, 0.5, 0.3)));
    log.push(VisualEvent::Predation(EventSpot::new(0.0, 0.0, 2.0, 1.0)));
    assert_eq!(log.entries()[1].spot().intensity, 1.0);

    log.fade(0.5);
    assert_eq!(log.len(), 1);
    assert_eq!(log.entries()[0].label(), "predation");
}

// ── Clock ───────────────────────────────────────────────────────────────────

#[test]
fn clock_clamps_large_gaps_and_pauses() {
    let mut clock = SimulationClock::new();
    let t0 = Instant::now();
    let first = clock.tick(t0);
    assert_eq!(first.dt, 0.0);

    let second = clock.tick(t0 + Duration::from_secs(3));
    assert_eq!(second.dt, MAX_DT);
    assert_eq!(second.frame, 2);

    clock.toggle_pause();
    let paused = clock.tick(t0 + Duration::from_secs(4));
    assert_eq!(paused.dt, 0.0);
    assert_eq!(paused.frame, 2);
    assert_eq!(paused.t, second.t);
}

#[test]
fn frame_budget_raises_and_lowers_stride() {
    let mut budget = FrameBudget::new(true, 3);
    budget.update(60.0, 33.0);
    assert_eq!(budget.stride(), 2);
    for _ in 0..200 {
        budget.update(10.0, 33.0);
    }
    assert_eq!(budget.stride(), 1);

    let mut fixed = FrameBudget::new(false, 3);
    fixed.update(500.0, 33.0);
    assert_eq!(fixed.stride(), 1);
}

// ── Palette ─────────────────────────────────────────────────────────────────

#[test]
fn grain_palette_ignores_bias_on_empty_cells() {
    let bias = ColorBias::from_audio(Some(&AudioBands {
        bass: 1.0,
        overall: 1.0,
        ..AudioBands::default()
    }));
    assert!(bias.amount > 0.0);
    assert_eq!(grain_color(0, &bias), [0, 0, 0]);
    assert_ne!(grain_color(1, &bias), grain_color(1, &ColorBias::NONE));
    assert_eq!(grain_color(7, &ColorBias::NONE), grain_color(4, &ColorBias::NONE));
}

#[test]
fn clouds_are_dark_where_lenia_is_empty() {
    assert_eq!(cloud_color(0.0, 1.0), [0, 0, 0]);
    let faint = cloud_color(0.2, 1.0);
    let dense = cloud_color(0.9, 1.0);
    let sum = |c: [u8; 3]| c.iter().map(|&v| v as u32).sum::<u32>();
    assert!(sum(dense) > sum(faint));
}

// ── Audio ───────────────────────────────────────────────────────────────────

#[test]
fn silence_and_unwritten_bands_report_none() {
    assert_eq!(Silence.bands(), None);
    let shared = AtomicAudioBands::new();
    assert_eq!(shared.bands(), None);
}

#[test]
fn atomic_bands_round_trip_when_fresh() {
    let shared = AtomicAudioBands::new();
    let b = AudioBands {
        bass: 0.5,
        mid: 0.25,
        treble: 0.125,
        overall: 0.3,
        beat_detected: true,
        beat_intensity: 0.7,
    };
    shared.store(b);
    assert_eq!(shared.bands(), Some(b));
}

#[test]
fn gain_scales_and_clamps() {
    let b = AudioBands {
        bass: 0.6,
        mid: 0.2,
        ..AudioBands::default()
    };
    let s = b.scaled(2.0);
    assert_eq!(s.bass, 1.0);
    assert!((s.mid - 0.4).abs() < 1e-6);
    assert_eq!(b.scaled(1.0), b);
}

#[test]
fn analyzer_puts_a_low_tone_in_the_bass_band() {
    let rate = 48_000u32;
    let ring: Vec<f32> = (0..1024)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 100.0 * i as f32 / rate as f32).sin())
        .collect();
    let mut analyzer = BandAnalyzer::new(rate);
    let mut bands = AudioBands::default();
    for _ in 0..30 {
        bands = analyzer.process(&ring, 0);
    }
    assert!(bands.bass > 0.1, "bass {}", bands.bass);
    assert!(bands.bass > bands.treble * 4.0);
    assert!(bands.overall > 0.0);
}

#[test]
fn analyzer_is_quiet_on_silence() {
    let mut analyzer = BandAnalyzer::new(44_100);
    let ring = vec![0.0f32; 1024];
    for _ in 0..5 {
        let b = analyzer.process(&ring, 0);
        assert_eq!(b.bass, 0.0);
        assert!(!b.beat_detected);
    }
}
