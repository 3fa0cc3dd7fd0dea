use clap::Parser;
use crossterm::event::{KeyCode, KeyModifiers};
use tui_automata::app::{Command, command_for_key};
use tui_automata::config::{AudioSource, Config, ModeKind, RendererMode};
use tui_automata::modes::ModeAction;
use tui_automata::tuning::{Tuning, TuningError};

#[test]
fn tuning_overrides_only_named_keys() {
    let text = r#"
        # sandpile
        sandpile.max_waves = 4
        sandpile.initial_grains=500

        lenia.mu = 0.2
        ecosystem.max_gliders = 8
    "#;

    let tuning = Tuning::parse(text).expect("tuning parse should succeed");
    let defaults = Tuning::default();
    assert_eq!(tuning.sandpile.max_waves, 4);
    assert_eq!(tuning.sandpile.initial_grains, 500);
    assert_eq!(tuning.ecosystem.mu, 0.2);
    assert_eq!(tuning.ecosystem.max_gliders, 8);
    assert_eq!(tuning.ecosystem.sigma, defaults.ecosystem.sigma);
    assert_eq!(
        tuning.sandpile.max_topples_per_wave,
        defaults.sandpile.max_topples_per_wave
    );
}

#[test]
fn empty_tuning_is_the_default() {
    assert_eq!(Tuning::parse("").expect("empty text parses"), Tuning::default());
    assert_eq!(Tuning::load(None).expect("no file"), Tuning::default());
}

#[test]
fn tuning_reports_unknown_keys_with_line() {
    let err = Tuning::parse("lenia.mu=0.1\nlenia.bogus=3\n").expect_err("unknown key must fail");
    match err {
        TuningError::Parse { line, message } => {
            assert_eq!(line, 2);
            assert!(message.contains("lenia.bogus"), "{message}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn tuning_rejects_malformed_lines_and_values() {
    let err = Tuning::parse("sandpile.max_waves 4").expect_err("missing '=' must fail");
    assert!(matches!(err, TuningError::Parse { line: 1, .. }));

    let err = Tuning::parse("\n\nsandpile.max_waves=lots").expect_err("bad number must fail");
    assert!(matches!(err, TuningError::Parse { line: 3, ref message } if message.contains("lots")));
}

#[test]
fn tuning_validates_ranges() {
    for text in [
        "sandpile.max_waves=0",
        "sandpile.quake_radius_min=30",
        "lenia.kernel_radius=0",
        "lenia.sigma=0",
        "ecosystem.feeding_rate=1.5",
        "ecosystem.predation_factor=-0.1",
    ] {
        let err = Tuning::parse(text).expect_err(text);
        assert!(matches!(err, TuningError::Parse { line: 0, .. }), "{text}: {err}");
    }
}

#[test]
fn missing_tuning_file_is_an_io_error() {
    let path = std::env::temp_dir().join("tui_automata_no_such_tuning_file.txt");
    let err = Tuning::load(Some(path.as_path())).expect_err("missing file must fail");
    assert!(matches!(err, TuningError::Io(_)));
}

#[test]
fn cli_defaults() {
    let cfg = Config::try_parse_from(["tui-automata"]).expect("defaults parse");
    assert_eq!(cfg.mode, ModeKind::Road);
    assert_eq!(cfg.source, AudioSource::Mic);
    assert_eq!(cfg.renderer, RendererMode::HalfBlock);
    assert_eq!(cfg.fps, 30);
    assert!(cfg.adaptive);
    assert!(cfg.sync_updates);
    assert!(cfg.seed.is_none());
    assert!(!cfg.list_devices);
}

#[test]
fn cli_accepts_aliases() {
    let cfg = Config::try_parse_from([
        "tui-automata",
        "--mode",
        "lenia",
        "--source",
        "off",
        "--renderer",
        "ascii",
        "--seed",
        "42",
        "--adaptive",
        "false",
    ])
    .expect("aliases parse");
    assert_eq!(cfg.mode, ModeKind::Clouds);
    assert_eq!(cfg.source, AudioSource::None);
    assert_eq!(cfg.renderer, RendererMode::Ascii);
    assert_eq!(cfg.seed, Some(42));
    assert!(!cfg.adaptive);

    assert!(Config::try_parse_from(["tui-automata", "--mode", "plasma"]).is_err());
}

#[test]
fn modes_cycle() {
    assert_eq!(ModeKind::Road.next(), ModeKind::Clouds);
    assert_eq!(ModeKind::Clouds.next().next(), ModeKind::Clouds);
}

#[test]
fn hotkeys_map_to_commands() {
    let none = KeyModifiers::NONE;
    assert_eq!(
        command_for_key(KeyCode::Char('c'), KeyModifiers::CONTROL),
        Some(Command::Quit)
    );
    assert_eq!(command_for_key(KeyCode::Esc, none), Some(Command::Quit));
    assert_eq!(command_for_key(KeyCode::Tab, none), Some(Command::NextMode));
    assert_eq!(
        command_for_key(KeyCode::Char('2'), none),
        Some(Command::SelectMode(ModeKind::Clouds))
    );
    assert_eq!(
        command_for_key(KeyCode::Char('g'), none),
        Some(Command::Action(ModeAction::Glider))
    );
    assert_eq!(
        command_for_key(KeyCode::Char('e'), none),
        Some(Command::Action(ModeAction::Earthquake))
    );
    assert_eq!(command_for_key(KeyCode::Char(' '), none), Some(Command::TogglePause));
    assert!(matches!(
        command_for_key(KeyCode::Char('+'), none),
        Some(Command::Intensity(f)) if f > 1.0
    ));
    assert_eq!(command_for_key(KeyCode::Char('z'), none), None);
}
