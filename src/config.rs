use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tui-automata",
    version,
    about = "Audio-reactive sandpile and Life/Lenia ecosystem for the terminal"
)]
pub struct Config {
    #[arg(long, value_enum, default_value_t = ModeKind::Road)]
    pub mode: ModeKind,

    #[arg(long, value_enum, default_value_t = AudioSource::Mic)]
    pub source: AudioSource,

    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Seed for every engine RNG; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// `key=value` file overriding engine constants.
    #[arg(long)]
    pub tuning: Option<PathBuf>,

    /// Run Lenia on fewer frames when frames run over budget.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub adaptive: bool,

    /// Write tracing output here (filtered by RUST_LOG).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeKind {
    #[value(alias = "sandpile")]
    Road,
    #[value(alias = "lenia", alias = "ecosystem")]
    Clouds,
}

impl ModeKind {
    pub fn next(self) -> Self {
        match self {
            Self::Road => Self::Clouds,
            Self::Clouds => Self::Road,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudioSource {
    Mic,
    #[value(alias = "off", alias = "silence")]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
}

impl RendererMode {
    /// Pixels per terminal cell, `(x, y)`.
    pub fn pixels_per_cell(self) -> (usize, usize) {
        match self {
            Self::HalfBlock => (1, 2),
            Self::Ascii => (1, 1),
        }
    }
}
