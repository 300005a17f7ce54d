//! Bondtui — chemistry bond-matching falling-piece puzzle in the terminal.

mod app;
mod elements;
mod game;
mod grid;
mod highscores;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options fixed at session start: board size, enabled element set, RNG seed.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: u16,
    pub height: u16,
    pub elements: usize,
    pub seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        width: args.width.max(2),
        height: args.height.max(2),
        elements: args.elements,
        seed: args.seed,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Chemistry bond-matching puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "bondtui",
    version,
    about = "Chemistry bond-matching falling-piece puzzle in the terminal. Drop element pieces; connected clusters that exactly match a recipe (H2O, NaCl, CO2, NH3) bond and score.",
    long_about = "Bondtui is a terminal puzzle game about building molecules.\n\n\
        Steer each element piece over a column and drop it. When a connected cluster of \
        placed pieces exactly matches a bond recipe — two hydrogens and an oxygen, say — \
        the cluster is removed, the stack settles, and chains can cascade. The session \
        ends when the grid fills up.\n\n\
        CONTROLS (normal):\n  Left/Right  Move    Tab    Cycle column   Enter/Space  Drop\n  P           Pause   Q / Esc    Quit\n\n\
        CONTROLS (vim):\n  h/l         Move    j      Drop           p            Pause   q  Quit\n\n\
        Use --theme to load a btop-style theme and --seed for a reproducible piece sequence."
)]
pub struct Args {
    /// Grid width in columns.
    #[arg(long, default_value = "6", value_name = "COLS")]
    pub width: u16,

    /// Grid height in rows.
    #[arg(long, default_value = "4", value_name = "ROWS")]
    pub height: u16,

    /// Number of enabled element types, first N of H, O, Na, Cl, N, C (2-6).
    #[arg(short, long, default_value = "6", value_name = "N")]
    pub elements: usize,

    /// RNG seed for a reproducible piece sequence.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]="value"). Uses built-in colours if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Skip main menu and start the game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the bond-removal flash animation.
    #[arg(long)]
    pub no_animation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
