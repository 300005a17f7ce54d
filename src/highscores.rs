//! Persist last score and high score to disk (XDG config or ~/.config/bondtui).

use anyhow::Result;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

const FILENAME: &str = "highscores";

/// Returns the path to the score file (config dir / bondtui / highscores).
fn config_path() -> Result<PathBuf> {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if xdg.is_empty() {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".config")
        } else {
            PathBuf::from(xdg)
        }
    } else {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    Ok(base.join("bondtui").join(FILENAME))
}

/// Load scores from disk. Returns (last, high); 0 on missing/parse error.
pub fn load_scores() -> (u32, u32) {
    let path = match config_path() {
        Ok(p) => p,
        Err(_) => return (0, 0),
    };
    let content = match fs::read(path) {
        Ok(c) => c,
        Err(_) => return (0, 0),
    };
    let mut last = 0u32;
    let mut high = 0u32;
    for (i, line) in BufReader::new(&content[..]).lines().take(2).enumerate() {
        let n = line
            .ok()
            .as_ref()
            .and_then(|l| l.trim().parse::<u32>().ok())
            .unwrap_or(0);
        match i {
            0 => last = n,
            1 => high = n,
            _ => {}
        }
    }
    (last, high)
}

/// Save scores to disk. Creates config directory if needed.
pub fn save_scores(last: u32, high: u32) -> Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = fs::File::create(path)?;
    writeln!(f, "{}", last)?;
    writeln!(f, "{}", high)?;
    Ok(())
}
