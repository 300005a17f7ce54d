//! App: terminal init, screen flow, key handling, game event drain.

use crate::game::{GameEvent, GameState};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use ratatui::style::Color;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Popup lifetime in ms.
const POPUP_TTL_MS: u32 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Play,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverOption {
    Restart,
    Menu,
}

/// Transient floating label over the board ("+120 H2O", "column full").
#[derive(Debug, Clone)]
pub struct ScorePopup {
    pub col: usize,
    pub text: String,
    pub color: Color,
    pub age_ms: u32,
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    menu_selected: MenuOption,
    quit_selected: QuitOption,
    over_selected: OverOption,
    high_score: u32,
    new_high_score: bool,
    popups: Vec<ScorePopup>,
    /// Cells removed by recent bonds; the fade effect flashes over them.
    bond_fade_cells: Vec<(usize, usize)>,
    bond_fade: Option<Effect>,
    bond_fade_time: Option<Instant>,
    last_frame: Instant,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let state = GameState::new(&config);
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let (_, high_score) = crate::highscores::load_scores();
        Ok(Self {
            args,
            config,
            theme,
            state,
            screen,
            paused: false,
            menu_selected: MenuOption::Play,
            quit_selected: QuitOption::Resume,
            over_selected: OverOption::Restart,
            high_score,
            new_high_score: false,
            popups: Vec::new(),
            bond_fade_cells: Vec::new(),
            bond_fade: None,
            bond_fade_time: None,
            last_frame: Instant::now(),
        })
    }

    fn reset_game(&mut self) {
        self.state = GameState::new(&self.config);
        self.screen = Screen::Playing;
        self.paused = false;
        self.new_high_score = false;
        self.popups.clear();
        self.bond_fade_cells.clear();
        self.bond_fade = None;
        self.bond_fade_time = None;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let delta_ms = now
                .duration_since(self.last_frame)
                .as_millis()
                .min(u32::MAX as u128) as u32;
            self.last_frame = now;
            self.tick_popups(delta_ms);
            if self.bond_fade.as_ref().is_some_and(|e| e.done()) {
                self.bond_fade = None;
                self.bond_fade_cells.clear();
                self.bond_fade_time = None;
            }

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.paused,
                    &self.popups,
                    &self.bond_fade_cells,
                    &mut self.bond_fade,
                    &mut self.bond_fade_time,
                    self.menu_selected,
                    self.quit_selected,
                    self.over_selected,
                    self.high_score,
                    self.new_high_score,
                    self.args.no_animation,
                    now,
                )
            })?;

            // ~30 FPS is plenty for a turn-based board.
            if event::poll(Duration::from_millis(33))? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        let action = key_to_action(key);
                        let exit = match self.screen {
                            Screen::Menu => self.handle_menu_key(action),
                            Screen::Playing => self.handle_playing_key(action),
                            Screen::QuitMenu => self.handle_quit_menu_key(action),
                            Screen::GameOver => self.handle_game_over_key(action, key),
                        };
                        if exit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_menu_key(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return true,
            Action::MoveLeft | Action::MoveRight => {
                self.menu_selected = match self.menu_selected {
                    MenuOption::Play => MenuOption::Quit,
                    MenuOption::Quit => MenuOption::Play,
                };
            }
            Action::Drop => match self.menu_selected {
                MenuOption::Play => self.reset_game(),
                MenuOption::Quit => return true,
            },
            _ => {}
        }
        false
    }

    fn handle_playing_key(&mut self, action: Action) -> bool {
        if self.paused {
            match action {
                Action::Pause => self.paused = false,
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                    self.paused = false;
                }
                _ => {}
            }
            return false;
        }
        match action {
            Action::Pause => self.paused = true,
            Action::Quit => {
                self.screen = Screen::QuitMenu;
                self.quit_selected = QuitOption::Resume;
            }
            Action::MoveLeft => self.state.move_column(-1),
            Action::MoveRight => self.state.move_column(1),
            Action::Drop => self.state.drop_piece(),
            Action::None => {}
        }
        self.drain_game_events();
        false
    }

    fn handle_quit_menu_key(&mut self, action: Action) -> bool {
        match action {
            Action::MoveRight => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::MainMenu,
                    QuitOption::MainMenu => QuitOption::Exit,
                    QuitOption::Exit => QuitOption::Resume,
                };
            }
            Action::MoveLeft => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::Exit,
                    QuitOption::MainMenu => QuitOption::Resume,
                    QuitOption::Exit => QuitOption::MainMenu,
                };
            }
            Action::Drop => match self.quit_selected {
                QuitOption::Resume => self.screen = Screen::Playing,
                QuitOption::MainMenu => self.screen = Screen::Menu,
                QuitOption::Exit => return true,
            },
            Action::Pause | Action::Quit => self.screen = Screen::Playing,
            _ => {}
        }
        false
    }

    fn handle_game_over_key(&mut self, action: Action, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('r') || key.code == KeyCode::Char('R') {
            self.reset_game();
            return false;
        }
        match action {
            Action::Quit => return true,
            Action::MoveLeft | Action::MoveRight => {
                self.over_selected = match self.over_selected {
                    OverOption::Restart => OverOption::Menu,
                    OverOption::Menu => OverOption::Restart,
                };
            }
            Action::Drop => match self.over_selected {
                OverOption::Restart => self.reset_game(),
                OverOption::Menu => self.screen = Screen::Menu,
            },
            _ => {}
        }
        false
    }

    /// Consume the session's queued events: popups, fades, terminal handling.
    fn drain_game_events(&mut self) {
        for event in self.state.take_events() {
            match event {
                GameEvent::PiecePlaced { .. } | GameEvent::GridSettled => {}
                GameEvent::BondFormed {
                    name,
                    score_awarded,
                    removed,
                    ..
                } => {
                    let col = removed.first().map_or(0, |&(c, _)| c);
                    self.popups.push(ScorePopup {
                        col,
                        text: format!("+{score_awarded} {name}"),
                        color: self.theme.title,
                        age_ms: 0,
                    });
                    self.bond_fade_cells.extend(removed);
                    // Rebuilt on next draw to cover the extended cell set.
                    self.bond_fade = None;
                    self.bond_fade_time = None;
                }
                GameEvent::ColumnFull { col } => {
                    self.popups.push(ScorePopup {
                        col,
                        text: "column full".to_string(),
                        color: Color::Red,
                        age_ms: 0,
                    });
                }
                GameEvent::CascadeAborted => {
                    // Core already logged the details; session continues.
                    self.popups.push(ScorePopup {
                        col: 0,
                        text: "resolution aborted".to_string(),
                        color: Color::Red,
                        age_ms: 0,
                    });
                }
                GameEvent::GridFull => self.finish_session(),
            }
        }
    }

    /// Terminal signal: persist last/high score, flip to the game-over screen.
    fn finish_session(&mut self) {
        let final_score = self.state.score;
        self.new_high_score = final_score > self.high_score;
        if self.new_high_score {
            self.high_score = final_score;
        }
        if let Err(err) = crate::highscores::save_scores(final_score, self.high_score) {
            log::warn!("could not save scores: {err}");
        }
        self.over_selected = OverOption::Restart;
        self.screen = Screen::GameOver;
    }

    fn tick_popups(&mut self, delta_ms: u32) {
        self.popups.retain_mut(|p| {
            p.age_ms += delta_ms;
            p.age_ms < POPUP_TTL_MS
        });
    }
}
