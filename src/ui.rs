//! Layout and drawing: menu, board, guide row, sidebar, game over, bond fade.

use crate::app::{MenuOption, OverOption, QuitOption, Screen, ScorePopup};
use crate::elements::{BondRecipe, ElementKind};
use crate::game::GameState;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Board cell size in terminal cells: atomic number, symbol, padding.
const CELL_W: u16 = 7;
const CELL_H: u16 = 3;

const SIDEBAR_WIDTH: u16 = 26;

/// Duration of the bond-removal flash (TachyonFX).
const BOND_FADE_MS: u32 = 400;

/// Playfield size in terminal cells (border + guide row + separator + board).
fn playfield_pixel_size(width: u16, height: u16) -> (u16, u16) {
    (width * CELL_W + 2, (height + 1) * CELL_H + 3)
}

/// Stacked sidebar block heights: score, next, recipes, legend, keys.
fn sidebar_height(state: &GameState) -> u16 {
    4 + (CELL_H + 2)
        + (state.recipes.len() as u16 + 2)
        + (state.spawner.enabled().len() as u16 + 2)
        + 4
}

/// Split the centred game area into playfield and sidebar rects. The sidebar
/// is usually taller than the board, so the column height follows it and the
/// playfield is clamped to its own size.
fn game_areas(area: Rect, state: &GameState) -> (Rect, Rect) {
    let (pw, ph) = playfield_pixel_size(state.grid.width as u16, state.grid.height as u16);
    let total_w = pw + SIDEBAR_WIDTH;
    let total_h = ph.max(sidebar_height(state));

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let playfield = Rect {
        height: ph.min(inner[0].height),
        ..inner[0]
    };
    (playfield, inner[1])
}

/// Board-only rect (grid cells, no border/guide); matches draw_playfield.
fn board_rect(area: Rect, state: &GameState) -> Rect {
    let (pf, _) = game_areas(area, state);
    Rect {
        x: pf.x + 1,
        y: pf.y + 1 + CELL_H + 1,
        width: (state.grid.width as u16 * CELL_W).min(pf.width.saturating_sub(2)),
        height: (state.grid.height as u16 * CELL_H)
            .min(pf.height.saturating_sub(CELL_H + 3)),
    }
}

/// Build set of buffer (x, y) positions covered by the removed cells.
fn fade_buffer_positions(board: Rect, cells: &[(usize, usize)]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &(col, row) in cells {
        let x0 = board.x + (col as u16) * CELL_W;
        let y0 = board.y + (row as u16) * CELL_H;
        for bx in x0..(x0 + CELL_W).min(board.x + board.width) {
            for by in y0..(y0 + CELL_H).min(board.y + board.height) {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Create or update the bond-removal flash and process it (TachyonFX: white
/// flash fading into the settled board over ~400 ms). Purely cosmetic; the
/// grid has already resolved by the time this runs.
fn apply_bond_fade(
    frame: &mut Frame,
    state: &GameState,
    area: Rect,
    cells: &[(usize, usize)],
    bond_fade: &mut Option<Effect>,
    bond_fade_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area, state);
    let delta = bond_fade_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *bond_fade_time = Some(now);

    if bond_fade.is_none() {
        let fade_set = fade_buffer_positions(board, cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            fade_set.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            Color::White,
            Color::White,
            (BOND_FADE_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(board);
        *bond_fade = Some(effect);
    }

    if let Some(effect) = bond_fade {
        frame.render_effect(effect, board, tfx_delta);
    }
}

/// Draw current screen (menu, game, game over), with optional pause overlay.
/// When bond cells were just removed and animation is on, applies the
/// TachyonFX flash and updates `bond_fade` / `bond_fade_time`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    popups: &[ScorePopup],
    bond_fade_cells: &[(usize, usize)],
    bond_fade: &mut Option<Effect>,
    bond_fade_time: &mut Option<Instant>,
    menu_selected: MenuOption,
    quit_selected: QuitOption,
    over_selected: OverOption,
    high_score: u32,
    new_high_score: bool,
    no_animation: bool,
    now: Instant,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_selected, area),
        Screen::Playing => {
            draw_game(frame, state, theme, popups, high_score, area);
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
            if !bond_fade_cells.is_empty() && !no_animation {
                apply_bond_fade(
                    frame,
                    state,
                    area,
                    bond_fade_cells,
                    bond_fade,
                    bond_fade_time,
                    now,
                );
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, state, theme, popups, high_score, area);
            draw_quit_menu(frame, theme, quit_selected, area);
        }
        Screen::GameOver => {
            draw_game(frame, state, theme, popups, high_score, area);
            draw_game_over(frame, state, theme, over_selected, high_score, new_high_score, area);
        }
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, selected: MenuOption, area: Rect) {
    let popup_w = 46u16;
    let popup_h = 16u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" Bond ", Style::default().fg(theme.title).bold()),
        Span::styled(" tui ", Style::default().fg(theme.main_fg).bold()),
    ]);

    // One chip per element, in piece colours.
    let mut strip = Vec::new();
    for kind in ElementKind::ALL {
        strip.push(Span::styled(
            format!(" {:^2} ", kind.symbol()),
            Style::default().fg(Color::Black).bg(theme.element_color(kind)),
        ));
        strip.push(Span::from(" "));
    }

    let highlight_style = Style::default().fg(Color::Black).bg(theme.title).bold();
    let normal_style = Style::default().fg(theme.main_fg);
    let play_btn = Span::styled(
        " [ PLAY ] ",
        if selected == MenuOption::Play {
            highlight_style
        } else {
            normal_style
        },
    );
    let quit_btn = Span::styled(
        " [ QUIT ] ",
        if selected == MenuOption::Quit {
            highlight_style
        } else {
            normal_style
        },
    );

    let lines = vec![
        Line::from(""),
        title,
        Line::from(Span::styled(
            " drop elements, build molecules ",
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(strip),
        Line::from(""),
        Line::from(Span::styled(
            " ─ H2O · NaCl · CO2 · NH3 ─ ",
            Style::default().fg(theme.div_line),
        )),
        Line::from(""),
        Line::from(vec![play_btn, Span::from("  "), quit_btn]),
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↔ ", Style::default().fg(theme.title)),
            Span::from("SELECT   "),
            Span::styled(" ENTER ", Style::default().fg(theme.title)),
            Span::from("CONFIRM"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " [Q] QUIT ",
            Style::default().fg(Color::Rgb(255, 80, 80)),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption, area: Rect) {
    let popup_w = 30u16;
    let popup_h = 9u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let highlight = Style::default().fg(Color::Black).bg(theme.title).bold();
    let normal = Style::default().fg(theme.main_fg);
    let option = |label: &str, this: QuitOption| {
        Line::from(Span::styled(
            format!(" {label} "),
            if selected == this { highlight } else { normal },
        ))
    };
    let lines = vec![
        Line::from(""),
        option("Resume", QuitOption::Resume),
        Line::from(""),
        option("Main menu", QuitOption::MainMenu),
        Line::from(""),
        option("Exit", QuitOption::Exit),
        Line::from(""),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Quit? ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    selected: OverOption,
    high_score: u32,
    new_high_score: bool,
    area: Rect,
) {
    let popup_w = 38u16;
    let popup_h = 12u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let highlight = Style::default().fg(Color::Black).bg(theme.title).bold();
    let normal = Style::default().fg(theme.main_fg);
    let restart_btn = Span::styled(
        " [ RESTART ] ",
        if selected == OverOption::Restart {
            highlight
        } else {
            normal
        },
    );
    let menu_btn = Span::styled(
        " [ MENU ] ",
        if selected == OverOption::Menu {
            highlight
        } else {
            normal
        },
    );

    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over — grid is full ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Final score: {} ", state.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {} ", high_score),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if new_high_score {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![restart_btn, Span::from("  "), menu_btn]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R — Restart    Q — Quit ",
        Style::default().fg(theme.inactive_fg),
    )));

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Bondtui ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw game: playfield + sidebar; use full area and centre the board.
fn draw_game(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    popups: &[ScorePopup],
    high_score: u32,
    area: Rect,
) {
    let (playfield_area, sidebar_area) = game_areas(area, state);
    draw_playfield(frame, state, theme, popups, playfield_area);
    draw_sidebar(frame, state, theme, high_score, sidebar_area);
}

fn draw_playfield(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    popups: &[ScorePopup],
    area: Rect,
) {
    let title = format!(" Bondtui  | Bonds: {} ", state.bonds_formed);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let buf = frame.buffer_mut();

    // Guide row: the controlled piece hovering over its column.
    if let Some(kind) = state.controlled {
        let rect = Rect {
            x: inner.x + state.active_column as u16 * CELL_W,
            y: inner.y,
            width: CELL_W,
            height: CELL_H,
        };
        draw_element_cell(buf, rect, inner, kind, theme);
    }

    // Separator with a drop marker under the active column.
    let sep_y = inner.y + CELL_H;
    if sep_y < inner.bottom() {
        let grid_w = state.grid.width as u16 * CELL_W;
        for x in inner.x..(inner.x + grid_w).min(inner.right()) {
            buf[(x, sep_y)]
                .set_symbol("─")
                .set_style(Style::default().fg(theme.div_line).bg(theme.bg));
        }
        let marker_x = inner.x + state.active_column as u16 * CELL_W + CELL_W / 2;
        if marker_x < inner.right() {
            buf[(marker_x, sep_y)]
                .set_symbol("▼")
                .set_style(Style::default().fg(theme.title).bg(theme.bg));
        }
    }

    // Board cells.
    let board_y = sep_y + 1;
    for row in 0..state.grid.height {
        for col in 0..state.grid.width {
            let rect = Rect {
                x: inner.x + col as u16 * CELL_W,
                y: board_y + row as u16 * CELL_H,
                width: CELL_W,
                height: CELL_H,
            };
            match state.grid.get(col, row) {
                Some(piece) => draw_element_cell(buf, rect, inner, piece.element, theme),
                None => draw_empty_cell(buf, rect, inner, theme),
            }
        }
    }

    // Floating score popups over the separator line.
    for popup in popups {
        let text_w = popup.text.chars().count() as u16;
        let mut px = inner.x + popup.col as u16 * CELL_W;
        px = px.min(inner.right().saturating_sub(text_w));
        if sep_y < inner.bottom() {
            buf.set_string(
                px,
                sep_y,
                &popup.text,
                Style::default().fg(popup.color).bg(theme.bg).bold(),
            );
        }
    }
}

/// One board cell: atomic number in the corner, symbol centred, piece colour
/// as background.
fn draw_element_cell(buf: &mut Buffer, rect: Rect, clip: Rect, kind: ElementKind, theme: &Theme) {
    if rect.x + rect.width > clip.right() || rect.y + rect.height > clip.bottom() {
        return;
    }
    let info = kind.info();
    let bg = theme.element_color(kind);
    let base = Style::default().fg(Color::Black).bg(bg);
    let w = CELL_W as usize;
    buf.set_string(
        rect.x,
        rect.y,
        format!("{:>width$} ", info.atomic_number, width = w - 1),
        base,
    );
    buf.set_string(
        rect.x,
        rect.y + 1,
        format!("{:^width$}", info.symbol, width = w),
        base.bold(),
    );
    buf.set_string(rect.x, rect.y + 2, " ".repeat(w), base);
}

fn draw_empty_cell(buf: &mut Buffer, rect: Rect, clip: Rect, theme: &Theme) {
    if rect.x + rect.width > clip.right() || rect.y + rect.height > clip.bottom() {
        return;
    }
    buf.set_string(
        rect.x,
        rect.y + 1,
        format!("{:^width$}", "·", width = CELL_W as usize),
        Style::default().fg(theme.div_line).bg(theme.bg),
    );
}

/// "2H 1O" style formula for a recipe, in catalog element order.
fn recipe_formula(recipe: &BondRecipe) -> String {
    let mut parts = Vec::new();
    for kind in ElementKind::ALL {
        let n = recipe.requires(kind);
        if n > 0 {
            parts.push(format!("{}{}", n, kind.symbol()));
        }
    }
    parts.join(" ")
}

fn sidebar_block<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg))
        .title(Span::styled(title, theme.title))
}

fn draw_sidebar(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    high_score: u32,
    area: Rect,
) {
    let fg = Style::default().fg(theme.main_fg);
    let recipes_h = state.recipes.len() as u16 + 2;
    let legend_h = state.spawner.enabled().len() as u16 + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(CELL_H + 2),
            Constraint::Length(recipes_h),
            Constraint::Length(legend_h),
            Constraint::Length(4),
        ])
        .split(area);

    // Score.
    let score_lines = vec![
        Line::from(Span::styled(
            format!(" {} ", state.score),
            Style::default().fg(theme.main_fg).bold(),
        )),
        Line::from(Span::styled(
            format!(" Best {} ", high_score),
            Style::default().fg(theme.inactive_fg),
        )),
    ];
    Paragraph::new(score_lines)
        .block(sidebar_block(" Score ", theme))
        .render(chunks[0], frame.buffer_mut());

    // Next element preview.
    let next_block = sidebar_block(" Next ", theme);
    let next_inner = next_block.inner(chunks[1]);
    next_block.render(chunks[1], frame.buffer_mut());
    if next_inner.width >= CELL_W && next_inner.height >= CELL_H {
        let rect = Rect {
            x: next_inner.x + (next_inner.width - CELL_W) / 2,
            y: next_inner.y,
            width: CELL_W,
            height: CELL_H,
        };
        draw_element_cell(frame.buffer_mut(), rect, next_inner, state.next_element, theme);
    }

    // Recipe catalog with scores.
    let recipe_lines: Vec<Line> = state
        .recipes
        .iter()
        .map(|r| {
            Line::from(Span::styled(
                format!(" {:<5} {:<8} {:>5} ", r.name, recipe_formula(r), r.score),
                fg,
            ))
        })
        .collect();
    Paragraph::new(recipe_lines)
        .block(sidebar_block(" Recipes ", theme))
        .render(chunks[2], frame.buffer_mut());

    // Element legend: colour chip, symbol, name, atomic number.
    let legend_lines: Vec<Line> = state
        .spawner
        .enabled()
        .iter()
        .map(|&kind| {
            let info = kind.info();
            Line::from(vec![
                Span::styled(" ■", Style::default().fg(theme.element_color(kind))),
                Span::styled(
                    format!(" {:<2} {:<9} {:>3} ", info.symbol, info.name, info.atomic_number),
                    fg,
                ),
            ])
        })
        .collect();
    Paragraph::new(legend_lines)
        .block(sidebar_block(" Elements ", theme))
        .render(chunks[3], frame.buffer_mut());

    // Controls.
    let controls = vec![
        Line::from(Span::styled(" ←/→ move   Tab cycle ", fg)),
        Line::from(Span::styled(" ⏎ drop  P pause  Q quit ", fg)),
    ];
    Paragraph::new(controls)
        .block(sidebar_block(" Keys ", theme))
        .render(chunks[4], frame.buffer_mut());
}
