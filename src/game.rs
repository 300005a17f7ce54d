//! Game session: controlled piece, drop resolution, cascading bonds, score.

use crate::elements::{BondRecipe, ElementKind, default_recipes};
use crate::grid::{DIRECTIONS, Grid, Piece, find_bond};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Scan restarts allowed per resolution before the cascade is aborted.
/// Guards against unanticipated recipe/adjacency cycles, not a normal exit.
const CASCADE_SAFETY_CAP: u32 = 100;

/// Piece-count score multipliers: the largest threshold not exceeding the
/// bond's piece count wins (step function, no interpolation).
const PIECE_COUNT_MULTIPLIERS: [(u8, f32); 4] = [(2, 1.0), (3, 1.2), (4, 1.5), (5, 2.0)];

pub fn piece_count_multiplier(piece_count: u8) -> f32 {
    let mut multiplier = 1.0;
    for &(threshold, value) in &PIECE_COUNT_MULTIPLIERS {
        if piece_count >= threshold {
            multiplier = value;
        }
    }
    multiplier
}

/// Session phase. `Resolving` only exists inside a `drop_piece` call; callers
/// observe `Controlling` or `GameOver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Controlling,
    Resolving,
    GameOver,
}

/// Things that happened during a command, for the app/renderer to consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    PiecePlaced {
        col: usize,
        row: usize,
        element: ElementKind,
    },
    BondFormed {
        name: &'static str,
        piece_count: u8,
        score_awarded: u32,
        removed: Vec<(usize, usize)>,
    },
    GridSettled,
    GridFull,
    /// Drop rejected: the active column has no empty cell. Not fatal.
    ColumnFull { col: usize },
    /// Cascade safety cap exceeded; resolution aborted early.
    CascadeAborted,
}

/// Uniform random element source. Seedable for reproducible sessions.
#[derive(Debug)]
pub struct PieceSpawner {
    rng: StdRng,
    enabled: Vec<ElementKind>,
}

impl PieceSpawner {
    pub fn new(element_count: usize, seed: Option<u64>) -> Self {
        let enabled: Vec<ElementKind> = ElementKind::ALL
            .into_iter()
            .take(element_count.clamp(2, ElementKind::ALL.len()))
            .collect();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, enabled }
    }

    /// Element for a new, unplaced piece. No side effects on the grid.
    pub fn spawn(&mut self) -> ElementKind {
        self.enabled[self.rng.gen_range(0..self.enabled.len())]
    }

    pub fn enabled(&self) -> &[ElementKind] {
        &self.enabled
    }
}

/// Game state: grid, controlled piece, recipe catalog, score, event queue.
#[derive(Debug)]
pub struct GameState {
    pub grid: Grid,
    pub recipes: Vec<BondRecipe>,
    pub spawner: PieceSpawner,
    /// Element of the piece the player is steering; not yet in the grid.
    pub controlled: Option<ElementKind>,
    /// Pre-drawn element shown in the sidebar preview.
    pub next_element: ElementKind,
    pub active_column: usize,
    pub phase: Phase,
    pub score: u32,
    pub bonds_formed: u32,
    pub pieces_placed: u32,
    events: Vec<GameEvent>,
    next_piece_id: u32,
}

impl GameState {
    pub fn new(config: &crate::GameConfig) -> Self {
        let mut spawner = PieceSpawner::new(config.elements, config.seed);
        let first = spawner.spawn();
        let next_element = spawner.spawn();
        let width = config.width as usize;
        Self {
            grid: Grid::new(width, config.height as usize),
            recipes: default_recipes(),
            spawner,
            controlled: Some(first),
            next_element,
            active_column: width / 2,
            phase: Phase::Controlling,
            score: 0,
            bonds_formed: 0,
            pieces_placed: 0,
            events: Vec::new(),
            next_piece_id: 0,
        }
    }

    /// Drain events accumulated since the last call.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Shift the active column left (-1) or right (+1), wrapping at both
    /// edges. The controlled piece is not in the grid yet, so nothing moves.
    pub fn move_column(&mut self, delta: i32) {
        if self.phase != Phase::Controlling || self.controlled.is_none() {
            return;
        }
        let width = self.grid.width as i32;
        self.active_column = (self.active_column as i32 + delta).rem_euclid(width) as usize;
    }

    /// Drop the controlled piece into the active column and run resolution.
    ///
    /// A full column rejects the drop: the piece stays controlled and a
    /// [`GameEvent::ColumnFull`] warning is queued. Otherwise the piece is
    /// placed, cascading bonds resolve to a fixed point, and the session
    /// either ends (grid full) or the next piece spawns.
    pub fn drop_piece(&mut self) {
        if self.phase != Phase::Controlling {
            return;
        }
        let Some(element) = self.controlled else {
            return;
        };
        let col = self.active_column;
        let Some(row) = self.grid.find_lowest_empty(col) else {
            log::warn!("column {col} is full; drop rejected");
            self.events.push(GameEvent::ColumnFull { col });
            return;
        };

        let piece = Piece {
            id: self.next_piece_id,
            element,
            col,
            row,
        };
        self.next_piece_id += 1;
        self.controlled = None;
        self.phase = Phase::Resolving;
        if let Err(err) = self.grid.place(col, row, piece) {
            // find_lowest_empty said this cell was free; discard the piece
            // rather than let a broken grid take the session down.
            log::error!("placement failed: {err}; piece discarded");
        } else {
            self.pieces_placed += 1;
            log::debug!("placed {} at ({col}, {row})", element.symbol());
            self.events.push(GameEvent::PiecePlaced { col, row, element });
            self.process_cascading_bonds();
        }

        if self.grid.is_full() {
            self.phase = Phase::GameOver;
            self.events.push(GameEvent::GridFull);
        } else {
            self.spawn_piece();
            self.phase = Phase::Controlling;
        }
    }

    /// Pull the preview element into control and pre-draw a new preview.
    /// The active column resets to the middle, as on every spawn.
    fn spawn_piece(&mut self) {
        self.controlled = Some(self.next_element);
        self.next_element = self.spawner.spawn();
        self.active_column = self.grid.width / 2;
    }

    /// Run bond-search → removal → settle to a fixed point.
    ///
    /// Scans bottom row to top row, left to right, offering every occupied
    /// cell to [`Self::try_process_bond_at`]; a processed bond changes the
    /// grid, so the scan restarts. A clean scan means the board is stable.
    pub fn process_cascading_bonds(&mut self) {
        let mut restarts = 0u32;
        'scan: loop {
            if restarts > CASCADE_SAFETY_CAP {
                log::error!(
                    "cascade safety cap {CASCADE_SAFETY_CAP} exceeded; aborting resolution"
                );
                self.events.push(GameEvent::CascadeAborted);
                return;
            }
            for row in (0..self.grid.height).rev() {
                for col in 0..self.grid.width {
                    if self.grid.get(col, row).is_some() && self.try_process_bond_at(col, row) {
                        restarts += 1;
                        continue 'scan;
                    }
                }
            }
            return;
        }
    }

    /// Try to form one bond seeded at (col, row) or one of its neighbours.
    ///
    /// Recipes are tried in catalog order; starting points are the piece at
    /// (col, row) followed by its occupied neighbours in the fixed direction
    /// order, deduplicated by piece identity. A starting point is skipped for
    /// recipes that have no use for its element. The first match is scored,
    /// removed, and the grid settled.
    pub fn try_process_bond_at(&mut self, col: usize, row: usize) -> bool {
        let mut starts: Vec<Piece> = Vec::with_capacity(5);
        if let Some(&placed) = self.grid.get(col, row) {
            starts.push(placed);
        }
        for (dc, dr) in DIRECTIONS {
            let nc = col as i32 + dc;
            let nr = row as i32 + dr;
            if nc < 0 || nr < 0 {
                continue;
            }
            if let Some(&neighbor) = self.grid.get(nc as usize, nr as usize) {
                if !starts.iter().any(|s| s.id == neighbor.id) {
                    starts.push(neighbor);
                }
            }
        }

        for recipe_idx in 0..self.recipes.len() {
            for &start in &starts {
                let recipe = &self.recipes[recipe_idx];
                if recipe.requires(start.element) == 0 {
                    continue;
                }
                let Some(bond) = find_bond(&self.grid, start, recipe) else {
                    continue;
                };
                let name = recipe.name;
                let base_points = recipe.score;
                let piece_count = recipe.total_pieces;
                let score_awarded = self.add_score(base_points, piece_count);
                let removed: Vec<(usize, usize)> = bond.iter().map(|p| (p.col, p.row)).collect();
                for p in &bond {
                    self.grid.remove(p.col, p.row);
                }
                self.grid.settle();
                self.bonds_formed += 1;
                log::debug!("bond {name} formed: {piece_count} pieces, +{score_awarded}");
                self.events.push(GameEvent::BondFormed {
                    name,
                    piece_count,
                    score_awarded,
                    removed,
                });
                self.events.push(GameEvent::GridSettled);
                return true;
            }
        }
        false
    }

    /// Add `round(base_points × multiplier)` to the score; the multiplier
    /// steps on the bond's piece count. Returns the amount awarded.
    fn add_score(&mut self, base_points: u32, piece_count: u8) -> u32 {
        let multiplier = piece_count_multiplier(piece_count);
        let awarded = (base_points as f32 * multiplier).round() as u32;
        self.score += awarded;
        awarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use ElementKind::{Chlorine, Hydrogen, Nitrogen, Oxygen, Sodium};

    fn config(width: u16, height: u16) -> GameConfig {
        GameConfig {
            width,
            height,
            elements: 6,
            seed: Some(42),
        }
    }

    fn drop_at(state: &mut GameState, col: usize, element: ElementKind) {
        state.controlled = Some(element);
        state.active_column = col;
        state.drop_piece();
    }

    fn place(state: &mut GameState, col: usize, row: usize, element: ElementKind) {
        let id = state.next_piece_id;
        state.next_piece_id += 1;
        state
            .grid
            .place(col, row, Piece { id, element, col, row })
            .unwrap();
    }

    #[test]
    fn test_h2o_in_one_column_scores_120() {
        let mut state = GameState::new(&config(6, 4));
        drop_at(&mut state, 2, Hydrogen);
        drop_at(&mut state, 2, Oxygen);
        assert_eq!(state.score, 0);
        drop_at(&mut state, 2, Hydrogen);
        // {H:2, O:1} cluster formed: 3 pieces removed, round(100 × 1.2).
        assert_eq!(state.score, 120);
        assert_eq!(state.bonds_formed, 1);
        assert!((0..4).all(|row| state.grid.get(2, row).is_none()));
        let events = state.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::BondFormed {
                name: "H2O",
                piece_count: 3,
                score_awarded: 120,
                ..
            }
        )));
    }

    #[test]
    fn test_drop_on_full_column_is_rejected() {
        let mut state = GameState::new(&config(6, 4));
        for _ in 0..4 {
            drop_at(&mut state, 0, Sodium);
        }
        assert_eq!(state.grid.find_lowest_empty(0), None);
        drop_at(&mut state, 0, Sodium);
        // Piece retained, grid unchanged, session continues.
        assert_eq!(state.controlled, Some(Sodium));
        assert_eq!(state.phase, Phase::Controlling);
        assert_eq!(state.pieces_placed, 4);
        assert!(
            state
                .take_events()
                .iter()
                .any(|e| matches!(e, GameEvent::ColumnFull { col: 0 }))
        );
    }

    #[test]
    fn test_piece_dropped_after_removal_lands_at_bottom() {
        let mut state = GameState::new(&config(6, 4));
        drop_at(&mut state, 2, Hydrogen);
        drop_at(&mut state, 2, Oxygen);
        drop_at(&mut state, 2, Hydrogen);
        // Column 2 is empty again; the next drop lands on the bottom row.
        drop_at(&mut state, 2, Sodium);
        assert_eq!(state.grid.get(2, 3).unwrap().element, Sodium);
        assert!(state.grid.get(2, 2).is_none());
    }

    #[test]
    fn test_full_grid_without_bond_ends_session() {
        let mut state = GameState::new(&config(2, 2));
        for col in [0, 1, 0, 1] {
            drop_at(&mut state, col, Sodium);
        }
        assert!(state.grid.is_full());
        assert_eq!(state.phase, Phase::GameOver);
        assert!(
            state
                .take_events()
                .iter()
                .any(|e| matches!(e, GameEvent::GridFull))
        );
        // Further commands are ignored once terminal.
        drop_at(&mut state, 0, Sodium);
        assert_eq!(state.phase, Phase::GameOver);
    }

    #[test]
    fn test_disjoint_pair_is_not_removed() {
        let mut state = GameState::new(&config(6, 4));
        // Two Na/Cl pairs on the board; only one of them is connected.
        place(&mut state, 0, 3, Sodium);
        place(&mut state, 1, 3, Chlorine);
        place(&mut state, 3, 3, Sodium);
        place(&mut state, 5, 3, Chlorine);
        state.process_cascading_bonds();
        assert_eq!(state.score, 150);
        assert_eq!(state.bonds_formed, 1);
        assert!(state.grid.get(0, 3).is_none());
        assert!(state.grid.get(1, 3).is_none());
        // The disconnected Na and Cl remain.
        assert!(state.grid.get(3, 3).is_some());
        assert!(state.grid.get(5, 3).is_some());
    }

    #[test]
    fn test_cascade_chains_after_settle() {
        let mut state = GameState::new(&config(3, 4));
        // Column 1 holds H2O with Na stacked on top; Cl waits in column 0.
        // Removing the water drops the Na next to the Cl.
        place(&mut state, 1, 3, Hydrogen);
        place(&mut state, 1, 2, Oxygen);
        place(&mut state, 1, 1, Hydrogen);
        place(&mut state, 1, 0, Sodium);
        place(&mut state, 0, 3, Chlorine);
        state.process_cascading_bonds();
        assert_eq!(state.bonds_formed, 2);
        assert_eq!(state.score, 120 + 150);
        assert!((0..3).all(|col| (0..4).all(|row| state.grid.get(col, row).is_none())));
    }

    #[test]
    fn test_multiplier_steps_are_monotonic() {
        assert_eq!(piece_count_multiplier(2), 1.0);
        assert_eq!(piece_count_multiplier(3), 1.2);
        assert_eq!(piece_count_multiplier(4), 1.5);
        assert_eq!(piece_count_multiplier(5), 2.0);
        // 5+ keeps the top multiplier.
        assert_eq!(piece_count_multiplier(6), 2.0);
        let values: Vec<f32> = (2..=6).map(piece_count_multiplier).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_nh3_scores_with_four_piece_multiplier() {
        let mut state = GameState::new(&config(6, 4));
        // H-H-H-N stacked in one column forms the ammonia chain.
        place(&mut state, 3, 3, Hydrogen);
        place(&mut state, 3, 2, Hydrogen);
        place(&mut state, 3, 1, Hydrogen);
        place(&mut state, 3, 0, Nitrogen);
        state.process_cascading_bonds();
        // round(175 × 1.5) = 263.
        assert_eq!(state.score, 263);
        assert_eq!(state.bonds_formed, 1);
    }

    #[test]
    fn test_move_column_wraps_both_directions() {
        let mut state = GameState::new(&config(6, 4));
        state.active_column = 0;
        state.move_column(-1);
        assert_eq!(state.active_column, 5);
        state.move_column(1);
        assert_eq!(state.active_column, 0);
        for _ in 0..7 {
            state.move_column(1);
        }
        assert_eq!(state.active_column, 1);
    }

    #[test]
    fn test_occupancy_invariant_holds_through_play() {
        let mut state = GameState::new(&config(6, 4));
        for i in 0..200 {
            if state.phase == Phase::GameOver {
                break;
            }
            state.move_column(if i % 3 == 0 { -1 } else { 1 });
            state.drop_piece();
            for col in 0..state.grid.width {
                for row in 0..state.grid.height {
                    if let Some(p) = state.grid.get(col, row) {
                        assert_eq!((p.col, p.row), (col, row));
                    }
                }
            }
        }
        // The cascade always terminated normally.
        assert!(
            state
                .take_events()
                .iter()
                .all(|e| e != &GameEvent::CascadeAborted)
        );
    }
}
