//! Grid occupancy, gravity settling, and the connected-bond search.

use crate::elements::{BondRecipe, ELEMENT_COUNT, ElementKind};
use std::collections::HashSet;
use thiserror::Error;

/// Neighbour exploration order: up, down, left, right (row 0 is the top).
/// Shared by the bond search and the cascade starting-point collection so the
/// match result stays deterministic for a given board.
pub const DIRECTIONS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

#[derive(Debug, Error)]
pub enum GridError {
    #[error("cell ({col}, {row}) is already occupied")]
    OccupiedCell { col: usize, row: usize },
}

/// A placed element piece. `col`/`row` cache the piece's grid position and
/// are written only by [`Grid::place`] and [`Grid::settle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub id: u32,
    pub element: ElementKind,
    pub col: usize,
    pub row: usize,
}

/// Dense W×H occupancy table. Row 0 is the top; row `height - 1` is the
/// bottom, where dropped pieces land.
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    cells: Vec<Option<Piece>>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    #[inline]
    fn idx(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Option<&Piece> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.cells[self.idx(col, row)].as_ref()
    }

    /// Store `piece` at (col, row), writing its coordinate cache.
    pub fn place(&mut self, col: usize, row: usize, mut piece: Piece) -> Result<(), GridError> {
        let i = self.idx(col, row);
        if self.cells[i].is_some() {
            return Err(GridError::OccupiedCell { col, row });
        }
        piece.col = col;
        piece.row = row;
        self.cells[i] = Some(piece);
        Ok(())
    }

    /// Clear (col, row); no-op when already empty.
    pub fn remove(&mut self, col: usize, row: usize) {
        let i = self.idx(col, row);
        self.cells[i] = None;
    }

    /// Lowest empty row in `col`, scanning from the bottom up.
    /// `None` means the column is full, a normal outcome rather than an error.
    pub fn find_lowest_empty(&self, col: usize) -> Option<usize> {
        (0..self.height).rev().find(|&row| self.get(col, row).is_none())
    }

    /// True iff no column has an empty row left.
    pub fn is_full(&self) -> bool {
        (0..self.width).all(|col| self.find_lowest_empty(col).is_none())
    }

    /// Compact every column so its occupied cells form a contiguous block
    /// against the bottom, in original relative order. Fully compacts in one
    /// call; coordinate caches of moved pieces are updated.
    ///
    /// Returns true if any piece moved.
    pub fn settle(&mut self) -> bool {
        let mut moved = false;
        for col in 0..self.width {
            self.discard_incoherent(col);
            let Some(mut empty_row) = self.find_lowest_empty(col) else {
                continue;
            };
            // Walk upward from the gap; each piece found drops into the
            // lowest open row, which then moves up by one.
            let mut row = empty_row;
            while row > 0 {
                row -= 1;
                let i = self.idx(col, row);
                if let Some(mut piece) = self.cells[i].take() {
                    piece.col = col;
                    piece.row = empty_row;
                    let target = self.idx(col, empty_row);
                    self.cells[target] = Some(piece);
                    moved = true;
                    empty_row -= 1;
                }
            }
        }
        moved
    }

    /// Defensive check: a stored piece whose coordinate cache disagrees with
    /// its cell is removed from play rather than allowed to corrupt matching.
    fn discard_incoherent(&mut self, col: usize) {
        for row in 0..self.height {
            let i = self.idx(col, row);
            if let Some(piece) = self.cells[i] {
                if piece.col != col || piece.row != row {
                    log::error!(
                        "piece {} cached ({}, {}) but stored at ({}, {}); discarding",
                        piece.id,
                        piece.col,
                        piece.row,
                        col,
                        row
                    );
                    self.cells[i] = None;
                }
            }
        }
    }
}

/// Depth-first, backtracking search for a connected subset of pieces whose
/// element multiset exactly equals `recipe.required`.
///
/// First-solution search: the first complete match under the fixed
/// [`DIRECTIONS`] order wins, and the result propagates up without exploring
/// further alternatives. Exponential in adjacency branching in the worst
/// case, which is acceptable at tens of cells.
pub fn find_bond(grid: &Grid, start: Piece, recipe: &BondRecipe) -> Option<Vec<Piece>> {
    let mut path = Vec::with_capacity(recipe.total_pieces as usize);
    let mut visited = HashSet::new();
    let mut counts = [0u8; ELEMENT_COUNT];
    if extend_bond(grid, start, recipe, &mut path, &mut visited, &mut counts) {
        Some(path)
    } else {
        None
    }
}

fn extend_bond(
    grid: &Grid,
    piece: Piece,
    recipe: &BondRecipe,
    path: &mut Vec<Piece>,
    visited: &mut HashSet<(usize, usize)>,
    counts: &mut [u8; ELEMENT_COUNT],
) -> bool {
    let kind = piece.element.index();
    // Prune: adding this piece would overshoot the recipe total, or exceed
    // its element's required count (elements the recipe doesn't use have
    // required count 0 and prune immediately).
    if path.len() >= recipe.total_pieces as usize || counts[kind] >= recipe.required[kind] {
        return false;
    }
    path.push(piece);
    visited.insert((piece.col, piece.row));
    counts[kind] += 1;

    if path.len() == recipe.total_pieces as usize {
        if *counts == recipe.required {
            return true;
        }
    } else {
        for (dc, dr) in DIRECTIONS {
            let nc = piece.col as i32 + dc;
            let nr = piece.row as i32 + dr;
            if nc < 0 || nr < 0 {
                continue;
            }
            let (nc, nr) = (nc as usize, nr as usize);
            if visited.contains(&(nc, nr)) {
                continue;
            }
            if let Some(&neighbor) = grid.get(nc, nr) {
                if extend_bond(grid, neighbor, recipe, path, visited, counts) {
                    return true;
                }
            }
        }
    }

    path.pop();
    visited.remove(&(piece.col, piece.row));
    counts[kind] -= 1;
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::default_recipes;
    use ElementKind::{Chlorine, Hydrogen, Oxygen, Sodium};

    fn piece(id: u32, element: ElementKind) -> Piece {
        Piece {
            id,
            element,
            col: 0,
            row: 0,
        }
    }

    fn fill(grid: &mut Grid, cells: &[(usize, usize, ElementKind)]) {
        for (id, &(col, row, element)) in cells.iter().enumerate() {
            grid.place(col, row, piece(id as u32, element)).unwrap();
        }
    }

    #[test]
    fn test_place_occupied_cell_fails() {
        let mut grid = Grid::new(6, 4);
        grid.place(2, 3, piece(0, Hydrogen)).unwrap();
        assert!(matches!(
            grid.place(2, 3, piece(1, Oxygen)),
            Err(GridError::OccupiedCell { col: 2, row: 3 })
        ));
    }

    #[test]
    fn test_place_writes_coordinate_cache() {
        let mut grid = Grid::new(6, 4);
        // Deliberately wrong cache on the way in; place must correct it.
        let mut p = piece(7, Sodium);
        p.col = 5;
        p.row = 0;
        grid.place(1, 2, p).unwrap();
        let stored = grid.get(1, 2).unwrap();
        assert_eq!((stored.col, stored.row), (1, 2));
    }

    #[test]
    fn test_remove_is_noop_on_empty() {
        let mut grid = Grid::new(6, 4);
        grid.remove(3, 3);
        assert!(grid.get(3, 3).is_none());
    }

    #[test]
    fn test_find_lowest_empty_scans_bottom_up() {
        let mut grid = Grid::new(6, 4);
        assert_eq!(grid.find_lowest_empty(0), Some(3));
        grid.place(0, 3, piece(0, Hydrogen)).unwrap();
        grid.place(0, 2, piece(1, Hydrogen)).unwrap();
        assert_eq!(grid.find_lowest_empty(0), Some(1));
    }

    #[test]
    fn test_full_column_and_full_grid() {
        let mut grid = Grid::new(2, 2);
        fill(
            &mut grid,
            &[(0, 0, Hydrogen), (0, 1, Hydrogen), (1, 1, Oxygen)],
        );
        assert_eq!(grid.find_lowest_empty(0), None);
        assert!(!grid.is_full());
        grid.place(1, 0, piece(9, Oxygen)).unwrap();
        assert!(grid.is_full());
        // IsFull <=> every column reports no empty row.
        assert!((0..grid.width).all(|c| grid.find_lowest_empty(c).is_none()));
    }

    #[test]
    fn test_settle_compacts_column_in_one_call() {
        let mut grid = Grid::new(3, 4);
        // Column 1: pieces at rows 0 and 2, gaps at 1 and 3.
        fill(&mut grid, &[(1, 0, Hydrogen), (1, 2, Oxygen)]);
        assert!(grid.settle());
        // Contiguous suffix against the bottom, relative order preserved.
        assert_eq!(grid.get(1, 3).unwrap().element, Oxygen);
        assert_eq!(grid.get(1, 2).unwrap().element, Hydrogen);
        assert!(grid.get(1, 0).is_none() && grid.get(1, 1).is_none());
        // Coordinate caches follow the pieces.
        assert_eq!(grid.get(1, 3).unwrap().row, 3);
        assert_eq!(grid.get(1, 2).unwrap().row, 2);
        assert!(!grid.settle());
    }

    #[test]
    fn test_settle_invariant_all_columns() {
        let mut grid = Grid::new(4, 4);
        fill(
            &mut grid,
            &[
                (0, 0, Hydrogen),
                (0, 2, Oxygen),
                (2, 1, Sodium),
                (3, 0, Chlorine),
                (3, 3, Hydrogen),
            ],
        );
        grid.settle();
        for col in 0..grid.width {
            let mut seen_piece = false;
            for row in 0..grid.height {
                let occupied = grid.get(col, row).is_some();
                // Once occupied going down, never empty again.
                assert!(!seen_piece || occupied, "gap below piece in column {col}");
                seen_piece = seen_piece || occupied;
            }
        }
    }

    #[test]
    fn test_find_bond_exact_match() {
        let recipes = default_recipes();
        let mut grid = Grid::new(6, 4);
        // Vertical H-O-H stack in column 2.
        fill(
            &mut grid,
            &[(2, 3, Hydrogen), (2, 2, Oxygen), (2, 1, Hydrogen)],
        );
        let start = *grid.get(2, 1).unwrap();
        let bond = find_bond(&grid, start, &recipes[0]).expect("H2O should match");
        assert_eq!(bond.len(), 3);
        let hydrogens = bond.iter().filter(|p| p.element == Hydrogen).count();
        assert_eq!(hydrogens, 2);
    }

    #[test]
    fn test_find_bond_rejects_partial_and_superset() {
        let recipes = default_recipes();
        let mut grid = Grid::new(6, 4);
        // Only H + O connected: one hydrogen short of H2O.
        fill(&mut grid, &[(0, 3, Hydrogen), (0, 2, Oxygen)]);
        let start = *grid.get(0, 3).unwrap();
        assert!(find_bond(&grid, start, &recipes[0]).is_none());

        // H-H-O-H column: the matcher takes an exact H2O subset, never four.
        let mut grid = Grid::new(6, 4);
        fill(
            &mut grid,
            &[
                (1, 3, Hydrogen),
                (1, 2, Hydrogen),
                (1, 1, Oxygen),
                (1, 0, Hydrogen),
            ],
        );
        let start = *grid.get(1, 0).unwrap();
        let bond = find_bond(&grid, start, &recipes[0]).unwrap();
        assert_eq!(bond.len(), 3);
    }

    #[test]
    fn test_find_bond_requires_connectivity() {
        let recipes = default_recipes();
        let mut grid = Grid::new(6, 4);
        // Na and Cl present but not 4-adjacent: no NaCl.
        fill(&mut grid, &[(0, 3, Sodium), (2, 3, Chlorine)]);
        let start = *grid.get(0, 3).unwrap();
        assert!(find_bond(&grid, start, &recipes[1]).is_none());
    }

    #[test]
    fn test_find_bond_prunes_foreign_elements() {
        let recipes = default_recipes();
        let mut grid = Grid::new(6, 4);
        // H-Na-O: sodium is not in H2O, so no path through it completes.
        fill(&mut grid, &[(3, 3, Hydrogen), (3, 2, Sodium), (3, 1, Oxygen)]);
        let start = *grid.get(3, 3).unwrap();
        assert!(find_bond(&grid, start, &recipes[0]).is_none());
    }

    #[test]
    fn test_find_bond_first_solution_is_deterministic() {
        let recipes = default_recipes();
        let mut grid = Grid::new(6, 4);
        // Start H has the O below it and two candidate second hydrogens next
        // to the O; down is explored before left, so (2,3) joins the bond.
        fill(
            &mut grid,
            &[
                (2, 1, Hydrogen),
                (2, 2, Oxygen),
                (2, 3, Hydrogen),
                (1, 2, Hydrogen),
            ],
        );
        let start = *grid.get(2, 1).unwrap();
        let bond = find_bond(&grid, start, &recipes[0]).unwrap();
        let coords: Vec<(usize, usize)> = bond.iter().map(|p| (p.col, p.row)).collect();
        assert_eq!(coords, vec![(2, 1), (2, 2), (2, 3)]);
    }

    #[test]
    fn test_find_bond_extends_from_path_tail_only() {
        let recipes = default_recipes();
        let mut grid = Grid::new(6, 4);
        // O flanked by hydrogens on opposite sides: starting at the O, each
        // branch exhausts with one H; only a leaf start walks H-O-H.
        fill(
            &mut grid,
            &[(2, 1, Hydrogen), (2, 2, Oxygen), (2, 3, Hydrogen)],
        );
        let center = *grid.get(2, 2).unwrap();
        assert!(find_bond(&grid, center, &recipes[0]).is_none());
        let leaf = *grid.get(2, 3).unwrap();
        assert!(find_bond(&grid, leaf, &recipes[0]).is_some());
    }

    #[test]
    fn test_discard_incoherent_piece_on_settle() {
        let mut grid = Grid::new(3, 4);
        grid.place(0, 3, piece(0, Hydrogen)).unwrap();
        // Corrupt the cache the way a buggy mover would.
        let i = grid.idx(0, 3);
        if let Some(p) = grid.cells[i].as_mut() {
            p.row = 1;
        }
        grid.settle();
        assert!(grid.get(0, 3).is_none());
    }
}
