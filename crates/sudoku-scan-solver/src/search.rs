//! Confidence-ordered clue search.
//!
//! The classifier's per-cell probability vectors rarely agree perfectly
//! with the Sudoku constraints. This search walks cells from most to least
//! confident, tries each cell's strongest readings under legality pruning,
//! and accepts the first clue assignment whose puzzle actually solves.

use log::{debug, info};

use crate::board::Board;
use crate::solve::solve_mrv;

/// Hard cap on recursive search steps; guarantees termination on
/// adversarial candidate tables.
pub const MAX_SEARCH_STEPS: u32 = 100_000;

/// How many of a cell's strongest readings the search will try.
const TOP_CANDIDATES: usize = 5;

#[derive(thiserror::Error, Debug)]
pub enum SolveError {
    #[error("could not find a valid grid")]
    NoValidGrid,
    #[error("search budget exhausted after {0} steps")]
    BudgetExhausted(u32),
    #[error("solver produced an inconsistent grid")]
    Inconsistent,
}

/// Ordered digit readings for one cell, strongest first. Empty cells have
/// no candidates.
#[derive(Clone, Debug, Default)]
pub struct CellCandidates {
    pub digits: Vec<(u8, f32)>,
}

impl CellCandidates {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the candidate list from a 10-class probability simplex.
    /// Class 0 ("empty") is skipped; digits 1-9 are sorted by probability
    /// descending, stable with respect to digit order.
    pub fn from_scores(scores: &[f32]) -> Self {
        debug_assert_eq!(scores.len(), 10);
        let mut digits: Vec<(u8, f32)> = (1..=9u8).map(|d| (d, scores[d as usize])).collect();
        digits.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self { digits }
    }

    /// The strongest reading's probability; zero for empty cells.
    pub fn confidence(&self) -> f32 {
        self.digits.first().map_or(0.0, |&(_, p)| p)
    }
}

/// Explicit step accumulator threaded through the recursion so the search
/// stays pure and reentrant.
#[derive(Clone, Copy, Debug)]
pub struct SearchBudget {
    steps: u32,
    limit: u32,
}

impl SearchBudget {
    pub fn new(limit: u32) -> Self {
        Self { steps: 0, limit }
    }

    /// Account one step; false once the limit is hit.
    fn consume(&mut self) -> bool {
        if self.steps >= self.limit {
            return false;
        }
        self.steps += 1;
        true
    }

    pub fn steps_used(&self) -> u32 {
        self.steps
    }
}

/// Pick a legal clue assignment from the candidate table and solve it.
///
/// On success the returned board is fully solved; its `fixed` flags mark
/// the chosen clues, so everything non-fixed is solver output.
pub fn solve_from_candidates(candidates: &[CellCandidates]) -> Result<Board, SolveError> {
    solve_from_candidates_bounded(candidates, MAX_SEARCH_STEPS)
}

/// As `solve_from_candidates` with an explicit step budget.
pub fn solve_from_candidates_bounded(
    candidates: &[CellCandidates],
    budget_limit: u32,
) -> Result<Board, SolveError> {
    assert_eq!(candidates.len(), 81);

    let mut order: Vec<usize> = (0..81).collect();
    order.sort_by(|&a, &b| candidates[b].confidence().total_cmp(&candidates[a].confidence()));

    let filled = candidates.iter().filter(|c| !c.digits.is_empty()).count();
    info!("clue search over {} non-empty cells", filled);

    let mut board = Board::new();
    let mut budget = SearchBudget::new(budget_limit);
    match assign(&mut board, &order, candidates, 0, &mut budget)? {
        Some(solved) => {
            debug!("clue search used {} steps", budget.steps_used());
            Ok(solved)
        }
        None => Err(SolveError::NoValidGrid),
    }
}

fn assign(
    board: &mut Board,
    order: &[usize],
    candidates: &[CellCandidates],
    depth: usize,
    budget: &mut SearchBudget,
) -> Result<Option<Board>, SolveError> {
    if !budget.consume() {
        return Err(SolveError::BudgetExhausted(budget.limit));
    }

    if depth == 81 {
        let mut puzzle = *board;
        puzzle.freeze_clues();
        let mut solved = puzzle;
        if !solve_mrv(&mut solved) {
            return Ok(None);
        }
        if !solved.is_valid_solution() {
            return Err(SolveError::Inconsistent);
        }
        return Ok(Some(solved));
    }

    let cell = order[depth];
    let (row, col) = (cell / 9, cell % 9);
    let cand = &candidates[cell];

    if cand.digits.is_empty() {
        board.set(row, col, 0);
        return assign(board, order, candidates, depth + 1, budget);
    }

    for &(digit, _) in cand.digits.iter().take(TOP_CANDIDATES) {
        if !board.is_legal(row, col, digit) {
            continue;
        }
        board.set(row, col, digit);
        if let Some(solved) = assign(board, order, candidates, depth + 1, budget)? {
            return Ok(Some(solved));
        }
        board.set(row, col, 0);
    }
    board.set(row, col, 0);
    Ok(None)
}
