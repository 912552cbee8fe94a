//! Greedy pursuit for the snake head
//!
//! Candidates are compared by the distance from the centre of the candidate
//! cell to the exact target point. Comparing against a floored target makes
//! the head flip back and forth when the target sits between gridlines.
//!
//! The snake's own body is not treated as an obstacle; only the live arena
//! constrains movement.

use std::cmp::Ordering;

use rand::Rng;

use super::direction::Direction;
use super::geometry::{Arena, Cell, Point};

/// Next head cell when chasing `target`.
///
/// With `perfect` set the closest in-bounds neighbour always wins. Otherwise
/// the second-closest is taken with probability `suboptimal_chance`; a chance
/// outside `0.0..=1.0`, NaN included, never rolls. Returns `head` unchanged
/// when no neighbour is inside the arena.
pub fn next_move<R: Rng + ?Sized>(
    head: Cell,
    target: Point,
    arena: &Arena,
    perfect: bool,
    suboptimal_chance: f64,
    rng: &mut R,
) -> Cell {
    let candidates = ranked_moves(head, target, arena);

    match candidates.as_slice() {
        [] => head,
        [only] => *only,
        [best, second, ..] => {
            let may_roll = !perfect && (0.0..=1.0).contains(&suboptimal_chance);
            if may_roll && rng.gen_bool(suboptimal_chance) {
                *second
            } else {
                *best
            }
        }
    }
}

/// In-bounds neighbours of `head`, closest to `target` first.
///
/// Equal distances keep [`Direction::EVALUATION_ORDER`].
pub fn ranked_moves(head: Cell, target: Point, arena: &Arena) -> Vec<Cell> {
    let mut scored: Vec<(Cell, f64)> = Direction::EVALUATION_ORDER
        .iter()
        .map(|direction| {
            let (dx, dy) = direction.delta();
            head.moved_by(dx, dy)
        })
        .filter(|cell| arena.contains_cell(*cell))
        .map(|cell| (cell, cell.center().distance(target)))
        .collect();

    // Stable sort so ties fall back to evaluation order
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    scored.into_iter().map(|(cell, _)| cell).collect()
}
