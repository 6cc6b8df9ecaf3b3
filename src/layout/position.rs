//! Positions: replayable addresses of break points.
//!
//! A [`Position`] is issued by one layout manager and wraps (optionally) the
//! position of the child it delegated to. Break decisions are recorded as
//! positions; materialization replays them through `add_areas`.

use std::fmt;

use serde::Serialize;

/// Identity of a layout manager, assigned in document pre-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LmId(pub usize);

impl fmt::Display for LmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lm#{}", self.0)
    }
}

/// A break point in the content of one layout manager.
///
/// Ordering follows document order within one manager: positions of the same
/// manager compare by cursor, then by the nested child position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    lm: LmId,
    index: usize,
    inner: Option<Box<Position>>,
}

impl Position {
    pub fn leaf(lm: LmId, index: usize) -> Self {
        Self {
            lm,
            index,
            inner: None,
        }
    }

    pub fn wrap(lm: LmId, index: usize, inner: Position) -> Self {
        Self {
            lm,
            index,
            inner: Some(Box::new(inner)),
        }
    }

    pub fn lm(&self) -> LmId {
        self.lm
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn inner(&self) -> Option<&Position> {
        self.inner.as_deref()
    }

    /// The innermost position of the chain.
    pub fn leaf_position(&self) -> &Position {
        match &self.inner {
            Some(inner) => inner.leaf_position(),
            None => self,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.lm, self.index)?;
        if let Some(inner) = &self.inner {
            write!(f, "/{}", inner)?;
        }
        Ok(())
    }
}

/// A consumed-once run of positions handed to `add_areas`.
#[derive(Debug, Clone, Default)]
pub struct PositionIterator {
    items: std::collections::VecDeque<Position>,
}

impl PositionIterator {
    pub fn new(positions: Vec<Position>) -> Self {
        Self {
            items: positions.into(),
        }
    }

    pub fn peek(&self) -> Option<&Position> {
        self.items.front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Split off the next run of consecutive positions that wrap a position
    /// of the same child, returning the child's id and the unwrapped run.
    /// Positions without a nested child position are skipped.
    pub fn next_child_run(&mut self) -> Option<(LmId, PositionIterator)> {
        while let Some(front) = self.items.front() {
            if front.inner.is_some() {
                break;
            }
            self.items.pop_front();
        }
        let child = self.items.front()?.inner()?.lm();

        let mut run = Vec::new();
        while let Some(front) = self.items.front() {
            match front.inner() {
                Some(inner) if inner.lm() == child => {}
                Some(_) => break,
                None => {
                    self.items.pop_front();
                    continue;
                }
            }
            if let Some(pos) = self.items.pop_front() {
                if let Some(inner) = pos.inner {
                    run.push(*inner);
                }
            }
        }
        Some((child, PositionIterator::new(run)))
    }
}

impl Iterator for PositionIterator {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        self.items.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lm_ids_display_with_prefix() {
        assert_eq!(LmId(7).to_string(), "lm#7");
        let p = Position::wrap(LmId(1), 2, Position::leaf(LmId(4), 9));
        assert_eq!(p.to_string(), "lm#1@2/lm#4@9");
        assert_eq!(p.leaf_position(), &Position::leaf(LmId(4), 9));
    }

    #[test]
    fn positions_order_by_cursor_then_child() {
        let a = Position::wrap(LmId(1), 0, Position::leaf(LmId(2), 3));
        let b = Position::wrap(LmId(1), 0, Position::leaf(LmId(2), 5));
        let c = Position::leaf(LmId(1), 1);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn child_runs_group_consecutive_children() {
        let parent = LmId(1);
        let mut it = PositionIterator::new(vec![
            Position::wrap(parent, 0, Position::leaf(LmId(2), 0)),
            Position::wrap(parent, 0, Position::leaf(LmId(2), 1)),
            Position::wrap(parent, 1, Position::leaf(LmId(3), 0)),
            Position::leaf(parent, 2),
        ]);

        let (first, run) = it.next_child_run().unwrap();
        assert_eq!(first, LmId(2));
        assert_eq!(run.map(|p| p.index()).collect::<Vec<_>>(), vec![0, 1]);

        let (second, run) = it.next_child_run().unwrap();
        assert_eq!(second, LmId(3));
        assert_eq!(run.len(), 1);

        assert!(it.next_child_run().is_none());
    }
}
