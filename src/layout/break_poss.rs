//! Break possibilities: candidate break points offered by layout managers.

use super::position::Position;

/// A candidate break point, with the extent of the content ending at it.
///
/// Immutable once built: the builder methods consume and return the value.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakPoss {
    position: Position,
    bpd: f64,
    ipd: f64,
    space_before: f64,
    space_after: f64,
    is_first: bool,
    is_last: bool,
    can_break_before: bool,
    can_break_after: bool,
    forced_before: bool,
    forced_after: bool,
    overflow: bool,
}

impl BreakPoss {
    /// A candidate covering `bpd` of block-progression extent since the
    /// previous candidate.
    pub fn new(position: Position, bpd: f64) -> Self {
        Self {
            position,
            bpd,
            ipd: 0.0,
            space_before: 0.0,
            space_after: 0.0,
            is_first: false,
            is_last: false,
            can_break_before: true,
            can_break_after: true,
            forced_before: false,
            forced_after: false,
            overflow: false,
        }
    }

    /// Re-issue a child's candidate under this manager's own position,
    /// keeping the child's extent and flags.
    pub fn rewrap(&self, position: Position) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    pub fn with_bpd(mut self, bpd: f64) -> Self {
        self.bpd = bpd;
        self
    }

    pub fn with_ipd(mut self, ipd: f64) -> Self {
        self.ipd = ipd;
        self
    }

    /// Conditional space owed before this content; discarded at page top.
    pub fn with_space_before(mut self, space: f64) -> Self {
        self.space_before = space;
        self
    }

    /// Conditional space owed after this content; discarded at page bottom.
    pub fn with_space_after(mut self, space: f64) -> Self {
        self.space_after = space;
        self
    }

    pub fn first(mut self, is_first: bool) -> Self {
        self.is_first = is_first;
        self
    }

    pub fn last(mut self, is_last: bool) -> Self {
        self.is_last = is_last;
        self
    }

    pub fn with_can_break_before(mut self, allowed: bool) -> Self {
        self.can_break_before = allowed;
        self
    }

    pub fn with_can_break_after(mut self, allowed: bool) -> Self {
        self.can_break_after = allowed;
        self
    }

    pub fn with_forced_before(mut self, forced: bool) -> Self {
        self.forced_before = forced;
        self
    }

    pub fn with_forced_after(mut self, forced: bool) -> Self {
        self.forced_after = forced;
        self
    }

    pub fn with_overflow(mut self, overflow: bool) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn into_position(self) -> Position {
        self.position
    }

    pub fn bpd(&self) -> f64 {
        self.bpd
    }

    pub fn ipd(&self) -> f64 {
        self.ipd
    }

    pub fn space_before(&self) -> f64 {
        self.space_before
    }

    pub fn space_after(&self) -> f64 {
        self.space_after
    }

    pub fn is_first(&self) -> bool {
        self.is_first
    }

    pub fn is_last(&self) -> bool {
        self.is_last
    }

    pub fn can_break_before(&self) -> bool {
        self.can_break_before
    }

    pub fn can_break_after(&self) -> bool {
        self.can_break_after
    }

    pub fn forced_before(&self) -> bool {
        self.forced_before
    }

    pub fn forced_after(&self) -> bool {
        self.forced_after
    }

    pub fn overflow(&self) -> bool {
        self.overflow
    }
}
