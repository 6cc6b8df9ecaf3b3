//! Ambient state handed down the manager tree during one request.

const EPSILON: f64 = 0.001;

/// Read-mostly state for a break-possibility request or a materialization
/// pass. Parents derive their children's context with the `with_*` methods.
///
/// Break-before hints travel on the break possibilities themselves
/// (`forced_before`); the context only says whether the page is still empty,
/// which is when such a hint is already satisfied.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutContext {
    /// Block-progression space left on the page.
    pub stack_limit: f64,
    /// Inline-progression extent of the containing reference area.
    pub ref_ipd: f64,
    /// Conditional space owed by the content placed just before.
    pub pending_space: f64,
    /// Nothing has been placed on the page yet.
    pub at_page_top: bool,
}

impl LayoutContext {
    pub fn new(stack_limit: f64, ref_ipd: f64) -> Self {
        Self {
            stack_limit,
            ref_ipd,
            pending_space: 0.0,
            at_page_top: true,
        }
    }

    pub fn with_ref_ipd(&self, ref_ipd: f64) -> Self {
        Self {
            ref_ipd: ref_ipd.max(0.0),
            ..self.clone()
        }
    }

    pub fn with_stack_limit(&self, stack_limit: f64) -> Self {
        Self {
            stack_limit,
            ..self.clone()
        }
    }

    pub fn with_pending_space(&self, pending_space: f64) -> Self {
        Self {
            pending_space,
            ..self.clone()
        }
    }

    pub fn at_top(&self, at_page_top: bool) -> Self {
        Self {
            at_page_top,
            ..self.clone()
        }
    }

    /// Whether content of `bpd` owing `space_before` fits what is left.
    /// Conditional space is dropped at the top of a page.
    pub fn fits(&self, space_before: f64, bpd: f64) -> bool {
        let needed = if self.at_page_top {
            bpd
        } else {
            self.pending_space + space_before + bpd
        };
        needed <= self.stack_limit + EPSILON
    }
}
