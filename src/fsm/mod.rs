//! Function-pointer finite state machine for the operating mode.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateTable                                                  │
//! │  ┌────────────┬───────────┬──────────┬───────────────────┐   │
//! │  │ StateId    │ on_enter  │ on_exit  │ on_sample         │   │
//! │  ├────────────┼───────────┼──────────┼───────────────────┤   │
//! │  │ Idle       │ fn(ctx)   │ -        │ fn(ctx)->Option<> │   │
//! │  │ Capturing  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Monitoring │ fn(ctx)   │ -        │ fn(ctx)->Option<> │   │
//! │  └────────────┴───────────┴──────────┴───────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two things move the machine:
//!
//! - operator commands, through [`Fsm::request`], with an [`Entry`] policy
//!   saying whether the current mode is restarted or kept;
//! - valid control samples, through [`Fsm::on_sample`].  The mode's
//!   `on_sample` handler does its own accounting (Capturing counts the
//!   sample) and may end the mode.
//!
//! Both return the [`ModeChange`] they caused so the supervisor can apply
//! outputs and report it.  Handlers never touch hardware: they write
//! [`OutputCommands`](context::OutputCommands) into the
//! [`SupervisorContext`].

pub mod context;
pub mod states;

use context::SupervisorContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Operating modes.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    /// Not logging.  The heater runs only if enabled at boot.
    Idle = 0,
    /// Logging every control sample until the capture length is reached.
    Capturing = 1,
    /// Logging the last reading at the monitor period, without end.
    Monitoring = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;
}

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut SupervisorContext);

/// Signature for the per-sample handler.
/// Returns `Some(next)` to end the current mode.
pub type SampleHandlerFn = fn(&mut SupervisorContext) -> Option<StateId>;

/// Static descriptor for a single mode.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_sample: SampleHandlerFn,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// What a command-driven transition does when the target is the current
/// mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// Run exit and enter again (a capture restarts, Stop re-idles).
    Restart,
    /// Leave the mode untouched.
    KeepCurrent,
}

/// A mode change that has been carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub from: StateId,
    pub to: StateId,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The mode state machine.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: StateId,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, row)| row.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial,
        }
    }

    /// Run the initial `on_enter`.  Call once before anything else.
    pub fn start(&mut self, ctx: &mut SupervisorContext) {
        info!("FSM starting in state: {}", self.row().name);
        if let Some(enter) = self.row().on_enter {
            enter(ctx);
        }
    }

    /// Hand one valid control sample to the current mode.
    pub fn on_sample(&mut self, ctx: &mut SupervisorContext) -> Option<ModeChange> {
        let next = (self.row().on_sample)(ctx)?;
        Some(self.switch(next, ctx))
    }

    /// Command-driven transition to `next`.
    pub fn request(
        &mut self,
        next: StateId,
        entry: Entry,
        ctx: &mut SupervisorContext,
    ) -> Option<ModeChange> {
        if entry == Entry::KeepCurrent && next == self.current {
            return None;
        }
        Some(self.switch(next, ctx))
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    fn row(&self) -> &StateDescriptor {
        &self.table[self.current as usize]
    }

    fn switch(&mut self, next: StateId, ctx: &mut SupervisorContext) -> ModeChange {
        let from = self.current;
        info!(
            "FSM transition: {} -> {}",
            self.row().name,
            self.table[next as usize].name
        );

        if let Some(exit) = self.row().on_exit {
            exit(ctx);
        }
        self.current = next;
        if let Some(enter) = self.row().on_enter {
            enter(ctx);
        }

        ModeChange { from, to: next }
    }
}
