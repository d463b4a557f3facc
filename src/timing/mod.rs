//! # Interactive Timing Module
//!
//! The state machine behind live karaoke timing: the user taps along with the
//! playing audio, drags boundaries to fix them up, and the editor follows the
//! transport from line to line.
//!
//! ## Sub-modules
//! - `types` - MarkingSession, Effect, Transition and gesture types
//! - `marking` - Mark, undo, auto-split and restart for one line
//! - `drag` - Edge and block drags with neighbour clamping
//! - `editor` - TimingEditor, which reacts to transport ticks
//!
//! ## Marking states
//!
//! ```text
//!           mark(t)                    mark(t): close syllable, chain
//!   Idle ───────────▶ Recording ◀───────────────────────┐
//!    ▲                  │  │                             │
//!    │   undo_mark()    │  └─────────────────────────────┘
//!    └──────────────────┘  (closing the last character goes Idle)
//! ```
//!
//! - `mark(t)` from Idle opens a boundary at `t`
//! - `mark(t)` while Recording closes a syllable for the current character
//!   and opens the next boundary at its end. Closing the last character does
//!   not chain: the session goes Idle with every character marked, since a
//!   boundary opened there could never be closed
//! - `undo_mark()` drops the last marked syllable and goes Idle
//! - `auto_split()` replaces all syllables with an even split, fully marked
//! - `restart_line()` starts over at the first character and asks the host to
//!   seek to the line start
//!
//! ## Transport ticks
//! `TimingEditor::tick` returns exactly one [`Effect`] per report: nothing,
//! a seek, an atomic seek-and-play for loop mode, an automatic advance to
//! the next line, a scrub switch, or a pause after the last line.
//!
//! ## Failure semantics
//! Nothing in this module returns an error. Requests outside the line are
//! clamped and requests that cannot apply leave everything unchanged.
//!
//! ## Example
//! ```rust
//! use kara::timing::{mark, MarkingSession};
//! use kara::Line;
//!
//! let mut line = Line::new("Hi", 0.0, 2.0);
//! let mut session = MarkingSession::new(0);
//! for t in [0.5, 1.2, 2.0] {
//!     session = mark(&mut line, session, t);
//! }
//!
//! assert_eq!(line.syllables().len(), 2);
//! assert_eq!(session.marking_index, 2);
//! ```

mod drag;
mod editor;
mod marking;
mod types;


pub use drag::{classify_press, drag_block, drag_edge, BlockDrag};
pub use editor::TimingEditor;
pub use marking::{auto_split, mark, restart_line, undo_mark};
pub use types::{DragHandle, Effect, Gesture, MarkState, MarkingSession, Transition, TransportTick};
