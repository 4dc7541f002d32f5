/*
 * This file is a part of the Patricia project
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! The cooperative [`Task`] trait and the [`Yield`] verbs a state step can
//! return.
//!
//! A task is a labeled state machine: every call to [`Task::poll`] runs
//! exactly one state, then returns a [`Yield`] telling the scheduler what
//! to do next. `INIT` and `TERM` are reserved labels -- a fresh task
//! starts at `INIT`, and a task that reaches `TERM` is never polled
//! again.

use super::argz::Argz;
use super::exception::Exception;

/// A state label. States are named, not numbered, the same way the
/// wire-protocol and connection state machines in this crate are
/// documented by name elsewhere.
pub type Label = &'static str;

pub const INIT: Label = "INIT";
pub const TERM: Label = "TERM";

/// What a task's current state decided to do.
pub enum Yield {
    /// The task has nothing more to do; drop it from the scheduler.
    Done,
    /// Move to another state of this same task without returning control
    /// to the scheduler (a same-turn relabeling, not a suspend).
    Goto(Label),
    /// Give the scheduler back its turn; resume this task at `Label` the
    /// next time it is polled.
    Suspend(Label),
    /// This task is a sub-task: hand `Argz` back to the caller and resume
    /// the caller at `Label`.
    Caller(Label, Argz),
    /// Spawn `task` as a sub-task of this one; this task resumes at
    /// `Label` (with the sub-task's `Caller` argz) once the sub-task
    /// yields `Done` or `Caller`.
    Sub(Box<dyn Task>, Label),
    /// Terminate unconditionally; no further states of this task or its
    /// callers run.
    Term,
    /// Not enough input to finish this state (e.g. the byte-fetcher ran
    /// dry); resume at `Label` once the scheduler has more to offer.
    Continue(Exception, Label),
    /// An unrecoverable condition; unwinds the whole task stack.
    Abort(Exception),
}

/// A cooperatively scheduled, single-threaded unit of work.
pub trait Task {
    /// Run exactly one state step starting from [`Task::state`].
    fn poll(&mut self, input: Argz) -> Yield;
    fn state(&self) -> Label;
    fn set_state(&mut self, label: Label);
}
