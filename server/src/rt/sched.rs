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

//! The cooperative scheduler: a call stack of [`Task`]s driven one state
//! step at a time.
//!
//! There is one [`Scheduler`] per connection. `run` is handed a step
//! budget so a single connection can never monopolize the event loop --
//! the budget is the scheduler's equivalent of preemption.

use super::argz::Argz;
use super::exception::Exception;
use super::task::{Task, Yield};

/// Why [`Scheduler::run`] returned control to the caller.
pub enum RunOutcome {
    /// The root task (and everything it called) ran to completion.
    Done,
    /// The task yielded `SUSPEND`; call `run` again once the event it was
    /// waiting on fires.
    Suspended,
    /// The step budget ran out before the task suspended or finished;
    /// call `run` again on the next scheduler turn.
    BudgetExhausted,
    /// The task yielded `CONTINUE`: it's starved for input, not stuck.
    NeedsInput(Exception),
    /// The task yielded `ABORT`; the whole call stack has been unwound.
    Aborted(Exception),
}

/// A single task's call stack: the last entry is the task currently
/// being polled; everything below it is suspended mid-`SUB` call.
pub struct Scheduler {
    stack: Vec<Box<dyn Task>>,
}

impl Scheduler {
    pub fn new(root: Box<dyn Task>) -> Self {
        Self { stack: vec![root] }
    }

    pub fn is_finished(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Run at most `budget` state steps. `input` is delivered to the very
    /// first step only; every subsequent step (within this call or a
    /// later one) receives whatever argz the previous step produced --
    /// empty unless a sub-task just returned via `CALLER`.
    pub fn run(&mut self, budget: usize, input: Argz) -> RunOutcome {
        let mut input = input;
        for _ in 0..budget {
            let yld = match self.stack.last_mut() {
                Some(task) => task.poll(std::mem::take(&mut input)),
                None => return RunOutcome::Done,
            };
            match yld {
                Yield::Done => {
                    self.stack.pop();
                    if self.stack.is_empty() {
                        return RunOutcome::Done;
                    }
                }
                Yield::Goto(label) => {
                    self.stack.last_mut().unwrap().set_state(label);
                }
                Yield::Suspend(label) => {
                    self.stack.last_mut().unwrap().set_state(label);
                    return RunOutcome::Suspended;
                }
                Yield::Caller(label, argz) => {
                    self.stack.pop();
                    match self.stack.last_mut() {
                        Some(caller) => {
                            caller.set_state(label);
                            input = argz;
                        }
                        None => return RunOutcome::Done,
                    }
                }
                Yield::Sub(sub, label) => {
                    self.stack.last_mut().unwrap().set_state(label);
                    self.stack.push(sub);
                }
                Yield::Term => {
                    self.stack.clear();
                    return RunOutcome::Done;
                }
                Yield::Continue(exc, label) => {
                    self.stack.last_mut().unwrap().set_state(label);
                    return RunOutcome::NeedsInput(exc);
                }
                Yield::Abort(exc) => {
                    self.stack.clear();
                    return RunOutcome::Aborted(exc);
                }
            }
        }
        RunOutcome::BudgetExhausted
    }
}
