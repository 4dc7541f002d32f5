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

use super::argz::{Argz, Value};
use super::exception::{Exception, Kind};
use super::sched::{RunOutcome, Scheduler};
use super::task::{Label, Task, Yield, INIT};

/// Counts down from N, suspending between every step, then terminates.
struct Countdown {
    state: Label,
    remaining: u32,
}

impl Countdown {
    fn new(remaining: u32) -> Self {
        Self {
            state: INIT,
            remaining,
        }
    }
}

impl Task for Countdown {
    fn poll(&mut self, _input: Argz) -> Yield {
        match self.state {
            INIT => {
                if self.remaining == 0 {
                    Yield::Done
                } else {
                    Yield::Suspend("TICK")
                }
            }
            "TICK" => {
                self.remaining -= 1;
                if self.remaining == 0 {
                    Yield::Done
                } else {
                    Yield::Suspend("TICK")
                }
            }
            _ => Yield::Abort(Exception::new(Kind::Run, 1, "unreachable state")),
        }
    }
    fn state(&self) -> Label {
        self.state
    }
    fn set_state(&mut self, label: Label) {
        self.state = label;
    }
}

#[test]
fn suspend_resume_runs_to_completion() {
    let mut sched = Scheduler::new(Box::new(Countdown::new(3)));
    let mut ticks = 0;
    loop {
        match sched.run(10, Argz::new()) {
            RunOutcome::Suspended => ticks += 1,
            RunOutcome::Done => break,
            _ => panic!("unexpected outcome"),
        }
    }
    assert_eq!(ticks, 2);
    assert!(sched.is_finished());
}

#[test]
fn budget_exhaustion_does_not_lose_progress() {
    let mut sched = Scheduler::new(Box::new(Countdown::new(1)));
    // budget 0 never polls
    match sched.run(0, Argz::new()) {
        RunOutcome::BudgetExhausted => {}
        _ => panic!("expected budget exhaustion with zero budget"),
    }
    match sched.run(10, Argz::new()) {
        RunOutcome::Done => {}
        _ => panic!("expected completion once budget is available"),
    }
}

/// A task that calls a sub-task to double a number, then adds one.
struct Doubler {
    state: Label,
    input: u64,
}
impl Task for Doubler {
    fn poll(&mut self, _input: Argz) -> Yield {
        match self.state {
            INIT => Yield::Caller("N/A", vec![Value::Int(self.input * 2)]),
            _ => Yield::Abort(Exception::new(Kind::Run, 1, "unreachable state")),
        }
    }
    fn state(&self) -> Label {
        self.state
    }
    fn set_state(&mut self, label: Label) {
        self.state = label;
    }
}

struct PlusOneCaller {
    state: Label,
    base: u64,
    result: Option<u64>,
}
impl Task for PlusOneCaller {
    fn poll(&mut self, input: Argz) -> Yield {
        match self.state {
            INIT => Yield::Sub(
                Box::new(Doubler {
                    state: INIT,
                    input: self.base,
                }),
                "AFTER_DOUBLE",
            ),
            "AFTER_DOUBLE" => {
                let doubled = input[0].as_int().unwrap();
                self.result = Some(doubled + 1);
                Yield::Done
            }
            _ => Yield::Abort(Exception::new(Kind::Run, 1, "unreachable state")),
        }
    }
    fn state(&self) -> Label {
        self.state
    }
    fn set_state(&mut self, label: Label) {
        self.state = label;
    }
}

#[test]
fn sub_task_call_and_return_carries_argz() {
    let mut caller = PlusOneCaller {
        state: INIT,
        base: 20,
        result: None,
    };
    // drive it directly without a Scheduler first, to pin down the
    // hand-off shape the scheduler relies on.
    assert!(matches!(caller.poll(Argz::new()), Yield::Sub(_, "AFTER_DOUBLE")));

    let caller = PlusOneCaller {
        state: INIT,
        base: 20,
        result: None,
    };
    let mut sched = Scheduler::new(Box::new(caller));
    match sched.run(10, Argz::new()) {
        RunOutcome::Done => {}
        _ => panic!("expected the call chain to finish"),
    }
    assert!(sched.is_finished());
}

struct AlwaysAborts;
impl Task for AlwaysAborts {
    fn poll(&mut self, _input: Argz) -> Yield {
        Yield::Abort(Exception::new(Kind::Usr, 42, "bad request"))
    }
    fn state(&self) -> Label {
        INIT
    }
    fn set_state(&mut self, _label: Label) {}
}

#[test]
fn abort_unwinds_the_whole_stack() {
    let mut sched = Scheduler::new(Box::new(AlwaysAborts));
    match sched.run(10, Argz::new()) {
        RunOutcome::Aborted(exc) => {
            assert_eq!(exc.kind, Kind::Usr);
            assert_eq!(exc.code, 42);
        }
        _ => panic!("expected an abort"),
    }
    assert!(sched.is_finished());
}

struct StarvedOnce {
    state: Label,
    fed: bool,
}
impl Task for StarvedOnce {
    fn poll(&mut self, _input: Argz) -> Yield {
        match self.state {
            INIT if !self.fed => {
                Yield::Continue(Exception::io_not_ready(), INIT)
            }
            _ => Yield::Done,
        }
    }
    fn state(&self) -> Label {
        self.state
    }
    fn set_state(&mut self, label: Label) {
        self.state = label;
    }
}

#[test]
fn continue_reports_the_exception_without_aborting() {
    let mut sched = Scheduler::new(Box::new(StarvedOnce {
        state: INIT,
        fed: false,
    }));
    match sched.run(10, Argz::new()) {
        RunOutcome::NeedsInput(exc) => assert_eq!(exc.kind, Kind::Io),
        _ => panic!("expected NeedsInput"),
    }
}
