// SPDX-License-Identifier: Apache-2.0

//! The process-table interface this core consumes but does not own. The
//! scheduler and process table are out of scope; this module is just
//! enough of a stand-in to let `FaultHandler` call `current_process()`,
//! read `pagetable`, and set `killed`, exactly the three things §6 names.

/// Opaque process identifier. The real scheduler's PID space is out of
/// scope; this core only ever needs to tell processes apart, not manage
/// their lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

/// The state the demand-paging core needs from the process the trap
/// handler says is currently running: its page-table root frame and
/// whether a fault has already condemned it to exit.
pub trait CurrentProcess {
    fn pid(&self) -> Pid;
    /// Frame index of this process's page-table root.
    fn pagetable_root(&self) -> usize;
    /// Marks the process for termination on its next return to user mode.
    /// Idempotent: killing an already-killed process is a no-op.
    fn kill(&mut self);
    fn is_killed(&self) -> bool;
}

/// A bare-bones `CurrentProcess` suitable for tests and for a host kernel
/// that has not yet wired up its own scheduler's process struct.
#[derive(Debug)]
pub struct SimpleProcess {
    pid: Pid,
    pagetable_root: usize,
    killed: bool,
}

impl SimpleProcess {
    pub fn new(pid: Pid, pagetable_root: usize) -> Self {
        SimpleProcess { pid, pagetable_root, killed: false }
    }
}

impl CurrentProcess for SimpleProcess {
    fn pid(&self) -> Pid {
        self.pid
    }
    fn pagetable_root(&self) -> usize {
        self.pagetable_root
    }
    fn kill(&mut self) {
        self.killed = true;
    }
    fn is_killed(&self) -> bool {
        self.killed
    }
}
