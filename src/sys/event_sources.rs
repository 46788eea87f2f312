//! OS triggers the run loop blocks on next to the compositor socket.

use std::os::fd::{AsFd, BorrowedFd};
use std::time::Duration;

use bitflags::bitflags;
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::signal::{SigSet, SigmaskHow, Signal, sigprocmask};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use nix::sys::time::TimeSpec;
use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};
use tracing::{debug, info, trace, warn};

use crate::layout_engine::clock::{TICK_INTERVAL_SECS, next_minute_boundary};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Ready: u8 {
        const PROTOCOL = 1 << 0;
        const TIMEOUT = 1 << 1;
        const SIGNAL = 1 << 2;
        const CLOCK = 1 << 3;
    }
}

pub trait EventSources {
    /// Blocks with no timeout until at least one source is ready. An
    /// interrupted wait returns an empty set.
    fn wait(&mut self, protocol: Option<BorrowedFd<'_>>) -> nix::Result<Ready>;

    fn consume_clock_tick(&mut self);
}

/// signalfd for SIGINT and SIGTERM plus optional auto-close and minute timers.
pub struct Triggers {
    signals: SignalFd,
    timeout: Option<TimerFd>,
    clock: Option<TimerFd>,
}

impl Triggers {
    /// Blocks SIGINT and SIGTERM for the process so they are only seen
    /// through the signalfd.
    pub fn new(close_after: Option<Duration>, clock: bool) -> nix::Result<Self> {
        let mut mask = SigSet::empty();
        mask.add(Signal::SIGINT);
        mask.add(Signal::SIGTERM);
        sigprocmask(SigmaskHow::SIG_BLOCK, Some(&mask), None)?;
        let signals = SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)?;

        let timeout = match close_after {
            Some(after) => {
                let timer = new_timer(ClockId::CLOCK_MONOTONIC)?;
                timer.set(Expiration::OneShot(TimeSpec::from_duration(after)), TimerSetTimeFlags::empty())?;
                info!(?after, "auto-close armed");
                Some(timer)
            }
            None => None,
        };

        let clock = if clock { Some(minute_timer()?) } else { None };

        Ok(Triggers { signals, timeout, clock })
    }
}

fn new_timer(clock: ClockId) -> nix::Result<TimerFd> {
    TimerFd::new(clock, TimerFlags::TFD_NONBLOCK | TimerFlags::TFD_CLOEXEC)
}

/// Fires at the next wall-clock minute, then every minute.
fn minute_timer() -> nix::Result<TimerFd> {
    let timer = new_timer(ClockId::CLOCK_REALTIME)?;
    let first = next_minute_boundary(chrono::Utc::now().timestamp());
    timer.set(
        Expiration::IntervalDelayed(TimeSpec::new(first, 0), TimeSpec::new(TICK_INTERVAL_SECS, 0)),
        TimerSetTimeFlags::TFD_TIMER_ABSTIME,
    )?;
    debug!(first, "clock tick armed");
    Ok(timer)
}

fn is_readable(fd: &PollFd<'_>) -> bool {
    fd.revents().is_some_and(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP))
}

impl EventSources for Triggers {
    fn wait(&mut self, protocol: Option<BorrowedFd<'_>>) -> nix::Result<Ready> {
        let mut sources: Vec<(BorrowedFd<'_>, Ready)> = Vec::with_capacity(4);
        if let Some(fd) = protocol {
            sources.push((fd, Ready::PROTOCOL));
        }
        sources.push((self.signals.as_fd(), Ready::SIGNAL));
        if let Some(timer) = &self.timeout {
            sources.push((timer.as_fd(), Ready::TIMEOUT));
        }
        if let Some(timer) = &self.clock {
            sources.push((timer.as_fd(), Ready::CLOCK));
        }
        let mut fds: Vec<PollFd<'_>> =
            sources.iter().map(|(fd, _)| PollFd::new(*fd, PollFlags::POLLIN)).collect();

        match poll(&mut fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok(Ready::empty()),
            Err(err) => return Err(err),
        }

        let ready = fds
            .iter()
            .zip(&sources)
            .filter(|(fd, _)| is_readable(fd))
            .fold(Ready::empty(), |acc, (_, (_, kind))| acc | *kind);
        trace!(?ready, "woke up");

        if ready.contains(Ready::SIGNAL) {
            match self.signals.read_signal() {
                Ok(Some(info)) => info!(signal = info.ssi_signo, "termination signal received"),
                Ok(None) => {}
                Err(err) => warn!("failed to read signal: {err}"),
            }
        }
        Ok(ready)
    }

    fn consume_clock_tick(&mut self) {
        let Some(timer) = &self.clock else {
            return;
        };
        match timer.wait() {
            Ok(()) | Err(Errno::EAGAIN) => {}
            Err(err) => warn!("failed to read clock timer: {err}"),
        }
    }
}
