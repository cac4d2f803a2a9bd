//! Interrupt handling for the console.
//!
//! A single process-wide [`Controller`] holds the current [`Mode`] in an
//! atomic. The SIGINT handler reads it and decides what an interrupt means:
//! abandon the line being typed, cancel the running evaluation, or nothing
//! at all while a request/response exchange is on the wire. SIGTERM and
//! SIGHUP end the console: while a line is being read the reader unwinds so
//! the terminal modes are restored, otherwise the default action runs. The
//! handlers only touch atomics.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

/// What the console is currently blocked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Idle = 0,
    AwaitingInput = 1,
    Evaluating = 2,
    SendingRequest = 3,
    AwaitingResponse = 4,
}

impl Mode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Mode::AwaitingInput,
            2 => Mode::Evaluating,
            3 => Mode::SendingRequest,
            4 => Mode::AwaitingResponse,
            _ => Mode::Idle,
        }
    }
}

/// Effect of an interrupt in a given mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Discard the partial input and return to the top of the main loop.
    AbortInput,
    /// Ask the in-process evaluator to stop at its next poll.
    CancelEvaluation,
    /// Dropped: interrupting mid-protocol would desynchronize the framing.
    Ignore,
}

/// Map a mode to the interrupt action it calls for.
pub fn interrupt_action(mode: Mode) -> InterruptAction {
    match mode {
        Mode::AwaitingInput => InterruptAction::AbortInput,
        Mode::Evaluating => InterruptAction::CancelEvaluation,
        Mode::Idle | Mode::SendingRequest | Mode::AwaitingResponse => InterruptAction::Ignore,
    }
}

/// Mode plus the two request flags the interrupt can raise.
#[derive(Debug)]
pub struct Controller {
    mode: AtomicU8,
    abort_requested: AtomicBool,
    cancel_requested: AtomicBool,
    /// Terminating signal number, 0 when none arrived
    termination: AtomicI32,
}

impl Controller {
    pub const fn new() -> Self {
        Self {
            mode: AtomicU8::new(Mode::Idle as u8),
            abort_requested: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            termination: AtomicI32::new(0),
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::SeqCst))
    }

    pub fn set_mode(&self, mode: Mode) {
        tracing::trace!("mode -> {:?}", mode);
        self.mode.store(mode as u8, Ordering::SeqCst);
    }

    /// Signal-safe: reads the mode and raises the matching flag.
    pub fn interrupt(&self) -> InterruptAction {
        let action = interrupt_action(self.mode());
        match action {
            InterruptAction::AbortInput => self.abort_requested.store(true, Ordering::SeqCst),
            InterruptAction::CancelEvaluation => {
                self.cancel_requested.store(true, Ordering::SeqCst)
            }
            InterruptAction::Ignore => {}
        }
        action
    }

    /// Consume a pending abort request.
    pub fn take_abort(&self) -> bool {
        self.abort_requested.swap(false, Ordering::SeqCst)
    }

    /// Polled by the evaluator while it runs.
    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub fn clear_cancel(&self) {
        self.cancel_requested.store(false, Ordering::SeqCst);
    }

    /// Signal-safe: record a terminating signal. Returns true when the line
    /// reader will pick it up, false when the caller should terminate now.
    pub fn request_termination(&self, signal: i32) -> bool {
        self.termination.store(signal, Ordering::SeqCst);
        self.mode() == Mode::AwaitingInput
    }

    /// The terminating signal received so far, if any.
    pub fn pending_termination(&self) -> Option<i32> {
        match self.termination.load(Ordering::SeqCst) {
            0 => None,
            signal => Some(signal),
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

/// The controller the SIGINT handler acts on.
pub static CONTROLLER: Controller = Controller::new();

/// Install the SIGINT handler that routes interrupts through [`CONTROLLER`],
/// and the SIGTERM/SIGHUP handler that ends the console.
///
/// `SA_RESTART` keeps blocking socket reads and writes going when the
/// interrupt is ignored.
pub fn install_signal_handlers() -> nix::Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    extern "C" fn interrupt_handler(_: libc::c_int) {
        CONTROLLER.interrupt();
    }

    extern "C" fn termination_handler(signal: libc::c_int) {
        if CONTROLLER.request_termination(signal) {
            return;
        }
        // Terminal is in cooked mode here: die the default way
        // SAFETY: signal(2) and raise(3) are async-signal-safe.
        unsafe {
            libc::signal(signal, libc::SIG_DFL);
            libc::raise(signal);
        }
    }

    let interrupt = SigAction::new(
        SigHandler::Handler(interrupt_handler),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    let termination = SigAction::new(
        SigHandler::Handler(termination_handler),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    // SAFETY: the handlers only perform atomic loads and stores, plus the
    // async-signal-safe re-raise above.
    unsafe {
        sigaction(Signal::SIGINT, &interrupt)?;
        sigaction(Signal::SIGTERM, &termination)?;
        sigaction(Signal::SIGHUP, &termination)?;
    }
    tracing::debug!("SIGINT, SIGTERM and SIGHUP handlers installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_while_awaiting_input_requests_abort() {
        let controller = Controller::new();
        controller.set_mode(Mode::AwaitingInput);

        assert_eq!(controller.interrupt(), InterruptAction::AbortInput);
        assert!(controller.take_abort());
        assert!(!controller.take_abort(), "abort is consumed once");
        assert!(!controller.cancel_requested());
    }

    #[test]
    fn test_interrupt_while_evaluating_requests_cancel() {
        let controller = Controller::new();
        controller.set_mode(Mode::Evaluating);

        assert_eq!(controller.interrupt(), InterruptAction::CancelEvaluation);
        assert!(controller.cancel_requested());
        assert!(!controller.take_abort());

        controller.clear_cancel();
        assert!(!controller.cancel_requested());
    }

    #[test]
    fn test_interrupt_mid_protocol_is_dropped() {
        for mode in [Mode::SendingRequest, Mode::AwaitingResponse, Mode::Idle] {
            let controller = Controller::new();
            controller.set_mode(mode);

            assert_eq!(controller.interrupt(), InterruptAction::Ignore);
            assert_eq!(controller.mode(), mode, "mode must not change");
            assert!(!controller.take_abort());
            assert!(!controller.cancel_requested());
        }
    }

    #[test]
    fn test_termination_while_reading_is_deferred_to_reader() {
        let controller = Controller::new();
        assert_eq!(controller.pending_termination(), None);

        controller.set_mode(Mode::AwaitingInput);
        assert!(controller.request_termination(libc::SIGTERM));
        assert_eq!(controller.pending_termination(), Some(libc::SIGTERM));
    }

    #[test]
    fn test_termination_outside_reading_is_immediate() {
        for mode in [Mode::Idle, Mode::Evaluating, Mode::AwaitingResponse] {
            let controller = Controller::new();
            controller.set_mode(mode);
            assert!(!controller.request_termination(libc::SIGHUP));
            assert_eq!(controller.pending_termination(), Some(libc::SIGHUP));
        }
    }

    #[test]
    fn test_mode_round_trips_through_atomic() {
        let controller = Controller::new();
        assert_eq!(controller.mode(), Mode::Idle);
        for mode in [
            Mode::AwaitingInput,
            Mode::Evaluating,
            Mode::SendingRequest,
            Mode::AwaitingResponse,
            Mode::Idle,
        ] {
            controller.set_mode(mode);
            assert_eq!(controller.mode(), mode);
        }
    }
}
