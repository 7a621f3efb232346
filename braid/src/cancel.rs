// SPDX-License-Identifier: Apache-2.0

//! Scoped cancellation for blocking operations. Each logical call chain (one
//! OS thread, or a child thread that attached a [`Snapshot`]) carries a stack
//! of cancel tokens. Blocking primitives ask for the [`effective`] policy at
//! every suspension point: the intersection of all live tokens above the
//! nearest shield. The earliest deadline wins, a deadline beats a timeout,
//! and any cancelled token cancels the whole intersection.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use crate::{Error, Result};

#[derive(Debug)]
struct Token {
	timeout: Option<Duration>,
	deadline: Option<Instant>,
	shielded: bool,
	cancelled: AtomicBool,
	finished: AtomicBool,
}

thread_local! {
	static STACK: RefCell<Vec<Arc<Token>>> = RefCell::new(Vec::new());
}

/// A handle to one cancellation scope, given to the scope body. Cloneable and
/// sendable, so another thread may cancel the scope.
#[derive(Clone, Debug)]
pub struct CancelScope(Arc<Token>);

impl CancelScope {
	/// Cancels the scope. Blocking operations inside it fail with a
	/// cancellation error at their next suspension point.
	pub fn cancel(&self) {
		self.0.cancelled.store(true, Ordering::Release);
	}

	/// Returns `true` once the scope is cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.0.cancelled.load(Ordering::Acquire)
	}
}

/// Runs `body` under a timeout. Every blocking wait inside the scope is
/// bounded by `timeout` and fails with a cancellation error when it elapses.
pub fn with_timeout<T>(timeout: Duration, body: impl FnOnce(&CancelScope) -> T) -> T {
	run_cancellable(
		Token {
			timeout: Some(timeout),
			deadline: None,
			shielded: false,
			cancelled: AtomicBool::new(false),
			finished: AtomicBool::new(false),
		},
		body,
	)
}

/// Runs `body` under an absolute deadline.
pub fn with_deadline<T>(deadline: Instant, body: impl FnOnce(&CancelScope) -> T) -> T {
	run_cancellable(
		Token {
			timeout: None,
			deadline: Some(deadline),
			shielded: false,
			cancelled: AtomicBool::new(false),
			finished: AtomicBool::new(false),
		},
		body,
	)
}

/// Runs `body` shielded from enclosing scopes: their deadlines, timeouts and
/// cancellations do not propagate inside.
pub fn shielded<T>(body: impl FnOnce(&CancelScope) -> T) -> T {
	run_cancellable(
		Token {
			timeout: None,
			deadline: None,
			shielded: true,
			cancelled: AtomicBool::new(false),
			finished: AtomicBool::new(false),
		},
		body,
	)
}

/// Pushes `token`, runs `body`, and marks the token finished on every exit
/// path, panicking included.
fn run_cancellable<T>(token: Token, body: impl FnOnce(&CancelScope) -> T) -> T {
	struct Finish(Arc<Token>);

	impl Drop for Finish {
		fn drop(&mut self) {
			self.0.finished.store(true, Ordering::Release);
			STACK.with(|stack| {
				let mut stack = stack.borrow_mut();
				if let Some(at) = stack.iter().position(|t| Arc::ptr_eq(t, &self.0)) {
					stack.remove(at);
				}
			});
		}
	}

	let token = Arc::new(token);
	STACK.with(|stack| stack.borrow_mut().push(token.clone()));
	let finish = Finish(token.clone());
	let result = body(&CancelScope(token));
	drop(finish);
	result
}

/// The intersection of the live cancel tokens above the nearest shield.
#[derive(Clone, Debug, Default)]
pub struct Effective {
	deadline: Option<Instant>,
	timeout: Option<Duration>,
	watched: Vec<Arc<Token>>,
}

impl Effective {
	/// Fails with a cancellation error if any watched token is cancelled or
	/// the deadline has been reached.
	pub fn check(&self) -> Result {
		if self.watched.iter().any(|t| t.cancelled.load(Ordering::Acquire)) {
			return Err(Error::cancelled());
		}
		if matches!(self.deadline, Some(deadline) if Instant::now() >= deadline) {
			return Err(Error::cancelled());
		}
		Ok(())
	}

	/// Converts the policy into an absolute instant to bound one blocking
	/// wait, or `None` when only cancellation flags apply.
	pub fn wait_deadline(&self) -> Option<Instant> {
		self.deadline.or_else(|| self.timeout.map(|t| Instant::now() + t))
	}
}

/// Computes the effective token for the current call chain: walk from the
/// top of the stack, dropping finished tokens, stopping at the first shield
/// (which hides itself and everything below), intersecting the rest. Returns
/// `None` when no token applies.
pub fn effective() -> Option<Effective> {
	STACK.with(|stack| {
		let mut stack = stack.borrow_mut();
		stack.retain(|t| !t.finished.load(Ordering::Acquire));

		let mut eff = Effective::default();
		let mut any = false;
		for token in stack.iter().rev() {
			if token.shielded {
				break;
			}
			any = true;
			if let Some(deadline) = token.deadline {
				eff.deadline = Some(eff.deadline.map_or(deadline, |d| d.min(deadline)));
			}
			if eff.timeout.is_none() {
				eff.timeout = token.timeout;
			}
			eff.watched.push(token.clone());
		}
		if eff.deadline.is_some() {
			eff.timeout = None;
		}
		any.then_some(eff)
	})
}

/// Fails with a cancellation error when the current effective token has been
/// reached. Blocking operations call this at every suspension point.
pub fn check() -> Result {
	match effective() {
		Some(eff) => eff.check(),
		None => Ok(()),
	}
}

/// A capture of the current token stack, for handing the cancellation
/// context to a child thread at spawn time.
#[derive(Clone)]
pub struct Snapshot(Vec<Arc<Token>>);

/// Captures the current call chain's cancellation context.
pub fn snapshot() -> Snapshot {
	STACK.with(|stack| Snapshot(stack.borrow().clone()))
}

impl Snapshot {
	/// Installs the captured context on the current thread for the duration
	/// of `body`.
	pub fn attach<T>(self, body: impl FnOnce() -> T) -> T {
		STACK.with(|stack| *stack.borrow_mut() = self.0);
		let result = body();
		STACK.with(|stack| stack.borrow_mut().clear());
		result
	}
}
