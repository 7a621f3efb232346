// SPDX-License-Identifier: Apache-2.0

//! A producer/consumer queue that lets writers append into a buffer while a
//! background emitter drains completed segments to a [`Sink`]. Producers post
//! emit events telling the emitter how far it may drain; the event fence
//! guarantees the emitter only ever touches bytes the producer has finished
//! writing. Backpressure blocks producers once the queued byte total passes
//! `max_byte_size`, and `emit(flush)` blocks until the sink has observed
//! every prior byte.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace};
use crate::{cancel, Buffer, Error, Result};
use crate::streams::Sink;

/// Default backpressure threshold: 128 KiB of undrained bytes.
pub const DEFAULT_MAX_BYTE_SIZE: usize = 128 * 1024;

/// A work item telling the emitter how far to drain: all segments before the
/// target, plus the target itself up to `limit` when `including_tail`.
struct EmitEvent {
	/// Block identity of the target segment; `None` emits nothing and is
	/// used for flush-only events on an empty buffer.
	segment: Option<usize>,
	including_tail: bool,
	/// Snapshot of the target's write cursor when the event was posted.
	/// Bytes written past it belong to a later event.
	limit: usize,
	/// Flush ticket to complete after draining, if any.
	flush: Option<u64>,
}

#[derive(Default)]
struct State {
	buffer: Buffer,
	/// Bytes handed to the sink but not yet acknowledged; they still count
	/// against the backpressure threshold.
	in_flight: usize,
	queue_full: bool,
	terminated: bool,
	flushes_done: u64,
	failure: Option<Error>,
}

struct Shared {
	state: Mutex<State>,
	not_full: Condvar,
	flush_completed: Condvar,
	max_byte_size: usize,
}

/// The producer half. Dropping or closing the queue interrupts the emitter
/// and waits for it to terminate.
pub struct SinkQueue {
	shared: Arc<Shared>,
	events: Option<Sender<EmitEvent>>,
	emitter: Option<JoinHandle<()>>,
	last_emitted: Option<(usize, bool)>,
	flush_serial: u64,
	closed: bool,
}

impl SinkQueue {
	/// Spawns an emitter thread draining into `sink`, with the default
	/// backpressure threshold.
	pub fn new(sink: impl Sink + Send + 'static) -> Result<Self> {
		Self::with_max_byte_size(sink, DEFAULT_MAX_BYTE_SIZE)
	}

	/// Spawns an emitter thread draining into `sink`. Producers block in
	/// [`pause_if_full`] once more than `max_byte_size` undrained bytes are
	/// queued.
	///
	/// [`pause_if_full`]: SinkQueue::pause_if_full
	pub fn with_max_byte_size(sink: impl Sink + Send + 'static, max_byte_size: usize) -> Result<Self> {
		if max_byte_size == 0 {
			return Err(Error::illegal_argument("max_byte_size must be positive"));
		}
		let shared = Arc::new(Shared {
			state: Mutex::new(State::default()),
			not_full: Condvar::new(),
			flush_completed: Condvar::new(),
			max_byte_size,
		});
		let (events, incoming) = unbounded();
		let context = cancel::snapshot();
		let emitter_shared = shared.clone();
		let emitter = thread::Builder::new()
			.name("braid-emitter".into())
			.spawn(move || context.attach(|| emit_loop(&emitter_shared, incoming, sink)))?;
		Ok(Self {
			shared,
			events: Some(events),
			emitter: Some(emitter),
			last_emitted: None,
			flush_serial: 0,
			closed: false,
		})
	}

	/// Appends `byte_count` bytes from `source` and feeds the emitter.
	pub fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		self.check_failure()?;
		self.pause_if_full()?;
		{
			let mut state = self.shared.state.lock();
			source.move_to(&mut state.buffer, byte_count)?;
		}
		self.emit_complete_segments()
	}

	/// Appends a slice and feeds the emitter.
	pub fn write_slice(&mut self, bytes: &[u8]) -> Result {
		self.check_failure()?;
		self.pause_if_full()?;
		{
			let mut state = self.shared.state.lock();
			state.buffer.write_from_slice(bytes)?;
		}
		self.emit_complete_segments()
	}

	/// Blocks while more than `max_byte_size` undrained bytes are queued.
	/// Wakes when the emitter drains below the threshold, the queue dies, or
	/// the caller's cancellation policy is reached.
	pub fn pause_if_full(&mut self) -> Result {
		if self.closed {
			return Err(Error::closed());
		}
		let token = cancel::effective();
		let shared = self.shared.clone();
		let mut state = shared.state.lock();
		loop {
			if let Some(error) = queue_error(&state) {
				return Err(error);
			}
			if state.buffer.size() + state.in_flight <= shared.max_byte_size {
				return Ok(());
			}
			state.queue_full = true;
			// License the emitter to drain everything written so far; the
			// producer cannot extend the tail while it waits, so the snapshot
			// covers every queued byte and the emitter can always make room.
			if let Some(tail) = state.buffer.tail() {
				let key = (tail.id(), true);
				let event = EmitEvent {
					segment: Some(key.0),
					including_tail: true,
					limit: tail.limit(),
					flush: None,
				};
				self.last_emitted = Some(key);
				self.post(event)?;
			}
			if let Err(error) = wait_on(&shared.not_full, &mut state, token.as_ref()) {
				drop(state);
				self.interrupt();
				return Err(error);
			}
		}
	}

	/// Posts an emit event covering every completed segment, unless the same
	/// event is already pending. Producers call this after each write to keep
	/// the emitter continuously fed without duplicate work.
	pub fn emit_complete_segments(&mut self) -> Result {
		self.check_failure()?;
		let shared = self.shared.clone();
		let event = {
			let state = shared.state.lock();
			let Some(tail) = state.buffer.tail() else { return Ok(()) };
			let including_tail = !tail.is_owner() || tail.is_full();
			let key = (tail.id(), including_tail);
			if self.last_emitted == Some(key) {
				return Ok(());
			}
			self.last_emitted = Some(key);
			EmitEvent {
				segment: Some(key.0),
				including_tail,
				limit: tail.limit(),
				flush: None,
			}
		};
		self.post(event)
	}

	/// Posts an emit event covering everything written so far. With `flush`,
	/// also blocks until the sink has been flushed past that point.
	pub fn emit(&mut self, flush: bool) -> Result {
		self.check_failure()?;
		let ticket = flush.then(|| {
			self.flush_serial += 1;
			self.flush_serial
		});
		let outer = self.shared.clone();
		let event = {
			let state = outer.state.lock();
			let (segment, limit) = match state.buffer.tail() {
				Some(tail) => {
					self.last_emitted = Some((tail.id(), true));
					(Some(tail.id()), tail.limit())
				}
				None => (None, 0),
			};
			EmitEvent { segment, including_tail: true, limit, flush: ticket }
		};
		self.post(event)?;

		let Some(ticket) = ticket else { return Ok(()) };
		let token = cancel::effective();
		let shared = self.shared.clone();
		let mut state = shared.state.lock();
		while state.flushes_done < ticket {
			if let Some(error) = queue_error(&state) {
				return Err(error);
			}
			if let Err(error) = wait_on(&shared.flush_completed, &mut state, token.as_ref()) {
				drop(state);
				self.interrupt();
				return Err(error);
			}
		}
		Ok(())
	}

	/// Closes the queue: posts a final drain of everything written,
	/// interrupts the emitter and waits for it to terminate. Idempotent.
	/// Returns the emitter's stored failure, if it died on one.
	pub fn close(&mut self) -> Result {
		if self.closed && self.emitter.is_none() {
			return Ok(());
		}
		if !self.closed {
			// Final drain so no written byte is left behind.
			let _ = self.emit(false);
		}
		self.closed = true;
		self.events = None;
		if let Some(handle) = self.emitter.take() {
			if handle.join().is_err() {
				return Err(Error::illegal_state("emitter thread panicked"));
			}
		}
		let state = self.shared.state.lock();
		match &state.failure {
			Some(error) if !error.is_cancelled() => Err(error.clone()),
			_ => Ok(()),
		}
	}

	/// Returns `true` once the emitter has exited and the queue is poisoned.
	pub fn is_terminated(&self) -> bool {
		self.shared.state.lock().terminated
	}

	/// Replays the emitter's stored failure, or fails with a closed error on
	/// a closed queue.
	fn check_failure(&self) -> Result {
		if self.closed {
			return Err(Error::closed());
		}
		match &self.shared.state.lock().failure {
			Some(error) => Err(error.clone()),
			None => Ok(()),
		}
	}

	/// Interrupts the emitter without waiting for it: disconnects the event
	/// channel and marks the queue closed. Used on cancellation, where the
	/// waiter must not block again on the emitter's exit.
	fn interrupt(&mut self) {
		self.closed = true;
		self.events = None;
	}

	fn post(&mut self, event: EmitEvent) -> Result {
		match &self.events {
			Some(events) => events.send(event).map_err(|_| Error::closed()),
			None => Err(Error::closed()),
		}
	}
}

impl Drop for SinkQueue {
	fn drop(&mut self) {
		let _ = self.close();
	}
}

fn queue_error(state: &State) -> Option<Error> {
	if let Some(error) = &state.failure {
		Some(error.clone())
	} else if state.terminated {
		Some(Error::closed())
	} else {
		None
	}
}

/// One cancellable condvar wait. Reaching the caller's deadline or observing
/// a cancelled scope fails with a cancellation error.
fn wait_on(
	condvar: &Condvar,
	guard: &mut MutexGuard<'_, State>,
	token: Option<&cancel::Effective>,
) -> Result {
	let Some(token) = token else {
		condvar.wait(guard);
		return Ok(());
	};
	token.check()?;
	match token.wait_deadline() {
		Some(deadline) => {
			if condvar.wait_until(guard, deadline).timed_out() {
				return Err(Error::cancelled());
			}
		}
		None => condvar.wait(guard),
	}
	token.check()
}

/// The emitter loop: take an event, drain up to its fence, write to the
/// sink, manage backpressure and flushes. Runs until the channel disconnects
/// or the sink fails; either way it closes the sink, marks the queue
/// terminated and wakes every waiting producer.
fn emit_loop(shared: &Shared, events: Receiver<EmitEvent>, mut sink: impl Sink) {
	let failure = loop {
		let Ok(event) = events.recv() else { break None };
		match handle_event(shared, &mut sink, &event) {
			Ok(()) => { }
			Err(error) => break Some(error),
		}
	};

	if let Some(error) = &failure {
		debug!(error = %error, "emitter stopping on sink failure");
	}
	if let Err(error) = sink.close_sink() {
		debug!(error = %error, "sink close failed");
	}

	let mut state = shared.state.lock();
	state.terminated = true;
	if state.failure.is_none() {
		state.failure = failure;
	}
	shared.not_full.notify_all();
	shared.flush_completed.notify_all();
}

fn handle_event(shared: &Shared, sink: &mut impl Sink, event: &EmitEvent) -> Result {
	let mut drain = Buffer::new();
	let to_write = {
		let mut state = shared.state.lock();
		let count = drain_count(&state.buffer, event);
		if count > 0 {
			state.buffer.carve_front(&mut drain, count);
			state.in_flight += count;
		}
		count
	};

	if to_write > 0 {
		trace!(bytes = to_write, "draining to sink");
		let written = sink.write(&mut drain, to_write);
		let mut state = shared.state.lock();
		state.in_flight -= to_write;
		written?;
		if state.queue_full
			&& state.buffer.size() + state.in_flight <= shared.max_byte_size {
			state.queue_full = false;
			shared.not_full.notify_all();
		}
	}

	if let Some(ticket) = event.flush {
		sink.flush()?;
		trace!(ticket, "flush completed");
		let mut state = shared.state.lock();
		if state.flushes_done < ticket {
			state.flushes_done = ticket;
		}
		shared.flush_completed.notify_all();
	}
	Ok(())
}

/// Computes how many bytes the event licenses the emitter to drain: full
/// segments before the target, plus the target up to its snapshot limit when
/// included. A target that already left the buffer licenses nothing; its
/// bytes were covered by an earlier event.
fn drain_count(buffer: &Buffer, event: &EmitEvent) -> usize {
	let Some(target) = event.segment else { return 0 };
	let mut count = 0;
	for seg in buffer.iter_segments() {
		if seg.id() == target {
			if event.including_tail {
				count += event.limit.saturating_sub(seg.pos()).min(seg.len());
			}
			return count;
		}
		count += seg.len();
	}
	0
}
