//! Wire framing.
//!
//! A message is any byte sequence followed by one `0x00` terminator, which
//! the sender always transmits. There is no length header: the receiver
//! reads fixed-size chunks and stops on a short read or when the last byte
//! it copied is the terminator.
//!
//! After a complete message the receiver may answer with the text
//! `:ACK:ByteCount:<n>` (no terminator), where `n` counts every byte it
//! accumulated, terminator included.

use std::fmt;

/// Default size of one receive read. Internal buffering only; the
/// destination buffer is the real limit on message size.
pub const READ_CHUNK: usize = 1024;

/// Message terminator.
pub const TERMINATOR: u8 = 0;

/// Size of the buffer an ACK is read into.
pub const ACK_BUF_LEN: usize = 32;

const ACK_PREFIX: &str = ":ACK:ByteCount:";

/// Capacity-checked accumulation of one incoming message into a
/// caller-owned buffer.
///
/// Appends never write past the end of the buffer; a chunk that does not
/// fit is rejected whole and nothing is copied.
pub struct FrameBuffer<'a> {
	buf: &'a mut [u8],
	len: usize,
}

/// A chunk did not fit in the destination buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
	/// Bytes already accepted before the rejected chunk.
	pub accumulated: usize,
	/// Bytes the rejected chunk would have required in total.
	pub needed: usize,
}

impl<'a> FrameBuffer<'a> {
	pub fn new(buf: &'a mut [u8]) -> Self {
		Self { buf, len: 0 }
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn capacity(&self) -> usize {
		self.buf.len()
	}

	/// Bytes accumulated so far.
	pub fn filled(&self) -> &[u8] {
		&self.buf[..self.len]
	}

	/// True when the last accumulated byte is the terminator.
	pub fn ends_with_terminator(&self) -> bool {
		self.filled().last() == Some(&TERMINATOR)
	}

	/// Appends one chunk read off the wire.
	///
	/// Room is checked for the chunk plus one byte for the terminator that
	/// is still to come, unless the chunk itself already ends with it.
	pub fn append(&mut self, chunk: &[u8]) -> Result<(), Overflow> {
		let reserve = if chunk.last() == Some(&TERMINATOR) { 0 } else { 1 };
		let needed = self.len + chunk.len() + reserve;
		if needed > self.buf.len() {
			return Err(Overflow { accumulated: self.len, needed });
		}
		self.buf[self.len..self.len + chunk.len()].copy_from_slice(chunk);
		self.len += chunk.len();
		Ok(())
	}
}

/// Strips one trailing terminator, if present.
pub fn payload(message: &[u8]) -> &[u8] {
	match message.split_last() {
		Some((&TERMINATOR, rest)) => rest,
		_ => message,
	}
}

/// Encodes the acknowledgment for a message of `byte_count` bytes.
pub fn encode_ack(byte_count: usize) -> String {
	format!("{}{}", ACK_PREFIX, byte_count)
}

/// An acknowledgment as read off the wire.
///
/// The send path never validates it; parsing is offered to callers that
/// want the byte count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
	text: String,
}

impl Ack {
	pub fn from_bytes(raw: &[u8]) -> Self {
		let trimmed = payload(raw);
		Self { text: String::from_utf8_lossy(trimmed).into_owned() }
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	/// The byte count carried by a well-formed ACK.
	pub fn byte_count(&self) -> Option<usize> {
		self.text.strip_prefix(ACK_PREFIX)?.trim().parse().ok()
	}
}

impl fmt::Display for Ack {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.text)
	}
}
