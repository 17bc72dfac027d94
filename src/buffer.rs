// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Packet buffers with adjustable headroom.
//!
//! A [`PacketBuffer`] is the mutable byte region a packet program operates
//! on: backing storage plus a logical `[head, tail)` window. The window may
//! grow or shrink at its head to insert or remove link-layer headers in
//! place. Every successful head adjustment invalidates byte offsets derived
//! from the previous window; callers must re-parse from the new head.

use thiserror::Error;

/// Bytes reserved in front of the frame by [`PacketBuffer::new`].
///
/// Enough room to prepend several VLAN tags or an encapsulation header
/// without reallocating.
pub const HEADROOM: usize = 256;

/// Errors from head adjustment.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// The requested head move would leave the buffer's `[head, tail)`
    /// window ill-formed (head before the start of storage or past tail).
    #[error("cannot move packet head by {0} bytes")]
    NoRoom(isize),
}

/// A single packet's mutable byte region.
///
/// Invariant: `head <= tail <= storage.len()`. One `PacketBuffer` exists
/// per packet, created at program entry and dropped once a verdict is
/// reached.
pub struct PacketBuffer {
    storage: Vec<u8>,
    head: usize,
    tail: usize,
}

impl PacketBuffer {
    /// Copy `frame` into a fresh buffer with [`HEADROOM`] bytes of room in
    /// front of it.
    pub fn new(frame: &[u8]) -> PacketBuffer {
        PacketBuffer::with_headroom(frame, HEADROOM)
    }

    /// Copy `frame` into a fresh buffer with `headroom` bytes in front.
    pub fn with_headroom(frame: &[u8], headroom: usize) -> PacketBuffer {
        let mut storage = vec![0; headroom + frame.len()];
        storage[headroom..].copy_from_slice(frame);
        PacketBuffer {
            storage,
            head: headroom,
            tail: headroom + frame.len(),
        }
    }

    /// The number of bytes between head and tail.
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// The packet bytes, starting at the current head.
    pub fn data(&self) -> &[u8] {
        &self.storage[self.head..self.tail]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.head..self.tail]
    }

    /// Move the head by `delta` bytes: positive shrinks the packet from
    /// the front, negative grows it into the headroom.
    ///
    /// On failure the window is left exactly as it was. On success all
    /// previously computed header offsets are invalid.
    pub fn adjust_head(&mut self, delta: isize) -> Result<(), BufferError> {
        let head = self.head as isize + delta;
        if head < 0 || head as usize > self.tail {
            return Err(BufferError::NoRoom(delta));
        }
        self.head = head as usize;
        Ok(())
    }
}
