// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Externally-owned lookup tables.
//!
//! These are populated by a control plane and consulted by the packet
//! programs. Lookups take a read lock only, so any number of packets can
//! resolve concurrently while the control plane updates entries.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::wire::ethernet::Mac;

/// A static source-MAC to destination-MAC redirect mapping.
#[derive(Default)]
pub struct RedirectTable {
    map: RwLock<HashMap<Mac, Mac>>,
}

impl RedirectTable {
    pub fn new() -> RedirectTable {
        RedirectTable::default()
    }

    pub fn insert(&self, src: Mac, dst: Mac) {
        self.map.write().insert(src, dst);
    }

    pub fn lookup(&self, src: Mac) -> Option<Mac> {
        self.map.read().get(&src).copied()
    }
}

/// The egress device table: logical index to physical interface.
#[derive(Default)]
pub struct DeviceTable {
    map: RwLock<HashMap<u32, u32>>,
}

impl DeviceTable {
    pub fn new() -> DeviceTable {
        DeviceTable::default()
    }

    pub fn insert(&self, index: u32, ifindex: u32) {
        self.map.write().insert(index, ifindex);
    }

    pub fn lookup(&self, index: u32) -> Option<u32> {
        self.map.read().get(&index).copied()
    }
}
