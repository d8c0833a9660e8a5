//  _____       ______   ____
// |_   _|     |  ____|/ ____|  Institute of Embedded Systems
//   | |  _ __ | |__  | (___    Zurich University of Applied Sciences
//   | | | '_ \|  __|  \___ \   8401 Winterthur, Switzerland
//  _| |_| | | | |____ ____) |
// |_____|_| |_|______|_____/
//
// Copyright 2025 Institute of Embedded Systems at Zurich University of Applied Sciences.
// All rights reserved.
// SPDX-License-Identifier: MIT

use heapless::Vec;

use crate::*;

/// Child table with a fixed number of slots
///
/// Indices stay valid until the child in the slot is removed. Freed slots are reused.
#[derive(Debug, Default)]
pub struct Children<const N: usize> {
    slots: Vec<Option<Child>, N>,
}

impl<const N: usize> Children<N> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Add child, returns the child back if the table is full
    pub fn add(&mut self, child: Child) -> Result<ChildIndex, Child> {
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            self.slots[index] = Some(child);
            return Ok(index);
        }
        match self.slots.push(Some(child)) {
            Ok(()) => Ok(self.slots.len() - 1),
            Err(Some(child)) => {
                warn!("child table full, dropping child {:x}", child.rloc16);
                Err(child)
            }
            Err(None) => unreachable!(),
        }
    }

    pub fn remove(&mut self, index: ChildIndex) -> Option<Child> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, rloc16: Rloc16) -> Option<ChildIndex> {
        self.iter()
            .find(|(_, child)| child.rloc16 == rloc16)
            .map(|(index, _)| index)
    }
}

impl<const N: usize> ChildTable for Children<N> {
    fn iter(&self) -> impl Iterator<Item = (ChildIndex, &Child)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|child| (index, child)))
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = (ChildIndex, &mut Child)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|child| (index, child)))
    }

    fn get(&self, index: ChildIndex) -> Option<&Child> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, index: ChildIndex) -> Option<&mut Child> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }
}
