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

//! Queue of timers ordered by deadline.
//!
//! Timers with the same deadline fire in the order they were scheduled.
use std::fmt::Debug;

/// Time in microseconds
pub type Deadline = u64;

pub struct TimerQueue<T> {
    head: Option<Box<Timer<T>>>,
    len: usize,
}

struct Timer<T> {
    deadline: Deadline,
    item: T,
    next: Option<Box<Timer<T>>>,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Schedule `item` to fire at `deadline`
    pub fn schedule(&mut self, deadline: Deadline, item: T) {
        let mut cursor = &mut self.head;

        // skip all timers that fire before or together with the new one
        while cursor
            .as_ref()
            .is_some_and(|timer| timer.deadline <= deadline)
        {
            cursor = &mut cursor.as_mut().unwrap().next;
        }

        let next = cursor.take();
        *cursor = Some(Box::new(Timer {
            deadline,
            item,
            next,
        }));
        self.len += 1;
    }

    /// Remove the timer with the earliest deadline
    pub fn pop(&mut self) -> Option<(Deadline, T)> {
        self.head.take().map(|timer| {
            self.head = timer.next;
            self.len -= 1;
            (timer.deadline, timer.item)
        })
    }

    pub fn next_deadline(&self) -> Option<Deadline> {
        self.head.as_ref().map(|timer| timer.deadline)
    }

    /// Remove all timers for which `keep` returns false
    pub fn cancel_unless(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let mut cursor = &mut self.head;
        while cursor.is_some() {
            if cursor.as_ref().is_some_and(|timer| keep(&timer.item)) {
                cursor = &mut cursor.as_mut().unwrap().next;
            } else {
                let timer = cursor.as_mut().unwrap();
                *cursor = timer.next.take();
                self.len -= 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> Iter<T> {
        Iter {
            next: self.head.as_deref(),
        }
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug> Debug for TimerQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Drop for TimerQueue<T> {
    // drop iteratively, the recursive default drop overflows the stack on long queues
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(mut timer) = next {
            next = timer.next.take();
        }
    }
}

pub struct Iter<'a, T> {
    next: Option<&'a Timer<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Deadline, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.next.take().map(|timer| {
            self.next = timer.next.as_deref();
            (timer.deadline, &timer.item)
        })
    }
}
