//! Stack frame bookkeeping for one function
//!
//! Two regions grow independently while a function is compiled:
//!
//! - the temp region, addressed upward from sp (`0(sp)`, `4(sp)`, ...)
//! - the saved region, addressed downward from fp (`-4(fp)`, `-8(fp)`, ...)
//!
//! `fp` is the caller's `sp`, so the two never overlap and the frame size is
//! their sum. Neither region is final until the register allocator is done.

use log::trace;
use rvcc_common::{CompilerError, Pass};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Frame {
    /// Owning function, for diagnostics
    function: String,

    temp_size: i32,
    saved_size: i32,

    /// Memoized sp-relative slots
    temp_slots: HashMap<String, i32>,

    /// Memoized fp-relative slots (negative)
    saved_slots: HashMap<String, i32>,
}

impl Frame {
    /// Create a frame with the return address and caller frame pointer slots
    /// already reserved at `-4(fp)` and `-8(fp)`
    pub fn new(function: &str) -> Self {
        let mut frame = Self {
            function: function.to_string(),
            temp_size: 0,
            saved_size: 0,
            temp_slots: HashMap::new(),
            saved_slots: HashMap::new(),
        };
        for key in ["ra", "fp"] {
            frame.saved_size += 4;
            frame.saved_slots.insert(key.to_string(), -frame.saved_size);
        }
        frame
    }

    /// Failures are attributed to the allocator; callers in other passes
    /// re-tag them with `CompilerError::in_pass`
    fn invalid(&self, key: &str, size: i32) -> CompilerError {
        CompilerError::InvalidAllocation {
            pass: Pass::Alloc,
            function: self.function.clone(),
            key: key.to_string(),
            size,
        }
    }

    /// `bytes` more can be reserved without the frame size overflowing
    fn check_room(&self, key: &str, size: i32, bytes: i32) -> Result<(), CompilerError> {
        if size <= 0 || self.size().checked_add(bytes).is_none() {
            return Err(self.invalid(key, size));
        }
        Ok(())
    }

    /// Slot for `key` in the temp region; repeated requests for the same key
    /// return the first offset
    pub fn alloc_temp(&mut self, size: i32, key: &str) -> Result<i32, CompilerError> {
        if let Some(&offset) = self.temp_slots.get(key) {
            self.check_room(key, size, 0)?;
            return Ok(offset);
        }
        self.check_room(key, size, size)?;

        let offset = self.temp_size;
        self.temp_size += size;
        self.temp_slots.insert(key.to_string(), offset);
        trace!("{}: temp slot '{}' at {}(sp)", self.function, key, offset);
        Ok(offset)
    }

    /// Slot for `key` in the saved region; repeated requests for the same key
    /// return the first offset
    pub fn alloc_reg(&mut self, size: i32, key: &str) -> Result<i32, CompilerError> {
        if let Some(&offset) = self.saved_slots.get(key) {
            self.check_room(key, size, 0)?;
            return Ok(offset);
        }
        self.check_room(key, size, size)?;

        self.saved_size += size;
        let offset = -self.saved_size;
        self.saved_slots.insert(key.to_string(), offset);
        trace!("{}: saved slot '{}' at {}(fp)", self.function, key, offset);
        Ok(offset)
    }

    /// Fresh sp-relative space for local buffer `key`, rounded up to whole
    /// words
    pub fn alloc_dec(&mut self, size: i32, key: &str) -> Result<i32, CompilerError> {
        let rounded = size
            .checked_add(3)
            .map(|s| s & !3)
            .ok_or_else(|| self.invalid(key, size))?;
        self.check_room(key, size, rounded)?;

        let offset = self.temp_size;
        self.temp_size += rounded;
        trace!("{}: buffer '{}' of {} bytes at {}(sp)", self.function, key, size, offset);
        Ok(offset)
    }

    /// Pad the temp region until the whole frame is a multiple of `align`
    pub fn align(&mut self, align: i32) -> Result<(), CompilerError> {
        let rem = self.size() % align;
        if rem != 0 {
            let pad = align - rem;
            self.check_room("alignment", pad, pad)?;
            self.temp_size += pad;
        }
        Ok(())
    }

    pub fn temp_offset(&self, key: &str) -> Option<i32> {
        self.temp_slots.get(key).copied()
    }

    pub fn saved_offset(&self, key: &str) -> Option<i32> {
        self.saved_slots.get(key).copied()
    }

    pub fn temp_size(&self) -> i32 {
        self.temp_size
    }

    pub fn saved_size(&self) -> i32 {
        self.saved_size
    }

    /// Total frame size in bytes
    pub fn size(&self) -> i32 {
        self.temp_size + self.saved_size
    }
}
