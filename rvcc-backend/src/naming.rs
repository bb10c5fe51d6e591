//! Name generation for the backend
//!
//! Labels and frame keys the backend invents are derived here so that every
//! pass spells them the same way. The generator is created per compilation
//! and threaded through explicitly; nothing is global.

/// Fresh-name source for one compilation unit
#[derive(Debug, Default)]
pub struct NameGenerator {
    next_block_id: u32,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label of a block that starts after a branch without a LABEL
    pub fn fresh_block_label(&mut self, function: &str) -> String {
        let id = self.next_block_id;
        self.next_block_id += 1;
        format!("{}.bb{}", function, id)
    }

    /// Label of a function's first block
    pub fn entry_label(function: &str) -> String {
        format!("{}.entry", function)
    }

    /// Label of a function's single exit block
    pub fn exit_label(function: &str) -> String {
        format!("{}.ret", function)
    }

    /// Frame key of the outgoing stack slot for argument `index`. The `%`
    /// keeps it apart from every IR name.
    pub fn outgoing_arg_key(index: usize) -> String {
        format!("%arg{}", index)
    }
}
