//! Pipeline stages for W-9 data extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a fake layout service in tests) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! layout ──▶ associate ──▶ (prompts) ──▶ llm ──▶ reply ──▶ normalize
//! (lines,     (checkbox                 (chat    (JSON      (fuzzy keys,
//!  marks)      → label)                  call)    span)      W9Record)
//! ```
//!
//! 1. [`layout`]    — submit the document for layout analysis and poll for
//!    text lines and selection marks; the only stage besides [`llm`] with
//!    network I/O
//! 2. [`associate`] — pure nearest-neighbour pairing of checkboxes to labels
//! 3. [`llm`]       — drive the chat-completion call with retry/backoff
//! 4. [`reply`]     — isolate and parse the `{…}` object out of model prose
//! 5. [`normalize`] — fuzzy-match reply keys onto the fixed schema and build
//!    the validated record

pub mod associate;
pub mod layout;
pub mod llm;
pub mod normalize;
pub mod reply;
