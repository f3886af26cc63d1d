//! Pipeline stages for AsciiDoc-book-to-PDF builds.
//!
//! Each submodule implements one step and takes the shared
//! [`crate::config::BuildConfig`] by reference, so stages can be tested on
//! their own against a local HTTP stub or a temporary directory.
//!
//! ## Data Flow
//!
//! ```text
//!  listing ──▶ fetch ──▶ stage (code, images) ─┐
//!     │                                         ├──▶ html ──▶ export ──▶ inspect
//!     └──────▶ fetch ──▶ merge (chapters) ─────┘
//!                         (workdir)          (asciidoctor) (Chromium)  (lopdf)
//! ```
//!
//! 1. [`listing`]: query a folder of the remote repository, select chapters
//! 2. [`fetch`]  : bounded, ordered concurrent downloads; the only network I/O
//! 3. [`stage`]  : write code and image files into the scratch tree
//! 4. [`merge`]  : strip `images/` from image macros and join the chapters
//! 5. [`workdir`]: the scratch directory that brackets one run
//! 6. [`html`]   : merged markup to body HTML; runs in `spawn_blocking`
//! 7. [`export`] : headless browser, readiness gates, PDF print
//! 8. [`inspect`]: read the page count back from the written PDF

pub mod export;
pub mod fetch;
pub mod html;
pub mod inspect;
pub mod listing;
pub mod merge;
pub mod stage;
pub mod workdir;
