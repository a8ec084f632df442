//! Command-line arguments for the `roundtable-cli` binary.
//!
//! Grounded on the teacher's clap-derive usage elsewhere in the pack
//! (`tools/*_tool.rs`'s `#[derive(Parser)]` idiom); the teacher's own
//! `main.rs` read its configuration entirely from `SwarmConfig`/env
//! vars with no CLI surface, so the flag set itself is new — shaped
//! directly by SPEC_FULL.md §6's external interface (document,
//! domain hint, participant count, iteration budget, convergence
//! knobs).

use std::path::PathBuf;

use clap::Parser;

/// Run one roundtable refinement session against a document and print
/// its event stream and final report to stdout.
#[derive(Debug, Parser)]
#[command(name = "roundtable-cli", version, about)]
pub struct Args {
    /// Path to the document to refine. Reads stdin when omitted.
    #[arg(long)]
    pub document: Option<PathBuf>,

    /// Domain hint for the built-in role presets
    /// (prd, code-review, architecture, business-strategy).
    #[arg(long)]
    pub domain: Option<String>,

    /// Number of reviewer participants.
    #[arg(long, default_value_t = 3)]
    pub participants: usize,

    /// Hard ceiling on refinement iterations.
    #[arg(long, default_value_t = 6)]
    pub max_iterations: u32,

    /// Delta below which the document is considered stable.
    #[arg(long, default_value_t = 0.02)]
    pub delta_threshold: f64,

    /// Run the full iteration budget even once issues stop appearing.
    #[arg(long, default_value_t = false)]
    pub force_max_iterations: bool,

    /// Directory the session's artifacts are written under.
    #[arg(long, default_value = "./roundtable-data")]
    pub store_dir: PathBuf,
}
