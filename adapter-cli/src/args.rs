//! The CLI arguments parser using clap.

use clap::{ArgEnum, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "safe-run")]
#[clap(about, author, version)]
pub struct SafeRunArgs {
    /// The artifact path to inspect: a file, archive, or working-copy
    /// directory.
    pub input: PathBuf,

    /// Force a specific adapter class instead of auto-detection.
    /// Selecting anything but `auto` enables the strict, fail-closed
    /// route.
    #[clap(short, long, arg_enum, default_value = "auto")]
    pub selection: SelectionArg,

    /// Enable an external enumeration plugin (repeatable). Only `tar`
    /// and `7z` are recognized.
    #[clap(short, long)]
    pub plugin: Vec<String>,

    /// Print the capability listing (every adapter class, its mode,
    /// its plugins and their live availability) instead of running an
    /// analysis.
    #[clap(long)]
    pub list_adapters: bool,

    /// Pretty-print the JSON result instead of emitting it compact.
    #[clap(long)]
    pub pretty: bool,

    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

#[derive(ArgEnum, Clone, Copy, Debug)]
pub enum SelectionArg {
    Auto,
    None,
    Archive,
    Package,
    Extension,
    Iac,
    Cicd,
    Document,
    Container,
    Image,
    Scm,
    Signature,
}

impl From<SelectionArg> for adapter_core::Selection {
    fn from(value: SelectionArg) -> Self {
        match value {
            SelectionArg::Auto => adapter_core::Selection::Auto,
            SelectionArg::None => adapter_core::Selection::None,
            SelectionArg::Archive => adapter_core::Selection::Archive,
            SelectionArg::Package => adapter_core::Selection::Package,
            SelectionArg::Extension => adapter_core::Selection::Extension,
            SelectionArg::Iac => adapter_core::Selection::Iac,
            SelectionArg::Cicd => adapter_core::Selection::Cicd,
            SelectionArg::Document => adapter_core::Selection::Document,
            SelectionArg::Container => adapter_core::Selection::Container,
            SelectionArg::Image => adapter_core::Selection::Image,
            SelectionArg::Scm => adapter_core::Selection::Scm,
            SelectionArg::Signature => adapter_core::Selection::Signature,
        }
    }
}
