use serde::{Deserialize, Serialize};

/// The adapter class a caller asks the dispatcher to use, or `Auto`
/// to let it infer one from the input (§3.1).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
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

impl Selection {
    /// The class tag this selection resolves to when it is not
    /// `Auto`/`None`, i.e. the literal class requested on the strict
    /// route.
    pub fn as_class_name(self) -> Option<&'static str> {
        match self {
            Selection::Auto | Selection::None => None,
            Selection::Archive => Some("archive"),
            Selection::Package => Some("package"),
            Selection::Extension => Some("extension"),
            Selection::Iac => Some("iac"),
            Selection::Cicd => Some("cicd"),
            Selection::Document => Some("document"),
            Selection::Container => Some("container"),
            Selection::Image => Some("image"),
            Selection::Scm => Some("scm"),
            Selection::Signature => Some("signature"),
        }
    }

    /// True for the strict route: any selection other than `Auto`
    /// triggers fail-closed structural checks (§3.3).
    pub fn is_strict(self) -> bool {
        !matches!(self, Selection::Auto)
    }
}
