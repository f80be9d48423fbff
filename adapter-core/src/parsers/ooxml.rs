//! OOXML (`.docm`/`.xlsm`) structural gates layered on top of the
//! ZIP parser (§4.7).

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OoxmlKind {
    Docm,
    Xlsm,
}

impl OoxmlKind {
    pub fn primary_part(self) -> &'static str {
        match self {
            OoxmlKind::Docm => "word/document.xml",
            OoxmlKind::Xlsm => "xl/workbook.xml",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct OoxmlStructuralCheck {
    pub has_content_types: bool,
    pub has_root_rels: bool,
    pub has_primary_part: bool,
}

impl OoxmlStructuralCheck {
    pub fn is_structurally_valid(&self) -> bool {
        self.has_content_types && self.has_root_rels && self.has_primary_part
    }
}

/// Evaluate the structural gate of §4.7 over a list of normalized
/// entry paths already present in the ZIP.
pub fn check(kind: OoxmlKind, entry_paths: &[String]) -> OoxmlStructuralCheck {
    let has_content_types = entry_paths.iter().any(|p| p == "[Content_Types].xml");
    let has_root_rels = entry_paths.iter().any(|p| {
        p == "_rels/.rels" || (p.starts_with("_rels/") && p.ends_with(".rels"))
    });
    let has_primary_part = entry_paths.iter().any(|p| p == kind.primary_part());
    OoxmlStructuralCheck {
        has_content_types,
        has_root_rels,
        has_primary_part,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_docm_shape() {
        let paths = vec![
            "[Content_Types].xml".to_string(),
            "_rels/.rels".to_string(),
            "word/document.xml".to_string(),
        ];
        assert!(check(OoxmlKind::Docm, &paths).is_structurally_valid());
    }

    #[test]
    fn missing_primary_part_invalid() {
        let paths = vec!["[Content_Types].xml".to_string(), "_rels/.rels".to_string()];
        assert!(!check(OoxmlKind::Docm, &paths).is_structurally_valid());
    }
}
