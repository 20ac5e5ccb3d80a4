//! Definition-name extraction from EAGLE-style `.lbr` files.
//!
//! # Source Layout
//!
//! ```text
//! <eagle version="9.6.2">
//!   <drawing>
//!     <library>
//!       <packages>   <package name="R0805"/> ...  </packages>
//!       <symbols>    <symbol name="R"/> ...       </symbols>
//!       <devicesets> <deviceset name="R0805"/> ...</devicesets>
//!     </library>
//!   </drawing>
//! </eagle>
//! ```
//!
//! Extraction walks root → first child element → `library` → container →
//! first child element, and reads its `name` attribute. The walk is a pure
//! function over a parsed tree ([`package_name_in`]); file I/O and logging
//! live in [`extract_package_name`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node, ParsingOptions};
use serde::Serialize;
use thiserror::Error;

/// Kind of definition that can be copied out of a source library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    /// Device sets (symbol + package + connects).
    Devicesets,
    /// Bare footprints.
    Packages,
    /// Bare schematic symbols.
    Symbols,
}

impl PackageType {
    /// Order in which definition kinds are tried.
    ///
    /// `Symbols` is deliberately absent: symbol-only imports are not
    /// enabled yet, though the command driver already knows their tag.
    pub const FALLBACK_ORDER: [Self; 2] = [Self::Devicesets, Self::Packages];

    /// Name of the container element inside `<library>`.
    #[must_use]
    pub const fn container(self) -> &'static str {
        match self {
            Self::Devicesets => "devicesets",
            Self::Packages => "packages",
            Self::Symbols => "symbols",
        }
    }

    /// Short tag used in qualified names (`NAME.tag@file.lbr`).
    #[must_use]
    pub const fn format_tag(self) -> &'static str {
        match self {
            Self::Devicesets => "dev",
            Self::Packages => "pac",
            Self::Symbols => "sym",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.container())
    }
}

/// A definition located inside a source library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    /// Source library file name, e.g. `R0805.lbr`.
    pub source_name: String,
    /// Definition name, e.g. `R0805`.
    pub package_name: String,
    /// Kind of definition.
    pub package_type: PackageType,
}

/// Errors that can occur while extracting a definition name.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The library file could not be read.
    #[error("Failed to read library file: {path}")]
    Read {
        /// Library file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The library file is not well-formed XML.
    #[error("Malformed library XML")]
    Xml(#[from] roxmltree::Error),

    /// A required element is absent.
    #[error("Missing required element: {0}")]
    MissingElement(String),

    /// A required attribute is absent.
    #[error("Missing attribute '{attr}' on <{element}>")]
    MissingAttribute {
        /// Element that lacks the attribute.
        element: String,
        /// Attribute name.
        attr: &'static str,
    },
}

/// Reads the name of the first definition of `package_type` from a parsed
/// library document.
///
/// # Errors
///
/// Returns [`ExtractError::MissingElement`] or
/// [`ExtractError::MissingAttribute`] if the expected structure is absent.
pub fn package_name_in(doc: &Document, package_type: PackageType) -> Result<String, ExtractError> {
    let root = doc.root_element();
    let drawing = first_element(root)
        .ok_or_else(|| ExtractError::MissingElement(format!("<{}> child", tag(root))))?;
    let library = child_named(drawing, "library")?;
    let container = child_named(library, package_type.container())?;
    let definition = first_element(container)
        .ok_or_else(|| ExtractError::MissingElement(format!("<{}> entry", tag(container))))?;

    definition
        .attribute("name")
        .map(str::to_string)
        .ok_or_else(|| ExtractError::MissingAttribute {
            element: tag(definition).to_string(),
            attr: "name",
        })
}

/// Parses library XML and extracts a definition name.
///
/// # Errors
///
/// Returns an error if the XML is malformed or the structure is missing.
pub fn parse_package_name(xml: &str, package_type: PackageType) -> Result<String, ExtractError> {
    // Real EAGLE files carry `<!DOCTYPE eagle SYSTEM "eagle.dtd">`.
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let doc = Document::parse_with_options(xml, options)?;
    if let Some(version) = doc.root_element().attribute("version") {
        tracing::debug!(schema_version = version, "Parsed library document");
    }
    package_name_in(&doc, package_type)
}

/// Extracts a definition name from a library file on disk.
///
/// Never fails: any read, parse, or structural problem is logged and
/// reported as "no name found".
pub async fn extract_package_name(path: &Path, package_type: PackageType) -> Option<String> {
    match read_package_name(path, package_type).await {
        Ok(name) => Some(name),
        Err(e) => {
            tracing::info!(
                path = %path.display(),
                package_type = %package_type,
                error = %e,
                "No definition name found"
            );
            None
        }
    }
}

async fn read_package_name(path: &Path, package_type: PackageType) -> Result<String, ExtractError> {
    let xml = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ExtractError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_package_name(&xml, package_type)
}

/// Locates the definition to import, trying each kind in
/// [`PackageType::FALLBACK_ORDER`].
///
/// Returns `None` if no kind yields a name.
pub async fn find_package(path: &Path, source_name: &str) -> Option<PackageDescriptor> {
    for package_type in PackageType::FALLBACK_ORDER {
        if let Some(package_name) = extract_package_name(path, package_type).await {
            return Some(PackageDescriptor {
                source_name: source_name.to_string(),
                package_name,
                package_type,
            });
        }
    }
    None
}

fn first_element<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.children().find(Node::is_element)
}

fn child_named<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Result<Node<'a, 'input>, ExtractError> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .ok_or_else(|| ExtractError::MissingElement(format!("<{name}> in <{}>", tag(node))))
}

fn tag<'a, 'input: 'a>(node: Node<'a, 'input>) -> &'a str {
    node.tag_name().name()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE_LIBRARY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE eagle SYSTEM "eagle.dtd">
<eagle version="9.6.2">
  <drawing>
    <settings><setting alwaysvectorfont="no"/></settings>
    <library>
      <packages><package name="RESC2012X65N"/></packages>
      <symbols><symbol name="RESISTOR"/></symbols>
      <devicesets>
        <deviceset name="R0805" prefix="R"/>
        <deviceset name="R0805_ALT" prefix="R"/>
      </devicesets>
    </library>
  </drawing>
</eagle>"#;

    const PACKAGE_ONLY_LIBRARY: &str = r#"<eagle version="7.7.0">
  <drawing>
    <library>
      <packages><package name="SOT23-5"/></packages>
    </library>
  </drawing>
</eagle>"#;

    #[test]
    fn first_deviceset_wins() {
        let name = parse_package_name(DEVICE_LIBRARY, PackageType::Devicesets).unwrap();
        assert_eq!(name, "R0805");
    }

    #[test]
    fn packages_container() {
        let name = parse_package_name(DEVICE_LIBRARY, PackageType::Packages).unwrap();
        assert_eq!(name, "RESC2012X65N");
    }

    #[test]
    fn missing_container() {
        let err = parse_package_name(PACKAGE_ONLY_LIBRARY, PackageType::Devicesets).unwrap_err();
        assert!(matches!(err, ExtractError::MissingElement(ref what) if what.contains("devicesets")));
    }

    #[test]
    fn empty_container() {
        let xml = "<eagle><drawing><library><devicesets/></library></drawing></eagle>";
        let err = parse_package_name(xml, PackageType::Devicesets).unwrap_err();
        assert!(matches!(err, ExtractError::MissingElement(_)));
    }

    #[test]
    fn missing_name_attribute() {
        let xml = "<eagle><drawing><library><packages><package/></packages></library></drawing></eagle>";
        let err = parse_package_name(xml, PackageType::Packages).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingAttribute { ref element, attr: "name" } if element == "package"
        ));
    }

    #[test]
    fn malformed_xml() {
        let err = parse_package_name("<eagle><drawing>", PackageType::Packages).unwrap_err();
        assert!(matches!(err, ExtractError::Xml(_)));
    }

    #[test]
    fn tags_and_containers() {
        assert_eq!(PackageType::Devicesets.format_tag(), "dev");
        assert_eq!(PackageType::Packages.format_tag(), "pac");
        assert_eq!(PackageType::Symbols.format_tag(), "sym");
        assert_eq!(PackageType::Symbols.to_string(), "symbols");
        assert!(!PackageType::FALLBACK_ORDER.contains(&PackageType::Symbols));
    }

    #[tokio::test]
    async fn falls_back_to_packages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SOT23-5.lbr");
        std::fs::write(&path, PACKAGE_ONLY_LIBRARY).unwrap();

        let found = find_package(&path, "SOT23-5.lbr").await.unwrap();
        assert_eq!(found.package_name, "SOT23-5");
        assert_eq!(found.package_type, PackageType::Packages);
        assert_eq!(found.source_name, "SOT23-5.lbr");
    }

    #[tokio::test]
    async fn missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.lbr");
        assert!(extract_package_name(&path, PackageType::Devicesets).await.is_none());
        assert!(find_package(&path, "absent.lbr").await.is_none());
    }
}
