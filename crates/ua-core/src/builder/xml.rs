//! Streaming reader for definition and patch documents.
//!
//! Both document kinds share one shape:
//!
//! ```xml
//! <wurfl>
//!   <version><ver>2.3</ver><last_updated>2012-03-01</last_updated></version>
//!   <devices>
//!     <device id="generic" user_agent="" fall_back="root">
//!       <group id="display">
//!         <capability name="resolution_width" value="90"/>
//!       </group>
//!     </device>
//!   </devices>
//! </wurfl>
//! ```
//!
//! Patches use `<wurfl_patch>` as the root element and usually omit the
//! version block. Attributes a patch leaves out stay `None` so the builder
//! can tell "not mentioned" from "set to empty".

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use ua_common::{Error, Result};

use crate::repository::DatabaseInfo;

/// `fall_back` value that marks the root device.
pub const ROOT_FALLBACK: &str = "root";

/// One `<device>` element as written in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceEntry {
    pub id: String,
    pub user_agent: Option<String>,
    /// Raw `fall_back` attribute; `root` and empty both mean no parent.
    pub fall_back: Option<String>,
    pub actual_device_root: Option<bool>,
    pub specific: Option<bool>,
    /// `(group, capability, value)` in document order.
    pub capabilities: Vec<(String, String, String)>,
}

impl DeviceEntry {
    /// Parent id, with the root markers mapped to `None`.
    pub fn parent(&self) -> Option<&str> {
        self.fall_back
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && *p != ROOT_FALLBACK)
    }
}

/// A parsed document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Present only when the document carries a `<version>` block.
    pub info: Option<DatabaseInfo>,
    pub devices: Vec<DeviceEntry>,
}

/// Which element's text is being read inside `<version>`.
#[derive(Clone, Copy)]
enum VersionField {
    Ver,
    LastUpdated,
}

/// Parses a document; `path` is only used in error messages.
///
/// `keep` decides per `(group, capability)` whether a value is retained.
pub fn parse_document(
    bytes: &[u8],
    path: &Path,
    keep: &dyn Fn(&str, &str) -> bool,
) -> Result<Document> {
    let malformed = |message: String| Error::MalformedDefinition {
        path: path.to_path_buf(),
        message,
    };

    let text = std::str::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut doc = Document::default();
    let mut root_seen = false;
    let mut device: Option<DeviceEntry> = None;
    let mut group: Option<String> = None;
    let mut version_field: Option<VersionField> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            malformed(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"wurfl" | b"wurfl_patch" => root_seen = true,
                    b"version" if doc.info.is_none() => doc.info = Some(DatabaseInfo::default()),
                    b"ver" if !is_empty => version_field = Some(VersionField::Ver),
                    b"last_updated" if !is_empty => {
                        version_field = Some(VersionField::LastUpdated)
                    }
                    b"device" => {
                        let entry = parse_device(e).map_err(&malformed)?;
                        if is_empty {
                            doc.devices.push(entry);
                        } else {
                            device = Some(entry);
                        }
                    }
                    b"group" => {
                        if !is_empty {
                            group = Some(required_attr(e, "id", "group").map_err(&malformed)?);
                        }
                    }
                    b"capability" => {
                        let (Some(entry), Some(group)) = (device.as_mut(), group.as_deref())
                        else {
                            return Err(malformed(
                                "capability outside of a device group".to_string(),
                            ));
                        };
                        let name = required_attr(e, "name", "capability").map_err(&malformed)?;
                        let value = attr(e, "value").map_err(&malformed)?.unwrap_or_default();
                        if keep(group, &name) {
                            entry.capabilities.push((group.to_string(), name, value));
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let (Some(field), Some(info)) = (version_field, doc.info.as_mut()) {
                    let value = t.unescape().map_err(|e| malformed(e.to_string()))?;
                    match field {
                        VersionField::Ver => info.version = value.trim().to_string(),
                        VersionField::LastUpdated => info.last_updated = value.trim().to_string(),
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"device" => doc.devices.extend(device.take()),
                b"group" => group = None,
                b"ver" | b"last_updated" => version_field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(malformed(
            "expected a <wurfl> or <wurfl_patch> root element".to_string(),
        ));
    }
    Ok(doc)
}

fn parse_device(e: &BytesStart<'_>) -> std::result::Result<DeviceEntry, String> {
    let flag = |name: &str| -> std::result::Result<Option<bool>, String> {
        Ok(attr(e, name)?.map(|v| v.trim().eq_ignore_ascii_case("true")))
    };
    Ok(DeviceEntry {
        id: required_attr(e, "id", "device")?,
        user_agent: attr(e, "user_agent")?,
        fall_back: attr(e, "fall_back")?,
        actual_device_root: flag("actual_device_root")?,
        specific: flag("specific")?,
        capabilities: Vec::new(),
    })
}

fn attr(e: &BytesStart<'_>, name: &str) -> std::result::Result<Option<String>, String> {
    for attribute in e.attributes() {
        let attribute = attribute.map_err(|err| err.to_string())?;
        if attribute.key.as_ref() == name.as_bytes() {
            let value = attribute.unescape_value().map_err(|err| err.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required_attr(
    e: &BytesStart<'_>,
    name: &str,
    element: &str,
) -> std::result::Result<String, String> {
    match attr(e, name)? {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(format!("<{element}> without a '{name}' attribute")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wurfl>
  <version>
    <ver>www.wurflpro.com - 2012-03-01</ver>
    <last_updated>Thu Mar 01 10:00:00 +0100 2012</last_updated>
  </version>
  <devices>
    <device id="generic" user_agent="" fall_back="root">
      <group id="product_info">
        <capability name="brand_name" value=""/>
        <capability name="is_wireless_device" value="false"/>
      </group>
      <group id="display">
        <capability name="resolution_width" value="90"/>
      </group>
    </device>
    <device id="ericsson_generic" user_agent="Ericsson" fall_back="generic" actual_device_root="true">
      <group id="product_info">
        <capability name="brand_name" value="Ericsson &amp; Sons"/>
      </group>
    </device>
    <device id="bare" user_agent="Bare/1.0" fall_back="generic"/>
  </devices>
</wurfl>"#;

    fn keep_all(_: &str, _: &str) -> bool {
        true
    }

    #[test]
    fn parses_devices_and_version() {
        let doc = parse_document(DOC.as_bytes(), Path::new("wurfl.xml"), &keep_all).unwrap();
        let info = doc.info.unwrap();
        assert_eq!(info.version, "www.wurflpro.com - 2012-03-01");
        assert_eq!(info.last_updated, "Thu Mar 01 10:00:00 +0100 2012");

        assert_eq!(doc.devices.len(), 3);
        let generic = &doc.devices[0];
        assert_eq!(generic.parent(), None);
        assert_eq!(generic.user_agent.as_deref(), Some(""));
        assert_eq!(generic.capabilities.len(), 3);
        assert_eq!(
            generic.capabilities[2],
            ("display".into(), "resolution_width".into(), "90".into())
        );

        let ericsson = &doc.devices[1];
        assert_eq!(ericsson.parent(), Some("generic"));
        assert_eq!(ericsson.actual_device_root, Some(true));
        assert_eq!(ericsson.specific, None);
        assert_eq!(ericsson.capabilities[0].2, "Ericsson & Sons");

        assert_eq!(doc.devices[2].id, "bare");
        assert!(doc.devices[2].capabilities.is_empty());
    }

    #[test]
    fn filter_drops_capabilities() {
        let keep = |group: &str, name: &str| group == "display" || name == "brand_name";
        let doc = parse_document(DOC.as_bytes(), Path::new("wurfl.xml"), &keep).unwrap();
        let names: Vec<_> = doc.devices[0]
            .capabilities
            .iter()
            .map(|(_, n, _)| n.as_str())
            .collect();
        assert_eq!(names, ["brand_name", "resolution_width"]);
    }

    #[test]
    fn patch_root_and_missing_version() {
        let patch = r#"<wurfl_patch><devices>
            <device id="generic"><group id="display"><capability name="resolution_width" value="120"/></group></device>
        </devices></wurfl_patch>"#;
        let doc = parse_document(patch.as_bytes(), Path::new("p.xml"), &keep_all).unwrap();
        assert!(doc.info.is_none());
        assert_eq!(doc.devices[0].fall_back, None);
        assert_eq!(doc.devices[0].user_agent, None);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let cases = [
            "<wurfl><devices><device id=\"a\" fall_back=\"root\"></devices></wurfl>",
            "<wurfl><devices><device user_agent=\"x\" fall_back=\"root\"/></devices></wurfl>",
            "<devices/>",
            "<wurfl><devices><capability name=\"x\" value=\"1\"/></devices></wurfl>",
        ];
        for case in cases {
            let err = parse_document(case.as_bytes(), Path::new("bad.xml"), &keep_all).unwrap_err();
            assert!(
                matches!(err, Error::MalformedDefinition { .. }),
                "case {case}: {err:?}"
            );
        }
    }
}
