//! Single-pass streaming readers over the export document.
//!
//! The export can be gigabytes of XML; both streams hold one open file
//! handle, reuse one event buffer, and never retain an already-yielded
//! element, so memory stays constant relative to document size. The handle
//! is released when the stream is dropped, on every exit path.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{EtlError, EtlResult};
use crate::healthdata as hd;
use crate::model::{ElementKind, RawElement};

struct ExportReader {
    reader: Reader<BufReader<File>>,
    buf: Vec<u8>,
}

impl ExportReader {
    fn open(path: &Path) -> EtlResult<Self> {
        let mut reader = Reader::from_file(path)?;
        reader.config_mut().trim_text(true);
        Ok(ExportReader {
            reader,
            buf: Vec::new(),
        })
    }

    /// Advance to the next top-level child element, or `None` at EOF.
    fn next_element(&mut self) -> EtlResult<Option<RawElement>> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Empty(e) => {
                    if let Some(kind) = element_kind(&e) {
                        let attrs = element_attrs(&e)?;
                        return Ok(Some(RawElement {
                            kind,
                            attrs,
                            metadata: Vec::new(),
                        }));
                    }
                }
                Event::Start(e) => {
                    if let Some(kind) = element_kind(&e) {
                        let attrs = element_attrs(&e)?;
                        // Workouts carry their metadata in nested children;
                        // collect those before handing the element out. Other
                        // kinds are yielded immediately and their subtrees
                        // stream past unretained.
                        let metadata = if kind == ElementKind::Workout {
                            self.collect_workout_metadata()?
                        } else {
                            Vec::new()
                        };
                        return Ok(Some(RawElement {
                            kind,
                            attrs,
                            metadata,
                        }));
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Consume events up to the closing `Workout` tag, gathering
    /// `MetadataEntry` key/value pairs along the way.
    fn collect_workout_metadata(&mut self) -> EtlResult<Vec<(String, String)>> {
        let mut entries = Vec::new();
        let mut depth = 0usize;

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Empty(e) => {
                    if e.name().as_ref() == hd::METADATA_ENTRY.as_bytes() {
                        let attrs = element_attrs(&e)?;
                        if let (Some(key), Some(value)) = (attrs.get("key"), attrs.get("value")) {
                            entries.push((key.clone(), value.clone()));
                        }
                    }
                }
                Event::Start(_) => depth += 1,
                Event::End(e) => {
                    if depth == 0 && e.name().as_ref() == hd::WORKOUT.as_bytes() {
                        return Ok(entries);
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => {
                    return Err(EtlError::Parse {
                        field: "Workout",
                        value: "document ended before closing tag".to_string(),
                    });
                }
                _ => {}
            }
        }
    }
}

fn element_kind(e: &BytesStart<'_>) -> Option<ElementKind> {
    let name = e.name();
    let tag = String::from_utf8_lossy(name.as_ref());
    ElementKind::from_tag(&tag)
}

fn element_attrs(e: &BytesStart<'_>) -> EtlResult<std::collections::HashMap<String, String>> {
    let mut attrs = std::collections::HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| EtlError::Parse {
            field: "attribute",
            value: err.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| EtlError::Parse {
                field: "attribute",
                value: err.to_string(),
            })?
            .to_string();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// Lazy, forward-only stream of top-level elements of one kind.
pub struct ElementStream {
    reader: ExportReader,
    kind: ElementKind,
    done: bool,
}

impl ElementStream {
    pub fn open(path: &Path, kind: ElementKind) -> EtlResult<Self> {
        Ok(ElementStream {
            reader: ExportReader::open(path)?,
            kind,
            done: false,
        })
    }
}

impl Iterator for ElementStream {
    type Item = EtlResult<RawElement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.next_element() {
                Ok(Some(elem)) if elem.kind == self.kind => return Some(Ok(elem)),
                Ok(Some(_)) => continue,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Stream of `Record` elements of one sample type.
///
/// Exports cluster same-typed records contiguously, so once the requested
/// type's run has been seen and a different element appears, the scan stops
/// without reading the rest of the document. This is a speed optimization;
/// results are identical to a full scan on a clustered document.
pub struct SampleTypeStream {
    reader: ExportReader,
    sample_type: String,
    run_seen: bool,
    done: bool,
}

impl SampleTypeStream {
    pub fn open(path: &Path, sample_type: &str) -> EtlResult<Self> {
        Ok(SampleTypeStream {
            reader: ExportReader::open(path)?,
            sample_type: sample_type.to_string(),
            run_seen: false,
            done: false,
        })
    }
}

impl Iterator for SampleTypeStream {
    type Item = EtlResult<RawElement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.next_element() {
                Ok(Some(elem)) => {
                    let matches = elem.kind == ElementKind::Record
                        && elem.get(hd::FIELD_TYPE) == Some(self.sample_type.as_str());
                    if matches {
                        self.run_seen = true;
                        return Some(Ok(elem));
                    }
                    if self.run_seen {
                        // Past the end of the clustered run.
                        self.done = true;
                        return None;
                    }
                }
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
