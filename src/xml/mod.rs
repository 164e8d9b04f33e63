//! Low-level WordProcessingML primitives
//!
//! The whole crate works on the raw body XML string. These two modules are
//! the only place that knows how to pull readable text out of a fragment and
//! how to slice a complete `<w:p>`/`<w:tbl>` element out of the stream
//! without a DOM.

pub mod scan;
pub mod text;

pub use scan::{extract_outer_element, RawBlock};
pub use text::{decode_entities, escape_xml, extract_text};
