//! Which field kinds can replace each other without breaking decoding of
//! already-serialized data.

use crate::descriptor::FieldType;
use FieldType::*;

/// Groups of mutually wire-compatible kinds. A kind may appear in several
/// groups; compatibility is membership in a common group.
const WIRE_COMPATIBLE_GROUPS: &[&[FieldType]] = &[
    &[Int32, Uint32, Int64, Uint64, Bool],
    &[Sint32, Sint64],
    &[Fixed32, Sfixed32],
    &[Fixed64, Sfixed64],
    &[Int32, Uint32, Int64, Uint64, Enum],
    &[String, Bytes],
    &[Message, Bytes],
];

/// Static, symmetric compatibility table over [`FieldType`].
pub struct WireCompatibilityMatrix;

impl WireCompatibilityMatrix {
    /// True if a field declared as `from` may be redeclared as `to`.
    /// Identical kinds are always compatible.
    pub fn is_wire_compatible(from: FieldType, to: FieldType) -> bool {
        from == to
            || WIRE_COMPATIBLE_GROUPS
                .iter()
                .any(|group| group.contains(&from) && group.contains(&to))
    }

    /// Every ordered pair of distinct compatible kinds.
    pub fn pairs() -> impl Iterator<Item = (FieldType, FieldType)> {
        FieldType::ALL.into_iter().flat_map(|a| {
            FieldType::ALL
                .into_iter()
                .filter(move |b| a != *b && Self::is_wire_compatible(a, *b))
                .map(move |b| (a, b))
        })
    }
}
