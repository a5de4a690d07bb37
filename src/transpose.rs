//! Maps positions in generated source back to template coordinates.

use crate::position::Position;

#[derive(Debug, Clone, Copy)]
struct Mapping {
    generated: Position,
    source: Position,
}

/// Collection of generated-position → source-position anchors recorded
/// while the backend emits code.
///
/// All mappings for one compile are added before the first lookup, so the
/// list is sorted exactly once, on first query. A transposer is single-use
/// per compilation pass.
#[derive(Debug, Default)]
pub struct PositionTransposer {
    mappings: Vec<Mapping>,
    sorted: bool,
}

impl PositionTransposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mapping(&mut self, generated: Position, source: Position) {
        debug_assert!(
            !self.sorted,
            "all mappings must be added before the first lookup"
        );
        self.mappings.push(Mapping { generated, source });
    }

    /// Translate a generated-source position into template coordinates.
    ///
    /// Anchors translate exactly. Positions between anchors are extrapolated
    /// linearly from the nearest preceding anchor: same-line queries offset
    /// the column, later lines offset the line and keep the query column.
    /// Only block boundaries are anchored, so columns deep inside multi-line
    /// code blocks are approximate. Returns `None` for an unknown query or
    /// when no anchor precedes it.
    pub fn translate(&mut self, query: Option<Position>) -> Option<Position> {
        let query = query?;
        if !self.sorted {
            self.mappings.sort_by_key(|m| m.generated);
            self.sorted = true;
        }
        let index = match self
            .mappings
            .binary_search_by_key(&query, |m| m.generated)
        {
            Ok(i) => return Some(self.mappings[i].source),
            Err(0) => return None,
            Err(i) => i - 1,
        };
        let mapping = self.mappings[index];
        Some(if query.line == mapping.generated.line {
            Position::new(
                mapping.source.line,
                mapping.source.column + (query.column - mapping.generated.column),
            )
        } else {
            Position::new(
                mapping.source.line + (query.line - mapping.generated.line),
                query.column,
            )
        })
    }
}
