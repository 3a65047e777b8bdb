use std::fmt::{self, Display};

/// A point in the source text. Lines count from 1, columns from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column + 1)
    }
}

/// Half-open range `[start, end)` covered by a token or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn of(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self::new(
            Position::new(start_line, start_col),
            Position::new(end_line, end_col),
        )
    }

    // Spans from the start of self to the end of other
    pub fn to(&self, other: SourceLocation) -> SourceLocation {
        SourceLocation::new(self.start, other.end)
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joining_locations() {
        let left = SourceLocation::of(1, 4, 1, 7);
        let right = SourceLocation::of(2, 0, 2, 3);

        assert_eq!(left.to(right), SourceLocation::of(1, 4, 2, 3));
    }

    #[test]
    fn displays_one_based_columns() {
        assert_eq!(SourceLocation::of(3, 0, 3, 5).to_string(), "3:1-3:6");
    }
}
