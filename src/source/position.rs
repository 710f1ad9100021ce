//! Mapping positions in the wrapped source back to the original
//!
//! The mapping is line-granular: an offset anywhere on a wrapped line maps
//! to the start of the corresponding original line. Column-accurate mapping
//! is not supported; the wrapped form only guarantees that body lines are
//! identical after a fixed number of header lines.

/// Character offsets at which each line of `text` starts
fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, c) in text.chars().enumerate() {
        if c == '\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// Maps character offsets of a wrapped program onto its original source
#[derive(Debug, Clone)]
pub struct PositionMapper {
    wrapped_starts: Vec<usize>,
    original_starts: Vec<usize>,
    header_lines: usize,
}

impl PositionMapper {
    pub fn new(wrapped: &str, original: &str, header_lines: usize) -> Self {
        PositionMapper {
            wrapped_starts: line_starts(wrapped),
            original_starts: line_starts(original),
            header_lines,
        }
    }

    /// Zero-based line of the wrapped source containing `offset`
    pub fn wrapped_line(&self, offset: usize) -> usize {
        let mut line = 0;
        for (i, &start) in self.wrapped_starts.iter().enumerate() {
            if start > offset {
                break;
            }
            line = i;
        }
        line
    }

    /// Zero-based original line for a wrapped offset, clamped into the original
    pub fn map_line(&self, wrapped_offset: usize) -> usize {
        let line = self
            .wrapped_line(wrapped_offset)
            .saturating_sub(self.header_lines);
        line.min(self.original_starts.len() - 1)
    }

    /// Offset of the start of the original line for a wrapped offset
    pub fn map_position(&self, wrapped_offset: usize) -> usize {
        self.original_starts[self.map_line(wrapped_offset)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_line_minus_header() {
        let original = "a = 1;\nb = 2;\nc = 3;\nd = 4;";
        let wrapped = format!("h1\nh2\nh3\n{original}\nfooter");
        let mapper = PositionMapper::new(&wrapped, original, 3);

        // Somewhere inside wrapped line 5 ("c = 3;")
        let offset = "h1\nh2\nh3\na = 1;\nb = 2;\nc ".chars().count();
        assert_eq!(mapper.wrapped_line(offset), 5);
        assert_eq!(mapper.map_line(offset), 2);
        assert_eq!(mapper.map_position(offset), "a = 1;\nb = 2;\n".len());
    }

    #[test]
    fn test_header_and_footer_clamp() {
        let original = "x;\ny;";
        let wrapped = format!("header\n{original}\n}}\nmain();");
        let mapper = PositionMapper::new(&wrapped, original, 1);
        assert_eq!(mapper.map_position(0), 0);
        assert_eq!(mapper.map_line(wrapped.chars().count()), 1);
        assert_eq!(mapper.map_position(10_000), 3);
    }

    #[test]
    fn test_offsets_count_characters() {
        let original = "é;\nz;";
        let wrapped = format!("h\n{original}");
        let mapper = PositionMapper::new(&wrapped, original, 1);
        // "h\né;\n" is 5 characters
        assert_eq!(mapper.map_line(5), 1);
        assert_eq!(mapper.map_position(5), 3);
    }
}
